//! Conversion of icon geometry into glyph outlines.
//!
//! Icons are parsed with `usvg`, which resolves shapes, styles and every
//! transform into absolute path segments in canvas space. Glyph space has
//! 1000 units per em with y pointing up: the canvas is scaled uniformly so
//! that its height spans the em, and flipped so that its top edge sits on
//! the ascent line.

use std::error::Error;
use std::fmt::{Display, Formatter};

use resvg::tiny_skia::{Path, PathSegment, Point, Transform};
use resvg::usvg;

pub const UNITS_PER_EM: f64 = 1000.0;
pub const ASCENT: f64 = 850.0;
pub const DESCENT: f64 = UNITS_PER_EM - ASCENT;

/// Outline and advance of one glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphOutline {
    pub advance: f64,
    /// Path data in glyph space, absolute commands only.
    pub path: String,
}

/// Maps canvas points into glyph space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphSpace {
    scale: f64,
}

impl GlyphSpace {
    /// Space for a canvas `height` units tall.
    pub fn new(height: f64) -> Self {
        Self {
            scale: UNITS_PER_EM / height,
        }
    }

    pub fn x(&self, x: f64) -> f64 {
        x * self.scale
    }

    pub fn y(&self, y: f64) -> f64 {
        ASCENT - y * self.scale
    }

    pub fn length(&self, length: f64) -> f64 {
        length * self.scale
    }
}

/// Builds the glyph outline of one SVG document.
pub fn glyph_outline(source: &[u8]) -> Result<GlyphOutline, OutlineError> {
    let tree = usvg::Tree::from_data(source, &usvg::Options::default())
        .map_err(|err| OutlineError::Parse(err.to_string()))?;
    let size = tree.size();
    let space = GlyphSpace::new(f64::from(size.height()));

    let mut commands = Vec::new();
    collect_group(tree.root(), &space, &mut commands);
    Ok(GlyphOutline {
        advance: round(space.length(f64::from(size.width()))),
        path: commands.join(" "),
    })
}

fn collect_group(group: &usvg::Group, space: &GlyphSpace, commands: &mut Vec<String>) {
    for node in group.children() {
        match node {
            usvg::Node::Group(group) => collect_group(group, space, commands),
            usvg::Node::Path(path) => {
                collect_path(path.data(), path.abs_transform(), space, commands)
            }
            usvg::Node::Text(text) => collect_group(text.flattened(), space, commands),
            usvg::Node::Image(_) => {}
        }
    }
}

/// Appends the segments of `data`, placed by `transform`, as glyph commands.
fn collect_path(
    data: &Path,
    transform: Transform,
    space: &GlyphSpace,
    commands: &mut Vec<String>,
) {
    let point = |p: Point| {
        let (x, y) = apply(transform, p);
        format!("{} {}", fmt(space.x(x)), fmt(space.y(y)))
    };
    for segment in data.segments() {
        commands.push(match segment {
            PathSegment::MoveTo(p) => format!("M{}", point(p)),
            PathSegment::LineTo(p) => format!("L{}", point(p)),
            PathSegment::QuadTo(c, p) => format!("Q{} {}", point(c), point(p)),
            PathSegment::CubicTo(c1, c2, p) => {
                format!("C{} {} {}", point(c1), point(c2), point(p))
            }
            PathSegment::Close => "Z".to_string(),
        });
    }
}

fn apply(ts: Transform, p: Point) -> (f64, f64) {
    let (x, y) = (f64::from(p.x), f64::from(p.y));
    (
        f64::from(ts.sx) * x + f64::from(ts.kx) * y + f64::from(ts.tx),
        f64::from(ts.ky) * x + f64::from(ts.sy) * y + f64::from(ts.ty),
    )
}

fn round(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Up to two decimals, no trailing zeros, never `-0`.
fn fmt(value: f64) -> String {
    let value = round(value);
    if value == 0.0 {
        return "0".to_string();
    }
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Icon geometry cannot become a glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineError {
    Parse(String),
}

impl Display for OutlineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(reason) => write!(f, "cannot read icon geometry: {reason}"),
        }
    }
}

impl Error for OutlineError {}
