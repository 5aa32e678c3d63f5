//! Presentation styles and colors of parsed icons.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use once_cell::sync::Lazy;
use regex::Regex;

use super::{SvgDocument, SvgElement};

/// Style properties by group name.
pub const STYLES: &[(&str, &[&str])] = &[
    (
        "fonts",
        &[
            "font",
            "font-family",
            "font-size",
            "font-size-adjust",
            "font-stretch",
            "font-style",
            "font-variant",
            "font-weight",
        ],
    ),
    (
        "text",
        &[
            "direction",
            "letter-spacing",
            "text-decoration",
            "unicode-bidi",
            "word-spacing",
            "alignment-baseline",
            "baseline-shift",
            "dominant-baseline",
            "glyph-orientation-horizontal",
            "glyph-orientation-vertical",
            "kerning",
            "text-anchor",
            "writing-mode",
        ],
    ),
    (
        "visual",
        &[
            "clip",
            "cursor",
            "display",
            "overflow",
            "visibility",
            "clip-path",
            "clip-rule",
            "mask",
            "opacity",
            "pointer-events",
        ],
    ),
    (
        "filters",
        &[
            "enable-background",
            "filter",
            "flood-color",
            "flood-opacity",
            "lighting-color",
        ],
    ),
    ("gradient", &["stop-color", "stop-opacity"]),
    (
        "colors",
        &[
            "color-interpolation",
            "color-interpolation-filters",
            "color-profile",
            "color-rendering",
            "fill",
            "fill-opacity",
            "fill-rule",
            "image-rendering",
            "marker",
            "marker-end",
            "marker-mid",
            "marker-start",
            "shape-rendering",
            "stroke",
            "stroke-dasharray",
            "stroke-dashoffset",
            "stroke-linecap",
            "stroke-linejoin",
            "stroke-miterlimit",
            "stroke-opacity",
            "stroke-width",
            "text-rendering",
        ],
    ),
];

static RGB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^rgb\(\s*([0-9.]+%?)\s*,\s*([0-9.]+%?)\s*,\s*([0-9.]+%?)\s*\)$")
        .expect("valid rgb color regex")
});

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("aqua", [0x00, 0xff, 0xff]),
    ("black", [0x00, 0x00, 0x00]),
    ("blue", [0x00, 0x00, 0xff]),
    ("cyan", [0x00, 0xff, 0xff]),
    ("fuchsia", [0xff, 0x00, 0xff]),
    ("gray", [0x80, 0x80, 0x80]),
    ("green", [0x00, 0x80, 0x00]),
    ("grey", [0x80, 0x80, 0x80]),
    ("lime", [0x00, 0xff, 0x00]),
    ("magenta", [0xff, 0x00, 0xff]),
    ("maroon", [0x80, 0x00, 0x00]),
    ("navy", [0x00, 0x00, 0x80]),
    ("olive", [0x80, 0x80, 0x00]),
    ("orange", [0xff, 0xa5, 0x00]),
    ("purple", [0x80, 0x00, 0x80]),
    ("red", [0xff, 0x00, 0x00]),
    ("silver", [0xc0, 0xc0, 0xc0]),
    ("teal", [0x00, 0x80, 0x80]),
    ("white", [0xff, 0xff, 0xff]),
    ("yellow", [0xff, 0xff, 0x00]),
];

/// Opaque sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Parses `#rgb`, `#rrggbb`, `rgb(...)` and basic color names.
    ///
    /// Paint keywords such as `none` or `currentColor` are not colors.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(hex) = raw.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = raw.to_ascii_lowercase();
        if let Some(captures) = RGB_RE.captures(&lower) {
            return Some(Self {
                r: channel(&captures[1])?,
                g: channel(&captures[2])?,
                b: channel(&captures[3])?,
            });
        }
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, [r, g, b])| Self {
                r: *r,
                g: *g,
                b: *b,
            })
    }

    /// `#rrggbb` form.
    pub fn web(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.web())
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let digit = |index: usize| u8::from_str_radix(&hex[index..index + 1], 16).ok();
    let pair = |index: usize| u8::from_str_radix(&hex[index..index + 2], 16).ok();
    match hex.len() {
        3 => Some(Color {
            r: digit(0)? * 17,
            g: digit(1)? * 17,
            b: digit(2)? * 17,
        }),
        6 => Some(Color {
            r: pair(0)?,
            g: pair(2)?,
            b: pair(4)?,
        }),
        _ => None,
    }
}

fn channel(raw: &str) -> Option<u8> {
    let value = match raw.strip_suffix('%') {
        Some(percent) => percent.parse::<f64>().ok()? * 255.0 / 100.0,
        None => raw.parse::<f64>().ok()?,
    };
    Some(value.round().clamp(0.0, 255.0) as u8)
}

/// Property names selected by `groups`.
///
/// Each entry is `all`, a group name from [`STYLES`], or a single known
/// property; unknown names select nothing.
pub fn style_properties(groups: &[&str]) -> Vec<&'static str> {
    let mut selected = Vec::new();
    for group in groups {
        if *group == "all" {
            return all_properties().collect();
        }
        match STYLES.iter().find(|(name, _)| name == group) {
            Some((_, properties)) => selected.extend(properties.iter().copied()),
            None => selected.extend(all_properties().filter(|property| property == group)),
        }
    }
    selected
}

fn all_properties() -> impl Iterator<Item = &'static str> {
    STYLES
        .iter()
        .flat_map(|(_, properties)| properties.iter().copied())
}

/// Style declarations of one element: `style` attribute first, then
/// presentation attributes. Only known properties are returned.
pub fn element_styles(element: &SvgElement) -> Vec<(String, String)> {
    let mut styles: Vec<(String, String)> = element
        .attribute("style")
        .unwrap_or_default()
        .split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();
    for property in all_properties() {
        if let Some(value) = element.attribute(property) {
            styles.push((property.to_string(), value.trim().to_string()));
        }
    }
    styles.retain(|(key, _)| all_properties().any(|property| property == key));
    styles
}

/// Styles of every element with an `id`, limited to `groups`.
pub fn collect_styles(
    document: &SvgDocument,
    groups: &[&str],
) -> BTreeMap<String, BTreeMap<String, String>> {
    let selected = style_properties(groups);
    document
        .elements()
        .iter()
        .filter_map(|element| {
            let id = element.id()?;
            let styles = element_styles(element)
                .into_iter()
                .filter(|(key, _)| selected.contains(&key.as_str()))
                .collect();
            Some((id.to_string(), styles))
        })
        .collect()
}

/// One style declaration whose value is a color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorStyle {
    /// Element id, or the element name when it has none.
    pub element: String,
    pub property: String,
    pub color: Color,
}

/// Every color-valued declaration, in document order.
pub fn color_styles(document: &SvgDocument) -> Vec<ColorStyle> {
    document
        .elements()
        .iter()
        .flat_map(|element| {
            let label = element.id().unwrap_or(&element.name).to_string();
            element_styles(element)
                .into_iter()
                .filter_map(move |(property, value)| {
                    Color::parse(&value).map(|color| ColorStyle {
                        element: label.clone(),
                        property,
                        color,
                    })
                })
        })
        .collect()
}

/// First color used by a painted element.
pub fn first_color(document: &SvgDocument) -> Option<Color> {
    document
        .elements()
        .iter()
        .filter(|element| !element.hidden)
        .flat_map(element_styles)
        .find_map(|(_, value)| Color::parse(&value))
}
