//! `svg` extension: parses every icon into an [`SvgDocument`].
//!
//! # Responsibility
//! - Read the icon file once and attach the parsed document for peers.
//! - Report unreadable or malformed icons as recoverable failures.
//!
//! # Invariants
//! - `width` and `height` are in pixels and positive.
//! - Elements are kept in document order.

pub mod styles;

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub use styles::{collect_styles, color_styles, first_color, Color, ColorStyle, STYLES};

use crate::extension::{Capability, Extension, IconHandle, IconProcessingError, RunContext};

pub const TAG: &str = "svg";

/// Pixels per point, as used by SVG user agents.
const PX_PER_PT: f64 = 1.25;

/// Containers whose content is never painted directly.
const NON_RENDERING: &[&str] = &[
    "defs",
    "clipPath",
    "mask",
    "pattern",
    "symbol",
    "marker",
    "linearGradient",
    "radialGradient",
    "filter",
    "metadata",
    "title",
    "desc",
];

pub struct SvgExtension;

impl Extension for SvgExtension {
    fn tag(&self) -> &str {
        TAG
    }

    fn description(&self) -> &str {
        "parses SVG icon sources"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Process]
    }

    fn process(
        &self,
        icon: &mut IconHandle<'_>,
        cx: &mut RunContext<'_>,
    ) -> Result<(), IconProcessingError> {
        if cx.debug() {
            debug!(
                "event=svg_open module=svg status=start icon={} file={}",
                icon.name(),
                icon.file().display()
            );
        }
        let document = SvgDocument::load(icon.file()).map_err(|err| icon.fail(err.to_string()))?;
        icon.attach(document);
        Ok(())
    }
}

/// `viewBox` attribute of the root element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub fn parse(raw: &str) -> Option<Self> {
        let numbers = raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|piece| !piece.is_empty())
            .map(|piece| piece.parse::<f64>().ok())
            .collect::<Option<Vec<_>>>()?;
        match numbers.as_slice() {
            [min_x, min_y, width, height] if *width > 0.0 && *height > 0.0 => Some(Self {
                min_x: *min_x,
                min_y: *min_y,
                width: *width,
                height: *height,
            }),
            _ => None,
        }
    }
}

/// One element with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgElement {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    /// Inside a container that is not painted (`defs`, `clipPath`, ...).
    pub hidden: bool,
}

impl SvgElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    /// Numeric attribute in user units; missing or malformed is `None`.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.attribute(name).and_then(parse_length)
    }
}

/// Parsed icon source.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    pub width: f64,
    pub height: f64,
    pub view_box: Option<ViewBox>,
    elements: Vec<SvgElement>,
    source: String,
}

impl SvgDocument {
    pub fn load(path: &Path) -> Result<Self, SvgError> {
        let text = fs::read_to_string(path).map_err(|err| SvgError::Read(err.to_string()))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, SvgError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut elements = Vec::new();
        // Open elements as (name, hidden).
        let mut stack: Vec<(String, bool)> = Vec::new();
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(Event::Start(start)) => {
                    let element = read_element(&start, &stack)?;
                    let hidden = element.hidden || NON_RENDERING.contains(&element.name.as_str());
                    stack.push((element.name.clone(), hidden));
                    elements.push(element);
                }
                Ok(Event::Empty(empty)) => {
                    elements.push(read_element(&empty, &stack)?);
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(_) => {}
                Err(err) => {
                    return Err(SvgError::Xml(format!(
                        "{err} at byte {}",
                        reader.buffer_position()
                    )))
                }
            }
        }
        if !stack.is_empty() {
            return Err(SvgError::Xml("unexpected end of document".to_string()));
        }

        let root = elements.first().ok_or(SvgError::MissingRoot)?;
        if root.name != "svg" {
            return Err(SvgError::NotSvg(root.name.clone()));
        }
        let view_box = root.attribute("viewBox").and_then(ViewBox::parse);
        let width = root_length(root, "width", view_box.map(|view_box| view_box.width))?;
        let height = root_length(root, "height", view_box.map(|view_box| view_box.height))?;

        Ok(Self {
            width,
            height,
            view_box,
            elements,
            source: text.to_string(),
        })
    }

    /// All elements in document order, the root first.
    pub fn elements(&self) -> &[SvgElement] {
        &self.elements
    }

    pub fn root(&self) -> &SvgElement {
        &self.elements[0]
    }

    pub fn find(&self, id: &str) -> Option<&SvgElement> {
        self.elements.iter().find(|element| element.id() == Some(id))
    }

    /// Document text as read from the icon file.
    pub fn source(&self) -> &str {
        &self.source
    }
}

fn read_element(start: &BytesStart<'_>, stack: &[(String, bool)]) -> Result<SvgElement, SvgError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).to_string();
    let mut attributes = BTreeMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| SvgError::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| SvgError::Xml(err.to_string()))?
            .to_string();
        attributes.insert(key, value);
    }
    Ok(SvgElement {
        name,
        attributes,
        hidden: stack.last().map(|(_, hidden)| *hidden).unwrap_or(false),
    })
}

fn root_length(root: &SvgElement, name: &str, fallback: Option<f64>) -> Result<f64, SvgError> {
    let value = match root.attribute(name) {
        Some(raw) if raw.trim().ends_with('%') => fallback,
        Some(raw) => Some(parse_length(raw).ok_or_else(|| SvgError::InvalidLength {
            attribute: name.to_string(),
            value: raw.to_string(),
        })?),
        None => fallback,
    };
    match value {
        Some(value) if value > 0.0 => Ok(value),
        Some(value) => Err(SvgError::InvalidLength {
            attribute: name.to_string(),
            value: value.to_string(),
        }),
        None => Err(SvgError::MissingSize(name.to_string())),
    }
}

/// Parses a length in px (default unit) or pt.
pub fn parse_length(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let (number, factor) = if let Some(number) = raw.strip_suffix("px") {
        (number, 1.0)
    } else if let Some(number) = raw.strip_suffix("pt") {
        (number, PX_PER_PT)
    } else {
        (raw, 1.0)
    };
    number.trim().parse::<f64>().ok().map(|value| value * factor)
}

/// Icon source cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SvgError {
    Read(String),
    Xml(String),
    MissingRoot,
    NotSvg(String),
    MissingSize(String),
    InvalidLength { attribute: String, value: String },
}

impl Display for SvgError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read(reason) => write!(f, "cannot read SVG file: {reason}"),
            Self::Xml(reason) => write!(f, "invalid SVG: {reason}"),
            Self::MissingRoot => write!(f, "invalid SVG: document is empty"),
            Self::NotSvg(name) => write!(f, "invalid SVG: root element is <{name}>"),
            Self::MissingSize(name) => {
                write!(f, "invalid SVG: no {name} and no viewBox to derive it from")
            }
            Self::InvalidLength { attribute, value } => {
                write!(f, "invalid SVG: unsupported {attribute} `{value}`")
            }
        }
    }
}

impl Error for SvgError {}

#[cfg(test)]
mod tests {
    use super::{parse_length, SvgDocument, SvgError, ViewBox};

    const SQUARE: &str = r##"<?xml version="1.0"?>
<svg xmlns="http://www.w3.org/2000/svg" width="24pt" height="24pt" viewBox="0 0 100 100">
  <defs><clipPath id="clip"><rect width="10" height="10"/></clipPath></defs>
  <g id="layer"><rect id="box" x="10" y="10" width="80" height="80" fill="#f00"/></g>
</svg>"##;

    #[test]
    fn parses_size_view_box_and_elements() {
        let document = SvgDocument::parse(SQUARE).expect("square parses");
        assert_eq!(document.width, 30.0);
        assert_eq!(document.height, 30.0);
        assert_eq!(
            document.view_box,
            Some(ViewBox {
                min_x: 0.0,
                min_y: 0.0,
                width: 100.0,
                height: 100.0
            })
        );
        let names: Vec<_> = document.elements().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["svg", "defs", "clipPath", "rect", "g", "rect"]);
        assert!(document.elements()[3].hidden);
        assert!(!document.find("box").expect("box").hidden);
    }

    #[test]
    fn size_falls_back_to_view_box() {
        let document =
            SvgDocument::parse(r#"<svg viewBox="0 0 16 32"></svg>"#).expect("view box only");
        assert_eq!((document.width, document.height), (16.0, 32.0));
    }

    #[test]
    fn rejects_non_svg_and_missing_size() {
        assert_eq!(
            SvgDocument::parse("<html/>").unwrap_err(),
            SvgError::NotSvg("html".to_string())
        );
        assert_eq!(
            SvgDocument::parse(r#"<svg width="10"/>"#).unwrap_err(),
            SvgError::MissingSize("height".to_string())
        );
        assert!(matches!(
            SvgDocument::parse("<svg width='1' height='1'><g></svg>").unwrap_err(),
            SvgError::Xml(_)
        ));
    }

    #[test]
    fn lengths_accept_px_and_pt() {
        assert_eq!(parse_length("12px"), Some(12.0));
        assert_eq!(parse_length(" 8pt "), Some(10.0));
        assert_eq!(parse_length("3.5"), Some(3.5));
        assert_eq!(parse_length("2em"), None);
    }
}
