//! Font file output.
//!
//! The SVG font is written natively. Binary formats are produced by an
//! external converter reading that SVG font; EOT is produced from TTF.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::outline::{GlyphOutline, ASCENT, DESCENT, UNITS_PER_EM};

/// Every format the font extension can write.
pub const FORMATS: &[&str] = &["otf", "ttf", "eot", "woff", "svg", "sfd"];

const GENERATE_SCRIPT: &str =
    "Open($1); SelectAll(); RemoveOverlap(); CorrectDirection(); AutoHint(); Generate($2)";
const GENERATE_TTF_SCRIPT: &str = "Open($1); SelectAll(); RemoveOverlap(); CorrectDirection(); \
     ScaleToEm(2048); RoundToInt(); AutoHint(); Generate($2)";
const SAVE_SCRIPT: &str = "Open($1); Save($2)";

/// One glyph as attached to its icon.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub code: u32,
    pub name: String,
    pub glyph_name: String,
    pub outline: GlyphOutline,
}

/// Naming and output settings of one font.
#[derive(Debug, Clone)]
pub struct FontWriter {
    pub family: String,
    pub copyright: String,
    pub weight: i64,
    pub formats: Vec<String>,
    pub font_dir: PathBuf,
    pub sfd_dir: PathBuf,
    pub converter: String,
    pub ttf2eot: String,
}

impl FontWriter {
    fn wants(&self, format: &str) -> bool {
        self.formats.iter().any(|requested| requested == format)
    }

    fn font_path(&self, extension: &str) -> PathBuf {
        self.font_dir.join(format!("{}.{extension}", self.family))
    }

    /// Writes every requested format and returns the created files.
    pub fn write(&self, glyphs: &[Glyph]) -> Result<Vec<PathBuf>, FontWriteError> {
        create_dir(&self.font_dir)?;
        let svg_font = self.render_svg_font(glyphs)?;
        let mut written = Vec::new();

        let needs_converter = FORMATS
            .iter()
            .any(|format| *format != "svg" && self.wants(format));
        let scratch = tempfile::tempdir().map_err(|err| FontWriteError::Io {
            path: std::env::temp_dir(),
            reason: err.to_string(),
        })?;

        let source = if self.wants("svg") {
            let path = self.font_path("svg");
            write_file(&path, &svg_font)?;
            written.push(path.clone());
            path
        } else {
            scratch.path().join(format!("{}.svg", self.family))
        };
        if !needs_converter {
            return Ok(written);
        }
        if !source.exists() {
            write_file(&source, &svg_font)?;
        }

        for format in ["otf", "woff"] {
            if self.wants(format) {
                let target = self.font_path(format);
                self.convert(GENERATE_SCRIPT, &source, &target)?;
                written.push(target);
            }
        }
        if self.wants("sfd") {
            create_dir(&self.sfd_dir)?;
            let target = self.sfd_dir.join(format!("{}.sfd", self.family));
            self.convert(SAVE_SCRIPT, &source, &target)?;
            written.push(target);
        }
        if self.wants("ttf") || self.wants("eot") {
            let ttf = if self.wants("ttf") {
                self.font_path("ttf")
            } else {
                scratch.path().join(format!("{}.ttf", self.family))
            };
            self.convert(GENERATE_TTF_SCRIPT, &source, &ttf)?;
            if self.wants("ttf") {
                written.push(ttf.clone());
            }
            if self.wants("eot") {
                let eot = self.font_path("eot");
                self.ttf_to_eot(&ttf, &eot)?;
                written.push(eot);
            }
        }
        Ok(written)
    }

    /// SVG font document holding every glyph.
    pub fn render_svg_font(&self, glyphs: &[Glyph]) -> Result<String, FontWriteError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        let units = format_units(UNITS_PER_EM);

        let mut svg = BytesStart::new("svg");
        svg.push_attribute(("xmlns", "http://www.w3.org/2000/svg"));
        let mut font = BytesStart::new("font");
        font.push_attribute(("id", self.family.as_str()));
        font.push_attribute(("horiz-adv-x", units.as_str()));
        let mut face = BytesStart::new("font-face");
        face.push_attribute(("font-family", self.family.as_str()));
        face.push_attribute(("font-weight", self.weight.to_string().as_str()));
        face.push_attribute(("units-per-em", units.as_str()));
        face.push_attribute(("ascent", format_units(ASCENT).as_str()));
        face.push_attribute(("descent", format_units(-DESCENT).as_str()));
        let mut missing = BytesStart::new("missing-glyph");
        missing.push_attribute(("horiz-adv-x", units.as_str()));

        let mut events = vec![
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))),
            Event::Start(svg),
            Event::Start(BytesStart::new("metadata")),
            Event::Text(BytesText::new(&self.copyright)),
            Event::End(BytesEnd::new("metadata")),
            Event::Start(BytesStart::new("defs")),
            Event::Start(font),
            Event::Empty(face),
            Event::Empty(missing),
        ];
        for glyph in glyphs {
            let Some(unicode) = char::from_u32(glyph.code) else {
                continue;
            };
            let mut element = BytesStart::new("glyph");
            element.push_attribute(("glyph-name", glyph.glyph_name.as_str()));
            element.push_attribute(("unicode", unicode.to_string().as_str()));
            element.push_attribute(("horiz-adv-x", format_units(glyph.outline.advance).as_str()));
            if !glyph.outline.path.is_empty() {
                element.push_attribute(("d", glyph.outline.path.as_str()));
            }
            events.push(Event::Empty(element));
        }
        events.extend([
            Event::End(BytesEnd::new("font")),
            Event::End(BytesEnd::new("defs")),
            Event::End(BytesEnd::new("svg")),
        ]);

        for event in events {
            writer
                .write_event(event)
                .map_err(|err| FontWriteError::Xml(err.to_string()))?;
        }
        String::from_utf8(writer.into_inner()).map_err(|err| FontWriteError::Xml(err.to_string()))
    }

    fn convert(&self, script: &str, source: &Path, target: &Path) -> Result<(), FontWriteError> {
        let mut command = Command::new(&self.converter);
        command
            .args(["-lang=ff", "-c", script])
            .arg(source)
            .arg(target)
            .stdin(Stdio::null());
        run(&self.converter, command)?;
        info!(
            "event=font_written module=font status=ok file={}",
            target.display()
        );
        Ok(())
    }

    fn ttf_to_eot(&self, ttf: &Path, eot: &Path) -> Result<(), FontWriteError> {
        let input = File::open(ttf).map_err(|err| FontWriteError::Io {
            path: ttf.to_path_buf(),
            reason: err.to_string(),
        })?;
        let output = File::create(eot).map_err(|err| FontWriteError::Io {
            path: eot.to_path_buf(),
            reason: err.to_string(),
        })?;
        let mut command = Command::new(&self.ttf2eot);
        command.stdin(Stdio::from(input)).stdout(Stdio::from(output));
        run(&self.ttf2eot, command)?;
        info!(
            "event=font_written module=font status=ok file={}",
            eot.display()
        );
        Ok(())
    }
}

fn run(program: &str, mut command: Command) -> Result<(), FontWriteError> {
    debug!("event=converter_start module=font status=start program={program}");
    let output = command.output().map_err(|err| FontWriteError::Converter {
        program: program.to_string(),
        reason: err.to_string(),
    })?;
    if output.status.success() {
        Ok(())
    } else {
        Err(FontWriteError::Converter {
            program: program.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

fn create_dir(path: &Path) -> Result<(), FontWriteError> {
    fs::create_dir_all(path).map_err(|err| FontWriteError::Io {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), FontWriteError> {
    fs::write(path, contents).map_err(|err| FontWriteError::Io {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    info!(
        "event=font_written module=font status=ok file={}",
        path.display()
    );
    Ok(())
}

fn format_units(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

/// Font output failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontWriteError {
    Io { path: PathBuf, reason: String },
    Xml(String),
    Converter { program: String, reason: String },
}

impl Display for FontWriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, reason } => write!(f, "cannot write {}: {reason}", path.display()),
            Self::Xml(reason) => write!(f, "cannot render SVG font: {reason}"),
            Self::Converter { program, reason } => {
                write!(f, "font converter `{program}` failed: {reason}")
            }
        }
    }
}

impl Error for FontWriteError {}
