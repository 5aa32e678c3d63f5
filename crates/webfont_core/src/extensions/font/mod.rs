//! `font` extension: turns parsed icons into glyphs and writes the font.
//!
//! # Responsibility
//! - Declare and normalize the font options (family, formats, outputs).
//! - Convert each icon's SVG geometry into a glyph outline.
//! - Write every requested font format once all icons are processed.
//!
//! # Invariants
//! - `font-formats` holds only known formats after normalization.
//! - Icons that failed here are absent from the font; the rest still ship.

pub mod outline;
pub mod writer;

use std::path::Path;

use log::{debug, info};

pub use outline::{glyph_outline, GlyphOutline, OutlineError};
pub use writer::{FontWriteError, FontWriter, Glyph, FORMATS};

use super::svg::{self, SvgDocument};
use crate::catalog::IconRecord;
use crate::extension::{
    Capability, Extension, ExtensionError, IconHandle, IconProcessingError, RunContext,
};
use crate::options::paths::resolve_option;
use crate::options::{
    base, Configuration, OptionKind, OptionSchema, OptionSpec, OptionValidationError, OptionValue,
};

pub const TAG: &str = "font";

pub const FONT_COPYRIGHT: &str = "font-copyright";
pub const FONT_FAMILY: &str = "font-family";
pub const FONT_WEIGHT: &str = "font-weight";
pub const FONT_FORMATS: &str = "font-formats";
pub const FONT_OUTPUT: &str = "font-output";
pub const SFD_OUTPUT: &str = "sfd-output";
pub const FONT_CONVERTER: &str = "font-converter";
pub const TTF2EOT: &str = "ttf2eot";

pub struct FontExtension;

impl Extension for FontExtension {
    fn tag(&self) -> &str {
        TAG
    }

    fn description(&self) -> &str {
        "builds the icon font"
    }

    fn requires(&self) -> Vec<&str> {
        vec![svg::TAG]
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::DeclareOptions,
            Capability::NormalizeOptions,
            Capability::Init,
            Capability::Process,
            Capability::Finish,
        ]
    }

    fn declare_options(&self, schema: &mut OptionSchema) -> Result<(), OptionValidationError> {
        schema.group("font generation options");
        schema
            .add(
                OptionSpec::new(FONT_COPYRIGHT, OptionKind::Text, "font copyright (default: \"OFL\")")
                    .short('l')
                    .default_text("OFL"),
            )?
            .add(
                OptionSpec::new(
                    FONT_FAMILY,
                    OptionKind::Text,
                    "font family (default: camel-cased work-dir)",
                )
                .short('n'),
            )?
            .add(
                OptionSpec::new(FONT_WEIGHT, OptionKind::Integer, "font weight (default: 500)")
                    .short('w')
                    .default_value(OptionValue::Int(500)),
            )?
            .add(
                OptionSpec::new(
                    FONT_FORMATS,
                    OptionKind::List,
                    "output font formats: otf, ttf, eot, woff, svg, sfd (default: \"all\")",
                )
                .short('f')
                .default_text("all"),
            )?
            .add(
                OptionSpec::new(
                    FONT_OUTPUT,
                    OptionKind::Text,
                    "fonts output folder (except .sfd) relative to output-dir (default: output-dir itself)",
                )
                .short('F')
                .default_text(""),
            )?
            .add(
                OptionSpec::new(
                    SFD_OUTPUT,
                    OptionKind::Text,
                    "SFD font output folder relative to work-dir (default: work-dir itself)",
                )
                .short('S')
                .default_text(""),
            )?
            .add(
                OptionSpec::new(
                    FONT_CONVERTER,
                    OptionKind::Text,
                    "fontforge executable used for otf, ttf, woff and sfd output",
                )
                .default_text("fontforge"),
            )?
            .add(
                OptionSpec::new(TTF2EOT, OptionKind::Text, "ttf2eot executable used for eot output")
                    .default_text("ttf2eot"),
            )?;
        Ok(())
    }

    fn normalize_options(&self, config: &mut Configuration) -> Result<(), OptionValidationError> {
        resolve_option(config, FONT_OUTPUT, base::OUTPUT_DIR)?;
        resolve_option(config, SFD_OUTPUT, base::WORK_DIR)?;

        let family = match config.text(FONT_FAMILY).map(str::trim) {
            Some(family) if !family.is_empty() => family.to_string(),
            _ => family_from_dir(&config.require_path(base::WORK_DIR)?),
        };
        config.set(FONT_FAMILY, OptionValue::text(family));

        let formats = normalize_formats(config.list(FONT_FORMATS))?;
        config.set(FONT_FORMATS, OptionValue::List(formats));

        if config.int(FONT_WEIGHT).is_none() {
            return Err(OptionValidationError::Missing {
                option: FONT_WEIGHT.to_string(),
            });
        }
        Ok(())
    }

    fn init(&self, cx: &mut RunContext<'_>, icons: &[IconRecord]) -> Result<(), ExtensionError> {
        let family = cx
            .config()
            .require_text(FONT_FAMILY)
            .map_err(|err| cx.failure(Capability::Init, err.to_string()))?
            .to_string();
        info!(
            "event=font_init module=font status=ok family={family} icons={}",
            icons.iter().filter(|icon| icon.requires(TAG)).count()
        );
        Ok(())
    }

    fn process(
        &self,
        icon: &mut IconHandle<'_>,
        cx: &mut RunContext<'_>,
    ) -> Result<(), IconProcessingError> {
        if glyph_char(icon.code()).is_none() {
            return Err(icon.fail(format!(
                "U+{:04X} cannot be written into a font",
                icon.code()
            )));
        }
        let document = icon
            .peer::<SvgDocument>(svg::TAG)
            .ok_or_else(|| icon.fail("no parsed SVG document"))?;
        let outline = glyph_outline(document.source().as_bytes())
            .map_err(|err| icon.fail(err.to_string()))?;
        if cx.debug() {
            debug!(
                "event=glyph_built module=font status=ok icon={} advance={}",
                icon.name(),
                outline.advance
            );
        }
        let glyph = Glyph {
            code: icon.code(),
            name: icon.name().to_string(),
            glyph_name: icon.record().glyph_name(),
            outline,
        };
        icon.attach(glyph);
        Ok(())
    }

    fn finish(&self, cx: &mut RunContext<'_>, icons: &[IconRecord]) -> Result<(), ExtensionError> {
        let glyphs: Vec<Glyph> = icons
            .iter()
            .filter_map(|icon| icon.attachment::<Glyph>(TAG))
            .cloned()
            .collect();
        let writer = font_writer(cx.config())
            .map_err(|err| cx.failure(Capability::Finish, err.to_string()))?;
        let written = writer
            .write(&glyphs)
            .map_err(|err| cx.failure(Capability::Finish, err.to_string()))?;
        info!(
            "event=font_done module=font status=ok family={} glyphs={} files={}",
            writer.family,
            glyphs.len(),
            written.len()
        );
        Ok(())
    }
}

/// Character for `code` if XML 1.0 can carry it in a `unicode` attribute.
pub fn glyph_char(code: u32) -> Option<char> {
    let unicode = char::from_u32(code)?;
    match unicode {
        '\t' | '\n' | '\r' => Some(unicode),
        '\u{0}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}' => None,
        _ => Some(unicode),
    }
}

/// Writer settings from a normalized configuration.
pub fn font_writer(config: &Configuration) -> Result<FontWriter, OptionValidationError> {
    Ok(FontWriter {
        family: config.require_text(FONT_FAMILY)?.to_string(),
        copyright: config.text(FONT_COPYRIGHT).unwrap_or_default().to_string(),
        weight: config.int(FONT_WEIGHT).unwrap_or(500),
        formats: config.list(FONT_FORMATS).to_vec(),
        font_dir: config.require_path(FONT_OUTPUT)?,
        sfd_dir: config.require_path(SFD_OUTPUT)?,
        converter: config.require_text(FONT_CONVERTER)?.to_string(),
        ttf2eot: config.require_text(TTF2EOT)?.to_string(),
    })
}

/// Camel-cases the last component of `dir`: `my_icons` becomes `MyIcons`.
///
/// Empty pieces become `_`.
pub fn family_from_dir(dir: &Path) -> String {
    let name = dir
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    name.split('_')
        .map(|piece| {
            let mut chars = piece.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => "_".to_string(),
            }
        })
        .collect()
}

/// Expands `all` and rejects unknown formats.
pub fn normalize_formats(requested: &[String]) -> Result<Vec<String>, OptionValidationError> {
    let mut formats: Vec<String> = Vec::new();
    for format in requested {
        let format = format.trim().to_ascii_lowercase();
        if format == "all" {
            formats.extend(FORMATS.iter().map(|format| format.to_string()));
        } else if FORMATS.contains(&format.as_str()) {
            formats.push(format);
        } else if !format.is_empty() {
            return Err(OptionValidationError::Invalid {
                option: FONT_FORMATS.to_string(),
                value: format,
                reason: format!("wrong output font format, expected one of {}", FORMATS.join(", ")),
            });
        }
    }
    let mut unique = Vec::with_capacity(formats.len());
    for format in formats {
        if !unique.contains(&format) {
            unique.push(format);
        }
    }
    Ok(unique)
}

#[cfg(test)]
mod tests {
    use super::{
        family_from_dir, glyph_char, normalize_formats, FontExtension, FONT_FAMILY, FONT_FORMATS,
        FONT_OUTPUT,
    };
    use crate::extension::Extension;
    use crate::options::{base, layers, OptionSchema, OptionValidationError, OptionValue};
    use std::path::Path;

    #[test]
    fn family_is_camel_cased_from_work_dir() {
        assert_eq!(family_from_dir(Path::new("/tmp/my_icon_set")), "MyIconSet");
        assert_eq!(family_from_dir(Path::new("/tmp/ICONS")), "Icons");
        assert_eq!(family_from_dir(Path::new("/tmp/a__b")), "A_B");
    }

    #[test]
    fn control_code_points_have_no_glyph_char() {
        assert_eq!(glyph_char(0x41), Some('A'));
        assert_eq!(glyph_char(0x0a), Some('\n'));
        assert_eq!(glyph_char(0xe001), Some('\u{e001}'));
        assert_eq!(glyph_char(0x07), None);
        assert_eq!(glyph_char(0x1f), None);
        assert_eq!(glyph_char(0xd800), None);
        assert_eq!(glyph_char(0xffff), None);
    }

    #[test]
    fn formats_expand_all_and_reject_unknown() {
        let all = normalize_formats(&["all".to_string()]).expect("all");
        assert_eq!(all, ["otf", "ttf", "eot", "woff", "svg", "sfd"]);
        let some = normalize_formats(&["svg".to_string(), "SVG".to_string(), "ttf".to_string()])
            .expect("subset");
        assert_eq!(some, ["svg", "ttf"]);
        let err = normalize_formats(&["png".to_string()]).expect_err("png");
        assert!(matches!(err, OptionValidationError::Invalid { ref value, .. } if value == "png"));
    }

    #[test]
    fn normalization_derives_family_and_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let work = dir.path().join("line_icons");
        std::fs::create_dir(&work).expect("work dir");

        let mut schema = OptionSchema::new();
        base::declare(&mut schema).expect("base");
        FontExtension.declare_options(&mut schema).expect("font options");
        let mut config = layers::defaults(&schema);
        config.set(base::WORK_DIR, OptionValue::text(work.to_string_lossy()));
        config.set(base::OUTPUT_DIR, OptionValue::text(work.join("out").to_string_lossy()));

        FontExtension.normalize_options(&mut config).expect("normalize");
        let first = config.clone();
        FontExtension.normalize_options(&mut config).expect("normalize again");

        assert_eq!(config, first);
        assert_eq!(config.text(FONT_FAMILY), Some("LineIcons"));
        assert_eq!(config.list(FONT_FORMATS).len(), 6);
        assert_eq!(
            config.text(FONT_OUTPUT).map(Path::new),
            Some(work.join("out").as_path())
        );
    }
}
