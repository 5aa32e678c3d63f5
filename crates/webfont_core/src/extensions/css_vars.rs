//! `css-vars` extension: one stylesheet variable per icon class and
//! property, currently the icon's first color.

use std::path::Path;

use log::info;

use super::css::{self, CssClasses};
use super::font::FONT_FAMILY;
use super::svg::{self, first_color, SvgDocument};
use super::{write_output, GENERATED_HEADER};
use crate::catalog::IconRecord;
use crate::extension::{
    Capability, Extension, ExtensionError, IconHandle, IconProcessingError, RunContext,
};
use crate::options::paths::{resolve_option, resolve_under};
use crate::options::{
    base, Configuration, OptionKind, OptionSchema, OptionSpec, OptionValidationError, OptionValue,
};

pub const TAG: &str = "css-vars";

pub const CSS_VARS_OUTPUT: &str = "css-vars-output";
pub const CSS_VARS_FILE: &str = "css-vars-file";
pub const CSS_VARS_PREFIX: &str = "css-vars-prefix";
pub const CSS_VARS_PROPERTIES: &str = "css-vars-properties";

const SUPPORTED_PROPERTIES: &[&str] = &["color"];

/// Variables of one icon; `None` values are not written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CssVariables(pub Vec<(String, Option<String>)>);

pub struct CssVarsExtension;

impl Extension for CssVarsExtension {
    fn tag(&self) -> &str {
        TAG
    }

    fn description(&self) -> &str {
        "writes stylesheet variables with icon colors"
    }

    fn requires(&self) -> Vec<&str> {
        vec![css::TAG, svg::TAG]
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::DeclareOptions,
            Capability::NormalizeOptions,
            Capability::Process,
            Capability::Finish,
        ]
    }

    fn declare_options(&self, schema: &mut OptionSchema) -> Result<(), OptionValidationError> {
        schema.group("CSS variables generation options");
        schema
            .add(
                OptionSpec::new(
                    CSS_VARS_OUTPUT,
                    OptionKind::Text,
                    "css variables output folder relative to output-dir (default: output-dir itself)",
                )
                .default_text(""),
            )?
            .add(
                OptionSpec::new(
                    CSS_VARS_FILE,
                    OptionKind::Text,
                    "css variables file name (default: {font-family}_vars.css)",
                )
                .short('V'),
            )?
            .add(
                OptionSpec::new(
                    CSS_VARS_PREFIX,
                    OptionKind::Text,
                    "css variables prefix for individual icon classes (default: \"icon-\")",
                )
                .default_text("icon-"),
            )?
            .add(
                OptionSpec::new(
                    CSS_VARS_PROPERTIES,
                    OptionKind::List,
                    "icon properties to create variables for; only \"color\" is supported (default: \"color\")",
                )
                .default_text("color"),
            )?;
        Ok(())
    }

    fn normalize_options(&self, config: &mut Configuration) -> Result<(), OptionValidationError> {
        resolve_option(config, CSS_VARS_OUTPUT, base::OUTPUT_DIR)?;
        let file = match config.text(CSS_VARS_FILE) {
            Some(file) if !file.trim().is_empty() => file.trim().to_string(),
            _ => format!("{}_vars.css", config.require_text(FONT_FAMILY)?),
        };
        let file = resolve_under(&config.require_path(CSS_VARS_OUTPUT)?, Path::new(&file));
        config.set(CSS_VARS_FILE, OptionValue::text(file.to_string_lossy()));

        if config.text(CSS_VARS_PREFIX).is_none() {
            config.set(CSS_VARS_PREFIX, OptionValue::text("icon-"));
        }

        let properties = config.list(CSS_VARS_PROPERTIES).to_vec();
        for property in &properties {
            if !SUPPORTED_PROPERTIES.contains(&property.as_str()) {
                return Err(OptionValidationError::Invalid {
                    option: CSS_VARS_PROPERTIES.to_string(),
                    value: property.clone(),
                    reason: format!("supported properties: {}", SUPPORTED_PROPERTIES.join(", ")),
                });
            }
        }
        config.set(CSS_VARS_PROPERTIES, OptionValue::List(properties));
        Ok(())
    }

    fn process(
        &self,
        icon: &mut IconHandle<'_>,
        cx: &mut RunContext<'_>,
    ) -> Result<(), IconProcessingError> {
        let classes = icon
            .peer::<CssClasses>(css::TAG)
            .ok_or_else(|| icon.fail("no css classes for this icon"))?;
        let document = icon
            .peer::<SvgDocument>(svg::TAG)
            .ok_or_else(|| icon.fail("no parsed SVG document"))?;

        let config = cx.config();
        let prefix = config.text(CSS_VARS_PREFIX).unwrap_or_default();
        let mut variables = CssVariables::default();
        for name in &classes.names {
            for property in config.list(CSS_VARS_PROPERTIES) {
                let value = match property.as_str() {
                    "color" => first_color(document).map(|color| color.web()),
                    _ => None,
                };
                variables.0.push((format!("{prefix}{name}-{property}"), value));
            }
        }
        icon.attach(variables);
        Ok(())
    }

    fn finish(&self, cx: &mut RunContext<'_>, icons: &[IconRecord]) -> Result<(), ExtensionError> {
        let text = render(icons);
        let path = cx
            .config()
            .require_path(CSS_VARS_FILE)
            .map_err(|err| cx.failure(Capability::Finish, err.to_string()))?;
        write_output(&path, &text).map_err(|err| cx.failure(Capability::Finish, err))?;
        info!(
            "event=css_vars_written module=css_vars status=ok file={}",
            path.display()
        );
        Ok(())
    }
}

/// `$name: value;` lines in icon order, skipping variables without value.
pub fn render(icons: &[IconRecord]) -> String {
    let mut text = String::new();
    text.push_str(GENERATED_HEADER);
    text.push_str("\n\n");
    for variables in icons
        .iter()
        .filter_map(|icon| icon.attachment::<CssVariables>(TAG))
    {
        for (name, value) in &variables.0 {
            if let Some(value) = value {
                text.push_str(&format!("${name}: {value};\n"));
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::{CssVarsExtension, CSS_VARS_FILE, CSS_VARS_PROPERTIES};
    use crate::extension::Extension;
    use crate::extensions::font::FONT_FAMILY;
    use crate::options::{base, layers, OptionSchema, OptionValidationError, OptionValue};

    fn config(dir: &std::path::Path) -> crate::options::Configuration {
        let mut schema = OptionSchema::new();
        base::declare(&mut schema).expect("base");
        CssVarsExtension.declare_options(&mut schema).expect("css-vars");
        let mut config = layers::defaults(&schema);
        config.set(base::OUTPUT_DIR, OptionValue::text(dir.to_string_lossy()));
        config.set(FONT_FAMILY, OptionValue::text("LineIcons"));
        config
    }

    #[test]
    fn file_defaults_to_family_vars_css() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = config(dir.path());
        CssVarsExtension.normalize_options(&mut config).expect("normalize");
        assert_eq!(
            config.text(CSS_VARS_FILE).map(std::path::PathBuf::from),
            Some(dir.path().join("LineIcons_vars.css"))
        );
        assert_eq!(config.list(CSS_VARS_PROPERTIES), ["color"]);
    }

    #[test]
    fn unsupported_property_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = config(dir.path());
        config.set(CSS_VARS_PROPERTIES, OptionValue::List(vec!["size".to_string()]));
        let err = CssVarsExtension
            .normalize_options(&mut config)
            .expect_err("size is not supported");
        assert!(matches!(err, OptionValidationError::Invalid { ref value, .. } if value == "size"));
    }
}
