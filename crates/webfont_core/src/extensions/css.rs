//! `css` extension: stylesheet with one class per icon.

use std::path::Path;

use log::info;

use super::font::{self, FONT_FAMILY, FONT_FORMATS};
use super::{write_output, GENERATED_HEADER};
use crate::catalog::IconRecord;
use crate::extension::{
    Capability, Extension, ExtensionError, IconHandle, IconProcessingError, RunContext,
};
use crate::options::paths::{resolve_option, resolve_under};
use crate::options::{
    base, Configuration, OptionKind, OptionSchema, OptionSpec, OptionValidationError, OptionValue,
};

pub const TAG: &str = "css";

pub const CSS_OUTPUT: &str = "css-output";
pub const CSS_FILE: &str = "css-file";
pub const CSS_CLASS: &str = "css-class";
pub const CSS_PREFIX: &str = "css-prefix";
pub const CSS_FONT_URL: &str = "css-font-url";
pub const CSS_ALIASES: &str = "css-aliases";

const FONT_NAME_PLACEHOLDER: &str = "{fontname}";

/// `@font-face` sources in the order browsers should try them.
const FONT_SOURCES: &[(&str, &str)] = &[
    ("woff", "woff"),
    ("eot", "embedded-opentype"),
    ("otf", "opentype"),
    ("ttf", "truetype"),
    ("svg", "svg"),
];

const MAIN_CLASS: &str = "  display: inline-block;
  font-family: \"{family}\";
  font-style: normal;
  font-weight: normal;
  line-height: 1;
  -webkit-font-smoothing: antialiased;
  -moz-osx-font-smoothing: grayscale;";

/// Class names of one icon, attached for peers such as `css-vars`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssClasses {
    pub code: u32,
    /// Icon name first, then its aliases; without prefix.
    pub names: Vec<String>,
}

pub struct CssExtension;

impl Extension for CssExtension {
    fn tag(&self) -> &str {
        TAG
    }

    fn description(&self) -> &str {
        "writes a stylesheet for the icon font"
    }

    fn requires(&self) -> Vec<&str> {
        vec![font::TAG]
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
        schema.group("CSS generation options");
        schema
            .add(
                OptionSpec::new(
                    CSS_OUTPUT,
                    OptionKind::Text,
                    "css output folder relative to output-dir (default: output-dir itself)",
                )
                .default_text(""),
            )?
            .add(
                OptionSpec::new(
                    CSS_FILE,
                    OptionKind::Text,
                    "css file name (default: font-family with .css extension)",
                )
                .short('C'),
            )?
            .add(OptionSpec::new(
                CSS_CLASS,
                OptionKind::Text,
                "css class for all icons (default: composed from capital letters of font-family)",
            ))?
            .add(OptionSpec::new(
                CSS_PREFIX,
                OptionKind::Text,
                "css prefix for individual icon classes (default: css-class and \"-\")",
            ))?
            .add(
                OptionSpec::new(
                    CSS_FONT_URL,
                    OptionKind::Text,
                    "font url template, use {fontname} placeholder for font file name (default: \"url(/fonts/{fontname})\")",
                )
                .default_text("url(/fonts/{fontname})"),
            )?
            .add(OptionSpec::new(
                CSS_ALIASES,
                OptionKind::Mapping,
                "css classes aliases in form \"icon1: alias1, alias2; icon2: other-alias1\" (default: no aliases)",
            ))?;
        Ok(())
    }

    fn normalize_options(&self, config: &mut Configuration) -> Result<(), OptionValidationError> {
        resolve_option(config, CSS_OUTPUT, base::OUTPUT_DIR)?;
        let family = config.require_text(FONT_FAMILY)?.to_string();

        let file = match config.text(CSS_FILE) {
            Some(file) if !file.trim().is_empty() => file.trim().to_string(),
            _ => format!("{family}.css"),
        };
        let file = resolve_under(&config.require_path(CSS_OUTPUT)?, Path::new(&file));
        config.set(CSS_FILE, OptionValue::text(file.to_string_lossy()));

        let class = match config.text(CSS_CLASS) {
            Some(class) if !class.trim().is_empty() => class.trim().to_string(),
            _ => default_class(&family),
        };
        if config.text(CSS_PREFIX).is_none() {
            config.set(CSS_PREFIX, OptionValue::text(format!("{class}-")));
        }
        config.set(CSS_CLASS, OptionValue::text(class));

        if config.mapping(CSS_ALIASES).is_none() {
            config.set(CSS_ALIASES, OptionValue::Mapping(Default::default()));
        }
        Ok(())
    }

    fn process(
        &self,
        icon: &mut IconHandle<'_>,
        cx: &mut RunContext<'_>,
    ) -> Result<(), IconProcessingError> {
        let classes = CssClasses {
            code: icon.code(),
            names: class_names(cx.config(), icon.name()),
        };
        icon.attach(classes);
        Ok(())
    }

    fn finish(&self, cx: &mut RunContext<'_>, icons: &[IconRecord]) -> Result<(), ExtensionError> {
        let config = cx.config();
        let stylesheet =
            render(config, icons).map_err(|err| cx.failure(Capability::Finish, err.to_string()))?;
        let path = config
            .require_path(CSS_FILE)
            .map_err(|err| cx.failure(Capability::Finish, err.to_string()))?;
        write_output(&path, &stylesheet).map_err(|err| cx.failure(Capability::Finish, err))?;
        info!(
            "event=css_written module=css status=ok file={} icons={}",
            path.display(),
            icons.iter().filter(|icon| icon.has_attachment(TAG)).count()
        );
        Ok(())
    }
}

/// Lowercased capitals of `family`; the whole family lowercased when it
/// has no capitals.
pub fn default_class(family: &str) -> String {
    let capitals: String = family
        .chars()
        .filter(char::is_ascii_uppercase)
        .collect::<String>()
        .to_lowercase();
    if capitals.is_empty() {
        family.to_lowercase()
    } else {
        capitals
    }
}

/// `icon_name` followed by its configured aliases.
pub fn class_names(config: &Configuration, icon_name: &str) -> Vec<String> {
    let mut names = vec![icon_name.to_string()];
    if let Some(aliases) = config.mapping(CSS_ALIASES).and_then(|map| map.get(icon_name)) {
        names.extend(aliases.iter().cloned());
    }
    names
}

/// Full stylesheet for the icons processed by this extension.
pub fn render(config: &Configuration, icons: &[IconRecord]) -> Result<String, OptionValidationError> {
    let family = config.require_text(FONT_FAMILY)?;
    let class = config.require_text(CSS_CLASS)?;
    let prefix = config.require_text(CSS_PREFIX)?;
    let url = config.require_text(CSS_FONT_URL)?;
    let formats = config.list(FONT_FORMATS);

    let mut css = String::new();
    css.push_str(GENERATED_HEADER);
    css.push_str("\n\n@font-face {\n");
    css.push_str(&format!("  font-family: \"{family}\";\n"));

    let sources: Vec<String> = FONT_SOURCES
        .iter()
        .filter(|(extension, _)| formats.iter().any(|format| format == extension))
        .map(|(extension, kind)| {
            let file = match *extension {
                "eot" => format!("{family}.eot?#iefix"),
                "svg" => format!("{family}.svg#{family}"),
                other => format!("{family}.{other}"),
            };
            format!("{} format('{kind}')", url.replace(FONT_NAME_PLACEHOLDER, &file))
        })
        .collect();
    if !sources.is_empty() {
        css.push_str(&format!("  src: {};\n", sources.join(",\n       ")));
    }
    css.push_str("}\n\n");

    css.push_str(&format!(
        ".{class} {{\n{}\n}}\n\n",
        MAIN_CLASS.replace("{family}", family)
    ));

    let mut rules: Vec<&CssClasses> = icons
        .iter()
        .filter_map(|icon| icon.attachment::<CssClasses>(TAG))
        .collect();
    rules.sort_by(|left, right| left.names[0].cmp(&right.names[0]));
    for rule in rules {
        let selectors: Vec<String> = rule
            .names
            .iter()
            .map(|name| format!(".{prefix}{name}:before"))
            .collect();
        css.push_str(&format!(
            "{} {{ content: \"\\{:04x}\"; }}\n",
            selectors.join(", "),
            rule.code
        ));
    }
    Ok(css)
}

#[cfg(test)]
mod tests {
    use super::{
        class_names, default_class, render, CssClasses, CSS_ALIASES, CSS_CLASS, CSS_FONT_URL,
        CSS_PREFIX, TAG,
    };
    use crate::catalog::IconRecord;
    use crate::extensions::font::{FONT_FAMILY, FONT_FORMATS};
    use crate::options::{schema::parse_mapping, Configuration, OptionValue};

    #[test]
    fn class_defaults_to_lowercased_capitals() {
        assert_eq!(default_class("LineIcons"), "li");
        assert_eq!(default_class("icons"), "icons");
    }

    #[test]
    fn aliases_follow_the_icon_name() {
        let mut config = Configuration::new();
        config.set(
            CSS_ALIASES,
            OptionValue::Mapping(parse_mapping("smile: happy, joy; frown: sad")),
        );
        assert_eq!(class_names(&config, "smile"), ["smile", "happy", "joy"]);
        assert_eq!(class_names(&config, "wink"), ["wink"]);
    }

    #[test]
    fn stylesheet_lists_sources_then_one_rule_per_icon() {
        let mut config = Configuration::new();
        config.set(FONT_FAMILY, OptionValue::text("MyIcons"));
        config.set(FONT_FORMATS, OptionValue::List(vec!["svg".into(), "woff".into()]));
        config.set(CSS_CLASS, OptionValue::text("mi"));
        config.set(CSS_PREFIX, OptionValue::text("mi-"));
        config.set(CSS_FONT_URL, OptionValue::text("url(/fonts/{fontname})"));

        let mut smile = IconRecord::new("uni0041_smile.svg", 0x41, "smile");
        smile.attach(
            TAG,
            Box::new(CssClasses {
                code: 0x41,
                names: vec!["smile".into(), "happy".into()],
            }),
        );
        let mut arrow = IconRecord::new("uni0042_arrow.svg", 0xe001, "arrow");
        arrow.attach(
            TAG,
            Box::new(CssClasses {
                code: 0xe001,
                names: vec!["arrow".into()],
            }),
        );

        let css = render(&config, &[smile, arrow]).expect("render stylesheet");
        assert!(css.contains(
            "  font-family: \"MyIcons\";\n  src: url(/fonts/MyIcons.woff) format('woff'),\n       url(/fonts/MyIcons.svg#MyIcons) format('svg');\n}\n"
        ));
        assert!(css.contains(".mi {\n  display: inline-block;"));
        let rules: Vec<&str> = css.lines().filter(|line| line.contains(":before")).collect();
        assert_eq!(
            rules,
            [
                ".mi-arrow:before { content: \"\\e001\"; }",
                ".mi-smile:before, .mi-happy:before { content: \"\\0041\"; }",
            ]
        );
        assert!(css.ends_with("; }\n"));
    }
}
