//! Option schema shared by the core and extensions.
//!
//! # Responsibility
//! - Collect option declarations (name, short flag, kind, default, help).
//! - Parse raw command-line text and config-file YAML into `OptionValue`s.
//! - Render the merged schema as a `clap::Command`.
//!
//! # Invariants
//! - Option names are unique across the whole schema.
//! - Short flags are unique across the whole schema.

use std::collections::BTreeMap;

use clap::{Arg, ArgAction, Command};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{OptionValidationError, OptionValue};

static LIST_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s,]+").expect("valid list separator regex"));

/// Value shape accepted by one option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Boolean switch without value.
    Flag,
    Text,
    Integer,
    /// Comma/whitespace separated text or a YAML sequence.
    List,
    /// `key: a, b; key2: c` text or a YAML mapping.
    Mapping,
}

impl OptionKind {
    /// Parses one raw command-line value.
    pub fn parse_text(self, option: &str, raw: &str) -> Result<OptionValue, OptionValidationError> {
        match self {
            Self::Flag => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(OptionValue::Bool(true)),
                "false" | "no" | "0" | "off" => Ok(OptionValue::Bool(false)),
                _ => Err(invalid(option, raw, "expected a boolean")),
            },
            Self::Text => Ok(OptionValue::text(raw)),
            Self::Integer => raw
                .trim()
                .parse::<i64>()
                .map(OptionValue::Int)
                .map_err(|_| invalid(option, raw, "expected an integer")),
            Self::List => Ok(OptionValue::List(split_list(raw))),
            Self::Mapping => Ok(OptionValue::Mapping(parse_mapping(raw))),
        }
    }

    /// Converts one config-file value.
    pub fn parse_yaml(
        self,
        option: &str,
        value: &serde_yaml::Value,
    ) -> Result<OptionValue, OptionValidationError> {
        use serde_yaml::Value;

        match (self, value) {
            (_, Value::Null) => Ok(OptionValue::Null),
            (Self::Flag, Value::Bool(flag)) => Ok(OptionValue::Bool(*flag)),
            (Self::Integer, Value::Number(number)) => number
                .as_i64()
                .map(OptionValue::Int)
                .ok_or_else(|| invalid(option, &number.to_string(), "expected an integer")),
            (Self::Text, Value::Number(number)) => Ok(OptionValue::Text(number.to_string())),
            (Self::Text, Value::Bool(flag)) => Ok(OptionValue::Text(flag.to_string())),
            (Self::List, Value::Sequence(items)) => items
                .iter()
                .map(|item| yaml_scalar(option, item))
                .collect::<Result<Vec<_>, _>>()
                .map(OptionValue::List),
            (Self::Mapping, Value::Mapping(entries)) => {
                let mut map = BTreeMap::new();
                for (key, item) in entries {
                    let key = yaml_scalar(option, key)?;
                    let values = match item {
                        Value::Sequence(items) => items
                            .iter()
                            .map(|value| yaml_scalar(option, value))
                            .collect::<Result<Vec<_>, _>>()?,
                        other => split_list(&yaml_scalar(option, other)?),
                    };
                    map.insert(key, values);
                }
                Ok(OptionValue::Mapping(map))
            }
            (kind, Value::String(raw)) => kind.parse_text(option, raw),
            (_, other) => Err(invalid(
                option,
                &format!("{other:?}"),
                "unsupported value type",
            )),
        }
    }
}

/// Declaration of one accepted option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    /// Long name; also the configuration key and config-file key.
    pub name: String,
    pub short: Option<char>,
    pub kind: OptionKind,
    pub default: OptionValue,
    pub help: String,
}

impl OptionSpec {
    pub fn new(name: impl Into<String>, kind: OptionKind, help: impl Into<String>) -> Self {
        let default = match kind {
            OptionKind::Flag => OptionValue::Bool(false),
            _ => OptionValue::Null,
        };
        Self {
            name: name.into(),
            short: None,
            kind,
            default,
            help: help.into(),
        }
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn default_value(mut self, value: OptionValue) -> Self {
        self.default = value;
        self
    }

    pub fn default_text(self, value: &str) -> Self {
        self.default_value(OptionValue::text(value))
    }
}

/// Options declared by one contributor, rendered as one help section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionGroup {
    pub title: String,
    pub specs: Vec<OptionSpec>,
}

/// Schema builder handed to every `declare_options` hook.
#[derive(Debug, Clone, Default)]
pub struct OptionSchema {
    groups: Vec<OptionGroup>,
    current: usize,
}

impl OptionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or reopens) the help group used by following `add` calls.
    pub fn group(&mut self, title: &str) -> &mut Self {
        match self.groups.iter().position(|group| group.title == title) {
            Some(index) => self.current = index,
            None => {
                self.groups.push(OptionGroup {
                    title: title.to_string(),
                    specs: Vec::new(),
                });
                self.current = self.groups.len() - 1;
            }
        }
        self
    }

    /// Adds one option to the current group.
    pub fn add(&mut self, spec: OptionSpec) -> Result<&mut Self, OptionValidationError> {
        if self.spec(&spec.name).is_some() {
            return Err(OptionValidationError::Duplicate { option: spec.name });
        }
        if let Some(short) = spec.short {
            if self.specs().any(|other| other.short == Some(short)) {
                return Err(OptionValidationError::Duplicate {
                    option: format!("-{short}"),
                });
            }
        }
        if self.groups.is_empty() {
            self.group("options");
        }
        self.groups[self.current].specs.push(spec);
        Ok(self)
    }

    pub fn spec(&self, name: &str) -> Option<&OptionSpec> {
        self.specs().find(|spec| spec.name == name)
    }

    pub fn specs(&self) -> impl Iterator<Item = &OptionSpec> {
        self.groups.iter().flat_map(|group| group.specs.iter())
    }

    pub fn groups(&self) -> &[OptionGroup] {
        &self.groups
    }

    /// Renders the schema as a clap command.
    ///
    /// No clap-level defaults are set: layering owns defaults so that
    /// config-file values are not shadowed by unset flags.
    pub fn to_command(&self, name: &'static str, about: &'static str) -> Command {
        let mut command = Command::new(name).about(about);
        for group in &self.groups {
            for spec in &group.specs {
                let mut arg = Arg::new(spec.name.clone())
                    .long(spec.name.clone())
                    .help(spec.help.clone())
                    .help_heading(group.title.clone());
                if let Some(short) = spec.short {
                    arg = arg.short(short);
                }
                arg = match spec.kind {
                    OptionKind::Flag => arg.action(ArgAction::SetTrue),
                    _ => arg.action(ArgAction::Set).value_name("VALUE"),
                };
                command = command.arg(arg);
            }
        }
        command
    }
}

/// Splits `a, b c` style lists; empty pieces are dropped.
pub fn split_list(raw: &str) -> Vec<String> {
    LIST_SEPARATOR_RE
        .split(raw.trim())
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses `icon1: a, b; icon2: c` into a mapping.
pub fn parse_mapping(raw: &str) -> BTreeMap<String, Vec<String>> {
    raw.split(';')
        .filter_map(|entry| entry.split_once(':'))
        .map(|(key, values)| {
            let values = values
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .collect();
            (key.trim().to_string(), values)
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

fn yaml_scalar(option: &str, value: &serde_yaml::Value) -> Result<String, OptionValidationError> {
    use serde_yaml::Value;

    match value {
        Value::String(raw) => Ok(raw.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(invalid(option, &format!("{other:?}"), "expected a scalar")),
    }
}

fn invalid(option: &str, value: &str, reason: &str) -> OptionValidationError {
    OptionValidationError::Invalid {
        option: option.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_mapping, split_list, OptionKind, OptionSchema, OptionSpec};
    use crate::options::{OptionValidationError, OptionValue};

    #[test]
    fn splits_lists_on_commas_and_whitespace() {
        assert_eq!(split_list(" svg, font  css,,"), ["svg", "font", "css"]);
        assert!(split_list("   ").is_empty());
    }

    #[test]
    fn parses_alias_mapping_text() {
        let map = parse_mapping("smile: happy, joy; frown: sad; broken");
        assert_eq!(map.len(), 2);
        assert_eq!(map["smile"], ["happy", "joy"]);
        assert_eq!(map["frown"], ["sad"]);
    }

    #[test]
    fn integer_kind_rejects_text() {
        let err = OptionKind::Integer
            .parse_text("font-weight", "bold")
            .expect_err("non-numeric weight must fail");
        assert!(matches!(err, OptionValidationError::Invalid { .. }));
    }

    #[test]
    fn yaml_sequences_become_lists() {
        let value: serde_yaml::Value =
            serde_yaml::from_str("[otf, woff]").expect("valid yaml sequence");
        assert_eq!(
            OptionKind::List
                .parse_yaml("font-formats", &value)
                .expect("list value"),
            OptionValue::List(vec!["otf".to_string(), "woff".to_string()])
        );
    }

    #[test]
    fn yaml_mapping_values_accept_text_and_sequences() {
        let value: serde_yaml::Value =
            serde_yaml::from_str("{smile: 'happy, joy', frown: [sad]}").expect("valid yaml");
        let OptionValue::Mapping(map) = OptionKind::Mapping
            .parse_yaml("css-aliases", &value)
            .expect("mapping value")
        else {
            panic!("expected mapping");
        };
        assert_eq!(map["smile"], ["happy", "joy"]);
        assert_eq!(map["frown"], ["sad"]);
    }

    #[test]
    fn rejects_duplicate_names_and_short_flags() {
        let mut schema = OptionSchema::new();
        schema
            .add(OptionSpec::new("debug", OptionKind::Flag, "debug output").short('D'))
            .expect("first declaration");

        let err = schema
            .add(OptionSpec::new("debug", OptionKind::Flag, "again"))
            .expect_err("duplicate name must fail");
        assert!(matches!(err, OptionValidationError::Duplicate { .. }));

        let err = schema
            .add(OptionSpec::new("dry-run", OptionKind::Flag, "other").short('D'))
            .expect_err("duplicate short flag must fail");
        assert!(matches!(err, OptionValidationError::Duplicate { .. }));
    }

    #[test]
    fn groups_keep_declaration_order() {
        let mut schema = OptionSchema::new();
        schema.group("base");
        schema
            .add(OptionSpec::new("work-dir", OptionKind::Text, "root"))
            .expect("work-dir");
        schema.group("font generation options");
        schema
            .add(OptionSpec::new("font-family", OptionKind::Text, "family"))
            .expect("font-family");

        let titles: Vec<_> = schema.groups().iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, ["base", "font generation options"]);
        assert_eq!(
            schema.specs().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            ["work-dir", "font-family"]
        );
    }

    #[test]
    fn command_accepts_declared_options() {
        let mut schema = OptionSchema::new();
        schema
            .add(OptionSpec::new("font-family", OptionKind::Text, "family").short('n'))
            .expect("font-family");
        schema
            .add(OptionSpec::new("debug", OptionKind::Flag, "debug").short('D'))
            .expect("debug");

        let matches = schema
            .to_command("webfont", "test")
            .try_get_matches_from(["webfont", "-n", "Icons", "--debug"])
            .expect("declared options parse");
        assert_eq!(
            matches.get_one::<String>("font-family").map(String::as_str),
            Some("Icons")
        );
        assert!(matches.get_flag("debug"));
    }
}
