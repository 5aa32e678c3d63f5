//! Option values and the shared run configuration.
//!
//! # Responsibility
//! - Hold every option value of one build in a single ordered map.
//! - Offer typed accessors used by normalization and lifecycle hooks.
//!
//! # Invariants
//! - Keys are never removed, only added or overwritten.
//! - A key declared without default is present with `OptionValue::Null`.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use super::OptionValidationError;

/// One option value after layering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Declared but unset; normalization usually derives a value.
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
    /// Key to list of values, e.g. css aliases.
    Mapping(BTreeMap<String, Vec<String>>),
}

impl OptionValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Display for OptionValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
            Self::List(values) => write!(f, "{}", values.join(", ")),
            Self::Mapping(map) => {
                let parts = map
                    .iter()
                    .map(|(key, values)| format!("{key}: {}", values.join(", ")))
                    .collect::<Vec<_>>();
                write!(f, "{}", parts.join("; "))
            }
        }
    }
}

/// Shared option record read by the core and every extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    values: BTreeMap<String, OptionValue>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, option: &str) -> bool {
        self.values.contains_key(option)
    }

    pub fn get(&self, option: &str) -> Option<&OptionValue> {
        self.values.get(option)
    }

    /// Sets one option, overwriting any previous layer.
    pub fn set(&mut self, option: impl Into<String>, value: OptionValue) {
        self.values.insert(option.into(), value);
    }

    /// Iterates options in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Returns the text value, `None` for null or non-text values.
    pub fn text(&self, option: &str) -> Option<&str> {
        match self.values.get(option) {
            Some(OptionValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns the text value or a `Missing` error.
    pub fn require_text(&self, option: &str) -> Result<&str, OptionValidationError> {
        self.text(option)
            .ok_or_else(|| OptionValidationError::Missing {
                option: option.to_string(),
            })
    }

    /// Returns the text value as a path or a `Missing` error.
    pub fn require_path(&self, option: &str) -> Result<PathBuf, OptionValidationError> {
        self.require_text(option).map(PathBuf::from)
    }

    /// Flag value; null and absent options are `false`.
    pub fn flag(&self, option: &str) -> bool {
        matches!(self.values.get(option), Some(OptionValue::Bool(true)))
    }

    pub fn int(&self, option: &str) -> Option<i64> {
        match self.values.get(option) {
            Some(OptionValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// List value; a single text value is returned as a one-element slice.
    pub fn list(&self, option: &str) -> &[String] {
        match self.values.get(option) {
            Some(OptionValue::List(values)) => values.as_slice(),
            Some(OptionValue::Text(value)) => std::slice::from_ref(value),
            _ => &[],
        }
    }

    pub fn mapping(&self, option: &str) -> Option<&BTreeMap<String, Vec<String>>> {
        match self.values.get(option) {
            Some(OptionValue::Mapping(map)) => Some(map),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Configuration, OptionValue};
    use std::collections::BTreeMap;

    #[test]
    fn set_overwrites_but_never_drops_keys() {
        let mut config = Configuration::new();
        config.set("font-family", OptionValue::Null);
        config.set("font-family", OptionValue::text("Icons"));

        assert_eq!(config.len(), 1);
        assert_eq!(config.text("font-family"), Some("Icons"));
    }

    #[test]
    fn typed_accessors_reject_mismatched_values() {
        let mut config = Configuration::new();
        config.set("font-weight", OptionValue::Int(500));
        config.set("debug", OptionValue::Bool(true));

        assert_eq!(config.int("font-weight"), Some(500));
        assert_eq!(config.text("font-weight"), None);
        assert!(config.flag("debug"));
        assert!(!config.flag("missing"));
    }

    #[test]
    fn require_text_reports_missing_option() {
        let mut config = Configuration::new();
        config.set("css-file", OptionValue::Null);

        let err = config
            .require_text("css-file")
            .expect_err("null value is not text");
        assert!(err.to_string().contains("css-file"));
    }

    #[test]
    fn list_accepts_single_text_value() {
        let mut config = Configuration::new();
        config.set("font-formats", OptionValue::text("svg"));
        assert_eq!(config.list("font-formats"), ["svg".to_string()]);
    }

    #[test]
    fn mapping_displays_in_alias_syntax() {
        let mut map = BTreeMap::new();
        map.insert(
            "smile".to_string(),
            vec!["happy".to_string(), "joy".to_string()],
        );
        map.insert("frown".to_string(), vec!["sad".to_string()]);

        assert_eq!(
            OptionValue::Mapping(map).to_string(),
            "frown: sad; smile: happy, joy"
        );
    }
}
