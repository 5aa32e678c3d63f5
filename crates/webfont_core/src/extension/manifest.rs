//! Project-local extension manifests.
//!
//! A project can ship `extensions/<tag>.yml` next to its icons. The manifest
//! names the tag, its version and peer requirements, and may declare extra
//! options and the hooks it takes part in. Manifest-backed extensions never
//! process icons themselves; they exist so that tags used in file names
//! resolve and so that their options are accepted.

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::api::Extension;
use super::capability::{parse_capability, Capability, CapabilityError};
use crate::options::{OptionKind, OptionSchema, OptionSpec, OptionValidationError};

/// Declarative extension manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionManifest {
    /// Tag this manifest provides, e.g. `bold`.
    pub tag: String,
    /// Manifest semantic version string (`major.minor.patch`).
    pub version: String,
    #[serde(default)]
    pub description: String,
    /// Sibling tags that must be resolved in the same run.
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub options: Vec<ManifestOption>,
    /// Hook names such as `declare-options`; inferred from `options` when empty.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// One option declared by a manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestOption {
    pub name: String,
    #[serde(default)]
    pub short: Option<char>,
    #[serde(default)]
    pub kind: ManifestOptionKind,
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
    #[serde(default)]
    pub help: String,
}

/// Manifest spelling of `OptionKind`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestOptionKind {
    Flag,
    #[default]
    Text,
    Integer,
    List,
    Mapping,
}

impl From<ManifestOptionKind> for OptionKind {
    fn from(value: ManifestOptionKind) -> Self {
        match value {
            ManifestOptionKind::Flag => OptionKind::Flag,
            ManifestOptionKind::Text => OptionKind::Text,
            ManifestOptionKind::Integer => OptionKind::Integer,
            ManifestOptionKind::List => OptionKind::List,
            ManifestOptionKind::Mapping => OptionKind::Mapping,
        }
    }
}

impl ExtensionManifest {
    /// Parses YAML manifest text.
    pub fn from_yaml(text: &str) -> Result<Self, String> {
        serde_yaml::from_str(text).map_err(|err| err.to_string())
    }

    /// Reads and validates a manifest file whose stem must equal its tag.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path).map_err(|err| err.to_string())?;
        let manifest = Self::from_yaml(&text)?;
        manifest.validate().map_err(|err| err.to_string())?;
        let stem = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("");
        if stem != manifest.tag {
            return Err(ManifestValidationError::TagMismatch {
                file_stem: stem.to_string(),
                tag: manifest.tag,
            }
            .to_string());
        }
        Ok(manifest)
    }

    /// Validates declaration-level manifest invariants.
    pub fn validate(&self) -> Result<(), ManifestValidationError> {
        if self.tag.trim().is_empty() {
            return Err(ManifestValidationError::EmptyTag);
        }
        if !is_valid_tag(&self.tag) {
            return Err(ManifestValidationError::InvalidTag(self.tag.clone()));
        }

        if self.version.trim().is_empty() {
            return Err(ManifestValidationError::EmptyVersion);
        }
        if !is_semver_triplet(self.version.trim()) {
            return Err(ManifestValidationError::InvalidVersion(
                self.version.clone(),
            ));
        }

        let mut seen = BTreeSet::new();
        for requirement in &self.requires {
            if !is_valid_tag(requirement) {
                return Err(ManifestValidationError::InvalidRequirement(
                    requirement.clone(),
                ));
            }
            if requirement == &self.tag {
                return Err(ManifestValidationError::SelfRequirement(self.tag.clone()));
            }
            if !seen.insert(requirement.as_str()) {
                return Err(ManifestValidationError::DuplicateRequirement(
                    requirement.clone(),
                ));
            }
        }

        let mut seen = BTreeSet::new();
        for option in &self.options {
            if !is_valid_tag(&option.name) {
                return Err(ManifestValidationError::InvalidOptionName(
                    option.name.clone(),
                ));
            }
            if !seen.insert(option.name.as_str()) {
                return Err(ManifestValidationError::DuplicateOption(
                    option.name.clone(),
                ));
            }
        }

        self.declared_capabilities().map(|_| ())
    }

    /// Hooks this manifest takes part in.
    ///
    /// An empty `capabilities` list means `declare-options` when options are
    /// declared and nothing otherwise.
    pub fn declared_capabilities(&self) -> Result<Vec<Capability>, ManifestValidationError> {
        if self.capabilities.is_empty() {
            return Ok(if self.options.is_empty() {
                Vec::new()
            } else {
                vec![Capability::DeclareOptions]
            });
        }

        let mut declared = Vec::with_capacity(self.capabilities.len());
        for value in &self.capabilities {
            let capability = parse_capability(value).map_err(ManifestValidationError::Capability)?;
            if declared.contains(&capability) {
                return Err(ManifestValidationError::DuplicateCapability(capability));
            }
            declared.push(capability);
        }
        if !self.options.is_empty() && !declared.contains(&Capability::DeclareOptions) {
            return Err(ManifestValidationError::UndeclaredOptions(self.tag.clone()));
        }
        Ok(declared)
    }
}

/// Extension backed by a validated manifest.
#[derive(Debug, Clone)]
pub struct DeclaredExtension {
    manifest: ExtensionManifest,
    capabilities: Vec<Capability>,
}

impl DeclaredExtension {
    pub fn new(manifest: ExtensionManifest) -> Result<Self, ManifestValidationError> {
        let capabilities = manifest.declared_capabilities()?;
        Ok(Self {
            manifest,
            capabilities,
        })
    }

    pub fn manifest(&self) -> &ExtensionManifest {
        &self.manifest
    }
}

impl Extension for DeclaredExtension {
    fn tag(&self) -> &str {
        &self.manifest.tag
    }

    fn version(&self) -> &str {
        &self.manifest.version
    }

    fn description(&self) -> &str {
        &self.manifest.description
    }

    fn requires(&self) -> Vec<&str> {
        self.manifest.requires.iter().map(String::as_str).collect()
    }

    fn capabilities(&self) -> Vec<Capability> {
        self.capabilities.clone()
    }

    fn declare_options(&self, schema: &mut OptionSchema) -> Result<(), OptionValidationError> {
        schema.group(&format!("{} extension options", self.manifest.tag));
        for option in &self.manifest.options {
            let kind = OptionKind::from(option.kind);
            let mut spec = OptionSpec::new(option.name.clone(), kind, option.help.clone());
            if let Some(short) = option.short {
                spec = spec.short(short);
            }
            if let Some(default) = &option.default {
                spec = spec.default_value(kind.parse_yaml(&option.name, default)?);
            }
            schema.add(spec)?;
        }
        Ok(())
    }
}

/// Tags are lowercase words joined by single hyphens, e.g. `css-vars`.
pub fn is_valid_tag(value: &str) -> bool {
    let mut chars = value.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if !first.is_ascii_lowercase() {
        return false;
    }

    let mut prev_separator = false;
    for c in chars {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            prev_separator = false;
            continue;
        }
        if c == '-' {
            if prev_separator {
                return false;
            }
            prev_separator = true;
            continue;
        }
        return false;
    }
    !prev_separator
}

fn is_semver_triplet(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    if parts.len() != 3 {
        return false;
    }
    parts
        .iter()
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

/// Manifest validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestValidationError {
    EmptyTag,
    InvalidTag(String),
    TagMismatch { file_stem: String, tag: String },
    EmptyVersion,
    InvalidVersion(String),
    InvalidRequirement(String),
    SelfRequirement(String),
    DuplicateRequirement(String),
    InvalidOptionName(String),
    DuplicateOption(String),
    Capability(CapabilityError),
    DuplicateCapability(Capability),
    UndeclaredOptions(String),
}

impl Display for ManifestValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTag => write!(f, "manifest tag must not be empty"),
            Self::InvalidTag(value) => write!(f, "manifest tag is invalid: {value}"),
            Self::TagMismatch { file_stem, tag } => write!(
                f,
                "manifest file `{file_stem}` declares a different tag: {tag}"
            ),
            Self::EmptyVersion => write!(f, "manifest version must not be empty"),
            Self::InvalidVersion(value) => write!(
                f,
                "manifest version is invalid: {value} (expected major.minor.patch)"
            ),
            Self::InvalidRequirement(value) => {
                write!(f, "manifest requirement is invalid: {value}")
            }
            Self::SelfRequirement(value) => write!(f, "manifest {value} requires itself"),
            Self::DuplicateRequirement(value) => {
                write!(f, "manifest requirement is duplicated: {value}")
            }
            Self::InvalidOptionName(value) => write!(f, "manifest option name is invalid: {value}"),
            Self::DuplicateOption(value) => write!(f, "manifest option is duplicated: {value}"),
            Self::Capability(err) => write!(f, "manifest capability is invalid: {err}"),
            Self::DuplicateCapability(value) => {
                write!(f, "manifest capability is duplicated: {value}")
            }
            Self::UndeclaredOptions(value) => write!(
                f,
                "manifest {value} declares options but not the declare-options capability"
            ),
        }
    }
}

impl Error for ManifestValidationError {}
