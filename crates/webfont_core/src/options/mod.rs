//! Layered configuration and the options-merging protocol.
//!
//! Built-in defaults, an optional YAML config file and command-line flags are
//! merged into one `Configuration`. Extensions extend the schema before
//! parsing and normalize the result afterwards (see `aggregate`).

pub mod aggregate;
pub mod base;
pub mod layers;
pub mod paths;
pub mod schema;
pub mod value;

pub use aggregate::OptionsAggregator;
pub use layers::{ConfigSources, LayeredOptions};
pub use schema::{OptionGroup, OptionKind, OptionSchema, OptionSpec};
pub use value::{Configuration, OptionValue};

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Where a rejected option value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
    CommandLine,
    ConfigFile,
}

impl Display for OptionSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CommandLine => write!(f, "command line"),
            Self::ConfigFile => write!(f, "config file"),
        }
    }
}

/// A user-supplied or derived option value is not acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValidationError {
    Unknown {
        option: String,
        source: OptionSource,
    },
    Invalid {
        option: String,
        value: String,
        reason: String,
    },
    Missing {
        option: String,
    },
    Duplicate {
        option: String,
    },
}

impl Display for OptionValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown { option, source } => {
                write!(f, "unrecognized option `{option}` in {source}")
            }
            Self::Invalid {
                option,
                value,
                reason,
            } => write!(f, "invalid value `{value}` for option `{option}`: {reason}"),
            Self::Missing { option } => write!(f, "option `{option}` has no value"),
            Self::Duplicate { option } => write!(f, "option `{option}` is declared twice"),
        }
    }
}

impl Error for OptionValidationError {}

/// Fatal configuration failures; all of them abort before any extension runs.
#[derive(Debug)]
pub enum ConfigError {
    MissingDirectory { role: &'static str, path: PathBuf },
    ConfigFile { path: PathBuf, reason: String },
    CommandLine(String),
    /// Help or usage text was requested; not a failure for the caller.
    DisplayHelp(String),
    Option(OptionValidationError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDirectory { role, path } => {
                write!(f, "{role} directory {} doesn't exist", path.display())
            }
            Self::ConfigFile { path, reason } => {
                write!(f, "cannot read config file {}: {reason}", path.display())
            }
            Self::CommandLine(message) => write!(f, "{message}"),
            Self::DisplayHelp(text) => write!(f, "{text}"),
            Self::Option(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Option(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OptionValidationError> for ConfigError {
    fn from(value: OptionValidationError) -> Self {
        Self::Option(value)
    }
}
