//! Top-level build error.

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::catalog::CatalogError;
use crate::extension::{ExtensionError, RegistryError};
use crate::options::{ConfigError, OptionValidationError};
use crate::pipeline::RunnerState;

/// Any fatal condition of a build; each maps to a non-zero exit.
#[derive(Debug)]
pub enum WebfontError {
    Configuration(ConfigError),
    Catalog(CatalogError),
    Registry(RegistryError),
    Extension(ExtensionError),
    /// A lifecycle phase was requested out of order.
    Lifecycle {
        expected: &'static str,
        actual: RunnerState,
    },
}

impl WebfontError {
    /// Help text requested on the command line, if this is that case.
    pub fn help_text(&self) -> Option<&str> {
        match self {
            Self::Configuration(ConfigError::DisplayHelp(text)) => Some(text),
            _ => None,
        }
    }
}

impl Display for WebfontError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(err) => write!(f, "{err}"),
            Self::Catalog(err) => write!(f, "{err}"),
            Self::Registry(err) => write!(f, "{err}"),
            Self::Extension(err) => write!(f, "{err}"),
            Self::Lifecycle { expected, actual } => {
                write!(f, "pipeline must be {expected}, but is {actual:?}")
            }
        }
    }
}

impl Error for WebfontError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Configuration(err) => Some(err),
            Self::Catalog(err) => Some(err),
            Self::Registry(err) => Some(err),
            Self::Extension(err) => Some(err),
            Self::Lifecycle { .. } => None,
        }
    }
}

impl From<ConfigError> for WebfontError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value)
    }
}

impl From<OptionValidationError> for WebfontError {
    fn from(value: OptionValidationError) -> Self {
        Self::Configuration(ConfigError::Option(value))
    }
}

impl From<CatalogError> for WebfontError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<RegistryError> for WebfontError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

impl From<ExtensionError> for WebfontError {
    fn from(value: ExtensionError) -> Self {
        Self::Extension(value)
    }
}

pub type WebfontResult<T> = Result<T, WebfontError>;
