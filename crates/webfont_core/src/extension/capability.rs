//! Lifecycle capability declarations.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// One lifecycle hook an extension may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    DeclareOptions,
    NormalizeOptions,
    Init,
    Process,
    Finish,
}

impl Capability {
    /// Every hook, in lifecycle order.
    pub const ALL: [Capability; 5] = [
        Self::DeclareOptions,
        Self::NormalizeOptions,
        Self::Init,
        Self::Process,
        Self::Finish,
    ];

    /// Stable string id used in manifest declarations.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeclareOptions => CAPABILITY_DECLARE_OPTIONS,
            Self::NormalizeOptions => CAPABILITY_NORMALIZE_OPTIONS,
            Self::Init => CAPABILITY_INIT,
            Self::Process => CAPABILITY_PROCESS,
            Self::Finish => CAPABILITY_FINISH,
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub const CAPABILITY_DECLARE_OPTIONS: &str = "declare-options";
pub const CAPABILITY_NORMALIZE_OPTIONS: &str = "normalize-options";
pub const CAPABILITY_INIT: &str = "init";
pub const CAPABILITY_PROCESS: &str = "process";
pub const CAPABILITY_FINISH: &str = "finish";

/// Parses one capability from its manifest string value.
pub fn parse_capability(value: &str) -> Result<Capability, CapabilityError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(CapabilityError::EmptyCapability);
    }

    match normalized {
        CAPABILITY_DECLARE_OPTIONS => Ok(Capability::DeclareOptions),
        CAPABILITY_NORMALIZE_OPTIONS => Ok(Capability::NormalizeOptions),
        CAPABILITY_INIT => Ok(Capability::Init),
        CAPABILITY_PROCESS => Ok(Capability::Process),
        CAPABILITY_FINISH => Ok(Capability::Finish),
        other => Err(CapabilityError::UnsupportedCapability(other.to_string())),
    }
}

/// Capability parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    EmptyCapability,
    UnsupportedCapability(String),
}

impl Display for CapabilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCapability => write!(f, "capability value must not be empty"),
            Self::UnsupportedCapability(value) => {
                write!(f, "capability is unsupported: {value}")
            }
        }
    }
}

impl Error for CapabilityError {}
