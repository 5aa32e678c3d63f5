//! Webfont builder core.
//!
//! Turns a folder of SVG icons into an icon font plus companion files.
//! The core scans icons, resolves the extensions they ask for, merges
//! options from every extension and drives the extension lifecycle.

pub mod catalog;
pub mod error;
pub mod extension;
pub mod extensions;
pub mod logging;
pub mod options;
pub mod pipeline;

pub use catalog::{check_unique, CatalogError, IconCatalog, IconRecord};
pub use error::{WebfontError, WebfontResult};
pub use extension::{
    Capability, Extension, ExtensionError, ExtensionRegistry, IconHandle, IconProcessingError,
    RegistryError, ResolvedExtensions, RunContext,
};
pub use logging::{init_logging, log_level, logging_status};
pub use options::{
    ConfigError, ConfigSources, Configuration, OptionSchema, OptionValidationError, OptionValue,
    OptionsAggregator,
};
pub use pipeline::{PipelineRunner, PreparedBuild, RunReport, RunnerState, WebfontBuild};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
