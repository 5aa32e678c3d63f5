//! Two-pass options merging across resolved extensions.
//!
//! # Responsibility
//! - declare-options pass: base options, then every extension's options.
//! - normalize-options pass: base normalization, then every extension's
//!   normalization, in execution order.
//!
//! # Invariants
//! - Each normalization sees the already-normalized output of earlier ones.
//! - Running `normalize` again on its own output changes nothing.

use std::path::Path;

use log::debug;

use super::{base, ConfigError, Configuration, OptionSchema, OptionValidationError};
use crate::extension::{Capability, Extension, ResolvedExtensions};

/// Drives both option passes for one run.
pub struct OptionsAggregator<'a> {
    extensions: &'a ResolvedExtensions,
}

impl<'a> OptionsAggregator<'a> {
    pub fn new(extensions: &'a ResolvedExtensions) -> Self {
        Self { extensions }
    }

    /// Base schema extended by every resolved extension.
    pub fn schema(&self) -> Result<OptionSchema, OptionValidationError> {
        declare_all(
            self.extensions
                .with_capability(Capability::DeclareOptions)
                .map(|entry| entry.extension.as_ref()),
        )
    }

    /// Normalizes base options, then each extension in execution order.
    pub fn normalize(&self, config: &mut Configuration, cwd: &Path) -> Result<(), ConfigError> {
        base::normalize(config, cwd)?;
        for entry in self.extensions.with_capability(Capability::NormalizeOptions) {
            entry.extension.normalize_options(config)?;
            debug!(
                "event=options_normalized module=options status=ok extension={}",
                entry.tag
            );
        }
        Ok(())
    }
}

/// Base schema extended by `extensions` that declare options.
pub fn declare_all<'e>(
    extensions: impl IntoIterator<Item = &'e dyn Extension>,
) -> Result<OptionSchema, OptionValidationError> {
    let mut schema = OptionSchema::new();
    base::declare(&mut schema)?;
    for extension in extensions {
        if extension
            .capabilities()
            .contains(&Capability::DeclareOptions)
        {
            extension.declare_options(&mut schema)?;
        }
    }
    Ok(schema)
}
