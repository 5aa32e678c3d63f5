//! Extension contract and the typed context handed to lifecycle hooks.
//!
//! # Responsibility
//! - Define the `Extension` trait implemented by built-in and project-local
//!   extensions.
//! - Give each hook typed access to its own run state and icon attachments,
//!   and read-only access to the state of declared peers.
//!
//! # Invariants
//! - An extension writes only the slots keyed by its own tag.
//! - Peer state and attachments are readable only for tags in `requires()`.
//! - The configuration is read-only once lifecycle hooks run.

use std::any::Any;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

use indexmap::IndexSet;
use log::warn;

use super::capability::Capability;
use super::registry::{ResolvedExtension, ResolvedExtensions};
use crate::catalog::IconRecord;
use crate::options::{base, Configuration, OptionSchema, OptionValidationError};

/// One unit of the build pipeline, identified by its tag.
///
/// All hooks default to no-ops; `capabilities` tells the runner which ones
/// are worth calling. An extension with no capabilities is legal and inert.
pub trait Extension {
    /// Tag used in icon file names and the `extensions` option.
    fn tag(&self) -> &str;

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        ""
    }

    /// Sibling tags that must be resolved in the same run.
    fn requires(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Hooks this extension implements.
    fn capabilities(&self) -> Vec<Capability>;

    /// Registers accepted options before user values are parsed.
    fn declare_options(&self, _schema: &mut OptionSchema) -> Result<(), OptionValidationError> {
        Ok(())
    }

    /// Derives computed defaults and resolves paths; must be idempotent.
    fn normalize_options(&self, _config: &mut Configuration) -> Result<(), OptionValidationError> {
        Ok(())
    }

    fn init(&self, _cx: &mut RunContext<'_>, _icons: &[IconRecord]) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Handles one icon. Errors skip only this icon's contribution.
    fn process(
        &self,
        _icon: &mut IconHandle<'_>,
        _cx: &mut RunContext<'_>,
    ) -> Result<(), IconProcessingError> {
        Ok(())
    }

    fn finish(&self, _cx: &mut RunContext<'_>, _icons: &[IconRecord]) -> Result<(), ExtensionError> {
        Ok(())
    }
}

/// Per-run state slots, one per extension tag.
#[derive(Default)]
pub struct StateStore {
    slots: BTreeMap<String, Box<dyn Any>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// State stored by extension `tag`, if it has the requested type.
    pub fn get<T: Any>(&self, tag: &str) -> Option<&T> {
        self.slots.get(tag).and_then(|slot| slot.downcast_ref::<T>())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.slots.contains_key(tag)
    }

    fn slot_mut<T: Any + Default>(&mut self, tag: &str) -> &mut T {
        let slot = self
            .slots
            .entry(tag.to_string())
            .or_insert_with(|| Box::new(T::default()));
        if !slot.is::<T>() {
            *slot = Box::new(T::default());
        }
        slot.downcast_mut::<T>()
            .expect("state slot was just set to the requested type")
    }
}

/// Context for one hook invocation of one extension.
pub struct RunContext<'a> {
    entry: &'a ResolvedExtension,
    config: &'a Configuration,
    extensions: &'a ResolvedExtensions,
    states: &'a mut StateStore,
}

impl<'a> RunContext<'a> {
    pub(crate) fn new(
        entry: &'a ResolvedExtension,
        config: &'a Configuration,
        extensions: &'a ResolvedExtensions,
        states: &'a mut StateStore,
    ) -> Self {
        Self {
            entry,
            config,
            extensions,
            states,
        }
    }

    /// Tag of the extension being invoked.
    pub fn tag(&self) -> &str {
        &self.entry.tag
    }

    pub fn config(&self) -> &Configuration {
        self.config
    }

    /// Every extension resolved for this run.
    pub fn extensions(&self) -> &ResolvedExtensions {
        self.extensions
    }

    pub fn debug(&self) -> bool {
        self.config.flag(base::DEBUG)
    }

    /// Own run state, created with `Default` on first access.
    pub fn state_mut<T: Any + Default>(&mut self) -> &mut T {
        self.states.slot_mut::<T>(&self.entry.tag)
    }

    pub fn state<T: Any>(&self) -> Option<&T> {
        self.states.get::<T>(&self.entry.tag)
    }

    /// Run state of a declared peer.
    pub fn peer_state<T: Any>(&self, tag: &str) -> Option<&T> {
        if !self.entry.may_read(tag) {
            warn!(
                "event=peer_access_denied module=extension status=error extension={} peer={tag}",
                self.entry.tag
            );
            return None;
        }
        self.states.get::<T>(tag)
    }

    pub fn failure(&self, phase: Capability, message: impl Into<String>) -> ExtensionError {
        ExtensionError::new(self.tag(), phase, message)
    }
}

/// Mutable view of one icon for one extension's `process` call.
pub struct IconHandle<'a> {
    record: &'a mut IconRecord,
    entry: &'a ResolvedExtension,
}

impl<'a> IconHandle<'a> {
    pub(crate) fn new(record: &'a mut IconRecord, entry: &'a ResolvedExtension) -> Self {
        Self { record, entry }
    }

    pub fn record(&self) -> &IconRecord {
        self.record
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn code(&self) -> u32 {
        self.record.code
    }

    pub fn file(&self) -> &Path {
        &self.record.file
    }

    pub fn tags(&self) -> &IndexSet<String> {
        &self.record.tags
    }

    /// Attaches this extension's derived value, replacing a previous one.
    pub fn attach<T: Any>(&mut self, value: T) {
        self.record.attach(&self.entry.tag, Box::new(value));
    }

    /// Value previously attached by this extension.
    pub fn own<T: Any>(&self) -> Option<&T> {
        self.record.attachment::<T>(&self.entry.tag)
    }

    /// Value attached by a declared peer earlier in this icon's dispatch.
    pub fn peer<T: Any>(&self, tag: &str) -> Option<&T> {
        if !self.entry.may_read(tag) {
            warn!(
                "event=peer_access_denied module=extension status=error extension={} peer={tag} icon={}",
                self.entry.tag, self.record.name
            );
            return None;
        }
        self.record.attachment::<T>(tag)
    }

    /// Builds the recoverable error for this icon and extension.
    pub fn fail(&self, reason: impl Into<String>) -> IconProcessingError {
        IconProcessingError {
            icon: self.record.name.clone(),
            extension: self.entry.tag.clone(),
            reason: reason.into(),
        }
    }
}

/// Fatal failure raised by an `init` or `finish` hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionError {
    pub tag: String,
    pub phase: Capability,
    pub message: String,
}

impl ExtensionError {
    pub fn new(tag: impl Into<String>, phase: Capability, message: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            phase,
            message: message.into(),
        }
    }
}

impl Display for ExtensionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} extension failed during {}: {}",
            self.tag, self.phase, self.message
        )
    }
}

impl Error for ExtensionError {}

/// Recoverable per-icon failure; the run continues without this contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconProcessingError {
    pub icon: String,
    pub extension: String,
    pub reason: String,
}

impl Display for IconProcessingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "error processing icon \"{}\" in {} extension: {}",
            self.icon, self.extension, self.reason
        )
    }
}

impl Error for IconProcessingError {}

#[cfg(test)]
mod tests {
    use super::StateStore;

    #[derive(Debug, Default, PartialEq)]
    struct Counter(u32);

    #[test]
    fn slot_is_created_with_default_and_kept() {
        let mut store = StateStore::new();
        store.slot_mut::<Counter>("css").0 += 2;
        store.slot_mut::<Counter>("css").0 += 1;
        assert_eq!(store.get::<Counter>("css"), Some(&Counter(3)));
        assert!(store.get::<Counter>("font").is_none());
    }

    #[test]
    fn slot_with_other_type_is_replaced() {
        let mut store = StateStore::new();
        store.slot_mut::<String>("css").push_str("x");
        assert_eq!(store.slot_mut::<Counter>("css"), &mut Counter(0));
        assert!(store.get::<String>("css").is_none());
    }
}
