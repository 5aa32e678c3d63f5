//! Extension registry and tag resolution.
//!
//! # Responsibility
//! - Hold the statically linked built-in extensions.
//! - Resolve required tags to extensions, project-local manifests first.
//! - Check declared peer requirements once and fix the execution order.
//!
//! # Invariants
//! - At most one extension per tag, both in the registry and after resolution.
//! - Resolution fails on the first unknown tag; nothing partial is returned.
//! - Execution order is topological over `requires`, ties broken by the order
//!   in which tags were first discovered.

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexSet;
use log::{debug, error, info};

use super::api::Extension;
use super::capability::Capability;
use super::manifest::{is_valid_tag, DeclaredExtension, ExtensionManifest};
use crate::catalog::IconRecord;
use crate::extensions;

/// Folder under the working directory searched for project-local manifests.
pub const LOCAL_EXTENSIONS_DIR: &str = "extensions";

/// Where a resolved extension came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionOrigin {
    Builtin,
    ProjectLocal(PathBuf),
}

/// One extension selected for this run.
#[derive(Clone)]
pub struct ResolvedExtension {
    pub tag: String,
    pub origin: ExtensionOrigin,
    pub requires: Vec<String>,
    pub capabilities: BTreeSet<Capability>,
    pub extension: Arc<dyn Extension>,
}

impl ResolvedExtension {
    fn new(extension: Arc<dyn Extension>, origin: ExtensionOrigin) -> Self {
        Self {
            tag: extension.tag().to_string(),
            origin,
            requires: extension.requires().into_iter().map(str::to_string).collect(),
            capabilities: extension.capabilities().into_iter().collect(),
            extension,
        }
    }

    pub fn implements(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Own tag or a declared requirement.
    pub fn may_read(&self, tag: &str) -> bool {
        self.tag == tag || self.requires.iter().any(|required| required == tag)
    }
}

impl std::fmt::Debug for ResolvedExtension {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedExtension")
            .field("tag", &self.tag)
            .field("origin", &self.origin)
            .field("requires", &self.requires)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Extensions of one run, in execution order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedExtensions {
    entries: Vec<ResolvedExtension>,
}

impl ResolvedExtensions {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, tag: &str) -> Option<&ResolvedExtension> {
        self.entries.iter().find(|entry| entry.tag == tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedExtension> {
        self.entries.iter()
    }

    /// Tags in execution order.
    pub fn tags(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.tag.as_str()).collect()
    }

    /// Extensions implementing `capability`, in execution order.
    pub fn with_capability(
        &self,
        capability: Capability,
    ) -> impl Iterator<Item = &ResolvedExtension> {
        self.entries
            .iter()
            .filter(move |entry| entry.implements(capability))
    }

    /// Extensions that process `icon`, in execution order.
    pub fn for_icon(&self, icon: &IconRecord) -> Vec<&ResolvedExtension> {
        self.with_capability(Capability::Process)
            .filter(|entry| icon.requires(&entry.tag))
            .collect()
    }
}

/// Registry of available extensions.
#[derive(Default)]
pub struct ExtensionRegistry {
    builtins: BTreeMap<String, Arc<dyn Extension>>,
    local_dir: Option<PathBuf>,
}

impl ExtensionRegistry {
    /// Empty registry without built-ins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in extension.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for extension in extensions::builtins() {
            if let Err(err) = registry.register(extension) {
                error!("event=builtin_register module=extension status=error error={err}");
                debug_assert!(false, "built-in extension rejected: {err}");
            }
        }
        registry
    }

    /// Enables project-local manifests from `dir`.
    pub fn with_local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_dir = Some(dir.into());
        self
    }

    pub fn local_dir(&self) -> Option<&Path> {
        self.local_dir.as_deref()
    }

    /// Registers one statically linked extension.
    pub fn register(&mut self, extension: Arc<dyn Extension>) -> Result<(), RegistryError> {
        let tag = extension.tag().trim().to_string();
        if !is_valid_tag(&tag) {
            return Err(RegistryError::InvalidTag(tag));
        }
        if self.builtins.contains_key(tag.as_str()) {
            return Err(RegistryError::DuplicateTag(tag));
        }
        self.builtins.insert(tag, extension);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.builtins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builtins.is_empty()
    }

    pub fn get(&self, tag: &str) -> Option<&Arc<dyn Extension>> {
        self.builtins.get(tag)
    }

    /// Registered extensions, sorted by tag.
    pub fn builtins(&self) -> impl Iterator<Item = &Arc<dyn Extension>> {
        self.builtins.values()
    }

    /// Resolves every distinct tag, in discovery order.
    pub fn resolve<I, S>(&self, tags: I) -> Result<ResolvedExtensions, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags: IndexSet<String> = tags
            .into_iter()
            .map(|tag| tag.as_ref().to_string())
            .collect();

        let mut discovered = Vec::with_capacity(tags.len());
        for tag in &tags {
            discovered.push(self.resolve_one(tag)?);
        }
        check_requirements(&discovered)?;
        let entries = execution_order(discovered)?;

        info!(
            "event=extensions_resolved module=extension status=ok order={}",
            entries
                .iter()
                .map(|entry| entry.tag.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );
        Ok(ResolvedExtensions { entries })
    }

    fn resolve_one(&self, tag: &str) -> Result<ResolvedExtension, RegistryError> {
        if let Some(path) = self.local_manifest_path(tag) {
            let invalid = |reason: String| RegistryError::InvalidManifest {
                path: path.clone(),
                reason,
            };
            let manifest = ExtensionManifest::load(&path).map_err(invalid)?;
            let extension =
                DeclaredExtension::new(manifest).map_err(|err| invalid(err.to_string()))?;
            debug!(
                "event=extension_loaded module=extension status=ok tag={tag} origin=local path={}",
                path.display()
            );
            return Ok(ResolvedExtension::new(
                Arc::new(extension),
                ExtensionOrigin::ProjectLocal(path),
            ));
        }
        match self.builtins.get(tag) {
            Some(extension) => {
                debug!("event=extension_loaded module=extension status=ok tag={tag} origin=builtin");
                Ok(ResolvedExtension::new(
                    Arc::clone(extension),
                    ExtensionOrigin::Builtin,
                ))
            }
            None => Err(RegistryError::UnknownExtension(tag.to_string())),
        }
    }

    fn local_manifest_path(&self, tag: &str) -> Option<PathBuf> {
        let dir = self.local_dir.as_ref()?;
        if !is_valid_tag(tag) {
            return None;
        }
        ["yml", "yaml"]
            .iter()
            .map(|extension| dir.join(format!("{tag}.{extension}")))
            .find(|path| path.is_file())
    }
}

/// Union of the default tags and every icon's tags, in discovery order.
pub fn required_tags(default_tags: &[String], icons: &[IconRecord]) -> IndexSet<String> {
    let mut tags: IndexSet<String> = default_tags.iter().cloned().collect();
    for icon in icons {
        tags.extend(icon.tags.iter().cloned());
    }
    tags
}

fn check_requirements(entries: &[ResolvedExtension]) -> Result<(), RegistryError> {
    for entry in entries {
        for required in &entry.requires {
            if !entries.iter().any(|other| &other.tag == required) {
                return Err(RegistryError::PeerDependency {
                    extension: entry.tag.clone(),
                    missing: required.clone(),
                });
            }
        }
    }
    Ok(())
}

fn execution_order(
    discovered: Vec<ResolvedExtension>,
) -> Result<Vec<ResolvedExtension>, RegistryError> {
    let index_of = |tag: &str| discovered.iter().position(|entry| entry.tag == tag);

    let mut pending: Vec<usize> = discovered.iter().map(|entry| entry.requires.len()).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); discovered.len()];
    for (index, entry) in discovered.iter().enumerate() {
        for required in &entry.requires {
            if let Some(required) = index_of(required) {
                dependents[required].push(index);
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..discovered.len())
        .filter(|index| pending[*index] == 0)
        .collect();
    let mut order = Vec::with_capacity(discovered.len());
    while let Some(index) = ready.pop_first() {
        order.push(index);
        for dependent in &dependents[index] {
            pending[*dependent] -= 1;
            if pending[*dependent] == 0 {
                ready.insert(*dependent);
            }
        }
    }

    if order.len() < discovered.len() {
        let cycle = discovered
            .iter()
            .enumerate()
            .filter(|(index, _)| !order.contains(index))
            .map(|(_, entry)| entry.tag.clone())
            .collect();
        return Err(RegistryError::DependencyCycle(cycle));
    }

    let mut slots: Vec<Option<ResolvedExtension>> = discovered.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect())
}

/// Registration and resolution errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidTag(String),
    DuplicateTag(String),
    UnknownExtension(String),
    InvalidManifest { path: PathBuf, reason: String },
    PeerDependency { extension: String, missing: String },
    DependencyCycle(Vec<String>),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTag(value) => write!(f, "extension tag is invalid: {value}"),
            Self::DuplicateTag(value) => write!(f, "extension tag already registered: {value}"),
            Self::UnknownExtension(value) => write!(f, "unknown extension: {value}"),
            Self::InvalidManifest { path, reason } => {
                write!(f, "invalid extension manifest {}: {reason}", path.display())
            }
            Self::PeerDependency { extension, missing } => {
                write!(f, "{extension} extension requires {missing} extension")
            }
            Self::DependencyCycle(tags) => {
                write!(f, "extension requirements form a cycle: {}", tags.join(", "))
            }
        }
    }
}

impl Error for RegistryError {}

#[cfg(test)]
mod tests {
    use super::{required_tags, ExtensionRegistry, RegistryError};
    use crate::catalog::IconRecord;
    use crate::extension::{Capability, Extension};
    use std::sync::Arc;

    struct Stub {
        tag: &'static str,
        requires: Vec<&'static str>,
    }

    impl Extension for Stub {
        fn tag(&self) -> &str {
            self.tag
        }

        fn requires(&self) -> Vec<&str> {
            self.requires.clone()
        }

        fn capabilities(&self) -> Vec<Capability> {
            vec![Capability::Process]
        }
    }

    fn stub(tag: &'static str, requires: &[&'static str]) -> Arc<dyn Extension> {
        Arc::new(Stub {
            tag,
            requires: requires.to_vec(),
        })
    }

    fn registry(stubs: Vec<Arc<dyn Extension>>) -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new();
        for extension in stubs {
            registry.register(extension).expect("register stub");
        }
        registry
    }

    #[test]
    fn rejects_duplicate_and_invalid_tags() {
        let mut registry = registry(vec![stub("svg", &[])]);
        assert_eq!(
            registry.register(stub("svg", &[])).unwrap_err(),
            RegistryError::DuplicateTag("svg".to_string())
        );
        assert!(matches!(
            registry.register(stub("Svg", &[])).unwrap_err(),
            RegistryError::InvalidTag(_)
        ));
    }

    #[test]
    fn requirements_run_before_dependents() {
        let registry = registry(vec![
            stub("css", &["font"]),
            stub("font", &["svg"]),
            stub("svg", &[]),
        ]);
        let resolved = registry
            .resolve(["css", "font", "svg"])
            .expect("resolve chain");
        assert_eq!(resolved.tags(), ["svg", "font", "css"]);
    }

    #[test]
    fn independent_tags_keep_discovery_order() {
        let registry = registry(vec![stub("b", &[]), stub("a", &[]), stub("c", &["a"])]);
        let resolved = registry.resolve(["b", "c", "a"]).expect("resolve");
        assert_eq!(resolved.tags(), ["b", "a", "c"]);
    }

    #[test]
    fn missing_peer_is_reported_before_init() {
        let registry = registry(vec![stub("css", &["font"]), stub("font", &[])]);
        let err = registry.resolve(["css"]).expect_err("font not requested");
        assert_eq!(
            err,
            RegistryError::PeerDependency {
                extension: "css".to_string(),
                missing: "font".to_string(),
            }
        );
    }

    #[test]
    fn cycles_are_fatal() {
        let registry = registry(vec![stub("a", &["b"]), stub("b", &["a"])]);
        let err = registry.resolve(["a", "b"]).expect_err("cycle");
        assert_eq!(
            err,
            RegistryError::DependencyCycle(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn required_tags_union_defaults_first() {
        let defaults = vec!["svg".to_string(), "font".to_string()];
        let icons = vec![
            IconRecord::new("a.svg", 0x41, "a").with_tags(["svg", "font", "css"]),
            IconRecord::new("b.svg", 0x42, "b").with_tags(["svg", "font", "colors", "css"]),
        ];
        let tags: Vec<_> = required_tags(&defaults, &icons).into_iter().collect();
        assert_eq!(tags, ["svg", "font", "css", "colors"]);
    }

    #[test]
    fn dispatch_for_icon_follows_execution_order() {
        let registry = registry(vec![stub("svg", &[]), stub("font", &["svg"]), stub("css", &[])]);
        let resolved = registry.resolve(["font", "css", "svg"]).expect("resolve");
        let icon = IconRecord::new("a.svg", 0x41, "a").with_tags(["font", "svg"]);
        let dispatch: Vec<_> = resolved
            .for_icon(&icon)
            .into_iter()
            .map(|e| e.tag.as_str())
            .collect();
        assert_eq!(dispatch, ["svg", "font"]);
    }
}
