//! Extension kernel.
//!
//! Extensions are statically linked implementations of one `Extension`
//! trait, looked up by tag. Project-local manifests can add or shadow tags
//! without code. The registry resolves the tags a run needs, checks peer
//! requirements and fixes one execution order used by every phase.

pub mod api;
pub mod capability;
pub mod manifest;
pub mod registry;

pub use api::{
    Extension, ExtensionError, IconHandle, IconProcessingError, RunContext, StateStore,
};
pub use capability::{parse_capability, Capability, CapabilityError};
pub use manifest::{DeclaredExtension, ExtensionManifest, ManifestValidationError};
pub use registry::{
    required_tags, ExtensionOrigin, ExtensionRegistry, RegistryError, ResolvedExtension,
    ResolvedExtensions, LOCAL_EXTENSIONS_DIR,
};
