//! Stable trait and type surface shared by the scripting host, plugins, and
//! embedders. Backend implementations depend on this crate only, never on
//! `portico-core`.

pub mod error;
pub mod extension;
pub mod module;

// Re-export commonly used types
pub use error::{ErrorKind, HostError, HostResult};
pub use extension::{
    Contribution, ContributionItem, ExtensionDescriptor, ExtensionDiagnostic, LoadedExtensions,
};
pub use module::{ModuleFactory, ModuleResult, ScriptModule, factory_fn};
