//! Extension-point discovery and composition.

mod loader;
mod registry;

pub use loader::ExtensionLoader;
pub use registry::ExtensionRegistry;
