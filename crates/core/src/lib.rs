//! Core of the portico scripting host: module/namespace resolution with
//! alias rewriting, per-scope resolution caching, extension-point
//! composition, and the host-callback timer bridge.

pub mod extensions;
pub mod host;
pub mod ident;
pub mod logging;
pub mod registry;
pub mod scope;
pub mod timer;

pub use extensions::{ExtensionLoader, ExtensionRegistry};
pub use host::{HostBuilder, ScriptHost};
pub use ident::{ApiVersion, ModuleIdentifier};
pub use portico_api::{ErrorKind, HostError, HostResult};
pub use registry::{ModuleDescriptor, ModuleRegistry};
pub use scope::{ExecutionScope, ScopeId};
pub use timer::{TimerBridge, TimerCallback, TimerHandle, TimerKind};
