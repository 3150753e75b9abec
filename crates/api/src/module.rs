use crate::extension::Contribution;
use std::any::Any;
use std::sync::Arc;

/// A backend module instance as seen by script code.
///
/// Uses capability discovery instead of fat interface inheritance: a module
/// advertises the optional surfaces it supports through the `Option`-returning
/// accessors and callers downcast through [`ScriptModule::as_any`] for
/// module-specific APIs.
pub trait ScriptModule: Send + Sync {
    /// Downcast access to the concrete module type.
    fn as_any(&self) -> &dyn Any;

    /// The contribution this module offers to an extension point, if any.
    ///
    /// Modules registered as extensions must return `Some` here; the loader
    /// rejects extension modules without one.
    fn contribution(&self) -> Option<Arc<dyn Contribution>> {
        None
    }
}

impl std::fmt::Debug for dyn ScriptModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn ScriptModule")
    }
}

/// Result of constructing a backend module instance.
pub type ModuleResult = Result<Arc<dyn ScriptModule>, Box<dyn std::error::Error + Send + Sync>>;

/// Factory producing backend module instances.
///
/// Invoked once per process for singleton modules and once per resolution
/// scope otherwise. Construction may perform backend I/O (e.g. opening a
/// connection pool); failures are surfaced by the registry as
/// `ModuleInitializationFailed` and are never masked.
pub trait ModuleFactory: Send + Sync {
    fn create(&self) -> ModuleResult;
}

impl<F> ModuleFactory for F
where
    F: Fn() -> ModuleResult + Send + Sync,
{
    fn create(&self) -> ModuleResult {
        self()
    }
}

/// Wrap a closure as a module factory.
pub fn factory_fn<F>(f: F) -> Arc<dyn ModuleFactory>
where
    F: Fn() -> ModuleResult + Send + Sync + 'static,
{
    Arc::new(f)
}
