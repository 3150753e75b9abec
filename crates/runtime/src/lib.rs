//! Assembly crate for the portico scripting host.
//!
//! Acts as the central factory: wires the standard namespace aliases into a
//! [`HostBuilder`] so startup collaborators only add their own modules and
//! extension points before sealing.

mod config;

pub use config::HostConfig;

use portico_api::HostResult;
use portico_core::HostBuilder;
use std::path::Path;

/// Bootstrap a host builder with the standard alias table.
///
/// Installs namespace-default rules for the `sdk/` namespace and every
/// configured scoped namespace, so `sdk/<area>/<name>` (and
/// `@vendor/<area>/<name>`) resolve at the configured default API version.
pub fn default_host_builder(config: &HostConfig) -> HostResult<HostBuilder> {
    let builder = HostBuilder::new();
    builder.register_namespace_default(&config.sdk_namespace, config.default_api_version)?;
    for namespace in &config.scoped_namespaces {
        builder.register_namespace_default(namespace, config.default_api_version)?;
    }
    tracing::debug!(
        sdk = %config.sdk_namespace,
        version = %config.default_api_version,
        "installed default namespace aliases"
    );
    Ok(builder)
}

/// Initializes the logging system for a specific component.
/// This delegates to the core logging module.
pub fn init_logging(component: &str) -> Option<impl Drop> {
    Some(portico_core::logging::init_logging(component, false))
}

/// Like [`init_logging`], but into an explicit directory. For embedders
/// with their own filesystem layout.
pub fn init_logging_to(log_dir: &Path, component: &str) -> Option<impl Drop> {
    Some(portico_core::logging::init_logging_at(log_dir, component, false))
}
