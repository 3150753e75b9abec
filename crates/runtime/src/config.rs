use portico_core::ApiVersion;
use serde::{Deserialize, Serialize};

/// Bootstrap configuration for a default host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// API version that unversioned `sdk/` and scoped-namespace lookups
    /// resolve to.
    pub default_api_version: ApiVersion,
    /// First-class alternate namespace for versionless SDK lookups.
    pub sdk_namespace: String,
    /// Scoped namespaces (`@vendor` style) aliased to the default version.
    pub scoped_namespaces: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            default_api_version: ApiVersion::LATEST,
            sdk_namespace: "sdk".to_string(),
            scoped_namespaces: Vec::new(),
        }
    }
}
