//! Parsing of raw module identifiers into their canonical structured form.
//!
//! Script code refers to modules in several historical shapes (`io/files`,
//! `io/v3/files`, `sdk/io/files`, `@vendor/io/files`); everything downstream
//! of this module works on the structured [`ModuleIdentifier`] only.

use portico_api::{HostError, HostResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recognized API version tokens.
///
/// Version tokens are a closed allow-list, not a pattern: a path segment
/// literally named `v3` outside the slot after the namespace must not be
/// mistaken for a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApiVersion {
    #[serde(rename = "v1")]
    V1,
    #[serde(rename = "v2")]
    V2,
    #[serde(rename = "v3")]
    V3,
    #[serde(rename = "v4")]
    V4,
}

impl ApiVersion {
    /// Latest stable API version; the default target for `sdk/` lookups.
    pub const LATEST: ApiVersion = ApiVersion::V4;

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "v1" => Some(ApiVersion::V1),
            "v2" => Some(ApiVersion::V2),
            "v3" => Some(ApiVersion::V3),
            "v4" => Some(ApiVersion::V4),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V1 => "v1",
            ApiVersion::V2 => "v2",
            ApiVersion::V3 => "v3",
            ApiVersion::V4 => "v4",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical structured form of a module identifier.
///
/// Immutable after parsing. Two identifiers are equivalent when their
/// canonical keys match after alias rewriting (see the module registry).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleIdentifier {
    namespace: String,
    version: Option<ApiVersion>,
    segments: Vec<String>,
}

impl ModuleIdentifier {
    pub fn new(
        namespace: impl Into<String>,
        version: Option<ApiVersion>,
        segments: Vec<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            version,
            segments,
        }
    }

    /// Parse a raw identifier string.
    ///
    /// Rules:
    /// - split on `/`; empty input and empty segments are malformed;
    /// - the first segment is the namespace; a leading `@scope` segment is a
    ///   scoped namespace and requires at least one following segment;
    /// - the segment immediately after the namespace is extracted as the
    ///   version iff it is on the [`ApiVersion`] allow-list. The version
    ///   slot applies uniformly to scoped namespaces too: `@vendor/v3/files`
    ///   carries version `v3`.
    pub fn parse(raw: &str) -> HostResult<Self> {
        let malformed = |reason: &str| HostError::MalformedIdentifier {
            raw: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(malformed("empty identifier"));
        }
        let parts: Vec<&str> = raw.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(malformed("empty segment"));
        }

        let namespace = parts[0];
        let mut rest = &parts[1..];
        if namespace.starts_with('@') {
            if namespace.len() == 1 {
                return Err(malformed("empty scope name"));
            }
            if rest.is_empty() {
                return Err(malformed("scoped namespace requires a module name"));
            }
        }

        let mut version = None;
        if let Some(first) = rest.first().copied()
            && let Some(v) = ApiVersion::from_token(first)
        {
            version = Some(v);
            rest = &rest[1..];
        }

        Ok(Self {
            namespace: namespace.to_string(),
            version,
            segments: rest.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn version(&self) -> Option<ApiVersion> {
        self.version
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn with_version(mut self, version: Option<ApiVersion>) -> Self {
        self.version = version;
        self
    }

    /// The string key used by the registry and the resolution cache.
    pub fn canonical_key(&self) -> String {
        let mut key = self.namespace.clone();
        if let Some(v) = self.version {
            key.push('/');
            key.push_str(v.as_str());
        }
        for seg in &self.segments {
            key.push('/');
            key.push_str(seg);
        }
        key
    }

    /// Number of leading components (namespace + version slot + segments);
    /// used for most-specific-pattern-wins alias precedence.
    pub(crate) fn component_count(&self) -> usize {
        1 + usize::from(self.version.is_some()) + self.segments.len()
    }
}

impl fmt::Display for ModuleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_key())
    }
}
