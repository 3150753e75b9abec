use crate::error::HostError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The capability contract an extension module must expose.
///
/// Each extension point expects its contributions to target it by name and
/// to yield an ordered sequence of records (menu items, artefact providers,
/// job definitions, ...). Validation happens at load time and produces a
/// typed rejection instead of a runtime crash on first use.
pub trait Contribution: Send + Sync {
    /// Name of the extension point this contribution targets.
    fn point(&self) -> &str;

    /// Records contributed to the point, in declaration order.
    fn items(&self) -> Vec<ContributionItem>;
}

/// One record contributed to an extension point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionItem {
    pub id: String,
    pub label: String,
    /// Point-specific payload (e.g. a menu entry or artefact descriptor).
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ContributionItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Metadata view of a registered extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDescriptor {
    pub point: String,
    pub location: String,
    pub order: i32,
    /// Registration sequence number; the stable tiebreak for equal orders.
    pub seq: u64,
}

/// Why a descriptor was skipped during extension loading.
#[derive(Debug)]
pub struct ExtensionDiagnostic {
    pub point: String,
    /// Module location of the failed descriptor; `None` for a
    /// cancellation diagnostic, which is not tied to a single descriptor.
    pub location: Option<String>,
    pub error: HostError,
}

/// Composed, ordered result of loading an extension point.
///
/// Loading is best-effort: broken descriptors are excluded and recorded in
/// `diagnostics` rather than failing the whole call, so one broken plugin
/// cannot disable every consumer of the point.
#[derive(Default)]
pub struct LoadedExtensions {
    pub capabilities: Vec<Arc<dyn Contribution>>,
    pub diagnostics: Vec<ExtensionDiagnostic>,
}

impl std::fmt::Debug for LoadedExtensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedExtensions")
            .field("capabilities", &self.capabilities.len())
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

impl LoadedExtensions {
    /// True when every registered descriptor produced a capability.
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Number of descriptors that produced no capability. A cancellation
    /// diagnostic counts for every descriptor it left unattempted.
    pub fn skipped(&self) -> usize {
        self.diagnostics
            .iter()
            .map(|diagnostic| match diagnostic.error {
                HostError::LoadCancelled { remaining } => remaining,
                _ => 1,
            })
            .sum()
    }
}
