//! Composition of extension points into ordered capability lists.

use crate::extensions::registry::ExtensionRegistry;
use crate::scope::ExecutionScope;
use portico_api::{
    Contribution, ExtensionDiagnostic, HostError, HostResult, LoadedExtensions,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Loads the extensions of a point through a scope's resolution cache,
/// validating each module's capability contract.
///
/// Loading is best-effort by design: a broken descriptor is recorded as a
/// diagnostic and skipped, so one broken plugin cannot disable every
/// consumer of the point. Only `UnknownPoint` aborts the call.
pub struct ExtensionLoader {
    extensions: Arc<ExtensionRegistry>,
}

impl ExtensionLoader {
    pub fn new(extensions: Arc<ExtensionRegistry>) -> Self {
        Self { extensions }
    }

    /// Resolve, validate, and compose the capabilities registered for
    /// `point`, in descriptor order.
    ///
    /// Module construction may block; latency-sensitive callers pass a live
    /// `cancel` token, which is honored between descriptors: cancellation
    /// returns whatever has been composed so far plus a `LoadCancelled`
    /// diagnostic carrying the count of descriptors not attempted.
    pub fn load(
        &self,
        scope: &mut ExecutionScope,
        point: &str,
        cancel: &CancellationToken,
    ) -> HostResult<LoadedExtensions> {
        let descriptors = self.extensions.list_extensions(point)?;
        let mut out = LoadedExtensions::default();

        for (index, descriptor) in descriptors.iter().enumerate() {
            if cancel.is_cancelled() {
                let remaining = descriptors.len() - index;
                tracing::warn!(point, remaining, "extension loading cancelled");
                out.diagnostics.push(ExtensionDiagnostic {
                    point: point.to_string(),
                    location: None,
                    error: HostError::LoadCancelled { remaining },
                });
                break;
            }

            let module = match scope.lookup(&descriptor.location) {
                Ok(module) => module,
                Err(error) => {
                    tracing::warn!(
                        point,
                        location = %descriptor.location,
                        %error,
                        "skipping extension: resolution failed"
                    );
                    out.diagnostics.push(ExtensionDiagnostic {
                        point: point.to_string(),
                        location: Some(descriptor.location.clone()),
                        error,
                    });
                    continue;
                }
            };

            match validate(point, &descriptor.location, module.contribution()) {
                Ok(capability) => out.capabilities.push(capability),
                Err(error) => {
                    tracing::warn!(
                        point,
                        location = %descriptor.location,
                        %error,
                        "skipping extension: validation failed"
                    );
                    out.diagnostics.push(ExtensionDiagnostic {
                        point: point.to_string(),
                        location: Some(descriptor.location.clone()),
                        error,
                    });
                }
            }
        }

        Ok(out)
    }
}

fn validate(
    point: &str,
    location: &str,
    contribution: Option<Arc<dyn Contribution>>,
) -> HostResult<Arc<dyn Contribution>> {
    let Some(capability) = contribution else {
        return Err(HostError::ExtensionValidationFailed {
            location: location.to_string(),
            reason: "module exposes no contribution".to_string(),
        });
    };
    if capability.point() != point {
        return Err(HostError::ExtensionValidationFailed {
            location: location.to_string(),
            reason: format!(
                "contribution targets point '{}', expected '{}'",
                capability.point(),
                point
            ),
        });
    }
    Ok(capability)
}
