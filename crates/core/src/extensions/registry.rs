//! Registry of extension points and their registered extensions.

use indexmap::IndexMap;
use portico_api::{ExtensionDescriptor, HostError, HostResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

#[derive(Default)]
struct Inner {
    /// Point name -> descriptors in registration order. IndexMap keeps
    /// `list_points` in registration order.
    points: IndexMap<String, Vec<ExtensionDescriptor>>,
    next_seq: u64,
}

/// Shared, read-mostly mapping from extension-point name to the ordered list
/// of extensions targeting it. Mutations are startup-phase only, enforced by
/// the seal flag like the module registry.
pub struct ExtensionRegistry {
    inner: RwLock<Inner>,
    sealed: AtomicBool,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            sealed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> HostResult<()> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(HostError::RegistrySealed);
        }
        Ok(())
    }

    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Declare an extension point. Point names are globally unique;
    /// re-declaring one fails with `DuplicatePoint`.
    pub fn register_point(&self, name: &str) -> HostResult<()> {
        self.ensure_open()?;
        let mut inner = self.inner.write().unwrap();
        if inner.points.contains_key(name) {
            return Err(HostError::DuplicatePoint {
                name: name.to_string(),
            });
        }
        tracing::debug!(point = name, "registered extension point");
        inner.points.insert(name.to_string(), Vec::new());
        Ok(())
    }

    /// Register an extension (a module location) against a declared point.
    pub fn register_extension(
        &self,
        point: &str,
        location: &str,
        order: i32,
    ) -> HostResult<()> {
        self.ensure_open()?;
        let mut inner = self.inner.write().unwrap();
        let seq = inner.next_seq;
        let Some(extensions) = inner.points.get_mut(point) else {
            return Err(HostError::UnknownPoint {
                name: point.to_string(),
            });
        };
        tracing::debug!(point, location, order, "registered extension");
        extensions.push(ExtensionDescriptor {
            point: point.to_string(),
            location: location.to_string(),
            order,
            seq,
        });
        inner.next_seq += 1;
        Ok(())
    }

    /// All point names, in registration order.
    pub fn list_points(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap();
        inner.points.keys().cloned().collect()
    }

    /// Descriptors for a point, ordered by ascending `order` with ties broken
    /// by registration sequence.
    pub fn list_extensions(&self, point: &str) -> HostResult<Vec<ExtensionDescriptor>> {
        let inner = self.inner.read().unwrap();
        let Some(extensions) = inner.points.get(point) else {
            return Err(HostError::UnknownPoint {
                name: point.to_string(),
            });
        };
        let mut out = extensions.clone();
        // Stored in registration order, so a stable sort preserves the tiebreak.
        out.sort_by_key(|d| d.order);
        Ok(out)
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
