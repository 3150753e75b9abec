//! Execution scopes: the isolation unit for one script invocation.
//!
//! A scope owns the per-invocation resolution cache and the inbox that
//! receives timer fires. Scopes are single-owner; all access goes through
//! `&mut self` and no internal locking is needed.

use crate::ident::ModuleIdentifier;
use crate::registry::ModuleRegistry;
use crate::timer::{TimerBridge, TimerCallback, TimerFire, TimerHandle, TimerKind, TimerOwner};
use portico_api::{HostResult, ScriptModule};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub(crate) u64);

/// One script invocation's view of the host: module lookups memoized for the
/// invocation's lifetime, plus script-facing timers owned by the invocation.
///
/// Dropping the scope releases all cached per-scope module instances and
/// cancels every scope-owned pending timer, so leaked callbacks can never
/// fire against a torn-down execution context.
pub struct ExecutionScope {
    id: ScopeId,
    registry: Arc<ModuleRegistry>,
    bridge: TimerBridge,
    /// Resolution cache keyed by canonical identifier key.
    cache: HashMap<String, Arc<dyn ScriptModule>>,
    inbox: mpsc::UnboundedReceiver<TimerFire>,
    inbox_tx: mpsc::UnboundedSender<TimerFire>,
}

impl ExecutionScope {
    pub(crate) fn new(id: ScopeId, registry: Arc<ModuleRegistry>, bridge: TimerBridge) -> Self {
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        Self {
            id,
            registry,
            bridge,
            cache: HashMap::new(),
            inbox,
            inbox_tx,
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Require-like lookup: parse, alias-rewrite, and resolve a raw module
    /// identifier, memoizing per canonical form.
    ///
    /// Within one scope, identifiers that normalize to the same canonical
    /// form always yield the identical instance, so scripts may safely hold
    /// on to a resolved module across calls.
    pub fn lookup(&mut self, raw: &str) -> HostResult<Arc<dyn ScriptModule>> {
        let id = ModuleIdentifier::parse(raw)?;
        let canonical = self.registry.canonicalize(&id)?;
        let key = canonical.canonical_key();
        if let Some(module) = self.cache.get(&key) {
            return Ok(Arc::clone(module));
        }
        let module = self.registry.instantiate(&canonical)?;
        self.cache.insert(key, Arc::clone(&module));
        Ok(module)
    }

    /// Number of entries currently memoized in this scope.
    pub fn cached_modules(&self) -> usize {
        self.cache.len()
    }

    // === Script-facing timer interface ===

    /// `setTimeout`: one-shot timer owned by this scope. The callback is
    /// never invoked before this returns; it runs when the scope pumps its
    /// inbox after the delay elapses.
    pub fn set_timeout(&self, callback: TimerCallback, delay: Duration) -> TimerHandle {
        self.schedule(TimerKind::OneShot, delay, callback)
    }

    /// `setInterval`: repeating timer owned by this scope.
    pub fn set_interval(&self, callback: TimerCallback, interval: Duration) -> TimerHandle {
        self.schedule(TimerKind::Repeating, interval, callback)
    }

    /// `setImmediate`: a zero-delay one-shot.
    pub fn set_immediate(&self, callback: TimerCallback) -> TimerHandle {
        self.schedule(TimerKind::OneShot, Duration::ZERO, callback)
    }

    /// `clearTimeout`; a no-op on fired or already-cleared handles.
    pub fn clear_timeout(&self, handle: &TimerHandle) {
        handle.cancel();
    }

    /// `clearInterval`; a no-op on already-cleared handles.
    pub fn clear_interval(&self, handle: &TimerHandle) {
        handle.cancel();
    }

    fn schedule(
        &self,
        kind: TimerKind,
        delay: Duration,
        callback: TimerCallback,
    ) -> TimerHandle {
        self.bridge.schedule(
            kind,
            delay,
            TimerOwner::Scope(self.id),
            self.inbox_tx.clone(),
            callback,
        )
    }

    /// Drain the inbox, invoking each pending fire's callback synchronously
    /// in this scope's context. Returns the number of callbacks invoked
    /// (cancelled fires are skipped silently).
    pub fn pump_timers(&mut self) -> usize {
        let mut invoked = 0;
        while let Ok(fire) = self.inbox.try_recv() {
            if fire.invoke() {
                invoked += 1;
            }
        }
        invoked
    }

    /// Wait for the next fire and invoke it. Returns whether a callback
    /// actually ran (`false` for a cancelled fire or a shut-down bridge).
    pub async fn pump_one(&mut self) -> bool {
        match self.inbox.recv().await {
            Some(fire) => fire.invoke(),
            None => false,
        }
    }
}

impl Drop for ExecutionScope {
    fn drop(&mut self) {
        self.bridge.cancel_scope(self.id);
    }
}
