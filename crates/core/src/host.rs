//! Host assembly: the builder for the registration phase and the sealed,
//! read-only host serving script executions.

use crate::extensions::{ExtensionLoader, ExtensionRegistry};
use crate::ident::ApiVersion;
use crate::registry::{ModuleDescriptor, ModuleRegistry};
use crate::scope::{ExecutionScope, ScopeId};
use crate::timer::{TimerBridge, TimerCallback, TimerFire, TimerHandle, TimerKind, TimerOwner};
use portico_api::{ExtensionDescriptor, HostResult, LoadedExtensions};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Accepts registrations from startup/plugin-discovery collaborators, then
/// builds the sealed [`ScriptHost`]. None of these interfaces are exposed to
/// running scripts.
pub struct HostBuilder {
    modules: Arc<ModuleRegistry>,
    extensions: Arc<ExtensionRegistry>,
}

impl HostBuilder {
    pub fn new() -> Self {
        Self {
            modules: Arc::new(ModuleRegistry::new()),
            extensions: Arc::new(ExtensionRegistry::new()),
        }
    }

    pub fn register_module(&self, descriptor: ModuleDescriptor) -> HostResult<()> {
        self.modules.register(descriptor)
    }

    pub fn register_alias(&self, from: &str, to: &str) -> HostResult<()> {
        self.modules.register_alias(from, to)
    }

    pub fn register_namespace_default(
        &self,
        namespace: &str,
        version: ApiVersion,
    ) -> HostResult<()> {
        self.modules.register_namespace_default(namespace, version)
    }

    pub fn register_point(&self, name: &str) -> HostResult<()> {
        self.extensions.register_point(name)
    }

    pub fn register_extension(&self, point: &str, location: &str, order: i32) -> HostResult<()> {
        self.extensions.register_extension(point, location, order)
    }

    /// Seal both registries and start serving. Must be called within a tokio
    /// runtime (the timer scheduler task is spawned here).
    pub fn build(self) -> ScriptHost {
        self.modules.seal();
        self.extensions.seal();
        let (process_tx, process_inbox) = mpsc::unbounded_channel();
        ScriptHost {
            modules: self.modules,
            loader: ExtensionLoader::new(Arc::clone(&self.extensions)),
            extensions: self.extensions,
            bridge: TimerBridge::spawn(),
            process_tx,
            process_inbox: Mutex::new(process_inbox),
            next_scope: AtomicU64::new(1),
        }
    }
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The sealed scripting host: read-only registries, the extension loader,
/// and the timer bridge. Shared by all concurrent script executions.
pub struct ScriptHost {
    modules: Arc<ModuleRegistry>,
    extensions: Arc<ExtensionRegistry>,
    loader: ExtensionLoader,
    bridge: TimerBridge,
    /// Inbox for process-owned timer fires, drained by the embedder.
    process_inbox: Mutex<mpsc::UnboundedReceiver<TimerFire>>,
    process_tx: mpsc::UnboundedSender<TimerFire>,
    next_scope: AtomicU64,
}

impl ScriptHost {
    /// Open a new execution scope for one script invocation.
    pub fn create_scope(&self) -> ExecutionScope {
        let id = ScopeId(self.next_scope.fetch_add(1, Ordering::Relaxed));
        ExecutionScope::new(id, Arc::clone(&self.modules), self.bridge.clone())
    }

    /// Metadata view: all extension-point names, in registration order.
    pub fn extension_points(&self) -> Vec<String> {
        self.extensions.list_points()
    }

    /// Metadata view: descriptors registered for a point, in load order.
    pub fn extensions_of(&self, point: &str) -> HostResult<Vec<ExtensionDescriptor>> {
        self.extensions.list_extensions(point)
    }

    /// Load, validate, and compose the extension modules of a point. See
    /// [`ExtensionLoader::load`] for the partial-failure and cancellation
    /// policy.
    pub fn load_extensions(
        &self,
        scope: &mut ExecutionScope,
        point: &str,
        cancel: &CancellationToken,
    ) -> HostResult<LoadedExtensions> {
        self.loader.load(scope, point, cancel)
    }

    /// Schedule a process-wide one-shot timer; it outlives any scope and
    /// delivers to the host inbox (see [`ScriptHost::pump_process_timers`]).
    pub fn set_process_timeout(&self, callback: TimerCallback, delay: Duration) -> TimerHandle {
        self.bridge.schedule(
            TimerKind::OneShot,
            delay,
            TimerOwner::Process,
            self.process_tx.clone(),
            callback,
        )
    }

    /// Schedule a process-wide repeating timer.
    pub fn set_process_interval(
        &self,
        callback: TimerCallback,
        interval: Duration,
    ) -> TimerHandle {
        self.bridge.schedule(
            TimerKind::Repeating,
            interval,
            TimerOwner::Process,
            self.process_tx.clone(),
            callback,
        )
    }

    /// Drain the process-timer inbox, invoking pending callbacks in the
    /// embedder's context. Returns the number invoked.
    pub fn pump_process_timers(&self) -> usize {
        let mut inbox = self.process_inbox.lock().unwrap();
        let mut invoked = 0;
        while let Ok(fire) = inbox.try_recv() {
            if fire.invoke() {
                invoked += 1;
            }
        }
        invoked
    }

    pub fn timer_bridge(&self) -> &TimerBridge {
        &self.bridge
    }
}

impl Drop for ScriptHost {
    fn drop(&mut self) {
        self.bridge.shutdown();
    }
}
