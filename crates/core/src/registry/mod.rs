//! Registry of backend module descriptors keyed by canonical identifier.
//!
//! Registration happens during startup/plugin discovery; `seal` flips the
//! registry into its read-only serving phase. Reads take the lock shared and
//! never mutate, so many concurrent scopes can resolve without contention.

mod alias;

pub use alias::AliasRule;

use crate::ident::{ApiVersion, ModuleIdentifier};
use once_cell::sync::OnceCell;
use portico_api::{HostError, HostResult, ModuleFactory, ScriptModule};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// A backend module registration: canonical identity, factory, and sharing
/// policy. Never mutated after registration.
#[derive(Clone)]
pub struct ModuleDescriptor {
    pub canonical: ModuleIdentifier,
    pub factory: Arc<dyn ModuleFactory>,
    pub singleton: bool,
}

impl ModuleDescriptor {
    /// A per-scope module: the factory runs once per resolution scope.
    pub fn new(canonical: ModuleIdentifier, factory: Arc<dyn ModuleFactory>) -> Self {
        Self {
            canonical,
            factory,
            singleton: false,
        }
    }

    /// A process-wide shared module, constructed lazily on first resolve.
    pub fn singleton(canonical: ModuleIdentifier, factory: Arc<dyn ModuleFactory>) -> Self {
        Self {
            canonical,
            factory,
            singleton: true,
        }
    }
}

struct RegisteredModule {
    descriptor: ModuleDescriptor,
    /// Shared instance for singleton modules; empty until first resolve.
    instance: OnceCell<Arc<dyn ScriptModule>>,
}

#[derive(Default)]
struct Inner {
    modules: HashMap<String, RegisteredModule>,
    aliases: Vec<AliasRule>,
    /// Namespaces with at least one registration or alias source; anything
    /// else is an unrecognized prefix at resolve time.
    namespaces: HashSet<String>,
}

/// Shared, read-mostly mapping from canonical identifiers to backend modules.
pub struct ModuleRegistry {
    inner: RwLock<Inner>,
    sealed: AtomicBool,
}

impl ModuleRegistry {
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

    /// End the registration phase. Afterwards every mutation fails with
    /// `RegistrySealed`.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Register a module descriptor.
    ///
    /// Re-registering an identical descriptor (same canonical key, sharing
    /// policy, and factory) is a no-op; a conflicting one fails with
    /// `DuplicateRegistration`.
    pub fn register(&self, descriptor: ModuleDescriptor) -> HostResult<()> {
        self.ensure_open()?;
        let key = descriptor.canonical.canonical_key();
        let mut inner = self.inner.write().unwrap();
        if let Some(existing) = inner.modules.get(&key) {
            let identical = existing.descriptor.singleton == descriptor.singleton
                && Arc::ptr_eq(&existing.descriptor.factory, &descriptor.factory);
            if identical {
                return Ok(());
            }
            return Err(HostError::DuplicateRegistration { id: key });
        }
        inner
            .namespaces
            .insert(descriptor.canonical.namespace().to_string());
        tracing::debug!(module = %key, singleton = descriptor.singleton, "registered module");
        inner.modules.insert(
            key,
            RegisteredModule {
                descriptor,
                instance: OnceCell::new(),
            },
        );
        Ok(())
    }

    /// Register a prefix alias, e.g. `io/v3` -> `io` (a trailing `/*` on
    /// either side is accepted and ignored). Cycles are rejected here, at
    /// registration time, never surfacing during resolution.
    pub fn register_alias(&self, from: &str, to: &str) -> HostResult<()> {
        let from = ModuleIdentifier::parse(strip_wildcard(from))?;
        let to = ModuleIdentifier::parse(strip_wildcard(to))?;
        self.push_alias(AliasRule::Prefix { from, to })
    }

    /// Register a namespace default: `<namespace>/<area>/<name>` resolves as
    /// `<area>/<version>/<name>`. This is how the `sdk/` namespace and scoped
    /// `@vendor/` namespaces are wired to the configured default API version.
    pub fn register_namespace_default(
        &self,
        namespace: &str,
        version: ApiVersion,
    ) -> HostResult<()> {
        self.push_alias(AliasRule::NamespaceDefault {
            namespace: namespace.to_string(),
            version,
        })
    }

    fn push_alias(&self, rule: AliasRule) -> HostResult<()> {
        self.ensure_open()?;
        let mut inner = self.inner.write().unwrap();
        alias::check_for_cycles(&inner.aliases, &rule)?;
        inner
            .namespaces
            .insert(rule.source_namespace().to_string());
        tracing::debug!(pattern = %rule.pattern_key(), "registered alias");
        inner.aliases.push(rule);
        Ok(())
    }

    /// Rewrite an identifier to its canonical, fully alias-resolved form and
    /// verify the namespace is recognized.
    pub fn canonicalize(&self, id: &ModuleIdentifier) -> HostResult<ModuleIdentifier> {
        let inner = self.inner.read().unwrap();
        let canonical = alias::rewrite(&inner.aliases, id)?;
        if !inner.namespaces.contains(canonical.namespace()) {
            return Err(HostError::MalformedIdentifier {
                raw: id.canonical_key(),
                reason: format!("unrecognized namespace '{}'", canonical.namespace()),
            });
        }
        Ok(canonical)
    }

    /// Instantiate the module registered under an already-canonical
    /// identifier.
    ///
    /// Singletons are constructed at most once under concurrent first access;
    /// a failed construction is not cached, so a later resolve retries the
    /// factory. This is the only place backend construction side effects
    /// happen.
    pub fn instantiate(&self, canonical: &ModuleIdentifier) -> HostResult<Arc<dyn ScriptModule>> {
        let key = canonical.canonical_key();
        let inner = self.inner.read().unwrap();
        let Some(registered) = inner.modules.get(&key) else {
            return Err(HostError::ModuleNotFound { id: key });
        };

        let build = || {
            registered.descriptor.factory.create().map_err(|source| {
                HostError::ModuleInitializationFailed {
                    id: key.clone(),
                    source,
                }
            })
        };

        if registered.descriptor.singleton {
            registered
                .instance
                .get_or_try_init(build)
                .map(Arc::clone)
        } else {
            build()
        }
    }

    /// Full resolution path: alias rewrite, namespace check, lookup,
    /// instantiation. Scope-bound callers go through the resolution cache
    /// instead, which keys on the canonicalized form.
    pub fn resolve(&self, id: &ModuleIdentifier) -> HostResult<Arc<dyn ScriptModule>> {
        let canonical = self.canonicalize(id)?;
        self.instantiate(&canonical)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_wildcard(pattern: &str) -> &str {
    pattern.strip_suffix("/*").unwrap_or(pattern)
}
