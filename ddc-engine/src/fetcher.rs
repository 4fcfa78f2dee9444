//! Declared-spec lookup capability.
//!
//! The cache never talks to the cluster itself. It is handed a
//! [`SpecFetcher`] at construction and calls it at most once per build.
//! Which fetcher is injected decides the operating mode: a cluster-backed
//! implementation in production, [`InMemorySpecStore`] in-process, or
//! [`OfflineSpecFetcher`] when no cluster exists at all.

use async_trait::async_trait;
use ddc_core::{CleanPolicy, DdcResult, DeclaredSpec, EngineKey, RuntimeType};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Fetches the declared spec for an engine instance.
///
/// Implementations return `Ok(None)` when no such instance is declared and
/// an error only when the lookup itself failed. They must not retry
/// internally; retry policy belongs to whoever calls the cache.
#[async_trait]
pub trait SpecFetcher: Send + Sync {
    async fn fetch(&self, name: &str, namespace: &str) -> DdcResult<Option<DeclaredSpec>>;
}

#[async_trait]
impl<T: SpecFetcher + ?Sized> SpecFetcher for Arc<T> {
    async fn fetch(&self, name: &str, namespace: &str) -> DdcResult<Option<DeclaredSpec>> {
        (**self).fetch(name, namespace).await
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// Map-backed declared spec store.
///
/// Stands in for the custom resource API when the specs are already in
/// process, e.g. loaded from manifests or seeded by tests.
#[derive(Debug, Default)]
pub struct InMemorySpecStore {
    specs: RwLock<HashMap<EngineKey, DeclaredSpec>>,
}

impl InMemorySpecStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given specs.
    pub fn from_specs(specs: impl IntoIterator<Item = (EngineKey, DeclaredSpec)>) -> Self {
        Self {
            specs: RwLock::new(specs.into_iter().collect()),
        }
    }

    /// Declare (or replace) the spec for an instance.
    pub fn insert(&self, key: EngineKey, spec: DeclaredSpec) -> Option<DeclaredSpec> {
        self.specs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, spec)
    }

    /// Decode a spec from its JSON form and declare it.
    pub fn load_json(&self, key: EngineKey, json: &str) -> DdcResult<()> {
        let spec = DeclaredSpec::from_json(&key, json)?;
        self.insert(key, spec);
        Ok(())
    }

    pub fn remove(&self, key: &EngineKey) -> Option<DeclaredSpec> {
        self.specs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub fn contains(&self, key: &EngineKey) -> bool {
        self.specs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.specs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SpecFetcher for InMemorySpecStore {
    async fn fetch(&self, name: &str, namespace: &str) -> DdcResult<Option<DeclaredSpec>> {
        let key = EngineKey::new(name, namespace);
        Ok(self
            .specs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned())
    }
}

// ============================================================================
// OFFLINE FETCHER
// ============================================================================

/// Fetcher that never consults a cluster.
///
/// Every instance resolves to a spec with the configured runtime type, no
/// tiered store and, optionally, a fixed clean policy.
#[derive(Debug, Clone)]
pub struct OfflineSpecFetcher {
    runtime_type: RuntimeType,
    clean_policy: Option<CleanPolicy>,
}

impl OfflineSpecFetcher {
    pub fn new(runtime_type: RuntimeType) -> Self {
        Self {
            runtime_type,
            clean_policy: None,
        }
    }

    pub fn with_clean_policy(mut self, clean_policy: CleanPolicy) -> Self {
        self.clean_policy = Some(clean_policy);
        self
    }
}

#[async_trait]
impl SpecFetcher for OfflineSpecFetcher {
    async fn fetch(&self, _name: &str, _namespace: &str) -> DdcResult<Option<DeclaredSpec>> {
        let spec = DeclaredSpec::new(self.runtime_type);
        Ok(Some(match self.clean_policy {
            Some(policy) => spec.with_clean_policy(policy),
            None => spec,
        }))
    }
}
