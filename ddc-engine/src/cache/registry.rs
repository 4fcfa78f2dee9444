//! Engine instance registry with single-flight resolution.
//!
//! Each engine instance owns one [`EngineSlot`] in a sharded map. Lookups of
//! the map itself are short and never span an await; all waiting happens on
//! the per-slot lock, so a slow fetch for one instance never holds up
//! another.
//!
//! # Locking discipline
//!
//! ```text
//! get ──► read lock ──► Built / sticky Failed? ──► return
//!              │
//!              ▼
//!         write lock ──► settled meanwhile? ──► return
//!              │
//!              ▼
//!         fetch + build (lock held) ──► transition ──► return
//! ```
//!
//! Concurrent callers for the same key queue on the slot lock. Each notes
//! the slot's count of finished builds on arrival, before taking any lock;
//! if the count has moved by the time it holds the write lock, a build
//! finished while it waited and it returns that build's outcome. This holds whether or not the
//! outcome was memoized, so a lookup error or a failure under
//! [`FailurePolicy::Retry`] is still shared by everyone who waited on it.
//! Only callers arriving after a build has finished start a new one.
//!
//! [`RuntimeInfoCache::remove`] is the one exception. It detaches the slot
//! without waiting for its lock, so a build already running finishes against
//! the detached slot while the next call for the key builds into a fresh
//! one. For a short window two builds of the same key can be in flight.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ddc_core::{DdcError, DdcResult, EngineKey, RuntimeInfo};

use super::entry::{CacheEntry, EngineSlot, EntryStatus, SlotState};
use super::stats::{CacheCounters, CacheStats};
use crate::config::{EngineConfig, FailurePolicy};
use crate::fetcher::SpecFetcher;

/// Memoizing resolver of [`RuntimeInfo`] per engine instance.
///
/// # Type Parameters
///
/// - `F`: the declared-spec lookup used on a miss. Choosing the fetcher
///   chooses the operating mode; see [`crate::fetcher`].
///
/// # Example
///
/// ```ignore
/// let cache = RuntimeInfoCache::with_defaults(Arc::new(store));
/// let info = cache.get_runtime_info(&EngineKey::new("hbase", "fluid")).await?;
/// println!("{} bytes across {} levels", info.total_capacity(), info.levels().len());
/// ```
pub struct RuntimeInfoCache<F>
where
    F: SpecFetcher + ?Sized,
{
    /// The declared-spec lookup.
    fetcher: Arc<F>,
    /// Cache configuration.
    config: EngineConfig,
    /// One slot per registered engine instance.
    slots: DashMap<EngineKey, Arc<EngineSlot>>,
    counters: CacheCounters,
}

impl<F> RuntimeInfoCache<F>
where
    F: SpecFetcher + ?Sized,
{
    /// Create a new cache around `fetcher`.
    pub fn new(fetcher: Arc<F>, config: EngineConfig) -> Self {
        Self {
            fetcher,
            config,
            slots: DashMap::new(),
            counters: CacheCounters::default(),
        }
    }

    /// Create a new cache with default configuration.
    pub fn with_defaults(fetcher: Arc<F>) -> Self {
        Self::new(fetcher, EngineConfig::default())
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get a reference to the fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Resolve runtime info for an engine instance.
    ///
    /// Returns the memoized value when the instance is already built. An
    /// unseen instance is registered on the fly. Failures are returned as
    /// errors and, when they describe the declared spec (not found,
    /// undecodable, invalid tiered store), memoized according to the
    /// [`FailurePolicy`]. Callers that waited on an in-flight build return
    /// its outcome either way.
    pub async fn get_runtime_info(&self, key: &EngineKey) -> DdcResult<Arc<RuntimeInfo>> {
        let slot = self.slot(key);
        let seen = slot.completed_builds();

        {
            let state = slot.state.read().await;
            if let Some(settled) = self.settled(key, &state.entry) {
                return settled;
            }
        }

        let mut state = slot.state.write().await;
        if let Some(settled) = self.settled(key, &state.entry) {
            return settled;
        }
        if slot.completed_builds() != seen {
            if let Some(outcome) = state.last_outcome.clone() {
                self.counters.hit();
                tracing::debug!(
                    name = key.name(),
                    namespace = key.namespace(),
                    "Sharing outcome of concurrent build"
                );
                return outcome;
            }
        }
        self.build(key, &slot, &mut state).await
    }

    /// Discard whatever is cached for `key` and resolve it again.
    ///
    /// Concurrent `get_runtime_info` callers wait for the refreshed result.
    pub async fn refresh(&self, key: &EngineKey) -> DdcResult<Arc<RuntimeInfo>> {
        let slot = self.slot(key);
        let mut state = slot.state.write().await;
        tracing::debug!(
            name = key.name(),
            namespace = key.namespace(),
            previous = %state.entry.state(),
            "Refreshing runtime info"
        );
        state.transition(CacheEntry::Empty);
        self.build(key, &slot, &mut state).await
    }

    /// Reset an instance to empty so the next call re-resolves it.
    ///
    /// Returns false if the instance is not registered.
    pub async fn invalidate(&self, key: &EngineKey) -> bool {
        let Some(slot) = self.existing_slot(key) else {
            return false;
        };
        slot.state.write().await.transition(CacheEntry::Empty);
        tracing::debug!(
            name = key.name(),
            namespace = key.namespace(),
            "Invalidated runtime info"
        );
        true
    }

    /// Install an already-built runtime info for its instance.
    ///
    /// Later calls return it without consulting the fetcher.
    pub async fn seed(&self, info: RuntimeInfo) -> Arc<RuntimeInfo> {
        let key = info.identity().key().clone();
        let info = Arc::new(info);
        let slot = self.slot(&key);
        slot.state
            .write()
            .await
            .transition(CacheEntry::Built(Arc::clone(&info)));
        info
    }

    /// Register an instance as empty. Returns false if it already existed.
    pub fn register(&self, key: &EngineKey) -> bool {
        match self.slots.entry(key.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(EngineSlot::default()));
                true
            }
        }
    }

    /// Forget an instance entirely, e.g. once its runtime is deleted.
    ///
    /// A build already in flight completes against the detached slot and
    /// its result is discarded. The next call for the key does not wait for
    /// it and builds into a fresh slot.
    pub fn remove(&self, key: &EngineKey) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Snapshot of an instance's entry, waiting for any in-flight build.
    pub async fn status(&self, key: &EngineKey) -> Option<EntryStatus> {
        let slot = self.existing_slot(key)?;
        let state = slot.state.read().await;
        Some(state.status())
    }

    pub fn contains(&self, key: &EngineKey) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.slots.len())
    }

    fn existing_slot(&self, key: &EngineKey) -> Option<Arc<EngineSlot>> {
        self.slots.get(key).map(|slot| Arc::clone(slot.value()))
    }

    /// Slot for `key`, registering it if needed. The map guard is released
    /// before returning.
    fn slot(&self, key: &EngineKey) -> Arc<EngineSlot> {
        if let Some(slot) = self.existing_slot(key) {
            return slot;
        }
        Arc::clone(self.slots.entry(key.clone()).or_default().value())
    }

    /// The answer for an entry that needs no build, if it is settled.
    fn settled(&self, key: &EngineKey, entry: &CacheEntry) -> Option<DdcResult<Arc<RuntimeInfo>>> {
        match entry {
            CacheEntry::Built(info) => {
                self.counters.hit();
                tracing::trace!(
                    name = key.name(),
                    namespace = key.namespace(),
                    "Runtime info cache hit"
                );
                Some(Ok(Arc::clone(info)))
            }
            CacheEntry::Failed(err) if self.config.failure_policy == FailurePolicy::Sticky => {
                self.counters.hit();
                tracing::debug!(
                    name = key.name(),
                    namespace = key.namespace(),
                    error = %err,
                    "Returning cached runtime info failure"
                );
                Some(Err(err.clone()))
            }
            _ => None,
        }
    }

    /// Fetch, build and record the outcome. Caller holds the write lock.
    async fn build(
        &self,
        key: &EngineKey,
        slot: &EngineSlot,
        state: &mut SlotState,
    ) -> DdcResult<Arc<RuntimeInfo>> {
        self.counters.miss();
        state.builds += 1;

        let outcome = self.resolve_into(key, state).await;
        state.last_outcome = Some(outcome.clone());
        slot.mark_completed();
        outcome
    }

    async fn resolve_into(
        &self,
        key: &EngineKey,
        state: &mut SlotState,
    ) -> DdcResult<Arc<RuntimeInfo>> {
        match self.resolve(key).await {
            Ok(info) => {
                let info = Arc::new(info);
                self.counters.built();
                tracing::info!(
                    name = key.name(),
                    namespace = key.namespace(),
                    runtime_type = %info.runtime_type(),
                    levels = info.levels().len(),
                    capacity = info.total_capacity(),
                    "Resolved runtime info"
                );
                state.transition(CacheEntry::Built(Arc::clone(&info)));
                Ok(info)
            }
            Err(err) if err.is_spec_failure() => {
                self.counters.failed();
                tracing::warn!(
                    name = key.name(),
                    namespace = key.namespace(),
                    error = %err,
                    "Runtime info resolution failed"
                );
                state.transition(CacheEntry::Failed(err.clone()));
                Err(err)
            }
            Err(err) => {
                self.counters.failed();
                tracing::error!(
                    name = key.name(),
                    namespace = key.namespace(),
                    error = %err,
                    "Declared spec lookup failed"
                );
                state.transition(CacheEntry::Empty);
                Err(err)
            }
        }
    }

    async fn resolve(&self, key: &EngineKey) -> DdcResult<RuntimeInfo> {
        let spec = self
            .fetcher
            .fetch(key.name(), key.namespace())
            .await?
            .ok_or_else(|| DdcError::RuntimeNotFound {
                name: key.name().to_string(),
                namespace: key.namespace().to_string(),
            })?;
        RuntimeInfo::from_declared(key, &spec, self.config.default_clean_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::EntryState;
    use crate::fetcher::{InMemorySpecStore, OfflineSpecFetcher};
    use async_trait::async_trait;
    use ddc_core::{
        build_runtime_info, CleanPolicy, DeclaredSpec, EngineIdentity, LevelSpec, LookupError,
        RuntimeType, TieredStoreError,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Store wrapper counting fetches
    struct Counted {
        inner: InMemorySpecStore,
        calls: AtomicUsize,
    }

    impl Counted {
        fn new(inner: InMemorySpecStore) -> Self {
            Self {
                inner,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpecFetcher for Counted {
        async fn fetch(&self, name: &str, namespace: &str) -> DdcResult<Option<DeclaredSpec>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(name, namespace).await
        }
    }

    // Fetcher that always fails at the transport level
    struct Unreachable;

    #[async_trait]
    impl SpecFetcher for Unreachable {
        async fn fetch(&self, name: &str, namespace: &str) -> DdcResult<Option<DeclaredSpec>> {
            Err(LookupError::Failed {
                name: name.to_string(),
                namespace: namespace.to_string(),
                reason: "connection refused".to_string(),
            }
            .into())
        }
    }

    // Fetcher decoding a stored JSON document on every call
    struct RawJson {
        json: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SpecFetcher for RawJson {
        async fn fetch(&self, name: &str, namespace: &str) -> DdcResult<Option<DeclaredSpec>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            DeclaredSpec::from_json(&EngineKey::new(name, namespace), self.json).map(Some)
        }
    }

    fn key(name: &str) -> EngineKey {
        EngineKey::new(name, "fluid")
    }

    fn store_with(name: &str, spec: DeclaredSpec) -> Arc<Counted> {
        let store = InMemorySpecStore::new();
        store.insert(key(name), spec);
        Arc::new(Counted::new(store))
    }

    #[tokio::test]
    async fn test_second_call_is_memoized() {
        let fetcher = store_with(
            "runtime1",
            DeclaredSpec::new(RuntimeType::Eac).with_clean_policy(CleanPolicy::OnDemand),
        );
        let cache = RuntimeInfoCache::with_defaults(Arc::clone(&fetcher));

        let first = cache.get_runtime_info(&key("runtime1")).await.unwrap();
        let second = cache.get_runtime_info(&key("runtime1")).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(first.clean_policy(), CleanPolicy::OnDemand);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.builds, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_not_found_is_cached_as_failed() {
        let fetcher = store_with("runtime1", DeclaredSpec::new(RuntimeType::Eac));
        let cache = RuntimeInfoCache::with_defaults(Arc::clone(&fetcher));

        let err = cache.get_runtime_info(&key("runtime4")).await.unwrap_err();
        assert!(matches!(err, DdcError::RuntimeNotFound { ref name, .. } if name == "runtime4"));

        let again = cache.get_runtime_info(&key("runtime4")).await.unwrap_err();
        assert_eq!(err, again);
        assert_eq!(fetcher.calls(), 1);

        let status = cache.status(&key("runtime4")).await.unwrap();
        assert_eq!(status.state, EntryState::Failed);
        assert_eq!(status.builds, 1);
    }

    #[tokio::test]
    async fn test_invalid_quota_is_never_built() {
        let fetcher = store_with(
            "runtime3",
            DeclaredSpec::new(RuntimeType::Eac)
                .with_level(LevelSpec::new("/mnt/cache1,/mnt/cache2", "100ST,50Gi")),
        );
        let cache = RuntimeInfoCache::with_defaults(fetcher);

        let err = cache.get_runtime_info(&key("runtime3")).await.unwrap_err();
        assert!(matches!(
            err.tiered_store_error(),
            Some(TieredStoreError::InvalidQuotaUnit { .. })
        ));
        let status = cache.status(&key("runtime3")).await.unwrap();
        assert_eq!(status.state, EntryState::Failed);
        assert_eq!(status.error, Some(err));
    }

    #[tokio::test]
    async fn test_retry_policy_rebuilds_failed_entries() {
        let fetcher = Arc::new(Counted::new(InMemorySpecStore::new()));
        let cache = RuntimeInfoCache::new(
            Arc::clone(&fetcher),
            EngineConfig::new().with_failure_policy(FailurePolicy::Retry),
        );

        assert!(cache.get_runtime_info(&key("late")).await.is_err());
        fetcher
            .inner
            .insert(key("late"), DeclaredSpec::new(RuntimeType::Jindo));

        let info = cache.get_runtime_info(&key("late")).await.unwrap();
        assert_eq!(info.runtime_type(), RuntimeType::Jindo);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_changed_spec() {
        let fetcher = store_with(
            "runtime1",
            DeclaredSpec::new(RuntimeType::Eac).with_level(LevelSpec::new("/a", "1Gi")),
        );
        let cache = RuntimeInfoCache::with_defaults(Arc::clone(&fetcher));

        let before = cache.get_runtime_info(&key("runtime1")).await.unwrap();
        fetcher.inner.insert(
            key("runtime1"),
            DeclaredSpec::new(RuntimeType::Eac).with_level(LevelSpec::new("/a", "2Gi")),
        );

        // unchanged until asked
        let cached = cache.get_runtime_info(&key("runtime1")).await.unwrap();
        assert!(Arc::ptr_eq(&before, &cached));

        let after = cache.refresh(&key("runtime1")).await.unwrap();
        assert_eq!(after.total_capacity(), 2 << 30);
        assert_eq!(before.total_capacity(), 1 << 30);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_resets_to_empty() {
        let fetcher = store_with("runtime1", DeclaredSpec::new(RuntimeType::Eac));
        let cache = RuntimeInfoCache::with_defaults(Arc::clone(&fetcher));

        assert!(!cache.invalidate(&key("runtime1")).await);
        cache.get_runtime_info(&key("runtime1")).await.unwrap();
        assert!(cache.invalidate(&key("runtime1")).await);
        assert_eq!(
            cache.status(&key("runtime1")).await.unwrap().state,
            EntryState::Empty
        );

        cache.get_runtime_info(&key("runtime1")).await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_seeded_info_short_circuits_fetch() {
        let fetcher = store_with(
            "runtime1",
            DeclaredSpec::new(RuntimeType::Eac).with_level(LevelSpec::new("/a", "100ST")),
        );
        let cache = RuntimeInfoCache::with_defaults(Arc::clone(&fetcher));

        let prebuilt = build_runtime_info(
            EngineIdentity::new("runtime1", "fluid", RuntimeType::Eac),
            CleanPolicy::OnDemand,
            &[],
        )
        .unwrap();
        let seeded = cache.seed(prebuilt).await;

        let info = cache.get_runtime_info(&key("runtime1")).await.unwrap();
        assert!(Arc::ptr_eq(&seeded, &info));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_lookup_errors_are_not_memoized() {
        let cache = RuntimeInfoCache::with_defaults(Arc::new(Unreachable));

        let err = cache.get_runtime_info(&key("runtime1")).await.unwrap_err();
        assert!(matches!(err, DdcError::Lookup(_)));

        let status = cache.status(&key("runtime1")).await.unwrap();
        assert_eq!(status.state, EntryState::Empty);
        assert_eq!(status.builds, 1);

        cache.get_runtime_info(&key("runtime1")).await.unwrap_err();
        assert_eq!(cache.status(&key("runtime1")).await.unwrap().builds, 2);
    }

    #[tokio::test]
    async fn test_offline_fetcher_resolves_anything_once() {
        let cache = RuntimeInfoCache::new(
            Arc::new(OfflineSpecFetcher::new(RuntimeType::Eac)),
            EngineConfig::new().with_default_clean_policy(CleanPolicy::OnDemand),
        );

        let first = cache.get_runtime_info(&key("runtime2")).await.unwrap();
        let second = cache.get_runtime_info(&key("runtime2")).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!first.is_tiered());
        assert_eq!(first.clean_policy(), CleanPolicy::OnDemand);
        assert_eq!(cache.stats().builds, 1);
    }

    #[tokio::test]
    async fn test_register_and_remove() {
        let cache = RuntimeInfoCache::with_defaults(Arc::new(InMemorySpecStore::new()));
        assert!(cache.is_empty());
        assert!(cache.register(&key("runtime1")));
        assert!(!cache.register(&key("runtime1")));
        assert!(cache.contains(&key("runtime1")));
        assert_eq!(
            cache.status(&key("runtime1")).await.unwrap().state,
            EntryState::Empty
        );

        assert!(cache.remove(&key("runtime1")));
        assert!(!cache.remove(&key("runtime1")));
        assert!(cache.status(&key("runtime1")).await.is_none());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_malformed_spec_is_memoized() {
        let fetcher = Arc::new(RawJson {
            json: r#"{"tieredStore":{"levels":[]}}"#,
            calls: AtomicUsize::new(0),
        });
        let cache = RuntimeInfoCache::with_defaults(Arc::clone(&fetcher));

        let err = cache.get_runtime_info(&key("runtime1")).await.unwrap_err();
        assert!(matches!(err, DdcError::Lookup(LookupError::Malformed { .. })));
        let again = cache.get_runtime_info(&key("runtime1")).await.unwrap_err();
        assert_eq!(err, again);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.status(&key("runtime1")).await.unwrap().state,
            EntryState::Failed
        );
    }
}
