//! DDC Test Utilities
//!
//! Shared test infrastructure for the DDC workspace:
//! - Instrumented spec fetchers
//! - Proptest generators for quota and path text
//! - Fixtures mirroring a small cluster of declared runtimes
//! - Assertions for error kinds

pub use ddc_core::{
    CleanPolicy, DdcError, DdcResult, DeclaredSpec, EngineKey, LevelSpec, LookupError,
    MediumType, RuntimeInfo, RuntimeType, TieredStoreError,
};
pub use ddc_engine::{InMemorySpecStore, SpecFetcher};

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// INSTRUMENTED FETCHERS
// ============================================================================

/// Wraps a fetcher, counting calls and optionally delaying each one.
///
/// The delay widens the window in which concurrent callers can race, which
/// is what single-flight tests need to observe.
#[derive(Debug)]
pub struct CountingFetcher<F> {
    inner: F,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl<F: SpecFetcher> CountingFetcher<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Sleep for `delay` inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: SpecFetcher> SpecFetcher for CountingFetcher<F> {
    async fn fetch(&self, name: &str, namespace: &str) -> DdcResult<Option<DeclaredSpec>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.fetch(name, namespace).await
    }
}

/// Fetcher whose lookups fail outright, as an unreachable API server would.
#[derive(Debug, Clone)]
pub struct FailingFetcher {
    reason: String,
}

impl FailingFetcher {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for FailingFetcher {
    fn default() -> Self {
        Self::new("connection refused")
    }
}

#[async_trait]
impl SpecFetcher for FailingFetcher {
    async fn fetch(&self, name: &str, namespace: &str) -> DdcResult<Option<DeclaredSpec>> {
        Err(LookupError::Failed {
            name: name.to_string(),
            namespace: namespace.to_string(),
            reason: self.reason.clone(),
        }
        .into())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for tiered store text.

    use super::*;
    use proptest::prelude::*;

    /// A recognised quota unit.
    pub fn arb_unit() -> impl Strategy<Value = &'static str> {
        prop::sample::select(
            ddc_core::QUOTA_UNITS
                .iter()
                .map(|(unit, _)| *unit)
                .collect::<Vec<_>>(),
        )
    }

    /// A unit suffix no parser accepts.
    pub fn arb_invalid_unit() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("ST".to_string()),
            Just("Gb".to_string()),
            Just("KB".to_string()),
            Just("gi".to_string()),
            Just("E".to_string()),
            "[A-Za-z]{3,5}",
        ]
    }

    /// A well-formed quota token paired with its exact byte value.
    ///
    /// Numbers stay small enough that no unit overflows `u64`.
    pub fn arb_quota_token() -> impl Strategy<Value = (String, u64)> {
        (0u64..1024, arb_unit()).prop_map(|(n, unit)| {
            let multiplier = ddc_core::unit_multiplier(unit).unwrap_or(1);
            (format!("{n}{unit}"), n * multiplier)
        })
    }

    /// An absolute cache directory path.
    pub fn arb_path() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-z][a-z0-9_-]{0,7}", 1..4)
            .prop_map(|segments| format!("/{}", segments.join("/")))
    }

    /// Distinct paths, between one and `max` of them.
    pub fn arb_distinct_paths(max: usize) -> impl Strategy<Value = Vec<String>> {
        prop::collection::hash_set(arb_path(), 1..=max.max(1))
            .prop_map(|set| set.into_iter().collect())
    }

    pub fn arb_runtime_type() -> impl Strategy<Value = RuntimeType> {
        prop::sample::select(RuntimeType::ALL.to_vec())
    }

    pub fn arb_clean_policy() -> impl Strategy<Value = CleanPolicy> {
        prop_oneof![
            Just(CleanPolicy::OnDemand),
            Just(CleanPolicy::OnRuntimeDeleted),
            Just(CleanPolicy::Always),
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! A small cluster of declared runtimes in the `fluid` namespace.
    //!
    //! - `runtime1`, `runtime2`: no tiered store, `OnDemand` clean policy
    //! - `runtime3`: two paths with an unrecognised quota unit
    //! - `runtime4`: not declared

    use super::*;

    pub const NAMESPACE: &str = "fluid";

    pub fn key(name: &str) -> EngineKey {
        EngineKey::new(name, NAMESPACE)
    }

    pub fn on_demand_spec() -> DeclaredSpec {
        DeclaredSpec::new(RuntimeType::Eac).with_clean_policy(CleanPolicy::OnDemand)
    }

    pub fn invalid_quota_spec() -> DeclaredSpec {
        DeclaredSpec::new(RuntimeType::Eac)
            .with_clean_policy(CleanPolicy::OnDemand)
            .with_level(LevelSpec::new("/mnt/cache1,/mnt/cache2", "100ST,50Gi"))
    }

    /// Two-level store: memory over SSD, with a broadcast quota on the SSD.
    pub fn two_level_spec() -> DeclaredSpec {
        DeclaredSpec::new(RuntimeType::Alluxio)
            .with_level(
                LevelSpec::new("/dev/shm", "2Gi")
                    .with_medium(MediumType::Memory)
                    .with_watermarks("0.95", "0.7"),
            )
            .with_level(
                LevelSpec::new("/mnt/ssd0,/mnt/ssd1", "100Gi").with_medium(MediumType::Ssd),
            )
    }

    /// The standard store: `runtime1`..`runtime3`.
    pub fn fluid_store() -> InMemorySpecStore {
        InMemorySpecStore::from_specs([
            (key("runtime1"), on_demand_spec()),
            (key("runtime2"), on_demand_spec()),
            (key("runtime3"), invalid_quota_spec()),
        ])
    }

    /// [`fluid_store`] behind a call counter.
    pub fn counted_fluid_store() -> Arc<CountingFetcher<InMemorySpecStore>> {
        Arc::new(CountingFetcher::new(fluid_store()))
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on resolution outcomes.

    use super::*;

    /// Assert that a result is a `RuntimeNotFound` for `name`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &DdcResult<T>, name: &str) {
        match result {
            Err(DdcError::RuntimeNotFound { name: n, .. }) => {
                assert_eq!(n, name, "Wrong name in RuntimeNotFound");
            }
            other => panic!("Expected RuntimeNotFound for {name}, got: {other:?}"),
        }
    }

    /// Assert that a result is a tiered store failure at `level` and return
    /// the sub-kind for further checks.
    #[track_caller]
    pub fn assert_tiered_store_invalid<T: std::fmt::Debug>(
        result: &DdcResult<T>,
        level: usize,
    ) -> &TieredStoreError {
        match result {
            Err(DdcError::TieredStoreInvalid { level: l, source }) => {
                assert_eq!(*l, level, "Wrong level in TieredStoreInvalid");
                source
            }
            other => panic!("Expected TieredStoreInvalid at level {level}, got: {other:?}"),
        }
    }

    /// Assert that a result is a lookup failure.
    #[track_caller]
    pub fn assert_lookup_error<T: std::fmt::Debug>(result: &DdcResult<T>) {
        match result {
            Err(DdcError::Lookup(_)) => {}
            other => panic!("Expected Lookup error, got: {other:?}"),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
