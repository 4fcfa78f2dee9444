//! DDC Engine - Runtime Info Resolution
//!
//! Turns the declared spec of a data-caching runtime into a validated
//! [`RuntimeInfo`](ddc_core::RuntimeInfo) and memoizes it per engine
//! instance. Concurrent callers for the same instance share one fetch and
//! one build; different instances resolve independently.
//!
//! ```ignore
//! use ddc_engine::{EngineConfig, InMemorySpecStore, RuntimeInfoCache};
//!
//! let store = Arc::new(InMemorySpecStore::new());
//! let cache = RuntimeInfoCache::new(store, EngineConfig::from_env()?);
//! let info = cache.get_runtime_info(&EngineKey::new("hbase", "fluid")).await?;
//! ```

pub mod cache;
pub mod config;
pub mod fetcher;
pub mod telemetry;

pub use cache::{CacheEntry, CacheStats, EntryState, EntryStatus, RuntimeInfoCache};
pub use config::{EngineConfig, FailurePolicy, DEFAULT_CLEAN_POLICY_VAR, FAILURE_POLICY_VAR};
pub use fetcher::{InMemorySpecStore, OfflineSpecFetcher, SpecFetcher};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig, LOG_FILTER_VAR, LOG_FORMAT_VAR};
