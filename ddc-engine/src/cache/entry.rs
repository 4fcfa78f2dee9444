//! Per-instance cache entries.

use chrono::{DateTime, Utc};
use ddc_core::{DdcError, DdcResult, RuntimeInfo};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Resolution state of one engine instance.
///
/// The success value and the failure are mutually exclusive by
/// construction; there is no "both set" or "neither set with a result".
#[derive(Debug, Clone, Default)]
pub enum CacheEntry {
    /// Registered, not yet resolved (or explicitly invalidated).
    #[default]
    Empty,
    /// Resolved successfully.
    Built(Arc<RuntimeInfo>),
    /// Resolution failed because of the declared spec itself.
    Failed(DdcError),
}

impl CacheEntry {
    pub fn state(&self) -> EntryState {
        match self {
            CacheEntry::Empty => EntryState::Empty,
            CacheEntry::Built(_) => EntryState::Built,
            CacheEntry::Failed(_) => EntryState::Failed,
        }
    }

    pub fn runtime_info(&self) -> Option<&Arc<RuntimeInfo>> {
        match self {
            CacheEntry::Built(info) => Some(info),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&DdcError> {
        match self {
            CacheEntry::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Discriminant of a [`CacheEntry`], for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    Empty,
    Built,
    Failed,
}

impl EntryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Empty => "empty",
            EntryState::Built => "built",
            EntryState::Failed => "failed",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of an entry, as reported by `RuntimeInfoCache::status`.
#[derive(Debug, Clone)]
pub struct EntryStatus {
    pub state: EntryState,
    /// When the entry last changed state.
    pub changed_at: DateTime<Utc>,
    /// Fetch-and-build attempts made for this entry.
    pub builds: u64,
    /// The cached failure, when `state` is `Failed`.
    pub error: Option<DdcError>,
}

/// Lock-protected entry plus bookkeeping.
#[derive(Debug)]
pub(crate) struct SlotState {
    pub(crate) entry: CacheEntry,
    pub(crate) changed_at: DateTime<Utc>,
    pub(crate) builds: u64,
    /// Outcome of the latest build, including lookup errors that leave the
    /// entry empty. Callers that queued behind that build return it.
    pub(crate) last_outcome: Option<DdcResult<Arc<RuntimeInfo>>>,
}

impl SlotState {
    pub(crate) fn transition(&mut self, entry: CacheEntry) {
        self.entry = entry;
        self.changed_at = Utc::now();
    }

    pub(crate) fn status(&self) -> EntryStatus {
        EntryStatus {
            state: self.entry.state(),
            changed_at: self.changed_at,
            builds: self.builds,
            error: self.entry.error().cloned(),
        }
    }
}

/// Registry slot for one engine instance.
///
/// Readers take the read lock to observe a settled entry. Anything that
/// changes the entry (build, refresh, seed, invalidate) holds the write lock
/// for the whole operation, including the fetch, so same-key builds are
/// serialized while other keys proceed.
///
/// `completed` counts finished builds and is readable without the lock, so
/// a caller can note it on arrival and later tell whether a build finished
/// while it was queued.
#[derive(Debug)]
pub(crate) struct EngineSlot {
    pub(crate) state: RwLock<SlotState>,
    completed: AtomicU64,
}

impl EngineSlot {
    pub(crate) fn completed_builds(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Called with the write lock held, after the outcome is recorded.
    pub(crate) fn mark_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for EngineSlot {
    fn default() -> Self {
        Self {
            completed: AtomicU64::new(0),
            state: RwLock::new(SlotState {
                entry: CacheEntry::Empty,
                changed_at: Utc::now(),
                builds: 0,
                last_outcome: None,
            }),
        }
    }
}
