//! Runtime info cache
//!
//! Memoizes the [`RuntimeInfo`](ddc_core::RuntimeInfo) of each engine
//! instance. The first call for an instance fetches its declared spec and
//! builds; every later call answers from the entry until it is refreshed,
//! invalidated or removed.
//!
//! # Entry lifecycle
//!
//! ```text
//!            build ok
//!   Empty ─────────────► Built
//!     │  ▲                 │
//!     │  └── invalidate ───┤
//!     │  build fails       │ refresh
//!     ▼  (spec failure)    ▼
//!   Failed ◄──────────── (rebuild)
//! ```
//!
//! Lookup failures (the fetch itself erroring) leave the entry Empty so the
//! next call tries again.

mod entry;
mod registry;
mod stats;

pub use entry::{CacheEntry, EntryState, EntryStatus};
pub use registry::RuntimeInfoCache;
pub use stats::CacheStats;
