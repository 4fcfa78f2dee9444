//! DDC Core - Runtime Metadata Types
//!
//! Parsing, validation and assembly of the metadata a distributed cache
//! engine instance needs before it can be reconciled. Everything here is
//! pure: the crate performs no I/O and holds no shared state. Caching and
//! lookup live in `ddc-engine`.
//!
//! Layers, leaves first:
//! - [`quota`]: comma-delimited path and quota text into typed values
//! - [`tiered_store`]: cardinality, uniqueness and watermark rules per level
//! - [`runtime_info`]: identity plus validated levels into [`RuntimeInfo`]

pub mod enums;
pub mod error;
pub mod identity;
pub mod quota;
pub mod runtime_info;
pub mod spec;
pub mod tiered_store;

pub use enums::{
    CleanPolicy, CleanPolicyParseError, MediumType, MediumTypeParseError, RuntimeType,
    RuntimeTypeParseError,
};
pub use error::{ConfigError, DdcError, DdcResult, LookupError, TieredStoreError};
pub use identity::{EngineIdentity, EngineKey};
pub use quota::{parse_paths, parse_quota, parse_quota_list, unit_multiplier, Quota, QUOTA_UNITS};
pub use runtime_info::{build_runtime_info, RuntimeInfo, STORAGE_LABEL_PREFIX};
pub use spec::{DeclaredSpec, FuseSpec, LevelSpec, TieredStoreSpec};
pub use tiered_store::{validate, validate_level, TieredStoreLevel};
