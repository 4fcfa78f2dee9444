//! Error types for runtime metadata resolution

use thiserror::Error;

/// Tiered store parse and validation errors.
///
/// Every variant is fatal for the build that produced it; no partial
/// `RuntimeInfo` is ever assembled around one of these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TieredStoreError {
    #[error("Empty path at position {position} in \"{raw}\"")]
    EmptyPath { raw: String, position: usize },

    #[error("Duplicate path {path} in tiered store level")]
    DuplicatePath { path: String },

    #[error("Invalid quota unit \"{unit}\" in quota \"{token}\"")]
    InvalidQuotaUnit { token: String, unit: String },

    #[error("Invalid quota number in \"{token}\": {reason}")]
    InvalidQuotaNumber { token: String, reason: String },

    #[error("Path/quota count mismatch: {paths} paths, {quotas} quotas")]
    PathQuotaCountMismatch { paths: usize, quotas: usize },

    #[error("Invalid {field} watermark \"{value}\": {reason}")]
    InvalidWatermark {
        field: String,
        value: String,
        reason: String,
    },
}

/// Failures of the injected declared-spec lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("Lookup of {namespace}/{name} failed: {reason}")]
    Failed {
        name: String,
        namespace: String,
        reason: String,
    },

    #[error("Declared spec for {namespace}/{name} is malformed: {reason}")]
    Malformed {
        name: String,
        namespace: String,
        reason: String,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for runtime metadata resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DdcError {
    #[error("Runtime {namespace}/{name} not found")]
    RuntimeNotFound { name: String, namespace: String },

    #[error("Tiered store level {level} is invalid: {source}")]
    TieredStoreInvalid {
        level: usize,
        #[source]
        source: TieredStoreError,
    },

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl DdcError {
    /// The tiered store sub-kind, when this is a validation failure.
    pub fn tiered_store_error(&self) -> Option<&TieredStoreError> {
        match self {
            DdcError::TieredStoreInvalid { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether this failure describes the declared spec itself.
    ///
    /// A spec that was fetched but could not be decoded counts as a spec
    /// failure. A failed lookup is a transport problem and says nothing about
    /// the spec, so it is never memoized.
    pub fn is_spec_failure(&self) -> bool {
        matches!(
            self,
            DdcError::RuntimeNotFound { .. }
                | DdcError::TieredStoreInvalid { .. }
                | DdcError::Lookup(LookupError::Malformed { .. })
        )
    }
}

/// Result type alias for runtime metadata operations.
pub type DdcResult<T> = Result<T, DdcError>;

// =============================================================================
// TESTS
// =============================================================================
