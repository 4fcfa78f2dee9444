//! Engine configuration
//!
//! Configuration is loaded from environment variables with defaults that
//! match the behaviour reconcilers expect out of the box.

use ddc_core::{CleanPolicy, ConfigError, DdcResult};
use std::fmt;
use std::str::FromStr;

/// Environment variable selecting the [`FailurePolicy`].
pub const FAILURE_POLICY_VAR: &str = "DDC_FAILURE_POLICY";

/// Environment variable selecting the clean policy used when a spec omits one.
pub const DEFAULT_CLEAN_POLICY_VAR: &str = "DDC_DEFAULT_CLEAN_POLICY";

/// What a cached build failure means for the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FailurePolicy {
    /// Keep returning the cached failure until the entry is refreshed.
    #[default]
    Sticky,
    /// Treat a failed entry as empty and rebuild on the next call.
    Retry,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Sticky => "sticky",
            FailurePolicy::Retry => "retry",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sticky" => Ok(FailurePolicy::Sticky),
            "retry" => Ok(FailurePolicy::Retry),
            _ => Err(ConfigError::InvalidValue {
                field: FAILURE_POLICY_VAR.to_string(),
                value: s.to_string(),
                reason: "expected sticky or retry".to_string(),
            }),
        }
    }
}

/// Configuration for the runtime info cache.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineConfig {
    /// How cached build failures are treated on later calls.
    pub failure_policy: FailurePolicy,
    /// Clean policy applied when a declared spec does not set one.
    pub default_clean_policy: CleanPolicy,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the default clean policy.
    pub fn with_default_clean_policy(mut self, policy: CleanPolicy) -> Self {
        self.default_clean_policy = policy;
        self
    }

    /// Create an EngineConfig from environment variables.
    ///
    /// Environment variables:
    /// - `DDC_FAILURE_POLICY`: "sticky" or "retry" (default: sticky)
    /// - `DDC_DEFAULT_CLEAN_POLICY`: "OnDemand", "OnRuntimeDeleted" or "Always"
    ///   (default: OnRuntimeDeleted)
    ///
    /// Unset or blank variables keep their defaults; anything else that does
    /// not parse is an error.
    pub fn from_env() -> DdcResult<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like [`EngineConfig::from_env`], reading variables through `lookup`.
    pub fn from_vars<L>(lookup: L) -> DdcResult<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(value) = var(FAILURE_POLICY_VAR) {
            config.failure_policy = value.parse()?;
        }

        if let Some(value) = var(DEFAULT_CLEAN_POLICY_VAR) {
            config.default_clean_policy =
                value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: DEFAULT_CLEAN_POLICY_VAR.to_string(),
                    value: value.clone(),
                    reason: "expected OnDemand, OnRuntimeDeleted or Always".to_string(),
                })?;
        }

        Ok(config)
    }
}
