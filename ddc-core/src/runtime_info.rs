//! Resolved runtime metadata and its builder.
//!
//! Building is a pure function of identity, clean policy and declared
//! levels: no I/O, no clock, no shared state. The first invalid level (in
//! declared order) fails the build and nothing partial is returned.

use crate::tiered_store::{validate_level, TieredStoreLevel};
use crate::{
    CleanPolicy, DdcError, DdcResult, DeclaredSpec, EngineIdentity, EngineKey, LevelSpec,
    Quota, RuntimeType,
};
use serde::Serialize;

/// Label prefix under which nodes advertise an engine's cache storage.
pub const STORAGE_LABEL_PREFIX: &str = "data.fluid.io/storage";

/// Immutable, validated metadata for one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeInfo {
    identity: EngineIdentity,
    clean_policy: CleanPolicy,
    levels: Vec<TieredStoreLevel>,
}

/// Build runtime info from identity, clean policy and declared levels.
pub fn build_runtime_info(
    identity: EngineIdentity,
    clean_policy: CleanPolicy,
    level_specs: &[LevelSpec],
) -> DdcResult<RuntimeInfo> {
    let levels = level_specs
        .iter()
        .enumerate()
        .map(|(level, spec)| {
            validate_level(spec).map_err(|source| DdcError::TieredStoreInvalid { level, source })
        })
        .collect::<DdcResult<Vec<_>>>()?;

    Ok(RuntimeInfo {
        identity,
        clean_policy,
        levels,
    })
}

impl RuntimeInfo {
    /// Build from a declared spec fetched for `key`.
    ///
    /// `default_clean_policy` applies when the declared spec omits one.
    pub fn from_declared(
        key: &EngineKey,
        spec: &DeclaredSpec,
        default_clean_policy: CleanPolicy,
    ) -> DdcResult<Self> {
        build_runtime_info(
            EngineIdentity::from_key(key.clone(), spec.runtime_type),
            spec.clean_policy_or(default_clean_policy),
            spec.levels(),
        )
    }

    pub fn identity(&self) -> &EngineIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }

    pub fn namespace(&self) -> &str {
        self.identity.namespace()
    }

    pub fn runtime_type(&self) -> RuntimeType {
        self.identity.runtime_type()
    }

    pub fn clean_policy(&self) -> CleanPolicy {
        self.clean_policy
    }

    pub fn levels(&self) -> &[TieredStoreLevel] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Option<&TieredStoreLevel> {
        self.levels.get(index)
    }

    /// Whether any tiered store level was declared.
    pub fn is_tiered(&self) -> bool {
        !self.levels.is_empty()
    }

    /// Total capacity of one level; zero for a level that does not exist.
    pub fn level_capacity(&self, index: usize) -> u64 {
        self.level(index)
            .map(TieredStoreLevel::total_capacity)
            .unwrap_or(0)
    }

    /// Ordered paths of one level; empty for a level that does not exist.
    pub fn level_paths(&self, index: usize) -> &[String] {
        self.level(index).map(TieredStoreLevel::paths).unwrap_or(&[])
    }

    /// Capacity across all levels, saturating at `u64::MAX`.
    pub fn total_capacity(&self) -> u64 {
        self.levels
            .iter()
            .fold(0u64, |acc, level| acc.saturating_add(level.total_capacity()))
    }

    /// Every cache path as `(level, path, quota)`, level by level.
    pub fn cache_paths(&self) -> impl Iterator<Item = (usize, &str, Quota)> + '_ {
        self.levels
            .iter()
            .enumerate()
            .flat_map(|(index, level)| {
                level
                    .cache_paths()
                    .map(move |(path, quota)| (index, path, quota))
            })
    }

    /// Node label marking nodes that hold this engine's cache.
    pub fn common_label_name(&self) -> String {
        format!(
            "{}-{}-{}",
            STORAGE_LABEL_PREFIX,
            self.namespace(),
            self.name()
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
