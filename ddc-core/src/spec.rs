//! Declared runtime resource types
//!
//! These mirror the custom resource as it is stored in the cluster: raw,
//! unvalidated, and serialized with the resource's camelCase field names.

use crate::{CleanPolicy, DdcError, DdcResult, EngineKey, LookupError, MediumType, RuntimeType};
use serde::{Deserialize, Serialize};

/// One declared tiered store level, before parsing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelSpec {
    /// Comma-delimited cache paths
    #[serde(rename = "path", default)]
    pub paths_raw: String,
    /// Comma-delimited quotas, one per path or a single broadcast quota
    #[serde(rename = "quotaList", default)]
    pub quotas_raw: String,
    #[serde(rename = "mediumtype", default, skip_serializing_if = "Option::is_none")]
    pub medium_type: Option<MediumType>,
    /// High watermark ratio, e.g. "0.95"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<String>,
    /// Low watermark ratio, e.g. "0.7"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<String>,
}

impl LevelSpec {
    pub fn new(paths_raw: impl Into<String>, quotas_raw: impl Into<String>) -> Self {
        Self {
            paths_raw: paths_raw.into(),
            quotas_raw: quotas_raw.into(),
            ..Default::default()
        }
    }

    pub fn with_medium(mut self, medium_type: MediumType) -> Self {
        self.medium_type = Some(medium_type);
        self
    }

    pub fn with_watermarks(mut self, high: impl Into<String>, low: impl Into<String>) -> Self {
        self.high = Some(high.into());
        self.low = Some(low.into());
        self
    }
}

/// Declared tiered store: ordered levels, level 0 first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TieredStoreSpec {
    #[serde(default)]
    pub levels: Vec<LevelSpec>,
}

/// Declared fuse settings relevant to metadata resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuseSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_policy: Option<CleanPolicy>,
}

/// What the custom resource declares for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredSpec {
    pub runtime_type: RuntimeType,
    #[serde(default)]
    pub fuse: FuseSpec,
    #[serde(default)]
    pub tiered_store: TieredStoreSpec,
}

impl DeclaredSpec {
    /// A spec with no tiered store and no explicit clean policy.
    pub fn new(runtime_type: RuntimeType) -> Self {
        Self {
            runtime_type,
            fuse: FuseSpec::default(),
            tiered_store: TieredStoreSpec::default(),
        }
    }

    pub fn with_clean_policy(mut self, clean_policy: CleanPolicy) -> Self {
        self.fuse.clean_policy = Some(clean_policy);
        self
    }

    pub fn with_level(mut self, level: LevelSpec) -> Self {
        self.tiered_store.levels.push(level);
        self
    }

    /// Declared clean policy, falling back to `default` when unset.
    pub fn clean_policy_or(&self, default: CleanPolicy) -> CleanPolicy {
        self.fuse.clean_policy.unwrap_or(default)
    }

    pub fn levels(&self) -> &[LevelSpec] {
        &self.tiered_store.levels
    }

    /// Decode a declared spec from its JSON form.
    ///
    /// The key is only used to attribute a decoding failure.
    pub fn from_json(key: &EngineKey, json: &str) -> DdcResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            DdcError::Lookup(LookupError::Malformed {
                name: key.name().to_string(),
                namespace: key.namespace().to_string(),
                reason: e.to_string(),
            })
        })
    }
}
