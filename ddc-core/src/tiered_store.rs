//! Tiered store level validation.
//!
//! Applies the cross-field rules on top of [`crate::quota`]:
//!
//! - a single quota with several paths is broadcast to every path
//! - otherwise the path and quota counts must match exactly
//! - paths within a level are unique
//! - watermarks, when declared, are ratios in `[0, 1]` with `low <= high`
//!
//! Any failure rejects the whole level.

use crate::quota::{parse_paths, parse_quota_list, Quota};
use crate::{LevelSpec, MediumType, TieredStoreError};
use serde::Serialize;
use std::collections::HashSet;

/// A validated tiered store level.
///
/// Fields are private and there is no `Deserialize`: a level only comes out
/// of [`validate`] or [`validate_level`], so `paths().len() == quotas().len()`
/// always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TieredStoreLevel {
    paths: Vec<String>,
    quotas: Vec<Quota>,
    medium_type: Option<MediumType>,
    high: Option<f64>,
    low: Option<f64>,
}

impl TieredStoreLevel {
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn quotas(&self) -> &[Quota] {
        &self.quotas
    }

    /// Paths paired with their quotas, in declared order.
    pub fn cache_paths(&self) -> impl Iterator<Item = (&str, Quota)> + '_ {
        self.paths
            .iter()
            .map(String::as_str)
            .zip(self.quotas.iter().copied())
    }

    /// Sum of all path quotas, saturating at `u64::MAX`.
    pub fn total_capacity(&self) -> u64 {
        self.quotas
            .iter()
            .fold(0u64, |acc, q| acc.saturating_add(q.bytes()))
    }

    pub fn medium_type(&self) -> Option<MediumType> {
        self.medium_type
    }

    pub fn high_watermark(&self) -> Option<f64> {
        self.high
    }

    pub fn low_watermark(&self) -> Option<f64> {
        self.low
    }
}

/// Validate raw path and quota lists into a level.
pub fn validate(paths_raw: &str, quotas_raw: &str) -> Result<TieredStoreLevel, TieredStoreError> {
    let paths = parse_paths(paths_raw)?;
    let quotas = parse_quota_list(quotas_raw)?;

    let mut seen = HashSet::with_capacity(paths.len());
    for path in &paths {
        if !seen.insert(path.as_str()) {
            return Err(TieredStoreError::DuplicatePath { path: path.clone() });
        }
    }

    let quotas = if paths.len() > 1 && quotas.len() == 1 {
        vec![quotas[0]; paths.len()]
    } else if paths.len() == quotas.len() {
        quotas
    } else {
        return Err(TieredStoreError::PathQuotaCountMismatch {
            paths: paths.len(),
            quotas: quotas.len(),
        });
    };

    Ok(TieredStoreLevel {
        paths,
        quotas,
        medium_type: None,
        high: None,
        low: None,
    })
}

/// Validate a full declared level, including its medium and watermarks.
pub fn validate_level(spec: &LevelSpec) -> Result<TieredStoreLevel, TieredStoreError> {
    let mut level = validate(&spec.paths_raw, &spec.quotas_raw)?;

    let high = spec
        .high
        .as_deref()
        .map(|v| parse_watermark("high", v))
        .transpose()?;
    let low = spec
        .low
        .as_deref()
        .map(|v| parse_watermark("low", v))
        .transpose()?;

    if let (Some(high), Some(low)) = (high, low) {
        if low > high {
            return Err(TieredStoreError::InvalidWatermark {
                field: "low".to_string(),
                value: low.to_string(),
                reason: format!("must not exceed high watermark {}", high),
            });
        }
    }

    level.medium_type = spec.medium_type;
    level.high = high;
    level.low = low;
    Ok(level)
}

fn parse_watermark(field: &str, raw: &str) -> Result<f64, TieredStoreError> {
    let invalid = |reason: &str| TieredStoreError::InvalidWatermark {
        field: field.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let ratio: f64 = raw.trim().parse().map_err(|_| invalid("not a number"))?;
    if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
        return Err(invalid("must be between 0 and 1"));
    }
    Ok(ratio)
}

// ============================================================================
// TESTS
// ============================================================================
