//! Quota and path parsing for tiered store levels.
//!
//! Declared levels carry their paths and quotas as comma-delimited text.
//! This module turns that text into typed values and nothing more; the
//! cross-field rules live in [`crate::tiered_store`].
//!
//! # Quota grammar
//!
//! ```text
//! quota  := number unit
//! number := digits [ "." digits ] | "." digits
//! unit   := "" | "K" | "M" | "G" | "T" | "P" | "Ki" | "Mi" | "Gi" | "Ti" | "Pi"
//! ```
//!
//! Plain letters scale by powers of 1000, `i`-suffixed units by powers of
//! 1024, and the empty unit means raw bytes. Fractional values round up to
//! the next whole byte.

use crate::TieredStoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Recognised quota units and their byte multipliers.
pub const QUOTA_UNITS: [(&str, u64); 11] = [
    ("", 1),
    ("K", 1_000),
    ("M", 1_000_000),
    ("G", 1_000_000_000),
    ("T", 1_000_000_000_000),
    ("P", 1_000_000_000_000_000),
    ("Ki", 1 << 10),
    ("Mi", 1 << 20),
    ("Gi", 1 << 30),
    ("Ti", 1 << 40),
    ("Pi", 1 << 50),
];

/// Binary units used when rendering a quota, largest first.
const DISPLAY_UNITS: [(&str, u64); 5] = [
    ("Pi", 1 << 50),
    ("Ti", 1 << 40),
    ("Gi", 1 << 30),
    ("Mi", 1 << 20),
    ("Ki", 1 << 10),
];

/// Fractional digits kept exactly; anything beyond only affects rounding.
const MAX_FRACTION_DIGITS: usize = 18;

/// Byte multiplier for a quota unit, or `None` if the unit is not recognised.
pub fn unit_multiplier(unit: &str) -> Option<u64> {
    QUOTA_UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, multiplier)| *multiplier)
}

/// A capacity quota in bytes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quota(u64);

impl Quota {
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> u64 {
        self.0
    }
}

impl From<Quota> for u64 {
    fn from(quota: Quota) -> Self {
        quota.0
    }
}

impl fmt::Display for Quota {
    /// Renders with the largest binary unit that divides the value exactly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0 {
            for (unit, multiplier) in DISPLAY_UNITS {
                if self.0 % multiplier == 0 {
                    return write!(f, "{}{}", self.0 / multiplier, unit);
                }
            }
        }
        write!(f, "{}", self.0)
    }
}

impl FromStr for Quota {
    type Err = TieredStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_quota(s)
    }
}

/// Split a comma-delimited path list.
///
/// Tokens are trimmed; a blank token anywhere fails the whole list.
pub fn parse_paths(raw: &str) -> Result<Vec<String>, TieredStoreError> {
    raw.split(',')
        .enumerate()
        .map(|(position, token)| {
            let path = token.trim();
            if path.is_empty() {
                Err(TieredStoreError::EmptyPath {
                    raw: raw.to_string(),
                    position,
                })
            } else {
                Ok(path.to_string())
            }
        })
        .collect()
}

/// Split and parse a comma-delimited quota list.
///
/// A blank list yields no quotas; a blank token inside a non-blank list is
/// an invalid number.
pub fn parse_quota_list(raw: &str) -> Result<Vec<Quota>, TieredStoreError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',').map(parse_quota).collect()
}

/// Parse a single quota token such as `100Gi`, `1.5T` or `4096`.
pub fn parse_quota(token: &str) -> Result<Quota, TieredStoreError> {
    let token = token.trim();

    if token.starts_with('-') || token.starts_with('+') {
        return Err(invalid_number(token, "signed values are not allowed"));
    }

    let split = token
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(token.len());
    let (number, unit) = token.split_at(split);

    let multiplier = unit_multiplier(unit).ok_or_else(|| TieredStoreError::InvalidQuotaUnit {
        token: token.to_string(),
        unit: unit.to_string(),
    })?;

    scale(number, multiplier)
        .map(Quota)
        .map_err(|reason| invalid_number(token, reason))
}

fn invalid_number(token: &str, reason: &str) -> TieredStoreError {
    TieredStoreError::InvalidQuotaNumber {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}

/// Multiply a non-negative decimal literal by `multiplier`, rounding up.
fn scale(number: &str, multiplier: u64) -> Result<u64, &'static str> {
    let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));

    if int_part.is_empty() && frac_part.is_empty() {
        return Err("missing numeric value");
    }
    if frac_part.contains('.') {
        return Err("more than one decimal point");
    }

    let whole = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse::<u64>()
            .map_err(|_| "value out of range")?
            .checked_mul(multiplier)
            .ok_or("value out of range")?
    };

    let digits = frac_part.trim_end_matches('0');
    if digits.is_empty() {
        return Ok(whole);
    }

    let (kept, dropped) = digits.split_at(digits.len().min(MAX_FRACTION_DIGITS));
    let numerator = kept
        .parse::<u128>()
        .map_err(|_| "value out of range")?
        * u128::from(multiplier);
    let denominator = 10u128.pow(kept.len() as u32);

    let mut fraction = numerator / denominator;
    if numerator % denominator != 0 || dropped.bytes().any(|b| b != b'0') {
        fraction += 1;
    }

    // fraction <= multiplier, so it always fits
    whole
        .checked_add(fraction as u64)
        .ok_or("value out of range")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_bytes() {
        assert_eq!(parse_quota("4096"), Ok(Quota::from_bytes(4096)));
        assert_eq!(parse_quota("0"), Ok(Quota::from_bytes(0)));
    }

    #[test]
    fn test_parse_decimal_units() {
        assert_eq!(parse_quota("2K").unwrap().bytes(), 2_000);
        assert_eq!(parse_quota("3M").unwrap().bytes(), 3_000_000);
        assert_eq!(parse_quota("1G").unwrap().bytes(), 1_000_000_000);
        assert_eq!(parse_quota("1T").unwrap().bytes(), 1_000_000_000_000);
        assert_eq!(parse_quota("1P").unwrap().bytes(), 1_000_000_000_000_000);
    }

    #[test]
    fn test_parse_binary_units() {
        assert_eq!(parse_quota("1Ki").unwrap().bytes(), 1024);
        assert_eq!(parse_quota("100Gi").unwrap().bytes(), 100 * (1 << 30));
        assert_eq!(parse_quota("50Gi").unwrap().bytes(), 50 * (1 << 30));
        assert_eq!(parse_quota("2Pi").unwrap().bytes(), 2 * (1u64 << 50));
    }

    #[test]
    fn test_parse_fraction_rounds_up() {
        assert_eq!(parse_quota("1.5Gi").unwrap().bytes(), 3 * (1 << 29));
        assert_eq!(parse_quota(".5Ki").unwrap().bytes(), 512);
        assert_eq!(parse_quota("0.1").unwrap().bytes(), 1);
        assert_eq!(parse_quota("1.0001K").unwrap().bytes(), 1_001);
        assert_eq!(parse_quota("2.000").unwrap().bytes(), 2);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parse_quota("  10Mi ").unwrap().bytes(), 10 * (1 << 20));
    }

    #[test]
    fn test_unknown_unit_rejected() {
        let err = parse_quota("100ST").unwrap_err();
        assert_eq!(
            err,
            TieredStoreError::InvalidQuotaUnit {
                token: "100ST".to_string(),
                unit: "ST".to_string(),
            }
        );
        assert!(matches!(
            parse_quota("10gi"),
            Err(TieredStoreError::InvalidQuotaUnit { .. })
        ));
        assert!(matches!(
            parse_quota("1e3"),
            Err(TieredStoreError::InvalidQuotaUnit { .. })
        ));
        assert!(matches!(
            parse_quota("10 Gi"),
            Err(TieredStoreError::InvalidQuotaUnit { .. })
        ));
    }

    #[test]
    fn test_bad_numbers_rejected() {
        for token in ["Gi", "", ".", "1.2.3Mi", "-1Gi", "+5"] {
            assert!(
                matches!(
                    parse_quota(token),
                    Err(TieredStoreError::InvalidQuotaNumber { .. })
                ),
                "expected invalid number for {:?}",
                token
            );
        }
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(matches!(
            parse_quota("18446744073709551616"),
            Err(TieredStoreError::InvalidQuotaNumber { .. })
        ));
        assert!(matches!(
            parse_quota("20000Pi"),
            Err(TieredStoreError::InvalidQuotaNumber { .. })
        ));
        assert!(matches!(
            parse_quota("999999P"),
            Err(TieredStoreError::InvalidQuotaNumber { .. })
        ));
        assert_eq!(parse_quota("18446744073709551615").unwrap().bytes(), u64::MAX);
    }

    #[test]
    fn test_parse_paths_trims_and_orders() {
        let paths = parse_paths(" /mnt/cache1 ,/mnt/cache2").unwrap();
        assert_eq!(paths, vec!["/mnt/cache1", "/mnt/cache2"]);
    }

    #[test]
    fn test_parse_paths_rejects_blank_token() {
        let err = parse_paths("/mnt/cache1,,/mnt/cache3").unwrap_err();
        assert!(matches!(err, TieredStoreError::EmptyPath { position: 1, .. }));
        assert!(matches!(
            parse_paths(""),
            Err(TieredStoreError::EmptyPath { position: 0, .. })
        ));
        assert!(parse_paths("/mnt/cache1, ").is_err());
    }

    #[test]
    fn test_parse_quota_list() {
        let quotas = parse_quota_list("100Gi, 50Gi").unwrap();
        assert_eq!(
            quotas,
            vec![
                Quota::from_bytes(100 * (1 << 30)),
                Quota::from_bytes(50 * (1 << 30))
            ]
        );
        assert!(parse_quota_list("   ").unwrap().is_empty());
        assert!(matches!(
            parse_quota_list("1Gi,"),
            Err(TieredStoreError::InvalidQuotaNumber { .. })
        ));
        assert!(matches!(
            parse_quota_list("100ST,50Gi"),
            Err(TieredStoreError::InvalidQuotaUnit { .. })
        ));
    }

    #[test]
    fn test_quota_display() {
        assert_eq!(Quota::from_bytes(100 * (1 << 30)).to_string(), "100Gi");
        assert_eq!(Quota::from_bytes(3072).to_string(), "3Ki");
        assert_eq!(Quota::from_bytes(1536).to_string(), "1536");
        assert_eq!(Quota::from_bytes(1000).to_string(), "1000");
        assert_eq!(Quota::from_bytes(0).to_string(), "0");
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Integer quotas scale exactly by their unit multiplier.
        #[test]
        fn prop_integer_quota_scales_by_unit(
            value in 0u64..1_000,
            index in 0usize..QUOTA_UNITS.len(),
        ) {
            let (unit, multiplier) = QUOTA_UNITS[index];
            let parsed = parse_quota(&format!("{}{}", value, unit)).unwrap();
            prop_assert_eq!(parsed.bytes(), value * multiplier);
        }

        /// Any integer either scales exactly or overflows as an invalid number.
        #[test]
        fn prop_integer_quota_overflow_is_invalid_number(
            value in any::<u64>(),
            index in 0usize..QUOTA_UNITS.len(),
        ) {
            let (unit, multiplier) = QUOTA_UNITS[index];
            let result = parse_quota(&format!("{}{}", value, unit));
            match value.checked_mul(multiplier) {
                Some(bytes) => prop_assert_eq!(result.unwrap().bytes(), bytes),
                None => {
                    let overflowed = matches!(
                        result,
                        Err(TieredStoreError::InvalidQuotaNumber { .. })
                    );
                    prop_assert!(overflowed);
                }
            }
        }

        /// Display output always parses back to the same byte count.
        #[test]
        fn prop_display_reparses(bytes in any::<u64>()) {
            let quota = Quota::from_bytes(bytes);
            prop_assert_eq!(parse_quota(&quota.to_string()), Ok(quota));
        }

        /// Two-letter uppercase units outside the table are always rejected.
        #[test]
        fn prop_unknown_units_rejected(value in 0u64..10_000, unit in "[A-Z]{2}") {
            prop_assume!(unit_multiplier(&unit).is_none());
            let result = parse_quota(&format!("{}{}", value, unit));
            let is_unit_error = matches!(result, Err(TieredStoreError::InvalidQuotaUnit { .. }));
            prop_assert!(is_unit_error);
        }

        /// Fractional quotas never round below the truncated integer value.
        #[test]
        fn prop_fraction_bounds(int in 0u64..1_000, frac in 0u32..1_000) {
            let parsed = parse_quota(&format!("{}.{:03}Ki", int, frac)).unwrap();
            prop_assert!(parsed.bytes() >= int * 1024);
            prop_assert!(parsed.bytes() <= (int + 1) * 1024);
        }
    }
}
