//! Fuzz test for quota parsing
//!
//! Feeds arbitrary text to the quota parser looking for panics, overflow and
//! values that do not survive rendering.
//!
//! Run with: cargo +nightly fuzz run quota_fuzz -- -max_total_time=60

#![no_main]

use ddc_core::{parse_quota, Quota, TieredStoreError};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        match parse_quota(input) {
            Ok(quota) => {
                // Rendered form must parse back to the same byte count
                let rendered = quota.to_string();
                let reparsed: Quota = rendered.parse().expect("rendered quota should parse");
                assert_eq!(reparsed, quota);
            }
            Err(TieredStoreError::InvalidQuotaUnit { .. })
            | Err(TieredStoreError::InvalidQuotaNumber { .. }) => {}
            Err(other) => panic!("unexpected error kind for a single quota: {other:?}"),
        }
    }
});
