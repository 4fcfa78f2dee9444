//! Fuzz test for tiered store level validation
//!
//! Splits the input at the first newline into a path list and a quota list.
//! A level that validates must pair every path with exactly one quota.
//!
//! Run with: cargo +nightly fuzz run level_fuzz -- -max_total_time=60

#![no_main]

use ddc_core::validate;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let (paths, quotas) = input.split_once('\n').unwrap_or((input, ""));

        if let Ok(level) = validate(paths, quotas) {
            assert!(!level.paths().is_empty());
            assert_eq!(level.paths().len(), level.quotas().len());
            assert_eq!(level.cache_paths().count(), level.paths().len());

            let sum = level
                .quotas()
                .iter()
                .fold(0u64, |acc, q| acc.saturating_add(q.bytes()));
            assert_eq!(level.total_capacity(), sum);
        }
    }
});
