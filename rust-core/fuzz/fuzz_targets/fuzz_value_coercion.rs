// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for literal coercion against every scalar kind.
// Run with: cargo +nightly fuzz run fuzz_value_coercion

#![no_main]

use dynaquery_core::predicate::parse_between;
use dynaquery_core::{coerce, ScalarKind, ScalarType};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    for kind in ScalarKind::ALL {
        let _ = coerce(input, ScalarType::required(kind));
        let _ = coerce(input, ScalarType::nullable(kind));
    }
    if let Ok((lo, hi)) = parse_between(input) {
        assert_eq!(input.split(',').count(), 2, "{lo},{hi}");
    }
});
