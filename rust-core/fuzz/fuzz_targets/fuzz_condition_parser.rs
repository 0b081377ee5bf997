// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for dotted paths and encoded `path,Operator,value` conditions.
// Run with: cargo +nightly fuzz run fuzz_condition_parser
//
// Malformed input must come back as an error, never a panic. Anything that
// parses must re-encode to a form that parses to the same condition.

#![no_main]

use dynaquery_core::{Condition, FieldPath};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if input.len() > 4096 {
        return;
    }

    if let Ok(path) = FieldPath::parse(input) {
        assert_eq!(path.len(), path.segments().len());
    }

    if let Ok(condition) = Condition::parse(input) {
        let reparsed = Condition::parse(&condition.encode());
        assert_eq!(reparsed.ok(), Some(condition));
    }
});
