// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for test report parsing
//!
//! Report files come from arbitrary test runs, so the parser must never
//! panic on hostile or truncated XML.

#![no_main]

use libfuzzer_sys::fuzz_target;

use hushbuild_reports::junit::parse_report_str;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(report) = parse_report_str(input) {
            for detail in &report.details {
                // Stored traces are already truncated
                let lines = detail.stack_trace().map_or(0, |t| t.split('\n').count());
                assert!(lines <= 21);
            }
        }
    }
});
