// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for compiler diagnostic extraction and stack trace truncation

#![no_main]

use libfuzzer_sys::fuzz_target;

use hushbuild_reports::diagnostics::{parse_compiler_output, truncate_stack_trace};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        for error in parse_compiler_output(input) {
            assert!(error.file().ends_with(".java"));
            assert!(!error.message().is_empty());
        }
        let _ = truncate_stack_trace(input);
    }
});
