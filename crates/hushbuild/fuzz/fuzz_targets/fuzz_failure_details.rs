// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for failure detail rendering

#![no_main]

use libfuzzer_sys::fuzz_target;

use hushbuild::formatter::{MAX_DETAIL_LINES, render_failure_details};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Some(block) = render_failure_details(input) {
            let lines: Vec<&str> = block.split('\n').collect();
            assert!(lines.len() <= MAX_DETAIL_LINES + 1);
            assert!(lines.iter().all(|l| l.starts_with("DETAIL")));
            assert!(!block.contains('\t'));
        }
    }
});
