// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Free-text diagnostics: stack traces, compiler output and build-log hints
//!
//! # Example
//!
//! ```
//! use hushbuild_reports::diagnostics::parse_compiler_output;
//!
//! let output = "[ERROR] /src/App.java:[10,15] cannot find symbol";
//! let errors = parse_compiler_output(output);
//! assert_eq!(errors[0].line(), 10);
//! ```

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::CompilerError;

/// Maximum number of stack trace lines kept on a [`crate::TestFailure`]
pub const MAX_STACK_TRACE_LINES: usize = 20;

/// Number of trailing build-log lines scanned for a failure hint
pub const BUILD_LOG_TAIL_LINES: usize = 200;

// `R` makes `$` stop before `\r\n` and keeps `\r` out of the captured message.
static COMPILER_ERROR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mR)^\s*(?:\[ERROR\]\s+)?(.+?\.java):\[(\d+),(\d+)\]\s+(.+)$")
        .expect("compiler diagnostic pattern is valid")
});

/// Truncate a stack trace to [`MAX_STACK_TRACE_LINES`] lines
///
/// Line endings are normalized to `\n` and surrounding blank lines are
/// trimmed. When lines are dropped, a final `\t... N more line(s)` line
/// records how many.
#[must_use]
pub fn truncate_stack_trace(trace: &str) -> String {
    let normalized = trace.replace("\r\n", "\n").replace('\r', "\n");
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let lines: Vec<&str> = trimmed.split('\n').collect();
    if lines.len() <= MAX_STACK_TRACE_LINES {
        return lines.join("\n");
    }

    let remaining = lines.len() - MAX_STACK_TRACE_LINES;
    let mut out = lines[..MAX_STACK_TRACE_LINES].join("\n");
    out.push_str(&format!(
        "\n\t... {} {}",
        remaining,
        if remaining == 1 { "more line" } else { "more lines" }
    ));
    out
}

/// Extract every `File.java:[line,column] message` diagnostic from `output`
///
/// The leading `[ERROR]` marker is optional and matches may appear on any
/// line. No truncation happens here; display limits belong to the formatter.
#[must_use]
pub fn parse_compiler_output(output: &str) -> Vec<CompilerError> {
    if output.is_empty() {
        return Vec::new();
    }

    COMPILER_ERROR_PATTERN
        .captures_iter(output)
        .filter_map(|caps| {
            let line = caps[2].parse().ok()?;
            let column = caps[3].parse().ok()?;
            Some(CompilerError::new(&caps[1], line, column, &caps[4]))
        })
        .collect()
}

/// Heuristic for lines worth surfacing from a build log
#[must_use]
pub fn looks_like_diagnostic_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with("at ") || trimmed.starts_with("...") {
        return false;
    }

    let lower = trimmed.to_lowercase();
    trimmed.starts_with("(line ")
        || [
            "parse error",
            "cannot find symbol",
            "error:",
            "failed with message",
            "not found",
            "no such",
            "syntax error",
            "expected one of",
        ]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Read the last `max_lines` lines of a log file
///
/// Invalid UTF-8 is replaced rather than rejected; build logs routinely mix
/// encodings.
///
/// # Errors
///
/// Returns the underlying IO error if the file cannot be opened or read.
pub fn log_tail(path: &Path, max_lines: usize) -> io::Result<Vec<String>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut tail = VecDeque::with_capacity(max_lines.min(1024));
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        tail.push_back(line.trim_end_matches(['\n', '\r']).to_string());
        if tail.len() > max_lines {
            tail.pop_front();
        }
    }

    Ok(tail.into())
}

/// Find the most recent diagnostic-looking line in a build log
///
/// Only the last [`BUILD_LOG_TAIL_LINES`] lines are considered. A missing or
/// unreadable log yields `None`.
#[must_use]
pub fn failure_hint_from_log(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }

    let tail = log_tail(path, BUILD_LOG_TAIL_LINES).ok()?;
    tail.iter()
        .rev()
        .map(|line| line.trim())
        .find(|line| looks_like_diagnostic_line(line))
        .map(str::to_string)
}
