// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Status protocol rendering
//!
//! Every protocol block is built by a pure `render_*` function and written by
//! [`Reporter`] in a single `write_all` call under a lock, so blocks emitted
//! from parallel module threads never interleave.
//!
//! # Example
//!
//! ```
//! use hushbuild::formatter::{render_session_start, Reporter, SharedBuffer};
//!
//! assert_eq!(
//!     render_session_start(2, &["verify".to_string()]),
//!     "SESSION_START modules=2 goals=verify"
//! );
//!
//! let buffer = SharedBuffer::new();
//! let reporter = Reporter::new(buffer.clone());
//! reporter.session_start(0, &[]).unwrap();
//! assert_eq!(buffer.contents(), "SESSION_START modules=0 goals=none\n");
//! ```

use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use hushbuild_reports::{CompilerError, FailureKind, TestSummary};
use tracing::debug;

use crate::event::StepInfo;
use crate::lock;
use crate::metrics::BuildMetrics;

/// Test failure records shown per test-result block
pub const MAX_FAILURE_DETAILS: usize = 10;

/// Compiler errors shown per block
pub const MAX_COMPILER_ERRORS: usize = 25;

/// Non-blank lines shown per detail block
pub const MAX_DETAIL_LINES: usize = 20;

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

/// `SESSION_START modules=<n> goals=<csv|none>`
#[must_use]
pub fn render_session_start(module_count: usize, goals: &[String]) -> String {
    let goals = if goals.is_empty() {
        "none".to_string()
    } else {
        goals.join(",")
    };
    format!("SESSION_START modules={module_count} goals={goals}")
}

fn push_test_counts(out: &mut String, metrics: &BuildMetrics) {
    let _ = write!(
        out,
        " passed={} failed={} errors={} skipped={}",
        metrics.test_passed(),
        metrics.test_failed(),
        metrics.test_errors(),
        metrics.test_skipped()
    );
}

/// `OK modules=<n> passed=.. failed=.. errors=.. skipped=.. time=<s>s`
#[must_use]
pub fn render_ok(metrics: &BuildMetrics, elapsed_seconds: u64) -> String {
    let mut out = format!("OK modules={}", metrics.total_modules());
    push_test_counts(&mut out, metrics);
    let _ = write!(out, " time={elapsed_seconds}s");
    out
}

/// `BUILD_FAILED failed=<n> modules=<n> ... [compiler_errors=<n> ]time=<s>s`
#[must_use]
pub fn render_build_failed(metrics: &BuildMetrics, elapsed_seconds: u64) -> String {
    let mut out = format!(
        "BUILD_FAILED failed={} modules={}",
        metrics.failed_modules(),
        metrics.total_modules()
    );
    push_test_counts(&mut out, metrics);
    if metrics.compiler_errors() > 0 {
        let _ = write!(out, " compiler_errors={}", metrics.compiler_errors());
    }
    let _ = write!(out, " time={elapsed_seconds}s");
    out
}

/// `FAIL <plugin>:<action>[ (<execId>)] @ <module>`
///
/// Execution ids starting with `default-` are implied and left out.
#[must_use]
pub fn render_fail(step: &StepInfo, module_id: &str) -> String {
    let plugin = if step.plugin.is_empty() {
        "unknown-plugin"
    } else {
        &step.plugin
    };
    let action = if step.action.is_empty() {
        "unknown-goal"
    } else {
        &step.action
    };
    let mut out = format!("FAIL {plugin}:{action}");
    if let Some(exec) = step
        .execution_id
        .as_deref()
        .filter(|id| !id.is_empty() && !id.starts_with("default-"))
    {
        let _ = write!(out, " ({exec})");
    }
    let _ = write!(out, " @ {module_id}");
    out
}

/// `TESTS ...` header followed by at most [`MAX_FAILURE_DETAILS`] records
#[must_use]
pub fn render_test_results(summary: &TestSummary) -> String {
    let mut out = format!(
        "TESTS total={} passed={} failed={} errors={} skipped={}",
        summary.total(),
        summary.passed(),
        summary.failures(),
        summary.errors(),
        summary.skipped()
    );

    let details = summary.failure_details();
    for failure in details.iter().take(MAX_FAILURE_DETAILS) {
        let prefix = match failure.kind() {
            FailureKind::Failure => "TEST_FAIL",
            FailureKind::Error => "TEST_ERROR",
        };
        let _ = write!(
            out,
            "\n{prefix} {}#{}",
            failure.class_name(),
            failure.method_name()
        );
        if let Some(message) = failure.message() {
            let _ = write!(out, "\n  {message}");
        }
        if let Some(trace) = failure.stack_trace() {
            for line in trace.lines() {
                let _ = write!(out, "\n  {line}");
            }
        }
    }

    if details.len() > MAX_FAILURE_DETAILS {
        let remaining = details.len() - MAX_FAILURE_DETAILS;
        let _ = write!(
            out,
            "\nTEST_TRUNCATED {remaining} {}",
            plural(remaining, "more failure not shown", "more failures not shown")
        );
    }
    out
}

/// One `ERR` line per error, at most [`MAX_COMPILER_ERRORS`]; `None` when empty
#[must_use]
pub fn render_compiler_errors(errors: &[CompilerError]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }

    let mut out = errors
        .iter()
        .take(MAX_COMPILER_ERRORS)
        .map(|e| {
            format!(
                "ERR {}:{}:{} {}",
                e.file(),
                e.line(),
                e.column(),
                e.message()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    if errors.len() > MAX_COMPILER_ERRORS {
        let remaining = errors.len() - MAX_COMPILER_ERRORS;
        let _ = write!(
            out,
            "\nERR_TRUNCATED {remaining} {}",
            plural(remaining, "more error not shown", "more errors not shown")
        );
    }
    Some(out)
}

/// `DETAIL` lines for free-form failure text; `None` when nothing is left
///
/// Tabs become spaces, trailing whitespace is stripped and blank lines are
/// dropped without counting toward the limit.
#[must_use]
pub fn render_failure_details(details: &str) -> Option<String> {
    let lines: Vec<String> = details
        .lines()
        .map(|line| line.replace('\t', " ").trim_end().to_string())
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }

    let mut out = lines
        .iter()
        .take(MAX_DETAIL_LINES)
        .map(|line| format!("DETAIL {line}"))
        .collect::<Vec<_>>()
        .join("\n");

    if lines.len() > MAX_DETAIL_LINES {
        let remaining = lines.len() - MAX_DETAIL_LINES;
        let _ = write!(
            out,
            "\nDETAIL_TRUNCATED {remaining} {}",
            plural(remaining, "more line not shown", "more lines not shown")
        );
    }
    Some(out)
}

/// One `TEST_OUTPUT <path>` line per report directory; `None` when empty
#[must_use]
pub fn render_test_output(dirs: &[impl AsRef<Path>]) -> Option<String> {
    if dirs.is_empty() {
        return None;
    }
    Some(
        dirs.iter()
            .map(|dir| format!("TEST_OUTPUT {}", dir.as_ref().display()))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

#[must_use]
pub fn render_build_log(path: &Path) -> String {
    format!("BUILD_LOG {}", path.display())
}

#[must_use]
pub fn render_passthrough(reason: &str) -> String {
    format!("PASSTHROUGH {reason}")
}

/// Writes protocol blocks to the original output stream
///
/// Clones share the same writer and lock.
#[derive(Clone)]
pub struct Reporter {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Reporter {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
        }
    }

    /// Reporter on the process's standard output
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Write `block` plus a newline as one unit
    ///
    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn emit(&self, block: &str) -> io::Result<()> {
        let mut line = String::with_capacity(block.len() + 1);
        line.push_str(block);
        line.push('\n');

        let mut out = lock(&self.out);
        out.write_all(line.as_bytes())?;
        out.flush()
    }

    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn session_start(&self, module_count: usize, goals: &[String]) -> io::Result<()> {
        self.emit(&render_session_start(module_count, goals))
    }

    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn fail(&self, step: &StepInfo, module_id: &str) -> io::Result<()> {
        self.emit(&render_fail(step, module_id))
    }

    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn test_results(&self, summary: &TestSummary) -> io::Result<()> {
        self.emit(&render_test_results(summary))
    }

    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn compiler_errors(&self, errors: &[CompilerError]) -> io::Result<()> {
        match render_compiler_errors(errors) {
            Some(block) => self.emit(&block),
            None => Ok(()),
        }
    }

    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn failure_details(&self, details: &str) -> io::Result<()> {
        match render_failure_details(details) {
            Some(block) => self.emit(&block),
            None => Ok(()),
        }
    }

    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn test_output(&self, dirs: &[impl AsRef<Path>]) -> io::Result<()> {
        match render_test_output(dirs) {
            Some(block) => self.emit(&block),
            None => Ok(()),
        }
    }

    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn build_log(&self, path: &Path) -> io::Result<()> {
        self.emit(&render_build_log(path))
    }

    /// `OK` or `BUILD_FAILED`, depending on the build-failed flag
    ///
    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn outcome(&self, metrics: &BuildMetrics) -> io::Result<()> {
        let elapsed = metrics.elapsed_seconds();
        if metrics.is_build_failed() {
            self.emit(&render_build_failed(metrics, elapsed))
        } else {
            self.emit(&render_ok(metrics, elapsed))
        }
    }

    /// Best-effort diagnostic line; a failed write is only logged
    pub fn passthrough(&self, reason: &str) {
        if let Err(e) = self.emit(&render_passthrough(reason)) {
            debug!(error = %e, "Dropping passthrough line");
        }
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter").finish_non_exhaustive()
    }
}

/// In-memory writer whose clones share one buffer
///
/// Handy for capturing the protocol when embedding the engine.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&lock(&self.bytes)).into_owned()
    }

    /// Written lines, without their terminators
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.bytes).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
