// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Value records produced by the report parser

use std::fmt;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};

static EMPTY_SUMMARY: LazyLock<Arc<TestSummary>> =
    LazyLock::new(|| Arc::new(TestSummary::default()));

/// Aggregated outcome of one or more test report files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    total: u32,
    failures: u32,
    errors: u32,
    skipped: u32,
    failure_details: Vec<TestFailure>,
}

impl TestSummary {
    /// Create a summary from raw counts and the individual failure records
    #[must_use]
    pub fn new(
        total: u32,
        failures: u32,
        errors: u32,
        skipped: u32,
        failure_details: Vec<TestFailure>,
    ) -> Self {
        Self {
            total,
            failures,
            errors,
            skipped,
            failure_details,
        }
    }

    /// The shared "no tests found" summary
    ///
    /// Every call returns the same allocation, so callers can cheaply tell
    /// "nothing was parsed" apart from "parsed, but all zero" with
    /// [`TestSummary::is_shared_empty`].
    #[must_use]
    pub fn empty() -> Arc<Self> {
        Arc::clone(&EMPTY_SUMMARY)
    }

    /// Check whether `summary` is the shared empty instance (identity, not equality)
    #[must_use]
    pub fn is_shared_empty(summary: &Arc<Self>) -> bool {
        Arc::ptr_eq(summary, &EMPTY_SUMMARY)
    }

    /// Total number of tests
    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Number of failed assertions
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Number of tests that errored
    #[must_use]
    pub fn errors(&self) -> u32 {
        self.errors
    }

    /// Number of skipped tests
    #[must_use]
    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    /// Tests that passed, clamped at zero when the counts are inconsistent
    #[must_use]
    pub fn passed(&self) -> u32 {
        passed_count(self.total, self.failures, self.errors, self.skipped)
    }

    /// Check whether any test failed or errored
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failures > 0 || self.errors > 0
    }

    /// Individual failure and error records, in report order
    #[must_use]
    pub fn failure_details(&self) -> &[TestFailure] {
        &self.failure_details
    }
}

impl fmt::Display for TestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TestSummary{{total={}, passed={}, failures={}, errors={}, skipped={}}}",
            self.total,
            self.passed(),
            self.failures,
            self.errors,
            self.skipped
        )
    }
}

/// `max(0, total - failures - errors - skipped)`
#[must_use]
pub fn passed_count(total: u32, failures: u32, errors: u32, skipped: u32) -> u32 {
    total
        .saturating_sub(failures)
        .saturating_sub(errors)
        .saturating_sub(skipped)
}

/// Whether a test record came from a `<failure>` or an `<error>` element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Assertion failure
    Failure,
    /// Unexpected error
    Error,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failure => f.write_str("FAILURE"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

/// A single failing or erroring test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailure {
    kind: FailureKind,
    class_name: String,
    method_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack_trace: Option<String>,
}

impl TestFailure {
    /// Create a record with no message or stack trace
    #[must_use]
    pub fn new(
        kind: FailureKind,
        class_name: impl Into<String>,
        method_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            class_name: class_name.into(),
            method_name: method_name.into(),
            message: None,
            stack_trace: None,
        }
    }

    /// Attach a message; empty messages are dropped
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = non_empty(message.into());
        self
    }

    /// Attach a stack trace; empty traces are dropped
    #[must_use]
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = non_empty(stack_trace.into());
        self
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[must_use]
    pub fn stack_trace(&self) -> Option<&str> {
        self.stack_trace.as_deref()
    }
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}#{}: {}",
            self.kind,
            self.class_name,
            self.method_name,
            self.message.as_deref().unwrap_or("")
        )
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// A compiler diagnostic located at `file:[line,column]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompilerError {
    file: String,
    line: u32,
    column: u32,
    message: String,
}

impl CompilerError {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:[{},{}] {}",
            self.file, self.line, self.column, self.message
        )
    }
}
