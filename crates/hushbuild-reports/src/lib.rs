// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! hushbuild-reports: Test report and compiler diagnostic parsing for hushbuild
//!
//! This library crate turns build artifacts into small immutable value
//! records: JUnit-style XML report directories become a [`TestSummary`], and
//! free-form compiler output becomes a list of [`CompilerError`]s.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use hushbuild_reports::junit::parse_reports_dir;
//! use hushbuild_reports::diagnostics::parse_compiler_output;
//!
//! let summary = parse_reports_dir(Path::new("target/surefire-reports"));
//! println!("passed={} failed={}", summary.passed(), summary.failures());
//!
//! let errors = parse_compiler_output("[ERROR] /src/App.java:[10,15] cannot find symbol");
//! assert_eq!(errors.len(), 1);
//! ```

pub mod diagnostics;
pub mod error;
pub mod junit;
pub mod model;

pub use diagnostics::{failure_hint_from_log, parse_compiler_output, truncate_stack_trace};
pub use error::ReportError;
pub use junit::{ReportKind, parse_reports_dir, parse_reports_dir_with};
pub use model::{CompilerError, FailureKind, TestFailure, TestSummary};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::ReportError;
    pub use crate::junit::{ReportKind, parse_reports_dir_with};
    pub use crate::model::{CompilerError, FailureKind, TestFailure, TestSummary};
}
