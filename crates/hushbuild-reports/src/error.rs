// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for hushbuild-reports

use thiserror::Error;

/// Errors that can occur while reading a single test report
///
/// These never abort a batch: [`crate::junit::parse_reports_dir_with`] turns
/// them into a diagnostic naming the offending file and moves on.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Error reading the report file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML, or a document carrying a DTD / entity declarations
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),
}
