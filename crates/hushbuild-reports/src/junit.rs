// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! JUnit-style XML test report parsing
//!
//! Test runners write one `TEST-<suite>.xml` file per suite into a per-module
//! report directory. This module turns such a directory into a single
//! [`TestSummary`].
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use hushbuild_reports::junit::parse_reports_dir_with;
//!
//! let summary = parse_reports_dir_with(Path::new("target/surefire-reports"), |msg| {
//!     eprintln!("{msg}");
//! });
//! println!("{} tests, {} failed", summary.total(), summary.failures());
//! ```
//!
//! Documents with a `<!DOCTYPE>` are rejected outright, so a report file
//! cannot pull in external entities.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use roxmltree::{Document, Node, ParsingOptions};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::diagnostics::truncate_stack_trace;
use crate::error::ReportError;
use crate::model::{FailureKind, TestFailure, TestSummary};

/// File name prefix of a test report
pub const REPORT_FILE_PREFIX: &str = "TEST-";

/// File name extension of a test report
pub const REPORT_FILE_EXTENSION: &str = ".xml";

/// Which test runner produced a report directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Unit tests (`target/surefire-reports`)
    Unit,
    /// Integration tests (`target/failsafe-reports`)
    Integration,
}

impl ReportKind {
    /// Report directory relative to a module's base directory
    #[must_use]
    pub fn relative_dir(self) -> &'static str {
        match self {
            Self::Unit => "target/surefire-reports",
            Self::Integration => "target/failsafe-reports",
        }
    }

    /// Resolve the report directory for a module rooted at `base_dir`
    #[must_use]
    pub fn reports_dir(self, base_dir: &Path) -> PathBuf {
        base_dir.join(self.relative_dir())
    }
}

/// Counts and failures read from one report file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteReport {
    /// `tests` attribute of the root element
    pub total: u32,
    /// `failures` attribute of the root element
    pub failures: u32,
    /// `errors` attribute of the root element
    pub errors: u32,
    /// `skipped` attribute of the root element
    pub skipped: u32,
    /// One record per `<failure>`/`<error>` element
    pub details: Vec<TestFailure>,
}

/// Parse the XML text of a single report
///
/// # Errors
///
/// Returns `ReportError::Xml` for malformed documents and for documents that
/// declare a DTD.
pub fn parse_report_str(xml: &str) -> Result<SuiteReport, ReportError> {
    let options = ParsingOptions {
        allow_dtd: false,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(xml, options)?;
    let root = doc.root_element();

    let mut report = SuiteReport {
        total: count_attr(root, "tests"),
        failures: count_attr(root, "failures"),
        errors: count_attr(root, "errors"),
        skipped: count_attr(root, "skipped"),
        details: Vec::new(),
    };

    for testcase in root.descendants().filter(|n| n.has_tag_name("testcase")) {
        let class_name = testcase.attribute("classname").unwrap_or_default();
        let method_name = testcase.attribute("name").unwrap_or_default();

        for (tag, kind) in [("failure", FailureKind::Failure), ("error", FailureKind::Error)] {
            for node in testcase.descendants().filter(|n| n.has_tag_name(tag)) {
                report.details.push(
                    TestFailure::new(kind, class_name, method_name)
                        .with_message(node.attribute("message").unwrap_or_default())
                        .with_stack_trace(truncate_stack_trace(&text_content(node))),
                );
            }
        }
    }

    Ok(report)
}

/// Read and parse a single report file
///
/// Files are read as UTF-8. A file that is not valid UTF-8 is decoded as
/// Latin-1 when its prolog declares `ISO-8859-1` or `latin1`, and lossily
/// otherwise.
///
/// # Errors
///
/// Returns `ReportError::Io` if the file cannot be read, or `ReportError::Xml`
/// if it does not parse.
pub fn parse_report_file(path: &Path) -> Result<SuiteReport, ReportError> {
    let xml = decode_report(fs::read(path)?);
    parse_report_str(&xml)
}

fn decode_report(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(xml) => xml,
        Err(e) => {
            let bytes = e.into_bytes();
            if declares_latin1(&bytes) {
                bytes.iter().copied().map(char::from).collect()
            } else {
                String::from_utf8_lossy(&bytes).into_owned()
            }
        }
    }
}

fn declares_latin1(bytes: &[u8]) -> bool {
    let Some(end) = bytes.windows(2).position(|w| w == b"?>") else {
        return false;
    };
    let prolog = String::from_utf8_lossy(&bytes[..end]).to_ascii_lowercase();
    prolog.starts_with("<?xml") && (prolog.contains("iso-8859-1") || prolog.contains("latin1"))
}

/// List the report files in `dir`, sorted by file name
///
/// A missing or unreadable directory yields an empty list.
#[must_use]
pub fn report_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_report_file_name(path))
        .collect();
    files.sort();
    files
}

fn is_report_file_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            name.starts_with(REPORT_FILE_PREFIX) && name.ends_with(REPORT_FILE_EXTENSION)
        })
}

/// Parse every report in `dir`, discarding diagnostics
#[must_use]
pub fn parse_reports_dir(dir: &Path) -> Arc<TestSummary> {
    parse_reports_dir_with(dir, |_| {})
}

/// Parse every report in `dir` into one summary
///
/// Files that fail to parse are skipped; `diagnostics` receives one
/// `skipping corrupt report <name>: <reason>` message per skipped file. If
/// `dir` is missing, is not a directory, or holds no report files, the shared
/// [`TestSummary::empty`] instance is returned.
pub fn parse_reports_dir_with(dir: &Path, mut diagnostics: impl FnMut(String)) -> Arc<TestSummary> {
    if !dir.is_dir() {
        return TestSummary::empty();
    }

    let files = report_files(dir);
    if files.is_empty() {
        return TestSummary::empty();
    }
    debug!(dir = %dir.display(), files = files.len(), "Parsing test reports");

    let (mut total, mut failures, mut errors, mut skipped) = (0u32, 0u32, 0u32, 0u32);
    let mut details = Vec::new();

    for file in &files {
        match parse_report_file(file) {
            Ok(report) => {
                total = total.saturating_add(report.total);
                failures = failures.saturating_add(report.failures);
                errors = errors.saturating_add(report.errors);
                skipped = skipped.saturating_add(report.skipped);
                details.extend(report.details);
            }
            Err(e) => {
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                warn!(file = %file.display(), error = %e, "Skipping corrupt test report");
                diagnostics(format!("skipping corrupt report {name}: {e}"));
            }
        }
    }

    Arc::new(TestSummary::new(total, failures, errors, skipped, details))
}

/// Missing, empty, negative or non-numeric attributes count as zero
fn count_attr(node: Node<'_, '_>, name: &str) -> u32 {
    node.attribute(name)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    const BOTH_KINDS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="BothKinds" tests="1" failures="1" errors="1" skipped="0">
  <testcase name="testBoth" classname="com.example.BothTest" time="0.01">
    <failure message="assertion failed">assertion stack trace</failure>
    <error message="runtime error"><![CDATA[error stack trace]]></error>
  </testcase>
</testsuite>"#;

    #[test]
    fn test_parse_report_str_counts_and_details() {
        let report = parse_report_str(BOTH_KINDS).expect("Should parse");
        assert_eq!(report.total, 1);
        assert_eq!(report.failures, 1);
        assert_eq!(report.errors, 1);
        assert_eq!(report.details.len(), 2);

        let failure = &report.details[0];
        assert_eq!(failure.kind(), FailureKind::Failure);
        assert_eq!(failure.class_name(), "com.example.BothTest");
        assert_eq!(failure.method_name(), "testBoth");
        assert_eq!(failure.message(), Some("assertion failed"));
        assert_eq!(failure.stack_trace(), Some("assertion stack trace"));

        let error = &report.details[1];
        assert_eq!(error.kind(), FailureKind::Error);
        assert_eq!(error.stack_trace(), Some("error stack trace"));
    }

    #[test]
    fn test_missing_and_bad_attributes_default_to_zero() {
        let report = parse_report_str(
            r#"<testsuite name="Bad" tests="abc" failures="-2" errors="" skipped=" 3 "/>"#,
        )
        .expect("Should parse");
        assert_eq!(report.total, 0);
        assert_eq!(report.failures, 0);
        assert_eq!(report.errors, 0);
        assert_eq!(report.skipped, 3);

        let report = parse_report_str("<testsuite/>").expect("Should parse");
        assert_eq!(report, SuiteReport::default());
    }

    #[test]
    fn test_empty_names_and_message() {
        let report = parse_report_str(
            r#"<testsuite tests="1" failures="1">
  <testcase name="" classname=""><failure message="">stack</failure></testcase>
  <testcase name="t2" classname="C"><failure></failure></testcase>
</testsuite>"#,
        )
        .expect("Should parse");
        assert_eq!(report.details.len(), 2);
        assert_eq!(report.details[0].class_name(), "");
        assert_eq!(report.details[0].method_name(), "");
        assert_eq!(report.details[0].message(), None);
        assert_eq!(report.details[1].stack_trace(), None);
    }

    #[test]
    fn test_latin1_report_file_is_decoded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("TEST-com.example.CafeTest.xml");
        let mut xml = br#"<?xml version="1.0" encoding="ISO-8859-1"?>
<testsuite name="Cafe" tests="1" failures="1">
  <testcase name="testMenu" classname="com.example.CafeTest"><failure message="caf"#
            .to_vec();
        xml.push(0xE9);
        xml.extend_from_slice(br#" closed">trace</failure></testcase>
</testsuite>"#);
        std::fs::write(&path, xml).expect("write report");

        let report = parse_report_file(&path).expect("Should parse");
        assert_eq!(report.failures, 1);
        assert_eq!(report.details[0].message(), Some("café closed"));
    }

    #[test]
    fn test_invalid_utf8_without_declaration_decoded_lossily() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("TEST-Bytes.xml");
        let mut xml =
            br#"<testsuite tests="1"><testcase name="t" classname="C"><failure message="bad "#
                .to_vec();
        xml.push(0xFF);
        xml.extend_from_slice(br#"">x</failure></testcase></testsuite>"#);
        std::fs::write(&path, xml).expect("write report");

        let report = parse_report_file(&path).expect("Should parse");
        assert_eq!(report.details[0].message(), Some("bad \u{FFFD}"));
    }

    #[test]
    fn test_doctype_is_rejected() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE foo [
  <!ENTITY xxe SYSTEM "file:///etc/passwd">
]>
<testsuite name="XXE" tests="1" failures="0" errors="0" skipped="0">
  <testcase name="test" classname="com.example.XXE">&xxe;</testcase>
</testsuite>"#;
        assert!(matches!(parse_report_str(xml), Err(ReportError::Xml(_))));
    }

    #[test]
    fn test_malformed_xml_is_error() {
        assert!(parse_report_str("<<<not xml>>>").is_err());
        assert!(parse_report_str("").is_err());
    }

    #[test]
    fn test_report_kind_dirs() {
        assert_eq!(ReportKind::Unit.relative_dir(), "target/surefire-reports");
        assert_eq!(
            ReportKind::Integration.reports_dir(Path::new("/work/app")),
            PathBuf::from("/work/app/target/failsafe-reports")
        );
    }

    #[test]
    fn test_is_report_file_name() {
        assert!(is_report_file_name(Path::new("TEST-com.example.FooTest.xml")));
        assert!(!is_report_file_name(Path::new("RESULT-com.example.Test.xml")));
        assert!(!is_report_file_name(Path::new("TEST-com.example.FooTest.txt")));
        assert!(!is_report_file_name(Path::new("pom.xml")));
    }
}
