// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Integration tests for hushbuild-reports
//!
//! These tests verify parsing of report directories on disk, including the
//! corrupt and hostile files a build can leave behind.

use std::fs;
use std::path::{Path, PathBuf};

use hushbuild_reports::junit::{parse_reports_dir, parse_reports_dir_with, report_files};
use hushbuild_reports::{FailureKind, TestSummary};
use proptest::prelude::*;
use similar_asserts::assert_eq;

/// Get the fixtures directory for test data
fn fixtures_dir() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    Path::new(&manifest_dir).join("tests/fixtures")
}

fn write_suite(dir: &Path, name: &str, tests: u32, failures: u32, errors: u32, skipped: u32) {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="{name}" tests="{tests}" failures="{failures}" errors="{errors}" skipped="{skipped}">
</testsuite>"#
    );
    fs::write(dir.join(format!("TEST-{name}.xml")), xml).expect("write report");
}

fn collect_diagnostics(dir: &Path) -> (std::sync::Arc<TestSummary>, Vec<String>) {
    let mut diagnostics = Vec::new();
    let summary = parse_reports_dir_with(dir, |msg| diagnostics.push(msg));
    (summary, diagnostics)
}

// ============================================================================
// Fixture directory
// ============================================================================

#[test]
fn test_parse_fixture_reports_dir() {
    let summary = parse_reports_dir(&fixtures_dir().join("surefire-reports"));

    assert_eq!(summary.total(), 13);
    assert_eq!(summary.failures(), 1);
    assert_eq!(summary.errors(), 1);
    assert_eq!(summary.skipped(), 2);
    assert_eq!(summary.passed(), 9);
    assert!(summary.has_failures());
}

#[test]
fn test_fixture_failure_details() {
    let summary = parse_reports_dir(&fixtures_dir().join("surefire-reports"));
    let details = summary.failure_details();
    assert_eq!(details.len(), 2);

    let failure = &details[0];
    assert_eq!(failure.kind(), FailureKind::Failure);
    assert_eq!(failure.class_name(), "com.example.AppTest");
    assert_eq!(failure.method_name(), "testParseInput");
    assert!(failure.message().unwrap_or_default().contains("expected:<42>"));
    assert!(failure.stack_trace().unwrap_or_default().contains("AppTest.java:27"));

    let error = &details[1];
    assert_eq!(error.kind(), FailureKind::Error);
    assert_eq!(error.method_name(), "testEdgeCase");
    assert!(error.stack_trace().unwrap_or_default().contains("NullPointerException"));
}

#[test]
fn test_report_files_ignores_other_files() {
    let files = report_files(&fixtures_dir().join("surefire-reports"));
    let names: Vec<String> = files
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["TEST-com.example.AppTest.xml", "TEST-com.example.UtilTest.xml"]
    );
}

// ============================================================================
// Empty results share one instance
// ============================================================================

#[test]
fn test_missing_directory_returns_shared_empty() {
    let summary = parse_reports_dir(Path::new("/nonexistent/dir/surefire-reports"));
    assert!(TestSummary::is_shared_empty(&summary));
    assert_eq!(summary.total(), 0);
    assert!(!summary.has_failures());
}

#[test]
fn test_empty_directory_returns_shared_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(TestSummary::is_shared_empty(&parse_reports_dir(dir.path())));
}

#[test]
fn test_regular_file_returns_shared_empty() {
    let file = tempfile::NamedTempFile::new().expect("temp file");
    assert!(TestSummary::is_shared_empty(&parse_reports_dir(file.path())));
}

#[test]
fn test_non_report_files_return_shared_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("pom.xml"), "<project/>").expect("write");
    fs::write(
        dir.path().join("RESULT-com.example.Test.xml"),
        r#"<testsuite tests="5"/>"#,
    )
    .expect("write");
    assert!(TestSummary::is_shared_empty(&parse_reports_dir(dir.path())));
}

#[test]
fn test_all_zero_report_is_not_shared_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_suite(dir.path(), "Zero", 0, 0, 0, 0);
    let summary = parse_reports_dir(dir.path());
    assert!(!TestSummary::is_shared_empty(&summary));
    assert_eq!(*summary, TestSummary::default());
}

// ============================================================================
// Aggregation and corrupt files
// ============================================================================

#[test]
fn test_multiple_files_aggregated() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_suite(dir.path(), "A", 3, 1, 0, 0);
    write_suite(dir.path(), "B", 5, 0, 1, 1);

    let summary = parse_reports_dir(dir.path());
    assert_eq!(summary.total(), 8);
    assert_eq!(summary.failures(), 1);
    assert_eq!(summary.errors(), 1);
    assert_eq!(summary.skipped(), 1);
    assert_eq!(summary.passed(), 5);
}

#[test]
fn test_corrupt_file_among_valid_is_skipped_with_diagnostic() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_suite(dir.path(), "Valid", 5, 0, 0, 0);
    fs::write(dir.path().join("TEST-Corrupt1.xml"), "<<<not xml>>>").expect("write");
    fs::write(dir.path().join("TEST-Corrupt2.xml"), "{json not xml}").expect("write");

    let (summary, diagnostics) = collect_diagnostics(dir.path());
    assert_eq!(summary.total(), 5);
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics[0].starts_with("skipping corrupt report TEST-Corrupt1.xml: "));
    assert!(diagnostics[1].starts_with("skipping corrupt report TEST-Corrupt2.xml: "));
}

#[test]
fn test_valid_files_emit_no_diagnostics() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_suite(dir.path(), "Good", 3, 0, 0, 0);

    let (summary, diagnostics) = collect_diagnostics(dir.path());
    assert_eq!(summary.total(), 3);
    assert!(diagnostics.is_empty());
}

#[test]
fn test_doctype_report_only_skips_malicious_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_suite(dir.path(), "Good", 4, 0, 0, 0);
    fs::write(
        dir.path().join("TEST-Evil.xml"),
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE foo SYSTEM "http://evil.example/xxe">
<testsuite name="Evil" tests="1" failures="0" errors="0" skipped="0">
</testsuite>"#,
    )
    .expect("write");
    fs::write(
        dir.path().join("TEST-XXE.xml"),
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE foo [
  <!ENTITY xxe SYSTEM "file:///etc/passwd">
]>
<testsuite name="XXE" tests="1" failures="1" errors="0" skipped="0">
  <testcase name="test" classname="com.example.XXE"><failure>&xxe;</failure></testcase>
</testsuite>"#,
    )
    .expect("write");

    let (summary, diagnostics) = collect_diagnostics(dir.path());
    assert_eq!(summary.total(), 4);
    assert!(summary.failure_details().is_empty());
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.iter().any(|d| d.contains("TEST-Evil.xml")));
    assert!(diagnostics.iter().any(|d| d.contains("TEST-XXE.xml")));
}

#[test]
fn test_long_stack_trace_in_report_is_truncated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut body = String::from("java.lang.RuntimeException: boom");
    for i in 0..40 {
        body.push_str(&format!("\n\tat com.example.Deep.frame{i}(Deep.java:{i})"));
    }
    let xml = format!(
        r#"<testsuite tests="1" errors="1">
  <testcase name="deep" classname="com.example.Deep"><error message="boom">{body}</error></testcase>
</testsuite>"#
    );
    fs::write(dir.path().join("TEST-Deep.xml"), xml).expect("write");

    let summary = parse_reports_dir(dir.path());
    let trace = summary.failure_details()[0]
        .stack_trace()
        .expect("stack trace");
    let lines: Vec<&str> = trace.split('\n').collect();
    assert_eq!(lines.len(), 21);
    assert_eq!(lines[20], "\t... 21 more lines");
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    #[test]
    fn prop_passed_never_exceeds_total(
        total in 0u32..10_000,
        failures in 0u32..10_000,
        errors in 0u32..10_000,
        skipped in 0u32..10_000,
    ) {
        let summary = TestSummary::new(total, failures, errors, skipped, Vec::new());
        let expected = (i64::from(total) - i64::from(failures) - i64::from(errors) - i64::from(skipped)).max(0);
        prop_assert_eq!(i64::from(summary.passed()), expected);
    }

    #[test]
    fn prop_truncated_trace_is_bounded(lines in proptest::collection::vec("[a-zA-Z0-9 .()]{0,40}", 0..80)) {
        let trace = lines.join("\r\n");
        let truncated = hushbuild_reports::truncate_stack_trace(&trace);
        prop_assert!(!truncated.contains('\r'));
        prop_assert!(truncated.split('\n').count() <= 21);
    }

    #[test]
    fn prop_compiler_errors_found_on_any_line(
        noise in proptest::collection::vec("[a-z ]{0,30}", 0..10),
        line in 1u32..100_000,
        column in 1u32..500,
    ) {
        let mut output = noise.join("\n");
        output.push_str(&format!("\n[ERROR] /src/App.java:[{line},{column}] boom\n"));
        output.push_str(&noise.join("\n"));

        let errors = hushbuild_reports::parse_compiler_output(&output);
        prop_assert_eq!(errors.len(), 1);
        prop_assert_eq!(errors[0].line(), line);
        prop_assert_eq!(errors[0].column(), column);
    }
}
