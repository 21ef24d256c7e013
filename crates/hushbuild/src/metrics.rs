// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Build metrics aggregation
//!
//! [`BuildMetrics`] holds the outcome counters of one build session. Every
//! counter is an atomic, so report parsing on parallel module threads can
//! merge into it without a lock and readers never see a torn value.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use hushbuild_reports::TestSummary;
use hushbuild_reports::model::passed_count;

/// Add `n` to `counter`, sticking at `u32::MAX` instead of wrapping
fn saturating_add(counter: &AtomicU32, n: u32) {
    // The closure always returns Some, so the update cannot fail
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_add(n))
    });
}

/// Outcome counters for one build session
#[derive(Debug)]
pub struct BuildMetrics {
    total_modules: u32,
    started_at: DateTime<Utc>,
    succeeded_modules: AtomicU32,
    failed_modules: AtomicU32,
    test_total: AtomicU32,
    test_failed: AtomicU32,
    test_errors: AtomicU32,
    test_skipped: AtomicU32,
    compiler_errors: AtomicU32,
    build_failed: AtomicBool,
}

impl BuildMetrics {
    /// Start counting a session of `total_modules` modules now
    #[must_use]
    pub fn new(total_modules: u32) -> Self {
        Self::started_at(total_modules, Utc::now())
    }

    /// Start counting a session that began at `started_at`
    #[must_use]
    pub fn started_at(total_modules: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            total_modules,
            started_at,
            succeeded_modules: AtomicU32::new(0),
            failed_modules: AtomicU32::new(0),
            test_total: AtomicU32::new(0),
            test_failed: AtomicU32::new(0),
            test_errors: AtomicU32::new(0),
            test_skipped: AtomicU32::new(0),
            compiler_errors: AtomicU32::new(0),
            build_failed: AtomicBool::new(false),
        }
    }

    pub fn module_succeeded(&self) {
        saturating_add(&self.succeeded_modules, 1);
    }

    /// Count a failed module; this also fails the build
    pub fn module_failed(&self) {
        saturating_add(&self.failed_modules, 1);
        self.set_build_failed();
    }

    /// Mark the build as failed. There is no way back.
    pub fn set_build_failed(&self) {
        self.build_failed.store(true, Ordering::Release);
    }

    pub fn add_compiler_errors(&self, count: u32) {
        saturating_add(&self.compiler_errors, count);
    }

    /// Merge the counts of `summary`; failure details are not kept
    pub fn accumulate_tests(&self, summary: &TestSummary) {
        saturating_add(&self.test_total, summary.total());
        saturating_add(&self.test_failed, summary.failures());
        saturating_add(&self.test_errors, summary.errors());
        saturating_add(&self.test_skipped, summary.skipped());
    }

    #[must_use]
    pub fn total_modules(&self) -> u32 {
        self.total_modules
    }

    #[must_use]
    pub fn succeeded_modules(&self) -> u32 {
        self.succeeded_modules.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failed_modules(&self) -> u32 {
        self.failed_modules.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn test_total(&self) -> u32 {
        self.test_total.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn test_failed(&self) -> u32 {
        self.test_failed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn test_errors(&self) -> u32 {
        self.test_errors.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn test_skipped(&self) -> u32 {
        self.test_skipped.load(Ordering::Relaxed)
    }

    /// Passed tests derived from the other counters, never below zero
    #[must_use]
    pub fn test_passed(&self) -> u32 {
        passed_count(
            self.test_total(),
            self.test_failed(),
            self.test_errors(),
            self.test_skipped(),
        )
    }

    #[must_use]
    pub fn compiler_errors(&self) -> u32 {
        self.compiler_errors.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_build_failed(&self) -> bool {
        self.build_failed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whole seconds since the session started
    #[must_use]
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds_at(Utc::now())
    }

    /// Whole seconds between the session start and `now`, zero if `now` is earlier
    #[must_use]
    pub fn elapsed_seconds_at(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((now - self.started_at).num_seconds()).unwrap_or(0)
    }
}
