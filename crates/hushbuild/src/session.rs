// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Per-run build session state

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use hushbuild_reports::{CompilerError, ReportKind};
use tracing::{debug, warn};

use crate::config::REDIRECT_TEST_OUTPUT_PROPERTY;
use crate::error::PropertyError;
use crate::event::{HostSession, ModuleInfo, StepInfo};
use crate::lock;
use crate::metrics::BuildMetrics;

/// Identity of one report directory parse within a session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParseKey {
    pub group_id: String,
    pub artifact_id: String,
    pub execution_id: String,
    pub kind: ReportKind,
}

impl ParseKey {
    #[must_use]
    pub fn new(module: &ModuleInfo, step: &StepInfo, kind: ReportKind) -> Self {
        Self {
            group_id: module.group_id.clone(),
            artifact_id: module.artifact_id.clone(),
            execution_id: step.execution_id.clone().unwrap_or_default(),
            kind,
        }
    }
}

impl fmt::Display for ParseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group_id,
            self.artifact_id,
            self.execution_id,
            self.kind.relative_dir()
        )
    }
}

/// State of one build invocation, from session start to session end
#[derive(Debug)]
pub struct BuildSession {
    host: HostSession,
    metrics: Arc<BuildMetrics>,
    parsed: Mutex<HashSet<ParseKey>>,
    reports_dirs: Mutex<BTreeSet<PathBuf>>,
    diagnostics: Mutex<HashSet<CompilerError>>,
    test_output_override: Option<Option<String>>,
}

impl BuildSession {
    #[must_use]
    pub fn new(host: HostSession) -> Self {
        let modules = u32::try_from(host.modules.len()).unwrap_or(u32::MAX);
        Self {
            host,
            metrics: Arc::new(BuildMetrics::new(modules)),
            parsed: Mutex::new(HashSet::new()),
            reports_dirs: Mutex::new(BTreeSet::new()),
            diagnostics: Mutex::new(HashSet::new()),
            test_output_override: None,
        }
    }

    #[must_use]
    pub fn host(&self) -> &HostSession {
        &self.host
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<BuildMetrics> {
        &self.metrics
    }

    /// Base directory of the first module, where the build log lives
    #[must_use]
    pub fn root_dir(&self) -> Option<&std::path::Path> {
        self.host.modules.first()?.base_dir.as_deref()
    }

    /// Claim `key` for parsing; only the first claim in a session succeeds
    pub fn try_claim(&self, key: ParseKey) -> bool {
        lock(&self.parsed).insert(key)
    }

    /// Keep the diagnostics not yet reported in this session and mark them reported
    pub fn claim_diagnostics(&self, errors: Vec<CompilerError>) -> Vec<CompilerError> {
        let mut seen = lock(&self.diagnostics);
        errors
            .into_iter()
            .filter(|error| seen.insert(error.clone()))
            .collect()
    }

    pub fn record_reports_dir(&self, dir: PathBuf) {
        lock(&self.reports_dirs).insert(dir);
    }

    /// Report directories seen so far, sorted
    #[must_use]
    pub fn reports_dirs(&self) -> Vec<PathBuf> {
        lock(&self.reports_dirs).iter().cloned().collect()
    }

    /// Ask test runners to write their output to files for this session
    ///
    /// The previous value is remembered for [`BuildSession::restore_test_output`].
    ///
    /// # Errors
    ///
    /// Returns the store's error if it rejects the write.
    pub fn redirect_test_output(&mut self) -> Result<(), PropertyError> {
        let props = &self.host.properties;
        let previous = props.get(REDIRECT_TEST_OUTPUT_PROPERTY);
        self.test_output_override = Some(previous);
        props.set(REDIRECT_TEST_OUTPUT_PROPERTY, "true")?;
        debug!(key = REDIRECT_TEST_OUTPUT_PROPERTY, "Test output redirected to files");
        Ok(())
    }

    /// Put the test-output property back the way it was; a no-op if unchanged
    pub fn restore_test_output(&mut self) {
        let Some(previous) = self.test_output_override.take() else {
            return;
        };
        let props = &self.host.properties;
        let result = match previous {
            Some(value) => props.set(REDIRECT_TEST_OUTPUT_PROPERTY, &value),
            None => props.remove(REDIRECT_TEST_OUTPUT_PROPERTY),
        };
        if let Err(e) = result {
            warn!(error = %e, "Could not restore test output property");
        }
    }
}
