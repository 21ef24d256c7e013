// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Session state machine
//!
//! [`Engine`] consumes the host's lifecycle events in order. It is
//! **Disabled** until [`Engine::init`] activates it, **Idle** between
//! sessions, and **Active** while a session is live.
//!
//! The engine fails open: an error or panic while handling any event
//! produces one `PASSTHROUGH` line, restores every stream, property and
//! logging level it touched, and disables the engine for the rest of the
//! run. Nothing is ever propagated back to the host.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use hushbuild::prelude::*;
//! use hushbuild::formatter::SharedBuffer;
//!
//! let protocol = SharedBuffer::new();
//! let mut engine = Engine::new(
//!     EngineConfig::new(ActivationMode::Relaxed),
//!     Reporter::new(protocol.clone()),
//!     AmbientStreams::process(),
//!     Arc::new(NoopLogging),
//! );
//! engine.init();
//! engine.on_event(&BuildEvent::SessionStarted {
//!     session: Some(HostSession::new(Vec::new(), vec!["verify".into()])),
//! });
//! engine.on_event(&BuildEvent::SessionEnded);
//! engine.close();
//!
//! let lines = protocol.lines();
//! assert_eq!(lines[0], "SESSION_START modules=0 goals=verify");
//! assert!(lines[1].starts_with("OK modules=0 passed=0"));
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use hushbuild_reports::diagnostics::{BUILD_LOG_TAIL_LINES, log_tail};
use hushbuild_reports::{
    ReportKind, failure_hint_from_log, parse_compiler_output, parse_reports_dir_with,
};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, LoggingError};
use crate::event::{BuildEvent, FailureInfo, HostSession, ModuleInfo, StepInfo};
use crate::formatter::Reporter;
use crate::logging::LoggingControl;
use crate::redirect::{AmbientStreams, ConsoleRedirect};
use crate::session::{BuildSession, ParseKey};

/// Module name used when a failed step has no module
pub const UNKNOWN_MODULE: &str = "unknown";

/// Where the engine is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not initialized, turned off, or shut down by a fault
    Disabled,
    /// Active, waiting for a session to start
    Idle,
    /// A session is live
    Active,
}

/// The build-event aggregation and reporting engine
pub struct Engine {
    config: EngineConfig,
    reporter: Reporter,
    redirect: ConsoleRedirect,
    logging: Arc<dyn LoggingControl>,
    active: bool,
    logging_suppressed: bool,
    session: Option<BuildSession>,
}

impl Engine {
    /// Create a disabled engine; call [`Engine::init`] to activate it
    ///
    /// `reporter` must write to the original output stream: protocol lines
    /// never go through `streams`, which may be redirected.
    pub fn new(
        config: EngineConfig,
        reporter: Reporter,
        streams: AmbientStreams,
        logging: Arc<dyn LoggingControl>,
    ) -> Self {
        let redirect = ConsoleRedirect::new(streams, reporter.clone());
        Self {
            config,
            reporter,
            redirect,
            logging,
            active: false,
            logging_suppressed: false,
            session: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        match (self.active, &self.session) {
            (false, _) => EngineState::Disabled,
            (true, None) => EngineState::Idle,
            (true, Some(_)) => EngineState::Active,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The live session, if any
    #[must_use]
    pub fn session(&self) -> Option<&BuildSession> {
        self.session.as_ref()
    }

    /// Path of the build log ambient output is currently redirected to
    #[must_use]
    pub fn build_log_path(&self) -> Option<PathBuf> {
        self.redirect.log_path()
    }

    /// Activate according to the configured mode
    ///
    /// When active, the host's logging is lowered to the mode's level. If
    /// that fails the engine stays disabled and says so once.
    pub fn init(&mut self) {
        self.active = self.config.mode.is_active();
        if !self.active {
            debug!("hushbuild is off");
            return;
        }

        let level = self.config.mode.log_level();
        let suppressed = panic::catch_unwind(AssertUnwindSafe(|| self.logging.suppress(level)))
            .unwrap_or_else(|payload| Err(LoggingError::Unavailable(panic_message(payload.as_ref()))));
        match suppressed {
            Ok(()) => {
                self.logging_suppressed = true;
                info!(mode = ?self.config.mode, "hushbuild active");
            }
            Err(e) => {
                self.active = false;
                self.reporter.passthrough(&format!("init failed: {e}"));
            }
        }
    }

    /// Handle one lifecycle event; never fails
    pub fn on_event(&mut self, event: &BuildEvent) {
        if !self.active {
            return;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(event)));
        let fault = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(payload) => EngineError::Panic(panic_message(payload.as_ref())),
        };
        self.fail_open(&fault);
    }

    /// Restore everything the engine changed; safe to call repeatedly
    pub fn close(&mut self) {
        self.reset_session(true);
        self.restore_logging();
    }

    fn dispatch(&mut self, event: &BuildEvent) -> Result<(), EngineError> {
        if self.session.is_none() && !matches!(event, BuildEvent::SessionStarted { .. }) {
            return Ok(());
        }
        debug!(event = event.name(), "Dispatching build event");

        match event {
            BuildEvent::SessionStarted { session } => self.handle_session_started(session.as_ref()),
            BuildEvent::StepSucceeded { step, module } => {
                self.handle_step_succeeded(step.as_ref(), module.as_ref())
            }
            BuildEvent::StepFailed {
                step,
                module,
                failure,
            } => self.handle_step_failed(step.as_ref(), module.as_ref(), failure.as_ref()),
            BuildEvent::ModuleSucceeded { .. } => {
                self.with_session(|session| session.metrics().module_succeeded());
                Ok(())
            }
            BuildEvent::ModuleFailed { .. } => {
                self.with_session(|session| session.metrics().module_failed());
                Ok(())
            }
            BuildEvent::SessionEnded => self.handle_session_ended(),
            BuildEvent::Other => Ok(()),
        }
    }

    fn with_session(&self, f: impl FnOnce(&BuildSession)) {
        if let Some(session) = &self.session {
            f(session);
        }
    }

    fn handle_session_started(&mut self, host: Option<&HostSession>) -> Result<(), EngineError> {
        self.reset_session(true);
        let host = host.ok_or(EngineError::MissingSession)?;

        let session = self.session.insert(BuildSession::new(host.clone()));
        session.redirect_test_output()?;

        if let Some(root) = session.root_dir() {
            self.redirect.redirect_to_file(root.join(&self.config.build_log));
        }

        info!(
            modules = host.modules.len(),
            goals = ?host.goals,
            "Build session started"
        );
        self.reporter.session_start(host.modules.len(), &host.goals)?;
        Ok(())
    }

    fn handle_step_succeeded(
        &self,
        step: Option<&StepInfo>,
        module: Option<&ModuleInfo>,
    ) -> Result<(), EngineError> {
        let (Some(step), Some(module)) = (step, module) else {
            return Ok(());
        };
        match self.config.report_kind(&step.plugin) {
            Some(kind) => self.parse_and_accumulate_tests(module, step, kind),
            None => Ok(()),
        }
    }

    fn handle_step_failed(
        &self,
        step: Option<&StepInfo>,
        module: Option<&ModuleInfo>,
        failure: Option<&FailureInfo>,
    ) -> Result<(), EngineError> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        session.metrics().set_build_failed();

        let Some(step) = step else {
            return Ok(());
        };
        let module_id = module
            .map(|m| m.artifact_id.as_str())
            .filter(|id| !id.is_empty())
            .unwrap_or(UNKNOWN_MODULE);
        warn!(plugin = %step.plugin, action = %step.action, module = module_id, "Build step failed");
        self.reporter.fail(step, module_id)?;

        if let (Some(kind), Some(module)) = (self.config.report_kind(&step.plugin), module) {
            return self.parse_and_accumulate_tests(module, step, kind);
        }
        let output = failure.and_then(FailureInfo::failure_output);
        if self.config.is_compiler(&step.plugin) {
            self.parse_and_emit_compiler_errors(session, output)
        } else {
            self.emit_failure_details(output)
        }
    }

    fn parse_and_accumulate_tests(
        &self,
        module: &ModuleInfo,
        step: &StepInfo,
        kind: ReportKind,
    ) -> Result<(), EngineError> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        let Some(base_dir) = module.base_dir.as_deref() else {
            return Ok(());
        };
        let key = ParseKey::new(module, step, kind);
        if !session.try_claim(key.clone()) {
            debug!(%key, "Reports already parsed");
            return Ok(());
        }

        let reports_dir = kind.reports_dir(base_dir);
        if reports_dir.is_dir() {
            session.record_reports_dir(
                std::path::absolute(&reports_dir).unwrap_or_else(|_| reports_dir.clone()),
            );
        }
        let summary = parse_reports_dir_with(&reports_dir, |msg| self.reporter.passthrough(&msg));
        debug!(%key, %summary, "Parsed test reports");
        session.metrics().accumulate_tests(&summary);

        if summary.has_failures() {
            self.reporter.test_results(&summary)?;
        }
        Ok(())
    }

    fn parse_and_emit_compiler_errors(
        &self,
        session: &BuildSession,
        output: Option<&str>,
    ) -> Result<(), EngineError> {
        let mut errors = parse_compiler_output(output.unwrap_or_default());
        if errors.is_empty() {
            // The compiler's own output lands in the build log while redirected
            if let Some(log) = self.redirect.log_path().filter(|p| p.is_file()) {
                match log_tail(&log, BUILD_LOG_TAIL_LINES) {
                    Ok(tail) => errors = parse_compiler_output(&tail.join("\n")),
                    Err(e) => debug!(error = %e, "Could not read build log tail"),
                }
            }
        }
        // The shared log tail still holds diagnostics of earlier failed modules
        let errors = session.claim_diagnostics(errors);
        if errors.is_empty() {
            return Ok(());
        }

        self.reporter.compiler_errors(&errors)?;
        let count = u32::try_from(errors.len()).unwrap_or(u32::MAX);
        session.metrics().add_compiler_errors(count);
        Ok(())
    }

    fn emit_failure_details(&self, output: Option<&str>) -> Result<(), EngineError> {
        let mut details: Vec<&str> = output.filter(|o| !o.trim().is_empty()).into_iter().collect();

        let hint = self
            .redirect
            .log_path()
            .and_then(|log| failure_hint_from_log(&log));
        if let Some(hint) = hint.as_deref().filter(|h| !h.is_empty()) {
            if !details.iter().any(|d| d.contains(hint)) {
                details.push(hint);
            }
        }

        if details.is_empty() {
            return Ok(());
        }
        self.reporter.failure_details(&details.join("\n"))?;
        Ok(())
    }

    fn handle_session_ended(&mut self) -> Result<(), EngineError> {
        let result = self.emit_session_summary();
        let keep_redirect = self.active && self.config.mode.keeps_redirect_open();
        self.reset_session(!keep_redirect);
        result
    }

    fn emit_session_summary(&self) -> Result<(), EngineError> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        self.reporter.test_output(&session.reports_dirs())?;
        if let Some(log) = self.redirect.log_path().filter(|p| p.is_file()) {
            let log = std::path::absolute(&log).unwrap_or(log);
            self.reporter.build_log(&log)?;
        }
        self.reporter.outcome(session.metrics())?;
        info!(
            failed = session.metrics().is_build_failed(),
            elapsed = session.metrics().elapsed_seconds(),
            "Build session ended"
        );
        Ok(())
    }

    // Runs on fault and shutdown paths too, so host callbacks are guarded here
    fn reset_session(&mut self, restore_console: bool) {
        if restore_console {
            self.redirect.restore();
        }
        self.redirect.reset_failure_latch();
        if let Some(mut session) = self.session.take() {
            let restored = panic::catch_unwind(AssertUnwindSafe(|| session.restore_test_output()));
            if let Err(payload) = restored {
                warn!(panic = %panic_message(payload.as_ref()), "Restoring session properties panicked");
            }
        }
    }

    fn restore_logging(&mut self) {
        if !std::mem::take(&mut self.logging_suppressed) {
            return;
        }
        match panic::catch_unwind(AssertUnwindSafe(|| self.logging.restore())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Could not restore logging level"),
            Err(payload) => {
                warn!(panic = %panic_message(payload.as_ref()), "Restoring logging level panicked");
            }
        }
    }

    fn fail_open(&mut self, fault: &EngineError) {
        self.reporter.passthrough(&format!("{}: {fault}", fault.kind()));
        self.active = false;
        self.reset_session(true);
        self.restore_logging();
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("redirect", &self.redirect)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActivationMode;
    use crate::formatter::SharedBuffer;
    use crate::logging::NoopLogging;
    use crate::redirect::StreamHandle;
    use similar_asserts::assert_eq;

    fn engine(mode: ActivationMode) -> (Engine, SharedBuffer) {
        let protocol = SharedBuffer::new();
        let streams = AmbientStreams::new(
            StreamHandle::from_writer(SharedBuffer::new()),
            StreamHandle::from_writer(SharedBuffer::new()),
        );
        let engine = Engine::new(
            EngineConfig::new(mode),
            Reporter::new(protocol.clone()),
            streams,
            Arc::new(NoopLogging),
        );
        (engine, protocol)
    }

    fn start(engine: &mut Engine) {
        engine.on_event(&BuildEvent::SessionStarted {
            session: Some(HostSession::default()),
        });
    }

    #[test]
    fn test_states() {
        let (mut engine, _) = engine(ActivationMode::Strict);
        assert_eq!(engine.state(), EngineState::Disabled);
        engine.init();
        assert_eq!(engine.state(), EngineState::Idle);
        start(&mut engine);
        assert_eq!(engine.state(), EngineState::Active);
        engine.on_event(&BuildEvent::SessionEnded);
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn test_off_mode_ignores_everything() {
        let (mut engine, protocol) = engine(ActivationMode::Off);
        engine.init();
        start(&mut engine);
        engine.on_event(&BuildEvent::SessionEnded);
        assert_eq!(engine.state(), EngineState::Disabled);
        assert_eq!(protocol.contents(), "");
    }

    #[test]
    fn test_events_before_init_are_ignored() {
        let (mut engine, protocol) = engine(ActivationMode::Strict);
        start(&mut engine);
        assert_eq!(protocol.contents(), "");
    }

    #[test]
    fn test_module_counters() {
        let (mut engine, _) = engine(ActivationMode::Relaxed);
        engine.init();
        start(&mut engine);
        engine.on_event(&BuildEvent::ModuleSucceeded { module: None });
        engine.on_event(&BuildEvent::ModuleFailed { module: None });
        engine.on_event(&BuildEvent::Other);

        let metrics = engine.session().expect("session").metrics();
        assert_eq!(metrics.succeeded_modules(), 1);
        assert_eq!(metrics.failed_modules(), 1);
        assert!(metrics.is_build_failed());
    }

    #[test]
    fn test_step_failed_without_step_only_fails_build() {
        let (mut engine, protocol) = engine(ActivationMode::Relaxed);
        engine.init();
        start(&mut engine);
        engine.on_event(&BuildEvent::StepFailed {
            step: None,
            module: None,
            failure: Some(FailureInfo::new("boom")),
        });

        assert!(engine.session().expect("session").metrics().is_build_failed());
        assert_eq!(protocol.lines().len(), 1);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut engine, protocol) = engine(ActivationMode::Strict);
        engine.close();
        engine.init();
        start(&mut engine);
        engine.close();
        engine.close();
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(protocol.lines().len(), 1);
    }
}
