// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Configuration for hushbuild
//!
//! This module resolves the activation mode, holds the engine's step catalog
//! and build-log location, and defines the command-line options of the
//! `hushbuild` replay binary.

use std::path::PathBuf;

use clap::Parser;
use hushbuild_reports::ReportKind;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing::warn;

/// Environment variable consulted when no explicit mode is given
pub const ACTIVE_ENV_VAR: &str = "HUSHBUILD_ACTIVE";

/// Session property that makes test runners write their output to files
pub const REDIRECT_TEST_OUTPUT_PROPERTY: &str = "maven.test.redirectTestOutputToFile";

/// Default build-log location, relative to the first module's base directory
pub const DEFAULT_BUILD_LOG: &str = "target/hushbuild-build.log";

/// How (and whether) the engine takes over the build's output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationMode {
    /// Engine disabled; every event is ignored
    #[default]
    Off,
    /// Host logging fully silenced; the build log stays open after the session
    Strict,
    /// Host errors still logged; the build log is closed at session end
    Relaxed,
}

impl ActivationMode {
    /// Parse a raw mode value
    ///
    /// Matching is trimmed and case-insensitive. `None` means off; an empty
    /// value means strict. Unrecognized values also enable strict mode.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Off;
        };
        let value = raw.trim().to_ascii_lowercase();
        match value.as_str() {
            "" | "true" | "1" | "yes" | "on" | "strict" => Self::Strict,
            "relaxed" => Self::Relaxed,
            "false" | "0" | "off" | "no" | "disabled" => Self::Off,
            _ => {
                warn!(value = %raw, "Unrecognized activation mode, using strict");
                Self::Strict
            }
        }
    }

    /// Resolve the mode from an explicit flag and an environment value
    ///
    /// The flag wins whenever it is present, even if it is empty.
    #[must_use]
    pub fn resolve(flag: Option<&str>, env: Option<&str>) -> Self {
        match flag {
            Some(value) => Self::parse(Some(value)),
            None => Self::parse(env),
        }
    }

    /// Resolve the mode from `flag` and the [`ACTIVE_ENV_VAR`] variable
    #[must_use]
    pub fn from_env(flag: Option<&str>) -> Self {
        let env = std::env::var(ACTIVE_ENV_VAR).ok();
        Self::resolve(flag, env.as_deref())
    }

    #[must_use]
    pub fn is_active(self) -> bool {
        self != Self::Off
    }

    /// Level the host's ambient logging is lowered to while active
    #[must_use]
    pub fn log_level(self) -> LevelFilter {
        match self {
            Self::Strict => LevelFilter::OFF,
            Self::Relaxed | Self::Off => LevelFilter::ERROR,
        }
    }

    /// Whether the build-log redirect survives the end of a session
    #[must_use]
    pub fn keeps_redirect_open(self) -> bool {
        self == Self::Strict
    }
}

/// Engine settings: activation mode, step catalog and build-log location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub mode: ActivationMode,
    /// Plugin whose reports land in `target/surefire-reports`
    pub unit_test_plugin: String,
    /// Plugin whose reports land in `target/failsafe-reports`
    pub integration_test_plugin: String,
    /// Plugin whose failures carry compiler diagnostics
    pub compiler_plugin: String,
    /// Build log, relative to the first module's base directory
    pub build_log: PathBuf,
}

impl EngineConfig {
    /// Default catalog for the given mode
    #[must_use]
    pub fn new(mode: ActivationMode) -> Self {
        Self {
            mode,
            unit_test_plugin: "maven-surefire-plugin".to_string(),
            integration_test_plugin: "maven-failsafe-plugin".to_string(),
            compiler_plugin: "maven-compiler-plugin".to_string(),
            build_log: PathBuf::from(DEFAULT_BUILD_LOG),
        }
    }

    /// Report kind written by `plugin`, if it runs tests
    #[must_use]
    pub fn report_kind(&self, plugin: &str) -> Option<ReportKind> {
        if plugin == self.unit_test_plugin {
            Some(ReportKind::Unit)
        } else if plugin == self.integration_test_plugin {
            Some(ReportKind::Integration)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_compiler(&self, plugin: &str) -> bool {
        plugin == self.compiler_plugin
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(ActivationMode::default())
    }
}

/// hushbuild - replay build lifecycle events into a compact status report
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "hushbuild")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Activation mode: strict, relaxed or off
    ///
    /// Takes precedence over the HUSHBUILD_ACTIVE environment variable.
    /// Without either, hushbuild stays off and prints nothing.
    #[arg(long)]
    pub active: Option<String>,

    /// Newline-delimited JSON event file
    ///
    /// Events are read from stdin when omitted.
    #[arg(short, long)]
    pub events: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    ///
    /// Logs are written to stderr so they never mix with the protocol.
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Quiet mode - suppress info-level logs
    ///
    /// Only errors and warnings will be logged.
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

impl Config {
    /// Activation mode from `--active`, falling back to the environment
    #[must_use]
    pub fn activation_mode(&self) -> ActivationMode {
        ActivationMode::from_env(self.active.as_deref())
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the events file is given but doesn't exist or
    /// isn't a regular file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref events) = self.events {
            if !events.exists() {
                return Err(ConfigError::EventsNotFound(events.clone()));
            }
            if !events.is_file() {
                return Err(ConfigError::EventsNotFile(events.clone()));
            }
        }
        Ok(())
    }

    /// Get the log level based on verbose/quiet flags
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Events file not found
    #[error("Events file not found: {0}")]
    EventsNotFound(PathBuf),

    /// Events path is not a regular file
    #[error("Events path is not a file: {0}")]
    EventsNotFile(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn test_parse_strict_values() {
        for value in ["", "  ", "true", "1", "yes", "on", "strict", " STRICT ", "True"] {
            assert_eq!(ActivationMode::parse(Some(value)), ActivationMode::Strict, "{value:?}");
        }
    }

    #[test]
    fn test_parse_relaxed_and_off_values() {
        assert_eq!(ActivationMode::parse(Some("relaxed")), ActivationMode::Relaxed);
        assert_eq!(ActivationMode::parse(Some(" Relaxed\n")), ActivationMode::Relaxed);
        for value in ["false", "0", "off", "no", "disabled", "OFF"] {
            assert_eq!(ActivationMode::parse(Some(value)), ActivationMode::Off, "{value:?}");
        }
        assert_eq!(ActivationMode::parse(None), ActivationMode::Off);
    }

    #[test]
    fn test_parse_unknown_value_is_strict() {
        assert_eq!(ActivationMode::parse(Some("loud")), ActivationMode::Strict);
    }

    #[test]
    fn test_resolve_flag_wins_over_env() {
        assert_eq!(
            ActivationMode::resolve(Some("off"), Some("strict")),
            ActivationMode::Off
        );
        assert_eq!(
            ActivationMode::resolve(Some(""), Some("off")),
            ActivationMode::Strict
        );
        assert_eq!(
            ActivationMode::resolve(None, Some("relaxed")),
            ActivationMode::Relaxed
        );
        assert_eq!(ActivationMode::resolve(None, None), ActivationMode::Off);
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(ActivationMode::Strict.log_level(), LevelFilter::OFF);
        assert_eq!(ActivationMode::Relaxed.log_level(), LevelFilter::ERROR);
        assert!(ActivationMode::Strict.keeps_redirect_open());
        assert!(!ActivationMode::Relaxed.keeps_redirect_open());
    }

    #[test]
    fn test_engine_config_catalog() {
        let config = EngineConfig::new(ActivationMode::Strict);
        assert_eq!(
            config.report_kind("maven-surefire-plugin"),
            Some(ReportKind::Unit)
        );
        assert_eq!(
            config.report_kind("maven-failsafe-plugin"),
            Some(ReportKind::Integration)
        );
        assert_eq!(config.report_kind("maven-compiler-plugin"), None);
        assert!(config.is_compiler("maven-compiler-plugin"));
        assert!(!config.is_compiler("maven-surefire-plugin"));
        assert_eq!(config.build_log, PathBuf::from("target/hushbuild-build.log"));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.active.is_none());
        assert!(config.events.is_none());
        assert!(!config.verbose);
        assert!(!config.quiet);
        assert_eq!(config.log_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_validate_events_file() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let config = Config {
            events: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config {
            events: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EventsNotFile(_))));

        let config = Config {
            events: Some(PathBuf::from("/nonexistent/events.ndjson")),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EventsNotFound(_))));
    }

    #[test]
    fn test_explicit_active_flag_ignores_environment() {
        let config = Config {
            active: Some("relaxed".into()),
            ..Default::default()
        };
        assert_eq!(config.activation_mode(), ActivationMode::Relaxed);
    }
}
