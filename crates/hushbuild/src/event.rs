// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Build lifecycle events delivered by the host orchestrator
//!
//! Events are plain serde types so a host can hand them over in-process or
//! as newline-delimited JSON:
//!
//! ```
//! use hushbuild::event::BuildEvent;
//!
//! let event: BuildEvent = serde_json::from_str(
//!     r#"{"type":"step_failed","step":{"plugin":"maven-compiler-plugin","action":"compile"}}"#,
//! ).unwrap();
//! assert!(matches!(event, BuildEvent::StepFailed { .. }));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::PropertyError;
use crate::lock;

/// Maximum number of links followed when looking for a failure's long message
pub const MAX_CAUSE_DEPTH: usize = 5;

/// One buildable unit of a multi-module build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
}

impl ModuleInfo {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        base_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            base_dir,
        }
    }
}

/// One step (plugin action) executed within a module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    #[serde(default)]
    pub plugin: String,
    #[serde(default)]
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
}

impl StepInfo {
    #[must_use]
    pub fn new(plugin: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            action: action.into(),
            execution_id: None,
        }
    }

    #[must_use]
    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self
    }
}

/// Why a step failed: a message plus an optional chain of causes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Full tool output, when the failing step captured it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<FailureInfo>>,
}

impl FailureInfo {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_long_message(mut self, long_message: impl Into<String>) -> Self {
        self.long_message = Some(long_message.into());
        self
    }

    #[must_use]
    pub fn caused_by(mut self, cause: FailureInfo) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Text that best describes the failure
    ///
    /// The first non-empty long message within [`MAX_CAUSE_DEPTH`] links of
    /// the chain, otherwise this failure's own message.
    #[must_use]
    pub fn failure_output(&self) -> Option<&str> {
        std::iter::successors(Some(self), |f| f.cause.as_deref())
            .take(MAX_CAUSE_DEPTH)
            .find_map(|f| f.long_message.as_deref().filter(|m| !m.is_empty()))
            .or(self.message.as_deref())
    }
}

/// Mutable configuration properties shared with the host session
pub trait SessionProperties: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns a [`PropertyError`] if the store refuses the write.
    fn set(&self, key: &str, value: &str) -> Result<(), PropertyError>;

    /// # Errors
    ///
    /// Returns a [`PropertyError`] if the store refuses the removal.
    fn remove(&self, key: &str) -> Result<(), PropertyError>;
}

/// In-memory [`SessionProperties`] store
#[derive(Debug, Default)]
pub struct PropertyMap {
    values: Mutex<BTreeMap<String, String>>,
}

impl PropertyMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `entries`
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }
}

impl SessionProperties for PropertyMap {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PropertyError> {
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PropertyError> {
        lock(&self.values).remove(key);
        Ok(())
    }
}

fn default_properties() -> Arc<dyn SessionProperties> {
    Arc::new(PropertyMap::new())
}

/// The host's view of one build invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSession {
    #[serde(default)]
    pub modules: Vec<ModuleInfo>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(skip, default = "default_properties")]
    pub properties: Arc<dyn SessionProperties>,
}

impl HostSession {
    /// Session with an empty in-memory property store
    #[must_use]
    pub fn new(modules: Vec<ModuleInfo>, goals: Vec<String>) -> Self {
        Self {
            modules,
            goals,
            properties: default_properties(),
        }
    }

    #[must_use]
    pub fn with_properties(mut self, properties: Arc<dyn SessionProperties>) -> Self {
        self.properties = properties;
        self
    }
}

impl Default for HostSession {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

/// A build lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildEvent {
    SessionStarted {
        #[serde(default)]
        session: Option<HostSession>,
    },
    StepSucceeded {
        #[serde(default)]
        step: Option<StepInfo>,
        #[serde(default)]
        module: Option<ModuleInfo>,
    },
    StepFailed {
        #[serde(default)]
        step: Option<StepInfo>,
        #[serde(default)]
        module: Option<ModuleInfo>,
        #[serde(default)]
        failure: Option<FailureInfo>,
    },
    ModuleSucceeded {
        #[serde(default)]
        module: Option<ModuleInfo>,
    },
    ModuleFailed {
        #[serde(default)]
        module: Option<ModuleInfo>,
    },
    SessionEnded,
    /// Any lifecycle event the engine has no use for
    #[serde(other)]
    Other,
}

impl BuildEvent {
    /// Short event name, matching the serialized `type` tag
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::StepSucceeded { .. } => "step_succeeded",
            Self::StepFailed { .. } => "step_failed",
            Self::ModuleSucceeded { .. } => "module_succeeded",
            Self::ModuleFailed { .. } => "module_failed",
            Self::SessionEnded => "session_ended",
            Self::Other => "other",
        }
    }
}
