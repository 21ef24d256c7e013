// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! hushbuild library
//!
//! This module exports the build-event aggregation and reporting engine for
//! use by host adapters, integration tests and the `hushbuild` binary.
//!
//! A host creates an [`engine::Engine`], calls [`engine::Engine::init`] once,
//! feeds it [`event::BuildEvent`]s as the build runs and calls
//! [`engine::Engine::close`] at shutdown. The engine answers with a compact
//! line protocol on the original output stream while the host's own output
//! is captured into a build log.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod formatter;
pub mod logging;
pub mod metrics;
pub mod redirect;
pub mod replay;
pub mod session;

pub use config::{ActivationMode, Config, EngineConfig};
pub use engine::{Engine, EngineState};
pub use error::{EngineError, LoggingError, PropertyError, RedirectError, ReplayError};
pub use event::{BuildEvent, FailureInfo, HostSession, ModuleInfo, StepInfo};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ActivationMode, EngineConfig};
    pub use crate::engine::{Engine, EngineState};
    pub use crate::error::EngineError;
    pub use crate::event::{
        BuildEvent, FailureInfo, HostSession, ModuleInfo, PropertyMap, SessionProperties,
        StepInfo,
    };
    pub use crate::formatter::Reporter;
    pub use crate::logging::{LoggingControl, NoopLogging};
    pub use crate::metrics::BuildMetrics;
    pub use crate::redirect::{AmbientStreams, StreamHandle};
}

/// Lock `mutex`, recovering the data if a panicking thread poisoned it
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
