// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Control over the host's ambient logging level
//!
//! While active, the engine lowers the host's logging to `off` (strict) or
//! `error` (relaxed) and restores it afterwards. Hosts that cannot change
//! their logging at runtime use [`NoopLogging`].

use std::sync::Mutex;

use tracing::debug;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use crate::error::LoggingError;
use crate::lock;

/// A logging backend whose level can be lowered and put back
pub trait LoggingControl: Send + Sync {
    /// Lower the logging level to `level`
    ///
    /// # Errors
    ///
    /// Returns a [`LoggingError`] if the backend cannot be changed.
    fn suppress(&self, level: LevelFilter) -> Result<(), LoggingError>;

    /// Undo the last [`LoggingControl::suppress`]
    ///
    /// # Errors
    ///
    /// Returns a [`LoggingError`] if the backend cannot be changed.
    fn restore(&self) -> Result<(), LoggingError>;
}

/// Leaves logging untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogging;

impl LoggingControl for NoopLogging {
    fn suppress(&self, _level: LevelFilter) -> Result<(), LoggingError> {
        Ok(())
    }

    fn restore(&self) -> Result<(), LoggingError> {
        Ok(())
    }
}

/// Reload handle for the global subscriber's filter
pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Swaps the active [`EnvFilter`] of a reloadable subscriber
pub struct ReloadLogging {
    handle: FilterHandle,
    previous: Mutex<Option<String>>,
}

impl ReloadLogging {
    #[must_use]
    pub fn new(handle: FilterHandle) -> Self {
        Self {
            handle,
            previous: Mutex::new(None),
        }
    }

    /// Directives of the filter currently in effect
    ///
    /// # Errors
    ///
    /// Returns a [`LoggingError`] if the subscriber is gone.
    pub fn current_directives(&self) -> Result<String, LoggingError> {
        Ok(self.handle.with_current(ToString::to_string)?)
    }
}

impl LoggingControl for ReloadLogging {
    fn suppress(&self, level: LevelFilter) -> Result<(), LoggingError> {
        let current = self.current_directives()?;
        self.handle.reload(EnvFilter::new(level.to_string()))?;
        let mut previous = lock(&self.previous);
        // Keep the first saved filter if suppress runs twice
        if previous.is_none() {
            *previous = Some(current);
        }
        debug!(%level, "Ambient logging suppressed");
        Ok(())
    }

    fn restore(&self) -> Result<(), LoggingError> {
        let Some(directives) = lock(&self.previous).take() else {
            return Ok(());
        };
        self.handle.reload(EnvFilter::try_new(directives)?)?;
        Ok(())
    }
}

impl std::fmt::Debug for ReloadLogging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadLogging")
            .field("previous", &*lock(&self.previous))
            .finish_non_exhaustive()
    }
}

/// Build the reloadable filter the binary logs through
///
/// `RUST_LOG` directives are honoured, with `level` added as the default.
#[must_use]
pub fn reloadable_filter(level: tracing::Level) -> (reload::Layer<EnvFilter, Registry>, FilterHandle) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    reload::Layer::new(filter)
}

/// Install the global subscriber: stderr output behind a reloadable filter
///
/// # Errors
///
/// Returns [`LoggingError::Init`] if a global subscriber is already set.
pub fn init_tracing(level: tracing::Level) -> Result<ReloadLogging, LoggingError> {
    let (filter, handle) = reloadable_filter(level);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(ReloadLogging::new(handle))
}
