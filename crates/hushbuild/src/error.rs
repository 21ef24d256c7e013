// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for hushbuild

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A fault raised while handling a lifecycle event
///
/// The engine never lets one of these escape: it reports the fault as a
/// single `PASSTHROUGH` line and disables itself for the rest of the run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A session-start event arrived without a session
    #[error("session-started event carried no session")]
    MissingSession,

    /// Writing to the protocol stream failed
    #[error("protocol write failed: {0}")]
    Output(#[from] io::Error),

    /// The host's session properties rejected an update
    #[error(transparent)]
    Property(#[from] PropertyError),

    /// Event handling panicked
    #[error("{0}")]
    Panic(String),
}

impl EngineError {
    /// Short fault name used as the `PASSTHROUGH` prefix
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingSession => "MissingSession",
            Self::Output(_) => "OutputError",
            Self::Property(_) => "PropertyError",
            Self::Panic(_) => "Panic",
        }
    }
}

/// Errors from a host session's property store
#[derive(Debug, Error)]
pub enum PropertyError {
    /// The store does not accept writes
    #[error("session property {key} is read-only")]
    ReadOnly { key: String },

    /// The store refused the value
    #[error("session property {key} was rejected: {reason}")]
    Rejected { key: String, reason: String },
}

/// Errors from the build-log sink
#[derive(Debug, Error)]
pub enum RedirectError {
    /// The build log's parent directory could not be created
    #[error("could not create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The build log could not be opened
    #[error("could not open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing or flushing the open build log failed
    #[error("{0}")]
    Write(#[source] io::Error),
}

/// Errors from suppressing or restoring the ambient logging level
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The reloadable filter could not be swapped
    #[error("logging filter reload failed: {0}")]
    Reload(#[from] tracing_subscriber::reload::Error),

    /// A stored filter directive no longer parses
    #[error("invalid logging directive: {0}")]
    Directive(#[from] tracing_subscriber::filter::ParseError),

    /// A global subscriber was already installed
    #[error("logging already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    /// The logging backend cannot be controlled
    #[error("{0}")]
    Unavailable(String),
}

/// Errors from replaying an event stream
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Reading the input failed
    #[error("failed to read events: {0}")]
    Io(#[from] io::Error),

    /// A line did not hold a valid record
    #[error("invalid record on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
