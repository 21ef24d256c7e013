// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Newline-delimited JSON replay of a host's event stream
//!
//! Each non-blank line is either a lifecycle event, tagged by `type`:
//!
//! ```json
//! {"type":"module_succeeded","module":{"group_id":"com.example","artifact_id":"app"}}
//! ```
//!
//! or a piece of ambient host output, which is written to the engine's
//! ambient streams (and so ends up in the build log while redirected):
//!
//! ```json
//! {"stream":"out","text":"[INFO] Building app 1.0"}
//! ```
//!
//! Lines starting with `#` are comments.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::engine::Engine;
use crate::error::ReplayError;
use crate::event::BuildEvent;
use crate::redirect::AmbientStreams;

/// Which ambient stream a line of host output belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Out,
    Err,
}

/// A line of ambient host output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostOutput {
    pub stream: OutputStream,
    pub text: String,
}

/// One line of a replay file
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReplayRecord {
    Output(HostOutput),
    Event(BuildEvent),
}

/// What a replay consumed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    pub events: usize,
    pub outputs: usize,
}

/// Parse one replay line; `None` for blank and comment lines
///
/// # Errors
///
/// Returns the JSON error for a line that is neither an event nor output.
pub fn parse_record(line: &str) -> Result<Option<ReplayRecord>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Feed every record of `input` to `engine`, in order
///
/// Host output goes to `streams`; write failures there are the redirect's
/// business and are not reported here.
///
/// # Errors
///
/// Returns [`ReplayError::Io`] if reading fails and [`ReplayError::Json`] for
/// the first malformed line. Records before it have already been applied.
pub fn replay(
    engine: &mut Engine,
    streams: &AmbientStreams,
    input: impl BufRead,
) -> Result<ReplayStats, ReplayError> {
    let mut stats = ReplayStats::default();

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let record = parse_record(&line).map_err(|source| ReplayError::Json {
            line: index + 1,
            source,
        })?;

        match record {
            None => {}
            Some(ReplayRecord::Event(event)) => {
                trace!(line = index + 1, event = event.name(), "Replaying event");
                engine.on_event(&event);
                stats.events += 1;
            }
            Some(ReplayRecord::Output(output)) => {
                let mut handle = match output.stream {
                    OutputStream::Out => streams.out.clone(),
                    OutputStream::Err => streams.err.clone(),
                };
                let mut text = output.text;
                text.push('\n');
                if let Err(e) = handle.write_all(text.as_bytes()) {
                    debug!(error = %e, "Dropped host output");
                }
                stats.outputs += 1;
            }
        }
    }

    Ok(stats)
}
