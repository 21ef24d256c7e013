// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! hushbuild: replay build lifecycle events into a compact status report
//!
//! This binary reads newline-delimited JSON events from a file or stdin,
//! feeds them to the engine and writes the status protocol to stdout.

use std::fs::File;
use std::io::{self, BufReader};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

use hushbuild::config::{Config, EngineConfig};
use hushbuild::engine::Engine;
use hushbuild::formatter::Reporter;
use hushbuild::logging::init_tracing;
use hushbuild::redirect::AmbientStreams;
use hushbuild::replay::replay;

fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    config.validate()?;

    // Initialize tracing subscriber behind a reloadable filter
    let logging = init_tracing(config.log_level())?;

    let mode = config.activation_mode();
    info!(?mode, "Starting hushbuild...");

    let streams = AmbientStreams::process();
    let mut engine = Engine::new(
        EngineConfig::new(mode),
        Reporter::stdout(),
        streams.clone(),
        Arc::new(logging),
    );
    engine.init();

    let result = match &config.events {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open events file {}", path.display()))?;
            replay(&mut engine, &streams, BufReader::new(file))
        }
        None => replay(&mut engine, &streams, io::stdin().lock()),
    };
    engine.close();

    let stats = result.context("Replay failed")?;
    debug!(events = stats.events, outputs = stats.outputs, "Replay finished");
    Ok(())
}
