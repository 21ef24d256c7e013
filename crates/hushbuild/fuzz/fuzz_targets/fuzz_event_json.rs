// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for replay records
//!
//! Event streams are read from files and pipes, so parsing and dispatching
//! arbitrary records must never panic or take the engine down.

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;

use hushbuild::formatter::SharedBuffer;
use hushbuild::prelude::*;
use hushbuild::replay::{ReplayRecord, parse_record};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let protocol = SharedBuffer::new();
    let mut engine = Engine::new(
        EngineConfig::new(ActivationMode::Relaxed),
        Reporter::new(protocol.clone()),
        AmbientStreams::new(
            StreamHandle::from_writer(std::io::sink()),
            StreamHandle::from_writer(std::io::sink()),
        ),
        Arc::new(NoopLogging),
    );
    engine.init();

    for line in input.lines() {
        if let Ok(Some(ReplayRecord::Event(event))) = parse_record(line) {
            // Base directories would let the fuzzer write anywhere
            if let BuildEvent::SessionStarted { session: Some(session) } = &event {
                if session.modules.iter().any(|m| m.base_dir.is_some()) {
                    continue;
                }
            }
            if let BuildEvent::StepSucceeded { module: Some(m), .. }
            | BuildEvent::StepFailed { module: Some(m), .. } = &event
            {
                if m.base_dir.is_some() {
                    continue;
                }
            }
            engine.on_event(&event);
        }
    }
    engine.close();

    let _: Result<serde_json::Value, _> = serde_json::from_slice(data);
});
