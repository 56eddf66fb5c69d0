//! Shared fixtures for the integration suite.

#![allow(dead_code)]

use parking_lot::Mutex;
use templar::prelude::*;

/// Records every instantiation request and rejects the display names it
/// was told to reject.
#[derive(Default)]
pub struct Recorder {
    log: Mutex<Vec<String>>,
    rejected: Vec<String>,
}

impl Recorder {
    pub fn rejecting(names: &[&str]) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            rejected: names.iter().map(|name| name.to_string()).collect(),
        }
    }

    /// Display names in request order.
    pub fn requests(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn count(&self, display_name: &str) -> usize {
        self.log.lock().iter().filter(|name| *name == display_name).count()
    }
}

impl Instantiator for Recorder {
    fn instantiate(&self, request: &InstantiationRequest<'_>) -> Result<CompiledHandle, CompileError> {
        let mut log = self.log.lock();
        log.push(request.display_name.to_string());
        if self.rejected.iter().any(|name| name == request.display_name) {
            return Err(CompileError::new(request.display_name, "static assertion failed"));
        }
        Ok(CompiledHandle(log.len() as u64))
    }
}

/// An engine with the prelude, `source` registered and a fresh recorder.
pub fn engine(source: &str) -> Engine<Recorder> {
    engine_with(source, Recorder::default())
}

pub fn engine_with(source: &str, recorder: Recorder) -> Engine<Recorder> {
    let engine = Engine::with_instantiator(recorder).unwrap();
    engine
        .register_source(source)
        .unwrap_or_else(|err| panic!("failed to register source: {err}"));
    engine
}
