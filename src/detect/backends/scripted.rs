use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;
use crate::frame::Frame;

/// Scripted outcome of one `infer` call.
#[derive(Clone, Debug)]
pub enum ScriptStep {
    Detections(Vec<RawDetection>),
    Fail(String),
}

/// Backend that replays a fixed script, one step per `infer` call.
///
/// Once the script runs out every further call returns no detections.
pub struct ScriptedBackend {
    steps: VecDeque<ScriptStep>,
    load_error: Option<String>,
    calls: u64,
}

impl ScriptedBackend {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            load_error: None,
            calls: 0,
        }
    }

    /// Backend whose `load` always fails with `reason`.
    pub fn failing_load(reason: impl Into<String>) -> Self {
        Self {
            steps: VecDeque::new(),
            load_error: Some(reason.into()),
            calls: 0,
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn load(&mut self) -> Result<()> {
        match &self.load_error {
            Some(reason) => Err(anyhow!("{}", reason)),
            None => Ok(()),
        }
    }

    fn infer(&mut self, _frame: &Frame) -> Result<Vec<RawDetection>> {
        self.calls += 1;
        match self.steps.pop_front() {
            Some(ScriptStep::Detections(detections)) => Ok(detections),
            Some(ScriptStep::Fail(message)) => Err(anyhow!("{}", message)),
            None => Ok(Vec::new()),
        }
    }
}
