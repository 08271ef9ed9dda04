use std::collections::VecDeque;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Region;
use crate::error::DetectorError;
use crate::frame::Frame;

/// One scripted detector outcome.
#[derive(Clone, Debug)]
pub enum ScriptStep {
    Absent,
    Present(Vec<Region>),
    Fail(String),
}

impl ScriptStep {
    /// A single full-confidence region covering `width`×`height` at the origin.
    pub fn person(width: u32, height: u32) -> Self {
        ScriptStep::Present(vec![Region {
            x: 0,
            y: 0,
            width,
            height,
            confidence: 1.0,
        }])
    }
}

/// Deterministic backend that replays a fixed script, one step per frame.
///
/// Once the script runs out every further frame is `Absent`, unless the
/// backend was built with `cycle`, in which case the script repeats.
pub struct ScriptedBackend {
    script: VecDeque<ScriptStep>,
    cycle: bool,
    calls: u64,
}

impl ScriptedBackend {
    pub fn new(script: Vec<ScriptStep>) -> Self {
        Self {
            script: script.into(),
            cycle: false,
            calls: 0,
        }
    }

    pub fn cycle(mut self) -> Self {
        self.cycle = true;
        self
    }

    /// Number of frames seen so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Region>, DetectorError> {
        self.calls += 1;
        let Some(step) = self.script.pop_front() else {
            return Ok(Vec::new());
        };
        if self.cycle {
            self.script.push_back(step.clone());
        }
        match step {
            ScriptStep::Absent => Ok(Vec::new()),
            ScriptStep::Present(regions) => Ok(regions),
            ScriptStep::Fail(reason) => Err(DetectorError::new(self.name(), reason)),
        }
    }
}
