//! The processing loop.
//!
//! One iteration: read a frame, resize it, run detection, debounce, dispatch
//! side effects on a fire, render status. The loop owns every piece of state
//! it touches; the only things that cross threads are the shutdown flag
//! (set from a signal handler) and the detached alert workers started by the
//! dispatcher.
//!
//! Failure policy:
//! - source cannot be opened: `run` returns the error, nothing else happens
//! - transient read failure: skip the frame, pause `retry_delay`, continue
//! - detector failure: the frame counts as "no human"
//! - persistence failure: logged by the dispatcher, loop continues
//! - source exhausted, shutdown requested, display quit or frame budget
//!   reached: stop, releasing the source and display exactly once

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::config::SentinelConfig;
use crate::debounce::{self, DebounceState, FireDecision, NoFireReason};
use crate::detect::{DetectionResult, DetectorBackend};
use crate::dispatch::{Event, SideEffectDispatcher};
use crate::display::{DetectionStatus, DisplayControl, LogDisplay, StatusDisplay};
use crate::error::SourceError;
use crate::frame::annotate;
use crate::ingest::normalize::resize_to_width;
use crate::ingest::FrameSource;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq)]
pub struct LoopSettings {
    pub frame_width: u32,
    pub cooldown: Duration,
    /// Regions below this confidence are dropped before debouncing.
    pub min_confidence: f32,
    pub retry_delay: Duration,
    /// Stop after this many processed frames.
    pub max_frames: Option<u64>,
}

impl LoopSettings {
    pub fn from_config(cfg: &SentinelConfig) -> Self {
        Self {
            frame_width: cfg.frame_width,
            cooldown: cfg.cooldown,
            min_confidence: cfg.detector.min_confidence,
            retry_delay: cfg.source.retry_delay,
            max_frames: None,
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&SentinelConfig::default())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopping,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    ShutdownRequested,
    DisplayQuit,
    FrameBudget,
    SourceExhausted,
    SourceLost,
}

/// Cooperative stop flag shared with signal handlers.
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub transient_failures: u64,
    pub detector_failures: u64,
    pub events_fired: u64,
    pub artifacts_written: u64,
    pub persistence_failures: u64,
    pub stop_reason: Option<StopReason>,
}

pub struct ProcessingLoop {
    source: Box<dyn FrameSource>,
    detector: Box<dyn DetectorBackend>,
    dispatcher: SideEffectDispatcher,
    display: Box<dyn StatusDisplay>,
    clock: Box<dyn Clock>,
    debounce: DebounceState,
    settings: LoopSettings,
    shutdown: ShutdownSignal,
    state: LoopState,
    released: bool,
    summary: RunSummary,
    last_health_log: Instant,
    /// Capture-to-display time of the most recent frame.
    last_frame_latency: Duration,
}

impl ProcessingLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn DetectorBackend>,
        dispatcher: SideEffectDispatcher,
        settings: LoopSettings,
    ) -> Self {
        Self {
            source,
            detector,
            dispatcher,
            display: Box::new(LogDisplay::new()),
            clock: Box::new(SystemClock),
            debounce: DebounceState::new(settings.cooldown),
            settings,
            shutdown: ShutdownSignal::new(),
            state: LoopState::Running,
            released: false,
            summary: RunSummary::default(),
            last_health_log: Instant::now(),
            last_frame_latency: Duration::ZERO,
        }
    }

    pub fn with_display(mut self, display: Box<dyn StatusDisplay>) -> Self {
        self.display = display;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn debounce_state(&self) -> &DebounceState {
        &self.debounce
    }

    /// Capture-to-display time of the last processed frame.
    pub fn last_frame_latency(&self) -> Duration {
        self.last_frame_latency
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Run until a stop condition is met.
    ///
    /// Only a source that cannot be opened is an error. A loop that has
    /// already stopped returns its previous summary.
    pub fn run(&mut self) -> Result<RunSummary, SourceError> {
        if self.released {
            return Ok(self.summary.clone());
        }

        if let Err(e) = self.source.open() {
            log::error!("failed to open source {}: {}", self.source.location(), e);
            self.release();
            return Err(e);
        }
        log::info!(
            "processing {} with detector {} (cooldown {:?}, width {})",
            self.source.location(),
            self.detector.name(),
            self.settings.cooldown,
            self.settings.frame_width
        );

        if let Err(e) = self.detector.warm_up() {
            log::warn!("detector {} warm-up failed: {}", self.detector.name(), e);
        }

        let reason = loop {
            if let Some(reason) = self.step() {
                break reason;
            }
        };

        self.state = LoopState::Stopping;
        self.summary.stop_reason = Some(reason);
        log::info!("stopping: {:?}", reason);
        self.release();
        Ok(self.summary.clone())
    }

    /// One iteration. Returns a reason when the loop should stop.
    fn step(&mut self) -> Option<StopReason> {
        if self.shutdown.is_requested() {
            return Some(StopReason::ShutdownRequested);
        }
        if let Some(max) = self.settings.max_frames {
            if self.summary.frames_processed >= max {
                return Some(StopReason::FrameBudget);
            }
        }

        let frame = match self.source.read() {
            Ok(frame) => frame,
            Err(SourceError::Transient(reason)) => {
                self.summary.transient_failures += 1;
                log::warn!("frame read failed, skipping: {}", reason);
                if !self.settings.retry_delay.is_zero() {
                    std::thread::sleep(self.settings.retry_delay);
                }
                return None;
            }
            Err(SourceError::Exhausted) => return Some(StopReason::SourceExhausted),
            Err(SourceError::DeviceUnavailable(reason)) => {
                log::error!("source {} lost: {}", self.source.location(), reason);
                return Some(StopReason::SourceLost);
            }
        };

        let frame = resize_to_width(frame, self.settings.frame_width);

        let detection = match self.detector.detect(&frame) {
            Ok(regions) => {
                DetectionResult::new(regions).with_confidence_floor(self.settings.min_confidence)
            }
            Err(e) => {
                self.summary.detector_failures += 1;
                log::warn!("detection failed on frame {}: {}", frame.sequence, e);
                DetectionResult::absent()
            }
        };
        let present = detection.present();

        let now = self.clock.now();
        let decision = debounce::evaluate(present, now, &mut self.debounce);
        let annotated = annotate(&frame, &detection.regions, present);

        match decision {
            FireDecision::Fire => {
                self.summary.events_fired += 1;
                let outcome = self.dispatcher.dispatch(Event {
                    fired_at: now,
                    snapshot: annotated.clone(),
                    regions: detection.regions,
                    frame_sequence: frame.sequence,
                });
                if outcome.artifact.is_some() {
                    self.summary.artifacts_written += 1;
                } else {
                    self.summary.persistence_failures += 1;
                }
            }
            FireDecision::NoFire(NoFireReason::ClockRegressed) => {
                log::warn!(
                    "clock moved backwards (now {}, last seen {:?}); not firing",
                    now,
                    self.debounce.last_seen()
                );
            }
            FireDecision::NoFire(_) => {}
        }

        self.summary.frames_processed += 1;
        let control = self
            .display
            .show(&annotated, DetectionStatus::from_present(present));
        self.last_frame_latency = frame.age();

        if self.last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
            let stats = self.source.stats();
            log::info!(
                "source={} frames={} read_failures={} events={} latency={:?}",
                self.source.location(),
                stats.frames_captured,
                stats.read_failures,
                self.summary.events_fired,
                self.last_frame_latency
            );
            self.last_health_log = Instant::now();
        }

        match control {
            DisplayControl::Quit => Some(StopReason::DisplayQuit),
            DisplayControl::Continue => None,
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.source.close();
            self.display.close();
            self.released = true;
        }
        self.state = LoopState::Stopped;
    }
}

impl Drop for ProcessingLoop {
    fn drop(&mut self) {
        self.release();
    }
}
