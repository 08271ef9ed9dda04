//! Human Sentinel
//!
//! Watches a camera feed for people. When someone shows up, an annotated
//! snapshot is written to disk and a short tone is played, at most once per
//! cooldown window.
//!
//! # Architecture
//!
//! A single processing loop pulls frames from a `FrameSource`, resizes them,
//! asks a `DetectorBackend` for person regions and feeds the presence signal
//! to the debouncer. Fired events go to the `SideEffectDispatcher`, which
//! persists the snapshot synchronously and starts the alert on a detached
//! worker thread so the loop never waits on audio.
//!
//! Two rules hold by construction:
//!
//! 1. **Leading-edge rate limit**: the first detection fires immediately,
//!    later ones are silenced until strictly more than the cooldown has passed
//!    since the last fire.
//! 2. **Fail open**: detector errors count as "no human"; persistence and
//!    alert errors are logged and the loop keeps going.
//!
//! # Module Structure
//!
//! - `ingest`: Frame sources (synthetic, image directory, V4L2)
//! - `detect`: Detector backends and the backend registry
//! - `debounce`: Cooldown state and the fire decision
//! - `dispatch`: Snapshot persistence and alert devices
//! - `pipeline`: The processing loop
//! - `frame`, `display`, `clock`, `config`, `error`: supporting types

pub mod clock;
pub mod config;
pub mod debounce;
pub mod detect;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;

pub use clock::{Clock, SystemClock};
pub use config::{AlertSettings, CaptureSettings, DetectorSettings, SentinelConfig, SourceSettings};
pub use debounce::{evaluate, DebounceState, FireDecision, NoFireReason};
pub use detect::{BackendRegistry, DetectionResult, DetectorBackend, Region};
pub use dispatch::{
    open_alert_device, AlertDevice, CaptureArtifact, CaptureStore, DispatchOutcome, Event,
    SideEffectDispatcher, Tone,
};
pub use display::{DetectionStatus, DisplayControl, LogDisplay, NullDisplay, StatusDisplay};
pub use error::{AlertError, CaptureError, DetectorError, SourceError};
pub use frame::{annotate, Frame};
pub use ingest::{open_source, FrameSource, SourceStats};
pub use pipeline::{LoopSettings, LoopState, ProcessingLoop, RunSummary, ShutdownSignal, StopReason};
