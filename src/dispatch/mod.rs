//! Side effects of a fired detection event.
//!
//! `SideEffectDispatcher::dispatch` does two things, in order:
//! 1. writes the annotated snapshot to the capture directory (synchronous;
//!    the file exists when `dispatch` returns)
//! 2. starts the alert tone on a detached worker thread (never awaited)
//!
//! Neither step can fail the caller. Persistence errors are logged and
//! reported in the returned `DispatchOutcome`; alert errors are logged by the
//! worker and go nowhere else.

pub mod alert;
pub mod capture;

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};
use image::RgbImage;

use crate::detect::Region;

pub use alert::{open_alert_device, AlertDevice, TerminalBell, Tone};
#[cfg(feature = "alert-rodio")]
pub use alert::RodioTone;
pub use capture::{CaptureArtifact, CaptureStore};

/// A fired detection event.
#[derive(Clone, Debug)]
pub struct Event {
    pub fired_at: DateTime<Utc>,
    /// Annotated frame to persist.
    pub snapshot: RgbImage,
    pub regions: Vec<Region>,
    pub frame_sequence: u64,
}

/// What happened to the alert for one dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertDispatch {
    Spawned,
    Disabled,
    SpawnFailed,
}

/// Result of one dispatch, for counters and tests.
#[derive(Clone, Debug)]
pub struct DispatchOutcome {
    /// `None` when persistence failed.
    pub artifact: Option<CaptureArtifact>,
    pub alert: AlertDispatch,
}

pub struct SideEffectDispatcher {
    store: CaptureStore,
    alert: Option<Arc<dyn AlertDevice>>,
    tone: Tone,
}

impl SideEffectDispatcher {
    /// `alert = None` disables the audible alert.
    pub fn new(store: CaptureStore, alert: Option<Arc<dyn AlertDevice>>, tone: Tone) -> Self {
        Self { store, alert, tone }
    }

    pub fn store(&self) -> &CaptureStore {
        &self.store
    }

    pub fn dispatch(&self, event: Event) -> DispatchOutcome {
        let artifact = match self.store.persist(&event.snapshot, event.fired_at) {
            Ok(artifact) => {
                log::info!(
                    "human detected (frame {}, {} region(s)) -> image saved: {}",
                    event.frame_sequence,
                    event.regions.len(),
                    artifact.path.display()
                );
                Some(artifact)
            }
            Err(e) => {
                log::error!(
                    "capture dropped for frame {}: {} ({})",
                    event.frame_sequence,
                    e,
                    std::error::Error::source(&e)
                        .map(|s| s.to_string())
                        .unwrap_or_default()
                );
                None
            }
        };

        let alert = match &self.alert {
            Some(device) => self.spawn_alert(Arc::clone(device)),
            None => AlertDispatch::Disabled,
        };

        DispatchOutcome { artifact, alert }
    }

    fn spawn_alert(&self, device: Arc<dyn AlertDevice>) -> AlertDispatch {
        let tone = self.tone;
        let spawned = thread::Builder::new()
            .name("alert".to_string())
            .spawn(move || {
                if let Err(e) = device.play(tone) {
                    log::warn!("alarm via {} failed: {}", device.name(), e);
                }
            });
        match spawned {
            Ok(_detached) => AlertDispatch::Spawned,
            Err(e) => {
                log::warn!("failed to start alert worker: {}", e);
                AlertDispatch::SpawnFailed
            }
        }
    }
}
