//! Live status output.
//!
//! The processing loop hands every annotated frame to a `StatusDisplay`. A
//! display may ask the loop to stop by returning `DisplayControl::Quit`.

use image::RgbImage;

/// Whether a human is currently in view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionStatus {
    Present,
    Absent,
}

impl DetectionStatus {
    pub fn from_present(present: bool) -> Self {
        if present {
            Self::Present
        } else {
            Self::Absent
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Present => "STATUS: HUMAN DETECTED",
            Self::Absent => "STATUS: NO HUMAN",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayControl {
    Continue,
    Quit,
}

pub trait StatusDisplay {
    fn show(&mut self, frame: &RgbImage, status: DetectionStatus) -> DisplayControl;

    /// Release any display resources. Called once when the loop stops.
    fn close(&mut self);
}

/// Logs the status line whenever it changes.
#[derive(Debug, Default)]
pub struct LogDisplay {
    last: Option<DetectionStatus>,
    frames_shown: u64,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }
}

impl StatusDisplay for LogDisplay {
    fn show(&mut self, frame: &RgbImage, status: DetectionStatus) -> DisplayControl {
        self.frames_shown += 1;
        if self.last != Some(status) {
            log::info!("{} ({}x{})", status.label(), frame.width(), frame.height());
            self.last = Some(status);
        }
        DisplayControl::Continue
    }

    fn close(&mut self) {
        log::debug!("status display closed after {} frames", self.frames_shown);
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullDisplay;

impl StatusDisplay for NullDisplay {
    fn show(&mut self, _frame: &RgbImage, _status: DetectionStatus) -> DisplayControl {
        DisplayControl::Continue
    }

    fn close(&mut self) {}
}
