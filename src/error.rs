//! Error taxonomy for the sentinel pipeline.
//!
//! Each collaborator reports its own error type so the processing loop can
//! decide, per kind, whether to skip a frame, stop cleanly, or keep going.
//! Only `SourceError::DeviceUnavailable` at startup is allowed to end the
//! process.

use std::path::PathBuf;

use thiserror::Error;

/// Frame source failures.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source cannot be opened at all.
    #[error("frame source unavailable: {0}")]
    DeviceUnavailable(String),

    /// A single read hiccup. The next read may succeed.
    #[error("transient frame read failure: {0}")]
    Transient(String),

    /// The source is permanently done (end of stream or unrecoverable read error).
    #[error("frame source exhausted")]
    Exhausted,
}

/// Detector invocation failure. Treated as "no detection" for that frame.
#[derive(Error, Debug)]
#[error("detector '{backend}' failed: {reason}")]
pub struct DetectorError {
    pub backend: String,
    pub reason: String,
}

impl DetectorError {
    pub fn new(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            reason: reason.into(),
        }
    }
}

/// Snapshot persistence failure.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to create capture directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write capture {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no free capture name next to {path} after {attempts} suffixes")]
    NameExhausted { path: PathBuf, attempts: u32 },

    #[error("failed to encode capture {path}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl CaptureError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            CaptureError::CreateDir { path, .. }
            | CaptureError::Write { path, .. }
            | CaptureError::Encode { path, .. }
            | CaptureError::NameExhausted { path, .. } => path,
        }
    }
}

/// Alert device failures. Never surfaced to the processing loop.
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("alert device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("alert playback failed: {0}")]
    Playback(String),
}
