//! Frame ingestion sources.
//!
//! This module provides the sources the processing loop can pull frames from:
//! - Synthetic scene (`stub://...`, testing and demos)
//! - Directory of still images (replay of recorded footage)
//! - USB/V4L2 devices (feature: ingest-v4l2)
//!
//! Every source follows the same lifecycle: `open` once, `read` until it
//! reports `SourceError::Exhausted`, then `close` exactly once. A
//! `SourceError::Transient` from `read` means "skip this frame", never "stop".

pub mod file;
pub mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::config::SourceSettings;
use crate::error::SourceError;
use crate::frame::Frame;

pub use file::ImageDirSource;
pub use synthetic::{SyntheticConfig, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

/// A live or recorded frame source.
pub trait FrameSource {
    /// Human-readable location (URL, device or directory) for logs.
    fn location(&self) -> &str;

    /// Acquire the underlying device. Fails with `DeviceUnavailable`.
    fn open(&mut self) -> Result<(), SourceError>;

    /// Read the next frame.
    fn read(&mut self) -> Result<Frame, SourceError>;

    /// Release the underlying device.
    fn close(&mut self);

    /// Capture statistics.
    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub read_failures: u64,
}

/// Build the source named by `settings.url`.
///
/// - `stub://<name>[?query]` selects the synthetic scene
/// - `/dev/video*` selects a V4L2 device (requires ingest-v4l2)
/// - any other local path is treated as a directory of images
pub fn open_source(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    let url = settings.url.trim();
    if url.is_empty() {
        return Err(anyhow!("source url must not be empty"));
    }
    if url.starts_with("stub://") {
        let config = SyntheticConfig::from_url(url)?;
        return Ok(Box::new(SyntheticSource::new(config)));
    }
    if url.contains("://") {
        return Err(anyhow!(
            "unsupported source url {} (only stub://, /dev/video* and local directories)",
            url
        ));
    }
    if url.starts_with("/dev/video") {
        #[cfg(feature = "ingest-v4l2")]
        {
            return Ok(Box::new(V4l2Source::new(V4l2Config {
                device: url.to_string(),
                target_fps: settings.target_fps,
                ..V4l2Config::default()
            })));
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            return Err(anyhow!("camera devices require the ingest-v4l2 feature"));
        }
    }
    Ok(Box::new(ImageDirSource::new(Path::new(url))))
}
