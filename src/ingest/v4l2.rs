//! V4L2 frame source.
//!
//! Captures frames from a local V4L2 device node (e.g. `/dev/video0`). The
//! device is asked for RGB3; NV12 is accepted and converted. A capture error
//! is transient until `MAX_CONSECUTIVE_FAILURES` pile up, after which the
//! device is treated as gone and the source reports `Exhausted`.

use ouroboros::self_referencing;
use std::time::{Duration, Instant};

use super::normalize::{normalize_to_rgb, PixelFormat};
use super::{FrameSource, SourceStats};
use crate::error::SourceError;
use crate::frame::Frame;

const MAX_CONSECUTIVE_FAILURES: u32 = 30;

/// Configuration for a V4L2 source.
#[derive(Clone, Debug)]
pub struct V4l2Config {
    /// Device path (e.g., "/dev/video0")
    pub device: String,
    /// Requested frame rate (frames per second).
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for V4l2Config {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// V4L2 frame source backed by libv4l memory-mapped streaming.
pub struct V4l2Source {
    config: V4l2Config,
    state: Option<DeviceV4l2State>,
    frame_count: u64,
    failures: u64,
    consecutive_failures: u32,
    last_frame_at: Option<Instant>,
    active_width: u32,
    active_height: u32,
    pixel_format: PixelFormat,
}

#[self_referencing]
struct DeviceV4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Source {
    pub fn new(config: V4l2Config) -> Self {
        Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            frame_count: 0,
            failures: 0,
            consecutive_failures: 0,
            last_frame_at: None,
            pixel_format: PixelFormat::Rgb24,
        }
    }

    /// Whether a frame arrived recently enough for the configured rate.
    pub fn is_healthy(&self) -> bool {
        match self.last_frame_at {
            Some(at) => at.elapsed() <= self.health_grace(),
            None => self.state.is_some(),
        }
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }

    fn record_failure(&mut self, reason: String) -> SourceError {
        self.failures += 1;
        self.consecutive_failures += 1;
        if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
            log::error!(
                "V4l2Source: {} failed {} reads in a row, giving up: {}",
                self.config.device,
                self.consecutive_failures,
                reason
            );
            SourceError::Exhausted
        } else {
            SourceError::Transient(reason)
        }
    }
}

impl FrameSource for V4l2Source {
    fn location(&self) -> &str {
        &self.config.device
    }

    fn open(&mut self) -> Result<(), SourceError> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let unavailable =
            |what: &str, err: std::io::Error| SourceError::DeviceUnavailable(format!("{what}: {err}"));

        let mut device = v4l::Device::with_path(&self.config.device)
            .map_err(|e| unavailable(&format!("open v4l2 device {}", self.config.device), e))?;
        let mut format = device
            .format()
            .map_err(|e| unavailable("read v4l2 format", e))?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Source: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .map_err(|e| unavailable("read v4l2 format after set failure", e))?
            }
        };

        self.pixel_format = match &format.fourcc.repr {
            b"RGB3" => PixelFormat::Rgb24,
            b"NV12" => PixelFormat::Nv12,
            other => {
                return Err(SourceError::DeviceUnavailable(format!(
                    "unsupported pixel format {}",
                    String::from_utf8_lossy(other)
                )))
            }
        };

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "V4l2Source: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;

        let state = DeviceV4l2StateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
            },
        }
        .try_build()
        .map_err(|e| unavailable("create v4l2 buffer stream", e))?;
        self.state = Some(state);
        self.consecutive_failures = 0;

        log::info!(
            "V4l2Source: connected to {} ({}x{}, {:?})",
            self.config.device,
            self.active_width,
            self.active_height,
            self.pixel_format
        );
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, SourceError> {
        use v4l::io::traits::CaptureStream;

        let Some(state) = self.state.as_mut() else {
            return Err(SourceError::DeviceUnavailable(format!(
                "{} is not open",
                self.config.device
            )));
        };

        let (width, height, format) = (self.active_width, self.active_height, self.pixel_format);
        let captured = state.with_mut(|fields| {
            fields
                .stream
                .next()
                .map_err(|e| format!("capture v4l2 frame: {e}"))
                .and_then(|(buf, _meta)| {
                    normalize_to_rgb(buf, width, height, format).map_err(|e| e.to_string())
                })
        });

        let pixels = match captured {
            Ok(pixels) => pixels,
            Err(reason) => return Err(self.record_failure(reason)),
        };

        let frame = Frame::from_rgb(pixels, width, height, self.frame_count + 1)
            .map_err(|e| self.record_failure(e.to_string()))?;
        self.frame_count += 1;
        self.consecutive_failures = 0;
        self.last_frame_at = Some(Instant::now());
        Ok(frame)
    }

    fn close(&mut self) {
        if self.state.take().is_some() {
            log::info!("V4l2Source: released {}", self.config.device);
        }
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            read_failures: self.failures,
        }
    }
}
