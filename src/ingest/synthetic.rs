//! Synthetic frame source (`stub://`).
//!
//! Generates a dim, slightly noisy background with a bright "walker" that
//! crosses the scene for part of every cycle. Good enough to drive the motion
//! backend end to end without a camera.
//!
//! URL query options:
//! - `frames=N`      report `Exhausted` after N frames
//! - `size=WxH`      frame size (default 800x600)
//! - `fail_every=N`  every Nth read is a transient failure (N >= 2)
//! - `seed=N`        noise seed

use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{FrameSource, SourceStats};
use crate::error::SourceError;
use crate::frame::Frame;

const CYCLE_FRAMES: u64 = 90;
const WALK_FRAMES: u64 = 40;
const NOISE_AMPLITUDE: u8 = 6;

/// Configuration for the synthetic source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntheticConfig {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub frame_limit: Option<u64>,
    pub fail_every: Option<u64>,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            url: "stub://camera".to_string(),
            width: 800,
            height: 600,
            frame_limit: None,
            fail_every: None,
            seed: 7,
        }
    }
}

impl SyntheticConfig {
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("stub://")
            .ok_or_else(|| anyhow!("synthetic source url must start with stub://"))?;
        let mut config = Self {
            url: url.to_string(),
            ..Self::default()
        };
        let Some((_, query)) = rest.split_once('?') else {
            return Ok(config);
        };

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("malformed stub query parameter '{}'", pair))?;
            match key {
                "frames" => config.frame_limit = Some(parse_u64(key, value)?),
                "fail_every" => {
                    let n = parse_u64(key, value)?;
                    if n == 1 {
                        return Err(anyhow!("fail_every=1 would never produce a frame"));
                    }
                    config.fail_every = (n > 0).then_some(n);
                }
                "seed" => config.seed = parse_u64(key, value)?,
                "size" => {
                    let (w, h) = value
                        .split_once('x')
                        .ok_or_else(|| anyhow!("size must look like WxH, got '{}'", value))?;
                    config.width = parse_u64(key, w)? as u32;
                    config.height = parse_u64(key, h)? as u32;
                    if config.width == 0 || config.height == 0 {
                        return Err(anyhow!("size must be non-zero"));
                    }
                }
                other => return Err(anyhow!("unknown stub query parameter '{}'", other)),
            }
        }
        Ok(config)
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .with_context(|| format!("stub parameter {} must be an integer", key))
}

/// Synthetic frame source.
pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: StdRng,
    reads: u64,
    frame_count: u64,
    failures: u64,
    open: bool,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            reads: 0,
            frame_count: 0,
            failures: 0,
            open: false,
        }
    }

    /// Whether frame `n` (1-based) shows the walker.
    pub fn walker_visible(n: u64) -> bool {
        let phase = n % CYCLE_FRAMES;
        phase >= CYCLE_FRAMES - WALK_FRAMES
    }

    fn render(&mut self, n: u64) -> RgbImage {
        let (width, height) = (self.config.width, self.config.height);
        let mut image = RgbImage::new(width, height);
        for pixel in image.pixels_mut() {
            let v = 40 + self.rng.gen_range(0..=NOISE_AMPLITUDE);
            *pixel = Rgb([v, v, v + 4]);
        }

        if Self::walker_visible(n) {
            let step = (n % CYCLE_FRAMES) - (CYCLE_FRAMES - WALK_FRAMES);
            let body_w = (width / 10).max(1);
            let body_h = (height / 2).max(1);
            let travel = width.saturating_sub(body_w);
            let x0 = (travel as u64 * step / WALK_FRAMES.max(1)) as u32;
            let y0 = height.saturating_sub(body_h) / 2;
            for y in y0..(y0 + body_h).min(height) {
                for x in x0..(x0 + body_w).min(width) {
                    image.put_pixel(x, y, Rgb([220, 190, 170]));
                }
            }
        }
        image
    }
}

impl FrameSource for SyntheticSource {
    fn location(&self) -> &str {
        &self.config.url
    }

    /// Synthetic sources are always available.
    fn open(&mut self) -> Result<(), SourceError> {
        self.open = true;
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.config.url,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, SourceError> {
        if !self.open {
            return Err(SourceError::DeviceUnavailable(format!(
                "{} is not open",
                self.config.url
            )));
        }
        if self
            .config
            .frame_limit
            .is_some_and(|limit| self.frame_count >= limit)
        {
            return Err(SourceError::Exhausted);
        }

        self.reads += 1;
        if self
            .config
            .fail_every
            .is_some_and(|n| n > 1 && self.reads % n == 0)
        {
            self.failures += 1;
            return Err(SourceError::Transient(format!(
                "synthetic dropout on read {}",
                self.reads
            )));
        }

        self.frame_count += 1;
        let image = self.render(self.frame_count);
        Ok(Frame::new(image, self.frame_count))
    }

    fn close(&mut self) {
        if self.open {
            log::info!("SyntheticSource: closed {}", self.config.url);
        }
        self.open = false;
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            read_failures: self.failures,
        }
    }
}
