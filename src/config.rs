use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatch::Tone;

const DEFAULT_SOURCE_URL: &str = "stub://camera";
const DEFAULT_TARGET_FPS: u32 = 10;
const DEFAULT_RETRY_DELAY_MS: u64 = 50;
const DEFAULT_BACKEND: &str = "motion";
const DEFAULT_COOLDOWN_SECS: u64 = 3;
const DEFAULT_CAPTURE_DIR: &str = "human_captures";
const DEFAULT_JPEG_QUALITY: u8 = 90;
const DEFAULT_FRAME_WIDTH: u32 = 640;
const DEFAULT_TONE_HZ: u32 = 1200;
const DEFAULT_TONE_DURATION_MS: u64 = 700;

#[derive(Debug, Deserialize, Default)]
struct SentinelConfigFile {
    source: Option<SourceConfigFile>,
    detector: Option<DetectorConfigFile>,
    debounce: Option<DebounceConfigFile>,
    capture: Option<CaptureConfigFile>,
    frame: Option<FrameConfigFile>,
    alert: Option<AlertConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    retry_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    min_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct DebounceConfigFile {
    cooldown_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    directory: Option<PathBuf>,
    jpeg_quality: Option<u8>,
    local_time: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct FrameConfigFile {
    width: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertConfigFile {
    enabled: Option<bool>,
    tone_hz: Option<u32>,
    tone_duration_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SentinelConfig {
    pub source: SourceSettings,
    pub detector: DetectorSettings,
    /// Minimum spacing between fired events.
    pub cooldown: Duration,
    pub capture: CaptureSettings,
    /// Frames are resized to this width before detection.
    pub frame_width: u32,
    pub alert: AlertSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub url: String,
    pub target_fps: u32,
    /// Pause after a transient read failure.
    pub retry_delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub min_confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    pub directory: PathBuf,
    pub jpeg_quality: u8,
    /// Name files by local time instead of UTC.
    pub local_time: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSettings {
    pub enabled: bool,
    pub tone_hz: u32,
    pub tone_duration_ms: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            target_fps: DEFAULT_TARGET_FPS,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            model_path: None,
            min_confidence: 0.0,
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_CAPTURE_DIR),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            local_time: false,
        }
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tone_hz: DEFAULT_TONE_HZ,
            tone_duration_ms: DEFAULT_TONE_DURATION_MS,
        }
    }
}

impl AlertSettings {
    pub fn tone(&self) -> Tone {
        Tone::new(self.tone_hz, self.tone_duration_ms)
    }
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            source: SourceSettings::default(),
            detector: DetectorSettings::default(),
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
            capture: CaptureSettings::default(),
            frame_width: DEFAULT_FRAME_WIDTH,
            alert: AlertSettings::default(),
        }
    }
}

impl SentinelConfig {
    /// Load from the file named by `SENTINEL_CONFIG` (if any), then apply
    /// environment overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SENTINEL_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Like `load`, but with an explicit config file path.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => SentinelConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentinelConfigFile) -> Self {
        let source = file.source.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let capture = file.capture.unwrap_or_default();
        let alert = file.alert.unwrap_or_default();

        Self {
            source: SourceSettings {
                url: source.url.unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
                target_fps: source.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
                retry_delay: Duration::from_millis(
                    source.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS),
                ),
            },
            detector: DetectorSettings {
                backend: detector
                    .backend
                    .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
                model_path: detector.model_path,
                min_confidence: detector.min_confidence.unwrap_or(0.0),
            },
            cooldown: Duration::from_secs(
                file.debounce
                    .and_then(|debounce| debounce.cooldown_secs)
                    .unwrap_or(DEFAULT_COOLDOWN_SECS),
            ),
            capture: CaptureSettings {
                directory: capture
                    .directory
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CAPTURE_DIR)),
                jpeg_quality: capture.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY),
                local_time: capture.local_time.unwrap_or(false),
            },
            frame_width: file
                .frame
                .and_then(|frame| frame.width)
                .unwrap_or(DEFAULT_FRAME_WIDTH),
            alert: AlertSettings {
                enabled: alert.enabled.unwrap_or(true),
                tone_hz: alert.tone_hz.unwrap_or(DEFAULT_TONE_HZ),
                tone_duration_ms: alert.tone_duration_ms.unwrap_or(DEFAULT_TONE_DURATION_MS),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(url) = env_string("SENTINEL_SOURCE_URL") {
            self.source.url = url;
        }
        if let Some(backend) = env_string("SENTINEL_BACKEND") {
            self.detector.backend = backend;
        }
        if let Some(path) = env_string("SENTINEL_MODEL_PATH") {
            self.detector.model_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = env_string("SENTINEL_CAPTURE_DIR") {
            self.capture.directory = PathBuf::from(dir);
        }
        if let Some(secs) = env_parse::<u64>("SENTINEL_COOLDOWN_SECS", "an integer number of seconds")? {
            self.cooldown = Duration::from_secs(secs);
        }
        if let Some(width) = env_parse::<u32>("SENTINEL_FRAME_WIDTH", "an integer pixel width")? {
            self.frame_width = width;
        }
        if let Some(hz) = env_parse::<u32>("SENTINEL_TONE_HZ", "an integer frequency in Hz")? {
            self.alert.tone_hz = hz;
        }
        if let Some(ms) =
            env_parse::<u64>("SENTINEL_TONE_DURATION_MS", "an integer number of milliseconds")?
        {
            self.alert.tone_duration_ms = ms;
        }
        if let Some(alerts) = env_string("SENTINEL_ALERTS") {
            self.alert.enabled = parse_switch(&alerts)
                .ok_or_else(|| anyhow!("SENTINEL_ALERTS must be on/off, got '{}'", alerts))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.url.trim().is_empty() {
            return Err(anyhow!("source url must not be empty"));
        }
        if self.detector.backend.trim().is_empty() {
            return Err(anyhow!("detector backend must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.detector.min_confidence) {
            return Err(anyhow!("min_confidence must be within 0..=1"));
        }
        if self.capture.directory.as_os_str().is_empty() {
            return Err(anyhow!("capture directory must not be empty"));
        }
        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(anyhow!("jpeg_quality must be within 1..=100"));
        }
        if self.frame_width == 0 {
            return Err(anyhow!("frame width must be greater than zero"));
        }
        if self.alert.tone_hz == 0 {
            return Err(anyhow!("tone_hz must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SentinelConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, expected: &str) -> Result<Option<T>> {
    match env_string(key) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be {}", key, expected)),
        None => Ok(None),
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
