//! Audible alert devices.
//!
//! Devices are driven from a detached worker thread, one per fired event, so
//! `play` is free to block for the whole tone duration.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AlertSettings;
use crate::error::AlertError;

/// Tone parameters. Copied into each alert worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tone {
    pub hz: u32,
    pub duration: Duration,
}

impl Tone {
    pub fn new(hz: u32, duration_ms: u64) -> Self {
        Self {
            hz,
            duration: Duration::from_millis(duration_ms),
        }
    }
}

/// Something that can beep.
pub trait AlertDevice: Send + Sync {
    fn name(&self) -> &'static str;

    fn play(&self, tone: Tone) -> Result<(), AlertError>;
}

/// ASCII BEL on stderr. The terminal decides pitch and length.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalBell;

impl AlertDevice for TerminalBell {
    fn name(&self) -> &'static str {
        "bell"
    }

    fn play(&self, _tone: Tone) -> Result<(), AlertError> {
        let mut stderr = std::io::stderr().lock();
        stderr
            .write_all(b"\x07")
            .and_then(|_| stderr.flush())
            .map_err(|e| AlertError::Playback(e.to_string()))
    }
}

/// Sine tone on the default audio output.
///
/// `rodio::OutputStream` is not `Send`, so each `play` opens its own stream
/// on the calling (worker) thread.
#[cfg(feature = "alert-rodio")]
#[derive(Clone, Copy, Debug)]
pub struct RodioTone;

#[cfg(feature = "alert-rodio")]
impl RodioTone {
    /// Check once that an output device exists.
    pub fn probe() -> Result<Self, AlertError> {
        rodio::OutputStream::try_default()
            .map(|_| RodioTone)
            .map_err(|e| AlertError::DeviceUnavailable(e.to_string()))
    }
}

#[cfg(feature = "alert-rodio")]
impl AlertDevice for RodioTone {
    fn name(&self) -> &'static str {
        "rodio"
    }

    fn play(&self, tone: Tone) -> Result<(), AlertError> {
        use rodio::source::{SineWave, Source};

        let (_stream, handle) = rodio::OutputStream::try_default()
            .map_err(|e| AlertError::DeviceUnavailable(e.to_string()))?;
        let sink =
            rodio::Sink::try_new(&handle).map_err(|e| AlertError::Playback(e.to_string()))?;
        sink.append(
            SineWave::new(tone.hz as f32)
                .take_duration(tone.duration)
                .amplify(0.25),
        );
        sink.sleep_until_end();
        Ok(())
    }
}

/// Open the configured alert device.
///
/// Returns `None` when alerts are switched off or no device can be opened;
/// an unavailable device degrades to "alerts disabled" rather than failing
/// startup.
pub fn open_alert_device(settings: &AlertSettings) -> Option<Arc<dyn AlertDevice>> {
    if !settings.enabled {
        log::info!("alerts disabled by configuration");
        return None;
    }

    #[cfg(feature = "alert-rodio")]
    {
        match RodioTone::probe() {
            Ok(device) => return Some(Arc::new(device)),
            Err(e) => log::warn!("audio output unavailable ({}), using terminal bell", e),
        }
    }

    Some(Arc::new(TerminalBell))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_from_millis() {
        let tone = Tone::new(1200, 700);
        assert_eq!(tone.hz, 1200);
        assert_eq!(tone.duration, Duration::from_millis(700));
    }

    #[test]
    fn disabled_settings_yield_no_device() {
        let settings = AlertSettings {
            enabled: false,
            ..AlertSettings::default()
        };
        assert!(open_alert_device(&settings).is_none());
    }

    #[test]
    fn enabled_settings_yield_a_device() {
        let device = open_alert_device(&AlertSettings::default()).expect("alert device");
        assert!(["bell", "rodio"].contains(&device.name()));
    }
}
