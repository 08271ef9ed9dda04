use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use image::RgbImage;

use human_sentinel::config::CaptureSettings;
use human_sentinel::dispatch::{AlertDispatch, Event};
use human_sentinel::{AlertDevice, AlertError, CaptureStore, SideEffectDispatcher, Tone};

struct SlowFailingAlert {
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl AlertDevice for SlowFailingAlert {
    fn name(&self) -> &'static str {
        "slow-failing"
    }

    fn play(&self, _tone: Tone) -> Result<(), AlertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        Err(AlertError::Playback("speaker on fire".into()))
    }
}

fn dispatcher(dir: &std::path::Path, alert: Option<Arc<dyn AlertDevice>>) -> SideEffectDispatcher {
    SideEffectDispatcher::new(
        CaptureStore::new(&CaptureSettings {
            directory: dir.to_path_buf(),
            ..CaptureSettings::default()
        }),
        alert,
        Tone::new(1200, 700),
    )
}

#[test]
fn capture_exists_when_dispatch_returns() {
    let root = tempfile::tempdir().expect("tempdir");
    let capture_dir = root.path().join("human_captures");
    let dispatcher = dispatcher(&capture_dir, None);

    let outcome = dispatcher.dispatch(Event {
        fired_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        snapshot: RgbImage::new(64, 48),
        regions: vec![],
        frame_sequence: 1,
    });

    let expected = capture_dir.join("human_20240101_000000.jpg");
    let artifact = outcome.artifact.expect("artifact");
    assert_eq!(artifact.path, expected);
    let metadata = std::fs::metadata(&expected).expect("capture file");
    assert!(metadata.len() > 0);
}

#[test]
fn slow_failing_alert_does_not_block_dispatch() {
    let root = tempfile::tempdir().expect("tempdir");
    let calls = Arc::new(AtomicUsize::new(0));
    let alert = SlowFailingAlert {
        delay: Duration::from_secs(2),
        calls: Arc::clone(&calls),
    };
    let dispatcher = dispatcher(root.path(), Some(Arc::new(alert)));

    let started = Instant::now();
    let outcome = dispatcher.dispatch(Event {
        fired_at: Utc::now(),
        snapshot: RgbImage::new(64, 48),
        regions: vec![],
        frame_sequence: 7,
    });
    let elapsed = started.elapsed();

    assert!(outcome.artifact.is_some());
    assert_eq!(outcome.alert, AlertDispatch::Spawned);
    assert!(
        elapsed < Duration::from_secs(1),
        "dispatch waited on the alert: {:?}",
        elapsed
    );

    let deadline = Instant::now() + Duration::from_secs(5);
    while calls.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
