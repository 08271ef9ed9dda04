use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use human_sentinel::config::SentinelConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SENTINEL_CONFIG",
        "SENTINEL_SOURCE_URL",
        "SENTINEL_BACKEND",
        "SENTINEL_MODEL_PATH",
        "SENTINEL_COOLDOWN_SECS",
        "SENTINEL_CAPTURE_DIR",
        "SENTINEL_FRAME_WIDTH",
        "SENTINEL_TONE_HZ",
        "SENTINEL_TONE_DURATION_MS",
        "SENTINEL_ALERTS",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = SentinelConfig::load().expect("load defaults");

    assert_eq!(cfg.source.url, "stub://camera");
    assert_eq!(cfg.detector.backend, "motion");
    assert_eq!(cfg.cooldown, Duration::from_secs(3));
    assert_eq!(cfg.capture.directory, PathBuf::from("human_captures"));
    assert_eq!(cfg.frame_width, 640);
    assert!(cfg.alert.enabled);
    assert_eq!(cfg.alert.tone_hz, 1200);
    assert_eq!(cfg.alert.tone_duration_ms, 700);
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"{
            "source": { "url": "/srv/footage", "target_fps": 15, "retry_delay_ms": 10 },
            "detector": { "backend": "motion", "min_confidence": 0.25 },
            "debounce": { "cooldown_secs": 5 },
            "capture": { "directory": "/var/lib/sentinel", "jpeg_quality": 80, "local_time": true },
            "frame": { "width": 320 },
            "alert": { "enabled": true, "tone_hz": 880 }
        }"#,
    );

    std::env::set_var("SENTINEL_CONFIG", file.path());
    std::env::set_var("SENTINEL_COOLDOWN_SECS", "10");
    std::env::set_var("SENTINEL_CAPTURE_DIR", "/tmp/captures");
    std::env::set_var("SENTINEL_ALERTS", "off");

    let cfg = SentinelConfig::load().expect("load config");

    assert_eq!(cfg.source.url, "/srv/footage");
    assert_eq!(cfg.source.target_fps, 15);
    assert_eq!(cfg.source.retry_delay, Duration::from_millis(10));
    assert_eq!(cfg.detector.min_confidence, 0.25);
    assert_eq!(cfg.cooldown, Duration::from_secs(10));
    assert_eq!(cfg.capture.directory, PathBuf::from("/tmp/captures"));
    assert_eq!(cfg.capture.jpeg_quality, 80);
    assert!(cfg.capture.local_time);
    assert_eq!(cfg.frame_width, 320);
    assert!(!cfg.alert.enabled);
    assert_eq!(cfg.alert.tone_hz, 880);
    assert_eq!(cfg.alert.tone_duration_ms, 700);

    clear_env();
}

#[test]
fn explicit_path_wins_over_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(r#"{ "frame": { "width": 1024 } }"#);
    std::env::set_var("SENTINEL_CONFIG", "/nonexistent/sentinel.json");

    let cfg = SentinelConfig::load_from(Some(file.path())).expect("load config");
    assert_eq!(cfg.frame_width, 1024);

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(r#"{ "frame": { "width": 0 } }"#);
    std::env::set_var("SENTINEL_CONFIG", file.path());
    assert!(SentinelConfig::load().is_err());

    clear_env();
    std::env::set_var("SENTINEL_COOLDOWN_SECS", "soon");
    let err = SentinelConfig::load().expect_err("non-numeric cooldown");
    assert!(err.to_string().contains("SENTINEL_COOLDOWN_SECS"));

    clear_env();
    std::env::set_var("SENTINEL_ALERTS", "loud");
    assert!(SentinelConfig::load().is_err());

    clear_env();
    let file = write_config("{ not json");
    std::env::set_var("SENTINEL_CONFIG", file.path());
    assert!(SentinelConfig::load().is_err());

    clear_env();
}
