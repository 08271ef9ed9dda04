//! sentineld - human presence sentinel daemon
//!
//! This daemon:
//! 1. Opens the configured frame source (synthetic, image directory, V4L2)
//! 2. Runs the selected detector backend on every resized frame
//! 3. Debounces the presence signal with a leading-edge cooldown
//! 4. Saves an annotated snapshot and plays a tone for each fired event
//! 5. Stops cleanly on Ctrl-C, source exhaustion or a frame budget

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use human_sentinel::{
    open_alert_device, open_source, BackendRegistry, CaptureStore, LoopSettings, ProcessingLoop,
    SentinelConfig, ShutdownSignal, SideEffectDispatcher,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON config file.
    #[arg(long, env = "SENTINEL_CONFIG")]
    config: Option<PathBuf>,
    /// Frame source: stub://name, /dev/videoN or an image directory.
    #[arg(long)]
    source: Option<String>,
    /// Detector backend name.
    #[arg(long)]
    backend: Option<String>,
    /// Directory for saved snapshots.
    #[arg(long)]
    capture_dir: Option<PathBuf>,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// Disable the audible alert.
    #[arg(long)]
    no_alert: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = SentinelConfig::load_from(args.config.as_deref())?;
    if let Some(source) = args.source {
        cfg.source.url = source;
    }
    if let Some(backend) = args.backend {
        cfg.detector.backend = backend;
    }
    if let Some(dir) = args.capture_dir {
        cfg.capture.directory = dir;
    }
    if args.no_alert {
        cfg.alert.enabled = false;
    }
    cfg.validate()?;

    let source = open_source(&cfg.source)?;
    let registry = BackendRegistry::builtin(&cfg.detector)?;
    log::info!("available detector backends: {}", registry.list().join(", "));
    let detector = registry.select(Some(&cfg.detector.backend))?;

    let alert = open_alert_device(&cfg.alert);
    if let Some(device) = &alert {
        log::info!(
            "alert device {} ({} Hz, {:?})",
            device.name(),
            cfg.alert.tone_hz,
            cfg.alert.tone().duration
        );
    }
    let dispatcher =
        SideEffectDispatcher::new(CaptureStore::new(&cfg.capture), alert, cfg.alert.tone());

    let shutdown = ShutdownSignal::new();
    let handler_signal = shutdown.clone();
    ctrlc::set_handler(move || {
        handler_signal.request();
    })
    .expect("error setting Ctrl-C handler");

    let mut settings = LoopSettings::from_config(&cfg);
    settings.max_frames = args.max_frames;

    log::info!(
        "sentineld running. captures go to {}",
        cfg.capture.directory.display()
    );
    log::info!("human detection active, press Ctrl-C to quit");

    let mut pipeline =
        ProcessingLoop::new(source, detector, dispatcher, settings).with_shutdown(shutdown);
    let summary = pipeline
        .run()
        .with_context(|| format!("cannot start on {}", cfg.source.url))?;

    log::info!(
        "stopped ({:?}): frames={} events={} saved={} save_failures={} detector_failures={} read_failures={}",
        summary.stop_reason,
        summary.frames_processed,
        summary.events_fired,
        summary.artifacts_written,
        summary.persistence_failures,
        summary.detector_failures,
        summary.transient_failures
    );
    Ok(())
}
