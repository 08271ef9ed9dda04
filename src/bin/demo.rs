//! demo - end-to-end synthetic run for the human sentinel
//!
//! Drives the synthetic walker scene through the motion backend with a
//! simulated clock, so a few hundred frames cover several cooldown windows
//! in well under a second of wall time.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clap::Parser;
use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use human_sentinel::{
    open_alert_device, AlertSettings, BackendRegistry, CaptureSettings, CaptureStore, Clock,
    DetectorSettings, LoopSettings, ProcessingLoop, SideEffectDispatcher, SourceSettings,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Duration in seconds of simulated footage.
    #[arg(long, default_value_t = 30)]
    seconds: u64,
    /// Frames per second for the synthetic source.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Cooldown between events, in seconds.
    #[arg(long, default_value_t = 3)]
    cooldown_secs: u64,
    /// Output directory for captures.
    #[arg(long, default_value = "demo_out")]
    out: String,
    /// Play the alert tone for each event.
    #[arg(long)]
    alert: bool,
}

/// Advances by one frame interval on every read.
struct SimulatedClock {
    start: DateTime<Utc>,
    step: ChronoDuration,
    ticks: Cell<i32>,
}

impl Clock for SimulatedClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.get();
        self.ticks.set(tick + 1);
        self.start + self.step * tick
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if args.fps == 0 {
        return Err(anyhow!("fps must be >= 1"));
    }

    let out_dir = PathBuf::from(&args.out);
    fs::create_dir_all(&out_dir)?;
    let total_frames = args.seconds.saturating_mul(args.fps as u64);

    stage("open synthetic source + motion backend");
    let source = human_sentinel::open_source(&SourceSettings {
        url: format!("stub://demo?frames={}&size=800x600", total_frames),
        target_fps: args.fps,
        retry_delay: Duration::ZERO,
    })?;
    let detector = BackendRegistry::builtin(&DetectorSettings::default())?.select(Some("motion"))?;

    let alert_settings = AlertSettings {
        enabled: args.alert,
        ..AlertSettings::default()
    };
    let dispatcher = SideEffectDispatcher::new(
        CaptureStore::new(&CaptureSettings {
            directory: out_dir.clone(),
            ..CaptureSettings::default()
        }),
        open_alert_device(&alert_settings),
        alert_settings.tone(),
    );

    let clock = SimulatedClock {
        start: Utc::now(),
        step: ChronoDuration::milliseconds(1000 / i64::from(args.fps)),
        ticks: Cell::new(0),
    };

    stage("run processing loop");
    let mut pipeline = ProcessingLoop::new(
        source,
        detector,
        dispatcher,
        LoopSettings {
            cooldown: Duration::from_secs(args.cooldown_secs),
            retry_delay: Duration::ZERO,
            ..LoopSettings::default()
        },
    )
    .with_clock(Box::new(clock));
    let summary = pipeline.run()?;

    stage("summary");
    println!("frames processed: {}", summary.frames_processed);
    println!("events fired:     {}", summary.events_fired);
    println!("snapshots saved:  {}", summary.artifacts_written);
    let mut saved: Vec<_> = fs::read_dir(&out_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "jpg"))
        .collect();
    saved.sort();
    for path in saved {
        println!("  {}", path.display());
    }
    if args.alert {
        // Give detached alert workers a chance to finish the last tone.
        std::thread::sleep(alert_settings.tone().duration);
    }
    Ok(())
}

fn stage(msg: &str) {
    eprintln!("demo: {}", msg);
}
