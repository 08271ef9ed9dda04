use chrono::{DateTime, Utc};

/// Timestamp source for the processing loop.
///
/// Wall-clock time can step backwards (NTP, manual adjustment). The debouncer
/// tolerates that by refusing to fire, so implementations do not need to
/// enforce monotonicity themselves.
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}

/// System wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
