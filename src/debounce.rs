//! Leading-edge rate limiting of detection events.
//!
//! The first frame that reports a human fires immediately. Every later
//! present frame is silenced until strictly more than `cooldown` has elapsed
//! since the last fire. The window is measured from the last *fire*, not the
//! last detection, so a person standing in view re-fires once per cooldown.
//!
//! Timestamps must not go backwards from one call to the next. A call whose
//! `now` is earlier than any timestamp seen before never fires and leaves the
//! state untouched. Absent frames move only the seen-time watermark; the fire
//! time is changed by fires alone.
//!
//! `evaluate` has no effects besides mutating the `DebounceState` it is
//! handed, which is owned by the processing loop.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Debounce bookkeeping. One instance per processing loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebounceState {
    last_fired_at: Option<DateTime<Utc>>,
    /// Latest timestamp passed to `evaluate`.
    last_seen: Option<DateTime<Utc>>,
    cooldown: Duration,
}

impl DebounceState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_fired_at: None,
            last_seen: None,
            cooldown,
        }
    }

    pub fn last_fired_at(&self) -> Option<DateTime<Utc>> {
        self.last_fired_at
    }

    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

/// Outcome of evaluating one frame's presence signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FireDecision {
    Fire,
    NoFire(NoFireReason),
}

impl FireDecision {
    pub fn is_fire(self) -> bool {
        matches!(self, FireDecision::Fire)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoFireReason {
    /// Nothing detected in this frame.
    Absent,
    /// Detected, but the last fire is still within the cooldown window.
    Cooldown,
    /// `now` is earlier than a previously seen timestamp. Never fire on a
    /// regressed clock.
    ClockRegressed,
}

/// Decide whether this frame fires a new event.
pub fn evaluate(present: bool, now: DateTime<Utc>, state: &mut DebounceState) -> FireDecision {
    if state.last_seen.is_some_and(|seen| now < seen) {
        return FireDecision::NoFire(NoFireReason::ClockRegressed);
    }
    state.last_seen = Some(now);

    if !present {
        return FireDecision::NoFire(NoFireReason::Absent);
    }

    let Some(last) = state.last_fired_at else {
        state.last_fired_at = Some(now);
        return FireDecision::Fire;
    };

    // last_seen >= last_fired_at, so the delta is never negative here.
    match now.signed_duration_since(last).to_std() {
        Ok(elapsed) if elapsed > state.cooldown => {
            state.last_fired_at = Some(now);
            FireDecision::Fire
        }
        Ok(_) => FireDecision::NoFire(NoFireReason::Cooldown),
        Err(_) => FireDecision::NoFire(NoFireReason::ClockRegressed),
    }
}
