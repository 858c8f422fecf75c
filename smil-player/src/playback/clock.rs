//! Wallclock sources
//!
//! The interpreter reads local wallclock time through [`Clock`] so tests can
//! run against tokio's paused virtual time.

use chrono::NaiveDateTime;

/// Local wallclock source
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Host local time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        smil_common::time::local_now()
    }
}

/// Wallclock that starts at a fixed instant and advances with tokio time
///
/// Under `tokio::time::pause` this makes wallclock windows deterministic.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    anchor: NaiveDateTime,
    started: tokio::time::Instant,
}

impl TokioClock {
    pub fn new(anchor: NaiveDateTime) -> Self {
        Self {
            anchor,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = chrono::Duration::from_std(self.started.elapsed()).unwrap_or_else(|_| chrono::Duration::zero());
        self.anchor + elapsed
    }
}
