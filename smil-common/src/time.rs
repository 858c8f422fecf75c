//! Timestamp utilities

use chrono::{Local, NaiveDateTime};

/// Current local wallclock, the reference frame of all `wallclock(...)` values
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}
