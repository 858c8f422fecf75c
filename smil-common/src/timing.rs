//! Time expressions and the time-window resolver
//!
//! Every scheduling node may carry a `begin` and an `end` attribute. This module
//! parses those attribute strings into [`TimeExpr`] values and resolves a pair of
//! them against "now" into a [`TimeWindow`]: how long to wait before the node
//! may start, and when (if ever) its activation window closes.
//!
//! # Supported forms
//!
//! | Form | Example | Meaning |
//! |------|---------|---------|
//! | clock value | `0`, `5s`, `250ms`, `2min`, `1h`, `00:01:30` | offset from activation |
//! | absolute wallclock | `wallclock(2020-07-16T12:00)` | fixed local instant |
//! | daily recurrence | `wallclock(R/2011-01-01T07:00:00/P1D)` | every day at 07:00 |
//! | weekday recurrence | `wallclock(R/2011-01-01+w3T07:00:00/P1D)` | every Wednesday at 07:00 |
//! | trigger | `trigger3` | started externally, never by the playlist |
//!
//! All wallclock values are naive local times. Resolution is pure: the same
//! `(begin, end, now)` always yields the same window.
//!
//! # Examples
//!
//! ```rust
//! use chrono::NaiveDate;
//! use smil_common::timing::{resolve, TimeExpr, WindowEnd};
//!
//! let now = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap().and_hms_opt(12, 0, 0).unwrap();
//! let begin: TimeExpr = "wallclock(R/2011-01-01T13:00:00/P1D)".parse().unwrap();
//! let end: TimeExpr = "wallclock(R/2011-01-01T18:00:00/P1D)".parse().unwrap();
//!
//! let window = resolve(Some(&begin), Some(&end), now);
//! assert_eq!(window.wait.as_secs(), 3600);
//! assert_eq!(
//!     window.end,
//!     WindowEnd::At(NaiveDate::from_ymd_opt(2024, 5, 15).unwrap().and_hms_opt(18, 0, 0).unwrap())
//! );
//! ```

use crate::{Error, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Sleep injected when a sequential array has no playable child (20 s)
pub const DEFAULT_AWAIT: Duration = Duration::from_millis(20_000);

/// Display time used when a timed media item has no usable `dur`
pub const DEFAULT_DURATION: Duration = Duration::from_secs(5);

/// Display time used for `dur="indefinite"`
pub const INFINITE_DURATION: Duration = Duration::from_secs(999_999);

/// Document staleness check interval when the document does not specify one
pub const DEFAULT_REFRESH_SECONDS: u64 = 20;

/// Delay between failed document loads
pub const DEFAULT_DOWNLOAD_RETRY: Duration = Duration::from_secs(60);

/// Countdown granularity and flag polling interval
pub const TICK: Duration = Duration::from_secs(1);

const DAY_SECONDS: i64 = 86_400;

// ============================================================================
// Time expressions
// ============================================================================

/// Direction of a `+wN` / `-wN` weekday qualifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekdayDirection {
    After,
    Before,
}

/// Weekday qualifier of a recurring wallclock value
///
/// `day` is the target weekday, 0 = Sunday through 6 = Saturday. Larger values
/// are reduced modulo 7 when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayRule {
    pub direction: WeekdayDirection,
    pub day: u32,
}

/// Parsed `begin` / `end` attribute value
///
/// Serialized as its attribute text, so documents round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeExpr {
    /// Offset from the moment the node is activated
    Offset(Duration),

    /// Fixed local instant
    Wallclock(NaiveDateTime),

    /// Daily recurrence anchored at `anchor`'s time of day
    Recurring {
        anchor: NaiveDateTime,
        weekday: Option<WeekdayRule>,
    },

    /// External trigger identifier
    Trigger(String),
}

impl TimeExpr {
    /// True for absolute and recurring wallclock values
    pub fn is_wallclock(&self) -> bool {
        matches!(self, TimeExpr::Wallclock(_) | TimeExpr::Recurring { .. })
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self, TimeExpr::Trigger(_))
    }
}

impl FromStr for TimeExpr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidTime("empty time expression".to_string()));
        }

        if s.starts_with("trigger") {
            return Ok(TimeExpr::Trigger(s.to_string()));
        }

        if let Some(inner) = s
            .strip_prefix("wallclock(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let inner = inner.trim();
            if let Some(rest) = inner.strip_prefix("R/") {
                let mut parts = rest.split('/');
                let anchor = parts.next().unwrap_or_default();
                let period = parts.next().unwrap_or("P1D");
                if period != "P1D" {
                    return Err(Error::InvalidTime(format!(
                        "unsupported recurrence period '{}' in '{}'",
                        period, s
                    )));
                }
                let (anchor, weekday) = parse_weekday_anchor(anchor)?;
                return Ok(TimeExpr::Recurring { anchor, weekday });
            }
            return parse_datetime(inner).map(TimeExpr::Wallclock);
        }

        parse_clock_value(s)
            .map(TimeExpr::Offset)
            .ok_or_else(|| Error::InvalidTime(s.to_string()))
    }
}

impl TryFrom<String> for TimeExpr {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimeExpr> for String {
    fn from(expr: TimeExpr) -> Self {
        expr.to_string()
    }
}

impl fmt::Display for TimeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeExpr::Offset(d) => write!(f, "{}ms", d.as_millis()),
            TimeExpr::Wallclock(t) => write!(f, "wallclock({})", t.format("%Y-%m-%dT%H:%M:%S")),
            TimeExpr::Recurring { anchor, weekday } => {
                let qualifier = match weekday {
                    Some(WeekdayRule { direction: WeekdayDirection::After, day }) => format!("+w{}", day),
                    Some(WeekdayRule { direction: WeekdayDirection::Before, day }) => format!("-w{}", day),
                    None => String::new(),
                };
                write!(
                    f,
                    "wallclock(R/{}{}T{}/P1D)",
                    anchor.format("%Y-%m-%d"),
                    qualifier,
                    anchor.format("%H:%M:%S")
                )
            }
            TimeExpr::Trigger(id) => write!(f, "{}", id),
        }
    }
}

/// Parse a local date-time, accepting optional seconds or a bare date
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim().trim_end_matches('Z');
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(parsed);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| Error::InvalidTime(format!("unparseable date-time '{}'", s)))
}

/// Split `2011-01-01+w3T07:00:00` into the anchor and its weekday qualifier
fn parse_weekday_anchor(s: &str) -> Result<(NaiveDateTime, Option<WeekdayRule>)> {
    let marker = s
        .find("+w")
        .map(|idx| (idx, WeekdayDirection::After))
        .or_else(|| s.find("-w").map(|idx| (idx, WeekdayDirection::Before)));

    let Some((idx, direction)) = marker else {
        return Ok((parse_datetime(s)?, None));
    };

    let after_marker = &s[idx + 2..];
    let digits_len = after_marker
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_marker.len());
    let day: u32 = after_marker[..digits_len]
        .parse()
        .map_err(|_| Error::InvalidTime(format!("missing weekday number in '{}'", s)))?;

    let rebuilt = format!("{}{}", &s[..idx], &after_marker[digits_len..]);
    let anchor = parse_datetime(&rebuilt)?;
    Ok((anchor, Some(WeekdayRule { direction, day: day % 7 })))
}

/// Parse a SMIL clock value (`5`, `5s`, `1.5s`, `250ms`, `2min`, `1h`, `01:30`, `00:01:30`)
pub fn parse_clock_value(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.contains(':') {
        let mut seconds = 0f64;
        for part in s.split(':') {
            let value: f64 = part.parse().ok()?;
            seconds = seconds * 60.0 + value;
        }
        return seconds_to_duration(seconds);
    }

    let (number, scale) = if let Some(n) = s.strip_suffix("ms") {
        (n, 0.001)
    } else if let Some(n) = s.strip_suffix("min") {
        (n, 60.0)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600.0)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1.0)
    } else {
        (s, 1.0)
    };
    let value: f64 = number.trim().parse().ok()?;
    seconds_to_duration(value * scale)
}

fn seconds_to_duration(seconds: f64) -> Option<Duration> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    // saturate values past what Duration can hold
    Some(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX))
}

/// Resolve a media `dur` attribute into a display time
///
/// Missing, unparseable or zero values fall back to [`DEFAULT_DURATION`];
/// `indefinite` maps to [`INFINITE_DURATION`]. Values with a leading integer
/// but a trailing suffix we do not understand keep the integer as seconds.
/// Anything longer than [`INFINITE_DURATION`] is capped to it.
pub fn media_duration(dur: Option<&str>) -> Duration {
    let Some(raw) = dur.map(str::trim) else {
        return DEFAULT_DURATION;
    };
    if raw == "indefinite" {
        return INFINITE_DURATION;
    }

    let parsed = parse_clock_value(raw).or_else(|| {
        let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse::<u64>().ok().map(Duration::from_secs)
    });

    match parsed {
        Some(d) if !d.is_zero() => d.min(INFINITE_DURATION),
        _ => DEFAULT_DURATION,
    }
}

// ============================================================================
// Time windows
// ============================================================================

/// End of a resolved activation window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEnd {
    /// Window closes at this local instant
    At(NaiveDateTime),
    /// Window never closes
    Never,
    /// Window is already over; the node must not play this cycle
    NeverPlay,
}

/// Result of resolving a node's `begin`/`end` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// How long to wait before the node may start (never negative)
    pub wait: Duration,
    /// When the window closes
    pub end: WindowEnd,
}

impl TimeWindow {
    /// Start now, never close
    pub fn immediate() -> Self {
        Self {
            wait: Duration::ZERO,
            end: WindowEnd::Never,
        }
    }

    /// False when the window is already over at `now`
    pub fn is_playable(&self, now: NaiveDateTime) -> bool {
        match self.end {
            WindowEnd::NeverPlay => false,
            WindowEnd::Never => true,
            WindowEnd::At(end) => end > now,
        }
    }

    /// True when the node could start right now
    pub fn is_open(&self, now: NaiveDateTime) -> bool {
        self.wait.is_zero() && self.is_playable(now)
    }

    /// Closing instant, if the window has one
    pub fn end_instant(&self) -> Option<NaiveDateTime> {
        match self.end {
            WindowEnd::At(end) => Some(end),
            _ => None,
        }
    }
}

/// Resolve a `(begin, end)` pair against `now`
///
/// * no begin: start immediately
/// * offset begin: start after the offset
/// * trigger begin: start immediately, never close (the trigger controls lifetime)
/// * absolute wallclock: wait until the instant; `NeverPlay` once the end has passed
/// * recurring wallclock: next daily (or weekly, with `±wN`) occurrence whose
///   window has not closed yet
///
/// Any window whose end does not lie after its start resolves to
/// [`WindowEnd::NeverPlay`].
pub fn resolve(begin: Option<&TimeExpr>, end: Option<&TimeExpr>, now: NaiveDateTime) -> TimeWindow {
    let (start, end) = match begin {
        None => (now, resolve_end(end, now)),
        Some(TimeExpr::Trigger(_)) => (now, WindowEnd::Never),
        Some(TimeExpr::Offset(offset)) => match now.checked_add_signed(to_chrono(*offset)) {
            Some(start) => (start, resolve_end(end, start)),
            // past the end of the calendar: wait out the offset, nothing closes
            None => {
                return TimeWindow {
                    wait: *offset,
                    end: WindowEnd::Never,
                }
            }
        },
        Some(TimeExpr::Wallclock(begin)) => (*begin, resolve_end(end, *begin)),
        Some(TimeExpr::Recurring { anchor, weekday }) => resolve_recurring(*anchor, *weekday, end, now),
    };

    let start = start.max(now);
    let end = match end {
        WindowEnd::At(closing) if closing <= start => WindowEnd::NeverPlay,
        other => other,
    };

    TimeWindow {
        wait: (start - now).to_std().unwrap_or(Duration::ZERO),
        end,
    }
}

/// Resolve an `end` attribute relative to the window start
fn resolve_end(end: Option<&TimeExpr>, start: NaiveDateTime) -> WindowEnd {
    match end {
        None | Some(TimeExpr::Trigger(_)) => WindowEnd::Never,
        Some(TimeExpr::Offset(offset)) => start
            .checked_add_signed(to_chrono(*offset))
            .map_or(WindowEnd::Never, WindowEnd::At),
        Some(TimeExpr::Wallclock(at)) => WindowEnd::At(*at),
        Some(TimeExpr::Recurring { anchor, .. }) => WindowEnd::At(next_daily_occurrence(anchor.time(), start)),
    }
}

/// How a recurring window closes
enum RecurringEnd {
    Open,
    Length(chrono::Duration),
    Fixed(WindowEnd),
}

fn recurring_end(anchor: NaiveDateTime, end: Option<&TimeExpr>) -> RecurringEnd {
    match end {
        None | Some(TimeExpr::Trigger(_)) => RecurringEnd::Open,
        Some(TimeExpr::Offset(offset)) => RecurringEnd::Length(to_chrono(*offset)),
        Some(TimeExpr::Wallclock(at)) => RecurringEnd::Fixed(WindowEnd::At(*at)),
        Some(TimeExpr::Recurring { anchor: end_anchor, .. }) => {
            let mut length = *end_anchor - anchor;
            while length <= chrono::Duration::zero() {
                length += chrono::Duration::days(1);
            }
            RecurringEnd::Length(length)
        }
    }
}

fn resolve_recurring(
    anchor: NaiveDateTime,
    weekday: Option<WeekdayRule>,
    end: Option<&TimeExpr>,
    now: NaiveDateTime,
) -> (NaiveDateTime, WindowEnd) {
    let shape = recurring_end(anchor, end);
    let day = chrono::Duration::days(1);

    let start = match weekday {
        None if anchor >= now => anchor,
        None => {
            let today = now.date().and_time(anchor.time());
            match &shape {
                RecurringEnd::Length(length) => [today - day, today, today + day]
                    .into_iter()
                    .find(|candidate| *candidate + *length > now)
                    .unwrap_or(today + day),
                // open windows whose time of day has passed are already running
                RecurringEnd::Open | RecurringEnd::Fixed(_) => today.max(now),
            }
        }
        Some(rule) => {
            let today_weekday = now.date().weekday().num_days_from_sunday();
            let offset = (rule.day % 7 + 7 - today_weekday) % 7;
            let week = chrono::Duration::days(7);
            let candidate = (now.date() + chrono::Duration::days(i64::from(offset))).and_time(anchor.time());
            match &shape {
                RecurringEnd::Length(length) => {
                    if candidate - week + *length > now {
                        candidate - week
                    } else if candidate + *length <= now {
                        candidate + week
                    } else {
                        candidate
                    }
                }
                RecurringEnd::Open | RecurringEnd::Fixed(_) => candidate.max(now),
            }
        }
    };

    let end = match shape {
        RecurringEnd::Open => WindowEnd::Never,
        RecurringEnd::Length(length) => WindowEnd::At(start + length),
        RecurringEnd::Fixed(end) => end,
    };
    (start, end)
}

/// First instant at `time` of day that is not before `from`
fn next_daily_occurrence(time: NaiveTime, from: NaiveDateTime) -> NaiveDateTime {
    let same_day = from.date().and_time(time);
    if same_day >= from {
        same_day
    } else {
        same_day + chrono::Duration::seconds(DAY_SECONDS)
    }
}

/// Offsets saturate at a century
fn to_chrono(duration: Duration) -> chrono::Duration {
    let century = chrono::Duration::days(365 * 100);
    chrono::Duration::from_std(duration).map_or(century, |d| d.min(century))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wednesday 2024-05-15 12:00:00
    fn now() -> NaiveDateTime {
        at(2024, 5, 15, 12, 0, 0)
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn expr(s: &str) -> TimeExpr {
        s.parse().unwrap()
    }

    fn hours(h: u64) -> Duration {
        Duration::from_secs(h * 3600)
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(expr("5s"), TimeExpr::Offset(Duration::from_secs(5)));
        assert_eq!(expr("0"), TimeExpr::Offset(Duration::ZERO));
        assert_eq!(expr("trigger3"), TimeExpr::Trigger("trigger3".to_string()));
        assert_eq!(
            expr("wallclock(2020-07-16T12:00)"),
            TimeExpr::Wallclock(at(2020, 7, 16, 12, 0, 0))
        );
        assert_eq!(
            expr("wallclock(R/2011-01-01T07:00:00/P1D)"),
            TimeExpr::Recurring {
                anchor: at(2011, 1, 1, 7, 0, 0),
                weekday: None
            }
        );
        assert_eq!(
            expr("wallclock(R/2011-01-01+w3T07:00:00/P1D)"),
            TimeExpr::Recurring {
                anchor: at(2011, 1, 1, 7, 0, 0),
                weekday: Some(WeekdayRule {
                    direction: WeekdayDirection::After,
                    day: 3
                })
            }
        );
        assert_eq!(
            expr("wallclock(R/2011-01-01-w4T07:00:00/P1D)"),
            TimeExpr::Recurring {
                anchor: at(2011, 1, 1, 7, 0, 0),
                weekday: Some(WeekdayRule {
                    direction: WeekdayDirection::Before,
                    day: 4
                })
            }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<TimeExpr>().is_err());
        assert!("soon".parse::<TimeExpr>().is_err());
        assert!("wallclock(R/2011-01-01T07:00:00/P1W)".parse::<TimeExpr>().is_err());
        assert!("wallclock(yesterday)".parse::<TimeExpr>().is_err());
    }

    #[test]
    fn test_display_round_trips_recurring() {
        let parsed = expr("wallclock(R/2011-01-01+w3T07:00:00/P1D)");
        assert_eq!(expr(&parsed.to_string()), parsed);
    }

    #[test]
    fn test_serde_uses_attribute_text() {
        let parsed = expr("wallclock(R/2011-01-01T07:00:00/P1D)");
        let json = serde_json::to_string(&parsed).unwrap();
        assert_eq!(json, format!("\"{}\"", parsed));
        assert_eq!(serde_json::from_str::<TimeExpr>(&json).unwrap(), parsed);

        assert_eq!(serde_json::from_str::<TimeExpr>("\"5s\"").unwrap(), TimeExpr::Offset(Duration::from_secs(5)));
        assert!(serde_json::from_str::<TimeExpr>("\"wallclock(tomorrow)\"").is_err());
    }

    #[test]
    fn test_clock_values() {
        assert_eq!(parse_clock_value("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_clock_value("2min"), Some(Duration::from_secs(120)));
        assert_eq!(parse_clock_value("1h"), Some(hours(1)));
        assert_eq!(parse_clock_value("00:01:30"), Some(Duration::from_secs(90)));
        assert_eq!(parse_clock_value("-5s"), None);
        assert_eq!(parse_clock_value("abc"), None);
    }

    #[test]
    fn test_media_duration_defaults() {
        assert_eq!(media_duration(Some("999")), Duration::from_secs(999));
        assert_eq!(media_duration(Some("indefinite")), INFINITE_DURATION);
        assert_eq!(media_duration(Some("asdmaskd")), DEFAULT_DURATION);
        assert_eq!(media_duration(Some("Nan")), DEFAULT_DURATION);
        assert_eq!(media_duration(Some("200")), Duration::from_secs(200));
        assert_eq!(media_duration(Some("50s")), Duration::from_secs(50));
        assert_eq!(media_duration(Some("12sec")), Duration::from_secs(12));
        assert_eq!(media_duration(None), DEFAULT_DURATION);
    }

    #[test]
    fn test_oversized_values_saturate() {
        assert_eq!(parse_clock_value("1e20"), Some(Duration::MAX));
        assert_eq!(parse_clock_value("infs"), None);
        assert_eq!(media_duration(Some("1e20")), INFINITE_DURATION);
        assert_eq!(media_duration(Some("2000000s")), INFINITE_DURATION);
    }

    #[test]
    fn test_offsets_past_the_calendar_do_not_panic() {
        let century = Duration::from_secs(365 * 100 * 86_400);
        let huge = expr("10000000000000s");

        let window = resolve(Some(&huge), None, now());
        assert_eq!(window.wait, century);
        assert!(!window.is_open(now()));

        let window = resolve(None, Some(&huge), now());
        assert!(window.is_open(now()));
        assert!(window.end_instant().is_some_and(|end| end > at(2124, 1, 1, 0, 0, 0)));

        let window = resolve(Some(&expr("wallclock(R/2011-01-01T07:00:00/P1D)")), Some(&huge), now());
        assert!(window.is_playable(now()));
    }

    #[test]
    fn test_no_begin_is_immediate() {
        let window = resolve(None, None, now());
        assert_eq!(window, TimeWindow::immediate());

        let window = resolve(None, Some(&expr("30s")), now());
        assert_eq!(window.wait, Duration::ZERO);
        assert_eq!(window.end, WindowEnd::At(at(2024, 5, 15, 12, 0, 30)));
    }

    #[test]
    fn test_offset_begin_waits() {
        let window = resolve(Some(&expr("5s")), Some(&expr("10s")), now());
        assert_eq!(window.wait, Duration::from_secs(5));
        assert_eq!(window.end, WindowEnd::At(at(2024, 5, 15, 12, 0, 15)));
    }

    #[test]
    fn test_absolute_pair_in_past_never_plays() {
        let window = resolve(
            Some(&expr("wallclock(2020-07-16T12:00)")),
            Some(&expr("wallclock(2020-07-17T19:00)")),
            now(),
        );
        assert_eq!(window.end, WindowEnd::NeverPlay);
        assert!(!window.is_playable(now()));
    }

    #[test]
    fn test_absolute_begin_elapsed_end_future() {
        let window = resolve(
            Some(&expr("wallclock(2024-05-01T09:00)")),
            Some(&expr("wallclock(2024-06-01T12:00)")),
            now(),
        );
        assert_eq!(window.wait, Duration::ZERO);
        assert_eq!(window.end, WindowEnd::At(at(2024, 6, 1, 12, 0, 0)));
    }

    #[test]
    fn test_absolute_begin_future() {
        let window = resolve(Some(&expr("wallclock(2024-05-15T14:00)")), None, now());
        assert_eq!(window.wait, hours(2));
        assert_eq!(window.end, WindowEnd::Never);
    }

    #[test]
    fn test_recurring_starting_now() {
        let window = resolve(
            Some(&expr("wallclock(R/2024-05-15T12:00:00/P1D)")),
            Some(&expr("wallclock(R/2024-05-15T16:00:00/P1D)")),
            now(),
        );
        assert_eq!(window.wait, Duration::ZERO);
        assert_eq!(window.end, WindowEnd::At(at(2024, 5, 15, 16, 0, 0)));
    }

    #[test]
    fn test_recurring_started_earlier_today() {
        let window = resolve(
            Some(&expr("wallclock(R/2024-05-15T10:00:00/P1D)")),
            Some(&expr("wallclock(R/2024-05-15T16:00:00/P1D)")),
            now(),
        );
        assert_eq!(window.wait, Duration::ZERO);
        assert_eq!(window.end, WindowEnd::At(at(2024, 5, 15, 16, 0, 0)));
    }

    #[test]
    fn test_recurring_later_today() {
        let window = resolve(
            Some(&expr("wallclock(R/2024-05-15T13:00:00/P1D)")),
            Some(&expr("wallclock(R/2024-05-15T18:00:00/P1D)")),
            now(),
        );
        assert_eq!(window.wait, hours(1));
        assert_eq!(window.end, WindowEnd::At(at(2024, 5, 15, 18, 0, 0)));
    }

    #[test]
    fn test_recurring_anchor_tomorrow() {
        let window = resolve(
            Some(&expr("wallclock(R/2024-05-16T12:00:00/P1D)")),
            Some(&expr("wallclock(R/2024-05-16T18:00:00/P1D)")),
            now(),
        );
        assert_eq!(window.wait, hours(24));
        assert_eq!(window.end, WindowEnd::At(at(2024, 5, 16, 18, 0, 0)));
    }

    #[test]
    fn test_recurring_window_over_today_moves_to_tomorrow() {
        let window = resolve(
            Some(&expr("wallclock(R/2024-05-15T05:00:00/P1D)")),
            Some(&expr("wallclock(R/2024-05-15T08:00:00/P1D)")),
            now(),
        );
        assert_eq!(window.wait, hours(17));
        assert_eq!(window.end, WindowEnd::At(at(2024, 5, 16, 8, 0, 0)));

        // anchor two weeks back behaves the same
        let window = resolve(
            Some(&expr("wallclock(R/2024-04-30T05:00:00/P1D)")),
            Some(&expr("wallclock(R/2024-04-30T08:00:00/P1D)")),
            now(),
        );
        assert_eq!(window.wait, hours(17));
        assert_eq!(window.end, WindowEnd::At(at(2024, 5, 16, 8, 0, 0)));
    }

    #[test]
    fn test_recurring_window_crossing_midnight() {
        let window = resolve(
            Some(&expr("wallclock(R/2024-04-30T19:00:00/P1D)")),
            Some(&expr("wallclock(R/2024-05-01T00:00:00/P1D)")),
            now(),
        );
        assert_eq!(window.wait, hours(7));
        assert_eq!(window.end, WindowEnd::At(at(2024, 5, 16, 0, 0, 0)));
    }

    #[test]
    fn test_recurring_without_end() {
        let window = resolve(Some(&expr("wallclock(R/2024-05-15T05:00:00/P1D)")), None, now());
        assert_eq!(window.wait, Duration::ZERO);
        assert_eq!(window.end, WindowEnd::Never);

        let window = resolve(Some(&expr("wallclock(R/2024-05-22T12:00:00/P1D)")), None, now());
        assert_eq!(window.wait, hours(24 * 7));
        assert_eq!(window.end, WindowEnd::Never);
    }

    #[test]
    fn test_weekday_after() {
        // Saturday is three days after Wednesday
        let window = resolve(
            Some(&expr("wallclock(R/2024-05-15+w6T12:00:00/P1D)")),
            Some(&expr("wallclock(R/2024-05-15+w6T15:00:00/P1D)")),
            now(),
        );
        assert_eq!(window.wait, hours(72));
        assert_eq!(window.end, WindowEnd::At(at(2024, 5, 18, 15, 0, 0)));

        // Tuesday already passed this week
        let window = resolve(
            Some(&expr("wallclock(R/2024-05-15+w2T12:00:00/P1D)")),
            Some(&expr("wallclock(R/2024-05-15+w2T14:00:00/P1D)")),
            now(),
        );
        assert_eq!(window.wait, hours(24 * 6));

        // today, in progress
        let window = resolve(
            Some(&expr("wallclock(R/2024-05-15+w3T12:00:00/P1D)")),
            Some(&expr("wallclock(R/2024-05-15+w3T16:00:00/P1D)")),
            now(),
        );
        assert_eq!(window.wait, Duration::ZERO);
        assert_eq!(window.end, WindowEnd::At(at(2024, 5, 15, 16, 0, 0)));
    }

    #[test]
    fn test_weekday_before_ignores_anchor_date() {
        let window = resolve(
            Some(&expr("wallclock(R/2024-06-12-w3T12:00:00/P1D)")),
            Some(&expr("wallclock(R/2024-06-12-w3T14:00:00/P1D)")),
            now(),
        );
        assert_eq!(window.wait, Duration::ZERO);
        assert_eq!(window.end, WindowEnd::At(at(2024, 5, 15, 14, 0, 0)));

        let window = resolve(
            Some(&expr("wallclock(R/2024-06-12-w5T12:00:00/P1D)")),
            Some(&expr("wallclock(R/2024-06-12-w5T16:00:00/P1D)")),
            now(),
        );
        assert_eq!(window.wait, hours(48));
    }

    #[test]
    fn test_weekday_window_over_today_moves_a_week() {
        let window = resolve(
            Some(&expr("wallclock(R/2024-05-15+w3T08:00:00/P1D)")),
            Some(&expr("wallclock(R/2024-05-15+w3T09:00:00/P1D)")),
            now(),
        );
        assert_eq!(window.wait, hours(24 * 7 - 4));
    }

    #[test]
    fn test_recurring_resolution_is_idempotent() {
        let begin = expr("wallclock(R/2011-01-01+w5T07:30:00/P1D)");
        let end = expr("wallclock(R/2011-01-01+w5T09:00:00/P1D)");
        let first = resolve(Some(&begin), Some(&end), now());
        let second = resolve(Some(&begin), Some(&end), now());
        assert_eq!(first, second);

        let daily = expr("wallclock(R/2011-01-01T07:30:00/P1D)");
        assert_eq!(resolve(Some(&daily), None, now()), resolve(Some(&daily), None, now()));
    }

    #[test]
    fn test_trigger_begin_is_open() {
        let window = resolve(Some(&expr("trigger1")), Some(&expr("wallclock(2020-01-01)")), now());
        assert_eq!(window, TimeWindow::immediate());
    }
}
