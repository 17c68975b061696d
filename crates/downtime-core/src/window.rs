// ── Query time window ──
//
// Bounds are kept as the strings the operator typed (that is what gets
// persisted and shared) and only resolved to instants when a query runs.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Naive layouts accepted in addition to RFC 3339. The first matches what
/// a `datetime-local` form field produces.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Start and end of a query, each optional until the query is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub t1: Option<String>,
    pub t2: Option<String>,
}

impl TimeWindow {
    pub fn new(t1: impl Into<String>, t2: impl Into<String>) -> Self {
        Self {
            t1: Some(t1.into()),
            t2: Some(t2.into()),
        }
    }

    /// Resolve both bounds, reading naive timestamps as local time.
    pub fn resolve(&self) -> Result<ResolvedWindow, CoreError> {
        self.resolve_in(&Local)
    }

    /// Resolve both bounds, reading naive timestamps in `tz`.
    pub fn resolve_in<Tz: TimeZone>(&self, tz: &Tz) -> Result<ResolvedWindow, CoreError> {
        let start = parse_bound("t1", self.t1.as_deref(), tz)?;
        let end = parse_bound("t2", self.t2.as_deref(), tz)?;
        ResolvedWindow::new(start, end)
    }
}

fn parse_bound<Tz: TimeZone>(
    field: &'static str,
    value: Option<&str>,
    tz: &Tz,
) -> Result<DateTime<Utc>, CoreError> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(CoreError::InvalidWindow {
            message: format!("{field} is not set"),
        });
    }
    parse_timestamp_in(value, tz).ok_or_else(|| CoreError::InvalidTimestamp {
        field,
        value: value.to_owned(),
    })
}

/// Parse an RFC 3339 timestamp, or a naive date/time interpreted in `tz`.
pub fn parse_timestamp_in<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// A window with both bounds known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ResolvedWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CoreError> {
        if end < start {
            return Err(CoreError::InvalidWindow {
                message: format!("t2 ({end}) is before t1 ({start})"),
            });
        }
        Ok(Self { start, end })
    }

    /// The window ending at `end` and lasting `length`.
    pub fn ending_at(end: DateTime<Utc>, length: TimeDelta) -> Result<Self, CoreError> {
        Self::new(end - length, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// The data-source token that opens a logger session over this window.
    pub fn logger_token(&self) -> String {
        format!(
            "LOGGER:{}:{}",
            self.start.timestamp_millis(),
            self.end.timestamp_millis()
        )
    }

    /// Back to persisted form (RFC 3339, second precision).
    pub fn to_time_window(&self) -> TimeWindow {
        TimeWindow::new(
            self.start.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.end.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        )
    }
}
