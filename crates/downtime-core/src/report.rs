// ── Downtime report ──
//
// Rows are appended as devices complete, so their order is completion
// order, not the order the devices were configured in.

use chrono::TimeDelta;
use serde::Serialize;

use crate::downtime::{DowntimeResult, format_hms, humanize};

/// One rendered device line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub device: String,
    /// `hh:mm:ss`
    pub downtime: String,
    /// Percentage of the window, four significant digits.
    pub percentage: String,
    pub downtime_ms: i64,
}

impl From<&DowntimeResult> for ReportRow {
    fn from(result: &DowntimeResult) -> Self {
        Self {
            device: result.device_name.clone(),
            downtime: format_hms(result.accumulated),
            percentage: result.percentage_display(),
            downtime_ms: result.accumulated.num_milliseconds(),
        }
    }
}

/// Output table plus its caption.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub caption: Option<String>,
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every row and the caption.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.caption = None;
    }

    pub fn push(&mut self, result: &DowntimeResult) {
        self.rows.push(ReportRow::from(result));
    }

    /// Caption summarizing the length of the queried window.
    pub fn set_total(&mut self, total: TimeDelta) {
        self.caption = Some(format!("Total time considered is {}", humanize(total)));
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
