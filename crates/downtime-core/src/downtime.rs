//! Downtime accounting over logged samples.
//!
//! The span between two consecutive samples is charged to the *later*
//! sample: it counts as downtime when that sample's value exceeds the
//! threshold. Window time outside the first-to-last sample span is
//! downtime too. Samples are not clipped to the window, so a span longer
//! than the window reduces the total.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use downtime_api::DataBatch;

// ── Samples ──────────────────────────────────────────────────────────

/// Every sample received for one device, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSeries {
    values: Vec<f64>,
    micros: Vec<i64>,
}

impl SampleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch. Samples without a timestamp (or the reverse) are dropped.
    pub fn extend(&mut self, batch: &DataBatch) {
        let n = batch.data.len().min(batch.micros.len());
        if n != batch.data.len() || n != batch.micros.len() {
            tracing::debug!(
                data = batch.data.len(),
                micros = batch.micros.len(),
                "Batch with mismatched lengths, truncating"
            );
        }
        self.values.extend_from_slice(&batch.data[..n]);
        self.micros.extend_from_slice(&batch.micros[..n]);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn micros(&self) -> &[i64] {
        &self.micros
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Time between the first and last sample.
    pub fn coverage(&self) -> TimeDelta {
        match (self.micros.first(), self.micros.last()) {
            (Some(first), Some(last)) => TimeDelta::microseconds(last - first),
            _ => TimeDelta::zero(),
        }
    }
}

// ── Accumulation ─────────────────────────────────────────────────────

/// Sum the gaps `timestamps[i] - timestamps[i - 1]` for every `i >= 1`
/// whose value exceeds `threshold`. The result is in the timestamps' unit.
pub fn accumulate_above(values: &[f64], timestamps: &[i64], threshold: f64) -> i64 {
    timestamps
        .windows(2)
        .zip(values.iter().skip(1))
        .filter(|(_, value)| **value > threshold)
        .map(|(pair, _)| pair[1] - pair[0])
        .sum()
}

/// Downtime of one device over a window of length `window`.
///
/// With no samples at all the device is down for the whole window.
/// Otherwise the uncovered part `window - coverage` is added unclamped.
pub fn compute_downtime(series: &SampleSeries, window: TimeDelta, threshold: f64) -> TimeDelta {
    if series.is_empty() {
        return window;
    }

    let in_range = TimeDelta::microseconds(accumulate_above(
        series.values(),
        series.micros(),
        threshold,
    ));
    let no_data = window - series.coverage();

    in_range + no_data
}

// ── Result ───────────────────────────────────────────────────────────

/// Downtime for one device over the queried window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DowntimeResult {
    pub device_name: String,
    pub accumulated: TimeDelta,
    pub total: TimeDelta,
}

impl DowntimeResult {
    /// Share of the window spent down, in percent. `NaN` for an empty window.
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> f64 {
        let total = self.total.num_microseconds().unwrap_or(i64::MAX) as f64;
        let accumulated = self.accumulated.num_microseconds().unwrap_or(i64::MAX) as f64;
        accumulated / total * 100.0
    }

    /// [`percentage`](Self::percentage) to four significant digits.
    pub fn percentage_display(&self) -> String {
        to_precision(self.percentage(), 4)
    }
}

// ── Formatting ───────────────────────────────────────────────────────

/// Format `value` with `digits` significant digits, switching to
/// exponent notation for very large or very small magnitudes.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_precision(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "NaN".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }
    let digits = digits.max(1);
    if value == 0.0 {
        return format!("{:.*}", digits - 1, 0.0);
    }

    // Exponent after rounding to `digits` significant digits.
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((&sci, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    let max_exp = i32::try_from(digits).unwrap_or(i32::MAX);
    if exp < -6 || exp >= max_exp {
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{}", exp.abs());
    }

    let decimals = (max_exp - 1 - exp).max(0) as usize;
    format!("{value:.decimals$}")
}

/// `hh:mm:ss` rounded to the nearest second, with hours allowed past 24.
pub fn format_hms(duration: TimeDelta) -> String {
    let ms = duration.num_milliseconds();
    let sign = if ms <= -500 { "-" } else { "" };
    let secs = (ms.unsigned_abs() + 500) / 1000;
    format!(
        "{sign}{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// Relative description of a duration: "a few seconds", "an hour", "3 days".
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn humanize(duration: TimeDelta) -> String {
    let ms = duration.num_milliseconds().unsigned_abs() as f64;
    let days_exact = ms / 86_400_000.0;
    let months_exact = days_exact * 4800.0 / 146_097.0;

    let seconds = (ms / 1000.0).round() as u64;
    let minutes = (ms / 60_000.0).round() as u64;
    let hours = (ms / 3_600_000.0).round() as u64;
    let days = days_exact.round() as u64;
    let months = months_exact.round() as u64;
    let years = (months_exact / 12.0).round() as u64;

    if seconds <= 44 {
        "a few seconds".into()
    } else if minutes <= 1 {
        "a minute".into()
    } else if minutes < 45 {
        format!("{minutes} minutes")
    } else if hours <= 1 {
        "an hour".into()
    } else if hours < 22 {
        format!("{hours} hours")
    } else if days <= 1 {
        "a day".into()
    } else if days < 26 {
        format!("{days} days")
    } else if months <= 1 {
        "a month".into()
    } else if months < 11 {
        format!("{months} months")
    } else if years <= 1 {
        "a year".into()
    } else {
        format!("{years} years")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64], micros: &[i64]) -> SampleSeries {
        let mut s = SampleSeries::new();
        s.extend(&DataBatch {
            data: values.to_vec(),
            micros: micros.to_vec(),
        });
        s
    }

    #[test]
    fn accumulate_charges_interval_to_later_sample() {
        let total = accumulate_above(&[5.0, 10.0, 2.0, 10.0], &[0, 1000, 2000, 3000], 4.0);
        assert_eq!(total, 2000);
    }

    #[test]
    fn accumulate_ignores_first_sample_value() {
        assert_eq!(accumulate_above(&[100.0, 0.0], &[0, 500], 4.0), 0);
        assert_eq!(accumulate_above(&[100.0], &[0], 4.0), 0);
        assert_eq!(accumulate_above(&[], &[], 4.0), 0);
    }

    #[test]
    fn accumulate_threshold_is_strict() {
        assert_eq!(accumulate_above(&[0.0, 4.0, 4.5], &[0, 10, 30], 4.0), 20);
    }

    #[test]
    fn empty_series_is_down_for_whole_window() {
        let window = TimeDelta::hours(5);
        assert_eq!(compute_downtime(&SampleSeries::new(), window, 1.0), window);
    }

    #[test]
    fn uncovered_time_is_added_to_in_range_downtime() {
        // Samples span 3s of a 10s window; 2s of the covered span is down.
        let s = series(&[5.0, 10.0, 2.0, 10.0], &[0, 1_000_000, 2_000_000, 3_000_000]);
        let downtime = compute_downtime(&s, TimeDelta::seconds(10), 4.0);
        assert_eq!(downtime, TimeDelta::seconds(2 + 7));
    }

    #[test]
    fn full_coverage_adds_nothing() {
        let s = series(&[0.0, 0.0], &[0, 10_000_000]);
        assert_eq!(
            compute_downtime(&s, TimeDelta::seconds(10), 1.0),
            TimeDelta::zero()
        );
    }

    #[test]
    fn coverage_beyond_window_offsets_in_range_downtime() {
        // 12s of samples for a 10s window: 12s down in range, -2s uncovered.
        let s = series(&[0.0, 5.0], &[0, 12_000_000]);
        let downtime = compute_downtime(&s, TimeDelta::seconds(10), 1.0);
        assert_eq!(downtime, TimeDelta::seconds(10));
    }

    #[test]
    fn batches_append_in_order() {
        let mut s = series(&[1.0], &[10]);
        s.extend(&DataBatch {
            data: vec![2.0, 3.0],
            micros: vec![20, 30],
        });
        assert_eq!(s.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(s.micros(), &[10, 20, 30]);
        assert_eq!(s.coverage(), TimeDelta::microseconds(20));
    }

    #[test]
    fn mismatched_batch_is_truncated() {
        let s = series(&[1.0, 2.0, 3.0], &[10, 20]);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn percentage_of_window() {
        let result = DowntimeResult {
            device_name: "A".into(),
            accumulated: TimeDelta::hours(1),
            total: TimeDelta::hours(2),
        };
        assert!((result.percentage() - 50.0).abs() < 1e-9);
        assert_eq!(result.percentage_display(), "50.00");
    }

    #[test]
    fn percentage_of_empty_window_is_nan() {
        let result = DowntimeResult {
            device_name: "A".into(),
            accumulated: TimeDelta::zero(),
            total: TimeDelta::zero(),
        };
        assert_eq!(result.percentage_display(), "NaN");
    }

    #[test]
    fn to_precision_significant_digits() {
        assert_eq!(to_precision(100.0, 4), "100.0");
        assert_eq!(to_precision(12.3456, 4), "12.35");
        assert_eq!(to_precision(0.0, 4), "0.000");
        assert_eq!(to_precision(99.996, 4), "100.0");
        assert_eq!(to_precision(0.001_234_56, 4), "0.001235");
        assert_eq!(to_precision(33.333_333, 4), "33.33");
        assert_eq!(to_precision(12_346.0, 4), "1.235e+4");
        assert_eq!(to_precision(0.000_000_123_4, 4), "1.234e-7");
    }

    #[test]
    fn format_hms_does_not_wrap_hours() {
        assert_eq!(format_hms(TimeDelta::seconds(3661)), "01:01:01");
        assert_eq!(format_hms(TimeDelta::zero()), "00:00:00");
        assert_eq!(format_hms(TimeDelta::hours(50)), "50:00:00");
        assert_eq!(format_hms(TimeDelta::milliseconds(1999)), "00:00:02");
        assert_eq!(format_hms(TimeDelta::milliseconds(1499)), "00:00:01");
        assert_eq!(format_hms(TimeDelta::seconds(-90)), "-00:01:30");
    }

    #[test]
    fn humanize_thresholds() {
        assert_eq!(humanize(TimeDelta::seconds(10)), "a few seconds");
        assert_eq!(humanize(TimeDelta::seconds(60)), "a minute");
        assert_eq!(humanize(TimeDelta::minutes(30)), "30 minutes");
        assert_eq!(humanize(TimeDelta::minutes(50)), "an hour");
        assert_eq!(humanize(TimeDelta::hours(5)), "5 hours");
        assert_eq!(humanize(TimeDelta::hours(23)), "a day");
        assert_eq!(humanize(TimeDelta::days(3)), "3 days");
        assert_eq!(humanize(TimeDelta::days(30)), "a month");
        assert_eq!(humanize(TimeDelta::days(92)), "3 months");
        assert_eq!(humanize(TimeDelta::days(365)), "a year");
        assert_eq!(humanize(TimeDelta::days(365 * 3)), "3 years");
    }
}
