// ── Device request strings ──
//
// A device row is written as `device@event_period,rate,clock_type,delay@threshold`.
// Parsing fills in defaults; serializing leaves out whatever is empty.
// The two directions are deliberately not symmetric: the logger's grammar
// relies on the omissions.

use std::fmt;

use serde::{Deserialize, Serialize};

const DEFAULT_EVENT_PERIOD: &str = "E";
const DEFAULT_CLOCK_TYPE: &str = "H";
const DEFAULT_THRESHOLD: &str = "0";

/// One device row: the device name, its sampling metadata and the value
/// threshold used when accounting downtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub device: String,
    pub event_period: String,
    pub rate: String,
    pub clock_type: String,
    pub delay: String,
    pub threshold: String,
}

impl Default for DeviceSpec {
    fn default() -> Self {
        Self {
            device: String::new(),
            event_period: DEFAULT_EVENT_PERIOD.into(),
            rate: String::new(),
            clock_type: DEFAULT_CLOCK_TYPE.into(),
            delay: String::new(),
            threshold: DEFAULT_THRESHOLD.into(),
        }
    }
}

impl DeviceSpec {
    /// A row for `device` with every other field at its default.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }

    /// Parse a request string. Never fails: missing parts take defaults.
    pub fn parse(spec: &str) -> Self {
        let mut parts = spec.split('@');
        let device = parts.next().unwrap_or_default();
        let metadata = parts.next().unwrap_or_default();
        let threshold = parts.next().unwrap_or_default();

        let mut parsed = Self {
            device: device.to_owned(),
            threshold: or_default(threshold, DEFAULT_THRESHOLD),
            ..Self::default()
        };

        if !metadata.is_empty() {
            let mut fields = metadata.split(',');
            parsed.event_period = or_default(fields.next().unwrap_or_default(), DEFAULT_EVENT_PERIOD);
            parsed.rate = fields.next().unwrap_or_default().to_owned();
            parsed.clock_type = or_default(fields.next().unwrap_or_default(), DEFAULT_CLOCK_TYPE);
            parsed.delay = fields.next().unwrap_or_default().to_owned();
        }

        parsed
    }

    /// Serialize back to a request string.
    ///
    /// An empty device yields `""`, meaning "no device configured".
    /// The metadata segment needs a rate; clock type and delay additionally
    /// need a delay.
    pub fn to_drf(&self) -> String {
        if self.device.is_empty() {
            return String::new();
        }

        let mut drf = self.device.clone();

        if !self.rate.is_empty() {
            drf.push('@');
            drf.push_str(&self.event_period);
            drf.push(',');
            drf.push_str(&self.rate);

            if !self.delay.is_empty() {
                drf.push(',');
                drf.push_str(&self.clock_type);
                drf.push(',');
                drf.push_str(&self.delay);
            }
        }

        if !self.threshold.is_empty() {
            drf.push('@');
            drf.push_str(&self.threshold);
        }

        drf
    }

    /// `false` when the row would serialize to nothing.
    pub fn is_configured(&self) -> bool {
        !self.device.is_empty()
    }

    /// The threshold as a number, or `fallback` when it does not parse.
    pub fn threshold_value(&self, fallback: f64) -> f64 {
        self.threshold.trim().parse().unwrap_or(fallback)
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_drf())
    }
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_owned()
    } else {
        value.to_owned()
    }
}

/// Strip the threshold from a serialized row before sending it to the
/// logger, which does not accept one.
///
/// Removes a trailing bare `@` or a trailing `@` followed only by digits.
pub fn request_drf(serialized: &str) -> &str {
    if let Some(stripped) = serialized.strip_suffix('@') {
        return stripped;
    }
    match serialized.rsplit_once('@') {
        Some((head, tail)) if tail.bytes().all(|b| b.is_ascii_digit()) => head,
        _ => serialized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn full() -> DeviceSpec {
        DeviceSpec {
            device: "M:OUTTMP".into(),
            event_period: "p".into(),
            rate: "1000".into(),
            clock_type: "U".into(),
            delay: "200".into(),
            threshold: "5".into(),
        }
    }

    #[test]
    fn parse_bare_device_uses_defaults() {
        let spec = DeviceSpec::parse("G:AMANDA");
        assert_eq!(spec, DeviceSpec::new("G:AMANDA"));
        assert_eq!(spec.threshold, "0");
        assert_eq!(spec.event_period, "E");
        assert_eq!(spec.clock_type, "H");
    }

    #[test]
    fn parse_all_segments() {
        assert_eq!(DeviceSpec::parse("M:OUTTMP@p,1000,U,200@5"), full());
    }

    #[test]
    fn parse_fills_empty_metadata_fields() {
        let spec = DeviceSpec::parse("M:OUTTMP@,15,,@");
        assert_eq!(spec.event_period, "E");
        assert_eq!(spec.rate, "15");
        assert_eq!(spec.clock_type, "H");
        assert_eq!(spec.delay, "");
        assert_eq!(spec.threshold, "0");
    }

    #[test]
    fn parse_ignores_extra_segments() {
        let spec = DeviceSpec::parse("A@p,1,U,2,extra@3@junk");
        assert_eq!(spec.delay, "2");
        assert_eq!(spec.threshold, "3");
    }

    #[test]
    fn serialize_empty_device_is_empty() {
        let spec = DeviceSpec {
            device: String::new(),
            ..full()
        };
        assert_eq!(spec.to_drf(), "");
        assert!(!spec.is_configured());
    }

    #[test]
    fn serialize_full_row() {
        assert_eq!(full().to_drf(), "M:OUTTMP@p,1000,U,200@5");
        assert_eq!(full().to_string(), "M:OUTTMP@p,1000,U,200@5");
    }

    #[test]
    fn serialize_without_delay_drops_clock_type() {
        let spec = DeviceSpec {
            delay: String::new(),
            ..full()
        };
        assert_eq!(spec.to_drf(), "M:OUTTMP@p,1000@5");
    }

    #[test]
    fn serialize_without_rate_drops_metadata() {
        let spec = DeviceSpec {
            rate: String::new(),
            ..full()
        };
        assert_eq!(spec.to_drf(), "M:OUTTMP@5");
    }

    #[test]
    fn serialize_without_threshold() {
        let spec = DeviceSpec {
            threshold: String::new(),
            ..full()
        };
        assert_eq!(spec.to_drf(), "M:OUTTMP@p,1000,U,200");
    }

    #[test]
    fn round_trip_with_rate_and_delay() {
        let specs = [
            full(),
            DeviceSpec {
                event_period: "E".into(),
                clock_type: "H".into(),
                threshold: "0".into(),
                ..full()
            },
            DeviceSpec {
                device: "Z:ACLTST".into(),
                rate: "15".into(),
                delay: "1".into(),
                threshold: "2.5".into(),
                ..DeviceSpec::default()
            },
        ];

        for spec in specs {
            let reparsed = DeviceSpec::parse(&spec.to_drf());
            assert_eq!(reparsed, spec);
        }
    }

    #[test]
    fn request_drf_strips_threshold() {
        assert_eq!(request_drf("M:OUTTMP@p,1000@5"), "M:OUTTMP@p,1000");
        assert_eq!(request_drf("M:OUTTMP@0"), "M:OUTTMP");
        assert_eq!(request_drf("M:OUTTMP@"), "M:OUTTMP");
        assert_eq!(request_drf("M:OUTTMP@p,1000"), "M:OUTTMP@p,1000");
        assert_eq!(request_drf("M:OUTTMP"), "M:OUTTMP");
    }

    #[test]
    fn request_drf_keeps_fractional_threshold() {
        // Only an all-digit suffix counts as a threshold.
        assert_eq!(request_drf("M:OUTTMP@2.5"), "M:OUTTMP@2.5");
    }

    #[test]
    fn threshold_value_falls_back() {
        assert!((DeviceSpec::parse("A@@4").threshold_value(1.0) - 4.0).abs() < f64::EPSILON);
        let blank = DeviceSpec {
            threshold: String::new(),
            ..DeviceSpec::new("A")
        };
        assert!((blank.threshold_value(1.0) - 1.0).abs() < f64::EPSILON);
    }
}
