//! Wire frames exchanged with the data logger, and the normalized
//! per-device payloads handed to consumers.

use serde::{Deserialize, Serialize};

use crate::logger::DeviceEvent;

/// Status code attached to errors synthesized by the client itself
/// (connection dropped mid-stream) rather than reported by the logger.
pub const TRANSPORT_FAILURE: i16 = -1;

// ── Normalized payloads ──────────────────────────────────────────────

/// A batch of logged samples for one device.
///
/// `data` and `micros` are parallel: `micros[i]` is the epoch timestamp
/// in microseconds of `data[i]`. A batch with no samples marks the end
/// of the device's stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataBatch {
    pub data: Vec<f64>,
    pub micros: Vec<i64>,
}

impl DataBatch {
    /// The zero-length batch that terminates a device stream.
    pub fn end_of_stream() -> Self {
        Self::default()
    }

    /// `true` for the end-of-stream sentinel.
    pub fn is_end(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Error status reported for a single device request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerStatus {
    pub status: i16,
    #[serde(default)]
    pub message: Option<String>,
}

impl LoggerStatus {
    pub(crate) fn transport(reason: impl Into<String>) -> Self {
        Self {
            status: TRANSPORT_FAILURE,
            message: Some(reason.into()),
        }
    }
}

impl std::fmt::Display for LoggerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message {
            Some(ref msg) => write!(f, "status {}: {msg}", self.status),
            None => write!(f, "status {}", self.status),
        }
    }
}

// ── Client → logger ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ClientFrame<'a> {
    AddRequest { ref_id: u32, drf: &'a str },
    Start { data_source: &'a str },
    Stop,
}

// ── Logger → client ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ServerFrame {
    /// Several samples at once.
    Data {
        ref_id: u32,
        data: Vec<f64>,
        micros: Vec<i64>,
    },
    /// A single sample.
    Reading { ref_id: u32, value: f64, micros: i64 },
    /// Error (or, with status 0, informational) status for a request.
    Status {
        ref_id: u32,
        status: i16,
        #[serde(default)]
        message: Option<String>,
    },
}

impl ServerFrame {
    /// Split into the request it belongs to and the event to deliver.
    ///
    /// Returns `None` for status 0, which carries no failure.
    pub(crate) fn into_event(self) -> Option<(u32, DeviceEvent)> {
        match self {
            Self::Data {
                ref_id,
                data,
                micros,
            } => Some((ref_id, DeviceEvent::Data(DataBatch { data, micros }))),
            Self::Reading {
                ref_id,
                value,
                micros,
            } => Some((
                ref_id,
                DeviceEvent::Data(DataBatch {
                    data: vec![value],
                    micros: vec![micros],
                }),
            )),
            Self::Status { status: 0, .. } => None,
            Self::Status {
                ref_id,
                status,
                message,
            } => Some((ref_id, DeviceEvent::Error(LoggerStatus { status, message }))),
        }
    }
}
