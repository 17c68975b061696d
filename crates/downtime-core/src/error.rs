// ── Core error types ──
//
// User-facing errors from downtime-core. Transport details from
// downtime-api are folded into `Logger` so consumers never match on
// WebSocket specifics.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Query input ──────────────────────────────────────────────────
    #[error("Invalid timestamp for {field}: '{value}'")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("Invalid time window: {message}")]
    InvalidWindow { message: String },

    #[error("No devices configured")]
    NoDevices,

    #[error("No device row at index {index} (have {len})")]
    NoSuchRow { index: usize, len: usize },

    // ── Logger ───────────────────────────────────────────────────────
    #[error("Cannot reach logger: {reason}")]
    LoggerUnavailable { reason: String },

    #[error("Logger error: {message}")]
    Logger { message: String },

    // ── Persistence ──────────────────────────────────────────────────
    #[error("State storage error: {message}")]
    Storage { message: String },
}

impl From<downtime_api::Error> for CoreError {
    fn from(err: downtime_api::Error) -> Self {
        match err {
            downtime_api::Error::WebSocketConnect(reason) => CoreError::LoggerUnavailable { reason },
            downtime_api::Error::WebSocketClosed { code, reason } => CoreError::LoggerUnavailable {
                reason: format!("closed (code {code}): {reason}"),
            },
            downtime_api::Error::InvalidUrl(e) => CoreError::LoggerUnavailable {
                reason: format!("invalid URL: {e}"),
            },
            downtime_api::Error::NoRequests => CoreError::NoDevices,
            other @ (downtime_api::Error::Send { .. } | downtime_api::Error::Serialization(_)) => {
                CoreError::Logger {
                    message: other.to_string(),
                }
            }
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Storage {
            message: format!("malformed state file: {err}"),
        }
    }
}
