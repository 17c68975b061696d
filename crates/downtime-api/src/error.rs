use thiserror::Error;

/// Top-level error type for the `downtime-api` crate.
///
/// Covers session setup and transport failures. Per-device failures
/// reported by the logger are not errors here: they travel to the
/// device's receiver as [`DeviceEvent::Error`](crate::DeviceEvent::Error).
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// Sending a frame to the logger failed.
    #[error("Failed to send {frame} frame: {reason}")]
    Send { frame: &'static str, reason: String },

    // ── Session ─────────────────────────────────────────────────────
    /// `start` was called with no registered device requests.
    #[error("No device requests registered for this session")]
    NoRequests,

    // ── Data ────────────────────────────────────────────────────────
    /// Frame (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
