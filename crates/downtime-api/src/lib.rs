// downtime-api: Async Rust client for streaming data-logger sessions

pub mod error;
pub mod logger;
pub mod reply;
pub mod websocket;

pub use error::Error;
pub use logger::{DataLogger, DeviceEvent, DeviceReceiver};
pub use reply::{DataBatch, LoggerStatus};
pub use websocket::WsLogger;
