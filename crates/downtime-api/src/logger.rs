//! The logger session contract.
//!
//! A session collects device requests, is started once with a data-source
//! token covering all of them, and streams each device's data back on its
//! own channel. `stop` and `clear` act on the whole session, not on a
//! single device.

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::Error;
use crate::reply::{DataBatch, LoggerStatus};

/// Something delivered to one device's receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Samples in arrival order. An empty batch ends the stream.
    Data(DataBatch),
    /// The logger (or the transport) failed this request.
    Error(LoggerStatus),
}

/// Receiving half of a device's channel.
///
/// Yields `None` once the session drops the request, either through
/// [`DataLogger::clear`] or because the connection ended.
pub type DeviceReceiver = mpsc::UnboundedReceiver<DeviceEvent>;

/// A streaming data-logger session shared by several device requests.
pub trait DataLogger: Send + Sync {
    /// Register a device request. Must be called before [`start`](Self::start).
    fn add_request(&self, drf: &str) -> DeviceReceiver;

    /// Open the session for every registered request.
    ///
    /// `data_source` selects what to stream, e.g. `LOGGER:<t1 ms>:<t2 ms>`.
    fn start(&self, data_source: &str) -> impl Future<Output = Result<(), Error>> + Send;

    /// Stop streaming. Calling it on a stopped session does nothing.
    fn stop(&self);

    /// Drop all registered requests, closing their receivers.
    fn clear(&self);
}
