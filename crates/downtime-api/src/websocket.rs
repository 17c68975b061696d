//! Logger session over a WebSocket.
//!
//! Device requests are registered locally, then [`DataLogger::start`]
//! connects, announces every request, and sends the data-source token.
//! A background task reads JSON frames and routes each one to the
//! channel of the request it names by `ref_id`.
//!
//! # Example
//!
//! ```rust,ignore
//! use downtime_api::{DataLogger, DeviceEvent, WsLogger};
//! use url::Url;
//!
//! let logger = WsLogger::new(Url::parse("wss://logger.example.org/stream")?, None);
//! let mut rx = logger.add_request("M:OUTTMP@p,1000");
//! logger.start("LOGGER:1700000000000:1700003600000").await?;
//!
//! while let Some(DeviceEvent::Data(batch)) = rx.recv().await {
//!     if batch.is_end() {
//!         break;
//!     }
//!     println!("{} samples", batch.len());
//! }
//!
//! logger.stop();
//! logger.clear();
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::logger::{DataLogger, DeviceEvent, DeviceReceiver};
use crate::reply::{ClientFrame, LoggerStatus, ServerFrame};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

// ── Routing table ────────────────────────────────────────────────────

struct Route {
    drf: String,
    tx: mpsc::UnboundedSender<DeviceEvent>,
}

#[derive(Default)]
struct Routes {
    next_ref: u32,
    by_ref: BTreeMap<u32, Route>,
}

type SharedRoutes = Arc<Mutex<Routes>>;

fn lock(routes: &Mutex<Routes>) -> MutexGuard<'_, Routes> {
    routes.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── WsLogger ─────────────────────────────────────────────────────────

/// A [`DataLogger`] speaking JSON frames over a WebSocket.
pub struct WsLogger {
    url: Url,
    token: Option<SecretString>,
    routes: SharedRoutes,
    cancel: Mutex<Option<CancellationToken>>,
}

impl WsLogger {
    /// Create a session for the logger at `url`. Does NOT connect.
    ///
    /// If `token` is provided it is sent as a bearer `Authorization`
    /// header on the upgrade request.
    pub fn new(url: Url, token: Option<SecretString>) -> Self {
        Self {
            url,
            token,
            routes: Arc::default(),
            cancel: Mutex::new(None),
        }
    }

    /// The logger endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Number of requests currently registered.
    pub fn pending_requests(&self) -> usize {
        lock(&self.routes).by_ref.len()
    }

    async fn connect(&self) -> Result<WsStream, Error> {
        tracing::info!(url = %self.url, "Connecting to logger");

        let uri: tungstenite::http::Uri = self
            .url
            .as_str()
            .parse()
            .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

        let mut request = ClientRequestBuilder::new(uri);
        if let Some(ref token) = self.token {
            request = request.with_header("Authorization", format!("Bearer {}", token.expose_secret()));
        }

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        tracing::info!("Logger connected");
        Ok(ws_stream)
    }

    fn replace_cancel(&self, cancel: CancellationToken) {
        let mut slot = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(cancel) {
            previous.cancel();
        }
    }
}

impl DataLogger for WsLogger {
    fn add_request(&self, drf: &str) -> DeviceReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut routes = lock(&self.routes);
        let ref_id = routes.next_ref;
        routes.next_ref += 1;
        routes.by_ref.insert(
            ref_id,
            Route {
                drf: drf.to_owned(),
                tx,
            },
        );
        tracing::debug!(ref_id, drf, "Registered device request");
        rx
    }

    async fn start(&self, data_source: &str) -> Result<(), Error> {
        let requests: Vec<(u32, String)> = lock(&self.routes)
            .by_ref
            .iter()
            .map(|(ref_id, route)| (*ref_id, route.drf.clone()))
            .collect();
        if requests.is_empty() {
            return Err(Error::NoRequests);
        }

        let (mut write, read) = self.connect().await?.split();

        for (ref_id, drf) in &requests {
            send_frame(&mut write, &ClientFrame::AddRequest { ref_id: *ref_id, drf }, "add_request")
                .await?;
        }
        send_frame(&mut write, &ClientFrame::Start { data_source }, "start").await?;
        tracing::info!(requests = requests.len(), data_source, "Logger session started");

        let cancel = CancellationToken::new();
        self.replace_cancel(cancel.clone());

        let routes = Arc::clone(&self.routes);
        tokio::spawn(async move {
            read_loop(read, write, routes, cancel).await;
        });

        Ok(())
    }

    fn stop(&self) {
        let slot = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref cancel) = *slot {
            if !cancel.is_cancelled() {
                tracing::debug!("Stopping logger session");
                cancel.cancel();
            }
        }
    }

    fn clear(&self) {
        let mut routes = lock(&self.routes);
        if !routes.by_ref.is_empty() {
            tracing::debug!(dropped = routes.by_ref.len(), "Clearing device requests");
        }
        routes.by_ref.clear();
    }
}

impl Drop for WsLogger {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Session reader ───────────────────────────────────────────────────

async fn send_frame(
    write: &mut WsWrite,
    frame: &ClientFrame<'_>,
    name: &'static str,
) -> Result<(), Error> {
    let text = serde_json::to_string(frame)?;
    write
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| Error::Send {
            frame: name,
            reason: e.to_string(),
        })
}

/// Read frames until the session is stopped or the connection drops.
async fn read_loop(
    mut read: WsRead,
    mut write: WsWrite,
    routes: SharedRoutes,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                if let Err(e) = send_frame(&mut write, &ClientFrame::Stop, "stop").await {
                    tracing::debug!(error = %e, "Could not send stop frame");
                }
                let _ = write.close().await;
                break;
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => route_frame(&text, &routes),
                    Some(Ok(Message::Ping(_))) => {
                        // tungstenite answers pings itself
                        tracing::trace!("Logger ping");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(code = %cf.code, reason = %cf.reason, "Logger closed the session");
                        } else {
                            tracing::info!("Logger closed the session");
                        }
                        release_routes(&routes);
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Logger connection failed");
                        fail_routes(&routes, &e.to_string());
                        break;
                    }
                    None => {
                        tracing::info!("Logger stream ended");
                        release_routes(&routes);
                        break;
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }

    tracing::debug!("Logger reader exiting");
}

/// Parse a text frame and hand its event to the owning request.
fn route_frame(text: &str, routes: &Mutex<Routes>) {
    let frame: ServerFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to parse logger frame");
            return;
        }
    };

    let Some((ref_id, event)) = frame.into_event() else {
        return;
    };

    let routes = lock(routes);
    match routes.by_ref.get(&ref_id) {
        // A closed receiver just means nobody is listening any more.
        Some(route) => {
            let _ = route.tx.send(event);
        }
        None => tracing::debug!(ref_id, "Frame for unknown or cleared request"),
    }
}

/// Connection ended without a failure: drop the senders so receivers see
/// the end of their channel.
fn release_routes(routes: &Mutex<Routes>) {
    lock(routes).by_ref.clear();
}

/// Connection failed: tell every outstanding request, then drop it.
fn fail_routes(routes: &Mutex<Routes>, reason: &str) {
    let mut routes = lock(routes);
    for route in routes.by_ref.values() {
        let _ = route.tx.send(DeviceEvent::Error(LoggerStatus::transport(reason)));
    }
    routes.by_ref.clear();
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::reply::DataBatch;

    fn logger() -> WsLogger {
        WsLogger::new(Url::parse("ws://127.0.0.1:1/stream").unwrap(), None)
    }

    #[test]
    fn add_request_assigns_sequential_ref_ids() {
        let logger = logger();
        let _a = logger.add_request("A");
        let _b = logger.add_request("B");

        let routes = lock(&logger.routes);
        let drfs: Vec<(u32, &str)> = routes
            .by_ref
            .iter()
            .map(|(id, r)| (*id, r.drf.as_str()))
            .collect();
        assert_eq!(drfs, vec![(0, "A"), (1, "B")]);
    }

    #[test]
    fn route_frame_delivers_to_matching_request() {
        let logger = logger();
        let mut a = logger.add_request("A");
        let mut b = logger.add_request("B");

        let raw = serde_json::json!({
            "type": "data", "ref_id": 1, "data": [1.0, 2.0], "micros": [10, 20]
        });
        route_frame(&raw.to_string(), &logger.routes);

        assert!(a.try_recv().is_err());
        assert_eq!(
            b.try_recv().unwrap(),
            DeviceEvent::Data(DataBatch {
                data: vec![1.0, 2.0],
                micros: vec![10, 20],
            })
        );
    }

    #[test]
    fn route_frame_ignores_malformed_json() {
        let logger = logger();
        let mut a = logger.add_request("A");

        route_frame("not json at all", &logger.routes);
        route_frame(r#"{"type":"mystery","ref_id":0}"#, &logger.routes);

        assert!(a.try_recv().is_err());
    }

    #[test]
    fn clear_closes_receivers() {
        let logger = logger();
        let mut a = logger.add_request("A");
        logger.clear();
        logger.clear();

        assert_eq!(logger.pending_requests(), 0);
        assert!(matches!(
            a.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn fail_routes_reports_transport_status() {
        let logger = logger();
        let mut a = logger.add_request("A");

        fail_routes(&logger.routes, "connection reset");

        let DeviceEvent::Error(status) = a.try_recv().unwrap() else {
            panic!("expected error event");
        };
        assert_eq!(status.status, crate::reply::TRANSPORT_FAILURE);
        assert_eq!(status.message.as_deref(), Some("connection reset"));
        assert_eq!(logger.pending_requests(), 0);
    }

    #[test]
    fn stop_before_start_is_a_no_op() {
        let logger = logger();
        logger.stop();
        logger.stop();
    }

    #[tokio::test]
    async fn start_without_requests_fails() {
        let logger = logger();
        let result = logger.start("LOGGER:0:1").await;
        assert!(matches!(result, Err(Error::NoRequests)), "got {result:?}");
    }
}
