// ── Query orchestration ──
//
// One query: register every configured device with the logger, start a
// single session over the window, then consume all device channels from
// one task. Each device ends in exactly one terminal state; a completed
// device contributes exactly one report row.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio_stream::StreamExt;
use tokio_stream::StreamMap;
use tokio_stream::wrappers::UnboundedReceiverStream;

use downtime_api::{DataLogger, DeviceEvent};

use crate::downtime::{DowntimeResult, SampleSeries, compute_downtime};
use crate::drf::{DeviceSpec, request_drf};
use crate::error::CoreError;
use crate::report::Report;
use crate::window::ResolvedWindow;

/// Threshold applied when a row's threshold is not a number.
pub const DEFAULT_THRESHOLD: f64 = 1.0;

// ── Options ──────────────────────────────────────────────────────────

/// When the logger session is stopped and cleared.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum ReleasePolicy {
    /// Stop and clear as soon as any device finishes. Devices still
    /// streaming at that point are cut off.
    PerDevice,
    /// Stop and clear once, after every device has finished.
    #[default]
    AllDone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub release: ReleasePolicy,
    pub default_threshold: f64,
    pub deadline: Option<Duration>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            release: ReleasePolicy::default(),
            default_threshold: DEFAULT_THRESHOLD,
            deadline: None,
        }
    }
}

// ── Per-device state ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    Idle,
    Streaming,
    Completed,
    Failed,
    /// The channel closed before the terminal batch arrived.
    Interrupted,
    TimedOut,
}

impl DeviceState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Idle | Self::Streaming)
    }
}

#[derive(Debug)]
struct DeviceStream {
    name: String,
    threshold: f64,
    series: SampleSeries,
    state: DeviceState,
}

/// Result of one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Completed devices, in completion order.
    pub results: Vec<DowntimeResult>,
    /// Every requested device with its final state, in row order.
    pub devices: Vec<(String, DeviceState)>,
}

impl QueryOutcome {
    /// Devices that ended in a terminal state other than `Completed`.
    pub fn incomplete(&self) -> impl Iterator<Item = (&str, DeviceState)> {
        self.devices
            .iter()
            .filter(|(_, state)| state.is_terminal() && *state != DeviceState::Completed)
            .map(|(name, state)| (name.as_str(), *state))
    }

    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.incomplete().map(|(name, _)| name)
    }
}

// ── Session ──────────────────────────────────────────────────────────

type DeviceStreams = StreamMap<usize, UnboundedReceiverStream<DeviceEvent>>;

/// Everything one query owns. Nothing outlives the call to
/// [`run_query`].
#[derive(Debug)]
pub struct QuerySession {
    window: ResolvedWindow,
    release: ReleasePolicy,
    devices: Vec<DeviceStream>,
    results: Vec<DowntimeResult>,
}

impl QuerySession {
    fn new(window: ResolvedWindow, release: ReleasePolicy) -> Self {
        Self {
            window,
            release,
            devices: Vec::new(),
            results: Vec::new(),
        }
    }

    fn track(&mut self, name: String, threshold: f64) -> usize {
        self.devices.push(DeviceStream {
            name,
            threshold,
            series: SampleSeries::new(),
            state: DeviceState::Idle,
        });
        self.devices.len() - 1
    }

    fn set_all(&mut self, from: DeviceState, to: DeviceState) {
        for device in self.devices.iter_mut().filter(|d| d.state == from) {
            device.state = to;
        }
    }

    /// Consume device events until every channel is done or a release
    /// ends the session early.
    async fn drive<L: DataLogger>(
        &mut self,
        logger: &L,
        streams: &mut DeviceStreams,
        report: &mut Report,
    ) {
        while let Some((key, event)) = streams.next().await {
            let Some(device) = self.devices.get_mut(key) else {
                continue;
            };

            match event {
                DeviceEvent::Data(batch) if !batch.is_end() => {
                    tracing::trace!(device = %device.name, samples = batch.len(), "Batch received");
                    device.series.extend(&batch);
                    continue;
                }
                DeviceEvent::Data(_) => {
                    let accumulated =
                        compute_downtime(&device.series, self.window.duration(), device.threshold);
                    let result = DowntimeResult {
                        device_name: device.name.clone(),
                        accumulated,
                        total: self.window.duration(),
                    };
                    tracing::debug!(
                        device = %device.name,
                        samples = device.series.len(),
                        downtime_ms = accumulated.num_milliseconds(),
                        "Device complete"
                    );
                    device.state = DeviceState::Completed;
                    report.push(&result);
                    self.results.push(result);
                }
                DeviceEvent::Error(status) => {
                    tracing::error!(device = %device.name, status = status.status, "{status}");
                    device.state = DeviceState::Failed;
                }
            }

            streams.remove(&key);

            if self.release == ReleasePolicy::PerDevice {
                release(logger);
                return;
            }
        }
    }

    fn into_outcome(self) -> QueryOutcome {
        QueryOutcome {
            results: self.results,
            devices: self.devices.into_iter().map(|d| (d.name, d.state)).collect(),
        }
    }
}

fn release<L: DataLogger>(logger: &L) {
    logger.stop();
    logger.clear();
}

/// Run one downtime query over `window` for the configured `rows`.
///
/// `report` is cleared first; its caption is set once the logger accepts
/// the session and a row is appended for each device that completes.
pub async fn run_query<L: DataLogger>(
    logger: &L,
    window: &ResolvedWindow,
    rows: &[DeviceSpec],
    report: &mut Report,
    options: &QueryOptions,
) -> Result<QueryOutcome, CoreError> {
    report.clear();

    let mut session = QuerySession::new(*window, options.release);
    let mut streams = DeviceStreams::new();

    for spec in rows {
        let drf = spec.to_drf();
        if drf.is_empty() {
            tracing::debug!("Skipping row without a device");
            continue;
        }
        let request = request_drf(&drf);
        let key = session.track(spec.device.clone(), spec.threshold_value(options.default_threshold));
        tracing::debug!(request, "Adding logger request");
        streams.insert(key, UnboundedReceiverStream::new(logger.add_request(request)));
    }

    if streams.is_empty() {
        return Err(CoreError::NoDevices);
    }

    let token = window.logger_token();
    tracing::info!(devices = streams.len(), data_source = %token, "Starting logger session");
    if let Err(e) = logger.start(&token).await {
        logger.clear();
        return Err(e.into());
    }
    report.set_total(window.duration());
    session.set_all(DeviceState::Idle, DeviceState::Streaming);

    let drive = session.drive(logger, &mut streams, report);
    let timed_out = match options.deadline {
        Some(deadline) => tokio::time::timeout(deadline, drive).await.is_err(),
        None => {
            drive.await;
            false
        }
    };

    if timed_out {
        tracing::warn!("Query deadline expired");
        session.set_all(DeviceState::Streaming, DeviceState::TimedOut);
    } else {
        session.set_all(DeviceState::Streaming, DeviceState::Interrupted);
    }

    // Stop is idempotent, so a per-device release already issued is harmless.
    if options.release == ReleasePolicy::AllDone || timed_out {
        release(logger);
    }

    Ok(session.into_outcome())
}
