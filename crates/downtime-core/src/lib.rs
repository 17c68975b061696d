//! Downtime accounting and query orchestration between `downtime-api` and
//! the command line.
//!
//! - **[`run_query`]** registers each configured device with a
//!   [`DataLogger`], starts one session over the window and drives every
//!   device channel to a terminal [`DeviceState`].
//!
//! - **[`Page`]** ties a [`QueryForm`] to a [`KeyValueStore`] and a share
//!   URL. Loading prefers the URL; every query persists first.
//!
//! - **Codec and accounting**: [`DeviceSpec`] reads and writes device
//!   request strings, [`compute_downtime`] charges each sample interval to
//!   the later sample, and [`Report`] renders the rows.

pub mod downtime;
pub mod drf;
pub mod error;
pub mod form;
pub mod page;
pub mod persist;
pub mod report;
pub mod session;
pub mod window;

// ── Primary re-exports ──────────────────────────────────────────
pub use downtime::{DowntimeResult, SampleSeries, compute_downtime, format_hms, humanize};
pub use drf::{DeviceSpec, request_drf};
pub use error::CoreError;
pub use form::QueryForm;
pub use page::Page;
pub use persist::{FileStore, KeyValueStore, MemoryStore, PersistedState};
pub use report::{Report, ReportRow};
pub use session::{
    DEFAULT_THRESHOLD, DeviceState, QueryOptions, QueryOutcome, ReleasePolicy, run_query,
};
pub use window::{ResolvedWindow, TimeWindow};

// Re-export the client types callers need to drive a query.
pub use downtime_api::{DataLogger, WsLogger};
