//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use downtime_config::ConfigError;
use downtime_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the data logger at {url}")]
    #[diagnostic(
        code(downtime::connection_failed),
        help(
            "Check that the logger is running and accessible.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("No data logger configured for profile '{profile}'")]
    #[diagnostic(
        code(downtime::no_logger),
        help(
            "Pass --logger <URL>, set DOWNTIME_LOGGER, or run: downtime config init --logger <URL>"
        )
    )]
    NoLogger { profile: String },

    #[error("Logger error: {message}")]
    #[diagnostic(code(downtime::logger))]
    Logger { message: String },

    // ── Query ────────────────────────────────────────────────────────

    #[error("No devices to query")]
    #[diagnostic(
        code(downtime::no_devices),
        help("Add one with: downtime devices add <DRF>\nOr pass --device <DRF> to query.")
    )]
    NoDevices,

    #[error("{count} device(s) still streaming after {seconds}s")]
    #[diagnostic(
        code(downtime::timeout),
        help("Increase the deadline with --timeout or check logger responsiveness.")
    )]
    Timeout { count: usize, seconds: u64 },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(downtime::not_found),
        help("Run: downtime {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(downtime::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(downtime::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: downtime config init --profile {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(downtime::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(downtime::config))]
    Config(Box<figment::Error>),

    #[error("State file error: {message}")]
    #[diagnostic(
        code(downtime::state),
        help("Point --state-file at a writable location, or delete a corrupt file.")
    )]
    Storage { message: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(downtime::serialize))]
    Serialize(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoDevices | Self::NoLogger { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidTimestamp { field, value } => CliError::Validation {
                field: field.into(),
                reason: format!("'{value}' is not a recognized timestamp"),
            },

            CoreError::InvalidWindow { message } => CliError::Validation {
                field: "window".into(),
                reason: message,
            },

            CoreError::NoDevices => CliError::NoDevices,

            CoreError::NoSuchRow { index, len: _ } => CliError::NotFound {
                resource_type: "device row".into(),
                identifier: index.to_string(),
                list_command: "devices list".into(),
            },

            CoreError::LoggerUnavailable { reason } => CliError::ConnectionFailed {
                url: "(logger)".into(),
                reason,
            },

            CoreError::Logger { message } => CliError::Logger { message },

            CoreError::Storage { message } => CliError::Storage { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: String::new(),
            },
            ConfigError::Serialization(e) => CliError::Serialize(e.to_string()),
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
