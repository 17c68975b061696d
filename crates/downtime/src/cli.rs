//! Clap derive structures for the `downtime` CLI.
//!
//! Defines the command tree, global flags and shared value enums. Kept free
//! of workspace types so `build.rs` can include it for man page generation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// downtime -- device downtime reports from a streaming data logger
#[derive(Debug, Parser)]
#[command(
    name = "downtime",
    version,
    about = "Report how long devices were down over a time window",
    long_about = "Queries a data logger for every configured device over a time window\n\
        and reports, per device, how long its reading stayed above a threshold\n\
        (plus any time the logger has no data for it).\n\n\
        The window and device rows persist between runs and can be shared as a URL.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Logger profile to use
    #[arg(long, short = 'p', env = "DOWNTIME_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Logger WebSocket URL (overrides profile)
    #[arg(long, short = 'l', env = "DOWNTIME_LOGGER", global = true)]
    pub logger: Option<String>,

    /// Page URL share links are built on (overrides profile)
    #[arg(long, env = "DOWNTIME_SHARE_BASE", global = true)]
    pub share_base: Option<String>,

    /// File holding the persisted window and device rows
    #[arg(long, env = "DOWNTIME_STATE_FILE", global = true)]
    pub state_file: Option<PathBuf>,

    /// Output format [default: `defaults.output` from config, else table]
    #[arg(long, short = 'o', env = "DOWNTIME_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: `defaults.color` from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

impl GlobalOpts {
    pub fn output(&self) -> &OutputFormat {
        self.output.as_ref().unwrap_or(&OutputFormat::Table)
    }

    pub fn color(&self) -> &ColorMode {
        self.color.as_ref().unwrap_or(&ColorMode::Auto)
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// When the logger session is stopped and cleared during a query.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReleaseArg {
    /// As soon as any device finishes
    PerDevice,
    /// Once every device has finished
    AllDone,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Query the logger and report downtime for every device row
    #[command(alias = "q", alias = "get")]
    Query(QueryArgs),

    /// Edit the persisted device rows
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Show or set the persisted time window
    #[command(alias = "w")]
    Window(WindowArgs),

    /// Print the URL that reproduces the current window and devices
    Share,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Window bounds ────────────────────────────────────────────────────

/// Time bounds shared by `query` and `window`.
#[derive(Debug, Args)]
pub struct WindowBounds {
    /// Window start (RFC 3339, or local "YYYY-MM-DDTHH:MM")
    #[arg(long)]
    pub t1: Option<String>,

    /// Window end (RFC 3339, or local "YYYY-MM-DDTHH:MM")
    #[arg(long)]
    pub t2: Option<String>,

    /// Window of this length ending at --t2 or now (e.g. "3d", "12h 30m")
    #[arg(long, conflicts_with = "t1")]
    pub last: Option<String>,
}

// ── Query ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[command(flatten)]
    pub window: WindowBounds,

    /// Device row(s) to query instead of the persisted ones (repeatable)
    #[arg(long, short = 'd', value_name = "DRF")]
    pub device: Vec<String>,

    /// Load window and devices from a shared URL
    #[arg(long, value_name = "SHARE_URL")]
    pub url: Option<String>,

    /// Override the release policy
    #[arg(long, value_enum)]
    pub release: Option<ReleaseArg>,

    /// Give up on devices still streaming after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List device rows
    #[command(alias = "ls")]
    List,

    /// Add a device row; without DRF, copies the last row
    Add {
        /// Row as device[@event,rate[,clock,delay]][@threshold]
        ///
        /// The row's threshold (default 0) decides which readings count as
        /// down; it is not sent to the logger.
        drf: Option<String>,
    },

    /// Remove a device row by index
    #[command(alias = "rm")]
    Remove {
        /// Row index as shown by `devices list`
        index: usize,
    },
}

// ── Window ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WindowArgs {
    #[command(flatten)]
    pub bounds: WindowBounds,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a starter config file for the active profile
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
