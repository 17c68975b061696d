//! Shared configuration for the downtime CLI.
//!
//! TOML profiles naming a logger endpoint and query defaults, platform
//! paths for the config and state files, and resolution of the optional
//! logger token (env + keyring + plaintext).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use downtime_core::{DEFAULT_THRESHOLD, QueryOptions, ReleasePolicy};

const APP: &str = "downtime";
const KEYRING_SERVICE: &str = "downtime";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{profile}'")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named logger profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// The profile to use: `requested`, else `default_profile`, else "default".
    pub fn profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    /// Look up a profile. The implicit "default" profile may be absent.
    pub fn profile(&self, name: &str) -> Result<Option<&Profile>, ConfigError> {
        match self.profiles.get(name) {
            Some(p) => Ok(Some(p)),
            None if name == "default" => Ok(None),
            None => Err(ConfigError::UnknownProfile {
                profile: name.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// `per-device` or `all-done`.
    #[serde(default = "default_release")]
    pub release: String,

    /// Used when a device row's threshold is not a number.
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,

    /// Query deadline in seconds; 0 waits indefinitely.
    #[serde(default)]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            release: default_release(),
            default_threshold: default_threshold(),
            timeout: 0,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_release() -> String {
    ReleasePolicy::default().to_string()
}
fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// A named logger profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Logger WebSocket endpoint (e.g., "wss://logger.example.org/stream").
    pub logger: Option<String>,

    /// Page URL that share links are built on.
    pub share_base: Option<String>,

    /// Bearer token (plaintext, prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the token.
    pub token_env: Option<String>,

    /// Override the query state file.
    pub state_file: Option<PathBuf>,

    /// Override the release policy.
    pub release: Option<String>,

    /// Override the fallback threshold.
    pub default_threshold: Option<f64>,

    /// Override the query deadline.
    pub timeout: Option<u64>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", APP, APP)
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where a profile's query state lives unless overridden.
pub fn state_path(profile_name: &str) -> PathBuf {
    let file = if profile_name == "default" {
        "state.json".to_owned()
    } else {
        format!("state-{profile_name}.json")
    };
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join(&file),
        |dirs| dirs.data_dir().join(&file),
    )
}

fn dirs_fallback(base: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(base);
    p.push(APP);
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Environment keys use `DOWNTIME_` and `__` for nesting, e.g.
/// `DOWNTIME_DEFAULTS__RELEASE=per-device`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DOWNTIME_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Resolution ──────────────────────────────────────────────────────

/// Resolve the logger token, if any, from the credential chain.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token")) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile.token.clone().map(SecretString::from)
}

pub fn parse_release(value: &str) -> Result<ReleasePolicy, ConfigError> {
    ReleasePolicy::from_str(value).map_err(|_| ConfigError::Validation {
        field: "release".into(),
        reason: format!("expected 'per-device' or 'all-done', got '{value}'"),
    })
}

pub fn parse_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    value.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{value}': {e}"),
    })
}

/// Build query options from the defaults and an optional profile.
pub fn query_options(defaults: &Defaults, profile: Option<&Profile>) -> Result<QueryOptions, ConfigError> {
    let release = profile
        .and_then(|p| p.release.as_deref())
        .unwrap_or(&defaults.release);
    let timeout = profile
        .and_then(|p| p.timeout)
        .unwrap_or(defaults.timeout);

    Ok(QueryOptions {
        release: parse_release(release)?,
        default_threshold: profile
            .and_then(|p| p.default_threshold)
            .unwrap_or(defaults.default_threshold),
        deadline: (timeout > 0).then(|| Duration::from_secs(timeout)),
    })
}
