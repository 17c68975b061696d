//! Flag-aware resolution on top of `downtime-config`.
//!
//! Global flags win over the active profile, which wins over built-in
//! defaults. Core only ever sees the resolved `Page`, `QueryOptions` and
//! logger URL.

use std::path::PathBuf;

use clap::ValueEnum;
use secrecy::SecretString;
use url::Url;

use downtime_config::{Config, Defaults, Profile};
use downtime_core::{FileStore, Page, QueryOptions, WsLogger};

use crate::cli::{GlobalOpts, ReleaseArg};
use crate::error::CliError;

/// Share base used when neither a flag nor the profile names one.
pub const DEFAULT_SHARE_BASE: &str = "https://localhost/downtime/";

/// Loaded configuration plus the profile the flags select.
pub struct Resolved {
    pub config: Config,
    pub profile_name: String,
}

impl Resolved {
    pub fn load(global: &GlobalOpts) -> Result<Self, CliError> {
        let config = downtime_config::load_config()?;
        let profile_name = config.profile_name(global.profile.as_deref());
        let resolved = Self {
            config,
            profile_name,
        };
        resolved.profile().map_err(|_| resolved.profile_not_found())?;
        Ok(resolved)
    }

    pub fn profile(&self) -> Result<Option<&Profile>, CliError> {
        Ok(self.config.profile(&self.profile_name)?)
    }

    fn profile_not_found(&self) -> CliError {
        let mut available: Vec<_> = self.config.profiles.keys().cloned().collect();
        available.sort();
        CliError::ProfileNotFound {
            name: self.profile_name.clone(),
            available: if available.is_empty() {
                "(none)".into()
            } else {
                available.join(", ")
            },
        }
    }

    // ── Paths and URLs ───────────────────────────────────────────────

    /// State file: flag > profile > platform data dir.
    pub fn state_file(&self, global: &GlobalOpts) -> Result<PathBuf, CliError> {
        if let Some(ref path) = global.state_file {
            return Ok(path.clone());
        }
        Ok(self
            .profile()?
            .and_then(|p| p.state_file.clone())
            .unwrap_or_else(|| downtime_config::state_path(&self.profile_name)))
    }

    /// Share base: flag > profile > built-in default.
    pub fn share_base(&self, global: &GlobalOpts) -> Result<Url, CliError> {
        let profile_base = self.profile()?.and_then(|p| p.share_base.as_deref());
        let base = global
            .share_base
            .as_deref()
            .or(profile_base)
            .unwrap_or(DEFAULT_SHARE_BASE);
        Ok(downtime_config::parse_url("share_base", base)?)
    }

    /// Logger endpoint: flag > profile. There is no default.
    pub fn logger_url(&self, global: &GlobalOpts) -> Result<Url, CliError> {
        let profile_logger = self.profile()?.and_then(|p| p.logger.as_deref());
        let logger = global
            .logger
            .as_deref()
            .or(profile_logger)
            .ok_or_else(|| CliError::NoLogger {
                profile: self.profile_name.clone(),
            })?;
        Ok(downtime_config::parse_url("logger", logger)?)
    }

    fn token(&self) -> Result<Option<SecretString>, CliError> {
        Ok(self
            .profile()?
            .and_then(|p| downtime_config::resolve_token(p, &self.profile_name)))
    }

    // ── Builders ─────────────────────────────────────────────────────

    /// Open the page: `location` when given (a shared URL), otherwise the
    /// share base, backed by the resolved state file.
    pub fn open_page(
        &self,
        global: &GlobalOpts,
        location: Option<&str>,
    ) -> Result<Page<FileStore>, CliError> {
        let location = match location {
            Some(url) => downtime_config::parse_url("url", url)?,
            None => self.share_base(global)?,
        };
        let path = self.state_file(global)?;
        tracing::debug!(state_file = %path.display(), location = %location, "Opening page");
        let store = FileStore::open(path)?;
        Ok(Page::load(location, store))
    }

    pub fn logger(&self, global: &GlobalOpts) -> Result<WsLogger, CliError> {
        Ok(WsLogger::new(self.logger_url(global)?, self.token()?))
    }

    /// Query options from config, with per-invocation overrides.
    pub fn query_options(
        &self,
        release: Option<ReleaseArg>,
        timeout: Option<u64>,
    ) -> Result<QueryOptions, CliError> {
        let mut options = downtime_config::query_options(&self.config.defaults, self.profile()?)?;
        if let Some(release) = release {
            options.release = match release {
                ReleaseArg::PerDevice => downtime_core::ReleasePolicy::PerDevice,
                ReleaseArg::AllDone => downtime_core::ReleasePolicy::AllDone,
            };
        }
        if let Some(secs) = timeout {
            options.deadline = (secs > 0).then(|| std::time::Duration::from_secs(secs));
        }
        Ok(options)
    }
}

/// Fill `--output` and `--color` from `[defaults]` when neither the flag
/// nor its env var was given.
pub fn apply_display_defaults(global: &mut GlobalOpts, defaults: &Defaults) -> Result<(), CliError> {
    if global.output.is_none() {
        global.output = Some(parse_value("defaults.output", &defaults.output)?);
    }
    if global.color.is_none() {
        global.color = Some(parse_value("defaults.color", &defaults.color)?);
    }
    Ok(())
}

fn parse_value<T: ValueEnum>(field: &str, value: &str) -> Result<T, CliError> {
    T::from_str(value, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}
