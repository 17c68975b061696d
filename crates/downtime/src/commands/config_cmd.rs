//! Config subcommand handlers.

use std::collections::HashMap;

use downtime_config::{Config, Defaults, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: starter file from the global flags ────────────────
        ConfigCommand::Init { force } => {
            let config_path = downtime_config::config_path();
            if config_path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: config_path.display().to_string(),
                });
            }

            let profile_name = global.profile.clone().unwrap_or_else(|| "default".into());
            if let Some(ref logger) = global.logger {
                downtime_config::parse_url("logger", logger)?;
            }
            if let Some(ref base) = global.share_base {
                downtime_config::parse_url("share_base", base)?;
            }

            let profile = Profile {
                logger: global.logger.clone(),
                share_base: global.share_base.clone(),
                state_file: global.state_file.clone(),
                ..Profile::default()
            };

            let mut profiles = HashMap::new();
            profiles.insert(profile_name.clone(), profile);

            let cfg = Config {
                default_profile: Some(profile_name.clone()),
                defaults: Defaults::default(),
                profiles,
            };
            downtime_config::save_config_to(&cfg, &config_path)?;

            if !global.quiet {
                eprintln!("✓ Configuration written to {}", config_path.display());
                eprintln!("  Active profile: {profile_name}");
                if global.logger.is_none() {
                    eprintln!("  Set a logger URL with: downtime config init --force --logger <URL>");
                }
            }
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = downtime_config::load_config()?;
            let out = output::render_single(
                global.output(),
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("{c:#?}\n# {e}")),
                |_| downtime_config::config_path().display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&downtime_config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}
