//! Config subcommand handlers.

use poolcare_config::{KEYRING_SERVICE, keyring_user};
use poolcare_core::{MAX_POLL_INTERVAL_HOURS, MIN_POLL_INTERVAL_HOURS, PollingCoordinator};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

const SETTABLE_KEYS: &str = "account, secret_env, poll_interval_hours, timeout, base_url, ca_cert";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of the config with plaintext secrets masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.secret.is_some() {
            profile.secret = Some(REDACTED.into());
        }
    }
    cfg
}

fn parse_number(field: &str, value: &str) -> Result<u64, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("expected a whole number, got '{value}'"),
    })
}

fn apply_setting(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "account" => profile.account = Some(value),
        "secret_env" | "secret-env" => profile.secret_env = Some(value),
        "poll_interval_hours" | "poll-interval-hours" => {
            let hours = parse_number("poll_interval_hours", &value)?;
            if !(MIN_POLL_INTERVAL_HOURS..=MAX_POLL_INTERVAL_HOURS).contains(&hours) {
                return Err(CliError::Validation {
                    field: "poll_interval_hours".into(),
                    reason: format!(
                        "must be between {MIN_POLL_INTERVAL_HOURS} and {MAX_POLL_INTERVAL_HOURS}"
                    ),
                });
            }
            profile.poll_interval_hours = Some(hours);
        }
        "timeout" => {
            let secs = parse_number("timeout", &value)?;
            if secs == 0 {
                return Err(CliError::Validation {
                    field: "timeout".into(),
                    reason: "must be at least 1 second".into(),
                });
            }
            profile.timeout = Some(secs);
        }
        "base_url" | "base-url" => {
            url::Url::parse(&value).map_err(|e| CliError::Validation {
                field: "base_url".into(),
                reason: format!("{value}: {e}"),
            })?;
            profile.base_url = Some(value);
        }
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "secret" => {
            return Err(CliError::Validation {
                field: "secret".into(),
                reason: "use `poolcare config set-secret` to store the password".into(),
            });
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!("unknown config key '{other}'. Valid keys: {SETTABLE_KEYS}"),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let toml_str = toml::to_string_pretty(&cfg).map_err(|e| CliError::Config {
                message: format!("failed to render config: {e}"),
            })?;
            let out = output::render_single(
                global.output,
                &cfg,
                |_| toml_str.trim_end().to_owned(),
                |_| toml_str.trim_end().to_owned(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            apply_setting(profile, &key, value)?;

            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        // ── SetSecret ───────────────────────────────────────────────
        ConfigCommand::SetSecret { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile
                .or_else(|| global.profile.clone())
                .unwrap_or_else(|| config::active_profile_name(global, &cfg));

            let secret = rpassword::prompt_password(format!(
                "Password for profile '{profile_name}': "
            ))?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "secret".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(&profile_name))
                .map_err(|e| CliError::Keyring {
                    reason: format!("failed to access keyring: {e}"),
                })?;
            entry.set_password(&secret).map_err(|e| CliError::Keyring {
                reason: format!("failed to store password: {e}"),
            })?;

            if !global.quiet {
                eprintln!("Password stored in system keyring for profile '{profile_name}'");
            }
            Ok(())
        }

        // ── Validate ────────────────────────────────────────────────
        ConfigCommand::Validate => {
            let color = output::should_color(global.color);
            let pool_config = config::resolve_pool_config(global)?;
            let account = pool_config.masked_account();

            let snapshot = PollingCoordinator::oneshot(pool_config).await?;
            if !global.quiet {
                let device = snapshot.device_serial().unwrap_or("unknown device");
                println!(
                    "{} {account}: logged in, device {device}, {} sensor(s)",
                    output::status_marker(true, color),
                    snapshot.sensor_keys().len()
                );
            }
            Ok(())
        }
    }
}
