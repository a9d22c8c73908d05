//! CLI configuration: thin wrapper around `poolcare_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--account, --interval-hours, --timeout, --base-url).

use poolcare_core::PoolConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use poolcare_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Active profile with CLI flags layered on top.
///
/// An explicitly requested profile must exist; the implicit default may
/// be missing, in which case flags and env vars supply everything.
pub fn effective_profile(
    global: &GlobalOpts,
    config: &Config,
) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, config);

    let mut profile = match config.profile(&name) {
        Ok(profile) => profile.clone(),
        Err(_) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(config),
                name,
            });
        }
        Err(_) => Profile::default(),
    };

    if let Some(ref account) = global.account {
        profile.account = Some(account.clone());
    }
    if let Some(hours) = global.interval_hours {
        profile.poll_interval_hours = Some(hours);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    if let Some(ref base_url) = global.base_url {
        profile.base_url = Some(base_url.clone());
    }

    Ok((name, profile))
}

/// Translate config file + profile + flags into a `PoolConfig`.
pub fn resolve_pool_config(global: &GlobalOpts) -> Result<PoolConfig, CliError> {
    let cfg = load_config_or_default();
    let (name, profile) = effective_profile(global, &cfg)?;
    Ok(poolcare_config::profile_to_pool_config(
        &profile,
        &name,
        &cfg.defaults,
    )?)
}

pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config
            .profiles
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["poolcare"];
        argv.extend_from_slice(args);
        argv.push("fetch");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with_home() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                account: Some("home@example.com".into()),
                poll_interval_hours: Some(3),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn flags_override_profile_values() {
        let cfg = config_with_home();
        let opts = global(&[
            "--profile",
            "home",
            "--account",
            "flag@example.com",
            "--interval-hours",
            "8",
        ]);

        let (name, profile) = effective_profile(&opts, &cfg).unwrap();

        assert_eq!(name, "home");
        assert_eq!(profile.account.as_deref(), Some("flag@example.com"));
        assert_eq!(profile.poll_interval_hours, Some(8));
    }

    #[test]
    fn missing_explicit_profile_is_an_error() {
        let cfg = config_with_home();
        let opts = global(&["--profile", "cabin"]);

        let err = effective_profile(&opts, &cfg).unwrap_err();
        assert!(
            matches!(err, CliError::ProfileNotFound { ref available, .. } if available == "home")
        );
    }

    #[test]
    fn missing_default_profile_falls_back_to_flags() {
        let cfg = Config::default();
        let opts = global(&["--account", "a@b.c"]);

        let (name, profile) = effective_profile(&opts, &cfg).unwrap();
        assert_eq!(name, "default");
        assert_eq!(profile.account.as_deref(), Some("a@b.c"));
    }
}
