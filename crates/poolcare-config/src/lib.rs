//! Configuration for the poolcare CLI.
//!
//! TOML profiles, secret resolution (env + keyring + plaintext), and
//! translation to `poolcare_core::PoolConfig`. The CLI adds flag-aware
//! wrappers on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
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

use poolcare_core::{DEFAULT_BASE_URL, DEFAULT_POLL_INTERVAL_HOURS, PoolConfig, TlsMode};

/// Keyring service name under which account passwords are stored.
pub const KEYRING_SERVICE: &str = "poolcare";

/// Env var holding the account password when no `secret_env` is set.
pub const SECRET_ENV: &str = "POOLCARE_SECRET";

/// Env var that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "POOLCARE_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("no account configured for profile '{profile}'")]
    NoAccount { profile: String },

    #[error("no secret configured for profile '{profile}'")]
    NoCredentials { profile: String },

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
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Profile name to use: the override, else `default_profile`, else
    /// `"default"`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_poll_interval_hours")]
    pub poll_interval_hours: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            poll_interval_hours: default_poll_interval_hours(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_poll_interval_hours() -> u64 {
    DEFAULT_POLL_INTERVAL_HOURS
}

/// A named account profile.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Account e-mail.
    pub account: Option<String>,

    /// Account password (plaintext, prefer keyring or env var).
    pub secret: Option<String>,

    /// Environment variable name containing the password.
    pub secret_env: Option<String>,

    /// Override the poll interval (1–24 hours).
    pub poll_interval_hours: Option<u64>,

    /// Override the request timeout (seconds).
    pub timeout: Option<u64>,

    /// API root override (e.g. a staging stage).
    pub base_url: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `POOLCARE_CONFIG`, else platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "poolcare", "poolcare").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("poolcare");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path` (if it exists), then `POOLCARE_*` env vars
/// (`__` separates nesting levels, e.g. `POOLCARE_DEFAULTS__TIMEOUT`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("POOLCARE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Validation ──────────────────────────────────────────────────────

/// Check everything that can be checked without secrets or network.
pub fn validate_profile(profile: &Profile, defaults: &Defaults) -> Result<(), ConfigError> {
    poll_interval(profile, defaults)?;
    base_url(profile)?;
    if profile.timeout.unwrap_or(defaults.timeout) == 0 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(())
}

fn poll_interval(profile: &Profile, defaults: &Defaults) -> Result<Duration, ConfigError> {
    let hours = profile
        .poll_interval_hours
        .unwrap_or(defaults.poll_interval_hours);
    poolcare_core::poll_interval_from_hours(hours).map_err(|e| ConfigError::Validation {
        field: "poll_interval_hours".into(),
        reason: e.to_string(),
    })
}

/// The profile's API root, or the production default.
pub fn base_url(profile: &Profile) -> Result<Url, ConfigError> {
    let raw = profile.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
    Url::parse(raw).map_err(|e| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("{raw}: {e}"),
    })
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Keyring user name for a profile's password.
pub fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/secret")
}

pub fn resolve_account(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .account
        .clone()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ConfigError::NoAccount {
            profile: profile_name.into(),
        })
}

/// Resolve the account password from the credential chain.
pub fn resolve_secret(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's secret_env → env var lookup
    if let Some(val) = profile
        .secret_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Ok(SecretString::from(val));
    }

    // 2. POOLCARE_SECRET
    if let Ok(val) = std::env::var(SECRET_ENV) {
        return Ok(SecretString::from(val));
    }

    // 3. System keyring
    if let Some(secret) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))
        .ok()
        .and_then(|entry| entry.get_password().ok())
    {
        return Ok(SecretString::from(secret));
    }

    // 4. Plaintext in config
    if let Some(ref secret) = profile.secret {
        return Ok(SecretString::from(secret.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Build a `PoolConfig` from a profile, no CLI flag overrides.
pub fn profile_to_pool_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<PoolConfig, ConfigError> {
    validate_profile(profile, defaults)?;

    let account = resolve_account(profile, profile_name)?;
    let secret = resolve_secret(profile, profile_name)?;

    let mut config = PoolConfig::new(account, secret, base_url(profile)?);
    config.poll_interval = poll_interval(profile, defaults)?;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    if let Some(ref ca_path) = profile.ca_cert {
        config.tls = TlsMode::CustomCa(ca_path.clone());
    }

    Ok(config)
}
