// ── Runtime polling configuration ──
//
// These types describe *what* to poll and *how often*. They carry
// credential data and connection tuning, but never touch disk.
// The CLI constructs a `PoolConfig` and hands it in.

use std::time::Duration;

use poolcare_api::{TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// Shortest allowed poll interval, in hours.
pub const MIN_POLL_INTERVAL_HOURS: u64 = 1;
/// Longest allowed poll interval, in hours.
pub const MAX_POLL_INTERVAL_HOURS: u64 = 24;
/// Poll interval used when none is configured, in hours.
pub const DEFAULT_POLL_INTERVAL_HOURS: u64 = 6;

/// Configuration for polling a single account.
///
/// Built by the CLI, passed to `PollingCoordinator`; core never reads
/// config files.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Account e-mail used for login.
    pub account: String,
    /// Account password.
    pub secret: SecretString,
    /// API root, stage prefix included.
    pub base_url: Url,
    /// Time between scheduled cycles.
    pub poll_interval: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
    /// TLS verification strategy.
    pub tls: TlsMode,
}

impl PoolConfig {
    /// Config with the default interval and timeout.
    pub fn new(account: impl Into<String>, secret: SecretString, base_url: Url) -> Self {
        Self {
            account: account.into(),
            secret,
            base_url,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_HOURS * 3600),
            timeout: TransportConfig::default().timeout,
            tls: TlsMode::System,
        }
    }

    /// Set the poll interval in whole hours, rejecting values outside
    /// `[1, 24]`.
    pub fn with_poll_interval_hours(mut self, hours: u64) -> Result<Self, CoreError> {
        self.poll_interval = poll_interval_from_hours(hours)?;
        Ok(self)
    }

    /// Transport settings for the HTTP client.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        }
    }

    /// The account with the local part mostly hidden, for log lines.
    pub fn masked_account(&self) -> String {
        mask_account(&self.account)
    }
}

/// Validate an hour count and turn it into a `Duration`.
pub fn poll_interval_from_hours(hours: u64) -> Result<Duration, CoreError> {
    if !(MIN_POLL_INTERVAL_HOURS..=MAX_POLL_INTERVAL_HOURS).contains(&hours) {
        return Err(CoreError::Config {
            message: format!(
                "poll interval must be between {MIN_POLL_INTERVAL_HOURS} and \
                 {MAX_POLL_INTERVAL_HOURS} hours, got {hours}"
            ),
        });
    }
    Ok(Duration::from_secs(hours * 3600))
}

/// `alice@example.com` → `a***@example.com`.
pub fn mask_account(account: &str) -> String {
    match account.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            format!("{first}***@{domain}")
        }
        None => "***".into(),
    }
}
