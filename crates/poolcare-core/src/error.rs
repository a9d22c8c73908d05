// ── Core error types ──
//
// User-facing errors from poolcare-core. Consumers never see raw HTTP
// bodies or JSON parse failures; `From<poolcare_api::Error>` translates
// transport-layer errors into domain variants. Cloneable so one failure
// can be shared by every caller of a coalesced refresh.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the pool service at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request to the pool service timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("No pool device is registered on this account")]
    NoDevicesFound,

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<poolcare_api::Error> for CoreError {
    fn from(err: poolcare_api::Error) -> Self {
        match err {
            poolcare_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            poolcare_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            poolcare_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            poolcare_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            poolcare_api::Error::Request { status, body } => CoreError::Api {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                },
                status: Some(status),
            },
            poolcare_api::Error::Signing(msg) => {
                CoreError::Internal(format!("Request signing failed: {msg}"))
            }
            poolcare_api::Error::NoDevicesFound => CoreError::NoDevicesFound,
            poolcare_api::Error::DegradedResponse { status } => CoreError::Api {
                message: format!("measurement service reported status {status:?}"),
                status: None,
            },
            poolcare_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
