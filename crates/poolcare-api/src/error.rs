use thiserror::Error;

/// Top-level error type for the `poolcare-api` crate.
///
/// Covers every failure mode of one poll cycle: login, transport,
/// signed requests, device discovery and the measurement envelope.
/// `poolcare-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected, or the login response was missing fields.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Signed requests ─────────────────────────────────────────────
    /// Non-2xx response to a signed request.
    #[error("Request failed (HTTP {status}): {body}")]
    Request { status: u16, body: String },

    /// The request could not be signed (bad header value, unusable key).
    #[error("Request signing failed: {0}")]
    Signing(String),

    // ── Discovery ───────────────────────────────────────────────────
    /// The account has no pools on the first result page.
    #[error("No pool devices found for this account")]
    NoDevicesFound,

    // ── Measurements ────────────────────────────────────────────────
    /// The measurement envelope carried a status other than `"OK"`.
    ///
    /// This is a documented server condition, not a transport failure;
    /// callers normally downgrade it to an empty result.
    #[error("Measurement service reported status {status:?}")]
    DegradedResponse { status: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying on the
    /// next tick.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Request { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the addressed resource no longer exists or is no
    /// longer visible to the account.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Request { status: 403 | 404, .. })
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
