// VirtualPoolCare HTTP client
//
// Wraps `reqwest::Client` with base-URL handling and SigV4-signed JSON
// requests. Endpoint groups (auth, pools, measurements) are implemented
// as inherent methods in their own files so this module stays focused on
// transport mechanics.

use chrono::Utc;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::auth::Credentials;
use crate::error::Error;
use crate::signing;
use crate::transport::TransportConfig;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://vpc.virtualpoolcare.io/prod";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Raw HTTP client for the VirtualPoolCare API.
///
/// Holds no credentials: login returns them, and every signed call takes
/// them explicitly.
#[derive(Debug, Clone)]
pub struct PoolCareClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PoolCareClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the API root including the stage prefix
    /// (e.g. [`DEFAULT_BASE_URL`]).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The API root.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/{path}`. `path` may carry a fixed query string.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// `{base}/{seg}/{seg}/...` with every segment percent-encoded.
    pub(crate) fn endpoint_segments(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Signed requests ──────────────────────────────────────────────

    /// Send a SigV4-signed request and return the decoded JSON body.
    ///
    /// Every request carries `Content-Type: application/json`. Non-2xx
    /// responses become [`Error::Request`].
    pub async fn signed_request(
        &self,
        method: Method,
        url: Url,
        credentials: &Credentials,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        self.send_signed(method, url, credentials, body).await
    }

    /// Signed GET decoded straight into `T`.
    pub(crate) async fn signed_get<T: DeserializeOwned>(
        &self,
        url: Url,
        credentials: &Credentials,
    ) -> Result<T, Error> {
        self.send_signed(Method::GET, url, credentials, None).await
    }

    async fn send_signed<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        credentials: &Credentials,
        body: Option<&Value>,
    ) -> Result<T, Error> {
        let payload = match body {
            Some(value) => serde_json::to_vec(value)
                .map_err(|e| Error::Signing(format!("failed to encode body: {e}")))?,
            None => Vec::new(),
        };

        let signed = signing::sign(
            &credentials.signing_params(),
            method.as_str(),
            &url,
            Some(JSON_CONTENT_TYPE),
            &payload,
            Utc::now(),
        )?;

        debug!("{} {}", method, url);

        let mut builder = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        for (name, value) in signed.to_header_pairs() {
            builder = builder.header(name, value);
        }
        if !payload.is_empty() {
            builder = builder.body(payload);
        }

        let resp = builder.send().await.map_err(Error::Transport)?;
        Self::parse_json(resp).await
    }

    /// Check the status and decode the JSON body.
    async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Request {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        trace!(bytes = body.len(), "response body received");

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> PoolCareClient {
        PoolCareClient::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn endpoint_joins_with_stage_prefix() {
        let c = client(DEFAULT_BASE_URL);
        assert_eq!(
            c.endpoint("user/login").unwrap().as_str(),
            "https://vpc.virtualpoolcare.io/prod/user/login"
        );

        let c = client("https://vpc.virtualpoolcare.io/prod/");
        assert_eq!(
            c.endpoint("user/login").unwrap().as_str(),
            "https://vpc.virtualpoolcare.io/prod/user/login"
        );
    }

    #[test]
    fn endpoint_segments_are_encoded() {
        let c = client("https://vpc.virtualpoolcare.io/prod/");
        let url = c
            .endpoint_segments(&["swimming_pool", "p 1", "blue", "k/2", "lastMeasurements"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://vpc.virtualpoolcare.io/prod/swimming_pool/p%201/blue/k%2F2/lastMeasurements"
        );
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        assert_eq!(preview(&long).chars().count(), 200);
    }
}
