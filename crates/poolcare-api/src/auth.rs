// Account login
//
// `POST /user/login` exchanges the account e-mail and password for a
// short-lived AWS credential triple. Nothing is cached here: the caller
// decides how long a credential set lives.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::client::PoolCareClient;
use crate::error::Error;
use crate::models::LoginResponse;
use crate::signing::{SERVICE, SigningParams};

/// Delegated credentials returned by a successful login.
///
/// Secret parts are wrapped in [`SecretString`] so `Debug` output never
/// leaks them.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: SecretString,
    pub session_token: SecretString,
    /// Signing region, taken from the `identity_id` prefix.
    pub region: String,
    pub identity_id: String,
    pub obtained_at: DateTime<Utc>,
}

impl Credentials {
    /// Build credentials from a decoded login response.
    ///
    /// Fails with [`Error::Authentication`] if `credentials` or
    /// `identity_id` (or any key inside `credentials`) is missing.
    pub fn from_login(resp: LoginResponse, obtained_at: DateTime<Utc>) -> Result<Self, Error> {
        let malformed = |what: &str| Error::Authentication {
            message: format!("malformed login response: missing {what}"),
        };

        let creds = resp.credentials.ok_or_else(|| malformed("credentials"))?;
        let identity_id = resp.identity_id.ok_or_else(|| malformed("identity_id"))?;
        let access_key = creds
            .access_key
            .ok_or_else(|| malformed("credentials.access_key"))?;
        let secret_key = creds
            .secret_key
            .ok_or_else(|| malformed("credentials.secret_key"))?;
        let session_token = creds
            .session_token
            .ok_or_else(|| malformed("credentials.session_token"))?;

        let region = region_from_identity(&identity_id);
        if region.is_empty() {
            return Err(Error::Authentication {
                message: format!("identity_id {identity_id:?} carries no region"),
            });
        }

        Ok(Self {
            access_key,
            secret_key: SecretString::from(secret_key),
            session_token: SecretString::from(session_token),
            region: region.to_owned(),
            identity_id,
            obtained_at,
        })
    }

    /// Signing parameters for the pool API.
    pub fn signing_params(&self) -> SigningParams<'_> {
        SigningParams {
            access_key: &self.access_key,
            secret_key: self.secret_key.expose_secret(),
            session_token: Some(self.session_token.expose_secret()),
            region: &self.region,
            service: SERVICE,
        }
    }
}

/// The region is everything before the first `:` of a Cognito identity
/// id (`eu-west-1:abc` → `eu-west-1`), or the whole id if there is none.
pub fn region_from_identity(identity_id: &str) -> &str {
    identity_id
        .split_once(':')
        .map_or(identity_id, |(region, _)| region)
}

impl PoolCareClient {
    /// Log in with the account e-mail and password.
    ///
    /// `POST /user/login` with `{"email": ..., "password": ...}`. Any
    /// non-2xx status or a response without `credentials` / `identity_id`
    /// is an [`Error::Authentication`]. No retry.
    pub async fn authenticate(
        &self,
        account: &str,
        secret: &SecretString,
    ) -> Result<Credentials, Error> {
        let url = self.endpoint("user/login")?;

        debug!("logging in at {}", url);

        let body = json!({
            "email": account,
            "password": secret.expose_secret(),
        });

        let resp = self
            .http()
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {body}"),
            });
        }

        let text = resp.text().await.map_err(Error::Transport)?;
        let login: LoginResponse =
            serde_json::from_str(&text).map_err(|e| Error::Authentication {
                message: format!("malformed login response: {e}"),
            })?;

        let credentials = Credentials::from_login(login, Utc::now())?;
        debug!(region = %credentials.region, "login successful");
        Ok(credentials)
    }
}
