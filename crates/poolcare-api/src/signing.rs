// AWS Signature Version 4 request signing
//
// The pool service sits behind API Gateway, so every call after login is
// signed with the delegated credentials for service `execute-api`.
// `sign` is pure: the timestamp is an input, never read from the clock.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::Error;

type HmacSha256 = Hmac<Sha256>;

/// Service name the pool API is signed for.
pub const SERVICE: &str = "execute-api";

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Key material and scope for one signature.
#[derive(Clone, Copy)]
pub struct SigningParams<'a> {
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub session_token: Option<&'a str>,
    pub region: &'a str,
    pub service: &'a str,
}

impl std::fmt::Debug for SigningParams<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningParams")
            .field("access_key", &self.access_key)
            .field("region", &self.region)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

/// Headers produced by [`sign`]; the caller attaches them verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub host: String,
    pub amz_date: String,
    pub security_token: Option<String>,
    pub authorization: String,
}

impl SignedHeaders {
    /// `(name, value)` pairs in the order they should be sent.
    ///
    /// `host` is omitted: reqwest derives it from the URL, and the value
    /// we signed is computed the same way.
    pub fn to_header_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            ("x-amz-date", self.amz_date.as_str()),
            ("authorization", self.authorization.as_str()),
        ];
        if let Some(token) = self.security_token.as_deref() {
            pairs.push(("x-amz-security-token", token));
        }
        pairs
    }
}

/// Sign a request.
///
/// Covers the method, canonical URI and query, the `content-type`,
/// `host`, `x-amz-date` and (when present) `x-amz-security-token`
/// headers, and the SHA-256 of `body`.
pub fn sign(
    params: &SigningParams<'_>,
    method: &str,
    url: &Url,
    content_type: Option<&str>,
    body: &[u8],
    at: DateTime<Utc>,
) -> Result<SignedHeaders, Error> {
    let host = host_header(url)?;
    let amz_date = at.format("%Y%m%dT%H%M%SZ").to_string();
    let date = at.format("%Y%m%d").to_string();

    let mut headers: BTreeMap<&str, String> = BTreeMap::new();
    if let Some(ct) = content_type {
        headers.insert("content-type", ct.trim().to_owned());
    }
    headers.insert("host", host.clone());
    headers.insert("x-amz-date", amz_date.clone());
    if let Some(token) = params.session_token {
        headers.insert("x-amz-security-token", token.trim().to_owned());
    }

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_headers = headers.keys().copied().collect::<Vec<_>>().join(";");

    let canonical_request = format!(
        "{method}\n{uri}\n{query}\n{canonical_headers}\n{signed_headers}\n{payload}",
        method = method.to_ascii_uppercase(),
        uri = canonical_uri(url),
        query = canonical_query(url),
        payload = hex::encode(Sha256::digest(body)),
    );

    let scope = format!(
        "{date}/{region}/{service}/aws4_request",
        region = params.region,
        service = params.service,
    );
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let key = derive_signing_key(params.secret_key, &date, params.region, params.service)?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    Ok(SignedHeaders {
        host,
        amz_date,
        security_token: params.session_token.map(str::to_owned),
        authorization: format!(
            "{ALGORITHM} Credential={access}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            access = params.access_key,
        ),
    })
}

/// Derive the per-day, per-region, per-service signing key.
pub fn derive_signing_key(
    secret_key: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, Error> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| Error::Signing(format!("bad key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn host_header(url: &Url) -> Result<String, Error> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::Signing(format!("URL has no host: {url}")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

/// Each path segment URI-encoded, `/` kept. The path from `Url` is already
/// percent-encoded once, so `%` is encoded again as the scheme requires
/// for non-S3 services.
fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        return "/".into();
    }
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            (
                urlencoding::encode(&k).into_owned(),
                urlencoding::encode(&v).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}
