// Wire types for the VirtualPoolCare API
//
// Field names follow the JSON exactly. Everything the server may omit is
// an `Option` so a missing field becomes a domain decision, not a serde
// failure.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// `POST /user/login` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub credentials: Option<LoginCredentials>,
    pub identity_id: Option<String>,
}

/// Delegated AWS credentials inside the login response.
#[derive(Clone, Deserialize)]
pub struct LoginCredentials {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("access_key", &self.access_key)
            .finish_non_exhaustive()
    }
}

/// `GET /pools` response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolsResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<RawPool>,
}

/// One pool entry. Only the two addressing fields are used; the rest is
/// kept for callers that want to inspect it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPool {
    pub pool_id: Option<String>,
    pub blue_key: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// `GET /swimming_pool/{pool_id}/blue/{blue_key}/lastMeasurements` response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LastMeasurements {
    pub status: Option<String>,
    pub blue_device_serial: Option<String>,
    pub last_blue_measure_timestamp: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<RawMeasurement>,
}

impl LastMeasurements {
    /// The status value the service uses for a usable measurement set.
    pub const STATUS_OK: &'static str = "OK";

    /// Fail with [`DegradedResponse`](crate::Error::DegradedResponse)
    /// unless the envelope status is `"OK"`.
    pub fn ensure_ok(self) -> Result<Self, crate::Error> {
        if self.status.as_deref() == Some(Self::STATUS_OK) {
            return Ok(self);
        }
        Err(crate::Error::DegradedResponse {
            status: self.status.unwrap_or_else(|| "<missing>".into()),
        })
    }
}

/// A `null` list decodes as empty, same as a missing one.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One raw sensor record. Older firmware omits the gauge and threshold
/// fields, so all of them are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMeasurement {
    pub name: Option<String>,
    #[serde(default)]
    pub value: Value,
    pub timestamp: Option<String>,
    pub expired: Option<bool>,
    pub trend: Option<String>,
    pub gauge_min: Option<Value>,
    pub gauge_max: Option<Value>,
    pub ok_min: Option<Value>,
    pub ok_max: Option<Value>,
    pub warning_low: Option<Value>,
    pub warning_high: Option<Value>,
    pub priority: Option<Value>,
}

impl RawMeasurement {
    /// Threshold attributes in the order they appear in the API, paired
    /// with the suffix used for snapshot keys. Absent fields are skipped.
    pub fn thresholds(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        [
            ("gauge_min", self.gauge_min.as_ref()),
            ("gauge_max", self.gauge_max.as_ref()),
            ("ok_min", self.ok_min.as_ref()),
            ("ok_max", self.ok_max.as_ref()),
            ("warning_low", self.warning_low.as_ref()),
            ("warning_high", self.warning_high.as_ref()),
            ("priority", self.priority.as_ref()),
        ]
        .into_iter()
        .filter_map(|(attr, value)| value.filter(|v| !v.is_null()).map(|v| (attr, v)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn ensure_ok_accepts_ok_status() {
        let resp: LastMeasurements = serde_json::from_value(json!({"status": "OK"})).unwrap();
        assert!(resp.ensure_ok().is_ok());
    }

    #[test]
    fn ensure_ok_rejects_other_and_missing_status() {
        let resp: LastMeasurements = serde_json::from_value(json!({"status": "KO"})).unwrap();
        let err = resp.ensure_ok().unwrap_err();
        assert!(matches!(err, crate::Error::DegradedResponse { ref status } if status == "KO"));

        let resp: LastMeasurements = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            resp.ensure_ok(),
            Err(crate::Error::DegradedResponse { .. })
        ));
    }

    #[test]
    fn null_data_lists_decode_as_empty() {
        let resp: LastMeasurements =
            serde_json::from_value(json!({"status": "KO", "data": null})).unwrap();
        assert!(resp.data.is_empty());
        assert!(matches!(
            resp.ensure_ok(),
            Err(crate::Error::DegradedResponse { ref status }) if status == "KO"
        ));

        let pools: PoolsResponse = serde_json::from_value(json!({"data": null})).unwrap();
        assert!(pools.data.is_empty());
    }

    #[test]
    fn missing_value_deserializes_as_null() {
        let raw: RawMeasurement = serde_json::from_value(json!({"name": "ph"})).unwrap();
        assert!(raw.value.is_null());
    }

    #[test]
    fn thresholds_skip_absent_and_null_fields() {
        let raw: RawMeasurement = serde_json::from_value(json!({
            "name": "ph",
            "value": 7.2,
            "ok_min": 7.0,
            "ok_max": 7.6,
            "warning_high": null,
        }))
        .unwrap();
        let attrs: Vec<_> = raw.thresholds().map(|(a, _)| a).collect();
        assert_eq!(attrs, vec!["ok_min", "ok_max"]);
    }
}
