// ── Measurement snapshot ──
//
// Flat key → value view of one measurement response. For a sensor `ph`
// the snapshot holds `ph`, `ph_timestamp`, `ph_expired`, optionally
// `ph_trend`, and one `ph_<threshold>` key per threshold the server sent.
// The set of primary sensor names is recorded while normalizing, never
// re-derived from key suffixes.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use poolcare_api::{LastMeasurements, RawMeasurement};
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::units;

/// Snapshot key holding the device serial number.
pub const DEVICE_SERIAL_KEY: &str = "device_serial";
/// Snapshot key holding the time of the last measurement upload.
pub const LAST_MEASUREMENT_KEY: &str = "last_measurement_timestamp";

const THRESHOLD_SUFFIXES: [&str; 7] = [
    "gauge_min",
    "gauge_max",
    "ok_min",
    "ok_max",
    "warning_low",
    "warning_high",
    "priority",
];

/// Trend value the service uses when it has no trend.
const UNDEFINED_TREND: &str = "undefined";

// ── Snapshot ─────────────────────────────────────────────────────

/// Immutable result of one successful fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    values: BTreeMap<String, Value>,
    sensors: BTreeSet<String>,
    fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// The snapshot published before the first successful fetch.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A snapshot with no sensors, stamped with the fetch time.
    pub fn empty_at(fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at: Some(fetched_at),
            ..Self::default()
        }
    }

    /// Normalize a measurement response.
    ///
    /// Records without a non-empty `name` or with a null `value` are
    /// skipped, as are records named like a metadata key. When a name
    /// repeats, the later record wins.
    pub fn from_measurements(resp: LastMeasurements, fetched_at: DateTime<Utc>) -> Self {
        let mut snapshot = Self::empty_at(fetched_at);

        if let Some(serial) = resp.blue_device_serial {
            snapshot
                .values
                .insert(DEVICE_SERIAL_KEY.into(), Value::String(serial));
        }
        if let Some(ts) = resp.last_blue_measure_timestamp {
            snapshot
                .values
                .insert(LAST_MEASUREMENT_KEY.into(), Value::String(ts));
        }

        for raw in resp.data {
            snapshot.insert_record(raw);
        }

        snapshot
    }

    fn insert_record(&mut self, raw: RawMeasurement) {
        let name = match raw.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => {
                debug!("skipping measurement record without a name");
                return;
            }
        };
        if raw.value.is_null() {
            debug!(sensor = %name, "skipping measurement record without a value");
            return;
        }
        if is_metadata_key(&name) {
            warn!(sensor = %name, "measurement name collides with a metadata key, skipping");
            return;
        }

        if !self.sensors.insert(name.clone()) {
            debug!(sensor = %name, "duplicate measurement record, keeping the later one");
            self.remove_derived(&name);
        }

        for (suffix, value) in raw.thresholds() {
            self.values.insert(format!("{name}_{suffix}"), value.clone());
        }
        if let Some(trend) = raw.trend.filter(|t| t != UNDEFINED_TREND) {
            self.values
                .insert(format!("{name}_trend"), Value::String(trend));
        }
        self.values.insert(
            format!("{name}_timestamp"),
            raw.timestamp.map_or(Value::Null, Value::String),
        );
        self.values.insert(
            format!("{name}_expired"),
            Value::Bool(raw.expired.unwrap_or(false)),
        );
        self.values.insert(name, raw.value);
    }

    fn remove_derived(&mut self, name: &str) {
        for suffix in THRESHOLD_SUFFIXES
            .iter()
            .chain(&["trend", "timestamp", "expired"])
        {
            self.values.remove(&format!("{name}_{suffix}"));
        }
    }

    // ── Accessors ────────────────────────────────────────────────

    /// `true` when the snapshot holds no keys at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Every key/value pair, sorted by key.
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Primary sensor names.
    pub fn sensor_keys(&self) -> &BTreeSet<String> {
        &self.sensors
    }

    pub fn device_serial(&self) -> Option<&str> {
        self.values.get(DEVICE_SERIAL_KEY).and_then(Value::as_str)
    }

    pub fn last_measurement_timestamp(&self) -> Option<&str> {
        self.values.get(LAST_MEASUREMENT_KEY).and_then(Value::as_str)
    }

    /// When the data was fetched; `None` for the initial empty snapshot.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    // ── Reading view ─────────────────────────────────────────────

    /// Everything known about one sensor, with freshness computed
    /// against `now`. `None` if `key` is not a sensor of this snapshot.
    pub fn reading(&self, key: &str, now: DateTime<Utc>) -> Option<SensorReading> {
        if !self.sensors.contains(key) {
            return None;
        }
        let value = self.values.get(key).cloned().unwrap_or(Value::Null);
        let derived = |suffix: &str| self.values.get(&format!("{key}_{suffix}"));

        let timestamp = derived("timestamp")
            .and_then(Value::as_str)
            .and_then(parse_timestamp);
        let age = timestamp.map(|ts| age_hours(ts, now));

        let mut thresholds = BTreeMap::new();
        for suffix in THRESHOLD_SUFFIXES.iter().filter(|s| **s != "priority") {
            if let Some(v) = derived(suffix) {
                thresholds.insert(*suffix, v.clone());
            }
        }

        Some(SensorReading {
            key: key.to_owned(),
            value,
            unit: units::unit_for(key),
            is_measurement: units::is_measurement(key),
            timestamp,
            expired: derived("expired").and_then(Value::as_bool).unwrap_or(false),
            trend: derived("trend").and_then(Value::as_str).map(Trend::parse),
            thresholds,
            priority: derived("priority").cloned(),
            device_serial: self.device_serial().map(str::to_owned),
            data_age_hours: age.map(round_tenth),
            freshness: age.map(Freshness::from_age_hours),
        })
    }

    /// Readings for every sensor, in key order.
    pub fn readings(&self, now: DateTime<Utc>) -> Vec<SensorReading> {
        self.sensors
            .iter()
            .filter_map(|key| self.reading(key, now))
            .collect()
    }
}

fn is_metadata_key(name: &str) -> bool {
    name == DEVICE_SERIAL_KEY || name == LAST_MEASUREMENT_KEY
}

/// RFC 3339, or a naive ISO-8601 date-time taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc())
        })
        .ok()
}

/// Hours between `ts` and `now`.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn age_hours(ts: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - ts).num_seconds() as f64 / 3600.0
}

fn round_tenth(hours: f64) -> f64 {
    (hours * 10.0).round() / 10.0
}

// ── SensorReading ────────────────────────────────────────────────

/// One sensor with its unit, thresholds and freshness.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub key: String,
    pub value: Value,
    pub unit: Option<&'static str>,
    pub is_measurement: bool,
    pub timestamp: Option<DateTime<Utc>>,
    pub expired: bool,
    pub trend: Option<Trend>,
    /// Gauge, ok and warning bounds that the server supplied.
    pub thresholds: BTreeMap<&'static str, Value>,
    pub priority: Option<Value>,
    pub device_serial: Option<String>,
    pub data_age_hours: Option<f64>,
    pub freshness: Option<Freshness>,
}

impl SensorReading {
    /// Stable entity identifier, when the device serial is known.
    pub fn entity_id(&self) -> Option<String> {
        self.device_serial
            .as_deref()
            .map(|serial| units::entity_id(serial, &self.key))
    }

    pub fn entity_name(&self) -> Option<String> {
        self.device_serial
            .as_deref()
            .map(|serial| units::entity_name(serial, &self.key))
    }
}

// ── Trend ────────────────────────────────────────────────────────

/// Direction reported for a sensor. Strings the service may add later
/// are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Stable,
    Other(String),
}

impl Trend {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "up" => Self::Up,
            "down" => Self::Down,
            "stable" => Self::Stable,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Stable => "stable",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Trend {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ── Freshness ────────────────────────────────────────────────────

/// Age class of a measurement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Freshness {
    /// At most 12 hours old.
    Fresh,
    /// More than 12 and at most 24 hours old.
    Old,
    /// More than 24 hours old.
    Stale,
}

impl Freshness {
    pub fn from_age_hours(hours: f64) -> Self {
        if hours > 24.0 {
            Self::Stale
        } else if hours > 12.0 {
            Self::Old
        } else {
            Self::Fresh
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn response(v: Value) -> LastMeasurements {
        serde_json::from_value(v).unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn keys(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.values().keys().map(String::as_str).collect()
    }

    #[test]
    fn normalizes_single_record() {
        let snapshot = Snapshot::from_measurements(
            response(json!({
                "status": "OK",
                "blue_device_serial": "S1",
                "data": [{"name": "temperature", "value": 26.4,
                          "timestamp": "2024-06-01T10:00:00Z", "trend": "stable"}],
            })),
            at(),
        );

        assert_eq!(
            keys(&snapshot),
            vec![
                "device_serial",
                "temperature",
                "temperature_expired",
                "temperature_timestamp",
                "temperature_trend",
            ]
        );
        assert_eq!(snapshot.get("temperature"), Some(&json!(26.4)));
        assert_eq!(snapshot.get("temperature_expired"), Some(&json!(false)));
        assert_eq!(snapshot.get("temperature_trend"), Some(&json!("stable")));
        assert_eq!(snapshot.device_serial(), Some("S1"));
        assert_eq!(snapshot.fetched_at(), Some(at()));
    }

    #[test]
    fn sensor_set_is_names_with_values() {
        let snapshot = Snapshot::from_measurements(
            response(json!({
                "status": "OK",
                "data": [
                    {"name": "ph", "value": 7.2},
                    {"name": "", "value": 1},
                    {"value": 2},
                    {"name": "orp", "value": null},
                    {"name": "salinity"},
                    {"name": "ph_priority", "value": 3},
                ],
            })),
            at(),
        );

        let sensors: Vec<_> = snapshot.sensor_keys().iter().cloned().collect();
        assert_eq!(sensors, vec!["ph".to_owned(), "ph_priority".to_owned()]);
        assert!(snapshot.get("orp").is_none());
    }

    #[test]
    fn undefined_trend_is_dropped_and_thresholds_are_kept() {
        let snapshot = Snapshot::from_measurements(
            response(json!({
                "status": "OK",
                "data": [{"name": "ph", "value": 7.2, "trend": "undefined",
                          "ok_min": 7.0, "ok_max": 7.6, "priority": 2, "warning_low": null}],
            })),
            at(),
        );

        assert!(snapshot.get("ph_trend").is_none());
        assert_eq!(snapshot.get("ph_ok_min"), Some(&json!(7.0)));
        assert_eq!(snapshot.get("ph_ok_max"), Some(&json!(7.6)));
        assert_eq!(snapshot.get("ph_priority"), Some(&json!(2)));
        assert!(snapshot.get("ph_warning_low").is_none());
        assert_eq!(snapshot.get("ph_timestamp"), Some(&Value::Null));
    }

    #[test]
    fn metadata_only_when_supplied() {
        let snapshot = Snapshot::from_measurements(response(json!({"status": "OK"})), at());
        assert!(snapshot.is_empty());
        assert!(snapshot.device_serial().is_none());
        assert!(snapshot.last_measurement_timestamp().is_none());
    }

    #[test]
    fn metadata_name_collision_is_skipped() {
        let snapshot = Snapshot::from_measurements(
            response(json!({
                "status": "OK",
                "blue_device_serial": "S1",
                "data": [{"name": "device_serial", "value": "bogus"}],
            })),
            at(),
        );
        assert_eq!(snapshot.device_serial(), Some("S1"));
        assert!(snapshot.sensor_keys().is_empty());
    }

    #[test]
    fn duplicate_names_later_wins() {
        let snapshot = Snapshot::from_measurements(
            response(json!({
                "status": "OK",
                "data": [
                    {"name": "ph", "value": 7.0, "trend": "up", "ok_min": 6.8},
                    {"name": "ph", "value": 7.4},
                ],
            })),
            at(),
        );

        assert_eq!(snapshot.get("ph"), Some(&json!(7.4)));
        assert!(snapshot.get("ph_trend").is_none());
        assert!(snapshot.get("ph_ok_min").is_none());
        assert_eq!(snapshot.sensor_keys().len(), 1);
    }

    #[test]
    fn reading_combines_unit_thresholds_and_freshness() {
        let snapshot = Snapshot::from_measurements(
            response(json!({
                "status": "OK",
                "blue_device_serial": "S1",
                "data": [{"name": "temperature", "value": 26.4,
                          "timestamp": "2024-06-01T06:00:00.000Z", "trend": "down",
                          "gauge_min": 0, "gauge_max": 40, "priority": 1}],
            })),
            at(),
        );

        let reading = snapshot.reading("temperature", at()).unwrap();
        assert_eq!(reading.unit, Some("°C"));
        assert!(reading.is_measurement);
        assert_eq!(reading.trend, Some(Trend::Down));
        assert_eq!(reading.data_age_hours, Some(6.0));
        assert_eq!(reading.freshness, Some(Freshness::Fresh));
        assert_eq!(reading.priority, Some(json!(1)));
        assert_eq!(
            reading.thresholds.keys().copied().collect::<Vec<_>>(),
            vec!["gauge_max", "gauge_min"]
        );
        assert_eq!(
            reading.entity_id().as_deref(),
            Some("virtualpoolcare_S1_temperature")
        );
        assert_eq!(
            reading.entity_name().as_deref(),
            Some("virtualpoolcare S1 temperature")
        );

        assert!(snapshot.reading("device_serial", at()).is_none());
    }

    #[test]
    fn freshness_boundaries() {
        assert_eq!(Freshness::from_age_hours(0.0), Freshness::Fresh);
        assert_eq!(Freshness::from_age_hours(12.0), Freshness::Fresh);
        assert_eq!(Freshness::from_age_hours(12.1), Freshness::Old);
        assert_eq!(Freshness::from_age_hours(24.0), Freshness::Old);
        assert_eq!(Freshness::from_age_hours(24.1), Freshness::Stale);
        assert_eq!(Freshness::Stale.to_string(), "stale");
    }

    #[test]
    fn age_is_rounded_to_a_tenth() {
        let ts = at() - chrono::Duration::minutes(100);
        assert_eq!(round_tenth(age_hours(ts, at())), 1.7);
    }

    #[test]
    fn freshness_uses_unrounded_age() {
        let aged = |secs: i64| {
            let ts = (at() - chrono::Duration::seconds(secs)).to_rfc3339();
            let snapshot = Snapshot::from_measurements(
                response(json!({
                    "status": "OK",
                    "data": [{"name": "ph", "value": 7.2, "timestamp": ts}],
                })),
                at(),
            );
            snapshot.reading("ph", at()).unwrap()
        };

        // 24 h 2 min 24 s: displayed as 24.0, but past the stale bound.
        let stale = aged(24 * 3600 + 144);
        assert_eq!(stale.data_age_hours, Some(24.0));
        assert_eq!(stale.freshness, Some(Freshness::Stale));

        let old = aged(12 * 3600 + 144);
        assert_eq!(old.data_age_hours, Some(12.0));
        assert_eq!(old.freshness, Some(Freshness::Old));
    }

    #[test]
    fn naive_timestamps_are_utc() {
        assert_eq!(
            parse_timestamp("2024-06-01T12:00:00"),
            Some(at())
        );
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn unknown_trend_is_preserved() {
        assert_eq!(Trend::parse("rising_fast").to_string(), "rising_fast");
        assert_eq!(serde_json::to_value(Trend::Up).unwrap(), json!("up"));
    }
}
