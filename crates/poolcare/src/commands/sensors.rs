//! `poolcare sensors`: one cycle, one row per sensor.

use chrono::Utc;
use tabled::Tabled;

use poolcare_core::{PollingCoordinator, PoolConfig, SensorReading};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct SensorRow {
    #[tabled(rename = "Sensor")]
    sensor: String,
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Trend")]
    trend: String,
    #[tabled(rename = "Freshness")]
    freshness: String,
    #[tabled(rename = "Age (h)")]
    age: String,
    #[tabled(rename = "Measured")]
    measured: String,
}

fn to_row(r: &SensorReading) -> SensorRow {
    let value = if r.expired {
        format!("{} (expired)", output::display_value(&r.value))
    } else {
        output::display_value(&r.value)
    };
    SensorRow {
        sensor: r.key.clone(),
        entity: r.entity_name().unwrap_or_default(),
        value,
        unit: r.unit.unwrap_or("").to_owned(),
        trend: r.trend.as_ref().map(ToString::to_string).unwrap_or_default(),
        freshness: r.freshness.map(|f| f.to_string()).unwrap_or_default(),
        age: r
            .data_age_hours
            .map(|h| format!("{h:.1}"))
            .unwrap_or_default(),
        measured: r
            .timestamp
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default(),
    }
}

fn plain_line(r: &SensorReading) -> String {
    let mut line = format!("{}={}", r.key, output::display_value(&r.value));
    if let Some(unit) = r.unit {
        line.push(' ');
        line.push_str(unit);
    }
    line
}

pub async fn handle(config: PoolConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = PollingCoordinator::oneshot(config).await?;
    let readings = snapshot.readings(Utc::now());

    if !global.quiet {
        if readings.is_empty() {
            eprintln!("No sensors reported by the device.");
        } else if let Some(serial) = snapshot.device_serial() {
            let color = output::should_color(global.color);
            eprintln!("{} {serial}", output::heading("Device", color));
        }
    }

    let out = output::render_list(global.output, &readings, to_row, plain_line)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use poolcare_core::{Freshness, Trend};

    use super::*;

    fn reading() -> SensorReading {
        SensorReading {
            key: "temperature".into(),
            value: json!(26.4),
            unit: Some("°C"),
            is_measurement: true,
            timestamp: None,
            expired: true,
            trend: Some(Trend::Up),
            thresholds: BTreeMap::new(),
            priority: None,
            device_serial: Some("00:11".into()),
            data_age_hours: Some(13.2),
            freshness: Some(Freshness::Old),
        }
    }

    #[test]
    fn row_marks_expired_values() {
        let row = to_row(&reading());
        assert_eq!(row.entity, "virtualpoolcare 00:11 temperature");
        assert_eq!(row.value, "26.4 (expired)");
        assert_eq!(row.unit, "°C");
        assert_eq!(row.freshness, "old");
        assert_eq!(row.age, "13.2");
        assert_eq!(row.measured, "");
    }

    #[test]
    fn plain_line_appends_unit() {
        assert_eq!(plain_line(&reading()), "temperature=26.4 °C");
    }
}
