// Sensor metadata: units, measurement classification and entity naming.

/// Prefix used for stable entity identifiers.
pub const ENTITY_PREFIX: &str = "virtualpoolcare";

/// Unit of measurement for a sensor key, if it has one.
///
/// `ph` is dimensionless and unknown keys have no unit.
pub fn unit_for(key: &str) -> Option<&'static str> {
    match key {
        "temperature" => Some("°C"),
        "orp" => Some("mV"),
        "salinity" => Some("g/L"),
        "chlorine_ppm" | "chlorine" | "tds" => Some("ppm"),
        "conductivity" => Some("µS/cm"),
        _ => None,
    }
}

/// Whether the key is a numeric water-quality measurement (as opposed to
/// an arbitrary value the service happens to report).
pub fn is_measurement(key: &str) -> bool {
    matches!(
        key,
        "temperature"
            | "ph"
            | "orp"
            | "salinity"
            | "chlorine_ppm"
            | "chlorine"
            | "tds"
            | "conductivity"
    )
}

/// `virtualpoolcare_{serial}_{key}`
pub fn entity_id(device_serial: &str, key: &str) -> String {
    format!("{ENTITY_PREFIX}_{device_serial}_{key}")
}

/// `virtualpoolcare {serial} {key}`
pub fn entity_name(device_serial: &str, key: &str) -> String {
    format!("{ENTITY_PREFIX} {device_serial} {key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_units() {
        assert_eq!(unit_for("temperature"), Some("°C"));
        assert_eq!(unit_for("ph"), None);
        assert_eq!(unit_for("orp"), Some("mV"));
        assert_eq!(unit_for("salinity"), Some("g/L"));
        assert_eq!(unit_for("chlorine"), Some("ppm"));
        assert_eq!(unit_for("chlorine_ppm"), Some("ppm"));
        assert_eq!(unit_for("tds"), Some("ppm"));
        assert_eq!(unit_for("conductivity"), Some("µS/cm"));
        assert_eq!(unit_for("water_level"), None);
    }

    #[test]
    fn measurement_classification() {
        assert!(is_measurement("ph"));
        assert!(!is_measurement("battery"));
    }

    #[test]
    fn entity_naming() {
        assert_eq!(entity_id("S1", "ph"), "virtualpoolcare_S1_ph");
        assert_eq!(entity_name("S1", "ph"), "virtualpoolcare S1 ph");
    }
}
