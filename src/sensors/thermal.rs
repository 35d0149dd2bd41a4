//! Linux thermal-zone temperature source.

use super::{Temperature, TemperatureSource};
use crate::error::SensorError;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Reads the CPU temperature from a sysfs thermal zone file.
///
/// The file holds the temperature as integer millidegrees Celsius.
pub struct ThermalZone {
    path: PathBuf,
}

impl ThermalZone {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse the raw contents of a thermal zone file.
    pub fn parse(raw: &str) -> Result<Temperature, SensorError> {
        raw.trim()
            .parse::<i64>()
            .map(Temperature::from_millidegrees)
            .map_err(|_| SensorError::Unparsable(raw.to_string()))
    }
}

impl TemperatureSource for ThermalZone {
    fn read(&self) -> Result<Temperature, SensorError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| SensorError::Unreadable {
            path: self.path.display().to_string(),
            source: e,
        })?;
        Self::parse(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_trailing_newline() {
        let temp = ThermalZone::parse("48312\n").unwrap();
        assert_eq!(temp.celsius(), 48.312);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            ThermalZone::parse("hot"),
            Err(SensorError::Unparsable(_))
        ));
        assert!(ThermalZone::parse("").is_err());
        assert!(ThermalZone::parse("48.3").is_err());
    }

    #[test]
    fn test_read_from_file() {
        let path = std::env::temp_dir().join(format!("fancontrol-zone-{}", std::process::id()));
        fs::write(&path, "51000\n").unwrap();

        let zone = ThermalZone::new(&path);
        assert_eq!(zone.read().unwrap().celsius(), 51.0);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let zone = ThermalZone::new("/nonexistent/thermal_zone/temp");
        assert!(matches!(zone.read(), Err(SensorError::Unreadable { .. })));
    }
}
