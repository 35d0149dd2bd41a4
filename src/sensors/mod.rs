//! Temperature and accessory-presence inputs.
//!
//! Both inputs are read-only and safe to sample concurrently from the control
//! loop and the status service.

pub mod presence;
pub mod thermal;

pub use presence::{GpioPresence, NoPresencePin};
pub use thermal::ThermalZone;

use crate::error::SensorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A temperature in degrees Celsius.
///
/// Serializes as a plain number rounded to millidegree precision, which is the
/// `/temp` wire format shared between peer nodes.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(into = "f64", from = "f64")]
pub struct Temperature(f64);

impl Temperature {
    pub fn from_celsius(celsius: f64) -> Self {
        Self(celsius)
    }

    /// Raw thermal-zone readings are integer millidegrees.
    pub fn from_millidegrees(millidegrees: i64) -> Self {
        Self(millidegrees as f64 / 1000.0)
    }

    pub fn celsius(&self) -> f64 {
        self.0
    }
}

impl From<f64> for Temperature {
    fn from(celsius: f64) -> Self {
        Self(celsius)
    }
}

impl From<Temperature> for f64 {
    fn from(temp: Temperature) -> Self {
        (temp.0 * 1000.0).round() / 1000.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}C", self.0)
    }
}

/// Source of the local CPU temperature.
pub trait TemperatureSource: Send + Sync {
    fn read(&self) -> Result<Temperature, SensorError>;
}

/// Read `source` on the blocking pool.
///
/// Sensor reads are synchronous file I/O; this keeps them off the runtime
/// workers so they overlap with other sampling.
pub async fn sample(source: &Arc<dyn TemperatureSource>) -> Result<Temperature, SensorError> {
    let source = Arc::clone(source);
    tokio::task::spawn_blocking(move || source.read()).await?
}

/// Detects whether the optional control accessory is attached.
///
/// Never fails: an unavailable pin reads as absent.
pub trait PresenceDetector: Send + Sync {
    fn is_present(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_millidegrees() {
        assert_eq!(Temperature::from_millidegrees(47_500).celsius(), 47.5);
        assert_eq!(Temperature::from_millidegrees(-1_250).celsius(), -1.25);
    }

    #[test]
    fn test_serializes_to_three_decimals() {
        let json = serde_json::to_string(&Temperature::from_celsius(48.312_499)).unwrap();
        assert_eq!(json, "48.312");
    }

    #[test]
    fn test_deserializes_plain_number() {
        let temp: Temperature = serde_json::from_str("61.5").unwrap();
        assert_eq!(temp.celsius(), 61.5);
    }

    struct Fixed(Option<f64>);

    impl TemperatureSource for Fixed {
        fn read(&self) -> Result<Temperature, SensorError> {
            self.0
                .map(Temperature::from_celsius)
                .ok_or_else(|| SensorError::Unparsable("n/a".to_string()))
        }
    }

    #[tokio::test]
    async fn test_sample_runs_read() {
        let source: Arc<dyn TemperatureSource> = Arc::new(Fixed(Some(52.25)));
        assert_eq!(sample(&source).await.unwrap().celsius(), 52.25);

        let broken: Arc<dyn TemperatureSource> = Arc::new(Fixed(None));
        assert!(matches!(
            sample(&broken).await,
            Err(SensorError::Unparsable(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Temperature::from_celsius(50.0).to_string(), "50.000C");
    }
}
