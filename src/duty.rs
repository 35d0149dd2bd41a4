//! Temperature to cooling-intensity mapping.
//!
//! Below the low threshold the fan idles at the range minimum, above the high
//! threshold it runs at the range maximum, and in between the intensity is
//! linearly interpolated and truncated to an integer.

use crate::error::ConfigError;
use crate::sensors::Temperature;
use serde::{Deserialize, Serialize};

/// Active control band in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub low: f64,
    pub high: f64,
}

impl Thresholds {
    pub fn new(low: f64, high: f64) -> Result<Self, ConfigError> {
        // NaN fails this comparison too
        if !(high > low) {
            return Err(ConfigError::InvalidThresholds { low, high });
        }
        Ok(Self { low, high })
    }
}

/// Valid output domain of the actuator, `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoolingRange {
    pub min: u32,
    pub max: u32,
}

impl CoolingRange {
    pub fn new(min: u32, max: u32) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn span(&self) -> u32 {
        self.max - self.min
    }

    pub fn clamp(&self, value: u32) -> u32 {
        value.clamp(self.min, self.max)
    }
}

/// Map a temperature onto the cooling range.
pub fn map(temp: Temperature, thresholds: Thresholds, range: CoolingRange) -> u32 {
    let t = temp.celsius();

    if t < thresholds.low {
        return range.min;
    }
    if t > thresholds.high {
        return range.max;
    }

    let fraction = (t - thresholds.low) / (thresholds.high - thresholds.low);
    let scaled = range.min as f64 + range.span() as f64 * fraction;

    range.clamp(scaled.trunc() as u32)
}
