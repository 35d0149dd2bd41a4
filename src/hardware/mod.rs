//! Pin-level hardware capabilities.
//!
//! The actuators and the presence detector only see these traits, so the
//! same code drives real sysfs lines on the board and simulated lines on a
//! bench or in tests.

pub mod sim;
pub mod sysfs;

pub use sim::{SimBoard, SimEvent};
pub use sysfs::{SysfsGpio, SysfsPwm};

use crate::error::HardwareError;
use std::fmt;

/// Logic level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "low"),
            Level::High => write!(f, "high"),
        }
    }
}

/// A digital output line.
pub trait OutputLine: Send {
    fn set_level(&mut self, level: Level) -> Result<(), HardwareError>;

    fn set_high(&mut self) -> Result<(), HardwareError> {
        self.set_level(Level::High)
    }

    fn set_low(&mut self) -> Result<(), HardwareError> {
        self.set_level(Level::Low)
    }
}

/// A digital input line.
pub trait InputLine: Send + Sync {
    fn level(&self) -> Result<Level, HardwareError>;
}

/// A hardware PWM channel driven by duty-cycle percentage.
pub trait PwmOutput: Send {
    fn set_duty_percent(&mut self, percent: u32) -> Result<(), HardwareError>;
}
