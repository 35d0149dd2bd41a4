//! Control accessory ("hat") presence detection.

use super::PresenceDetector;
use crate::hardware::{InputLine, Level};
use log::debug;

/// Presence read from a pulled-down input pin; high means attached.
pub struct GpioPresence {
    line: Box<dyn InputLine>,
}

impl GpioPresence {
    pub fn new(line: impl InputLine + 'static) -> Self {
        Self {
            line: Box::new(line),
        }
    }
}

impl PresenceDetector for GpioPresence {
    fn is_present(&self) -> bool {
        match self.line.level() {
            Ok(level) => level == Level::High,
            Err(e) => {
                debug!("Presence pin unavailable, reporting absent: {}", e);
                false
            }
        }
    }
}

/// Used on variants with no presence pin wired.
pub struct NoPresencePin;

impl PresenceDetector for NoPresencePin {
    fn is_present(&self) -> bool {
        false
    }
}
