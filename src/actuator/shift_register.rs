//! Fan speed latched into an external 8-bit shift register.
//!
//! Wire protocol, repeated in full on every call:
//!
//! 1. For each bit, most significant first: drive the data line, then pulse
//!    the clock high then low, waiting `bit_delay` after each clock edge.
//! 2. Pulse the latch line low then high to move the shifted byte to the
//!    register's parallel outputs.
//!
//! Idle state between transfers is clock low, latch high.

use super::{Actuator, check_domain};
use crate::error::{ActuatorError, HardwareError};
use crate::hardware::{Level, OutputLine};
use async_trait::async_trait;
use std::time::Duration;

pub const REGISTER_MAX: u32 = u8::MAX as u32;

/// Default delay between clock and latch edges.
pub const DEFAULT_BIT_DELAY: Duration = Duration::from_millis(1);

pub struct ShiftRegisterActuator<O> {
    data: O,
    clock: O,
    latch: O,
    bit_delay: Duration,
}

impl<O: OutputLine> ShiftRegisterActuator<O> {
    /// Take ownership of the three lines and park them in the idle state.
    pub fn new(
        data: O,
        mut clock: O,
        mut latch: O,
        bit_delay: Duration,
    ) -> Result<Self, HardwareError> {
        clock.set_low()?;
        latch.set_high()?;
        Ok(Self {
            data,
            clock,
            latch,
            bit_delay,
        })
    }

    async fn transfer(&mut self, value: u8) -> Result<(), HardwareError> {
        for bit in (0..8).rev() {
            self.data.set_level(Level::from((value >> bit) & 1 == 1))?;
            self.clock.set_high()?;
            tokio::time::sleep(self.bit_delay).await;
            self.clock.set_low()?;
            tokio::time::sleep(self.bit_delay).await;
        }

        self.latch.set_low()?;
        tokio::time::sleep(self.bit_delay).await;
        self.latch.set_high()?;
        Ok(())
    }
}

#[async_trait]
impl<O: OutputLine> Actuator for ShiftRegisterActuator<O> {
    fn name(&self) -> &'static str {
        "shift-register"
    }

    fn max_intensity(&self) -> u32 {
        REGISTER_MAX
    }

    async fn set_intensity(&mut self, value: u32) -> Result<(), ActuatorError> {
        check_domain(self.name(), value, REGISTER_MAX)?;
        self.transfer(value as u8).await?;
        Ok(())
    }
}
