//! Fan actuators.
//!
//! An actuator accepts one intensity per control tick. Its unit depends on the
//! variant: duty-cycle percent for [`PwmActuator`], a raw register byte for
//! [`ShiftRegisterActuator`].

pub mod pwm;
pub mod shift_register;

pub use pwm::PwmActuator;
pub use shift_register::ShiftRegisterActuator;

use crate::config::ActuatorConfig;
use crate::error::{ActuatorError, HardwareError};
use crate::hardware::{SimBoard, SysfsGpio, SysfsPwm};
use async_trait::async_trait;

#[async_trait]
pub trait Actuator: Send {
    /// Short variant name for logs and errors.
    fn name(&self) -> &'static str;

    /// Largest intensity this actuator accepts.
    fn max_intensity(&self) -> u32;

    /// Apply one intensity. A call that has started runs to completion.
    async fn set_intensity(&mut self, value: u32) -> Result<(), ActuatorError>;
}

/// Reject values outside `0..=limit` before any pin is touched.
pub(crate) fn check_domain(
    actuator: &'static str,
    value: u32,
    limit: u32,
) -> Result<(), ActuatorError> {
    if value > limit {
        return Err(ActuatorError::OutOfDomain {
            actuator,
            value,
            limit,
        });
    }
    Ok(())
}

/// Allocate the configured actuator on real sysfs lines.
pub fn open(config: &ActuatorConfig) -> Result<Box<dyn Actuator>, HardwareError> {
    let actuator: Box<dyn Actuator> = match *config {
        ActuatorConfig::Pwm {
            chip,
            channel,
            frequency_hz,
        } => Box::new(PwmActuator::new(SysfsPwm::new(chip, channel, frequency_hz)?)),
        ActuatorConfig::ShiftRegister {
            data_pin,
            clock_pin,
            latch_pin,
            bit_delay,
        } => Box::new(ShiftRegisterActuator::new(
            SysfsGpio::output(data_pin)?,
            SysfsGpio::output(clock_pin)?,
            SysfsGpio::output(latch_pin)?,
            bit_delay,
        )?),
    };
    Ok(actuator)
}

/// Allocate the configured actuator on simulated lines.
pub fn open_simulated(
    config: &ActuatorConfig,
    board: &SimBoard,
) -> Result<Box<dyn Actuator>, HardwareError> {
    let actuator: Box<dyn Actuator> = match *config {
        ActuatorConfig::Pwm { channel, .. } => {
            Box::new(PwmActuator::new(board.pwm(format!("pwm{}", channel))))
        }
        ActuatorConfig::ShiftRegister { bit_delay, .. } => Box::new(ShiftRegisterActuator::new(
            board.output("data"),
            board.output("clock"),
            board.output("latch"),
            bit_delay,
        )?),
    };
    Ok(actuator)
}
