//! Fan driven directly by a hardware PWM channel.

use super::{Actuator, check_domain};
use crate::error::ActuatorError;
use crate::hardware::PwmOutput;
use async_trait::async_trait;

pub const PWM_MAX_PERCENT: u32 = 100;

/// Sets the fan duty cycle in percent. The channel is allocated by the
/// caller once at startup.
pub struct PwmActuator<P> {
    channel: P,
}

impl<P: PwmOutput> PwmActuator<P> {
    pub fn new(channel: P) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl<P: PwmOutput> Actuator for PwmActuator<P> {
    fn name(&self) -> &'static str {
        "pwm"
    }

    fn max_intensity(&self) -> u32 {
        PWM_MAX_PERCENT
    }

    async fn set_intensity(&mut self, value: u32) -> Result<(), ActuatorError> {
        check_domain(self.name(), value, PWM_MAX_PERCENT)?;
        self.channel.set_duty_percent(value)?;
        Ok(())
    }
}
