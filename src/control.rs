//! The fan control loop.
//!
//! Each tick samples the local sensor (and the peer, when configured,
//! concurrently), picks the decision temperature, maps it onto the cooling
//! range and writes the result to the actuator. The loop then sleeps for the
//! tick interval. Sensor and peer failures only affect the current tick;
//! actuator failures end the loop.

use crate::actuator::Actuator;
use crate::config::ControlConfig;
use crate::duty::{self, CoolingRange, Thresholds};
use crate::error::{ActuatorError, ConfigError};
use crate::peer::{PeerSource, PeerUnreachable};
use crate::sensors::{self, Temperature, TemperatureSource};
use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Which reading drove a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    Local,
    Peer,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionSource::Local => write!(f, "local"),
            DecisionSource::Peer => write!(f, "peer"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlDecision {
    pub temperature: Temperature,
    pub source: DecisionSource,
}

/// Pick the hotter of the two readings. Ties go to the local reading, and an
/// absent peer reading is never treated as a temperature.
pub fn decide(local: Temperature, peer: Option<Temperature>) -> ControlDecision {
    match peer {
        Some(peer) if peer.celsius() > local.celsius() => ControlDecision {
            temperature: peer,
            source: DecisionSource::Peer,
        },
        _ => ControlDecision {
            temperature: local,
            source: DecisionSource::Local,
        },
    }
}

async fn sample_peer(peer: Option<&(Box<dyn PeerSource>, Duration)>) -> Option<Temperature> {
    let (peer, timeout) = peer?;

    let result = match tokio::time::timeout(*timeout, peer.fetch_temperature()).await {
        Ok(result) => result,
        Err(_) => Err(PeerUnreachable::Timeout(*timeout)),
    };

    match result {
        Ok(temp) => Some(temp),
        Err(e) => {
            debug!("Peer {} unavailable this tick: {}", peer.endpoint(), e);
            None
        }
    }
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Actuated {
        decision: ControlDecision,
        intensity: u32,
    },
    /// No temperature was available; the actuator keeps its previous value.
    Skipped,
}

pub struct ControlLoop {
    sensor: Arc<dyn TemperatureSource>,
    peer: Option<(Box<dyn PeerSource>, Duration)>,
    actuator: Box<dyn Actuator>,
    thresholds: Thresholds,
    range: CoolingRange,
    interval: Duration,
}

impl ControlLoop {
    pub fn new(
        config: &ControlConfig,
        sensor: Arc<dyn TemperatureSource>,
        actuator: Box<dyn Actuator>,
    ) -> Result<Self, ConfigError> {
        let thresholds = config.thresholds()?;
        let range = config.range()?;
        if range.max > actuator.max_intensity() {
            return Err(ConfigError::RangeExceedsActuator {
                actuator: actuator.name(),
                max: range.max,
                limit: actuator.max_intensity(),
            });
        }
        if config.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }

        Ok(Self {
            sensor,
            peer: None,
            actuator,
            thresholds,
            range,
            interval: config.tick_interval,
        })
    }

    /// Enable peer coordination. `timeout` bounds each fetch.
    pub fn with_peer(mut self, peer: Box<dyn PeerSource>, timeout: Duration) -> Self {
        self.peer = Some((peer, timeout));
        self
    }

    /// Run one Sampling, Deciding, Actuating pass.
    pub async fn tick(&mut self) -> Result<TickOutcome, ActuatorError> {
        let (local, peer) = tokio::join!(
            sensors::sample(&self.sensor),
            sample_peer(self.peer.as_ref())
        );

        let decision = match (local, peer) {
            (Ok(local), peer) => decide(local, peer),
            (Err(e), Some(peer)) => {
                warn!("Local temperature unavailable, using peer reading: {}", e);
                ControlDecision {
                    temperature: peer,
                    source: DecisionSource::Peer,
                }
            }
            (Err(e), None) => {
                warn!("Skipping tick, local temperature unavailable: {}", e);
                return Ok(TickOutcome::Skipped);
            }
        };

        let intensity = duty::map(decision.temperature, self.thresholds, self.range);
        self.actuator.set_intensity(intensity).await?;

        debug!(
            "{} {} -> {} ({})",
            decision.source,
            decision.temperature,
            intensity,
            self.actuator.name()
        );

        Ok(TickOutcome::Actuated {
            decision,
            intensity,
        })
    }

    /// Tick until `shutdown` is cancelled or the actuator fails.
    ///
    /// Cancellation is only observed while sleeping, so an actuator write in
    /// progress always completes.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), ActuatorError> {
        info!(
            "Control loop started: {}..{}C -> {}..{} on {}, every {:?}{}",
            self.thresholds.low,
            self.thresholds.high,
            self.range.min,
            self.range.max,
            self.actuator.name(),
            self.interval,
            match &self.peer {
                Some((peer, _)) => format!(", peer {}", peer.endpoint()),
                None => String::new(),
            }
        );

        loop {
            self.tick().await?;

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Control loop stopped");
        Ok(())
    }
}
