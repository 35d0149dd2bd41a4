//! A controller node: the control loop and the status service wired from one
//! [`Config`].

use crate::actuator;
use crate::config::Config;
use crate::control::ControlLoop;
use crate::error::Result;
use crate::hardware::{Level, SimBoard, SysfsGpio};
use crate::instance_lock::InstanceLock;
use crate::peer::PeerClient;
use crate::sensors::{
    GpioPresence, NoPresencePin, PresenceDetector, TemperatureSource, ThermalZone,
};
use crate::server::{self, StatusState};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Where actuator and presence lines come from.
pub enum Hardware {
    Sysfs,
    Simulated { board: SimBoard, presence: Level },
}

pub struct Node {
    status: StatusState,
    control: Option<ControlLoop>,
    _lock: Option<InstanceLock>,
}

impl Node {
    /// Validate the configuration and allocate all hardware.
    pub fn build(config: &Config, hardware: &Hardware) -> Result<Self> {
        config.validate()?;

        let temperature: Arc<dyn TemperatureSource> =
            Arc::new(ThermalZone::new(&config.sensors.thermal_zone));
        let presence = open_presence(config, hardware);

        let status = StatusState {
            temperature: temperature.clone(),
            presence: presence.clone(),
        };

        if config.sensors.require_presence && !presence.is_present() {
            info!("Control accessory not found, fan control disabled");
            return Ok(Self {
                status,
                control: None,
                _lock: None,
            });
        }

        let (lock, actuator) = match hardware {
            Hardware::Sysfs => (
                Some(InstanceLock::acquire(&config.actuator.wiring_key())?),
                actuator::open(&config.actuator)?,
            ),
            Hardware::Simulated { board, .. } => {
                (None, actuator::open_simulated(&config.actuator, board)?)
            }
        };

        let mut control = ControlLoop::new(&config.control, temperature, actuator)?;
        if let Some(peer) = &config.peer {
            control = control.with_peer(Box::new(PeerClient::new(peer)?), peer.timeout);
        }

        Ok(Self {
            status,
            control: Some(control),
            _lock: lock,
        })
    }

    pub fn control_enabled(&self) -> bool {
        self.control.is_some()
    }

    pub fn status_state(&self) -> StatusState {
        self.status.clone()
    }

    /// Serve status queries and run the control loop until `shutdown` is
    /// cancelled. An actuator fault cancels `shutdown` and is returned.
    pub async fn run(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        let server = tokio::spawn(server::run_server(
            listener,
            self.status.clone(),
            shutdown.clone(),
        ));

        let control_result = match self.control {
            Some(control) => {
                let result = control.run(shutdown.clone()).await;
                if let Err(e) = &result {
                    error!("Fan actuator failed, stopping: {}", e);
                    shutdown.cancel();
                }
                result
            }
            None => {
                shutdown.cancelled().await;
                Ok(())
            }
        };

        let server_result = server.await;
        control_result?;
        server_result??;
        Ok(())
    }
}

fn open_presence(config: &Config, hardware: &Hardware) -> Arc<dyn PresenceDetector> {
    let Some(pin) = config.sensors.presence_pin else {
        return Arc::new(NoPresencePin);
    };

    match hardware {
        Hardware::Sysfs => match SysfsGpio::input(pin) {
            Ok(line) => Arc::new(GpioPresence::new(line)),
            Err(e) => {
                warn!("Presence pin {} unavailable, reporting absent: {}", pin, e);
                Arc::new(NoPresencePin)
            }
        },
        Hardware::Simulated { board, presence } => {
            Arc::new(GpioPresence::new(board.input(*presence)))
        }
    }
}
