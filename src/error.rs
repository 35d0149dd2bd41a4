use thiserror::Error as ThisError;

/// Local temperature could not be obtained.
#[derive(ThisError, Debug)]
pub enum SensorError {
    #[error("Failed to read thermal zone {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse temperature output: {0:?}")]
    Unparsable(String),

    #[error("Temperature read did not complete: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
}

/// Rejected configuration. Always fatal at startup.
#[derive(ThisError, Debug)]
pub enum ConfigError {
    #[error("Temperature thresholds must satisfy low < high (low={low}, high={high})")]
    InvalidThresholds { low: f64, high: f64 },

    #[error("Cooling range must satisfy min <= max (min={min}, max={max})")]
    InvalidRange { min: u32, max: u32 },

    #[error("Cooling range maximum {max} exceeds the {actuator} actuator limit of {limit}")]
    RangeExceedsActuator {
        actuator: &'static str,
        max: u32,
        limit: u32,
    },

    #[error("Tick interval must be greater than zero")]
    ZeroTickInterval,

    #[error("Peer timeout ({timeout_ms}ms) must be non-zero and shorter than the tick interval ({interval_ms}ms)")]
    InvalidPeerTimeout { timeout_ms: u128, interval_ms: u128 },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Failed to build peer HTTP client: {0}")]
    PeerClient(String),
}

/// Low-level pin or PWM channel failure.
#[derive(ThisError, Debug)]
pub enum HardwareError {
    #[error("{op} failed on {path}: {source}")]
    Sysfs {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected pin value {value:?} read from {path}")]
    UnexpectedValue { path: String, value: String },
}

/// Fan actuation failure. Treated as unrecoverable by the control loop.
#[derive(ThisError, Debug)]
pub enum ActuatorError {
    #[error("Intensity {value} is outside the {actuator} domain 0..={limit}")]
    OutOfDomain {
        actuator: &'static str,
        value: u32,
        limit: u32,
    },

    #[error(transparent)]
    Hardware(#[from] HardwareError),
}

#[derive(ThisError, Debug)]
pub enum FanControlError {
    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error(transparent)]
    Actuator(#[from] ActuatorError),

    #[error(transparent)]
    InstanceLock(#[from] crate::instance_lock::InstanceLockError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, FanControlError>;
