use crate::actuator::pwm::PWM_MAX_PERCENT;
use crate::actuator::shift_register::{DEFAULT_BIT_DELAY, REGISTER_MAX};
use crate::duty::{CoolingRange, Thresholds};
use crate::error::ConfigError;
use crate::sensors::thermal::DEFAULT_THERMAL_ZONE;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Port the status service listens on, and the port peers are queried on.
pub const DEFAULT_STATUS_PORT: u16 = 8080;

/// Load key/value pairs from a `.env` file.
///
/// Handles values with spaces without requiring quotes. A missing or
/// unreadable file yields no entries.
pub fn load_dotenv(path: &Path) -> HashMap<String, String> {
    match fs::read_to_string(path) {
        Ok(content) => parse_dotenv(&content),
        Err(_) => HashMap::new(),
    }
}

pub fn parse_dotenv(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let mut value = value.trim();

            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            vars.insert(key.to_string(), value.to_string());
        }
    }

    vars
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub control: ControlConfig,
    pub peer: Option<PeerConfig>,
    pub status: StatusConfig,
    pub sensors: SensorConfig,
    pub actuator: ActuatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    pub temp_low: f64,
    pub temp_high: f64,
    pub fan_min: u32,
    pub fan_max: u32,
    pub tick_interval: Duration,
}

impl ControlConfig {
    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        Thresholds::new(self.temp_low, self.temp_high)
    }

    pub fn range(&self) -> Result<CoolingRange, ConfigError> {
        CoolingRange::new(self.fan_min, self.fan_max)
    }
}

/// Paired node whose `/temp` route is consulted every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub hostname: String,
    pub port: u16,
    pub timeout: Duration,
}

impl PeerConfig {
    pub fn temp_url(&self) -> String {
        format!("http://{}:{}/temp", self.hostname, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    pub bind: IpAddr,
    pub port: u16,
}

impl StatusConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    pub thermal_zone: PathBuf,
    pub presence_pin: Option<u32>,
    /// Only start the control loop when the accessory is detected.
    pub require_presence: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ActuatorConfig {
    Pwm {
        chip: u32,
        channel: u32,
        frequency_hz: u32,
    },
    ShiftRegister {
        data_pin: u32,
        clock_pin: u32,
        latch_pin: u32,
        bit_delay: Duration,
    },
}

impl ActuatorConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ActuatorConfig::Pwm { .. } => "pwm",
            ActuatorConfig::ShiftRegister { .. } => "shift-register",
        }
    }

    /// Largest intensity the actuator accepts.
    pub fn limit(&self) -> u32 {
        match self {
            ActuatorConfig::Pwm { .. } => PWM_MAX_PERCENT,
            ActuatorConfig::ShiftRegister { .. } => REGISTER_MAX,
        }
    }

    /// Identifies the physical output, so two controllers never share it.
    pub fn wiring_key(&self) -> String {
        match self {
            ActuatorConfig::Pwm { chip, channel, .. } => format!("pwm{}-{}", chip, channel),
            ActuatorConfig::ShiftRegister {
                data_pin,
                clock_pin,
                latch_pin,
                ..
            } => format!("sr{}-{}-{}", data_pin, clock_pin, latch_pin),
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        ActuatorConfig::Pwm {
            chip: 0,
            channel: 0,
            frequency_hz: 100,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            control: ControlConfig {
                temp_low: 35.0,
                temp_high: 55.0,
                fan_min: 20,
                fan_max: 100,
                tick_interval: Duration::from_secs(15),
            },
            peer: None,
            status: StatusConfig {
                bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                port: DEFAULT_STATUS_PORT,
            },
            sensors: SensorConfig {
                thermal_zone: PathBuf::from(DEFAULT_THERMAL_ZONE),
                presence_pin: None,
                require_presence: false,
            },
            actuator: ActuatorConfig::default(),
        }
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

impl Config {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from environment variables, falling back to
    /// `dotenv` entries for keys the environment does not set.
    pub fn from_env_with(dotenv: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| dotenv.get(key).cloned()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &'static str| lookup(key).map(|v| (key, v));

        // Control band
        if let Some((key, v)) = get("TEMP_LOW") {
            config.control.temp_low = parse_value(key, &v)?;
        }
        if let Some((key, v)) = get("TEMP_HIGH") {
            config.control.temp_high = parse_value(key, &v)?;
        }
        if let Some((key, v)) = get("FAN_MIN") {
            config.control.fan_min = parse_value(key, &v)?;
        }
        if let Some((key, v)) = get("FAN_MAX") {
            config.control.fan_max = parse_value(key, &v)?;
        }
        if let Some((key, v)) = get("TICK_INTERVAL_SECS") {
            config.control.tick_interval = Duration::from_secs(parse_value(key, &v)?);
        }

        // Peer coordination
        if let Some((_, hostname)) = get("PEER_HOSTNAME")
            && !hostname.trim().is_empty()
        {
            let mut peer = PeerConfig {
                hostname: hostname.trim().to_string(),
                port: DEFAULT_STATUS_PORT,
                timeout: Duration::from_millis(3000),
            };
            if let Some((key, v)) = get("PEER_PORT") {
                peer.port = parse_value(key, &v)?;
            }
            if let Some((key, v)) = get("PEER_TIMEOUT_MS") {
                peer.timeout = Duration::from_millis(parse_value(key, &v)?);
            }
            config.peer = Some(peer);
        }

        // Status service
        if let Some((key, v)) = get("STATUS_BIND") {
            config.status.bind = parse_value(key, &v)?;
        }
        if let Some((key, v)) = get("STATUS_PORT") {
            config.status.port = parse_value(key, &v)?;
        }

        // Sensors
        if let Some((_, path)) = get("THERMAL_ZONE_PATH") {
            config.sensors.thermal_zone = PathBuf::from(path);
        }
        if let Some((key, v)) = get("PRESENCE_PIN") {
            config.sensors.presence_pin = Some(parse_value(key, &v)?);
        }
        if let Some((key, v)) = get("REQUIRE_PRESENCE") {
            config.sensors.require_presence = parse_flag(key, &v)?;
        }

        // Actuator
        let kind = get("ACTUATOR").map(|(_, v)| v.trim().to_ascii_lowercase());
        config.actuator = match kind.as_deref() {
            None | Some("pwm") => {
                let mut chip = 0;
                let mut channel = 0;
                let mut frequency_hz = 100;
                if let Some((key, v)) = get("PWM_CHIP") {
                    chip = parse_value(key, &v)?;
                }
                if let Some((key, v)) = get("PWM_CHANNEL") {
                    channel = parse_value(key, &v)?;
                }
                if let Some((key, v)) = get("PWM_FREQUENCY_HZ") {
                    frequency_hz = parse_value(key, &v)?;
                }
                ActuatorConfig::Pwm {
                    chip,
                    channel,
                    frequency_hz,
                }
            }
            Some("shift-register") | Some("shift_register") => {
                let mut data_pin = 17;
                let mut clock_pin = 27;
                let mut latch_pin = 22;
                let mut bit_delay = DEFAULT_BIT_DELAY;
                if let Some((key, v)) = get("SR_DATA_PIN") {
                    data_pin = parse_value(key, &v)?;
                }
                if let Some((key, v)) = get("SR_CLOCK_PIN") {
                    clock_pin = parse_value(key, &v)?;
                }
                if let Some((key, v)) = get("SR_LATCH_PIN") {
                    latch_pin = parse_value(key, &v)?;
                }
                if let Some((key, v)) = get("SR_BIT_DELAY_US") {
                    bit_delay = Duration::from_micros(parse_value(key, &v)?);
                }
                ActuatorConfig::ShiftRegister {
                    data_pin,
                    clock_pin,
                    latch_pin,
                    bit_delay,
                }
            }
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "ACTUATOR",
                    value: other.to_string(),
                });
            }
        };

        Ok(config)
    }

    /// Check cross-field constraints. Must pass before any task starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.control.thresholds()?;
        let range = self.control.range()?;

        let limit = self.actuator.limit();
        if range.max > limit {
            return Err(ConfigError::RangeExceedsActuator {
                actuator: self.actuator.name(),
                max: range.max,
                limit,
            });
        }

        if self.control.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }

        if let Some(peer) = &self.peer
            && (peer.timeout.is_zero() || peer.timeout >= self.control.tick_interval)
        {
            return Err(ConfigError::InvalidPeerTimeout {
                timeout_ms: peer.timeout.as_millis(),
                interval_ms: self.control.tick_interval.as_millis(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.control.temp_low, 35.0);
        assert_eq!(config.control.temp_high, 55.0);
        assert_eq!(config.control.fan_min, 20);
        assert_eq!(config.control.fan_max, 100);
        assert_eq!(config.control.tick_interval, Duration::from_secs(15));
        assert!(config.peer.is_none());
        assert_eq!(config.status.port, 8080);
        assert_eq!(config.actuator.name(), "pwm");
        assert_ok!(config.validate());
    }

    #[test]
    fn test_peer_enabled_by_hostname() {
        let config = Config::from_lookup(lookup(&[
            ("PEER_HOSTNAME", "pi-b.local"),
            ("PEER_PORT", "9768"),
        ]))
        .unwrap();
        let peer = config.peer.as_ref().unwrap();
        assert_eq!(peer.temp_url(), "http://pi-b.local:9768/temp");
        assert_eq!(peer.timeout, Duration::from_millis(3000));
        assert_ok!(config.validate());
    }

    #[test]
    fn test_blank_peer_hostname_disables_peer() {
        let config = Config::from_lookup(lookup(&[("PEER_HOSTNAME", "  ")])).unwrap();
        assert!(config.peer.is_none());
    }

    #[test]
    fn test_shift_register_selection() {
        let config = Config::from_lookup(lookup(&[
            ("ACTUATOR", "shift-register"),
            ("FAN_MIN", "60"),
            ("FAN_MAX", "255"),
            ("SR_BIT_DELAY_US", "500"),
        ]))
        .unwrap();
        match &config.actuator {
            ActuatorConfig::ShiftRegister {
                data_pin,
                bit_delay,
                ..
            } => {
                assert_eq!(*data_pin, 17);
                assert_eq!(*bit_delay, Duration::from_micros(500));
            }
            other => panic!("unexpected actuator {:?}", other),
        }
        assert_ok!(config.validate());
    }

    #[test]
    fn test_unknown_actuator_rejected() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("ACTUATOR", "relay")])),
            Err(ConfigError::InvalidValue { key: "ACTUATOR", .. })
        ));
    }

    #[test]
    fn test_unparsable_value_rejected() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("TEMP_LOW", "warm")])),
            Err(ConfigError::InvalidValue { key: "TEMP_LOW", .. })
        ));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let config =
            Config::from_lookup(lookup(&[("TEMP_LOW", "55"), ("TEMP_HIGH", "40")])).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThresholds { .. })
        ));
    }

    #[test]
    fn test_pwm_range_over_100_rejected() {
        let config = Config::from_lookup(lookup(&[("FAN_MAX", "255")])).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RangeExceedsActuator { limit: 100, .. })
        ));
    }

    #[test]
    fn test_peer_timeout_must_fit_in_tick() {
        let config = Config::from_lookup(lookup(&[
            ("PEER_HOSTNAME", "pi-b"),
            ("PEER_TIMEOUT_MS", "15000"),
        ]))
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPeerTimeout { .. })
        ));
    }

    #[test]
    fn test_zero_tick_rejected() {
        let config = Config::from_lookup(lookup(&[("TICK_INTERVAL_SECS", "0")])).unwrap();
        assert_err!(config.validate());
    }

    #[test]
    fn test_parse_dotenv() {
        let vars = parse_dotenv(
            "# comment\n\nPEER_HOSTNAME = pi-b.local\nTEMP_LOW=\"40\"\nNAME='a b c'\nBROKEN\n",
        );
        assert_eq!(vars.get("PEER_HOSTNAME").unwrap(), "pi-b.local");
        assert_eq!(vars.get("TEMP_LOW").unwrap(), "40");
        assert_eq!(vars.get("NAME").unwrap(), "a b c");
        assert!(!vars.contains_key("BROKEN"));
    }

    #[test]
    fn test_wiring_key_distinguishes_outputs() {
        let a = ActuatorConfig::default();
        let b = ActuatorConfig::Pwm {
            chip: 0,
            channel: 1,
            frequency_hz: 100,
        };
        assert_ne!(a.wiring_key(), b.wiring_key());
    }
}
