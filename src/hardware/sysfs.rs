//! Linux sysfs GPIO and PWM lines.
//!
//! GPIO numbers are kernel (BCM) numbers. Channels are exported once when
//! constructed; later writes only touch the `value` / `duty_cycle` files.

use super::{InputLine, Level, OutputLine, PwmOutput};
use crate::error::HardwareError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const GPIO_ROOT: &str = "/sys/class/gpio";
pub const PWM_ROOT: &str = "/sys/class/pwm";

fn write_attr(path: &Path, value: &str, op: &'static str) -> Result<(), HardwareError> {
    fs::write(path, value).map_err(|e| HardwareError::Sysfs {
        op,
        path: path.display().to_string(),
        source: e,
    })
}

/// Export a channel unless the kernel already has it exported.
fn export(root: &Path, index: u32, exported: &Path) -> Result<(), HardwareError> {
    if exported.exists() {
        return Ok(());
    }
    let export_path = root.join("export");
    match fs::write(&export_path, index.to_string()) {
        Ok(()) => Ok(()),
        // EBUSY: exported between our check and write
        Err(e) if e.kind() == io::ErrorKind::ResourceBusy => Ok(()),
        Err(e) => Err(HardwareError::Sysfs {
            op: "export",
            path: export_path.display().to_string(),
            source: e,
        }),
    }
}

/// Direction of a sysfs GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// A GPIO line exported through `/sys/class/gpio`.
pub struct SysfsGpio {
    value_path: PathBuf,
}

impl SysfsGpio {
    pub fn output(pin: u32) -> Result<Self, HardwareError> {
        Self::open(Path::new(GPIO_ROOT), pin, Direction::Out)
    }

    pub fn input(pin: u32) -> Result<Self, HardwareError> {
        Self::open(Path::new(GPIO_ROOT), pin, Direction::In)
    }

    pub fn open(root: &Path, pin: u32, direction: Direction) -> Result<Self, HardwareError> {
        let dir = root.join(format!("gpio{}", pin));
        export(root, pin, &dir)?;

        let direction = match direction {
            // "low" configures an output and drives it low in one write
            Direction::Out => "low",
            Direction::In => "in",
        };
        write_attr(&dir.join("direction"), direction, "set direction")?;

        Ok(Self {
            value_path: dir.join("value"),
        })
    }
}

impl OutputLine for SysfsGpio {
    fn set_level(&mut self, level: Level) -> Result<(), HardwareError> {
        let value = match level {
            Level::Low => "0",
            Level::High => "1",
        };
        write_attr(&self.value_path, value, "write value")
    }
}

impl InputLine for SysfsGpio {
    fn level(&self) -> Result<Level, HardwareError> {
        let raw = fs::read_to_string(&self.value_path).map_err(|e| HardwareError::Sysfs {
            op: "read value",
            path: self.value_path.display().to_string(),
            source: e,
        })?;
        match raw.trim() {
            "0" => Ok(Level::Low),
            "1" => Ok(Level::High),
            other => Err(HardwareError::UnexpectedValue {
                path: self.value_path.display().to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// A hardware PWM channel exported through `/sys/class/pwm/pwmchipN`.
pub struct SysfsPwm {
    period_ns: u64,
    duty_path: PathBuf,
}

impl SysfsPwm {
    pub fn new(chip: u32, channel: u32, frequency_hz: u32) -> Result<Self, HardwareError> {
        Self::open(
            &Path::new(PWM_ROOT).join(format!("pwmchip{}", chip)),
            channel,
            frequency_hz,
        )
    }

    /// Allocate the channel and start it at duty 0.
    pub fn open(chip_root: &Path, channel: u32, frequency_hz: u32) -> Result<Self, HardwareError> {
        let dir = chip_root.join(format!("pwm{}", channel));
        export(chip_root, channel, &dir)?;

        let period_ns = 1_000_000_000 / u64::from(frequency_hz.max(1));
        let duty_path = dir.join("duty_cycle");

        // duty_cycle must never exceed period, so zero it first
        write_attr(&duty_path, "0", "write duty_cycle")?;
        write_attr(&dir.join("period"), &period_ns.to_string(), "write period")?;
        write_attr(&dir.join("enable"), "1", "enable")?;

        Ok(Self {
            period_ns,
            duty_path,
        })
    }

    pub fn period_ns(&self) -> u64 {
        self.period_ns
    }

    fn duty_ns(&self, percent: u32) -> u64 {
        self.period_ns * u64::from(percent.min(100)) / 100
    }
}

impl PwmOutput for SysfsPwm {
    fn set_duty_percent(&mut self, percent: u32) -> Result<(), HardwareError> {
        let duty = self.duty_ns(percent);
        write_attr(&self.duty_path, &duty.to_string(), "write duty_cycle")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fancontrol-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_gpio_output_writes_value() {
        let root = scratch_dir("gpio-out");
        fs::create_dir_all(root.join("gpio17")).unwrap();

        let mut line = SysfsGpio::open(&root, 17, Direction::Out).unwrap();
        assert_eq!(
            fs::read_to_string(root.join("gpio17/direction")).unwrap(),
            "low"
        );

        line.set_high().unwrap();
        assert_eq!(fs::read_to_string(root.join("gpio17/value")).unwrap(), "1");
        line.set_low().unwrap();
        assert_eq!(fs::read_to_string(root.join("gpio17/value")).unwrap(), "0");

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_gpio_exports_missing_pin() {
        let root = scratch_dir("gpio-export");
        // Export "succeeds" but nothing creates gpio16/, so direction fails
        let result = SysfsGpio::open(&root, 16, Direction::In);
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(root.join("export")).unwrap(), "16");

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_gpio_input_reads_level() {
        let root = scratch_dir("gpio-in");
        fs::create_dir_all(root.join("gpio16")).unwrap();

        let line = SysfsGpio::open(&root, 16, Direction::In).unwrap();
        fs::write(root.join("gpio16/value"), "1\n").unwrap();
        assert_eq!(line.level().unwrap(), Level::High);
        fs::write(root.join("gpio16/value"), "0\n").unwrap();
        assert_eq!(line.level().unwrap(), Level::Low);
        fs::write(root.join("gpio16/value"), "x\n").unwrap();
        assert!(line.level().is_err());

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_pwm_starts_at_zero_and_scales_duty() {
        let chip = scratch_dir("pwmchip");
        fs::create_dir_all(chip.join("pwm0")).unwrap();

        let mut pwm = SysfsPwm::open(&chip, 0, 100).unwrap();
        assert_eq!(pwm.period_ns(), 10_000_000);
        assert_eq!(fs::read_to_string(chip.join("pwm0/duty_cycle")).unwrap(), "0");
        assert_eq!(fs::read_to_string(chip.join("pwm0/period")).unwrap(), "10000000");
        assert_eq!(fs::read_to_string(chip.join("pwm0/enable")).unwrap(), "1");

        pwm.set_duty_percent(60).unwrap();
        assert_eq!(
            fs::read_to_string(chip.join("pwm0/duty_cycle")).unwrap(),
            "6000000"
        );

        fs::remove_dir_all(&chip).unwrap();
    }
}
