//! One controller per fan output.
//!
//! Two controllers writing the same PWM channel or shift register would fight
//! over the fan. The lock is a listening Unix socket named after the actuator
//! wiring. A socket file left by a killed process refuses connections and is
//! reclaimed.

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceLockError {
    #[error("another controller already drives {0}")]
    AlreadyRunning(String),

    #[error("failed to acquire actuator lock: {0}")]
    Io(#[from] io::Error),
}

/// Held for as long as the controller owns the actuator.
pub struct InstanceLock {
    _listener: UnixListener,
    path: PathBuf,
}

impl InstanceLock {
    /// Lock the output identified by `wiring_key` under the runtime directory.
    pub fn acquire(wiring_key: &str) -> Result<Self, InstanceLockError> {
        Self::acquire_in(&runtime_dir(), wiring_key)
    }

    pub fn acquire_in(dir: &Path, wiring_key: &str) -> Result<Self, InstanceLockError> {
        let path = dir.join(format!("fancontrol-{}.sock", wiring_key));

        if path.exists() {
            if UnixStream::connect(&path).is_ok() {
                return Err(InstanceLockError::AlreadyRunning(wiring_key.to_string()));
            }
            // Left behind by a killed process
            let _ = std::fs::remove_file(&path);
        }

        match UnixListener::bind(&path) {
            Ok(listener) => Ok(Self {
                _listener: listener,
                path,
            }),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                Err(InstanceLockError::AlreadyRunning(wiring_key.to_string()))
            }
            Err(e) => Err(InstanceLockError::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// `XDG_RUNTIME_DIR` when set, `/tmp` otherwise.
pub fn runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("fancontrol-lock-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_second_controller_on_same_output_is_refused() {
        let dir = scratch("same");
        let _first = InstanceLock::acquire_in(&dir, "pwm0-0").unwrap();

        assert!(matches!(
            InstanceLock::acquire_in(&dir, "pwm0-0"),
            Err(InstanceLockError::AlreadyRunning(key)) if key == "pwm0-0"
        ));
    }

    #[test]
    fn test_different_outputs_do_not_conflict() {
        let dir = scratch("different");
        let _a = InstanceLock::acquire_in(&dir, "pwm0-0").unwrap();
        let _b = InstanceLock::acquire_in(&dir, "sr17-27-22").unwrap();
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = scratch("drop");
        let lock = InstanceLock::acquire_in(&dir, "pwm0-1").unwrap();
        let path = lock.path().to_path_buf();
        assert!(path.exists());

        drop(lock);
        assert!(!path.exists());
        InstanceLock::acquire_in(&dir, "pwm0-1").unwrap();
    }

    #[test]
    fn test_stale_socket_file_is_reclaimed() {
        let dir = scratch("stale");
        std::fs::write(dir.join("fancontrol-pwm0-2.sock"), "").unwrap();

        InstanceLock::acquire_in(&dir, "pwm0-2").unwrap();
    }
}
