//! Simulated lines for bench runs (`--dry-run`) and tests.
//!
//! Every write is appended to a journal shared by all lines handed out by the
//! same [`SimBoard`], so the exact ordering of edges across lines can be
//! inspected afterwards.

use super::{InputLine, Level, OutputLine, PwmOutput};
use crate::error::HardwareError;
use log::trace;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One recorded hardware write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    Edge { line: String, level: Level },
    Duty { line: String, percent: u32 },
}

/// Factory for simulated lines sharing one journal.
#[derive(Clone, Default)]
pub struct SimBoard {
    journal: Arc<Mutex<Vec<SimEvent>>>,
}

impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self, name: impl Into<String>) -> SimOutput {
        SimOutput {
            name: name.into(),
            journal: self.journal.clone(),
        }
    }

    pub fn pwm(&self, name: impl Into<String>) -> SimPwm {
        SimPwm {
            name: name.into(),
            journal: self.journal.clone(),
        }
    }

    pub fn input(&self, initial: Level) -> SimInput {
        SimInput {
            high: Arc::new(AtomicBool::new(initial == Level::High)),
        }
    }

    /// Snapshot of all writes so far.
    pub fn events(&self) -> Vec<SimEvent> {
        self.journal.lock().clone()
    }

    /// Levels written to one line, in order.
    pub fn edges(&self, line: &str) -> Vec<Level> {
        self.journal
            .lock()
            .iter()
            .filter_map(|event| match event {
                SimEvent::Edge { line: l, level } if l == line => Some(*level),
                _ => None,
            })
            .collect()
    }

    /// Duty values written to one PWM line, in order.
    pub fn duties(&self, line: &str) -> Vec<u32> {
        self.journal
            .lock()
            .iter()
            .filter_map(|event| match event {
                SimEvent::Duty { line: l, percent } if l == line => Some(*percent),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.journal.lock().clear();
    }
}

pub struct SimOutput {
    name: String,
    journal: Arc<Mutex<Vec<SimEvent>>>,
}

impl OutputLine for SimOutput {
    fn set_level(&mut self, level: Level) -> Result<(), HardwareError> {
        trace!("[Sim] {} -> {}", self.name, level);
        self.journal.lock().push(SimEvent::Edge {
            line: self.name.clone(),
            level,
        });
        Ok(())
    }
}

pub struct SimPwm {
    name: String,
    journal: Arc<Mutex<Vec<SimEvent>>>,
}

impl PwmOutput for SimPwm {
    fn set_duty_percent(&mut self, percent: u32) -> Result<(), HardwareError> {
        trace!("[Sim] {} duty {}%", self.name, percent);
        self.journal.lock().push(SimEvent::Duty {
            line: self.name.clone(),
            percent,
        });
        Ok(())
    }
}

/// Simulated input whose level can be flipped from another handle.
#[derive(Clone)]
pub struct SimInput {
    high: Arc<AtomicBool>,
}

impl SimInput {
    pub fn set(&self, level: Level) {
        self.high.store(level == Level::High, Ordering::SeqCst);
    }
}

impl InputLine for SimInput {
    fn level(&self) -> Result<Level, HardwareError> {
        Ok(Level::from(self.high.load(Ordering::SeqCst)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_is_shared_across_lines() {
        let board = SimBoard::new();
        let mut a = board.output("a");
        let mut b = board.output("b");

        a.set_high().unwrap();
        b.set_low().unwrap();
        a.set_low().unwrap();

        assert_eq!(board.edges("a"), vec![Level::High, Level::Low]);
        assert_eq!(board.edges("b"), vec![Level::Low]);
        assert_eq!(board.events().len(), 3);
    }

    #[test]
    fn test_input_can_be_flipped() {
        let board = SimBoard::new();
        let input = board.input(Level::Low);
        let handle = input.clone();

        assert_eq!(input.level().unwrap(), Level::Low);
        handle.set(Level::High);
        assert_eq!(input.level().unwrap(), Level::High);
    }
}
