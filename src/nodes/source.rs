//! Signal sources.
//!
//! Switches, buttons and constants simply drive their state onto output 0.
//! Clocks keep a phase counter that the scheduler advances.

use serde::{Deserialize, Serialize};

/// Phase counter of a clock.
///
/// Every tick advances the phase by one; the clock output is high on odd
/// phases, so a fresh clock starts low.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockPhase {
    ticks: u64,
}

impl ClockPhase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances one phase and returns the new output level.
    pub fn tick(&mut self) -> bool {
        self.ticks = self.ticks.wrapping_add(1);
        self.is_high()
    }

    pub fn is_high(&self) -> bool {
        self.ticks % 2 == 1
    }

    /// Number of ticks since the clock was created.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_alternates() {
        let mut phase = ClockPhase::new();
        assert!(!phase.is_high());
        assert!(phase.tick());
        assert!(!phase.tick());
        assert!(phase.tick());
        assert_eq!(phase.ticks(), 3);
    }
}
