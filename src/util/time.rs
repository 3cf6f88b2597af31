//! Clocks used by the simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Wall-clock milliseconds since the Unix epoch. Hazard cooldowns are measured with it.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Simulation ticks per second
pub const SIMULATION_TPS: u32 = 60;

/// Wall-clock length of one simulation tick
pub fn tick_duration() -> Duration {
    Duration::from_micros(1_000_000 / SIMULATION_TPS as u64)
}

/// Measures one scheduler step against its time budget
#[derive(Debug, Clone, Copy)]
pub struct StepTimer {
    start: Instant,
    budget: Duration,
}

impl StepTimer {
    pub fn start(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }

    /// Time spent past the budget, if any
    pub fn overrun(&self) -> Option<Duration> {
        self.start.elapsed().checked_sub(self.budget).filter(|over| !over.is_zero())
    }
}
