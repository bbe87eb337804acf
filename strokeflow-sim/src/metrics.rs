//! Engine-level metrics for one replication.

use std::time::Duration;

use serde::Serialize;

use crate::SimTime;

/// Core metrics collected during a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetrics {
    /// Wall-clock time taken for the simulation
    pub wall_time: Duration,
    /// Simulated time reached, in minutes
    pub simulated_time: SimTime,
    /// Number of events processed
    pub events_processed: u64,
}

impl RunMetrics {
    /// Adds another run's metrics into this one.
    ///
    /// Wall and event counts add up; simulated time keeps the furthest clock.
    pub fn absorb(&mut self, other: &RunMetrics) {
        self.wall_time += other.wall_time;
        self.simulated_time = self.simulated_time.max(other.simulated_time);
        self.events_processed += other.events_processed;
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self {
            wall_time: Duration::ZERO,
            simulated_time: 0.0,
            events_processed: 0,
        }
    }
}
