//! Scheduled unavailability of the advanced scanner and the SDEC unit.
//!
//! A downtime process cycles `Open -> Closing -> Closed -> Open`. Closing
//! asks the resource's pool for a unit at administrative priority, so it is
//! served ahead of waiting patients but never interrupts a patient already
//! holding a unit: a closure can start later than its slot, and the drift is
//! carried into every later cycle.

use strokeflow_sim::{Priority, UnitId};
use tracing::debug;

use crate::{
    config::DowntimeSchedule,
    error::{ModelError, ModelResult},
    model::{Event, Model, Obstruction, Requester},
};

/// Where a downtime process is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DowntimeState {
    /// Before the first opening hour.
    Pending,
    /// Open to patients.
    Open,
    /// Waiting for a unit to seize.
    Closing,
    /// Holding `unit` for the closure.
    Closed {
        /// The seized unit.
        unit: UnitId,
    },
}

/// What the process asks the model to do after a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DowntimeStep {
    /// Wake again after the given minutes.
    Sleep(f64),
    /// Request a unit at administrative priority.
    Seize,
    /// Return `unit`, then wake after `sleep` minutes.
    Release {
        /// Unit to return.
        unit: UnitId,
        /// Minutes until the next closure starts.
        sleep: f64,
    },
}

/// One obstructed resource's downtime process.
#[derive(Debug, Clone)]
pub struct Downtime {
    obstruction: Obstruction,
    schedule: DowntimeSchedule,
    state: DowntimeState,
    open: bool,
    freezes: u64,
}

impl Downtime {
    /// A process that has not reached its first opening hour yet.
    pub fn new(obstruction: Obstruction, schedule: DowntimeSchedule) -> Self {
        Self {
            obstruction,
            schedule,
            state: DowntimeState::Pending,
            open: true,
            freezes: 0,
        }
    }

    /// Delay before the first wake-up.
    pub fn first_wake(&self) -> f64 {
        self.schedule.offset
    }

    /// Advances the cycle on a timed wake-up.
    pub fn on_wake(&mut self) -> ModelResult<DowntimeStep> {
        match self.state {
            DowntimeState::Pending => {
                self.state = DowntimeState::Open;
                Ok(DowntimeStep::Sleep(self.schedule.open_for))
            }
            DowntimeState::Open => {
                self.state = DowntimeState::Closing;
                self.open = false;
                Ok(DowntimeStep::Seize)
            }
            DowntimeState::Closed { unit } => {
                self.state = DowntimeState::Open;
                self.open = true;
                Ok(DowntimeStep::Release {
                    unit,
                    sleep: self.schedule.open_for,
                })
            }
            DowntimeState::Closing => Err(self.invalid("timed wake-up")),
        }
    }

    /// Records the seized unit and returns how long to hold it.
    ///
    /// Closures that start after `warm_up_period` are counted as freezes.
    pub fn on_granted(&mut self, unit: UnitId, now: f64, warm_up_period: f64) -> ModelResult<f64> {
        if self.state != DowntimeState::Closing {
            return Err(self.invalid("unit grant"));
        }
        self.state = DowntimeState::Closed { unit };
        if now > warm_up_period {
            self.freezes += 1;
        }
        Ok(self.schedule.closed_for)
    }

    fn invalid(&self, wake: &str) -> ModelError {
        ModelError::InvalidTransition {
            process: format!("{:?} downtime", self.obstruction),
            wake: wake.to_string(),
            state: format!("{:?}", self.state),
        }
    }

    /// Whether patients may be routed to the resource.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Closures started after warm-up.
    pub fn freezes(&self) -> u64 {
        self.freezes
    }

    /// Current point in the cycle.
    pub fn state(&self) -> DowntimeState {
        self.state
    }

    /// The cycle this process follows.
    pub fn schedule(&self) -> &DowntimeSchedule {
        &self.schedule
    }
}

impl Model {
    pub(crate) fn on_downtime_wake(&mut self, obstruction: Obstruction) -> ModelResult<()> {
        let step = self.downtime_mut(obstruction).on_wake()?;
        debug!(now = self.world.now(), ?obstruction, ?step, "downtime transition");
        match step {
            DowntimeStep::Sleep(delay) => {
                self.world.schedule(Event::Downtime(obstruction), delay)?;
            }
            DowntimeStep::Seize => {
                self.request(
                    obstruction.pool(),
                    Requester::Downtime(obstruction),
                    Priority::ADMINISTRATIVE,
                )?;
            }
            DowntimeStep::Release { unit, sleep } => {
                self.release(obstruction.pool(), unit)?;
                self.world.schedule(Event::Downtime(obstruction), sleep)?;
            }
        }
        Ok(())
    }

    pub(crate) fn on_downtime_granted(
        &mut self,
        obstruction: Obstruction,
        unit: UnitId,
    ) -> ModelResult<()> {
        let now = self.world.now();
        let warm_up = self.config.warm_up_period;
        let hold = self.downtime_mut(obstruction).on_granted(unit, now, warm_up)?;
        debug!(now, ?obstruction, unit, hold, "closed");
        self.world.schedule(Event::Downtime(obstruction), hold)?;
        Ok(())
    }
}
