//! In-hours and out-of-hours arrival processes.
//!
//! Both processes sample gaps from the same hourly schedule, each on its own
//! streams, and create a patient only when they wake inside their own window.
//! A wake-up outside the window creates nobody and just samples the next gap,
//! which keeps each window's arrivals an exact Poisson process at that
//! window's rate.

use strokeflow_sim::{is_in_window, SimTime, MINUTES_PER_DAY};
use tracing::debug;

use crate::{
    config::ArrivalConfig,
    error::ModelResult,
    model::{Event, Model},
    pathway::Stage,
    patient::{ArrivalWindow, Patient},
};

/// Whether `now` falls inside `window`'s hours.
pub fn window_contains(arrivals: &ArrivalConfig, window: ArrivalWindow, now: SimTime) -> bool {
    let in_hours = f64::from(arrivals.in_hours_start) * 60.0;
    let out_of_hours = f64::from(arrivals.out_of_hours_start) * 60.0;
    let minute = now.rem_euclid(MINUTES_PER_DAY);
    match window {
        ArrivalWindow::InHours => is_in_window(minute, in_hours, out_of_hours),
        ArrivalWindow::OutOfHours => is_in_window(minute, out_of_hours, in_hours),
    }
}

impl Model {
    pub(crate) fn start_arrivals(&mut self, window: ArrivalWindow) -> ModelResult<()> {
        let gap = self.samplers.arrival_gap(window, self.world.now());
        self.world.schedule(Event::Arrival(window), gap)?;
        Ok(())
    }

    pub(crate) fn on_arrival(&mut self, window: ArrivalWindow) -> ModelResult<()> {
        let now = self.world.now();
        if window_contains(&self.config.arrivals, window, now) {
            self.spawn_patient(window)?;
        }
        let gap = self.samplers.arrival_gap(window, now);
        self.world.schedule(Event::Arrival(window), gap)?;
        Ok(())
    }

    fn spawn_patient(&mut self, window: ArrivalWindow) -> ModelResult<()> {
        let id = self.patients.len() as u64 + 1;
        let profile = self.samplers.clinical_profile(window);
        let patient = Patient::new(
            id,
            self.replication,
            window,
            self.world.now(),
            self.config.warm_up_period,
            profile,
        );
        debug!(
            id,
            now = patient.arrival_time,
            ?window,
            diagnosis = ?patient.diagnosis,
            severity = %patient.severity,
            "patient arrived"
        );
        self.patients.push(patient);
        self.stages.push(Stage::Arrived);
        self.begin_pathway(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_partition_the_day() {
        let arrivals = ArrivalConfig::default();
        for minute in 0..1440 {
            let t = f64::from(minute) + 3.0 * MINUTES_PER_DAY;
            let in_hours = window_contains(&arrivals, ArrivalWindow::InHours, t);
            let out_of_hours = window_contains(&arrivals, ArrivalWindow::OutOfHours, t);
            assert_ne!(in_hours, out_of_hours, "minute {minute}");
        }
        assert!(!window_contains(&arrivals, ArrivalWindow::InHours, 419.0));
        assert!(window_contains(&arrivals, ArrivalWindow::InHours, 420.0));
        assert!(window_contains(&arrivals, ArrivalWindow::OutOfHours, 0.0));
    }

    #[test]
    fn overnight_window_wraps_midnight() {
        let arrivals = ArrivalConfig {
            in_hours_start: 8,
            out_of_hours_start: 20,
            ..ArrivalConfig::default()
        };
        assert!(window_contains(&arrivals, ArrivalWindow::OutOfHours, 23.0 * 60.0));
        assert!(window_contains(&arrivals, ArrivalWindow::OutOfHours, 2.0 * 60.0));
        assert!(window_contains(&arrivals, ArrivalWindow::InHours, 12.0 * 60.0));
    }
}
