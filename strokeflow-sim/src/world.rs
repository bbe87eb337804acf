//! Virtual clock and event dispatch for a single replication.
//!
//! [`SimWorld`] owns the clock and the pending-event queue. It never interprets
//! events itself: the owner pulls them one at a time with
//! [`SimWorld::next_until`] and reacts, scheduling follow-up events through
//! [`SimWorld::schedule`]. Every suspension point of a cooperative process is
//! therefore one scheduled event, and everything a handler does between two
//! pulls happens atomically at a single virtual instant.

use std::time::Instant;

use tracing::{instrument, trace};

use crate::{EventQueue, RunMetrics, ScheduledEvent, SimError, SimResult, SimTime};

/// Discrete-event world: a virtual clock plus the queue of pending events.
#[derive(Debug)]
pub struct SimWorld<E> {
    current_time: SimTime,
    event_queue: EventQueue<E>,
    next_sequence: u64,
    events_processed: u64,
    started: Instant,
}

impl<E> SimWorld<E> {
    /// Creates a world whose clock starts at zero.
    pub fn new() -> Self {
        Self {
            current_time: 0.0,
            event_queue: EventQueue::new(),
            next_sequence: 0,
            events_processed: 0,
            started: Instant::now(),
        }
    }

    /// Current virtual time in minutes.
    pub fn now(&self) -> SimTime {
        self.current_time
    }

    /// Schedules `event` to fire `delay` minutes from now.
    pub fn schedule(&mut self, event: E, delay: f64) -> SimResult<()> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SimError::InvalidDelay(delay));
        }
        self.push(self.current_time + delay, event);
        Ok(())
    }

    /// Schedules `event` at an absolute virtual time.
    pub fn schedule_at(&mut self, event: E, time: SimTime) -> SimResult<()> {
        if !time.is_finite() {
            return Err(SimError::InvalidDelay(time));
        }
        if time < self.current_time {
            return Err(SimError::ScheduleInPast {
                at: time,
                now: self.current_time,
            });
        }
        self.push(time, event);
        Ok(())
    }

    fn push(&mut self, time: SimTime, event: E) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.event_queue
            .schedule(ScheduledEvent::new(time, event, sequence));
    }

    /// Pops the next event strictly before `horizon`, advancing the clock to it.
    ///
    /// Returns `None` once no such event remains; the clock is then parked on
    /// a finite horizon. An infinite horizon drains the queue and leaves the
    /// clock on the last event. Events left at or after the horizon stay
    /// queued.
    #[instrument(level = "trace", skip(self))]
    pub fn next_until(&mut self, horizon: SimTime) -> Option<E> {
        let due = self
            .event_queue
            .peek_earliest()
            .is_some_and(|next| next.time() < horizon);
        if !due {
            if horizon.is_finite() && self.current_time < horizon {
                self.current_time = horizon;
            }
            return None;
        }

        let scheduled = self.event_queue.pop_earliest()?;
        trace!(time = scheduled.time(), seq = scheduled.sequence(), "dispatch");
        self.current_time = scheduled.time();
        self.events_processed += 1;
        Some(scheduled.into_event())
    }

    /// Returns true if any event is still queued.
    pub fn has_pending_events(&self) -> bool {
        !self.event_queue.is_empty()
    }

    /// Number of queued events.
    pub fn pending_event_count(&self) -> usize {
        self.event_queue.len()
    }

    /// Number of events handed out so far.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Snapshot of the run's engine metrics.
    pub fn metrics(&self) -> RunMetrics {
        RunMetrics {
            wall_time: self.started.elapsed(),
            simulated_time: self.current_time,
            events_processed: self.events_processed,
        }
    }
}

impl<E> Default for SimWorld<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_advances_to_each_event() {
        let mut world = SimWorld::new();
        world.schedule("b", 50.0).unwrap();
        world.schedule("a", 20.0).unwrap();

        assert_eq!(world.next_until(100.0), Some("a"));
        assert_eq!(world.now(), 20.0);
        assert_eq!(world.next_until(100.0), Some("b"));
        assert_eq!(world.now(), 50.0);
        assert_eq!(world.next_until(100.0), None);
        assert_eq!(world.now(), 100.0);
        assert_eq!(world.events_processed(), 2);
    }

    #[test]
    fn horizon_is_exclusive() {
        let mut world = SimWorld::new();
        world.schedule_at(1, 10.0).unwrap();
        world.schedule_at(2, 9.5).unwrap();

        assert_eq!(world.next_until(10.0), Some(2));
        assert_eq!(world.next_until(10.0), None);
        assert_eq!(world.pending_event_count(), 1);
        assert_eq!(world.now(), 10.0);
    }

    #[test]
    fn zero_delay_keeps_insertion_order() {
        let mut world = SimWorld::new();
        for id in 0..5 {
            world.schedule(id, 0.0).unwrap();
        }
        let order: Vec<_> = std::iter::from_fn(|| world.next_until(1.0)).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn infinite_horizon_keeps_clock_finite() {
        let mut world = SimWorld::new();
        world.schedule_at('a', 30.0).unwrap();
        assert_eq!(world.next_until(f64::INFINITY), Some('a'));
        assert_eq!(world.next_until(f64::INFINITY), None);
        assert_eq!(world.now(), 30.0);

        world.schedule('b', 5.0).unwrap();
        assert_eq!(world.next_until(f64::INFINITY), Some('b'));
        assert_eq!(world.now(), 35.0);
    }

    #[test]
    fn rejects_bad_delays() {
        let mut world: SimWorld<()> = SimWorld::new();
        assert_eq!(world.schedule((), -1.0), Err(SimError::InvalidDelay(-1.0)));
        assert!(world.schedule((), f64::NAN).is_err());
        assert!(world.schedule((), f64::INFINITY).is_err());

        world.schedule((), 5.0).unwrap();
        world.next_until(10.0);
        assert_eq!(
            world.schedule_at((), 1.0),
            Err(SimError::ScheduleInPast { at: 1.0, now: 5.0 })
        );
    }
}
