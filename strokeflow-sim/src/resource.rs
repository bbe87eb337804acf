//! Capacity-limited resource pools with a priority wait queue.
//!
//! A pool hands out numbered units. Requests that cannot be served at once
//! wait in a queue ordered by `(priority, request sequence)`; lower priority
//! values are served first and equal priorities are served FIFO. A holder is
//! never interrupted: a better-priority request only jumps the *queue*, so an
//! administrative seizure takes effect once a unit is next released.

use std::{
    cmp::Ordering,
    collections::{BTreeSet, BinaryHeap},
    fmt,
};

use serde::Serialize;
use tracing::trace;

use crate::{SimError, SimResult};

/// Identifier of one unit within a pool (1-based).
pub type UnitId = usize;

/// Queue priority of a request. Lower values are served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Priority(pub i32);

impl Priority {
    /// Administrative seizure used to model scheduled downtime.
    pub const ADMINISTRATIVE: Priority = Priority(-1);
    /// Ordinary patient request.
    pub const PATIENT: Priority = Priority(1);
}

/// A unit handed to a requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant<R> {
    /// Who receives the unit.
    pub requester: R,
    /// The unit granted.
    pub unit: UnitId,
}

#[derive(Debug)]
struct Waiting<R> {
    priority: Priority,
    sequence: u64,
    requester: R,
}

impl<R> PartialEq for Waiting<R> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<R> Eq for Waiting<R> {}

impl<R> PartialOrd for Waiting<R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R> Ord for Waiting<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max heap: reverse so the lowest (priority, sequence) pops first
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// A pool of identical units contended by requesters of type `R`.
pub struct ResourcePool<R> {
    name: String,
    capacity: usize,
    free: BTreeSet<UnitId>,
    queue: BinaryHeap<Waiting<R>>,
    next_sequence: u64,
    peak_in_use: usize,
}

impl<R> fmt::Debug for ResourcePool<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("in_use", &self.in_use())
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl<R> ResourcePool<R> {
    /// Creates a pool with units `1..=capacity`, all free.
    pub fn new(name: impl Into<String>, capacity: usize) -> SimResult<Self> {
        let name = name.into();
        if capacity == 0 {
            return Err(SimError::ZeroCapacity(name));
        }
        Ok(Self {
            name,
            capacity,
            free: (1..=capacity).collect(),
            queue: BinaryHeap::new(),
            next_sequence: 0,
            peak_in_use: 0,
        })
    }

    /// Asks for a unit.
    ///
    /// Returns the grant immediately when a unit is free and nobody is
    /// queued; otherwise the requester joins the queue and `None` is returned.
    /// The queued request is granted later by [`ResourcePool::release`].
    pub fn request(&mut self, requester: R, priority: Priority) -> Option<Grant<R>> {
        if self.queue.is_empty() {
            if let Some(unit) = self.take_free() {
                trace!(pool = %self.name, unit, "granted immediately");
                return Some(Grant { requester, unit });
            }
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue.push(Waiting {
            priority,
            sequence,
            requester,
        });
        trace!(pool = %self.name, queued = self.queue.len(), "request queued");
        None
    }

    /// Returns `unit` to the pool, handing it to the head of the queue if any.
    pub fn release(&mut self, unit: UnitId) -> SimResult<Option<Grant<R>>> {
        if unit == 0 || unit > self.capacity || self.free.contains(&unit) {
            return Err(SimError::UnitNotHeld {
                pool: self.name.clone(),
                unit,
            });
        }
        match self.queue.pop() {
            Some(next) => {
                trace!(pool = %self.name, unit, "handed over to queued request");
                Ok(Some(Grant {
                    requester: next.requester,
                    unit,
                }))
            }
            None => {
                self.free.insert(unit);
                Ok(None)
            }
        }
    }

    fn take_free(&mut self) -> Option<UnitId> {
        let unit = self.free.pop_first()?;
        self.peak_in_use = self.peak_in_use.max(self.in_use());
        Some(unit)
    }

    /// Pool name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured number of units.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Units currently held.
    pub fn in_use(&self) -> usize {
        self.capacity - self.free.len()
    }

    /// Units currently free.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Requests waiting for a unit.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Highest number of units held at once so far.
    pub fn peak_in_use(&self) -> usize {
        self.peak_in_use
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        let pool = ResourcePool::<u32>::new("ward", 0);
        assert_eq!(pool.unwrap_err(), SimError::ZeroCapacity("ward".into()));
    }

    #[test]
    fn grants_lowest_free_unit_until_full() {
        let mut pool = ResourcePool::new("nurses", 2).unwrap();

        assert_eq!(
            pool.request("p1", Priority::PATIENT),
            Some(Grant { requester: "p1", unit: 1 })
        );
        assert_eq!(pool.request("p2", Priority::PATIENT).map(|g| g.unit), Some(2));
        assert_eq!(pool.request("p3", Priority::PATIENT), None);
        assert_eq!(pool.in_use(), 2);
        assert_eq!(pool.queue_len(), 1);

        // Unit 1 goes straight to the waiting requester
        let handed = pool.release(1).unwrap();
        assert_eq!(handed, Some(Grant { requester: "p3", unit: 1 }));
        assert_eq!(pool.in_use(), 2);

        assert_eq!(pool.release(2).unwrap(), None);
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.peak_in_use(), 2);
    }

    #[test]
    fn fifo_within_equal_priority() {
        let mut pool = ResourcePool::new("ward", 1).unwrap();
        pool.request(0, Priority::PATIENT).unwrap();
        for id in 1..=4 {
            assert!(pool.request(id, Priority::PATIENT).is_none());
        }

        let mut served = Vec::new();
        let mut unit = 1;
        while let Some(grant) = pool.release(unit).unwrap() {
            served.push(grant.requester);
            unit = grant.unit;
        }
        assert_eq!(served, vec![1, 2, 3, 4]);
    }

    #[test]
    fn administrative_request_jumps_queue_but_never_preempts_holder() {
        let mut pool = ResourcePool::new("scanner", 1).unwrap();
        pool.request("patient-a", Priority::PATIENT).unwrap();
        assert!(pool.request("patient-b", Priority::PATIENT).is_none());
        assert!(pool.request("downtime", Priority::ADMINISTRATIVE).is_none());

        // Holder keeps its unit until it releases
        assert_eq!(pool.in_use(), 1);

        let next = pool.release(1).unwrap().unwrap();
        assert_eq!(next.requester, "downtime");
        let after = pool.release(next.unit).unwrap().unwrap();
        assert_eq!(after.requester, "patient-b");
    }

    #[test]
    fn releasing_free_or_unknown_unit_fails() {
        let mut pool = ResourcePool::<()>::new("sdec", 2).unwrap();
        assert!(matches!(pool.release(1), Err(SimError::UnitNotHeld { unit: 1, .. })));
        assert!(pool.release(3).is_err());
        assert!(pool.release(0).is_err());
    }
}
