//! # strokeflow-sim
//!
//! A small deterministic discrete-event engine for queueing models.
//!
//! - Virtual time measured in minutes, advanced only by popping the next event
//! - Same-instant events dispatched in the order they were scheduled
//! - Capacity-limited resource pools with a `(priority, sequence)` wait queue
//! - Per-replication independent random streams, each bound to one purpose
//! - Non-stationary arrivals sampled by thinning
//!
//! ## Example Usage
//!
//! ```rust
//! use strokeflow_sim::{Priority, ResourcePool, SimWorld};
//!
//! #[derive(Debug, PartialEq)]
//! enum Event {
//!     Done(u32),
//! }
//!
//! let mut world = SimWorld::new();
//! let mut beds = ResourcePool::new("beds", 1).unwrap();
//!
//! let grant = beds.request(1u32, Priority::PATIENT).unwrap();
//! world.schedule(Event::Done(grant.requester), 30.0).unwrap();
//!
//! assert_eq!(world.next_until(60.0), Some(Event::Done(1)));
//! assert_eq!(world.now(), 30.0);
//! assert_eq!(beds.release(grant.unit).unwrap(), None);
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Time-varying arrival sampling.
pub mod arrivals;
/// Sampling distributions bound to random streams.
pub mod distributions;
/// Error types for engine operations.
pub mod error;
/// Event scheduling primitives.
pub mod events;
/// Engine metrics.
pub mod metrics;
/// Resource pools.
pub mod resource;
/// Reproducible random streams.
pub mod rng;
/// Virtual clock and event dispatch.
pub mod world;

/// Virtual time in minutes.
pub type SimTime = f64;

pub use arrivals::{is_in_window, ArrivalSchedule, ThinningSampler, MINUTES_PER_DAY};
pub use distributions::{DiscreteEmpirical, Exponential, Normal};
pub use error::{SimError, SimResult};
pub use events::{EventQueue, ScheduledEvent};
pub use metrics::RunMetrics;
pub use resource::{Grant, Priority, ResourcePool, UnitId};
pub use rng::{replication_seed, RandomStream, StreamSet};
pub use world::SimWorld;
