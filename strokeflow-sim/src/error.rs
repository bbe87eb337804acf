use thiserror::Error;

/// Errors raised by the simulation engine.
///
/// None of these are transient: each one signals a programming-contract
/// violation or a parameter that can never produce a valid run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A delay was negative, NaN or infinite.
    #[error("invalid delay {0}: delays must be finite and non-negative")]
    InvalidDelay(f64),
    /// An event was scheduled before the current virtual time.
    #[error("cannot schedule at {at} while the clock is already at {now}")]
    ScheduleInPast {
        /// Requested absolute time.
        at: f64,
        /// Current virtual time.
        now: f64,
    },
    /// A resource pool was built with no units.
    #[error("resource pool '{0}' must have a capacity of at least one unit")]
    ZeroCapacity(String),
    /// A unit was released that the pool does not consider held.
    #[error("resource pool '{pool}' released unit {unit} which is not held")]
    UnitNotHeld {
        /// Pool name.
        pool: String,
        /// Offending unit id.
        unit: usize,
    },
    /// A stream index lies outside the provisioned set.
    #[error("stream {index} ('{name}') requested but only {provisioned} streams were provisioned")]
    StreamNotProvisioned {
        /// Requested index.
        index: usize,
        /// Purpose the caller wanted to bind it to.
        name: &'static str,
        /// Number of streams in the set.
        provisioned: usize,
    },
    /// A stream was bound to a second sampling purpose.
    #[error("stream {index} already bound to '{bound_to}', cannot rebind to '{name}'")]
    StreamAlreadyBound {
        /// Stream index.
        index: usize,
        /// Purpose holding the stream.
        bound_to: &'static str,
        /// Purpose that asked for it again.
        name: &'static str,
    },
    /// Two child streams of one replication derived the same seed.
    #[error("child streams {first} and {second} derived the same seed")]
    DuplicateSeed {
        /// First stream index.
        first: usize,
        /// Second stream index.
        second: usize,
    },
    /// A distribution was constructed with unusable parameters.
    #[error("invalid distribution parameters: {0}")]
    InvalidDistribution(String),
    /// An arrival schedule could not be built.
    #[error("invalid arrival schedule: {0}")]
    InvalidSchedule(String),
}

/// A type alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;
