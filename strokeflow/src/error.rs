use strokeflow_sim::SimError;
use thiserror::Error;

use crate::patient::{Diagnosis, PatientId, Severity};

/// A configuration that cannot produce a valid replication.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A resource pool was given no units.
    #[error("{resource} capacity must be at least 1")]
    ZeroCapacity {
        /// Resource name.
        resource: &'static str,
    },
    /// A quantity that must be strictly positive was not.
    #[error("{field} must be positive and finite, got {value}")]
    NotPositive {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
    /// A quantity that must be non-negative was not.
    #[error("{field} must be non-negative and finite, got {value}")]
    Negative {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
    /// An availability percentage fell outside 0..=100.
    #[error("{resource} availability must be within 0..=100 percent, got {value}")]
    AvailabilityOutOfRange {
        /// Obstructed resource.
        resource: &'static str,
        /// Offending percentage.
        value: f64,
    },
    /// An hour of day fell outside 0..24.
    #[error("{field} must be an hour within 0..24, got {value}")]
    HourOutOfRange {
        /// Field name.
        field: &'static str,
        /// Offending hour.
        value: u32,
    },
    /// A length-of-stay factor fell outside (0, 1].
    #[error("{field} must lie within (0, 1], got {value}")]
    FactorOutOfRange {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
    /// Both arrival windows open at the same hour, so neither has a span.
    #[error("in-hours and out-of-hours windows both start at hour {hour}")]
    ArrivalWindowsCoincide {
        /// Shared start hour.
        hour: u32,
    },
    /// The trial was asked for zero replications.
    #[error("number_of_runs must be at least 1")]
    NoReplications,
    /// Onset-type weights are negative or sum to zero.
    #[error("{window} onset weights must be non-negative with a positive sum, got {weights:?}")]
    InvalidOnsetWeights {
        /// Arrival window the weights belong to.
        window: &'static str,
        /// Offending weights.
        weights: [f64; 3],
    },
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file is not valid TOML for this model.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors that abort a replication or a trial.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Rejected configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Engine contract violation.
    #[error(transparent)]
    Sim(#[from] SimError),
    /// A patient reached the ward with no length-of-stay rule for its case.
    #[error("no ward length-of-stay rule for {diagnosis:?} with severity {severity}")]
    UnmappedLengthOfStay {
        /// Resolved diagnosis.
        diagnosis: Diagnosis,
        /// Presentation severity.
        severity: Severity,
    },
    /// An event named a patient this replication never created.
    #[error("no patient with id {0}")]
    UnknownPatient(PatientId),
    /// A process was woken in a state that cannot accept the wake-up.
    #[error("{process} cannot handle {wake} while {state}")]
    InvalidTransition {
        /// Process identity.
        process: String,
        /// What woke it.
        wake: String,
        /// State it was in.
        state: String,
    },
}

/// A type alias for `Result<T, ModelError>`.
pub type ModelResult<T> = Result<T, ModelError>;
