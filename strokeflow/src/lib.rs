//! # strokeflow
//!
//! Discrete-event simulation of a stroke-care pathway: nurse triage, CT
//! imaging, a same-day emergency care (SDEC) unit and an inpatient ward.
//!
//! - Two time-of-day arrival windows sampled by thinning
//! - Scheduled downtime of the advanced scanner and SDEC, modelled as
//!   administrative seizures that never interrupt a patient
//! - Warm-up patients occupy beds but are left out of every KPI
//! - Replications are independent and bit-reproducible from the master seed
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use strokeflow::{ModelConfig, Trial};
//!
//! let config = ModelConfig::default().with_days(90.0).with_runs(5);
//! let output = Trial::new(config)?.run()?;
//! println!("{}", output.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Arrival processes.
mod arrivals;
/// Scenario configuration.
pub mod config;
/// Scheduled unavailability of obstructable resources.
pub mod downtime;
/// Error types.
pub mod error;
/// Single-replication model.
pub mod model;
/// Patient journey state machine and clinical rules.
pub mod pathway;
/// Patient entity.
pub mod patient;
/// Text reports.
mod report;
/// Run-level KPIs.
pub mod results;
/// Named random streams.
pub mod streams;
/// Multi-replication orchestration.
pub mod trial;

pub use arrivals::window_contains;
pub use config::{
    ArrivalConfig, AvailabilityConfig, Capacities, CaseMix, Costs, DowntimeSchedule, Durations,
    LosTable, ModelConfig, OnsetWeights,
};
pub use downtime::{Downtime, DowntimeState, DowntimeStep};
pub use error::{ConfigError, ModelError, ModelResult};
pub use model::{Event, Model, Obstruction, OccupancySample, PoolKind, Requester, RunOutput};
pub use pathway::{
    avoids_admission_in_sdec, thrombolysed_stay, thrombolysis_eligible, thrombolysis_savings,
    Stage,
};
pub use patient::{
    ArrivalWindow, ClinicalProfile, CutPoints, Diagnosis, OnsetType, Patient, PatientId, Severity,
};
pub use results::RunResults;
pub use trial::{SummaryStat, Trial, TrialHistory, TrialOutput, TrialSummary};
