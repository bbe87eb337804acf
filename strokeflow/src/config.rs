//! Scenario configuration.
//!
//! A [`ModelConfig`] is an immutable snapshot handed to each replication.
//! Everything derived from it (warm-up threshold, run horizon, downtime
//! cycles) is computed on demand rather than stored, so a config can be cloned
//! across threads and replications without shared state.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strokeflow_sim::MINUTES_PER_DAY;

use crate::{
    error::ConfigError,
    patient::{Diagnosis, Severity},
};

/// Arrival demand: two time-of-day windows with their own mean IAT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrivalConfig {
    /// Mean minutes between arrivals during the in-hours window.
    pub in_hours_iat: f64,
    /// Mean minutes between arrivals during the out-of-hours window.
    pub out_of_hours_iat: f64,
    /// Hour of day (0..24) the in-hours window opens.
    pub in_hours_start: u32,
    /// Hour of day (0..24) the out-of-hours window opens.
    pub out_of_hours_start: u32,
}

impl Default for ArrivalConfig {
    fn default() -> Self {
        Self {
            in_hours_iat: 200.0,
            out_of_hours_iat: 2000.0 / 3.0,
            in_hours_start: 7,
            out_of_hours_start: 0,
        }
    }
}

/// Units in each resource pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capacities {
    /// Stroke nurses doing triage.
    pub nurses: usize,
    /// Perfusion-capable CT scanners.
    pub advanced_scanners: usize,
    /// SDEC beds.
    pub sdec_beds: usize,
    /// Stroke ward beds.
    pub ward_beds: usize,
}

impl Default for Capacities {
    fn default() -> Self {
        Self {
            nurses: 2,
            advanced_scanners: 1,
            sdec_beds: 5,
            ward_beds: 1,
        }
    }
}

/// Mean activity durations in minutes (all exponential).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Durations {
    /// Nurse triage consultation.
    pub consult: f64,
    /// Non-contrast CT scan.
    pub standard_ct: f64,
    /// CT perfusion scan.
    pub advanced_ct: f64,
    /// Stay in an SDEC bed.
    pub sdec_stay: f64,
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            consult: 60.0,
            standard_ct: 20.0,
            advanced_ct: 20.0,
            sdec_stay: 240.0,
        }
    }
}

/// Mean ward length of stay in minutes for every diagnosis and severity.
///
/// Stroke categories have one mean per severity score; TIA has a single mean
/// and stroke mimics share the non-stroke mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LosTable {
    /// Ischaemic stroke, indexed by severity 0..=5.
    pub ischaemic: [f64; 6],
    /// Intracerebral haemorrhage, indexed by severity 0..=5.
    pub ich: [f64; 6],
    /// Transient ischaemic attack.
    pub tia: f64,
    /// Stroke mimics and non-stroke presentations.
    pub non_stroke: f64,
}

impl Default for LosTable {
    fn default() -> Self {
        let days = |d: [f64; 6]| d.map(|x| x * MINUTES_PER_DAY);
        Self {
            ischaemic: days([2.88, 4.54, 7.4, 14.14, 26.06, 29.7]),
            ich: days([2.62, 7.03, 12.15, 18.91, 32.45, 41.83]),
            tia: MINUTES_PER_DAY,
            non_stroke: 3.0 * MINUTES_PER_DAY,
        }
    }
}

impl LosTable {
    /// Mean stay for a case, or `None` when no rule covers it.
    pub fn mean_for(&self, diagnosis: Diagnosis, severity: Severity) -> Option<f64> {
        let score = usize::from(severity.value());
        match diagnosis {
            Diagnosis::Ich => self.ich.get(score).copied(),
            Diagnosis::Ischaemic => self.ischaemic.get(score).copied(),
            Diagnosis::Tia => Some(self.tia),
            Diagnosis::StrokeMimic | Diagnosis::NonStroke => Some(self.non_stroke),
        }
    }

    fn entries(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.ischaemic
            .iter()
            .map(|m| ("los.ischaemic", *m))
            .chain(self.ich.iter().map(|m| ("los.ich", *m)))
            .chain([("los.tia", self.tia), ("los.non_stroke", self.non_stroke)])
    }
}

/// Cost constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Costs {
    /// SDEC doctor cost per open minute.
    pub sdec_doctor_per_minute: f64,
    /// Inpatient bed cost per day, saved by each avoided admission.
    pub inpatient_bed_per_day: f64,
    /// Bed cost per day used to value thrombolysis stay reductions.
    pub thrombolysis_bed_per_day: f64,
}

impl Default for Costs {
    fn default() -> Self {
        Self {
            sdec_doctor_per_minute: 0.50,
            inpatient_bed_per_day: 876.0,
            thrombolysis_bed_per_day: 528.17,
        }
    }
}

/// Case-mix thresholds on the 0..=100 percentile scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseMix {
    /// Upper percentile of the ICH band.
    pub ich: f64,
    /// Upper percentile of the ischaemic band.
    pub ischaemic: f64,
    /// Upper percentile of the TIA band.
    pub tia: f64,
    /// Upper percentile of the stroke-mimic band; above it is non-stroke.
    pub stroke_mimic: f64,
    /// Mean of the exponential presentation-severity draw.
    pub mean_severity: f64,
    /// Chance (percent) a TIA patient needs admission.
    pub tia_admission: f64,
    /// Chance (percent) a mimic or non-stroke patient needs admission.
    pub stroke_mimic_admission: f64,
}

impl Default for CaseMix {
    fn default() -> Self {
        Self {
            ich: 10.0,
            ischaemic: 60.0,
            tia: 70.0,
            stroke_mimic: 80.0,
            mean_severity: 2.0,
            tia_admission: 10.0,
            stroke_mimic_admission: 30.0,
        }
    }
}

/// Relative frequency of (known, unknown in window, unknown out of window).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetWeights {
    /// Weights for daytime arrivals.
    pub in_hours: [f64; 3],
    /// Weights for overnight arrivals.
    pub out_of_hours: [f64; 3],
}

impl Default for OnsetWeights {
    fn default() -> Self {
        Self {
            in_hours: [1.0, 1.0, 1.0],
            out_of_hours: [1.0, 1.0, 1.0],
        }
    }
}

/// Daily availability of an obstructable resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityConfig {
    /// Share of each day the resource is open, in percent.
    pub availability_percent: f64,
    /// Hour of day (0..24) the first open period starts.
    pub opening_hour: u32,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            availability_percent: 100.0,
            opening_hour: 0,
        }
    }
}

/// Derived downtime cycle, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DowntimeSchedule {
    /// Delay before the first open period.
    pub offset: f64,
    /// Length of each open period.
    pub open_for: f64,
    /// Length of each closure.
    pub closed_for: f64,
}

impl AvailabilityConfig {
    /// Open/closed cycle for a run of `sim_duration` minutes.
    ///
    /// Full availability never closes within the run: the open period is set
    /// to twice the run length and closures last zero minutes.
    pub fn schedule(&self, sim_duration: f64) -> DowntimeSchedule {
        let offset = f64::from(self.opening_hour) * 60.0;
        if self.availability_percent >= 100.0 {
            return DowntimeSchedule {
                offset,
                open_for: sim_duration * 2.0,
                closed_for: 0.0,
            };
        }
        let open_for = MINUTES_PER_DAY * self.availability_percent / 100.0;
        DowntimeSchedule {
            offset,
            open_for,
            closed_for: MINUTES_PER_DAY - open_for,
        }
    }
}

/// Full scenario configuration for a trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Minutes of simulated time reported on, after warm-up.
    pub sim_duration: f64,
    /// Minutes of initial simulated time excluded from statistics.
    pub warm_up_period: f64,
    /// Number of replications in a trial.
    pub number_of_runs: u32,
    /// Seed every replication's streams derive from.
    pub master_seed: u64,
    /// Whether therapy is delivered in SDEC, widening admission avoidance.
    pub therapy_sdec: bool,
    /// Arrival windows and their rates.
    pub arrivals: ArrivalConfig,
    /// Pool sizes.
    pub capacities: Capacities,
    /// Activity duration means.
    pub durations: Durations,
    /// Ward length-of-stay means.
    pub los: LosTable,
    /// Ward stay multiplier applied to thrombolysed patients.
    pub thrombolysis_los_factor: f64,
    /// Cost constants.
    pub costs: Costs,
    /// Diagnosis mix and admission chances.
    pub case_mix: CaseMix,
    /// Onset-type weights per window.
    pub onset: OnsetWeights,
    /// SDEC opening hours.
    pub sdec: AvailabilityConfig,
    /// CT perfusion scanner opening hours.
    pub advanced_ct: AvailabilityConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let sim_duration = 365.0 * MINUTES_PER_DAY;
        Self {
            sim_duration,
            warm_up_period: sim_duration / 5.0,
            number_of_runs: 10,
            master_seed: 42,
            therapy_sdec: false,
            arrivals: ArrivalConfig::default(),
            capacities: Capacities::default(),
            durations: Durations::default(),
            los: LosTable::default(),
            thrombolysis_los_factor: 0.75,
            costs: Costs::default(),
            case_mix: CaseMix::default(),
            onset: OnsetWeights::default(),
            sdec: AvailabilityConfig::default(),
            advanced_ct: AvailabilityConfig::default(),
        }
    }
}

impl ModelConfig {
    /// Default scenario.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TOML document; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ModelConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Set the reported duration in days, keeping warm-up at a fifth of it.
    pub fn with_days(mut self, days: f64) -> Self {
        self.sim_duration = days * MINUTES_PER_DAY;
        self.warm_up_period = self.sim_duration / 5.0;
        self
    }

    /// Set the reported duration in minutes.
    pub fn with_sim_duration(mut self, minutes: f64) -> Self {
        self.sim_duration = minutes;
        self
    }

    /// Set the warm-up period in minutes.
    pub fn with_warm_up(mut self, minutes: f64) -> Self {
        self.warm_up_period = minutes;
        self
    }

    /// Set the number of replications.
    pub fn with_runs(mut self, runs: u32) -> Self {
        self.number_of_runs = runs;
        self
    }

    /// Set the master seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.master_seed = seed;
        self
    }

    /// Set the SDEC therapy mode.
    pub fn with_therapy_sdec(mut self, enabled: bool) -> Self {
        self.therapy_sdec = enabled;
        self
    }

    /// Set SDEC daily availability.
    pub fn with_sdec_availability(mut self, percent: f64, opening_hour: u32) -> Self {
        self.sdec = AvailabilityConfig {
            availability_percent: percent,
            opening_hour,
        };
        self
    }

    /// Set advanced scanner daily availability.
    pub fn with_advanced_ct_availability(mut self, percent: f64, opening_hour: u32) -> Self {
        self.advanced_ct = AvailabilityConfig {
            availability_percent: percent,
            opening_hour,
        };
        self
    }

    /// Time at which replications stop: warm-up plus reported duration.
    pub fn run_until(&self) -> f64 {
        self.warm_up_period + self.sim_duration
    }

    /// Severity below which an SDEC stroke patient avoids admission.
    pub fn avoidance_severity_limit(&self) -> u8 {
        if self.therapy_sdec {
            4
        } else {
            2
        }
    }

    /// Checks every constraint a replication relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("sim_duration", self.sim_duration)?;
        non_negative("warm_up_period", self.warm_up_period)?;
        if self.number_of_runs == 0 {
            return Err(ConfigError::NoReplications);
        }

        positive("arrivals.in_hours_iat", self.arrivals.in_hours_iat)?;
        positive("arrivals.out_of_hours_iat", self.arrivals.out_of_hours_iat)?;
        hour("arrivals.in_hours_start", self.arrivals.in_hours_start)?;
        hour("arrivals.out_of_hours_start", self.arrivals.out_of_hours_start)?;
        if self.arrivals.in_hours_start == self.arrivals.out_of_hours_start {
            return Err(ConfigError::ArrivalWindowsCoincide {
                hour: self.arrivals.in_hours_start,
            });
        }

        let caps = &self.capacities;
        for (resource, units) in [
            ("nurses", caps.nurses),
            ("advanced_scanners", caps.advanced_scanners),
            ("sdec_beds", caps.sdec_beds),
            ("ward_beds", caps.ward_beds),
        ] {
            if units == 0 {
                return Err(ConfigError::ZeroCapacity { resource });
            }
        }

        let d = &self.durations;
        positive("durations.consult", d.consult)?;
        positive("durations.standard_ct", d.standard_ct)?;
        positive("durations.advanced_ct", d.advanced_ct)?;
        positive("durations.sdec_stay", d.sdec_stay)?;
        for (field, mean) in self.los.entries() {
            positive(field, mean)?;
        }

        if !(self.thrombolysis_los_factor > 0.0 && self.thrombolysis_los_factor <= 1.0) {
            return Err(ConfigError::FactorOutOfRange {
                field: "thrombolysis_los_factor",
                value: self.thrombolysis_los_factor,
            });
        }

        non_negative("costs.sdec_doctor_per_minute", self.costs.sdec_doctor_per_minute)?;
        non_negative("costs.inpatient_bed_per_day", self.costs.inpatient_bed_per_day)?;
        non_negative(
            "costs.thrombolysis_bed_per_day",
            self.costs.thrombolysis_bed_per_day,
        )?;

        let mix = &self.case_mix;
        for (field, value) in [
            ("case_mix.ich", mix.ich),
            ("case_mix.ischaemic", mix.ischaemic),
            ("case_mix.tia", mix.tia),
            ("case_mix.stroke_mimic", mix.stroke_mimic),
            ("case_mix.tia_admission", mix.tia_admission),
            ("case_mix.stroke_mimic_admission", mix.stroke_mimic_admission),
        ] {
            non_negative(field, value)?;
        }
        positive("case_mix.mean_severity", mix.mean_severity)?;

        onset("in-hours", self.onset.in_hours)?;
        onset("out-of-hours", self.onset.out_of_hours)?;

        for (resource, avail) in [("sdec", &self.sdec), ("advanced_ct", &self.advanced_ct)] {
            if !(0.0..=100.0).contains(&avail.availability_percent) {
                return Err(ConfigError::AvailabilityOutOfRange {
                    resource,
                    value: avail.availability_percent,
                });
            }
            hour(
                if resource == "sdec" {
                    "sdec.opening_hour"
                } else {
                    "advanced_ct.opening_hour"
                },
                avail.opening_hour,
            )?;
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn hour(field: &'static str, value: u32) -> Result<(), ConfigError> {
    if value < 24 {
        Ok(())
    } else {
        Err(ConfigError::HourOutOfRange { field, value })
    }
}

fn onset(window: &'static str, weights: [f64; 3]) -> Result<(), ConfigError> {
    let valid = weights.iter().all(|w| w.is_finite() && *w >= 0.0) && weights.iter().sum::<f64>() > 0.0;
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidOnsetWeights { window, weights })
    }
}
