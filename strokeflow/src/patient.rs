//! The patient entity and its clinical attribute types.

use std::fmt;

use serde::{Deserialize, Serialize};
use strokeflow_sim::{SimTime, UnitId};

/// Patient identifier, unique within one replication (1-based).
pub type PatientId = u64;

/// Resolved diagnosis category, in decreasing clinical priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Diagnosis {
    /// Intracerebral haemorrhage.
    Ich,
    /// Ischaemic stroke.
    Ischaemic,
    /// Transient ischaemic attack.
    Tia,
    /// Presentation that mimics a stroke.
    StrokeMimic,
    /// Anything else.
    NonStroke,
}

impl Diagnosis {
    /// Every category in priority order.
    pub const ALL: [Diagnosis; 5] = [
        Diagnosis::Ich,
        Diagnosis::Ischaemic,
        Diagnosis::Tia,
        Diagnosis::StrokeMimic,
        Diagnosis::NonStroke,
    ];

    /// ICH or ischaemic stroke.
    pub fn is_stroke(self) -> bool {
        matches!(self, Diagnosis::Ich | Diagnosis::Ischaemic)
    }

    /// TIA, mimic or non-stroke: cases that may go home without admission.
    pub fn is_minor(self) -> bool {
        !self.is_stroke()
    }
}

/// What is known about symptom onset at presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OnsetType {
    /// Onset time known.
    Known,
    /// Unknown onset, but inside the perfusion-imaging treatment window.
    UnknownInWindow,
    /// Unknown onset and outside the window.
    UnknownOutOfWindow,
}

impl OnsetType {
    /// Categories in the order their weights are configured.
    pub const ALL: [OnsetType; 3] = [
        OnsetType::Known,
        OnsetType::UnknownInWindow,
        OnsetType::UnknownOutOfWindow,
    ];
}

/// Which arrival process generated the patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrivalWindow {
    /// Daytime demand window.
    InHours,
    /// Overnight demand window.
    OutOfHours,
}

/// Modified-Rankin-like severity score, 0 (no symptoms) to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Severity(u8);

impl Severity {
    /// Highest score on the scale.
    pub const MAX: u8 = 5;

    /// Builds a score, capping at [`Severity::MAX`].
    pub fn new(score: u8) -> Self {
        Severity(score.min(Self::MAX))
    }

    /// Rounds a continuous draw to the nearest score, clamped into the scale.
    pub fn from_draw(draw: f64) -> Self {
        let rounded = draw.round().clamp(0.0, f64::from(Self::MAX));
        // Clamped to 0..=5, so the cast is exact
        Severity(rounded as u8)
    }

    /// Numeric score.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Score lowered by `points`, never below zero.
    pub fn improved_by(self, points: u8) -> Self {
        Severity(self.0.saturating_sub(points))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-patient diagnosis thresholds on the 0..=100 percentile scale.
///
/// Built from five independently perturbed offsets, then clamped so each cut
/// point is at least the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CutPoints([f64; 5]);

impl CutPoints {
    /// Clamps raw offsets into a non-decreasing sequence.
    pub fn from_offsets(offsets: [f64; 5]) -> Self {
        let mut cuts = offsets;
        for i in 1..cuts.len() {
            cuts[i] = cuts[i].max(cuts[i - 1]);
        }
        CutPoints(cuts)
    }

    /// The clamped thresholds.
    pub fn values(&self) -> [f64; 5] {
        self.0
    }

    /// Category for a raw percentile.
    ///
    /// Anything above the mimic threshold is non-stroke; the fifth cut point
    /// only bounds the non-stroke band from below.
    pub fn classify(&self, percentile: i64) -> Diagnosis {
        let p = percentile as f64;
        let [ich, ischaemic, tia, mimic, _] = self.0;
        if p <= ich {
            Diagnosis::Ich
        } else if p <= ischaemic {
            Diagnosis::Ischaemic
        } else if p <= tia {
            Diagnosis::Tia
        } else if p <= mimic {
            Diagnosis::StrokeMimic
        } else {
            Diagnosis::NonStroke
        }
    }
}

/// Attributes sampled once, when the patient arrives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClinicalProfile {
    /// Onset category.
    pub onset_type: OnsetType,
    /// Presentation severity.
    pub severity: Severity,
    /// Raw diagnosis percentile, 0..=100.
    pub diagnosis_percentile: i64,
    /// Resolved category.
    pub diagnosis: Diagnosis,
    /// Non-admission percentile, 0..=100.
    pub non_admission_percentile: i64,
}

/// One patient's journey record.
///
/// Created by an arrival process, mutated only by its own pathway, and frozen
/// once `journey_completed` is set. Times are virtual minutes; a `None` means
/// the stage was never reached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patient {
    /// Identifier within the replication.
    pub id: PatientId,
    /// Replication index.
    pub run: u32,

    /// Arrival process that created the patient.
    pub arrival_window: ArrivalWindow,
    /// Whether the patient arrived out of hours.
    pub arrived_ooh: bool,
    /// Arrival instant.
    pub arrival_time: SimTime,
    /// Whether arrival fell inside warm-up; such patients are left out of KPIs.
    pub generated_during_warm_up: bool,

    /// Onset category.
    pub onset_type: OnsetType,
    /// Severity at presentation.
    pub severity: Severity,
    /// Raw diagnosis percentile.
    pub diagnosis_percentile: i64,
    /// Resolved diagnosis.
    pub diagnosis: Diagnosis,
    /// Percentile compared with admission chances.
    pub non_admission_percentile: i64,

    /// Scanned on the perfusion scanner.
    pub advanced_ct_pathway: bool,
    /// Routed to SDEC.
    pub sdec_pathway: bool,
    /// Whether SDEC was open when imaging finished.
    pub sdec_running_when_required: Option<bool>,
    /// Whether SDEC was full when imaging finished.
    pub sdec_full_when_required: Option<bool>,
    /// Received thrombolysis.
    pub thrombolysis: bool,
    /// Received thrombectomy. Never set; no thrombectomy pathway exists.
    pub thrombectomy: bool,
    /// Sent home from SDEC without a ward admission.
    pub admission_avoidance: bool,
    /// Minor case sent home at the ward decision point.
    pub non_admitted_minor: bool,
    /// Journey finished; the record no longer changes.
    pub journey_completed: bool,

    /// Minutes waited for a nurse.
    pub q_time_nurse: Option<f64>,
    /// Minutes waited for a ward bed.
    pub q_time_ward: Option<f64>,
    /// Scan length.
    pub imaging_duration: Option<f64>,
    /// Sampled SDEC stay.
    pub sdec_los: Option<f64>,
    /// Sampled ward stay before any thrombolysis reduction.
    pub ward_los_baseline: Option<f64>,
    /// Ward stay actually served.
    pub ward_los: Option<f64>,
    /// Severity on leaving the ward.
    pub discharge_severity: Option<Severity>,
    /// Bed cost saved by a shorter thrombolysed stay.
    pub thrombolysis_savings: f64,
    /// Occupied ward beds when admitted, including this one.
    pub ward_occupancy_at_admission: Option<usize>,

    /// Joined the nurse queue.
    pub nurse_q_start_time: Option<SimTime>,
    /// Triage started.
    pub triage_start_time: Option<SimTime>,
    /// Triage finished.
    pub triage_end_time: Option<SimTime>,
    /// Scan started.
    pub scan_start_time: Option<SimTime>,
    /// Scan finished.
    pub scan_end_time: Option<SimTime>,
    /// Took an SDEC bed.
    pub sdec_admit_time: Option<SimTime>,
    /// Left the SDEC bed.
    pub sdec_discharge_time: Option<SimTime>,
    /// Joined the ward queue.
    pub ward_q_start_time: Option<SimTime>,
    /// Took a ward bed.
    pub ward_admit_time: Option<SimTime>,
    /// Left the ward.
    pub ward_discharge_time: Option<SimTime>,
    /// Left the pathway.
    pub exit_time: Option<SimTime>,

    /// Nurse unit that triaged the patient.
    pub nurse_id: Option<UnitId>,
    /// Perfusion scanner unit used, if any.
    pub scanner_id: Option<UnitId>,
    /// SDEC bed held.
    pub sdec_bed_id: Option<UnitId>,
    /// Ward bed held.
    pub ward_bed_id: Option<UnitId>,
}

impl Patient {
    /// A freshly arrived patient with no pathway progress yet.
    pub fn new(
        id: PatientId,
        run: u32,
        window: ArrivalWindow,
        arrival_time: SimTime,
        warm_up_period: f64,
        profile: ClinicalProfile,
    ) -> Self {
        Self {
            id,
            run,
            arrival_window: window,
            arrived_ooh: window == ArrivalWindow::OutOfHours,
            arrival_time,
            generated_during_warm_up: arrival_time < warm_up_period,
            onset_type: profile.onset_type,
            severity: profile.severity,
            diagnosis_percentile: profile.diagnosis_percentile,
            diagnosis: profile.diagnosis,
            non_admission_percentile: profile.non_admission_percentile,
            advanced_ct_pathway: false,
            sdec_pathway: false,
            sdec_running_when_required: None,
            sdec_full_when_required: None,
            thrombolysis: false,
            thrombectomy: false,
            admission_avoidance: false,
            non_admitted_minor: false,
            journey_completed: false,
            q_time_nurse: None,
            q_time_ward: None,
            imaging_duration: None,
            sdec_los: None,
            ward_los_baseline: None,
            ward_los: None,
            discharge_severity: None,
            thrombolysis_savings: 0.0,
            ward_occupancy_at_admission: None,
            nurse_q_start_time: None,
            triage_start_time: None,
            triage_end_time: None,
            scan_start_time: None,
            scan_end_time: None,
            sdec_admit_time: None,
            sdec_discharge_time: None,
            ward_q_start_time: None,
            ward_admit_time: None,
            ward_discharge_time: None,
            exit_time: None,
            nurse_id: None,
            scanner_id: None,
            sdec_bed_id: None,
            ward_bed_id: None,
        }
    }

    /// Whether the patient counts towards reported statistics.
    pub fn counts_after_warm_up(&self) -> bool {
        !self.generated_during_warm_up
    }

    /// Whether the patient was admitted to a ward bed.
    pub fn was_admitted(&self) -> bool {
        self.ward_admit_time.is_some()
    }

    /// Severity points recovered between presentation and discharge.
    pub fn severity_change(&self) -> Option<i32> {
        self.discharge_severity
            .map(|d| i32::from(self.severity.value()) - i32::from(d.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population_cuts() -> CutPoints {
        CutPoints::from_offsets([10.0, 60.0, 70.0, 80.0, 80.0])
    }

    #[test]
    fn percentile_zero_is_ich_and_hundred_is_non_stroke() {
        let cuts = population_cuts();
        assert_eq!(cuts.classify(0), Diagnosis::Ich);
        assert_eq!(cuts.classify(100), Diagnosis::NonStroke);
    }

    #[test]
    fn boundaries_are_inclusive() {
        let cuts = population_cuts();
        assert_eq!(cuts.classify(10), Diagnosis::Ich);
        assert_eq!(cuts.classify(11), Diagnosis::Ischaemic);
        assert_eq!(cuts.classify(60), Diagnosis::Ischaemic);
        assert_eq!(cuts.classify(70), Diagnosis::Tia);
        assert_eq!(cuts.classify(80), Diagnosis::StrokeMimic);
        assert_eq!(cuts.classify(81), Diagnosis::NonStroke);
    }

    #[test]
    fn offsets_are_clamped_non_decreasing() {
        let cuts = CutPoints::from_offsets([12.0, 9.0, 71.0, 69.5, 80.2]);
        assert_eq!(cuts.values(), [12.0, 12.0, 71.0, 71.0, 80.2]);
        // The ischaemic band collapses, so 12 is ICH and 13 skips straight to TIA
        assert_eq!(cuts.classify(12), Diagnosis::Ich);
        assert_eq!(cuts.classify(13), Diagnosis::Tia);
    }

    #[test]
    fn severity_draws_round_and_cap() {
        assert_eq!(Severity::from_draw(0.49).value(), 0);
        assert_eq!(Severity::from_draw(2.5).value(), 3);
        assert_eq!(Severity::from_draw(17.3).value(), 5);
        assert_eq!(Severity::new(9).value(), 5);
        assert_eq!(Severity::new(1).improved_by(2).value(), 0);
    }

    #[test]
    fn warm_up_membership_uses_arrival_time() {
        let profile = ClinicalProfile {
            onset_type: OnsetType::Known,
            severity: Severity::new(2),
            diagnosis_percentile: 30,
            diagnosis: Diagnosis::Ischaemic,
            non_admission_percentile: 50,
        };
        let early = Patient::new(1, 0, ArrivalWindow::InHours, 99.0, 100.0, profile);
        let late = Patient::new(2, 0, ArrivalWindow::OutOfHours, 100.0, 100.0, profile);
        assert!(early.generated_during_warm_up);
        assert!(!late.generated_during_warm_up);
        assert!(late.arrived_ooh);
        assert!(late.counts_after_warm_up());
        assert_eq!(late.severity_change(), None);
    }
}
