//! Run-level KPIs computed from a replication's patients.

use serde::Serialize;
use strokeflow_sim::MINUTES_PER_DAY;

use crate::{
    config::ModelConfig,
    downtime::Downtime,
    patient::{Diagnosis, OnsetType, Patient},
};

/// KPIs of one replication, over patients arriving after warm-up.
///
/// Queue and stay times on the ward are in hours; nurse queues in minutes.
/// Means over an empty set are reported as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResults {
    /// Replication index.
    pub run: u32,
    /// Patients arriving after warm-up.
    pub patients_assessed: usize,
    /// Mean wait for a nurse, minutes.
    pub mean_q_time_nurse: f64,
    /// Longest wait for a nurse, minutes.
    pub max_q_time_nurse: f64,
    /// Mean wait for a ward bed, hours.
    pub mean_q_time_ward: f64,
    /// Longest wait for a ward bed, hours.
    pub max_q_time_ward: f64,
    /// Stroke patients sent home from SDEC.
    pub admissions_avoided: usize,
    /// Mean ward occupancy seen at admission.
    pub mean_ward_occupancy: f64,
    /// Admissions that had to wait for a bed.
    pub admission_delays: usize,
    /// Mean ward stay, hours.
    pub mean_los_ward: f64,
    /// Bed-days saved by avoided stroke admissions.
    pub sdec_financial_savings: f64,
    /// Cost of staffing SDEC while open.
    pub medical_staff_cost: f64,
    /// SDEC savings net of staff cost.
    pub sdec_savings: f64,
    /// Bed cost saved by perfusion-enabled thrombolysis.
    pub thrombolysis_savings: f64,
    /// Net SDEC plus thrombolysis savings.
    pub total_savings: f64,
    /// Mean severity points recovered on the ward.
    pub mean_severity_change: f64,
    /// ICH patients.
    pub ich_count: usize,
    /// Ischaemic stroke patients.
    pub ischaemic_count: usize,
    /// TIA patients.
    pub tia_count: usize,
    /// Stroke mimic patients.
    pub stroke_mimic_count: usize,
    /// Non-stroke patients.
    pub non_stroke_count: usize,
    /// Patients thrombolysed.
    pub thrombolysed: usize,
    /// Unknown-onset patients thrombolysed thanks to perfusion imaging.
    pub additional_thrombolysis: usize,
    /// Patients given an SDEC bed.
    pub sdec_admissions: usize,
    /// Minor cases sent home at the ward decision.
    pub minor_non_admissions: usize,
    /// SDEC closures after warm-up.
    pub sdec_freezes: u64,
    /// Perfusion scanner closures after warm-up.
    pub scanner_freezes: u64,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn max(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, f64::max)
}

impl RunResults {
    /// Aggregates a finished replication.
    pub fn from_replication(
        config: &ModelConfig,
        run: u32,
        patients: &[Patient],
        sdec: &Downtime,
        scanner: &Downtime,
    ) -> Self {
        let reported: Vec<&Patient> = patients.iter().filter(|p| p.counts_after_warm_up()).collect();
        let count = |pred: &dyn Fn(&Patient) -> bool| reported.iter().filter(|p| pred(**p)).count();

        let nurse_q = || reported.iter().filter_map(|p| p.q_time_nurse);
        let ward_q = || reported.iter().filter_map(|p| p.q_time_ward).map(|m| m / 60.0);

        let admissions_avoided =
            count(&|p| p.sdec_pathway && p.admission_avoidance && p.diagnosis.is_stroke());
        let sdec_financial_savings = admissions_avoided as f64 * config.costs.inpatient_bed_per_day;

        let cycle = sdec.schedule();
        let medical_staff_cost = if cycle.open_for == 0.0 {
            0.0
        } else {
            let per_minute = config.costs.sdec_doctor_per_minute;
            per_minute * config.sim_duration
                - per_minute * sdec.freezes() as f64 * cycle.closed_for
        };
        let sdec_savings = sdec_financial_savings - medical_staff_cost;
        let thrombolysis_savings: f64 = reported.iter().map(|p| p.thrombolysis_savings).sum();

        let by_diagnosis = |d: Diagnosis| count(&|p| p.diagnosis == d);

        Self {
            run,
            patients_assessed: reported.len(),
            mean_q_time_nurse: mean(nurse_q()),
            max_q_time_nurse: max(nurse_q()),
            mean_q_time_ward: mean(ward_q()),
            max_q_time_ward: max(ward_q()),
            admissions_avoided,
            mean_ward_occupancy: mean(
                reported
                    .iter()
                    .filter_map(|p| p.ward_occupancy_at_admission)
                    .map(|o| o as f64),
            ),
            admission_delays: count(&|p| p.q_time_ward.is_some_and(|q| q > 0.0)),
            mean_los_ward: mean(reported.iter().filter_map(|p| p.ward_los).map(|m| m / 60.0)),
            sdec_financial_savings,
            medical_staff_cost,
            sdec_savings,
            thrombolysis_savings,
            total_savings: sdec_savings + thrombolysis_savings,
            mean_severity_change: mean(
                reported
                    .iter()
                    .filter_map(|p| p.severity_change())
                    .map(f64::from),
            ),
            ich_count: by_diagnosis(Diagnosis::Ich),
            ischaemic_count: by_diagnosis(Diagnosis::Ischaemic),
            tia_count: by_diagnosis(Diagnosis::Tia),
            stroke_mimic_count: by_diagnosis(Diagnosis::StrokeMimic),
            non_stroke_count: by_diagnosis(Diagnosis::NonStroke),
            thrombolysed: count(&|p| p.thrombolysis),
            additional_thrombolysis: count(&|p| {
                p.thrombolysis && p.onset_type == OnsetType::UnknownInWindow
            }),
            sdec_admissions: count(&|p| p.sdec_admit_time.is_some()),
            minor_non_admissions: count(&|p| p.non_admitted_minor),
            sdec_freezes: sdec.freezes(),
            scanner_freezes: scanner.freezes(),
        }
    }

    /// Numeric columns in report order, for cross-replication summaries.
    pub fn columns(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("patients_assessed", self.patients_assessed as f64),
            ("mean_q_time_nurse", self.mean_q_time_nurse),
            ("max_q_time_nurse", self.max_q_time_nurse),
            ("mean_q_time_ward", self.mean_q_time_ward),
            ("max_q_time_ward", self.max_q_time_ward),
            ("admissions_avoided", self.admissions_avoided as f64),
            ("mean_ward_occupancy", self.mean_ward_occupancy),
            ("admission_delays", self.admission_delays as f64),
            ("mean_los_ward", self.mean_los_ward),
            ("sdec_financial_savings", self.sdec_financial_savings),
            ("medical_staff_cost", self.medical_staff_cost),
            ("sdec_savings", self.sdec_savings),
            ("thrombolysis_savings", self.thrombolysis_savings),
            ("total_savings", self.total_savings),
            ("mean_severity_change", self.mean_severity_change),
            ("ich_count", self.ich_count as f64),
            ("ischaemic_count", self.ischaemic_count as f64),
            ("tia_count", self.tia_count as f64),
            ("stroke_mimic_count", self.stroke_mimic_count as f64),
            ("non_stroke_count", self.non_stroke_count as f64),
            ("thrombolysed", self.thrombolysed as f64),
            ("additional_thrombolysis", self.additional_thrombolysis as f64),
            ("sdec_admissions", self.sdec_admissions as f64),
            ("minor_non_admissions", self.minor_non_admissions as f64),
            ("sdec_freezes", self.sdec_freezes as f64),
            ("scanner_freezes", self.scanner_freezes as f64),
        ]
    }

    /// Daily arrival rate among reported patients.
    pub fn arrivals_per_day(&self, config: &ModelConfig) -> f64 {
        self.patients_assessed as f64 / (config.sim_duration / MINUTES_PER_DAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AvailabilityConfig,
        model::Obstruction,
        patient::{ArrivalWindow, ClinicalProfile, Severity},
    };

    fn patient(id: u64, arrival: f64, diagnosis: Diagnosis) -> Patient {
        Patient::new(
            id,
            0,
            ArrivalWindow::InHours,
            arrival,
            100.0,
            ClinicalProfile {
                onset_type: OnsetType::Known,
                severity: Severity::new(1),
                diagnosis_percentile: 0,
                diagnosis,
                non_admission_percentile: 0,
            },
        )
    }

    fn downtime(config: &ModelConfig, availability: &AvailabilityConfig) -> Downtime {
        Downtime::new(Obstruction::Sdec, availability.schedule(config.sim_duration))
    }

    #[test]
    fn warm_up_patients_are_excluded() {
        let config = ModelConfig::default().with_warm_up(100.0);
        let mut early = patient(1, 50.0, Diagnosis::Ich);
        early.q_time_nurse = Some(1_000.0);
        let mut late = patient(2, 150.0, Diagnosis::Tia);
        late.q_time_nurse = Some(10.0);
        let mut later = patient(3, 250.0, Diagnosis::Tia);
        later.q_time_nurse = Some(20.0);

        let sdec = downtime(&config, &config.sdec);
        let results =
            RunResults::from_replication(&config, 0, &[early, late, later], &sdec, &sdec);
        assert_eq!(results.patients_assessed, 2);
        assert_eq!(results.mean_q_time_nurse, 15.0);
        assert_eq!(results.max_q_time_nurse, 20.0);
        assert_eq!(results.ich_count, 0);
        assert_eq!(results.tia_count, 2);
    }

    #[test]
    fn empty_means_are_zero() {
        let config = ModelConfig::default();
        let sdec = downtime(&config, &config.sdec);
        let results = RunResults::from_replication(&config, 3, &[], &sdec, &sdec);
        assert_eq!(results.run, 3);
        assert_eq!(results.mean_q_time_ward, 0.0);
        assert_eq!(results.mean_severity_change, 0.0);
        assert_eq!(results.columns().len(), 26);
    }

    #[test]
    fn staff_cost_follows_sdec_opening() {
        let config = ModelConfig::default();
        let always = downtime(&config, &config.sdec);
        let results = RunResults::from_replication(&config, 0, &[], &always, &always);
        assert_eq!(results.medical_staff_cost, 0.5 * config.sim_duration);

        let never = downtime(
            &config,
            &AvailabilityConfig {
                availability_percent: 0.0,
                opening_hour: 0,
            },
        );
        let results = RunResults::from_replication(&config, 0, &[], &never, &always);
        assert_eq!(results.medical_staff_cost, 0.0);
    }

    #[test]
    fn stroke_avoiders_drive_sdec_savings() {
        let config = ModelConfig::default();
        let mut avoided = patient(1, 150.0, Diagnosis::Ischaemic);
        avoided.sdec_pathway = true;
        avoided.admission_avoidance = true;
        let mut tia = patient(2, 150.0, Diagnosis::Tia);
        tia.sdec_pathway = true;
        tia.admission_avoidance = true;

        let sdec = downtime(&config, &config.sdec);
        let results = RunResults::from_replication(&config, 0, &[avoided, tia], &sdec, &sdec);
        assert_eq!(results.admissions_avoided, 1);
        assert_eq!(results.sdec_financial_savings, 876.0);
        assert_eq!(
            results.total_savings,
            results.sdec_savings + results.thrombolysis_savings
        );
    }
}
