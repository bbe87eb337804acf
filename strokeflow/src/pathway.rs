//! The patient journey as an explicit state machine.
//!
//! Each patient walks triage, imaging, an optional SDEC stay and an optional
//! ward stay. A [`Stage`] names what the patient is waiting for; the model
//! advances it when the matching timed wake-up or pool grant arrives.

use strokeflow_sim::{Priority, UnitId, MINUTES_PER_DAY};
use tracing::debug;

use crate::{
    error::{ModelError, ModelResult},
    model::{Event, Model, PoolKind, Requester},
    patient::{Diagnosis, OnsetType, Patient, PatientId, Severity},
    streams::AdmissionCheck,
};

/// Where a patient is in the pathway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Created, pathway not yet started.
    Arrived,
    /// Queued for a nurse.
    AwaitingNurse,
    /// Being triaged by `nurse`.
    Triage {
        /// Nurse unit held.
        nurse: UnitId,
    },
    /// Queued for the advanced scanner.
    AwaitingScanner,
    /// Being scanned; `scanner` is `None` on standard CT.
    Scanning {
        /// Advanced scanner unit held, if any.
        scanner: Option<UnitId>,
    },
    /// Routed to SDEC, waiting for the bed grant.
    AwaitingSdecBed,
    /// Staying in SDEC.
    InSdec {
        /// SDEC bed held.
        bed: UnitId,
    },
    /// Queued for a ward bed, possibly still occupying an SDEC bed.
    AwaitingWard {
        /// SDEC bed held while waiting.
        sdec_bed: Option<UnitId>,
    },
    /// Admitted to the ward.
    OnWard {
        /// Ward bed held.
        bed: UnitId,
    },
    /// Journey finished; the patient record is frozen.
    Complete,
}

/// Whether a patient can be thrombolysed.
///
/// Only ischaemic strokes with symptoms qualify: with a known onset time, or
/// with an unknown onset inside the window when advanced imaging confirmed it.
pub fn thrombolysis_eligible(
    diagnosis: Diagnosis,
    onset: OnsetType,
    severity: Severity,
    advanced_imaging: bool,
) -> bool {
    if diagnosis != Diagnosis::Ischaemic || severity.value() == 0 {
        return false;
    }
    match onset {
        OnsetType::Known => true,
        OnsetType::UnknownInWindow => advanced_imaging,
        OnsetType::UnknownOutOfWindow => false,
    }
}

/// Whether an SDEC patient goes home instead of being admitted.
///
/// Strokes avoid admission when not thrombolysed and below `severity_limit`.
/// Minor cases avoid it when their non-admission percentile reaches the
/// randomised `admission_chance`.
pub fn avoids_admission_in_sdec(
    patient: &Patient,
    severity_limit: u8,
    admission_chance: Option<f64>,
) -> bool {
    if patient.diagnosis.is_stroke() {
        !patient.thrombolysis && patient.severity.value() < severity_limit
    } else {
        admission_chance.is_some_and(|chance| patient.non_admission_percentile as f64 >= chance)
    }
}

/// Ward stay after thrombolysis.
pub fn thrombolysed_stay(baseline: f64, factor: f64) -> f64 {
    baseline * factor
}

/// Bed cost saved by a shortened stay, credited only when advanced imaging
/// made the treatment possible.
pub fn thrombolysis_savings(
    baseline: f64,
    reduced: f64,
    advanced_imaging: bool,
    bed_cost_per_day: f64,
) -> f64 {
    if advanced_imaging {
        (baseline - reduced) * bed_cost_per_day / MINUTES_PER_DAY
    } else {
        0.0
    }
}

impl Model {
    pub(crate) fn begin_pathway(&mut self, id: PatientId) -> ModelResult<()> {
        let now = self.world.now();
        self.patient_mut(id)?.nurse_q_start_time = Some(now);
        self.set_stage(id, Stage::AwaitingNurse)?;
        self.request(PoolKind::Nurse, Requester::Patient(id), Priority::PATIENT)
    }

    pub(crate) fn on_patient_granted(
        &mut self,
        id: PatientId,
        pool: PoolKind,
        unit: UnitId,
    ) -> ModelResult<()> {
        match (self.stage(id)?, pool) {
            (Stage::AwaitingNurse, PoolKind::Nurse) => self.start_triage(id, unit),
            (Stage::AwaitingScanner, PoolKind::AdvancedScanner) => self.start_scan(id, Some(unit)),
            (Stage::AwaitingSdecBed, PoolKind::SdecBed) => self.admit_sdec(id, unit),
            (Stage::AwaitingWard { sdec_bed }, PoolKind::WardBed) => {
                self.admit_ward(id, unit, sdec_bed)
            }
            (stage, pool) => Err(invalid(id, format!("{pool:?} grant"), stage)),
        }
    }

    pub(crate) fn on_patient_wake(&mut self, id: PatientId) -> ModelResult<()> {
        match self.stage(id)? {
            Stage::Triage { nurse } => self.finish_triage(id, nurse),
            Stage::Scanning { scanner } => self.finish_scan(id, scanner),
            Stage::InSdec { bed } => self.finish_sdec(id, bed),
            Stage::OnWard { bed } => self.discharge_ward(id, bed),
            stage => Err(invalid(id, "timed wake-up".into(), stage)),
        }
    }

    fn start_triage(&mut self, id: PatientId, nurse: UnitId) -> ModelResult<()> {
        let now = self.world.now();
        let consult = self.samplers.consult();
        let patient = self.patient_mut(id)?;
        patient.triage_start_time = Some(now);
        patient.q_time_nurse = patient.nurse_q_start_time.map(|start| now - start);
        patient.nurse_id = Some(nurse);
        self.set_stage(id, Stage::Triage { nurse })?;
        self.audit(PoolKind::Nurse);
        self.world.schedule(Event::Wake(id), consult)?;
        Ok(())
    }

    fn finish_triage(&mut self, id: PatientId, nurse: UnitId) -> ModelResult<()> {
        let now = self.world.now();
        self.patient_mut(id)?.triage_end_time = Some(now);
        self.release(PoolKind::Nurse, nurse)?;

        if self.scanner_downtime.is_open() {
            self.patient_mut(id)?.advanced_ct_pathway = true;
            self.set_stage(id, Stage::AwaitingScanner)?;
            self.request(
                PoolKind::AdvancedScanner,
                Requester::Patient(id),
                Priority::PATIENT,
            )
        } else {
            self.start_scan(id, None)
        }
    }

    fn start_scan(&mut self, id: PatientId, scanner: Option<UnitId>) -> ModelResult<()> {
        let now = self.world.now();
        let advanced = self.patient_mut(id)?.advanced_ct_pathway;
        let duration = self.samplers.scan(advanced);
        let patient = self.patient_mut(id)?;
        patient.scan_start_time = Some(now);
        patient.scanner_id = scanner;
        patient.imaging_duration = Some(duration);
        self.set_stage(id, Stage::Scanning { scanner })?;
        self.world.schedule(Event::Wake(id), duration)?;
        Ok(())
    }

    fn finish_scan(&mut self, id: PatientId, scanner: Option<UnitId>) -> ModelResult<()> {
        let now = self.world.now();
        if let Some(unit) = scanner {
            self.release(PoolKind::AdvancedScanner, unit)?;
        }

        let sdec_open = self.sdec_downtime.is_open();
        let sdec = self.pools.get(PoolKind::SdecBed);
        let sdec_full = sdec.in_use() >= sdec.capacity();

        let patient = self.patient_mut(id)?;
        patient.scan_end_time = Some(now);
        patient.thrombolysis = thrombolysis_eligible(
            patient.diagnosis,
            patient.onset_type,
            patient.severity,
            patient.advanced_ct_pathway,
        );
        patient.sdec_running_when_required = Some(sdec_open);
        patient.sdec_full_when_required = Some(sdec_full);

        if sdec_open && !sdec_full {
            patient.sdec_pathway = true;
            self.set_stage(id, Stage::AwaitingSdecBed)?;
            self.request(PoolKind::SdecBed, Requester::Patient(id), Priority::PATIENT)
        } else {
            self.ward_decision(id, None)
        }
    }

    fn admit_sdec(&mut self, id: PatientId, bed: UnitId) -> ModelResult<()> {
        let now = self.world.now();
        let diagnosis = self.patient_mut(id)?.diagnosis;
        let chance = self.samplers.admission_chance(diagnosis, AdmissionCheck::Sdec);
        let stay = self.samplers.sdec_stay();
        let limit = self.config.avoidance_severity_limit();
        self.sdec_occupancy += 1;

        let patient = self.patient_mut(id)?;
        patient.sdec_admit_time = Some(now);
        patient.sdec_bed_id = Some(bed);
        patient.sdec_los = Some(stay);
        patient.admission_avoidance = avoids_admission_in_sdec(patient, limit, chance);
        debug!(
            id,
            now,
            bed,
            avoided = patient.admission_avoidance,
            "admitted to SDEC"
        );

        self.set_stage(id, Stage::InSdec { bed })?;
        self.audit(PoolKind::SdecBed);
        self.world.schedule(Event::Wake(id), stay)?;
        Ok(())
    }

    fn finish_sdec(&mut self, id: PatientId, bed: UnitId) -> ModelResult<()> {
        if self.patient_mut(id)?.admission_avoidance {
            self.discharge_sdec(id, bed)?;
            self.complete(id)
        } else {
            self.ward_decision(id, Some(bed))
        }
    }

    fn discharge_sdec(&mut self, id: PatientId, bed: UnitId) -> ModelResult<()> {
        let now = self.world.now();
        self.release(PoolKind::SdecBed, bed)?;
        self.sdec_occupancy = self.sdec_occupancy.saturating_sub(1);
        self.patient_mut(id)?.sdec_discharge_time = Some(now);
        self.audit(PoolKind::SdecBed);
        Ok(())
    }

    /// Decides between going home and queueing for the ward. Patients leaving
    /// SDEC keep their SDEC bed until the ward bed is granted.
    fn ward_decision(&mut self, id: PatientId, sdec_bed: Option<UnitId>) -> ModelResult<()> {
        let now = self.world.now();
        let patient = self.patient_mut(id)?;
        let (diagnosis, avoided, percentile) = (
            patient.diagnosis,
            patient.admission_avoidance,
            patient.non_admission_percentile,
        );

        if diagnosis.is_minor() && !avoided {
            let chance = self
                .samplers
                .admission_chance(diagnosis, AdmissionCheck::WardDecision);
            if chance.is_some_and(|c| percentile as f64 >= c) {
                self.patient_mut(id)?.non_admitted_minor = true;
                if let Some(bed) = sdec_bed {
                    self.discharge_sdec(id, bed)?;
                }
                debug!(id, now, ?diagnosis, "discharged without admission");
                return self.complete(id);
            }
        }

        self.patient_mut(id)?.ward_q_start_time = Some(now);
        self.set_stage(id, Stage::AwaitingWard { sdec_bed })?;
        self.request(PoolKind::WardBed, Requester::Patient(id), Priority::PATIENT)
    }

    fn admit_ward(
        &mut self,
        id: PatientId,
        bed: UnitId,
        sdec_bed: Option<UnitId>,
    ) -> ModelResult<()> {
        let now = self.world.now();
        if let Some(sdec_bed) = sdec_bed {
            self.discharge_sdec(id, sdec_bed)?;
        }

        let patient = self.patient_mut(id)?;
        let (diagnosis, severity, thrombolysed, advanced) = (
            patient.diagnosis,
            patient.severity,
            patient.thrombolysis,
            patient.advanced_ct_pathway,
        );
        let baseline = self.samplers.ward_los(diagnosis, severity)?;
        let improvement = self.samplers.severity_improvement(thrombolysed);
        let (los, savings) = if thrombolysed {
            let reduced = thrombolysed_stay(baseline, self.config.thrombolysis_los_factor);
            let saved = thrombolysis_savings(
                baseline,
                reduced,
                advanced,
                self.config.costs.thrombolysis_bed_per_day,
            );
            (reduced, saved)
        } else {
            (baseline, 0.0)
        };
        let occupancy = self.pools.get(PoolKind::WardBed).in_use();

        let patient = self.patient_mut(id)?;
        patient.q_time_ward = patient.ward_q_start_time.map(|start| now - start);
        patient.ward_admit_time = Some(now);
        patient.ward_bed_id = Some(bed);
        patient.ward_occupancy_at_admission = Some(occupancy);
        patient.ward_los_baseline = Some(baseline);
        patient.ward_los = Some(los);
        patient.thrombolysis_savings = savings;
        patient.discharge_severity = Some(severity.improved_by(improvement));
        debug!(id, now, bed, los, thrombolysed, "admitted to ward");

        self.set_stage(id, Stage::OnWard { bed })?;
        self.audit(PoolKind::WardBed);
        self.world.schedule(Event::Wake(id), los)?;
        Ok(())
    }

    fn discharge_ward(&mut self, id: PatientId, bed: UnitId) -> ModelResult<()> {
        let now = self.world.now();
        self.release(PoolKind::WardBed, bed)?;
        self.patient_mut(id)?.ward_discharge_time = Some(now);
        self.audit(PoolKind::WardBed);
        self.complete(id)
    }

    fn complete(&mut self, id: PatientId) -> ModelResult<()> {
        let now = self.world.now();
        let patient = self.patient_mut(id)?;
        patient.exit_time = Some(now);
        patient.journey_completed = true;
        debug!(id, now, "journey complete");
        self.set_stage(id, Stage::Complete)
    }
}

fn invalid(id: PatientId, wake: String, stage: Stage) -> ModelError {
    ModelError::InvalidTransition {
        process: format!("patient {id}"),
        wake,
        state: format!("{stage:?}"),
    }
}
