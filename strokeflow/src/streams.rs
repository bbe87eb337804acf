//! Named random streams and the samplers bound to them.
//!
//! Every stochastic use in a replication owns exactly one child stream of the
//! replication's [`StreamSet`]. Adding a new use means adding a [`Stream`]
//! variant with the next free index.

use strokeflow_sim::{
    ArrivalSchedule, DiscreteEmpirical, Exponential, Normal, SimTime, StreamSet, ThinningSampler,
};

use crate::{
    config::ModelConfig,
    error::{ModelError, ModelResult},
    patient::{ArrivalWindow, ClinicalProfile, CutPoints, Diagnosis, OnsetType, Severity},
};

/// Child streams provisioned per replication. Indices above the last
/// [`Stream`] are spare.
pub const PROVISIONED_STREAMS: usize = 40;

const ISCHAEMIC_LOS: [&str; 6] = [
    "ward_los_ischaemic_0",
    "ward_los_ischaemic_1",
    "ward_los_ischaemic_2",
    "ward_los_ischaemic_3",
    "ward_los_ischaemic_4",
    "ward_los_ischaemic_5",
];

const ICH_LOS: [&str; 6] = [
    "ward_los_ich_0",
    "ward_los_ich_1",
    "ward_los_ich_2",
    "ward_los_ich_3",
    "ward_los_ich_4",
    "ward_los_ich_5",
];

const CUT_POINTS: [&str; 5] = [
    "cut_point_ich",
    "cut_point_ischaemic",
    "cut_point_tia",
    "cut_point_mimic",
    "cut_point_non_stroke",
];

/// One stochastic use within a replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    /// Candidate inter-arrival gaps.
    ArrivalGap(ArrivalWindow),
    /// Thinning accept/reject draws.
    ArrivalAccept(ArrivalWindow),
    /// Onset category at arrival.
    Onset(ArrivalWindow),
    /// Presentation severity.
    Severity,
    /// Raw diagnosis percentile.
    DiagnosisPercentile,
    /// Non-admission percentile.
    NonAdmissionPercentile,
    /// Perturbation of one of the five diagnosis cut points.
    CutPoint(usize),
    /// Nurse consultation duration.
    Consult,
    /// Standard CT duration.
    StandardCt,
    /// Advanced CT duration.
    AdvancedCt,
    /// SDEC length of stay.
    SdecStay,
    /// TIA admission chance evaluated in SDEC.
    SdecTiaAdmission,
    /// Mimic and non-stroke admission chance evaluated in SDEC.
    SdecMimicAdmission,
    /// TIA admission chance at the ward decision.
    MinorTiaAdmission,
    /// Mimic and non-stroke admission chance at the ward decision.
    MinorMimicAdmission,
    /// Ward stay for a diagnosis; severity only matters for strokes.
    WardLos(Diagnosis, u8),
    /// Severity recovered during an ordinary stay.
    SeverityImprovement,
    /// Severity recovered after thrombolysis.
    SeverityImprovementThrombolysed,
}

impl Stream {
    /// Index of the child stream within the set.
    pub fn index(self) -> usize {
        let window = |w: ArrivalWindow| match w {
            ArrivalWindow::InHours => 0,
            ArrivalWindow::OutOfHours => 1,
        };
        match self {
            Stream::ArrivalGap(w) => window(w),
            Stream::ArrivalAccept(w) => 2 + window(w),
            Stream::Onset(w) => 4 + window(w),
            Stream::Severity => 6,
            Stream::DiagnosisPercentile => 7,
            Stream::NonAdmissionPercentile => 8,
            Stream::CutPoint(i) => 9 + i,
            Stream::Consult => 14,
            Stream::StandardCt => 15,
            Stream::AdvancedCt => 16,
            Stream::SdecStay => 17,
            Stream::SdecTiaAdmission => 18,
            Stream::SdecMimicAdmission => 19,
            Stream::MinorTiaAdmission => 20,
            Stream::MinorMimicAdmission => 21,
            Stream::WardLos(Diagnosis::Ischaemic, s) => 22 + usize::from(s),
            Stream::WardLos(Diagnosis::Ich, s) => 28 + usize::from(s),
            Stream::WardLos(Diagnosis::Tia, _) => 34,
            Stream::WardLos(Diagnosis::StrokeMimic, _) => 35,
            Stream::WardLos(Diagnosis::NonStroke, _) => 36,
            Stream::SeverityImprovement => 37,
            Stream::SeverityImprovementThrombolysed => 38,
        }
    }

    /// Name the stream is bound under.
    pub fn name(self) -> &'static str {
        match self {
            Stream::ArrivalGap(ArrivalWindow::InHours) => "arrival_gap_in_hours",
            Stream::ArrivalGap(ArrivalWindow::OutOfHours) => "arrival_gap_out_of_hours",
            Stream::ArrivalAccept(ArrivalWindow::InHours) => "arrival_accept_in_hours",
            Stream::ArrivalAccept(ArrivalWindow::OutOfHours) => "arrival_accept_out_of_hours",
            Stream::Onset(ArrivalWindow::InHours) => "onset_in_hours",
            Stream::Onset(ArrivalWindow::OutOfHours) => "onset_out_of_hours",
            Stream::Severity => "severity",
            Stream::DiagnosisPercentile => "diagnosis_percentile",
            Stream::NonAdmissionPercentile => "non_admission_percentile",
            Stream::CutPoint(i) => CUT_POINTS.get(i).copied().unwrap_or("cut_point"),
            Stream::Consult => "consult",
            Stream::StandardCt => "standard_ct",
            Stream::AdvancedCt => "advanced_ct",
            Stream::SdecStay => "sdec_stay",
            Stream::SdecTiaAdmission => "sdec_tia_admission",
            Stream::SdecMimicAdmission => "sdec_mimic_admission",
            Stream::MinorTiaAdmission => "minor_tia_admission",
            Stream::MinorMimicAdmission => "minor_mimic_admission",
            Stream::WardLos(Diagnosis::Ischaemic, s) => ISCHAEMIC_LOS
                .get(usize::from(s))
                .copied()
                .unwrap_or("ward_los_ischaemic"),
            Stream::WardLos(Diagnosis::Ich, s) => {
                ICH_LOS.get(usize::from(s)).copied().unwrap_or("ward_los_ich")
            }
            Stream::WardLos(Diagnosis::Tia, _) => "ward_los_tia",
            Stream::WardLos(Diagnosis::StrokeMimic, _) => "ward_los_mimic",
            Stream::WardLos(Diagnosis::NonStroke, _) => "ward_los_non_stroke",
            Stream::SeverityImprovement => "severity_improvement",
            Stream::SeverityImprovementThrombolysed => "severity_improvement_thrombolysed",
        }
    }
}

/// Where an admission chance is being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionCheck {
    /// During an SDEC stay.
    Sdec,
    /// At the ward decision, for patients not already avoided.
    WardDecision,
}

/// Every distribution a replication samples from.
#[derive(Debug)]
pub struct Samplers {
    in_hours_arrivals: ThinningSampler,
    out_of_hours_arrivals: ThinningSampler,
    onset_in_hours: DiscreteEmpirical<OnsetType>,
    onset_out_of_hours: DiscreteEmpirical<OnsetType>,
    severity: Exponential,
    diagnosis_percentile: DiscreteEmpirical<i64>,
    non_admission_percentile: DiscreteEmpirical<i64>,
    cut_points: Vec<Normal>,
    consult: Exponential,
    standard_ct: Exponential,
    advanced_ct: Exponential,
    sdec_stay: Exponential,
    sdec_tia_admission: Normal,
    sdec_mimic_admission: Normal,
    minor_tia_admission: Normal,
    minor_mimic_admission: Normal,
    ward_ischaemic: Vec<Exponential>,
    ward_ich: Vec<Exponential>,
    ward_tia: Exponential,
    ward_mimic: Exponential,
    ward_non_stroke: Exponential,
    improvement: DiscreteEmpirical<i64>,
    improvement_thrombolysed: DiscreteEmpirical<i64>,
}

impl Samplers {
    /// Binds every sampler to its own stream of `streams`.
    pub fn new(config: &ModelConfig, streams: &mut StreamSet) -> ModelResult<Self> {
        let mut bind = |s: Stream| streams.bind(s.index(), s.name());

        let arrivals = &config.arrivals;
        let schedule = ArrivalSchedule::hourly_windows(
            arrivals.in_hours_start,
            arrivals.out_of_hours_start,
            arrivals.in_hours_iat,
            arrivals.out_of_hours_iat,
        )?;
        let in_hours_arrivals = ThinningSampler::new(
            schedule.clone(),
            bind(Stream::ArrivalGap(ArrivalWindow::InHours))?,
            bind(Stream::ArrivalAccept(ArrivalWindow::InHours))?,
        )?;
        let out_of_hours_arrivals = ThinningSampler::new(
            schedule,
            bind(Stream::ArrivalGap(ArrivalWindow::OutOfHours))?,
            bind(Stream::ArrivalAccept(ArrivalWindow::OutOfHours))?,
        )?;

        let onset_in_hours = DiscreteEmpirical::new(
            OnsetType::ALL.to_vec(),
            &config.onset.in_hours,
            bind(Stream::Onset(ArrivalWindow::InHours))?,
        )?;
        let onset_out_of_hours = DiscreteEmpirical::new(
            OnsetType::ALL.to_vec(),
            &config.onset.out_of_hours,
            bind(Stream::Onset(ArrivalWindow::OutOfHours))?,
        )?;

        let mix = &config.case_mix;
        let severity = Exponential::new(mix.mean_severity, bind(Stream::Severity)?)?;
        let diagnosis_percentile =
            DiscreteEmpirical::<i64>::uniform_int(0, 100, bind(Stream::DiagnosisPercentile)?)?;
        let non_admission_percentile =
            DiscreteEmpirical::<i64>::uniform_int(0, 100, bind(Stream::NonAdmissionPercentile)?)?;
        let cut_means = [mix.ich, mix.ischaemic, mix.tia, mix.stroke_mimic, mix.stroke_mimic];
        let cut_points = cut_means
            .iter()
            .enumerate()
            .map(|(i, mean)| -> ModelResult<Normal> {
                Ok(Normal::new(*mean, 1.0, bind(Stream::CutPoint(i))?)?)
            })
            .collect::<ModelResult<Vec<_>>>()?;

        let d = &config.durations;
        let consult = Exponential::new(d.consult, bind(Stream::Consult)?)?;
        let standard_ct = Exponential::new(d.standard_ct, bind(Stream::StandardCt)?)?;
        let advanced_ct = Exponential::new(d.advanced_ct, bind(Stream::AdvancedCt)?)?;
        let sdec_stay = Exponential::new(d.sdec_stay, bind(Stream::SdecStay)?)?;

        let sdec_tia_admission = Normal::new(mix.tia_admission, 1.0, bind(Stream::SdecTiaAdmission)?)?;
        let sdec_mimic_admission = Normal::new(
            mix.stroke_mimic_admission,
            1.0,
            bind(Stream::SdecMimicAdmission)?,
        )?;
        let minor_tia_admission =
            Normal::new(mix.tia_admission, 1.0, bind(Stream::MinorTiaAdmission)?)?;
        let minor_mimic_admission = Normal::new(
            mix.stroke_mimic_admission,
            1.0,
            bind(Stream::MinorMimicAdmission)?,
        )?;

        let los = &config.los;
        let mut ward = |diagnosis: Diagnosis, score: u8| -> ModelResult<Exponential> {
            let severity = Severity::new(score);
            let mean = los
                .mean_for(diagnosis, severity)
                .ok_or(ModelError::UnmappedLengthOfStay {
                    diagnosis,
                    severity,
                })?;
            Ok(Exponential::new(mean, bind(Stream::WardLos(diagnosis, score))?)?)
        };
        let ward_ischaemic = (0..=Severity::MAX)
            .map(|score| ward(Diagnosis::Ischaemic, score))
            .collect::<ModelResult<Vec<_>>>()?;
        let ward_ich = (0..=Severity::MAX)
            .map(|score| ward(Diagnosis::Ich, score))
            .collect::<ModelResult<Vec<_>>>()?;
        let ward_tia = ward(Diagnosis::Tia, 0)?;
        let ward_mimic = ward(Diagnosis::StrokeMimic, 0)?;
        let ward_non_stroke = ward(Diagnosis::NonStroke, 0)?;

        let improvement =
            DiscreteEmpirical::<i64>::uniform_int(0, 1, bind(Stream::SeverityImprovement)?)?;
        let improvement_thrombolysed = DiscreteEmpirical::<i64>::uniform_int(
            0,
            2,
            bind(Stream::SeverityImprovementThrombolysed)?,
        )?;

        Ok(Self {
            in_hours_arrivals,
            out_of_hours_arrivals,
            onset_in_hours,
            onset_out_of_hours,
            severity,
            diagnosis_percentile,
            non_admission_percentile,
            cut_points,
            consult,
            standard_ct,
            advanced_ct,
            sdec_stay,
            sdec_tia_admission,
            sdec_mimic_admission,
            minor_tia_admission,
            minor_mimic_admission,
            ward_ischaemic,
            ward_ich,
            ward_tia,
            ward_mimic,
            ward_non_stroke,
            improvement,
            improvement_thrombolysed,
        })
    }

    /// Gap from `now` until the window's next candidate arrival.
    pub fn arrival_gap(&mut self, window: ArrivalWindow, now: SimTime) -> f64 {
        match window {
            ArrivalWindow::InHours => self.in_hours_arrivals.sample(now),
            ArrivalWindow::OutOfHours => self.out_of_hours_arrivals.sample(now),
        }
    }

    /// Samples the attributes fixed at arrival.
    pub fn clinical_profile(&mut self, window: ArrivalWindow) -> ClinicalProfile {
        let onset_type = match window {
            ArrivalWindow::InHours => self.onset_in_hours.sample(),
            ArrivalWindow::OutOfHours => self.onset_out_of_hours.sample(),
        };
        let severity = Severity::from_draw(self.severity.sample());
        let diagnosis_percentile = self.diagnosis_percentile.sample();
        let mut offsets = [0.0; 5];
        for (offset, normal) in offsets.iter_mut().zip(self.cut_points.iter_mut()) {
            *offset = normal.sample();
        }
        let diagnosis = CutPoints::from_offsets(offsets).classify(diagnosis_percentile);
        let non_admission_percentile = self.non_admission_percentile.sample();
        ClinicalProfile {
            onset_type,
            severity,
            diagnosis_percentile,
            diagnosis,
            non_admission_percentile,
        }
    }

    /// Triage consultation length.
    pub fn consult(&mut self) -> f64 {
        self.consult.sample()
    }

    /// Scan duration for the chosen modality.
    pub fn scan(&mut self, advanced: bool) -> f64 {
        if advanced {
            self.advanced_ct.sample()
        } else {
            self.standard_ct.sample()
        }
    }

    /// SDEC stay length.
    pub fn sdec_stay(&mut self) -> f64 {
        self.sdec_stay.sample()
    }

    /// Randomised admission threshold for a minor case, `None` for strokes.
    pub fn admission_chance(&mut self, diagnosis: Diagnosis, check: AdmissionCheck) -> Option<f64> {
        let normal = match (diagnosis, check) {
            (Diagnosis::Ich | Diagnosis::Ischaemic, _) => return None,
            (Diagnosis::Tia, AdmissionCheck::Sdec) => &mut self.sdec_tia_admission,
            (Diagnosis::Tia, AdmissionCheck::WardDecision) => &mut self.minor_tia_admission,
            (_, AdmissionCheck::Sdec) => &mut self.sdec_mimic_admission,
            (_, AdmissionCheck::WardDecision) => &mut self.minor_mimic_admission,
        };
        Some(normal.sample())
    }

    /// Baseline ward stay for a case.
    pub fn ward_los(&mut self, diagnosis: Diagnosis, severity: Severity) -> ModelResult<f64> {
        let score = usize::from(severity.value());
        let dist = match diagnosis {
            Diagnosis::Ischaemic => self.ward_ischaemic.get_mut(score),
            Diagnosis::Ich => self.ward_ich.get_mut(score),
            Diagnosis::Tia => Some(&mut self.ward_tia),
            Diagnosis::StrokeMimic => Some(&mut self.ward_mimic),
            Diagnosis::NonStroke => Some(&mut self.ward_non_stroke),
        };
        dist.map(Exponential::sample)
            .ok_or(ModelError::UnmappedLengthOfStay {
                diagnosis,
                severity,
            })
    }

    /// Severity points recovered during a ward stay.
    pub fn severity_improvement(&mut self, thrombolysed: bool) -> u8 {
        let points = if thrombolysed {
            self.improvement_thrombolysed.sample()
        } else {
            self.improvement.sample()
        };
        u8::try_from(points).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn all_streams() -> Vec<Stream> {
        let mut streams = Vec::new();
        for w in [ArrivalWindow::InHours, ArrivalWindow::OutOfHours] {
            streams.extend([Stream::ArrivalGap(w), Stream::ArrivalAccept(w), Stream::Onset(w)]);
        }
        streams.extend([
            Stream::Severity,
            Stream::DiagnosisPercentile,
            Stream::NonAdmissionPercentile,
        ]);
        streams.extend((0..5).map(Stream::CutPoint));
        streams.extend([
            Stream::Consult,
            Stream::StandardCt,
            Stream::AdvancedCt,
            Stream::SdecStay,
            Stream::SdecTiaAdmission,
            Stream::SdecMimicAdmission,
            Stream::MinorTiaAdmission,
            Stream::MinorMimicAdmission,
        ]);
        for s in 0..=Severity::MAX {
            streams.push(Stream::WardLos(Diagnosis::Ischaemic, s));
            streams.push(Stream::WardLos(Diagnosis::Ich, s));
        }
        streams.extend([
            Stream::WardLos(Diagnosis::Tia, 0),
            Stream::WardLos(Diagnosis::StrokeMimic, 0),
            Stream::WardLos(Diagnosis::NonStroke, 0),
            Stream::SeverityImprovement,
            Stream::SeverityImprovementThrombolysed,
        ]);
        streams
    }

    #[test]
    fn indices_and_names_are_unique_and_provisioned() {
        let streams = all_streams();
        let indices: HashSet<_> = streams.iter().map(|s| s.index()).collect();
        let names: HashSet<_> = streams.iter().map(|s| s.name()).collect();
        assert_eq!(indices.len(), streams.len());
        assert_eq!(names.len(), streams.len());
        assert!(indices.iter().all(|i| *i < PROVISIONED_STREAMS));
    }

    #[test]
    fn samplers_bind_without_conflict() {
        let config = ModelConfig::default();
        let mut set = StreamSet::new(config.master_seed, 0, PROVISIONED_STREAMS).unwrap();
        let mut samplers = Samplers::new(&config, &mut set).unwrap();

        // Every bound stream is now spoken for
        assert!(set.bind(Stream::Consult.index(), "again").is_err());

        for diagnosis in Diagnosis::ALL {
            for score in 0..=Severity::MAX {
                let los = samplers.ward_los(diagnosis, Severity::new(score)).unwrap();
                assert!(los > 0.0);
            }
        }
        assert!(samplers.admission_chance(Diagnosis::Ich, AdmissionCheck::Sdec).is_none());
        assert!(samplers
            .admission_chance(Diagnosis::Tia, AdmissionCheck::WardDecision)
            .is_some());
        assert!(samplers.severity_improvement(false) <= 1);
        assert!(samplers.severity_improvement(true) <= 2);
    }

    #[test]
    fn profiles_are_reproducible_per_replication() {
        let config = ModelConfig::default();
        let draw = |replication| {
            let mut set = StreamSet::new(config.master_seed, replication, PROVISIONED_STREAMS).unwrap();
            let mut samplers = Samplers::new(&config, &mut set).unwrap();
            (0..20)
                .map(|_| samplers.clinical_profile(ArrivalWindow::InHours))
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(0), draw(0));
        assert_ne!(draw(0), draw(1));
    }

    #[test]
    fn ward_stays_follow_the_los_table() {
        let mut config = ModelConfig::default();
        config.los.ischaemic[3] = 90.0;
        config.los.tia = 45.0;
        let mut set = StreamSet::new(config.master_seed, 0, PROVISIONED_STREAMS).unwrap();
        let samplers = Samplers::new(&config, &mut set).unwrap();

        for diagnosis in [Diagnosis::Ischaemic, Diagnosis::Ich] {
            let row = match diagnosis {
                Diagnosis::Ischaemic => &samplers.ward_ischaemic,
                _ => &samplers.ward_ich,
            };
            assert_eq!(row.len(), usize::from(Severity::MAX) + 1);
            for (score, dist) in (0u8..).zip(row) {
                let mean = config.los.mean_for(diagnosis, Severity::new(score));
                assert_eq!(Some(dist.mean()), mean);
            }
        }
        assert_eq!(samplers.ward_ischaemic[3].mean(), 90.0);
        assert_eq!(samplers.ward_tia.mean(), 45.0);
        assert_eq!(samplers.ward_mimic.mean(), config.los.non_stroke);
    }
}
