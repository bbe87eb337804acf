use strokeflow::{
    Diagnosis, Model, ModelConfig, Obstruction, OnsetType, Patient, PoolKind, Trial,
};

const DAY: f64 = 1440.0;

fn base() -> ModelConfig {
    ModelConfig::default().with_days(60.0).with_runs(1).with_seed(2024)
}

fn patients(config: &ModelConfig) -> Vec<Patient> {
    Model::new(config, 0).unwrap().run().unwrap().patients
}

#[test]
fn warm_up_patients_are_left_out_of_kpis() {
    let config = base().with_warm_up(10.0 * DAY);
    let output = Model::new(&config, 0).unwrap().run().unwrap();
    let warm = output
        .patients
        .iter()
        .filter(|p| p.arrival_time < config.warm_up_period)
        .count();
    assert!(warm > 0);
    assert!(output.patients[..warm].iter().all(|p| p.generated_during_warm_up));
    assert_eq!(output.results.patients_assessed, output.patients.len() - warm);
}

#[test]
fn arrivals_do_not_depend_on_downstream_settings() {
    let config = base();
    let mut busy = config.clone();
    busy.capacities.ward_beds = 3;
    busy.capacities.sdec_beds = 1;
    busy.los.tia *= 2.0;
    busy.costs.inpatient_bed_per_day = 1.0;
    busy.durations.sdec_stay = 30.0;

    let key = |ps: Vec<Patient>| -> Vec<(f64, Diagnosis, OnsetType)> {
        ps.into_iter()
            .map(|p| (p.arrival_time, p.diagnosis, p.onset_type))
            .collect()
    };
    assert_eq!(key(patients(&config)), key(patients(&busy)));
}

#[test]
fn arrival_rate_matches_the_two_windows() {
    let config = ModelConfig::default().with_days(200.0).with_runs(1).with_seed(9);
    let output = Model::new(&config, 0).unwrap().run().unwrap();
    // 17 daytime hours at one per 200 min plus 7 overnight at one per 666.7 min
    let expected = 17.0 * 60.0 / 200.0 + 7.0 * 60.0 / (2000.0 / 3.0);
    let observed = output.results.arrivals_per_day(&config);
    assert!(
        (observed - expected).abs() < 0.15 * expected,
        "observed {observed}, expected {expected}"
    );
    assert!(output
        .patients
        .iter()
        .all(|p| p.arrived_ooh == (p.arrival_window == strokeflow::ArrivalWindow::OutOfHours)));
}

#[test]
fn pools_never_exceed_capacity() {
    let mut config = base();
    config.capacities.ward_beds = 2;
    config = config.with_sdec_availability(50.0, 8);
    let caps = config.capacities.clone();
    let mut model = Model::new(&config, 0).unwrap();
    let mut t = 0.0;
    while t < config.run_until() {
        t += 30.0;
        model.advance_to(t).unwrap();
        assert!(model.in_use(PoolKind::Nurse) <= caps.nurses);
        assert!(model.in_use(PoolKind::AdvancedScanner) <= caps.advanced_scanners);
        assert!(model.in_use(PoolKind::SdecBed) <= caps.sdec_beds);
        assert!(model.in_use(PoolKind::WardBed) <= caps.ward_beds);
    }
}

#[test]
fn completed_journeys_are_consistent() {
    for p in patients(&base()).iter().filter(|p| p.journey_completed) {
        let exit = p.exit_time.unwrap();
        assert!(exit >= p.arrival_time);
        assert!(p.triage_start_time.unwrap() >= p.arrival_time);
        assert!(p.scan_end_time.unwrap() >= p.scan_start_time.unwrap());
        assert!(!p.thrombectomy);
        if p.admission_avoidance || p.non_admitted_minor {
            assert!(!p.was_admitted(), "patient {} went home and was admitted", p.id);
        }
        if p.was_admitted() {
            assert_eq!(p.ward_discharge_time, Some(exit));
            assert!(p.discharge_severity.unwrap() <= p.severity);
        }
        if p.sdec_pathway {
            assert_eq!(p.sdec_running_when_required, Some(true));
        }
    }
}

#[test]
fn thrombolysis_shortens_ward_stay() {
    let mut config = base();
    config.capacities.ward_beds = 40;
    let ps = patients(&config);
    let treated: Vec<&Patient> = ps
        .iter()
        .filter(|p| p.thrombolysis && p.ward_los.is_some())
        .collect();
    assert!(!treated.is_empty());
    for p in treated {
        assert_eq!(p.diagnosis, Diagnosis::Ischaemic);
        let baseline = p.ward_los_baseline.unwrap();
        assert!((p.ward_los.unwrap() - baseline * 0.75).abs() < 1e-9);
        if p.advanced_ct_pathway {
            let expected = baseline * 0.25 * 528.17 / DAY;
            assert!((p.thrombolysis_savings - expected).abs() < 1e-6);
        } else {
            assert_eq!(p.thrombolysis_savings, 0.0);
        }
    }
}

#[test]
fn closed_scanner_blocks_unknown_onset_thrombolysis() {
    let config = base().with_advanced_ct_availability(0.0, 0);
    let output = Trial::new(config).unwrap().run().unwrap();
    assert!(output.patients.iter().all(|p| !p.advanced_ct_pathway));
    assert!(output
        .patients
        .iter()
        .filter(|p| p.thrombolysis)
        .all(|p| p.onset_type == OnsetType::Known));
    let row = &output.runs[0];
    assert_eq!(row.additional_thrombolysis, 0);
    assert_eq!(row.thrombolysis_savings, 0.0);
}

#[test]
fn closed_sdec_admits_nobody() {
    let config = base().with_sdec_availability(0.0, 0);
    let output = Trial::new(config).unwrap().run().unwrap();
    assert!(output.patients.iter().all(|p| !p.sdec_pathway));
    let row = &output.runs[0];
    assert_eq!(row.sdec_admissions, 0);
    assert_eq!(row.admissions_avoided, 0);
    assert_eq!(row.medical_staff_cost, 0.0);
}

#[test]
fn sdec_follows_its_opening_hours() {
    let config = base().with_sdec_availability(50.0, 8);
    let mut model = Model::new(&config, 0).unwrap();

    model.advance_to(9.0 * 60.0).unwrap();
    assert!(model.is_available(Obstruction::Sdec));
    model.advance_to(21.0 * 60.0).unwrap();
    assert!(!model.is_available(Obstruction::Sdec));
    model.advance_to(DAY + 7.0 * 60.0).unwrap();
    assert!(!model.is_available(Obstruction::Sdec));
    model.advance_to(DAY + 19.0 * 60.0).unwrap();
    assert!(model.is_available(Obstruction::Sdec));
    assert!(model.is_available(Obstruction::AdvancedScanner));

    let row = model.run().unwrap().results;
    assert!(row.sdec_freezes > 0);
    assert_eq!(row.scanner_freezes, 0);
    let full = 0.5 * config.sim_duration;
    assert!(row.medical_staff_cost < full);
}

#[test]
fn therapy_in_sdec_widens_avoidance() {
    let plain = Trial::new(base().with_runs(3)).unwrap().run().unwrap();
    let therapy = Trial::new(base().with_runs(3).with_therapy_sdec(true))
        .unwrap()
        .run()
        .unwrap();
    let severe_avoiders = |o: &strokeflow::TrialOutput| -> usize {
        o.patients
            .iter()
            .filter(|p| p.admission_avoidance && p.diagnosis.is_stroke())
            .filter(|p| p.severity.value() >= 2)
            .count()
    };
    assert_eq!(severe_avoiders(&plain), 0);
    for p in therapy.patients.iter().filter(|p| p.admission_avoidance) {
        if p.diagnosis.is_stroke() {
            assert!(p.severity.value() < 4);
            assert!(!p.thrombolysis);
        }
    }
}
