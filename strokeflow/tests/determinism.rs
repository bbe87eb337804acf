use strokeflow::{ModelConfig, Trial};

fn config(seed: u64) -> ModelConfig {
    ModelConfig::default()
        .with_days(60.0)
        .with_runs(3)
        .with_seed(seed)
        .with_sdec_availability(50.0, 8)
        .with_advanced_ct_availability(75.0, 6)
}

fn snapshot(seed: u64) -> (String, String, String) {
    let output = Trial::new(config(seed)).unwrap().run().unwrap();
    (
        serde_json::to_string(&output.runs).unwrap(),
        serde_json::to_string(&output.patients).unwrap(),
        serde_json::to_string(&output.ward_audit).unwrap(),
    )
}

#[test]
fn same_seed_is_byte_identical() {
    assert_eq!(snapshot(11), snapshot(11));
}

#[test]
fn different_seed_changes_the_run() {
    let (runs_a, patients_a, _) = snapshot(11);
    let (runs_b, patients_b, _) = snapshot(12);
    assert_ne!(patients_a, patients_b);
    assert_ne!(runs_a, runs_b);
}

#[test]
fn replications_differ_from_each_other() {
    let output = Trial::new(config(3)).unwrap().run().unwrap();
    let arrivals: Vec<Vec<f64>> = (0..3)
        .map(|run| {
            output
                .patients
                .iter()
                .filter(|p| p.run == run)
                .map(|p| p.arrival_time)
                .collect()
        })
        .collect();
    assert_ne!(arrivals[0], arrivals[1]);
    assert_ne!(arrivals[1], arrivals[2]);
}

#[test]
fn parallel_matches_sequential() {
    let trial = Trial::new(config(5)).unwrap();
    let sequential = trial.run().unwrap();
    let parallel = trial.run_parallel().unwrap();
    assert_eq!(sequential.runs, parallel.runs);
    assert_eq!(sequential.patients, parallel.patients);
    assert_eq!(sequential.sdec_audit, parallel.sdec_audit);
    assert_eq!(sequential.nurse_queue_audit, parallel.nurse_queue_audit);
    assert_eq!(sequential.summary(), parallel.summary());
}
