use strokeflow_sim::{ArrivalSchedule, StreamSet, ThinningSampler, MINUTES_PER_DAY};

#[test]
fn bucket_rates_converge_to_schedule() {
    let schedule = ArrivalSchedule::hourly_windows(7, 0, 200.0, 2000.0 / 3.0).unwrap();
    let mut streams = StreamSet::new(42, 0, 2).unwrap();
    let mut sampler = ThinningSampler::new(
        schedule.clone(),
        streams.bind(0, "gaps").unwrap(),
        streams.bind(1, "acceptance").unwrap(),
    )
    .unwrap();

    let days = 10_000.0;
    let horizon = days * MINUTES_PER_DAY;
    let mut counts = [0u64; 24];
    let mut now = 0.0;
    loop {
        now += sampler.sample(now);
        if now >= horizon {
            break;
        }
        counts[schedule.bucket_at(now)] += 1;
    }

    for (bucket, count) in counts.iter().enumerate() {
        let expected = days * schedule.interval() / schedule.buckets()[bucket];
        let observed = *count as f64;
        let error = (observed - expected).abs() / expected;
        assert!(
            error < 0.15,
            "bucket {bucket}: observed {observed}, expected {expected:.1}"
        );
    }
}

#[test]
fn sampler_is_reproducible() {
    let run = || {
        let schedule = ArrivalSchedule::hourly_windows(8, 20, 30.0, 120.0).unwrap();
        let mut streams = StreamSet::new(7, 2, 2).unwrap();
        let mut sampler = ThinningSampler::new(
            schedule,
            streams.bind(0, "gaps").unwrap(),
            streams.bind(1, "acceptance").unwrap(),
        )
        .unwrap();
        let mut now = 0.0;
        (0..500)
            .map(|_| {
                now += sampler.sample(now);
                now
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}
