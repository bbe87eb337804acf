use strokeflow_sim::{Priority, ResourcePool, SimWorld, StreamSet, Exponential};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Arrive(u32),
    Finish(u32, usize),
}

/// A single-server queue driven by seeded streams. Returns (time, event) log.
fn run_queue(seed: u64) -> Vec<(f64, String)> {
    let mut streams = StreamSet::new(seed, 0, 2).unwrap();
    let mut iat = Exponential::new(10.0, streams.bind(0, "iat").unwrap()).unwrap();
    let mut service = Exponential::new(8.0, streams.bind(1, "service").unwrap()).unwrap();

    let mut world = SimWorld::new();
    let mut server = ResourcePool::new("server", 1).unwrap();
    let mut log = Vec::new();
    world.schedule(Event::Arrive(0), 0.0).unwrap();

    while let Some(event) = world.next_until(2_000.0) {
        log.push((world.now(), format!("{event:?}")));
        match event {
            Event::Arrive(id) => {
                if let Some(grant) = server.request(id, Priority::PATIENT) {
                    world
                        .schedule(Event::Finish(id, grant.unit), service.sample())
                        .unwrap();
                }
                world.schedule(Event::Arrive(id + 1), iat.sample()).unwrap();
            }
            Event::Finish(_, unit) => {
                if let Some(next) = server.release(unit).unwrap() {
                    world
                        .schedule(Event::Finish(next.requester, next.unit), service.sample())
                        .unwrap();
                }
            }
        }
        assert!(server.in_use() <= server.capacity());
    }
    log
}

#[test]
fn deterministic_event_execution_order() {
    let results: Vec<_> = (0..5).map(|_| run_queue(42)).collect();
    let first = &results[0];
    assert!(first.len() > 100);
    for (i, result) in results.iter().enumerate().skip(1) {
        assert_eq!(result, first, "run {} diverged from the first run", i + 1);
    }
}

#[test]
fn different_seed_changes_the_log() {
    assert_ne!(run_queue(42), run_queue(43));
}

#[test]
fn same_time_events_sequence_order() {
    let mut world = SimWorld::new();
    for id in [10, 20, 30, 40] {
        world.schedule_at(id, 100.0).unwrap();
    }
    assert_eq!(world.pending_event_count(), 4);

    let order: Vec<_> = std::iter::from_fn(|| world.next_until(f64::INFINITY)).collect();
    assert_eq!(order, vec![10, 20, 30, 40]);
    assert_eq!(world.now(), 100.0);
}
