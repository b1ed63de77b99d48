use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use carom::{DVec2, EngineError, SimulationEngine, SimulationParameters};

fn engine() -> SimulationEngine {
    SimulationEngine::with_seed(SimulationParameters::default(), 42)
}

#[test]
fn start_creates_every_requested_ball() {
    let created = Arc::new(Mutex::new(Vec::new()));
    let created_in_cb = Arc::clone(&created);

    let mut engine = engine();
    engine
        .start(
            3,
            move |position, id| created_in_cb.lock().unwrap().push((id, position)),
            |_| {},
        )
        .unwrap();

    assert_eq!(engine.ball_count(), 3);
    let created = created.lock().unwrap();
    assert_eq!(created.len(), 3);
    for (_, position) in created.iter() {
        assert!(position.x >= 5.0 && position.x <= 95.0);
        assert!(position.y >= 5.0 && position.y <= 95.0);
    }

    engine.stop().unwrap();
    assert_eq!(engine.ball_count(), 0);
}

#[test]
fn start_twice_is_rejected() {
    let mut engine = engine();
    engine.start(1, |_, _| {}, |_| {}).unwrap();
    assert!(matches!(
        engine.start(1, |_, _| {}, |_| {}),
        Err(EngineError::AlreadyStarted)
    ));
    engine.stop().unwrap();
}

#[test]
fn start_with_zero_balls_is_rejected() {
    let mut engine = engine();
    assert!(matches!(
        engine.start(0, |_, _| {}, |_| {}),
        Err(EngineError::InvalidBallCount(0))
    ));
    assert_eq!(engine.ball_count(), 0);
}

#[test]
fn removal_pops_the_latest_ball_first() {
    let removed = Arc::new(Mutex::new(Vec::new()));
    let removed_in_cb = Arc::clone(&removed);

    let mut engine = engine();
    engine
        .start(2, |_, _| {}, move |id| {
            removed_in_cb.lock().unwrap().push(id)
        })
        .unwrap();

    let latest = engine.add_ball().unwrap();
    assert_eq!(engine.ball_count(), 3);

    assert_eq!(engine.remove_ball().unwrap(), Some(latest));
    assert_eq!(engine.ball_count(), 2);
    assert_eq!(removed.lock().unwrap().as_slice(), &[latest]);

    engine.remove_ball().unwrap();
    engine.remove_ball().unwrap();
    assert_eq!(engine.ball_count(), 0);

    // Removing from an empty registry is a no-op.
    assert!(engine.remove_ball().unwrap().is_none());
    assert_eq!(removed.lock().unwrap().len(), 3);
}

#[test]
fn stop_allows_a_fresh_start() {
    let mut engine = engine();
    engine.start(2, |_, _| {}, |_| {}).unwrap();
    engine.stop().unwrap();
    engine.start(1, |_, _| {}, |_| {}).unwrap();
    assert_eq!(engine.ball_count(), 1);
    engine.stop().unwrap();
}

#[test]
fn dispose_is_terminal() {
    let mut engine = engine();
    engine.dispose().unwrap();

    assert!(matches!(engine.dispose(), Err(EngineError::Disposed)));
    assert!(matches!(
        engine.start(1, |_, _| {}, |_| {}),
        Err(EngineError::Disposed)
    ));
    assert!(matches!(engine.add_ball(), Err(EngineError::Disposed)));
    assert!(matches!(engine.remove_ball(), Err(EngineError::Disposed)));
    assert!(matches!(engine.stop(), Err(EngineError::Disposed)));
}

#[test]
fn dispose_cancels_running_steppers() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let ticks_in_cb = Arc::clone(&ticks);

    let mut engine = engine();
    engine
        .set_position_listener(move |_, _| {
            ticks_in_cb.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    engine.start(2, |_, _| {}, |_| {}).unwrap();
    std::thread::sleep(Duration::from_millis(80));
    engine.dispose().unwrap();

    let after_dispose = ticks.load(Ordering::Relaxed);
    assert!(after_dispose > 0, "steppers never ticked");
    std::thread::sleep(Duration::from_millis(80));
    assert_eq!(ticks.load(Ordering::Relaxed), after_dispose);
}

#[test]
fn parameters_are_validated_and_exposed() {
    assert!(SimulationParameters::new(0, 100.0).is_err());
    assert!(SimulationParameters::new(20, -1.0).is_err());

    let params = SimulationParameters::new(10, 50.0).unwrap();
    let engine = SimulationEngine::with_seed(params, 1);
    assert_eq!(engine.params().frame_time_ms, 10);
    assert_eq!(engine.params().table_size, 50.0);
}

#[test]
fn same_seed_reproduces_the_initial_layout() {
    let spawn_positions = |seed: u64| -> Vec<DVec2> {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let recorded_in_cb = Arc::clone(&recorded);
        let mut engine = SimulationEngine::with_seed(SimulationParameters::default(), seed);
        engine
            .start(
                4,
                move |position, _| recorded_in_cb.lock().unwrap().push(position),
                |_| {},
            )
            .unwrap();
        engine.stop().unwrap();
        let positions = recorded.lock().unwrap().clone();
        positions
    };

    assert_eq!(spawn_positions(9), spawn_positions(9));
    assert_ne!(spawn_positions(9), spawn_positions(10));
}

#[test]
fn telemetry_appends_csv_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("balls.csv");

    let mut engine = engine();
    engine.enable_telemetry(&path).unwrap();
    engine.start(2, |_, _| {}, |_| {}).unwrap();
    std::thread::sleep(Duration::from_millis(200));
    engine.stop().unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(!contents.is_empty(), "no telemetry was written");
    for line in contents.lines() {
        let fields: Vec<_> = line.split(',').collect();
        assert_eq!(fields.len(), 6, "bad telemetry line: {line}");
        fields[1].parse::<f64>().unwrap();
        fields[2].parse::<f64>().unwrap();
        fields[3].parse::<f64>().unwrap();
        fields[4].parse::<f64>().unwrap();
    }
}
