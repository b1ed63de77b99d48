use std::{
    f64::consts::TAU,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use chrono::Utc;
use glam::DVec2;
use log::debug;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

use crate::{
    collision::prediction::predict_next,
    config::{DEFAULT_BALL_DIAMETER, DEFAULT_BALL_SPEED},
    core::{ball::Ball, types::SimulationParameters},
    utils::{
        allocator::{Arena, BallId},
        logging::{warn_if_cycle_budget_exceeded, ScopedTimer, TelemetryLogger, TelemetrySample},
    },
};

/// Single per-cycle position callback, replacing per-ball subscriber lists.
pub type PositionListener = dyn Fn(BallId, DVec2) + Send + Sync;
/// Invoked with the starting position whenever a ball is created.
pub type CreationHandler = dyn Fn(DVec2, BallId) + Send + Sync;
/// Invoked whenever a ball is removed from the registry.
pub type RemovalHandler = dyn Fn(BallId) + Send + Sync;

/// Shared state every stepping thread reads and writes under one lock.
///
/// A single registry-wide mutex (rather than per-ball locks) keeps pairwise
/// prediction free of lock-ordering hazards: each cycle's predict-and-mutate
/// sequence is one critical section, so no thread ever observes a
/// half-updated peer.
pub struct TableState {
    pub balls: Arena<Ball>,
    pub params: SimulationParameters,
}

struct Stepper {
    id: BallId,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Registry and scheduler: owns the live set of balls and drives one
/// stepping thread per ball.
///
/// Registry membership and live threads stay in lock-step — removal signals
/// the stop flag and joins the thread before the arena slot is freed, so no
/// stepping thread can touch shared state after its ball is gone.
pub struct BallWorld {
    state: Arc<Mutex<TableState>>,
    /// Creation order; removal pops the back (last-created-first).
    steppers: Vec<Stepper>,
    rng: Pcg64Mcg,
    position_listener: Option<Arc<PositionListener>>,
    creation_handler: Option<Arc<CreationHandler>>,
    removal_handler: Option<Arc<RemovalHandler>>,
    telemetry: Option<TelemetryLogger>,
}

impl BallWorld {
    pub fn new(params: SimulationParameters) -> Self {
        Self::with_seed(params, rand::random())
    }

    /// World with a fixed random seed: placements and headings are then
    /// reproducible run to run.
    pub fn with_seed(params: SimulationParameters, seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(TableState {
                balls: Arena::new(),
                params,
            })),
            steppers: Vec::new(),
            rng: Pcg64Mcg::seed_from_u64(seed),
            position_listener: None,
            creation_handler: None,
            removal_handler: None,
            telemetry: None,
        }
    }

    pub fn set_position_listener(&mut self, listener: Arc<PositionListener>) {
        self.position_listener = Some(listener);
    }

    pub fn set_lifecycle_handlers(
        &mut self,
        on_created: Arc<CreationHandler>,
        on_removed: Arc<RemovalHandler>,
    ) {
        self.creation_handler = Some(on_created);
        self.removal_handler = Some(on_removed);
    }

    /// Attach before spawning: only balls created afterwards feed the sink.
    pub fn attach_telemetry(&mut self, logger: TelemetryLogger) {
        self.telemetry = Some(logger);
    }

    pub fn params(&self) -> SimulationParameters {
        self.state.lock().params
    }

    pub fn ball_count(&self) -> usize {
        self.steppers.len()
    }

    /// Creates one ball with a random placement (at least one radius clear of
    /// every wall) and a random heading, registers it and starts its stepping
    /// thread.
    pub fn spawn_ball(&mut self) -> BallId {
        let params = self.params();
        let diameter = DEFAULT_BALL_DIAMETER;
        let radius = diameter / 2.0;
        debug_assert!(params.table_size > diameter);

        let position = DVec2::new(
            self.rng.random_range(radius..=params.table_size - radius),
            self.rng.random_range(radius..=params.table_size - radius),
        );
        let bearing = self.rng.random_range(0.0..TAU);
        let velocity = DVec2::new(bearing.sin(), bearing.cos()) * DEFAULT_BALL_SPEED;

        let id = {
            let mut table = self.state.lock();
            let id = table
                .balls
                .insert_with(|id| Ball::new(id, position, velocity, diameter));
            // Seed the first cycle's pending event so the ball cannot
            // overshoot before its first prediction.
            if let Some(event) = predict_next(&table.balls, id, &params) {
                if let Some(ball) = table.balls.get_mut(id) {
                    ball.deliver_collision(event);
                }
            }
            id
        };

        if let Some(on_created) = &self.creation_handler {
            on_created(position, id);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let ctx = StepperContext {
            state: Arc::clone(&self.state),
            id,
            stop: Arc::clone(&stop),
            position_listener: self.position_listener.clone(),
            telemetry: self.telemetry.as_ref().map(TelemetryLogger::sender),
        };
        let handle = thread::spawn(move || run_stepper(ctx));
        self.steppers.push(Stepper { id, stop, handle });

        debug!(
            "ball {} spawned at ({:.2}, {:.2})",
            id.index(),
            position.x,
            position.y
        );
        id
    }

    /// Removes the most recently created ball: cancels its stepping thread,
    /// joins it, then frees the slot. No-op on an empty registry.
    pub fn remove_last(&mut self) -> Option<BallId> {
        let stepper = self.steppers.pop()?;
        stepper.stop.store(true, Ordering::Relaxed);
        // Join before freeing the slot so no late write can land.
        let _ = stepper.handle.join();
        self.state.lock().balls.remove(stepper.id);

        if let Some(on_removed) = &self.removal_handler {
            on_removed(stepper.id);
        }
        debug!("ball {} removed", stepper.id.index());
        Some(stepper.id)
    }

    /// Cancels every stepping thread, joins them, clears the registry and
    /// shuts the telemetry sink down.
    pub fn stop_all(&mut self) {
        for stepper in &self.steppers {
            stepper.stop.store(true, Ordering::Relaxed);
        }
        for stepper in self.steppers.drain(..) {
            let _ = stepper.handle.join();
        }
        self.state.lock().balls.clear();
        if let Some(logger) = self.telemetry.take() {
            logger.shutdown();
        }
        debug!("simulation stopped");
    }
}

impl Drop for BallWorld {
    fn drop(&mut self) {
        self.stop_all();
    }
}

struct StepperContext {
    state: Arc<Mutex<TableState>>,
    id: BallId,
    stop: Arc<AtomicBool>,
    position_listener: Option<Arc<PositionListener>>,
    telemetry: Option<Sender<TelemetrySample>>,
}

/// Autonomous stepping loop for one ball. The stop flag is checked once per
/// cycle; cancellation therefore never lands mid-mutation.
fn run_stepper(ctx: StepperContext) {
    while !ctx.stop.load(Ordering::Relaxed) {
        let Some(cycle) = step_once(&ctx.state, ctx.id) else {
            // Slot already freed: the registry removed this ball.
            break;
        };

        // User code and sleeping stay outside the critical section.
        if let Some(listener) = &ctx.position_listener {
            listener(ctx.id, cycle.position);
        }
        if let Some(sender) = &ctx.telemetry {
            let _ = sender.send(TelemetrySample {
                ball_id: ctx.id,
                position: cycle.position,
                velocity: cycle.velocity,
                timestamp: Utc::now(),
            });
        }

        thread::sleep(Duration::from_millis(cycle.sleep_ms));
    }
}

struct CycleOutcome {
    position: DVec2,
    velocity: DVec2,
    sleep_ms: u64,
}

/// One stepping cycle under the registry lock:
///
/// 1. the cycle's local time is the pending collision's offset, or a full
///    frame when the ball flies free;
/// 2. a pending collision reflects the velocity about its normal and, for
///    ball-ball contacts, delivers the mirrored event to the partner;
/// 3. the ball advances by `velocity * local / frame`;
/// 4. the predictor computes the next event from the fresh state and stores
///    it as pending.
///
/// Returns the sleep duration and the post-move state, or `None` when the
/// ball's slot has disappeared.
fn step_once(state: &Mutex<TableState>, id: BallId) -> Option<CycleOutcome> {
    let entered = Instant::now();
    let mut table = state.lock();
    let _timer = ScopedTimer::new("stepper::cycle");
    let params = table.params;
    let frame = params.frame_time_ms;

    let (local_ms, position, velocity, mirrored) = {
        let ball = table.balls.get_mut(id)?;
        let pending = ball.take_collision();
        let local_ms = pending.map_or(frame, |event| event.time_offset_ms);

        let mut mirrored = None;
        if let Some(event) = pending {
            ball.velocity = ball.velocity.reflect(event.normal);
            if let Some(partner) = event.partner {
                mirrored = Some((partner, event.mirrored(id)));
            }
        }

        let delta = local_ms as f64 / frame as f64;
        let displacement = ball.velocity * delta;
        ball.move_by(displacement);
        (local_ms, ball.position, ball.velocity, mirrored)
    };

    if let Some((partner, event)) = mirrored {
        // The partner may have been removed in the meantime; the delivery is
        // then dropped.
        if let Some(other) = table.balls.get_mut(partner) {
            other.deliver_collision(event);
        }
    }

    let next = predict_next(&table.balls, id, &params);
    let sleep_ms = match &next {
        Some(event) => local_ms.min(event.time_offset_ms),
        None => local_ms,
    };
    if let Some(event) = next {
        if let Some(ball) = table.balls.get_mut(id) {
            ball.deliver_collision(event);
        }
    }

    drop(table);
    warn_if_cycle_budget_exceeded(entered.elapsed(), frame);

    Some(CycleOutcome {
        position,
        velocity,
        sleep_ms,
    })
}
