//! Carom – a concurrent, discrete-event simulation of balls on a bounded table.
//!
//! Circular bodies move on a square table, bouncing off the walls and each
//! other. Each ball advances autonomously on its own stepping thread; a
//! single registry-wide lock keeps positions, velocities and collision
//! outcomes consistent under parallel mutation. Instead of correcting
//! overlaps after full-frame overshoot, every cycle predicts the ball's
//! earliest time-of-impact (wall or peer) within the current frame and wakes
//! it exactly at that instant.

pub mod collision;
pub mod config;
pub mod core;
pub mod error;
pub mod utils;
pub mod world;

pub use glam::DVec2;

pub use crate::collision::prediction::{predict_next, time_of_impact};
pub use crate::core::{
    ball::Ball,
    types::{CollisionEvent, SimulationParameters},
};
pub use crate::error::EngineError;
pub use crate::utils::{
    allocator::{Arena, BallId},
    logging::{TelemetryLogger, TelemetrySample},
};
pub use crate::world::{BallWorld, TableState};

use std::path::Path;
use std::sync::Arc;

/// High-level facade that owns a [`BallWorld`] and guards the engine
/// lifecycle: the simulation starts at most once at a time, and a disposed
/// engine rejects every further call.
///
/// Engines are plain values — construct as many as needed (each owns its own
/// registry, threads and random source), no global instance is involved.
pub struct SimulationEngine {
    world: BallWorld,
    started: bool,
    disposed: bool,
}

impl SimulationEngine {
    pub fn new(params: SimulationParameters) -> Self {
        Self::from_world(BallWorld::new(params))
    }

    /// Engine with a fixed random seed; ball placements and headings are
    /// then reproducible run to run.
    pub fn with_seed(params: SimulationParameters, seed: u64) -> Self {
        Self::from_world(BallWorld::with_seed(params, seed))
    }

    fn from_world(world: BallWorld) -> Self {
        Self {
            world,
            started: false,
            disposed: false,
        }
    }

    /// Registers the single per-cycle position listener consumed by the
    /// presentation layer. Notifications from different balls carry no
    /// global ordering guarantee.
    pub fn set_position_listener(
        &mut self,
        listener: impl Fn(BallId, DVec2) + Send + Sync + 'static,
    ) -> Result<(), EngineError> {
        self.ensure_live()?;
        self.world.set_position_listener(Arc::new(listener));
        Ok(())
    }

    /// Attaches the CSV telemetry sink
    /// (`ballId,posX,posY,velX,velY,isoTimestamp`). Call before `start`.
    pub fn enable_telemetry(&mut self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        self.ensure_live()?;
        let logger = TelemetryLogger::create(path)?;
        self.world.attach_telemetry(logger);
        Ok(())
    }

    /// Starts the simulation with `number_of_balls` balls. Either every ball
    /// is created and stepping, or the call fails and none are.
    pub fn start(
        &mut self,
        number_of_balls: usize,
        on_created: impl Fn(DVec2, BallId) + Send + Sync + 'static,
        on_removed: impl Fn(BallId) + Send + Sync + 'static,
    ) -> Result<(), EngineError> {
        self.ensure_live()?;
        if self.started {
            return Err(EngineError::AlreadyStarted);
        }
        if number_of_balls == 0 {
            return Err(EngineError::InvalidBallCount(number_of_balls));
        }

        self.world
            .set_lifecycle_handlers(Arc::new(on_created), Arc::new(on_removed));
        for _ in 0..number_of_balls {
            self.world.spawn_ball();
        }
        self.started = true;
        Ok(())
    }

    /// Stops every stepping thread and clears the registry. The engine may
    /// be started again afterwards.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        self.ensure_live()?;
        self.world.stop_all();
        self.started = false;
        Ok(())
    }

    /// Adds one ball to the running registry.
    pub fn add_ball(&mut self) -> Result<BallId, EngineError> {
        self.ensure_live()?;
        Ok(self.world.spawn_ball())
    }

    /// Removes the most recently added ball; `Ok(None)` when the registry is
    /// already empty.
    pub fn remove_ball(&mut self) -> Result<Option<BallId>, EngineError> {
        self.ensure_live()?;
        Ok(self.world.remove_last())
    }

    /// Releases every stepping thread and marks the engine unusable. A
    /// second call — like any call after this one — fails with
    /// [`EngineError::Disposed`].
    pub fn dispose(&mut self) -> Result<(), EngineError> {
        self.ensure_live()?;
        self.world.stop_all();
        self.disposed = true;
        Ok(())
    }

    pub fn ball_count(&self) -> usize {
        self.world.ball_count()
    }

    pub fn params(&self) -> SimulationParameters {
        self.world.params()
    }

    fn ensure_live(&self) -> Result<(), EngineError> {
        if self.disposed {
            Err(EngineError::Disposed)
        } else {
            Ok(())
        }
    }
}
