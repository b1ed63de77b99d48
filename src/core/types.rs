use serde::{Deserialize, Serialize};

use crate::{
    config::{DEFAULT_FRAME_TIME_MS, DEFAULT_TABLE_SIZE},
    error::EngineError,
    utils::allocator::BallId,
};

/// Common math type re-exported for convenience. All positions and
/// velocities are `f64` vectors; vector values are `Copy` and every
/// operation returns a new value.
pub use glam::DVec2;

/// Fixed parameters of a running simulation. The table is the square
/// `[0, table_size] × [0, table_size]`; `frame_time_ms` is the scheduling
/// quantum after which, absent an earlier collision, a ball applies its
/// full-frame displacement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub frame_time_ms: u64,
    pub table_size: f64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            frame_time_ms: DEFAULT_FRAME_TIME_MS,
            table_size: DEFAULT_TABLE_SIZE,
        }
    }
}

impl SimulationParameters {
    pub fn new(frame_time_ms: u64, table_size: f64) -> Result<Self, EngineError> {
        if frame_time_ms == 0 {
            return Err(EngineError::InvalidParameter("frame_time_ms must be positive"));
        }
        if !(table_size > 0.0) {
            return Err(EngineError::InvalidParameter("table_size must be positive"));
        }
        Ok(Self {
            frame_time_ms,
            table_size,
        })
    }
}

/// The earliest collision a moving ball will experience within the remainder
/// of the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// Milliseconds into the current frame, always less than the frame length.
    pub time_offset_ms: u64,
    /// Unit normal of the colliding surface at the point of impact.
    pub normal: DVec2,
    /// The other ball for ball-ball collisions, `None` for walls.
    pub partner: Option<BallId>,
}

impl CollisionEvent {
    /// The event delivered to the partner of a ball-ball collision: same
    /// instant, negated normal, partner pointing back at the source.
    pub fn mirrored(&self, source: BallId) -> Self {
        Self {
            time_offset_ms: self.time_offset_ms,
            normal: -self.normal,
            partner: Some(source),
        }
    }
}
