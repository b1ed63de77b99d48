use glam::DVec2;

use crate::{core::types::CollisionEvent, utils::allocator::BallId};

/// A simulated disk. Positions are table units; velocity is displacement per
/// frame and is the sole driver of motion.
///
/// A ball is exclusively owned by the registry. Peers only read its position,
/// velocity and radius during prediction, or deliver a collision event; the
/// owning stepping loop is the only code that reflects the velocity.
#[derive(Debug, Clone)]
pub struct Ball {
    pub id: BallId,
    pub position: DVec2,
    pub velocity: DVec2,
    pub diameter: f64,
    pending_collision: Option<CollisionEvent>,
}

impl Ball {
    pub fn new(id: BallId, position: DVec2, velocity: DVec2, diameter: f64) -> Self {
        debug_assert!(diameter > 0.0);
        Self {
            id,
            position,
            velocity,
            diameter,
            pending_collision: None,
        }
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    /// Applies a displacement to the ball's position.
    pub fn move_by(&mut self, delta: DVec2) {
        self.position += delta;
    }

    /// Stores a collision for the owning stepping loop to consume at its next
    /// cycle. Deliberately leaves the velocity untouched so that only one
    /// thread ever mutates it.
    pub fn deliver_collision(&mut self, event: CollisionEvent) {
        self.pending_collision = Some(event);
    }

    /// Consumes the pending collision, if any.
    pub fn take_collision(&mut self) -> Option<CollisionEvent> {
        self.pending_collision.take()
    }

    pub fn pending_collision(&self) -> Option<&CollisionEvent> {
        self.pending_collision.as_ref()
    }
}
