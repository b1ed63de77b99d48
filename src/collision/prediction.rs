use glam::DVec2;

use crate::{
    core::{
        ball::Ball,
        types::{CollisionEvent, SimulationParameters},
    },
    utils::allocator::{Arena, BallId},
};

/// Computes the earliest collision `id` will experience within the current
/// frame, or `None` when the ball flies free for at least one full frame.
///
/// Times are in frame units: velocity is displacement per frame and the
/// prediction horizon is `t < 1`. Candidates are compared with strict-less,
/// so at exactly equal times the first-found candidate wins (walls before
/// balls, balls in arena order) — this keeps two-ball scenarios reproducible.
///
/// Must run under the registry lock so no peer mutates during the pairwise
/// scan.
pub fn predict_next(
    balls: &Arena<Ball>,
    id: BallId,
    params: &SimulationParameters,
) -> Option<CollisionEvent> {
    let ball = balls.get(id)?;
    let (mut earliest, mut normal) = wall_impact(ball, params);
    let mut partner = None;

    for (other_id, other) in balls.iter() {
        if other_id == id {
            continue;
        }
        let Some(t) = time_of_impact(ball, other) else {
            continue;
        };
        if t < earliest {
            earliest = t;
            partner = Some(other_id);
            // Normal between the predicted centers at impact, not along the
            // velocity: oblique hits reflect about the center-to-center axis.
            let next_a = ball.position + ball.velocity * t;
            let next_b = other.position + other.velocity * t;
            normal = (next_a - next_b).normalize_or_zero();
        }
    }

    if earliest >= 1.0 {
        return None;
    }

    let frame = params.frame_time_ms;
    // ceil can round up to a full frame for t just under 1; clamp to keep
    // the offset strictly inside the frame.
    let time_offset_ms = ((earliest * frame as f64).ceil() as u64).min(frame.saturating_sub(1));
    Some(CollisionEvent {
        time_offset_ms,
        normal,
        partner,
    })
}

/// Earliest wall hit along either axis: time in frames plus the inward unit
/// normal of that wall. A ball at rest reports no candidate (`+∞`).
fn wall_impact(ball: &Ball, params: &SimulationParameters) -> (f64, DVec2) {
    let radius = ball.radius();
    let mut earliest = f64::INFINITY;
    let mut normal = DVec2::ZERO;

    if ball.velocity.x != 0.0 {
        let bound = if ball.velocity.x > 0.0 {
            params.table_size - radius
        } else {
            radius
        };
        earliest = (bound - ball.position.x) / ball.velocity.x;
        normal = DVec2::new(-ball.velocity.x.signum(), 0.0);
    }

    if ball.velocity.y != 0.0 {
        let bound = if ball.velocity.y > 0.0 {
            params.table_size - radius
        } else {
            radius
        };
        let t = (bound - ball.position.y) / ball.velocity.y;
        if t < earliest {
            earliest = t;
            normal = DVec2::new(0.0, -ball.velocity.y.signum());
        }
    }

    (earliest, normal)
}

/// Time in frames until the centers of `ball` and `other` are exactly the sum
/// of their radii apart, treating both as points in uniform motion.
///
/// Solves `|Δp + Δv·t| = rA + rB`, a quadratic with `a = |Δv|²`,
/// `b = 2·Δp·Δv`, `c = |Δp|² − r²`. Returns `None` when the pair never
/// meets: zero relative velocity, complex roots, or an already-overlapping
/// pair that is separating. An exactly-touching pair (`c == 0`) collides
/// only while still approaching (`b < 0`), so contacts landing precisely on
/// a frame boundary are caught at `t = 0` of the next frame instead of
/// tunnelling through.
pub fn time_of_impact(ball: &Ball, other: &Ball) -> Option<f64> {
    let dp = ball.position - other.position;
    let dv = ball.velocity - other.velocity;
    let r = ball.radius() + other.radius();

    let a = dv.length_squared();
    if a == 0.0 {
        return None;
    }
    let b = 2.0 * dp.dot(dv);
    let c = dp.length_squared() - r * r;

    if c <= 0.0 && b >= 0.0 {
        return None;
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let mut t = (-b - sqrt_d) / (2.0 * a);
    if t < 0.0 {
        t = (-b + sqrt_d) / (2.0 * a);
    }

    (t >= 0.0).then_some(t)
}
