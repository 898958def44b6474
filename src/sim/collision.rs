//! Circle-circle collision detection and impulse response.
//!
//! Detection is a squared-distance overlap test with a small tolerance
//! shrinking the effective radius sum, so bodies that merely touch edges do
//! not register. Resolution pushes both bodies apart evenly and applies an
//! impulse split equally between them regardless of mass - the `mass`
//! field on [`KinematicBody`] is carried but not consulted here.

use glam::Vec2;

use super::body::KinematicBody;

/// Squared-radius-sum tolerance that avoids edge-touch false positives.
pub const CONTACT_TOLERANCE: f32 = 0.98;
/// Each body takes half the penetration depth when de-overlapping.
pub const SEPARATION_FACTOR: f32 = 0.5;
/// Below this squared distance the contact normal is degenerate and the
/// pair is left alone for the frame.
const MIN_DIST_SQ: f32 = 0.01;

/// Overlap test for two bodies.
#[inline]
pub fn circles_overlap(a: &KinematicBody, b: &KinematicBody) -> bool {
    overlap_at(a.pos, a.radius, b.pos, b.radius)
}

/// Overlap test with explicit radii, for actors whose effective radius
/// differs from their physical one (pickup-radius bonuses).
#[inline]
pub fn overlap_at(pos_a: Vec2, r_a: f32, pos_b: Vec2, r_b: f32) -> bool {
    let radius_sum = r_a + r_b;
    pos_a.distance_squared(pos_b) < radius_sum * radius_sum * CONTACT_TOLERANCE
}

/// De-overlap and apply an elastic impulse to a dynamic-dynamic pair.
///
/// Positional correction moves each body half the penetration depth along
/// the contact normal. If the bodies are already separating no impulse is
/// applied. Otherwise the impulse magnitude is
/// `j = -(1 + e) * (relVel . n) / 2`, applied `+j*n` to `a` and `-j*n` to
/// `b` - an even split between the pair.
///
/// Returns whether the pair was actually overlapping.
pub fn resolve_pair(a: &mut KinematicBody, b: &mut KinematicBody, restitution: f32) -> bool {
    let delta = a.pos - b.pos;
    let dist_sq = delta.length_squared();
    let min_dist = a.radius + b.radius;
    if dist_sq >= min_dist * min_dist || dist_sq <= MIN_DIST_SQ {
        return false;
    }

    let dist = dist_sq.sqrt();
    let normal = delta / dist;
    let overlap = min_dist - dist;

    a.pos += normal * overlap * SEPARATION_FACTOR;
    b.pos -= normal * overlap * SEPARATION_FACTOR;

    let rel_vel = a.vel - b.vel;
    let vel_along_normal = rel_vel.dot(normal);
    if vel_along_normal > 0.0 {
        // Already separating; position fix was enough
        return true;
    }

    let j = -(1.0 + restitution) * vel_along_normal / 2.0;
    let impulse = normal * j;
    a.vel += impulse;
    b.vel -= impulse;

    true
}
