//! Drive integration and arena boundary response.
//!
//! Tank-style steering: rotation input changes the facing angle, thrust is
//! applied along the current facing, and velocity direction is independent
//! of facing. Friction decays as `friction^(60*dt)` so damping is
//! frame-rate independent, and speed is clamped by uniform rescale so
//! direction is preserved.

use glam::Vec2;

use super::body::{Arena, KinematicBody};
use crate::consts::NOMINAL_HZ;

/// Above this speed, "decelerate" brakes against the velocity; below it,
/// the input produces a slow reverse along the facing instead.
pub const BRAKE_SPEED_THRESHOLD: f32 = 5.0;
/// Braking is stronger than forward thrust.
pub const BRAKE_FACTOR: f32 = 1.5;
/// Reversing is weaker than forward thrust.
pub const REVERSE_FACTOR: f32 = 0.7;

/// Apply one frame of drive input to a body.
///
/// `forward` is the unit facing direction, `external_force` is an additive
/// acceleration (e.g. lateral wind). After thrust, friction and the
/// external force, speed is clamped to `max_speed` and position is
/// integrated. Post-condition: `|vel| <= max_speed + epsilon`.
pub fn integrate_drive(
    body: &mut KinematicBody,
    forward: Vec2,
    accelerate: bool,
    decelerate: bool,
    acceleration: f32,
    max_speed: f32,
    friction: f32,
    external_force: Vec2,
    dt: f32,
) {
    if dt <= 0.0 {
        return;
    }

    if accelerate {
        body.vel += forward * acceleration * dt;
    } else if decelerate {
        let speed = body.vel.length();
        if speed > BRAKE_SPEED_THRESHOLD {
            // Brake against the direction of travel, not the facing
            body.vel -= body.vel / speed * acceleration * BRAKE_FACTOR * dt;
        } else {
            body.vel -= forward * acceleration * REVERSE_FACTOR * dt;
        }
    }

    body.vel += external_force * dt;

    apply_friction(body, friction, dt);
    clamp_speed(body, max_speed);

    body.pos += body.vel * dt;
}

/// Multiplicative friction decay, calibrated so that `friction` is the
/// per-frame retention at the nominal 60 Hz rate.
#[inline]
pub fn apply_friction(body: &mut KinematicBody, friction: f32, dt: f32) {
    let factor = friction.powf(NOMINAL_HZ * dt);
    body.vel *= factor;
}

/// Clamp speed by uniform rescale, preserving direction.
#[inline]
pub fn clamp_speed(body: &mut KinematicBody, max_speed: f32) {
    let speed_sq = body.vel.length_squared();
    let max_sq = max_speed * max_speed;
    if speed_sq > max_sq && max_sq > 0.0 {
        body.vel *= (max_sq / speed_sq).sqrt();
    } else if max_speed <= 0.0 {
        body.vel = Vec2::ZERO;
    }
}

/// Plain position integration for bodies with no drive (projectiles,
/// dashing attackers).
#[inline]
pub fn integrate(body: &mut KinematicBody, dt: f32) {
    body.pos += body.vel * dt;
}

/// Snap a body back inside the arena and reflect the touched velocity
/// component, scaled by `damping`. The sign of the reflected component is
/// forced away from the wall. Returns whether any axis made contact.
///
/// Damping differs by actor class (heavily damped for the racer,
/// near-elastic for enemies) - an intentional asymmetry.
pub fn resolve_boundary(body: &mut KinematicBody, arena: &Arena, damping: f32) -> bool {
    let bounds = arena.inset(body.radius);
    let mut contact = false;

    if body.pos.x < bounds.min.x {
        body.pos.x = bounds.min.x;
        body.vel.x = body.vel.x.abs() * damping;
        contact = true;
    } else if body.pos.x > bounds.max.x {
        body.pos.x = bounds.max.x;
        body.vel.x = -body.vel.x.abs() * damping;
        contact = true;
    }

    if body.pos.y < bounds.min.y {
        body.pos.y = bounds.min.y;
        body.vel.y = body.vel.y.abs() * damping;
        contact = true;
    } else if body.pos.y > bounds.max.y {
        body.pos.y = bounds.max.y;
        body.vel.y = -body.vel.y.abs() * damping;
        contact = true;
    }

    contact
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_at(pos: Vec2, vel: Vec2) -> KinematicBody {
        let mut body = KinematicBody::new(pos, 10.0).unwrap();
        body.vel = vel;
        body
    }

    #[test]
    fn test_friction_follows_decay_law() {
        // After n frames of dt = 1/60, speed = v0 * k^n
        let mut body = body_at(Vec2::ZERO, Vec2::new(120.0, 0.0));
        let k: f32 = 0.955;
        for _ in 0..30 {
            apply_friction(&mut body, k, 1.0 / 60.0);
        }
        let expected = 120.0 * k.powi(30);
        assert!((body.vel.x - expected).abs() < 1e-2);
    }

    #[test]
    fn test_friction_never_increases_speed() {
        let mut body = body_at(Vec2::ZERO, Vec2::new(80.0, -60.0));
        let mut prev = body.speed();
        for _ in 0..120 {
            apply_friction(&mut body, 0.955, 1.0 / 60.0);
            let speed = body.speed();
            assert!(speed <= prev + 1e-4);
            prev = speed;
        }
    }

    #[test]
    fn test_speed_clamp_preserves_direction() {
        let mut body = body_at(Vec2::ZERO, Vec2::new(300.0, 400.0));
        clamp_speed(&mut body, 100.0);
        assert!((body.speed() - 100.0).abs() < 1e-3);
        // Direction unchanged: 3-4-5 triangle
        assert!((body.vel.x - 60.0).abs() < 1e-2);
        assert!((body.vel.y - 80.0).abs() < 1e-2);
    }

    #[test]
    fn test_integrate_drive_respects_max_speed() {
        let mut body = body_at(Vec2::splat(500.0), Vec2::ZERO);
        let forward = Vec2::new(1.0, 0.0);
        for _ in 0..300 {
            integrate_drive(
                &mut body, forward, true, false, 7200.0, 216.0, 0.955, Vec2::ZERO, 1.0 / 60.0,
            );
            assert!(body.speed() <= 216.0 + 1e-3);
        }
        // Long enough to have saturated
        assert!(body.speed() > 150.0);
    }

    #[test]
    fn test_decelerate_brakes_when_moving() {
        let mut body = body_at(Vec2::splat(500.0), Vec2::new(200.0, 0.0));
        let forward = Vec2::new(0.0, 1.0); // facing is irrelevant to braking
        integrate_drive(
            &mut body, forward, false, true, 7200.0, 216.0, 1.0, Vec2::ZERO, 1.0 / 60.0,
        );
        assert!(body.vel.x < 200.0);
        assert!(body.vel.y.abs() < 1.0);
    }

    #[test]
    fn test_decelerate_reverses_when_slow() {
        let mut body = body_at(Vec2::splat(500.0), Vec2::ZERO);
        let forward = Vec2::new(1.0, 0.0);
        integrate_drive(
            &mut body, forward, false, true, 7200.0, 216.0, 1.0, Vec2::ZERO, 1.0 / 60.0,
        );
        // Slow reverse against the facing
        assert!(body.vel.x < 0.0);
    }

    #[test]
    fn test_boundary_contains_position() {
        let arena = Arena::new(Vec2::ZERO, Vec2::splat(200.0));
        let mut body = body_at(Vec2::new(-30.0, 250.0), Vec2::new(-50.0, 90.0));
        let contact = resolve_boundary(&mut body, &arena, 0.95);
        assert!(contact);
        let bounds = arena.inset(body.radius);
        assert!(body.pos.x >= bounds.min.x && body.pos.x <= bounds.max.x);
        assert!(body.pos.y >= bounds.min.y && body.pos.y <= bounds.max.y);
    }

    #[test]
    fn test_boundary_reflects_away_from_wall() {
        let arena = Arena::new(Vec2::ZERO, Vec2::splat(200.0));
        // Below min x: reflected component must point inward (+x)
        let mut body = body_at(Vec2::new(-5.0, 100.0), Vec2::new(-80.0, 0.0));
        resolve_boundary(&mut body, &arena, 0.5);
        assert!((body.vel.x - 40.0).abs() < 1e-3);

        // Above max y: reflected component must point inward (-y)
        let mut body = body_at(Vec2::new(100.0, 230.0), Vec2::new(0.0, 60.0));
        resolve_boundary(&mut body, &arena, 0.5);
        assert!((body.vel.y + 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_no_contact_inside_arena() {
        let arena = Arena::new(Vec2::ZERO, Vec2::splat(200.0));
        let mut body = body_at(Vec2::splat(100.0), Vec2::new(10.0, 10.0));
        assert!(!resolve_boundary(&mut body, &arena, 0.5));
        assert_eq!(body.vel, Vec2::new(10.0, 10.0));
    }
}
