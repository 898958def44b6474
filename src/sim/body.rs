//! Kinematic bodies and the arena they move in.
//!
//! [`KinematicBody`] is the atomic movable unit: position, velocity, radius,
//! mass. Everything that can collide exposes one through [`Collidable`] -
//! there is no optional-field fallback anywhere in the collision path.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::SimError;
use crate::consts::{ARENA_MAX_X, ARENA_MAX_Y, ARENA_MIN_X, ARENA_MIN_Y};

/// Axis-aligned arena rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            min: Vec2::new(ARENA_MIN_X, ARENA_MIN_Y),
            max: Vec2::new(ARENA_MAX_X, ARENA_MAX_Y),
        }
    }
}

impl Arena {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// The arena shrunk inward by `r` on every side, i.e. the region a
    /// circle center of radius `r` may occupy.
    #[inline]
    pub fn inset(&self, r: f32) -> Arena {
        Arena {
            min: self.min + Vec2::splat(r),
            max: self.max - Vec2::splat(r),
        }
    }

    /// The arena grown outward by `pad` on every side.
    #[inline]
    pub fn padded(&self, pad: f32) -> Arena {
        Arena {
            min: self.min - Vec2::splat(pad),
            max: self.max + Vec2::splat(pad),
        }
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Clamp a point into the arena.
    #[inline]
    pub fn clamp(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

/// The minimal movable unit: position, velocity, radius, mass.
///
/// `mass` is carried for every body (default 1.0) but the impulse resolver
/// splits impulses evenly regardless of it; see `sim::collision`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KinematicBody {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    #[serde(default = "default_mass")]
    pub mass: f32,
}

fn default_mass() -> f32 {
    1.0
}

impl KinematicBody {
    /// Create a body at rest. Rejects a radius that is not strictly
    /// positive and finite.
    pub fn new(pos: Vec2, radius: f32) -> Result<Self, SimError> {
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(SimError::InvalidRadius { value: radius });
        }
        Ok(Self {
            pos,
            vel: Vec2::ZERO,
            radius,
            mass: 1.0,
        })
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }
}

/// Explicit circle-collidable interface implemented by every dynamic body.
pub trait Collidable {
    fn body(&self) -> &KinematicBody;
    fn body_mut(&mut self) -> &mut KinematicBody;

    /// Effective radius for static-target overlap tests (pickups may grant
    /// a bonus on top of the physical radius).
    fn pickup_radius(&self) -> f32 {
        self.body().radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_nonpositive_radius() {
        assert!(KinematicBody::new(Vec2::ZERO, 0.0).is_err());
        assert!(KinematicBody::new(Vec2::ZERO, -5.0).is_err());
        assert!(KinematicBody::new(Vec2::ZERO, f32::NAN).is_err());
        assert!(KinematicBody::new(Vec2::ZERO, 8.0).is_ok());
    }

    #[test]
    fn test_default_mass_is_one() {
        let body = KinematicBody::new(Vec2::ZERO, 10.0).unwrap();
        assert_eq!(body.mass, 1.0);
    }

    #[test]
    fn test_arena_inset_and_clamp() {
        let arena = Arena::new(Vec2::ZERO, Vec2::new(100.0, 100.0));
        let inset = arena.inset(10.0);
        assert_eq!(inset.min, Vec2::splat(10.0));
        assert_eq!(inset.max, Vec2::splat(90.0));
        assert_eq!(inset.clamp(Vec2::new(-5.0, 200.0)), Vec2::new(10.0, 90.0));
        assert!(arena.contains(Vec2::new(50.0, 50.0)));
        assert!(!arena.padded(5.0).contains(Vec2::new(120.0, 50.0)));
    }
}
