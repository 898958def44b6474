//! Drift Arena - top-down arena racer simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, collisions, AI, game state)
//! - `tuning`: Data-driven game balance
//! - `error`: Construction/validation failures
//!
//! Rendering, audio playback, input-device mapping and persistent storage
//! are external collaborators: the sim exposes positions/angles/visual
//! state for a renderer, consumes an abstract action set, emits
//! fire-and-forget event keys for audio/achievements, and hands out plain
//! serializable checkpoint records.

pub mod error;
pub mod sim;
pub mod tuning;

pub use error::SimError;
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Nominal simulation rate the friction constant is calibrated against
    pub const NOMINAL_HZ: f32 = 60.0;
    /// Upper bound on a single integration step (bounds error during hitches)
    pub const MAX_DT: f32 = 0.05;

    /// Arena bounds (track rectangle)
    pub const ARENA_MIN_X: f32 = 50.0;
    pub const ARENA_MIN_Y: f32 = 50.0;
    pub const ARENA_MAX_X: f32 = 1870.0;
    pub const ARENA_MAX_Y: f32 = 1030.0;
    /// Projectiles survive this far outside the arena before despawning
    pub const ARENA_PADDING: f32 = 50.0;

    /// Racer defaults
    pub const RACER_MAX_SPEED: f32 = 216.0;
    pub const RACER_ACCEL: f32 = 7200.0;
    /// Per-nominal-frame velocity retention (raised to 60*dt per step)
    pub const RACER_FRICTION: f32 = 0.955;
    /// Rotation speed (radians/sec, ~270 deg/s)
    pub const RACER_ROT_SPEED: f32 = 4.712_389;
    pub const RACER_RADIUS: f32 = 28.0;
    /// Wall bounce damping - the racer loses most of its speed on contact
    pub const RACER_BOUNCE_DAMPING: f32 = 0.3;

    /// Enemy defaults
    pub const ENEMY_RADIUS: f32 = 26.0;
    pub const ENEMY_BASE_SPEED: f32 = 180.0;
    /// Wall bounce damping - enemies rebound near-elastically
    pub const ENEMY_BOUNCE_DAMPING: f32 = 0.95;
    /// Restitution for enemy-enemy impulses
    pub const ENEMY_RESTITUTION: f32 = 0.7;
    /// Steering filter gain for homing enemies
    pub const HOMING_GAIN: f32 = 0.05;

    /// Turret defaults
    pub const TURRET_RADIUS: f32 = 30.0;
    pub const TURRET_SHOT_INTERVAL: f32 = 1.0;
    pub const TURRET_CHARGE_TIME: f32 = 0.3;
    pub const PROJECTILE_SPEED: f32 = 312.0;
    pub const PROJECTILE_LEAD_TIME: f32 = 0.5;
    pub const PROJECTILE_LIFETIME: f32 = 5.0;
    pub const PROJECTILE_RADIUS: f32 = 5.0;

    /// Dash-attacker behavior
    pub const DASH_DECISION_MIN: f32 = 3.0;
    pub const DASH_DECISION_MAX: f32 = 6.0;
    pub const DASH_TRIGGER_RANGE: f32 = 300.0;
    pub const DASH_PREP_TIME: f32 = 0.4;
    pub const DASH_DURATION: f32 = 0.5;
    pub const DASH_SPEED_MULT: f32 = 3.0;

    /// Collectible defaults
    pub const PICKUP_RADIUS: f32 = 18.0;
    pub const FINISH_RADIUS: f32 = 45.0;

    /// Racer trail history (render-facing)
    pub const TRAIL_LENGTH: usize = 20;

    /// Checkpoint uses a fresh run starts with
    pub const INITIAL_CHECKPOINT_USES: u32 = 3;
}

/// Normalize an angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit vector for a facing angle (radians, counter-clockwise from +X)
#[inline]
pub fn angle_to_dir(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-5);
        assert!((normalize_angle(-3.0 * PI) - (-PI)).abs() < 1e-5);
        assert!((normalize_angle(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_angle_to_dir_is_unit() {
        for i in 0..8 {
            let dir = angle_to_dir(i as f32 * PI / 4.0);
            assert!((dir.length() - 1.0).abs() < 1e-5);
        }
    }
}
