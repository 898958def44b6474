//! Runtime-tunable game balance.
//!
//! [`Tuning`] mirrors the compile-time defaults in [`crate::consts`]. A
//! partial JSON document can override just the values being balanced;
//! missing keys fall back to the defaults, so `src/lib.rs` stays the
//! authoritative source. Loaded values are validated before use.

use serde::{Deserialize, Serialize};

use crate::SimError;
use crate::consts::*;

/// Runtime-tunable physics and gameplay balance values.
///
/// All fields default to the corresponding constant in `crate::consts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // Racer drive
    pub racer_max_speed: f32,
    pub racer_accel: f32,
    pub racer_friction: f32,
    pub racer_rot_speed: f32,
    pub racer_radius: f32,
    pub racer_bounce_damping: f32,

    // Enemies
    pub enemy_radius: f32,
    pub enemy_base_speed: f32,
    pub enemy_bounce_damping: f32,
    pub enemy_restitution: f32,
    pub homing_gain: f32,

    // Dash-attacker behavior
    pub dash_decision_min: f32,
    pub dash_decision_max: f32,
    pub dash_trigger_range: f32,
    pub dash_prep_time: f32,
    pub dash_duration: f32,
    pub dash_speed_mult: f32,

    // Turrets and projectiles
    pub turret_shot_interval: f32,
    pub turret_charge_time: f32,
    pub projectile_speed: f32,
    pub projectile_lead_time: f32,
    pub projectile_lifetime: f32,

    // Abilities
    pub dash_ability_distance: f32,
    pub dash_ability_cooldown: f32,
    pub speed_boost_cooldown: f32,
    pub speed_boost_duration: f32,
    pub slow_field_cooldown: f32,
    pub slow_field_duration: f32,
    pub invuln_cooldown: f32,
    pub invuln_duration: f32,

    // Power-up effects
    pub freeze_duration: f32,
    pub magnet_duration: f32,
    pub magnet_radius_mult: f32,
    pub magnet_pull_speed: f32,
    /// Currency within this distance drifts toward the racer while a
    /// magnet is active
    pub magnet_pull_range: f32,
    pub shield_powerup_duration: f32,
    pub double_currency_duration: f32,
    /// Grace invincibility after a shield absorbs a hit
    pub shield_break_grace: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            racer_max_speed: RACER_MAX_SPEED,
            racer_accel: RACER_ACCEL,
            racer_friction: RACER_FRICTION,
            racer_rot_speed: RACER_ROT_SPEED,
            racer_radius: RACER_RADIUS,
            racer_bounce_damping: RACER_BOUNCE_DAMPING,

            enemy_radius: ENEMY_RADIUS,
            enemy_base_speed: ENEMY_BASE_SPEED,
            enemy_bounce_damping: ENEMY_BOUNCE_DAMPING,
            enemy_restitution: ENEMY_RESTITUTION,
            homing_gain: HOMING_GAIN,

            dash_decision_min: DASH_DECISION_MIN,
            dash_decision_max: DASH_DECISION_MAX,
            dash_trigger_range: DASH_TRIGGER_RANGE,
            dash_prep_time: DASH_PREP_TIME,
            dash_duration: DASH_DURATION,
            dash_speed_mult: DASH_SPEED_MULT,

            turret_shot_interval: TURRET_SHOT_INTERVAL,
            turret_charge_time: TURRET_CHARGE_TIME,
            projectile_speed: PROJECTILE_SPEED,
            projectile_lead_time: PROJECTILE_LEAD_TIME,
            projectile_lifetime: PROJECTILE_LIFETIME,

            dash_ability_distance: 100.0,
            dash_ability_cooldown: 6.0,
            speed_boost_cooldown: 30.0,
            speed_boost_duration: 5.0,
            slow_field_cooldown: 30.0,
            slow_field_duration: 5.0,
            invuln_cooldown: 45.0,
            invuln_duration: 5.0,

            freeze_duration: 2.0,
            magnet_duration: 3.0,
            magnet_radius_mult: 1.35,
            magnet_pull_speed: 250.0,
            magnet_pull_range: 150.0,
            shield_powerup_duration: 10.0,
            double_currency_duration: 6.0,
            shield_break_grace: 1.5,
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) JSON document and validate the result.
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let tuning: Tuning =
            serde_json::from_str(json).map_err(|_| SimError::MalformedTuning {
                reason: "tuning document is not valid JSON",
            })?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reject values that would corrupt the simulation.
    pub fn validate(&self) -> Result<(), SimError> {
        let positive: &[(&'static str, f32)] = &[
            ("racer_max_speed", self.racer_max_speed),
            ("racer_accel", self.racer_accel),
            ("racer_radius", self.racer_radius),
            ("enemy_radius", self.enemy_radius),
            ("enemy_base_speed", self.enemy_base_speed),
            ("dash_prep_time", self.dash_prep_time),
            ("dash_duration", self.dash_duration),
            ("turret_shot_interval", self.turret_shot_interval),
            ("turret_charge_time", self.turret_charge_time),
            ("projectile_speed", self.projectile_speed),
            ("projectile_lifetime", self.projectile_lifetime),
            ("dash_ability_cooldown", self.dash_ability_cooldown),
            ("speed_boost_cooldown", self.speed_boost_cooldown),
            ("slow_field_cooldown", self.slow_field_cooldown),
            ("invuln_cooldown", self.invuln_cooldown),
        ];
        for &(name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(SimError::InvalidTuning { name, value });
            }
        }
        if !(0.0..1.0).contains(&self.racer_friction) {
            return Err(SimError::InvalidTuning {
                name: "racer_friction",
                value: self.racer_friction,
            });
        }
        if self.dash_decision_max < self.dash_decision_min {
            return Err(SimError::InvalidTuning {
                name: "dash_decision_max",
                value: self.dash_decision_max,
            });
        }
        Ok(())
    }
}
