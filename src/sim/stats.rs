//! Per-frame effective stat resolution.
//!
//! Five independent modifier sources - base stats, persistent
//! (meta-progression) upgrades, session (in-run shop) upgrades, weather,
//! and the active ability - combine into one immutable [`EffectiveStats`]
//! value, recomputed once per actor per frame and never persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Base motion parameters before any modifier is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseStats {
    pub max_speed: f32,
    pub acceleration: f32,
    pub ability_cooldown: f32,
}

/// Weather conditions for the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Weather {
    #[default]
    Clear,
    Rain,
    Snow,
    /// Wind does not touch acceleration; it is applied as a lateral force
    /// by the integrator instead.
    Wind,
}

impl Weather {
    /// Multiplier on acceleration only.
    #[inline]
    pub fn accel_multiplier(&self) -> f32 {
        match self {
            Weather::Clear | Weather::Wind => 1.0,
            Weather::Rain => 0.8,
            Weather::Snow => 0.5,
        }
    }

    /// Wind strength as a fraction of effective max speed.
    pub const WIND_FORCE_FRACTION: f32 = 0.40;
}

/// Persistent meta-progression upgrade levels (survive between runs).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentUpgrades {
    /// +4% max speed per level
    pub speed_boost: u32,
    /// Level >= 1 reduces ability cooldown to 80%
    pub cooldown_reduction: u32,
    /// +5 px pickup radius per level
    pub pickup_radius: u32,
    /// Slow aura around the racer: -7% enemy speed per level within range
    pub slow_aura: u32,
    /// Level >= 1 doubles collected currency
    pub currency_bonus: u32,
    /// Shield charges granted at run start
    pub starting_shield: u32,
}

impl PersistentUpgrades {
    #[inline]
    pub fn speed_multiplier(&self) -> f32 {
        1.0 + self.speed_boost as f32 * 0.04
    }

    #[inline]
    pub fn cooldown_multiplier(&self) -> f32 {
        if self.cooldown_reduction >= 1 { 0.8 } else { 1.0 }
    }

    #[inline]
    pub fn pickup_radius_bonus(&self) -> f32 {
        self.pickup_radius as f32 * 5.0
    }

    /// Slow aura as (speed factor, radius) when any level is bought.
    pub fn slow_aura(&self) -> Option<(f32, f32)> {
        if self.slow_aura == 0 {
            return None;
        }
        let factor = 1.0 - 0.07 * self.slow_aura as f32;
        let radius = 40.0 + self.slow_aura as f32 * 10.0;
        Some((factor.max(0.0), radius))
    }

    #[inline]
    pub fn currency_multiplier(&self) -> u64 {
        if self.currency_bonus >= 1 { 2 } else { 1 }
    }
}

/// Session upgrade levels bought from the in-run shop. Reset each run,
/// carried through checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionUpgrades {
    /// +5% of base max speed per level; enemies also speed up 2% per level
    pub speed: u32,
    /// -5% enemy speed per level
    pub enemy_slow: u32,
    /// Persistent one-hit shield charges
    pub shield: u32,
}

impl SessionUpgrades {
    /// Global enemy speed factor from the enemy-slow upgrade.
    #[inline]
    pub fn enemy_slow_factor(&self) -> f32 {
        (1.0 - self.enemy_slow as f32 * 0.05).max(0.0)
    }

    /// Enemies get faster as the player buys speed - the shop's tradeoff.
    #[inline]
    pub fn enemy_speed_boost(&self) -> f32 {
        1.0 + self.speed as f32 * 0.02
    }

    /// String-keyed map form for checkpoint records.
    pub fn to_map(&self) -> BTreeMap<String, u32> {
        let mut map = BTreeMap::new();
        map.insert("speed".to_string(), self.speed);
        map.insert("enemy_slow".to_string(), self.enemy_slow);
        map.insert("shield".to_string(), self.shield);
        map
    }

    /// Rebuild from a checkpoint map. Missing keys default to zero;
    /// unknown keys are ignored.
    pub fn from_map(map: &BTreeMap<String, u32>) -> Self {
        Self {
            speed: map.get("speed").copied().unwrap_or(0),
            enemy_slow: map.get("enemy_slow").copied().unwrap_or(0),
            shield: map.get("shield").copied().unwrap_or(0),
        }
    }
}

/// Effective motion parameters for one actor, one frame. Ephemeral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveStats {
    pub max_speed: f32,
    pub acceleration: f32,
    pub ability_cooldown: f32,
    /// Render-facing trail intensity (elevated while boosting)
    pub trail_intensity: f32,
}

/// Combine all modifier sources into the frame's effective stats.
///
/// Composition order: base, persistent percentage bonus, session
/// percentage bonus (both speed bonuses are computed against the base),
/// weather multiplier on acceleration only, and finally the speed-boost
/// ability compounding on top of everything when active.
///
/// Pure and side-effect-free; calling it twice with the same inputs yields
/// the same output.
pub fn resolve(
    base: &BaseStats,
    persistent: &PersistentUpgrades,
    session: &SessionUpgrades,
    weather: Weather,
    boost_active: bool,
) -> EffectiveStats {
    let mut max_speed =
        base.max_speed * persistent.speed_multiplier() + base.max_speed * session.speed as f32 * 0.05;
    let mut acceleration = base.acceleration * weather.accel_multiplier();
    let ability_cooldown = base.ability_cooldown * persistent.cooldown_multiplier();
    let mut trail_intensity = 1.0;

    if boost_active {
        max_speed *= 1.5;
        acceleration *= 1.5;
        trail_intensity = 1.5;
    }

    EffectiveStats {
        max_speed,
        acceleration,
        ability_cooldown,
        trail_intensity,
    }
}
