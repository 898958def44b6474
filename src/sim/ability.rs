//! Per-racer ability cooldown and activation state.
//!
//! Each character has one ability: an instantaneous dash or a
//! duration-based effect (speed boost, area slow, invulnerability).
//! Activation is gated by a cooldown measured from the last activation;
//! duration effects are expired by an explicit per-frame check. Transitions
//! are atomic within a frame - there is no cancellation model.

use serde::{Deserialize, Serialize};

use crate::{SimError, Tuning};

/// Sentinel for "never activated" that keeps the record JSON-safe.
pub const NEVER_ACTIVATED: f32 = -1000.0;

/// Tolerance for deciding whether the racer's invincibility window is the
/// one this ability granted. Kept fixed; do not generalize.
pub const INVULN_MATCH_EPSILON: f32 = 0.1;

/// Character ability kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityKind {
    /// Instant forward displacement
    Dash,
    /// Max speed and acceleration x1.5 while active
    SpeedBoost,
    /// Enemies and projectiles at half speed while active
    SlowField,
    /// Timed invincibility window
    Invulnerability,
}

impl AbilityKind {
    pub fn cooldown(&self, tuning: &Tuning) -> f32 {
        match self {
            AbilityKind::Dash => tuning.dash_ability_cooldown,
            AbilityKind::SpeedBoost => tuning.speed_boost_cooldown,
            AbilityKind::SlowField => tuning.slow_field_cooldown,
            AbilityKind::Invulnerability => tuning.invuln_cooldown,
        }
    }

    /// Zero for instantaneous abilities.
    pub fn duration(&self, tuning: &Tuning) -> f32 {
        match self {
            AbilityKind::Dash => 0.0,
            AbilityKind::SpeedBoost => tuning.speed_boost_duration,
            AbilityKind::SlowField => tuning.slow_field_duration,
            AbilityKind::Invulnerability => tuning.invuln_duration,
        }
    }

    /// Stable key for the audio/achievement boundary.
    pub fn key(&self) -> &'static str {
        match self {
            AbilityKind::Dash => "dash",
            AbilityKind::SpeedBoost => "speed-boost",
            AbilityKind::SlowField => "slow-field",
            AbilityKind::Invulnerability => "invulnerability",
        }
    }
}

/// Cooldown/activation state for one racer's ability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbilityState {
    pub kind: AbilityKind,
    /// Base cooldown in seconds; the effective value each frame comes from
    /// the stat resolver (persistent upgrades can shorten it).
    pub cooldown: f32,
    /// Active window length; zero for instantaneous abilities.
    pub active_duration: f32,
    pub last_activation: f32,
    pub is_active: bool,
    pub activation_time: f32,
}

impl AbilityState {
    /// Rejects a non-positive cooldown or a negative duration.
    pub fn new(kind: AbilityKind, cooldown: f32, active_duration: f32) -> Result<Self, SimError> {
        if !(cooldown > 0.0) || !cooldown.is_finite() {
            return Err(SimError::InvalidCooldown { value: cooldown });
        }
        if active_duration < 0.0 || !active_duration.is_finite() {
            return Err(SimError::InvalidDuration {
                value: active_duration,
            });
        }
        Ok(Self {
            kind,
            cooldown,
            active_duration,
            last_activation: NEVER_ACTIVATED,
            is_active: false,
            activation_time: 0.0,
        })
    }

    pub fn from_tuning(kind: AbilityKind, tuning: &Tuning) -> Result<Self, SimError> {
        Self::new(kind, kind.cooldown(tuning), kind.duration(tuning))
    }

    /// Whether the cooldown gate allows activation at `now`.
    /// `effective_cooldown` is the frame's resolved cooldown.
    #[inline]
    pub fn ready(&self, now: f32, effective_cooldown: f32) -> bool {
        now - self.last_activation >= effective_cooldown
    }

    /// Record an activation. Duration abilities become active; instant ones
    /// only stamp the cooldown.
    pub fn begin(&mut self, now: f32) {
        self.last_activation = now;
        if self.active_duration > 0.0 {
            self.is_active = true;
            self.activation_time = now;
        }
        log::debug!("ability {} activated at t={:.2}", self.kind.key(), now);
    }

    /// Whether an active duration effect has run out at `now`.
    #[inline]
    pub fn expired(&self, now: f32) -> bool {
        self.is_active && now - self.activation_time >= self.active_duration
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// End of the invincibility window this activation granted.
    #[inline]
    pub fn granted_window_end(&self) -> f32 {
        self.activation_time + self.active_duration
    }
}
