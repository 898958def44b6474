//! Run checkpoint capture and restore.
//!
//! A checkpoint is a plain structured record of the run-relevant actor and
//! progression state, captured on explicit player action (consuming one
//! use) and consumed exactly once on respawn. The record is JSON-ready;
//! storage and schema beyond that are the external persistence layer's
//! concern. Restore is fail-fast: malformed records are rejected, never
//! guessed at.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ability::AbilityKind;
use super::state::{Difficulty, GameEvent, RunState};
use super::stats::{PersistentUpgrades, SessionUpgrades};
use crate::{SimError, Tuning, normalize_angle};

/// Restorable snapshot of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCheckpoint {
    pub level: u32,
    pub position: (f32, f32),
    /// Facing angle (radians)
    pub angle: f32,
    pub currency: u64,
    /// Session upgrade levels, string-keyed for the persistence boundary
    pub upgrade_levels: BTreeMap<String, u32>,
    pub remaining_uses: u32,
    /// Difficulty tag ("Normal" / "Hard")
    pub difficulty: String,
    /// Last ability activation timestamp, so cooldown state survives the
    /// respawn boundary
    pub last_ability_time: f32,
}

impl RunCheckpoint {
    /// Serialize for the external persistence layer.
    pub fn to_json(&self) -> Result<String, SimError> {
        serde_json::to_string(self).map_err(|_| SimError::MalformedCheckpoint {
            reason: "checkpoint could not be serialized",
        })
    }

    /// Parse and validate a stored record.
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let checkpoint: RunCheckpoint =
            serde_json::from_str(json).map_err(|_| SimError::MalformedCheckpoint {
                reason: "checkpoint record is not valid JSON",
            })?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    /// Reject records the simulation cannot safely resume from.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.level == 0 {
            return Err(SimError::MalformedCheckpoint {
                reason: "level must be at least 1",
            });
        }
        if !self.position.0.is_finite() || !self.position.1.is_finite() {
            return Err(SimError::MalformedCheckpoint {
                reason: "non-finite position",
            });
        }
        if !self.angle.is_finite() {
            return Err(SimError::MalformedCheckpoint {
                reason: "non-finite angle",
            });
        }
        if !self.last_ability_time.is_finite() {
            return Err(SimError::MalformedCheckpoint {
                reason: "non-finite ability timestamp",
            });
        }
        if Difficulty::from_str(&self.difficulty).is_none() {
            return Err(SimError::MalformedCheckpoint {
                reason: "unknown difficulty tag",
            });
        }
        Ok(())
    }
}

impl RunState {
    /// Capture a checkpoint, consuming one use. Returns `None` when no
    /// uses remain.
    pub fn capture_checkpoint(&mut self) -> Option<RunCheckpoint> {
        if self.checkpoints_remaining == 0 {
            return None;
        }
        self.checkpoints_remaining -= 1;
        self.events.push(GameEvent::CheckpointSaved);
        log::debug!(
            "checkpoint captured at level {} ({} uses left)",
            self.level,
            self.checkpoints_remaining
        );
        Some(RunCheckpoint {
            level: self.level,
            position: (self.racer.body.pos.x, self.racer.body.pos.y),
            angle: self.racer.angle,
            currency: self.currency,
            upgrade_levels: self.session.to_map(),
            remaining_uses: self.checkpoints_remaining,
            difficulty: self.difficulty.as_str().to_string(),
            last_ability_time: self.racer.ability.last_activation,
        })
    }

    /// Rebuild a run from a checkpoint after death.
    ///
    /// The racer is reconstructed at the saved pose with the saved upgrade
    /// levels flowing back through the stat resolver each frame, and the
    /// ability cooldown is seeded from the saved timestamp so cooldown
    /// state is continuous across the respawn.
    pub fn restore(
        checkpoint: &RunCheckpoint,
        ability: AbilityKind,
        persistent: PersistentUpgrades,
        seed: u64,
        tuning: &Tuning,
    ) -> Result<RunState, SimError> {
        checkpoint.validate()?;
        let difficulty =
            Difficulty::from_str(&checkpoint.difficulty).ok_or(SimError::MalformedCheckpoint {
                reason: "unknown difficulty tag",
            })?;

        let mut state = RunState::new(
            seed,
            checkpoint.level,
            difficulty,
            ability,
            persistent,
            tuning,
        )?;

        let pos = Vec2::new(checkpoint.position.0, checkpoint.position.1);
        state.racer.body.pos = state.arena.inset(state.racer.body.radius).clamp(pos);
        state.racer.angle = normalize_angle(checkpoint.angle);
        state.currency = checkpoint.currency;
        state.session = SessionUpgrades::from_map(&checkpoint.upgrade_levels);
        state.checkpoints_remaining = checkpoint.remaining_uses;
        state.racer.shield_charges = state
            .session
            .shield
            .max(state.persistent.starting_shield);
        state.racer.ability.last_activation = checkpoint.last_ability_time;

        log::debug!(
            "restored checkpoint: level {}, currency {}, {} uses left",
            state.level,
            state.currency,
            state.checkpoints_remaining
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::RunPhase;

    fn run_with_progress() -> RunState {
        let tuning = Tuning::default();
        let mut state = RunState::new(
            3,
            4,
            Difficulty::Hard,
            AbilityKind::Invulnerability,
            PersistentUpgrades {
                starting_shield: 1,
                ..Default::default()
            },
            &tuning,
        )
        .unwrap();
        state.currency = 57;
        state.session = SessionUpgrades {
            speed: 2,
            enemy_slow: 1,
            shield: 0,
        };
        state.racer.body.pos = Vec2::new(700.0, 450.0);
        state.racer.angle = 1.2;
        state.racer.ability.last_activation = 12.5;
        state
    }

    #[test]
    fn test_capture_consumes_a_use() {
        let mut state = run_with_progress();
        assert_eq!(state.checkpoints_remaining, 3);
        let checkpoint = state.capture_checkpoint().unwrap();
        assert_eq!(state.checkpoints_remaining, 2);
        assert_eq!(checkpoint.remaining_uses, 2);
        assert!(state.drain_events().contains(&GameEvent::CheckpointSaved));
    }

    #[test]
    fn test_capture_refused_when_exhausted() {
        let mut state = run_with_progress();
        state.checkpoints_remaining = 0;
        assert!(state.capture_checkpoint().is_none());
    }

    #[test]
    fn test_round_trip_preserves_run_state() {
        let tuning = Tuning::default();
        let mut state = run_with_progress();
        let checkpoint = state.capture_checkpoint().unwrap();

        let restored = RunState::restore(
            &checkpoint,
            AbilityKind::Invulnerability,
            state.persistent.clone(),
            state.seed,
            &tuning,
        )
        .unwrap();

        assert_eq!(restored.racer.body.pos, state.racer.body.pos);
        assert_eq!(restored.racer.angle, state.racer.angle);
        assert_eq!(restored.currency, state.currency);
        assert_eq!(restored.session, state.session);
        assert_eq!(restored.checkpoints_remaining, state.checkpoints_remaining);
        assert_eq!(restored.level, state.level);
        assert_eq!(restored.difficulty, state.difficulty);
        assert_eq!(restored.phase, RunPhase::Running);
    }

    #[test]
    fn test_restore_seeds_ability_cooldown() {
        let tuning = Tuning::default();
        let mut state = run_with_progress();
        let checkpoint = state.capture_checkpoint().unwrap();

        let restored = RunState::restore(
            &checkpoint,
            AbilityKind::Invulnerability,
            PersistentUpgrades::default(),
            99,
            &tuning,
        )
        .unwrap();

        assert_eq!(restored.racer.ability.last_activation, 12.5);
        // Cooldown state is continuous: right after the saved activation
        // the ability is still gated
        assert!(!restored.racer.ability.ready(13.0, tuning.invuln_cooldown));
    }

    #[test]
    fn test_json_round_trip() {
        let mut state = run_with_progress();
        let checkpoint = state.capture_checkpoint().unwrap();
        let json = checkpoint.to_json().unwrap();
        let parsed = RunCheckpoint::from_json(&json).unwrap();
        assert_eq!(parsed, checkpoint);
    }

    #[test]
    fn test_malformed_records_rejected() {
        let mut state = run_with_progress();
        let good = state.capture_checkpoint().unwrap();

        let mut bad = good.clone();
        bad.position.0 = f32::NAN;
        assert!(bad.validate().is_err());

        let mut bad = good.clone();
        bad.difficulty = "Nightmare".to_string();
        assert!(RunState::restore(
            &bad,
            AbilityKind::Dash,
            PersistentUpgrades::default(),
            1,
            &Tuning::default()
        )
        .is_err());

        let mut bad = good.clone();
        bad.level = 0;
        assert!(bad.validate().is_err());

        assert!(RunCheckpoint::from_json("{not json").is_err());
    }

    #[test]
    fn test_restore_ignores_unknown_upgrade_keys() {
        let mut state = run_with_progress();
        let mut checkpoint = state.capture_checkpoint().unwrap();
        checkpoint
            .upgrade_levels
            .insert("ancient_relic".to_string(), 9);
        let restored = RunState::restore(
            &checkpoint,
            AbilityKind::Dash,
            PersistentUpgrades::default(),
            1,
            &Tuning::default(),
        )
        .unwrap();
        assert_eq!(restored.session.speed, 2);
    }
}
