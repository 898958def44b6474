//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Variable timestep, clamped per frame
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod ability;
pub mod ai;
pub mod body;
pub mod checkpoint;
pub mod collision;
pub mod physics;
pub mod state;
pub mod stats;
pub mod tick;

pub use ability::{AbilityKind, AbilityState};
pub use ai::{DashPhase, DashState, TurretFsm, TurretPhase};
pub use body::{Arena, Collidable, KinematicBody};
pub use checkpoint::RunCheckpoint;
pub use collision::{circles_overlap, overlap_at, resolve_pair};
pub use state::{
    ActiveEffects, Difficulty, Enemy, FinishLine, GameEvent, Pickup, PickupKind, Projectile, Racer,
    RunPhase, RunState, Turret,
};
pub use stats::{BaseStats, EffectiveStats, PersistentUpgrades, SessionUpgrades, Weather};
pub use tick::{TickInput, tick};
