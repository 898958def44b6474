//! Run state and core simulation types.
//!
//! Everything that must survive a checkpoint or replay deterministically
//! lives here: the racer, the enemy/turret/projectile/pickup collections
//! (stable ids, sorted iteration), timed effect windows and the per-tick
//! event queue consumed by the external audio/achievement layers.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::ability::{AbilityKind, AbilityState, INVULN_MATCH_EPSILON};
use super::ai::{DashState, TurretFsm};
use super::body::{Arena, Collidable, KinematicBody};
use super::stats::{BaseStats, PersistentUpgrades, SessionUpgrades, Weather};
use crate::consts::*;
use crate::{SimError, Tuning, angle_to_dir};

/// Current phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunPhase {
    #[default]
    Running,
    /// Racer reached the finish line
    Finished,
    /// Fatal contact with no shield or invincibility left
    Dead,
}

/// Difficulty tag carried through checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Normal" => Some(Difficulty::Normal),
            "Hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Enemy cruise speed scaling at spawn.
    pub fn enemy_speed_multiplier(&self) -> f32 {
        match self {
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.15,
        }
    }
}

/// Collectible kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    /// Run currency (feeds the in-run shop)
    Currency,
    /// Enemies and projectiles fully stopped for a few seconds
    Freeze,
    /// Enlarged pickup radius plus currency attraction
    Magnet,
    /// One-hit temporary shield
    Shield,
    /// Currency pickups worth double
    DoubleCurrency,
}

impl PickupKind {
    pub fn key(&self) -> &'static str {
        match self {
            PickupKind::Currency => "currency",
            PickupKind::Freeze => "freeze",
            PickupKind::Magnet => "magnet",
            PickupKind::Shield => "shield",
            PickupKind::DoubleCurrency => "double-currency",
        }
    }
}

/// Discrete events raised for the external audio/achievement layers.
/// Fire-and-forget: collected during a tick, drained by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    AbilityActivated(AbilityKind),
    ShieldBroken,
    /// Racer touched an enemy; `fatal` is the resolved outcome
    EnemyContact { fatal: bool },
    /// Racer was hit by a projectile
    ProjectileHit { fatal: bool },
    PickupCollected(PickupKind),
    ProjectileFired,
    /// A dash-attacker began telegraphing
    DashTelegraph,
    TurretCharging,
    CheckpointSaved,
    FinishReached,
    RacerDied,
}

impl GameEvent {
    /// Stable string key for the audio/achievement boundary.
    pub fn key(&self) -> &'static str {
        match self {
            GameEvent::AbilityActivated(_) => "ability-activated",
            GameEvent::ShieldBroken => "shield-broken",
            GameEvent::EnemyContact { .. } => "enemy-contact",
            GameEvent::ProjectileHit { .. } => "projectile-hit",
            GameEvent::PickupCollected(_) => "pickup-collected",
            GameEvent::ProjectileFired => "projectile-fired",
            GameEvent::DashTelegraph => "dash-telegraph",
            GameEvent::TurretCharging => "turret-charging",
            GameEvent::CheckpointSaved => "checkpoint-saved",
            GameEvent::FinishReached => "finish-reached",
            GameEvent::RacerDied => "racer-died",
        }
    }
}

/// Timed power-up effect windows (sim-time deadlines).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffects {
    pub freeze_until: f32,
    pub magnet_until: f32,
    pub double_currency_until: f32,
}

impl ActiveEffects {
    #[inline]
    pub fn freeze_active(&self, now: f32) -> bool {
        now < self.freeze_until
    }

    #[inline]
    pub fn magnet_active(&self, now: f32) -> bool {
        now < self.magnet_until
    }

    #[inline]
    pub fn double_currency_active(&self, now: f32) -> bool {
        now < self.double_currency_until
    }
}

/// The player's pod.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Racer {
    pub body: KinematicBody,
    /// Facing angle (radians). Independent from velocity direction -
    /// rotation input turns the pod, thrust pushes along the facing.
    pub angle: f32,
    pub ability: AbilityState,
    /// Invincibility deadline; covers both the invulnerability ability and
    /// the post-shield-break grace window.
    pub invincible_until: f32,
    /// One-hit shield charges (persistent upgrade + in-run shop)
    pub shield_charges: u32,
    /// Temporary shield power-up deadline
    pub temp_shield_until: f32,
    /// Position history for the renderer (newest last)
    #[serde(skip)]
    pub trail: Vec<Vec2>,
}

impl Racer {
    pub fn new(pos: Vec2, angle: f32, kind: AbilityKind, tuning: &Tuning) -> Result<Self, SimError> {
        Ok(Self {
            body: KinematicBody::new(pos, tuning.racer_radius)?,
            angle,
            ability: AbilityState::from_tuning(kind, tuning)?,
            invincible_until: 0.0,
            shield_charges: 0,
            temp_shield_until: 0.0,
            trail: Vec::with_capacity(TRAIL_LENGTH * 2),
        })
    }

    /// Unit facing direction.
    #[inline]
    pub fn forward(&self) -> Vec2 {
        angle_to_dir(self.angle)
    }

    /// Base motion parameters fed into the stat resolver.
    pub fn base_stats(&self, tuning: &Tuning) -> BaseStats {
        BaseStats {
            max_speed: tuning.racer_max_speed,
            acceleration: tuning.racer_accel,
            ability_cooldown: self.ability.cooldown,
        }
    }

    #[inline]
    pub fn is_invincible(&self, now: f32) -> bool {
        now < self.invincible_until
    }

    #[inline]
    pub fn temp_shield_active(&self, now: f32) -> bool {
        now < self.temp_shield_until
    }

    /// Record the current position, trimming to the intensity-scaled
    /// history length.
    pub fn record_trail(&mut self, intensity: f32) {
        self.trail.push(self.body.pos);
        let limit = ((TRAIL_LENGTH as f32 * intensity) as usize).max(1);
        while self.trail.len() > limit {
            self.trail.remove(0);
        }
    }

    /// Attempt to activate the ability at `now`. No-op while cooling down.
    ///
    /// `effective_cooldown` is the frame's resolved cooldown. The dash
    /// displaces the pod along its facing (clamped to the arena) and kills
    /// its velocity; duration abilities open their active window, and the
    /// invulnerability kind additionally grants its invincibility window.
    pub fn try_activate(
        &mut self,
        now: f32,
        effective_cooldown: f32,
        arena: &Arena,
        tuning: &Tuning,
    ) -> Option<GameEvent> {
        if !self.ability.ready(now, effective_cooldown) {
            return None;
        }
        self.ability.begin(now);

        match self.ability.kind {
            AbilityKind::Dash => {
                let dashed = self.body.pos + self.forward() * tuning.dash_ability_distance;
                self.body.pos = arena.inset(self.body.radius).clamp(dashed);
                self.body.vel = Vec2::ZERO;
            }
            AbilityKind::Invulnerability => {
                self.invincible_until = now + self.ability.active_duration;
            }
            AbilityKind::SpeedBoost | AbilityKind::SlowField => {}
        }

        Some(GameEvent::AbilityActivated(self.ability.kind))
    }

    /// Per-frame expiry check for duration abilities.
    ///
    /// On natural expiry of the invulnerability ability, the invincibility
    /// window is cleared only if it still matches the originally granted
    /// window - a grace window granted meanwhile (shield break) must not
    /// be clobbered.
    pub fn expire_ability(&mut self, now: f32) {
        if !self.ability.expired(now) {
            return;
        }
        self.ability.deactivate();
        if self.ability.kind == AbilityKind::Invulnerability
            && (self.invincible_until - self.ability.granted_window_end()).abs()
                < INVULN_MATCH_EPSILON
        {
            self.invincible_until = 0.0;
        }
    }

    /// Whether the speed-boost ability is currently active (feeds the stat
    /// resolver and trail intensity).
    #[inline]
    pub fn boost_active(&self) -> bool {
        self.ability.kind == AbilityKind::SpeedBoost && self.ability.is_active
    }

    /// Whether the area-slow ability is currently active.
    #[inline]
    pub fn slow_field_active(&self) -> bool {
        self.ability.kind == AbilityKind::SlowField && self.ability.is_active
    }
}

impl Collidable for Racer {
    fn body(&self) -> &KinematicBody {
        &self.body
    }
    fn body_mut(&mut self) -> &mut KinematicBody {
        &mut self.body
    }
}

/// A roaming enemy. With `dash` present it is a dash-attacker; with
/// `homing` it seeks the racer; with neither it cruises and bounces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub body: KinematicBody,
    /// Cruise speed (px/s) after spawn-time scaling
    pub speed: f32,
    pub homing: bool,
    #[serde(default)]
    pub dash: Option<DashState>,
}

impl Enemy {
    #[inline]
    pub fn is_dashing(&self) -> bool {
        self.dash.map(|d| d.is_dashing()).unwrap_or(false)
    }
}

impl Collidable for Enemy {
    fn body(&self) -> &KinematicBody {
        &self.body
    }
    fn body_mut(&mut self) -> &mut KinematicBody {
        &mut self.body
    }
}

/// A stationary charge-and-fire turret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turret {
    pub id: u32,
    pub body: KinematicBody,
    pub fsm: TurretFsm,
}

impl Collidable for Turret {
    fn body(&self) -> &KinematicBody {
        &self.body
    }
    fn body_mut(&mut self) -> &mut KinematicBody {
        &mut self.body
    }
}

/// A turret projectile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    pub body: KinematicBody,
    pub spawned_at: f32,
}

impl Collidable for Projectile {
    fn body(&self) -> &KinematicBody {
        &self.body
    }
    fn body_mut(&mut self) -> &mut KinematicBody {
        &mut self.body
    }
}

/// A static collectible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub id: u32,
    pub kind: PickupKind,
    pub pos: Vec2,
    pub radius: f32,
}

/// The level goal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FinishLine {
    pub pos: Vec2,
    pub radius: f32,
}

/// RNG state wrapper for serialization. A fresh stream is derived per tick
/// so identical seeds and inputs replay identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    /// Advance to the next stream and build its generator.
    pub fn next_rng(&mut self) -> Pcg32 {
        self.stream = self.stream.wrapping_add(1);
        Pcg32::seed_from_u64(self.seed ^ self.stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}

/// Complete run state (deterministic, serializable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng_state: RngState,
    pub level: u32,
    pub difficulty: Difficulty,
    /// Simulation clock (seconds)
    pub time: f32,
    pub phase: RunPhase,
    pub arena: Arena,
    pub weather: Weather,
    /// Persistent lateral wind direction (-1 or 1) when weather is Wind
    pub wind_dir: f32,
    pub racer: Racer,
    /// Sorted by id for deterministic iteration
    pub enemies: Vec<Enemy>,
    pub turrets: Vec<Turret>,
    pub projectiles: Vec<Projectile>,
    pub pickups: Vec<Pickup>,
    pub finish: Option<FinishLine>,
    pub effects: ActiveEffects,
    /// Run currency collected so far
    pub currency: u64,
    pub session: SessionUpgrades,
    pub persistent: PersistentUpgrades,
    pub checkpoints_remaining: u32,
    /// Events raised this tick; drained by the external layers
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl RunState {
    /// Create a fresh run. The racer starts near the top of the arena
    /// facing downfield; weather is drawn for levels past the early ones.
    pub fn new(
        seed: u64,
        level: u32,
        difficulty: Difficulty,
        ability: AbilityKind,
        persistent: PersistentUpgrades,
        tuning: &Tuning,
    ) -> Result<Self, SimError> {
        let arena = Arena::default();
        let start = Vec2::new(arena.center().x, arena.min.y + 100.0);
        let mut racer = Racer::new(start, std::f32::consts::FRAC_PI_2, ability, tuning)?;
        racer.shield_charges = persistent.starting_shield;

        let mut rng_state = RngState::new(seed);
        let mut rng = rng_state.next_rng();
        let weather = if level >= 5 {
            draw_weather(&mut rng)
        } else {
            Weather::Clear
        };
        let wind_dir = if rng.random_bool(0.5) { 1.0 } else { -1.0 };

        Ok(Self {
            seed,
            rng_state,
            level,
            difficulty,
            time: 0.0,
            phase: RunPhase::Running,
            arena,
            weather,
            wind_dir,
            racer,
            enemies: Vec::new(),
            turrets: Vec::new(),
            projectiles: Vec::new(),
            pickups: Vec::new(),
            finish: None,
            effects: ActiveEffects::default(),
            currency: 0,
            session: SessionUpgrades::default(),
            persistent,
            checkpoints_remaining: INITIAL_CHECKPOINT_USES,
            events: Vec::new(),
            next_id: 1,
        })
    }

    /// Allocate a new entity ID.
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Spawn a roaming enemy. Cruise speed is scaled by difficulty and the
    /// shop's speed tradeoff at spawn time; a random initial heading comes
    /// from the run RNG.
    pub fn spawn_enemy(
        &mut self,
        pos: Vec2,
        homing: bool,
        dasher: bool,
        tuning: &Tuning,
    ) -> Result<u32, SimError> {
        let id = self.next_entity_id();
        let mut body = KinematicBody::new(pos, tuning.enemy_radius)?;
        let speed = tuning.enemy_base_speed
            * self.difficulty.enemy_speed_multiplier()
            * self.session.enemy_speed_boost();
        let mut rng = self.rng_state.next_rng();
        body.vel = super::ai::random_dir(&mut rng) * speed;
        let dash = if dasher {
            Some(DashState::new(self.time, tuning, &mut rng))
        } else {
            None
        };
        self.enemies.push(Enemy {
            id,
            body,
            speed,
            // Dash-attackers always home between dashes
            homing: homing || dasher,
            dash,
        });
        Ok(id)
    }

    pub fn spawn_turret(&mut self, pos: Vec2) -> Result<u32, SimError> {
        let id = self.next_entity_id();
        self.turrets.push(Turret {
            id,
            body: KinematicBody::new(pos, TURRET_RADIUS)?,
            fsm: TurretFsm::default(),
        });
        Ok(id)
    }

    pub fn spawn_pickup(&mut self, pos: Vec2, kind: PickupKind) -> u32 {
        let id = self.next_entity_id();
        self.pickups.push(Pickup {
            id,
            kind,
            pos,
            radius: PICKUP_RADIUS,
        });
        id
    }

    pub fn set_finish(&mut self, pos: Vec2) {
        self.finish = Some(FinishLine {
            pos,
            radius: FINISH_RADIUS,
        });
    }

    /// Ensure collections are sorted by ID for deterministic iteration and
    /// pair enumeration.
    pub fn normalize_order(&mut self) {
        self.enemies.sort_by_key(|e| e.id);
        self.turrets.sort_by_key(|t| t.id);
        self.projectiles.sort_by_key(|p| p.id);
        self.pickups.sort_by_key(|p| p.id);
    }

    /// Hand the tick's events to the caller.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Effective pickup radius: physical radius, persistent bonus, magnet
    /// multiplier while active.
    pub fn pickup_radius(&self, tuning: &Tuning) -> f32 {
        let base = self.racer.body.radius + self.persistent.pickup_radius_bonus();
        if self.effects.magnet_active(self.time) {
            base * tuning.magnet_radius_mult
        } else {
            base
        }
    }
}

fn draw_weather(rng: &mut impl Rng) -> Weather {
    // Weighted draw: clear 5, rain 2, wind 2, snow 1
    match rng.random_range(0..10u32) {
        0..=4 => Weather::Clear,
        5 | 6 => Weather::Rain,
        7 | 8 => Weather::Wind,
        _ => Weather::Snow,
    }
}
