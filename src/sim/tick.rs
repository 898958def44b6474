//! Per-frame simulation update.
//!
//! One synchronous, fixed-phase pass: ability expiry -> modifier and stat
//! resolution -> racer drive -> enemy steering -> enemy pair collisions ->
//! integration and boundaries -> turrets and projectiles -> contact
//! outcomes -> pickups and finish. `dt` is variable but clamped so frame
//! hitches cannot blow up the integration.
//!
//! Enemy pair collisions are enumerated as explicit unordered pairs over
//! the id-sorted collection. Resolution order for 3+ body clusters is
//! therefore deterministic but order-dependent; outcomes are not
//! symmetric and tests must not assume they are.

use glam::Vec2;

use super::ai::{self, DashStep};
use super::body::Collidable;
use super::collision::{circles_overlap, overlap_at, resolve_pair};
use super::physics::{integrate, integrate_drive, resolve_boundary};
use super::state::{GameEvent, PickupKind, Projectile, RunPhase, RunState};
use super::stats::{self, Weather};
use crate::consts::{ARENA_PADDING, MAX_DT};
use crate::{Tuning, normalize_angle};

/// Input commands for a single tick. Device mapping is external; this is
/// the abstract set of currently-asserted actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    pub rotate_left: bool,
    pub rotate_right: bool,
    pub accelerate: bool,
    pub decelerate: bool,
    pub activate_ability: bool,
}

/// A speed modifier at or below this is treated as a full freeze.
const FROZEN_EPSILON: f32 = 0.01;
/// Enemy/projectile speed factor while the area-slow ability is active.
const SLOW_FIELD_FACTOR: f32 = 0.5;

/// Advance the run by one frame.
pub fn tick(state: &mut RunState, input: &TickInput, dt: f32, tuning: &Tuning) {
    if dt <= 0.0 || state.phase != RunPhase::Running {
        return;
    }
    let dt = dt.min(MAX_DT);

    state.time += dt;
    let now = state.time;
    let mut rng = state.rng_state.next_rng();
    state.normalize_order();

    // Duration-ability expiry happens before stats are resolved so the
    // frame already sees the post-expiry values
    state.racer.expire_ability(now);

    // Modifier pipeline: freeze overrides the slow field, the shop's
    // enemy-slow upgrade stacks multiplicatively on top
    let frozen = state.effects.freeze_active(now);
    let base_modifier = if frozen {
        0.0
    } else if state.racer.slow_field_active() {
        SLOW_FIELD_FACTOR
    } else {
        1.0
    };
    let enemy_modifier = base_modifier * state.session.enemy_slow_factor();
    let aura = state.persistent.slow_aura();

    let effective = stats::resolve(
        &state.racer.base_stats(tuning),
        &state.persistent,
        &state.session,
        state.weather,
        state.racer.boost_active(),
    );

    // --- Racer drive ---
    let mut rotation = 0.0;
    if input.rotate_left {
        rotation += tuning.racer_rot_speed * dt;
    }
    if input.rotate_right {
        rotation -= tuning.racer_rot_speed * dt;
    }
    state.racer.angle = normalize_angle(state.racer.angle + rotation);

    if input.activate_ability {
        let arena = state.arena;
        if let Some(event) =
            state
                .racer
                .try_activate(now, effective.ability_cooldown, &arena, tuning)
        {
            state.events.push(event);
        }
    }

    let wind = if state.weather == Weather::Wind {
        Vec2::new(
            effective.max_speed * Weather::WIND_FORCE_FRACTION * state.wind_dir,
            0.0,
        )
    } else {
        Vec2::ZERO
    };

    let forward = state.racer.forward();
    integrate_drive(
        &mut state.racer.body,
        forward,
        input.accelerate,
        input.decelerate,
        effective.acceleration,
        effective.max_speed,
        tuning.racer_friction,
        wind,
        dt,
    );
    resolve_boundary(&mut state.racer.body, &state.arena, tuning.racer_bounce_damping);
    state.racer.record_trail(effective.trail_intensity);

    // --- Enemy steering ---
    let racer_pos = state.racer.body.pos;
    for enemy in state.enemies.iter_mut() {
        let mut modifier = enemy_modifier;
        if let Some((factor, radius)) = aura {
            if enemy.body.pos.distance_squared(racer_pos) <= radius * radius {
                modifier *= factor;
            }
        }

        if modifier <= FROZEN_EPSILON {
            // Frozen: interrupt any dash and hold still this frame
            if let Some(dash) = enemy.dash.as_mut() {
                dash.reset(&mut enemy.body);
            }
            continue;
        }

        let cruise = enemy.speed * modifier;
        if let Some(dash) = enemy.dash.as_mut() {
            let step = dash.update(
                &mut enemy.body,
                racer_pos,
                cruise,
                enemy.speed,
                now,
                dt,
                &state.arena,
                tuning,
                &mut rng,
            );
            if step == DashStep::Telegraph {
                state.events.push(GameEvent::DashTelegraph);
            }
        } else if enemy.homing {
            ai::steer_toward(
                &mut enemy.body,
                racer_pos,
                cruise,
                tuning.homing_gain,
                dt,
                &mut rng,
            );
        } else {
            ai::hold_speed(&mut enemy.body, cruise, &mut rng);
        }
    }

    // --- Enemy pair collisions (unordered pairs, id order) ---
    if !frozen {
        for i in 0..state.enemies.len() {
            if state.enemies[i].is_dashing() {
                continue;
            }
            let (left, right) = state.enemies.split_at_mut(i + 1);
            let a = &mut left[i];
            for b in right.iter_mut() {
                if b.is_dashing() {
                    continue;
                }
                resolve_pair(&mut a.body, &mut b.body, tuning.enemy_restitution);
            }
        }
    }

    // --- Enemy integration and boundaries ---
    for enemy in state.enemies.iter_mut() {
        if enemy.is_dashing() || frozen {
            // Dashes integrate themselves; frozen enemies hold position
            continue;
        }
        integrate(&mut enemy.body, dt);
        resolve_boundary(&mut enemy.body, &state.arena, tuning.enemy_bounce_damping);
    }

    // --- Turrets ---
    let target = if frozen {
        None
    } else {
        Some((state.racer.body.pos, state.racer.body.vel))
    };
    let mut fired: Vec<(Vec2, Vec2)> = Vec::new();
    for turret in state.turrets.iter_mut() {
        let was_idle = turret.fsm.phase == ai::TurretPhase::Idle;
        let spawn = turret.body.pos;
        if let Some(vel) = turret.fsm.update(spawn, target, now, tuning, &mut rng) {
            fired.push((spawn, vel));
        } else if was_idle && turret.fsm.phase == ai::TurretPhase::Charging {
            state.events.push(GameEvent::TurretCharging);
        }
    }
    for (pos, vel) in fired {
        let id = state.next_entity_id();
        let Ok(mut body) = super::body::KinematicBody::new(pos, crate::consts::PROJECTILE_RADIUS)
        else {
            continue;
        };
        body.vel = vel;
        state.projectiles.push(Projectile {
            id,
            body,
            spawned_at: now,
        });
        state.events.push(GameEvent::ProjectileFired);
    }

    // --- Projectiles ---
    let projectile_modifier = if frozen { 0.0 } else { 1.0 };
    let padded = state.arena.padded(ARENA_PADDING);
    for projectile in state.projectiles.iter_mut() {
        projectile.body.pos += projectile.body.vel * projectile_modifier * dt;
    }
    state
        .projectiles
        .retain(|p| padded.contains(p.body.pos) && now - p.spawned_at <= tuning.projectile_lifetime);

    // --- Contact outcomes ---
    resolve_racer_contacts(state, now, tuning);

    // --- Pickups ---
    update_pickups(state, now, dt, tuning);

    // --- Finish line ---
    if state.phase == RunPhase::Running {
        if let Some(finish) = state.finish {
            if overlap_at(
                state.racer.body.pos,
                state.racer.body.radius,
                finish.pos,
                finish.radius,
            ) {
                state.events.push(GameEvent::FinishReached);
                state.phase = RunPhase::Finished;
            }
        }
    }
}

/// Shield layering for a fatal-class contact: temporary shield first, then
/// a persistent charge, otherwise the run ends. Either shield break grants
/// a grace invincibility window.
///
/// Returns whether the contact was fatal.
fn absorb_hit(state: &mut RunState, now: f32, tuning: &Tuning) -> bool {
    if state.racer.temp_shield_active(now) {
        state.racer.temp_shield_until = 0.0;
        state.racer.invincible_until = now + tuning.shield_break_grace;
        state.events.push(GameEvent::ShieldBroken);
        false
    } else if state.racer.shield_charges > 0 {
        state.racer.shield_charges -= 1;
        state.racer.invincible_until = now + tuning.shield_break_grace;
        state.events.push(GameEvent::ShieldBroken);
        false
    } else {
        true
    }
}

fn resolve_racer_contacts(state: &mut RunState, now: f32, tuning: &Tuning) {
    // Enemies and turrets are both lethal contact surfaces
    let enemy_hit = {
        let racer = &state.racer;
        !racer.is_invincible(now)
            && (state
                .enemies
                .iter()
                .any(|e| circles_overlap(racer.body(), e.body()))
                || state
                    .turrets
                    .iter()
                    .any(|t| circles_overlap(racer.body(), t.body())))
    };
    if enemy_hit {
        let fatal = absorb_hit(state, now, tuning);
        state.events.push(GameEvent::EnemyContact { fatal });
        if fatal {
            state.events.push(GameEvent::RacerDied);
            state.phase = RunPhase::Dead;
            log::debug!("racer died on enemy contact at t={:.2}", now);
            return;
        }
    }

    // Projectiles are removed on impact whatever the shield outcome
    let mut hit_index = None;
    if !state.racer.is_invincible(now) {
        hit_index = state
            .projectiles
            .iter()
            .position(|p| circles_overlap(state.racer.body(), p.body()));
    }
    if let Some(index) = hit_index {
        state.projectiles.remove(index);
        let fatal = absorb_hit(state, now, tuning);
        state.events.push(GameEvent::ProjectileHit { fatal });
        if fatal {
            state.events.push(GameEvent::RacerDied);
            state.phase = RunPhase::Dead;
            log::debug!("racer died to projectile at t={:.2}", now);
        }
    }
}

fn update_pickups(state: &mut RunState, now: f32, dt: f32, tuning: &Tuning) {
    let racer_pos = state.racer.body.pos;
    let reach = state.pickup_radius(tuning);

    // Magnet attraction: currency inside the reach drifts toward the racer
    if state.effects.magnet_active(now) {
        for pickup in state.pickups.iter_mut() {
            if pickup.kind != PickupKind::Currency {
                continue;
            }
            let delta = racer_pos - pickup.pos;
            let dist = delta.length();
            if dist > 1.0 && dist < tuning.magnet_pull_range {
                let step = (tuning.magnet_pull_speed * dt).min(dist);
                pickup.pos += delta / dist * step;
            }
        }
    }

    let mut collected: Vec<PickupKind> = Vec::new();
    state.pickups.retain(|pickup| {
        if overlap_at(racer_pos, reach, pickup.pos, pickup.radius) {
            collected.push(pickup.kind);
            false
        } else {
            true
        }
    });

    for kind in collected {
        match kind {
            PickupKind::Currency => {
                let mut gain = state.persistent.currency_multiplier();
                if state.effects.double_currency_active(now) {
                    gain *= 2;
                }
                state.currency += gain;
            }
            PickupKind::Freeze => {
                state.effects.freeze_until = now + tuning.freeze_duration;
            }
            PickupKind::Magnet => {
                state.effects.magnet_until = now + tuning.magnet_duration;
            }
            PickupKind::Shield => {
                state.racer.temp_shield_until = now + tuning.shield_powerup_duration;
            }
            PickupKind::DoubleCurrency => {
                state.effects.double_currency_until = now + tuning.double_currency_duration;
            }
        }
        state.events.push(GameEvent::PickupCollected(kind));
    }
}
