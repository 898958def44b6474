//! Enemy steering and behavior state machines.
//!
//! Three behaviors live here: the exponential seek filter shared by homing
//! enemies, the dash-attacker state machine (NORMAL -> PREP -> DASH), and
//! the turret charge-and-fire cycle with target-lead aiming. All random
//! fallbacks draw from the caller's seeded RNG so replays stay
//! deterministic.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::body::{Arena, KinematicBody};
use crate::Tuning;
use crate::consts::NOMINAL_HZ;

/// Commanded-speed deviation (squared) above which velocity is rescaled
/// back to the commanded magnitude.
const SPEED_SNAP_SQ: f32 = 1.0;
/// Squared speed below which a body counts as stopped.
const STOPPED_SQ: f32 = 0.01;
/// Squared distance below which a homing/dash target is degenerate.
const NEAR_TARGET_SQ: f32 = 1.0;

/// A uniformly random unit direction.
pub fn random_dir(rng: &mut impl Rng) -> Vec2 {
    let angle = rng.random_range(0.0..std::f32::consts::TAU);
    Vec2::new(angle.cos(), angle.sin())
}

/// Blend velocity toward `target_speed * dir(target)` with an exponential
/// steering filter, then re-discipline the magnitude.
///
/// The filter gain is scaled by `60 * dt` and clamped to 1, so homing
/// strength is frame-rate independent. Afterwards [`hold_speed`] corrects
/// the magnitude drift collisions introduce while keeping the blended
/// direction.
pub fn steer_toward(
    body: &mut KinematicBody,
    target: Vec2,
    target_speed: f32,
    gain: f32,
    dt: f32,
    rng: &mut impl Rng,
) {
    let delta = target - body.pos;
    if delta.length_squared() > NEAR_TARGET_SQ {
        let dir = delta / delta.length();
        let desired = dir * target_speed;
        let lerp = (gain * NOMINAL_HZ * dt).min(1.0);
        body.vel = body.vel * (1.0 - lerp) + desired * lerp;
    }
    hold_speed(body, target_speed, rng);
}

/// Keep a cruising body at its commanded speed.
///
/// A stopped body with a nonzero commanded speed is kicked off in a random
/// direction; a body whose speed has drifted is rescaled along its current
/// direction.
pub fn hold_speed(body: &mut KinematicBody, target_speed: f32, rng: &mut impl Rng) {
    let speed_sq = body.vel.length_squared();
    let target_sq = target_speed * target_speed;

    if speed_sq < STOPPED_SQ && target_sq > STOPPED_SQ {
        body.vel = random_dir(rng) * target_speed;
    } else if speed_sq > STOPPED_SQ && (speed_sq - target_sq).abs() > SPEED_SNAP_SQ {
        body.vel *= (target_sq / speed_sq).sqrt();
    }
}

/// Dash-attacker phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DashPhase {
    #[default]
    Normal,
    /// Stopped and telegraphing; the flashing cue is externally driven by
    /// `phase_timer`.
    Prep,
    Dash,
}

/// Dash-attacker state machine.
///
/// In `Normal` the attacker seeks its target like any homing enemy. A
/// randomized decision timer periodically checks whether the target is in
/// trigger range; if so the attacker stops, snapshots the target position,
/// telegraphs, then launches along the snapshot at a speed multiple.
/// Boundary contact terminates a dash early.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DashState {
    pub phase: DashPhase,
    pub phase_timer: f32,
    pub next_decision: f32,
    /// Target position captured when entering `Prep`.
    pub target: Vec2,
}

/// What a dash-attacker step did, for the event/audio boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashStep {
    None,
    /// Entered `Prep` this frame (telegraph cue).
    Telegraph,
    /// Launched the dash this frame.
    Launched,
}

impl DashState {
    pub fn new(now: f32, tuning: &Tuning, rng: &mut impl Rng) -> Self {
        Self {
            phase: DashPhase::Normal,
            phase_timer: 0.0,
            next_decision: now + rng.random_range(tuning.dash_decision_min..=tuning.dash_decision_max),
            target: Vec2::ZERO,
        }
    }

    #[inline]
    pub fn is_dashing(&self) -> bool {
        self.phase == DashPhase::Dash
    }

    /// Force back to `Normal` and clear timers (external freeze).
    pub fn reset(&mut self, body: &mut KinematicBody) {
        self.phase = DashPhase::Normal;
        self.phase_timer = 0.0;
        body.vel = Vec2::ZERO;
    }

    /// Advance the state machine one frame.
    ///
    /// `cruise_speed` is the modifier-adjusted seek speed for `Normal`;
    /// `base_speed` is the unmodified speed the dash multiple applies to.
    /// The dash itself integrates position directly and handles its own
    /// boundary contact; in other phases the caller integrates as usual.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        body: &mut KinematicBody,
        target_pos: Vec2,
        cruise_speed: f32,
        base_speed: f32,
        now: f32,
        dt: f32,
        arena: &Arena,
        tuning: &Tuning,
        rng: &mut impl Rng,
    ) -> DashStep {
        match self.phase {
            DashPhase::Normal => {
                if now >= self.next_decision {
                    self.next_decision =
                        now + rng.random_range(tuning.dash_decision_min..=tuning.dash_decision_max);
                    let range_sq = tuning.dash_trigger_range * tuning.dash_trigger_range;
                    if body.pos.distance_squared(target_pos) < range_sq {
                        self.phase = DashPhase::Prep;
                        self.phase_timer = 0.0;
                        self.target = target_pos;
                        body.vel = Vec2::ZERO;
                        log::debug!("dash-attacker telegraphing at t={:.2}", now);
                        return DashStep::Telegraph;
                    }
                }
                // Plain homing while no dash is pending
                steer_toward(body, target_pos, cruise_speed, tuning.homing_gain, dt, rng);
                DashStep::None
            }

            DashPhase::Prep => {
                self.phase_timer += dt;
                // Velocity held at exactly zero for the whole telegraph
                body.vel = Vec2::ZERO;
                if self.phase_timer >= tuning.dash_prep_time {
                    let delta = self.target - body.pos;
                    if delta.length_squared() <= NEAR_TARGET_SQ {
                        // Already on top of the snapshot; nothing to dash at
                        self.phase = DashPhase::Normal;
                        self.phase_timer = 0.0;
                        return DashStep::None;
                    }
                    let dir = delta / delta.length();
                    body.vel = dir * base_speed * tuning.dash_speed_mult;
                    self.phase = DashPhase::Dash;
                    self.phase_timer = 0.0;
                    log::debug!("dash-attacker launched at t={:.2}", now);
                    return DashStep::Launched;
                }
                DashStep::None
            }

            DashPhase::Dash => {
                self.phase_timer += dt;
                body.pos += body.vel * dt;

                // Boundary contact zeroes the touched component and ends
                // the dash immediately
                let bounds = arena.inset(body.radius);
                let mut hit = false;
                if body.pos.x < bounds.min.x {
                    body.pos.x = bounds.min.x;
                    body.vel.x = 0.0;
                    hit = true;
                } else if body.pos.x > bounds.max.x {
                    body.pos.x = bounds.max.x;
                    body.vel.x = 0.0;
                    hit = true;
                }
                if body.pos.y < bounds.min.y {
                    body.pos.y = bounds.min.y;
                    body.vel.y = 0.0;
                    hit = true;
                } else if body.pos.y > bounds.max.y {
                    body.pos.y = bounds.max.y;
                    body.vel.y = 0.0;
                    hit = true;
                }

                if hit || self.phase_timer >= tuning.dash_duration {
                    self.phase = DashPhase::Normal;
                    self.phase_timer = 0.0;
                }
                DashStep::None
            }
        }
    }
}

/// Turret phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TurretPhase {
    #[default]
    Idle,
    Charging,
}

/// Charge-and-fire cycle for a stationary turret.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurretFsm {
    pub phase: TurretPhase,
    pub charge_start: f32,
    pub last_fire: f32,
}

impl Default for TurretFsm {
    fn default() -> Self {
        Self {
            phase: TurretPhase::Idle,
            charge_start: 0.0,
            last_fire: 0.0,
        }
    }
}

impl TurretFsm {
    /// Advance the cycle. `target` is the tracked position and velocity;
    /// `None` (freeze / no valid target) suspends the cycle entirely.
    /// Returns the velocity of a projectile fired this frame, if any.
    pub fn update(
        &mut self,
        spawn: Vec2,
        target: Option<(Vec2, Vec2)>,
        now: f32,
        tuning: &Tuning,
        rng: &mut impl Rng,
    ) -> Option<Vec2> {
        let Some((target_pos, target_vel)) = target else {
            return None;
        };

        match self.phase {
            TurretPhase::Idle => {
                if now - self.last_fire >= tuning.turret_shot_interval {
                    self.phase = TurretPhase::Charging;
                    self.charge_start = now;
                    log::debug!("turret charging at t={:.2}", now);
                }
                None
            }
            TurretPhase::Charging => {
                if now - self.charge_start >= tuning.turret_charge_time {
                    self.last_fire = now;
                    self.phase = TurretPhase::Idle;
                    Some(aim_with_lead(
                        spawn,
                        target_pos,
                        target_vel,
                        tuning.projectile_lead_time,
                        tuning.projectile_speed,
                        rng,
                    ))
                } else {
                    None
                }
            }
        }
    }

    /// Telegraph progress in [0, 1] for the render boundary.
    pub fn charge_progress(&self, now: f32, tuning: &Tuning) -> f32 {
        match self.phase {
            TurretPhase::Idle => 0.0,
            TurretPhase::Charging => {
                ((now - self.charge_start) / tuning.turret_charge_time).clamp(0.0, 1.0)
            }
        }
    }
}

/// Projectile velocity toward the target's predicted position.
///
/// `predicted = target_pos + target_vel * lead_time`; a random direction is
/// chosen when the prediction coincides with the spawn point.
pub fn aim_with_lead(
    spawn: Vec2,
    target_pos: Vec2,
    target_vel: Vec2,
    lead_time: f32,
    speed: f32,
    rng: &mut impl Rng,
) -> Vec2 {
    let predicted = target_pos + target_vel * lead_time;
    let delta = predicted - spawn;
    let dist = delta.length();
    if dist > 0.0 {
        delta / dist * speed
    } else {
        random_dir(rng) * speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(7)
    }

    fn body_at(pos: Vec2, vel: Vec2) -> KinematicBody {
        let mut body = KinematicBody::new(pos, 26.0).unwrap();
        body.vel = vel;
        body
    }

    #[test]
    fn test_steer_blends_toward_target() {
        let mut rng = rng();
        let mut body = body_at(Vec2::ZERO, Vec2::new(0.0, 100.0));
        let target = Vec2::new(500.0, 0.0);
        for _ in 0..240 {
            steer_toward(&mut body, target, 100.0, 0.05, 1.0 / 60.0, &mut rng);
        }
        // Converged onto the +x heading at the commanded speed
        assert!(body.vel.x > 90.0);
        assert!((body.speed() - 100.0).abs() < 1.5);
    }

    #[test]
    fn test_hold_speed_kicks_stopped_body() {
        let mut rng = rng();
        let mut body = body_at(Vec2::ZERO, Vec2::ZERO);
        hold_speed(&mut body, 120.0, &mut rng);
        assert!((body.speed() - 120.0).abs() < 1e-3);
    }

    #[test]
    fn test_hold_speed_corrects_drift() {
        let mut rng = rng();
        let mut body = body_at(Vec2::ZERO, Vec2::new(30.0, 40.0)); // speed 50
        hold_speed(&mut body, 100.0, &mut rng);
        assert!((body.speed() - 100.0).abs() < 1e-3);
        // Direction preserved
        assert!((body.vel.x - 60.0).abs() < 1e-2);
        assert!((body.vel.y - 80.0).abs() < 1e-2);
    }

    #[test]
    fn test_dash_fsm_full_cycle() {
        let tuning = Tuning::default();
        let mut rng = rng();
        let arena = Arena::default();
        let mut body = body_at(Vec2::new(400.0, 400.0), Vec2::ZERO);
        let mut dash = DashState::new(0.0, &tuning, &mut rng);
        // Force an immediate decision with the target in range
        dash.next_decision = 0.0;
        let target = Vec2::new(500.0, 400.0);

        let step = dash.update(
            &mut body, target, 180.0, 180.0, 0.0, 1.0 / 60.0, &arena, &tuning, &mut rng,
        );
        assert_eq!(step, DashStep::Telegraph);
        assert_eq!(dash.phase, DashPhase::Prep);

        // Velocity is exactly zero throughout PREP
        let mut now = 0.0;
        let dt = 1.0 / 60.0;
        let mut launched = false;
        for _ in 0..60 {
            now += dt;
            let step = dash.update(
                &mut body, target, 180.0, 180.0, now, dt, &arena, &tuning, &mut rng,
            );
            match dash.phase {
                DashPhase::Prep => assert_eq!(body.vel, Vec2::ZERO),
                DashPhase::Dash => {
                    if step == DashStep::Launched {
                        assert!(!launched, "dash launched twice");
                        launched = true;
                        // Aimed at the snapshot, at base_speed * mult
                        assert!((body.speed() - 180.0 * tuning.dash_speed_mult).abs() < 1e-2);
                        assert!(body.vel.x > 0.0 && body.vel.y.abs() < 1e-3);
                    }
                }
                DashPhase::Normal => break,
            }
        }
        assert!(launched);
        assert_eq!(dash.phase, DashPhase::Normal);
    }

    #[test]
    fn test_dash_aborts_on_boundary() {
        let tuning = Tuning::default();
        let mut rng = rng();
        let arena = Arena::default();
        // Dashing straight at the left wall
        let mut body = body_at(Vec2::new(90.0, 400.0), Vec2::new(-540.0, 0.0));
        let mut dash = DashState::new(0.0, &tuning, &mut rng);
        dash.phase = DashPhase::Dash;

        let mut steps = 0;
        while dash.phase == DashPhase::Dash && steps < 60 {
            dash.update(
                &mut body,
                Vec2::ZERO,
                180.0,
                180.0,
                steps as f32 / 60.0,
                1.0 / 60.0,
                &arena,
                &tuning,
                &mut rng,
            );
            steps += 1;
        }
        assert_eq!(dash.phase, DashPhase::Normal);
        // Ended well before the full dash duration would have
        assert!((steps as f32 / 60.0) < tuning.dash_duration);
        assert_eq!(body.vel.x, 0.0);
        assert!(body.pos.x >= arena.min.x + body.radius - 1e-3);
    }

    #[test]
    fn test_dash_out_of_range_stays_normal() {
        let tuning = Tuning::default();
        let mut rng = rng();
        let arena = Arena::default();
        let mut body = body_at(Vec2::new(400.0, 400.0), Vec2::ZERO);
        let mut dash = DashState::new(0.0, &tuning, &mut rng);
        dash.next_decision = 0.0;
        // Target far outside the trigger range
        let target = Vec2::new(1500.0, 900.0);
        dash.update(
            &mut body, target, 180.0, 180.0, 0.0, 1.0 / 60.0, &arena, &tuning, &mut rng,
        );
        assert_eq!(dash.phase, DashPhase::Normal);
        // Decision timer redrawn into the configured interval
        assert!(dash.next_decision >= tuning.dash_decision_min);
    }

    #[test]
    fn test_turret_fires_once_at_expected_time() {
        let tuning = Tuning::default();
        let mut rng = rng();
        let mut fsm = TurretFsm::default();
        let spawn = Vec2::new(900.0, 500.0);
        let target_pos = Vec2::new(400.0, 500.0);
        let target_vel = Vec2::new(0.0, 60.0);

        let dt = 1.0 / 60.0;
        let mut fired: Vec<(f32, Vec2)> = Vec::new();
        let mut now = 0.0;
        for _ in 0..120 {
            if let Some(vel) = fsm.update(spawn, Some((target_pos, target_vel)), now, &tuning, &mut rng)
            {
                fired.push((now, vel));
            }
            now += dt;
        }

        // With interval 1.0s + charge 0.3s, exactly one shot near t = 1.3s
        assert_eq!(fired.len(), 1);
        let (t, vel) = fired[0];
        assert!((t - 1.3).abs() < 0.03, "fired at t = {}", t);

        // Aimed at target_pos + target_vel * lead_time
        let predicted = target_pos + target_vel * tuning.projectile_lead_time;
        let expected = (predicted - spawn).normalize() * tuning.projectile_speed;
        assert!((vel - expected).length() < 1e-2);
    }

    #[test]
    fn test_turret_suspends_without_target() {
        let tuning = Tuning::default();
        let mut rng = rng();
        let mut fsm = TurretFsm::default();
        let mut now = 0.0;
        for _ in 0..300 {
            assert!(fsm.update(Vec2::ZERO, None, now, &tuning, &mut rng).is_none());
            now += 1.0 / 60.0;
        }
        assert_eq!(fsm.phase, TurretPhase::Idle);
    }

    #[test]
    fn test_aim_coincident_falls_back_to_random_dir() {
        let mut rng = rng();
        let spawn = Vec2::new(100.0, 100.0);
        let vel = aim_with_lead(spawn, spawn, Vec2::ZERO, 0.5, 312.0, &mut rng);
        assert!((vel.length() - 312.0).abs() < 1e-2);
        assert!(vel.x.is_finite() && vel.y.is_finite());
    }
}
