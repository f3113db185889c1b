//! Locomotors: the per-sub-step velocity contributions applied before
//! collision.
//!
//! A pipeline is a fixed array of [`Locomotor`]s run in order. Movement
//! intent (ground, liquid, air) comes first; gravity then augments it and
//! drag damps the result. The two orderings are constants:
//! [`CREATURE_PIPELINE`] and [`PLAYER_PIPELINE`].

use crate::entity::{EntityControls, LocomotionStyle, PhysicsBody, PhysicsSnapshot};
use crate::settings::{LocomotionSettings, PhysicsSettings};
use bevy::math::DVec3;

/// Everything a locomotor may read during one sub-step.
pub struct LocomotionContext<'a> {
    pub controls: &'a EntityControls,
    pub body: &'a PhysicsBody,
    /// State left by the previous sub-step.
    pub state: &'a PhysicsSnapshot,
    pub yaw: f32,
    pub pitch: f32,
    pub physics: &'a PhysicsSettings,
    pub locomotion: &'a LocomotionSettings,
}

impl LocomotionContext<'_> {
    /// The walk vector after sprint/sneak scaling, zero when the entity is
    /// dead or not trying to move.
    #[must_use]
    pub fn walk(&self) -> DVec3 {
        if !self.controls.tries_to_move || !self.body.alive {
            return DVec3::ZERO;
        }
        let mut walk = self.controls.walk_vector;
        if self.controls.sprint {
            walk *= self.locomotion.sprint_multiplier;
        }
        if self.controls.sneak {
            walk *= self.locomotion.sneak_multiplier;
        }
        walk
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Locomotor {
    /// Walking and jumping while standing on something.
    Ground { jump_cooldown: f64 },
    Liquid,
    /// Swims toward where the camera looks.
    PlayerLiquid,
    Air,
    /// Air control with flying and gliding.
    PlayerAir,
    Gravity,
    Drag,
}

pub const CREATURE_PIPELINE: [Locomotor; 5] = [
    Locomotor::Ground { jump_cooldown: 0.0 },
    Locomotor::Liquid,
    Locomotor::Air,
    Locomotor::Gravity,
    Locomotor::Drag,
];

pub const PLAYER_PIPELINE: [Locomotor; 5] = [
    Locomotor::Ground { jump_cooldown: 0.0 },
    Locomotor::PlayerLiquid,
    Locomotor::PlayerAir,
    Locomotor::Gravity,
    Locomotor::Drag,
];

impl Locomotor {
    #[must_use]
    pub fn applicable(&self, ctx: &LocomotionContext<'_>) -> bool {
        let s = ctx.state;
        match self {
            Locomotor::Ground { .. } => s.on_ground && !s.swimming,
            Locomotor::Liquid | Locomotor::PlayerLiquid => s.in_liquid(),
            Locomotor::Air | Locomotor::PlayerAir => !s.on_ground && !s.in_liquid(),
            Locomotor::Gravity => {
                !ctx.controls.no_clip && !s.climbing && ctx.body.habitat.has_gravity(s.in_liquid())
            }
            Locomotor::Drag => true,
        }
    }

    /// Timers that run whether or not the locomotor applies.
    pub fn tick(&mut self, dt: f64) {
        if let Locomotor::Ground { jump_cooldown } = self {
            *jump_cooldown = (*jump_cooldown - dt).max(0.0);
        }
    }

    pub fn apply(&mut self, dt: f64, ctx: &LocomotionContext<'_>, motion: &mut DVec3) {
        let dtf = dt * 60.0;
        let loco = ctx.locomotion;
        match self {
            Locomotor::Ground { jump_cooldown } => {
                let walk = ctx.walk();
                motion.x += walk.x * dtf;
                motion.z += walk.z * dtf;
                if ctx.controls.jump && ctx.body.alive && *jump_cooldown <= 0.0 {
                    motion.y = loco.jump_strength;
                    *jump_cooldown = loco.jump_cooldown;
                }
            }
            Locomotor::Liquid => {
                let walk = ctx.walk() * loco.liquid_move_factor;
                motion.x += walk.x * dtf;
                motion.z += walk.z * dtf;
                if ctx.body.habitat.has_gravity(true) {
                    apply_swim_lift(dt, ctx, motion);
                } else {
                    motion.y += walk.y * dtf;
                }
            }
            Locomotor::PlayerLiquid => {
                let walk = ctx.walk() * loco.liquid_move_factor;
                motion.x += walk.x * dtf;
                motion.z += walk.z * dtf;
                if ctx.state.swimming && walk != DVec3::ZERO {
                    let horizontal = DVec3::new(walk.x, 0.0, walk.z).length();
                    motion.y += f64::from(ctx.pitch).sin() * horizontal * dtf;
                }
                apply_swim_lift(dt, ctx, motion);
            }
            Locomotor::Air => {
                let flying = !ctx.body.habitat.has_gravity(false);
                let factor = if flying { 1.0 } else { loco.air_move_factor };
                let walk = ctx.walk() * factor;
                motion.x += walk.x * dtf;
                motion.z += walk.z * dtf;
                if flying {
                    motion.y += walk.y * dtf;
                }
            }
            Locomotor::PlayerAir => {
                if ctx.controls.no_clip {
                    *motion += ctx.walk() * dtf;
                    return;
                }
                let walk = ctx.walk() * loco.air_move_factor;
                motion.x += walk.x * dtf;
                motion.z += walk.z * dtf;
                if ctx.controls.gliding && ctx.body.alive {
                    let yaw = f64::from(ctx.yaw);
                    let forward = DVec3::new(-yaw.sin(), 0.0, -yaw.cos());
                    *motion += forward * loco.glide_speed * dtf;
                    motion.y = motion.y.max(-loco.glide_sink_speed);
                }
            }
            Locomotor::Gravity => {
                let factor = if ctx.state.in_liquid() { ctx.physics.liquid_gravity_factor } else { 1.0 };
                motion.y -= ctx.physics.gravity * factor * dt;
            }
            Locomotor::Drag => {
                let p = ctx.physics;
                if ctx.state.in_liquid() {
                    *motion *= (1.0 - p.liquid_drag).powf(dtf);
                } else if ctx.state.on_ground {
                    let ground = (1.0 - p.ground_drag).powf(dtf);
                    motion.x *= ground;
                    motion.z *= ground;
                    motion.y *= (1.0 - p.air_drag).powf(dtf);
                } else {
                    *motion *= (1.0 - p.air_drag).powf(dtf);
                }
            }
        }
    }
}

/// Jump to swim up, and float when swimming with nothing pressed.
fn apply_swim_lift(dt: f64, ctx: &LocomotionContext<'_>, motion: &mut DVec3) {
    if ctx.controls.jump && ctx.body.alive {
        motion.y += ctx.locomotion.swim_up_speed * dt * 60.0;
    } else if ctx.state.swimming {
        motion.y += ctx.locomotion.liquid_buoyancy * dt;
    }
}

/// The ordered locomotors owned by one integrator.
#[derive(Debug, Clone, PartialEq)]
pub struct LocomotionPipeline {
    locomotors: [Locomotor; 5],
}

impl LocomotionPipeline {
    #[must_use]
    pub fn creature() -> Self {
        Self { locomotors: CREATURE_PIPELINE }
    }

    #[must_use]
    pub fn player() -> Self {
        Self { locomotors: PLAYER_PIPELINE }
    }

    #[must_use]
    pub fn for_style(style: LocomotionStyle) -> Self {
        match style {
            LocomotionStyle::Creature => Self::creature(),
            LocomotionStyle::Player => Self::player(),
        }
    }

    #[must_use]
    pub fn locomotors(&self) -> &[Locomotor] {
        &self.locomotors
    }

    /// Run every applicable locomotor in order.
    pub fn apply(&mut self, dt: f64, ctx: &LocomotionContext<'_>, motion: &mut DVec3) {
        for locomotor in &mut self.locomotors {
            locomotor.tick(dt);
            if locomotor.applicable(ctx) {
                locomotor.apply(dt, ctx, motion);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityProperties, Habitat};
    use approx::assert_relative_eq;

    const DT: f64 = 1.0 / 60.0;

    struct Fixture {
        controls: EntityControls,
        body: PhysicsBody,
        state: PhysicsSnapshot,
        physics: PhysicsSettings,
        locomotion: LocomotionSettings,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                controls: EntityControls::default(),
                body: PhysicsBody::from_properties(&EntityProperties::default()).unwrap(),
                state: PhysicsSnapshot::default(),
                physics: PhysicsSettings::default(),
                locomotion: LocomotionSettings::default(),
            }
        }

        fn ctx(&self) -> LocomotionContext<'_> {
            LocomotionContext {
                controls: &self.controls,
                body: &self.body,
                state: &self.state,
                yaw: 0.0,
                pitch: 0.0,
                physics: &self.physics,
                locomotion: &self.locomotion,
            }
        }
    }

    #[test]
    fn pipelines_keep_gravity_then_drag_last() {
        for p in [CREATURE_PIPELINE, PLAYER_PIPELINE] {
            assert!(matches!(p[0], Locomotor::Ground { .. }));
            assert_eq!(p[3], Locomotor::Gravity);
            assert_eq!(p[4], Locomotor::Drag);
        }
        assert_eq!(PLAYER_PIPELINE[1], Locomotor::PlayerLiquid);
        assert_eq!(PLAYER_PIPELINE[2], Locomotor::PlayerAir);
    }

    #[test]
    fn falling_in_air_gains_gravity_then_drag() {
        let f = Fixture::new();
        let mut motion = DVec3::ZERO;
        LocomotionPipeline::creature().apply(DT, &f.ctx(), &mut motion);
        assert_relative_eq!(motion.y, -0.37 * DT * 0.98, epsilon = 1e-12);
    }

    #[test]
    fn ground_walk_and_jump_cooldown() {
        let mut f = Fixture::new();
        f.state.on_ground = true;
        f.controls.tries_to_move = true;
        f.controls.jump = true;
        f.controls.walk_vector = DVec3::new(0.03, 0.0, 0.0);
        let mut ground = Locomotor::Ground { jump_cooldown: 0.0 };

        let mut motion = DVec3::ZERO;
        ground.apply(DT, &f.ctx(), &mut motion);
        assert_relative_eq!(motion.x, 0.03, epsilon = 1e-12);
        assert_eq!(motion.y, 0.12);

        let mut again = DVec3::ZERO;
        ground.tick(DT);
        ground.apply(DT, &f.ctx(), &mut again);
        assert_eq!(again.y, 0.0);
    }

    #[test]
    fn dead_entities_ignore_controls() {
        let mut f = Fixture::new();
        f.body.alive = false;
        f.controls.tries_to_move = true;
        f.controls.walk_vector = DVec3::new(0.03, 0.0, 0.03);
        assert_eq!(f.ctx().walk(), DVec3::ZERO);
    }

    #[test]
    fn gravity_skips_climbers_and_flyers() {
        let mut f = Fixture::new();
        assert!(Locomotor::Gravity.applicable(&f.ctx()));
        f.state.climbing = true;
        assert!(!Locomotor::Gravity.applicable(&f.ctx()));
        f.state.climbing = false;
        f.body.habitat = Habitat::Air;
        assert!(!Locomotor::Gravity.applicable(&f.ctx()));
        f.body.habitat = Habitat::Land;
        f.controls.no_clip = true;
        assert!(!Locomotor::Gravity.applicable(&f.ctx()));
    }

    #[test]
    fn liquid_and_air_are_exclusive() {
        let mut f = Fixture::new();
        f.state.feet_in_liquid = true;
        assert!(Locomotor::Liquid.applicable(&f.ctx()));
        assert!(!Locomotor::Air.applicable(&f.ctx()));
        assert!(!Locomotor::PlayerAir.applicable(&f.ctx()));
    }

    #[test]
    fn player_swims_toward_pitch() {
        let mut f = Fixture::new();
        f.state.swimming = true;
        f.controls.tries_to_move = true;
        f.controls.walk_vector = DVec3::new(0.0, 0.0, -0.04);
        let mut ctx = f.ctx();
        ctx.pitch = -std::f32::consts::FRAC_PI_4;
        let mut motion = DVec3::ZERO;
        Locomotor::PlayerLiquid.apply(DT, &ctx, &mut motion);
        assert!(motion.y < 0.0, "looking down swims down, got {motion:?}");
        assert!(motion.z < 0.0);
    }

    #[test]
    fn gliding_caps_descent_and_pushes_forward() {
        let mut f = Fixture::new();
        f.controls.gliding = true;
        let mut motion = DVec3::new(0.0, -0.5, 0.0);
        Locomotor::PlayerAir.apply(DT, &f.ctx(), &mut motion);
        assert_eq!(motion.y, -0.04);
        assert!(motion.z < 0.0);
    }
}
