//! Controlled entity physics: the fixed-step integrator.
//!
//! [`ControlledPhysics`] accumulates frame time and runs fixed sub-steps.
//! Each sub-step runs the entity's locomotion pipeline, clamps motion and
//! then displaces the entity through the terrain with
//! [`ControlledPhysics::displace_with_block_collision`], which layers
//! climbing, stepping, sneak-edge avoidance and liquid state on top of the
//! plain [`CollisionTester`] resolve.
//!
//! Derived state is kept privately while sub-steps run and published to the
//! entity's [`PhysicsSnapshot`] once at the end of [`ControlledPhysics::update`].
//!
//! # Example:
//!
//! ```
//! use bevy::math::{DVec3, IVec3, UVec3};
//! use entity_physics::block::BlockRegistry;
//! use entity_physics::entity::*;
//! use entity_physics::physics::{ControlledPhysics, NoEvents, PhysicsEntity, PhysicsEnv};
//! use entity_physics::settings::Settings;
//! use entity_physics::world::{World, WorldBlocks};
//!
//! let mut world = World::new(UVec3::new(32, 32, 32));
//! world.fill(IVec3::new(0, 0, 0), IVec3::new(31, 0, 31), 1);
//! let mut registry = BlockRegistry::default();
//! registry.register(Default::default());
//! let settings = Settings::default();
//! let blocks = WorldBlocks::new(&world, &registry);
//! let env = PhysicsEnv::new(&blocks, &settings);
//!
//! let mut pos = EntityPos::at(DVec3::new(8.5, 3.0, 8.5));
//! let mut body = PhysicsBody::from_properties(&EntityProperties::default()).unwrap();
//! let controls = EntityControls::default();
//! let mut snapshot = PhysicsSnapshot::default();
//! let mut physics = ControlledPhysics::creature(&settings.physics);
//!
//! let mut entity = PhysicsEntity { pos: &mut pos, body: &mut body, controls: &controls, snapshot: &mut snapshot };
//! physics.update(2.0, &env, &mut entity, &mut NoEvents);
//! assert!(snapshot.on_ground);
//! assert_eq!(pos.xyz.y, 1.0);
//! ```

pub mod locomotion;

use crate::block::{Block, BlockFacing};
use crate::collision::{CollisionCandidate, CollisionTester, Cuboidd, Cuboidf, COLLISION_EPSILON};
use crate::entity::{EntityControls, EntityPos, LocomotionStyle, PhysicsBody, PhysicsSnapshot};
use crate::settings::{LocomotionSettings, PhysicsSettings, Settings};
use crate::world::{block_pos, BlockAccessor};
use bevy::math::{DVec3, IVec3};
use bevy::prelude::{trace, Component};
use locomotion::{LocomotionContext, LocomotionPipeline};

/// Upward nudge per 1/60 s while stepping onto a block.
const STEP_NUDGE: f64 = 0.07;
/// Clearance above the step surface required by a step trial.
const STEP_CLEARANCE: f64 = 0.03;
/// Horizontal shrink of the hitbox used for the sneak-edge probe.
const SNEAK_EDGE_INSET: f32 = 0.1;

/// Push-style callbacks fired by the integrator. All default to no-ops.
pub trait PhysicsEvents {
    /// The entity landed. `prev_motion_y` is the vertical motion it landed with.
    fn on_fall_to_ground(&mut self, _prev_motion_y: f64) {}
    fn on_collide_with_liquid(&mut self) {}
    fn on_exited_liquid(&mut self) {}
    /// The hitbox overlaps the cell at `pos`, which holds a non-air `block`.
    fn on_entity_inside(&mut self, _pos: IVec3, _block: &Block) {}
}

/// Event sink that ignores everything.
pub struct NoEvents;

impl PhysicsEvents for NoEvents {}

/// Terrain and tuning shared by every entity in one update.
pub struct PhysicsEnv<'a, B: BlockAccessor> {
    pub blocks: &'a B,
    pub physics: &'a PhysicsSettings,
    pub locomotion: &'a LocomotionSettings,
}

impl<'a, B: BlockAccessor> PhysicsEnv<'a, B> {
    #[must_use]
    pub fn new(blocks: &'a B, settings: &'a Settings) -> Self {
        Self { blocks, physics: &settings.physics, locomotion: &settings.locomotion }
    }
}

/// Borrowed view of one entity's physics components.
pub struct PhysicsEntity<'a> {
    pub pos: &'a mut EntityPos,
    pub body: &'a mut PhysicsBody,
    pub controls: &'a EntityControls,
    pub snapshot: &'a mut PhysicsSnapshot,
}

/// How a block box relates to the entity hitbox and its next move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intersect {
    None,
    Stuck,
    X,
    Y,
    Z,
}

fn aabb_intersect(block: &Cuboidd, entity: &Cuboidd, walk: DVec3) -> Intersect {
    if block.intersects(entity) {
        Intersect::Stuck
    } else if block.intersects(&entity.offset_copy(DVec3::new(walk.x, 0.0, 0.0))) {
        Intersect::X
    } else if block.intersects(&entity.offset_copy(DVec3::new(0.0, walk.y, 0.0))) {
        Intersect::Y
    } else if block.intersects(&entity.offset_copy(DVec3::new(0.0, 0.0, walk.z))) {
        Intersect::Z
    } else {
        Intersect::None
    }
}

fn clamp_motion(v: f64, max: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(-max, max) }
}

/// Fixed-step integrator for one entity.
#[derive(Component, Debug)]
pub struct ControlledPhysics {
    pipeline: LocomotionPipeline,
    tester: CollisionTester,
    accumulator: f64,
    state: PhysicsSnapshot,
    /// Last position where the entity was supported (ground, liquid, climbing).
    pub position_before_falling: DVec3,
}

impl ControlledPhysics {
    #[must_use]
    pub fn new(pipeline: LocomotionPipeline, settings: &PhysicsSettings) -> Self {
        Self {
            pipeline,
            tester: CollisionTester::with_padding(settings.collision_padding),
            accumulator: 0.0,
            state: PhysicsSnapshot::default(),
            position_before_falling: DVec3::ZERO,
        }
    }

    #[must_use]
    pub fn creature(settings: &PhysicsSettings) -> Self {
        Self::new(LocomotionPipeline::creature(), settings)
    }

    #[must_use]
    pub fn player(settings: &PhysicsSettings) -> Self {
        Self::new(LocomotionPipeline::player(), settings)
    }

    #[must_use]
    pub fn for_style(style: LocomotionStyle, settings: &PhysicsSettings) -> Self {
        Self::new(LocomotionPipeline::for_style(style), settings)
    }

    /// Working state as of the last completed sub-step.
    #[must_use]
    pub fn state(&self) -> &PhysicsSnapshot {
        &self.state
    }

    #[must_use]
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Advance the entity by `dt` seconds of frame time.
    ///
    /// Unsimulated time is capped at `max_accumulator`, so a long stall
    /// replays at most that much. Publishes the snapshot once at the end.
    ///
    /// # Return
    /// * `u32` - number of sub-steps run
    pub fn update<B: BlockAccessor>(
        &mut self,
        dt: f64,
        env: &PhysicsEnv<'_, B>,
        entity: &mut PhysicsEntity<'_>,
        events: &mut impl PhysicsEvents,
    ) -> u32 {
        let step = env.physics.fixed_step.max(1e-4);
        self.accumulator = (self.accumulator + dt.max(0.0)).min(env.physics.max_accumulator);

        let mut steps = 0;
        while self.accumulator >= step {
            self.sub_step(step, env, entity, events);
            self.accumulator -= step;
            steps += 1;
        }
        *entity.snapshot = self.state;
        steps
    }

    /// Run exactly one sub-step of `dt` seconds. Does not publish the snapshot.
    pub fn sub_step<B: BlockAccessor>(
        &mut self,
        dt: f64,
        env: &PhysicsEnv<'_, B>,
        entity: &mut PhysicsEntity<'_>,
        events: &mut impl PhysicsEvents,
    ) {
        self.tester.new_tick();

        if !entity.body.alive {
            self.apply_pose_offset(env.blocks, entity);
        }

        let ctx = LocomotionContext {
            controls: entity.controls,
            body: &*entity.body,
            state: &self.state,
            yaw: entity.pos.yaw,
            pitch: entity.pos.pitch,
            physics: env.physics,
            locomotion: env.locomotion,
        };
        self.pipeline.apply(dt, &ctx, &mut entity.pos.motion);

        if let Some(mount) = entity.body.mounted_at {
            entity.pos.xyz = mount;
            entity.pos.motion = DVec3::ZERO;
            return;
        }

        let max = env.physics.max_motion_per_step;
        let m = entity.pos.motion;
        entity.pos.motion = DVec3::new(clamp_motion(m.x, max), clamp_motion(m.y, max), clamp_motion(m.z, max));

        if entity.controls.no_clip {
            entity.pos.xyz += entity.pos.motion * dt * 60.0;
            self.state = PhysicsSnapshot {
                feet_in_liquid: self.state.feet_in_liquid,
                swimming: self.state.swimming,
                ..PhysicsSnapshot::default()
            };
            return;
        }

        self.displace_with_block_collision(dt, env, entity, events);
    }

    /// Dead entities take their pose hitbox, unless it would be inside terrain.
    fn apply_pose_offset(&self, blocks: &impl BlockAccessor, entity: &mut PhysicsEntity<'_>) {
        let posed = entity.body.origin_collision_box.offset(entity.body.pose_offset);
        if posed != entity.body.collision_box && !self.tester.is_colliding(blocks, &posed, entity.pos.xyz, false) {
            entity.body.collision_box = posed;
        }
    }

    /// Move the entity by its motion through the terrain and update the
    /// derived state.
    pub fn displace_with_block_collision<B: BlockAccessor>(
        &mut self,
        dt: f64,
        env: &PhysicsEnv<'_, B>,
        entity: &mut PhysicsEntity<'_>,
        events: &mut impl PhysicsEvents,
    ) {
        let blocks = env.blocks;
        let dtf = dt * 60.0;
        let prev = self.state;
        let controls = *entity.controls;
        let local_box = entity.body.collision_box;
        let pos = entity.pos.xyz;

        self.state.climbing = false;
        self.state.climbing_on_face = None;
        if !prev.on_ground
            && (entity.body.can_climb || entity.body.can_climb_anywhere)
            && let Some(face) = Self::find_climbable(blocks, entity.body, pos)
        {
            self.state.climbing = true;
            self.state.climbing_on_face = face;
        }

        if self.state.climbing && controls.walk_vector.y == 0.0 {
            let motion = &mut entity.pos.motion;
            let loco = env.locomotion;
            if controls.sneak {
                motion.y = (motion.y - loco.climb_down_speed).max(-loco.climb_down_speed);
            } else if controls.jump {
                motion.y = loco.climb_jump_nudge * dtf;
            } else if pushes_into(&controls, self.state.climbing_on_face) {
                motion.y = loco.climb_speed;
            }
        }

        let motion = entity.pos.motion;
        let delta = motion * dtf;
        let mut out = self.tester.apply_terrain_collision(blocks, &local_box, pos, delta, true);
        let mut collided_h = self.tester.collided_horizontally;
        let mut collided_v = self.tester.collided_vertically;

        let mut stepping = false;
        if !(entity.body.can_climb_anywhere && prev.climbing)
            && controls.tries_to_move
            && (controls.walk_vector.x != 0.0 || controls.walk_vector.z != 0.0)
            && (prev.on_ground || prev.swimming)
            && collided_h
            && self.try_step(blocks, entity.body, &local_box, pos, delta)
        {
            stepping = true;
            let raised = pos + DVec3::new(0.0, STEP_NUDGE * dtf, 0.0);
            out = self.tester.apply_terrain_collision(blocks, &local_box, raised, delta, true);
            collided_h = self.tester.collided_horizontally;
            collided_v = self.tester.collided_vertically;
            trace!("stepping up at {raised:?}");
        }

        if controls.sneak && prev.on_ground && motion.y <= 0.0 && !self.state.climbing {
            out = self.avoid_sneak_edge(blocks, &local_box, pos, out, env.physics.gravity * dt);
        }

        if prev.swimming && collided_h && controls.tries_to_move {
            entity.pos.motion.y = entity.pos.motion.y.max(env.locomotion.swim_out_speed);
        }

        if blocks.is_not_traversable(block_pos(DVec3::new(out.x, pos.y, pos.z))) {
            out.x = pos.x;
        }
        if blocks.is_not_traversable(block_pos(DVec3::new(pos.x, out.y, pos.z))) {
            out.y = pos.y;
            collided_v = true;
        }
        if blocks.is_not_traversable(block_pos(DVec3::new(pos.x, pos.y, out.z))) {
            out.z = pos.z;
        }

        let intended = pos + delta;
        if !stepping {
            if (out.x - intended.x).abs() > COLLISION_EPSILON {
                entity.pos.motion.x = 0.0;
            }
            if (out.z - intended.z).abs() > COLLISION_EPSILON {
                entity.pos.motion.z = 0.0;
            }
        }
        if collided_v {
            entity.pos.motion.y = 0.0;
        }
        if stepping {
            entity.pos.motion.y = entity.pos.motion.y.max(0.0);
        }

        entity.pos.xyz = out;

        let falling = motion.y < 0.0;
        let state = &mut self.state;
        state.collided_horizontally = collided_h;
        state.collided_vertically = collided_v;
        state.collided = collided_h || collided_v;
        state.stepping = stepping;
        state.on_ground = (collided_v && falling && !state.climbing) || stepping;

        let feet = blocks.block_at_point(out);
        let liquid_above = blocks.block_at(block_pos(out) + IVec3::Y).is_liquid();
        state.feet_in_liquid = feet.is_liquid()
            && (f64::from(feet.liquid_level) + if liquid_above { 1.0 } else { 0.0 }) / 8.0 >= out.y.fract();
        state.swimming = blocks
            .block_at_point(out + DVec3::new(0.0, entity.body.swimming_offset_y, 0.0))
            .is_liquid();

        if !prev.on_ground && state.on_ground {
            events.on_fall_to_ground(motion.y);
        }
        match (prev.in_liquid(), state.in_liquid()) {
            (false, true) => events.on_collide_with_liquid(),
            (true, false) => events.on_exited_liquid(),
            _ => {}
        }
        if state.on_ground || state.in_liquid() || state.climbing {
            self.position_before_falling = out;
        }

        let hitbox = Cuboidd::from_local(&local_box, out);
        let lo = (hitbox.min() + DVec3::splat(COLLISION_EPSILON)).floor().as_ivec3();
        let hi = (hitbox.max() - DVec3::splat(COLLISION_EPSILON)).floor().as_ivec3();
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    let cell = IVec3::new(x, y, z);
                    let block = blocks.block_at(cell);
                    if !block.is_air() {
                        events.on_entity_inside(cell, block);
                    }
                }
            }
        }
    }

    /// Scan the hitbox height in the entity's column, then the four
    /// horizontal neighbours, for something to climb.
    ///
    /// # Return
    /// * `None` - nothing in reach
    /// * `Some(None)` - climbable block in the entity's own column
    /// * `Some(Some(face))` - climbable neighbour in direction `face`
    #[allow(clippy::option_option, clippy::cast_possible_truncation)]
    fn find_climbable(blocks: &impl BlockAccessor, body: &PhysicsBody, pos: DVec3) -> Option<Option<BlockFacing>> {
        let hitbox = Cuboidd::from_local(&body.collision_box, pos);
        let base = block_pos(pos + DVec3::new(0.0, f64::from(body.collision_box.y1), 0.0));
        let height = f64::from(body.collision_box.height()).ceil() as i32;
        let in_reach = |cell: IVec3, block: &Block| {
            block
                .collision_boxes
                .iter()
                .any(|b| Cuboidd::from_local(b, cell.as_dvec3()).shortest_distance_from(&hitbox) < body.climb_touch_distance)
        };

        for dy in 0..height.max(1) {
            let cell = base + IVec3::new(0, dy, 0);
            let block = blocks.block_at(cell);
            if block.climbable && in_reach(cell, block) {
                return Some(None);
            }
            for face in BlockFacing::HORIZONTALS {
                let n = cell + face.normal();
                let block = blocks.block_at(n);
                let climbable =
                    block.climbable || (body.can_climb_anywhere && block.is_side_solid(face.opposite()));
                if climbable && blocks.is_valid_pos(n) && in_reach(n, block) {
                    return Some(Some(face));
                }
            }
        }
        None
    }

    /// Look for a step-able box in the last broad-phase and try the three
    /// step trials. Leaves the tester's candidate list intact.
    fn try_step(
        &self,
        blocks: &impl BlockAccessor,
        body: &PhysicsBody,
        local_box: &Cuboidf,
        pos: DVec3,
        delta: DVec3,
    ) -> bool {
        let Some(step) = self.find_steppable(body.step_height, delta) else {
            return false;
        };
        let rise = step.cuboid.y2 - self.tester.entity_box.y1 + STEP_CLEARANCE;
        let trials = [
            DVec3::new(delta.x, rise, delta.z),
            DVec3::new(delta.x, rise, 0.0),
            DVec3::new(0.0, rise, delta.z),
        ];
        trials
            .iter()
            .filter(|t| t.x != 0.0 || t.z != 0.0)
            .any(|t| !self.tester.is_colliding(blocks, local_box, pos + *t, true))
    }

    /// The highest step-able candidate the entity is walking into.
    fn find_steppable(&self, step_height: f64, walk: DVec3) -> Option<CollisionCandidate> {
        let entity_box = &self.tester.entity_box;
        let mut best: Option<CollisionCandidate> = None;
        for c in &self.tester.collision_box_list {
            let intersect = aabb_intersect(&c.cuboid, entity_box, walk);
            if intersect == Intersect::None {
                continue;
            }
            if (intersect == Intersect::Stuck && !c.allow_step_when_stuck) || (intersect == Intersect::Y && walk.y > 0.0) {
                return None;
            }
            let height_diff = c.cuboid.y2 - entity_box.y1;
            if height_diff <= 0.0 || height_diff > step_height || !c.can_step {
                continue;
            }
            if best.is_none_or(|b| b.cuboid.y2 < c.cuboid.y2) {
                best = Some(*c);
            }
        }
        best
    }

    /// Cancel X and Z moves that would carry a sneaking entity off a ledge.
    fn avoid_sneak_edge(&self, blocks: &impl BlockAccessor, local_box: &Cuboidf, pos: DVec3, mut out: DVec3, drop: f64) -> DVec3 {
        let mut sneak_box = local_box.omni_not_down_grow_by(-SNEAK_EDGE_INSET);
        sneak_box.y2 = sneak_box.y1 + local_box.height() / 2.0;
        let drop = drop.max(COLLISION_EPSILON * 10.0);
        let below = |x: f64, z: f64| block_pos(DVec3::new(x, pos.y, z)) - IVec3::Y;

        let supported = |x: f64, z: f64| self.tester.is_colliding(blocks, &sneak_box, DVec3::new(x, pos.y - drop, z), false);

        if out.x != pos.x && !supported(out.x, pos.z) {
            out.x = if blocks.block_at(below(out.x, pos.z)).climbable { pos.x + (out.x - pos.x) / 10.0 } else { pos.x };
        }
        if out.z != pos.z && !supported(out.x, out.z) {
            out.z = if blocks.block_at(below(out.x, out.z)).climbable { pos.z + (out.z - pos.z) / 10.0 } else { pos.z };
        }
        out
    }
}

/// Whether the controls push toward the climbed face, or anywhere when
/// climbing in the entity's own column.
fn pushes_into(controls: &EntityControls, face: Option<BlockFacing>) -> bool {
    if !controls.tries_to_move {
        return false;
    }
    let walk = DVec3::new(controls.walk_vector.x, 0.0, controls.walk_vector.z);
    match face {
        Some(face) => walk.dot(face.normal().as_dvec3()) > 0.0,
        None => walk != DVec3::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityProperties, Habitat};
    use crate::world::testing::*;
    use crate::world::{World, WorldBlocks};
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct Recorder {
        landed: Vec<f64>,
        entered: u32,
        exited: u32,
        inside: Vec<(IVec3, String)>,
    }

    impl PhysicsEvents for Recorder {
        fn on_fall_to_ground(&mut self, prev_motion_y: f64) {
            self.landed.push(prev_motion_y);
        }
        fn on_collide_with_liquid(&mut self) {
            self.entered += 1;
        }
        fn on_exited_liquid(&mut self) {
            self.exited += 1;
        }
        fn on_entity_inside(&mut self, pos: IVec3, block: &Block) {
            self.inside.push((pos, block.name.clone()));
        }
    }

    struct Sim {
        world: World,
        settings: Settings,
        pos: EntityPos,
        body: PhysicsBody,
        controls: EntityControls,
        snapshot: PhysicsSnapshot,
        physics: ControlledPhysics,
        events: Recorder,
    }

    impl Sim {
        fn new(world: World, at: DVec3) -> Self {
            Self::with_props(world, at, &EntityProperties::default())
        }

        fn with_props(world: World, at: DVec3, props: &EntityProperties) -> Self {
            let settings = Settings::default();
            let physics = ControlledPhysics::for_style(props.locomotion, &settings.physics);
            Self {
                world,
                settings,
                pos: EntityPos::at(at),
                body: PhysicsBody::from_properties(props).unwrap(),
                controls: EntityControls::default(),
                snapshot: PhysicsSnapshot::default(),
                physics,
                events: Recorder::default(),
            }
        }

        fn walk(&mut self, v: DVec3) {
            self.controls.tries_to_move = true;
            self.controls.walk_vector = v;
        }

        fn update(&mut self, dt: f64) -> u32 {
            let registry = registry();
            let blocks = WorldBlocks::new(&self.world, &registry);
            let env = PhysicsEnv::new(&blocks, &self.settings);
            let mut entity = PhysicsEntity {
                pos: &mut self.pos,
                body: &mut self.body,
                controls: &self.controls,
                snapshot: &mut self.snapshot,
            };
            self.physics.update(dt, &env, &mut entity, &mut self.events)
        }

        fn sub_steps(&mut self, n: u32) {
            let registry = registry();
            let blocks = WorldBlocks::new(&self.world, &registry);
            let env = PhysicsEnv::new(&blocks, &self.settings);
            let step = self.settings.physics.fixed_step;
            let mut entity = PhysicsEntity {
                pos: &mut self.pos,
                body: &mut self.body,
                controls: &self.controls,
                snapshot: &mut self.snapshot,
            };
            for _ in 0..n {
                self.physics.sub_step(step, &env, &mut entity, &mut self.events);
            }
        }

        fn run_ticks(&mut self, ticks: u32) {
            for _ in 0..ticks {
                self.update(1.0 / 60.0 + 1e-9);
            }
        }
    }

    #[test]
    fn huge_frame_time_is_clamped_to_one_second() {
        let start = DVec3::new(20.5, 50.0, 20.5);
        let mut a = Sim::new(flat_world(1), start);
        let mut b = Sim::new(flat_world(1), start);
        let mut c = Sim::new(flat_world(1), start);

        let steps_a = a.update(100.0);
        let steps_b = b.update(1.0);
        c.sub_steps(steps_a);

        assert_eq!(steps_a, steps_b);
        assert!((59..=60).contains(&steps_a));
        assert_eq!(a.pos, b.pos);
        assert_eq!(a.pos, c.pos);
        assert!(a.pos.xyz.y < 45.0 && a.pos.xyz.y > 30.0, "fell {:?}", a.pos.xyz);
        assert!(!a.snapshot.on_ground);
        assert!(a.physics.accumulator() < a.settings.physics.fixed_step);
    }

    #[test]
    fn snapshot_is_published_only_by_update() {
        let mut s = Sim::new(flat_world(1), DVec3::new(10.5, 1.2, 10.5));
        s.sub_steps(30);
        assert!(s.physics.state().on_ground);
        assert!(!s.snapshot.on_ground);
        s.update(0.0);
        assert!(s.snapshot.on_ground);
    }

    #[test]
    fn landing_fires_fall_to_ground_once() {
        let mut s = Sim::new(flat_world(1), DVec3::new(10.5, 4.0, 10.5));
        s.update(1.0);
        assert_eq!(s.pos.xyz.y, 1.0);
        assert_eq!(s.events.landed.len(), 1);
        assert!(s.events.landed[0] < 0.0);
        assert_eq!(s.pos.motion.y, 0.0);
        assert_eq!(s.physics.position_before_falling, s.pos.xyz);
    }

    #[test]
    fn crossing_a_pool_enters_and_exits_liquid_once() {
        let mut w = flat_world(1);
        w.fill(IVec3::new(5, 1, 0), IVec3::new(6, 1, 127), WATER);
        let mut s = Sim::new(w, DVec3::new(2.5, 1.0, 20.5));
        s.walk(DVec3::new(0.03, 0.0, 0.0));

        let mut was_wet = false;
        for _ in 0..240 {
            s.run_ticks(1);
            was_wet |= s.snapshot.in_liquid();
            if s.pos.xyz.x > 10.0 {
                break;
            }
        }
        assert!(was_wet);
        assert!(s.pos.xyz.x > 10.0, "stuck at {:?}", s.pos.xyz);
        assert_eq!(s.events.entered, 1);
        assert_eq!(s.events.exited, 1);
        assert!(!s.snapshot.in_liquid());
    }

    #[test]
    fn steps_onto_low_slab() {
        let mut w = flat_world(1);
        w.fill(IVec3::new(6, 1, 0), IVec3::new(30, 1, 127), LOW_SLAB);
        let mut s = Sim::new(w, DVec3::new(4.5, 1.0, 20.5));
        s.walk(DVec3::new(0.03, 0.0, 0.0));
        s.run_ticks(60);

        assert!(s.pos.xyz.x > 7.0, "blocked at {:?}", s.pos.xyz);
        assert_relative_eq!(s.pos.xyz.y, 1.4, epsilon = 1e-6);
        assert!(s.snapshot.on_ground);
        assert!(s.pos.motion.x > 0.0);
    }

    #[test]
    fn step_keeps_horizontal_motion_on_contact() {
        let mut w = flat_world(1);
        w.fill(IVec3::new(6, 1, 0), IVec3::new(30, 1, 127), LOW_SLAB);
        let mut s = Sim::new(w, DVec3::new(5.69, 1.0, 20.5));
        s.walk(DVec3::new(0.03, 0.0, 0.0));
        s.run_ticks(1);
        s.run_ticks(1);
        assert!(s.snapshot.on_ground);
        assert!(s.snapshot.stepping);
        assert!(s.pos.motion.x > 0.0);
    }

    #[test]
    fn tall_slab_blocks_walking() {
        let mut w = flat_world(1);
        w.fill(IVec3::new(6, 1, 0), IVec3::new(30, 1, 127), TALL_SLAB);
        let mut s = Sim::new(w, DVec3::new(4.5, 1.0, 20.5));
        s.walk(DVec3::new(0.03, 0.0, 0.0));
        s.run_ticks(60);

        assert!(s.pos.xyz.x <= 5.7 + 1e-6);
        assert_eq!(s.pos.xyz.y, 1.0);
        assert_eq!(s.pos.motion.x, 0.0);
        assert!(s.snapshot.collided_horizontally);
        assert!(!s.snapshot.stepping);
    }

    #[test]
    fn sneaking_stops_at_ledge() {
        let mut w = flat_world(3);
        w.fill(IVec3::new(10, 1, 0), IVec3::new(127, 2, 127), crate::block::blocks::AIR);
        let mut s = Sim::new(w, DVec3::new(8.5, 3.0, 20.5));
        s.run_ticks(2);
        s.walk(DVec3::new(0.03, 0.0, 0.0));
        s.controls.sneak = true;
        s.run_ticks(180);

        assert_eq!(s.pos.xyz.y, 3.0);
        assert!(s.pos.xyz.x > 9.5 && s.pos.xyz.x <= 10.2 + 1e-6, "at {:?}", s.pos.xyz);
        assert!(s.snapshot.on_ground);
    }

    #[test]
    fn sneaking_over_ladder_edge_slides_partially() {
        let mut w = flat_world(3);
        w.fill(IVec3::new(10, 1, 0), IVec3::new(127, 2, 127), crate::block::blocks::AIR);
        w.set_block(10, 2, 20, LADDER);
        let mut s = Sim::new(w, DVec3::new(8.5, 3.0, 20.5));
        s.run_ticks(2);
        s.walk(DVec3::new(0.03, 0.0, 0.0));
        s.controls.sneak = true;

        let mut at_edge = None;
        for _ in 0..180 {
            s.run_ticks(1);
            if at_edge.is_none() && s.pos.xyz.x > 10.2 {
                at_edge = Some(s.pos.xyz.x);
            }
        }
        let crossed = at_edge.expect("never slid past the edge");
        assert!(crossed < 10.2 + 0.01, "full step at the edge: {crossed}");
        assert!(s.pos.xyz.y < 3.0, "still on the ledge at {:?}", s.pos.xyz);
    }

    #[test]
    fn walking_without_sneak_falls_off_ledge() {
        let mut w = flat_world(3);
        w.fill(IVec3::new(10, 1, 0), IVec3::new(127, 2, 127), crate::block::blocks::AIR);
        let mut s = Sim::new(w, DVec3::new(8.5, 3.0, 20.5));
        s.walk(DVec3::new(0.03, 0.0, 0.0));
        s.run_ticks(180);
        assert_eq!(s.pos.xyz.y, 1.0);
    }

    #[test]
    fn climbs_ladder_when_pushing_into_it() {
        let mut w = flat_world(1);
        w.fill(IVec3::new(6, 1, 5), IVec3::new(6, 8, 5), LADDER);
        let props = EntityProperties { can_climb: true, ..EntityProperties::default() };
        let mut s = Sim::with_props(w, DVec3::new(6.5, 1.5, 5.5), &props);
        s.walk(DVec3::new(0.0, 0.0, 0.03));
        s.run_ticks(30);

        assert!(s.snapshot.climbing);
        assert!(s.pos.xyz.y > 2.0, "at {:?}", s.pos.xyz);
        assert!(s.pos.xyz.z <= 5.575 + 1e-6);

        s.controls.tries_to_move = false;
        s.controls.sneak = true;
        let top = s.pos.xyz.y;
        s.run_ticks(10);
        assert!(s.pos.xyz.y < top);
    }

    #[test]
    fn climb_anywhere_uses_solid_walls() {
        let mut w = flat_world(1);
        w.fill(IVec3::new(7, 1, 0), IVec3::new(7, 10, 127), STONE);
        let props = EntityProperties { can_climb_anywhere: true, ..EntityProperties::default() };
        let mut s = Sim::with_props(w, DVec3::new(6.65, 1.5, 20.5), &props);
        s.walk(DVec3::new(0.03, 0.0, 0.0));
        s.run_ticks(30);

        assert!(s.snapshot.climbing);
        assert_eq!(s.snapshot.climbing_on_face, Some(BlockFacing::East));
        assert!(s.pos.xyz.y > 2.0);
    }

    #[test]
    fn barriers_are_not_traversable() {
        let mut w = flat_world(1);
        w.fill(IVec3::new(8, 1, 0), IVec3::new(8, 3, 127), BARRIER);
        let mut s = Sim::new(w, DVec3::new(6.5, 1.0, 20.5));
        s.walk(DVec3::new(0.03, 0.0, 0.0));
        s.run_ticks(120);
        assert!(s.pos.xyz.x < 8.0);
        assert!(s.pos.xyz.x > 7.5);
    }

    #[test]
    fn barrier_floor_stops_a_fall() {
        let mut w = flat_world(1);
        w.fill(IVec3::new(0, 1, 0), IVec3::new(20, 1, 20), BARRIER);
        let mut s = Sim::new(w, DVec3::new(10.5, 4.0, 10.5));
        s.run_ticks(180);

        assert!(s.pos.xyz.y >= 2.0 && s.pos.xyz.y < 2.01, "at {:?}", s.pos.xyz);
        assert!(s.snapshot.on_ground);
        assert!(!s.events.landed.is_empty());
    }

    #[test]
    fn falls_from_above_build_height() {
        let mut s = Sim::new(flat_world(1), DVec3::new(20.5, 70.0, 20.5));
        s.update(1.0);
        assert!(s.pos.xyz.y < 69.0, "hovering at {:?}", s.pos.xyz);
        assert!(s.events.landed.is_empty());
        assert!(!s.snapshot.on_ground);

        for _ in 0..8 {
            s.update(1.0);
        }
        assert_eq!(s.pos.xyz.y, 1.0);
        assert_eq!(s.events.landed.len(), 1);
        assert!(s.snapshot.on_ground);
    }

    #[test]
    fn grounded_climb_anywhere_entity_steps_onto_low_slab() {
        let mut w = flat_world(1);
        w.fill(IVec3::new(6, 1, 0), IVec3::new(30, 1, 127), LOW_SLAB);
        let props = EntityProperties { can_climb_anywhere: true, ..EntityProperties::default() };
        let mut s = Sim::with_props(w, DVec3::new(4.5, 1.0, 20.5), &props);
        s.walk(DVec3::new(0.03, 0.0, 0.0));
        s.run_ticks(60);

        assert!(s.pos.xyz.x > 7.0, "blocked at {:?}", s.pos.xyz);
        assert_relative_eq!(s.pos.xyz.y, 1.4, epsilon = 1e-6);
        assert!(s.snapshot.on_ground);
        assert!(!s.snapshot.climbing);
    }

    #[test]
    fn mounted_entities_snap_and_stop() {
        let mut s = Sim::new(flat_world(1), DVec3::new(10.5, 5.0, 10.5));
        s.pos.motion = DVec3::new(0.5, 0.5, 0.5);
        s.body.mounted_at = Some(DVec3::new(3.0, 2.0, 3.0));
        s.update(0.1);
        assert_eq!(s.pos.xyz, DVec3::new(3.0, 2.0, 3.0));
        assert_eq!(s.pos.motion, DVec3::ZERO);
    }

    #[test]
    fn no_clip_passes_through_terrain() {
        let mut w = flat_world(1);
        w.fill(IVec3::new(6, 1, 0), IVec3::new(9, 5, 127), STONE);
        let props = EntityProperties { locomotion: crate::entity::LocomotionStyle::Player, ..EntityProperties::default() };
        let mut s = Sim::with_props(w, DVec3::new(5.0, 2.0, 20.5), &props);
        s.controls.no_clip = true;
        s.walk(DVec3::new(0.1, 0.0, 0.0));
        s.run_ticks(30);
        assert!(s.pos.xyz.x > 9.0);
        assert_eq!(s.pos.xyz.y, 2.0);
        assert!(!s.snapshot.on_ground);
    }

    #[test]
    fn nan_and_runaway_motion_are_clamped() {
        let mut s = Sim::new(flat_world(1), DVec3::new(60.5, 30.0, 60.5));
        s.body.habitat = Habitat::Air;
        s.pos.motion = DVec3::new(f64::NAN, 0.0, 1e9);
        s.sub_steps(1);
        assert!(s.pos.motion.x == 0.0 && s.pos.motion.z <= 10.0);
        assert!(s.pos.xyz.is_finite());
        assert!(s.pos.xyz.z <= 60.5 + 10.0 + 1e-9);
    }

    #[test]
    fn dead_pose_offset_applies_only_when_free() {
        let mut s = Sim::new(flat_world(1), DVec3::new(10.5, 1.0, 10.5));
        s.body.alive = false;
        s.body.pose_offset = bevy::math::Vec3::new(0.3, 0.0, 0.0);
        s.sub_steps(1);
        assert_eq!(s.body.collision_box, s.body.origin_collision_box.offset(s.body.pose_offset));

        let mut w = flat_world(1);
        w.set_block(11, 1, 10, STONE);
        let mut blocked = Sim::new(w, DVec3::new(10.5, 1.0, 10.5));
        blocked.body.alive = false;
        blocked.body.pose_offset = bevy::math::Vec3::new(0.3, 0.0, 0.0);
        blocked.sub_steps(1);
        assert_eq!(blocked.body.collision_box, blocked.body.origin_collision_box);
    }

    #[test]
    fn entity_inside_reports_overlapped_cells() {
        let mut w = flat_world(1);
        w.set_block(10, 1, 10, THORNS);
        let mut s = Sim::new(w, DVec3::new(10.5, 1.0, 10.5));
        s.sub_steps(1);
        assert!(s.events.inside.iter().any(|(p, name)| *p == IVec3::new(10, 1, 10) && name == "thorns"));
        assert!(s.events.inside.iter().all(|(p, _)| p.y >= 1));
    }

    #[test]
    fn aabb_intersect_classifies_by_axis() {
        let entity = Cuboidd::new(0.0, 1.0, 0.0, 0.6, 2.8, 0.6);
        let ahead = Cuboidd::new(0.7, 1.0, 0.0, 1.7, 1.4, 1.0);
        let floor = Cuboidd::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let walk = DVec3::new(0.2, -0.01, 0.0);
        assert_eq!(aabb_intersect(&ahead, &entity, walk), Intersect::X);
        assert_eq!(aabb_intersect(&floor, &entity, walk), Intersect::Y);
        assert_eq!(aabb_intersect(&floor, &entity.offset_copy(DVec3::new(0.0, -0.5, 0.0)), walk), Intersect::Stuck);
        assert_eq!(aabb_intersect(&ahead, &entity, DVec3::ZERO), Intersect::None);
    }
}
