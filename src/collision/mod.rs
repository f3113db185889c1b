//! Terrain collision for entity hitboxes.
//!
//! `CollisionTester` gathers the block collision boxes around an entity's
//! swept hitbox (the broad-phase) and clamps a displacement against them one
//! axis at a time, X then Y then Z. Each axis is resolved against the box as
//! already moved by the previous axes, so a diagonal move into a corner
//! cannot slip between two blocks.
//!
//! Velocities are clamped upstream, so the discrete per-axis test is enough;
//! a displacement longer than a block per sub-step may tunnel.
//!
//! # Example:
//!
//! ```
//! use bevy::math::{DVec3, IVec3, UVec3};
//! use entity_physics::block::BlockRegistry;
//! use entity_physics::collision::{CollisionTester, Cuboidf};
//! use entity_physics::world::{World, WorldBlocks};
//!
//! let mut world = World::new(UVec3::new(32, 32, 32));
//! world.load_empty_chunk(0, 0);
//! world.fill(IVec3::new(0, 0, 0), IVec3::new(31, 0, 31), 1);
//! let mut registry = BlockRegistry::default();
//! registry.register(Default::default());
//! let blocks = WorldBlocks::new(&world, &registry);
//!
//! let mut tester = CollisionTester::default();
//! tester.new_tick();
//! let hitbox = Cuboidf::entity(0.6, 1.8);
//! let out = tester.apply_terrain_collision(&blocks, &hitbox, DVec3::new(4.5, 1.5, 4.5), DVec3::new(0.0, -2.0, 0.0), false);
//! assert_eq!(out.y, 1.0);
//! assert!(tester.collided_vertically);
//! ```

mod cuboid;

pub use cuboid::{Cuboidd, Cuboidf, COLLISION_EPSILON};

use crate::world::BlockAccessor;
use bevy::math::{DVec3, IVec3};

/// One block collision box found by the broad-phase.
#[derive(Debug, Clone, Copy)]
pub struct CollisionCandidate {
    /// The box in world space.
    pub cuboid: Cuboidd,
    pub block_pos: IVec3,
    pub can_step: bool,
    pub allow_step_when_stuck: bool,
}

/// Per-integrator scratch state for terrain collision.
///
/// Holds the candidate list from the last broad-phase so stepping can reuse
/// it without scanning blocks again.
#[derive(Debug, Default)]
pub struct CollisionTester {
    /// Hitbox in world space at the start of the last resolved move.
    pub entity_box: Cuboidd,
    pub collision_box_list: Vec<CollisionCandidate>,
    pub collided_horizontally: bool,
    pub collided_vertically: bool,
    padding: f64,
}

#[allow(clippy::cast_possible_truncation)]
fn cell_range(min: f64, max: f64) -> std::ops::RangeInclusive<i32> {
    let lo = min.floor() as i32;
    let hi = (max.ceil() as i32 - 1).max(lo);
    lo..=hi
}

impl CollisionTester {
    /// A tester whose broad-phase region is grown by `padding` blocks.
    #[must_use]
    pub fn with_padding(padding: f64) -> Self {
        Self { padding: padding.max(0.0), ..Self::default() }
    }

    /// Forget everything from the previous sub-step.
    pub fn new_tick(&mut self) {
        self.collision_box_list.clear();
        self.collided_horizontally = false;
        self.collided_vertically = false;
    }

    fn gather(&mut self, blocks: &impl BlockAccessor, region: &Cuboidd) {
        self.collision_box_list.clear();
        for x in cell_range(region.x1, region.x2) {
            for y in cell_range(region.y1, region.y2) {
                for z in cell_range(region.z1, region.z2) {
                    let block_pos = IVec3::new(x, y, z);
                    let block = blocks.block_at(block_pos);
                    for local in &block.collision_boxes {
                        self.collision_box_list.push(CollisionCandidate {
                            cuboid: Cuboidd::from_local(local, block_pos.as_dvec3()),
                            block_pos,
                            can_step: block.can_step,
                            allow_step_when_stuck: block.allow_step_when_stuck,
                        });
                    }
                }
            }
        }
    }

    /// Move a hitbox by `delta` against terrain and return the resolved
    /// position.
    ///
    /// # Arguments
    /// * `blocks` - terrain accessor
    /// * `local_box` - hitbox relative to the entity origin
    /// * `pos` - current entity origin
    /// * `delta` - desired displacement for this sub-step
    /// * `include_tall_below` - also scan the layer under the swept box, for
    ///   blocks whose boxes reach above their own cell (fences, walls)
    pub fn apply_terrain_collision(
        &mut self,
        blocks: &impl BlockAccessor,
        local_box: &Cuboidf,
        pos: DVec3,
        delta: DVec3,
        include_tall_below: bool,
    ) -> DVec3 {
        self.entity_box = Cuboidd::from_local(local_box, pos);
        let mut region = self.entity_box.swept(delta).grow_by(self.padding);
        if include_tall_below {
            region.y1 -= 1.0;
        }
        self.gather(blocks, &region);

        let mut moving = self.entity_box;

        let mut dx = delta.x;
        for c in &self.collision_box_list {
            dx = c.cuboid.push_out_x(&moving, dx);
        }
        moving.translate(DVec3::new(dx, 0.0, 0.0));

        let mut dy = delta.y;
        for c in &self.collision_box_list {
            dy = c.cuboid.push_out_y(&moving, dy);
        }
        moving.translate(DVec3::new(0.0, dy, 0.0));

        let mut dz = delta.z;
        for c in &self.collision_box_list {
            dz = c.cuboid.push_out_z(&moving, dz);
        }

        self.collided_horizontally = dx != delta.x || dz != delta.z;
        self.collided_vertically = dy != delta.y;
        pos + DVec3::new(dx, dy, dz)
    }

    /// Whether the hitbox at `pos` overlaps any terrain box. Does not touch
    /// the candidate list.
    #[must_use]
    pub fn is_colliding(&self, blocks: &impl BlockAccessor, local_box: &Cuboidf, pos: DVec3, include_tall_below: bool) -> bool {
        self.colliding_box(blocks, local_box, pos, include_tall_below).is_some()
    }

    /// The first terrain box overlapping the hitbox at `pos`, if any.
    #[must_use]
    pub fn colliding_box(
        &self,
        blocks: &impl BlockAccessor,
        local_box: &Cuboidf,
        pos: DVec3,
        include_tall_below: bool,
    ) -> Option<Cuboidd> {
        let hitbox = Cuboidd::from_local(local_box, pos);
        let y_from = if include_tall_below { hitbox.y1 - 1.0 } else { hitbox.y1 };
        for x in cell_range(hitbox.x1, hitbox.x2) {
            for y in cell_range(y_from, hitbox.y2) {
                for z in cell_range(hitbox.z1, hitbox.z2) {
                    let block_pos = IVec3::new(x, y, z);
                    let origin = block_pos.as_dvec3();
                    let hit = blocks
                        .block_at(block_pos)
                        .collision_boxes
                        .iter()
                        .map(|b| Cuboidd::from_local(b, origin))
                        .find(|b| b.intersects(&hitbox));
                    if hit.is_some() {
                        return hit;
                    }
                }
            }
        }
        None
    }
}
