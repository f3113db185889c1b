//! Entity spatial partitioning.
//!
//! Entities are bucketed by chunk and by an 8x8 column sub-cell inside the
//! chunk, with creatures and inanimate entities kept apart. Range queries
//! visit only the sub-cells overlapping the query cube.
//!
//! The index is rebuilt from scratch once per tick in `PreUpdate`
//! ([`rebuild_entity_partitions`]) and is read-only for the rest of the tick,
//! except for [`EntityPartitioning::repartition`] which moves a single entity.
//! `repartition` and [`EntityPartitioning::walk_touching`] have no caller in
//! this crate's systems; they are for gameplay code, e.g. re-bucketing a
//! teleported player mid-tick or finding entities a player is touching.
//!
//! # Example:
//!
//! ```
//! use bevy::math::{DVec3, UVec3};
//! use bevy::prelude::Entity;
//! use entity_physics::entity::EntityKind;
//! use entity_physics::partition::{EntityPartitioning, PartitionedEntity};
//!
//! let wolf = PartitionedEntity {
//!     entity: Entity::from_raw(1),
//!     pos: DVec3::new(10.0, 1.0, 10.0),
//!     dimension: 0,
//!     touch_distance: 0.5,
//!     kind: EntityKind::Creature,
//! };
//! let mut partitioning = EntityPartitioning::default();
//! partitioning.rebuild(UVec3::new(64, 64, 64), [wolf]);
//!
//! let found = partitioning.nearest_match(DVec3::new(12.0, 1.0, 10.0), 5.0, 0, EntityKind::Creature, |_| true);
//! assert_eq!(found.map(|e| e.entity), Some(wolf.entity));
//! ```

use crate::chunk::CHUNK_SIZE;
use crate::entity::{EntityKind, EntityPos, PhysicsBody};
use crate::world::{map_chunks, World};
use bevy::math::{DVec3, IVec3, UVec3};
use bevy::prelude::{trace, Entity, Query, Res, ResMut, Resource};
use std::collections::HashMap;
use std::ops::ControlFlow;

/// Sub-cells per chunk along x and z.
const GRID_SIZE: i32 = 4;
/// Edge length of one sub-cell in blocks.
pub const SUB_CELL_SIZE: i32 = CHUNK_SIZE as i32 / GRID_SIZE;
const SUB_CELLS: usize = (GRID_SIZE * GRID_SIZE) as usize;

/// What the index stores about one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartitionedEntity {
    pub entity: Entity,
    pub pos: DVec3,
    pub dimension: i32,
    pub touch_distance: f64,
    pub kind: EntityKind,
}

#[derive(Debug, Default, Clone)]
struct ChunkPartition {
    creatures: [Vec<PartitionedEntity>; SUB_CELLS],
    inanimate: [Vec<PartitionedEntity>; SUB_CELLS],
}

impl ChunkPartition {
    fn bucket(&self, kind: EntityKind, sub_cell: usize) -> &[PartitionedEntity] {
        match kind {
            EntityKind::Creature => &self.creatures[sub_cell],
            EntityKind::Inanimate => &self.inanimate[sub_cell],
        }
    }

    fn bucket_mut(&mut self, kind: EntityKind, sub_cell: usize) -> &mut Vec<PartitionedEntity> {
        match kind {
            EntityKind::Creature => &mut self.creatures[sub_cell],
            EntityKind::Inanimate => &mut self.inanimate[sub_cell],
        }
    }

    fn clear(&mut self) {
        self.creatures.iter_mut().chain(self.inanimate.iter_mut()).for_each(Vec::clear);
    }

    fn is_empty(&self) -> bool {
        self.creatures.iter().chain(self.inanimate.iter()).all(Vec::is_empty)
    }
}

/// Chunk + sub-cell index of every entity in the world.
#[derive(Resource, Debug, Default)]
pub struct EntityPartitioning {
    chunks: HashMap<u64, ChunkPartition>,
    locations: HashMap<Entity, (u64, usize, EntityKind)>,
    map_size: UVec3,
    map_chunks: UVec3,
    largest_touch_distance: f64,
}

impl EntityPartitioning {
    /// Largest touch distance of any creature as of the last rebuild.
    #[must_use]
    pub fn largest_touch_distance(&self) -> f64 {
        self.largest_touch_distance
    }

    #[must_use]
    pub fn map_size(&self) -> UVec3 {
        self.map_size
    }

    /// Number of partitioned entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// `(chunk_index_3d, sub_cell)` of the bucket holding `entity`.
    #[must_use]
    pub fn bucket_of(&self, entity: Entity) -> Option<(u64, usize)> {
        self.locations.get(&entity).map(|&(chunk, cell, _)| (chunk, cell))
    }

    /// Every partitioned entity, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &PartitionedEntity> {
        self.chunks
            .values()
            .flat_map(|c| c.creatures.iter().chain(c.inanimate.iter()))
            .flatten()
    }

    /// Chunk and sub-cell for a position, or `None` outside the map.
    fn locate(&self, pos: DVec3) -> Option<(u64, usize)> {
        let size = self.map_size.as_dvec3();
        if !(pos.cmpge(DVec3::ZERO).all() && pos.cmplt(size).all()) {
            return None;
        }
        let block = pos.floor().as_ivec3();
        Some(self.cell_key(block.y / CHUNK_SIZE as i32, block.z / SUB_CELL_SIZE, block.x / SUB_CELL_SIZE))
    }

    /// Key for chunk row `cy` and global sub-cell column (`gz`, `gx`).
    fn cell_key(&self, cy: i32, gz: i32, gx: i32) -> (u64, usize) {
        let chunks = self.map_chunks.as_ivec3();
        let (cx, cz) = (gx / GRID_SIZE, gz / GRID_SIZE);
        let index3d = (cy * chunks.z + cz) * chunks.x + cx;
        let sub_cell = (gz % GRID_SIZE) * GRID_SIZE + gx % GRID_SIZE;
        (index3d as u64, sub_cell as usize)
    }

    fn insert(&mut self, e: PartitionedEntity) -> bool {
        let Some((chunk, cell)) = self.locate(e.pos) else {
            trace!("entity {:?} at {} is outside the map, not partitioned", e.entity, e.pos);
            return false;
        };
        self.chunks.entry(chunk).or_default().bucket_mut(e.kind, cell).push(e);
        self.locations.insert(e.entity, (chunk, cell, e.kind));
        true
    }

    /// Drop everything and re-bucket `entities` for a map of `map_size`
    /// blocks. Entities outside the map are skipped.
    pub fn rebuild(&mut self, map_size: UVec3, entities: impl IntoIterator<Item = PartitionedEntity>) {
        self.map_size = map_size;
        self.map_chunks = map_chunks(map_size);
        self.chunks.values_mut().for_each(ChunkPartition::clear);
        self.locations.clear();

        let mut largest = 0.0_f64;
        for e in entities {
            if self.insert(e) && e.kind == EntityKind::Creature {
                largest = largest.max(e.touch_distance);
            }
        }
        self.chunks.retain(|_, c| !c.is_empty());
        self.largest_touch_distance = largest;
    }

    /// Remove `entity` from whichever bucket holds it.
    pub fn remove(&mut self, entity: Entity) -> Option<PartitionedEntity> {
        let (chunk, cell, kind) = self.locations.remove(&entity)?;
        let bucket = self.chunks.get_mut(&chunk)?.bucket_mut(kind, cell);
        let idx = bucket.iter().position(|e| e.entity == entity)?;
        Some(bucket.swap_remove(idx))
    }

    /// Re-register one entity at its current position without a full
    /// rebuild. Returns whether it landed inside the map.
    pub fn repartition(&mut self, e: PartitionedEntity) -> bool {
        self.remove(e.entity);
        let inserted = self.insert(e);
        if inserted && e.kind == EntityKind::Creature {
            self.largest_touch_distance = self.largest_touch_distance.max(e.touch_distance);
        }
        inserted
    }

    /// Visit every `search` entity in `dimension` whose sub-cell overlaps the
    /// cube of half-size `radius` around `center`. With `exact`, only those
    /// within `radius` are visited. Stops when `callback` breaks.
    pub fn walk_range(
        &self,
        center: DVec3,
        radius: f64,
        dimension: i32,
        search: EntityKind,
        exact: bool,
        mut callback: impl FnMut(&PartitionedEntity) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        if self.chunks.is_empty() || !(radius >= 0.0) || !center.is_finite() {
            return ControlFlow::Continue(());
        }
        let upper = (self.map_size.as_dvec3() - 1.0).max(DVec3::ZERO);
        let min = (center - radius).max(DVec3::ZERO);
        let max = (center + radius).min(upper);
        if min.cmpgt(max).any() {
            return ControlFlow::Continue(());
        }

        let cell = IVec3::new(SUB_CELL_SIZE, CHUNK_SIZE as i32, SUB_CELL_SIZE);
        let lo = min.floor().as_ivec3() / cell;
        let hi = max.floor().as_ivec3() / cell;
        let radius_sq = radius * radius;

        for cy in lo.y..=hi.y {
            for gz in lo.z..=hi.z {
                for gx in lo.x..=hi.x {
                    let (chunk, sub_cell) = self.cell_key(cy, gz, gx);
                    let Some(partition) = self.chunks.get(&chunk) else {
                        continue;
                    };
                    for e in partition.bucket(search, sub_cell) {
                        if e.dimension != dimension {
                            continue;
                        }
                        if exact && !(e.pos.distance_squared(center) <= radius_sq) {
                            continue;
                        }
                        callback(e)?;
                    }
                }
            }
        }
        ControlFlow::Continue(())
    }

    /// Visit entities whose touch sphere reaches within `radius` of `center`.
    pub fn walk_touching(
        &self,
        center: DVec3,
        radius: f64,
        dimension: i32,
        search: EntityKind,
        mut callback: impl FnMut(&PartitionedEntity) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        let reach = radius + self.largest_touch_distance;
        self.walk_range(center, reach, dimension, search, false, |e| {
            let limit = radius + e.touch_distance;
            if e.pos.distance_squared(center) <= limit * limit {
                callback(e)
            } else {
                ControlFlow::Continue(())
            }
        })
    }

    /// Closest `search` entity within `radius` of `center` accepted by
    /// `matches`, or `None`.
    pub fn nearest_match(
        &self,
        center: DVec3,
        radius: f64,
        dimension: i32,
        search: EntityKind,
        mut matches: impl FnMut(&PartitionedEntity) -> bool,
    ) -> Option<PartitionedEntity> {
        let mut best: Option<(f64, PartitionedEntity)> = None;
        let _ = self.walk_range(center, radius, dimension, search, true, |e| {
            let dist = e.pos.distance_squared(center);
            if best.is_none_or(|(d, _)| dist < d) && matches(e) {
                best = Some((dist, *e));
            }
            ControlFlow::Continue(())
        });
        best.map(|(_, e)| e)
    }
}

/// Rebuild the partition index from every entity with a body.
#[allow(clippy::needless_pass_by_value)]
pub fn rebuild_entity_partitions(
    world: Res<World>,
    mut partitioning: ResMut<EntityPartitioning>,
    entities: Query<(Entity, &EntityPos, &PhysicsBody)>,
) {
    partitioning.rebuild(
        world.map_size(),
        entities.iter().map(|(entity, pos, body)| PartitionedEntity {
            entity,
            pos: pos.xyz,
            dimension: pos.dimension,
            touch_distance: body.touch_distance,
            kind: body.kind,
        }),
    );
}
