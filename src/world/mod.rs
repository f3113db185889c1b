//! World storage and block access.
//!
//! `World` holds loaded chunk columns keyed by `(chunk_x, chunk_z)` inside a
//! fixed map size. [`BlockAccessor`] is the read-only view physics and
//! partitioning consume; [`WorldBlocks`] implements it over a `World` and
//! the `BlockRegistry`.
//!
//! # Example:
//!
//! ```
//! use bevy::math::{IVec3, UVec3};
//! use entity_physics::block::BlockRegistry;
//! use entity_physics::world::{BlockAccessor, World, WorldBlocks};
//!
//! let mut world = World::new(UVec3::new(64, 64, 64));
//! world.set_block(10, 5, 12, 1);
//! let registry = BlockRegistry::default();
//! let blocks = WorldBlocks::new(&world, &registry);
//! assert!(blocks.is_valid_pos(IVec3::new(10, 5, 12)));
//! ```

use crate::block::{blocks, Block, BlockId, BlockRegistry};
use crate::chunk::{Chunk, CHUNK_SIZE};
use bevy::math::{DVec3, IVec3, UVec3};
use bevy::prelude::Resource;
use std::collections::HashMap;

#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
const CHUNK_SIZE_I32: i32 = CHUNK_SIZE as i32;

/// Read-only block view used by collision and partitioning.
///
/// Implementations must not fail for unloaded areas: they return a solid,
/// non-traversable sentinel block instead.
pub trait BlockAccessor {
    /// The block occupying the cell at `pos`.
    fn block_at(&self, pos: IVec3) -> &Block;

    /// Map extent in blocks. Valid cells are `0..size` on every axis.
    fn map_size(&self) -> UVec3;

    fn is_valid_pos(&self, pos: IVec3) -> bool {
        let size = self.map_size().as_ivec3();
        pos.cmpge(IVec3::ZERO).all() && pos.cmplt(size).all()
    }

    /// Cells an entity may never move into: beside or below the map, or
    /// barriers. Cells above the build height are open air.
    fn is_not_traversable(&self, pos: IVec3) -> bool {
        let size = self.map_size().as_ivec3();
        let outside = pos.x < 0 || pos.z < 0 || pos.y < 0 || pos.x >= size.x || pos.z >= size.z;
        outside || !self.block_at(pos).traversable
    }

    /// The block containing the world-space point `pos`.
    fn block_at_point(&self, pos: DVec3) -> &Block {
        self.block_at(block_pos(pos))
    }
}

/// The cell containing a world-space point.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn block_pos(pos: DVec3) -> IVec3 {
    pos.floor().as_ivec3()
}

/// The `World` resource holds loaded chunk columns.
///
/// # Fields
/// * `chunks` - mapping from chunk coordinates to `Chunk` data
#[derive(Resource)]
pub struct World {
    pub chunks: HashMap<(i32, i32), Chunk>,
    map_size: UVec3,
}

impl World {
    /// Create an empty world of the given size in blocks.
    #[must_use]
    pub fn new(map_size: UVec3) -> Self {
        World { chunks: HashMap::new(), map_size }
    }

    #[must_use]
    pub fn map_size(&self) -> UVec3 {
        self.map_size
    }

    /// Number of chunks along each axis (rounded up).
    #[must_use]
    pub fn map_chunks(&self) -> UVec3 {
        map_chunks(self.map_size)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn split(&self, x: i32, y: i32, z: i32) -> Option<((i32, i32), usize, usize, usize)> {
        let size = self.map_size.as_ivec3();
        if x < 0 || z < 0 || y < 0 || x >= size.x || z >= size.z || y >= size.y {
            return None;
        }
        let key = (x.div_euclid(CHUNK_SIZE_I32), z.div_euclid(CHUNK_SIZE_I32));
        let lx = x.rem_euclid(CHUNK_SIZE_I32).unsigned_abs() as usize;
        let lz = z.rem_euclid(CHUNK_SIZE_I32).unsigned_abs() as usize;
        Some((key, lx, y.unsigned_abs() as usize, lz))
    }

    /// Get the block id at world coordinates.
    ///
    /// Cells above the build height are `AIR`. Cells below the map, outside
    /// it horizontally, or in a chunk that is not loaded are `UNLOADED`.
    #[must_use]
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> BlockId {
        if y >= self.map_size.as_ivec3().y && x >= 0 && z >= 0 {
            return blocks::AIR;
        }
        match self.split(x, y, z) {
            Some((key, lx, ly, lz)) => self.chunks.get(&key).map_or(blocks::UNLOADED, |c| c.get(lx, ly, lz)),
            None => blocks::UNLOADED,
        }
    }

    /// Set a block at world coordinates, loading an empty chunk if needed.
    ///
    /// # Return
    /// * `Option<(i32, i32)>` - the chunk modified, or `None` when the
    ///   coordinates are outside the map
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: BlockId) -> Option<(i32, i32)> {
        let (key, lx, ly, lz) = self.split(x, y, z)?;
        let height = self.map_size.y as usize;
        self.chunks.entry(key).or_insert_with(|| Chunk::new(height)).set(lx, ly, lz, block);
        Some(key)
    }

    /// Load an all-air chunk column if none is present.
    pub fn load_empty_chunk(&mut self, chunk_x: i32, chunk_z: i32) {
        let height = self.map_size.y as usize;
        self.chunks.entry((chunk_x, chunk_z)).or_insert_with(|| Chunk::new(height));
    }

    /// Fill the inclusive cell range `min..=max` with `block`.
    pub fn fill(&mut self, min: IVec3, max: IVec3, block: BlockId) {
        for x in min.x..=max.x {
            for z in min.z..=max.z {
                for y in min.y..=max.y {
                    self.set_block(x, y, z, block);
                }
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(UVec3::new(1024, 256, 1024))
    }
}

/// Number of chunks needed to cover `map_size` along each axis.
#[must_use]
pub fn map_chunks(map_size: UVec3) -> UVec3 {
    let cs = CHUNK_SIZE as u32;
    (map_size + UVec3::splat(cs - 1)) / cs
}

/// [`BlockAccessor`] over a `World` and the registry that names its ids.
pub struct WorldBlocks<'a> {
    pub world: &'a World,
    pub registry: &'a BlockRegistry,
}

impl<'a> WorldBlocks<'a> {
    #[must_use]
    pub fn new(world: &'a World, registry: &'a BlockRegistry) -> Self {
        Self { world, registry }
    }
}

impl BlockAccessor for WorldBlocks<'_> {
    #[inline]
    fn block_at(&self, pos: IVec3) -> &Block {
        self.registry.block(self.world.get_block(pos.x, pos.y, pos.z))
    }

    fn map_size(&self) -> UVec3 {
        self.world.map_size
    }
}
