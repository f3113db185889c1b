//! This module defines the `Block` physical description and the
//! `BlockRegistry` resource holding every loaded block.
//!
//! Blocks only carry what movement and collision need: collision boxes in
//! block-local `0..1` coordinates, climb/step flags, liquid level, solid
//! side flags and whether an entity may pass through the cell at all.
//!
//! Example:
//! ```rust
//! use entity_physics::block::registry::{Block, BlockRegistry};
//! use entity_physics::collision::Cuboidf;
//!
//! let mut registry = BlockRegistry::default();
//! let slab = Block {
//!     name: "slab".to_string(),
//!     id: 4,
//!     collision_boxes: vec![Cuboidf::new(0.0, 0.0, 0.0, 1.0, 0.5, 1.0)],
//!     ..Block::default()
//! };
//! registry.try_register(slab).unwrap();
//! assert_eq!(registry.id_for_name("slab"), Some(4));
//! ```

use super::{blocks, BlockFacing, BlockId};
use crate::collision::Cuboidf;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Highest liquid level; a full source block.
pub const MAX_LIQUID_LEVEL: u8 = 7;

/// Solid flags per face, indexed by `BlockFacing::index`.
pub type SideSolid = [bool; 6];

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("block id {id} is reserved")]
    ReservedId { id: BlockId },
    #[error("block id {id} is already used by '{existing}', cannot register '{name}'")]
    DuplicateId { id: BlockId, existing: String, name: String },
    #[error("block '{name}' has liquid level {level}, maximum is {MAX_LIQUID_LEVEL}")]
    LiquidLevel { name: String, level: u8 },
    #[error("block '{name}' has a collision box with min above max")]
    MalformedBox { name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub id: BlockId,

    /// Collision shape in block-local coordinates. Empty for air and liquids.
    #[serde(default = "Block::default_collision_boxes")]
    pub collision_boxes: Vec<Cuboidf>,
    #[serde(default)]
    pub climbable: bool, // Ladders, vines
    #[serde(default = "Block::default_can_step")]
    pub can_step: bool, // Entities may auto-step onto this block's boxes
    #[serde(default)]
    pub allow_step_when_stuck: bool,
    #[serde(default)]
    pub liquid_level: u8, // 0 = no liquid, 7 = full
    /// Explicit solid-side flags; derived from the collision boxes when absent.
    #[serde(default)]
    pub side_solid: Option<SideSolid>,
    #[serde(default = "Block::default_traversable")]
    pub traversable: bool, // Barriers set this to false
    #[serde(default)]
    pub entity_inside_events: bool, // Raise an event when an entity overlaps the cell
}

impl Block {
    fn default_collision_boxes() -> Vec<Cuboidf> { vec![Cuboidf::unit()] }
    fn default_can_step() -> bool { true }
    fn default_traversable() -> bool { true }

    /// The empty block.
    #[must_use]
    pub fn air() -> Self {
        Self {
            name: "air".to_string(),
            id: blocks::AIR,
            collision_boxes: Vec::new(),
            side_solid: Some([false; 6]),
            ..Self::default()
        }
    }

    /// Sentinel returned for cells in chunks that are not loaded.
    ///
    /// Solid and not traversable so nothing falls through or walks into
    /// terrain that has not arrived yet.
    #[must_use]
    pub fn unloaded() -> Self {
        Self {
            name: "__unloaded__".to_string(),
            id: blocks::UNLOADED,
            can_step: false,
            traversable: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_liquid(&self) -> bool {
        self.liquid_level > 0
    }

    #[must_use]
    pub fn is_air(&self) -> bool {
        self.id == blocks::AIR
    }

    /// Whether the given face is fully covered by a collision box.
    #[must_use]
    pub fn is_side_solid(&self, face: BlockFacing) -> bool {
        if let Some(flags) = self.side_solid {
            return flags[face.index()];
        }
        self.collision_boxes.iter().any(|b| {
            let spans_xz = b.x1 <= 0.0 && b.x2 >= 1.0 && b.z1 <= 0.0 && b.z2 >= 1.0;
            let spans_xy = b.x1 <= 0.0 && b.x2 >= 1.0 && b.y1 <= 0.0 && b.y2 >= 1.0;
            let spans_zy = b.z1 <= 0.0 && b.z2 >= 1.0 && b.y1 <= 0.0 && b.y2 >= 1.0;
            match face {
                BlockFacing::Up => spans_xz && b.y2 >= 1.0,
                BlockFacing::Down => spans_xz && b.y1 <= 0.0,
                BlockFacing::North => spans_xy && b.z1 <= 0.0,
                BlockFacing::South => spans_xy && b.z2 >= 1.0,
                BlockFacing::West => spans_zy && b.x1 <= 0.0,
                BlockFacing::East => spans_zy && b.x2 >= 1.0,
            }
        })
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.liquid_level > MAX_LIQUID_LEVEL {
            return Err(RegistryError::LiquidLevel { name: self.name.clone(), level: self.liquid_level });
        }
        if self.collision_boxes.iter().any(|b| !b.is_well_formed()) {
            return Err(RegistryError::MalformedBox { name: self.name.clone() });
        }
        Ok(())
    }
}

impl Default for Block {
    fn default() -> Self {
        Self {
            name: "stone".to_string(),
            id: blocks::DEFAULT,
            collision_boxes: Self::default_collision_boxes(),
            climbable: false,
            can_step: Self::default_can_step(),
            allow_step_when_stuck: false,
            liquid_level: 0,
            side_solid: None,
            traversable: Self::default_traversable(),
            entity_inside_events: false,
        }
    }
}

/// All known blocks, indexed by id for the per-cell lookups collision does.
#[derive(Resource, Clone)]
pub struct BlockRegistry {
    blocks: Vec<Option<Block>>,
    ids_by_name: HashMap<String, BlockId>,
}

impl Default for BlockRegistry {
    /// A registry holding only air and the unloaded sentinel.
    fn default() -> Self {
        let mut registry = Self {
            blocks: vec![None; usize::from(BlockId::MAX) + 1],
            ids_by_name: HashMap::new(),
        };
        registry.register(Block::air());
        registry.register(Block::unloaded());
        registry
    }
}

impl BlockRegistry {
    /// Insert a block, replacing whatever used its id before.
    pub fn register(&mut self, block: Block) {
        let slot = &mut self.blocks[usize::from(block.id)];
        if let Some(old) = slot.as_ref() {
            self.ids_by_name.remove(&old.name);
        }
        self.ids_by_name.insert(block.name.clone(), block.id);
        *slot = Some(block);
    }

    /// Validate and insert a block loaded from data.
    ///
    /// # Errors
    /// Rejects reserved ids, ids already taken by a differently named block,
    /// liquid levels above [`MAX_LIQUID_LEVEL`] and malformed boxes.
    pub fn try_register(&mut self, block: Block) -> Result<(), RegistryError> {
        if block.id == blocks::AIR || block.id == blocks::UNLOADED {
            return Err(RegistryError::ReservedId { id: block.id });
        }
        if let Some(existing) = self.get_by_id(block.id)
            && existing.name != block.name
        {
            return Err(RegistryError::DuplicateId {
                id: block.id,
                existing: existing.name.clone(),
                name: block.name,
            });
        }
        block.validate()?;
        self.register(block);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Block> {
        self.ids_by_name.get(name).and_then(|id| self.get_by_id(*id))
    }

    #[must_use]
    pub fn get_by_id(&self, id: BlockId) -> Option<&Block> {
        self.blocks[usize::from(id)].as_ref()
    }

    /// Lookup for hot paths: unknown ids resolve to the unloaded sentinel.
    #[must_use]
    pub fn block(&self, id: BlockId) -> &Block {
        self.get_by_id(id).unwrap_or_else(|| self.unloaded())
    }

    #[must_use]
    pub fn id_for_name(&self, name: &str) -> Option<BlockId> {
        self.ids_by_name.get(name).copied()
    }

    #[must_use]
    pub fn air(&self) -> &Block {
        self.blocks[usize::from(blocks::AIR)]
            .as_ref()
            .unwrap_or_else(|| unreachable!("air is registered on construction and cannot be replaced"))
    }

    #[must_use]
    pub fn unloaded(&self) -> &Block {
        self.blocks[usize::from(blocks::UNLOADED)]
            .as_ref()
            .unwrap_or_else(|| unreachable!("the unloaded sentinel is registered on construction"))
    }

    /// Number of registered blocks, including air and the sentinel.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids_by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids_by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, id: BlockId) -> Block {
        Block { name: name.to_string(), id, ..Block::default() }
    }

    #[test]
    fn default_registry_has_air_and_sentinel() {
        let r = BlockRegistry::default();
        assert!(r.air().collision_boxes.is_empty());
        assert!(!r.unloaded().traversable);
        assert_eq!(r.block(200).id, blocks::UNLOADED);
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn try_register_rejects_bad_data() {
        let mut r = BlockRegistry::default();
        assert_eq!(r.try_register(named("void", 0)), Err(RegistryError::ReservedId { id: 0 }));
        r.try_register(named("stone", 1)).unwrap();
        assert!(matches!(r.try_register(named("granite", 1)), Err(RegistryError::DuplicateId { .. })));

        let mut water = named("water", 2);
        water.liquid_level = 9;
        assert!(matches!(r.try_register(water), Err(RegistryError::LiquidLevel { .. })));

        let mut bent = named("bent", 3);
        bent.collision_boxes = vec![Cuboidf::new(1.0, 0.0, 0.0, 0.0, 1.0, 1.0)];
        assert!(matches!(r.try_register(bent), Err(RegistryError::MalformedBox { .. })));
    }

    #[test]
    fn re_registering_same_name_replaces() {
        let mut r = BlockRegistry::default();
        r.try_register(named("stone", 1)).unwrap();
        let mut climbable = named("stone", 1);
        climbable.climbable = true;
        r.try_register(climbable).unwrap();
        assert!(r.get("stone").unwrap().climbable);
    }

    #[test]
    fn side_solid_is_derived_from_boxes() {
        let slab = Block {
            collision_boxes: vec![Cuboidf::new(0.0, 0.0, 0.0, 1.0, 0.5, 1.0)],
            ..Block::default()
        };
        assert!(slab.is_side_solid(BlockFacing::Down));
        assert!(!slab.is_side_solid(BlockFacing::Up));
        assert!(!slab.is_side_solid(BlockFacing::North));
        assert!(Block::default().is_side_solid(BlockFacing::East));
        assert!(!Block::air().is_side_solid(BlockFacing::Up));
    }

    #[test]
    fn blocks_deserialize_with_defaults() {
        let src = "(name: \"water\", id: 9, collision_boxes: [], liquid_level: 7)";
        let b: Block = ron::from_str(src).unwrap();
        assert!(b.is_liquid());
        assert!(b.can_step);
        assert!(b.traversable);
        assert!(b.side_solid.is_none());
    }
}
