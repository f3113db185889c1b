//! Block types and helpers.
//!
//! Exposes the physical block description (`Block`), the `BlockRegistry`
//! resource and the loader/watcher used for hot-reloading block data from
//! RON files.
//!
//! Example:
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use entity_physics::block::loader as block_loader;
//!
//! let mut app = App::new();
//! app.insert_resource(block_loader::load_blocks_from_dir("data/blocks"));
//! let watcher = block_loader::setup_block_watcher("data/blocks")
//!     .unwrap_or_else(|_| block_loader::BlockWatcher::stub());
//! app.insert_resource(watcher);
//! app.add_systems(Update, block_loader::check_block_changes);
//! ```

mod facing;
pub use facing::BlockFacing;

/// Compact block identifier stored per cell in chunks.
pub type BlockId = u8;

/// Reserved block ids.
pub mod blocks {
    use super::BlockId;

    /// Empty space.
    pub const AIR: BlockId = 0;
    pub const DEFAULT: BlockId = 1;
    /// Sentinel for cells whose chunk is not loaded.
    pub const UNLOADED: BlockId = BlockId::MAX;
}

/// Loader/watchers for block RON files.
pub mod loader;

/// Block registry and related data structures.
pub mod registry;

pub use registry::{Block, BlockRegistry, RegistryError, SideSolid};
