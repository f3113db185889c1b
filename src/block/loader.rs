//! Block loader and watcher for loading block definitions from RON files
//! and reloading them when the files change.
//!
//! # Example
//! ```rust,no_run
//! use bevy::prelude::*;
//! use entity_physics::block::loader as block_loader;
//!
//! let mut app = App::new();
//! app.insert_resource(block_loader::load_blocks_from_dir("data/blocks"));
//! app.insert_resource(
//!     block_loader::setup_block_watcher("data/blocks")
//!         .unwrap_or_else(|_| block_loader::BlockWatcher::stub()),
//! );
//! app.add_systems(Update, block_loader::check_block_changes);
//! ```

use super::{Block, BlockRegistry};
use crate::ron_loader::{load_ron_files, setup_ron_watcher, RonWatcher};
use bevy::prelude::*;

/// Default location of block definitions.
pub const BLOCKS_DIR: &str = "data/blocks";

#[derive(Resource)]
pub struct BlockWatcher {
    pub watcher: RonWatcher,
    pub dir: String,
}

impl BlockWatcher {
    /// Create a stub `BlockWatcher` that does not have an active OS watcher.
    #[must_use]
    pub fn stub() -> Self {
        BlockWatcher { watcher: RonWatcher::stub(), dir: BLOCKS_DIR.to_string() }
    }
}

/// Load all block definitions from RON files in `path`.
///
/// Definitions that fail validation are skipped with a warning; air and the
/// unloaded sentinel are always present.
#[must_use]
pub fn load_blocks_from_dir(path: &str) -> BlockRegistry {
    let mut registry = BlockRegistry::default();
    let blocks: Vec<Block> = load_ron_files(path);
    let total = blocks.len();
    let mut loaded = 0usize;
    for block in blocks {
        match registry.try_register(block) {
            Ok(()) => loaded += 1,
            Err(e) => warn!("skipping block definition: {e}"),
        }
    }
    info!("loaded {loaded}/{total} block definitions from {path}");
    registry
}

/// Set up a file watcher on the block definition directory.
///
/// # Errors
/// Returns a `notify::Error` if the underlying file watcher could not be
/// created or configured.
pub fn setup_block_watcher(path: &str) -> Result<BlockWatcher, notify::Error> {
    setup_ron_watcher(path).map(|watcher| BlockWatcher { watcher, dir: path.to_string() })
}

/// Reload the `BlockRegistry` when the watched directory changes.
///
/// Collision shapes take effect on the next physics sub-step; nothing is
/// cached across ticks.
#[allow(clippy::needless_pass_by_value)]
pub fn check_block_changes(watcher: Res<BlockWatcher>, mut registry: ResMut<BlockRegistry>) {
    if watcher.watcher.take_changed() {
        info!("blocks changed, reloading from {}", watcher.dir);
        *registry = load_blocks_from_dir(&watcher.dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_definitions_are_skipped() {
        let dir = std::env::temp_dir().join(format!("entity_physics_blocks_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("stone.ron"), "(name: \"stone\", id: 1)").unwrap();
        std::fs::write(dir.join("ladder.ron"), "(name: \"ladder\", id: 5, climbable: true, collision_boxes: [(x1: 0.0, y1: 0.0, z1: 0.9, x2: 1.0, y2: 1.0, z2: 1.0)])").unwrap();
        std::fs::write(dir.join("void.ron"), "(name: \"void\", id: 0)").unwrap();

        let registry = load_blocks_from_dir(dir.to_str().unwrap());
        assert!(registry.get("stone").is_some());
        assert!(registry.get("ladder").unwrap().climbable);
        assert!(registry.get("void").is_none());
        assert_eq!(registry.air().name, "air");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
