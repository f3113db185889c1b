//! Chunk column storage.
//!
//! A `Chunk` is one `CHUNK_SIZE x height x CHUNK_SIZE` column of block ids.
//! Physics never mutates chunks; it reads them through the world's
//! [`BlockAccessor`](crate::world::BlockAccessor).
//!
//! # Example
//! ```
//! use entity_physics::chunk::Chunk;
//!
//! let mut chunk = Chunk::new(64);
//! chunk.set(3, 10, 7, 1);
//! assert_eq!(chunk.get(3, 10, 7), 1);
//! assert_eq!(chunk.get(3, 11, 7), 0);
//! ```

use crate::block::{blocks, BlockId};

/// Edge length of a chunk in blocks. Also the partitioning chunk size.
pub const CHUNK_SIZE: usize = 32;

#[derive(Clone)]
pub struct Chunk {
    pub blocks: Vec<BlockId>,
    height: usize,
}

impl Chunk {
    /// Create a chunk filled with `AIR`.
    #[must_use]
    pub fn new(height: usize) -> Self {
        Chunk {
            blocks: vec![blocks::AIR; CHUNK_SIZE * height * CHUNK_SIZE],
            height,
        }
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Read a block id at local coordinates, `AIR` when out of range.
    #[must_use]
    pub fn get(&self, x: usize, y: usize, z: usize) -> BlockId {
        if x >= CHUNK_SIZE || y >= self.height || z >= CHUNK_SIZE {
            blocks::AIR
        } else {
            self.blocks[x + y * CHUNK_SIZE + z * CHUNK_SIZE * self.height]
        }
    }

    /// Write a block id at local coordinates; out-of-range writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, z: usize, block: BlockId) {
        if x < CHUNK_SIZE && y < self.height && z < CHUNK_SIZE {
            self.blocks[x + y * CHUNK_SIZE + z * CHUNK_SIZE * self.height] = block;
        }
    }
}
