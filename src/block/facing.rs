use bevy::math::IVec3;
use serde::{Deserialize, Serialize};

/// One of the six faces of a block cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockFacing {
    North,
    East,
    South,
    West,
    Up,
    Down,
}

impl BlockFacing {
    pub const ALL: [BlockFacing; 6] = [
        BlockFacing::North,
        BlockFacing::East,
        BlockFacing::South,
        BlockFacing::West,
        BlockFacing::Up,
        BlockFacing::Down,
    ];

    /// The four faces around the Y axis, in the order climbing probes them.
    pub const HORIZONTALS: [BlockFacing; 4] =
        [BlockFacing::North, BlockFacing::East, BlockFacing::South, BlockFacing::West];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            BlockFacing::North => 0,
            BlockFacing::East => 1,
            BlockFacing::South => 2,
            BlockFacing::West => 3,
            BlockFacing::Up => 4,
            BlockFacing::Down => 5,
        }
    }

    /// Unit offset to the neighbouring cell. North is -Z, East is +X.
    #[must_use]
    pub const fn normal(self) -> IVec3 {
        match self {
            BlockFacing::North => IVec3::new(0, 0, -1),
            BlockFacing::East => IVec3::new(1, 0, 0),
            BlockFacing::South => IVec3::new(0, 0, 1),
            BlockFacing::West => IVec3::new(-1, 0, 0),
            BlockFacing::Up => IVec3::new(0, 1, 0),
            BlockFacing::Down => IVec3::new(0, -1, 0),
        }
    }

    #[must_use]
    pub const fn opposite(self) -> BlockFacing {
        match self {
            BlockFacing::North => BlockFacing::South,
            BlockFacing::East => BlockFacing::West,
            BlockFacing::South => BlockFacing::North,
            BlockFacing::West => BlockFacing::East,
            BlockFacing::Up => BlockFacing::Down,
            BlockFacing::Down => BlockFacing::Up,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_normals_cancel() {
        for f in BlockFacing::ALL {
            assert_eq!(f.normal() + f.opposite().normal(), IVec3::ZERO);
            assert_eq!(BlockFacing::ALL[f.index()], f);
        }
    }
}
