//! Axis-aligned boxes used for entity hitboxes and block collision shapes.
//!
//! `Cuboidf` is the compact, serializable form used in block and entity
//! definitions (block-local or entity-local coordinates). `Cuboidd` is the
//! double-precision world-space form the collision tester works with.

use bevy::math::{DVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Overlaps thinner than this are treated as touching, not intersecting.
///
/// Positions are rebuilt every sub-step as `box_min - local_min`, which does
/// not round-trip exactly; without the tolerance an entity resting on a floor
/// can read as sunk into it by one ulp and get blocked sideways.
pub const COLLISION_EPSILON: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cuboidf {
    pub x1: f32,
    pub y1: f32,
    pub z1: f32,
    pub x2: f32,
    pub y2: f32,
    pub z2: f32,
}

impl Cuboidf {
    #[must_use]
    pub const fn new(x1: f32, y1: f32, z1: f32, x2: f32, y2: f32, z2: f32) -> Self {
        Self { x1, y1, z1, x2, y2, z2 }
    }

    /// The full `0..1` block cube.
    #[must_use]
    pub const fn unit() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0)
    }

    /// A box centred on the entity origin in X/Z, standing on it in Y.
    #[must_use]
    pub fn entity(width: f32, height: f32) -> Self {
        let hw = width / 2.0;
        Self::new(-hw, 0.0, -hw, hw, height, hw)
    }

    #[must_use]
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x1, self.y1, self.z1)
    }

    #[must_use]
    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x2, self.y2, self.z2)
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// True when every max coordinate is at least its min coordinate.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2 && self.z1 <= self.z2
    }

    #[must_use]
    pub fn offset(&self, d: Vec3) -> Self {
        Self::new(self.x1 + d.x, self.y1 + d.y, self.z1 + d.z, self.x2 + d.x, self.y2 + d.y, self.z2 + d.z)
    }

    /// Shrink (negative `by`) or grow on every side except the bottom.
    #[must_use]
    pub fn omni_not_down_grow_by(&self, by: f32) -> Self {
        Self::new(self.x1 - by, self.y1, self.z1 - by, self.x2 + by, self.y2 + by, self.z2 + by)
    }
}

impl Default for Cuboidf {
    fn default() -> Self {
        Self::unit()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cuboidd {
    pub x1: f64,
    pub y1: f64,
    pub z1: f64,
    pub x2: f64,
    pub y2: f64,
    pub z2: f64,
}

impl Cuboidd {
    #[must_use]
    pub const fn new(x1: f64, y1: f64, z1: f64, x2: f64, y2: f64, z2: f64) -> Self {
        Self { x1, y1, z1, x2, y2, z2 }
    }

    #[must_use]
    pub fn from_min_max(min: DVec3, max: DVec3) -> Self {
        Self::new(min.x, min.y, min.z, max.x, max.y, max.z)
    }

    /// Place a local box at `origin` in world space.
    #[must_use]
    pub fn from_local(local: &Cuboidf, origin: DVec3) -> Self {
        Self::new(
            origin.x + f64::from(local.x1),
            origin.y + f64::from(local.y1),
            origin.z + f64::from(local.z1),
            origin.x + f64::from(local.x2),
            origin.y + f64::from(local.y2),
            origin.z + f64::from(local.z2),
        )
    }

    #[must_use]
    pub fn min(&self) -> DVec3 {
        DVec3::new(self.x1, self.y1, self.z1)
    }

    #[must_use]
    pub fn max(&self) -> DVec3 {
        DVec3::new(self.x2, self.y2, self.z2)
    }

    pub fn translate(&mut self, d: DVec3) {
        self.x1 += d.x;
        self.y1 += d.y;
        self.z1 += d.z;
        self.x2 += d.x;
        self.y2 += d.y;
        self.z2 += d.z;
    }

    #[must_use]
    pub fn offset_copy(&self, d: DVec3) -> Self {
        let mut c = *self;
        c.translate(d);
        c
    }

    /// Smallest box containing both `self` and `self` moved by `delta`.
    #[must_use]
    pub fn swept(&self, delta: DVec3) -> Self {
        Self::new(
            self.x1.min(self.x1 + delta.x),
            self.y1.min(self.y1 + delta.y),
            self.z1.min(self.z1 + delta.z),
            self.x2.max(self.x2 + delta.x),
            self.y2.max(self.y2 + delta.y),
            self.z2.max(self.z2 + delta.z),
        )
    }

    #[must_use]
    pub fn grow_by(&self, by: f64) -> Self {
        Self::new(self.x1 - by, self.y1 - by, self.z1 - by, self.x2 + by, self.y2 + by, self.z2 + by)
    }

    fn overlaps_x(&self, o: &Self) -> bool {
        self.x2 > o.x1 + COLLISION_EPSILON && self.x1 < o.x2 - COLLISION_EPSILON
    }

    fn overlaps_y(&self, o: &Self) -> bool {
        self.y2 > o.y1 + COLLISION_EPSILON && self.y1 < o.y2 - COLLISION_EPSILON
    }

    fn overlaps_z(&self, o: &Self) -> bool {
        self.z2 > o.z1 + COLLISION_EPSILON && self.z1 < o.z2 - COLLISION_EPSILON
    }

    /// Strict intersection; boxes that only touch do not intersect.
    #[must_use]
    pub fn intersects(&self, o: &Self) -> bool {
        self.overlaps_x(o) && self.overlaps_y(o) && self.overlaps_z(o)
    }

    /// Clamp `dx`, the X motion of `from`, so it stops at this box's face.
    #[must_use]
    pub fn push_out_x(&self, from: &Self, dx: f64) -> f64 {
        if !(from.overlaps_y(self) && from.overlaps_z(self)) {
            return dx;
        }
        if dx > 0.0 && from.x2 <= self.x1 + COLLISION_EPSILON {
            dx.min((self.x1 - from.x2).max(0.0))
        } else if dx < 0.0 && from.x1 >= self.x2 - COLLISION_EPSILON {
            dx.max((self.x2 - from.x1).min(0.0))
        } else {
            dx
        }
    }

    #[must_use]
    pub fn push_out_y(&self, from: &Self, dy: f64) -> f64 {
        if !(from.overlaps_x(self) && from.overlaps_z(self)) {
            return dy;
        }
        if dy > 0.0 && from.y2 <= self.y1 + COLLISION_EPSILON {
            dy.min((self.y1 - from.y2).max(0.0))
        } else if dy < 0.0 && from.y1 >= self.y2 - COLLISION_EPSILON {
            dy.max((self.y2 - from.y1).min(0.0))
        } else {
            dy
        }
    }

    #[must_use]
    pub fn push_out_z(&self, from: &Self, dz: f64) -> f64 {
        if !(from.overlaps_x(self) && from.overlaps_y(self)) {
            return dz;
        }
        if dz > 0.0 && from.z2 <= self.z1 + COLLISION_EPSILON {
            dz.min((self.z1 - from.z2).max(0.0))
        } else if dz < 0.0 && from.z1 >= self.z2 - COLLISION_EPSILON {
            dz.max((self.z2 - from.z1).min(0.0))
        } else {
            dz
        }
    }

    /// Euclidean gap between two boxes, zero when they touch or overlap.
    #[must_use]
    pub fn shortest_distance_from(&self, o: &Self) -> f64 {
        let gap = |a1: f64, a2: f64, b1: f64, b2: f64| (b1 - a2).max(a1 - b2).max(0.0);
        let dx = gap(self.x1, self.x2, o.x1, o.x2);
        let dy = gap(self.y1, self.y2, o.y1, o.y2);
        let dz = gap(self.z1, self.z2, o.z1, o.z2);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}
