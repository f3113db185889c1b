//! Entity physics components and entity type definitions.
//!
//! Every simulated entity carries:
//! * [`EntityPos`] - position, orientation and motion
//! * [`PhysicsBody`] - hitbox and movement capabilities
//! * [`EntityControls`] - what the entity's controller wants this tick
//! * [`PhysicsSnapshot`] - derived state published by the integrator
//!
//! Motion is stored in blocks per 1/60 s; one physics sub-step of `dt`
//! seconds displaces the entity by `motion * dt * 60`.
//!
//! # Example:
//!
//! ```
//! use entity_physics::entity::{EntityProperties, PhysicsBody};
//!
//! let props = EntityProperties::default();
//! let body = PhysicsBody::from_properties(&props).unwrap();
//! assert_eq!(body.collision_box, body.origin_collision_box);
//! ```

pub mod loader;

use crate::block::BlockFacing;
use crate::collision::Cuboidf;
use bevy::math::{DVec3, Vec3};
use bevy::prelude::Component;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which partition bucket an entity lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntityKind {
    #[default]
    Creature,
    /// Items, projectiles and other things most range queries skip.
    Inanimate,
}

/// Where an entity naturally moves. Decides when gravity applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Habitat {
    #[default]
    Land,
    /// Swims at the surface; ignores gravity while in liquid.
    Sea,
    /// Never affected by gravity.
    Air,
    /// Swims anywhere in liquid; ignores gravity while in liquid.
    Underwater,
}

impl Habitat {
    /// Whether gravity acts on an entity of this habitat.
    #[must_use]
    pub fn has_gravity(self, in_liquid: bool) -> bool {
        match self {
            Habitat::Land => true,
            Habitat::Air => false,
            Habitat::Sea | Habitat::Underwater => !in_liquid,
        }
    }
}

/// Which locomotor ordering an entity type uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LocomotionStyle {
    #[default]
    Creature,
    /// Camera-pitch swimming and gliding.
    Player,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct EntityPos {
    pub xyz: DVec3,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    /// Velocity in blocks per 1/60 s.
    pub motion: DVec3,
    pub dimension: i32,
}

impl EntityPos {
    #[must_use]
    pub fn at(xyz: DVec3) -> Self {
        Self { xyz, ..Self::default() }
    }
}

/// Controller input consumed by the locomotors.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct EntityControls {
    pub tries_to_move: bool,
    pub sneak: bool,
    pub sprint: bool,
    pub jump: bool,
    /// Desired walk acceleration per 1/60 s, world space.
    pub walk_vector: DVec3,
    pub gliding: bool,
    pub no_clip: bool,
}

/// Derived physical state. Only the integrator writes it, once at the end
/// of each update.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicsSnapshot {
    pub on_ground: bool,
    pub swimming: bool,
    pub feet_in_liquid: bool,
    pub collided: bool,
    pub collided_horizontally: bool,
    pub collided_vertically: bool,
    pub climbing: bool,
    pub stepping: bool,
    /// Face of the neighbouring block being climbed, `None` when climbing
    /// something in the entity's own column.
    pub climbing_on_face: Option<BlockFacing>,
}

impl PhysicsSnapshot {
    #[must_use]
    pub fn in_liquid(&self) -> bool {
        self.feet_in_liquid || self.swimming
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EntityTypeError {
    #[error("entity type '{name}' has a non-positive hitbox {width}x{height}")]
    InvalidHitbox { name: String, width: f32, height: f32 },
    #[error("entity type '{name}' has negative {field}: {value}")]
    Negative { name: String, field: &'static str, value: f32 },
}

/// Physics description of an entity type, loaded from `data/entities/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityProperties {
    pub name: String,
    #[serde(default)]
    pub kind: EntityKind,
    #[serde(default)]
    pub habitat: Habitat,
    #[serde(default)]
    pub locomotion: LocomotionStyle,
    #[serde(default = "EntityProperties::default_hitbox_width")]
    pub hitbox_width: f32,
    #[serde(default = "EntityProperties::default_hitbox_height")]
    pub hitbox_height: f32,
    /// Defaults to half the hitbox diagonal in the horizontal plane plus a margin.
    #[serde(default)]
    pub touch_distance: Option<f32>,
    #[serde(default = "EntityProperties::default_step_height")]
    pub step_height: f32,
    #[serde(default)]
    pub can_climb: bool, // Ladders and vines
    #[serde(default)]
    pub can_climb_anywhere: bool, // Any solid wall, spiders
    #[serde(default = "EntityProperties::default_climb_touch_distance")]
    pub climb_touch_distance: f32,
    /// Height above the feet checked for `swimming`. Defaults to half the hitbox.
    #[serde(default)]
    pub swimming_offset_y: Option<f32>,
    /// Hitbox shift applied while dead, for corpses lying on their side.
    #[serde(default)]
    pub dead_pose_offset: [f32; 3],
}

impl EntityProperties {
    fn default_hitbox_width() -> f32 { 0.6 }
    fn default_hitbox_height() -> f32 { 1.8 }
    fn default_step_height() -> f32 { 0.6 }
    fn default_climb_touch_distance() -> f32 { 0.1 }
}

impl Default for EntityProperties {
    fn default() -> Self {
        Self {
            name: "creature".to_string(),
            kind: EntityKind::default(),
            habitat: Habitat::default(),
            locomotion: LocomotionStyle::default(),
            hitbox_width: Self::default_hitbox_width(),
            hitbox_height: Self::default_hitbox_height(),
            touch_distance: None,
            step_height: Self::default_step_height(),
            can_climb: false,
            can_climb_anywhere: false,
            climb_touch_distance: Self::default_climb_touch_distance(),
            swimming_offset_y: None,
            dead_pose_offset: [0.0; 3],
        }
    }
}

#[derive(Component, Debug, Clone, PartialEq)]
pub struct PhysicsBody {
    /// Current hitbox, relative to `EntityPos::xyz`. May be shifted by pose.
    pub collision_box: Cuboidf,
    pub origin_collision_box: Cuboidf,
    pub kind: EntityKind,
    pub habitat: Habitat,
    pub alive: bool,
    pub touch_distance: f64,
    pub step_height: f64,
    pub can_climb: bool,
    pub can_climb_anywhere: bool,
    pub climb_touch_distance: f64,
    pub swimming_offset_y: f64,
    /// While set the entity is snapped here every sub-step.
    pub mounted_at: Option<DVec3>,
    pub pose_offset: Vec3,
}

impl PhysicsBody {
    /// Build a body from validated entity type properties.
    ///
    /// # Errors
    /// Returns [`EntityTypeError`] when the hitbox is not positive or a
    /// distance is negative.
    pub fn from_properties(props: &EntityProperties) -> Result<Self, EntityTypeError> {
        let (w, h) = (props.hitbox_width, props.hitbox_height);
        if !(w > 0.0 && h > 0.0) {
            return Err(EntityTypeError::InvalidHitbox { name: props.name.clone(), width: w, height: h });
        }
        let touch = props.touch_distance.unwrap_or(w * std::f32::consts::FRAC_1_SQRT_2 + 0.1);
        for (field, value) in [
            ("step_height", props.step_height),
            ("climb_touch_distance", props.climb_touch_distance),
            ("touch_distance", touch),
        ] {
            if value < 0.0 {
                return Err(EntityTypeError::Negative { name: props.name.clone(), field, value });
            }
        }

        let collision_box = Cuboidf::entity(w, h);
        Ok(Self {
            collision_box,
            origin_collision_box: collision_box,
            kind: props.kind,
            habitat: props.habitat,
            alive: true,
            touch_distance: f64::from(touch),
            step_height: f64::from(props.step_height),
            can_climb: props.can_climb,
            can_climb_anywhere: props.can_climb_anywhere,
            climb_touch_distance: f64::from(props.climb_touch_distance),
            swimming_offset_y: f64::from(props.swimming_offset_y.unwrap_or(h * 0.5)),
            mounted_at: None,
            pose_offset: Vec3::from_array(props.dead_pose_offset),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_from_defaults() {
        let body = PhysicsBody::from_properties(&EntityProperties::default()).unwrap();
        assert_eq!(body.collision_box, Cuboidf::entity(0.6, 1.8));
        assert!(body.alive);
        assert!((body.swimming_offset_y - 0.9).abs() < 1e-6);
        assert!(body.touch_distance > 0.5);
    }

    #[test]
    fn invalid_properties_are_rejected() {
        let flat = EntityProperties { hitbox_height: 0.0, ..EntityProperties::default() };
        assert!(matches!(PhysicsBody::from_properties(&flat), Err(EntityTypeError::InvalidHitbox { .. })));

        let nan = EntityProperties { hitbox_width: f32::NAN, ..EntityProperties::default() };
        assert!(PhysicsBody::from_properties(&nan).is_err());

        let sunk = EntityProperties { step_height: -0.5, ..EntityProperties::default() };
        assert_eq!(
            PhysicsBody::from_properties(&sunk),
            Err(EntityTypeError::Negative { name: "creature".into(), field: "step_height", value: -0.5 })
        );
    }

    #[test]
    fn habitat_gravity() {
        assert!(Habitat::Land.has_gravity(true));
        assert!(!Habitat::Air.has_gravity(false));
        assert!(Habitat::Sea.has_gravity(false));
        assert!(!Habitat::Underwater.has_gravity(true));
    }

    #[test]
    fn properties_deserialize_with_defaults() {
        let p: EntityProperties = ron::from_str("(name: \"spider\", can_climb_anywhere: true, hitbox_height: 0.9)").unwrap();
        assert!(p.can_climb_anywhere);
        assert_eq!(p.hitbox_width, 0.6);
        assert_eq!(p.kind, EntityKind::Creature);
    }
}
