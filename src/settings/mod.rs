//! Settings, types and defaults.
//!
//! Settings are stored as a RON file under `data/settings/` and are hot-reloadable
//! using the existing RON watcher utilities (see `ron::setup_ron_watcher`).
//! Every field has a serde default so a partial file only overrides what it names.
//!
//! Motion-valued fields are in blocks per 1/60 s; per-second fields say so.
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsSettings {
    #[serde(default = "PhysicsSettings::default_fixed_step")]
    pub fixed_step: f64, // Seconds per physics sub-step.
    #[serde(default = "PhysicsSettings::default_max_accumulator")]
    pub max_accumulator: f64, // Most unsimulated time carried into one update, in seconds.
    #[serde(default = "PhysicsSettings::default_max_motion_per_step")]
    pub max_motion_per_step: f64, // Per-axis motion clamp applied before collision.
    #[serde(default = "PhysicsSettings::default_collision_padding")]
    pub collision_padding: f64, // Extra blocks around the swept hitbox scanned for collision boxes.
    #[serde(default = "PhysicsSettings::default_gravity")]
    pub gravity: f64, // Motion lost per second while falling.
    #[serde(default = "PhysicsSettings::default_liquid_gravity_factor")]
    pub liquid_gravity_factor: f64, // Gravity multiplier while in liquid.
    #[serde(default = "PhysicsSettings::default_ground_drag")]
    pub ground_drag: f64, // Fraction of horizontal motion lost per 1/60 s on the ground.
    #[serde(default = "PhysicsSettings::default_air_drag")]
    pub air_drag: f64, // Fraction of motion lost per 1/60 s in the air.
    #[serde(default = "PhysicsSettings::default_liquid_drag")]
    pub liquid_drag: f64, // Fraction of motion lost per 1/60 s in liquid.
}

impl PhysicsSettings {
    fn default_fixed_step() -> f64 { 1.0 / 60.0 }
    fn default_max_accumulator() -> f64 { 1.0 }
    fn default_max_motion_per_step() -> f64 { 10.0 }
    fn default_collision_padding() -> f64 { 0.1 }
    fn default_gravity() -> f64 { 0.37 }
    fn default_liquid_gravity_factor() -> f64 { 0.33 }
    fn default_ground_drag() -> f64 { 0.3 }
    fn default_air_drag() -> f64 { 0.02 }
    fn default_liquid_drag() -> f64 { 0.15 }
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            fixed_step: Self::default_fixed_step(),
            max_accumulator: Self::default_max_accumulator(),
            max_motion_per_step: Self::default_max_motion_per_step(),
            collision_padding: Self::default_collision_padding(),
            gravity: Self::default_gravity(),
            liquid_gravity_factor: Self::default_liquid_gravity_factor(),
            ground_drag: Self::default_ground_drag(),
            air_drag: Self::default_air_drag(),
            liquid_drag: Self::default_liquid_drag(),
        }
    }
}

/// Tuning for the locomotors and the climb/swim helpers of the integrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocomotionSettings {
    #[serde(default = "LocomotionSettings::default_sprint_multiplier")]
    pub sprint_multiplier: f64,
    #[serde(default = "LocomotionSettings::default_sneak_multiplier")]
    pub sneak_multiplier: f64,
    #[serde(default = "LocomotionSettings::default_jump_strength")]
    pub jump_strength: f64, // Upward motion set on jump.
    #[serde(default = "LocomotionSettings::default_jump_cooldown")]
    pub jump_cooldown: f64, // Seconds between jumps.
    #[serde(default = "LocomotionSettings::default_air_move_factor")]
    pub air_move_factor: f64, // Walk vector multiplier while airborne.
    #[serde(default = "LocomotionSettings::default_liquid_move_factor")]
    pub liquid_move_factor: f64, // Walk vector multiplier while in liquid.
    #[serde(default = "LocomotionSettings::default_swim_up_speed")]
    pub swim_up_speed: f64, // Upward motion added per 1/60 s when jumping in liquid.
    #[serde(default = "LocomotionSettings::default_liquid_buoyancy")]
    pub liquid_buoyancy: f64, // Upward motion gained per second while swimming.
    #[serde(default = "LocomotionSettings::default_swim_out_speed")]
    pub swim_out_speed: f64, // Upward motion when swimming against a wall.
    #[serde(default = "LocomotionSettings::default_climb_speed")]
    pub climb_speed: f64, // Upward motion while pushing into a climbable block.
    #[serde(default = "LocomotionSettings::default_climb_down_speed")]
    pub climb_down_speed: f64, // Descent speed while sneaking on a climbable block.
    #[serde(default = "LocomotionSettings::default_climb_jump_nudge")]
    pub climb_jump_nudge: f64, // Upward motion per 1/60 s when jumping while climbing.
    #[serde(default = "LocomotionSettings::default_glide_speed")]
    pub glide_speed: f64, // Forward motion added per 1/60 s while gliding.
    #[serde(default = "LocomotionSettings::default_glide_sink_speed")]
    pub glide_sink_speed: f64, // Fastest descent while gliding.
}

impl LocomotionSettings {
    fn default_sprint_multiplier() -> f64 { 1.3 }
    fn default_sneak_multiplier() -> f64 { 0.3 }
    fn default_jump_strength() -> f64 { 0.12 }
    fn default_jump_cooldown() -> f64 { 0.3 }
    fn default_air_move_factor() -> f64 { 0.15 }
    fn default_liquid_move_factor() -> f64 { 0.5 }
    fn default_swim_up_speed() -> f64 { 0.005 }
    fn default_liquid_buoyancy() -> f64 { 0.15 }
    fn default_swim_out_speed() -> f64 { 0.04 }
    fn default_climb_speed() -> f64 { 0.04 }
    fn default_climb_down_speed() -> f64 { 0.07 }
    fn default_climb_jump_nudge() -> f64 { 0.035 }
    fn default_glide_speed() -> f64 { 0.01 }
    fn default_glide_sink_speed() -> f64 { 0.04 }
}

impl Default for LocomotionSettings {
    fn default() -> Self {
        Self {
            sprint_multiplier: Self::default_sprint_multiplier(),
            sneak_multiplier: Self::default_sneak_multiplier(),
            jump_strength: Self::default_jump_strength(),
            jump_cooldown: Self::default_jump_cooldown(),
            air_move_factor: Self::default_air_move_factor(),
            liquid_move_factor: Self::default_liquid_move_factor(),
            swim_up_speed: Self::default_swim_up_speed(),
            liquid_buoyancy: Self::default_liquid_buoyancy(),
            swim_out_speed: Self::default_swim_out_speed(),
            climb_speed: Self::default_climb_speed(),
            climb_down_speed: Self::default_climb_down_speed(),
            climb_jump_nudge: Self::default_climb_jump_nudge(),
            glide_speed: Self::default_glide_speed(),
            glide_sink_speed: Self::default_glide_sink_speed(),
        }
    }
}

/// Creature-to-creature pushing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepulseSettings {
    #[serde(default = "RepulseSettings::default_enabled")]
    pub enabled: bool,
    #[serde(default = "RepulseSettings::default_strength")]
    pub strength: f64, // Motion per 1/60 s at full overlap.
    #[serde(default = "RepulseSettings::default_max_push")]
    pub max_push: f64, // Cap on the summed push per 1/60 s.
}

impl RepulseSettings {
    fn default_enabled() -> bool { true }
    fn default_strength() -> f64 { 0.01 }
    fn default_max_push() -> f64 { 0.03 }
}

impl Default for RepulseSettings {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            strength: Self::default_strength(),
            max_push: Self::default_max_push(),
        }
    }
}

/// Top-level Settings
#[derive(Resource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub physics: PhysicsSettings,
    #[serde(default)]
    pub locomotion: LocomotionSettings,
    #[serde(default)]
    pub repulse: RepulseSettings,
}

impl Settings {
    #[must_use]
    pub fn defaults() -> Self { Settings::default() }

    /// Descriptions for each setting, grouped by section, for tooling that
    /// edits the RON file.
    ///
    /// # Return
    /// A nested `HashMap` where the first level keys are section names (e.g. "physics")
    /// and the second level maps setting field names to their descriptions.
    #[must_use]
    pub fn field_descriptions() -> std::collections::HashMap<&'static str, std::collections::HashMap<&'static str, &'static str>> {
        use std::collections::HashMap;
        let mut out: HashMap<&'static str, HashMap<&'static str, &'static str>> = HashMap::new();

        out.insert("physics", HashMap::from([
            ("fixed_step", "Seconds per physics sub-step."),
            ("max_accumulator", "Most unsimulated time carried into one update, in seconds."),
            ("max_motion_per_step", "Per-axis motion clamp applied before collision."),
            ("collision_padding", "Extra blocks around the swept hitbox scanned for collision boxes."),
            ("gravity", "Motion lost per second while falling."),
            ("liquid_gravity_factor", "Gravity multiplier while in liquid."),
            ("ground_drag", "Fraction of horizontal motion lost per 1/60 s on the ground."),
            ("air_drag", "Fraction of motion lost per 1/60 s in the air."),
            ("liquid_drag", "Fraction of motion lost per 1/60 s in liquid."),
        ]));

        out.insert("locomotion", HashMap::from([
            ("sprint_multiplier", "Walk vector multiplier while sprinting."),
            ("sneak_multiplier", "Walk vector multiplier while sneaking."),
            ("jump_strength", "Upward motion set on jump."),
            ("jump_cooldown", "Seconds between jumps."),
            ("air_move_factor", "Walk vector multiplier while airborne."),
            ("liquid_move_factor", "Walk vector multiplier while in liquid."),
            ("swim_up_speed", "Upward motion added per 1/60 s when jumping in liquid."),
            ("liquid_buoyancy", "Upward motion gained per second while swimming."),
            ("swim_out_speed", "Upward motion when swimming against a wall."),
            ("climb_speed", "Upward motion while pushing into a climbable block."),
            ("climb_down_speed", "Descent speed while sneaking on a climbable block."),
            ("climb_jump_nudge", "Upward motion per 1/60 s when jumping while climbing."),
            ("glide_speed", "Forward motion added per 1/60 s while gliding."),
            ("glide_sink_speed", "Fastest descent while gliding."),
        ]));

        out.insert("repulse", HashMap::from([
            ("enabled", "Push overlapping creatures apart."),
            ("strength", "Motion per 1/60 s at full overlap."),
            ("max_push", "Cap on the summed push per 1/60 s."),
        ]));

        out
    }
}

pub mod loader;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let s: Settings = ron::from_str("(physics: (gravity: 0.5), repulse: (enabled: false))").unwrap();
        assert_eq!(s.physics.gravity, 0.5);
        assert_eq!(s.physics.fixed_step, 1.0 / 60.0);
        assert!(!s.repulse.enabled);
        assert_eq!(s.locomotion, LocomotionSettings::default());
    }

    #[test]
    fn every_field_is_described() {
        let d = Settings::field_descriptions();
        assert_eq!(d["physics"].len(), 9);
        assert_eq!(d["locomotion"].len(), 14);
        assert_eq!(d["repulse"].len(), 3);
    }
}
