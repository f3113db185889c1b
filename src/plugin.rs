//! Bevy wiring for entity physics.
//!
//! [`EntityPhysicsPlugin`] loads settings, block definitions and entity types
//! from the data directory, inserts the partition index and block world, and
//! schedules the per-tick work:
//!
//! * `PreUpdate`: `rebuild_entity_partitions`
//! * `Update`: `repulse_agents` then `integrate_entity_physics`
//! * `Update`: the hot-reload checks for every watched directory
//!
//! Integrator callbacks are forwarded as [`EntityPhysicsEvent`]s.

use crate::behavior::repulse::repulse_agents;
use crate::block::loader::{check_block_changes, load_blocks_from_dir, setup_block_watcher, BlockWatcher};
use crate::block::{Block, BlockId, BlockRegistry};
use crate::entity::loader::{
    check_entity_type_changes, load_entity_types_from_dir, setup_entity_type_watcher, EntityTypeWatcher,
};
use crate::entity::{EntityControls, EntityPos, EntityProperties, EntityTypeError, PhysicsBody, PhysicsSnapshot};
use crate::partition::{rebuild_entity_partitions, EntityPartitioning};
use crate::physics::{ControlledPhysics, PhysicsEntity, PhysicsEnv, PhysicsEvents};
use crate::settings::loader::{check_settings_changes, load_settings_from_dir, setup_settings_watcher, SettingsWatcher};
use crate::settings::{PhysicsSettings, Settings};
use crate::world::{World, WorldBlocks};
use bevy::app::{App, Plugin, PreUpdate, Update};
use bevy::math::{DVec3, IVec3};
use bevy::prelude::{
    info, warn, Bundle, Entity, Event, EventWriter, IntoSystemConfigs, Query, Res, Time,
};

/// What happened to an entity during its physics update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhysicsEventKind {
    FellToGround { prev_motion_y: f64 },
    EnteredLiquid,
    ExitedLiquid,
    /// The hitbox overlaps a block that asked for inside events.
    Inside { pos: IVec3, block: BlockId },
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct EntityPhysicsEvent {
    pub entity: Entity,
    pub kind: PhysicsEventKind,
}

/// Collects one entity's callbacks into a shared buffer.
struct EventSink<'a> {
    entity: Entity,
    out: &'a mut Vec<EntityPhysicsEvent>,
}

impl EventSink<'_> {
    fn push(&mut self, kind: PhysicsEventKind) {
        self.out.push(EntityPhysicsEvent { entity: self.entity, kind });
    }
}

impl PhysicsEvents for EventSink<'_> {
    fn on_fall_to_ground(&mut self, prev_motion_y: f64) {
        self.push(PhysicsEventKind::FellToGround { prev_motion_y });
    }

    fn on_collide_with_liquid(&mut self) {
        self.push(PhysicsEventKind::EnteredLiquid);
    }

    fn on_exited_liquid(&mut self) {
        self.push(PhysicsEventKind::ExitedLiquid);
    }

    fn on_entity_inside(&mut self, pos: IVec3, block: &Block) {
        if block.entity_inside_events {
            self.push(PhysicsEventKind::Inside { pos, block: block.id });
        }
    }
}

/// Everything an entity needs to be simulated.
#[derive(Bundle)]
pub struct EntityPhysicsBundle {
    pub pos: EntityPos,
    pub body: PhysicsBody,
    pub controls: EntityControls,
    pub snapshot: PhysicsSnapshot,
    pub physics: ControlledPhysics,
}

impl EntityPhysicsBundle {
    /// Bundle for an entity of type `props` standing at `xyz`.
    ///
    /// # Errors
    /// Returns [`EntityTypeError`] if `props` does not describe a valid body.
    pub fn new(props: &EntityProperties, xyz: DVec3, settings: &PhysicsSettings) -> Result<Self, EntityTypeError> {
        Ok(Self {
            pos: EntityPos::at(xyz),
            body: PhysicsBody::from_properties(props)?,
            controls: EntityControls::default(),
            snapshot: PhysicsSnapshot::default(),
            physics: ControlledPhysics::for_style(props.locomotion, settings),
        })
    }
}

/// Run every entity's integrator for this frame's time.
#[allow(clippy::needless_pass_by_value)]
pub fn integrate_entity_physics(
    time: Res<Time>,
    settings: Res<Settings>,
    world: Res<World>,
    registry: Res<BlockRegistry>,
    mut bodies: Query<(
        Entity,
        &mut ControlledPhysics,
        &mut EntityPos,
        &mut PhysicsBody,
        &EntityControls,
        &mut PhysicsSnapshot,
    )>,
    mut events: EventWriter<EntityPhysicsEvent>,
) {
    let blocks = WorldBlocks::new(&world, &registry);
    let env = PhysicsEnv::new(&blocks, &settings);
    let dt = time.delta_seconds_f64();

    let mut fired = Vec::new();
    for (entity, mut physics, mut pos, mut body, controls, mut snapshot) in &mut bodies {
        let mut sink = EventSink { entity, out: &mut fired };
        let mut view = PhysicsEntity { pos: &mut *pos, body: &mut *body, controls, snapshot: &mut *snapshot };
        physics.update(dt, &env, &mut view, &mut sink);
    }
    if !fired.is_empty() {
        events.send_batch(fired);
    }
}

/// Loads data from `data_dir` and schedules partitioning, repulsion and
/// physics.
pub struct EntityPhysicsPlugin {
    /// Holds `settings/`, `blocks/` and `entities/`.
    pub data_dir: String,
    pub hot_reload: bool,
}

impl Default for EntityPhysicsPlugin {
    fn default() -> Self {
        Self { data_dir: "data".to_string(), hot_reload: true }
    }
}

impl EntityPhysicsPlugin {
    fn dir(&self, sub: &str) -> String {
        format!("{}/{sub}", self.data_dir)
    }
}

impl Plugin for EntityPhysicsPlugin {
    fn build(&self, app: &mut App) {
        let (settings_dir, blocks_dir, entities_dir) = (self.dir("settings"), self.dir("blocks"), self.dir("entities"));

        app.insert_resource(load_settings_from_dir(&settings_dir))
            .insert_resource(load_blocks_from_dir(&blocks_dir))
            .insert_resource(load_entity_types_from_dir(&entities_dir))
            .init_resource::<World>()
            .init_resource::<EntityPartitioning>()
            .add_event::<EntityPhysicsEvent>();

        if self.hot_reload {
            app.insert_resource(setup_settings_watcher(&settings_dir).unwrap_or_else(|e| {
                warn!("settings hot reload disabled: {e}");
                SettingsWatcher::stub()
            }))
            .insert_resource(setup_block_watcher(&blocks_dir).unwrap_or_else(|e| {
                warn!("block hot reload disabled: {e}");
                BlockWatcher::stub()
            }))
            .insert_resource(setup_entity_type_watcher(&entities_dir).unwrap_or_else(|e| {
                warn!("entity type hot reload disabled: {e}");
                EntityTypeWatcher::stub()
            }));
        } else {
            app.insert_resource(SettingsWatcher::stub())
                .insert_resource(BlockWatcher::stub())
                .insert_resource(EntityTypeWatcher::stub());
        }

        app.add_systems(PreUpdate, rebuild_entity_partitions)
            .add_systems(Update, (repulse_agents, integrate_entity_physics).chain())
            .add_systems(Update, (check_settings_changes, check_block_changes, check_entity_type_changes));

        info!("entity physics ready (data from {}, hot reload {})", self.data_dir, self.hot_reload);
    }
}
