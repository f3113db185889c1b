//! Creature repulsion: overlapping creatures push each other apart.
//!
//! Neighbours are found through the partition index, so the push is computed
//! from positions as of this tick's rebuild and does not depend on the order
//! agents are visited in. Register `repulse_agents` after
//! `rebuild_entity_partitions` and before the physics step.

use crate::entity::{EntityKind, EntityPos, PhysicsBody};
use crate::partition::{EntityPartitioning, PartitionedEntity};
use crate::settings::{RepulseSettings, Settings};
use bevy::math::DVec3;
use bevy::prelude::*;
use std::ops::ControlFlow;

/// Marks a creature that gets pushed by its neighbours.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct RepulseAgents;

/// Horizontal push on `me` from every creature whose touch sphere overlaps
/// its own, in blocks per 1/60 s.
///
/// Each neighbour contributes `(1 - dist / combined_touch) * strength` along
/// the line between the two; the sum is capped at `max_push`.
#[must_use]
pub fn repulse_motion(partitioning: &EntityPartitioning, me: &PartitionedEntity, settings: &RepulseSettings) -> DVec3 {
    let radius = me.touch_distance + partitioning.largest_touch_distance();
    let mut push = DVec3::ZERO;
    let _ = partitioning.walk_range(me.pos, radius, me.dimension, EntityKind::Creature, true, |other| {
        if other.entity == me.entity {
            return ControlFlow::Continue(());
        }
        let combined = me.touch_distance + other.touch_distance;
        let mut away = me.pos - other.pos;
        away.y = 0.0;
        let dist = away.length();
        if combined <= 0.0 || dist >= combined {
            return ControlFlow::Continue(());
        }
        // stacked exactly on top of each other: split along x by entity order
        let dir = if dist > 1e-6 {
            away / dist
        } else if me.entity < other.entity {
            DVec3::NEG_X
        } else {
            DVec3::X
        };
        push += dir * (1.0 - dist / combined) * settings.strength;
        ControlFlow::Continue(())
    });

    let len = push.length();
    if len > settings.max_push { push * (settings.max_push / len) } else { push }
}

/// Add the repulsion push to every live, unmounted creature carrying
/// [`RepulseAgents`].
#[allow(clippy::needless_pass_by_value)]
pub fn repulse_agents(
    time: Res<Time>,
    settings: Res<Settings>,
    partitioning: Res<EntityPartitioning>,
    mut agents: Query<(Entity, &mut EntityPos, &PhysicsBody), With<RepulseAgents>>,
) {
    if !settings.repulse.enabled {
        return;
    }
    let dtf = time.delta_seconds_f64() * 60.0;
    for (entity, mut pos, body) in &mut agents {
        if !body.alive || body.mounted_at.is_some() || body.kind != EntityKind::Creature {
            continue;
        }
        let me = PartitionedEntity {
            entity,
            pos: pos.xyz,
            dimension: pos.dimension,
            touch_distance: body.touch_distance,
            kind: body.kind,
        };
        let push = repulse_motion(&partitioning, &me, &settings.repulse);
        if push != DVec3::ZERO {
            pos.motion += push * dtf;
        }
    }
}
