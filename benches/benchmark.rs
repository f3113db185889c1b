use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::ops::ControlFlow;

use bevy::math::{DVec3, IVec3, UVec3};
use bevy::prelude::Entity;
use entity_physics::block::loader as block_loader;
use entity_physics::block::BlockRegistry;
use entity_physics::collision::{CollisionTester, Cuboidf};
use entity_physics::entity::{EntityControls, EntityKind, EntityPos, EntityProperties, PhysicsBody, PhysicsSnapshot};
use entity_physics::partition::{EntityPartitioning, PartitionedEntity};
use entity_physics::physics::{ControlledPhysics, NoEvents, PhysicsEntity, PhysicsEnv};
use entity_physics::settings::Settings;
use entity_physics::world::{World, WorldBlocks};

const MAP: UVec3 = UVec3::new(256, 64, 256);

/// Deterministic LCG scatter of `n` entities over the map.
fn scatter(n: u32) -> Vec<PartitionedEntity> {
    let mut state: u32 = 0x1234_5678;
    let mut next = move || {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        f64::from((state >> 16) & 0x7fff) / 32767.0
    };
    (0..n)
        .map(|i| PartitionedEntity {
            entity: Entity::from_raw(i),
            pos: DVec3::new(next() * 256.0, next() * 64.0, next() * 256.0),
            dimension: 0,
            touch_distance: 0.5,
            kind: if i % 4 == 0 { EntityKind::Inanimate } else { EntityKind::Creature },
        })
        .collect()
}

fn flat_world() -> World {
    let mut world = World::new(MAP);
    world.fill(IVec3::ZERO, IVec3::new(255, 0, 255), 1);
    world
}

fn bench_partition_rebuild(c: &mut Criterion) {
    let entities = scatter(10_000);
    let mut partitioning = EntityPartitioning::default();
    c.bench_function("partition_rebuild_10k", |b| {
        b.iter(|| {
            partitioning.rebuild(MAP, entities.iter().copied());
            black_box(partitioning.len());
        })
    });
}

fn bench_partition_queries(c: &mut Criterion) {
    let entities = scatter(10_000);
    let mut partitioning = EntityPartitioning::default();
    partitioning.rebuild(MAP, entities.iter().copied());

    c.bench_function("partition_nearest_match", |b| {
        b.iter(|| {
            for e in entities.iter().take(1_000) {
                black_box(partitioning.nearest_match(e.pos, 16.0, 0, EntityKind::Creature, |o| o.entity != e.entity));
            }
        })
    });

    c.bench_function("partition_walk_range_inexact", |b| {
        b.iter(|| {
            let mut n = 0usize;
            for e in entities.iter().take(1_000) {
                let _ = partitioning.walk_range(e.pos, 8.0, 0, EntityKind::Creature, false, |_| {
                    n += 1;
                    ControlFlow::Continue(())
                });
            }
            black_box(n);
        })
    });
}

fn bench_terrain_collision(c: &mut Criterion) {
    let world = flat_world();
    let registry: BlockRegistry = block_loader::load_blocks_from_dir("data/blocks");
    let blocks = WorldBlocks::new(&world, &registry);
    let hitbox = Cuboidf::entity(0.6, 1.8);

    c.bench_function("terrain_collision_resolve", |b| {
        let mut tester = CollisionTester::with_padding(0.1);
        b.iter(|| {
            tester.new_tick();
            black_box(tester.apply_terrain_collision(
                &blocks,
                &hitbox,
                DVec3::new(100.5, 1.2, 100.5),
                black_box(DVec3::new(0.3, -0.4, 0.2)),
                true,
            ));
        })
    });
}

fn bench_controlled_physics(c: &mut Criterion) {
    let world = flat_world();
    let registry: BlockRegistry = block_loader::load_blocks_from_dir("data/blocks");
    let blocks = WorldBlocks::new(&world, &registry);
    let settings = Settings::default();
    let env = PhysicsEnv::new(&blocks, &settings);

    c.bench_function("controlled_physics_walk_10s", |b| {
        b.iter(|| {
            let mut pos = EntityPos::at(DVec3::new(20.5, 4.0, 20.5));
            let mut body = PhysicsBody::from_properties(&EntityProperties::default()).expect("default entity type is valid");
            let controls = EntityControls { tries_to_move: true, walk_vector: DVec3::new(0.02, 0.0, 0.01), ..Default::default() };
            let mut snapshot = PhysicsSnapshot::default();
            let mut physics = ControlledPhysics::creature(&settings.physics);
            let mut entity = PhysicsEntity { pos: &mut pos, body: &mut body, controls: &controls, snapshot: &mut snapshot };

            for _ in 0..600 {
                physics.update(1.0 / 60.0, &env, &mut entity, &mut NoEvents);
            }
            black_box(pos);
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(50);
    targets =
        bench_partition_rebuild,
        bench_partition_queries,
        bench_terrain_collision,
        bench_controlled_physics
}
criterion_main!(benches);
