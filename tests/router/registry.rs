use super::helpers::*;

use std::cell::RefCell;
use std::rc::Rc;

use bevy::math::Vec2;
use embers::prelude::*;

#[test]
fn attached_registry_updates_and_draws_each_frame() {
    let mut registry = loaded_registry();
    let (particle, counts) = spawn_test_particle(
        &mut registry,
        ParticleSpawn::at(Vec2::ZERO).with_velocity(Vec2::new(1.0, 0.0)),
        TestParticle::new(10),
    );
    let mut router = RenderLayerRouter::<ParticleRegistry>::new();
    router.attach_registry(LayerSet::all());
    let mut renderer = InstanceBatch::new(screen());

    for _ in 0..3 {
        router
            .run_frame(&mut registry, &mut renderer, HostFlags::default(), |_, _| {})
            .unwrap();
    }

    assert_eq!(counts.updated.get(), 3);
    assert_eq!(particle.borrow().core.position, Vec2::new(3.0, 0.0));
    assert_eq!(renderer.passes().len(), 3, "one additive batch per frame");
    assert!(
        renderer
            .passes()
            .iter()
            .all(|pass| pass.settings.blend_mode == BlendMode::Additive)
    );
}

#[test]
fn paused_frames_draw_without_updating() {
    let mut registry = loaded_registry();
    let (_, counts) =
        spawn_test_particle(&mut registry, ParticleSpawn::default(), TestParticle::new(10));
    let mut router = RenderLayerRouter::<ParticleRegistry>::new();
    router.attach_registry(LayerSet::all());
    let mut renderer = InstanceBatch::new(screen());
    let paused = HostFlags {
        paused: true,
        headless: false,
    };

    router
        .run_frame(&mut registry, &mut renderer, paused, |_, _| {})
        .unwrap();

    assert_eq!(counts.updated.get(), 0);
    assert_eq!(renderer.instance_count(), 1);
    assert_eq!(registry.host_flags(), paused);
}

#[test]
fn registry_draws_only_on_subscribed_layers() {
    let mut registry = loaded_registry();
    spawn_test_particle(
        &mut registry,
        ParticleSpawn::default().with_layer(Layer::BeforeProjectiles),
        TestParticle::new(10),
    );
    let mut router = RenderLayerRouter::<ParticleRegistry>::new();
    router.attach_registry(LayerSet::BEFORE_DUST);
    let mut renderer = InstanceBatch::new(screen());

    router
        .run_frame(&mut registry, &mut renderer, HostFlags::default(), |_, _| {})
        .unwrap();

    assert!(renderer.passes().is_empty());
}

#[test]
fn particles_draw_between_host_steps() {
    let mut registry = loaded_registry();
    spawn_test_particle(
        &mut registry,
        ParticleSpawn::default().with_layer(Layer::BeforeNPCs),
        TestParticle::new(10),
    );
    let mut router = RenderLayerRouter::<ParticleRegistry>::new();
    router.attach_registry(registry.settings().draw_layers);
    let mut renderer = InstanceBatch::new(screen());

    let steps = RefCell::new(Vec::new());
    router
        .run_frame(&mut registry, &mut renderer, HostFlags::default(), |layer, renderer| {
            if layer == Layer::BeforeNPCs {
                renderer.begin_batch(BatchSettings::default());
                renderer.end_batch();
            }
            steps.borrow_mut().push((layer, renderer.active_batch().is_some()));
        })
        .unwrap();

    let modes: Vec<BlendMode> = renderer
        .passes()
        .iter()
        .map(|pass| pass.settings.blend_mode)
        .collect();
    assert_eq!(modes, vec![BlendMode::Additive, BlendMode::AlphaBlend]);
    assert_eq!(steps.borrow().len(), Layer::COUNT);
}

#[test]
fn simulation_passes_geometry_to_updates() {
    let mut registry = loaded_registry();
    let (_, counts) = spawn_test_particle(
        &mut registry,
        ParticleSpawn::default(),
        TestParticle::new(10).with_flags(ParticleFlags::COLLIDE_WITH_TILES),
    );
    let queries = Rc::new(RefCell::new(0));
    let geometry = {
        let queries = queries.clone();
        move |_: Vec2, _: i32, _: i32| {
            *queries.borrow_mut() += 1;
            true
        }
    };
    let mut world = Simulation { registry, geometry };

    let mut router: RenderLayerRouter<Simulation<_>> = RenderLayerRouter::new();
    router.attach_registry(LayerSet::all());
    let mut renderer = InstanceBatch::new(screen());
    router
        .run_frame(&mut world, &mut renderer, HostFlags::default(), |_, _| {})
        .unwrap();

    assert_eq!(*queries.borrow(), 1);
    assert_eq!(counts.collided.get(), 1);
}

#[test]
fn emitters_run_from_router_ticks() {
    let mut registry = loaded_registry();
    let emitter = add_test_emitter(&mut registry, TestEmitter::new(10, 0.5, Vec2::ZERO));
    let mut router = RenderLayerRouter::<ParticleRegistry>::new();
    router.attach_registry(LayerSet::all());
    let mut renderer = InstanceBatch::new(screen());

    for _ in 0..4 {
        router
            .run_frame(&mut registry, &mut renderer, HostFlags::default(), |_, _| {})
            .unwrap();
    }

    assert_eq!(emitter.borrow().core.owned_count(), 2);
    assert_eq!(registry.particle_count(), 2);
}
