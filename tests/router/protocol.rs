use super::helpers::*;

use embers::prelude::*;

#[derive(Default)]
struct Log {
    events: Vec<String>,
}

fn logging_router(layers: LayerSet) -> RenderLayerRouter<Log> {
    let mut router = RenderLayerRouter::new();
    router
        .on_tick(|log: &mut Log, _| log.events.push("tick".into()))
        .on_layers(layers, |layer, log: &mut Log, _| {
            log.events.push(format!("{layer:?}"));
        });
    router
}

#[test]
fn layer_before_tick_is_rejected() {
    let mut router = logging_router(LayerSet::all());
    let mut log = Log::default();
    let mut renderer = InstanceBatch::new(screen());

    let result = router.layer_reached(Layer::BeforeWalls, &mut log, &mut renderer);

    assert_eq!(result, Err(RouterError::TickNotFired(Layer::BeforeWalls)));
    assert!(log.events.is_empty());
}

#[test]
fn second_tick_in_a_frame_is_rejected() {
    let mut router = logging_router(LayerSet::all());
    let mut log = Log::default();

    router
        .begin_frame(&mut log, HostFlags::default())
        .expect("first tick should fire");
    assert_eq!(
        router.begin_frame(&mut log, HostFlags::default()),
        Err(RouterError::TickAlreadyFired)
    );
    assert_eq!(log.events, vec!["tick"]);

    router.end_frame();
    assert!(router.begin_frame(&mut log, HostFlags::default()).is_ok());
    assert_eq!(router.frames(), 1);
}

#[test]
fn layers_must_arrive_in_order() {
    let mut router = logging_router(LayerSet::all());
    let mut log = Log::default();
    let mut renderer = InstanceBatch::new(screen());

    router.begin_frame(&mut log, HostFlags::default()).unwrap();
    router
        .layer_reached(Layer::BeforeNPCs, &mut log, &mut renderer)
        .unwrap();

    assert_eq!(
        router.layer_reached(Layer::BeforeWalls, &mut log, &mut renderer),
        Err(RouterError::OutOfOrder {
            previous: Layer::BeforeNPCs,
            layer: Layer::BeforeWalls,
        })
    );
    assert_eq!(
        router.layer_reached(Layer::BeforeNPCs, &mut log, &mut renderer),
        Err(RouterError::OutOfOrder {
            previous: Layer::BeforeNPCs,
            layer: Layer::BeforeNPCs,
        }),
        "a layer fires at most once per frame"
    );
    assert!(
        router
            .layer_reached(Layer::AfterInterface, &mut log, &mut renderer)
            .is_ok()
    );
    assert_eq!(log.events, vec!["tick", "BeforeNPCs", "AfterInterface"]);
}

#[test]
fn skipped_layers_are_allowed() {
    let mut router = logging_router(LayerSet::all());
    let mut log = Log::default();
    let mut renderer = InstanceBatch::new(screen());

    router.begin_frame(&mut log, HostFlags::default()).unwrap();
    for layer in [Layer::BeforeBackground, Layer::BeforeDust] {
        router.layer_reached(layer, &mut log, &mut renderer).unwrap();
    }
    router.end_frame();

    assert_eq!(log.events, vec!["tick", "BeforeBackground", "BeforeDust"]);
}

#[test]
fn observers_run_in_registration_order() {
    let mut router = RenderLayerRouter::<Log>::new();
    router
        .on_tick(|log, _| log.events.push("first tick".into()))
        .on_tick(|log, _| log.events.push("second tick".into()))
        .on_layers(LayerSet::BEFORE_RAIN, |_, log, _| {
            log.events.push("first layer".into())
        })
        .on_layers(LayerSet::BEFORE_RAIN, |_, log, _| {
            log.events.push("second layer".into())
        });
    let mut log = Log::default();
    let mut renderer = InstanceBatch::new(screen());

    router.begin_frame(&mut log, HostFlags::default()).unwrap();
    router
        .layer_reached(Layer::BeforeRain, &mut log, &mut renderer)
        .unwrap();

    assert_eq!(
        log.events,
        vec!["first tick", "second tick", "first layer", "second layer"]
    );
}

#[test]
fn observers_only_hear_subscribed_layers() {
    let mut router = logging_router(LayerSet::BEFORE_WALLS | LayerSet::BEFORE_INTERFACE);
    let mut log = Log::default();
    let mut renderer = InstanceBatch::new(screen());

    router
        .run_frame(&mut log, &mut renderer, HostFlags::default(), |_, _| {})
        .unwrap();

    assert_eq!(log.events, vec!["tick", "BeforeWalls", "BeforeInterface"]);
}

#[test]
fn run_frame_interleaves_host_steps() {
    let mut router = logging_router(LayerSet::all());
    let mut log = Log::default();
    let mut renderer = InstanceBatch::new(screen());
    let mut steps = Vec::new();

    router
        .run_frame(&mut log, &mut renderer, HostFlags::default(), |layer, _| {
            steps.push(layer)
        })
        .unwrap();

    assert_eq!(steps, Layer::all().to_vec());
    assert_eq!(log.events.len(), 1 + Layer::COUNT);
    assert_eq!(log.events[1], "BeforeBackground");
    assert_eq!(log.events[15], "AfterInterface");
    assert!(!router.in_frame());
    assert_eq!(router.frames(), 1);
}

#[test]
fn run_frame_fails_inside_an_open_frame() {
    let mut router = logging_router(LayerSet::all());
    let mut log = Log::default();
    let mut renderer = InstanceBatch::new(screen());

    router.begin_frame(&mut log, HostFlags::default()).unwrap();
    let result = router.run_frame(&mut log, &mut renderer, HostFlags::default(), |_, _| {});

    assert_eq!(result, Err(RouterError::TickAlreadyFired));
}

#[test]
fn headless_frames_tick_without_layers() {
    let mut router = logging_router(LayerSet::all());
    let mut log = Log::default();
    let mut renderer = InstanceBatch::new(screen());
    let flags = HostFlags {
        paused: false,
        headless: true,
    };

    router
        .run_frame(&mut log, &mut renderer, flags, |_, _| {})
        .unwrap();

    assert_eq!(log.events, vec!["tick"]);
}

#[test]
fn tick_observers_receive_host_flags() {
    let mut router = RenderLayerRouter::<Vec<HostFlags>>::new();
    router.on_tick(|seen, flags| seen.push(flags));
    let mut seen = Vec::new();
    let paused = HostFlags {
        paused: true,
        headless: false,
    };

    router.begin_frame(&mut seen, paused).unwrap();
    router.end_frame();

    assert_eq!(seen, vec![paused]);
}
