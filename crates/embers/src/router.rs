use bevy::log::{trace, warn};

use crate::error::RouterError;
use crate::host::{HostFlags, HostRenderer, NoGeometry, SolidGeometry};
use crate::layer::{Layer, LayerSet};
use crate::registry::ParticleRegistry;

type TickObserver<C> = Box<dyn FnMut(&mut C, HostFlags)>;
type LayerObserver<C> = Box<dyn FnMut(Layer, &mut C, &mut dyn HostRenderer)>;

/// Gives a router access to a registry and the collision geometry of the
/// world it simulates.
pub trait ParticleWorld {
    fn split(&mut self) -> (&mut ParticleRegistry, &dyn SolidGeometry);
}

impl ParticleWorld for ParticleRegistry {
    fn split(&mut self) -> (&mut ParticleRegistry, &dyn SolidGeometry) {
        (self, &NoGeometry)
    }
}

/// A registry paired with the geometry its particles collide with.
pub struct Simulation<G> {
    pub registry: ParticleRegistry,
    pub geometry: G,
}

impl<G: SolidGeometry> ParticleWorld for Simulation<G> {
    fn split(&mut self) -> (&mut ParticleRegistry, &dyn SolidGeometry) {
        (&mut self.registry, &self.geometry)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct FrameCursor {
    ticked: bool,
    last_layer: Option<Layer>,
    flags: HostFlags,
}

/// Turns the host's draw sequence into one tick and up to fifteen layer
/// notifications per frame.
///
/// Observers are called synchronously, in registration order. `C` is the
/// application state handed to every observer.
pub struct RenderLayerRouter<C> {
    tick_observers: Vec<TickObserver<C>>,
    layer_observers: Vec<(LayerSet, LayerObserver<C>)>,
    frame: FrameCursor,
    frames: u64,
}

impl<C> Default for RenderLayerRouter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> RenderLayerRouter<C> {
    pub fn new() -> Self {
        Self {
            tick_observers: Vec::new(),
            layer_observers: Vec::new(),
            frame: FrameCursor::default(),
            frames: 0,
        }
    }

    pub fn on_tick(&mut self, observer: impl FnMut(&mut C, HostFlags) + 'static) -> &mut Self {
        self.tick_observers.push(Box::new(observer));
        self
    }

    pub fn on_layers(
        &mut self,
        layers: LayerSet,
        observer: impl FnMut(Layer, &mut C, &mut dyn HostRenderer) + 'static,
    ) -> &mut Self {
        self.layer_observers.push((layers, Box::new(observer)));
        self
    }

    /// Number of frames completed with [`end_frame`](Self::end_frame).
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn in_frame(&self) -> bool {
        self.frame.ticked
    }

    /// Starts a frame and fires the tick notification.
    pub fn begin_frame(&mut self, ctx: &mut C, flags: HostFlags) -> Result<(), RouterError> {
        if self.frame.ticked {
            warn!("frame tick fired twice without ending the frame");
            return Err(RouterError::TickAlreadyFired);
        }
        self.frame = FrameCursor {
            ticked: true,
            last_layer: None,
            flags,
        };

        trace!("frame {} tick", self.frames);
        for observer in &mut self.tick_observers {
            observer(ctx, flags);
        }
        Ok(())
    }

    /// Fires the notification for `layer`.
    ///
    /// Any batch the host has open is ended first and reopened afterwards,
    /// and the host's clip state is restored, so observers cannot leak
    /// render state into the host's own drawing.
    pub fn layer_reached(
        &mut self,
        layer: Layer,
        ctx: &mut C,
        renderer: &mut dyn HostRenderer,
    ) -> Result<(), RouterError> {
        if !self.frame.ticked {
            warn!("layer {layer:?} reached before the frame tick");
            return Err(RouterError::TickNotFired(layer));
        }
        if let Some(previous) = self.frame.last_layer {
            if layer <= previous {
                warn!("layer {layer:?} reached after {previous:?}");
                return Err(RouterError::OutOfOrder { previous, layer });
            }
        }
        self.frame.last_layer = Some(layer);

        if self.frame.flags.headless {
            return Ok(());
        }
        if !self
            .layer_observers
            .iter()
            .any(|(layers, _)| layers.contains_layer(layer))
        {
            return Ok(());
        }

        trace!("layer {layer:?}");
        let open_batch = renderer.active_batch();
        if open_batch.is_some() {
            renderer.end_batch();
        }
        let clip = renderer.clip_state();

        for (layers, observer) in &mut self.layer_observers {
            if layers.contains_layer(layer) {
                observer(layer, ctx, &mut *renderer);
            }
        }

        renderer.set_clip_state(clip);
        if let Some(settings) = open_batch {
            renderer.begin_batch(settings);
        }
        Ok(())
    }

    pub fn end_frame(&mut self) {
        if self.frame.ticked {
            self.frames += 1;
        }
        self.frame = FrameCursor::default();
    }

    /// Runs a whole frame: the tick, then every layer in order, calling
    /// `host_step` after each layer notification to let the host draw its own
    /// content for that step.
    pub fn run_frame(
        &mut self,
        ctx: &mut C,
        renderer: &mut dyn HostRenderer,
        flags: HostFlags,
        mut host_step: impl FnMut(Layer, &mut dyn HostRenderer),
    ) -> Result<(), RouterError> {
        self.begin_frame(ctx, flags)?;
        for &layer in Layer::all() {
            if let Err(err) = self.layer_reached(layer, ctx, &mut *renderer) {
                self.end_frame();
                return Err(err);
            }
            host_step(layer, &mut *renderer);
        }
        self.end_frame();
        Ok(())
    }
}

impl<C: ParticleWorld + 'static> RenderLayerRouter<C> {
    /// Subscribes the context's registry: the tick drives
    /// [`ParticleRegistry::update`] and each layer in `layers` drives
    /// [`ParticleRegistry::draw_layer`].
    pub fn attach_registry(&mut self, layers: LayerSet) -> &mut Self {
        self.on_tick(|ctx: &mut C, flags| {
            let (registry, geometry) = ctx.split();
            registry.set_host_flags(flags);
            registry.update(geometry);
        });
        self.on_layers(layers, |layer, ctx: &mut C, renderer| {
            let (registry, _) = ctx.split();
            registry.draw_layer(layer, renderer);
        })
    }
}
