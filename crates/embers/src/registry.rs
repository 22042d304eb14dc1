use std::cell::RefCell;
use std::rc::Rc;

use bevy::log::{debug, trace};
use bevy::math::{URect, UVec2};

use crate::emitter::EmitterHandle;
use crate::error::ParticleError;
use crate::host::{
    BatchSettings, ClipState, HostFlags, HostRenderer, ImageResolver, RasterizerState,
    SolidGeometry,
};
use crate::layer::Layer;
use crate::particle::{
    BlendMode, Particle, ParticleCommands, ParticleCore, ParticleHandle, ParticleSpawn,
    ParticleState, ensure_sprite,
};
use crate::settings::EmbersSettings;

/// Live particles of one layer, split by blend mode.
#[derive(Default)]
struct BlendBuckets {
    additive: Vec<ParticleHandle>,
    alpha_blend: Vec<ParticleHandle>,
    non_premultiplied: Vec<ParticleHandle>,
}

impl BlendBuckets {
    fn clear(&mut self) {
        self.additive.clear();
        self.alpha_blend.clear();
        self.non_premultiplied.clear();
    }

    fn bucket_mut(&mut self, blend_mode: BlendMode) -> &mut Vec<ParticleHandle> {
        match blend_mode {
            BlendMode::Additive => &mut self.additive,
            BlendMode::AlphaBlend => &mut self.alpha_blend,
            BlendMode::NonPremultiplied => &mut self.non_premultiplied,
        }
    }

    fn bucket(&self, blend_mode: BlendMode) -> &[ParticleHandle] {
        match blend_mode {
            BlendMode::Additive => &self.additive,
            BlendMode::AlphaBlend => &self.alpha_blend,
            BlendMode::NonPremultiplied => &self.non_premultiplied,
        }
    }

    fn is_empty(&self) -> bool {
        self.additive.is_empty() && self.alpha_blend.is_empty() && self.non_premultiplied.is_empty()
    }

    fn rebuild(&mut self, layer: Layer, particles: &[ParticleHandle]) {
        self.clear();
        for particle in particles {
            let Ok(borrowed) = particle.try_borrow() else {
                continue;
            };
            let core = borrowed.core();
            if core.layer != layer {
                continue;
            }
            self.bucket_mut(core.blend_mode).push(particle.clone());
        }
    }
}

#[derive(Default)]
struct Containers {
    particles: Vec<ParticleHandle>,
    emitters: Vec<EmitterHandle>,
    particles_to_destroy: Vec<ParticleHandle>,
    emitters_to_destroy: Vec<EmitterHandle>,
    buckets: BlendBuckets,
    particle_count: usize,
}

impl Containers {
    fn clear(&mut self) {
        self.particles.clear();
        self.emitters.clear();
        self.particles_to_destroy.clear();
        self.emitters_to_destroy.clear();
        self.buckets.clear();
        self.particle_count = 0;
    }

    fn spawner<'a>(
        &'a mut self,
        flags: HostFlags,
        images: &'a dyn ImageResolver,
        settings: &'a EmbersSettings,
    ) -> Spawner<'a> {
        Spawner {
            particles: &mut self.particles,
            particles_to_destroy: &mut self.particles_to_destroy,
            particle_count: &mut self.particle_count,
            flags,
            images,
            settings,
        }
    }
}

pub(crate) fn same_allocation<T: ?Sized, U: ?Sized>(a: &Rc<T>, b: &Rc<U>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// The registry's live particle set, as handed to emitters and hooks.
pub struct Spawner<'a> {
    particles: &'a mut Vec<ParticleHandle>,
    particles_to_destroy: &'a mut Vec<ParticleHandle>,
    particle_count: &'a mut usize,
    flags: HostFlags,
    images: &'a dyn ImageResolver,
    settings: &'a EmbersSettings,
}

impl<'a> Spawner<'a> {
    pub fn images(&self) -> &dyn ImageResolver {
        self.images
    }

    pub fn settings(&self) -> &EmbersSettings {
        self.settings
    }

    pub fn flags(&self) -> HostFlags {
        self.flags
    }

    /// Resolves `name` into `core`'s sprite, unless it already has one.
    pub fn resolve_sprite(&self, core: &mut ParticleCore, name: &str) {
        core.resolve_sprite(name, self.images, self.settings);
    }

    /// Configures `particle` with `spawn` and resolves its sprite, without admitting it.
    pub fn prepare<P: Particle>(&self, spawn: ParticleSpawn, mut particle: P) -> Rc<RefCell<P>> {
        spawn.apply(particle.core_mut());
        ensure_sprite(&mut particle, self.images, self.settings);
        Rc::new(RefCell::new(particle))
    }

    /// Admits `particle` into the live set and calls its spawn hook.
    ///
    /// Returns `false` without doing anything if the simulation is suspended,
    /// or the particle is already live or borrowed.
    pub fn add_particle(&mut self, particle: &ParticleHandle) -> bool {
        if self.flags.is_suspended() {
            return false;
        }

        let mut commands = ParticleCommands::default();
        {
            let Ok(mut borrowed) = particle.try_borrow_mut() else {
                debug!("skipping admission of a particle that is already borrowed");
                return false;
            };
            let state = borrowed.core().state();
            if !state.is_admissible() {
                trace!("skipping admission of a particle in state {state:?}");
                return false;
            }
            ensure_sprite(&mut *borrowed, self.images, self.settings);
            borrowed.core_mut().set_state(ParticleState::Active);
            borrowed.on_spawn(&mut commands);
        }

        *self.particle_count += 1;
        self.particles.push(particle.clone());
        self.apply_commands(particle, commands);
        true
    }

    /// Marks an active particle for destruction and calls its destroy hook.
    ///
    /// The particle stays in the live set until the next sweep. Particles
    /// that are not active are left alone, so the hook runs once per life.
    pub fn destroy_particle(&mut self, particle: &ParticleHandle) -> bool {
        {
            let Ok(mut borrowed) = particle.try_borrow_mut() else {
                debug!("skipping destruction of a particle that is already borrowed");
                return false;
            };
            if !borrowed.core().is_active() {
                return false;
            }
            borrowed.core_mut().set_state(ParticleState::PendingDestruction);
            borrowed.on_destroy();
        }
        self.particles_to_destroy.push(particle.clone());
        true
    }

    fn apply_commands(&mut self, source: &ParticleHandle, commands: ParticleCommands) {
        if commands.is_empty() {
            return;
        }
        let (spawned, destroy_self) = commands.into_parts();
        for particle in &spawned {
            self.add_particle(particle);
        }
        if destroy_self {
            self.destroy_particle(source);
        }
    }

    /// Sweeps particles marked for destruction out of the live set.
    fn sweep(&mut self) {
        if self.particles_to_destroy.is_empty() {
            return;
        }
        // Borrowed entries stay queued for the next sweep.
        self.particles_to_destroy.retain(|particle| {
            let Ok(mut borrowed) = particle.try_borrow_mut() else {
                debug!("deferring sweep of a particle that is already borrowed");
                return true;
            };
            if borrowed.core().state() == ParticleState::PendingDestruction {
                borrowed.core_mut().set_state(ParticleState::Removed);
            }
            false
        });

        let before = self.particles.len();
        self.particles.retain(|particle| {
            particle
                .try_borrow()
                .map_or(true, |particle| particle.core().state() != ParticleState::Removed)
        });
        let removed = before - self.particles.len();
        *self.particle_count = self.particle_count.saturating_sub(removed);
    }

    /// Integrates every particle that was live when the pass started, newest first.
    fn update_particles(&mut self, geometry: &dyn SolidGeometry) {
        for index in (0..self.particles.len()).rev() {
            let particle = self.particles[index].clone();
            let mut commands = ParticleCommands::default();

            let expired = {
                let Ok(mut borrowed) = particle.try_borrow_mut() else {
                    continue;
                };
                if !borrowed.core().is_active() {
                    continue;
                }

                let core = borrowed.core_mut();
                core.position += core.velocity;
                core.time_left -= 1;
                borrowed.update(&mut commands);

                if borrowed.core().collides_with_tiles() {
                    let bounds = borrowed.core().collision_box();
                    let (width, height) = (bounds.width() as i32, bounds.height() as i32);
                    if geometry.overlaps_solid(bounds.min, width, height) {
                        borrowed.on_tile_collide(&mut commands);
                    }
                }

                borrowed.core().time_left <= 0
            };

            self.apply_commands(&particle, commands);
            if expired {
                self.destroy_particle(&particle);
            }
        }
    }
}

/// Owns every live particle and emitter of one simulation.
///
/// A registry starts unloaded: every entry point is a no-op until
/// [`load`](Self::load) allocates its containers.
pub struct ParticleRegistry {
    containers: Option<Containers>,
    flags: HostFlags,
    images: Box<dyn ImageResolver>,
    settings: EmbersSettings,
}

impl ParticleRegistry {
    pub fn new(images: impl ImageResolver + 'static, settings: EmbersSettings) -> Self {
        Self {
            containers: None,
            flags: HostFlags::default(),
            images: Box::new(images),
            settings,
        }
    }

    pub fn load(&mut self) {
        debug!("loading particle registry");
        self.containers = Some(Containers::default());
    }

    pub fn unload(&mut self) {
        debug!("unloading particle registry");
        self.containers = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.containers.is_some()
    }

    /// Clears every particle, emitter and pending buffer.
    pub fn reset(&mut self) {
        if let Some(containers) = self.containers.as_mut() {
            debug!(
                "resetting particle registry ({} particles, {} emitters)",
                containers.particles.len(),
                containers.emitters.len()
            );
            containers.clear();
        }
    }

    pub fn on_world_load(&mut self) {
        self.reset();
    }

    pub fn on_world_unload(&mut self) {
        self.reset();
    }

    pub fn set_host_flags(&mut self, flags: HostFlags) {
        self.flags = flags;
    }

    pub fn host_flags(&self) -> HostFlags {
        self.flags
    }

    pub fn settings(&self) -> &EmbersSettings {
        &self.settings
    }

    pub fn images(&self) -> &dyn ImageResolver {
        self.images.as_ref()
    }

    /// Number of live particles, including those pending destruction.
    pub fn particle_count(&self) -> usize {
        self.containers
            .as_ref()
            .map_or(0, |containers| containers.particle_count)
    }

    pub fn live_particles(&self) -> &[ParticleHandle] {
        match self.containers.as_ref() {
            Some(containers) => &containers.particles,
            None => &[],
        }
    }

    pub fn live_emitters(&self) -> &[EmitterHandle] {
        match self.containers.as_ref() {
            Some(containers) => &containers.emitters,
            None => &[],
        }
    }

    pub fn contains_particle<P: ?Sized>(&self, particle: &Rc<RefCell<P>>) -> bool {
        self.live_particles()
            .iter()
            .any(|live| same_allocation(live, particle))
    }

    pub fn contains_emitter<E: ?Sized>(&self, emitter: &Rc<RefCell<E>>) -> bool {
        self.live_emitters()
            .iter()
            .any(|live| same_allocation(live, emitter))
    }

    fn spawner(&mut self) -> Option<Spawner<'_>> {
        let containers = self.containers.as_mut()?;
        Some(containers.spawner(self.flags, self.images.as_ref(), &self.settings))
    }

    /// Advances the simulation by one tick.
    ///
    /// Particles and emitters marked for destruction on the previous tick are
    /// swept first. Then every emitter is updated, then every particle. A
    /// particle that expires now is marked for destruction but stays in the
    /// live set, and is drawn, until the next call.
    pub fn update(&mut self, geometry: &dyn SolidGeometry) {
        if self.flags.is_suspended() {
            return;
        }
        let Some(containers) = self.containers.as_mut() else {
            return;
        };

        let mut spawner = Spawner {
            particles: &mut containers.particles,
            particles_to_destroy: &mut containers.particles_to_destroy,
            particle_count: &mut containers.particle_count,
            flags: self.flags,
            images: self.images.as_ref(),
            settings: &self.settings,
        };
        let emitters = &mut containers.emitters;
        let emitters_to_destroy = &mut containers.emitters_to_destroy;

        spawner.sweep();

        if !emitters_to_destroy.is_empty() {
            for emitter in emitters_to_destroy.drain(..) {
                emitters.retain(|live| !same_allocation(live, &emitter));
            }
        }

        for index in (0..emitters.len()).rev() {
            let emitter = &emitters[index];
            let Ok(mut borrowed) = emitter.try_borrow_mut() else {
                continue;
            };
            borrowed.update(&mut spawner);

            if borrowed.core().is_finished()
                && !emitters_to_destroy
                    .iter()
                    .any(|queued| same_allocation(queued, emitter))
            {
                borrowed.on_destroy();
                emitters_to_destroy.push(emitter.clone());
            }
        }

        spawner.update_particles(geometry);
    }

    /// Admits an already configured particle.
    ///
    /// Does nothing when suspended, unloaded, or when the particle is
    /// already live.
    pub fn add_particle(&mut self, particle: ParticleHandle) -> bool {
        self.spawner()
            .is_some_and(|mut spawner| spawner.add_particle(&particle))
    }

    /// Configures `particle` with `spawn` and admits it.
    ///
    /// While the simulation is suspended the particle is configured and
    /// returned, but not admitted.
    pub fn new_particle<P: Particle>(
        &mut self,
        spawn: ParticleSpawn,
        particle: Option<Rc<RefCell<P>>>,
    ) -> Result<Rc<RefCell<P>>, ParticleError> {
        let particle = particle.ok_or(ParticleError::MissingInstance)?;
        let mut spawner = self.spawner().ok_or(ParticleError::NotLoaded)?;

        {
            let mut borrowed = particle
                .try_borrow_mut()
                .map_err(|_| ParticleError::InUse)?;
            spawn.apply(borrowed.core_mut());
            ensure_sprite(&mut *borrowed, spawner.images, spawner.settings);
        }

        trace!(
            "spawning particle at {} moving {} on {:?} ({:?})",
            spawn.position, spawn.velocity, spawn.layer, spawn.blend_mode
        );
        let handle: ParticleHandle = particle.clone();
        spawner.add_particle(&handle);
        Ok(particle)
    }

    /// Spawns a default-constructed `P`.
    pub fn spawn<P: Particle + Default>(
        &mut self,
        spawn: ParticleSpawn,
    ) -> Result<Rc<RefCell<P>>, ParticleError> {
        self.new_particle(spawn, Some(Rc::new(RefCell::new(P::default()))))
    }

    /// Calls the particle's destroy hook and marks it for removal on the next update.
    ///
    /// Particles that are not active (never admitted, or already marked) are
    /// left alone.
    pub fn destroy_particle(&mut self, particle: ParticleHandle) -> bool {
        self.spawner()
            .is_some_and(|mut spawner| spawner.destroy_particle(&particle))
    }

    pub fn add_emitter(&mut self, emitter: EmitterHandle) {
        if self.flags.is_suspended() {
            return;
        }
        let Some(containers) = self.containers.as_mut() else {
            return;
        };
        if containers
            .emitters
            .iter()
            .any(|live| same_allocation(live, &emitter))
        {
            return;
        }
        trace!("emitter added");
        containers.emitters.push(emitter);
    }

    /// Calls the emitter's destroy hook and removes it immediately.
    ///
    /// Emitters that are not live are left alone. An emitter that already
    /// finished had its hook called then, so it is only removed.
    pub fn destroy_emitter(&mut self, emitter: EmitterHandle) -> bool {
        if self.flags.is_suspended() {
            return false;
        }
        let Some(containers) = self.containers.as_mut() else {
            return false;
        };
        let before = containers.emitters.len();
        containers
            .emitters
            .retain(|live| !same_allocation(live, &emitter));
        if containers.emitters.len() == before {
            return false;
        }

        let queued = containers.emitters_to_destroy.len();
        containers
            .emitters_to_destroy
            .retain(|pending| !same_allocation(pending, &emitter));
        if containers.emitters_to_destroy.len() == queued {
            if let Ok(mut borrowed) = emitter.try_borrow_mut() {
                borrowed.on_destroy();
            }
        }
        trace!("emitter removed");
        true
    }

    /// Draws every live particle on `layer`, one batch per blend mode in
    /// [`BlendMode::DRAW_ORDER`].
    ///
    /// The renderer's clip state is restored before returning.
    pub fn draw_layer(&mut self, layer: Layer, renderer: &mut dyn HostRenderer) {
        if self.flags.headless {
            return;
        }
        let Some(containers) = self.containers.as_mut() else {
            return;
        };
        if containers.particles.is_empty() {
            return;
        }

        let Containers {
            particles, buckets, ..
        } = containers;
        buckets.rebuild(layer, particles);
        if buckets.is_empty() {
            return;
        }

        let saved = renderer.clip_state();
        let rasterizer = RasterizerState {
            scissor_test: true,
            ..saved.rasterizer
        };
        let screen = renderer.screen_size();
        renderer.set_clip_state(ClipState {
            scissor: URect::from_corners(UVec2::ZERO, screen),
            rasterizer,
        });
        let transform = renderer.game_view();

        for blend_mode in BlendMode::DRAW_ORDER {
            let bucket = buckets.bucket(blend_mode);
            if bucket.is_empty() {
                continue;
            }
            renderer.begin_batch(BatchSettings {
                blend_mode,
                rasterizer,
                transform,
            });
            for particle in bucket {
                if let Ok(mut borrowed) = particle.try_borrow_mut() {
                    borrowed.draw(renderer.sprite_batch());
                }
            }
            renderer.end_batch();
        }

        renderer.set_clip_state(saved);
    }
}
