use std::cell::RefCell;
use std::rc::Rc;

use bevy::math::Vec2;

use crate::particle::ParticleHandle;
use crate::registry::Spawner;

/// Shared handle to a type-erased emitter.
pub type EmitterHandle = Rc<RefCell<dyn Emitter>>;

/// A particle created by an emitter, with the scale it had when created.
#[derive(Clone)]
pub struct OwnedParticle {
    pub particle: ParticleHandle,
    pub initial_scale: f32,
}

/// State shared by every emitter variant.
pub struct EmitterCore {
    /// Soft cap on tracked particles. Spawn credit stops accumulating above it.
    pub max_particles: usize,
    /// Particles produced per tick. `0.5` produces one particle every two ticks.
    pub spawn_rate: f32,
    pub position: Vec2,
    pub rotation: f32,
    accumulator: f32,
    owned: Vec<OwnedParticle>,
    finished: bool,
}

impl EmitterCore {
    pub fn new(max_particles: usize, spawn_rate: f32, position: Vec2) -> Self {
        Self {
            max_particles,
            spawn_rate,
            position,
            rotation: 0.0,
            accumulator: 0.0,
            owned: Vec::new(),
            finished: false,
        }
    }

    /// Fractional spawn credit carried over to the next tick.
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    pub fn owned(&self) -> &[OwnedParticle] {
        &self.owned
    }

    pub fn owned_count(&self) -> usize {
        self.owned.len()
    }

    /// Starts tracking `particle`, recording its current scale for respawns.
    pub fn track(&mut self, particle: ParticleHandle) {
        let initial_scale = particle
            .try_borrow()
            .map(|particle| particle.core().scale)
            .unwrap_or(1.0);
        self.owned.push(OwnedParticle {
            particle,
            initial_scale,
        });
    }

    /// Stops tracking every owned particle and returns them.
    pub fn release_all(&mut self) -> Vec<OwnedParticle> {
        std::mem::take(&mut self.owned)
    }

    /// Requests destruction of this emitter. The registry calls
    /// [`Emitter::on_destroy`] after this tick's update and removes the
    /// emitter on the next one.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn accumulate(&mut self) {
        if self.owned.len() <= self.max_particles {
            self.accumulator += self.spawn_rate;
        }
    }

    fn take_credit(&mut self) -> bool {
        if self.accumulator >= 1.0 {
            self.accumulator -= 1.0;
            true
        } else {
            false
        }
    }
}

/// An emitter variant.
///
/// Implementors provide [`create_particle`](Emitter::create_particle); the
/// default [`update`](Emitter::update) handles spawn credit and respawning.
pub trait Emitter: 'static {
    fn core(&self) -> &EmitterCore;

    fn core_mut(&mut self) -> &mut EmitterCore;

    /// Builds one particle. It must not be admitted here: the emitter tracks
    /// it, and the respawn pass admits it once its lifetime is spent (new
    /// particles start with none, so on the same tick).
    ///
    /// [`Spawner::prepare`] configures a particle and resolves its sprite.
    fn create_particle(&mut self, spawner: &Spawner<'_>) -> ParticleHandle;

    /// Called once per tick, after new particles are created.
    fn on_update(&mut self) {}

    /// Called once when the registry destroys the emitter.
    fn on_destroy(&mut self) {}

    fn update(&mut self, spawner: &mut Spawner<'_>) {
        run_emitter(self, spawner);
    }

    fn respawn_particles(&mut self, spawner: &mut Spawner<'_>) {
        respawn_expired(self.core_mut(), spawner);
    }
}

/// Default emitter tick: accumulate credit, create one particle per whole
/// unit, run [`Emitter::on_update`], then respawn expired particles.
pub fn run_emitter<E: Emitter + ?Sized>(emitter: &mut E, spawner: &mut Spawner<'_>) {
    emitter.core_mut().accumulate();

    while emitter.core_mut().take_credit() {
        let particle = emitter.create_particle(spawner);
        emitter.core_mut().track(particle);
    }

    emitter.on_update();
    emitter.respawn_particles(spawner);
}

/// Re-admits every owned particle whose lifetime is spent, moved to the
/// emitter, at rest, and at its original scale.
pub fn respawn_expired(core: &mut EmitterCore, spawner: &mut Spawner<'_>) {
    let position = core.position;
    for owned in &core.owned {
        {
            let Ok(mut particle) = owned.particle.try_borrow_mut() else {
                continue;
            };
            let particle = particle.core_mut();
            if particle.time_left > 0 {
                continue;
            }
            particle.position = position;
            particle.velocity = Vec2::ZERO;
            particle.scale = owned.initial_scale;
        }
        spawner.add_particle(&owned.particle);
    }
}
