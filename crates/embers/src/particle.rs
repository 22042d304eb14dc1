use std::cell::RefCell;
use std::rc::Rc;

use bevy::color::LinearRgba;
use bevy::log::warn;
use bevy::math::{Rect, URect, UVec2, Vec2};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::host::{ImageHandle, ImageResolver, SpriteBatch, SpriteDraw};
use crate::layer::Layer;
use crate::settings::EmbersSettings;

/// Shared handle to a type-erased particle.
pub type ParticleHandle = Rc<RefCell<dyn Particle>>;

bitflags! {
    /// Bitflags that control per-particle behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ParticleFlags: u32 {
        /// Reserved for particle-limit preemption. Stored but not acted on.
        const PRIORITY = 1 << 0;
        /// If set, the particle is tested against solid tiles every tick.
        const COLLIDE_WITH_TILES = 1 << 1;
    }
}

/// Compositing function used for the batch a particle is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    AlphaBlend,
    Additive,
    NonPremultiplied,
}

impl BlendMode {
    /// Order in which the blend-mode batches of a layer are issued.
    pub const DRAW_ORDER: [BlendMode; 3] = [
        BlendMode::Additive,
        BlendMode::AlphaBlend,
        BlendMode::NonPremultiplied,
    ];
}

/// Where a particle is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticleState {
    /// Constructed but never admitted into a registry.
    #[default]
    Uninitialized,
    /// In the live set and updated every tick.
    Active,
    /// Still in the live set (and drawn) until the next sweep, but no longer updated.
    PendingDestruction,
    /// Swept out of the live set. An emitter may re-admit it.
    Removed,
}

impl ParticleState {
    pub fn is_admissible(self) -> bool {
        matches!(self, Self::Uninitialized | Self::Removed)
    }
}

/// State shared by every particle variant.
#[derive(Debug, Clone)]
pub struct ParticleCore {
    /// Ticks remaining. The particle is destroyed on the tick this reaches zero.
    pub time_left: i32,
    pub position: Vec2,
    /// Added to `position` once per tick.
    pub velocity: Vec2,
    pub rotation: f32,
    pub scale: f32,
    pub sprite: Option<ImageHandle>,
    /// Region of `sprite` to draw. Covers the whole image once the sprite is set.
    pub frame: URect,
    pub opacity: f32,
    pub color: LinearRgba,
    pub layer: Layer,
    pub blend_mode: BlendMode,
    pub flags: ParticleFlags,
    state: ParticleState,
}

impl Default for ParticleCore {
    fn default() -> Self {
        Self {
            time_left: 0,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            scale: 1.0,
            sprite: None,
            frame: URect::default(),
            opacity: 1.0,
            color: LinearRgba::WHITE,
            layer: Layer::BeforeProjectiles,
            blend_mode: BlendMode::AlphaBlend,
            flags: ParticleFlags::empty(),
            state: ParticleState::Uninitialized,
        }
    }
}

impl ParticleCore {
    pub fn with_lifetime(time_left: i32) -> Self {
        Self {
            time_left,
            ..Default::default()
        }
    }

    pub fn state(&self) -> ParticleState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ParticleState) {
        self.state = state;
    }

    pub fn is_active(&self) -> bool {
        self.state == ParticleState::Active
    }

    pub fn collides_with_tiles(&self) -> bool {
        self.flags.contains(ParticleFlags::COLLIDE_WITH_TILES)
    }

    /// Sets the sprite and resets `frame` to cover all of it.
    pub fn set_sprite(&mut self, sprite: ImageHandle) {
        self.frame = URect::from_corners(UVec2::ZERO, sprite.size());
        self.sprite = Some(sprite);
    }

    pub fn sprite_size(&self) -> Vec2 {
        self.sprite
            .map(|sprite| sprite.size().as_vec2())
            .unwrap_or(Vec2::ZERO)
    }

    /// Sprite bounds scaled by `scale` and centered on `position`.
    ///
    /// A negative scale mirrors the sprite, so the box uses its magnitude.
    pub fn collision_box(&self) -> Rect {
        let half = (self.sprite_size() * self.scale).abs() * 0.5;
        Rect {
            min: self.position - half,
            max: self.position + half,
        }
    }

    /// Resolves `name` (with the configured texture root) into the sprite,
    /// unless a sprite is already set.
    ///
    /// Falls back to the placeholder texture when the lookup fails.
    pub fn resolve_sprite(
        &mut self,
        name: &str,
        images: &dyn ImageResolver,
        settings: &EmbersSettings,
    ) {
        if self.sprite.is_some() {
            return;
        }
        let path = settings.texture_path(name);
        self.set_sprite(resolve_image(&path, images, &settings.placeholder_texture));
    }
}

/// Resolves `name`, falling back to `placeholder` and then to [`ImageHandle::MISSING`].
pub fn resolve_image(name: &str, images: &dyn ImageResolver, placeholder: &str) -> ImageHandle {
    match images.resolve(name) {
        Ok(image) => image,
        Err(err) => {
            warn!("particle texture lookup failed: {err}; using \"{placeholder}\"");
            images.resolve(placeholder).unwrap_or_else(|err| {
                warn!("placeholder texture lookup failed: {err}");
                ImageHandle::MISSING
            })
        }
    }
}

/// Texture name derived from a Rust type path: `game::fx::Spark` becomes `game/fx/Spark`.
pub fn texture_path(type_name: &str) -> String {
    let path = type_name.split('<').next().unwrap_or(type_name);
    path.replace("::", "/")
}

/// Starting values applied to a particle when it is spawned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSpawn {
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: LinearRgba,
    pub scale: f32,
    pub layer: Layer,
    pub blend_mode: BlendMode,
}

impl Default for ParticleSpawn {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            color: LinearRgba::WHITE,
            scale: 1.0,
            layer: Layer::BeforeProjectiles,
            blend_mode: BlendMode::Additive,
        }
    }
}

impl ParticleSpawn {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_color(mut self, color: LinearRgba) -> Self {
        self.color = color;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn apply(&self, core: &mut ParticleCore) {
        core.position = self.position;
        core.velocity = self.velocity;
        core.color = self.color;
        core.scale = self.scale;
        core.layer = self.layer;
        core.blend_mode = self.blend_mode;
    }
}

/// Requests a particle hook can make of the registry that is running it.
///
/// Spawned particles are admitted as soon as the hook returns. They are
/// appended to the live set and first updated on the next tick.
#[derive(Default)]
pub struct ParticleCommands {
    spawned: Vec<ParticleHandle>,
    destroy_self: bool,
}

impl ParticleCommands {
    /// Configures `particle` with `spawn` and queues it for admission.
    pub fn spawn<P: Particle>(&mut self, spawn: ParticleSpawn, mut particle: P) -> Rc<RefCell<P>> {
        spawn.apply(particle.core_mut());
        let particle = Rc::new(RefCell::new(particle));
        self.spawned.push(particle.clone());
        particle
    }

    /// Queues an already configured particle for admission.
    pub fn add(&mut self, particle: ParticleHandle) {
        self.spawned.push(particle);
    }

    /// Destroys the particle running the hook, regardless of its remaining lifetime.
    pub fn destroy_self(&mut self) {
        self.destroy_self = true;
    }

    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty() && !self.destroy_self
    }

    pub(crate) fn into_parts(self) -> (Vec<ParticleHandle>, bool) {
        (self.spawned, self.destroy_self)
    }
}

/// A particle variant.
///
/// Implementors own a [`ParticleCore`] and override the hooks they need. The
/// registry integrates `velocity` and decrements `time_left` before calling
/// [`update`](Particle::update).
pub trait Particle: 'static {
    fn core(&self) -> &ParticleCore;

    fn core_mut(&mut self) -> &mut ParticleCore;

    /// Name of this variant's texture. Defaults to the type path.
    fn texture(&self) -> String {
        texture_path(std::any::type_name::<Self>())
    }

    /// Called once each time the particle is admitted into the live set.
    fn on_spawn(&mut self, _commands: &mut ParticleCommands) {}

    /// Called once per tick while the particle is active.
    fn update(&mut self, _commands: &mut ParticleCommands) {}

    /// Called on every tick the particle overlaps solid tiles, if it collides with tiles.
    fn on_tile_collide(&mut self, _commands: &mut ParticleCommands) {}

    /// Called once when the particle expires or is destroyed explicitly.
    fn on_destroy(&mut self) {}

    fn draw(&mut self, batch: &mut dyn SpriteBatch) {
        draw_sprite(self.core_mut(), batch);
    }
}

/// Default particle drawing: the sprite frame centered on the particle,
/// tinted by `color * opacity`.
pub fn draw_sprite(core: &mut ParticleCore, batch: &mut dyn SpriteBatch) {
    core.opacity = core.opacity.clamp(0.0, 1.0);
    let Some(sprite) = core.sprite else {
        return;
    };
    let position = core.position - batch.camera_offset();
    batch.draw(SpriteDraw {
        image: sprite,
        position,
        source: core.frame,
        color: core.color * core.opacity,
        rotation: core.rotation,
        origin: sprite.size().as_vec2() * 0.5,
        scale: core.scale,
    });
}

/// Resolves the sprite of `particle` from its texture name, if not set yet.
pub(crate) fn ensure_sprite<P: Particle + ?Sized>(
    particle: &mut P,
    images: &dyn ImageResolver,
    settings: &EmbersSettings,
) {
    if particle.core().sprite.is_some() {
        return;
    }
    let name = particle.texture();
    particle.core_mut().resolve_sprite(&name, images, settings);
}
