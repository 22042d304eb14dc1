use bevy::color::LinearRgba;
use bevy::math::{Mat4, URect, UVec2, Vec2};

use crate::error::ImageError;
use crate::particle::BlendMode;

/// Frame gating flags consumed from the host every frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostFlags {
    /// The simulation is paused. Nothing is updated or spawned.
    pub paused: bool,
    /// The host runs without presentation (dedicated server). Nothing is
    /// updated, spawned or drawn.
    pub headless: bool,
}

impl HostFlags {
    pub fn is_suspended(&self) -> bool {
        self.paused || self.headless
    }
}

/// Opaque handle to a host texture, together with its size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle {
    id: u32,
    size: UVec2,
}

impl ImageHandle {
    /// Used when neither a particle's texture nor the placeholder could be resolved.
    pub const MISSING: ImageHandle = ImageHandle {
        id: u32::MAX,
        size: UVec2::ONE,
    };

    pub fn new(id: u32, size: UVec2) -> Self {
        Self { id, size }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn is_missing(&self) -> bool {
        *self == Self::MISSING
    }
}

/// Resolves texture names into host image handles.
pub trait ImageResolver {
    fn resolve(&self, name: &str) -> Result<ImageHandle, ImageError>;
}

impl<F> ImageResolver for F
where
    F: Fn(&str) -> Result<ImageHandle, ImageError>,
{
    fn resolve(&self, name: &str) -> Result<ImageHandle, ImageError> {
        self(name)
    }
}

/// Tile collision capability of the host world.
pub trait SolidGeometry {
    /// Returns `true` if the box with top-left corner `position` overlaps solid tiles.
    fn overlaps_solid(&self, position: Vec2, width: i32, height: i32) -> bool;
}

impl<F> SolidGeometry for F
where
    F: Fn(Vec2, i32, i32) -> bool,
{
    fn overlaps_solid(&self, position: Vec2, width: i32, height: i32) -> bool {
        self(position, width, height)
    }
}

/// A world without solid geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeometry;

impl SolidGeometry for NoGeometry {
    fn overlaps_solid(&self, _position: Vec2, _width: i32, _height: i32) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    #[default]
    None,
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RasterizerState {
    pub scissor_test: bool,
    pub cull_mode: CullMode,
}

/// The scissor rectangle and rasterizer state of the host's graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClipState {
    pub scissor: URect,
    pub rasterizer: RasterizerState,
}

/// Everything needed to open a sprite batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchSettings {
    pub blend_mode: BlendMode,
    pub rasterizer: RasterizerState,
    pub transform: Mat4,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            blend_mode: BlendMode::AlphaBlend,
            rasterizer: RasterizerState::default(),
            transform: Mat4::IDENTITY,
        }
    }
}

/// A single sprite draw call, in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteDraw {
    pub image: ImageHandle,
    pub position: Vec2,
    /// Region of `image` to draw.
    pub source: URect,
    /// Tint, already multiplied by opacity.
    pub color: LinearRgba,
    pub rotation: f32,
    /// Rotation and scaling origin, relative to the top-left of `source`.
    pub origin: Vec2,
    pub scale: f32,
}

/// The drawing surface handed to [`Particle::draw`](crate::Particle::draw).
pub trait SpriteBatch {
    fn draw(&mut self, sprite: SpriteDraw);

    /// World-space position of the top-left corner of the screen.
    fn camera_offset(&self) -> Vec2;
}

/// The host renderer, as seen from layer observers.
pub trait HostRenderer {
    fn sprite_batch(&mut self) -> &mut dyn SpriteBatch;

    /// Settings of the batch the host currently has open, if any.
    fn active_batch(&self) -> Option<BatchSettings>;

    fn begin_batch(&mut self, settings: BatchSettings);

    fn end_batch(&mut self);

    fn clip_state(&self) -> ClipState;

    fn set_clip_state(&mut self, state: ClipState);

    fn screen_size(&self) -> UVec2;

    /// World-to-screen transform used for in-world batches.
    fn game_view(&self) -> Mat4;
}
