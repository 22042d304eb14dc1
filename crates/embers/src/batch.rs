use bevy::log::warn;
use bevy::math::{Mat4, URect, UVec2, Vec2};
use bytemuck::{Pod, Zeroable};

use crate::host::{
    BatchSettings, ClipState, HostRenderer, RasterizerState, SpriteBatch, SpriteDraw,
};

/// One sprite, laid out for upload as instance data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct SpriteInstance {
    pub position: [f32; 2],
    pub origin: [f32; 2],
    /// `min.x, min.y, max.x, max.y` of the source region.
    pub source: [u32; 4],
    pub color: [f32; 4],
    pub rotation: f32,
    pub scale: f32,
    pub image: u32,
    pub _pad: u32,
}

impl From<SpriteDraw> for SpriteInstance {
    fn from(sprite: SpriteDraw) -> Self {
        Self {
            position: sprite.position.to_array(),
            origin: sprite.origin.to_array(),
            source: [
                sprite.source.min.x,
                sprite.source.min.y,
                sprite.source.max.x,
                sprite.source.max.y,
            ],
            color: [
                sprite.color.red,
                sprite.color.green,
                sprite.color.blue,
                sprite.color.alpha,
            ],
            rotation: sprite.rotation,
            scale: sprite.scale,
            image: sprite.image.id(),
            _pad: 0,
        }
    }
}

/// Sprites drawn between one `begin_batch` and the matching `end_batch`.
#[derive(Clone, Debug)]
pub struct BatchPass {
    pub settings: BatchSettings,
    pub instances: Vec<SpriteInstance>,
}

impl BatchPass {
    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

/// A [`HostRenderer`] that records batches as instance buffers.
///
/// Hosts without a sprite batcher of their own can drive a
/// [`RenderLayerRouter`](crate::RenderLayerRouter) with it and upload
/// [`passes`](Self::passes) once the frame is done.
#[derive(Clone, Debug)]
pub struct InstanceBatch {
    passes: Vec<BatchPass>,
    open: Option<BatchPass>,
    clip: ClipState,
    screen_size: UVec2,
    camera_offset: Vec2,
    game_view: Mat4,
}

impl InstanceBatch {
    pub fn new(screen_size: UVec2) -> Self {
        Self {
            passes: Vec::new(),
            open: None,
            clip: ClipState {
                scissor: URect::from_corners(UVec2::ZERO, screen_size),
                rasterizer: RasterizerState::default(),
            },
            screen_size,
            camera_offset: Vec2::ZERO,
            game_view: Mat4::IDENTITY,
        }
    }

    pub fn with_camera_offset(mut self, camera_offset: Vec2) -> Self {
        self.camera_offset = camera_offset;
        self
    }

    pub fn with_game_view(mut self, game_view: Mat4) -> Self {
        self.game_view = game_view;
        self
    }

    pub fn set_camera_offset(&mut self, camera_offset: Vec2) {
        self.camera_offset = camera_offset;
    }

    /// Closed passes, in the order they were ended.
    pub fn passes(&self) -> &[BatchPass] {
        &self.passes
    }

    pub fn take_passes(&mut self) -> Vec<BatchPass> {
        std::mem::take(&mut self.passes)
    }

    /// Drops every recorded pass, including an open one.
    pub fn clear(&mut self) {
        self.passes.clear();
        self.open = None;
    }

    pub fn instance_count(&self) -> usize {
        self.passes.iter().map(|pass| pass.instances.len()).sum()
    }
}

impl SpriteBatch for InstanceBatch {
    fn draw(&mut self, sprite: SpriteDraw) {
        let Some(pass) = self.open.as_mut() else {
            warn!("sprite drawn outside of a batch; dropping it");
            return;
        };
        pass.instances.push(sprite.into());
    }

    fn camera_offset(&self) -> Vec2 {
        self.camera_offset
    }
}

impl HostRenderer for InstanceBatch {
    fn sprite_batch(&mut self) -> &mut dyn SpriteBatch {
        self
    }

    fn active_batch(&self) -> Option<BatchSettings> {
        self.open.as_ref().map(|pass| pass.settings)
    }

    fn begin_batch(&mut self, settings: BatchSettings) {
        if self.open.is_some() {
            warn!("batch begun while another is open; ending the open one");
            self.end_batch();
        }
        self.open = Some(BatchPass {
            settings,
            instances: Vec::new(),
        });
    }

    fn end_batch(&mut self) {
        if let Some(pass) = self.open.take() {
            self.passes.push(pass);
        }
    }

    fn clip_state(&self) -> ClipState {
        self.clip
    }

    fn set_clip_state(&mut self, state: ClipState) {
        self.clip = state;
    }

    fn screen_size(&self) -> UVec2 {
        self.screen_size
    }

    fn game_view(&self) -> Mat4 {
        self.game_view
    }
}
