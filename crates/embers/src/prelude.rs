pub use crate::batch::{BatchPass, InstanceBatch, SpriteInstance};

pub use crate::emitter::{Emitter, EmitterCore, EmitterHandle, OwnedParticle};

pub use crate::error::{ImageError, ParticleError, RouterError};

pub use crate::host::{
    BatchSettings, ClipState, CullMode, HostFlags, HostRenderer, ImageHandle, ImageResolver,
    NoGeometry, RasterizerState, SolidGeometry, SpriteBatch, SpriteDraw,
};

pub use crate::layer::{Layer, LayerSet};

pub use crate::particle::{
    BlendMode, Particle, ParticleCommands, ParticleCore, ParticleFlags, ParticleHandle,
    ParticleSpawn, ParticleState,
};

pub use crate::registry::{ParticleRegistry, Spawner};

pub use crate::router::{ParticleWorld, RenderLayerRouter, Simulation};

pub use crate::settings::{EmbersSettings, SettingsError};
