//! **Embers** is a 2D particle system for games whose renderer draws the
//! world in a fixed sequence of layers.
//!
//! It keeps a registry of live particles and emitters, advances them once per
//! frame tick, and draws each particle on the layer it asked for, grouped into
//! one sprite batch per blend mode.
//!
//! # Getting started
//!
//! ## Define a particle
//!
//! A particle variant owns a [`ParticleCore`] and overrides the hooks it
//! needs:
//!
//! ```
//! use embers::prelude::*;
//!
//! struct Spark {
//!     core: ParticleCore,
//! }
//!
//! impl Particle for Spark {
//!     fn core(&self) -> &ParticleCore {
//!         &self.core
//!     }
//!
//!     fn core_mut(&mut self) -> &mut ParticleCore {
//!         &mut self.core
//!     }
//!
//!     fn update(&mut self, _commands: &mut ParticleCommands) {
//!         self.core.opacity -= 0.05;
//!     }
//! }
//! ```
//!
//! ## Drive a registry
//!
//! A [`ParticleRegistry`] resolves textures through an [`ImageResolver`]
//! supplied by the host. A [`RenderLayerRouter`] turns the host's frame into
//! the tick and layer notifications the registry listens to:
//!
//! ```
//! # use embers::prelude::*;
//! # struct Spark { core: ParticleCore }
//! # impl Particle for Spark {
//! #     fn core(&self) -> &ParticleCore { &self.core }
//! #     fn core_mut(&mut self) -> &mut ParticleCore { &mut self.core }
//! # }
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use bevy::math::{UVec2, Vec2};
//!
//! let images = |_name: &str| -> Result<ImageHandle, ImageError> {
//!     Ok(ImageHandle::new(0, UVec2::splat(8)))
//! };
//! let mut registry = ParticleRegistry::new(images, EmbersSettings::default());
//! registry.load();
//!
//! let spark = Spark {
//!     core: ParticleCore::with_lifetime(30),
//! };
//! registry.new_particle(
//!     ParticleSpawn::at(Vec2::new(64.0, 32.0)).with_velocity(Vec2::X),
//!     Some(Rc::new(RefCell::new(spark))),
//! )?;
//!
//! let mut router = RenderLayerRouter::<ParticleRegistry>::new();
//! router.attach_registry(LayerSet::all());
//!
//! let mut renderer = InstanceBatch::new(UVec2::new(1280, 720));
//! router.run_frame(&mut registry, &mut renderer, HostFlags::default(), |_, _| {})?;
//! assert_eq!(renderer.instance_count(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Table of contents
//!
//! - [Particles](Particle): lifetime, motion, hooks and drawing
//! - [Emitters](Emitter): rate-driven spawning and respawning of owned particles
//! - [The registry](ParticleRegistry): admission, update, destruction and layer drawing
//! - [Layers](Layer): the fifteen injection points of a frame
//! - [The router](RenderLayerRouter): frame protocol between the host and observers
//! - [Settings](EmbersSettings): texture naming and layer subscription, loadable from RON

/// Sprite batcher that records instance buffers.
pub mod batch;
/// Emitter trait and the default spawn/respawn logic.
pub mod emitter;
pub mod error;
/// Capabilities the host provides: textures, geometry, rendering.
pub mod host;
pub mod layer;
/// Particle trait, per-particle state and spawn parameters.
pub mod particle;
/// Convenience re-exports for common types.
pub mod prelude;
pub mod registry;
/// Frame protocol between the host's draw sequence and observers.
pub mod router;
pub mod settings;

pub use batch::InstanceBatch;
pub use emitter::{Emitter, EmitterCore, EmitterHandle};
pub use error::{ImageError, ParticleError, RouterError};
pub use host::{HostFlags, HostRenderer, ImageHandle, ImageResolver, SolidGeometry, SpriteBatch};
pub use layer::{Layer, LayerSet};
pub use particle::{Particle, ParticleCore, ParticleHandle, ParticleSpawn};
pub use registry::{ParticleRegistry, Spawner};
pub use router::{ParticleWorld, RenderLayerRouter, Simulation};
pub use settings::EmbersSettings;
