use thiserror::Error;

use crate::layer::Layer;

/// Errors returned by the particle spawn entry points.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParticleError {
    /// No particle instance was supplied to spawn.
    #[error("cannot spawn a particle without an instance")]
    MissingInstance,
    /// The registry has not been loaded, or has been unloaded.
    #[error("the particle registry is not loaded")]
    NotLoaded,
    /// The instance is mutably borrowed by someone else, e.g. its own hook.
    #[error("the particle instance is already borrowed")]
    InUse,
}

/// Errors an [`ImageResolver`](crate::ImageResolver) can report.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("no image named \"{0}\"")]
    NotFound(String),
    #[error("image \"{name}\" could not be read: {reason}")]
    Unreadable { name: String, reason: String },
}

/// Violations of the per-frame notification protocol.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// A layer was reached before the frame's tick was fired.
    #[error("layer {0:?} reached before the frame tick")]
    TickNotFired(Layer),
    /// `begin_frame` was called twice without `end_frame`.
    #[error("the frame tick was already fired")]
    TickAlreadyFired,
    /// Layers must arrive in declaration order, each at most once per frame.
    #[error("layer {layer:?} reached after {previous:?}")]
    OutOfOrder { previous: Layer, layer: Layer },
}
