use std::path::Path;

use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layer::LayerSet;

/// Errors that can occur when reading or writing [`EmbersSettings`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading the settings file.
    #[error("Could not read settings: {0}")]
    Io(#[from] std::io::Error),
    /// The settings contained invalid RON syntax.
    #[error("Could not parse RON: {0}")]
    Ron(#[from] ron::error::SpannedError),
    /// The settings could not be written as RON.
    #[error("Could not serialize RON: {0}")]
    Serialize(#[from] ron::Error),
}

/// Runtime configuration of a [`ParticleRegistry`](crate::ParticleRegistry).
///
/// Every field is optional in RON; missing fields take their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbersSettings {
    /// Texture used when a particle's own texture cannot be resolved.
    ///
    /// Defaults to `"embers/default_particle"`.
    pub placeholder_texture: String,
    /// Prefix joined in front of every derived particle texture name.
    ///
    /// Defaults to `None`.
    pub texture_root: Option<String>,
    /// Layers the registry draws on when attached to a
    /// [`RenderLayerRouter`](crate::RenderLayerRouter).
    ///
    /// Defaults to every layer.
    pub draw_layers: LayerSet,
}

impl Default for EmbersSettings {
    fn default() -> Self {
        Self {
            placeholder_texture: "embers/default_particle".into(),
            texture_root: None,
            draw_layers: LayerSet::all(),
        }
    }
}

impl EmbersSettings {
    pub fn from_ron(source: &str) -> Result<Self, SettingsError> {
        Ok(ron::de::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron(&source)
    }

    pub fn to_ron(&self) -> Result<String, SettingsError> {
        Ok(ron::ser::to_string_pretty(self, PrettyConfig::default())?)
    }

    /// Full texture name for a particle texture, with [`texture_root`](Self::texture_root) applied.
    pub fn texture_path(&self, name: &str) -> String {
        match self.texture_root.as_deref() {
            Some(root) if !root.is_empty() => format!("{}/{name}", root.trim_end_matches('/')),
            _ => name.to_string(),
        }
    }
}
