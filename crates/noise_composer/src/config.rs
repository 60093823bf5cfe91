//! Startup configuration, loaded once from TOML.
//!
//! ```toml
//! [rescaler]
//! range = 16.0
//! step = 0.5
//!
//! [seeder]
//! seed = 0
//! ```
//!
//! Missing tables and keys fall back to their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{NoiseError, NoiseResult};
use crate::rescaler::RescalerConfig;
use crate::seeder::SeederConfig;

/// Defaults for the stateful nodes of a graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Rescaler sampling grid.
    pub rescaler: RescalerConfig,
    /// Seeder initial seed.
    pub seeder: SeederConfig,
}

impl ComposerConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`NoiseError::InvalidConfig`] if the document does not parse
    /// or the rescaler grid fails [`RescalerConfig::validate`].
    pub fn from_toml_str(text: &str) -> NoiseResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| NoiseError::InvalidConfig(e.to_string()))?;
        config
            .rescaler
            .validate()
            .map_err(|e| NoiseError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`NoiseError::InvalidConfig`] if a value cannot be represented.
    pub fn to_toml_string(&self) -> NoiseResult<String> {
        toml::to_string(self).map_err(|e| NoiseError::InvalidConfig(e.to_string()))
    }
}
