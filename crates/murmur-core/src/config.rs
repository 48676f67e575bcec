//! Engine configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Platform, SourceResolver, VolumePreferences};

/// Tunables for the sound engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether the platform needs a gesture-gated unlock.
    pub platform: Platform,
    /// Ambient crossfade duration in milliseconds.
    pub crossfade_ms: u64,
    /// Fade scheduler cadence in milliseconds.
    pub fade_tick_ms: u64,
    /// Maximum number of concurrently playing effects.
    pub effect_capacity: usize,
    /// Initial volume preferences.
    pub volumes: VolumePreferences,
    /// Directory logical ambient keys are resolved against.
    pub ambient_base: String,
    /// Sample rate of the silent buffer played to unlock the graph backend.
    pub priming_sample_rate: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platform: Platform::Direct,
            crossfade_ms: 400,
            fade_tick_ms: 25,
            effect_capacity: 4,
            volumes: VolumePreferences::default(),
            ambient_base: "./assets/audio/ambient/".to_string(),
            priming_sample_rate: 22_050,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check that the configuration can drive an engine.
    pub fn validate(&self) -> Result<()> {
        if self.fade_tick_ms == 0 {
            return Err(Error::Config("fade_tick_ms must be at least 1".to_string()));
        }
        if self.effect_capacity == 0 {
            return Err(Error::Config(
                "effect_capacity must be at least 1".to_string(),
            ));
        }
        if self.priming_sample_rate == 0 {
            return Err(Error::Config(
                "priming_sample_rate must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub const fn crossfade(&self) -> Duration {
        Duration::from_millis(self.crossfade_ms)
    }

    pub const fn fade_tick(&self) -> Duration {
        Duration::from_millis(self.fade_tick_ms)
    }

    pub fn resolver(&self) -> SourceResolver {
        SourceResolver::new(self.ambient_base.clone())
    }
}
