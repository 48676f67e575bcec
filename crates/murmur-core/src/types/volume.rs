//! Volume values and the user's stored volume preferences.

use serde::{Deserialize, Serialize};

/// A volume level clamped to `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd, Default)]
#[serde(from = "f32", into = "f32")]
pub struct Volume(f32);

impl Volume {
    pub const SILENT: Self = Self(0.0);
    pub const FULL: Self = Self(1.0);

    /// Create a volume, clamping into range. `NaN` becomes silence.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            Self::SILENT
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    pub const fn get(self) -> f32 {
        self.0
    }
}

impl From<f32> for Volume {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<Volume> for f32 {
    fn from(volume: Volume) -> Self {
        volume.0
    }
}

/// Stored volume preferences, independent of the mute flag.
///
/// Playback clips have no preference of their own and borrow the ambient volume.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VolumePreferences {
    pub ambient: Volume,
    pub effects: Volume,
}

impl Default for VolumePreferences {
    fn default() -> Self {
        Self {
            ambient: Volume::new(0.9),
            effects: Volume::FULL,
        }
    }
}
