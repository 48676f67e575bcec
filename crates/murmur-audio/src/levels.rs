//! Stored volume preferences combined with the global mute flag.

use murmur_core::{SoundCategory, Volume, VolumePreferences};

/// The single source of truth for every volume the engine applies.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MixLevels {
    preferences: VolumePreferences,
    muted: bool,
}

impl MixLevels {
    pub const fn new(preferences: VolumePreferences) -> Self {
        Self {
            preferences,
            muted: false,
        }
    }

    pub const fn preferences(&self) -> VolumePreferences {
        self.preferences
    }

    pub const fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Update the provided preferences; `None` leaves a preference as it is.
    pub fn set_preferences(&mut self, ambient: Option<f32>, effects: Option<f32>) {
        if let Some(ambient) = ambient {
            self.preferences.ambient = Volume::new(ambient);
        }
        if let Some(effects) = effects {
            self.preferences.effects = Volume::new(effects);
        }
    }

    /// `0` while muted, the stored preference otherwise. Playback borrows the ambient
    /// preference.
    pub const fn live(&self, category: SoundCategory) -> f32 {
        if self.muted {
            return 0.0;
        }
        match category {
            SoundCategory::Ambient | SoundCategory::Playback => self.preferences.ambient.get(),
            SoundCategory::Effect => self.preferences.effects.get(),
        }
    }

    /// Gain of the master bus.
    pub const fn master_gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            1.0
        }
    }
}
