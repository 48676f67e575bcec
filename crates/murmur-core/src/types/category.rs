//! Sound categories and the buses they are mixed on.

use serde::{Deserialize, Serialize};

/// What a sound is used for. Fixed when the sound is created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SoundCategory {
    /// The single looping background track.
    Ambient,
    /// A one-shot clip that interrupts the ambient track.
    Playback,
    /// A short, polyphonic, fire-and-forget sound.
    Effect,
}

impl SoundCategory {
    /// Only ambient tracks loop.
    pub const fn is_looped(self) -> bool {
        matches!(self, Self::Ambient)
    }

    /// The bus a sound of this category is routed to.
    pub const fn bus(self) -> Bus {
        match self {
            Self::Ambient => Bus::Ambient,
            Self::Playback => Bus::Playback,
            Self::Effect => Bus::Effects,
        }
    }
}

/// A named summing point for volume control.
///
/// `Playback` is a separate logical bus so routing never has to guess from the loop
/// flag; the bus graph is free to map it onto another bus's gain node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Bus {
    Master,
    Ambient,
    Playback,
    Effects,
}

impl std::fmt::Display for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Master => "master",
            Self::Ambient => "ambient",
            Self::Playback => "playback",
            Self::Effects => "effects",
        };
        f.write_str(name)
    }
}
