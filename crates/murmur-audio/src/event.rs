//! Notifications the engine sends to its subscribers.

use serde::Serialize;

use crate::handle::SoundId;

/// Events emitted by the sound engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The global mute flag changed.
    MuteChanged { muted: bool },
    /// Stored volume preferences changed.
    VolumesChanged { ambient: f32, effects: f32 },
    /// The ambient track switched to another key, or stopped (`None`).
    AmbientChanged { key: Option<String> },
    /// The playback clip ended on its own.
    PlaybackFinished { id: SoundId },
    /// The unlock completed. `routed` is false when audio stays on the direct path.
    Unlocked { routed: bool },
}
