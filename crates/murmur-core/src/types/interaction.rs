//! User interactions that count as an unlocking gesture.

use serde::{Deserialize, Serialize};

/// A document-level interaction event the unlock gate listens for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    PointerDown,
    TouchStart,
    Click,
    KeyDown,
}

impl InteractionKind {
    /// Every interaction class that can unlock audio.
    pub const ALL: [Self; 4] = [Self::PointerDown, Self::TouchStart, Self::Click, Self::KeyDown];

    /// The DOM event name.
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::PointerDown => "pointerdown",
            Self::TouchStart => "touchstart",
            Self::Click => "click",
            Self::KeyDown => "keydown",
        }
    }

    /// Parse a DOM event name. Events that are not gestures yield `None`.
    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.event_name().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_name())
    }
}
