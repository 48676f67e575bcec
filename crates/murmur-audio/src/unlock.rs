//! The gesture-gated unlock state machine.

use murmur_core::InteractionKind;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlockState {
    #[default]
    Locked,
    Unlocking,
    Unlocked,
}

/// Tracks whether the first user interaction has unlocked audio.
///
/// The gate only moves forward: `Locked -> Unlocking -> Unlocked`. Once unlocked it
/// stops listening, and a second unlock can never happen.
#[derive(Debug, Clone, Copy)]
pub struct UnlockGate {
    state: UnlockState,
    armed: bool,
    degraded: bool,
}

impl UnlockGate {
    /// A gate waiting for the first interaction.
    pub const fn armed() -> Self {
        Self {
            state: UnlockState::Locked,
            armed: true,
            degraded: false,
        }
    }

    /// A gate for platforms that never block audio; already unlocked and never listening.
    pub const fn disarmed() -> Self {
        Self {
            state: UnlockState::Unlocked,
            armed: false,
            degraded: false,
        }
    }

    pub const fn state(&self) -> UnlockState {
        self.state
    }

    /// Whether unlock completed without a graph backend.
    pub const fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Whether an interaction would start an unlock.
    pub fn is_listening(&self) -> bool {
        self.armed && self.state == UnlockState::Locked
    }

    /// Move to `Unlocking` on the first interaction. Returns false if the interaction
    /// should be ignored.
    pub fn try_begin(&mut self, kind: InteractionKind) -> bool {
        if !self.is_listening() {
            debug!("Ignoring {kind} while unlock state is {:?}", self.state);
            return false;
        }
        info!("Unlocking audio on {kind}");
        self.state = UnlockState::Unlocking;
        true
    }

    /// Finish the unlock. `routed` is false when the graph backend could not be used.
    pub fn complete(&mut self, routed: bool) {
        if self.state == UnlockState::Unlocked {
            return;
        }
        self.state = UnlockState::Unlocked;
        self.degraded = !routed;
        info!("Audio unlocked ({})", if routed { "graph" } else { "direct" });
    }
}
