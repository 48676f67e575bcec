//! # murmur-audio
//!
//! Sound engine for an interactive-fiction reader.
//!
//! Features:
//! - Looping ambient track with linear crossfades
//! - One interrupting playback clip that pauses ambient while it plays
//! - Bounded effect pool with FIFO eviction
//! - Gesture-gated unlock that routes every sound through master/ambient/effects buses
//! - Mute and volume changes that reach every live sound and bus
//!
//! The host platform sits behind the [`MediaBackend`] traits; [`headless`] is an
//! in-memory implementation for tests and offline runs.

pub mod ambient;
pub mod backend;
pub mod bus;
pub mod context;
pub mod effects;
pub mod engine;
pub mod event;
pub mod fade;
pub mod handle;
pub mod headless;
pub mod levels;
pub mod playback;
pub mod routing;
pub mod runner;
pub mod unlock;

pub use ambient::AmbientState;
pub use backend::{AudioGraph, ContextState, MediaBackend, MediaElement, NodeId, ResumeOutcome};
pub use bus::BusGains;
pub use context::OutputKind;
pub use engine::{AudioEngine, EngineSnapshot};
pub use event::EngineEvent;
pub use handle::{SoundHandle, SoundId};
pub use runner::EngineRunner;
pub use unlock::UnlockState;
