//! Seams between the engine and the host platform's audio API.
//!
//! A platform provides media elements (one per playing sound, with their own volume
//! and mute controls) and, optionally, a graph-based backend with gain nodes that
//! elements can be routed through.

use murmur_core::Result;
use serde::Serialize;

/// Identifies a node inside an [`AudioGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(pub u32);

/// Execution state of a graph backend's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    Running,
    Suspended,
    Closed,
}

/// What happened when a suspended context was asked to resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// The context is running again.
    Resumed,
    /// The host resumes asynchronously and reports back through
    /// [`AudioEngine::backend_resumed`](crate::AudioEngine::backend_resumed).
    Pending,
}

/// A single playable element, e.g. an `HTMLAudioElement`.
pub trait MediaElement: Send {
    /// Start or continue playback from the current position.
    fn play(&mut self) -> Result<()>;

    /// Pause, keeping the current position.
    fn pause(&mut self);

    /// Seek back to the start.
    fn rewind(&mut self);

    fn volume(&self) -> f32;

    fn set_volume(&mut self, volume: f32);

    fn is_muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    fn is_paused(&self) -> bool;

    fn is_ended(&self) -> bool;
}

/// A graph-based audio backend, e.g. a Web Audio `AudioContext`.
pub trait AudioGraph: Send {
    type Element: MediaElement;

    fn state(&self) -> ContextState;

    fn resume(&mut self) -> Result<ResumeOutcome>;

    fn create_gain(&mut self, gain: f32) -> Result<NodeId>;

    fn set_gain(&mut self, node: NodeId, gain: f32);

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()>;

    fn connect_to_output(&mut self, node: NodeId) -> Result<()>;

    /// Route an element's output into `node`.
    fn connect_element(&mut self, element: &mut Self::Element, node: NodeId) -> Result<()>;

    /// Play a one-frame silent buffer into `node`.
    fn play_silence(&mut self, node: NodeId, sample_rate: u32) -> Result<()>;
}

/// Factory for the platform's elements and graph backend.
pub trait MediaBackend: Send {
    type Element: MediaElement + 'static;
    type Graph: AudioGraph<Element = Self::Element> + 'static;

    fn create_element(&mut self, source: &str, looped: bool) -> Self::Element;

    /// Probe for a graph backend. Called at most once per engine.
    fn create_graph(&mut self) -> Result<Self::Graph>;
}
