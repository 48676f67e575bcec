//! Error types for Murmur.

use thiserror::Error;

/// Result type alias using Murmur's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Murmur.
#[derive(Error, Debug)]
pub enum Error {
    // Playback errors
    #[error("Autoplay blocked until the user interacts with the page")]
    AutoplayBlocked,

    #[error("Playback failed to start: {0}")]
    PlaybackStart(String),

    // Graph backend errors
    #[error("Audio graph unavailable: {0}")]
    GraphUnavailable(String),

    #[error("Audio graph error: {0}")]
    Graph(String),

    #[error("Failed to resume audio context: {0}")]
    Resume(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Session script error: {0}")]
    Session(String),

    #[error("Engine runner error: {0}")]
    Runner(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if playback was refused because no user gesture happened yet.
    pub const fn is_autoplay_blocked(&self) -> bool {
        matches!(self, Self::AutoplayBlocked)
    }

    /// Returns true if this error comes from the graph-based backend.
    ///
    /// These never reach the caller: the engine falls back to direct volume control.
    pub const fn is_graph_failure(&self) -> bool {
        matches!(
            self,
            Self::GraphUnavailable(_) | Self::Graph(_) | Self::Resume(_)
        )
    }
}
