//! JSON report of a replayed session.

use murmur_audio::headless::{ElementSnapshot, GraphSnapshot, HeadlessBackend};
use murmur_audio::{AudioEngine, EngineEvent, EngineSnapshot};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Report {
    pub engine: EngineSnapshot,
    pub events: Vec<EngineEvent>,
    pub elements: Vec<ElementSnapshot>,
    pub graph: Option<GraphSnapshot>,
}

impl Report {
    pub fn collect(engine: &AudioEngine<HeadlessBackend>, events: Vec<EngineEvent>) -> Self {
        let backend = engine.backend();
        Self {
            engine: engine.snapshot(),
            events,
            elements: backend.elements(),
            graph: backend.graph(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
