//! In-memory backend that simulates media elements and a graph backend.
//!
//! Records everything the engine does to the platform (volumes, mute flags, wiring,
//! gains, priming) and simulates playback time so clips with a known duration end
//! on their own. Used by the tests and the session runner.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use murmur_core::{Error, Result};
use parking_lot::Mutex;
use serde::Serialize;

use crate::backend::{AudioGraph, ContextState, MediaBackend, MediaElement, NodeId, ResumeOutcome};

/// How the simulated platform behaves when the engine probes for a graph backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphSupport {
    #[default]
    Available,
    /// Creating the graph fails.
    Unavailable,
    /// The graph is created suspended and refuses to resume.
    ResumeFails,
    /// Playing the priming buffer fails.
    PrimeFails,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessOptions {
    pub graph: GraphSupport,
    /// The graph starts out suspended.
    pub start_suspended: bool,
    /// Resuming completes later, when the host calls [`HeadlessBackend::complete_resume`].
    pub deferred_resume: bool,
    /// Elements refuse to play until [`HeadlessBackend::allow_autoplay`] is called.
    pub autoplay_blocked: bool,
}

/// Observable state of one element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementSnapshot {
    pub index: usize,
    pub source: String,
    pub looped: bool,
    pub volume: f32,
    pub muted: bool,
    pub paused: bool,
    pub ended: bool,
    pub position_ms: u64,
    pub play_calls: u32,
    /// Graph nodes this element was routed into, in order.
    pub connections: Vec<NodeId>,
}

/// Observable state of the graph backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSnapshot {
    pub state: ContextState,
    pub gains: Vec<f32>,
    pub edges: Vec<(NodeId, NodeId)>,
    pub outputs: Vec<NodeId>,
    pub primed: Vec<(NodeId, u32)>,
    pub resumes: u32,
}

#[derive(Debug)]
struct ElementState {
    source: String,
    looped: bool,
    volume: f32,
    muted: bool,
    paused: bool,
    ended: bool,
    position: Duration,
    duration: Option<Duration>,
    play_calls: u32,
    connections: Vec<NodeId>,
}

#[derive(Debug)]
struct GraphState {
    state: ContextState,
    gains: Vec<f32>,
    edges: Vec<(NodeId, NodeId)>,
    outputs: Vec<NodeId>,
    primed: Vec<(NodeId, u32)>,
    resumes: u32,
}

impl GraphState {
    fn check(&self, node: NodeId) -> Result<usize> {
        let index = node.0 as usize;
        if index < self.gains.len() {
            Ok(index)
        } else {
            Err(Error::Graph(format!("unknown node {}", node.0)))
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    elements: Vec<ElementState>,
    durations: HashMap<String, Duration>,
    unplayable: HashSet<String>,
    graph: Option<GraphState>,
    graphs_created: u32,
    autoplay_allowed: bool,
}

/// The simulated platform. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    shared: Arc<Mutex<Shared>>,
    options: HeadlessOptions,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: HeadlessOptions) -> Self {
        Self {
            shared: Arc::default(),
            options,
        }
    }

    /// Give clips from `source` a length. Without one a clip plays forever.
    pub fn set_duration(&self, source: impl Into<String>, duration: Duration) {
        self.shared.lock().durations.insert(source.into(), duration);
    }

    /// Make every element for `source` refuse to start, as if it could not be decoded.
    pub fn set_unplayable(&self, source: impl Into<String>) {
        self.shared.lock().unplayable.insert(source.into());
    }

    /// Let elements play; models the browser lifting its autoplay block after a gesture.
    pub fn allow_autoplay(&self) {
        self.shared.lock().autoplay_allowed = true;
    }

    /// Finish a deferred resume: the context is running from now on.
    pub fn complete_resume(&self) {
        if let Some(graph) = self.shared.lock().graph.as_mut() {
            graph.state = ContextState::Running;
        }
    }

    /// Move playback time forward. Returns the indices of elements that ended.
    pub fn advance(&self, elapsed: Duration) -> Vec<usize> {
        let mut shared = self.shared.lock();
        let mut ended = Vec::new();

        for (index, element) in shared.elements.iter_mut().enumerate() {
            if element.paused || element.ended {
                continue;
            }
            element.position += elapsed;

            let Some(duration) = element.duration else {
                continue;
            };
            if element.position < duration {
                continue;
            }

            if element.looped && !duration.is_zero() {
                let wrapped = element.position.as_nanos() % duration.as_nanos();
                element.position = Duration::from_nanos(u64::try_from(wrapped).unwrap_or(0));
            } else {
                element.position = duration;
                element.ended = true;
                element.paused = true;
                ended.push(index);
            }
        }

        ended
    }

    pub fn element_count(&self) -> usize {
        self.shared.lock().elements.len()
    }

    pub fn element(&self, index: usize) -> Option<ElementSnapshot> {
        let shared = self.shared.lock();
        shared
            .elements
            .get(index)
            .map(|element| snapshot(index, element))
    }

    /// Every element in creation order.
    pub fn elements(&self) -> Vec<ElementSnapshot> {
        let shared = self.shared.lock();
        shared
            .elements
            .iter()
            .enumerate()
            .map(|(index, element)| snapshot(index, element))
            .collect()
    }

    /// Every element created for `source`, in creation order.
    pub fn elements_for(&self, source: &str) -> Vec<ElementSnapshot> {
        self.elements()
            .into_iter()
            .filter(|element| element.source == source)
            .collect()
    }

    pub fn graph(&self) -> Option<GraphSnapshot> {
        let shared = self.shared.lock();
        shared.graph.as_ref().map(|graph| GraphSnapshot {
            state: graph.state,
            gains: graph.gains.clone(),
            edges: graph.edges.clone(),
            outputs: graph.outputs.clone(),
            primed: graph.primed.clone(),
            resumes: graph.resumes,
        })
    }

    pub fn graphs_created(&self) -> u32 {
        self.shared.lock().graphs_created
    }
}

fn snapshot(index: usize, element: &ElementState) -> ElementSnapshot {
    ElementSnapshot {
        index,
        source: element.source.clone(),
        looped: element.looped,
        volume: element.volume,
        muted: element.muted,
        paused: element.paused,
        ended: element.ended,
        position_ms: u64::try_from(element.position.as_millis()).unwrap_or(u64::MAX),
        play_calls: element.play_calls,
        connections: element.connections.clone(),
    }
}

impl MediaBackend for HeadlessBackend {
    type Element = HeadlessElement;
    type Graph = HeadlessGraph;

    fn create_element(&mut self, source: &str, looped: bool) -> HeadlessElement {
        let mut shared = self.shared.lock();
        let duration = shared.durations.get(source).copied();
        shared.elements.push(ElementState {
            source: source.to_string(),
            looped,
            volume: 1.0,
            muted: false,
            paused: true,
            ended: false,
            position: Duration::ZERO,
            duration,
            play_calls: 0,
            connections: Vec::new(),
        });

        HeadlessElement {
            index: shared.elements.len() - 1,
            shared: self.shared.clone(),
            autoplay_blocked: self.options.autoplay_blocked,
        }
    }

    fn create_graph(&mut self) -> Result<HeadlessGraph> {
        let mut shared = self.shared.lock();
        shared.graphs_created += 1;

        if self.options.graph == GraphSupport::Unavailable {
            return Err(Error::GraphUnavailable(
                "no audio context constructor".to_string(),
            ));
        }

        let suspended =
            self.options.start_suspended || self.options.graph == GraphSupport::ResumeFails;
        shared.graph = Some(GraphState {
            state: if suspended {
                ContextState::Suspended
            } else {
                ContextState::Running
            },
            gains: Vec::new(),
            edges: Vec::new(),
            outputs: Vec::new(),
            primed: Vec::new(),
            resumes: 0,
        });

        Ok(HeadlessGraph {
            shared: self.shared.clone(),
            options: self.options,
        })
    }
}

/// A simulated media element.
#[derive(Debug)]
pub struct HeadlessElement {
    index: usize,
    shared: Arc<Mutex<Shared>>,
    autoplay_blocked: bool,
}

impl HeadlessElement {
    fn read<R>(&self, f: impl FnOnce(&ElementState) -> R) -> R {
        let shared = self.shared.lock();
        f(&shared.elements[self.index])
    }

    fn write<R>(&self, f: impl FnOnce(&mut ElementState) -> R) -> R {
        let mut shared = self.shared.lock();
        f(&mut shared.elements[self.index])
    }
}

impl MediaElement for HeadlessElement {
    fn play(&mut self) -> Result<()> {
        let mut shared = self.shared.lock();
        if self.autoplay_blocked && !shared.autoplay_allowed {
            return Err(Error::AutoplayBlocked);
        }

        let shared = &mut *shared;
        let element = &mut shared.elements[self.index];
        if shared.unplayable.contains(&element.source) {
            return Err(Error::PlaybackStart(format!("cannot decode {}", element.source)));
        }
        if element.ended {
            element.ended = false;
            element.position = Duration::ZERO;
        }
        element.paused = false;
        element.play_calls += 1;
        Ok(())
    }

    fn pause(&mut self) {
        self.write(|element| element.paused = true);
    }

    fn rewind(&mut self) {
        self.write(|element| {
            element.position = Duration::ZERO;
            element.ended = false;
        });
    }

    fn volume(&self) -> f32 {
        self.read(|element| element.volume)
    }

    fn set_volume(&mut self, volume: f32) {
        self.write(|element| element.volume = volume);
    }

    fn is_muted(&self) -> bool {
        self.read(|element| element.muted)
    }

    fn set_muted(&mut self, muted: bool) {
        self.write(|element| element.muted = muted);
    }

    fn is_paused(&self) -> bool {
        self.read(|element| element.paused)
    }

    fn is_ended(&self) -> bool {
        self.read(|element| element.ended)
    }
}

/// A simulated graph backend.
#[derive(Debug)]
pub struct HeadlessGraph {
    shared: Arc<Mutex<Shared>>,
    options: HeadlessOptions,
}

impl HeadlessGraph {
    fn with_graph<R>(&self, f: impl FnOnce(&mut GraphState) -> Result<R>) -> Result<R> {
        let mut shared = self.shared.lock();
        let graph = shared
            .graph
            .as_mut()
            .ok_or_else(|| Error::Graph("graph was torn down".to_string()))?;
        f(graph)
    }
}

impl AudioGraph for HeadlessGraph {
    type Element = HeadlessElement;

    fn state(&self) -> ContextState {
        self.shared
            .lock()
            .graph
            .as_ref()
            .map_or(ContextState::Closed, |graph| graph.state)
    }

    fn resume(&mut self) -> Result<ResumeOutcome> {
        let options = self.options;
        self.with_graph(|graph| {
            graph.resumes += 1;
            if options.graph == GraphSupport::ResumeFails {
                return Err(Error::Resume("resume rejected".to_string()));
            }
            if options.deferred_resume {
                return Ok(ResumeOutcome::Pending);
            }
            graph.state = ContextState::Running;
            Ok(ResumeOutcome::Resumed)
        })
    }

    fn create_gain(&mut self, gain: f32) -> Result<NodeId> {
        self.with_graph(|graph| {
            graph.gains.push(gain);
            let id = u32::try_from(graph.gains.len() - 1)
                .map_err(|_| Error::Graph("too many nodes".to_string()))?;
            Ok(NodeId(id))
        })
    }

    fn set_gain(&mut self, node: NodeId, gain: f32) {
        let _ = self.with_graph(|graph| {
            let index = graph.check(node)?;
            graph.gains[index] = gain;
            Ok(())
        });
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.with_graph(|graph| {
            graph.check(from)?;
            graph.check(to)?;
            graph.edges.push((from, to));
            Ok(())
        })
    }

    fn connect_to_output(&mut self, node: NodeId) -> Result<()> {
        self.with_graph(|graph| {
            graph.check(node)?;
            graph.outputs.push(node);
            Ok(())
        })
    }

    fn connect_element(&mut self, element: &mut HeadlessElement, node: NodeId) -> Result<()> {
        let mut shared = self.shared.lock();
        let graph = shared
            .graph
            .as_ref()
            .ok_or_else(|| Error::Graph("graph was torn down".to_string()))?;
        graph.check(node)?;
        shared.elements[element.index].connections.push(node);
        Ok(())
    }

    fn play_silence(&mut self, node: NodeId, sample_rate: u32) -> Result<()> {
        let options = self.options;
        self.with_graph(|graph| {
            graph.check(node)?;
            if options.graph == GraphSupport::PrimeFails {
                return Err(Error::Graph("buffer source refused to start".to_string()));
            }
            graph.primed.push((node, sample_rate));
            Ok(())
        })
    }
}
