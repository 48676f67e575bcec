//! State shared by every player: backend, levels, fades, routing, and the unlock path.

use crossbeam_channel::{unbounded, Receiver, Sender};
use murmur_core::{EngineConfig, Error, InteractionKind, Platform, Result, SoundCategory};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::backend::{ContextState, MediaBackend, ResumeOutcome};
use crate::bus::{BusGains, BusGraph};
use crate::event::EngineEvent;
use crate::fade::FadeScheduler;
use crate::handle::{SoundHandle, SoundId};
use crate::levels::MixLevels;
use crate::routing::RoutingTable;
use crate::unlock::{UnlockGate, UnlockState};

/// Where sound ends up. Decided once, when the unlock completes.
pub enum OutputPath<G> {
    /// Element volumes and mute flags control what is heard.
    Direct,
    /// Elements are routed through the bus graph.
    Graph(BusGraph<G>),
}

impl<G> OutputPath<G> {
    pub const fn kind(&self) -> OutputKind {
        match self {
            Self::Direct => OutputKind::Direct,
            Self::Graph(_) => OutputKind::Graph,
        }
    }

    pub const fn graph(&self) -> Option<&BusGraph<G>> {
        match self {
            Self::Direct => None,
            Self::Graph(graph) => Some(graph),
        }
    }

    pub fn graph_mut(&mut self) -> Option<&mut BusGraph<G>> {
        match self {
            Self::Direct => None,
            Self::Graph(graph) => Some(graph),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Direct,
    Graph,
}

pub struct EngineContext<B: MediaBackend> {
    backend: B,
    platform: Platform,
    pub(crate) levels: MixLevels,
    pub(crate) fades: FadeScheduler<B::Element>,
    routing: RoutingTable<B::Element>,
    output: OutputPath<B::Graph>,
    gate: UnlockGate,
    /// A graph waiting for the host to report that its context resumed.
    resuming: Option<BusGraph<B::Graph>>,
    next_id: u64,
    priming_sample_rate: u32,
    subscribers: Vec<Sender<EngineEvent>>,
}

impl<B: MediaBackend> EngineContext<B> {
    pub fn new(backend: B, config: &EngineConfig) -> Self {
        let gate = if config.platform.is_gesture_gated() {
            UnlockGate::armed()
        } else {
            UnlockGate::disarmed()
        };

        Self {
            backend,
            platform: config.platform,
            levels: MixLevels::new(config.volumes),
            fades: FadeScheduler::new(config.fade_tick()),
            routing: RoutingTable::new(),
            output: OutputPath::Direct,
            gate,
            resuming: None,
            next_id: 0,
            priming_sample_rate: config.priming_sample_rate,
            subscribers: Vec::new(),
        }
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub const fn platform(&self) -> Platform {
        self.platform
    }

    pub const fn levels(&self) -> &MixLevels {
        &self.levels
    }

    pub const fn live(&self, category: SoundCategory) -> f32 {
        self.levels.live(category)
    }

    pub const fn unlock_state(&self) -> UnlockState {
        self.gate.state()
    }

    pub const fn gate(&self) -> &UnlockGate {
        &self.gate
    }

    pub const fn output_kind(&self) -> OutputKind {
        self.output.kind()
    }

    pub fn bus_gains(&self) -> Option<BusGains> {
        self.output.graph().map(BusGraph::gains)
    }

    pub const fn routing(&self) -> &RoutingTable<B::Element> {
        &self.routing
    }

    /// Create a handle for one play request, registering it for routing on
    /// gesture-gated platforms.
    pub fn create_handle(
        &mut self,
        source: &str,
        category: SoundCategory,
        volume: f32,
    ) -> SoundHandle<B::Element> {
        let id = SoundId(self.next_id);
        self.next_id += 1;

        let element = self.backend.create_element(source, category.is_looped());
        let handle = SoundHandle::new(id, category, source, element);
        handle.set_volume(volume);
        handle.set_muted(self.levels.is_muted());

        if self.routes_new_handles() {
            let registration = self.routing.register(&handle, self.output.graph_mut());
            trace!("{id} registration: {registration:?}");
        }

        debug!("Created {id} ({category:?}) for {source}");
        handle
    }

    /// Gesture-gated and either still waiting for the unlock or unlocked onto the
    /// graph. A degraded unlock leaves every later handle on the direct path.
    fn routes_new_handles(&self) -> bool {
        self.platform.is_gesture_gated()
            && (self.gate.state() != UnlockState::Unlocked || self.output.graph().is_some())
    }

    /// Mute the element's own output while muted, and always once it is wired into
    /// the graph so only the graph path is audible.
    pub fn apply_platform_mute(&self, handle: &SoundHandle<B::Element>) {
        handle.set_muted(self.levels.is_muted() || self.routing.is_wired(handle.id()));
    }

    /// Write the current levels into the bus gains, if the graph exists.
    pub fn apply_bus_levels(&mut self) {
        if let Some(graph) = self.output.graph_mut() {
            graph.apply_levels(&self.levels);
        }
    }

    /// The engine let go of a handle.
    pub fn release(&mut self, id: SoundId) {
        self.routing.release(id);
    }

    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (event_tx, event_rx) = unbounded();
        self.subscribers.push(event_tx);
        event_rx
    }

    pub fn emit(&mut self, event: EngineEvent) {
        trace!("Emitting {event:?}");
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Start the unlock on the first listened interaction. Returns true if the
    /// unlock completed during this call.
    pub fn interaction(&mut self, kind: InteractionKind) -> bool {
        if !self.gate.try_begin(kind) {
            return false;
        }

        let built = self
            .backend
            .create_graph()
            .and_then(|graph| BusGraph::build(graph, &self.levels));
        let mut graph = match built {
            Ok(graph) => graph,
            Err(e) => {
                self.degrade(&e);
                return true;
            }
        };

        match graph.state() {
            ContextState::Running => self.complete_unlock(graph),
            ContextState::Closed => {
                self.degrade(&Error::GraphUnavailable("audio context is closed".to_string()));
                true
            }
            ContextState::Suspended => match graph.resume() {
                Ok(ResumeOutcome::Resumed) => self.complete_unlock(graph),
                Ok(ResumeOutcome::Pending) => {
                    debug!("Audio context resume pending");
                    self.resuming = Some(graph);
                    false
                }
                Err(e) => {
                    self.degrade(&e);
                    true
                }
            },
        }
    }

    /// The host finished resuming a suspended context. Returns true if the unlock
    /// completed during this call.
    pub fn backend_resumed(&mut self, result: Result<()>) -> bool {
        let Some(graph) = self.resuming.take() else {
            debug!("Ignoring resume notification: no resume in flight");
            return false;
        };

        match result {
            Ok(()) => self.complete_unlock(graph),
            Err(e) => {
                self.degrade(&e);
                true
            }
        }
    }

    fn complete_unlock(&mut self, mut graph: BusGraph<B::Graph>) -> bool {
        if let Err(e) = graph.prime(self.priming_sample_rate) {
            self.degrade(&e);
            return true;
        }

        self.output = OutputPath::Graph(graph);
        self.gate.complete(true);

        let mut wired = 0;
        if let OutputPath::Graph(graph) = &mut self.output {
            wired = self.routing.drain_pending(graph);
            graph.apply_levels(&self.levels);
        }
        info!("Audio graph active, {wired} pending sounds wired");

        self.emit(EngineEvent::Unlocked { routed: true });
        true
    }

    fn degrade(&mut self, error: &Error) {
        warn!("Falling back to direct volume control: {error}");
        self.output = OutputPath::Direct;
        self.resuming = None;
        self.gate.complete(false);

        let discarded = self.routing.discard_pending();
        if discarded > 0 {
            debug!("Discarded {discarded} pending registrations");
        }

        self.emit(EngineEvent::Unlocked { routed: false });
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

    use super::*;
    use crate::headless::{GraphSupport, HeadlessBackend, HeadlessOptions};

    fn gated() -> EngineConfig {
        EngineConfig {
            platform: Platform::GestureGated,
            ..EngineConfig::default()
        }
    }

    fn context(options: HeadlessOptions) -> (HeadlessBackend, EngineContext<HeadlessBackend>) {
        let backend = HeadlessBackend::with_options(options);
        let ctx = EngineContext::new(backend.clone(), &gated());
        (backend, ctx)
    }

    #[test]
    fn test_ids_are_monotonic() {
        let (_, mut ctx) = context(HeadlessOptions::default());
        let a = ctx.create_handle("a.mp3", SoundCategory::Effect, 1.0);
        let b = ctx.create_handle("b.mp3", SoundCategory::Effect, 1.0);
        assert!(a.id() < b.id());
    }

    #[test]
    fn test_direct_platform_never_registers() {
        let backend = HeadlessBackend::new();
        let mut ctx = EngineContext::new(backend.clone(), &EngineConfig::default());
        let fx = ctx.create_handle("fx.mp3", SoundCategory::Effect, 1.0);

        assert_eq!(ctx.unlock_state(), UnlockState::Unlocked);
        assert!(!ctx.interaction(InteractionKind::Click));
        assert!(ctx.routing().entry(fx.id()).is_none());
        assert_eq!(backend.graphs_created(), 0);
    }

    #[test]
    fn test_unlock_wires_pending_and_primes() {
        let (backend, mut ctx) = context(HeadlessOptions::default());
        let events = ctx.subscribe();
        let fx = ctx.create_handle("fx.mp3", SoundCategory::Effect, 1.0);
        assert_eq!(ctx.routing().pending_len(), 1);

        assert!(ctx.interaction(InteractionKind::PointerDown));
        assert_eq!(ctx.unlock_state(), UnlockState::Unlocked);
        assert_eq!(ctx.output_kind(), OutputKind::Graph);
        assert!(ctx.routing().is_wired(fx.id()));
        assert!(fx.is_muted());

        let graph = backend.graph().unwrap();
        assert_eq!(graph.primed.len(), 1);
        assert_eq!(graph.primed[0].1, 22_050);
        assert_eq!(events.try_recv().unwrap(), EngineEvent::Unlocked { routed: true });
    }

    #[test]
    fn test_unavailable_graph_degrades() {
        let (_, mut ctx) = context(HeadlessOptions {
            graph: GraphSupport::Unavailable,
            ..HeadlessOptions::default()
        });
        let fx = ctx.create_handle("fx.mp3", SoundCategory::Effect, 1.0);

        assert!(ctx.interaction(InteractionKind::KeyDown));
        assert_eq!(ctx.unlock_state(), UnlockState::Unlocked);
        assert!(ctx.gate().is_degraded());
        assert_eq!(ctx.output_kind(), OutputKind::Direct);
        assert_eq!(ctx.routing().pending_len(), 0);
        assert!(!fx.is_muted());
    }

    #[test]
    fn test_no_registrations_after_degraded_unlock() {
        let (_, mut ctx) = context(HeadlessOptions {
            graph: GraphSupport::Unavailable,
            ..HeadlessOptions::default()
        });
        ctx.interaction(InteractionKind::Click);

        let handles: Vec<_> = (0..3)
            .map(|_| ctx.create_handle("fx.mp3", SoundCategory::Effect, 1.0))
            .collect();
        let ambient = ctx.create_handle("rain.mp3", SoundCategory::Ambient, 0.9);

        assert_eq!(ctx.routing().pending_len(), 0);
        for handle in handles.iter().chain([&ambient]) {
            assert!(!ctx.routing().is_pending(handle.id()));
            assert!(ctx.routing().entry(handle.id()).is_none());
            assert!(!handle.is_muted());
        }
    }

    #[test]
    fn test_prime_failure_degrades() {
        let (_, mut ctx) = context(HeadlessOptions {
            graph: GraphSupport::PrimeFails,
            ..HeadlessOptions::default()
        });
        ctx.interaction(InteractionKind::Click);
        assert_eq!(ctx.output_kind(), OutputKind::Direct);
        assert!(ctx.gate().is_degraded());
    }

    #[test]
    fn test_deferred_resume_keeps_queueing() {
        let (backend, mut ctx) = context(HeadlessOptions {
            start_suspended: true,
            deferred_resume: true,
            ..HeadlessOptions::default()
        });

        assert!(!ctx.interaction(InteractionKind::TouchStart));
        assert_eq!(ctx.unlock_state(), UnlockState::Unlocking);
        let fx = ctx.create_handle("fx.mp3", SoundCategory::Effect, 1.0);
        assert!(ctx.routing().is_pending(fx.id()));

        backend.complete_resume();
        assert!(ctx.backend_resumed(Ok(())));
        assert_eq!(ctx.output_kind(), OutputKind::Graph);
        assert!(ctx.routing().is_wired(fx.id()));
        assert!(!ctx.backend_resumed(Ok(())));
    }

    #[test]
    fn test_deferred_resume_failure_degrades() {
        let (_, mut ctx) = context(HeadlessOptions {
            start_suspended: true,
            deferred_resume: true,
            ..HeadlessOptions::default()
        });
        ctx.interaction(InteractionKind::Click);
        assert!(ctx.backend_resumed(Err(Error::Resume("denied".to_string()))));
        assert_eq!(ctx.output_kind(), OutputKind::Direct);
        assert_eq!(ctx.unlock_state(), UnlockState::Unlocked);
    }

    #[test]
    fn test_dropped_subscriber_is_forgotten() {
        let (_, mut ctx) = context(HeadlessOptions::default());
        drop(ctx.subscribe());
        let events = ctx.subscribe();
        ctx.emit(EngineEvent::MuteChanged { muted: true });
        assert_eq!(ctx.subscribers.len(), 1);
        assert_eq!(events.len(), 1);
    }
}
