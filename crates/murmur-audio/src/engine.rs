//! The sound engine: ambient crossfades, interrupting playback, an effect pool, and
//! the gesture-gated unlock, all driven by one tick cadence.

use std::time::Duration;

use crossbeam_channel::Receiver;
use murmur_core::{
    EngineConfig, InteractionKind, Platform, Result, SoundCategory, SourceResolver,
    VolumePreferences,
};
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::ambient::{AmbientPlayer, AmbientState};
use crate::backend::MediaBackend;
use crate::bus::BusGains;
use crate::context::{EngineContext, OutputKind};
use crate::effects::EffectPool;
use crate::event::EngineEvent;
use crate::fade::FadeCompletion;
use crate::handle::{SoundHandle, SoundId};
use crate::playback::PlaybackPlayer;
use crate::unlock::UnlockState;

/// Point-in-time view of the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub platform: Platform,
    pub unlock: UnlockState,
    pub degraded: bool,
    pub output: OutputKind,
    pub muted: bool,
    pub volumes: VolumePreferences,
    pub bus_gains: Option<BusGains>,
    pub ambient: AmbientState,
    pub playback: Option<SoundId>,
    pub effects: Vec<SoundId>,
    pub pending_registrations: usize,
    pub wired_sounds: usize,
    pub active_fades: usize,
}

/// The sound engine.
///
/// A plain state machine: every operation runs to completion on `&mut self`, and
/// time only moves when the host calls [`tick`](Self::tick) or
/// [`advance`](Self::advance). [`EngineRunner`](crate::EngineRunner) drives it on a
/// dedicated thread.
pub struct AudioEngine<B: MediaBackend> {
    ctx: EngineContext<B>,
    ambient: AmbientPlayer<B::Element>,
    playback: PlaybackPlayer<B::Element>,
    effects: EffectPool<B::Element>,
    resolver: SourceResolver,
    /// Time passed to `advance` that did not add up to a whole tick yet.
    carry: Duration,
}

impl<B: MediaBackend> AudioEngine<B> {
    /// Create an engine on `backend`.
    pub fn new(backend: B, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "Sound engine ready: platform={:?}, crossfade={}ms, tick={}ms, effects={}",
            config.platform, config.crossfade_ms, config.fade_tick_ms, config.effect_capacity
        );

        Ok(Self {
            ctx: EngineContext::new(backend, config),
            ambient: AmbientPlayer::new(config.crossfade()),
            playback: PlaybackPlayer::new(),
            effects: EffectPool::new(config.effect_capacity),
            resolver: config.resolver(),
            carry: Duration::ZERO,
        })
    }

    // --- Ambient ---

    /// Crossfade to the ambient track `key` played from `source`. Playing the key that
    /// is already current does nothing.
    pub fn play_ambient(&mut self, source: &str, key: &str) {
        let held = self.playback.is_active();
        if self.ambient.play(&mut self.ctx, source, key, held) {
            self.ctx.emit(EngineEvent::AmbientChanged {
                key: Some(key.to_string()),
            });
        }
    }

    /// Play an ambient track by its logical key, resolved against the ambient base.
    pub fn play_ambient_key(&mut self, key: &str) {
        let source = self.resolver.resolve(key);
        self.play_ambient(&source, key);
    }

    pub fn pause_ambient(&mut self) {
        self.ambient.pause();
    }

    pub fn resume_ambient(&mut self) {
        self.ambient.resume(&mut self.ctx);
    }

    pub fn stop_ambient(&mut self) {
        if self.ambient.stop(&mut self.ctx) {
            self.ctx.emit(EngineEvent::AmbientChanged { key: None });
        }
    }

    // --- Playback ---

    /// Play a clip that interrupts the ambient track until it ends.
    pub fn play_playback(&mut self, source: &str) -> SoundId {
        self.playback.play(&mut self.ctx, source, &self.ambient)
    }

    pub fn stop_playback(&mut self) {
        self.playback.stop(&mut self.ctx);
    }

    // --- Effects ---

    pub fn play_effect(&mut self, source: &str) -> SoundId {
        self.effects.play(&mut self.ctx, source)
    }

    // --- Volume & mute ---

    /// Update the stored preferences that are provided and apply them everywhere.
    pub fn set_volumes(&mut self, ambient: Option<f32>, effects: Option<f32>) {
        self.ctx.levels.set_preferences(ambient, effects);

        self.apply_ambient_volume();
        let effects_live = self.ctx.live(SoundCategory::Effect);
        for handle in self.effects.handles() {
            handle.set_volume(effects_live);
        }
        self.ctx.apply_bus_levels();

        let preferences = self.ctx.levels().preferences();
        debug!(
            "Volumes set: ambient={:.2} effects={:.2}",
            preferences.ambient.get(),
            preferences.effects.get()
        );
        self.ctx.emit(EngineEvent::VolumesChanged {
            ambient: preferences.ambient.get(),
            effects: preferences.effects.get(),
        });
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.ctx.levels.set_muted(muted);
        self.apply_platform_mute();
        self.ctx.apply_bus_levels();

        self.apply_ambient_volume();
        if muted {
            if let Some(outgoing) = self.ambient.previous() {
                outgoing.set_volume(0.0);
                self.ctx.fades.retarget(outgoing.id(), 0.0);
            }
        }
        if let Some(clip) = self.playback.current() {
            clip.set_volume(self.ctx.live(SoundCategory::Playback));
        }
        let effects_live = self.ctx.live(SoundCategory::Effect);
        for handle in self.effects.handles() {
            handle.set_volume(effects_live);
        }

        info!("Audio {}", if muted { "muted" } else { "unmuted" });
        self.ctx.emit(EngineEvent::MuteChanged { muted });
    }

    /// Flip the mute flag and return the new value.
    pub fn toggle_muted(&mut self) -> bool {
        let muted = !self.is_muted();
        self.set_muted(muted);
        muted
    }

    /// Put the current ambient track at the live volume. A fade-in still running keeps
    /// its schedule but holds at the new level.
    fn apply_ambient_volume(&mut self) {
        let live = self.ctx.live(SoundCategory::Ambient);
        if let Some(current) = self.ambient.current() {
            current.set_volume(live);
            self.ctx.fades.retarget(current.id(), live);
        }
    }

    pub const fn is_muted(&self) -> bool {
        self.ctx.levels().is_muted()
    }

    fn live_handles(&self) -> impl Iterator<Item = &SoundHandle<B::Element>> {
        self.ambient
            .current()
            .into_iter()
            .chain(self.ambient.previous())
            .chain(self.playback.current())
            .chain(self.effects.handles())
    }

    fn apply_platform_mute(&self) {
        for handle in self.live_handles() {
            self.ctx.apply_platform_mute(handle);
        }
    }

    // --- Host inputs ---

    /// A user interaction reached the page.
    pub fn interaction(&mut self, kind: InteractionKind) {
        if self.ctx.interaction(kind) {
            self.apply_platform_mute();
        }
    }

    /// The host finished an asynchronous resume of the graph backend.
    pub fn backend_resumed(&mut self, result: Result<()>) {
        if self.ctx.backend_resumed(result) {
            self.apply_platform_mute();
        }
    }

    /// The host reports that a sound ended on its own.
    pub fn sound_ended(&mut self, id: SoundId) {
        if !self.finish_playback(id) {
            trace!("{id} ended");
        }
    }

    fn finish_playback(&mut self, id: SoundId) -> bool {
        if !self.playback.finish(&mut self.ctx, id, &self.ambient) {
            return false;
        }
        self.ctx.emit(EngineEvent::PlaybackFinished { id });
        true
    }

    /// Run one fade step and check whether the playback clip ended.
    pub fn tick(&mut self) {
        for finished in self.ctx.fades.tick() {
            if finished.completion == FadeCompletion::Pause {
                let id = finished.handle.id();
                self.ambient.retire(id);
                self.ctx.release(id);
            }
        }

        if let Some(id) = self.playback.poll() {
            self.finish_playback(id);
        }
    }

    /// Run as many ticks as fit into `elapsed` plus any leftover from earlier calls.
    /// Returns the number of ticks run.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        let interval = self.tick_interval();
        self.carry += elapsed;

        let mut ticks = 0;
        while self.carry >= interval {
            self.carry -= interval;
            self.tick();
            ticks += 1;
        }
        ticks
    }

    pub fn tick_interval(&self) -> Duration {
        self.ctx.fades.tick_interval()
    }

    // --- Observation ---

    pub const fn volumes(&self) -> VolumePreferences {
        self.ctx.levels().preferences()
    }

    pub const fn unlock_state(&self) -> UnlockState {
        self.ctx.unlock_state()
    }

    pub const fn output_kind(&self) -> OutputKind {
        self.ctx.output_kind()
    }

    pub fn ambient_state(&self) -> AmbientState {
        self.ambient.state(&self.ctx.fades)
    }

    pub fn ambient_key(&self) -> Option<&str> {
        self.ambient.key()
    }

    /// The current ambient handle.
    pub fn ambient_handle(&self) -> Option<&SoundHandle<B::Element>> {
        self.ambient.current()
    }

    /// The ambient handle still fading out after a switch.
    pub fn ambient_previous_handle(&self) -> Option<&SoundHandle<B::Element>> {
        self.ambient.previous()
    }

    pub fn playback_handle(&self) -> Option<&SoundHandle<B::Element>> {
        self.playback.current()
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    pub fn effect_handles(&self) -> impl Iterator<Item = &SoundHandle<B::Element>> {
        self.effects.handles()
    }

    pub const fn playback_active(&self) -> bool {
        self.playback.is_active()
    }

    /// Whether the handle `id` is routed through the bus graph.
    pub fn is_wired(&self, id: SoundId) -> bool {
        self.ctx.routing().is_wired(id)
    }

    pub fn is_pending(&self, id: SoundId) -> bool {
        self.ctx.routing().is_pending(id)
    }

    pub fn bus_gains(&self) -> Option<BusGains> {
        self.ctx.bus_gains()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let routing = self.ctx.routing();
        EngineSnapshot {
            platform: self.ctx.platform(),
            unlock: self.unlock_state(),
            degraded: self.ctx.gate().is_degraded(),
            output: self.output_kind(),
            muted: self.is_muted(),
            volumes: self.volumes(),
            bus_gains: self.bus_gains(),
            ambient: self.ambient_state(),
            playback: self.playback.current().map(SoundHandle::id),
            effects: self.effects.ids(),
            pending_registrations: routing.pending_len(),
            wired_sounds: routing.wired_len(),
            active_fades: self.ctx.fades.active(),
        }
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        self.ctx.subscribe()
    }

    pub const fn backend(&self) -> &B {
        self.ctx.backend()
    }

    pub fn backend_mut(&mut self) -> &mut B {
        self.ctx.backend_mut()
    }
}
