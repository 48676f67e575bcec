//! The looping background track and its crossfade.

use std::time::Duration;

use murmur_core::SoundCategory;
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::backend::{MediaBackend, MediaElement};
use crate::context::EngineContext;
use crate::fade::{FadeCompletion, FadeScheduler};
use crate::handle::{SoundHandle, SoundId};

/// What the ambient player is doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AmbientState {
    Idle,
    Playing { key: String },
    Crossfading { from: String, to: String },
}

struct AmbientSlot<E> {
    handle: SoundHandle<E>,
    key: String,
}

/// At most one current ambient track, plus the one it is fading out.
pub struct AmbientPlayer<E> {
    current: Option<AmbientSlot<E>>,
    previous: Option<AmbientSlot<E>>,
    crossfade: Duration,
}

impl<E: MediaElement + 'static> AmbientPlayer<E> {
    pub const fn new(crossfade: Duration) -> Self {
        Self {
            current: None,
            previous: None,
            crossfade,
        }
    }

    /// Switch to `key`, crossfading from whatever plays now. Returns false if `key`
    /// is already the current track.
    ///
    /// With `held` set (a playback clip is running) the new track takes the slot
    /// paused and the old one is dropped without a fade. [`Self::resume`] starts it.
    pub fn play<B>(
        &mut self,
        ctx: &mut EngineContext<B>,
        source: &str,
        key: &str,
        held: bool,
    ) -> bool
    where
        B: MediaBackend<Element = E>,
    {
        if self.current.as_ref().is_some_and(|slot| slot.key == key) {
            trace!("Ambient {key} already playing");
            return false;
        }

        if held {
            if let Some(outgoing) = self.current.take() {
                let id = outgoing.handle.id();
                outgoing.handle.pause();
                ctx.fades.cancel(id);
                ctx.release(id);
            }
            let handle = ctx.create_handle(source, SoundCategory::Ambient, 0.0);
            info!("Queued ambient {key} behind playback");
            self.current = Some(AmbientSlot {
                handle,
                key: key.to_string(),
            });
            return true;
        }

        let live = ctx.live(SoundCategory::Ambient);
        let handle = ctx.create_handle(source, SoundCategory::Ambient, 0.0);
        handle.start();

        if let Some(outgoing) = self.current.take() {
            ctx.fades.fade(
                &outgoing.handle,
                live,
                0.0,
                self.crossfade,
                FadeCompletion::Pause,
            );
            info!("Crossfading ambient {} -> {key}", outgoing.key);
            // An overwritten slot's handle is still owned by its fade-out.
            if let Some(superseded) = self.previous.replace(outgoing) {
                debug!("{} left to finish its fade-out", superseded.handle.id());
            }
        } else {
            info!("Starting ambient {key}");
        }

        ctx.fades
            .fade(&handle, 0.0, live, self.crossfade, FadeCompletion::Hold);
        self.current = Some(AmbientSlot {
            handle,
            key: key.to_string(),
        });
        true
    }

    /// Pause the current track and any track still fading out.
    pub fn pause(&self) {
        for slot in self.current.iter().chain(&self.previous) {
            slot.handle.pause();
        }
    }

    /// Continue the current track at the live ambient volume.
    pub fn resume<B>(&self, ctx: &mut EngineContext<B>)
    where
        B: MediaBackend<Element = E>,
    {
        let Some(slot) = &self.current else {
            return;
        };
        ctx.fades.cancel(slot.handle.id());
        slot.handle.set_volume(ctx.live(SoundCategory::Ambient));
        slot.handle.start();
    }

    /// Stop and forget the current track. Returns false if nothing was playing.
    pub fn stop<B>(&mut self, ctx: &mut EngineContext<B>) -> bool
    where
        B: MediaBackend<Element = E>,
    {
        let Some(slot) = self.current.take() else {
            return false;
        };
        let id = slot.handle.id();
        slot.handle.stop();
        ctx.fades.cancel(id);
        ctx.release(id);
        info!("Stopped ambient {}", slot.key);
        true
    }

    /// Clear the previous slot once the fade-out of `id` finished.
    pub fn retire(&mut self, id: SoundId) -> bool {
        if self.previous.as_ref().is_some_and(|slot| slot.handle.id() == id) {
            self.previous = None;
            return true;
        }
        false
    }

    pub fn state(&self, fades: &FadeScheduler<E>) -> AmbientState {
        match (&self.current, &self.previous) {
            (None, _) => AmbientState::Idle,
            (Some(current), Some(previous)) if fades.is_fading(previous.handle.id()) => {
                AmbientState::Crossfading {
                    from: previous.key.clone(),
                    to: current.key.clone(),
                }
            }
            (Some(current), _) => AmbientState::Playing {
                key: current.key.clone(),
            },
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.current.as_ref().map(|slot| slot.key.as_str())
    }

    pub fn current(&self) -> Option<&SoundHandle<E>> {
        self.current.as_ref().map(|slot| &slot.handle)
    }

    pub fn previous(&self) -> Option<&SoundHandle<E>> {
        self.previous.as_ref().map(|slot| &slot.handle)
    }
}
