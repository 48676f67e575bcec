//! Linear volume ramps driven by a fixed tick cadence.
//!
//! Each handle has at most one active fade. Starting a new fade on a handle replaces
//! the old one, so a superseded ramp never touches the volume again. Fades on
//! different handles run independently.

use std::collections::HashMap;
use std::time::Duration;

use tracing::trace;

use crate::backend::MediaElement;
use crate::handle::{SoundHandle, SoundId};

/// Identifies one started fade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FadeToken(u64);

/// What happens to the handle once a fade reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeCompletion {
    /// Leave the handle playing at the target volume.
    Hold,
    /// Pause the handle.
    Pause,
}

/// A fade that reached its target during a tick.
#[derive(Debug)]
pub struct FinishedFade<E> {
    pub token: FadeToken,
    pub handle: SoundHandle<E>,
    pub completion: FadeCompletion,
}

struct ActiveFade<E> {
    token: FadeToken,
    handle: SoundHandle<E>,
    target: f32,
    delta: f32,
    remaining: u32,
    completion: FadeCompletion,
}

/// Drives every in-flight fade.
pub struct FadeScheduler<E> {
    tick: Duration,
    fades: HashMap<SoundId, ActiveFade<E>>,
    next_token: u64,
}

impl<E: MediaElement> FadeScheduler<E> {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            fades: HashMap::new(),
            next_token: 0,
        }
    }

    pub const fn tick_interval(&self) -> Duration {
        self.tick
    }

    /// Number of ticks a fade of `duration` takes. Always at least one.
    pub fn steps_for(&self, duration: Duration) -> u32 {
        let tick = self.tick.as_millis().max(1);
        let steps = duration.as_millis() / tick;
        u32::try_from(steps).unwrap_or(u32::MAX).max(1)
    }

    /// Set the handle to `from` now and ramp it to `to` over `duration`.
    pub fn fade(
        &mut self,
        handle: &SoundHandle<E>,
        from: f32,
        to: f32,
        duration: Duration,
        completion: FadeCompletion,
    ) -> FadeToken {
        let steps = self.steps_for(duration);
        let delta = (to - from) / steps as f32;
        let token = FadeToken(self.next_token);
        self.next_token += 1;

        handle.set_volume(from);

        let fade = ActiveFade {
            token,
            handle: handle.clone(),
            target: to,
            delta,
            remaining: steps,
            completion,
        };

        if let Some(superseded) = self.fades.insert(handle.id(), fade) {
            trace!(
                "{} fade {:?} superseded by {:?}",
                handle.id(),
                superseded.token,
                token
            );
        }
        trace!("{} fading {from:.2} -> {to:.2} in {steps} steps", handle.id());

        token
    }

    /// Point the active fade of a handle at `to`, reaching it from the handle's current
    /// volume in the steps that remain. Returns false if the handle is not fading.
    pub fn retarget(&mut self, id: SoundId, to: f32) -> bool {
        let Some(fade) = self.fades.get_mut(&id) else {
            return false;
        };
        fade.delta = (to - fade.handle.volume()) / fade.remaining.max(1) as f32;
        fade.target = to;
        true
    }

    /// Drop the active fade of a handle. The volume stays where it is.
    pub fn cancel(&mut self, id: SoundId) -> bool {
        self.fades.remove(&id).is_some()
    }

    pub fn is_fading(&self, id: SoundId) -> bool {
        self.fades.contains_key(&id)
    }

    /// The active fade of a handle, if any.
    pub fn token_of(&self, id: SoundId) -> Option<FadeToken> {
        self.fades.get(&id).map(|fade| fade.token)
    }

    pub fn active(&self) -> usize {
        self.fades.len()
    }

    /// Advance every fade by one step and return those that finished.
    pub fn tick(&mut self) -> Vec<FinishedFade<E>> {
        let mut finished_ids = Vec::new();

        for (id, fade) in &mut self.fades {
            fade.remaining = fade.remaining.saturating_sub(1);
            if fade.remaining == 0 {
                fade.handle.set_volume(fade.target);
                finished_ids.push(*id);
            } else {
                let next = fade.handle.volume() + fade.delta;
                fade.handle.set_volume(next);
            }
        }

        finished_ids
            .into_iter()
            .filter_map(|id| self.fades.remove(&id))
            .map(|fade| {
                if fade.completion == FadeCompletion::Pause {
                    fade.handle.pause();
                }
                trace!("{} fade {:?} done", fade.handle.id(), fade.token);
                FinishedFade {
                    token: fade.token,
                    handle: fade.handle,
                    completion: fade.completion,
                }
            })
            .collect()
    }
}
