//! Bounded pool of fire-and-forget effect sounds.

use std::collections::VecDeque;

use murmur_core::SoundCategory;
use tracing::debug;

use crate::backend::{MediaBackend, MediaElement};
use crate::context::EngineContext;
use crate::handle::{SoundHandle, SoundId};

/// Effects in insertion order. The front is evicted first.
pub struct EffectPool<E> {
    entries: VecDeque<SoundHandle<E>>,
    capacity: usize,
}

impl<E: MediaElement + 'static> EffectPool<E> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn play<B>(&mut self, ctx: &mut EngineContext<B>, source: &str) -> SoundId
    where
        B: MediaBackend<Element = E>,
    {
        self.purge(ctx);

        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.entries.pop_front() else {
                break;
            };
            oldest.pause();
            ctx.release(oldest.id());
            debug!("Evicted {} for {source}", oldest.id());
        }

        let volume = ctx.live(SoundCategory::Effect);
        let handle = ctx.create_handle(source, SoundCategory::Effect, volume);
        let id = handle.id();
        self.entries.push_back(handle.clone());
        handle.start();
        id
    }

    /// Drop entries that ended or were paused. Returns how many were dropped.
    pub fn purge<B>(&mut self, ctx: &mut EngineContext<B>) -> usize
    where
        B: MediaBackend<Element = E>,
    {
        let before = self.entries.len();
        self.entries.retain(|handle| {
            if handle.is_stale() {
                ctx.release(handle.id());
                false
            } else {
                true
            }
        });
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = &SoundHandle<E>> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<SoundId> {
        self.entries.iter().map(SoundHandle::id).collect()
    }
}
