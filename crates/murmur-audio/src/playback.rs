//! The single interrupting clip.

use murmur_core::SoundCategory;
use tracing::{debug, info};

use crate::ambient::AmbientPlayer;
use crate::backend::{MediaBackend, MediaElement};
use crate::context::EngineContext;
use crate::handle::{SoundHandle, SoundId};

/// Plays one clip at a time, pausing the ambient track while it runs.
pub struct PlaybackPlayer<E> {
    current: Option<SoundHandle<E>>,
}

impl<E> Default for PlaybackPlayer<E> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<E: MediaElement + 'static> PlaybackPlayer<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play<B>(
        &mut self,
        ctx: &mut EngineContext<B>,
        source: &str,
        ambient: &AmbientPlayer<E>,
    ) -> SoundId
    where
        B: MediaBackend<Element = E>,
    {
        if let Some(interrupted) = self.current.take() {
            interrupted.pause();
            ctx.release(interrupted.id());
            debug!("{} interrupted by {source}", interrupted.id());
        }
        ambient.pause();

        let volume = ctx.live(SoundCategory::Playback);
        let handle = ctx.create_handle(source, SoundCategory::Playback, volume);
        handle.start();
        info!("Playing {source}");

        let id = handle.id();
        self.current = Some(handle);
        id
    }

    /// The clip `id` ended on its own: clear the slot and bring ambient back.
    /// Returns false if `id` is not the current clip.
    pub fn finish<B>(
        &mut self,
        ctx: &mut EngineContext<B>,
        id: SoundId,
        ambient: &AmbientPlayer<E>,
    ) -> bool
    where
        B: MediaBackend<Element = E>,
    {
        if self.current.as_ref().map(SoundHandle::id) != Some(id) {
            return false;
        }
        self.current = None;
        ctx.release(id);
        ambient.resume(ctx);
        info!("Playback {id} finished");
        true
    }

    /// The current clip, if it ended.
    pub fn poll(&self) -> Option<SoundId> {
        self.current
            .as_ref()
            .filter(|handle| handle.is_ended())
            .map(SoundHandle::id)
    }

    /// Stop the clip without resuming ambient.
    pub fn stop<B>(&mut self, ctx: &mut EngineContext<B>) -> bool
    where
        B: MediaBackend<Element = E>,
    {
        let Some(handle) = self.current.take() else {
            return false;
        };
        handle.stop();
        ctx.release(handle.id());
        true
    }

    pub const fn current(&self) -> Option<&SoundHandle<E>> {
        self.current.as_ref()
    }

    pub const fn is_active(&self) -> bool {
        self.current.is_some()
    }
}
