//! Sound handles: one per play request.

use std::fmt;
use std::sync::Arc;

use murmur_core::SoundCategory;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::MediaElement;

/// Identity of a sound handle, unique per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SoundId(pub u64);

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound#{}", self.0)
    }
}

/// A playable sound wrapping one platform element.
///
/// Clones share the element, so a fade can keep its own reference after the slot
/// that started it has moved on.
pub struct SoundHandle<E> {
    id: SoundId,
    category: SoundCategory,
    source: Arc<str>,
    element: Arc<Mutex<E>>,
}

impl<E> Clone for SoundHandle<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            category: self.category,
            source: self.source.clone(),
            element: self.element.clone(),
        }
    }
}

impl<E> fmt::Debug for SoundHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundHandle")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl<E: MediaElement> SoundHandle<E> {
    pub fn new(id: SoundId, category: SoundCategory, source: &str, element: E) -> Self {
        Self {
            id,
            category,
            source: Arc::from(source),
            element: Arc::new(Mutex::new(element)),
        }
    }

    pub const fn id(&self) -> SoundId {
        self.id
    }

    pub const fn category(&self) -> SoundCategory {
        self.category
    }

    /// Start playback. A refused start leaves the element paused and is not retried.
    pub fn start(&self) -> bool {
        match self.element.lock().play() {
            Ok(()) => true,
            Err(e) if e.is_autoplay_blocked() => {
                debug!("{} ({}) not started: {e}", self.id, self.source);
                false
            }
            Err(e) => {
                warn!("{} ({}) failed to start: {e}", self.id, self.source);
                false
            }
        }
    }

    pub fn pause(&self) {
        self.element.lock().pause();
    }

    /// Pause and rewind to the start.
    pub fn stop(&self) {
        let mut element = self.element.lock();
        element.pause();
        element.rewind();
    }

    pub fn volume(&self) -> f32 {
        self.element.lock().volume()
    }

    pub fn set_volume(&self, volume: f32) {
        self.element.lock().set_volume(volume.clamp(0.0, 1.0));
    }

    pub fn is_muted(&self) -> bool {
        self.element.lock().is_muted()
    }

    pub fn set_muted(&self, muted: bool) {
        self.element.lock().set_muted(muted);
    }

    pub fn is_paused(&self) -> bool {
        self.element.lock().is_paused()
    }

    pub fn is_ended(&self) -> bool {
        self.element.lock().is_ended()
    }

    /// Ended or paused; such effects are purged from the pool.
    pub fn is_stale(&self) -> bool {
        let element = self.element.lock();
        element.is_ended() || element.is_paused()
    }

    /// Run `f` with exclusive access to the underlying element.
    pub fn with_element<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        let mut element = self.element.lock();
        f(&mut *element)
    }
}
