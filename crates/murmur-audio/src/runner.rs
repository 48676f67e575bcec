//! Drives an engine's tick cadence on a dedicated thread.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use murmur_core::{Error, Result};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::backend::MediaBackend;
use crate::engine::AudioEngine;

/// Owns the engine behind a mutex and advances it on wall-clock time.
///
/// Every public engine operation goes through [`lock`](Self::lock), so host calls and
/// ticks never interleave.
pub struct EngineRunner<B: MediaBackend> {
    engine: Arc<Mutex<AudioEngine<B>>>,
    shutdown_tx: Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl<B: MediaBackend + 'static> EngineRunner<B> {
    pub fn spawn(engine: AudioEngine<B>) -> Result<Self> {
        Self::spawn_with(engine, |_, _| {})
    }

    /// Like [`spawn`](Self::spawn), calling `hook` with the elapsed time before each
    /// advance. The headless backend uses it to move playback time along.
    pub fn spawn_with<F>(engine: AudioEngine<B>, mut hook: F) -> Result<Self>
    where
        F: FnMut(&mut AudioEngine<B>, Duration) + Send + 'static,
    {
        let interval = engine.tick_interval();
        let engine = Arc::new(Mutex::new(engine));
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

        let worker_engine = engine.clone();
        let worker = std::thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || {
                info!("Engine runner started, ticking every {interval:?}");
                let mut last = Instant::now();

                loop {
                    match shutdown_rx.recv_timeout(interval) {
                        Ok(()) => {
                            info!("Engine runner shutting down");
                            break;
                        }
                        Err(RecvTimeoutError::Disconnected) => {
                            debug!("Runner handle dropped, shutting down");
                            break;
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                    }

                    let now = Instant::now();
                    let elapsed = now - last;
                    last = now;

                    let mut engine = worker_engine.lock();
                    hook(&mut *engine, elapsed);
                    engine.advance(elapsed);
                }
            })
            .map_err(|e| Error::Runner(format!("Failed to spawn engine thread: {e}")))?;

        Ok(Self {
            engine,
            shutdown_tx,
            worker: Some(worker),
        })
    }

    /// Exclusive access to the engine.
    pub fn lock(&self) -> MutexGuard<'_, AudioEngine<B>> {
        self.engine.lock()
    }

    /// A shared reference for host callbacks living on other threads.
    pub fn engine(&self) -> Arc<Mutex<AudioEngine<B>>> {
        self.engine.clone()
    }

    /// Stop the thread and wait for it.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        let _ = self.shutdown_tx.send(());
        worker
            .join()
            .map_err(|_| Error::Runner("engine thread panicked".to_string()))
    }
}

impl<B: MediaBackend> Drop for EngineRunner<B> {
    fn drop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.shutdown_tx.send(());
        if worker.join().is_err() {
            warn!("Engine thread panicked");
        }
    }
}
