//! Which handles are wired into the graph backend, and on which bus.
//!
//! A handle is wired at most once. Handles created before the graph exists wait in
//! the pending set until unlock completes.

use std::collections::HashMap;

use murmur_core::Bus;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::backend::{AudioGraph, MediaElement};
use crate::bus::BusGraph;
use crate::handle::{SoundHandle, SoundId};

/// Routing state of one handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutingEntry {
    pub bus: Bus,
    pub wired: bool,
}

/// Result of a registration or wiring attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Connected to the graph just now.
    Wired,
    /// Was already connected; nothing happened.
    AlreadyWired,
    /// Queued until the graph exists.
    Pending,
    /// The graph refused the connection; the handle stays on the direct path.
    Failed,
}

pub struct RoutingTable<E> {
    entries: HashMap<SoundId, RoutingEntry>,
    pending: Vec<SoundHandle<E>>,
}

impl<E> Default for RoutingTable<E> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            pending: Vec::new(),
        }
    }
}

impl<E: MediaElement> RoutingTable<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the handle now if a graph is available, otherwise queue it.
    pub fn register<G>(
        &mut self,
        handle: &SoundHandle<E>,
        graph: Option<&mut BusGraph<G>>,
    ) -> Registration
    where
        G: AudioGraph<Element = E>,
    {
        let entry = self.entries.entry(handle.id()).or_insert(RoutingEntry {
            bus: handle.category().bus(),
            wired: false,
        });
        if entry.wired {
            return Registration::AlreadyWired;
        }

        match graph {
            Some(graph) => self.wire(handle, graph),
            None => {
                if !self.is_pending(handle.id()) {
                    trace!("{} queued for routing", handle.id());
                    self.pending.push(handle.clone());
                }
                Registration::Pending
            }
        }
    }

    /// Connect the handle to its bus unless it already is, then silence its direct path.
    pub fn wire<G>(&mut self, handle: &SoundHandle<E>, graph: &mut BusGraph<G>) -> Registration
    where
        G: AudioGraph<Element = E>,
    {
        let entry = self.entries.entry(handle.id()).or_insert(RoutingEntry {
            bus: handle.category().bus(),
            wired: false,
        });
        if entry.wired {
            return Registration::AlreadyWired;
        }

        let bus = entry.bus;
        match handle.with_element(|element| graph.connect_element(element, bus)) {
            Ok(()) => {
                entry.wired = true;
                handle.set_muted(true);
                debug!("{} wired to {bus} bus", handle.id());
                Registration::Wired
            }
            Err(e) => {
                warn!("Failed to route {} to {bus} bus: {e}", handle.id());
                Registration::Failed
            }
        }
    }

    /// Wire every pending handle. Returns how many were newly wired.
    pub fn drain_pending<G>(&mut self, graph: &mut BusGraph<G>) -> usize
    where
        G: AudioGraph<Element = E>,
    {
        let pending = std::mem::take(&mut self.pending);
        pending
            .iter()
            .filter(|handle| self.wire(handle, graph) == Registration::Wired)
            .count()
    }

    /// Forget every pending handle; they stay on the direct path.
    pub fn discard_pending(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }

    /// Forget a handle the engine no longer owns.
    pub fn release(&mut self, id: SoundId) {
        self.entries.remove(&id);
        self.pending.retain(|handle| handle.id() != id);
    }

    pub fn entry(&self, id: SoundId) -> Option<RoutingEntry> {
        self.entries.get(&id).copied()
    }

    pub fn is_wired(&self, id: SoundId) -> bool {
        self.entries.get(&id).is_some_and(|entry| entry.wired)
    }

    pub fn is_pending(&self, id: SoundId) -> bool {
        self.pending.iter().any(|handle| handle.id() == id)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn wired_len(&self) -> usize {
        self.entries.values().filter(|entry| entry.wired).count()
    }
}
