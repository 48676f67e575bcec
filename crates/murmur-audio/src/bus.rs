//! The volume bus graph: ambient and effects buses feeding a master bus.

use murmur_core::{Bus, Result, SoundCategory};
use serde::Serialize;
use tracing::debug;

use crate::backend::{AudioGraph, ContextState, NodeId, ResumeOutcome};
use crate::levels::MixLevels;

/// Gains last written to the buses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BusGains {
    pub master: f32,
    pub ambient: f32,
    pub effects: f32,
}

impl BusGains {
    fn from_levels(levels: &MixLevels) -> Self {
        Self {
            master: levels.master_gain(),
            ambient: levels.live(SoundCategory::Ambient),
            effects: levels.live(SoundCategory::Effect),
        }
    }
}

/// A graph backend with the three buses built and connected.
pub struct BusGraph<G> {
    graph: G,
    master: NodeId,
    ambient: NodeId,
    effects: NodeId,
    gains: BusGains,
}

impl<G: AudioGraph> BusGraph<G> {
    /// Create the buses on `graph`: master to the output, ambient and effects into master.
    pub fn build(mut graph: G, levels: &MixLevels) -> Result<Self> {
        let gains = BusGains::from_levels(levels);

        let master = graph.create_gain(gains.master)?;
        graph.connect_to_output(master)?;

        let ambient = graph.create_gain(gains.ambient)?;
        let effects = graph.create_gain(gains.effects)?;
        graph.connect(ambient, master)?;
        graph.connect(effects, master)?;

        debug!("Bus graph built: master={master:?} ambient={ambient:?} effects={effects:?}");

        Ok(Self {
            graph,
            master,
            ambient,
            effects,
            gains,
        })
    }

    /// The gain node a bus is mixed on. Playback shares the effects node.
    pub const fn node(&self, bus: Bus) -> NodeId {
        match bus {
            Bus::Master => self.master,
            Bus::Ambient => self.ambient,
            Bus::Playback | Bus::Effects => self.effects,
        }
    }

    pub const fn gains(&self) -> BusGains {
        self.gains
    }

    /// Write master, ambient, and effects gains from the current levels.
    pub fn apply_levels(&mut self, levels: &MixLevels) {
        let gains = BusGains::from_levels(levels);
        self.graph.set_gain(self.master, gains.master);
        self.graph.set_gain(self.ambient, gains.ambient);
        self.graph.set_gain(self.effects, gains.effects);
        self.gains = gains;
    }

    pub fn state(&self) -> ContextState {
        self.graph.state()
    }

    pub fn resume(&mut self) -> Result<ResumeOutcome> {
        self.graph.resume()
    }

    /// Play the silent unlock buffer through the master bus.
    pub fn prime(&mut self, sample_rate: u32) -> Result<()> {
        self.graph.play_silence(self.master, sample_rate)
    }

    pub fn connect_element(&mut self, element: &mut G::Element, bus: Bus) -> Result<()> {
        let node = self.node(bus);
        self.graph.connect_element(element, node)
    }
}
