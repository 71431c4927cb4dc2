// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The recipe: the user-facing description of cells and their wiring

use ahash::AHashMap;
use synfire_types::{CellId, Connection};

use crate::generator::EventGenerator;
use crate::schedule::Schedule;

pub use synfire_comm::ConnectionSource;

/// The kinds of cell the engine integrates.
///
/// A closed tagged set rather than an open hierarchy; groups dispatch on the
/// tag. Numerical cable/LIF kinds live with the compute side, outside this
/// core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// Emits spikes at schedule times; records the events delivered to it.
    SpikeSource,
    /// Spike-source stand-in used for load and pipeline testing; does not
    /// record deliveries.
    Benchmark,
}

/// Per-cell payload matching the cell's kind.
#[derive(Debug, Clone)]
pub enum CellDescription {
    SpikeSource(Schedule),
    Benchmark(Schedule),
}

impl CellDescription {
    pub fn kind(&self) -> CellKind {
        match self {
            CellDescription::SpikeSource(_) => CellKind::SpikeSource,
            CellDescription::Benchmark(_) => CellKind::Benchmark,
        }
    }
}

/// Enumerates cells, their descriptions, their inbound connections, and any
/// event generators attached to them.
///
/// Must be callable concurrently from arbitrary threads and side-effect
/// free. `connections_on(gid)` (from [`ConnectionSource`]) returns the
/// connections terminating on cell `gid`.
pub trait Recipe: ConnectionSource {
    fn cell_kind(&self, gid: CellId) -> CellKind;

    fn cell_description(&self, gid: CellId) -> CellDescription;

    /// Generators pre-seeding sites on cell `gid`. Default: none.
    fn event_generators(&self, _gid: CellId) -> Vec<EventGenerator> {
        Vec::new()
    }
}

/// In-memory recipe over explicit vectors, for tests and demos.
///
/// Cells default to spike sources that never fire; descriptions and
/// generators are attached per gid.
#[derive(Debug, Clone, Default)]
pub struct VecRecipe {
    num_cells: u32,
    connections: Vec<Connection>,
    descriptions: AHashMap<u32, CellDescription>,
    generators: AHashMap<u32, Vec<EventGenerator>>,
}

impl VecRecipe {
    pub fn new(num_cells: u32) -> Self {
        Self {
            num_cells,
            ..Default::default()
        }
    }

    pub fn with_connections(mut self, connections: Vec<Connection>) -> Self {
        self.connections = connections;
        self
    }

    pub fn add_connection(&mut self, con: Connection) {
        self.connections.push(con);
    }

    pub fn set_description(&mut self, gid: u32, description: CellDescription) {
        self.descriptions.insert(gid, description);
    }

    pub fn add_generator(&mut self, gid: u32, generator: EventGenerator) {
        self.generators.entry(gid).or_default().push(generator);
    }
}

impl ConnectionSource for VecRecipe {
    fn num_cells(&self) -> u32 {
        self.num_cells
    }

    fn connections_on(&self, gid: CellId) -> Vec<Connection> {
        self.connections
            .iter()
            .filter(|c| c.dest.gid == gid.0)
            .copied()
            .collect()
    }
}

impl Recipe for VecRecipe {
    fn cell_kind(&self, gid: CellId) -> CellKind {
        self.descriptions
            .get(&gid.0)
            .map(CellDescription::kind)
            .unwrap_or(CellKind::SpikeSource)
    }

    fn cell_description(&self, gid: CellId) -> CellDescription {
        self.descriptions
            .get(&gid.0)
            .cloned()
            .unwrap_or_else(|| CellDescription::SpikeSource(Schedule::empty()))
    }

    fn event_generators(&self, gid: CellId) -> Vec<EventGenerator> {
        self.generators.get(&gid.0).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synfire_types::CellSite;

    #[test]
    fn vec_recipe_filters_connections_by_destination() {
        let recipe = VecRecipe::new(3).with_connections(vec![
            Connection::new(CellSite::new(0, 0), CellSite::new(1, 0), 1.0, 2.0),
            Connection::new(CellSite::new(0, 0), CellSite::new(2, 0), 1.0, 2.0),
            Connection::new(CellSite::new(1, 0), CellSite::new(2, 0), 1.0, 2.0),
        ]);
        assert_eq!(recipe.connections_on(CellId(0)).len(), 0);
        assert_eq!(recipe.connections_on(CellId(1)).len(), 1);
        assert_eq!(recipe.connections_on(CellId(2)).len(), 2);
    }

    #[test]
    fn undescribed_cells_default_to_silent_sources() {
        let recipe = VecRecipe::new(1);
        assert_eq!(recipe.cell_kind(CellId(0)), CellKind::SpikeSource);
        match recipe.cell_description(CellId(0)) {
            CellDescription::SpikeSource(mut s) => {
                assert!(s.events(0.0, f64::INFINITY).is_empty())
            }
            other => panic!("unexpected description {other:?}"),
        }
    }
}
