// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Minimal cell groups: spike sources and benchmark stand-ins
//!
//! Cable/LIF kinematics are an external collaborator; the groups here are the
//! closed set the core itself ships, enough to drive the exchange machinery
//! and to observe deliveries in tests. Dispatch is over a tagged enum, not an
//! inheritance hierarchy.

use synfire_types::{CellSite, Spike, SynapticEvent};

use crate::schedule::Schedule;

/// One epoch's integration window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochWindow {
    pub t_from: f64,
    pub t_to: f64,
    /// Integration step used inside the window (binning reference).
    pub dt: f64,
}

/// Event-time quantisation applied on delivery.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BinningPolicy {
    /// Deliver at the exact event time.
    #[default]
    None,
    /// Quantise to `floor(t / interval) * interval`.
    Regular(f64),
    /// Snap to the last integration step at or before the event time.
    Following,
}

impl BinningPolicy {
    fn apply(&self, time: f64, window: &EpochWindow) -> f64 {
        match *self {
            BinningPolicy::None => time,
            BinningPolicy::Regular(interval) => (time / interval).floor() * interval,
            BinningPolicy::Following => {
                let steps = ((time - window.t_from) / window.dt).floor().max(0.0);
                window.t_from + steps * window.dt
            }
        }
    }
}

/// One spiking cell: a source site bound to its firing schedule.
#[derive(Debug, Clone)]
struct SourceCell {
    source: CellSite,
    schedule: Schedule,
}

/// A group of schedule-driven cells.
///
/// `advance` emits the group's spikes for the window and, when `recording`,
/// keeps every delivered event (after binning) for inspection.
#[derive(Debug, Clone)]
pub struct SpikeSourceGroup {
    cells: Vec<SourceCell>,
    binning: BinningPolicy,
    recording: bool,
    delivered: Vec<SynapticEvent>,
}

impl SpikeSourceGroup {
    fn new(cells: Vec<SourceCell>, recording: bool) -> Self {
        Self {
            cells,
            binning: BinningPolicy::None,
            recording,
            delivered: Vec::new(),
        }
    }

    fn advance(&mut self, window: &EpochWindow, events: &[SynapticEvent]) -> Vec<Spike> {
        if self.recording {
            self.delivered.extend(
                events
                    .iter()
                    .map(|e| SynapticEvent::new(e.target, self.binning.apply(e.time, window), e.weight)),
            );
        }

        let mut spikes = Vec::new();
        for cell in &mut self.cells {
            for t in cell.schedule.events(window.t_from, window.t_to) {
                spikes.push(Spike::new(cell.source, t));
            }
        }
        spikes
    }

    fn reset(&mut self) {
        for cell in &mut self.cells {
            cell.schedule.reset();
        }
        self.delivered.clear();
    }
}

/// The closed set of group kinds the core integrates.
#[derive(Debug, Clone)]
pub enum CellGroup {
    SpikeSource(SpikeSourceGroup),
    Benchmark(SpikeSourceGroup),
}

impl CellGroup {
    pub fn spike_source(cells: Vec<(CellSite, Schedule)>) -> Self {
        CellGroup::SpikeSource(SpikeSourceGroup::new(
            cells
                .into_iter()
                .map(|(source, schedule)| SourceCell { source, schedule })
                .collect(),
            true,
        ))
    }

    pub fn benchmark(cells: Vec<(CellSite, Schedule)>) -> Self {
        CellGroup::Benchmark(SpikeSourceGroup::new(
            cells
                .into_iter()
                .map(|(source, schedule)| SourceCell { source, schedule })
                .collect(),
            false,
        ))
    }

    fn inner(&mut self) -> &mut SpikeSourceGroup {
        match self {
            CellGroup::SpikeSource(g) | CellGroup::Benchmark(g) => g,
        }
    }

    /// Integrate `[window.t_from, window.t_to)`: consume the due events,
    /// emit this window's spikes.
    pub fn advance(&mut self, window: &EpochWindow, events: &[SynapticEvent]) -> Vec<Spike> {
        self.inner().advance(window, events)
    }

    pub fn set_binning(&mut self, policy: BinningPolicy) {
        self.inner().binning = policy;
    }

    /// Events delivered so far (spike-source groups only; benchmark groups
    /// do not record).
    pub fn delivered(&self) -> &[SynapticEvent] {
        match self {
            CellGroup::SpikeSource(g) | CellGroup::Benchmark(g) => &g.delivered,
        }
    }

    pub fn reset(&mut self) {
        self.inner().reset();
    }
}
