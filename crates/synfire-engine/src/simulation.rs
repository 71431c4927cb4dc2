// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The simulation driver: epoch-bounded time advancement
//!
//! The public `Simulation` facade is thin; the heavy state (communicator,
//! groups, pending buffers, callbacks) lives in the private implementation
//! object behind it. Time advances in epochs bounded by half the network
//! min-delay, with one spike exchange between consecutive epochs.

use std::sync::Arc;

use rayon::prelude::*;
use synfire_comm::{Communicator, DomainDecomposition};
use synfire_types::{CellId, CellSite, CoreError, Result, Spike, SynapticEvent};
use tracing::{debug, info, warn};

use crate::context::ExecutionContext;
use crate::generator::EventGenerator;
use crate::groups::{BinningPolicy, CellGroup, EpochWindow};
use crate::pending::PendingEvents;
use crate::recipe::{CellDescription, CellKind, Recipe};

/// Export callback receiving a spike vector at the end of each exchange.
pub type SpikeExportFn = Box<dyn FnMut(&[Spike]) + Send>;

/// Callback pulling spikes from a foreign simulator for the epoch starting
/// at the given time. A returned error terminates the run between epochs.
pub type ExternalSpikeFn =
    Box<dyn FnMut(f64) -> std::result::Result<Vec<Spike>, String> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Constructed,
    Running,
    Stopped,
}

/// A distributed simulation instance over one rank's share of the network.
pub struct Simulation {
    state: Box<SimulationState>,
}

struct SimulationState {
    comm: Communicator,
    pool: Arc<rayon::ThreadPool>,
    groups: Vec<CellGroup>,
    pending: Vec<PendingEvents>,
    generators: Vec<Vec<EventGenerator>>,
    time: f64,
    epoch: u64,
    run_state: RunState,
    poisoned: bool,
    min_delay_ceiling: f64,
    global_cb: Option<SpikeExportFn>,
    local_cb: Option<SpikeExportFn>,
    external_cb: Option<ExternalSpikeFn>,
}

/// Epoch ceiling applied when the global connection set is empty and the
/// min-delay is unbounded.
pub const DEFAULT_MIN_DELAY_CEILING: f64 = 1.0;

impl Simulation {
    /// Construct this rank's simulation from the recipe, its share of the
    /// decomposition, and an execution context.
    pub fn new<R: Recipe>(
        recipe: &R,
        decomposition: DomainDecomposition,
        ctx: &ExecutionContext,
    ) -> Result<Simulation> {
        let comm = Communicator::new(
            recipe,
            &decomposition,
            ctx.collective(),
            ctx.num_threads(),
        )?;
        let rank = comm.rank();

        let mut groups = Vec::with_capacity(decomposition.groups.len());
        let mut generators = Vec::with_capacity(decomposition.groups.len());
        for (gidx, group_desc) in decomposition.groups.iter().enumerate() {
            let mut kind: Option<CellKind> = None;
            let mut cells = Vec::with_capacity(group_desc.gids.len());
            let mut group_generators = Vec::new();
            for &gid in &group_desc.gids {
                let cell_kind = recipe.cell_kind(CellId(gid));
                if *kind.get_or_insert(cell_kind) != cell_kind {
                    return Err(CoreError::Config(format!(
                        "group {gidx} mixes cell kinds; groups are homogeneous"
                    )));
                }
                let schedule = match recipe.cell_description(CellId(gid)) {
                    CellDescription::SpikeSource(s) | CellDescription::Benchmark(s) => s,
                };
                cells.push((CellSite::new(gid, 0), schedule));

                for generator in recipe.event_generators(CellId(gid)) {
                    if generator.target.gid != gid {
                        return Err(CoreError::Config(format!(
                            "generator on cell {gid} targets foreign gid {}",
                            generator.target.gid
                        )));
                    }
                    group_generators.push(generator);
                }
            }
            let group = match kind.unwrap_or(CellKind::SpikeSource) {
                CellKind::SpikeSource => CellGroup::spike_source(cells),
                CellKind::Benchmark => CellGroup::benchmark(cells),
            };
            groups.push(group);
            generators.push(group_generators);
        }

        info!(
            rank,
            groups = groups.len(),
            min_delay = comm.min_delay(),
            "simulation constructed"
        );
        let num_groups = groups.len();
        Ok(Simulation {
            state: Box::new(SimulationState {
                comm,
                pool: Arc::clone(ctx.pool()),
                groups,
                pending: vec![PendingEvents::new(); num_groups],
                generators,
                time: 0.0,
                epoch: 0,
                run_state: RunState::Constructed,
                poisoned: false,
                min_delay_ceiling: DEFAULT_MIN_DELAY_CEILING,
                global_cb: None,
                local_cb: None,
                external_cb: None,
            }),
        })
    }

    /// Advance the simulation to `t_final` in epochs of at most `dt`,
    /// returning the time reached.
    pub fn run(&mut self, t_final: f64, dt: f64) -> Result<f64> {
        self.state.run(t_final, dt)
    }

    /// Return every component to its just-constructed state. The connection
    /// table and the min-delay are untouched.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Network-wide minimum connection delay.
    pub fn min_delay(&self) -> f64 {
        self.state.comm.min_delay()
    }

    /// Tighten the stored min-delay to `min(current, t)`; returns the new
    /// value.
    pub fn clamp_min_delay(&mut self, t: f64) -> f64 {
        self.state.comm.clamp_min_delay(t)
    }

    /// Epoch ceiling used while the network has no connections.
    pub fn set_min_delay_ceiling(&mut self, ceiling: f64) -> Result<()> {
        if !(ceiling.is_finite() && ceiling > 0.0) {
            return Err(CoreError::Config(format!(
                "min-delay ceiling must be finite and > 0, got {ceiling}"
            )));
        }
        self.state.min_delay_ceiling = ceiling;
        Ok(())
    }

    /// Total global spikes observed across exchanges.
    pub fn num_spikes(&self) -> u64 {
        self.state.comm.num_spikes()
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.state.time
    }

    /// Event-time quantisation applied by every local group on delivery.
    pub fn set_binning_policy(&mut self, policy: BinningPolicy) -> Result<()> {
        if let BinningPolicy::Regular(interval) = policy {
            if !(interval.is_finite() && interval > 0.0) {
                return Err(CoreError::Config(format!(
                    "regular binning needs a positive interval, got {interval}"
                )));
            }
        }
        for group in &mut self.state.groups {
            group.set_binning(policy);
        }
        Ok(())
    }

    /// Callback invoked with the all-gathered spike vector after each
    /// exchange.
    pub fn set_global_spike_callback<F>(&mut self, f: F)
    where
        F: FnMut(&[Spike]) + Send + 'static,
    {
        self.state.global_cb = Some(Box::new(f));
    }

    /// Callback invoked with the rank-local spike vector after each
    /// exchange.
    pub fn set_local_spike_callback<F>(&mut self, f: F)
    where
        F: FnMut(&[Spike]) + Send + 'static,
    {
        self.state.local_cb = Some(Box::new(f));
    }

    /// Callback supplying spikes from a foreign simulator, merged into the
    /// local spike set just before each all-gather.
    pub fn set_external_spike_callback<F>(&mut self, f: F)
    where
        F: FnMut(f64) -> std::result::Result<Vec<Spike>, String> + Send + 'static,
    {
        self.state.external_cb = Some(Box::new(f));
    }

    /// Add events directly to their targets. Permitted only before the
    /// first `run`; event times must be at or after the current time.
    pub fn inject_events(&mut self, events: &[SynapticEvent]) -> Result<()> {
        self.state.inject_events(events)
    }

    /// The `i`-th local group (deliveries are inspectable on spike-source
    /// groups).
    pub fn group(&self, i: usize) -> &CellGroup {
        &self.state.groups[i]
    }

    pub fn num_local_groups(&self) -> usize {
        self.state.groups.len()
    }
}

impl SimulationState {
    fn run(&mut self, t_final: f64, dt: f64) -> Result<f64> {
        let rank = self.comm.rank();
        if self.poisoned {
            return Err(CoreError::precondition(
                rank,
                "run called on a failed simulation; reset first",
            ));
        }
        if self.run_state == RunState::Running {
            return Err(CoreError::precondition(
                rank,
                "run called while a run is in progress",
            ));
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(CoreError::precondition(
                rank,
                format!("run needs dt > 0, got {dt}"),
            ));
        }
        if !t_final.is_finite() {
            return Err(CoreError::precondition(
                rank,
                format!("run needs a finite t_final, got {t_final}"),
            ));
        }

        self.run_state = RunState::Running;
        let outcome = self.advance_until(t_final, dt);
        self.run_state = RunState::Stopped;
        if outcome.is_err() {
            self.poisoned = true;
        }
        outcome
    }

    fn advance_until(&mut self, t_final: f64, dt: f64) -> Result<f64> {
        while self.time < t_final {
            let tau = self.comm.min_delay();
            let bound = if tau.is_finite() {
                tau / 2.0
            } else {
                self.min_delay_ceiling
            };
            let epoch_len = bound.min(t_final - self.time).min(dt);
            let t_to = self.time + epoch_len;
            if t_to <= self.time {
                // epoch underflowed to nothing at this magnitude of time
                warn!(
                    rank = self.comm.rank(),
                    time = self.time,
                    epoch_len,
                    "epoch length vanished; stopping early"
                );
                break;
            }

            // events routed by the previous exchange (or injected) become
            // pending, generator events for this window join them
            for (gidx, pending) in self.pending.iter_mut().enumerate() {
                pending.absorb(self.comm.queue(gidx).iter().copied());
            }
            for (gidx, generators) in self.generators.iter_mut().enumerate() {
                for generator in generators {
                    self.pending[gidx].absorb(generator.events_in(self.time, t_to));
                }
            }
            let due: Vec<Vec<SynapticEvent>> = self
                .pending
                .iter_mut()
                .map(|p| p.split_due(t_to))
                .collect();

            // integrate every group on the pool; emitted spikes land in the
            // integrating worker's bin
            let window = EpochWindow {
                t_from: self.time,
                t_to,
                dt,
            };
            let SimulationState {
                pool,
                groups,
                comm,
                ..
            } = self;
            let comm = &*comm;
            pool.install(|| {
                groups
                    .par_iter_mut()
                    .zip(due.par_iter())
                    .for_each(|(group, events)| {
                        let spikes = group.advance(&window, events);
                        if !spikes.is_empty() {
                            comm.add_spikes(spikes);
                        }
                    });
            });

            // workers are joined; the exchange owns the bins now
            let external = match self.external_cb.as_mut() {
                Some(f) => f(self.time).map_err(|what| CoreError::Callback {
                    rank: self.comm.rank(),
                    what,
                })?,
                None => Vec::new(),
            };
            let (local, global) = self.comm.exchange(external)?;
            if let Some(cb) = self.local_cb.as_mut() {
                cb(&local);
            }
            if let Some(cb) = self.global_cb.as_mut() {
                cb(&global);
            }

            self.time = t_to;
            self.epoch += 1;
            debug!(
                rank = self.comm.rank(),
                epoch = self.epoch,
                time = self.time,
                spikes = global.len(),
                "epoch complete"
            );
        }
        Ok(self.time)
    }

    fn inject_events(&mut self, events: &[SynapticEvent]) -> Result<()> {
        let rank = self.comm.rank();
        if self.run_state != RunState::Constructed {
            return Err(CoreError::precondition(
                rank,
                "inject_events is only permitted before the first run",
            ));
        }
        for event in events {
            if !(event.time.is_finite() && event.time >= self.time) {
                return Err(CoreError::precondition(
                    rank,
                    format!(
                        "injected event at t={} precedes the current time {}",
                        event.time, self.time
                    ),
                ));
            }
        }
        self.comm.inject_events(events)
    }

    fn reset(&mut self) {
        self.comm.reset();
        for group in &mut self.groups {
            group.reset();
        }
        for pending in &mut self.pending {
            pending.clear();
        }
        for generators in &mut self.generators {
            for generator in generators {
                generator.reset();
            }
        }
        self.time = 0.0;
        self.epoch = 0;
        self.run_state = RunState::Constructed;
        self.poisoned = false;
    }
}
