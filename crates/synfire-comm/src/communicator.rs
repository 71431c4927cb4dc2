// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The communicator: spike exchange and event routing
//!
//! Orchestrates one communication epoch: drain the thread-local spike bins,
//! all-gather across ranks, then fan each global spike out through the sealed
//! connection table into per-target-group event queues.

use std::sync::Arc;

use ahash::AHashMap;
use synfire_types::{CellId, Connection, CoreError, Result, Spike, SynapticEvent};
use tracing::{debug, info};

use crate::collective::Collective;
use crate::connection_table::ConnectionTable;
use crate::decomposition::DomainDecomposition;
use crate::spike_store::LocalSpikeStore;

/// Enumerates the inbound connections of each cell.
///
/// This is the slice of the recipe the communicator consumes. Implementations
/// must be callable concurrently from arbitrary threads and side-effect free;
/// `connections_on(gid)` returns the connections terminating on cell `gid`.
pub trait ConnectionSource: Send + Sync {
    fn num_cells(&self) -> u32;
    fn connections_on(&self, gid: CellId) -> Vec<Connection>;
}

/// Spike exchange and event routing for one rank.
///
/// Immutable after construction except for the spike bins, the event queues,
/// and the spike counter. The connection table and the cached global
/// min-delay are freely shareable once `new` returns.
pub struct Communicator {
    rank: usize,
    num_ranks: usize,
    table: ConnectionTable,
    store: LocalSpikeStore,
    queues: Vec<Vec<SynapticEvent>>,
    group_of: AHashMap<u32, usize>,
    collective: Arc<dyn Collective>,
    min_delay: f64,
    num_spikes: u64,
    exchanged: bool,
}

// `Arc<dyn Collective>` has no Debug bound, so `derive(Debug)` doesn't apply;
// tests rely on `Communicator: Debug` via `Result::unwrap_err`.
impl std::fmt::Debug for Communicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Communicator")
            .field("rank", &self.rank)
            .field("num_ranks", &self.num_ranks)
            .field("min_delay", &self.min_delay)
            .field("num_spikes", &self.num_spikes)
            .field("exchanged", &self.exchanged)
            .finish_non_exhaustive()
    }
}

impl Communicator {
    /// Build the communicator for this rank.
    ///
    /// Walks every local gid, validates and collects its inbound connections,
    /// seals the table, and establishes the network-wide minimum delay with a
    /// min-reduction. Construction failures are fatal for the run.
    pub fn new(
        source: &dyn ConnectionSource,
        decomposition: &DomainDecomposition,
        collective: Arc<dyn Collective>,
        num_workers: usize,
    ) -> Result<Self> {
        decomposition.validate()?;
        let rank = decomposition.rank;
        if rank != collective.rank() || decomposition.num_ranks != collective.num_ranks() {
            return Err(CoreError::Config(format!(
                "decomposition is for rank {}/{} but the transport is rank {}/{}",
                rank,
                decomposition.num_ranks,
                collective.rank(),
                collective.num_ranks()
            )));
        }
        let num_cells = source.num_cells();
        if decomposition.num_global_cells != num_cells {
            return Err(CoreError::Config(format!(
                "decomposition covers {} cells but the recipe has {}",
                decomposition.num_global_cells, num_cells
            )));
        }

        let mut group_of = AHashMap::with_capacity(decomposition.num_local_cells());
        for (gidx, group) in decomposition.groups.iter().enumerate() {
            for &gid in &group.gids {
                // validate() already rejected duplicate claims
                group_of.insert(gid, gidx);
            }
        }

        let mut table = ConnectionTable::new(rank);
        for group in &decomposition.groups {
            for &gid in &group.gids {
                for con in source.connections_on(CellId(gid)) {
                    validate_connection(rank, &con, num_cells)?;
                    if con.dest.gid != gid || !group_of.contains_key(&con.dest.gid) {
                        return Err(CoreError::NotLocal {
                            rank,
                            gid: con.dest.gid,
                        });
                    }
                    table.add(con)?;
                }
            }
        }
        table.seal();
        reject_duplicates(rank, table.connections())?;

        let local_min = table.local_min_delay();
        let min_delay = collective.min_reduce(local_min)?;
        info!(
            rank,
            connections = table.len(),
            groups = decomposition.num_local_groups(),
            local_min_delay = local_min,
            global_min_delay = min_delay,
            "communicator constructed"
        );

        let queues = vec![Vec::new(); decomposition.num_local_groups()];
        Ok(Self {
            rank,
            num_ranks: decomposition.num_ranks,
            table,
            store: LocalSpikeStore::new(num_workers),
            queues,
            group_of,
            collective,
            min_delay,
            num_spikes: 0,
            exchanged: false,
        })
    }

    /// Cached network-wide minimum connection delay; `+inf` when the global
    /// connection set is empty.
    pub fn min_delay(&self) -> f64 {
        self.min_delay
    }

    /// Tighten the cached min-delay to `min(current, t)`; returns the new
    /// value. Values that do not tighten are ignored.
    pub fn clamp_min_delay(&mut self, t: f64) -> f64 {
        if t > 0.0 {
            self.min_delay = self.min_delay.min(t);
        }
        self.min_delay
    }

    /// Append a spike to the calling thread's bin. Wait-free on the hot path.
    pub fn add_spike(&self, spike: Spike) {
        self.store.push(spike);
    }

    /// Append a batch of spikes to the calling thread's bin.
    pub fn add_spikes<I>(&self, spikes: I)
    where
        I: IntoIterator<Item = Spike>,
    {
        self.store.extend(spikes);
    }

    /// Exchange spikes with every other rank and route the gathered set into
    /// the per-group event queues.
    ///
    /// Single-threaded; the caller guarantees no worker is concurrently
    /// appending spikes. `external` spikes (from a foreign simulator) are
    /// merged into the local set just before the all-gather. Returns the
    /// local (pre-gather) and global (post-gather) spike vectors for the
    /// export callbacks.
    pub fn exchange(&mut self, external: Vec<Spike>) -> Result<(Vec<Spike>, Vec<Spike>)> {
        let mut local = self.store.drain();
        local.extend(external);
        // Fix the intra-rank order independently of which worker produced
        // which spike, so replays are byte-identical.
        local.sort_by(Spike::cmp_source_time);

        let global = self.collective.gather_spikes(&local)?;
        self.num_spikes += global.len() as u64;
        self.exchanged = true;

        for queue in &mut self.queues {
            queue.clear();
        }

        let mut routed = 0usize;
        for spike in &global {
            for con in self.table.lookup(spike.source) {
                let event = con.event_for(spike);
                let gidx = *self.group_of.get(&event.target.gid).unwrap_or_else(|| {
                    panic!(
                        "routing invariant: dest gid {} in the sealed table is not local",
                        event.target.gid
                    )
                });
                self.queues[gidx].push(event);
                routed += 1;
            }
        }
        debug!(
            rank = self.rank,
            local = local.len(),
            global = global.len(),
            events = routed,
            "exchange complete"
        );

        Ok((local, global))
    }

    /// Read-only view of the `i`-th local group's event queue. Valid until
    /// the next `exchange` or `reset`.
    pub fn queue(&self, i: usize) -> &[SynapticEvent] {
        assert!(
            i < self.queues.len(),
            "queue index {} out of range for {} local groups",
            i,
            self.queues.len()
        );
        &self.queues[i]
    }

    /// Add externally-supplied events directly to their target queues.
    ///
    /// Permitted only before the first `exchange`; the driver additionally
    /// checks event times against the simulation clock.
    pub fn inject_events(&mut self, events: &[SynapticEvent]) -> Result<()> {
        if self.exchanged {
            return Err(CoreError::precondition(
                self.rank,
                "inject_events called after the first exchange",
            ));
        }
        for event in events {
            let gidx = *self.group_of.get(&event.target.gid).ok_or(CoreError::NotLocal {
                rank: self.rank,
                gid: event.target.gid,
            })?;
            self.queues[gidx].push(*event);
        }
        Ok(())
    }

    /// Clear bins and queues and zero the spike counter. The connection
    /// table and the cached min-delay are untouched.
    pub fn reset(&mut self) {
        self.store.clear();
        for queue in &mut self.queues {
            queue.clear();
        }
        self.num_spikes = 0;
        self.exchanged = false;
    }

    /// Total global spikes observed across exchanges.
    pub fn num_spikes(&self) -> u64 {
        self.num_spikes
    }

    pub fn num_local_groups(&self) -> usize {
        self.queues.len()
    }

    /// Group index of a local gid, if local.
    pub fn group_index(&self, gid: u32) -> Option<usize> {
        self.group_of.get(&gid).copied()
    }

    /// The sealed connection table contents.
    pub fn connections(&self) -> &[Connection] {
        self.table.connections()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }
}

fn validate_connection(rank: usize, con: &Connection, num_cells: u32) -> Result<()> {
    if !(con.delay.is_finite() && con.delay > 0.0) {
        return Err(CoreError::InvalidDelay {
            rank,
            src: con.source,
            dest: con.dest,
            delay: con.delay,
        });
    }
    if !con.weight.is_finite() {
        return Err(CoreError::InvalidWeight {
            rank,
            src: con.source,
            dest: con.dest,
        });
    }
    if con.source.gid >= num_cells {
        return Err(CoreError::UnknownGid {
            rank,
            gid: con.source.gid,
            num_cells,
        });
    }
    Ok(())
}

/// Reject a `(source, dest)` pair wired twice.
///
/// The sealed table is sorted by `(source, dest.gid)`, so exact duplicates
/// sit inside runs of equal sort key; runs are scanned pairwise (fan-out per
/// source/dest-gid pair is small in practice).
fn reject_duplicates(rank: usize, sealed: &[Connection]) -> Result<()> {
    let mut run_start = 0;
    for i in 1..=sealed.len() {
        let run_ended = i == sealed.len()
            || sealed[i].source != sealed[run_start].source
            || sealed[i].dest.gid != sealed[run_start].dest.gid;
        if !run_ended {
            continue;
        }
        let run = &sealed[run_start..i];
        for (a_idx, a) in run.iter().enumerate() {
            for b in &run[a_idx + 1..] {
                if a.dest == b.dest {
                    return Err(CoreError::DuplicateConnection {
                        rank,
                        src: a.source,
                        dest: a.dest,
                    });
                }
            }
        }
        run_start = i;
    }
    Ok(())
}
