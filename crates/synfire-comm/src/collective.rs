// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Collective transport adapter: all-gather of spikes, min-reduction of scalars
//!
//! The communicator only ever needs two collectives, both with matched-order
//! barrier semantics across ranks. MPI transport primitives are an external
//! collaborator; this module provides the single-process null transport and an
//! in-process multi-rank transport used by multi-rank tests and the demo.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use synfire_types::{Result, Spike};
use tracing::trace;

/// Collective operations across all ranks.
///
/// Both operations are collective: every rank must call them in matched
/// order. A transport failure is fatal; there is no retry and no partial
/// exchange.
pub trait Collective: Send + Sync {
    /// This rank's id, in `0..num_ranks`.
    fn rank(&self) -> usize;

    /// Number of participating ranks.
    fn num_ranks(&self) -> usize;

    /// Concatenation of every rank's local spike vector, in rank order,
    /// preserving each rank's intra-vector order.
    fn gather_spikes(&self, local: &[Spike]) -> Result<Vec<Spike>>;

    /// Global minimum of `value` over all ranks.
    fn min_reduce(&self, value: f64) -> Result<f64>;
}

/// Null transport for single-process runs: gathers return the input
/// unchanged, reductions are the identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalCollective;

impl Collective for LocalCollective {
    fn rank(&self) -> usize {
        0
    }

    fn num_ranks(&self) -> usize {
        1
    }

    fn gather_spikes(&self, local: &[Spike]) -> Result<Vec<Spike>> {
        Ok(local.to_vec())
    }

    fn min_reduce(&self, value: f64) -> Result<f64> {
        Ok(value)
    }
}

/// One round of an all-gather: every rank deposits, the last depositor
/// publishes, every rank picks the published vector up, the last consumer
/// opens the next round.
struct RoundState<T> {
    slots: Vec<Option<T>>,
    deposited: usize,
    published: Option<Arc<Vec<T>>>,
    consumed: usize,
}

struct GatherCell<T> {
    state: Mutex<RoundState<T>>,
    cond: Condvar,
}

impl<T: Clone> GatherCell<T> {
    fn new(num_ranks: usize) -> Self {
        Self {
            state: Mutex::new(RoundState {
                slots: (0..num_ranks).map(|_| None).collect(),
                deposited: 0,
                published: None,
                consumed: 0,
            }),
            cond: Condvar::new(),
        }
    }

    /// Deposit this rank's value and block until every rank's value for the
    /// same round is available. Returns the per-rank values in rank order.
    fn exchange(&self, rank: usize, value: T) -> Arc<Vec<T>> {
        let mut state = self.state.lock();
        let num_ranks = state.slots.len();

        // A rank ahead of the others must not deposit into a round that has
        // not fully drained yet.
        while state.published.is_some() {
            self.cond.wait(&mut state);
        }

        debug_assert!(state.slots[rank].is_none(), "rank deposited twice in one round");
        state.slots[rank] = Some(value);
        state.deposited += 1;

        if state.deposited == num_ranks {
            let values: Vec<T> = state
                .slots
                .iter_mut()
                .map(|slot| slot.take().unwrap_or_else(|| panic!("gather invariant: missing deposit")))
                .collect();
            state.published = Some(Arc::new(values));
            state.deposited = 0;
            self.cond.notify_all();
        } else {
            while state.published.is_none() {
                self.cond.wait(&mut state);
            }
        }

        let out = state
            .published
            .clone()
            .unwrap_or_else(|| panic!("gather invariant: round published vector missing"));

        state.consumed += 1;
        if state.consumed == num_ranks {
            state.published = None;
            state.consumed = 0;
            self.cond.notify_all();
        }

        out
    }
}

struct SharedInner {
    num_ranks: usize,
    spikes: GatherCell<Vec<Spike>>,
    scalars: GatherCell<f64>,
}

/// In-process multi-rank transport.
///
/// `SharedCollective::group(n)` hands out one handle per rank; each rank runs
/// on its own thread and the handles rendezvous on every collective call,
/// giving the same rank-major gather order an MPI all-gather would.
pub struct SharedCollective {
    rank: usize,
    inner: Arc<SharedInner>,
}

impl SharedCollective {
    /// Create `num_ranks` connected handles, one per rank, in rank order.
    pub fn group(num_ranks: usize) -> Vec<SharedCollective> {
        assert!(num_ranks > 0, "a collective needs at least one rank");
        let inner = Arc::new(SharedInner {
            num_ranks,
            spikes: GatherCell::new(num_ranks),
            scalars: GatherCell::new(num_ranks),
        });
        (0..num_ranks)
            .map(|rank| SharedCollective {
                rank,
                inner: Arc::clone(&inner),
            })
            .collect()
    }
}

impl Collective for SharedCollective {
    fn rank(&self) -> usize {
        self.rank
    }

    fn num_ranks(&self) -> usize {
        self.inner.num_ranks
    }

    fn gather_spikes(&self, local: &[Spike]) -> Result<Vec<Spike>> {
        let per_rank = self.inner.spikes.exchange(self.rank, local.to_vec());
        let total: usize = per_rank.iter().map(|v| v.len()).sum();
        let mut global = Vec::with_capacity(total);
        for rank_spikes in per_rank.iter() {
            global.extend_from_slice(rank_spikes);
        }
        trace!(
            rank = self.rank,
            local = local.len(),
            global = global.len(),
            "gathered spikes"
        );
        Ok(global)
    }

    fn min_reduce(&self, value: f64) -> Result<f64> {
        let per_rank = self.inner.scalars.exchange(self.rank, value);
        Ok(per_rank.iter().fold(f64::INFINITY, |m, v| m.min(*v)))
    }
}
