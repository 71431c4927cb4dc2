// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-worker spike accumulation without hot-path contention

use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use synfire_types::Spike;

/// Thread-local spike bins for a fixed-size worker pool.
///
/// One bin per pool worker plus one overflow bin for threads outside the pool
/// (the driver thread injecting spikes directly, tests). A worker resolves
/// its bin with `rayon::current_thread_index()`, so pushes from distinct
/// workers never touch the same bin.
///
/// Protocol: bins are written only by their owning thread while an epoch is
/// being integrated, and read only by the single exchange thread after the
/// pool has joined. Each per-bin mutex therefore has exactly one contender at
/// any time; `push` never waits. The bins are cache-line padded so adjacent
/// writers do not false-share.
#[derive(Debug)]
pub struct LocalSpikeStore {
    bins: Vec<CachePadded<Mutex<Vec<Spike>>>>,
    num_workers: usize,
}

impl LocalSpikeStore {
    /// A store for a pool of `num_workers` threads, fixed for the store's
    /// lifetime.
    pub fn new(num_workers: usize) -> Self {
        let bins = (0..num_workers + 1)
            .map(|_| CachePadded::new(Mutex::new(Vec::new())))
            .collect();
        Self { bins, num_workers }
    }

    fn bin_index(&self) -> usize {
        // Workers of a differently-sized pool (or no pool) fall through to
        // the overflow bin.
        match rayon::current_thread_index() {
            Some(i) if i < self.num_workers => i,
            _ => self.num_workers,
        }
    }

    /// Append a spike to the calling thread's bin.
    pub fn push(&self, spike: Spike) {
        self.bins[self.bin_index()].lock().push(spike);
    }

    /// Append a batch of spikes to the calling thread's bin.
    pub fn extend<I>(&self, spikes: I)
    where
        I: IntoIterator<Item = Spike>,
    {
        self.bins[self.bin_index()].lock().extend(spikes);
    }

    /// Concatenate all bins in bin order and clear them.
    ///
    /// Called only from the exchange thread, with no worker concurrently
    /// appending.
    pub fn drain(&self) -> Vec<Spike> {
        let mut out = Vec::new();
        for bin in &self.bins {
            let mut guard = bin.lock();
            out.append(&mut guard);
        }
        out
    }

    /// Clear every bin without collecting.
    pub fn clear(&self) {
        for bin in &self.bins {
            bin.lock().clear();
        }
    }

    /// Number of bins, including the overflow bin.
    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    /// Total buffered spikes across bins (diagnostics only).
    pub fn len(&self) -> usize {
        self.bins.iter().map(|b| b.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use synfire_types::CellSite;

    fn spike(gid: u32, t: f64) -> Spike {
        Spike::new(CellSite::new(gid, 0), t)
    }

    #[test]
    fn push_from_outside_any_pool_uses_overflow_bin() {
        let store = LocalSpikeStore::new(4);
        assert_eq!(store.num_bins(), 5);
        store.push(spike(1, 0.5));
        store.push(spike(2, 0.75));
        let drained = store.drain();
        assert_eq!(drained, vec![spike(1, 0.5), spike(2, 0.75)]);
        assert!(store.is_empty());
    }

    #[test]
    fn drain_concatenates_and_clears() {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap();
        let store = LocalSpikeStore::new(4);

        pool.install(|| {
            (0..64u32).into_par_iter().for_each(|gid| {
                store.push(spike(gid, gid as f64));
            });
        });

        let mut drained = store.drain();
        assert_eq!(drained.len(), 64);
        assert!(store.is_empty());

        // every pushed spike arrived exactly once
        drained.sort_by(Spike::cmp_source_time);
        for (i, s) in drained.iter().enumerate() {
            assert_eq!(s.source.gid, i as u32);
        }

        // a second drain on empty bins yields nothing
        assert!(store.drain().is_empty());
    }

    #[test]
    fn bins_of_idle_workers_stay_empty() {
        let store = LocalSpikeStore::new(8);
        store.push(spike(0, 1.0));
        assert_eq!(store.len(), 1);
        let drained = store.drain();
        assert_eq!(drained.len(), 1);
    }
}
