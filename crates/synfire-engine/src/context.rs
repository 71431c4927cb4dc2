// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Execution context: worker pool, transport, seeding
//!
//! A context value threaded through construction instead of process-wide
//! singletons. The pool is fixed at construction; cell groups integrate on
//! its workers, and the per-worker spike bins are sized from it.

use std::sync::Arc;

use synfire_comm::{Collective, LocalCollective};
use synfire_types::{CoreError, Result};
use tracing::info;

use crate::config::RuntimeConfig;

/// Resources a simulation runs on.
#[derive(Clone)]
pub struct ExecutionContext {
    pool: Arc<rayon::ThreadPool>,
    collective: Arc<dyn Collective>,
    seed: u64,
}

impl ExecutionContext {
    /// Single-process context with the null transport.
    pub fn local(runtime: &RuntimeConfig) -> Result<Self> {
        Self::with_collective(runtime, Arc::new(LocalCollective))
    }

    /// Context over an explicit transport (one rank of a multi-rank run).
    pub fn with_collective(
        runtime: &RuntimeConfig,
        collective: Arc<dyn Collective>,
    ) -> Result<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("synfire-worker-{i}"));
        if runtime.threads > 0 {
            builder = builder.num_threads(runtime.threads);
        }
        let pool = builder
            .build()
            .map_err(|e| CoreError::Config(format!("failed to build worker pool: {e}")))?;
        info!(
            rank = collective.rank(),
            threads = pool.current_num_threads(),
            "execution context ready"
        );
        Ok(Self {
            pool: Arc::new(pool),
            collective,
            seed: runtime.seed,
        })
    }

    pub fn pool(&self) -> &Arc<rayon::ThreadPool> {
        &self.pool
    }

    pub fn collective(&self) -> Arc<dyn Collective> {
        Arc::clone(&self.collective)
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}
