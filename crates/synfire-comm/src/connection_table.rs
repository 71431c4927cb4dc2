// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sorted, rank-local table of inbound connections

use synfire_types::{CellSite, Connection, CoreError, Result};
use tracing::debug;

/// Rank-local connection table, keyed by source site.
///
/// Built in two phases: `add` appends during construction, `seal` stable-sorts
/// by `(source, dest.gid)` and freezes the table. After sealing, `lookup`
/// returns the contiguous run of connections for a source in O(log N + k).
///
/// Callers only add connections whose destination gid is owned by this rank;
/// the communicator validates locality before insertion.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    connections: Vec<Connection>,
    sealed: bool,
    rank: usize,
}

impl ConnectionTable {
    pub fn new(rank: usize) -> Self {
        Self {
            connections: Vec::new(),
            sealed: false,
            rank,
        }
    }

    /// Append a connection. Callable only before `seal`.
    pub fn add(&mut self, con: Connection) -> Result<()> {
        if self.sealed {
            return Err(CoreError::precondition(
                self.rank,
                "add called on a sealed connection table",
            ));
        }
        self.connections.push(con);
        Ok(())
    }

    /// Stable-sort by `(source, dest.gid)` and freeze the table.
    ///
    /// Idempotent; lookups are permitted afterwards, adds are not.
    pub fn seal(&mut self) {
        if !self.sealed {
            self.connections
                .sort_by(|a, b| a.cmp_table_order(b));
            self.sealed = true;
            debug!(
                rank = self.rank,
                connections = self.connections.len(),
                "connection table sealed"
            );
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// The contiguous run of connections whose source equals `source`.
    ///
    /// Equivalent of `std::equal_range` over the sealed table: two binary
    /// probes for the bounds, then the slice in between.
    pub fn lookup(&self, source: CellSite) -> &[Connection] {
        assert!(self.sealed, "lookup requires a sealed connection table");
        let lo = self.connections.partition_point(|c| c.source < source);
        let hi = self.connections.partition_point(|c| c.source <= source);
        &self.connections[lo..hi]
    }

    /// Minimum delay over this rank's connections; `+inf` when the table is
    /// empty.
    pub fn local_min_delay(&self) -> f64 {
        self.connections
            .iter()
            .fold(f64::INFINITY, |m, c| m.min(c.delay))
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Read-only view of the (sealed or unsealed) table contents.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }
}
