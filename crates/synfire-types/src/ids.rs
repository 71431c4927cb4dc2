// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Identity types for cells and their source/target sites

use core::fmt;

use serde::{Deserialize, Serialize};

/// Cell ID (globally unique, dense index across the entire simulated network)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellId(pub u32);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cell({})", self.0)
    }
}

impl From<u32> for CellId {
    fn from(gid: u32) -> Self {
        CellId(gid)
    }
}

/// A site on a cell: the cell's gid plus a cell-local site index.
///
/// Sources (spike emitters) and targets (synapses) are both addressed this
/// way. Ordering is lexicographic, gid first, so the derived `Ord` gives the
/// sort key the connection table relies on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct CellSite {
    /// Owning cell
    pub gid: u32,
    /// Site index local to the cell
    pub index: u32,
}

impl CellSite {
    pub const fn new(gid: u32, index: u32) -> Self {
        Self { gid, index }
    }

    pub fn cell(&self) -> CellId {
        CellId(self.gid)
    }
}

impl fmt::Display for CellSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.gid, self.index)
    }
}

impl From<(u32, u32)> for CellSite {
    fn from((gid, index): (u32, u32)) -> Self {
        Self { gid, index }
    }
}
