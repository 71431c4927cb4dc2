// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Domain decomposition: which cells live on which rank, in which group

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use synfire_types::{CoreError, Result};

/// A rank-local batch of cells integrated together.
///
/// Group membership may be dense (a contiguous gid range) or sparse; the
/// decomposition carries the explicit member list either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDescription {
    pub gids: Vec<u32>,
}

impl GroupDescription {
    pub fn new(gids: Vec<u32>) -> Self {
        Self { gids }
    }
}

/// This rank's share of the global cell set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainDecomposition {
    pub num_ranks: usize,
    pub rank: usize,
    pub num_global_cells: u32,
    /// Ordered list of local groups; group index is the queue index the
    /// communicator exposes.
    pub groups: Vec<GroupDescription>,
}

impl DomainDecomposition {
    pub fn new(
        rank: usize,
        num_ranks: usize,
        num_global_cells: u32,
        groups: Vec<GroupDescription>,
    ) -> Self {
        Self {
            num_ranks,
            rank,
            num_global_cells,
            groups,
        }
    }

    /// Single-rank decomposition with one cell per group, gids `0..num_cells`.
    ///
    /// Mirrors the one-to-one cells/groups association of the original
    /// prototype, and is the common shape in tests.
    pub fn single_rank(num_cells: u32) -> Self {
        Self {
            num_ranks: 1,
            rank: 0,
            num_global_cells: num_cells,
            groups: (0..num_cells)
                .map(|gid| GroupDescription::new(vec![gid]))
                .collect(),
        }
    }

    /// Contiguous block split of `0..num_global_cells` over `num_ranks`, one
    /// cell per group, for rank `rank`.
    pub fn contiguous(rank: usize, num_ranks: usize, num_global_cells: u32) -> Self {
        let per_rank = (num_global_cells as usize).div_ceil(num_ranks.max(1));
        let from = (rank * per_rank) as u32;
        let to = (((rank + 1) * per_rank) as u32).min(num_global_cells);
        Self {
            num_ranks,
            rank,
            num_global_cells,
            groups: (from..to)
                .map(|gid| GroupDescription::new(vec![gid]))
                .collect(),
        }
    }

    pub fn num_local_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn num_local_cells(&self) -> usize {
        self.groups.iter().map(|g| g.gids.len()).sum()
    }

    /// Every gid claimed at most once, every gid within the global range,
    /// rank id within the rank count.
    pub fn validate(&self) -> Result<()> {
        if self.rank >= self.num_ranks {
            return Err(CoreError::Config(format!(
                "decomposition rank {} out of range for {} ranks",
                self.rank, self.num_ranks
            )));
        }
        let mut seen = AHashSet::with_capacity(self.num_local_cells());
        for group in &self.groups {
            for &gid in &group.gids {
                if gid >= self.num_global_cells {
                    return Err(CoreError::UnknownGid {
                        rank: self.rank,
                        gid,
                        num_cells: self.num_global_cells,
                    });
                }
                if !seen.insert(gid) {
                    return Err(CoreError::ConflictingDecomposition {
                        rank: self.rank,
                        gid,
                    });
                }
            }
        }
        Ok(())
    }
}
