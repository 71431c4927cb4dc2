// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Error taxonomy for the spike-exchange core.

Nothing in the core retries: construction and precondition failures are
terminal for the run, transport failures are terminal for the process, and a
failed external callback leaves the simulation in a state where `reset` is
the only legal next call.
*/

use thiserror::Error;

use crate::ids::CellSite;

/// Errors surfaced by the spike-exchange core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Connection with a non-positive or non-finite delay (configuration error)
    #[error("rank {rank}: connection {src} -> {dest} has invalid delay {delay} (must be finite and > 0)")]
    InvalidDelay {
        rank: usize,
        src: CellSite,
        dest: CellSite,
        delay: f64,
    },

    /// Connection with a non-finite weight (configuration error)
    #[error("rank {rank}: connection {src} -> {dest} has non-finite weight")]
    InvalidWeight {
        rank: usize,
        src: CellSite,
        dest: CellSite,
    },

    /// The same (source, dest) pair wired twice (configuration error)
    #[error("rank {rank}: duplicate connection {src} -> {dest}")]
    DuplicateConnection {
        rank: usize,
        src: CellSite,
        dest: CellSite,
    },

    /// Connection names a gid outside the global cell range (configuration error)
    #[error("rank {rank}: connection references unknown gid {gid} (network has {num_cells} cells)")]
    UnknownGid {
        rank: usize,
        gid: u32,
        num_cells: u32,
    },

    /// Destination gid is not owned by this rank (configuration error)
    #[error("rank {rank}: connection targets gid {gid}, which is not local to this rank")]
    NotLocal { rank: usize, gid: u32 },

    /// A gid is claimed by more than one group, or by more than one rank
    /// (conflicting decomposition)
    #[error("rank {rank}: decomposition assigns gid {gid} more than once")]
    ConflictingDecomposition { rank: usize, gid: u32 },

    /// Add after seal, inject after run, and friends: caller bugs
    #[error("rank {rank}: precondition violated: {what}")]
    Precondition { rank: usize, what: String },

    /// The collective transport failed; no retry, no partial exchange
    #[error("rank {rank}: transport failure: {what}")]
    Transport { rank: usize, what: String },

    /// An external callback reported an error; the run terminates between epochs
    #[error("rank {rank}: external callback failed: {what}")]
    Callback { rank: usize, what: String },

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CoreError {
    /// Shorthand for precondition violations.
    pub fn precondition(rank: usize, what: impl Into<String>) -> Self {
        CoreError::Precondition {
            rank,
            what: what.into(),
        }
    }
}

/// Result type for core operations
pub type Result<T> = core::result::Result<T, CoreError>;
