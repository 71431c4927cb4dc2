// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Synfire Comm
//!
//! The spike-exchange half of the core: the rank-local connection table,
//! contention-free per-worker spike bins, the collective transport adapter,
//! and the communicator that ties them together.
//!
//! ## Data flow
//! ```text
//! cell groups ──push──▶ spike bins ──drain──▶ local spikes
//!                                              │ all-gather
//!                                              ▼
//!                          global spikes ──lookup──▶ per-group event queues
//! ```
//!
//! The hot path (`Communicator::add_spike`) takes an uncontended per-worker
//! lock only; everything heavier happens on the single exchange thread.

pub mod collective;
pub mod communicator;
pub mod connection_table;
pub mod decomposition;
pub mod spike_store;

pub use collective::{Collective, LocalCollective, SharedCollective};
pub use communicator::{Communicator, ConnectionSource};
pub use connection_table::ConnectionTable;
pub use decomposition::{DomainDecomposition, GroupDescription};
pub use spike_store::LocalSpikeStore;
