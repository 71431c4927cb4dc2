// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Synfire Engine
//!
//! The compute-facing half of the core: recipes and domain decomposition,
//! lazy schedules and event generators, minimal cell groups, and the epoch
//! driver that advances time in min-delay-bounded steps and calls into the
//! communicator between epochs.
//!
//! ## Epoch loop
//! ```text
//! while t < t_final:
//!     ε = min(τ_min / 2, t_final − t, dt)
//!     deliver due events, advance every group by ε   (worker pool)
//!     merge external spikes, exchange                (driver thread)
//!     t += ε
//! ```

pub mod config;
pub mod context;
pub mod generator;
pub mod groups;
pub mod pending;
pub mod recipe;
pub mod schedule;
pub mod simulation;

pub use config::{BinningKind, EngineConfig, RuntimeConfig, SimulationConfig};
pub use context::ExecutionContext;
pub use generator::EventGenerator;
pub use groups::{BinningPolicy, CellGroup, EpochWindow};
pub use recipe::{CellDescription, CellKind, Recipe, VecRecipe};
pub use schedule::Schedule;
pub use simulation::Simulation;

// the consumed interfaces re-exported for callers that only pull this crate
pub use synfire_comm::{
    Collective, Communicator, ConnectionSource, DomainDecomposition, GroupDescription,
    LocalCollective, SharedCollective,
};
pub use synfire_types::{CellId, CellSite, Connection, CoreError, Result, Spike, SynapticEvent};
