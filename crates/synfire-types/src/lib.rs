// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Synfire Types
//!
//! Value types shared by every layer of the spike-exchange core: cell
//! identifiers, spikes, post-synaptic events, connections, and the error
//! taxonomy.
//!
//! Everything in this crate is plain data. The routing and exchange machinery
//! lives in `synfire-comm`; the epoch driver lives in `synfire-engine`.

pub mod connection;
pub mod error;
pub mod event;
pub mod ids;
pub mod spike;

pub use connection::Connection;
pub use error::{CoreError, Result};
pub use event::SynapticEvent;
pub use ids::{CellId, CellSite};
pub use spike::Spike;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
