// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Post-synaptic events: the per-target consequence of a spike

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::CellSite;

/// An event due at `target` at `time`, carrying the connection weight.
///
/// `time = spike.time + connection.delay`, computed once when the spike is
/// routed. Events are grouped by the cell group that owns `target.gid`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynapticEvent {
    pub target: CellSite,
    pub time: f64,
    pub weight: f32,
}

impl SynapticEvent {
    pub const fn new(target: CellSite, time: f64, weight: f32) -> Self {
        Self {
            target,
            time,
            weight,
        }
    }
}

impl fmt::Display for SynapticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event {} @ {} w={}", self.target, self.time, self.weight)
    }
}
