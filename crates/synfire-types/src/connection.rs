// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Connections between a source site and a local target site

use core::cmp::Ordering;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::event::SynapticEvent;
use crate::ids::CellSite;
use crate::spike::Spike;

/// A directed connection from a (possibly remote) source site to a target
/// site owned by this rank.
///
/// Invariants, checked at communicator construction: `delay` is strictly
/// positive and finite, `weight` is finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source: CellSite,
    pub dest: CellSite,
    pub weight: f32,
    pub delay: f64,
}

impl Connection {
    pub const fn new(source: CellSite, dest: CellSite, weight: f32, delay: f64) -> Self {
        Self {
            source,
            dest,
            weight,
            delay,
        }
    }

    /// The event this connection produces for a spike on its source.
    pub fn event_for(&self, spike: &Spike) -> SynapticEvent {
        SynapticEvent::new(self.dest, spike.time + self.delay, self.weight)
    }

    /// Sort key for the sealed connection table: source ascending, with
    /// `dest.gid` as the secondary key for stability.
    pub fn cmp_table_order(&self, other: &Connection) -> Ordering {
        self.source
            .cmp(&other.source)
            .then_with(|| self.dest.gid.cmp(&other.dest.gid))
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} w={} d={}",
            self.source, self.dest, self.weight, self.delay
        )
    }
}
