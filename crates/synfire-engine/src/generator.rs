// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Event generators: schedules bound to a target site and a weight

use synfire_types::{CellSite, SynapticEvent};

use crate::schedule::Schedule;

/// Pre-seeds a target with weighted events at the times of a schedule.
///
/// Generators come from the recipe, addressed to a site on the cell they
/// were declared on; the driver merges their window events into the group
/// deliveries each epoch alongside the exchanged events.
#[derive(Debug, Clone)]
pub struct EventGenerator {
    pub target: CellSite,
    pub weight: f32,
    pub schedule: Schedule,
}

impl EventGenerator {
    pub fn new(target: CellSite, weight: f32, schedule: Schedule) -> Self {
        Self {
            target,
            weight,
            schedule,
        }
    }

    /// The generator's events with times in `[t_from, t_to)`.
    pub fn events_in(&mut self, t_from: f64, t_to: f64) -> Vec<SynapticEvent> {
        self.schedule
            .events(t_from, t_to)
            .into_iter()
            .map(|t| SynapticEvent::new(self.target, t, self.weight))
            .collect()
    }

    pub fn reset(&mut self) {
        self.schedule.reset();
    }
}
