// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-group staging of events not yet due
//!
//! A routed event's delivery time can fall several epochs past the exchange
//! that produced it. Each group therefore owns a pending buffer ordered by
//! delivery time; the driver absorbs freshly exchanged and generated events
//! into it and takes out exactly the slice due within the current window.

use synfire_types::SynapticEvent;

/// Time-ordered buffer of events awaiting delivery.
#[derive(Debug, Clone, Default)]
pub struct PendingEvents {
    // sorted by time; ties keep insertion order
    events: Vec<SynapticEvent>,
}

impl PendingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge new events, keeping the buffer time-ordered.
    pub fn absorb<I>(&mut self, new_events: I)
    where
        I: IntoIterator<Item = SynapticEvent>,
    {
        let before = self.events.len();
        self.events.extend(new_events);
        if self.events.len() > before {
            // stable: equal-time events keep arrival order
            self.events.sort_by(|a, b| a.time.total_cmp(&b.time));
        }
    }

    /// Remove and return every event with `time < t_until`, in time order.
    pub fn split_due(&mut self, t_until: f64) -> Vec<SynapticEvent> {
        let due = self.events.partition_point(|e| e.time < t_until);
        self.events.drain(..due).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
