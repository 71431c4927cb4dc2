// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Spikes: timestamped point events sourced at a cell site

use core::cmp::Ordering;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::CellSite;

/// A spike emitted by a source site at a point in time.
///
/// Time is a finite, non-negative `f64`. Spikes are totally ordered by
/// `(source, time)` via [`Spike::cmp_source_time`], the order the exchange
/// uses for deterministic replay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spike {
    pub source: CellSite,
    pub time: f64,
}

impl Spike {
    pub const fn new(source: CellSite, time: f64) -> Self {
        Self { source, time }
    }

    /// Total order by `(source, time)`.
    ///
    /// `f64::total_cmp` keeps the order total even for exotic float values,
    /// so sorts never panic and replay order is byte-stable.
    pub fn cmp_source_time(&self, other: &Spike) -> Ordering {
        self.source
            .cmp(&other.source)
            .then_with(|| self.time.total_cmp(&other.time))
    }
}

impl fmt::Display for Spike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spike {} @ {}", self.source, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_major_ordering() {
        let a = Spike::new(CellSite::new(0, 0), 9.0);
        let b = Spike::new(CellSite::new(1, 0), 1.0);
        let c = Spike::new(CellSite::new(1, 0), 2.0);
        assert_eq!(a.cmp_source_time(&b), Ordering::Less);
        assert_eq!(b.cmp_source_time(&c), Ordering::Less);
        assert_eq!(c.cmp_source_time(&c), Ordering::Equal);
    }

    #[test]
    fn sorting_is_stable_over_equal_spikes() {
        let mut v = vec![
            Spike::new(CellSite::new(2, 0), 1.0),
            Spike::new(CellSite::new(0, 0), 3.0),
            Spike::new(CellSite::new(0, 0), 3.0),
            Spike::new(CellSite::new(1, 1), 0.5),
        ];
        v.sort_by(Spike::cmp_source_time);
        assert_eq!(v[0].source, CellSite::new(0, 0));
        assert_eq!(v[1].source, CellSite::new(0, 0));
        assert_eq!(v[2].source, CellSite::new(1, 1));
        assert_eq!(v[3].source, CellSite::new(2, 0));
    }
}
