// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Lazy, restartable time sequences
//!
//! A schedule yields a non-decreasing sequence of times through repeated
//! window queries: `events(t_from, t_to)` returns the times in
//! `[t_from, t_to)`, and querying a contiguous partition of a span produces
//! exactly the same times as querying the span at once. Windows must advance
//! monotonically between resets.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use synfire_types::{CoreError, Result};

/// Closed set of schedule variants with a uniform window query.
#[derive(Debug, Clone)]
pub enum Schedule {
    Regular(RegularSchedule),
    Explicit(ExplicitSchedule),
    Poisson(PoissonSchedule),
}

impl Schedule {
    /// `t_start, t_start + dt, …` strictly below `t_stop`. `dt` must be
    /// positive and finite.
    pub fn regular(t_start: f64, dt: f64, t_stop: f64) -> Result<Schedule> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(CoreError::Config(format!(
                "regular schedule needs dt > 0, got {dt}"
            )));
        }
        Ok(Schedule::Regular(RegularSchedule {
            t_start,
            dt,
            t_stop,
        }))
    }

    /// The supplied times, sorted ascending if they are not already.
    pub fn explicit(mut times: Vec<f64>) -> Schedule {
        if !times.windows(2).all(|w| w[0] <= w[1]) {
            times.sort_by(f64::total_cmp);
        }
        Schedule::Explicit(ExplicitSchedule { times })
    }

    /// Arrival times of a homogeneous Poisson process of rate `rate_hz`,
    /// strictly within `[t_start, t_stop)`, reproducible from `seed`.
    pub fn poisson(t_start: f64, rate_hz: f64, t_stop: f64, seed: u64) -> Result<Schedule> {
        if !(rate_hz.is_finite() && rate_hz >= 0.0) {
            return Err(CoreError::Config(format!(
                "poisson schedule needs rate >= 0, got {rate_hz}"
            )));
        }
        let mut sched = PoissonSchedule {
            t_start,
            rate_hz,
            t_stop,
            seed,
            rng: StdRng::seed_from_u64(seed),
            next: t_start,
        };
        sched.prime();
        Ok(Schedule::Poisson(sched))
    }

    /// A schedule that never fires.
    pub fn empty() -> Schedule {
        Schedule::Explicit(ExplicitSchedule { times: Vec::new() })
    }

    /// Times in `[t_from, t_to)`.
    pub fn events(&mut self, t_from: f64, t_to: f64) -> Vec<f64> {
        match self {
            Schedule::Regular(s) => s.events(t_from, t_to),
            Schedule::Explicit(s) => s.events(t_from, t_to),
            Schedule::Poisson(s) => s.events(t_from, t_to),
        }
    }

    /// Return the schedule to its initial state.
    pub fn reset(&mut self) {
        if let Schedule::Poisson(s) = self {
            s.rewind();
        }
        // regular and explicit schedules are stateless over windows
    }
}

/// `t_start + i·dt` for integer `i`, strictly below `t_stop`.
///
/// Times are always computed from the integer index, never by accumulating
/// increments, so any window partition reproduces the same floats.
#[derive(Debug, Clone)]
pub struct RegularSchedule {
    t_start: f64,
    dt: f64,
    t_stop: f64,
}

impl RegularSchedule {
    fn events(&self, t_from: f64, t_to: f64) -> Vec<f64> {
        let lo = t_from.max(self.t_start);
        let hi = t_to.min(self.t_stop);
        if !(lo < hi) {
            return Vec::new();
        }

        // smallest i with t_start + i*dt >= lo, nudged for fp rounding
        let mut i = ((lo - self.t_start) / self.dt).ceil().max(0.0) as u64;
        while i > 0 && self.t_start + (i - 1) as f64 * self.dt >= lo {
            i -= 1;
        }
        while self.t_start + i as f64 * self.dt < lo {
            i += 1;
        }

        let mut out = Vec::new();
        loop {
            let t = self.t_start + i as f64 * self.dt;
            if t >= hi {
                break;
            }
            out.push(t);
            i += 1;
        }
        out
    }
}

/// A fixed ascending list of times.
#[derive(Debug, Clone)]
pub struct ExplicitSchedule {
    times: Vec<f64>,
}

impl ExplicitSchedule {
    fn events(&self, t_from: f64, t_to: f64) -> Vec<f64> {
        let lo = self.times.partition_point(|&t| t < t_from);
        let hi = self.times.partition_point(|&t| t < t_to);
        self.times[lo..hi].to_vec()
    }
}

/// Homogeneous Poisson arrivals with exponential inter-arrival gaps.
#[derive(Debug, Clone)]
pub struct PoissonSchedule {
    t_start: f64,
    rate_hz: f64,
    t_stop: f64,
    seed: u64,
    rng: StdRng,
    next: f64,
}

impl PoissonSchedule {
    fn gap(&mut self) -> f64 {
        if self.rate_hz == 0.0 {
            return f64::INFINITY;
        }
        // u in [0, 1): use 1-u in (0, 1] so ln never sees zero
        let u: f64 = self.rng.gen();
        -(1.0 - u).ln() / self.rate_hz
    }

    fn prime(&mut self) {
        let gap = self.gap();
        self.next = self.t_start + gap;
    }

    fn rewind(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.next = self.t_start;
        self.prime();
    }

    fn events(&mut self, t_from: f64, t_to: f64) -> Vec<f64> {
        let hi = t_to.min(self.t_stop);
        let mut out = Vec::new();
        while self.next < hi {
            if self.next >= t_from {
                out.push(self.next);
            }
            let gap = self.gap();
            self.next += gap;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_schedule_yields_the_expected_grid() {
        let mut s = Schedule::regular(0.0, 0.5, 2.0).unwrap();
        assert_eq!(s.events(0.0, 2.0), vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn explicit_schedule_sorts_unsorted_input() {
        let mut s = Schedule::explicit(vec![1.2, 0.1, 0.7]);
        assert_eq!(s.events(0.0, 2.0), vec![0.1, 0.7, 1.2]);
    }

    #[test]
    fn regular_rejects_non_positive_dt() {
        assert!(Schedule::regular(0.0, 0.0, 1.0).is_err());
        assert!(Schedule::regular(0.0, -0.5, 1.0).is_err());
    }

    #[test]
    fn window_bounds_are_half_open() {
        let mut s = Schedule::regular(0.0, 1.0, 10.0).unwrap();
        assert_eq!(s.events(2.0, 4.0), vec![2.0, 3.0]);
        // t_stop excluded
        let mut s = Schedule::regular(0.0, 5.0, 10.0).unwrap();
        assert_eq!(s.events(0.0, 100.0), vec![0.0, 5.0]);
    }

    fn partitions_match(mut whole: Schedule, mut parts: Schedule, cuts: &[f64]) {
        let single = whole.events(cuts[0], *cuts.last().unwrap());
        let mut concatenated = Vec::new();
        for w in cuts.windows(2) {
            concatenated.extend(parts.events(w[0], w[1]));
        }
        assert_eq!(single, concatenated);
    }

    #[test]
    fn window_partition_round_trip_regular() {
        let make = || Schedule::regular(0.25, 0.3, 7.0).unwrap();
        partitions_match(make(), make(), &[0.0, 1.0, 2.5, 2.5, 6.0, 8.0]);
    }

    #[test]
    fn window_partition_round_trip_explicit() {
        let make = || Schedule::explicit(vec![0.1, 0.1, 0.9, 1.5, 3.2, 4.4]);
        partitions_match(make(), make(), &[0.0, 0.5, 1.5, 4.0, 5.0]);
    }

    #[test]
    fn window_partition_round_trip_poisson() {
        let make = || Schedule::poisson(0.0, 20.0, 10.0, 42).unwrap();
        partitions_match(make(), make(), &[0.0, 0.7, 0.7, 2.0, 5.5, 10.0]);
    }

    #[test]
    fn poisson_is_reproducible_from_its_seed() {
        let mut a = Schedule::poisson(0.0, 50.0, 5.0, 7).unwrap();
        let mut b = Schedule::poisson(0.0, 50.0, 5.0, 7).unwrap();
        assert_eq!(a.events(0.0, 5.0), b.events(0.0, 5.0));

        let mut c = Schedule::poisson(0.0, 50.0, 5.0, 8).unwrap();
        assert_ne!(a.events(0.0, 5.0), c.events(0.0, 5.0));
    }

    #[test]
    fn poisson_times_stay_inside_the_span() {
        let mut s = Schedule::poisson(1.0, 100.0, 2.0, 13).unwrap();
        let times = s.events(0.0, 10.0);
        assert!(!times.is_empty());
        assert!(times.iter().all(|&t| t > 1.0 && t < 2.0));
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn poisson_reset_restarts_the_sequence() {
        let mut s = Schedule::poisson(0.0, 30.0, 4.0, 99).unwrap();
        let first = s.events(0.0, 4.0);
        assert!(s.events(0.0, 4.0).is_empty()); // exhausted
        s.reset();
        assert_eq!(s.events(0.0, 4.0), first);
    }

    #[test]
    fn zero_rate_poisson_never_fires() {
        let mut s = Schedule::poisson(0.0, 0.0, 100.0, 3).unwrap();
        assert!(s.events(0.0, 100.0).is_empty());
    }

    #[test]
    fn empty_schedule_never_fires() {
        let mut s = Schedule::empty();
        assert!(s.events(0.0, f64::INFINITY).is_empty());
    }
}
