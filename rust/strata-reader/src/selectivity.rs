//! Filter selectivity tracking.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

/// Running totals of a filtered column: rows in, rows out and time spent reading.
///
/// Lives in the (shared, immutable) scan spec, hence the atomics.
#[derive(Debug, Default)]
pub struct Selectivity {
    num_in: AtomicU64,
    num_out: AtomicU64,
    time_nanos: AtomicU64,
}

impl Selectivity {
    pub fn add(&self, num_in: usize, num_out: usize, time: Duration) {
        self.num_in.fetch_add(num_in as u64, Ordering::Relaxed);
        self.num_out.fetch_add(num_out as u64, Ordering::Relaxed);
        self.time_nanos
            .fetch_add(time.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn num_in(&self) -> u64 {
        self.num_in.load(Ordering::Relaxed)
    }

    pub fn num_out(&self) -> u64 {
        self.num_out.load(Ordering::Relaxed)
    }

    pub fn time(&self) -> Duration {
        Duration::from_nanos(self.time_nanos.load(Ordering::Relaxed))
    }

    /// Fraction of rows that passed, 1.0 before any input was seen.
    pub fn pass_rate(&self) -> f64 {
        match self.num_in() {
            0 => 1.0,
            num_in => self.num_out() as f64 / num_in as f64,
        }
    }

    /// Time per dropped row: how much the filter costs for the rows it removes.
    pub fn time_per_dropped_row(&self) -> Option<Duration> {
        let dropped = self.num_in().saturating_sub(self.num_out());
        (dropped > 0).then(|| Duration::from_nanos((self.time().as_nanos() / dropped as u128) as u64))
    }
}

/// Times one filtered read. Time attributed to the reader's own initialization is
/// excluded via [`subtract`](Self::subtract).
pub struct SelectivityTimer<'a> {
    selectivity: &'a Selectivity,
    num_in: usize,
    start: Instant,
    excluded: Duration,
}

impl<'a> SelectivityTimer<'a> {
    pub fn new(selectivity: &'a Selectivity, num_in: usize) -> SelectivityTimer<'a> {
        SelectivityTimer {
            selectivity,
            num_in,
            start: Instant::now(),
            excluded: Duration::ZERO,
        }
    }

    pub fn subtract(&mut self, time: Duration) {
        self.excluded += time;
    }

    pub fn finish(self, num_out: usize) {
        let elapsed = self.start.elapsed().saturating_sub(self.excluded);
        self.selectivity.add(self.num_in, num_out, elapsed);
    }
}
