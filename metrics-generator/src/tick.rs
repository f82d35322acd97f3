//! Periodic mutation of the synthetic instruments.
use std::time::Duration;

use quanta::Clock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::cardinality::label_values;
use crate::error::Error;
use crate::synthesis::SyntheticInstruments;

/// Interval used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Outcome of a single mutation pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    /// Value drawn for this pass, in `[0, 10)`.
    pub value: f64,
    /// Number of series updated in each vector.
    pub series: usize,
    /// Number of scalar counters and gauges updated, in total.
    pub scalars: usize,
    /// Time the pass took.
    pub elapsed: Duration,
}

/// Drives the synthetic instruments on a fixed interval.
///
/// Every pass draws a single value and applies it everywhere: each vector series in the fan-out
/// is incremented, set or observed, every scalar counter is incremented, and every scalar gauge
/// is set.  Passes are scheduled with a missed-tick behavior of "skip", so a pass that runs long
/// delays the next one rather than causing a burst of catch-up passes.
pub struct TickDriver<R = StdRng> {
    instruments: SyntheticInstruments,
    interval: Duration,
    rng: R,
    clock: Clock,
}

impl TickDriver<StdRng> {
    /// Creates a new [`TickDriver`] seeded from the operating system.
    ///
    /// Intervals shorter than one millisecond are raised to one millisecond.
    pub fn new(instruments: SyntheticInstruments, interval: Duration) -> TickDriver<StdRng> {
        TickDriver {
            instruments,
            interval: interval.max(MIN_INTERVAL),
            rng: StdRng::from_os_rng(),
            clock: Clock::new(),
        }
    }
}

impl<R: Rng> TickDriver<R> {
    /// Replaces the random source.
    pub fn with_rng<R2: Rng>(self, rng: R2) -> TickDriver<R2> {
        TickDriver {
            instruments: self.instruments,
            interval: self.interval,
            rng,
            clock: self.clock,
        }
    }

    /// Replaces the clock used to time each pass.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Gets the interval between passes.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Gets the instruments this driver mutates.
    pub fn instruments(&self) -> &SyntheticInstruments {
        &self.instruments
    }

    /// Runs a single mutation pass immediately.
    pub fn tick_once(&mut self) -> TickReport {
        let start = self.clock.now();
        let value: f64 = self.rng.random_range(0.0..10.0);

        let fanout = self.instruments.plan().fanout();
        for index in 0..fanout {
            if let Err(e) = self.update_series(index, value) {
                warn!(error = %e, index, "failed to update synthetic series");
            }
        }

        for counter in self.instruments.counters() {
            counter.inc();
        }
        for gauge in self.instruments.gauges() {
            gauge.set(value);
        }

        let elapsed = self.clock.now().duration_since(start);
        TickReport {
            value,
            series: fanout,
            scalars: self.instruments.counters().len() + self.instruments.gauges().len(),
            elapsed,
        }
    }

    fn update_series(&self, index: usize, value: f64) -> Result<(), Error> {
        let values = label_values(self.instruments.plan().label_num(), index);
        self.instruments.counter_vec().with_label_values(&values)?.inc();
        self.instruments.gauge_vec().with_label_values(&values)?.set(value);
        self.instruments.summary_vec().with_label_values(&values)?.observe(value);
        self.instruments.histogram_vec().with_label_values(&values)?.observe(value);
        Ok(())
    }

    /// Runs `n` passes on schedule, returning a report for each.
    ///
    /// The first pass runs one interval after this is called.
    pub async fn run_ticks(&mut self, n: usize) -> Vec<TickReport> {
        let mut interval = self.schedule();
        let mut reports = Vec::with_capacity(n);
        for _ in 0..n {
            interval.tick().await;
            reports.push(self.scheduled_tick());
        }
        reports
    }

    /// Runs passes on schedule forever.
    ///
    /// The first pass runs one interval after this is called.
    pub async fn run(mut self) {
        let mut interval = self.schedule();
        loop {
            interval.tick().await;
            self.scheduled_tick();
        }
    }

    fn schedule(&self) -> Interval {
        let mut interval = time::interval_at(Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    }

    fn scheduled_tick(&mut self) -> TickReport {
        let report = self.tick_once();
        if report.elapsed > self.interval {
            warn!(
                elapsed_ms = report.elapsed.as_millis() as u64,
                interval_ms = self.interval.as_millis() as u64,
                "mutation pass took longer than the interval"
            );
        } else {
            debug!(
                value = report.value,
                series = report.series,
                scalars = report.scalars,
                elapsed_us = report.elapsed.as_micros() as u64,
                "mutation pass complete"
            );
        }
        report
    }
}
