use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use sketches_ddsketch::{Config, DDSketch};

/// A target quantile and its allowed rank error, e.g. `0.99 ± 0.005`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Objective {
    /// Quantile, between 0.0 and 1.0 inclusive.
    pub quantile: f64,
    /// Allowed error for the quantile.
    pub error: f64,
}

impl Objective {
    /// Creates a new [`Objective`].
    pub const fn new(quantile: f64, error: f64) -> Objective {
        Objective { quantile, error }
    }
}

/// A summary that reports configured quantiles over every observation it has seen.
///
/// Quantiles are estimated with [DDSketch](ddsketch), which gives relative-error guarantees
/// regardless of the range of observed values.  Observations whose magnitude is at or below
/// `1.0e-9` are counted as zeroes, and negative observations are tracked in a separate sketch.
///
/// The objective errors are carried for reference only; the sketch's own relative error (0.01%)
/// is tighter than any of the rank errors a summary is normally configured with.
///
/// [ddsketch]: https://arxiv.org/abs/1908.10693
#[derive(Clone)]
pub struct Summary {
    objectives: Arc<[Objective]>,
    inner: Arc<Mutex<Sketch>>,
}

struct Sketch {
    negative: DDSketch,
    positive: DDSketch,
    zeroes: usize,
    sum: f64,
    count: u64,
}

const ALPHA: f64 = 0.0001;
const MAX_BUCKETS: u32 = 32_768;
const MIN_VALUE: f64 = 1.0e-9;

/// Point-in-time view of a [`Summary`].
#[derive(Clone, Debug, PartialEq)]
pub struct SummarySnapshot {
    /// `(quantile, value)` pairs in objective order.  Values are `NaN` while the summary is empty.
    pub quantiles: Vec<(f64, f64)>,
    /// Sum of all observations.
    pub sum: f64,
    /// Number of observations.
    pub count: u64,
}

impl Summary {
    /// Creates a new, empty [`Summary`] reporting the given objectives.
    pub fn new(objectives: Arc<[Objective]>) -> Summary {
        let config = Config::new(ALPHA, MAX_BUCKETS, MIN_VALUE);
        let sketch = Sketch {
            negative: DDSketch::new(config.clone()),
            positive: DDSketch::new(config),
            zeroes: 0,
            sum: 0.0,
            count: 0,
        };

        Summary { objectives, inner: Arc::new(Mutex::new(sketch)) }
    }

    /// Records a single observation.
    pub fn observe(&self, value: f64) {
        let mut inner = self.inner.lock();
        inner.sum += value;
        inner.count += 1;

        let vabs = value.abs();
        if vabs <= MIN_VALUE {
            inner.zeroes += 1;
        } else if value > 0.0 {
            inner.positive.add(vabs);
        } else {
            inner.negative.add(vabs);
        }
    }

    /// Gets the objectives this summary reports.
    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    /// Takes a snapshot of the objective quantiles, sum, and count.
    pub fn snapshot(&self) -> SummarySnapshot {
        let inner = self.inner.lock();
        let quantiles = self
            .objectives
            .iter()
            .map(|o| (o.quantile, inner.quantile(o.quantile).unwrap_or(f64::NAN)))
            .collect();

        SummarySnapshot { quantiles, sum: inner.sum, count: inner.count }
    }
}

impl Sketch {
    fn quantile(&self, q: f64) -> Option<f64> {
        if !(0.0..=1.0).contains(&q) {
            return None;
        }

        let ncount = self.negative.count();
        let pcount = self.positive.count();
        let zcount = self.zeroes;
        let total = ncount + pcount + zcount;
        if total == 0 {
            return None;
        }

        // One-based rank of the requested observation across all three bands.
        let rank = ((q * total as f64).ceil() as usize).max(1);

        if rank <= ncount {
            // The most negative value has the largest magnitude, so ranks run backwards here.
            let nq = 1.0 - (rank - 1) as f64 / ncount as f64;
            self.negative.quantile(nq).ok().flatten().map(|v| -v)
        } else if rank <= ncount + zcount {
            Some(0.0)
        } else {
            let pq = (rank - ncount - zcount) as f64 / pcount as f64;
            self.positive.quantile(pq).ok().flatten()
        }
    }
}

impl fmt::Debug for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Summary")
            .field("objectives", &self.objectives)
            .field("count", &inner.count)
            .field("sum", &inner.sum)
            .finish()
    }
}
