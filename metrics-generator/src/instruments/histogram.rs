use std::sync::Arc;

use parking_lot::Mutex;

/// A bucketed histogram.
///
/// Tracks the number of observations that fall at or below each of a fixed set of upper bounds,
/// along with the running sum and count of every observation.  Buckets are cumulative, which is
/// what the Prometheus histogram type expects.
#[derive(Clone, Debug)]
pub struct Histogram {
    inner: Arc<Mutex<Buckets>>,
}

#[derive(Debug)]
struct Buckets {
    bounds: Arc<[f64]>,
    counts: Vec<u64>,
    sum: f64,
    count: u64,
}

/// Point-in-time view of a [`Histogram`].
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramSnapshot {
    /// Cumulative `(upper bound, count)` pairs, not including the implicit `+Inf` bucket.
    pub buckets: Vec<(f64, u64)>,
    /// Sum of all observations.
    pub sum: f64,
    /// Number of observations.
    pub count: u64,
}

impl Histogram {
    /// Creates a new, empty [`Histogram`] with the given upper bounds.
    ///
    /// Bounds are expected to be sorted in increasing order; see [`validate_buckets`].
    pub fn new(bounds: Arc<[f64]>) -> Histogram {
        let counts = vec![0; bounds.len()];
        Histogram { inner: Arc::new(Mutex::new(Buckets { bounds, counts, sum: 0.0, count: 0 })) }
    }

    /// Records a single observation.
    pub fn observe(&self, value: f64) {
        let mut inner = self.inner.lock();
        inner.sum += value;
        inner.count += 1;

        // Add the sample to every bucket where the value is less than or equal to the bound.
        let Buckets { bounds, counts, .. } = &mut *inner;
        for (bound, count) in bounds.iter().zip(counts.iter_mut()) {
            if value <= *bound {
                *count += 1;
            }
        }
    }

    /// Takes a snapshot of the current bucket counts, sum, and count.
    pub fn snapshot(&self) -> HistogramSnapshot {
        let inner = self.inner.lock();
        HistogramSnapshot {
            buckets: inner.bounds.iter().copied().zip(inner.counts.iter().copied()).collect(),
            sum: inner.sum,
            count: inner.count,
        }
    }
}

/// Validates and normalizes histogram bucket bounds.
///
/// Bounds must be non-empty and strictly increasing.  A trailing `+Inf` bound is dropped, as the
/// renderer always writes the `+Inf` bucket itself.
pub(crate) fn validate_buckets(bounds: &[f64]) -> Result<Arc<[f64]>, String> {
    let mut bounds = bounds.to_vec();
    if bounds.last().is_some_and(|b| *b == f64::INFINITY) {
        bounds.pop();
    }

    if bounds.is_empty() {
        return Err("histogram must have at least one bucket".to_string());
    }

    if bounds.iter().any(|b| b.is_nan()) {
        return Err("histogram buckets must not be NaN".to_string());
    }

    if bounds.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err("histogram buckets must be in strictly increasing order".to_string());
    }

    Ok(bounds.into())
}

#[cfg(test)]
mod tests {
    use super::{validate_buckets, Histogram};

    #[test]
    fn test_histogram() {
        let buckets = validate_buckets(&[10.0, 25.0, 100.0]).expect("buckets should be valid");
        let values = vec![3.0, 2.0, 6.0, 12.0, 56.0, 82.0, 202.0, 100.0, 29.0];

        let histogram = Histogram::new(buckets);
        for value in &values {
            histogram.observe(*value);
        }
        histogram.observe(89.0);

        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.buckets, vec![(10.0, 3), (25.0, 4), (100.0, 9)]);
        assert_eq!(snapshot.count, values.len() as u64 + 1);
        assert_eq!(snapshot.sum, 581.0);
    }

    #[test]
    fn test_clones_share_state() {
        let histogram = Histogram::new(validate_buckets(&[1.0]).expect("valid"));
        let other = histogram.clone();
        other.observe(0.5);
        assert_eq!(histogram.snapshot().count, 1);
    }

    #[test]
    fn test_validate_buckets() {
        assert!(validate_buckets(&[]).is_err());
        assert!(validate_buckets(&[f64::INFINITY]).is_err());
        assert!(validate_buckets(&[1.0, 1.0]).is_err());
        assert!(validate_buckets(&[3.0, 1.0]).is_err());
        assert!(validate_buckets(&[f64::NAN]).is_err());

        let normalized = validate_buckets(&[0.1, 1.0, f64::INFINITY]).expect("valid");
        assert_eq!(&*normalized, &[0.1, 1.0]);
    }
}
