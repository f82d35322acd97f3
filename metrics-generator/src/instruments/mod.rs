//! Instrument handles and labeled instrument vectors.
//!
//! Every handle is a cheap, cloneable reference to shared state: cloning a [`Counter`] and
//! incrementing the clone is visible through the original.  Counters and gauges are plain
//! atomics, while histograms and summaries guard their accumulators with a mutex, so every
//! mutation is safe to interleave with a concurrent scrape.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

mod histogram;
pub use self::histogram::{Histogram, HistogramSnapshot};
use self::histogram::validate_buckets;

mod summary;
pub use self::summary::{Objective, Summary, SummarySnapshot};

use crate::desc::{Desc, Opts};
use crate::error::Error;
use crate::kind::MetricKind;
use crate::registry::{SeriesSnapshot, SeriesValue};

/// A single series handle that can be stored in a [`MetricVec`].
pub trait Metric: Clone + Send + Sync + 'static {
    /// Per-vector options every series is created with, such as histogram buckets.
    type Options: Clone + Send + Sync;

    /// Kind of the metric family this series belongs to.
    const KIND: MetricKind;

    /// Creates a new, zeroed series.
    fn with_options(options: &Self::Options) -> Self;

    /// Reads the current value of the series.
    fn snapshot(&self) -> SeriesValue;
}

/// A monotonically increasing counter.
#[derive(Clone, Debug, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    /// Creates a new counter starting at zero.
    pub fn new() -> Counter {
        Counter::default()
    }

    /// Increments the counter by one.
    pub fn inc(&self) {
        self.increment(1);
    }

    /// Increments the counter by the given amount.
    pub fn increment(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    /// Gets the current value.
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Metric for Counter {
    type Options = ();
    const KIND: MetricKind = MetricKind::Counter;

    fn with_options(_: &()) -> Self {
        Counter::new()
    }

    fn snapshot(&self) -> SeriesValue {
        SeriesValue::Counter(self.get())
    }
}

/// A gauge holding the last value it was set to.
#[derive(Clone, Debug)]
pub struct Gauge {
    // Bit pattern of an `f64`.
    value: Arc<AtomicU64>,
}

impl Gauge {
    /// Creates a new gauge set to zero.
    pub fn new() -> Gauge {
        Gauge { value: Arc::new(AtomicU64::new(0.0f64.to_bits())) }
    }

    /// Sets the gauge to the given value.
    pub fn set(&self, value: f64) {
        self.value.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Adds `value` to the gauge.
    pub fn increment(&self, value: f64) {
        let _ = self.value.fetch_update(Ordering::AcqRel, Ordering::Relaxed, |curr| {
            Some((f64::from_bits(curr) + value).to_bits())
        });
    }

    /// Subtracts `value` from the gauge.
    pub fn decrement(&self, value: f64) {
        self.increment(-value);
    }

    /// Gets the current value.
    pub fn get(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed))
    }
}

impl Default for Gauge {
    fn default() -> Self {
        Gauge::new()
    }
}

impl Metric for Gauge {
    type Options = ();
    const KIND: MetricKind = MetricKind::Gauge;

    fn with_options(_: &()) -> Self {
        Gauge::new()
    }

    fn snapshot(&self) -> SeriesValue {
        SeriesValue::Gauge(self.get())
    }
}

impl Metric for Histogram {
    type Options = Arc<[f64]>;
    const KIND: MetricKind = MetricKind::Histogram;

    fn with_options(buckets: &Arc<[f64]>) -> Self {
        Histogram::new(buckets.clone())
    }

    fn snapshot(&self) -> SeriesValue {
        SeriesValue::Histogram(Histogram::snapshot(self))
    }
}

impl Metric for Summary {
    type Options = Arc<[Objective]>;
    const KIND: MetricKind = MetricKind::Summary;

    fn with_options(objectives: &Arc<[Objective]>) -> Self {
        Summary::new(objectives.clone())
    }

    fn snapshot(&self) -> SeriesValue {
        SeriesValue::Summary(Summary::snapshot(self))
    }
}

/// A family of series sharing a name, help text, and label names.
///
/// Series are created lazily the first time a given set of label values is requested, and live
/// for as long as the vector does.
pub struct MetricVec<M: Metric> {
    desc: Arc<Desc>,
    options: M::Options,
    series: RwLock<IndexMap<Vec<String>, M>>,
}

/// A vector of [`Counter`]s.
pub type CounterVec = MetricVec<Counter>;
/// A vector of [`Gauge`]s.
pub type GaugeVec = MetricVec<Gauge>;
/// A vector of [`Histogram`]s.
pub type HistogramVec = MetricVec<Histogram>;
/// A vector of [`Summary`]s.
pub type SummaryVec = MetricVec<Summary>;

impl<M: Metric> MetricVec<M> {
    fn with_options<S: AsRef<str>>(
        opts: Opts,
        label_names: &[S],
        options: M::Options,
    ) -> Result<Self, Error> {
        let desc = Desc::new(M::KIND, opts, label_names)?;
        Ok(MetricVec { desc: Arc::new(desc), options, series: RwLock::new(IndexMap::new()) })
    }

    /// Gets the descriptor of this vector.
    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    pub(crate) fn shared_desc(&self) -> Arc<Desc> {
        self.desc.clone()
    }

    /// Gets the series for the given label values, creating it if it does not yet exist.
    ///
    /// Values are matched positionally against the vector's label names, so the number of values
    /// must equal the number of label names.
    pub fn with_label_values<S: AsRef<str>>(&self, values: &[S]) -> Result<M, Error> {
        let key = self.key_from_values(values)?;
        if let Some(series) = self.series.read().get(&key) {
            return Ok(series.clone());
        }

        let mut series = self.series.write();
        Ok(series.entry(key).or_insert_with(|| M::with_options(&self.options)).clone())
    }

    /// Gets the series for the given label pairs, creating it if it does not yet exist.
    ///
    /// Pairs may be given in any order, but must name every label of the vector exactly once.
    pub fn with_labels<K, V>(&self, labels: &[(K, V)]) -> Result<M, Error>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let values = self.values_from_pairs(labels)?;
        self.with_label_values(&values)
    }

    /// Gets the series for the given label values without creating it.
    pub fn get_label_values<S: AsRef<str>>(&self, values: &[S]) -> Option<M> {
        let key = self.key_from_values(values).ok()?;
        self.series.read().get(&key).cloned()
    }

    /// Gets the series for the given label pairs without creating it.
    pub fn get_labels<K, V>(&self, labels: &[(K, V)]) -> Option<M>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let values = self.values_from_pairs(labels).ok()?;
        self.get_label_values(&values)
    }

    /// Number of series created so far.
    pub fn len(&self) -> usize {
        self.series.read().len()
    }

    /// Whether no series has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn collect(&self) -> Vec<SeriesSnapshot> {
        let names = self.desc.variable_labels();
        self.series
            .read()
            .iter()
            .map(|(values, series)| {
                let labels = self
                    .desc
                    .const_labels()
                    .iter()
                    .cloned()
                    .chain(names.iter().cloned().zip(values.iter().cloned()))
                    .collect();
                SeriesSnapshot { labels, value: series.snapshot() }
            })
            .collect()
    }

    fn key_from_values<S: AsRef<str>>(&self, values: &[S]) -> Result<Vec<String>, Error> {
        let expected = self.desc.variable_labels().len();
        if values.len() != expected {
            return Err(Error::LabelMismatch {
                name: self.desc.fq_name().to_string(),
                expected,
                actual: values.len(),
            });
        }

        Ok(values.iter().map(|value| value.as_ref().to_string()).collect())
    }

    fn values_from_pairs<'a, K, V>(&self, labels: &'a [(K, V)]) -> Result<Vec<&'a str>, Error>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let names = self.desc.variable_labels();
        if labels.len() != names.len() {
            return Err(Error::LabelMismatch {
                name: self.desc.fq_name().to_string(),
                expected: names.len(),
                actual: labels.len(),
            });
        }

        names
            .iter()
            .map(|name| {
                labels
                    .iter()
                    .find(|(key, _)| key.as_ref() == name.as_str())
                    .map(|(_, value)| value.as_ref())
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                let unknown = labels
                    .iter()
                    .map(|(key, _)| key.as_ref())
                    .find(|key| !names.iter().any(|name| name.as_str() == *key))
                    .unwrap_or_default();
                Error::UnknownLabel {
                    name: self.desc.fq_name().to_string(),
                    label: unknown.to_string(),
                }
            })
    }
}

impl CounterVec {
    /// Creates a new [`CounterVec`].
    pub fn new<S: AsRef<str>>(opts: Opts, label_names: &[S]) -> Result<CounterVec, Error> {
        MetricVec::with_options(opts, label_names, ())
    }
}

impl GaugeVec {
    /// Creates a new [`GaugeVec`].
    pub fn new<S: AsRef<str>>(opts: Opts, label_names: &[S]) -> Result<GaugeVec, Error> {
        MetricVec::with_options(opts, label_names, ())
    }
}

impl HistogramVec {
    /// Creates a new [`HistogramVec`] whose series share the given bucket upper bounds.
    pub fn new<S: AsRef<str>>(
        opts: Opts,
        label_names: &[S],
        buckets: &[f64],
    ) -> Result<HistogramVec, Error> {
        let buckets =
            validate_buckets(buckets).map_err(|reason| Error::invalid(opts.fq_name(), reason))?;
        MetricVec::with_options(opts, label_names, buckets)
    }

    /// Gets the bucket upper bounds.
    pub fn buckets(&self) -> &[f64] {
        &self.options
    }
}

impl SummaryVec {
    /// Creates a new [`SummaryVec`] whose series report the given objectives.
    ///
    /// Objectives are sorted by quantile; every quantile must lie within `[0, 1]`.
    pub fn new<S: AsRef<str>>(
        opts: Opts,
        label_names: &[S],
        objectives: &[Objective],
    ) -> Result<SummaryVec, Error> {
        if objectives.iter().any(|o| !(0.0..=1.0).contains(&o.quantile)) {
            return Err(Error::invalid(opts.fq_name(), "quantiles must be between 0 and 1"));
        }

        let mut objectives = objectives.to_vec();
        objectives.sort_by(|a, b| a.quantile.total_cmp(&b.quantile));
        MetricVec::with_options(opts, label_names, objectives.into())
    }

    /// Gets the objectives, sorted by quantile.
    pub fn objectives(&self) -> &[Objective] {
        &self.options
    }
}
