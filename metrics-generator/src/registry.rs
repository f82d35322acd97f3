use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::desc::{Desc, Opts};
use crate::error::Error;
use crate::formatting;
use crate::instruments::{
    Counter, CounterVec, Gauge, GaugeVec, HistogramSnapshot, HistogramVec, SummarySnapshot,
    SummaryVec,
};
use crate::kind::MetricKind;

/// Anything that can be registered in an [`InstrumentSet`].
///
/// Scalars carry their own descriptor, since a bare [`Counter`] or [`Gauge`] handle does not know
/// its name.  Vectors are shared, so the caller keeps a handle to the same series the registry
/// renders.
#[derive(Clone)]
pub enum Collector {
    /// A single, unlabeled counter.
    Counter(Arc<Desc>, Counter),
    /// A single, unlabeled gauge.
    Gauge(Arc<Desc>, Gauge),
    /// A vector of counters.
    CounterVec(Arc<CounterVec>),
    /// A vector of gauges.
    GaugeVec(Arc<GaugeVec>),
    /// A vector of histograms.
    HistogramVec(Arc<HistogramVec>),
    /// A vector of summaries.
    SummaryVec(Arc<SummaryVec>),
}

impl Collector {
    /// Gets the descriptor of this collector.
    pub fn desc(&self) -> Arc<Desc> {
        match self {
            Collector::Counter(desc, _) | Collector::Gauge(desc, _) => desc.clone(),
            Collector::CounterVec(vec) => vec.shared_desc(),
            Collector::GaugeVec(vec) => vec.shared_desc(),
            Collector::HistogramVec(vec) => vec.shared_desc(),
            Collector::SummaryVec(vec) => vec.shared_desc(),
        }
    }

    /// Gets the metric kind of this collector.
    pub fn kind(&self) -> MetricKind {
        self.desc().kind()
    }

    /// Whether this collector is a labeled vector rather than a scalar.
    pub fn is_vector(&self) -> bool {
        !matches!(self, Collector::Counter(..) | Collector::Gauge(..))
    }

    fn collect(&self) -> FamilySnapshot {
        let series = match self {
            Collector::Counter(desc, counter) => vec![SeriesSnapshot {
                labels: desc.const_labels().to_vec(),
                value: SeriesValue::Counter(counter.get()),
            }],
            Collector::Gauge(desc, gauge) => vec![SeriesSnapshot {
                labels: desc.const_labels().to_vec(),
                value: SeriesValue::Gauge(gauge.get()),
            }],
            Collector::CounterVec(vec) => vec.collect(),
            Collector::GaugeVec(vec) => vec.collect(),
            Collector::HistogramVec(vec) => vec.collect(),
            Collector::SummaryVec(vec) => vec.collect(),
        };

        FamilySnapshot { desc: self.desc(), series }
    }
}

impl From<Arc<CounterVec>> for Collector {
    fn from(vec: Arc<CounterVec>) -> Self {
        Collector::CounterVec(vec)
    }
}

impl From<Arc<GaugeVec>> for Collector {
    fn from(vec: Arc<GaugeVec>) -> Self {
        Collector::GaugeVec(vec)
    }
}

impl From<Arc<HistogramVec>> for Collector {
    fn from(vec: Arc<HistogramVec>) -> Self {
        Collector::HistogramVec(vec)
    }
}

impl From<Arc<SummaryVec>> for Collector {
    fn from(vec: Arc<SummaryVec>) -> Self {
        Collector::SummaryVec(vec)
    }
}

/// Value of a single series at the time it was gathered.
#[derive(Clone, Debug, PartialEq)]
pub enum SeriesValue {
    /// Counter total.
    Counter(u64),
    /// Gauge value.
    Gauge(f64),
    /// Histogram buckets, sum, and count.
    Histogram(HistogramSnapshot),
    /// Summary quantiles, sum, and count.
    Summary(SummarySnapshot),
}

/// One gathered series: its full label set and its value.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesSnapshot {
    /// Constant labels first, then variable labels in declaration order.
    pub labels: Vec<(String, String)>,
    /// Value of the series.
    pub value: SeriesValue,
}

/// One gathered metric family.
#[derive(Clone, Debug)]
pub struct FamilySnapshot {
    /// Descriptor of the family.
    pub desc: Arc<Desc>,
    /// Every series of the family, in creation order.
    pub series: Vec<SeriesSnapshot>,
}

/// The set of instruments served by the exporter.
///
/// Instruments are keyed by their fully-qualified name, which must be unique, and are kept in
/// registration order so that rendered output is stable between scrapes.  An `InstrumentSet` is
/// meant to be built once at startup and then shared behind an [`Arc`] by whatever mutates or
/// renders it.
#[derive(Default)]
pub struct InstrumentSet {
    collectors: RwLock<IndexMap<String, Collector>>,
}

impl InstrumentSet {
    /// Creates a new, empty [`InstrumentSet`].
    pub fn new() -> InstrumentSet {
        InstrumentSet::default()
    }

    /// Registers a collector.
    ///
    /// Fails with [`Error::RegistrationConflict`] if a collector with the same fully-qualified
    /// name is already registered; the existing collector is left untouched.
    pub fn register<C: Into<Collector>>(&self, collector: C) -> Result<(), Error> {
        let collector = collector.into();
        let name = collector.desc().fq_name().to_string();

        match self.collectors.write().entry(name) {
            Entry::Occupied(entry) => {
                Err(Error::RegistrationConflict { name: entry.key().clone() })
            }
            Entry::Vacant(entry) => {
                entry.insert(collector);
                Ok(())
            }
        }
    }

    /// Creates and registers a scalar counter.
    pub fn register_counter(&self, opts: Opts) -> Result<Counter, Error> {
        let desc = Desc::new::<&str>(MetricKind::Counter, opts, &[])?;
        let counter = Counter::new();
        self.register(Collector::Counter(Arc::new(desc), counter.clone()))?;
        Ok(counter)
    }

    /// Creates and registers a scalar gauge.
    pub fn register_gauge(&self, opts: Opts) -> Result<Gauge, Error> {
        let desc = Desc::new::<&str>(MetricKind::Gauge, opts, &[])?;
        let gauge = Gauge::new();
        self.register(Collector::Gauge(Arc::new(desc), gauge.clone()))?;
        Ok(gauge)
    }

    /// Registers a vector and returns a shared handle to it.
    pub fn register_vec<V>(&self, vec: V) -> Result<Arc<V>, Error>
    where
        Collector: From<Arc<V>>,
    {
        let vec = Arc::new(vec);
        self.register(vec.clone())?;
        Ok(vec)
    }

    /// Gets the collector registered under the given fully-qualified name.
    pub fn get(&self, name: &str) -> Option<Collector> {
        self.collectors.read().get(name).cloned()
    }

    /// Gets the gauge vector registered under the given name, if that is what it is.
    pub fn gauge_vec(&self, name: &str) -> Option<Arc<GaugeVec>> {
        match self.get(name)? {
            Collector::GaugeVec(vec) => Some(vec),
            _ => None,
        }
    }

    /// Gets the counter vector registered under the given name, if that is what it is.
    pub fn counter_vec(&self, name: &str) -> Option<Arc<CounterVec>> {
        match self.get(name)? {
            Collector::CounterVec(vec) => Some(vec),
            _ => None,
        }
    }

    /// Whether a collector is registered under the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.collectors.read().contains_key(name)
    }

    /// Fully-qualified names of every registered collector, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.collectors.read().keys().cloned().collect()
    }

    /// Number of registered collectors.
    pub fn len(&self) -> usize {
        self.collectors.read().len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads every registered collector, in registration order.
    ///
    /// Families are returned even if they have no series yet.
    pub fn gather(&self) -> Vec<FamilySnapshot> {
        // Clone the handles out so that reading series values does not hold the registry lock.
        let collectors = self.collectors.read().values().cloned().collect::<Vec<_>>();
        collectors.iter().map(Collector::collect).collect()
    }

    /// Renders every registered collector in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        formatting::render(&self.gather())
    }
}
