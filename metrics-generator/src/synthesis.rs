//! Builds the synthetic instrument set.
//!
//! A requested metric count is split into units of [`UNIT_SIZE`].  Whatever the count, four
//! vectors are always built (a counter, a gauge, a summary, and a histogram), each dimensioned by
//! [`label_names`](crate::cardinality::label_names).  On top of those, every unit adds one scalar
//! counter and one scalar gauge.  Any remainder below a full unit is dropped.
use std::sync::Arc;

use tracing::warn;

use crate::cardinality::label_names;
use crate::desc::Opts;
use crate::error::Error;
use crate::instruments::{Counter, CounterVec, Gauge, GaugeVec, HistogramVec, Objective, SummaryVec};
use crate::registry::InstrumentSet;

/// Namespace of every synthetic instrument.
pub const DEFAULT_NAMESPACE: &str = "monitor";
/// Subsystem of every synthetic instrument.
pub const DEFAULT_SUBSYSTEM: &str = "exporter";

/// Smallest metric count that generation will run with.
pub const MIN_METRIC_NUM: usize = 20;
/// Number of requested metrics that make up one unit.
pub const UNIT_SIZE: usize = 20;

/// Constant label carried by every scalar instrument.
pub const CONST_LABEL: (&str, &str) = ("repo", "custom-exporter");

/// Objectives of the synthetic summary vector.
pub const SUMMARY_OBJECTIVES: [Objective; 5] = [
    Objective::new(0.1, 0.5),
    Objective::new(0.5, 0.05),
    Objective::new(0.9, 0.01),
    Objective::new(0.99, 0.005),
    Objective::new(1.0, 0.001),
];

/// Buckets of the synthetic histogram vector.
pub const HISTOGRAM_BUCKETS: [f64; 6] = [0.1, 1.0, 3.0, 5.0, 7.0, 10.0];

/// Raises a metric count below [`MIN_METRIC_NUM`] to the minimum, logging a warning if it did.
pub fn clamp_metric_num(metric_num: usize) -> usize {
    if metric_num < MIN_METRIC_NUM {
        warn!(requested = metric_num, minimum = MIN_METRIC_NUM, "metric count raised to minimum");
        MIN_METRIC_NUM
    } else {
        metric_num
    }
}

/// How a requested metric count is partitioned across instruments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynthesisPlan {
    metric_num: usize,
    label_num: usize,
    units: usize,
    fanout: usize,
}

impl SynthesisPlan {
    /// Creates a plan for the given metric and label counts.
    ///
    /// The vector fan-out defaults to the unit count.
    pub fn new(metric_num: usize, label_num: usize) -> SynthesisPlan {
        let units = metric_num / UNIT_SIZE;
        SynthesisPlan { metric_num, label_num, units, fanout: units }
    }

    /// Sets how many series of each vector are touched per tick, independently of the unit count.
    pub fn with_fanout(mut self, fanout: usize) -> Self {
        self.fanout = fanout;
        self
    }

    /// Requested metric count.
    pub fn metric_num(&self) -> usize {
        self.metric_num
    }

    /// Number of `keyN` labels, not counting `index`.
    pub fn label_num(&self) -> usize {
        self.label_num
    }

    /// Number of scalar counters, and of scalar gauges.
    pub fn units(&self) -> usize {
        self.units
    }

    /// Number of series touched in each vector per tick.
    pub fn fanout(&self) -> usize {
        self.fanout
    }
}

/// Builds and registers the synthetic instruments.
#[derive(Clone, Debug)]
pub struct SynthesisBuilder {
    plan: SynthesisPlan,
    namespace: String,
    subsystem: String,
}

impl SynthesisBuilder {
    /// Creates a new [`SynthesisBuilder`] for the given metric and label counts.
    pub fn new(metric_num: usize, label_num: usize) -> SynthesisBuilder {
        SynthesisBuilder::from_plan(SynthesisPlan::new(metric_num, label_num))
    }

    /// Creates a new [`SynthesisBuilder`] from an existing plan.
    pub fn from_plan(plan: SynthesisPlan) -> SynthesisBuilder {
        SynthesisBuilder {
            plan,
            namespace: DEFAULT_NAMESPACE.to_string(),
            subsystem: DEFAULT_SUBSYSTEM.to_string(),
        }
    }

    /// Overrides the vector fan-out.
    pub fn fanout(mut self, fanout: usize) -> Self {
        self.plan = self.plan.with_fanout(fanout);
        self
    }

    /// Gets the plan this builder will build.
    pub fn plan(&self) -> &SynthesisPlan {
        &self.plan
    }

    fn opts(&self, name: impl Into<String>, help: &str) -> Opts {
        Opts::new(name, help).namespace(self.namespace.as_str()).subsystem(self.subsystem.as_str())
    }

    /// Builds every instrument in the plan and registers it in `set`.
    ///
    /// Registration stops at the first failure, which is returned as-is.  Instruments registered
    /// before the failure stay registered: a conflict here means the set was not clean to begin
    /// with, and callers are expected to abort rather than serve it.
    pub fn build(self, set: &InstrumentSet) -> Result<SyntheticInstruments, Error> {
        let names = label_names(self.plan.label_num);

        let counter_vec = set.register_vec(CounterVec::new(
            self.opts("request_total", "The total number of requests"),
            &names,
        )?)?;
        let gauge_vec = set.register_vec(GaugeVec::new(
            self.opts("request_duration_seconds", "The process duration of the request"),
            &names,
        )?)?;
        let summary_vec = set.register_vec(SummaryVec::new(
            self.opts("rpc_duration_seconds", "RPC latency distributions."),
            &names,
            &SUMMARY_OBJECTIVES,
        )?)?;
        let histogram_vec = set.register_vec(HistogramVec::new(
            self.opts("rpc_durations_histogram_seconds", "RPC latency distributions."),
            &names,
            &HISTOGRAM_BUCKETS,
        )?)?;

        let (key, value) = CONST_LABEL;
        let counters = (0..self.plan.units)
            .map(|i| {
                let opts = self
                    .opts(format!("response_{}_total", i), "The total number of responses")
                    .const_label(key, value);
                set.register_counter(opts)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let gauges = (0..self.plan.units)
            .map(|i| {
                let opts = self
                    .opts(format!("memory_{}_usage_bytes", i), "The usage bytes of the memory")
                    .const_label(key, value);
                set.register_gauge(opts)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SyntheticInstruments {
            plan: self.plan,
            counter_vec,
            gauge_vec,
            summary_vec,
            histogram_vec,
            counters,
            gauges,
        })
    }
}

/// Handles to every instrument built by a [`SynthesisBuilder`].
#[derive(Clone)]
pub struct SyntheticInstruments {
    plan: SynthesisPlan,
    counter_vec: Arc<CounterVec>,
    gauge_vec: Arc<GaugeVec>,
    summary_vec: Arc<SummaryVec>,
    histogram_vec: Arc<HistogramVec>,
    counters: Vec<Counter>,
    gauges: Vec<Gauge>,
}

impl SyntheticInstruments {
    /// Plan the instruments were built from.
    pub fn plan(&self) -> &SynthesisPlan {
        &self.plan
    }

    /// The `request_total` counter vector.
    pub fn counter_vec(&self) -> &Arc<CounterVec> {
        &self.counter_vec
    }

    /// The `request_duration_seconds` gauge vector.
    pub fn gauge_vec(&self) -> &Arc<GaugeVec> {
        &self.gauge_vec
    }

    /// The `rpc_duration_seconds` summary vector.
    pub fn summary_vec(&self) -> &Arc<SummaryVec> {
        &self.summary_vec
    }

    /// The `rpc_durations_histogram_seconds` histogram vector.
    pub fn histogram_vec(&self) -> &Arc<HistogramVec> {
        &self.histogram_vec
    }

    /// The `response_{i}_total` scalar counters.
    pub fn counters(&self) -> &[Counter] {
        &self.counters
    }

    /// The `memory_{i}_usage_bytes` scalar gauges.
    pub fn gauges(&self) -> &[Gauge] {
        &self.gauges
    }
}

#[cfg(test)]
mod tests {
    use super::{clamp_metric_num, SynthesisBuilder, SynthesisPlan, MIN_METRIC_NUM};
    use crate::{Error, InstrumentSet};

    #[test]
    fn test_plan_truncates_units() {
        let plan = SynthesisPlan::new(59, 3);
        assert_eq!(plan.units(), 2);
        assert_eq!(plan.fanout(), 2);
        assert_eq!(plan.label_num(), 3);
        assert_eq!(plan.metric_num(), 59);

        assert_eq!(plan.with_fanout(100).fanout(), 100);
        assert_eq!(plan.with_fanout(100).units(), 2);
    }

    #[test]
    fn test_clamp_metric_num() {
        assert_eq!(clamp_metric_num(1), MIN_METRIC_NUM);
        assert_eq!(clamp_metric_num(20), 20);
        assert_eq!(clamp_metric_num(1000), 1000);
    }

    #[test]
    fn test_build_into_dirty_set_fails() {
        let set = InstrumentSet::new();
        SynthesisBuilder::new(20, 1).build(&set).expect("clean set builds");

        let result = SynthesisBuilder::new(20, 1).build(&set);
        match result {
            Err(Error::RegistrationConflict { name }) => {
                assert_eq!(name, "monitor_exporter_request_total")
            }
            _ => panic!("expected a registration conflict"),
        }
    }

    #[test]
    fn test_fanout_override_keeps_units() {
        let set = InstrumentSet::new();
        let instruments = SynthesisBuilder::new(40, 0).fanout(7).build(&set).expect("builds");
        assert_eq!(instruments.plan().fanout(), 7);
        assert_eq!(instruments.counters().len(), 2);
        assert_eq!(instruments.gauges().len(), 2);
    }
}
