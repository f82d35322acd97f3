use std::fmt;

/// Metric kind.
///
/// Defines the kind, or type, of a metric family.  Follows the metric types of the Prometheus text
/// exposition format:
/// - counters
/// - gauges
/// - histograms
/// - summaries
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum MetricKind {
    /// Counter type.
    Counter,
    /// Gauge type.
    Gauge,
    /// Histogram type.
    Histogram,
    /// Summary type.
    Summary,
}

impl MetricKind {
    /// Gets the name of this kind as written on a `# TYPE` line.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
        }
    }

    /// Parses the type name from a `# TYPE` line.
    ///
    /// Returns `None` for anything that is not one of the four known kinds, including `untyped`.
    pub fn from_type_str(s: &str) -> Option<MetricKind> {
        match s {
            "counter" => Some(MetricKind::Counter),
            "gauge" => Some(MetricKind::Gauge),
            "histogram" => Some(MetricKind::Histogram),
            "summary" => Some(MetricKind::Summary),
            _ => None,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::MetricKind;

    #[test]
    fn test_type_str_round_trip() {
        for kind in
            [MetricKind::Counter, MetricKind::Gauge, MetricKind::Histogram, MetricKind::Summary]
        {
            assert_eq!(MetricKind::from_type_str(kind.as_str()), Some(kind));
        }

        assert_eq!(MetricKind::from_type_str("untyped"), None);
        assert_eq!(MetricKind::from_type_str("Gauge"), None);
    }
}
