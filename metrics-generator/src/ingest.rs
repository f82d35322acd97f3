//! Replays a text-format metrics snapshot into an [`InstrumentSet`].
//!
//! Only gauges are actually served afterwards.  Counter, histogram and summary families are
//! turned into descriptors, which validates their names and labels, but are neither registered
//! nor populated: a snapshot holds no history to rebuild a counter's rate or a histogram's
//! distribution from, and replaying totals as if they were fresh would make scrapers see a
//! spurious reset.
use std::path::Path;

use indexmap::IndexSet;
use tracing::{debug, info, warn};

use crate::desc::Opts;
use crate::error::Error;
use crate::instruments::{CounterVec, GaugeVec, HistogramVec, SummaryVec};
use crate::kind::MetricKind;
use crate::parser::{parse, parse_bytes, MetricFamily, SeriesData};
use crate::registry::InstrumentSet;

/// Buckets used to describe replayed histogram families.
pub const DEFAULT_BUCKETS: [f64; 11] =
    [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Counts of what a replay did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Families registered and populated.
    pub registered: usize,
    /// Families validated but neither registered nor populated.
    pub declared: usize,
    /// Families skipped because of their type, an invalid descriptor or a name conflict.
    pub skipped_families: usize,
    /// Series whose value was set.
    pub replayed_series: usize,
    /// Series skipped because their labels did not match the family's label keys.
    pub skipped_series: usize,
}

/// Reads, parses and replays the snapshot at `path`.
///
/// Fails without touching `set` if the file cannot be read or is not valid text format.
pub fn ingest_file<P: AsRef<Path>>(set: &InstrumentSet, path: P) -> Result<IngestReport, Error> {
    let path = path.as_ref();
    let contents =
        std::fs::read(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    let families = parse_bytes(&contents)?;

    let report = replay(set, families);
    info!(
        path = %path.display(),
        registered = report.registered,
        declared = report.declared,
        skipped = report.skipped_families,
        series = report.replayed_series,
        "ingested metrics file"
    );
    Ok(report)
}

/// Parses and replays an in-memory snapshot.
pub fn ingest_str(set: &InstrumentSet, input: &str) -> Result<IngestReport, Error> {
    let families = parse(input)?;
    Ok(replay(set, families))
}

/// Replays already-parsed families into `set`.
///
/// Problems with a single family or series are logged and skipped; they never abort the replay.
pub fn replay(set: &InstrumentSet, families: Vec<MetricFamily>) -> IngestReport {
    let mut report = IngestReport::default();

    for family in families {
        let keys =
            label_keys(family.series.iter().flat_map(|s| s.labels.iter().map(|(key, _)| key)));
        let opts = Opts::new(family.name.as_str(), family.help.clone().unwrap_or_default());

        let result = match family.kind {
            Some(MetricKind::Gauge) => replay_gauges(set, opts, &keys, &family, &mut report),
            Some(MetricKind::Counter) => CounterVec::new(opts, &keys).map(|_| ()),
            Some(MetricKind::Histogram) => {
                HistogramVec::new(opts, &keys, &DEFAULT_BUCKETS).map(|_| ())
            }
            Some(MetricKind::Summary) => SummaryVec::new(opts, &keys, &[]).map(|_| ()),
            None => Err(Error::UnsupportedType {
                name: family.name.clone(),
                kind: "untyped".to_string(),
            }),
        };

        match (result, family.kind) {
            (Ok(()), Some(MetricKind::Gauge)) => report.registered += 1,
            (Ok(()), kind) => {
                debug!(name = %family.name, kind = ?kind, "declared family without registering it");
                report.declared += 1;
            }
            (Err(e), _) => {
                warn!(name = %family.name, labels = ?keys, error = %e, "skipping metric family");
                report.skipped_families += 1;
            }
        }
    }

    report
}

fn replay_gauges(
    set: &InstrumentSet,
    opts: Opts,
    keys: &[String],
    family: &MetricFamily,
    report: &mut IngestReport,
) -> Result<(), Error> {
    let gauges = set.register_vec(GaugeVec::new(opts, keys)?)?;

    for series in &family.series {
        let value = match series.data {
            SeriesData::Value(value) => value,
            // Only histogram and summary families carry grouped data.
            _ => continue,
        };

        if series.labels.len() != keys.len() {
            let e = Error::LabelMismatch {
                name: family.name.clone(),
                expected: keys.len(),
                actual: series.labels.len(),
            };
            warn!(labels = ?series.labels, error = %e, "skipping series");
            report.skipped_series += 1;
            continue;
        }

        match gauges.with_labels(&series.labels) {
            Ok(gauge) => {
                gauge.set(value);
                report.replayed_series += 1;
            }
            Err(e) => {
                warn!(labels = ?series.labels, error = %e, "skipping series");
                report.skipped_series += 1;
            }
        }
    }

    Ok(())
}

/// Collects the distinct label names of a family, in the order they were first seen.
pub fn label_keys<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().to_string())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}
