//! Generates synthetic Prometheus metrics for load-testing scrapers and storage backends.
//!
//! The crate is built around an [`InstrumentSet`]: an ordered, name-keyed set of counters,
//! gauges, histograms and summaries that renders itself in the Prometheus text exposition format.
//! Two things populate it:
//!
//! - a [`SynthesisBuilder`], which turns a requested metric count and label count into a fixed
//!   set of labeled vectors and scalar instruments, later mutated on a schedule by a
//!   [`TickDriver`];
//! - [`ingest_file`], which replays the gauges of a text-format snapshot so that a known metric
//!   shape can be served back.
//!
//! ```
//! use std::time::Duration;
//!
//! use metrics_generator::{InstrumentSet, SynthesisBuilder, TickDriver};
//!
//! let set = InstrumentSet::new();
//! let instruments = SynthesisBuilder::new(40, 2).build(&set)?;
//! let mut driver = TickDriver::new(instruments, Duration::from_secs(1));
//! driver.tick_once();
//!
//! assert!(set.render().contains("monitor_exporter_response_1_total{repo=\"custom-exporter\"} 1"));
//! # Ok::<(), metrics_generator::Error>(())
//! ```
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(broken_intra_doc_links))]
pub mod cardinality;

mod desc;
pub use self::desc::{build_fq_name, Desc, Opts};

mod error;
pub use self::error::Error;

pub mod formatting;

mod ingest;
pub use self::ingest::{
    ingest_file, ingest_str, label_keys, replay, IngestReport, DEFAULT_BUCKETS,
};

pub mod instruments;

mod kind;
pub use self::kind::MetricKind;

pub mod parser;
pub use self::parser::{MetricFamily, ParseError, ParseErrorKind};

mod registry;
pub use self::registry::{Collector, FamilySnapshot, InstrumentSet, SeriesSnapshot, SeriesValue};

mod synthesis;
pub use self::synthesis::{
    clamp_metric_num, SynthesisBuilder, SynthesisPlan, SyntheticInstruments, CONST_LABEL,
    DEFAULT_NAMESPACE, DEFAULT_SUBSYSTEM, HISTOGRAM_BUCKETS, MIN_METRIC_NUM, SUMMARY_OBJECTIVES,
    UNIT_SIZE,
};

mod tick;
pub use self::tick::{TickDriver, TickReport, DEFAULT_INTERVAL};
