//! Serves synthetic Prometheus metrics over HTTP.
//!
//! This is the process around [`metrics_generator`]: it reads an [`ExporterConfig`] from the
//! command line, fills an [`InstrumentSet`] from a snapshot file and from the synthesis builder,
//! then serves it with an HTTP listener while a [`TickDriver`] keeps the synthetic instruments
//! moving.
#![deny(missing_docs)]
use std::sync::Arc;

use metrics_generator::instruments::GaugeVec;
use metrics_generator::{
    clamp_metric_num, ingest_file, Error, InstrumentSet, Opts, SynthesisBuilder, TickDriver,
};
use tracing::{error, info};

mod config;
pub use self::config::{
    options, parse_args, parse_duration, parse_listen_address, usage, Command, ExporterConfig,
};

mod error;
pub use self::error::{ConfigError, ExporterError};

mod http_listener;
pub use self::http_listener::{
    new_http_listener, ExporterFuture, SCRAPE_IN_FLIGHT_NAME, SCRAPE_REQUESTS_NAME,
    TEXT_CONTENT_TYPE,
};

/// Name of the build information gauge.
pub const BUILD_INFO_NAME: &str = "metrics_generator_build_info";

/// Registers a gauge, always `1`, labeled with the version of this crate.
pub fn register_build_info(set: &InstrumentSet) -> Result<(), Error> {
    let help = concat!(
        "A metric with a constant '1' value labeled by the version ",
        "metrics-generator was built from."
    );
    let opts = Opts::new(BUILD_INFO_NAME, help);
    let build_info = set.register_vec(GaugeVec::new(opts, &["version"])?)?;
    build_info.with_label_values(&[env!("CARGO_PKG_VERSION")])?.set(1.0);
    Ok(())
}

/// Builds the instrument set described by `config`.
///
/// In order: the build information gauge is registered, the snapshot file (if any) is replayed,
/// and the synthetic instruments (if any) are built.  A snapshot that cannot be read or parsed is
/// logged and otherwise ignored, while a failure to build the synthetic instruments is returned.
///
/// The returned driver, if any, has not been started.
pub fn build_instrument_set(
    config: &ExporterConfig,
) -> Result<(Arc<InstrumentSet>, Option<TickDriver>), ExporterError> {
    let set = Arc::new(InstrumentSet::new());
    register_build_info(&set).map_err(ExporterError::Synthesis)?;

    if let Some(path) = config.file() {
        if let Err(e) = ingest_file(&set, path) {
            error!(error = %e, "failed to ingest metrics file");
        }
    }

    if !config.generates() {
        return Ok((set, None));
    }

    let mut builder =
        SynthesisBuilder::new(clamp_metric_num(config.metric_num()), config.label_num());
    if let Some(series) = config.series() {
        builder = builder.fanout(series);
    }
    let instruments = builder.build(&set).map_err(ExporterError::Synthesis)?;

    let plan = *instruments.plan();
    info!(
        metrics = plan.metric_num(),
        labels = plan.label_num(),
        units = plan.units(),
        series = plan.fanout(),
        interval_ms = config.interval().as_millis() as u64,
        "synthetic metrics built"
    );

    Ok((set, Some(TickDriver::new(instruments, config.interval()))))
}
