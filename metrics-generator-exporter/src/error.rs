use std::io;
use std::net::SocketAddr;

use thiserror::Error as ThisError;

/// Errors that can occur while reading the exporter configuration.
#[derive(Debug, ThisError)]
pub enum ConfigError {
    /// The command line could not be parsed.
    #[error("failed to parse command line args: {0}")]
    Args(#[from] getopts::Fail),

    /// An option had a value that could not be interpreted.
    #[error("invalid value `{value}` for --{option}: {reason}")]
    InvalidValue {
        /// Long name of the option.
        option: &'static str,
        /// Value as given.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// An allow-list entry was neither an IP address nor a subnet.
    #[error("invalid allowlist address `{address}`: {reason}")]
    InvalidAllowlistAddress {
        /// Address as given.
        address: String,
        /// Details about the parsing failure.
        reason: String,
    },
}

/// Errors that can occur while running the exporter.
#[derive(Debug, ThisError)]
pub enum ExporterError {
    /// The listen address could not be bound.
    #[error("failed to create HTTP listener on {address}: {source}")]
    FailedToCreateHttpListener {
        /// Address that was being bound.
        address: SocketAddr,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The bound listener could not be handed to the async runtime.
    #[error("failed to register HTTP listener with the runtime: {0}")]
    Runtime(#[source] io::Error),

    /// The listener's own instruments could not be registered.
    #[error("failed to register scrape handler metrics: {0}")]
    ScrapeMetrics(#[source] metrics_generator::Error),

    /// The synthetic instruments could not be built.
    #[error("failed to build synthetic metrics: {0}")]
    Synthesis(#[source] metrics_generator::Error),
}
