use std::io;
use std::path::PathBuf;

use thiserror::Error as ThisError;

use crate::parser::ParseError;

/// Errors that can occur while building, registering, or replaying instruments.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The metrics file could not be read.
    #[error("failed to open file {}: {source}", path.display())]
    Io {
        /// Path of the file that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The input was not valid text exposition format.
    #[error("failed to parse text metrics: {0}")]
    Parse(#[from] ParseError),

    /// A metric with the same fully-qualified name is already registered.
    #[error("duplicate metrics collector registration attempted: `{name}`")]
    RegistrationConflict {
        /// Fully-qualified name of the metric.
        name: String,
    },

    /// The number of label values does not match the number of label names.
    #[error("inconsistent label cardinality for `{name}`: expected {expected} label values but got {actual}")]
    LabelMismatch {
        /// Fully-qualified name of the metric.
        name: String,
        /// Number of label names the metric was declared with.
        expected: usize,
        /// Number of label values that were supplied.
        actual: usize,
    },

    /// A label set referenced a label name the metric was not declared with.
    #[error("label `{label}` is not declared for `{name}`")]
    UnknownLabel {
        /// Fully-qualified name of the metric.
        name: String,
        /// Offending label name.
        label: String,
    },

    /// The metric family type is not one that can be replayed.
    #[error("unsupported metric type `{kind}` for `{name}`")]
    UnsupportedType {
        /// Name of the metric family.
        name: String,
        /// Declared type of the family.
        kind: String,
    },

    /// The metric name, label names, buckets or objectives are invalid.
    #[error("invalid descriptor for `{name}`: {reason}")]
    InvalidDescriptor {
        /// Fully-qualified name of the metric.
        name: String,
        /// What made the descriptor invalid.
        reason: String,
    },
}

impl Error {
    pub(crate) fn invalid<N, R>(name: N, reason: R) -> Error
    where
        N: Into<String>,
        R: Into<String>,
    {
        Error::InvalidDescriptor { name: name.into(), reason: reason.into() }
    }
}
