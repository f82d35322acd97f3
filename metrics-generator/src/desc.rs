use std::collections::HashSet;

use crate::error::Error;
use crate::formatting::{is_valid_label_name, is_valid_metric_name};
use crate::kind::MetricKind;

/// Options shared by every instrument: naming, help text, and constant labels.
///
/// The fully-qualified name is built by joining the non-empty parts of namespace, subsystem, and
/// name with underscores.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Opts {
    namespace: String,
    subsystem: String,
    name: String,
    help: String,
    const_labels: Vec<(String, String)>,
}

impl Opts {
    /// Creates a new [`Opts`] with the given name and help text.
    pub fn new<N, H>(name: N, help: H) -> Opts
    where
        N: Into<String>,
        H: Into<String>,
    {
        Opts { name: name.into(), help: help.into(), ..Default::default() }
    }

    /// Sets the namespace.
    pub fn namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the subsystem.
    pub fn subsystem<S: Into<String>>(mut self, subsystem: S) -> Self {
        self.subsystem = subsystem.into();
        self
    }

    /// Adds a constant label, rendered on every series of the instrument.
    pub fn const_label<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.const_labels.push((key.into(), value.into()));
        self
    }

    /// Gets the fully-qualified name.
    pub fn fq_name(&self) -> String {
        build_fq_name(&self.namespace, &self.subsystem, &self.name)
    }
}

/// Joins the non-empty name parts with underscores.
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Validated description of a metric family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Desc {
    fq_name: String,
    help: String,
    kind: MetricKind,
    const_labels: Vec<(String, String)>,
    variable_labels: Vec<String>,
}

impl Desc {
    /// Creates a new [`Desc`], validating names against the Prometheus data model.
    ///
    /// Label names must be unique across constant and variable labels.  Histograms may not use
    /// `le` and summaries may not use `quantile`, since the renderer adds those itself.
    pub fn new<S: AsRef<str>>(
        kind: MetricKind,
        opts: Opts,
        variable_labels: &[S],
    ) -> Result<Desc, Error> {
        let fq_name = opts.fq_name();
        if !is_valid_metric_name(&fq_name) {
            return Err(Error::invalid(fq_name, "not a valid metric name"));
        }

        let reserved = match kind {
            MetricKind::Histogram => Some("le"),
            MetricKind::Summary => Some("quantile"),
            _ => None,
        };

        let variable_labels =
            variable_labels.iter().map(|label| label.as_ref().to_string()).collect::<Vec<_>>();

        let mut seen = HashSet::new();
        let names = opts.const_labels.iter().map(|(key, _)| key).chain(variable_labels.iter());
        for label in names {
            if !is_valid_label_name(label) {
                let reason = format!("`{}` is not a valid label name", label);
                return Err(Error::invalid(fq_name, reason));
            }
            if reserved == Some(label.as_str()) {
                return Err(Error::invalid(
                    fq_name,
                    format!("`{}` is reserved for {}s", label, kind),
                ));
            }
            if !seen.insert(label.as_str()) {
                return Err(Error::invalid(fq_name, format!("duplicate label name `{}`", label)));
            }
        }

        Ok(Desc {
            fq_name,
            help: opts.help,
            kind,
            const_labels: opts.const_labels,
            variable_labels,
        })
    }

    /// Gets the fully-qualified name.
    pub fn fq_name(&self) -> &str {
        &self.fq_name
    }

    /// Gets the help text.
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Gets the metric kind.
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Gets the constant labels.
    pub fn const_labels(&self) -> &[(String, String)] {
        &self.const_labels
    }

    /// Gets the variable label names, in the order label values must be supplied.
    pub fn variable_labels(&self) -> &[String] {
        &self.variable_labels
    }
}
