//! Helpers for rendering metrics in the Prometheus exposition format.

use std::fmt::Display;

use crate::registry::{FamilySnapshot, SeriesValue};

/// Renders gathered families in the Prometheus [exposition format].
///
/// Families are written in the order given.  Families without any series are skipped entirely,
/// matching what a scraper would see from a vector that has never been touched.
///
/// [exposition format]: https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md#text-format-details
pub fn render(families: &[FamilySnapshot]) -> String {
    let mut output = String::new();

    for family in families {
        if family.series.is_empty() {
            continue;
        }

        let name = family.desc.fq_name();
        write_help_line(&mut output, name, family.desc.help());
        write_type_line(&mut output, name, family.desc.kind().as_str());

        for series in &family.series {
            let labels = series.labels.as_slice();
            match &series.value {
                SeriesValue::Counter(value) => {
                    write_metric_line::<&str, u64>(&mut output, name, None, labels, None, *value);
                }
                SeriesValue::Gauge(value) => {
                    write_metric_line::<&str, _>(
                        &mut output,
                        name,
                        None,
                        labels,
                        None,
                        FloatValue(*value),
                    );
                }
                SeriesValue::Histogram(histogram) => {
                    for (le, count) in &histogram.buckets {
                        write_metric_line(
                            &mut output,
                            name,
                            Some("bucket"),
                            labels,
                            Some(("le", FloatValue(*le))),
                            *count,
                        );
                    }
                    write_metric_line(
                        &mut output,
                        name,
                        Some("bucket"),
                        labels,
                        Some(("le", "+Inf")),
                        histogram.count,
                    );
                    write_metric_line::<&str, _>(
                        &mut output,
                        name,
                        Some("sum"),
                        labels,
                        None,
                        FloatValue(histogram.sum),
                    );
                    write_metric_line::<&str, u64>(
                        &mut output,
                        name,
                        Some("count"),
                        labels,
                        None,
                        histogram.count,
                    );
                }
                SeriesValue::Summary(summary) => {
                    for (quantile, value) in &summary.quantiles {
                        write_metric_line(
                            &mut output,
                            name,
                            None,
                            labels,
                            Some(("quantile", FloatValue(*quantile))),
                            FloatValue(*value),
                        );
                    }
                    write_metric_line::<&str, _>(
                        &mut output,
                        name,
                        Some("sum"),
                        labels,
                        None,
                        FloatValue(summary.sum),
                    );
                    write_metric_line::<&str, u64>(
                        &mut output,
                        name,
                        Some("count"),
                        labels,
                        None,
                        summary.count,
                    );
                }
            }
        }
    }

    output
}

/// Writes a help (description) line in the Prometheus [exposition format].
///
/// [exposition format]: https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md#text-format-details
pub fn write_help_line(buffer: &mut String, name: &str, desc: &str) {
    buffer.push_str("# HELP ");
    buffer.push_str(name);
    buffer.push(' ');
    buffer.push_str(&escape_description(desc));
    buffer.push('\n');
}

/// Writes a metric type line in the Prometheus [exposition format].
///
/// [exposition format]: https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md#text-format-details
pub fn write_type_line(buffer: &mut String, name: &str, metric_type: &str) {
    buffer.push_str("# TYPE ");
    buffer.push_str(name);
    buffer.push(' ');
    buffer.push_str(metric_type);
    buffer.push('\n');
}

/// Writes a metric in the Prometheus [exposition format].
///
/// When `suffix` is specified, it is appended to the `name`, which is how the `_bucket`, `_sum`,
/// and `_count` series of histograms and summaries are written.  Likewise, `additional_label` is
/// used for the type-specific label, such as `le` for histogram buckets or `quantile` for summary
/// quantiles, and always comes after the series' own labels.
///
/// [exposition format]: https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md#text-format-details
pub fn write_metric_line<T, T2>(
    buffer: &mut String,
    name: &str,
    suffix: Option<&'static str>,
    labels: &[(String, String)],
    additional_label: Option<(&'static str, T)>,
    value: T2,
) where
    T: Display,
    T2: Display,
{
    buffer.push_str(name);
    if let Some(suffix) = suffix {
        buffer.push('_');
        buffer.push_str(suffix);
    }

    if !labels.is_empty() || additional_label.is_some() {
        buffer.push('{');

        let mut first = true;
        for (key, value) in labels {
            if first {
                first = false;
            } else {
                buffer.push(',');
            }
            buffer.push_str(key);
            buffer.push_str("=\"");
            buffer.push_str(&escape_label_value(value));
            buffer.push('"');
        }

        if let Some((name, value)) = additional_label {
            if !first {
                buffer.push(',');
            }
            buffer.push_str(name);
            buffer.push_str("=\"");
            buffer.push_str(value.to_string().as_str());
            buffer.push('"');
        }

        buffer.push('}');
    }

    buffer.push(' ');
    buffer.push_str(value.to_string().as_str());
    buffer.push('\n');
}

/// Float wrapper that displays non-finite values the way the exposition format spells them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatValue(pub f64);

impl Display for FloatValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self.0;
        if value.is_nan() {
            f.write_str("NaN")
        } else if value.is_infinite() {
            f.write_str(if value > 0.0 { "+Inf" } else { "-Inf" })
        } else {
            write!(f, "{}", value)
        }
    }
}

/// Escapes a label value: backslashes, double quotes, and line feeds.
pub fn escape_label_value(value: &str) -> String {
    escape(value, true)
}

/// Escapes a help string: backslashes and line feeds.  Double quotes are left alone.
pub fn escape_description(value: &str) -> String {
    escape(value, false)
}

fn escape(value: &str, quotes: bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '"' if quotes => escaped.push_str("\\\""),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Checks a metric name against the Prometheus [data model].
///
/// [data model]: https://prometheus.io/docs/concepts/data_model/#metric-names-and-labels
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if valid_metric_name_start_character(c) => chars.all(valid_metric_name_character),
        _ => false,
    }
}

/// Checks a label name against the Prometheus [data model].
///
/// Names starting with `__` are reserved for internal use and rejected.
///
/// [data model]: https://prometheus.io/docs/concepts/data_model/#metric-names-and-labels
pub fn is_valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if valid_label_key_start_character(c) => chars.all(valid_label_key_character),
        _ => false,
    }
}

#[inline]
pub(crate) fn valid_metric_name_start_character(c: char) -> bool {
    // Essentially, needs to match the regex pattern of [a-zA-Z_:].
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

#[inline]
pub(crate) fn valid_metric_name_character(c: char) -> bool {
    // Essentially, needs to match the regex pattern of [a-zA-Z0-9_:].
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

#[inline]
pub(crate) fn valid_label_key_start_character(c: char) -> bool {
    // Essentially, needs to match the regex pattern of [a-zA-Z_].
    c.is_ascii_alphabetic() || c == '_'
}

#[inline]
pub(crate) fn valid_label_key_character(c: char) -> bool {
    // Essentially, needs to match the regex pattern of [a-zA-Z0-9_].
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::{
        escape_description, escape_label_value, is_valid_label_name, is_valid_metric_name,
        write_metric_line, FloatValue,
    };
    use proptest::prelude::*;

    #[test]
    fn test_metric_name_known_cases() {
        let cases = &[
            ("foo_bar", true),
            ("foo1:bar2", true),
            (":foo", true),
            ("_", true),
            ("", false),
            ("1foobar", false),
            ("foo-bar", false),
            ("foo bar", false),
        ];

        for (input, expected) in cases {
            assert_eq!(is_valid_metric_name(input), *expected, "{}", input);
        }
    }

    #[test]
    fn test_label_name_known_cases() {
        let cases = &[
            ("foo_bar", true),
            ("_foo", true),
            ("key0", true),
            ("__name__", false),
            ("foo:bar", false),
            ("1foo", false),
            ("", false),
        ];

        for (input, expected) in cases {
            assert_eq!(is_valid_label_name(input), *expected, "{}", input);
        }
    }

    #[test]
    fn test_escape_known_cases() {
        let cases = &[
            ("*", "*", "*"),
            ("\"", "\\\"", "\""),
            ("\\", "\\\\", "\\\\"),
            ("\n", "\\n", "\\n"),
            ("C:\\DIR", "C:\\\\DIR", "C:\\\\DIR"),
        ];

        for (input, label, desc) in cases {
            assert_eq!(&escape_label_value(input), label);
            assert_eq!(&escape_description(input), desc);
        }
    }

    #[test]
    fn test_float_value_display() {
        assert_eq!(FloatValue(21.5).to_string(), "21.5");
        assert_eq!(FloatValue(19.0).to_string(), "19");
        assert_eq!(FloatValue(f64::INFINITY).to_string(), "+Inf");
        assert_eq!(FloatValue(f64::NEG_INFINITY).to_string(), "-Inf");
        assert_eq!(FloatValue(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn test_write_metric_line() {
        let mut buffer = String::new();
        let labels = vec![("room".to_string(), "a\"b".to_string())];
        write_metric_line(&mut buffer, "temp", Some("bucket"), &labels, Some(("le", 0.5)), 3u64);
        assert_eq!(buffer, "temp_bucket{room=\"a\\\"b\",le=\"0.5\"} 3\n");

        let mut buffer = String::new();
        write_metric_line::<&str, f64>(&mut buffer, "temp", None, &[], None, 1.5);
        assert_eq!(buffer, "temp 1.5\n");
    }

    proptest! {
        #[test]
        fn test_escape_label_value(input in "[\n\"\\\\]?.*[\n\"\\\\]?") {
            let result = escape_label_value(&input);

            // If any raw newlines are still present, then we messed up.
            assert!(!result.contains('\n'), "raw/unescaped newlines present");

            // Every backslash must start one of the three escape sequences.
            let mut chars = result.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    let next = chars.next();
                    assert!(matches!(next, Some('\\') | Some('"') | Some('n')),
                        "dangling escape in {:?}", result);
                } else {
                    assert_ne!(c, '"', "unescaped double quote in {:?}", result);
                }
            }
        }
    }
}
