//! A parser for the Prometheus text exposition format.
//!
//! Unlike a scraper, which can afford to drop lines it does not understand, a snapshot that is
//! about to be replayed should be rejected as a whole if any line is malformed, so every error
//! here carries the line it was found on.
use indexmap::IndexMap;
use thiserror::Error as ThisError;

use crate::formatting::{
    valid_label_key_character, valid_label_key_start_character, valid_metric_name_character,
    valid_metric_name_start_character,
};
use crate::kind::MetricKind;

/// A parsed metric family.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricFamily {
    /// Family name, without any `_bucket`, `_sum` or `_count` suffix.
    pub name: String,
    /// Unescaped help text, if a `# HELP` line was present.
    pub help: Option<String>,
    /// Declared type, or `None` if untyped.
    pub kind: Option<MetricKind>,
    /// Series in the order they first appeared.
    pub series: Vec<ParsedSeries>,
}

/// A parsed series.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedSeries {
    /// Labels in the order they were written, without `le` or `quantile`.
    pub labels: Vec<(String, String)>,
    /// Value of the series.
    pub data: SeriesData,
    /// Timestamp in milliseconds, if one was written.
    pub timestamp_ms: Option<i64>,
}

/// Value of a parsed series.
#[derive(Clone, Debug, PartialEq)]
pub enum SeriesData {
    /// A single sample, as for counters, gauges and untyped metrics.
    Value(f64),
    /// Histogram samples grouped by label set.
    Histogram {
        /// `(le, cumulative count)` pairs in the order they were written.
        buckets: Vec<(f64, f64)>,
        /// Value of the `_sum` sample, zero if absent.
        sum: f64,
        /// Value of the `_count` sample, zero if absent.
        count: f64,
    },
    /// Summary samples grouped by label set.
    Summary {
        /// `(quantile, value)` pairs in the order they were written.
        quantiles: Vec<(f64, f64)>,
        /// Value of the `_sum` sample, zero if absent.
        sum: f64,
        /// Value of the `_count` sample, zero if absent.
        count: f64,
    },
}

/// Error returned when the input is not valid text exposition format.
#[derive(Debug, ThisError, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// One-based line number.
    pub line: usize,
    /// What was wrong with the line.
    pub kind: ParseErrorKind,
}

/// The ways a line can be malformed.
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The input is not valid UTF-8.
    #[error("invalid UTF-8")]
    InvalidUtf8,
    /// A metric name was empty or contained an invalid character.
    #[error("invalid metric name `{0}`")]
    InvalidMetricName(String),
    /// A label name was empty or contained an invalid character.
    #[error("invalid label name `{0}`")]
    InvalidLabelName(String),
    /// A label name appeared twice in one sample.
    #[error("duplicate label `{0}`")]
    DuplicateLabel(String),
    /// The line ended inside a label set.
    #[error("unterminated label set")]
    UnterminatedLabels,
    /// Something other than what the grammar allows at this point.
    #[error("unexpected {0}")]
    Unexpected(String),
    /// A label value contained an escape sequence other than `\\`, `\"` or `\n`.
    #[error("invalid escape sequence `\\{0}`")]
    InvalidEscape(char),
    /// A sample value was not a float.
    #[error("invalid sample value `{0}`")]
    InvalidValue(String),
    /// A timestamp was not an integer.
    #[error("invalid timestamp `{0}`")]
    InvalidTimestamp(String),
    /// A `# TYPE` line named an unknown type.
    #[error("unknown metric type `{0}`")]
    UnknownType(String),
    /// A second `# HELP` line for the same family.
    #[error("second HELP line for `{0}`")]
    DuplicateHelp(String),
    /// A second `# TYPE` line for the same family.
    #[error("second TYPE line for `{0}`")]
    DuplicateType(String),
    /// A `# TYPE` line after samples of the same family.
    #[error("TYPE line for `{0}` after its samples")]
    TypeAfterSamples(String),
    /// A histogram bucket without `le`, or a summary quantile without `quantile`.
    #[error("sample of `{name}` is missing the `{label}` label")]
    MissingLabel {
        /// Family name.
        name: String,
        /// Missing label.
        label: &'static str,
    },
}

/// Parses text exposition format from raw bytes.
///
/// Invalid UTF-8 is reported on the line it occurs in.
pub fn parse_bytes(input: &[u8]) -> Result<Vec<MetricFamily>, ParseError> {
    match std::str::from_utf8(input) {
        Ok(input) => parse(input),
        Err(e) => {
            let valid = &input[..e.valid_up_to()];
            let line = valid.iter().filter(|b| **b == b'\n').count() + 1;
            Err(ParseError { line, kind: ParseErrorKind::InvalidUtf8 })
        }
    }
}

/// Parses text exposition format.
///
/// Families are returned in the order they were first mentioned, by a `# HELP` line, a `# TYPE`
/// line or a sample.  Families that end up without any samples are dropped.
///
/// Samples named `<family>_bucket`, `<family>_sum` and `<family>_count` are folded into a
/// histogram family, and `<family>`, `<family>_sum` and `<family>_count` into a summary family,
/// provided the family was declared with a `# TYPE` line before them.  Otherwise they are parsed
/// as families of their own.
pub fn parse(input: &str) -> Result<Vec<MetricFamily>, ParseError> {
    let mut families: IndexMap<String, FamilyBuilder> = IndexMap::new();

    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let at = |kind| ParseError { line: line_no, kind };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            parse_comment(&mut families, comment).map_err(at)?;
        } else {
            let sample = parse_sample(line).map_err(at)?;
            add_sample(&mut families, sample).map_err(at)?;
        }
    }

    Ok(families.into_values().filter_map(FamilyBuilder::finish).collect())
}

struct FamilyBuilder {
    name: String,
    help: Option<String>,
    kind: Option<MetricKind>,
    values: Vec<ParsedSeries>,
    groups: IndexMap<Vec<(String, String)>, Group>,
}

#[derive(Default)]
struct Group {
    points: Vec<(f64, f64)>,
    sum: f64,
    count: f64,
    timestamp_ms: Option<i64>,
}

impl FamilyBuilder {
    fn new(name: &str) -> FamilyBuilder {
        FamilyBuilder {
            name: name.to_string(),
            help: None,
            kind: None,
            values: Vec::new(),
            groups: IndexMap::new(),
        }
    }

    fn has_samples(&self) -> bool {
        !self.values.is_empty() || !self.groups.is_empty()
    }

    fn finish(self) -> Option<MetricFamily> {
        let series = match self.kind {
            Some(MetricKind::Histogram) | Some(MetricKind::Summary) => {
                let histogram = self.kind == Some(MetricKind::Histogram);
                self.groups
                    .into_iter()
                    .map(|(labels, group)| {
                        let data = if histogram {
                            SeriesData::Histogram {
                                buckets: group.points,
                                sum: group.sum,
                                count: group.count,
                            }
                        } else {
                            SeriesData::Summary {
                                quantiles: group.points,
                                sum: group.sum,
                                count: group.count,
                            }
                        };
                        ParsedSeries { labels, data, timestamp_ms: group.timestamp_ms }
                    })
                    .collect::<Vec<_>>()
            }
            _ => self.values,
        };

        if series.is_empty() {
            return None;
        }

        Some(MetricFamily { name: self.name, help: self.help, kind: self.kind, series })
    }
}

fn parse_comment(
    families: &mut IndexMap<String, FamilyBuilder>,
    comment: &str,
) -> Result<(), ParseErrorKind> {
    let comment = comment.trim_start();
    let (keyword, rest) = split_token(comment);
    match keyword {
        "HELP" => {
            let (name, help) = split_token(rest);
            validate_metric_name(name)?;

            let family =
                families.entry(name.to_string()).or_insert_with(|| FamilyBuilder::new(name));
            if family.help.is_some() {
                return Err(ParseErrorKind::DuplicateHelp(name.to_string()));
            }
            family.help = Some(unescape_help(help));
        }
        "TYPE" => {
            let (name, rest) = split_token(rest);
            validate_metric_name(name)?;
            let (type_str, trailing) = split_token(rest);
            if !trailing.is_empty() {
                return Err(ParseErrorKind::Unexpected(format!("`{}` after type", trailing)));
            }

            let kind = match type_str {
                "untyped" => None,
                other => Some(
                    MetricKind::from_type_str(other)
                        .ok_or_else(|| ParseErrorKind::UnknownType(other.to_string()))?,
                ),
            };

            let family =
                families.entry(name.to_string()).or_insert_with(|| FamilyBuilder::new(name));
            if family.has_samples() {
                return Err(ParseErrorKind::TypeAfterSamples(name.to_string()));
            }
            if family.kind.is_some() {
                return Err(ParseErrorKind::DuplicateType(name.to_string()));
            }
            family.kind = kind;
        }
        // Any other comment is ignored.
        _ => {}
    }

    Ok(())
}

struct Sample {
    name: String,
    labels: Vec<(String, String)>,
    value: f64,
    timestamp_ms: Option<i64>,
}

fn parse_sample(line: &str) -> Result<Sample, ParseErrorKind> {
    let name_end = line.find(|c: char| c == '{' || c.is_whitespace()).unwrap_or(line.len());
    let name = &line[..name_end];
    validate_metric_name(name)?;

    let mut rest = line[name_end..].trim_start_matches([' ', '\t']);
    let labels = if let Some(inner) = rest.strip_prefix('{') {
        let (labels, after) = parse_labels(inner)?;
        rest = after;
        labels
    } else {
        Vec::new()
    };

    let (value_str, rest) = split_token(rest.trim_start());
    if value_str.is_empty() {
        return Err(ParseErrorKind::Unexpected("end of line, expected a value".to_string()));
    }
    let value =
        parse_float(value_str).ok_or_else(|| ParseErrorKind::InvalidValue(value_str.to_string()))?;

    let (timestamp_str, trailing) = split_token(rest);
    let timestamp_ms = if timestamp_str.is_empty() {
        None
    } else {
        Some(
            timestamp_str
                .parse::<i64>()
                .map_err(|_| ParseErrorKind::InvalidTimestamp(timestamp_str.to_string()))?,
        )
    };
    if !trailing.is_empty() {
        return Err(ParseErrorKind::Unexpected(format!("`{}` after sample", trailing)));
    }

    Ok(Sample { name: name.to_string(), labels, value, timestamp_ms })
}

/// Parses the inside of a label set, returning the labels and whatever follows the closing brace.
fn parse_labels(input: &str) -> Result<(Vec<(String, String)>, &str), ParseErrorKind> {
    let mut labels: Vec<(String, String)> = Vec::new();
    let mut rest = input.trim_start();

    loop {
        if let Some(after) = rest.strip_prefix('}') {
            return Ok((labels, after));
        }
        if rest.is_empty() {
            return Err(ParseErrorKind::UnterminatedLabels);
        }

        let name_end = rest
            .find(|c: char| c == '=' || c == '}' || c == ',' || c.is_whitespace())
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        if !is_label_name(name) {
            return Err(ParseErrorKind::InvalidLabelName(name.to_string()));
        }
        if labels.iter().any(|(existing, _)| existing == name) {
            return Err(ParseErrorKind::DuplicateLabel(name.to_string()));
        }

        rest = rest[name_end..].trim_start();
        rest = rest
            .strip_prefix('=')
            .ok_or_else(|| unexpected_in_labels(rest, "`=`"))?
            .trim_start();
        rest = rest.strip_prefix('"').ok_or_else(|| unexpected_in_labels(rest, "`\"`"))?;

        let (value, after) = parse_label_value(rest)?;
        labels.push((name.to_string(), value));

        rest = after.trim_start();
        if let Some(after) = rest.strip_prefix(',') {
            rest = after.trim_start();
        } else if !rest.starts_with('}') {
            return Err(unexpected_in_labels(rest, "`,` or `}`"));
        }
    }
}

fn unexpected_in_labels(rest: &str, expected: &str) -> ParseErrorKind {
    match rest.chars().next() {
        Some(c) => ParseErrorKind::Unexpected(format!("`{}`, expected {}", c, expected)),
        None => ParseErrorKind::UnterminatedLabels,
    }
}

/// Reads a label value up to its closing quote, which must already be past the opening one.
fn parse_label_value(input: &str) -> Result<(String, &str), ParseErrorKind> {
    let mut value = String::new();
    let mut chars = input.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((value, &input[i + 1..])),
            '\\' => match chars.next() {
                Some((_, '\\')) => value.push('\\'),
                Some((_, '"')) => value.push('"'),
                Some((_, 'n')) => value.push('\n'),
                Some((_, other)) => return Err(ParseErrorKind::InvalidEscape(other)),
                None => return Err(ParseErrorKind::UnterminatedLabels),
            },
            c => value.push(c),
        }
    }

    Err(ParseErrorKind::UnterminatedLabels)
}

fn add_sample(
    families: &mut IndexMap<String, FamilyBuilder>,
    sample: Sample,
) -> Result<(), ParseErrorKind> {
    let (family_name, suffix) = resolve_family(families, &sample.name);
    let family = families
        .entry(family_name.to_string())
        .or_insert_with(|| FamilyBuilder::new(family_name));

    let kind = family.kind;
    let Sample { mut labels, value, timestamp_ms, .. } = sample;

    match kind {
        Some(MetricKind::Histogram) | Some(MetricKind::Summary) => {
            let point_label =
                if kind == Some(MetricKind::Histogram) { "le" } else { "quantile" };
            let point = match suffix {
                Suffix::Sum | Suffix::Count => None,
                Suffix::Bucket | Suffix::None => {
                    let position = labels
                        .iter()
                        .position(|(key, _)| key == point_label)
                        .ok_or_else(|| ParseErrorKind::MissingLabel {
                            name: family.name.clone(),
                            label: point_label,
                        })?;
                    let (_, raw) = labels.remove(position);
                    let bound = parse_float(&raw).ok_or(ParseErrorKind::InvalidValue(raw))?;
                    Some(bound)
                }
            };

            let group = family.groups.entry(labels).or_default();
            match (suffix, point) {
                (Suffix::Sum, _) => group.sum = value,
                (Suffix::Count, _) => group.count = value,
                (_, Some(bound)) => group.points.push((bound, value)),
                (_, None) => {}
            }
            if timestamp_ms.is_some() {
                group.timestamp_ms = timestamp_ms;
            }
        }
        _ => {
            family.values.push(ParsedSeries {
                labels,
                data: SeriesData::Value(value),
                timestamp_ms,
            });
        }
    }

    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Suffix {
    None,
    Bucket,
    Sum,
    Count,
}

/// Works out which family a sample name belongs to.
fn resolve_family<'a>(
    families: &IndexMap<String, FamilyBuilder>,
    name: &'a str,
) -> (&'a str, Suffix) {
    const SUFFIXES: [(&str, Suffix); 3] =
        [("_bucket", Suffix::Bucket), ("_sum", Suffix::Sum), ("_count", Suffix::Count)];
    for (suffix_str, suffix) in SUFFIXES {
        if let Some(base) = name.strip_suffix(suffix_str) {
            let kind = families.get(base).and_then(|family| family.kind);
            let matches = match kind {
                Some(MetricKind::Histogram) => true,
                Some(MetricKind::Summary) => suffix != Suffix::Bucket,
                _ => false,
            };
            if matches {
                return (base, suffix);
            }
        }
    }

    (name, Suffix::None)
}

fn split_token(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(end) => (&input[..end], input[end..].trim_start()),
        None => (input, ""),
    }
}

fn validate_metric_name(name: &str) -> Result<(), ParseErrorKind> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) => valid_metric_name_start_character(c) && chars.all(valid_metric_name_character),
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ParseErrorKind::InvalidMetricName(name.to_string()))
    }
}

fn is_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) => valid_label_key_start_character(c) && chars.all(valid_label_key_character),
        None => false,
    }
}

fn parse_float(value: &str) -> Option<f64> {
    match value {
        "+Inf" | "Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        other => other.parse().ok(),
    }
}

fn unescape_help(help: &str) -> String {
    let mut unescaped = String::with_capacity(help.len());
    let mut chars = help.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }

        match chars.next() {
            Some('\\') => unescaped.push('\\'),
            Some('n') => unescaped.push('\n'),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

#[cfg(test)]
mod tests {
    use super::{parse, parse_bytes, MetricFamily, ParseError, ParseErrorKind, SeriesData};
    use crate::MetricKind;

    fn labels(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_parses_text_format() {
        let families = parse(
            r#"
# HELP http_requests_total The total number of HTTP requests.
# TYPE http_requests_total counter
http_requests_total{method="post",code="200"} 1027 1395066363000
http_requests_total{method="post",code="400"}    3 1395066363000

# Escaping in label values:
msdos_file_access_time_seconds{path="C:\\DIR\\FILE.TXT",error="Cannot find file:\n\"FILE.TXT\""} 1.458255915e9

# Minimalistic line:
metric_without_timestamp_and_labels 12.47
"#,
        )
        .expect("input should parse");

        assert_eq!(families.len(), 3);

        let requests = &families[0];
        assert_eq!(requests.name, "http_requests_total");
        assert_eq!(requests.help.as_deref(), Some("The total number of HTTP requests."));
        assert_eq!(requests.kind, Some(MetricKind::Counter));
        assert_eq!(requests.series.len(), 2);
        assert_eq!(requests.series[1].labels, labels(&[("method", "post"), ("code", "400")]));
        assert_eq!(requests.series[1].data, SeriesData::Value(3.0));
        assert_eq!(requests.series[1].timestamp_ms, Some(1395066363000));

        let msdos = &families[1];
        assert_eq!(msdos.kind, None);
        assert_eq!(
            msdos.series[0].labels,
            labels(&[("path", "C:\\DIR\\FILE.TXT"), ("error", "Cannot find file:\n\"FILE.TXT\"")])
        );

        let minimal = &families[2];
        assert!(minimal.series[0].labels.is_empty());
        assert_eq!(minimal.series[0].data, SeriesData::Value(12.47));
        assert_eq!(minimal.series[0].timestamp_ms, None);
    }

    #[test]
    fn test_groups_histograms_and_summaries() {
        let families = parse(
            r#"
# TYPE latency_seconds histogram
latency_seconds_bucket{index="0",le="0.1"} 1
latency_seconds_bucket{index="0",le="+Inf"} 3
latency_seconds_sum{index="0"} 4.5
latency_seconds_count{index="0"} 3
latency_seconds_bucket{index="1",le="+Inf"} 0
# TYPE rpc_seconds summary
rpc_seconds{quantile="0.5"} 2
rpc_seconds_sum 6
rpc_seconds_count 3
"#,
        )
        .expect("input should parse");

        assert_eq!(families.len(), 2);
        let histogram = &families[0];
        assert_eq!(histogram.series.len(), 2);
        assert_eq!(histogram.series[0].labels, labels(&[("index", "0")]));
        assert_eq!(
            histogram.series[0].data,
            SeriesData::Histogram {
                buckets: vec![(0.1, 1.0), (f64::INFINITY, 3.0)],
                sum: 4.5,
                count: 3.0
            }
        );

        let summary = &families[1];
        assert_eq!(summary.series.len(), 1);
        assert_eq!(
            summary.series[0].data,
            SeriesData::Summary { quantiles: vec![(0.5, 2.0)], sum: 6.0, count: 3.0 }
        );
    }

    #[test]
    fn test_blanks_between_name_and_labels() {
        let families = parse("# TYPE temp gauge\ntemp {room=\"a\"} 21.5\ntemp\t{room=\"b\"} 19\n")
            .expect("input should parse");
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].series[0].labels, labels(&[("room", "a")]));
        assert_eq!(families[0].series[0].data, SeriesData::Value(21.5));
        assert_eq!(families[0].series[1].labels, labels(&[("room", "b")]));
        assert_eq!(families[0].series[1].data, SeriesData::Value(19.0));
    }

    #[test]
    fn test_untyped_suffixes_are_own_families() {
        let families = parse("foo_sum 1\nfoo_count 2\n").expect("input should parse");
        let names = families.iter().map(|f| f.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["foo_sum", "foo_count"]);
    }

    #[test]
    fn test_drops_families_without_samples() {
        let families = parse(
            "# HELP idle Idle.\n# TYPE idle gauge\n# TYPE temp gauge\ntemp{room=\"a\"} 21\n",
        )
        .expect("input should parse");
        assert_eq!(
            families,
            vec![MetricFamily {
                name: "temp".to_string(),
                help: None,
                kind: Some(MetricKind::Gauge),
                series: vec![super::ParsedSeries {
                    labels: labels(&[("room", "a")]),
                    data: SeriesData::Value(21.0),
                    timestamp_ms: None,
                }],
            }]
        );
    }

    #[test]
    fn test_help_unescaping() {
        let families =
            parse("# HELP temp A \\\\ backslash\\nand a newline\ntemp 1\n").expect("parses");
        assert_eq!(families[0].help.as_deref(), Some("A \\ backslash\nand a newline"));
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let cases: Vec<(&str, ParseError)> = vec![
            (
                "ok 1\n1bad 2\n",
                ParseError { line: 2, kind: ParseErrorKind::InvalidMetricName("1bad".into()) },
            ),
            ("temp{room=\"a\"\n", ParseError { line: 1, kind: ParseErrorKind::UnterminatedLabels }),
            (
                "temp{room=\"a\",room=\"b\"} 1\n",
                ParseError { line: 1, kind: ParseErrorKind::DuplicateLabel("room".into()) },
            ),
            (
                "temp{1room=\"a\"} 1\n",
                ParseError { line: 1, kind: ParseErrorKind::InvalidLabelName("1room".into()) },
            ),
            (
                "temp{room=\"\\t\"} 1\n",
                ParseError { line: 1, kind: ParseErrorKind::InvalidEscape('t') },
            ),
            (
                "\n\ntemp abc\n",
                ParseError { line: 3, kind: ParseErrorKind::InvalidValue("abc".into()) },
            ),
            (
                "temp 1 soon\n",
                ParseError { line: 1, kind: ParseErrorKind::InvalidTimestamp("soon".into()) },
            ),
            (
                "# TYPE temp meter\n",
                ParseError { line: 1, kind: ParseErrorKind::UnknownType("meter".into()) },
            ),
            (
                "# HELP temp a\n# HELP temp b\n",
                ParseError { line: 2, kind: ParseErrorKind::DuplicateHelp("temp".into()) },
            ),
            (
                "# TYPE temp gauge\n# TYPE temp gauge\n",
                ParseError { line: 2, kind: ParseErrorKind::DuplicateType("temp".into()) },
            ),
            (
                "temp 1\n# TYPE temp gauge\n",
                ParseError { line: 2, kind: ParseErrorKind::TypeAfterSamples("temp".into()) },
            ),
            (
                "# TYPE lat histogram\nlat_bucket 1\n",
                ParseError {
                    line: 2,
                    kind: ParseErrorKind::MissingLabel { name: "lat".into(), label: "le" },
                },
            ),
        ];

        for (input, expected) in cases {
            assert_eq!(parse(input), Err(expected), "{:?}", input);
        }

        assert!(matches!(
            parse("temp"),
            Err(ParseError { line: 1, kind: ParseErrorKind::Unexpected(_) })
        ));
        assert!(matches!(
            parse("temp 1 2 3"),
            Err(ParseError { line: 1, kind: ParseErrorKind::Unexpected(_) })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let input = b"temp 1\ntemp{room=\"\xff\"} 2\n";
        assert_eq!(
            parse_bytes(input),
            Err(ParseError { line: 2, kind: ParseErrorKind::InvalidUtf8 })
        );
        assert_eq!(parse_bytes(b"temp 1\n").map(|f| f.len()), Ok(1));
    }
}
