//! Exposition-format model and text writer.
//!
//! Converts raw (name, value) pairs from the scratch registry into metric
//! families and serializes them in the standard line-based text format:
//!
//! ```text
//! # HELP name help text
//! # TYPE name gauge
//! name{label="value"} 1.5
//! ```
//!
//! Raw names arrive in two shapes: plain dot-hierarchy names and names
//! carrying a `{key="value",...}` label suffix. The label suffix is split
//! off into a proper label set before the base name is sanitized.

use std::io::{self, Write};

use crate::registry::MetricValue;

/// Exposition metric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Summary,
}

impl MetricKind {
    fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Summary => "summary",
        }
    }
}

/// One exposition sample: a full sample name, a label set and a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

impl Sample {
    pub fn new(name: impl Into<String>, labels: Vec<(String, String)>, value: f64) -> Self {
        Self {
            name: name.into(),
            labels,
            value,
        }
    }
}

/// One metric family: shared name, type and help, plus its samples.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub kind: MetricKind,
    pub help: String,
    pub samples: Vec<Sample>,
}

/// Replaces every character outside `[a-zA-Z0-9_:]` with `_`, prefixing
/// an underscore if the name would start with a digit.
pub fn sanitize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, ch) in raw.chars().enumerate() {
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == ':' {
            if i == 0 && ch.is_ascii_digit() {
                out.push('_');
            }
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    out
}

/// Splits a raw registry name into its base name and label set.
///
/// A trailing `{k="v",k2="v2"}` fragment (quotes optional) becomes the
/// label set; anything that does not parse as labels stays part of the
/// base name and gets sanitized away.
pub fn split_labels(raw: &str) -> (&str, Vec<(String, String)>) {
    let Some(open) = raw.find('{') else {
        return (raw, Vec::new());
    };
    let Some(stripped) = raw[open..].strip_prefix('{').and_then(|s| s.strip_suffix('}'))
    else {
        return (raw, Vec::new());
    };

    let mut labels = Vec::new();
    for pair in stripped.split(',') {
        let Some((key, value)) = pair.split_once('=') else {
            return (raw, Vec::new());
        };
        let value = value.trim_matches('"');
        labels.push((key.trim().to_string(), value.to_string()));
    }
    (&raw[..open], labels)
}

/// Converts one registry entry into a metric family.
pub fn to_family(raw_name: &str, value: &MetricValue) -> MetricFamily {
    let (base, labels) = split_labels(raw_name);
    let name = sanitize_name(base);
    let help = format!("Harvested metric {}", raw_name);

    match value {
        MetricValue::Counter(v) => MetricFamily {
            samples: vec![Sample::new(name.clone(), labels, *v)],
            name,
            kind: MetricKind::Counter,
            help,
        },
        MetricValue::Gauge(v) => MetricFamily {
            samples: vec![Sample::new(name.clone(), labels, *v)],
            name,
            kind: MetricKind::Gauge,
            help,
        },
        MetricValue::Histogram {
            count,
            sum,
            p50,
            p95,
            p99,
        } => {
            let quantile = |q: &str, v: f64| {
                let mut labels = labels.clone();
                labels.push(("quantile".to_string(), q.to_string()));
                Sample::new(name.clone(), labels, v)
            };
            let samples = vec![
                quantile("0.5", *p50),
                quantile("0.95", *p95),
                quantile("0.99", *p99),
                Sample::new(format!("{}_count", name), labels.clone(), *count as f64),
                Sample::new(format!("{}_sum", name), labels.clone(), *sum),
            ];
            MetricFamily {
                samples,
                name,
                kind: MetricKind::Summary,
                help,
            }
        }
    }
}

fn escape_help(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Writes metric families in text exposition format.
pub fn write_text<W: Write>(writer: &mut W, families: &[MetricFamily]) -> io::Result<()> {
    for family in families {
        writeln!(writer, "# HELP {} {}", family.name, escape_help(&family.help))?;
        writeln!(writer, "# TYPE {} {}", family.name, family.kind.as_str())?;
        for sample in &family.samples {
            if sample.labels.is_empty() {
                writeln!(writer, "{} {}", sample.name, sample.value)?;
            } else {
                let labels: Vec<String> = sample
                    .labels
                    .iter()
                    .map(|(k, v)| format!("{}=\"{}\"", sanitize_name(k), escape_label_value(v)))
                    .collect();
                writeln!(writer, "{}{{{}}} {}", sample.name, labels.join(","), sample.value)?;
            }
        }
    }
    Ok(())
}
