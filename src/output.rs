//! Adapter for data output
use crate::message::{DecodedField, FieldValue};
use std::collections::HashMap;
use std::io::Write;

/// Receiver of decoded values. A later value replaces an earlier one of the same name.
pub trait TelemetrySink {
    fn publish(&mut self, field: &DecodedField);
}

/// Keeps the last published value of every field in memory.
#[derive(Debug, Default)]
pub struct LastValues {
    values: HashMap<&'static str, FieldValue>,
    published: usize,
}

impl LastValues {
    pub fn new() -> LastValues {
        LastValues::default()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.values.get(name)? {
            FieldValue::Number { value, .. } => Some(*value),
            FieldValue::Text(_) => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            FieldValue::Text(text) => Some(text),
            FieldValue::Number { .. } => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of `publish` calls so far, including overwrites.
    pub fn published(&self) -> usize {
        self.published
    }
}

impl TelemetrySink for LastValues {
    fn publish(&mut self, field: &DecodedField) {
        self.published += 1;
        self.values.insert(field.name, field.value.clone());
    }
}

/// Format of the lines written by [`Printer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `name: value unit`
    Stringify,
    /// InfluxDB line protocol
    Influxdb,
}

/// Writes every published field as one line.
pub struct Printer<W> {
    writer: W,
    format: OutputFormat,
    measurement: String,
    tags: Vec<(String, String)>,
}

impl<W: Write> Printer<W> {
    pub fn new(writer: W, format: OutputFormat, measurement: impl Into<String>) -> Printer<W> {
        Printer {
            writer,
            format,
            measurement: measurement.into(),
            tags: vec![],
        }
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl ToString) -> Printer<W> {
        self.tags.push((name.into(), value.to_string()));
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn line(&self, field: &DecodedField) -> String {
        match self.format {
            OutputFormat::Stringify => field.to_string(),
            OutputFormat::Influxdb => {
                let mut line = influx::LineProtocol::new(self.measurement.as_str());
                for (name, value) in &self.tags {
                    line = line.add_tag(name.as_str(), value);
                }
                let line = match &field.value {
                    FieldValue::Number { value, .. } => line.add_value(field.name, *value),
                    FieldValue::Text(text) => line.add_value(field.name, text.as_str()),
                };
                line.add_time(Some(chrono::Utc::now())).to_string()
            }
        }
    }
}

impl<W: Write> TelemetrySink for Printer<W> {
    fn publish(&mut self, field: &DecodedField) {
        let line = self.line(field);
        if let Err(e) = writeln!(self.writer, "{}", line) {
            tracing::warn!(field = field.name, "failed to write output: {}", e);
        }
    }
}

pub mod influx {
    use chrono::{DateTime, Utc};
    use std::fmt;

    pub enum LineProtocolValue {
        Float(f64),
        String(String),
        Tag(String),
    }

    impl fmt::Display for LineProtocolValue {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Float(x) => write!(f, "{}", x),
                Self::String(x) => write!(f, "\"{}\"", x.replace('\\', "\\\\").replace('"', "\\\"")),
                Self::Tag(x) => write!(f, "{}", x.replace(' ', "\\ ").replace(',', "\\,")),
            }
        }
    }

    impl From<f64> for LineProtocolValue {
        fn from(x: f64) -> Self {
            LineProtocolValue::Float(x)
        }
    }

    impl From<&str> for LineProtocolValue {
        fn from(x: &str) -> Self {
            LineProtocolValue::String(x.into())
        }
    }

    struct Item(String, LineProtocolValue);

    impl fmt::Display for Item {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}={}", self.0, self.1)
        }
    }

    pub struct LineProtocol {
        measurement: String,
        tags: Vec<Item>,
        values: Vec<Item>,
        time: Option<DateTime<Utc>>,
    }

    impl LineProtocol {
        pub fn new(measurement: impl Into<String>) -> LineProtocol {
            LineProtocol {
                measurement: measurement.into(),
                tags: vec![],
                values: vec![],
                time: None,
            }
        }

        pub fn add_tag(mut self, name: impl Into<String>, tag: impl fmt::Display) -> LineProtocol {
            self.tags.push(Item(
                name.into(),
                LineProtocolValue::Tag(format!("{}", tag)),
            ));
            self
        }

        pub fn add_value<V>(mut self, name: impl Into<String>, value: V) -> LineProtocol
        where
            V: Into<LineProtocolValue>,
        {
            self.values.push(Item(name.into(), value.into()));
            self
        }

        pub fn add_time(mut self, time: Option<DateTime<Utc>>) -> LineProtocol {
            self.time = time;
            self
        }
    }

    impl fmt::Display for LineProtocol {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let mut tag_string = "".to_string();
            tag_string.extend(self.tags.iter().map(|item| format!(",{}", item)));

            let value_string = self
                .values
                .iter()
                .map(|item| format!("{}", item))
                .collect::<Vec<_>>()
                .join(",");
            write!(f, "{}{} {}", self.measurement, tag_string, value_string)?;
            if let Some(nanos) = self.time.and_then(|t| t.timestamp_nanos_opt()) {
                write!(f, " {}", nanos)?;
            }
            Ok(())
        }
    }

}
