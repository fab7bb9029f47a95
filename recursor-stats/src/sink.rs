//! Accumulators shipped with the collector

use std::{fmt::Write as _, io::Write};

use tracing::{error, warn};

use crate::{Accumulator, GatherError, MetricRecord};

/// Keeps everything it receives, in order
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<MetricRecord>,
    pub errors: Vec<GatherError>,
}

impl Accumulator for MemorySink {
    fn add_fields(&mut self, record: MetricRecord) {
        self.records.push(record);
    }

    fn add_error(&mut self, error: GatherError) {
        self.errors.push(error);
    }
}

/// Writes records in `InfluxDB` line protocol and logs errors
#[derive(Debug)]
pub struct LineProtocolSink<W> {
    writer: W,
}

impl<W: Write> LineProtocolSink<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Escape `value` for use as a line protocol measurement, key or tag value
fn escape(value: &str, measurement: bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == ',' || c == ' ' || (!measurement && c == '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render `record` as a single line protocol line, without the terminator
///
/// Returns `None` if the record has no fields, which line protocol cannot
/// express.
pub fn to_line_protocol(record: &MetricRecord) -> Option<String> {
    if record.fields.is_empty() {
        return None;
    }

    let mut line = escape(record.measurement, true);
    for (key, value) in &record.tags {
        let _ = write!(line, ",{}={}", escape(key, false), escape(value, false));
    }

    let mut fields: Vec<_> = record.fields.iter().collect();
    fields.sort_unstable_by(|a, b| a.0.cmp(b.0));
    for (i, (key, value)) in fields.into_iter().enumerate() {
        let separator = if i == 0 { ' ' } else { ',' };
        let _ = write!(line, "{separator}{}={value}i", escape(key, false));
    }

    if let Some(nanos) = record.timestamp.timestamp_nanos_opt() {
        let _ = write!(line, " {nanos}");
    }

    Some(line)
}

impl<W: Write> Accumulator for LineProtocolSink<W> {
    fn add_fields(&mut self, record: MetricRecord) {
        let Some(line) = to_line_protocol(&record) else {
            warn!(
                "No counters received from {}",
                record.server().unwrap_or_default()
            );
            return;
        };

        if let Err(e) = writeln!(self.writer, "{line}").and_then(|()| self.writer.flush()) {
            error!("Failed to write metrics: {e}");
        }
    }

    fn add_error(&mut self, error: GatherError) {
        error!("{error}");
    }
}

/// Writes one JSON object per record and logs errors
#[derive(Debug)]
pub struct JsonSink<W> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Accumulator for JsonSink<W> {
    fn add_fields(&mut self, record: MetricRecord) {
        let result = serde_json::to_writer(&mut self.writer, &record)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(self.writer))
            .and_then(|()| self.writer.flush());

        if let Err(e) = result {
            error!("Failed to write metrics: {e}");
        }
    }

    fn add_error(&mut self, error: GatherError) {
        error!("{error}");
    }
}
