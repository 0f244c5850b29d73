//! Row output writers.
//!
//! Both writers render values through each field's optional formatting
//! hint and count the bytes they emit.

pub mod csv;
pub mod json;

use std::io::Write;

use rowsmith_core::{DataValue, Field};

/// Renders one value for textual output. Datetime hints are chrono
/// patterns; numeric hints are a `%.Nf` precision subset. Anything else
/// renders unformatted.
pub(crate) fn render_value(field: &Field, value: &DataValue) -> String {
    match value {
        DataValue::Text(text) => text.clone(),
        DataValue::Number(number) => render_number(field.formatting.as_deref(), *number),
        DataValue::DateTime(datetime) => match field.formatting.as_deref() {
            Some(pattern) => datetime.format(pattern).to_string(),
            None => datetime.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        },
    }
}

fn render_number(formatting: Option<&str>, number: f64) -> String {
    if let Some(precision) = formatting.and_then(precision_of) {
        return format!("{number:.precision$}");
    }
    if number.fract() == 0.0 && number.abs() < 9.0e15 {
        format!("{}", number as i64)
    } else {
        format!("{number}")
    }
}

fn precision_of(pattern: &str) -> Option<usize> {
    let digits = pattern.strip_prefix("%.")?.strip_suffix('f')?;
    digits.parse().ok()
}

/// Write adapter that counts bytes as they pass through.
pub(crate) struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    pub(crate) fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
