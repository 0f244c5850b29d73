use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rowsmith_core::{DataValue, Fields};
use serde_json::{Map, Number, Value};

use super::{CountingWriter, render_value};
use crate::assemble::Row;
use crate::errors::Result;

/// Writes rows as one JSON array of objects. Numbers stay native unless
/// the field carries a formatting hint; datetimes render as strings;
/// null stays null. Returns the number of bytes written.
pub fn write_rows_json(path: &Path, fields: &Fields, rows: &[Row]) -> Result<u64> {
    let writer = BufWriter::new(File::create(path)?);
    let mut counting = CountingWriter::new(writer);

    let documents: Vec<Value> = rows.iter().map(|row| row_to_json(fields, row)).collect();
    serde_json::to_writer_pretty(&mut counting, &documents)?;
    counting.write_all(b"\n")?;
    counting.flush()?;
    Ok(counting.bytes_written())
}

fn row_to_json(fields: &Fields, row: &Row) -> Value {
    let mut object = Map::new();
    for field in fields.iter() {
        let rendered = match row.get(&field.name).and_then(|value| value.as_ref()) {
            None => Value::Null,
            Some(DataValue::Number(number)) if field.formatting.is_none() => {
                Number::from_f64(*number)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
            Some(value) => Value::String(render_value(field, value)),
        };
        object.insert(field.name.clone(), rendered);
    }
    Value::Object(object)
}
