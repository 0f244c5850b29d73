use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rowsmith_core::Fields;

use super::{CountingWriter, render_value};
use crate::assemble::Row;

/// Writes rows as CSV with a header in field declaration order; null
/// renders as an empty cell. Returns the number of bytes written.
pub fn write_rows_csv(path: &Path, fields: &Fields, rows: &[Row]) -> Result<u64, csv::Error> {
    let writer = BufWriter::new(File::create(path).map_err(csv::Error::from)?);
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    let header: Vec<String> = fields.iter().map(|field| field.name.clone()).collect();
    writer.write_record(&header)?;

    for row in rows {
        let record: Vec<String> = fields
            .iter()
            .map(|field| {
                row.get(&field.name)
                    .and_then(|value| value.as_ref())
                    .map(|value| render_value(field, value))
                    .unwrap_or_default()
            })
            .collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(counting.bytes_written())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rowsmith_core::{DataValue, Field, FieldType};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn header_and_cells_follow_field_declaration_order() {
        let mut price = Field::new("price", FieldType::Numeric);
        price.formatting = Some("%.2f".to_string());
        let fields = Fields::new(vec![
            Field::new("name", FieldType::Text),
            price,
            Field::new("seen", FieldType::DateTime),
        ])
        .expect("valid fields");

        let midnight = NaiveDate::from_ymd_opt(2024, 6, 10)
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid time");
        let mut row = Row::new();
        row.insert("name".to_string(), Some(DataValue::Text("ada".to_string())));
        row.insert("price".to_string(), Some(DataValue::Number(12.5)));
        row.insert("seen".to_string(), Some(DataValue::DateTime(midnight)));
        let mut with_null = Row::new();
        with_null.insert("name".to_string(), Some(DataValue::Text("bob".to_string())));
        with_null.insert("price".to_string(), None);
        with_null.insert("seen".to_string(), None);

        let path = std::env::temp_dir().join(format!("rowsmith-csv-{}.csv", Uuid::new_v4()));
        let bytes = write_rows_csv(&path, &fields, &[row, with_null]).expect("write csv");
        let contents = std::fs::read_to_string(&path).expect("read back");
        std::fs::remove_file(&path).ok();

        assert_eq!(bytes, contents.len() as u64);
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "name,price,seen");
        assert_eq!(lines[1], "ada,12.50,2024-06-10T00:00:00");
        assert_eq!(lines[2], "bob,,");
    }
}
