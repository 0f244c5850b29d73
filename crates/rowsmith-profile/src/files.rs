use std::fs::File;
use std::path::Path;

use crate::errors::{ProfileError, Result};

/// One row of a value-list file: the value and its sampling weight.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub value: String,
    pub weight: f64,
}

/// Loads a value list from a CSV file.
///
/// The first column holds the value, an optional second column holds a
/// positive weight (default 1). Rows may mix the two shapes.
pub fn load_value_list(path: &Path) -> Result<Vec<FileEntry>> {
    let file = File::open(path).map_err(|err| {
        ProfileError::ValueList(format!("cannot open `{}`: {err}", path.display()))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut entries = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|err| {
            ProfileError::ValueList(format!("cannot read `{}`: {err}", path.display()))
        })?;
        let Some(value) = record.get(0) else {
            continue;
        };

        let weight = match record.get(1).map(str::trim).filter(|raw| !raw.is_empty()) {
            None => 1.0,
            Some(raw) => raw.parse::<f64>().ok().filter(|w| w.is_finite() && *w > 0.0).ok_or_else(|| {
                ProfileError::ValueList(format!(
                    "`{}` line {}: weight must be a positive number, got '{raw}'",
                    path.display(),
                    idx + 1
                ))
            })?,
        };

        entries.push(FileEntry {
            value: value.to_string(),
            weight,
        });
    }

    if entries.is_empty() {
        return Err(ProfileError::ValueList(format!(
            "`{}` contains no values",
            path.display()
        )));
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{name}", uuid::Uuid::new_v4()));
        let mut file = File::create(&path).expect("create temp list");
        file.write_all(contents.as_bytes()).expect("write temp list");
        path
    }

    #[test]
    fn loads_values_with_and_without_weights() {
        let path = write_temp("mixed.csv", "electronics,3\nbooks\ngarden,0.5\n");
        let entries = load_value_list(&path).expect("load list");
        std::fs::remove_file(&path).ok();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].value, "electronics");
        assert_eq!(entries[0].weight, 3.0);
        assert_eq!(entries[1].weight, 1.0);
        assert_eq!(entries[2].weight, 0.5);
    }

    #[test]
    fn rejects_missing_file_and_bad_weights() {
        let missing = std::env::temp_dir().join(format!("{}-absent.csv", uuid::Uuid::new_v4()));
        let err = load_value_list(&missing).expect_err("missing file");
        assert!(matches!(err, ProfileError::ValueList(_)));

        let path = write_temp("bad.csv", "a,1\nb,-2\n");
        let err = load_value_list(&path).expect_err("negative weight");
        std::fs::remove_file(&path).ok();
        assert!(err.to_string().contains("line 2"));
    }
}
