//! Concrete generated values and their canonical ordering.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::fields::FieldType;

/// A concrete, present value for one field.
///
/// Absence is modelled as `Option<DataValue>` at the row level rather than
/// as a variant here, so every `DataValue` is a real value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl DataValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DataValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            DataValue::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            DataValue::DateTime(datetime) => Some(*datetime),
            _ => None,
        }
    }

    /// The field type this value belongs to.
    pub fn field_type(&self) -> FieldType {
        match self {
            DataValue::Text(_) => FieldType::Text,
            DataValue::Number(_) => FieldType::Numeric,
            DataValue::DateTime(_) => FieldType::DateTime,
        }
    }

    /// Total, deterministic ordering used to lay out whitelists.
    ///
    /// Values of different types order by type rank; numbers use a total
    /// float comparison so NaN cannot poison set layout.
    pub fn canonical_cmp(&self, other: &DataValue) -> Ordering {
        fn rank(value: &DataValue) -> u8 {
            match value {
                DataValue::Number(_) => 0,
                DataValue::Text(_) => 1,
                DataValue::DateTime(_) => 2,
            }
        }
        match (self, other) {
            (DataValue::Number(a), DataValue::Number(b)) => a.total_cmp(b),
            (DataValue::Text(a), DataValue::Text(b)) => a.cmp(b),
            (DataValue::DateTime(a), DataValue::DateTime(b)) => a.cmp(b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Text(text) => write!(f, "'{text}'"),
            DataValue::Number(number) => write!(f, "{number}"),
            DataValue::DateTime(datetime) => {
                write!(f, "{}", datetime.format("%Y-%m-%dT%H:%M:%S%.3f"))
            }
        }
    }
}

impl From<&str> for DataValue {
    fn from(text: &str) -> Self {
        DataValue::Text(text.to_owned())
    }
}

impl From<String> for DataValue {
    fn from(text: String) -> Self {
        DataValue::Text(text)
    }
}

impl From<f64> for DataValue {
    fn from(number: f64) -> Self {
        DataValue::Number(number)
    }
}

impl From<NaiveDateTime> for DataValue {
    fn from(datetime: NaiveDateTime) -> Self {
        DataValue::DateTime(datetime)
    }
}
