//! Field identities and the declared field list of a profile.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Semantic type a field declares for its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Numeric,
    DateTime,
}

impl FieldType {
    /// Human-readable label used in messages and constraint descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Numeric => "numeric",
            FieldType::DateTime => "datetime",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable identity of one declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Unique name within the profile.
    pub name: String,
    /// Declared semantic type for generated values.
    pub field_type: FieldType,
    /// Whether the absent value is legal for this field.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Optional output formatting pattern applied when rendering values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatting: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Field {
    /// Builds a nullable field with no formatting.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Field {
            name: name.into(),
            field_type,
            nullable: true,
            formatting: None,
        }
    }

    /// Marks the field as rejecting the absent value.
    pub fn not_nullable(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Declared fields of a profile in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fields(Vec<Field>);

impl Fields {
    /// Builds the field list, rejecting duplicate names.
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        for (index, field) in fields.iter().enumerate() {
            if fields[..index].iter().any(|seen| seen.name == field.name) {
                return Err(Error::InvalidProfile(format!(
                    "field `{}` is declared more than once",
                    field.name
                )));
            }
        }
        Ok(Fields(fields))
    }

    /// Looks a field up by name.
    pub fn by_name(&self, name: &str) -> Option<&Field> {
        self.0.iter().find(|field| field.name == name)
    }

    /// Iterates fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_field_names_are_rejected() {
        let fields = vec![
            Field::new("id", FieldType::Numeric),
            Field::new("id", FieldType::Text),
        ];
        let err = Fields::new(fields).expect_err("duplicate names must fail");
        assert!(err.to_string().contains("declared more than once"));
    }

    #[test]
    fn lookup_by_name_preserves_declared_type() {
        let fields = Fields::new(vec![
            Field::new("id", FieldType::Numeric),
            Field::new("created", FieldType::DateTime).not_nullable(),
        ])
        .expect("valid fields");
        let created = fields.by_name("created").expect("created exists");
        assert_eq!(created.field_type, FieldType::DateTime);
        assert!(!created.nullable);
        assert!(fields.by_name("missing").is_none());
    }
}
