use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rowsmith_core::{
    AtomicKind, Constraint, DataValue, Field, FieldRelation, FieldType, Fields,
    NumericGranularity, OffsetUnit, RelationKind, TimeUnit, WeightedSet,
};
use serde_json::Value;

use crate::dto::{AtomicDto, ConstraintDto, FieldDto, ProfileDto};
use crate::errors::{ProfileError, Result, ValidationIssue};
use crate::files::load_value_list;
use crate::schema::profile_json_schema;
use crate::validate::{parse_datetime, validate_profile};

/// Fully lowered profile, ready for decision tree compilation.
#[derive(Debug, Clone)]
pub struct Profile {
    pub fields: Fields,
    pub constraints: Vec<Constraint>,
    pub warnings: Vec<ValidationIssue>,
}

/// Reads, validates and lowers a profile document from disk.
///
/// Value-list files referenced by `fromFile` are resolved relative to the
/// profile's directory and loaded eagerly, so a missing list fails here
/// rather than mid-generation.
pub fn read_profile(path: &Path) -> Result<Profile> {
    let raw = fs::read_to_string(path)?;
    let profile_json: Value = serde_json::from_str(&raw)?;
    parse_profile(&profile_json, path.parent())
}

/// Validates and lowers an in-memory profile document.
pub fn parse_profile(profile_json: &Value, base_dir: Option<&Path>) -> Result<Profile> {
    let schema = serde_json::to_value(profile_json_schema())?;
    let validated = validate_profile(profile_json, &schema)
        .map_err(|report| ProfileError::Invalid { report })?;
    let mut profile = lower_profile(&validated.profile, base_dir)?;
    profile.warnings = validated.warnings;
    Ok(profile)
}

/// Lowers a validated profile DTO into core fields and constraints.
pub fn lower_profile(dto: &ProfileDto, base_dir: Option<&Path>) -> Result<Profile> {
    let mut declared = Vec::new();
    let mut constraints = Vec::new();

    for field_dto in &dto.fields {
        let (field, implicit) = lower_field(field_dto)?;
        if let Some(implicit) = implicit {
            constraints.push(implicit);
        }
        declared.push(field);
    }

    let fields = Fields::new(declared)?;

    // declared nullability is itself a restriction on the field
    for field in fields.iter() {
        if !field.nullable {
            constraints.push(Constraint::atomic(field.clone(), AtomicKind::NotNull));
        }
    }

    let lowering = Lowering {
        fields: &fields,
        base_dir,
    };
    for constraint_dto in &dto.constraints {
        constraints.push(lowering.lower(constraint_dto)?);
    }

    Ok(Profile {
        fields,
        constraints,
        warnings: Vec::new(),
    })
}

fn lower_field(dto: &FieldDto) -> Result<(Field, Option<Constraint>)> {
    let (field_type, integral) = match dto.field_type.as_str() {
        "text" => (FieldType::Text, false),
        "numeric" => (FieldType::Numeric, false),
        "integer" => (FieldType::Numeric, true),
        "datetime" => (FieldType::DateTime, false),
        other => {
            return Err(invalid(format!(
                "field `{}`: unknown type '{other}'",
                dto.name
            )));
        }
    };

    let mut field = Field::new(dto.name.clone(), field_type);
    field.nullable = dto.nullable;
    field.formatting = dto.formatting.clone();

    // integer fields are numeric fields pinned to the whole-number grid
    let implicit = integral.then(|| {
        Constraint::atomic(
            field.clone(),
            AtomicKind::GranularToNumeric(NumericGranularity::WHOLE),
        )
    });

    Ok((field, implicit))
}

struct Lowering<'a> {
    fields: &'a Fields,
    base_dir: Option<&'a Path>,
}

impl Lowering<'_> {
    fn lower(&self, dto: &ConstraintDto) -> Result<Constraint> {
        match dto {
            ConstraintDto::Not { not } => Ok(Constraint::not(self.lower(not)?)),
            ConstraintDto::AllOf { all_of } => {
                let children = all_of
                    .iter()
                    .map(|child| self.lower(child))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Constraint::and(children))
            }
            ConstraintDto::AnyOf { any_of } => {
                let children = any_of
                    .iter()
                    .map(|child| self.lower(child))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Constraint::or(children))
            }
            ConstraintDto::If {
                when,
                then,
                otherwise,
            } => {
                let otherwise = otherwise
                    .as_deref()
                    .map(|child| self.lower(child))
                    .transpose()?;
                Ok(Constraint::if_then(
                    self.lower(when)?,
                    self.lower(then)?,
                    otherwise,
                ))
            }
            ConstraintDto::Atomic(atomic) => self.lower_atomic(atomic),
        }
    }

    fn lower_atomic(&self, dto: &AtomicDto) -> Result<Constraint> {
        let field = self.field(&dto.field)?.clone();

        if dto.other_field.is_some() {
            return self.lower_relation(dto, field);
        }

        let kind = match dto.is.as_str() {
            "null" => AtomicKind::IsNull,
            "equalTo" => AtomicKind::EqualTo(self.literal(&field, self.operand(dto)?)?),
            "inSet" => {
                let entries = dto.values.as_deref().unwrap_or_default();
                let mut pairs = Vec::with_capacity(entries.len());
                for entry in entries {
                    pairs.push((self.literal(&field, entry.value())?, entry.weight()));
                }
                AtomicKind::InSet(WeightedSet::weighted(pairs))
            }
            "fromFile" => {
                let raw = dto
                    .file
                    .as_deref()
                    .ok_or_else(|| invalid(format!("field `{}`: fromFile requires a file", field.name)))?;
                let entries = load_value_list(&self.resolve(raw))?;
                let mut pairs = Vec::with_capacity(entries.len());
                for entry in entries {
                    pairs.push((self.text_literal(&field, &entry.value)?, entry.weight));
                }
                AtomicKind::InSet(WeightedSet::weighted(pairs))
            }
            "greaterThan" => AtomicKind::GreaterThan(self.number(&field, dto)?),
            "greaterThanOrEqualTo" => AtomicKind::GreaterThanOrEqualTo(self.number(&field, dto)?),
            "lessThan" => AtomicKind::LessThan(self.number(&field, dto)?),
            "lessThanOrEqualTo" => AtomicKind::LessThanOrEqualTo(self.number(&field, dto)?),
            "after" => AtomicKind::After(self.datetime(&field, dto)?),
            "afterOrAt" => AtomicKind::AfterOrAt(self.datetime(&field, dto)?),
            "before" => AtomicKind::Before(self.datetime(&field, dto)?),
            "beforeOrAt" => AtomicKind::BeforeOrAt(self.datetime(&field, dto)?),
            "granularTo" => self.granularity(&field, dto)?,
            "longerThan" => AtomicKind::LongerThan(self.length(&field, dto)?),
            "shorterThan" => AtomicKind::ShorterThan(self.length(&field, dto)?),
            "ofLength" => AtomicKind::OfLength(self.length(&field, dto)?),
            "matchingRegex" => AtomicKind::MatchesRegex(self.pattern(&field, dto)?),
            "containingRegex" => AtomicKind::ContainsRegex(self.pattern(&field, dto)?),
            "ofType" => return self.lower_of_type(dto, field),
            other => {
                return Err(invalid(format!(
                    "field `{}`: unknown operator '{other}'",
                    field.name
                )));
            }
        };

        Ok(Constraint::atomic(field, kind))
    }

    fn lower_relation(&self, dto: &AtomicDto, main: Field) -> Result<Constraint> {
        let other_name = dto.other_field.as_deref().unwrap_or_default();
        let other = self.field(other_name)?.clone();

        if other.name == main.name {
            return Err(invalid(format!(
                "field `{}` cannot relate to itself",
                main.name
            )));
        }
        if other.field_type != main.field_type {
            return Err(invalid(format!(
                "fields `{}` and `{}` have different types and cannot be related",
                main.name, other.name
            )));
        }

        let (kind, inclusive) = match dto.is.as_str() {
            "equalTo" => return Ok(Constraint::Relation(FieldRelation::equal_to(main, other))),
            "before" | "lessThan" => (RelationKind::Before, false),
            "beforeOrAt" | "lessThanOrEqualTo" => (RelationKind::Before, true),
            "after" | "greaterThan" => (RelationKind::After, false),
            "afterOrAt" | "greaterThanOrEqualTo" => (RelationKind::After, true),
            other => {
                return Err(invalid(format!(
                    "field `{}`: operator '{other}' does not accept otherField",
                    main.name
                )));
            }
        };

        let offset = dto.offset.unwrap_or(0);
        let offset_unit = self.offset_unit(dto, &main)?;
        Ok(Constraint::Relation(FieldRelation::new(
            main,
            other,
            kind,
            inclusive,
            offset,
            offset_unit,
        )))
    }

    fn lower_of_type(&self, dto: &AtomicDto, field: Field) -> Result<Constraint> {
        let raw = self
            .operand(dto)?
            .as_str()
            .ok_or_else(|| invalid(format!("field `{}`: ofType requires a type name", field.name)))?;
        match raw {
            "text" => Ok(Constraint::atomic(field, AtomicKind::OfType(FieldType::Text))),
            "numeric" => Ok(Constraint::atomic(
                field,
                AtomicKind::OfType(FieldType::Numeric),
            )),
            "datetime" => Ok(Constraint::atomic(
                field,
                AtomicKind::OfType(FieldType::DateTime),
            )),
            "integer" => Ok(Constraint::and(vec![
                Constraint::atomic(field.clone(), AtomicKind::OfType(FieldType::Numeric)),
                Constraint::atomic(
                    field,
                    AtomicKind::GranularToNumeric(NumericGranularity::WHOLE),
                ),
            ])),
            other => Err(invalid(format!(
                "field `{}`: ofType does not recognize '{other}'",
                field.name
            ))),
        }
    }

    fn granularity(&self, field: &Field, dto: &AtomicDto) -> Result<AtomicKind> {
        let value = self.operand(dto)?;
        match field.field_type {
            FieldType::Numeric => value
                .as_f64()
                .and_then(NumericGranularity::parse)
                .map(AtomicKind::GranularToNumeric)
                .ok_or_else(|| {
                    invalid(format!(
                        "field `{}`: invalid granularity literal {value}",
                        field.name
                    ))
                }),
            FieldType::DateTime => value
                .as_str()
                .and_then(TimeUnit::parse)
                .map(AtomicKind::GranularToDate)
                .ok_or_else(|| {
                    invalid(format!(
                        "field `{}`: invalid granularity literal {value}",
                        field.name
                    ))
                }),
            FieldType::Text => Err(invalid(format!(
                "field `{}`: granularTo does not apply to text fields",
                field.name
            ))),
        }
    }

    fn offset_unit(&self, dto: &AtomicDto, main: &Field) -> Result<OffsetUnit> {
        match (main.field_type, dto.offset_unit.as_deref()) {
            (FieldType::DateTime, None) => Ok(OffsetUnit::Time(TimeUnit::Millis)),
            (FieldType::DateTime, Some(raw)) => TimeUnit::parse(raw)
                .map(OffsetUnit::Time)
                .ok_or_else(|| offset_unit_error(main, raw)),
            (_, None) => Ok(OffsetUnit::Numeric(NumericGranularity::WHOLE)),
            (_, Some(raw)) => raw
                .parse::<f64>()
                .ok()
                .and_then(NumericGranularity::parse)
                .map(OffsetUnit::Numeric)
                .ok_or_else(|| offset_unit_error(main, raw)),
        }
    }

    fn field(&self, name: &str) -> Result<&Field> {
        self.fields
            .by_name(name)
            .ok_or_else(|| invalid(format!("field `{name}` is not declared")))
    }

    fn resolve(&self, raw: &str) -> PathBuf {
        let candidate = Path::new(raw);
        if candidate.is_absolute() {
            return candidate.to_path_buf();
        }
        match self.base_dir {
            Some(dir) => dir.join(candidate),
            None => candidate.to_path_buf(),
        }
    }

    fn operand<'a>(&self, dto: &'a AtomicDto) -> Result<&'a Value> {
        match dto.value.as_ref() {
            Some(Value::Null) | None => Err(invalid(format!(
                "field `{}`: operator `{}` requires a value",
                dto.field, dto.is
            ))),
            Some(value) => Ok(value),
        }
    }

    fn literal(&self, field: &Field, value: &Value) -> Result<DataValue> {
        let lowered = match field.field_type {
            FieldType::Text => value.as_str().map(DataValue::from),
            FieldType::Numeric => value.as_f64().map(DataValue::Number),
            FieldType::DateTime => value
                .as_str()
                .and_then(parse_datetime)
                .map(DataValue::DateTime),
        };
        lowered.ok_or_else(|| {
            invalid(format!(
                "field `{}` is {} but the literal is {value}",
                field.name,
                field.field_type.label()
            ))
        })
    }

    fn text_literal(&self, field: &Field, raw: &str) -> Result<DataValue> {
        let lowered = match field.field_type {
            FieldType::Text => Some(DataValue::from(raw)),
            FieldType::Numeric => raw.trim().parse::<f64>().ok().map(DataValue::Number),
            FieldType::DateTime => parse_datetime(raw.trim()).map(DataValue::DateTime),
        };
        lowered.ok_or_else(|| {
            ProfileError::ValueList(format!(
                "field `{}` is {} but the list holds '{raw}'",
                field.name,
                field.field_type.label()
            ))
        })
    }

    fn number(&self, field: &Field, dto: &AtomicDto) -> Result<f64> {
        self.operand(dto)?.as_f64().ok_or_else(|| {
            invalid(format!(
                "field `{}`: operator `{}` requires a number",
                field.name, dto.is
            ))
        })
    }

    fn datetime(&self, field: &Field, dto: &AtomicDto) -> Result<NaiveDateTime> {
        self.operand(dto)?
            .as_str()
            .and_then(parse_datetime)
            .ok_or_else(|| {
                invalid(format!(
                    "field `{}`: operator `{}` requires an ISO datetime literal",
                    field.name, dto.is
                ))
            })
    }

    fn length(&self, field: &Field, dto: &AtomicDto) -> Result<u32> {
        self.operand(dto)?
            .as_u64()
            .and_then(|length| u32::try_from(length).ok())
            .ok_or_else(|| {
                invalid(format!(
                    "field `{}`: operator `{}` requires a non-negative integer length",
                    field.name, dto.is
                ))
            })
    }

    fn pattern(&self, field: &Field, dto: &AtomicDto) -> Result<String> {
        self.operand(dto)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                invalid(format!(
                    "field `{}`: operator `{}` requires a pattern string",
                    field.name, dto.is
                ))
            })
    }
}

fn invalid(message: String) -> ProfileError {
    rowsmith_core::Error::InvalidProfile(message).into()
}

fn offset_unit_error(field: &Field, raw: &str) -> ProfileError {
    invalid(format!(
        "field `{}`: invalid offset unit '{raw}'",
        field.name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn orders_profile() -> Value {
        json!({
            "profile_version": "0.1",
            "fields": [
                { "name": "order_id", "type": "integer", "nullable": false },
                { "name": "status", "type": "text" },
                { "name": "placed", "type": "datetime" },
                { "name": "shipped", "type": "datetime" }
            ],
            "constraints": [
                { "field": "status", "is": "inSet", "values": [
                    { "value": "open", "weight": 3 }, "closed"
                ] },
                { "field": "shipped", "is": "afterOrAt", "otherField": "placed",
                  "offset": 1, "offsetUnit": "days" }
            ]
        })
    }

    #[test]
    fn lowers_integer_fields_to_whole_number_grid() {
        let profile = parse_profile(&orders_profile(), None).expect("parse profile");
        let field = profile.fields.by_name("order_id").expect("order_id");
        assert_eq!(field.field_type, FieldType::Numeric);
        assert!(!field.nullable);

        let has_grid = profile.constraints.iter().any(|constraint| {
            matches!(
                constraint,
                Constraint::Atomic(atomic)
                    if atomic.field.name == "order_id"
                        && atomic.kind == AtomicKind::GranularToNumeric(NumericGranularity::WHOLE)
            )
        });
        assert!(has_grid, "implicit whole-number granularity missing");

        let has_not_null = profile.constraints.iter().any(|constraint| {
            matches!(
                constraint,
                Constraint::Atomic(atomic)
                    if atomic.field.name == "order_id" && atomic.kind == AtomicKind::NotNull
            )
        });
        assert!(has_not_null, "declared nullability not lowered");
    }

    #[test]
    fn lowers_other_field_clauses_to_relations() {
        let profile = parse_profile(&orders_profile(), None).expect("parse profile");
        let relation = profile
            .constraints
            .iter()
            .find_map(|constraint| match constraint {
                Constraint::Relation(relation) => Some(relation),
                _ => None,
            })
            .expect("relation constraint");

        assert_eq!(relation.main().name, "shipped");
        assert_eq!(relation.other().name, "placed");
        assert_eq!(relation.kind(), RelationKind::After);
        assert!(relation.inclusive());
        assert_eq!(relation.offset(), 1);
        assert_eq!(relation.offset_unit(), OffsetUnit::Time(TimeUnit::Days));
    }

    #[test]
    fn weighted_set_entries_keep_their_weights() {
        let profile = parse_profile(&orders_profile(), None).expect("parse profile");
        let set = profile
            .constraints
            .iter()
            .find_map(|constraint| match constraint {
                Constraint::Atomic(atomic) => match &atomic.kind {
                    AtomicKind::InSet(set) => Some(set),
                    _ => None,
                },
                _ => None,
            })
            .expect("inSet constraint");

        assert_eq!(set.len(), 2);
        let open = set
            .elements()
            .iter()
            .find(|element| element.value == DataValue::from("open"))
            .expect("open entry");
        assert_eq!(open.weight, 3.0);
        assert_eq!(set.total_weight(), 4.0);
    }

    #[test]
    fn from_file_duplicates_fold_into_weights() {
        let dir = std::env::temp_dir().join(format!("rowsmith-lists-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create list dir");
        std::fs::write(dir.join("cities.csv"), "lisbon\nporto\nbraga\nlisbon\n")
            .expect("write list");

        let doc = json!({
            "profile_version": "0.1",
            "fields": [{ "name": "city", "type": "text" }],
            "constraints": [{ "field": "city", "is": "fromFile", "file": "cities.csv" }]
        });
        let profile = parse_profile(&doc, Some(dir.as_path())).expect("parse profile");
        std::fs::remove_dir_all(&dir).ok();

        let set = profile
            .constraints
            .iter()
            .find_map(|constraint| match constraint {
                Constraint::Atomic(atomic) => match &atomic.kind {
                    AtomicKind::InSet(set) => Some(set),
                    _ => None,
                },
                _ => None,
            })
            .expect("inSet constraint");

        assert_eq!(set.len(), 3);
        let lisbon = set
            .elements()
            .iter()
            .find(|element| element.value == DataValue::from("lisbon"))
            .expect("lisbon entry");
        assert_eq!(lisbon.weight, 2.0);
        assert_eq!(set.total_weight(), 4.0);
    }

    #[test]
    fn rejects_unknown_operator_through_validation() {
        let mut doc = orders_profile();
        doc["constraints"]
            .as_array_mut()
            .expect("constraints array")
            .push(json!({ "field": "status", "is": "sparkles", "value": "x" }));
        let err = parse_profile(&doc, None).expect_err("unknown operator");
        match err {
            ProfileError::Invalid { report } => {
                assert!(report.errors.iter().any(|issue| issue.code == "unknown_operator"));
            }
            other => panic!("expected validation failure, got {other}"),
        }
    }
}
