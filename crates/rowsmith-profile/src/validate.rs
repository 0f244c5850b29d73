use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use jsonschema::JSONSchema;
use regex::Regex;
use rowsmith_core::{NumericGranularity, PROFILE_VERSION, TextPattern, TimeUnit};
use serde_json::Value;

use crate::dto::{AtomicDto, ConstraintDto, ProfileDto};
use crate::errors::{IssueSeverity, ProfileError, ValidationIssue, ValidationReport};

/// Validated profile with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedProfile {
    pub profile: ProfileDto,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a profile JSON document against the profile JSON Schema.
pub fn validate_profile_json(
    profile_json: &Value,
    profile_schema: &Value,
) -> Result<ValidationReport, ProfileError> {
    let compiled = JSONSchema::compile(profile_schema)
        .map_err(|err| ProfileError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(profile_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_violation",
                path,
                error.to_string(),
                None,
            ));
        }
    }

    Ok(report)
}

/// Validate a parsed profile beyond its JSON shape: field references,
/// operator/operand pairing, literal types, granularities and regexes.
pub fn validate_profile_semantics(profile: &ProfileDto) -> ValidationReport {
    let mut report = ValidationReport::default();

    if profile.profile_version != PROFILE_VERSION {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "profile_version_mismatch",
            "/profile_version",
            format!(
                "profile_version '{}' is not supported (expected '{}')",
                profile.profile_version, PROFILE_VERSION
            ),
            Some(format!("set profile_version to '{PROFILE_VERSION}'")),
        ));
    }

    let index = validate_fields(profile, &mut report);

    for (idx, constraint) in profile.constraints.iter().enumerate() {
        let base_path = format!("/constraints/{idx}");
        validate_constraint(constraint, &base_path, &index, false, &mut report);
    }

    report
}

/// Validate the profile end-to-end, returning structured issues on failure.
pub fn validate_profile(
    profile_json: &Value,
    profile_schema: &Value,
) -> Result<ValidatedProfile, ValidationReport> {
    let structural = match validate_profile_json(profile_json, profile_schema) {
        Ok(report) => report,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_validation_error",
                "/",
                err.to_string(),
                None,
            ));
            return Err(report);
        }
    };

    if !structural.is_ok() {
        return Err(structural);
    }

    let profile: ProfileDto = match serde_json::from_value(profile_json.clone()) {
        Ok(profile) => profile,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "invalid_profile_json",
                "/",
                err.to_string(),
                None,
            ));
            return Err(report);
        }
    };

    let semantic = validate_profile_semantics(&profile);
    if !semantic.is_ok() {
        return Err(semantic);
    }

    Ok(ValidatedProfile {
        profile,
        warnings: semantic.warnings,
    })
}

/// Declared type of a field as seen by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeKind {
    Text,
    Numeric,
    DateTime,
}

impl TypeKind {
    fn parse(raw: &str) -> Option<TypeKind> {
        match raw {
            "text" => Some(TypeKind::Text),
            "numeric" | "integer" => Some(TypeKind::Numeric),
            "datetime" => Some(TypeKind::DateTime),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TypeKind::Text => "text",
            TypeKind::Numeric => "numeric",
            TypeKind::DateTime => "datetime",
        }
    }
}

struct FieldInfo {
    kind: TypeKind,
    nullable: bool,
}

struct FieldIndex {
    fields: HashMap<String, FieldInfo>,
}

impl FieldIndex {
    fn get(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.get(name)
    }
}

fn validate_fields(profile: &ProfileDto, report: &mut ValidationReport) -> FieldIndex {
    let mut fields = HashMap::new();

    if profile.fields.is_empty() {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "fields_empty",
            "/fields",
            "profile requires at least one field".to_string(),
            Some("declare at least one field".to_string()),
        ));
    }

    for (idx, field) in profile.fields.iter().enumerate() {
        let base_path = format!("/fields/{idx}");
        if field.name.trim().is_empty() {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "empty_field_name",
                format!("{base_path}/name"),
                "field name must be a non-empty string".to_string(),
                None,
            ));
            continue;
        }

        let Some(kind) = TypeKind::parse(&field.field_type) else {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "unknown_field_type",
                format!("{base_path}/type"),
                format!(
                    "field `{}`: unknown type '{}'",
                    field.name, field.field_type
                ),
                Some("use one of: text, numeric, integer, datetime".to_string()),
            ));
            continue;
        };

        if fields
            .insert(
                field.name.clone(),
                FieldInfo {
                    kind,
                    nullable: field.nullable,
                },
            )
            .is_some()
        {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "duplicate_field",
                format!("{base_path}/name"),
                format!("field `{}` is declared more than once", field.name),
                Some("merge the duplicate declarations".to_string()),
            ));
        }
    }

    FieldIndex { fields }
}

fn validate_constraint(
    constraint: &ConstraintDto,
    base_path: &str,
    index: &FieldIndex,
    negated: bool,
    report: &mut ValidationReport,
) {
    match constraint {
        ConstraintDto::Not { not } => {
            validate_constraint(not, &format!("{base_path}/not"), index, !negated, report);
        }
        ConstraintDto::AllOf { all_of } => {
            if all_of.is_empty() {
                report.push_warning(ValidationIssue::new(
                    IssueSeverity::Warning,
                    "empty_combinator",
                    format!("{base_path}/allOf"),
                    "empty allOf has no effect".to_string(),
                    None,
                ));
            }
            for (idx, child) in all_of.iter().enumerate() {
                validate_constraint(
                    child,
                    &format!("{base_path}/allOf/{idx}"),
                    index,
                    negated,
                    report,
                );
            }
        }
        ConstraintDto::AnyOf { any_of } => {
            if any_of.is_empty() {
                report.push_error(ValidationIssue::new(
                    IssueSeverity::Error,
                    "empty_combinator",
                    format!("{base_path}/anyOf"),
                    "anyOf requires at least one alternative".to_string(),
                    Some("add an alternative or remove the anyOf".to_string()),
                ));
            }
            for (idx, child) in any_of.iter().enumerate() {
                validate_constraint(
                    child,
                    &format!("{base_path}/anyOf/{idx}"),
                    index,
                    negated,
                    report,
                );
            }
        }
        ConstraintDto::If {
            when,
            then,
            otherwise,
        } => {
            // the condition is negated when the else branch (implicit or
            // explicit) is taken, so it must be negatable either way
            validate_constraint(when, &format!("{base_path}/if"), index, true, report);
            validate_constraint(then, &format!("{base_path}/then"), index, negated, report);
            if let Some(otherwise) = otherwise {
                validate_constraint(
                    otherwise,
                    &format!("{base_path}/else"),
                    index,
                    negated,
                    report,
                );
            }
        }
        ConstraintDto::Atomic(atomic) => {
            validate_atomic(atomic, base_path, index, negated, report);
        }
    }
}

fn validate_atomic(
    atomic: &AtomicDto,
    base_path: &str,
    index: &FieldIndex,
    negated: bool,
    report: &mut ValidationReport,
) {
    let Some(info) = index.get(&atomic.field) else {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "unknown_field",
            format!("{base_path}/field"),
            format!("field `{}` is not declared", atomic.field),
            Some("declare the field or fix the reference".to_string()),
        ));
        return;
    };

    if atomic.other_field.is_some() {
        validate_relation(atomic, base_path, index, info, negated, report);
        return;
    }

    if atomic.offset.is_some() || atomic.offset_unit.is_some() {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "offset_without_other",
            base_path.to_string(),
            "offset and offsetUnit require otherField".to_string(),
            Some("add otherField or drop the offset".to_string()),
        ));
    }

    match atomic.is.as_str() {
        "null" => {
            if !info.nullable {
                report.push_warning(ValidationIssue::new(
                    IssueSeverity::Warning,
                    "never_satisfiable",
                    base_path.to_string(),
                    format!(
                        "field `{}` is not nullable; `null` can never hold",
                        atomic.field
                    ),
                    None,
                ));
            }
        }
        "equalTo" => {
            if let Some(value) = require_value(atomic, base_path, report) {
                check_literal(&atomic.field, info.kind, value, base_path, report);
            }
        }
        "inSet" => {
            validate_set_operand(atomic, base_path, info, report);
        }
        "fromFile" => {
            let missing = atomic
                .file
                .as_deref()
                .map(|path| path.trim().is_empty())
                .unwrap_or(true);
            if missing {
                report.push_error(ValidationIssue::new(
                    IssueSeverity::Error,
                    "missing_operand",
                    format!("{base_path}/file"),
                    "fromFile requires a non-empty file path".to_string(),
                    None,
                ));
            }
        }
        "greaterThan" | "greaterThanOrEqualTo" | "lessThan" | "lessThanOrEqualTo" => {
            require_kind(atomic, info, TypeKind::Numeric, base_path, report);
            if let Some(value) = require_value(atomic, base_path, report)
                && value.as_f64().is_none()
            {
                report.push_error(type_mismatch(&atomic.field, "a number", base_path));
            }
        }
        "after" | "afterOrAt" | "before" | "beforeOrAt" => {
            require_kind(atomic, info, TypeKind::DateTime, base_path, report);
            if let Some(value) = require_value(atomic, base_path, report) {
                let parsed = value.as_str().and_then(parse_datetime);
                if parsed.is_none() {
                    report.push_error(ValidationIssue::new(
                        IssueSeverity::Error,
                        "invalid_datetime",
                        format!("{base_path}/value"),
                        format!(
                            "field `{}`: expected an ISO datetime literal, got {value}",
                            atomic.field
                        ),
                        Some("use YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS".to_string()),
                    ));
                }
            }
        }
        "granularTo" => {
            flag_not_negatable(atomic, base_path, negated, report);
            validate_granularity_operand(atomic, base_path, info, report);
        }
        "longerThan" | "shorterThan" => {
            require_kind(atomic, info, TypeKind::Text, base_path, report);
            validate_length_operand(atomic, base_path, report);
        }
        "ofLength" => {
            flag_not_negatable(atomic, base_path, negated, report);
            require_kind(atomic, info, TypeKind::Text, base_path, report);
            validate_length_operand(atomic, base_path, report);
        }
        "matchingRegex" | "containingRegex" => {
            flag_not_negatable(atomic, base_path, negated, report);
            require_kind(atomic, info, TypeKind::Text, base_path, report);
            if let Some(value) = require_value(atomic, base_path, report) {
                match value.as_str() {
                    Some(pattern) => {
                        let anchored = if atomic.is == "matchingRegex" {
                            TextPattern::full(pattern).effective_pattern()
                        } else {
                            TextPattern::containing(pattern).effective_pattern()
                        };
                        if let Err(err) = Regex::new(&anchored) {
                            report.push_error(ValidationIssue::new(
                                IssueSeverity::Error,
                                "invalid_regex",
                                format!("{base_path}/value"),
                                format!("field `{}`: invalid pattern: {err}", atomic.field),
                                None,
                            ));
                        }
                    }
                    None => {
                        report.push_error(type_mismatch(&atomic.field, "a pattern string", base_path));
                    }
                }
            }
        }
        "ofType" => {
            flag_not_negatable(atomic, base_path, negated, report);
            match atomic.value.as_ref().and_then(|value| value.as_str()) {
                Some(raw) => match TypeKind::parse(raw) {
                    Some(kind) if kind != info.kind => {
                        report.push_warning(ValidationIssue::new(
                            IssueSeverity::Warning,
                            "never_satisfiable",
                            base_path.to_string(),
                            format!(
                                "field `{}` is declared {} and can never be {raw}",
                                atomic.field,
                                info.kind.label()
                            ),
                            None,
                        ));
                    }
                    Some(_) => {}
                    None => {
                        report.push_error(ValidationIssue::new(
                            IssueSeverity::Error,
                            "unknown_field_type",
                            format!("{base_path}/value"),
                            format!("ofType does not recognize '{raw}'"),
                            Some("use one of: text, numeric, integer, datetime".to_string()),
                        ));
                    }
                },
                None => {
                    report.push_error(ValidationIssue::new(
                        IssueSeverity::Error,
                        "missing_operand",
                        format!("{base_path}/value"),
                        "ofType requires a type name".to_string(),
                        None,
                    ));
                }
            }
        }
        other => {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "unknown_operator",
                format!("{base_path}/is"),
                format!("unknown operator '{other}'"),
                None,
            ));
        }
    }
}

fn validate_relation(
    atomic: &AtomicDto,
    base_path: &str,
    index: &FieldIndex,
    info: &FieldInfo,
    negated: bool,
    report: &mut ValidationReport,
) {
    let other_name = atomic.other_field.as_deref().unwrap_or_default();

    if negated {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "not_negatable",
            base_path.to_string(),
            format!("cross-field `{}` cannot appear under a negation", atomic.is),
            Some("restructure the profile to avoid negating the relation".to_string()),
        ));
    }

    let ordering = match atomic.is.as_str() {
        "equalTo" => false,
        "before" | "beforeOrAt" | "after" | "afterOrAt" => {
            if info.kind != TypeKind::DateTime {
                report.push_error(type_mismatch(&atomic.field, "a datetime field", base_path));
            }
            true
        }
        "greaterThan" | "greaterThanOrEqualTo" | "lessThan" | "lessThanOrEqualTo" => {
            if info.kind != TypeKind::Numeric {
                report.push_error(type_mismatch(&atomic.field, "a numeric field", base_path));
            }
            true
        }
        other => {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "unknown_operator",
                format!("{base_path}/is"),
                format!("operator '{other}' does not accept otherField"),
                None,
            ));
            return;
        }
    };

    if other_name == atomic.field {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "self_relation",
            format!("{base_path}/otherField"),
            format!("field `{}` cannot relate to itself", atomic.field),
            None,
        ));
        return;
    }

    match index.get(other_name) {
        None => {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "unknown_other_field",
                format!("{base_path}/otherField"),
                format!("field `{other_name}` is not declared"),
                None,
            ));
            return;
        }
        Some(other) if other.kind != info.kind => {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "relation_type_mismatch",
                format!("{base_path}/otherField"),
                format!(
                    "fields `{}` ({}) and `{other_name}` ({}) cannot be related",
                    atomic.field,
                    info.kind.label(),
                    other.kind.label()
                ),
                None,
            ));
            return;
        }
        Some(_) => {}
    }

    if !ordering && (atomic.offset.is_some() || atomic.offset_unit.is_some()) {
        report.push_warning(ValidationIssue::new(
            IssueSeverity::Warning,
            "offset_ignored",
            base_path.to_string(),
            "equalTo relations ignore offset and offsetUnit".to_string(),
            None,
        ));
        return;
    }

    match (atomic.offset, atomic.offset_unit.as_deref()) {
        (Some(_), None) => {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "missing_offset_unit",
                format!("{base_path}/offsetUnit"),
                "offset requires an offsetUnit".to_string(),
                Some("add offsetUnit, ex.: \"days\"".to_string()),
            ));
        }
        (None, Some(_)) => {
            report.push_warning(ValidationIssue::new(
                IssueSeverity::Warning,
                "offset_unit_ignored",
                format!("{base_path}/offsetUnit"),
                "offsetUnit without offset has no effect".to_string(),
                None,
            ));
        }
        (Some(_), Some(unit)) => {
            let valid = match info.kind {
                TypeKind::DateTime => TimeUnit::parse(unit).is_some(),
                _ => unit
                    .parse::<f64>()
                    .ok()
                    .and_then(NumericGranularity::parse)
                    .is_some(),
            };
            if !valid {
                report.push_error(ValidationIssue::new(
                    IssueSeverity::Error,
                    "invalid_offset_unit",
                    format!("{base_path}/offsetUnit"),
                    format!(
                        "field `{}`: invalid offset unit '{unit}'",
                        atomic.field
                    ),
                    None,
                ));
            }
        }
        (None, None) => {}
    }
}

fn validate_set_operand(
    atomic: &AtomicDto,
    base_path: &str,
    info: &FieldInfo,
    report: &mut ValidationReport,
) {
    let Some(entries) = atomic.values.as_ref() else {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "missing_operand",
            format!("{base_path}/values"),
            "inSet requires a values array".to_string(),
            None,
        ));
        return;
    };

    if entries.is_empty() {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "empty_set",
            format!("{base_path}/values"),
            "inSet requires at least one value".to_string(),
            None,
        ));
        return;
    }

    for (idx, entry) in entries.iter().enumerate() {
        let entry_path = format!("{base_path}/values/{idx}");
        check_literal(&atomic.field, info.kind, entry.value(), &entry_path, report);
        let weight = entry.weight();
        if !(weight.is_finite() && weight > 0.0) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "nonpositive_weight",
                format!("{entry_path}/weight"),
                format!("weights must be positive and finite, got {weight}"),
                None,
            ));
        }
    }
}

fn validate_granularity_operand(
    atomic: &AtomicDto,
    base_path: &str,
    info: &FieldInfo,
    report: &mut ValidationReport,
) {
    let Some(value) = require_value(atomic, base_path, report) else {
        return;
    };
    // numeric parse first, then calendar-unit parse
    let valid = match (info.kind, value) {
        (TypeKind::Numeric, Value::Number(number)) => number
            .as_f64()
            .and_then(NumericGranularity::parse)
            .is_some(),
        (TypeKind::DateTime, Value::String(raw)) => TimeUnit::parse(raw).is_some(),
        _ => false,
    };
    if !valid {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "invalid_granularity",
            format!("{base_path}/value"),
            format!(
                "field `{}`: invalid granularity literal {value}",
                atomic.field
            ),
            Some("use 1, a negative power of ten, or a calendar unit".to_string()),
        ));
    }
}

fn validate_length_operand(atomic: &AtomicDto, base_path: &str, report: &mut ValidationReport) {
    let Some(value) = require_value(atomic, base_path, report) else {
        return;
    };
    let length = value.as_u64().filter(|length| *length <= u64::from(u32::MAX));
    let valid = match atomic.is.as_str() {
        // a string can never have negative length
        "shorterThan" => length.map(|length| length >= 1).unwrap_or(false),
        _ => length.is_some(),
    };
    if !valid {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "invalid_length",
            format!("{base_path}/value"),
            format!(
                "field `{}`: `{}` requires a non-negative integer length, got {value}",
                atomic.field, atomic.is
            ),
            None,
        ));
    }
}

fn require_value<'a>(
    atomic: &'a AtomicDto,
    base_path: &str,
    report: &mut ValidationReport,
) -> Option<&'a Value> {
    match atomic.value.as_ref() {
        Some(Value::Null) | None => {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "missing_operand",
                format!("{base_path}/value"),
                format!("operator `{}` requires a value", atomic.is),
                None,
            ));
            None
        }
        Some(value) => Some(value),
    }
}

fn require_kind(
    atomic: &AtomicDto,
    info: &FieldInfo,
    expected: TypeKind,
    base_path: &str,
    report: &mut ValidationReport,
) {
    if info.kind != expected {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "operator_type_mismatch",
            base_path.to_string(),
            format!(
                "operator `{}` applies to {} fields, but `{}` is {}",
                atomic.is,
                expected.label(),
                atomic.field,
                info.kind.label()
            ),
            None,
        ));
    }
}

fn flag_not_negatable(
    atomic: &AtomicDto,
    base_path: &str,
    negated: bool,
    report: &mut ValidationReport,
) {
    if negated {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "not_negatable",
            base_path.to_string(),
            format!("operator `{}` cannot appear under a negation", atomic.is),
            Some("restructure the profile to avoid the negation".to_string()),
        ));
    }
}

fn check_literal(
    field: &str,
    kind: TypeKind,
    value: &Value,
    base_path: &str,
    report: &mut ValidationReport,
) {
    let ok = match kind {
        TypeKind::Text => value.is_string(),
        TypeKind::Numeric => value.as_f64().is_some(),
        TypeKind::DateTime => value.as_str().and_then(parse_datetime).is_some(),
    };
    if !ok {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "literal_type_mismatch",
            format!("{base_path}/value"),
            format!(
                "field `{field}` is {} but the literal is {value}",
                kind.label()
            ),
            None,
        ));
    }
}

fn type_mismatch(field: &str, expected: &str, base_path: &str) -> ValidationIssue {
    ValidationIssue::new(
        IssueSeverity::Error,
        "operator_type_mismatch",
        base_path.to_string(),
        format!("field `{field}`: operator requires {expected}"),
        None,
    )
}

/// Parses a datetime literal: date-only literals resolve to midnight.
pub(crate) fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_datetime_literal_shapes() {
        let full = parse_datetime("2020-06-15T13:45:30").expect("full literal");
        assert_eq!(full.format("%H:%M:%S").to_string(), "13:45:30");
        let fractional = parse_datetime("2020-06-15T13:45:30.250").expect("fractional literal");
        assert_eq!(fractional.format("%.3f").to_string(), ".250");
        let date_only = parse_datetime("2020-06-15").expect("date literal");
        assert_eq!(date_only.format("%H:%M:%S").to_string(), "00:00:00");
        assert!(parse_datetime("15/06/2020").is_none());
    }
}
