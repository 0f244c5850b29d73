use chrono::DateTime;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_regex::Regex as RandRegex;
use rowsmith_core::{
    DataValue, DateTimeRange, Error, Field, FieldSpec, FieldType, LengthRange, Limit,
    LinearDefaults, NumericRange, Result, TextPattern, WeightedSet,
};

const DEFAULT_CHARSET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const DEFAULT_MAX_REPEAT: u32 = 32;
/// Redraws before a blacklist or pattern mismatch gives up on the attempt.
const VALUE_ATTEMPTS: u32 = 32;
/// Length cap for text fields with no declared upper bound.
const UNBOUNDED_TEXT_CAP: u32 = 32;

/// Outcome of sampling one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Sampled {
    Value(DataValue),
    Null,
    /// No candidate survived the excluded values within the attempt budget.
    Exhausted,
}

/// Draws one value satisfying the field's restriction.
pub fn sample_field(
    field: &Field,
    spec: &FieldSpec,
    defaults: &LinearDefaults,
    null_chance: f64,
    rng: &mut ChaCha8Rng,
) -> Result<Sampled> {
    if spec.is_contradiction() {
        return Err(Error::Unsupported(format!(
            "field `{}`: cannot sample a contradictory restriction",
            field.name
        )));
    }
    if spec.is_null_only() {
        return Ok(Sampled::Null);
    }
    if spec.nullable() && rng.random_bool(null_chance.clamp(0.0, 1.0)) {
        return Ok(Sampled::Null);
    }
    sample_present(field, spec, defaults, rng)
}

fn sample_present(
    field: &Field,
    spec: &FieldSpec,
    defaults: &LinearDefaults,
    rng: &mut ChaCha8Rng,
) -> Result<Sampled> {
    match spec {
        FieldSpec::Any { blacklist, .. } => sample_default(field, blacklist, defaults, rng),
        FieldSpec::Whitelist { set, .. } => Ok(match pick_weighted(set, rng) {
            Some(value) => Sampled::Value(value.clone()),
            None => Sampled::Exhausted,
        }),
        FieldSpec::Numeric {
            range, blacklist, ..
        } => Ok(sample_numeric(range, blacklist, rng)),
        FieldSpec::DateTime {
            range, blacklist, ..
        } => Ok(sample_datetime(range, blacklist, rng)),
        FieldSpec::Text {
            lengths,
            patterns,
            blacklist,
            ..
        } => sample_text(field, lengths, patterns, blacklist, rng),
        FieldSpec::NullOnly => Ok(Sampled::Null),
        FieldSpec::Contradiction => Err(Error::Unsupported(format!(
            "field `{}`: cannot sample a contradictory restriction",
            field.name
        ))),
    }
}

/// An unrestricted field falls back to its type's default value space.
fn sample_default(
    field: &Field,
    blacklist: &[DataValue],
    defaults: &LinearDefaults,
    rng: &mut ChaCha8Rng,
) -> Result<Sampled> {
    match field.field_type {
        FieldType::Text => {
            let lengths = LengthRange::new(1, defaults.max_string_length);
            sample_text(field, &lengths, &[], blacklist, rng)
        }
        FieldType::Numeric => {
            let range = NumericRange::new(
                Limit::inclusive(defaults.numeric_min),
                Limit::inclusive(defaults.numeric_max),
                defaults.numeric_granularity,
            );
            Ok(sample_numeric(&range, blacklist, rng))
        }
        FieldType::DateTime => {
            let range = DateTimeRange::new(
                Limit::inclusive(defaults.datetime_min),
                Limit::inclusive(defaults.datetime_max),
                defaults.datetime_granularity,
            );
            Ok(sample_datetime(&range, blacklist, rng))
        }
    }
}

fn sample_numeric(range: &NumericRange, blacklist: &[DataValue], rng: &mut ChaCha8Rng) -> Sampled {
    for _ in 0..VALUE_ATTEMPTS {
        let raw = rng.random_range(range.min..=range.max);
        // trim floors onto the grid, which keeps the draw at or above the
        // aligned minimum
        let value = range.granularity.trim(raw);
        if !range.contains(value) {
            continue;
        }
        let candidate = DataValue::Number(value);
        if blacklist.contains(&candidate) {
            continue;
        }
        return Sampled::Value(candidate);
    }
    Sampled::Exhausted
}

fn sample_datetime(
    range: &DateTimeRange,
    blacklist: &[DataValue],
    rng: &mut ChaCha8Rng,
) -> Sampled {
    let min_ms = range.min.and_utc().timestamp_millis();
    let max_ms = range.max.and_utc().timestamp_millis();
    for _ in 0..VALUE_ATTEMPTS {
        let millis = rng.random_range(min_ms..=max_ms);
        let Some(raw) = DateTime::from_timestamp_millis(millis) else {
            continue;
        };
        let value = range.granularity.trim(raw.naive_utc());
        if !range.contains(value) {
            continue;
        }
        let candidate = DataValue::DateTime(value);
        if blacklist.contains(&candidate) {
            continue;
        }
        return Sampled::Value(candidate);
    }
    Sampled::Exhausted
}

fn sample_text(
    field: &Field,
    lengths: &LengthRange,
    patterns: &[TextPattern],
    blacklist: &[DataValue],
    rng: &mut ChaCha8Rng,
) -> Result<Sampled> {
    if let Some(primary) = patterns.first() {
        let regex = RandRegex::compile(&primary.pattern, DEFAULT_MAX_REPEAT).map_err(|err| {
            Error::InvalidProfile(format!(
                "field `{}`: cannot generate from pattern /{}/: {err}",
                field.name, primary.pattern
            ))
        })?;
        for _ in 0..VALUE_ATTEMPTS {
            let value: String = rng.sample(&regex);
            if !lengths.contains(value.chars().count() as u32) {
                continue;
            }
            if !patterns.iter().all(|pattern| pattern.matches(&value)) {
                continue;
            }
            let candidate = DataValue::Text(value);
            if blacklist.contains(&candidate) {
                continue;
            }
            return Ok(Sampled::Value(candidate));
        }
        return Ok(Sampled::Exhausted);
    }

    let chars: Vec<char> = DEFAULT_CHARSET.chars().collect();
    let min = lengths.min;
    let cap = lengths.max.min(min.max(UNBOUNDED_TEXT_CAP));
    for _ in 0..VALUE_ATTEMPTS {
        let len = if min == cap {
            min
        } else {
            rng.random_range(min..=cap)
        };
        let mut value = String::with_capacity(len as usize);
        for _ in 0..len {
            let idx = rng.random_range(0..chars.len());
            value.push(chars[idx]);
        }
        let candidate = DataValue::Text(value);
        if blacklist.contains(&candidate) {
            continue;
        }
        return Ok(Sampled::Value(candidate));
    }
    Ok(Sampled::Exhausted)
}

/// Weighted draw from a whitelist.
fn pick_weighted<'a>(set: &'a WeightedSet, rng: &mut ChaCha8Rng) -> Option<&'a DataValue> {
    let total = set.total_weight();
    if !(total > 0.0) {
        return None;
    }
    let mut target = rng.random_range(0.0..total);
    for element in set.elements() {
        if target < element.weight {
            return Some(&element.value);
        }
        target -= element.weight;
    }
    set.elements().last().map(|element| &element.value)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rowsmith_core::{NumericGranularity, TimeUnit};

    use super::*;

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    fn value_of(sampled: Sampled) -> DataValue {
        match sampled {
            Sampled::Value(value) => value,
            other => panic!("expected a value, got {other:?}"),
        }
    }

    #[test]
    fn numeric_draws_stay_in_range_and_on_grid() {
        let field = Field::new("amount", FieldType::Numeric).not_nullable();
        let range = NumericRange::new(
            Limit::inclusive(0.0),
            Limit::inclusive(10.0),
            NumericGranularity::new(2),
        );
        let spec = FieldSpec::numeric(range).with_not_null();
        let defaults = LinearDefaults::default();
        let mut rng = rng(7);

        for _ in 0..200 {
            let sampled = sample_field(&field, &spec, &defaults, 0.1, &mut rng).expect("sample");
            let value = value_of(sampled);
            let number = value.as_number().expect("numeric value");
            assert!((0.0..=10.0).contains(&number));
            assert!(NumericGranularity::new(2).is_aligned(number));
        }
    }

    #[test]
    fn whitelist_draws_respect_membership_and_nullability() {
        let field = Field::new("status", FieldType::Text);
        let set = WeightedSet::weighted(vec![
            (DataValue::from("open"), 5.0),
            (DataValue::from("closed"), 1.0),
        ]);
        let spec = FieldSpec::whitelist(set.clone());
        let defaults = LinearDefaults::default();
        let mut rng = rng(21);

        let mut saw_null = false;
        for _ in 0..300 {
            match sample_field(&field, &spec, &defaults, 0.2, &mut rng).expect("sample") {
                Sampled::Null => saw_null = true,
                Sampled::Value(value) => assert!(set.contains(&value)),
                Sampled::Exhausted => panic!("non-empty whitelist cannot exhaust"),
            }
        }
        assert!(saw_null, "nullable spec never produced the absent value");
    }

    #[test]
    fn datetime_draws_align_to_the_unit() {
        let field = Field::new("captured", FieldType::DateTime).not_nullable();
        let min = chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("valid bound");
        let max = chrono::NaiveDate::from_ymd_opt(2024, 6, 30)
            .and_then(|date| date.and_hms_opt(23, 59, 59))
            .expect("valid bound");
        let range = DateTimeRange::new(Limit::inclusive(min), Limit::inclusive(max), TimeUnit::Days);
        let spec = FieldSpec::datetime(range).with_not_null();
        let defaults = LinearDefaults::default();
        let mut rng = rng(3);

        for _ in 0..100 {
            let sampled = sample_field(&field, &spec, &defaults, 0.1, &mut rng).expect("sample");
            let value = value_of(sampled);
            let datetime = value.as_datetime().expect("datetime value");
            assert!(datetime >= min && datetime <= max);
            assert!(TimeUnit::Days.is_aligned(datetime));
        }
    }

    #[test]
    fn pattern_draws_match_the_pattern() {
        let field = Field::new("code", FieldType::Text).not_nullable();
        let spec = FieldSpec::text_with(
            LengthRange::new(0, 1000),
            vec![TextPattern::full("[A-Z]{2}-[0-9]{4}")],
        )
        .with_not_null();
        let checker = regex::Regex::new("^[A-Z]{2}-[0-9]{4}$").expect("valid pattern");
        let defaults = LinearDefaults::default();
        let mut rng = rng(11);

        for _ in 0..50 {
            let sampled = sample_field(&field, &spec, &defaults, 0.1, &mut rng).expect("sample");
            let value = value_of(sampled);
            let text = value.as_text().expect("text value");
            assert!(checker.is_match(text), "{text} does not match");
        }
    }

    #[test]
    fn exact_length_is_honored() {
        let field = Field::new("tag", FieldType::Text).not_nullable();
        let spec = FieldSpec::text(LengthRange::new(8, 8)).with_not_null();
        let defaults = LinearDefaults::default();
        let mut rng = rng(5);

        for _ in 0..50 {
            let sampled = sample_field(&field, &spec, &defaults, 0.1, &mut rng).expect("sample");
            let value = value_of(sampled);
            assert_eq!(value.as_text().expect("text value").chars().count(), 8);
        }
    }

    #[test]
    fn blacklisted_singleton_range_exhausts() {
        let field = Field::new("amount", FieldType::Numeric).not_nullable();
        let range = NumericRange::new(
            Limit::inclusive(5.0),
            Limit::inclusive(5.0),
            NumericGranularity::WHOLE,
        );
        let spec = match FieldSpec::numeric(range).with_not_null() {
            FieldSpec::Numeric {
                range, nullable, ..
            } => FieldSpec::Numeric {
                range,
                nullable,
                blacklist: vec![DataValue::Number(5.0)],
            },
            other => panic!("unexpected spec {other:?}"),
        };
        let defaults = LinearDefaults::default();
        let mut rng = rng(9);

        let sampled = sample_field(&field, &spec, &defaults, 0.0, &mut rng).expect("sample");
        assert_eq!(sampled, Sampled::Exhausted);
    }

    #[test]
    fn weighted_picks_lean_toward_heavier_elements() {
        let set = WeightedSet::weighted(vec![
            (DataValue::from("common"), 9.0),
            (DataValue::from("rare"), 1.0),
        ]);
        let mut rng = rng(13);
        let mut common = 0_u32;
        for _ in 0..1000 {
            if pick_weighted(&set, &mut rng) == Some(&DataValue::from("common")) {
                common += 1;
            }
        }
        assert!(common > 700, "picked common only {common} times");
    }
}
