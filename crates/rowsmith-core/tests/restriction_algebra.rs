use chrono::{NaiveDate, NaiveDateTime};
use rowsmith_core::{
    DataValue, DateTimeRange, FieldSpec, LengthRange, Limit, NumericGranularity, NumericRange,
    TextPattern, TimeUnit, WeightedSet,
};

fn day(y: i32, mo: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .expect("valid date")
        .and_hms_opt(0, 0, 0)
        .expect("valid time")
}

fn sample_specs() -> Vec<FieldSpec> {
    vec![
        FieldSpec::any(),
        FieldSpec::not_null(),
        FieldSpec::whitelist(WeightedSet::uniform(vec![
            DataValue::from(1.0),
            DataValue::from(2.0),
            DataValue::from(7.5),
        ])),
        FieldSpec::numeric(NumericRange::new(
            Limit::inclusive(0.0),
            Limit::inclusive(10.0),
            NumericGranularity::new(1),
        )),
        FieldSpec::datetime(DateTimeRange::new(
            Limit::inclusive(day(2020, 1, 1)),
            Limit::inclusive(day(2021, 1, 1)),
            TimeUnit::Days,
        )),
        FieldSpec::text_with(LengthRange::new(1, 12), vec![TextPattern::full("[a-z]+")]),
        FieldSpec::null_only(),
        FieldSpec::contradiction(),
    ]
}

#[test]
fn intersection_is_commutative_for_uniform_weights() {
    let specs = sample_specs();
    for left in &specs {
        for right in &specs {
            assert_eq!(
                left.intersect(right),
                right.intersect(left),
                "intersect must commute for {left:?} and {right:?}"
            );
        }
    }
}

#[test]
fn intersection_is_associative() {
    let specs = sample_specs();
    for a in &specs {
        for b in &specs {
            for c in &specs {
                let left_first = a.intersect(b).intersect(c);
                let right_first = a.intersect(&b.intersect(c));
                assert_eq!(
                    left_first, right_first,
                    "intersect must associate for {a:?}, {b:?}, {c:?}"
                );
            }
        }
    }
}

#[test]
fn unconstrained_is_identity_and_contradiction_absorbs() {
    for spec in sample_specs() {
        assert_eq!(FieldSpec::any().intersect(&spec), spec);
        assert_eq!(spec.intersect(&FieldSpec::any()), spec);
        assert!(spec.intersect(&FieldSpec::contradiction()).is_contradiction());
        assert!(FieldSpec::contradiction().intersect(&spec).is_contradiction());
    }
}

#[test]
fn satisfiability_is_false_only_for_contradiction() {
    for spec in sample_specs() {
        let satisfiable = !spec.is_contradiction();
        let has_values = spec.nullable()
            || spec.permits(&DataValue::from(1.0))
            || spec.permits(&DataValue::from("a"))
            || spec.permits(&DataValue::from(day(2020, 6, 1)));
        if satisfiable {
            assert!(has_values, "satisfiable spec should admit something: {spec:?}");
        } else {
            assert!(!has_values, "contradiction admits nothing");
        }
    }
}

#[test]
fn chained_narrowing_never_widens() {
    let wide = FieldSpec::numeric(NumericRange::new(
        Limit::inclusive(0.0),
        Limit::inclusive(100.0),
        NumericGranularity::WHOLE,
    ));
    let narrow = FieldSpec::numeric(NumericRange::new(
        Limit::inclusive(40.0),
        Limit::inclusive(60.0),
        NumericGranularity::WHOLE,
    ));
    let merged = wide.intersect(&narrow);
    for candidate in [0.0, 39.0, 40.0, 50.0, 60.0, 61.0, 100.0] {
        let value = DataValue::from(candidate);
        if merged.permits(&value) {
            assert!(
                wide.permits(&value) && narrow.permits(&value),
                "merged spec must not admit values either input rejects: {candidate}"
            );
        }
    }
    assert!(merged.permits(&DataValue::from(50.0)));
    assert!(!merged.permits(&DataValue::from(39.0)));
}
