use std::collections::BTreeMap;

use rowsmith_core::{
    AtomicConstraint, ConstraintNode, FieldRelation, FieldSpec, Fields, LinearDefaults,
};

/// One fully-routed restriction over every field of the profile.
///
/// Field restrictions are kept in field-name order so iteration, and
/// everything downstream of it, is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSpec {
    specs: BTreeMap<String, FieldSpec>,
    relations: Vec<FieldRelation>,
}

impl RowSpec {
    /// A row spec that permits anything for every declared field.
    pub fn unconstrained(fields: &Fields) -> Self {
        let specs = fields
            .iter()
            .map(|field| (field.name.clone(), FieldSpec::any()))
            .collect();
        RowSpec {
            specs,
            relations: Vec::new(),
        }
    }

    /// Applies every restriction of a tree node, returning `None` when any
    /// field's restriction collapses to the contradiction.
    pub fn with_node(&self, node: &ConstraintNode, defaults: &LinearDefaults) -> Option<RowSpec> {
        let mut merged = self.clone();
        for atomic in &node.atomics {
            if !merged.restrict(atomic, defaults) {
                return None;
            }
        }
        merged
            .relations
            .extend(node.relations.iter().cloned());
        Some(merged)
    }

    fn restrict(&mut self, atomic: &AtomicConstraint, defaults: &LinearDefaults) -> bool {
        let spec = atomic.to_field_spec(defaults);
        let slot = self
            .specs
            .entry(atomic.field.name.clone())
            .or_insert_with(FieldSpec::any);
        let next = slot.intersect(&spec);
        let satisfiable = !next.is_contradiction();
        *slot = next;
        satisfiable
    }

    pub fn spec(&self, field: &str) -> Option<&FieldSpec> {
        self.specs.get(field)
    }

    /// Replaces one field's restriction, typically after a relation modifier
    /// tightened it.
    pub fn set_spec(&mut self, field: &str, spec: FieldSpec) {
        self.specs.insert(field.to_string(), spec);
    }

    pub fn specs(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.specs.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn relations(&self) -> &[FieldRelation] {
        &self.relations
    }

    pub fn is_satisfiable(&self) -> bool {
        self.specs.values().all(|spec| !spec.is_contradiction())
    }
}

#[cfg(test)]
mod tests {
    use rowsmith_core::{AtomicKind, DataValue, Field, FieldType, WeightedSet};

    use super::*;

    fn fields() -> Fields {
        Fields::new(vec![
            Field::new("name", FieldType::Text),
            Field::new("age", FieldType::Numeric),
        ])
        .expect("distinct fields")
    }

    fn node(atomics: Vec<AtomicConstraint>) -> ConstraintNode {
        ConstraintNode {
            atomics,
            relations: Vec::new(),
            decisions: Vec::new(),
        }
    }

    #[test]
    fn node_restrictions_narrow_the_base() {
        let fields = fields();
        let base = RowSpec::unconstrained(&fields);
        let defaults = LinearDefaults::default();
        let age = fields.by_name("age").expect("age").clone();

        let narrowed = base
            .with_node(
                &node(vec![AtomicConstraint::new(
                    age,
                    AtomicKind::GreaterThan(17.0),
                )]),
                &defaults,
            )
            .expect("satisfiable");

        let spec = narrowed.spec("age").expect("age spec");
        assert!(spec.permits(&DataValue::Number(18.0)));
        assert!(!spec.permits(&DataValue::Number(17.0)));
        assert_eq!(narrowed.spec("name"), Some(&FieldSpec::any()));
    }

    #[test]
    fn contradictory_node_prunes_to_none() {
        let fields = fields();
        let base = RowSpec::unconstrained(&fields);
        let defaults = LinearDefaults::default();
        let name = fields.by_name("name").expect("name").clone();

        let set = WeightedSet::uniform(vec![DataValue::from("ada")]);
        let first = base
            .with_node(
                &node(vec![AtomicConstraint::new(
                    name.clone(),
                    AtomicKind::InSet(set),
                )]),
                &defaults,
            )
            .expect("satisfiable");

        let other = WeightedSet::uniform(vec![DataValue::from("grace")]);
        let pruned = first.with_node(
            &node(vec![AtomicConstraint::new(name, AtomicKind::InSet(other))]),
            &defaults,
        );
        assert!(pruned.is_none());
    }
}
