use std::collections::VecDeque;

use rowsmith_core::{
    Constraint, ConstraintNode, ConstraintNodeId, DecisionNode, DecisionTree, Error, TreeBuilder,
    desugar_conditional,
};
use rowsmith_profile::Profile;

use crate::errors::Result;

/// Compiles a lowered profile into its decision tree.
///
/// Conjunctions collapse into a single constraint node, disjunctions become
/// decisions, conditionals are rewritten as disjunctions, and negations are
/// pushed down to the atoms before any node is built.
pub fn compile_tree(profile: &Profile) -> Result<DecisionTree> {
    let mut normalized = Vec::with_capacity(profile.constraints.len());
    for constraint in &profile.constraints {
        normalized.push(normalize(constraint)?);
    }

    let mut builder = TreeBuilder::new();
    let root = build_node(&mut builder, &normalized)?;
    Ok(builder.finish(root))
}

fn normalize(constraint: &Constraint) -> Result<Constraint> {
    match constraint {
        Constraint::Atomic(_) | Constraint::Relation(_) => Ok(constraint.clone()),
        Constraint::And(children) => Ok(Constraint::And(normalize_all(children)?)),
        Constraint::Or(children) => Ok(Constraint::Or(normalize_all(children)?)),
        Constraint::Not(inner) => normalize(&inner.negate()?),
        Constraint::If {
            when,
            then,
            otherwise,
        } => normalize(&desugar_conditional(when, then, otherwise.as_deref())?),
    }
}

fn normalize_all(children: &[Constraint]) -> Result<Vec<Constraint>> {
    children.iter().map(normalize).collect()
}

fn build_node(builder: &mut TreeBuilder, constraints: &[Constraint]) -> Result<ConstraintNodeId> {
    let mut atomics = Vec::new();
    let mut relations = Vec::new();
    let mut decisions = Vec::new();
    let mut queue: VecDeque<&Constraint> = constraints.iter().collect();

    while let Some(constraint) = queue.pop_front() {
        match constraint {
            Constraint::Atomic(atomic) => atomics.push(atomic.clone()),
            Constraint::Relation(relation) => relations.push(relation.clone()),
            Constraint::And(children) => queue.extend(children.iter()),
            Constraint::Or(children) => {
                let mut options = Vec::with_capacity(children.len());
                for child in children {
                    options.push(build_node(builder, std::slice::from_ref(child))?);
                }
                decisions.push(builder.add_decision(DecisionNode { options }));
            }
            Constraint::Not(_) | Constraint::If { .. } => {
                return Err(Error::Unsupported(
                    "negations and conditionals must be rewritten before tree building"
                        .to_string(),
                )
                .into());
            }
        }
    }

    Ok(builder.add_constraint(ConstraintNode {
        atomics,
        relations,
        decisions,
    }))
}

#[cfg(test)]
mod tests {
    use rowsmith_core::{AtomicKind, DataValue, Field, FieldType, Fields, WeightedSet};

    use super::*;

    fn profile(constraints: Vec<Constraint>) -> Profile {
        Profile {
            fields: Fields::new(vec![
                Field::new("status", FieldType::Text),
                Field::new("amount", FieldType::Numeric),
            ])
            .expect("distinct fields"),
            constraints,
            warnings: Vec::new(),
        }
    }

    fn status_in(values: &[&str]) -> Constraint {
        Constraint::atomic(
            Field::new("status", FieldType::Text),
            AtomicKind::InSet(WeightedSet::uniform(
                values.iter().map(|value| DataValue::from(*value)),
            )),
        )
    }

    fn amount_over(bound: f64) -> Constraint {
        Constraint::atomic(
            Field::new("amount", FieldType::Numeric),
            AtomicKind::GreaterThan(bound),
        )
    }

    #[test]
    fn conjunctions_collapse_into_the_root_node() {
        let tree = compile_tree(&profile(vec![
            status_in(&["open", "closed"]),
            Constraint::and(vec![amount_over(0.0), amount_over(10.0)]),
        ]))
        .expect("compile");

        assert_eq!(tree.constraint_count(), 1);
        assert_eq!(tree.decision_count(), 0);
        assert_eq!(tree.constraint(tree.root()).atomics.len(), 3);
        assert!(tree.constraint(tree.root()).is_leaf());
    }

    #[test]
    fn disjunctions_become_decisions() {
        let tree = compile_tree(&profile(vec![Constraint::or(vec![
            status_in(&["open"]),
            status_in(&["closed"]),
        ])]))
        .expect("compile");

        let root = tree.constraint(tree.root());
        assert_eq!(root.decisions.len(), 1);
        let decision = tree.decision(root.decisions[0]);
        assert_eq!(decision.options.len(), 2);
        for option in &decision.options {
            assert_eq!(tree.constraint(*option).atomics.len(), 1);
        }
    }

    #[test]
    fn conditionals_compile_to_two_option_decisions() {
        let when = status_in(&["open"]);
        let then = amount_over(100.0);
        let tree = compile_tree(&profile(vec![Constraint::if_then(when, then, None)]))
            .expect("compile");

        let root = tree.constraint(tree.root());
        assert_eq!(root.decisions.len(), 1);
        let decision = tree.decision(root.decisions[0]);
        assert_eq!(decision.options.len(), 2);

        // fulfilled branch keeps both restrictions, bypass branch holds the
        // negated condition
        let fulfilled = tree.constraint(decision.options[0]);
        assert_eq!(fulfilled.atomics.len(), 2);
        let bypassed = tree.constraint(decision.options[1]);
        assert_eq!(bypassed.atomics.len(), 1);
        assert!(matches!(
            bypassed.atomics[0].kind,
            AtomicKind::NotInSet(_)
        ));
    }

    #[test]
    fn negated_conjunction_spreads_by_de_morgan() {
        let tree = compile_tree(&profile(vec![Constraint::not(Constraint::and(vec![
            status_in(&["open"]),
            amount_over(0.0),
        ]))]))
        .expect("compile");

        let root = tree.constraint(tree.root());
        assert!(root.atomics.is_empty());
        assert_eq!(root.decisions.len(), 1);
        let decision = tree.decision(root.decisions[0]);
        assert_eq!(decision.options.len(), 2);
        assert!(matches!(
            tree.constraint(decision.options[0]).atomics[0].kind,
            AtomicKind::NotInSet(_)
        ));
        assert!(matches!(
            tree.constraint(decision.options[1]).atomics[0].kind,
            AtomicKind::LessThanOrEqualTo(_)
        ));
    }

    #[test]
    fn negating_a_relation_is_rejected() {
        let shipped = Field::new("shipped", FieldType::DateTime);
        let placed = Field::new("placed", FieldType::DateTime);
        let relation = rowsmith_core::FieldRelation::equal_to(shipped, placed);
        let result = compile_tree(&profile(vec![Constraint::not(Constraint::Relation(
            relation,
        ))]));
        assert!(result.is_err());
    }
}
