//! The decision tree walked by the generation engine.
//!
//! Nodes live in index-addressed arenas instead of owning each other, so a
//! frozen tree is cheap to share read-only across concurrent walks and
//! traversal never recurses through ownership.

use crate::constraints::AtomicConstraint;
use crate::relations::FieldRelation;

/// Index of a constraint node within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintNodeId(usize);

/// Index of a decision node within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecisionNodeId(usize);

/// A conjunction: atomic constraints and relations that all hold, plus
/// child decisions that each contribute one chosen option.
#[derive(Debug, Clone, Default)]
pub struct ConstraintNode {
    pub atomics: Vec<AtomicConstraint>,
    pub relations: Vec<FieldRelation>,
    pub decisions: Vec<DecisionNodeId>,
}

impl ConstraintNode {
    pub fn is_leaf(&self) -> bool {
        self.decisions.is_empty()
    }
}

/// A disjunction: alternative constraint-node branches, exactly one of
/// which is taken per combination.
#[derive(Debug, Clone)]
pub struct DecisionNode {
    pub options: Vec<ConstraintNodeId>,
}

/// An immutable decision tree over arena-allocated nodes.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    constraints: Vec<ConstraintNode>,
    decisions: Vec<DecisionNode>,
    root: ConstraintNodeId,
}

impl DecisionTree {
    pub fn root(&self) -> ConstraintNodeId {
        self.root
    }

    pub fn constraint(&self, id: ConstraintNodeId) -> &ConstraintNode {
        &self.constraints[id.0]
    }

    pub fn decision(&self, id: DecisionNodeId) -> &DecisionNode {
        &self.decisions[id.0]
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn decision_count(&self) -> usize {
        self.decisions.len()
    }
}

/// Accumulates nodes bottom-up, then freezes them into a [`DecisionTree`].
#[derive(Debug, Default)]
pub struct TreeBuilder {
    constraints: Vec<ConstraintNode>,
    decisions: Vec<DecisionNode>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        TreeBuilder::default()
    }

    pub fn add_constraint(&mut self, node: ConstraintNode) -> ConstraintNodeId {
        self.constraints.push(node);
        ConstraintNodeId(self.constraints.len() - 1)
    }

    pub fn add_decision(&mut self, node: DecisionNode) -> DecisionNodeId {
        self.decisions.push(node);
        DecisionNodeId(self.decisions.len() - 1)
    }

    pub fn finish(self, root: ConstraintNodeId) -> DecisionTree {
        DecisionTree {
            constraints: self.constraints,
            decisions: self.decisions,
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::AtomicKind;
    use crate::fields::{Field, FieldType};
    use crate::values::DataValue;

    #[test]
    fn builder_assigns_stable_sequential_ids() {
        let mut builder = TreeBuilder::new();
        let left = builder.add_constraint(ConstraintNode::default());
        let right = builder.add_constraint(ConstraintNode::default());
        let decision = builder.add_decision(DecisionNode {
            options: vec![left, right],
        });
        let root = builder.add_constraint(ConstraintNode {
            atomics: vec![AtomicConstraint::new(
                Field::new("id", FieldType::Numeric),
                AtomicKind::EqualTo(DataValue::from(1.0)),
            )],
            relations: Vec::new(),
            decisions: vec![decision],
        });
        let tree = builder.finish(root);

        assert_eq!(tree.constraint_count(), 3);
        assert_eq!(tree.decision_count(), 1);
        assert_eq!(tree.root(), root);
        assert!(!tree.constraint(root).is_leaf());
        assert_eq!(tree.decision(decision).options, vec![left, right]);
        assert!(tree.constraint(left).is_leaf());
    }
}
