use rowsmith_core::{ConstraintNodeId, DecisionNodeId, DecisionTree, Fields, LinearDefaults};

use crate::rowspec::RowSpec;

/// Lazy iterator over every satisfiable routing of a decision tree.
///
/// Each yielded [`RowSpec`] corresponds to one choice of option at every
/// decision along a path. Options are visited in document order, so the
/// sequence is deterministic, and contradictory branches are skipped without
/// surfacing. Nothing beyond the current path is materialized: pulling the
/// first K specs touches O(K + tree size) nodes.
pub struct TreeWalker<'a> {
    tree: &'a DecisionTree,
    defaults: LinearDefaults,
    base: RowSpec,
    walk: Option<ConstraintWalk>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(fields: &Fields, tree: &'a DecisionTree, defaults: LinearDefaults) -> Self {
        let base = RowSpec::unconstrained(fields);
        let walk = ConstraintWalk::start(tree, tree.root(), &base, &defaults);
        TreeWalker {
            tree,
            defaults,
            base,
            walk,
        }
    }

    /// Restarts the walk: the next pull yields the first combination again.
    pub fn reset(&mut self) {
        self.walk = ConstraintWalk::start(self.tree, self.tree.root(), &self.base, &self.defaults);
    }
}

impl Iterator for TreeWalker<'_> {
    type Item = RowSpec;

    fn next(&mut self) -> Option<RowSpec> {
        self.walk.as_mut()?.next(self.tree, &self.defaults)
    }
}

/// Walk state for one constraint node.
enum ConstraintWalk {
    /// Node without decisions: yields its accumulated spec once.
    Leaf { spec: RowSpec, done: bool },
    /// Node with decisions: yields one spec per option combination.
    Routed { chain: DecisionWalk },
}

impl ConstraintWalk {
    /// Returns `None` when the node's own restrictions contradict the
    /// accumulated spec, pruning the whole subtree.
    fn start(
        tree: &DecisionTree,
        id: ConstraintNodeId,
        base: &RowSpec,
        defaults: &LinearDefaults,
    ) -> Option<Self> {
        let node = tree.constraint(id);
        let merged = base.with_node(node, defaults)?;
        if node.is_leaf() {
            Some(ConstraintWalk::Leaf {
                spec: merged,
                done: false,
            })
        } else {
            Some(ConstraintWalk::Routed {
                chain: DecisionWalk::start(&node.decisions, merged),
            })
        }
    }

    fn next(&mut self, tree: &DecisionTree, defaults: &LinearDefaults) -> Option<RowSpec> {
        match self {
            ConstraintWalk::Leaf { spec, done } => {
                if *done {
                    None
                } else {
                    *done = true;
                    Some(spec.clone())
                }
            }
            ConstraintWalk::Routed { chain } => chain.next(tree, defaults),
        }
    }
}

/// Walk state for a position in a node's decision list.
enum DecisionWalk {
    /// Past the last decision: emits the accumulated spec once per sweep.
    End { spec: RowSpec, done: bool },
    /// Iterating one decision's options, crossed with the decisions after it.
    Routed {
        decision: DecisionNodeId,
        base: RowSpec,
        remaining: Vec<DecisionNodeId>,
        option_index: usize,
        option_walk: Option<Box<ConstraintWalk>>,
        rest: Option<Box<DecisionWalk>>,
    },
}

impl DecisionWalk {
    fn start(decisions: &[DecisionNodeId], spec: RowSpec) -> Self {
        match decisions.split_first() {
            None => DecisionWalk::End { spec, done: false },
            Some((first, remaining)) => DecisionWalk::Routed {
                decision: *first,
                base: spec,
                remaining: remaining.to_vec(),
                option_index: 0,
                option_walk: None,
                rest: None,
            },
        }
    }

    fn next(&mut self, tree: &DecisionTree, defaults: &LinearDefaults) -> Option<RowSpec> {
        match self {
            DecisionWalk::End { spec, done } => {
                if *done {
                    None
                } else {
                    *done = true;
                    Some(spec.clone())
                }
            }
            DecisionWalk::Routed {
                decision,
                base,
                remaining,
                option_index,
                option_walk,
                rest,
            } => loop {
                if let Some(active) = rest {
                    if let Some(full) = active.next(tree, defaults) {
                        return Some(full);
                    }
                    *rest = None;
                }

                // pull the next spec out of the current option, advancing
                // through options as they exhaust or prune
                let options = &tree.decision(*decision).options;
                let option_spec = loop {
                    if *option_index >= options.len() {
                        return None;
                    }
                    if option_walk.is_none() {
                        *option_walk =
                            ConstraintWalk::start(tree, options[*option_index], base, defaults)
                                .map(Box::new);
                        if option_walk.is_none() {
                            *option_index += 1;
                            continue;
                        }
                    }
                    match option_walk.as_mut().and_then(|walk| walk.next(tree, defaults)) {
                        Some(spec) => break spec,
                        None => {
                            *option_walk = None;
                            *option_index += 1;
                        }
                    }
                };

                *rest = Some(Box::new(DecisionWalk::start(remaining, option_spec)));
            },
        }
    }
}
