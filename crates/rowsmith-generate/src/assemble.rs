//! Turns a satisfiable row spec into one concrete row.
//!
//! Relations impose a sampling order: a field restricted relative to
//! another must be drawn after its source so the concrete value can
//! tighten the restriction before sampling. The order is a deterministic
//! topological sort over the relation graph.

use std::collections::{BTreeMap, BTreeSet};

use rand_chacha::ChaCha8Rng;
use rowsmith_core::{DataValue, Error, FieldRelation, FieldSpec, Fields, LinearDefaults};

use crate::errors::Result;
use crate::rowspec::RowSpec;
use crate::sample::{Sampled, sample_field};

/// One generated row: field name to concrete value, `None` for null.
pub type Row = BTreeMap<String, Option<DataValue>>;

/// Orders fields so every relation's source field is sampled before the
/// field it restricts. Fails when the relations form a cycle.
pub fn assembly_order(fields: &Fields, relations: &[FieldRelation]) -> Result<Vec<String>> {
    let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for field in fields.iter() {
        graph.entry(field.name.clone()).or_default();
    }
    for relation in relations {
        graph
            .entry(relation.other().name.clone())
            .or_default()
            .insert(relation.main().name.clone());
    }

    let mut indegree: BTreeMap<String, usize> = BTreeMap::new();
    for node in graph.keys() {
        indegree.entry(node.clone()).or_insert(0);
    }
    for targets in graph.values() {
        for target in targets {
            *indegree.entry(target.clone()).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<String> = indegree
        .iter()
        .filter_map(|(node, count)| {
            if *count == 0 {
                Some(node.clone())
            } else {
                None
            }
        })
        .collect();

    let mut order = Vec::with_capacity(graph.len());

    while let Some(node) = ready.iter().next().cloned() {
        ready.remove(&node);
        order.push(node.clone());

        if let Some(targets) = graph.get(&node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(target.clone());
                    }
                }
            }
        }
    }

    if order.len() == graph.len() {
        Ok(order)
    } else {
        let stuck: Vec<String> = indegree
            .into_iter()
            .filter_map(|(node, count)| if count > 0 { Some(node) } else { None })
            .collect();
        Err(Error::Unsupported(format!(
            "circular field relations involving: {}",
            stuck.join(", ")
        ))
        .into())
    }
}

/// Samples one concrete row from a row spec.
///
/// Relation modifiers apply in two passes: each relation first tightens
/// its main field's restriction from the other side's spec, then again
/// from the other side's concrete value once that value has been drawn.
/// Returns `Ok(None)` when a merge contradicts or a field exhausts its
/// candidate budget; the caller retries with a fresh spec.
pub fn assemble_row(
    row_spec: &RowSpec,
    fields: &Fields,
    defaults: &LinearDefaults,
    null_chance: f64,
    rng: &mut ChaCha8Rng,
) -> Result<Option<Row>> {
    let order = assembly_order(fields, row_spec.relations())?;
    let unconstrained = FieldSpec::any();

    let mut working = row_spec.clone();
    for relation in row_spec.relations() {
        let modifier = {
            let other_spec = working
                .spec(&relation.other().name)
                .unwrap_or(&unconstrained);
            relation.modifier_from_spec(other_spec, defaults)?
        };
        let merged = working
            .spec(&relation.main().name)
            .unwrap_or(&unconstrained)
            .intersect(&modifier);
        if merged.is_contradiction() {
            return Ok(None);
        }
        working.set_spec(&relation.main().name, merged);
    }

    let mut row = Row::new();
    for name in &order {
        let Some(field) = fields.by_name(name) else {
            continue;
        };
        let mut spec = working.spec(name).cloned().unwrap_or_else(FieldSpec::any);
        for relation in row_spec.relations() {
            if relation.main().name != *name {
                continue;
            }
            let other_value = row
                .get(&relation.other().name)
                .and_then(|value| value.as_ref());
            let modifier = relation.modifier_from_value(other_value, defaults)?;
            spec = spec.intersect(&modifier);
            if spec.is_contradiction() {
                return Ok(None);
            }
        }
        match sample_field(field, &spec, defaults, null_chance, rng)? {
            Sampled::Value(value) => {
                row.insert(name.clone(), Some(value));
            }
            Sampled::Null => {
                row.insert(name.clone(), None);
            }
            Sampled::Exhausted => return Ok(None),
        }
    }

    Ok(Some(row))
}
