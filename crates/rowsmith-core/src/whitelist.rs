//! Finite weighted value sets backing whitelist restrictions.

use serde::{Deserialize, Serialize};

use crate::values::DataValue;

/// One candidate value with its relative selection weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedElement {
    pub value: DataValue,
    pub weight: f64,
}

/// A distinct, canonically ordered set of weighted candidate values.
///
/// Inserting a value that is already present folds the weights together, so
/// element identity is by value alone. Weights are relative and only
/// normalized when sampling.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeightedSet {
    elements: Vec<WeightedElement>,
}

impl WeightedSet {
    /// Builds a set where every value carries weight `1.0`.
    pub fn uniform(values: impl IntoIterator<Item = DataValue>) -> Self {
        let mut set = WeightedSet::default();
        for value in values {
            set.insert(value, 1.0);
        }
        set
    }

    /// Builds a set from explicit value/weight pairs.
    pub fn weighted(pairs: impl IntoIterator<Item = (DataValue, f64)>) -> Self {
        let mut set = WeightedSet::default();
        for (value, weight) in pairs {
            set.insert(value, weight);
        }
        set
    }

    /// Inserts a value, folding the weight into an existing element if the
    /// value is already present.
    pub fn insert(&mut self, value: DataValue, weight: f64) {
        match self
            .elements
            .binary_search_by(|element| element.value.canonical_cmp(&value))
        {
            Ok(index) => self.elements[index].weight += weight,
            Err(index) => self.elements.insert(index, WeightedElement { value, weight }),
        }
    }

    pub fn elements(&self) -> &[WeightedElement] {
        &self.elements
    }

    pub fn values(&self) -> impl Iterator<Item = &DataValue> {
        self.elements.iter().map(|element| &element.value)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, value: &DataValue) -> bool {
        self.elements
            .binary_search_by(|element| element.value.canonical_cmp(value))
            .is_ok()
    }

    pub fn total_weight(&self) -> f64 {
        self.elements.iter().map(|element| element.weight).sum()
    }

    /// Keeps elements satisfying `keep`, preserving their weights.
    pub fn filter(&self, keep: impl Fn(&DataValue) -> bool) -> WeightedSet {
        WeightedSet {
            elements: self
                .elements
                .iter()
                .filter(|element| keep(&element.value))
                .cloned()
                .collect(),
        }
    }

    /// Intersects with `other`, keeping this set's weights for survivors.
    pub fn intersect(&self, other: &WeightedSet) -> WeightedSet {
        self.filter(|value| other.contains(value))
    }
}
