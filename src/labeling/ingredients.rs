//! Ingredient map
//!
//! Per-leaf weight accumulators in first-seen order. Weight is summed across
//! every path that reaches a leaf; the display name, yeast flag and allergens
//! are those of the most recent visit, not a merge.

use std::collections::HashMap;

use super::types::{AllergenSet, Product, ProductId};

/// Running total for one leaf product
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    pub product: ProductId,
    pub accumulated_weight: f64,
    pub display_name: String,
    pub yeast_free: bool,
    pub allergens: AllergenSet,
}

#[derive(Debug, Clone, Default)]
pub struct IngredientMap {
    entries: Vec<Accumulator>,
    index: HashMap<ProductId, usize>,
}

impl IngredientMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, product: ProductId) -> Option<&Accumulator> {
        self.index.get(&product).map(|&i| &self.entries[i])
    }

    /// Accumulators in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Accumulator> {
        self.entries.iter()
    }

    /// Add `weight` for `leaf`, overwriting its metadata with this occurrence
    pub fn accumulate(&mut self, leaf: &Product, weight: f64) {
        match self.index.get(&leaf.id) {
            Some(&i) => {
                let entry = &mut self.entries[i];
                entry.accumulated_weight += weight;
                entry.display_name = leaf.display_name();
                entry.yeast_free = leaf.yeast_free;
                entry.allergens = leaf.allergens.clone();
            }
            None => {
                self.index.insert(leaf.id, self.entries.len());
                self.entries.push(Accumulator {
                    product: leaf.id,
                    accumulated_weight: weight,
                    display_name: leaf.display_name(),
                    yeast_free: leaf.yeast_free,
                    allergens: leaf.allergens.clone(),
                });
            }
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|e| e.accumulated_weight).sum()
    }

    pub fn into_entries(self) -> Vec<Accumulator> {
        self.entries
    }
}

impl IntoIterator for IngredientMap {
    type Item = Accumulator;
    type IntoIter = std::vec::IntoIter<Accumulator>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
