//! Labeling domain types
//!
//! The view of the catalog that BOM expansion and aggregation work on.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable catalog identifier of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Catalog identifier of an allergen
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllergenId(pub i64);

pub type AllergenSet = BTreeSet<AllergenId>;

/// A product as seen by the labeling core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Grams per stock unit (one `unit` of this product)
    pub norm_weight: f64,
    pub nutrition_enabled: bool,
    pub ingredient_name: Option<String>,
    pub yeast_free: bool,
    pub allergens: AllergenSet,
    pub unit: String,
    /// kcal per 100 g, only reported in diagnostics
    #[serde(default)]
    pub energy_kcal: f64,
}

impl Product {
    /// Name used in the ingredient list: the override if set, else the catalog name, trimmed
    pub fn display_name(&self) -> String {
        self.label_name().trim().to_string()
    }

    /// Name written when a product has no ingredients at all
    pub fn label_name(&self) -> &str {
        match self.ingredient_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.name,
        }
    }
}

/// One line of a BOM: `quantity` of `component` in `unit` per BOM output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomLine {
    pub component: ProductId,
    pub quantity: f64,
    pub unit: String,
}

/// A bill of materials producing `quantity` `unit` of its parent product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomEntry {
    pub id: i64,
    pub product: ProductId,
    /// Lower sequence wins when a product has several BOMs
    pub sequence: i64,
    pub quantity: f64,
    pub unit: String,
    pub lines: Vec<BomLine>,
}

/// Labeling facts written back onto the top-level product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub ingredient_list: String,
    /// Grams per unit, as computed from the BOM tree
    pub calculated_norm_weight: f64,
    pub norm_weight_diff: f64,
    /// Percent
    pub deviation: f64,
    pub yeast_free: bool,
    pub allergens: AllergenSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, ingredient_name: Option<&str>) -> Product {
        Product {
            id: ProductId(1),
            name: name.to_string(),
            norm_weight: 100.0,
            nutrition_enabled: true,
            ingredient_name: ingredient_name.map(str::to_string),
            yeast_free: true,
            allergens: AllergenSet::new(),
            unit: "g".to_string(),
            energy_kcal: 0.0,
        }
    }

    #[test]
    fn test_display_name_prefers_override() {
        assert_eq!(product("Rye Bread 500g", Some(" Rye flour ")).display_name(), "Rye flour");
        assert_eq!(product(" Salt ", None).display_name(), "Salt");
    }

    #[test]
    fn test_empty_override_falls_back_to_name() {
        assert_eq!(product("Water", Some("")).display_name(), "Water");
        assert_eq!(product("Water", Some("")).label_name(), "Water");
    }

    #[test]
    fn test_product_id_display() {
        assert_eq!(ProductId(7).to_string(), "#7");
    }
}
