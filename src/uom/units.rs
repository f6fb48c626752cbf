//! Unit definitions and conversion constants
//!
//! Every unit belongs to a category and carries a factor expressing one unit
//! in the category's reference unit (g, ml, each).

use serde::{Deserialize, Serialize};

/// Category of a unit of measure; conversions never cross categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    /// Reference unit: gram
    Weight,
    /// Reference unit: milliliter
    Volume,
    /// Reference unit: each
    Count,
}

impl UnitCategory {
    pub fn reference_unit(&self) -> &'static str {
        match self {
            UnitCategory::Weight => "g",
            UnitCategory::Volume => "ml",
            UnitCategory::Count => "each",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "weight" => Some(UnitCategory::Weight),
            "volume" => Some(UnitCategory::Volume),
            "count" => Some(UnitCategory::Count),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            UnitCategory::Weight => "weight",
            UnitCategory::Volume => "volume",
            UnitCategory::Count => "count",
        }
    }
}

/// A unit of measure known to the conversion table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub name: String,
    pub category: UnitCategory,
    /// Reference units in one of this unit
    pub factor: f64,
    /// Precision used when a caller asks for rounded quantities
    pub rounding: f64,
}

impl UnitDefinition {
    pub fn new(name: &str, category: UnitCategory, factor: f64) -> Self {
        Self {
            name: name.to_string(),
            category,
            factor,
            rounding: DEFAULT_ROUNDING,
        }
    }
}

/// Rounding precision of built-in units
pub const DEFAULT_ROUNDING: f64 = 0.001;

// ============================================================================
// Weight (to grams)
// ============================================================================

pub const G_PER_MG: f64 = 0.001;
pub const G_PER_KG: f64 = 1000.0;
pub const G_PER_T: f64 = 1_000_000.0;
pub const G_PER_OZ: f64 = 28.3495;
pub const G_PER_LB: f64 = 453.592;

// ============================================================================
// Volume (to milliliters)
// ============================================================================

pub const ML_PER_CL: f64 = 10.0;
pub const ML_PER_DL: f64 = 100.0;
pub const ML_PER_LITER: f64 = 1000.0;
pub const ML_PER_TSP: f64 = 4.92892;
pub const ML_PER_TBSP: f64 = 14.7868;
pub const ML_PER_FL_OZ: f64 = 29.5735;
pub const ML_PER_CUP: f64 = 236.588;

// ============================================================================
// Count (to each)
// ============================================================================

pub const EACH_PER_DOZEN: f64 = 12.0;

/// Canonical name, category, factor and aliases of every built-in unit
const BUILTIN_UNITS: &[(&str, UnitCategory, f64, &[&str])] = &[
    ("g", UnitCategory::Weight, 1.0, &["gram", "grams"]),
    ("mg", UnitCategory::Weight, G_PER_MG, &["milligram", "milligrams"]),
    ("kg", UnitCategory::Weight, G_PER_KG, &["kilogram", "kilograms"]),
    ("t", UnitCategory::Weight, G_PER_T, &["tonne", "tonnes"]),
    ("oz", UnitCategory::Weight, G_PER_OZ, &["ounce", "ounces"]),
    ("lb", UnitCategory::Weight, G_PER_LB, &["lbs", "pound", "pounds"]),
    ("ml", UnitCategory::Volume, 1.0, &["milliliter", "milliliters", "millilitre", "millilitres"]),
    ("cl", UnitCategory::Volume, ML_PER_CL, &["centiliter", "centilitre"]),
    ("dl", UnitCategory::Volume, ML_PER_DL, &["deciliter", "decilitre"]),
    ("l", UnitCategory::Volume, ML_PER_LITER, &["liter", "liters", "litre", "litres"]),
    ("tsp", UnitCategory::Volume, ML_PER_TSP, &["teaspoon", "teaspoons"]),
    ("tbsp", UnitCategory::Volume, ML_PER_TBSP, &["tablespoon", "tablespoons"]),
    ("fl oz", UnitCategory::Volume, ML_PER_FL_OZ, &["floz", "fluid ounce", "fluid ounces"]),
    ("cup", UnitCategory::Volume, ML_PER_CUP, &["cups"]),
    ("each", UnitCategory::Count, 1.0, &["unit", "units", "piece", "pieces", "pc", "pcs", "count", "stk"]),
    ("dozen", UnitCategory::Count, EACH_PER_DOZEN, &["dozens"]),
];

/// Built-in units with their aliases, canonical name first
pub fn builtin_units() -> impl Iterator<Item = (UnitDefinition, &'static [&'static str])> {
    BUILTIN_UNITS
        .iter()
        .map(|&(name, category, factor, aliases)| (UnitDefinition::new(name, category, factor), aliases))
}

/// Normalized lookup key for a unit name
pub fn unit_key(name: &str) -> String {
    name.trim().to_lowercase()
}
