//! Unit table and conversion
//!
//! Parses unit strings (including annotated packaging units such as
//! `"bag (250g)"`) and converts quantities within a unit category.

use std::collections::HashMap;

use super::units::{builtin_units, unit_key, UnitCategory, UnitDefinition};
use crate::labeling::{ConversionError, QuantityConversion};

/// Tolerance applied before rounding up, so 2.0000000001 stays 2
const ROUNDING_EPSILON: f64 = 1e-9;

/// A unit string split into its base name and optional annotation
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedUnit {
    pub base_unit: String,
    pub gram_weight: Option<f64>,
    pub ml_amount: Option<f64>,
}

impl ParsedUnit {
    /// Ad-hoc unit described by the annotation, if any
    pub fn annotated_definition(&self, name: &str) -> Option<UnitDefinition> {
        if let Some(grams) = self.gram_weight {
            return Some(UnitDefinition::new(name, UnitCategory::Weight, grams));
        }
        self.ml_amount
            .map(|ml| UnitDefinition::new(name, UnitCategory::Volume, ml))
    }
}

/// Parse a unit string, extracting any gram or ml annotation
///
/// - `"g"` has no annotation
/// - `"bag (250g)"` weighs 250 g per bag
/// - `"bottle (330ml)"` holds 330 ml per bottle
pub fn parse_unit(unit_str: &str) -> ParsedUnit {
    let trimmed = unit_str.trim();

    if let (Some(open), Some(close)) = (trimmed.find('('), trimmed.rfind(')')) {
        if open < close {
            let annotation = &trimmed[open + 1..close];
            return ParsedUnit {
                base_unit: unit_key(&trimmed[..open]),
                gram_weight: parse_annotation(annotation, &["g", "gram", "grams"]),
                ml_amount: parse_annotation(
                    annotation,
                    &["ml", "milliliter", "milliliters", "millilitre", "millilitres"],
                ),
            };
        }
    }

    ParsedUnit {
        base_unit: unit_key(trimmed),
        gram_weight: None,
        ml_amount: None,
    }
}

/// Parse `"250g"`, `"250 g"` or `"250 grams"` style annotations
fn parse_annotation(s: &str, suffixes: &[&str]) -> Option<f64> {
    let lower = s.trim().to_lowercase();
    suffixes.iter().find_map(|suffix| {
        let number = lower.strip_suffix(suffix)?.trim();
        number.parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
    })
}

/// Registry of known units, keyed by normalized name and alias
#[derive(Debug, Clone, Default)]
pub struct UnitTable {
    units: HashMap<String, UnitDefinition>,
}

impl UnitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in weight, volume and count units
    pub fn standard() -> Self {
        let mut table = Self::new();
        for (unit, aliases) in builtin_units() {
            for alias in aliases {
                table.units.insert(unit_key(alias), unit.clone());
            }
            table.register(unit);
        }
        table
    }

    /// Add or replace a unit under its own name
    pub fn register(&mut self, unit: UnitDefinition) {
        self.units.insert(unit_key(&unit.name), unit);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Resolve a unit by name or alias, falling back to its annotation
    pub fn lookup(&self, name: &str) -> Option<UnitDefinition> {
        if let Some(unit) = self.units.get(&unit_key(name)) {
            return Some(unit.clone());
        }
        parse_unit(name).annotated_definition(name.trim())
    }

    fn resolve(&self, name: &str) -> Result<UnitDefinition, ConversionError> {
        self.lookup(name)
            .ok_or_else(|| ConversionError::UnknownUnit(name.to_string()))
    }
}

impl QuantityConversion for UnitTable {
    fn convert(
        &self,
        from_unit: &str,
        quantity: f64,
        to_unit: &str,
        round: bool,
    ) -> Result<f64, ConversionError> {
        let from = self.resolve(from_unit)?;
        let to = self.resolve(to_unit)?;

        if from.category != to.category {
            return Err(ConversionError::IncompatibleUnits {
                from: from_unit.to_string(),
                to: to_unit.to_string(),
            });
        }

        let converted = quantity * from.factor / to.factor;
        if round && to.rounding > 0.0 {
            Ok(round_up(converted, to.rounding))
        } else {
            Ok(converted)
        }
    }
}

/// Round `value` up to a multiple of `precision`
fn round_up(value: f64, precision: f64) -> f64 {
    let steps = value / precision;
    (steps - ROUNDING_EPSILON).ceil() * precision
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(from: &str, quantity: f64, to: &str) -> f64 {
        UnitTable::standard().convert(from, quantity, to, false).unwrap()
    }

    #[test]
    fn test_parse_unit_simple() {
        let parsed = parse_unit(" KG ");
        assert_eq!(parsed.base_unit, "kg");
        assert_eq!(parsed.gram_weight, None);
        assert_eq!(parsed.ml_amount, None);
    }

    #[test]
    fn test_parse_unit_with_gram_annotation() {
        let parsed = parse_unit("bag (250g)");
        assert_eq!(parsed.base_unit, "bag");
        assert_eq!(parsed.gram_weight, Some(250.0));
        assert_eq!(parsed.ml_amount, None);
    }

    #[test]
    fn test_parse_unit_with_ml_annotation() {
        let parsed = parse_unit("bottle (330 ml)");
        assert_eq!(parsed.base_unit, "bottle");
        assert_eq!(parsed.ml_amount, Some(330.0));
    }

    #[test]
    fn test_weight_conversions() {
        assert!((convert("kg", 1.5, "g") - 1500.0).abs() < 1e-9);
        assert!((convert("g", 250.0, "kg") - 0.25).abs() < 1e-12);
        assert!((convert("lb", 1.0, "g") - 453.592).abs() < 1e-9);
        assert!((convert("Gram", 10.0, "g") - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_volume_and_count_conversions() {
        assert!((convert("l", 0.5, "ml") - 500.0).abs() < 1e-9);
        assert!((convert("dozen", 2.0, "each") - 24.0).abs() < 1e-12);
        assert!((convert("pcs", 3.0, "each") - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_annotated_units_convert_within_category() {
        assert!((convert("bag (250g)", 4.0, "kg") - 1.0).abs() < 1e-12);
        assert!((convert("ml", 660.0, "bottle (330ml)") - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_cross_category_is_rejected() {
        let err = UnitTable::standard().convert("ml", 1.0, "g", false).unwrap_err();
        assert_eq!(
            err,
            ConversionError::IncompatibleUnits {
                from: "ml".to_string(),
                to: "g".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_unit() {
        let err = UnitTable::standard().convert("scoop", 1.0, "g", false).unwrap_err();
        assert_eq!(err, ConversionError::UnknownUnit("scoop".to_string()));
    }

    #[test]
    fn test_rounding_goes_up_to_precision() {
        let table = UnitTable::standard();
        let rounded = table.convert("g", 1234.0001, "kg", true).unwrap();
        assert!((rounded - 1.235).abs() < 1e-9);
        let exact = table.convert("g", 2000.0, "kg", true).unwrap();
        assert!((exact - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_registered_units_override() {
        let mut table = UnitTable::standard();
        table.register(UnitDefinition::new("tray", UnitCategory::Count, 30.0));
        assert!((table.convert("tray", 2.0, "each", false).unwrap() - 60.0).abs() < 1e-12);
        assert!(table.lookup("TRAY").is_some());
    }
}
