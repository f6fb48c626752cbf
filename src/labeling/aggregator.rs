//! Nutrition aggregation
//!
//! Turns a finished [`IngredientMap`] into the labeling facts of the
//! top-level product: total weight, deviation from the declared norm weight,
//! combined allergens and the formatted ingredient list.

use super::diagnostics::{Diagnostic, DiagnosticSink};
use super::error::{LabelingError, LabelingResult};
use super::ingredients::{Accumulator, IngredientMap};
use super::types::{AllergenSet, Product, ResultRecord};

/// Percentages are only printed while |deviation| stays within this bound
pub const PERCENTAGE_DEVIATION_LIMIT: f64 = 20.0;

const STRONG_OPEN: &str = "<strong>";
const STRONG_CLOSE: &str = "</strong>";

pub struct Aggregator<'a, D: ?Sized> {
    sink: &'a D,
}

impl<'a, D: DiagnosticSink + ?Sized> Aggregator<'a, D> {
    pub fn new(sink: &'a D) -> Self {
        Self { sink }
    }

    /// Consume `ingredients` and compute the result record for `product`
    pub fn aggregate(
        &self,
        product: &Product,
        ingredients: IngredientMap,
    ) -> LabelingResult<ResultRecord> {
        if !(product.norm_weight > 0.0) {
            return Err(LabelingError::InvalidNormWeight {
                product: product.id,
                name: product.name.clone(),
                norm_weight: product.norm_weight,
            });
        }

        let total_weight = ingredients.total_weight();
        let mut allergens = AllergenSet::new();
        let mut yeast_free = true;
        for entry in ingredients.iter() {
            allergens.extend(entry.allergens.iter().copied());
            yeast_free &= entry.yeast_free;
        }

        // Stable: equal weights keep first-encountered order
        let mut entries = ingredients.into_entries();
        entries.sort_by(|a, b| b.accumulated_weight.total_cmp(&a.accumulated_weight));

        let norm_weight_diff = total_weight - product.norm_weight;
        let deviation = (total_weight / product.norm_weight - 1.0) * 100.0;
        let show_percentage = shows_percentage(deviation);

        let names: Vec<String> = entries
            .iter()
            .map(|entry| {
                let name = format_ingredient(entry, total_weight, show_percentage);
                self.sink.record(&Diagnostic::IngredientWeight {
                    weight: entry.accumulated_weight,
                    name: &name,
                });
                name
            })
            .collect();

        self.sink.record(&Diagnostic::Summary {
            product: &product.name,
            total_weight,
            deviation,
        });

        let ingredient_list = if names.is_empty() {
            product.label_name().to_string()
        } else {
            names.join(", ")
        };

        Ok(ResultRecord {
            ingredient_list,
            calculated_norm_weight: total_weight,
            norm_weight_diff,
            deviation,
            yeast_free,
            allergens,
        })
    }
}

/// Whether a deviation is small enough for per-ingredient percentages
pub fn shows_percentage(deviation: f64) -> bool {
    deviation.abs() <= PERCENTAGE_DEVIATION_LIMIT
}

/// Render one ingredient name with allergen emphasis
pub fn format_ingredient(entry: &Accumulator, total_weight: f64, show_percentage: bool) -> String {
    let name = &entry.display_name;
    if entry.allergens.is_empty() {
        return name.clone();
    }

    if name.contains('*') {
        return emphasize_segments(name);
    }

    if show_percentage && total_weight > 0.0 {
        let percent = (entry.accumulated_weight / total_weight * 100.0).round() as i64;
        format!("{STRONG_OPEN}{name} ({percent}%){STRONG_CLOSE}")
    } else {
        format!("{STRONG_OPEN}{name}{STRONG_CLOSE}")
    }
}

/// `Wheat*Flour, Rye*Flour` style names: every `*` segment without a comma or
/// space is emphasized, the rest is connective text.
pub fn emphasize_segments(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2 * STRONG_OPEN.len());
    for segment in name.split('*') {
        if segment.contains(',') || segment.contains(' ') {
            out.push_str(segment);
        } else if !segment.is_empty() {
            out.push_str(STRONG_OPEN);
            out.push_str(segment);
            out.push_str(STRONG_CLOSE);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeling::diagnostics::testing::RecordingSink;
    use crate::labeling::diagnostics::NullSink;
    use crate::labeling::types::{AllergenId, ProductId};

    fn product(id: i64, name: &str, norm_weight: f64, allergens: &[i64], yeast_free: bool) -> Product {
        Product {
            id: ProductId(id),
            name: name.to_string(),
            norm_weight,
            nutrition_enabled: true,
            ingredient_name: None,
            yeast_free,
            allergens: allergens.iter().copied().map(AllergenId).collect(),
            unit: "g".to_string(),
            energy_kcal: 0.0,
        }
    }

    fn map(items: &[(Product, f64)]) -> IngredientMap {
        let mut map = IngredientMap::new();
        for (leaf, weight) in items {
            map.accumulate(leaf, *weight);
        }
        map
    }

    fn aggregate(top: &Product, ingredients: IngredientMap) -> ResultRecord {
        Aggregator::new(&NullSink).aggregate(top, ingredients).unwrap()
    }

    #[test]
    fn test_sorted_by_weight_with_percentages() {
        let top = product(1, "Bread", 100.0, &[], true);
        let ingredients = map(&[
            (product(2, "Water", 1.0, &[], true), 35.0),
            (product(3, "Wheat flour", 1.0, &[1], true), 60.0),
            (product(4, "Salt", 1.0, &[], true), 5.0),
        ]);

        let record = aggregate(&top, ingredients);
        assert_eq!(
            record.ingredient_list,
            "<strong>Wheat flour (60%)</strong>, Water, Salt"
        );
        assert!((record.calculated_norm_weight - 100.0).abs() < 1e-9);
        assert!(record.deviation.abs() < 1e-9);
    }

    #[test]
    fn test_diff_and_deviation_identities() {
        let top = product(1, "Bread", 80.0, &[], true);
        let record = aggregate(&top, map(&[(product(2, "Flour", 1.0, &[], true), 92.0)]));

        assert_eq!(record.norm_weight_diff, record.calculated_norm_weight - 80.0);
        assert!((record.deviation - record.norm_weight_diff / 80.0 * 100.0).abs() < 1e-9);
        assert!((record.deviation - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentage_boundary_is_inclusive() {
        assert!(shows_percentage(20.0));
        assert!(shows_percentage(-20.0));
        assert!(!shows_percentage(20.000001));
        assert!(!shows_percentage(-35.0));

        // total 120 against a norm of 100 is exactly +20%
        let top = product(1, "Bread", 100.0, &[], true);
        let record = aggregate(&top, map(&[(product(2, "Rye", 1.0, &[1], true), 120.0)]));
        assert!((record.deviation - 20.0).abs() < 1e-9);
        assert_eq!(record.ingredient_list, "<strong>Rye (100%)</strong>");
    }

    #[test]
    fn test_large_deviation_hides_percentages() {
        let top = product(1, "Bread", 100.0, &[], true);
        let record = aggregate(&top, map(&[(product(2, "Rye", 1.0, &[1], true), 200.0)]));
        assert!((record.deviation - 100.0).abs() < 1e-9);
        assert_eq!(record.ingredient_list, "<strong>Rye</strong>");
    }

    #[test]
    fn test_equal_weights_keep_insertion_order() {
        let top = product(1, "Mix", 30.0, &[], true);
        let ingredients = map(&[
            (product(2, "Oats", 1.0, &[], true), 10.0),
            (product(3, "Barley", 1.0, &[], true), 10.0),
            (product(4, "Spelt", 1.0, &[], true), 10.0),
        ]);
        assert_eq!(aggregate(&top, ingredients).ingredient_list, "Oats, Barley, Spelt");
    }

    #[test]
    fn test_allergens_union_and_yeast_flag() {
        let top = product(1, "Roll", 30.0, &[], true);
        let ingredients = map(&[
            (product(2, "Flour", 1.0, &[1, 2], true), 20.0),
            (product(3, "Yeast", 1.0, &[3], false), 10.0),
        ]);
        let record = aggregate(&top, ingredients);
        assert_eq!(
            record.allergens,
            [AllergenId(1), AllergenId(2), AllergenId(3)].into_iter().collect()
        );
        assert!(!record.yeast_free);

        let record = aggregate(&top, map(&[(product(2, "Flour", 1.0, &[], true), 30.0)]));
        assert!(record.yeast_free);
        assert!(record.allergens.is_empty());
    }

    #[test]
    fn test_compound_names() {
        assert_eq!(emphasize_segments("Wheat*Flour,Rye"), "<strong>Wheat</strong>Flour,Rye");
        assert_eq!(
            emphasize_segments("Wheat*flour, *Rye*flour"),
            "<strong>Wheat</strong>flour, <strong>Rye</strong><strong>flour</strong>"
        );
        assert_eq!(emphasize_segments("*Milk* powder"), "<strong>Milk</strong> powder");
    }

    #[test]
    fn test_empty_segments_are_not_wrapped() {
        // A leading, trailing or doubled `*` never yields an empty <strong></strong>.
        assert_eq!(emphasize_segments("*Milk"), "<strong>Milk</strong>");
        assert_eq!(emphasize_segments("Milk*"), "<strong>Milk</strong>");
        assert_eq!(emphasize_segments("Egg**Milk"), "<strong>Egg</strong><strong>Milk</strong>");
        assert!(!emphasize_segments("*Milk* powder").contains("<strong></strong>"));
    }

    #[test]
    fn test_compound_allergen_name_never_gets_percentage() {
        let top = product(1, "Bread", 100.0, &[], true);
        let mut flour = product(2, "Flour", 1.0, &[1], true);
        flour.ingredient_name = Some("Wheat*Flour,Rye".to_string());
        let record = aggregate(&top, map(&[(flour, 100.0)]));
        assert_eq!(record.ingredient_list, "<strong>Wheat</strong>Flour,Rye");
    }

    #[test]
    fn test_empty_map_falls_back_to_product_name() {
        let mut top = product(1, "Mineral water 1l", 100.0, &[], true);
        let record = aggregate(&top, IngredientMap::new());
        assert_eq!(record.ingredient_list, "Mineral water 1l");
        assert!((record.deviation + 100.0).abs() < 1e-9);

        top.ingredient_name = Some("Mineral water".to_string());
        assert_eq!(aggregate(&top, IngredientMap::new()).ingredient_list, "Mineral water");
    }

    #[test]
    fn test_top_level_norm_weight_must_be_positive() {
        let top = product(1, "Bread", 0.0, &[], true);
        let err = Aggregator::new(&NullSink)
            .aggregate(&top, map(&[(product(2, "Flour", 1.0, &[], true), 10.0)]))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_norm_weight");
    }

    #[test]
    fn test_reports_each_ingredient() {
        let top = product(1, "Bread", 100.0, &[], true);
        let sink = RecordingSink::default();
        Aggregator::new(&sink)
            .aggregate(
                &top,
                map(&[
                    (product(2, "Flour", 1.0, &[], true), 70.0),
                    (product(3, "Water", 1.0, &[], true), 30.0),
                ]),
            )
            .unwrap();
        assert_eq!(sink.count("IngredientWeight"), 2);
        assert_eq!(sink.count("Summary"), 1);
    }
}
