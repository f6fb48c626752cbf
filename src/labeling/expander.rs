//! BOM expansion
//!
//! Walks a product's bill of materials down to its leaf ingredients,
//! carrying quantities across unit boundaries, and folds every leaf into an
//! [`IngredientMap`].

use super::catalog::Catalog;
use super::conversion::{same_unit, QuantityConversion};
use super::diagnostics::{Diagnostic, DiagnosticSink};
use super::error::{LabelingError, LabelingResult};
use super::ingredients::IngredientMap;
use super::types::{BomEntry, Product, ProductId};

/// Nesting limit used when none is configured
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Tuning knobs for expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelingOptions {
    /// Deepest BOM level that may still be expanded; level 0 is the top product
    pub max_depth: usize,
}

impl Default for LabelingOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Recursive BOM expander for one top-level product
pub struct Expander<'a, C: ?Sized, Q: ?Sized, D: ?Sized> {
    catalog: &'a C,
    conversion: &'a Q,
    sink: &'a D,
    max_depth: usize,
    /// Products currently being expanded, outermost first
    path: Vec<ProductId>,
}

impl<'a, C, Q, D> Expander<'a, C, Q, D>
where
    C: Catalog + ?Sized,
    Q: QuantityConversion + ?Sized,
    D: DiagnosticSink + ?Sized,
{
    pub fn new(catalog: &'a C, conversion: &'a Q, sink: &'a D) -> Self {
        Self {
            catalog,
            conversion,
            sink,
            max_depth: DEFAULT_MAX_DEPTH,
            path: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: LabelingOptions) -> Self {
        self.max_depth = options.max_depth;
        self
    }

    /// Expand `quantity` `unit` of `product` into `ingredients`.
    ///
    /// The map is moved in and handed back so a single owner threads it
    /// through every recursive call in BOM line order.
    pub fn expand(
        &mut self,
        product: &Product,
        quantity: f64,
        unit: &str,
        depth: usize,
        ingredients: IngredientMap,
    ) -> LabelingResult<IngredientMap> {
        if !product.nutrition_enabled {
            return Err(LabelingError::NutritionNotActivated {
                product: product.id,
                name: product.name.clone(),
            });
        }

        if self.path.contains(&product.id) {
            let mut path = self.path.clone();
            path.push(product.id);
            return Err(LabelingError::CycleDetected {
                product: product.id,
                name: product.name.clone(),
                path,
            });
        }

        if depth > self.max_depth {
            return Err(LabelingError::DepthExceeded {
                product: product.id,
                name: product.name.clone(),
                max_depth: self.max_depth,
            });
        }

        let boms = self.catalog.bom_entries(product)?;
        let Some(bom) = boms.first() else {
            return self.accumulate(product, quantity, unit, depth, ingredients);
        };

        self.sink.record(&Diagnostic::BomSelected {
            depth,
            product: &product.name,
            candidates: boms.len(),
            bom_id: bom.id,
        });

        let multiplier = self.multiplier(product, bom, quantity, unit, depth)?;

        self.path.push(product.id);
        let result = self.expand_lines(bom, multiplier, depth, ingredients);
        self.path.pop();
        result
    }

    /// Ratio between the requested quantity and what one run of `bom` yields
    fn multiplier(
        &self,
        product: &Product,
        bom: &BomEntry,
        quantity: f64,
        unit: &str,
        depth: usize,
    ) -> LabelingResult<f64> {
        let bom_quantity = if same_unit(unit, &bom.unit) {
            bom.quantity
        } else {
            self.conversion.convert(&bom.unit, bom.quantity, unit, false)?
        };

        if !bom_quantity.is_finite() || bom_quantity <= 0.0 {
            return Err(LabelingError::MalformedBom {
                product: product.id,
                name: product.name.clone(),
                bom_id: bom.id,
                reason: format!(
                    "output quantity must be greater than 0, got {} {}",
                    bom_quantity, unit
                ),
            });
        }

        let multiplier = quantity / bom_quantity;
        self.sink.record(&Diagnostic::QuantityMultiplier {
            depth,
            product: &product.name,
            quantity,
            unit,
            bom_quantity,
            bom_unit: &bom.unit,
            multiplier,
        });
        Ok(multiplier)
    }

    fn expand_lines(
        &mut self,
        bom: &BomEntry,
        multiplier: f64,
        depth: usize,
        mut ingredients: IngredientMap,
    ) -> LabelingResult<IngredientMap> {
        for line in &bom.lines {
            let component = self.catalog.product(line.component)?;
            let partial_quantity = line.quantity * multiplier;
            ingredients = self.expand(
                &component,
                partial_quantity,
                &line.unit,
                depth + 1,
                ingredients,
            )?;
        }
        Ok(ingredients)
    }

    /// Fold a leaf product into the map
    fn accumulate(
        &self,
        product: &Product,
        quantity: f64,
        unit: &str,
        depth: usize,
        mut ingredients: IngredientMap,
    ) -> LabelingResult<IngredientMap> {
        if !(product.norm_weight > 0.0) {
            return Err(LabelingError::InvalidNormWeight {
                product: product.id,
                name: product.name.clone(),
                norm_weight: product.norm_weight,
            });
        }

        let quantity = if same_unit(unit, &product.unit) {
            quantity
        } else {
            self.conversion.convert(unit, quantity, &product.unit, false)?
        };

        // In units of 100 g, matching energy_kcal; the map takes plain grams.
        let contribution = product.norm_weight * quantity / 100.0;
        self.sink.record(&Diagnostic::LeafContribution {
            depth,
            product: &product.name,
            quantity,
            unit: &product.unit,
            contribution,
            energy_kcal: product.energy_kcal * contribution,
        });

        ingredients.accumulate(product, product.norm_weight * quantity);
        Ok(ingredients)
    }
}
