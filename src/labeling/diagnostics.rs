//! Diagnostic sink
//!
//! Expansion and aggregation report what they do through an injected
//! [`DiagnosticSink`] instead of a module-level logger.

use super::types::ProductId;

/// One structured trace line
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic<'a> {
    /// A BOM was chosen for `product`; `candidates > 1` means others were ignored
    BomSelected {
        depth: usize,
        product: &'a str,
        candidates: usize,
        bom_id: i64,
    },
    QuantityMultiplier {
        depth: usize,
        product: &'a str,
        quantity: f64,
        unit: &'a str,
        bom_quantity: f64,
        bom_unit: &'a str,
        multiplier: f64,
    },
    /// A leaf was folded into the ingredient map
    LeafContribution {
        depth: usize,
        product: &'a str,
        quantity: f64,
        unit: &'a str,
        contribution: f64,
        energy_kcal: f64,
    },
    IngredientWeight { weight: f64, name: &'a str },
    Summary {
        product: &'a str,
        total_weight: f64,
        deviation: f64,
    },
    BatchFailure {
        product: ProductId,
        name: &'a str,
        kind: &'a str,
        message: &'a str,
    },
}

pub trait DiagnosticSink {
    fn record(&self, event: &Diagnostic<'_>);
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn record(&self, event: &Diagnostic<'_>) {
        (**self).record(event)
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _event: &Diagnostic<'_>) {}
}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: &Diagnostic<'_>) {
        match *event {
            Diagnostic::BomSelected { depth, product, candidates, bom_id } if candidates > 1 => {
                tracing::info!(
                    depth,
                    bom_id,
                    candidates,
                    "#{} Multiple BoMs ({}), taking the first",
                    depth,
                    product
                );
            }
            Diagnostic::BomSelected { depth, product, bom_id, .. } => {
                tracing::debug!(depth, bom_id, "#{} Single BoM ({})", depth, product);
            }
            Diagnostic::QuantityMultiplier {
                depth,
                product,
                quantity,
                unit,
                bom_quantity,
                bom_unit,
                multiplier,
            } => {
                tracing::debug!(
                    depth,
                    "{}: qty {} {} | BoM result qty {} {} | multiplier {}",
                    product,
                    quantity,
                    unit,
                    bom_quantity,
                    bom_unit,
                    multiplier
                );
            }
            Diagnostic::LeafContribution {
                depth,
                product,
                quantity,
                unit,
                contribution,
                energy_kcal,
            } => {
                tracing::debug!(
                    depth,
                    contribution,
                    "Facts: {} {} ({} kcal) of {}",
                    quantity,
                    unit,
                    energy_kcal,
                    product
                );
            }
            Diagnostic::IngredientWeight { weight, name } => {
                tracing::debug!("{:.2} g of {}", weight, name);
            }
            Diagnostic::Summary { product, total_weight, deviation } => {
                tracing::debug!(
                    "{}: total norm weight {:.2} g, deviation {:.2}%",
                    product,
                    total_weight,
                    deviation
                );
            }
            Diagnostic::BatchFailure { product, name, kind, message } => {
                tracing::error!(product = product.0, kind, "Labeling failed for {}: {}", name, message);
            }
        }
    }
}
