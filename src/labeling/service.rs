//! Labeling orchestration
//!
//! One product: expand one unit in its own unit of measure, aggregate, write
//! back. Batches isolate every product so one failure never stops the rest.

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use super::aggregator::Aggregator;
use super::catalog::Catalog;
use super::conversion::QuantityConversion;
use super::diagnostics::{Diagnostic, DiagnosticSink};
use super::error::{LabelingError, LabelingResult};
use super::expander::{Expander, LabelingOptions};
use super::ingredients::IngredientMap;
use super::types::{Product, ProductId, ResultRecord};

/// Compute the labeling facts of `product` without persisting them
pub fn preview_labeling<C, Q, D>(
    catalog: &C,
    conversion: &Q,
    sink: &D,
    options: LabelingOptions,
    product: &Product,
) -> LabelingResult<ResultRecord>
where
    C: Catalog + ?Sized,
    Q: QuantityConversion + ?Sized,
    D: DiagnosticSink + ?Sized,
{
    let ingredients = Expander::new(catalog, conversion, sink)
        .with_options(options)
        .expand(product, 1.0, &product.unit, 0, IngredientMap::new())?;
    Aggregator::new(sink).aggregate(product, ingredients)
}

/// Compute the labeling facts of `product` and write them to the catalog
pub fn compute_labeling<C, Q, D>(
    catalog: &C,
    conversion: &Q,
    sink: &D,
    options: LabelingOptions,
    product: &Product,
) -> LabelingResult<ResultRecord>
where
    C: Catalog + ?Sized,
    Q: QuantityConversion + ?Sized,
    D: DiagnosticSink + ?Sized,
{
    let record = preview_labeling(catalog, conversion, sink, options, product)?;
    catalog.write_result(product, &record)?;
    Ok(record)
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSuccess {
    pub product_id: ProductId,
    pub product_name: String,
    pub record: ResultRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub product_id: ProductId,
    pub product_name: String,
    /// `LabelingError::kind()`, or `panic`
    pub kind: String,
    pub message: String,
}

/// Outcome of a batch, in input order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<BatchSuccess>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failure(&self, id: ProductId) -> Option<&BatchFailure> {
        self.failed.iter().find(|f| f.product_id == id)
    }

    pub fn success(&self, id: ProductId) -> Option<&BatchSuccess> {
        self.succeeded.iter().find(|s| s.product_id == id)
    }

    fn record_failure<D: DiagnosticSink + ?Sized>(&mut self, sink: &D, failure: BatchFailure) {
        sink.record(&Diagnostic::BatchFailure {
            product: failure.product_id,
            name: &failure.product_name,
            kind: &failure.kind,
            message: &failure.message,
        });
        self.failed.push(failure);
    }
}

/// Label every product in `products`, collecting failures instead of stopping
pub fn batch_compute<C, Q, D>(
    catalog: &C,
    conversion: &Q,
    sink: &D,
    options: LabelingOptions,
    products: &[Product],
) -> BatchReport
where
    C: Catalog + ?Sized,
    Q: QuantityConversion + ?Sized,
    D: DiagnosticSink + ?Sized,
{
    let mut report = BatchReport::default();
    for product in products {
        run_isolated(&mut report, catalog, conversion, sink, options, product);
    }
    report
}

/// Like [`batch_compute`], loading each product from the catalog first.
/// Unknown ids are recorded as failures.
pub fn batch_compute_ids<C, Q, D>(
    catalog: &C,
    conversion: &Q,
    sink: &D,
    options: LabelingOptions,
    ids: &[ProductId],
) -> BatchReport
where
    C: Catalog + ?Sized,
    Q: QuantityConversion + ?Sized,
    D: DiagnosticSink + ?Sized,
{
    let mut report = BatchReport::default();
    for &id in ids {
        match catalog.product(id) {
            Ok(product) => run_isolated(&mut report, catalog, conversion, sink, options, &product),
            Err(e) => {
                let err = LabelingError::from(e);
                report.record_failure(
                    sink,
                    BatchFailure {
                        product_id: id,
                        product_name: String::new(),
                        kind: err.kind().to_string(),
                        message: err.to_string(),
                    },
                );
            }
        }
    }
    report
}

fn run_isolated<C, Q, D>(
    report: &mut BatchReport,
    catalog: &C,
    conversion: &Q,
    sink: &D,
    options: LabelingOptions,
    product: &Product,
) where
    C: Catalog + ?Sized,
    Q: QuantityConversion + ?Sized,
    D: DiagnosticSink + ?Sized,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        compute_labeling(catalog, conversion, sink, options, product)
    }));

    let (kind, message) = match outcome {
        Ok(Ok(record)) => {
            report.succeeded.push(BatchSuccess {
                product_id: product.id,
                product_name: product.name.clone(),
                record,
            });
            return;
        }
        Ok(Err(e)) => (e.kind().to_string(), e.to_string()),
        Err(payload) => ("panic".to_string(), panic_message(payload.as_ref())),
    };

    report.record_failure(
        sink,
        BatchFailure {
            product_id: product.id,
            product_name: product.name.clone(),
            kind,
            message,
        },
    );
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeling::catalog::{CatalogError, MemoryCatalog};
    use crate::labeling::diagnostics::testing::RecordingSink;
    use crate::labeling::diagnostics::NullSink;
    use crate::labeling::types::{AllergenId, AllergenSet, BomEntry, BomLine};
    use crate::uom::UnitTable;

    fn product(id: i64, name: &str, norm_weight: f64, unit: &str) -> Product {
        Product {
            id: ProductId(id),
            name: name.to_string(),
            norm_weight,
            nutrition_enabled: true,
            ingredient_name: None,
            yeast_free: true,
            allergens: AllergenSet::new(),
            unit: unit.to_string(),
            energy_kcal: 0.0,
        }
    }

    fn single_line_bom(id: i64, parent: i64, quantity: f64, unit: &str, line: (i64, f64, &str)) -> BomEntry {
        BomEntry {
            id,
            product: ProductId(parent),
            sequence: 10,
            quantity,
            unit: unit.to_string(),
            lines: vec![BomLine {
                component: ProductId(line.0),
                quantity: line.1,
                unit: line.2.to_string(),
            }],
        }
    }

    #[test]
    fn test_end_to_end_deviation_hides_percentage() {
        // Top product declares 100 g. Its BoM yields 50 g from 50 sesame
        // units, so one gram of bun delivers exactly one unit to the leaf.
        let mut catalog = MemoryCatalog::new();
        catalog.insert_product(product(1, "Bun", 100.0, "g"));
        let mut sesame = product(2, "Sesame", 200.0, "each");
        sesame.allergens.insert(AllergenId(11));
        catalog.insert_product(sesame);
        catalog.add_bom(single_line_bom(1, 1, 50.0, "g", (2, 50.0, "each")));

        let units = UnitTable::standard();
        let top = catalog.product(ProductId(1)).unwrap();
        let record = compute_labeling(&catalog, &units, &NullSink, LabelingOptions::default(), &top).unwrap();

        assert!((record.calculated_norm_weight - 200.0).abs() < 1e-9);
        assert!((record.deviation - 100.0).abs() < 1e-9);
        assert!((record.norm_weight_diff - 100.0).abs() < 1e-9);
        assert_eq!(record.ingredient_list, "<strong>Sesame</strong>");
        assert_eq!(catalog.result(ProductId(1)), Some(record));
    }

    #[test]
    fn test_preview_does_not_write() {
        let mut catalog = MemoryCatalog::new();
        catalog.insert_product(product(1, "Salt", 100.0, "g"));
        let units = UnitTable::standard();
        let top = catalog.product(ProductId(1)).unwrap();

        let record = preview_labeling(&catalog, &units, &NullSink, LabelingOptions::default(), &top).unwrap();
        assert_eq!(record.ingredient_list, "Salt");
        assert_eq!(catalog.results_written(), 0);
    }

    #[test]
    fn test_batch_isolates_invalid_norm_weight() {
        let mut catalog = MemoryCatalog::new();
        catalog.insert_product(product(1, "Salt", 100.0, "g"));
        catalog.insert_product(product(2, "Pepper", 0.0, "g"));
        catalog.insert_product(product(3, "Sugar", 100.0, "g"));
        let products: Vec<Product> = (1..=3)
            .map(|id| catalog.product(ProductId(id)).unwrap())
            .collect();

        let units = UnitTable::standard();
        let sink = RecordingSink::default();
        let report = batch_compute(&catalog, &units, &sink, LabelingOptions::default(), &products);

        assert_eq!(report.processed(), 3);
        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failure(ProductId(2)).unwrap().kind, "invalid_norm_weight");
        assert!(catalog.result(ProductId(1)).is_some());
        assert!(catalog.result(ProductId(2)).is_none());
        assert!(catalog.result(ProductId(3)).is_some());
        assert_eq!(sink.count("BatchFailure"), 1);
    }

    #[test]
    fn test_batch_by_id_records_unknown_products() {
        let mut catalog = MemoryCatalog::new();
        catalog.insert_product(product(1, "Salt", 100.0, "g"));
        let mut disabled = product(2, "Pepper", 100.0, "g");
        disabled.nutrition_enabled = false;
        catalog.insert_product(disabled);

        let units = UnitTable::standard();
        let report = batch_compute_ids(
            &catalog,
            &units,
            &NullSink,
            LabelingOptions::default(),
            &[ProductId(1), ProductId(2), ProductId(99)],
        );

        assert!(report.success(ProductId(1)).is_some());
        assert_eq!(report.failure(ProductId(2)).unwrap().kind, "nutrition_not_activated");
        assert_eq!(report.failure(ProductId(99)).unwrap().kind, "catalog_error");
        assert!(!report.is_clean());
    }

    /// Panics on write, to check the batch keeps going
    struct ExplodingCatalog(MemoryCatalog);

    impl Catalog for ExplodingCatalog {
        fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
            self.0.product(id)
        }

        fn bom_entries(&self, product: &Product) -> Result<Vec<BomEntry>, CatalogError> {
            self.0.bom_entries(product)
        }

        fn write_result(&self, product: &Product, record: &ResultRecord) -> Result<(), CatalogError> {
            if product.id == ProductId(1) {
                panic!("storage went away");
            }
            self.0.write_result(product, record)
        }
    }

    #[test]
    fn test_batch_survives_panics() {
        let mut inner = MemoryCatalog::new();
        inner.insert_product(product(1, "Salt", 100.0, "g"));
        inner.insert_product(product(2, "Sugar", 100.0, "g"));
        let catalog = ExplodingCatalog(inner);
        let products = vec![
            catalog.product(ProductId(1)).unwrap(),
            catalog.product(ProductId(2)).unwrap(),
        ];

        let units = UnitTable::standard();
        let report = batch_compute(&catalog, &units, &NullSink, LabelingOptions::default(), &products);

        let failure = report.failure(ProductId(1)).unwrap();
        assert_eq!(failure.kind, "panic");
        assert_eq!(failure.message, "storage went away");
        assert!(report.success(ProductId(2)).is_some());
    }
}
