//! Labeling MCP Tools
//!
//! Run the labeling core against the SQLite catalog.

use serde::Serialize;

use crate::db::{Database, SqliteCatalog};
use crate::labeling::{
    batch_compute_ids, compute_labeling, preview_labeling, BatchFailure, Catalog, LabelingOptions,
    ProductId, ResultRecord, TracingSink,
};
use crate::models::{load_unit_table, Allergen, CatalogProduct};

/// Labeling result for one product
#[derive(Debug, Serialize)]
pub struct LabelingResponse {
    pub product_id: i64,
    pub product_name: String,
    /// Whether the result was written back onto the product
    pub saved: bool,
    #[serde(flatten)]
    pub record: ResultRecord,
    pub allergen_names: Vec<String>,
}

/// One successful product of a batch
#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub product_id: i64,
    pub product_name: String,
    pub calculated_norm_weight: f64,
    pub deviation: f64,
}

/// Response for batch_labeling
#[derive(Debug, Serialize)]
pub struct BatchLabelingResponse {
    pub processed: usize,
    pub succeeded: Vec<BatchItem>,
    pub failed: Vec<BatchFailure>,
}

fn allergen_names(conn: &rusqlite::Connection, record: &ResultRecord) -> Result<Vec<String>, String> {
    let all = Allergen::list(conn).map_err(|e| format!("Failed to list allergens: {}", e))?;
    Ok(all
        .into_iter()
        .filter(|a| record.allergens.iter().any(|id| id.0 == a.id))
        .map(|a| a.name)
        .collect())
}

/// Compute the labeling of one product; with `save` the result is stored
pub fn label_product(
    db: &Database,
    options: LabelingOptions,
    product_id: i64,
    save: bool,
) -> Result<LabelingResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let units = load_unit_table(&conn).map_err(|e| format!("Failed to load units: {}", e))?;
    let catalog = SqliteCatalog::new(&conn);
    let product = catalog
        .product(ProductId(product_id))
        .map_err(|e| e.to_string())?;

    let outcome = if save {
        compute_labeling(&catalog, &units, &TracingSink, options, &product)
    } else {
        preview_labeling(&catalog, &units, &TracingSink, options, &product)
    };
    let record = outcome.map_err(|e| format!("{}: {}", e.kind(), e))?;

    if save {
        tracing::info!(
            "Labeled product {} '{}': {:.2} g, deviation {:.2}%",
            product_id,
            product.name,
            record.calculated_norm_weight,
            record.deviation
        );
    }

    let allergen_names = allergen_names(&conn, &record)?;

    Ok(LabelingResponse {
        product_id,
        product_name: product.name,
        saved: save,
        record,
        allergen_names,
    })
}

/// Compute and store labeling for `product_ids`, or for every enabled product
/// when the list is empty. Failures are reported per product.
pub fn batch_labeling(
    db: &Database,
    options: LabelingOptions,
    product_ids: Vec<i64>,
) -> Result<BatchLabelingResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let ids = if product_ids.is_empty() {
        CatalogProduct::nutrition_enabled_ids(&conn)
            .map_err(|e| format!("Failed to list products: {}", e))?
    } else {
        product_ids
    };
    let ids: Vec<ProductId> = ids.into_iter().map(ProductId).collect();

    let units = load_unit_table(&conn).map_err(|e| format!("Failed to load units: {}", e))?;
    let catalog = SqliteCatalog::new(&conn);
    let report = batch_compute_ids(&catalog, &units, &TracingSink, options, &ids);

    tracing::info!(
        "Batch labeling: {} processed, {} failed",
        report.processed(),
        report.failed.len()
    );

    Ok(BatchLabelingResponse {
        processed: report.processed(),
        succeeded: report
            .succeeded
            .into_iter()
            .map(|s| BatchItem {
                product_id: s.product_id.0,
                product_name: s.product_name,
                calculated_norm_weight: s.record.calculated_norm_weight,
                deviation: s.record.deviation,
            })
            .collect(),
        failed: report.failed,
    })
}
