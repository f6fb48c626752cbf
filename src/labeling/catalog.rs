//! Catalog seam
//!
//! Product and BOM lookup plus result write-back. The SQLite implementation
//! lives in `crate::db::SqliteCatalog`; [`MemoryCatalog`] keeps everything in
//! maps for embedding and tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use super::types::{BomEntry, Product, ProductId, ResultRecord};

/// Failures of the catalog backend
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    #[error("Catalog storage error: {0}")]
    Storage(String),
}

/// Product catalog consumed by the labeling core
pub trait Catalog {
    fn product(&self, id: ProductId) -> Result<Product, CatalogError>;

    /// BOMs of `product`, ordered by priority (sequence, then id). Empty for a leaf.
    fn bom_entries(&self, product: &Product) -> Result<Vec<BomEntry>, CatalogError>;

    /// Persist the labeling facts onto the product
    fn write_result(&self, product: &Product, record: &ResultRecord) -> Result<(), CatalogError>;
}

/// In-memory catalog
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: HashMap<ProductId, Product>,
    boms: HashMap<ProductId, Vec<BomEntry>>,
    results: RefCell<BTreeMap<ProductId, ResultRecord>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_product(&mut self, product: Product) {
        self.products.insert(product.id, product);
    }

    /// Register a BOM under its parent product, keeping priority order
    pub fn add_bom(&mut self, bom: BomEntry) {
        let entries = self.boms.entry(bom.product).or_default();
        entries.push(bom);
        entries.sort_by_key(|b| (b.sequence, b.id));
    }

    /// Last result written for `id`
    pub fn result(&self, id: ProductId) -> Option<ResultRecord> {
        self.results.borrow().get(&id).cloned()
    }

    pub fn results_written(&self) -> usize {
        self.results.borrow().len()
    }
}

impl Catalog for MemoryCatalog {
    fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.products
            .get(&id)
            .cloned()
            .ok_or(CatalogError::ProductNotFound(id))
    }

    fn bom_entries(&self, product: &Product) -> Result<Vec<BomEntry>, CatalogError> {
        Ok(self.boms.get(&product.id).cloned().unwrap_or_default())
    }

    fn write_result(&self, product: &Product, record: &ResultRecord) -> Result<(), CatalogError> {
        self.results.borrow_mut().insert(product.id, record.clone());
        Ok(())
    }
}
