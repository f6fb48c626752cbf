//! SQLite-backed catalog for the labeling core

use rusqlite::Connection;

use super::connection::DbError;
use crate::labeling::{BomEntry, Catalog, CatalogError, Product, ProductId, ResultRecord};
use crate::models::{Bom, CatalogProduct};

impl From<DbError> for CatalogError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => CatalogError::Storage(format!("{} not found", what)),
            other => CatalogError::Storage(other.to_string()),
        }
    }
}

/// Reads products and BoMs from one borrowed connection
pub struct SqliteCatalog<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteCatalog<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl Catalog for SqliteCatalog<'_> {
    fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        CatalogProduct::get_by_id(self.conn, id.0)?
            .map(|p| p.to_labeling())
            .ok_or(CatalogError::ProductNotFound(id))
    }

    fn bom_entries(&self, product: &Product) -> Result<Vec<BomEntry>, CatalogError> {
        Bom::get_for_product(self.conn, product.id.0)?
            .iter()
            .map(|bom| bom.to_entry(self.conn).map_err(CatalogError::from))
            .collect()
    }

    fn write_result(&self, product: &Product, record: &ResultRecord) -> Result<(), CatalogError> {
        CatalogProduct::write_labeling(self.conn, product.id.0, record)?;
        Ok(())
    }
}
