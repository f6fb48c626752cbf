//! Allergen model
//!
//! Allergens and their assignment to products.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

/// A declarable allergen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allergen {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// Data for creating an allergen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllergenCreate {
    pub name: String,
}

impl Allergen {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn create(conn: &Connection, data: &AllergenCreate) -> DbResult<Self> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(DbError::Constraint("allergen name must not be empty".to_string()));
        }

        conn.execute("INSERT INTO allergens (name) VALUES (?1)", params![name])?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or_else(|| DbError::NotFound(format!("allergen {}", id)))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM allergens WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All allergens, alphabetical
    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM allergens ORDER BY name ASC")?;
        let items = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Allergens assigned to a product
    pub fn for_product(conn: &Connection, product_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT a.* FROM allergens a
            INNER JOIN product_allergens pa ON pa.allergen_id = a.id
            WHERE pa.product_id = ?1
            ORDER BY a.id
            "#,
        )?;
        let items = stmt
            .query_map([product_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Allergen ids assigned to a product
    pub fn ids_for_product(conn: &Connection, product_id: i64) -> DbResult<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT allergen_id FROM product_allergens WHERE product_id = ?1 ORDER BY allergen_id",
        )?;
        let ids = stmt
            .query_map([product_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Replace the allergen set of a product.
    ///
    /// Runs on the caller's connection; wrap in a transaction when atomicity
    /// with other writes matters.
    pub fn set_for_product(conn: &Connection, product_id: i64, allergen_ids: &[i64]) -> DbResult<()> {
        conn.execute("DELETE FROM product_allergens WHERE product_id = ?1", [product_id])?;

        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO product_allergens (product_id, allergen_id) VALUES (?1, ?2)",
        )?;
        for allergen_id in allergen_ids {
            stmt.execute(params![product_id, allergen_id])?;
        }
        Ok(())
    }
}
