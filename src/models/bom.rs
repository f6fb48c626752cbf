//! Bill of materials model
//!
//! A BoM states how much of its product one batch yields. When a product has
//! several, the lowest `sequence` (then lowest id) is the one used.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::BomComponent;
use crate::db::{DbError, DbResult};
use crate::labeling::{BomEntry, BomLine, ProductId};

/// A BoM header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bom {
    pub id: i64,
    pub product_id: i64,
    pub sequence: i64,
    pub quantity: f64,
    pub unit: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a BoM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomCreate {
    pub product_id: i64,
    #[serde(default = "default_sequence")]
    pub sequence: i64,
    pub quantity: f64,
    pub unit: String,
    pub notes: Option<String>,
}

fn default_sequence() -> i64 {
    10
}

impl Bom {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            product_id: row.get("product_id")?,
            sequence: row.get("sequence")?,
            quantity: row.get("quantity")?,
            unit: row.get("unit")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(conn: &Connection, data: &BomCreate) -> DbResult<Self> {
        if !(data.quantity > 0.0) || !data.quantity.is_finite() {
            return Err(DbError::Constraint(format!(
                "BoM output quantity must be positive, got {}",
                data.quantity
            )));
        }

        conn.execute(
            r#"
            INSERT INTO boms (product_id, sequence, quantity, unit, notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![data.product_id, data.sequence, data.quantity, data.unit.trim(), data.notes],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::NotFound(format!("BoM {}", id)))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM boms WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// BoMs of a product in priority order
    pub fn get_for_product(conn: &Connection, product_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM boms WHERE product_id = ?1 ORDER BY sequence ASC, id ASC",
        )?;

        let boms = stmt
            .query_map([product_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(boms)
    }

    /// Delete a BoM and its lines
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM boms WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// This BoM with its lines, as the labeling core reads it
    pub fn to_entry(&self, conn: &Connection) -> DbResult<BomEntry> {
        let lines = BomComponent::get_for_bom(conn, self.id)?
            .into_iter()
            .map(|line| BomLine {
                component: ProductId(line.component_id),
                quantity: line.quantity,
                unit: line.unit,
            })
            .collect();

        Ok(BomEntry {
            id: self.id,
            product: ProductId(self.product_id),
            sequence: self.sequence,
            quantity: self.quantity,
            unit: self.unit.clone(),
            lines,
        })
    }
}
