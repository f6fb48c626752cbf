//! Stored unit model
//!
//! Custom units defined in the database extend the built-in table.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use crate::uom::{UnitCategory, UnitDefinition, UnitTable};

/// A custom unit row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUnit {
    pub id: i64,
    pub name: String,
    pub category: UnitCategory,
    pub factor: f64,
    pub rounding: f64,
    pub created_at: String,
}

/// Data for defining a custom unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitCreate {
    pub name: String,
    pub category: UnitCategory,
    pub factor: f64,
    pub rounding: Option<f64>,
}

impl StoredUnit {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let raw: String = row.get("category")?;
        let category = UnitCategory::from_str(&raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown unit category '{}'", raw).into(),
            )
        })?;
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            category,
            factor: row.get("factor")?,
            rounding: row.get("rounding")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn create(conn: &Connection, data: &UnitCreate) -> DbResult<Self> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(DbError::Constraint("unit name must not be empty".to_string()));
        }
        if !(data.factor > 0.0) || !data.factor.is_finite() {
            return Err(DbError::Constraint(format!(
                "unit factor must be positive, got {}",
                data.factor
            )));
        }

        conn.execute(
            "INSERT INTO units (name, category, factor, rounding) VALUES (?1, ?2, ?3, ?4)",
            params![
                name,
                data.category.to_db_str(),
                data.factor,
                data.rounding.unwrap_or(crate::uom::units::DEFAULT_ROUNDING),
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::NotFound(format!("unit {}", id)))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM units WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM units ORDER BY name ASC")?;
        let units = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(units)
    }

    pub fn to_definition(&self) -> UnitDefinition {
        UnitDefinition {
            name: self.name.clone(),
            category: self.category,
            factor: self.factor,
            rounding: self.rounding,
        }
    }
}

/// Built-in units plus every custom unit stored in the database
pub fn load_unit_table(conn: &Connection) -> DbResult<UnitTable> {
    let mut table = UnitTable::standard();
    for unit in StoredUnit::list(conn)? {
        table.register(unit.to_definition());
    }
    Ok(table)
}
