//! BoM line model
//!
//! Links a component product into a BoM with the quantity consumed per batch.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::db::{DbError, DbResult};

/// A component consumed by a BoM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomComponent {
    pub id: i64,
    pub bom_id: i64,
    pub component_id: i64,
    pub quantity: f64,
    pub unit: String,
    pub created_at: String,
    pub updated_at: String,
}

/// BoM line with the component's name, for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomComponentDetail {
    pub id: i64,
    pub component_id: i64,
    pub component_name: String,
    pub quantity: f64,
    pub unit: String,
}

/// Data for adding a component to a BoM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomComponentCreate {
    pub bom_id: i64,
    pub component_id: i64,
    pub quantity: f64,
    pub unit: String,
}

/// Data for updating a BoM line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BomComponentUpdate {
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

impl BomComponent {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            bom_id: row.get("bom_id")?,
            component_id: row.get("component_id")?,
            quantity: row.get("quantity")?,
            unit: row.get("unit")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Add a line, refusing components that would make the BoM graph cyclic
    pub fn create(conn: &Connection, data: &BomComponentCreate) -> DbResult<Self> {
        let parent_id: i64 = match conn.query_row(
            "SELECT product_id FROM boms WHERE id = ?1",
            [data.bom_id],
            |row| row.get(0),
        ) {
            Ok(id) => id,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(DbError::NotFound(format!("BoM {}", data.bom_id)))
            }
            Err(e) => return Err(e.into()),
        };

        if would_create_cycle(conn, parent_id, data.component_id)? {
            return Err(DbError::Constraint(format!(
                "adding product {} to a BoM of product {} would create a circular reference",
                data.component_id, parent_id
            )));
        }

        conn.execute(
            r#"
            INSERT INTO bom_lines (bom_id, component_id, quantity, unit)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![data.bom_id, data.component_id, data.quantity, data.unit.trim()],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::NotFound(format!("BoM line {}", id)))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM bom_lines WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Lines of a BoM in entry order
    pub fn get_for_bom(conn: &Connection, bom_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM bom_lines WHERE bom_id = ?1 ORDER BY id")?;

        let lines = stmt
            .query_map([bom_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(lines)
    }

    pub fn get_details_for_bom(conn: &Connection, bom_id: i64) -> DbResult<Vec<BomComponentDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT bl.id, bl.component_id, p.name AS component_name, bl.quantity, bl.unit
            FROM bom_lines bl
            INNER JOIN products p ON bl.component_id = p.id
            WHERE bl.bom_id = ?1
            ORDER BY bl.id
            "#,
        )?;

        let details = stmt
            .query_map([bom_id], |row| {
                Ok(BomComponentDetail {
                    id: row.get("id")?,
                    component_id: row.get("component_id")?,
                    component_name: row.get("component_name")?,
                    quantity: row.get("quantity")?,
                    unit: row.get("unit")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(details)
    }

    pub fn update(conn: &Connection, id: i64, data: &BomComponentUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(quantity) = data.quantity {
            updates.push(format!("quantity = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(quantity));
        }
        if let Some(ref unit) = data.unit {
            updates.push(format!("unit = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(unit.trim().to_string()));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE bom_lines SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM bom_lines WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

/// Whether `component_id` (directly or through any of its BoMs) already uses `product_id`
pub fn would_create_cycle(conn: &Connection, product_id: i64, component_id: i64) -> DbResult<bool> {
    let mut stmt = conn.prepare(
        r#"
        SELECT bl.component_id FROM bom_lines bl
        INNER JOIN boms b ON bl.bom_id = b.id
        WHERE b.product_id = ?1
        "#,
    )?;

    let mut visited = HashSet::new();
    let mut to_check = vec![component_id];

    while let Some(current) = to_check.pop() {
        if current == product_id {
            return Ok(true);
        }
        if !visited.insert(current) {
            continue;
        }

        let children = stmt
            .query_map([current], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        to_check.extend(children);
    }

    Ok(false)
}
