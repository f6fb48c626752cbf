//! BoM MCP Tools
//!
//! Tools for creating bills of materials and managing their lines.

use serde::Serialize;

use crate::db::{Database, DbError};
use crate::models::{
    Bom, BomComponent, BomComponentCreate, BomComponentDetail, BomComponentUpdate, BomCreate,
    CatalogProduct,
};

/// A BoM with its lines
#[derive(Debug, Serialize)]
pub struct BomDetail {
    #[serde(flatten)]
    pub bom: Bom,
    pub product_name: String,
    pub lines: Vec<BomComponentDetail>,
}

/// Response for add_bom_line
#[derive(Debug, Serialize)]
pub struct AddBomLineResponse {
    pub id: i64,
    pub bom_id: i64,
    pub component_id: i64,
    pub component_name: String,
    pub quantity: f64,
    pub unit: String,
}

fn require_product(conn: &rusqlite::Connection, id: i64) -> Result<CatalogProduct, String> {
    CatalogProduct::get_by_id(conn, id)
        .map_err(|e| format!("Database error checking product: {}", e))?
        .ok_or_else(|| format!("Product not found with id: {}", id))
}

fn validate_quantity(quantity: f64) -> Result<(), String> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(format!("quantity must be greater than 0, got {}", quantity));
    }
    Ok(())
}

/// Create a BoM for a product
pub fn create_bom(db: &Database, data: BomCreate) -> Result<BomDetail, String> {
    validate_quantity(data.quantity)?;
    if data.unit.trim().is_empty() {
        return Err("BoM unit cannot be empty".to_string());
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let product = require_product(&conn, data.product_id)?;

    let bom = Bom::create(&conn, &data).map_err(|e| format!("Failed to create BoM: {}", e))?;

    tracing::info!("Created BoM {} for product {} '{}'", bom.id, product.id, product.name);

    Ok(BomDetail {
        bom,
        product_name: product.name,
        lines: Vec::new(),
    })
}

/// All BoMs of a product in priority order, with lines
pub fn list_product_boms(db: &Database, product_id: i64) -> Result<Vec<BomDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let product = require_product(&conn, product_id)?;

    let boms = Bom::get_for_product(&conn, product_id)
        .map_err(|e| format!("Failed to get BoMs: {}", e))?;

    boms.into_iter()
        .map(|bom| {
            let lines = BomComponent::get_details_for_bom(&conn, bom.id)
                .map_err(|e| format!("Failed to get BoM lines: {}", e))?;
            Ok(BomDetail {
                bom,
                product_name: product.name.clone(),
                lines,
            })
        })
        .collect()
}

/// Delete a BoM and its lines
pub fn delete_bom(db: &Database, id: i64) -> Result<bool, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    Bom::delete(&conn, id).map_err(|e| format!("Failed to delete BoM: {}", e))
}

/// Add a component line to a BoM
pub fn add_bom_line(db: &Database, data: BomComponentCreate) -> Result<AddBomLineResponse, String> {
    validate_quantity(data.quantity)?;
    if data.unit.trim().is_empty() {
        return Err("Line unit cannot be empty".to_string());
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let component = require_product(&conn, data.component_id)?;

    let line = BomComponent::create(&conn, &data).map_err(|e| match e {
        DbError::Constraint(msg) => format!("Cannot add line: {}", msg),
        DbError::NotFound(what) => format!("{} not found", what),
        other => format!("Failed to add BoM line: {}", other),
    })?;

    Ok(AddBomLineResponse {
        id: line.id,
        bom_id: line.bom_id,
        component_id: line.component_id,
        component_name: component.name,
        quantity: line.quantity,
        unit: line.unit,
    })
}

/// Update a BoM line's quantity or unit
pub fn update_bom_line(
    db: &Database,
    id: i64,
    data: BomComponentUpdate,
) -> Result<Option<BomComponent>, String> {
    if let Some(quantity) = data.quantity {
        validate_quantity(quantity)?;
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    BomComponent::update(&conn, id, &data).map_err(|e| format!("Failed to update BoM line: {}", e))
}

/// Remove a line from a BoM
pub fn remove_bom_line(db: &Database, id: i64) -> Result<bool, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    BomComponent::delete(&conn, id).map_err(|e| format!("Failed to remove BoM line: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            run_migrations(conn)?;
            conn.execute_batch(
                "INSERT INTO products (id, name) VALUES (1, 'Cake'), (2, 'Sponge'), (3, 'Egg');",
            )?;
            Ok(())
        })
        .unwrap();
        db
    }

    fn bom(product_id: i64) -> BomCreate {
        BomCreate {
            product_id,
            sequence: 10,
            quantity: 1.0,
            unit: "kg".to_string(),
            notes: None,
        }
    }

    fn line(bom_id: i64, component_id: i64) -> BomComponentCreate {
        BomComponentCreate {
            bom_id,
            component_id,
            quantity: 2.0,
            unit: "each".to_string(),
        }
    }

    #[test]
    fn test_create_bom_requires_product_and_quantity() {
        let db = setup();
        assert!(create_bom(&db, bom(42)).is_err());

        let mut zero = bom(1);
        zero.quantity = 0.0;
        assert!(create_bom(&db, zero).is_err());

        let created = create_bom(&db, bom(1)).unwrap();
        assert_eq!(created.product_name, "Cake");
    }

    #[test]
    fn test_lines_and_cycle_rejection() {
        let db = setup();
        let cake = create_bom(&db, bom(1)).unwrap().bom.id;
        let sponge = create_bom(&db, bom(2)).unwrap().bom.id;

        add_bom_line(&db, line(cake, 2)).unwrap();
        let egg = add_bom_line(&db, line(sponge, 3)).unwrap();
        assert_eq!(egg.component_name, "Egg");

        let err = add_bom_line(&db, line(sponge, 1)).unwrap_err();
        assert!(err.contains("circular"));

        let boms = list_product_boms(&db, 1).unwrap();
        assert_eq!(boms.len(), 1);
        assert_eq!(boms[0].lines[0].component_name, "Sponge");
    }

    #[test]
    fn test_update_and_remove_line() {
        let db = setup();
        let cake = create_bom(&db, bom(1)).unwrap().bom.id;
        let added = add_bom_line(&db, line(cake, 3)).unwrap();

        assert!(update_bom_line(
            &db,
            added.id,
            BomComponentUpdate {
                quantity: Some(-1.0),
                unit: None
            }
        )
        .is_err());

        let updated = update_bom_line(
            &db,
            added.id,
            BomComponentUpdate {
                quantity: Some(3.0),
                unit: None,
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(updated.quantity, 3.0);

        assert!(remove_bom_line(&db, added.id).unwrap());
        assert!(delete_bom(&db, cake).unwrap());
    }
}
