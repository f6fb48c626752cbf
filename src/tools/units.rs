//! Unit MCP Tools
//!
//! Custom units and a conversion check against the full unit table.

use serde::Serialize;

use crate::db::Database;
use crate::labeling::QuantityConversion;
use crate::models::{load_unit_table, StoredUnit, UnitCreate};

/// Response for convert_quantity
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub quantity: f64,
    pub from_unit: String,
    pub converted: f64,
    pub to_unit: String,
}

/// Define a custom unit
pub fn create_unit(db: &Database, data: UnitCreate) -> Result<StoredUnit, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let table = load_unit_table(&conn).map_err(|e| format!("Failed to load units: {}", e))?;
    if table.lookup(&data.name).is_some() {
        return Err(format!("Unit '{}' is already defined", data.name.trim()));
    }

    StoredUnit::create(&conn, &data).map_err(|e| format!("Failed to create unit: {}", e))
}

/// List custom units
pub fn list_units(db: &Database) -> Result<Vec<StoredUnit>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    StoredUnit::list(&conn).map_err(|e| format!("Failed to list units: {}", e))
}

/// Convert a quantity between two units
pub fn convert_quantity(
    db: &Database,
    quantity: f64,
    from_unit: &str,
    to_unit: &str,
    round: bool,
) -> Result<ConvertResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let table = load_unit_table(&conn).map_err(|e| format!("Failed to load units: {}", e))?;
    let converted = table
        .convert(from_unit, quantity, to_unit, round)
        .map_err(|e| e.to_string())?;

    Ok(ConvertResponse {
        quantity,
        from_unit: from_unit.to_string(),
        converted,
        to_unit: to_unit.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::uom::UnitCategory;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| run_migrations(conn)).unwrap();
        db
    }

    #[test]
    fn test_builtin_names_are_reserved() {
        let db = setup();
        let err = create_unit(
            &db,
            UnitCreate {
                name: "Kilogram".to_string(),
                category: UnitCategory::Weight,
                factor: 1000.0,
                rounding: None,
            },
        )
        .unwrap_err();
        assert!(err.contains("already defined"));
    }

    #[test]
    fn test_custom_unit_converts() {
        let db = setup();
        create_unit(
            &db,
            UnitCreate {
                name: "tray".to_string(),
                category: UnitCategory::Count,
                factor: 30.0,
                rounding: None,
            },
        )
        .unwrap();

        let response = convert_quantity(&db, 2.0, "tray", "dozen", false).unwrap();
        assert!((response.converted - 5.0).abs() < 1e-9);
        assert_eq!(list_units(&db).unwrap().len(), 1);

        assert!(convert_quantity(&db, 1.0, "tray", "g", false).is_err());
    }
}
