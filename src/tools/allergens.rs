//! Allergen MCP Tools

use crate::db::Database;
use crate::models::{Allergen, AllergenCreate};

/// Create a new allergen
pub fn create_allergen(db: &Database, data: AllergenCreate) -> Result<Allergen, String> {
    if data.name.trim().is_empty() {
        return Err("Allergen name cannot be empty".to_string());
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    Allergen::create(&conn, &data).map_err(|e| format!("Failed to create allergen: {}", e))
}

/// List all allergens
pub fn list_allergens(db: &Database) -> Result<Vec<Allergen>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    Allergen::list(&conn).map_err(|e| format!("Failed to list allergens: {}", e))
}
