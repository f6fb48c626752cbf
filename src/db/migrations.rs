//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("Applied schema migration v1");
    }

    Ok(())
}

/// Migration v1: catalog, BoMs and labeling results
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- UNITS
        -- Custom units on top of the built-in table
        -- ============================================
        CREATE TABLE units (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            category TEXT NOT NULL CHECK(category IN ('weight', 'volume', 'count')),
            factor REAL NOT NULL CHECK(factor > 0),    -- reference units (g/ml/each) per unit
            rounding REAL NOT NULL DEFAULT 0.001,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- ALLERGENS
        -- ============================================
        CREATE TABLE allergens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- PRODUCTS
        -- Master data plus the last labeling result
        -- ============================================
        CREATE TABLE products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            unit TEXT NOT NULL DEFAULT 'g',
            norm_weight REAL NOT NULL DEFAULT 0,       -- grams per stock unit
            nutrition_enabled INTEGER NOT NULL DEFAULT 0,
            ingredient_name TEXT,
            yeast_free INTEGER NOT NULL DEFAULT 1,
            energy_kcal REAL NOT NULL DEFAULT 0,

            -- Labeling result
            ingredient_list TEXT,
            calculated_norm_weight REAL,
            norm_weight_diff REAL,
            deviation REAL,
            labeled_at TEXT,

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_products_name ON products(name);
        CREATE INDEX idx_products_nutrition ON products(nutrition_enabled);

        CREATE TABLE product_allergens (
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            allergen_id INTEGER NOT NULL REFERENCES allergens(id) ON DELETE CASCADE,
            PRIMARY KEY (product_id, allergen_id)
        );

        -- ============================================
        -- BOMS
        -- One product may have several; lowest sequence wins
        -- ============================================
        CREATE TABLE boms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            sequence INTEGER NOT NULL DEFAULT 10,
            quantity REAL NOT NULL,                    -- output of one batch
            unit TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_boms_product ON boms(product_id, sequence);

        CREATE TABLE bom_lines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bom_id INTEGER NOT NULL REFERENCES boms(id) ON DELETE CASCADE,
            component_id INTEGER NOT NULL REFERENCES products(id),
            quantity REAL NOT NULL,
            unit TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_bom_lines_bom ON bom_lines(bom_id);
        CREATE INDEX idx_bom_lines_component ON bom_lines(component_id);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_apply_once() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(needs_migration(&conn).unwrap());

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_migration(&conn).unwrap());
    }

    #[test]
    fn test_schema_has_catalog_tables() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["units", "allergens", "products", "product_allergens", "boms", "bom_lines"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }
}
