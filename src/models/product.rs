//! Product model
//!
//! Catalog products together with the last labeling result written onto them.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::Allergen;
use crate::db::{DbError, DbResult};
use crate::labeling::{AllergenId, Product, ProductId, ResultRecord};

/// Labeling facts stored on a product row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredLabeling {
    pub ingredient_list: String,
    pub calculated_norm_weight: f64,
    pub norm_weight_diff: f64,
    pub deviation: f64,
    pub labeled_at: String,
}

/// A catalog product row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: i64,
    pub name: String,
    pub unit: String,
    pub norm_weight: f64,
    pub nutrition_enabled: bool,
    pub ingredient_name: Option<String>,
    pub yeast_free: bool,
    pub energy_kcal: f64,
    pub allergen_ids: Vec<i64>,
    pub labeling: Option<StoredLabeling>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub norm_weight: f64,
    #[serde(default)]
    pub nutrition_enabled: bool,
    pub ingredient_name: Option<String>,
    #[serde(default = "default_true")]
    pub yeast_free: bool,
    #[serde(default)]
    pub energy_kcal: f64,
    #[serde(default)]
    pub allergen_ids: Vec<i64>,
}

fn default_unit() -> String {
    "g".to_string()
}

fn default_true() -> bool {
    true
}

/// Data for updating a product
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub norm_weight: Option<f64>,
    pub nutrition_enabled: Option<bool>,
    pub ingredient_name: Option<String>,
    pub yeast_free: Option<bool>,
    pub energy_kcal: Option<f64>,
}

impl CatalogProduct {
    /// Build from a row; allergens are loaded separately
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let labeled_at: Option<String> = row.get("labeled_at")?;
        let labeling = match labeled_at {
            Some(labeled_at) => Some(StoredLabeling {
                ingredient_list: row.get::<_, Option<String>>("ingredient_list")?.unwrap_or_default(),
                calculated_norm_weight: row.get::<_, Option<f64>>("calculated_norm_weight")?.unwrap_or(0.0),
                norm_weight_diff: row.get::<_, Option<f64>>("norm_weight_diff")?.unwrap_or(0.0),
                deviation: row.get::<_, Option<f64>>("deviation")?.unwrap_or(0.0),
                labeled_at,
            }),
            None => None,
        };

        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            unit: row.get("unit")?,
            norm_weight: row.get("norm_weight")?,
            nutrition_enabled: row.get("nutrition_enabled")?,
            ingredient_name: row.get("ingredient_name")?,
            yeast_free: row.get("yeast_free")?,
            energy_kcal: row.get("energy_kcal")?,
            allergen_ids: Vec::new(),
            labeling,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn with_allergens(mut self, conn: &Connection) -> DbResult<Self> {
        self.allergen_ids = Allergen::ids_for_product(conn, self.id)?;
        Ok(self)
    }

    /// Insert a new product and its allergen assignment
    pub fn create(conn: &Connection, data: &ProductCreate) -> DbResult<Self> {
        if data.name.trim().is_empty() {
            return Err(DbError::Constraint("product name must not be empty".to_string()));
        }

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO products (
                name, unit, norm_weight, nutrition_enabled, ingredient_name, yeast_free, energy_kcal
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                data.name.trim(),
                data.unit.trim(),
                data.norm_weight,
                data.nutrition_enabled,
                data.ingredient_name,
                data.yeast_free,
                data.energy_kcal,
            ],
        )?;
        let id = tx.last_insert_rowid();
        Allergen::set_for_product(&tx, id, &data.allergen_ids)?;
        tx.commit()?;

        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::NotFound(format!("product {}", id)))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM products WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(item) => Ok(Some(item.with_allergens(conn)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List products, optionally only those with labeling enabled
    pub fn list(
        conn: &Connection,
        nutrition_only: bool,
        query: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", query.unwrap_or("").trim());
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM products
            WHERE (?1 = 0 OR nutrition_enabled = 1)
              AND name LIKE ?2
            ORDER BY name ASC, id ASC
            LIMIT ?3 OFFSET ?4
            "#,
        )?;

        let rows = stmt
            .query_map(params![nutrition_only, pattern, limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(|p| p.with_allergens(conn)).collect()
    }

    pub fn count(conn: &Connection, nutrition_only: bool) -> DbResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM products WHERE (?1 = 0 OR nutrition_enabled = 1)",
            [nutrition_only],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Ids of every product with labeling enabled, ascending
    pub fn nutrition_enabled_ids(conn: &Connection) -> DbResult<Vec<i64>> {
        let mut stmt = conn.prepare("SELECT id FROM products WHERE nutrition_enabled = 1 ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    pub fn update(conn: &Connection, id: i64, data: &ProductUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = data.name {
            if name.trim().is_empty() {
                return Err(DbError::Constraint("product name must not be empty".to_string()));
            }
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.trim().to_string()));
        }
        if let Some(ref unit) = data.unit {
            updates.push(format!("unit = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(unit.trim().to_string()));
        }
        if let Some(norm_weight) = data.norm_weight {
            updates.push(format!("norm_weight = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(norm_weight));
        }
        if let Some(enabled) = data.nutrition_enabled {
            updates.push(format!("nutrition_enabled = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(enabled));
        }
        if let Some(ref ingredient_name) = data.ingredient_name {
            // Empty string clears the override
            updates.push(format!("ingredient_name = ?{}", params_vec.len() + 1));
            let value = Some(ingredient_name.clone()).filter(|n| !n.trim().is_empty());
            params_vec.push(Box::new(value));
        }
        if let Some(yeast_free) = data.yeast_free {
            updates.push(format!("yeast_free = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(yeast_free));
        }
        if let Some(energy) = data.energy_kcal {
            updates.push(format!("energy_kcal = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(energy));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE products SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Store a labeling result and replace the allergen set with the combined one
    pub fn write_labeling(conn: &Connection, id: i64, record: &ResultRecord) -> DbResult<()> {
        let labeled_at = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

        let tx = conn.unchecked_transaction()?;
        let rows = tx.execute(
            r#"
            UPDATE products SET
                ingredient_list = ?1,
                calculated_norm_weight = ?2,
                norm_weight_diff = ?3,
                deviation = ?4,
                yeast_free = ?5,
                labeled_at = ?6,
                updated_at = datetime('now')
            WHERE id = ?7
            "#,
            params![
                record.ingredient_list,
                record.calculated_norm_weight,
                record.norm_weight_diff,
                record.deviation,
                record.yeast_free,
                labeled_at,
                id,
            ],
        )?;
        if rows == 0 {
            return Err(DbError::NotFound(format!("product {}", id)));
        }

        let allergen_ids: Vec<i64> = record.allergens.iter().map(|a| a.0).collect();
        Allergen::set_for_product(&tx, id, &allergen_ids)?;
        tx.commit()?;
        Ok(())
    }

    /// The labeling core's view of this product
    pub fn to_labeling(&self) -> Product {
        Product {
            id: ProductId(self.id),
            name: self.name.clone(),
            norm_weight: self.norm_weight,
            nutrition_enabled: self.nutrition_enabled,
            ingredient_name: self.ingredient_name.clone(),
            yeast_free: self.yeast_free,
            allergens: self.allergen_ids.iter().copied().map(AllergenId).collect(),
            unit: self.unit.clone(),
            energy_kcal: self.energy_kcal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::labeling::AllergenSet;
    use crate::models::AllergenCreate;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn create(conn: &Connection, name: &str, enabled: bool) -> CatalogProduct {
        CatalogProduct::create(
            conn,
            &ProductCreate {
                name: name.to_string(),
                unit: "g".to_string(),
                norm_weight: 100.0,
                nutrition_enabled: enabled,
                ingredient_name: None,
                yeast_free: true,
                energy_kcal: 250.0,
                allergen_ids: Vec::new(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let conn = setup();
        let gluten = Allergen::create(&conn, &AllergenCreate { name: "Gluten".to_string() }).unwrap();
        let product = CatalogProduct::create(
            &conn,
            &ProductCreate {
                name: " Rye bread ".to_string(),
                unit: "kg".to_string(),
                norm_weight: 95.0,
                nutrition_enabled: true,
                ingredient_name: Some("Rye*bread".to_string()),
                yeast_free: false,
                energy_kcal: 0.0,
                allergen_ids: vec![gluten.id],
            },
        )
        .unwrap();

        assert_eq!(product.name, "Rye bread");
        assert_eq!(product.allergen_ids, vec![gluten.id]);
        assert!(product.labeling.is_none());

        let view = product.to_labeling();
        assert_eq!(view.id, ProductId(product.id));
        assert_eq!(view.unit, "kg");
        assert!(view.allergens.contains(&AllergenId(gluten.id)));
    }

    #[test]
    fn test_list_and_enabled_ids() {
        let conn = setup();
        let a = create(&conn, "Bun", true);
        create(&conn, "Anise", false);
        let c = create(&conn, "Crust", true);

        let all = CatalogProduct::list(&conn, false, None, 50, 0).unwrap();
        let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Anise", "Bun", "Crust"]);

        assert_eq!(CatalogProduct::count(&conn, true).unwrap(), 2);
        assert_eq!(CatalogProduct::nutrition_enabled_ids(&conn).unwrap(), vec![a.id, c.id]);
        assert_eq!(CatalogProduct::list(&conn, false, Some("cru"), 50, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_update_partial_and_clear_override() {
        let conn = setup();
        let p = create(&conn, "Bun", true);
        CatalogProduct::update(
            &conn,
            p.id,
            &ProductUpdate {
                ingredient_name: Some("Sesame bun".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let updated = CatalogProduct::update(
            &conn,
            p.id,
            &ProductUpdate {
                norm_weight: Some(80.0),
                ingredient_name: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(updated.norm_weight, 80.0);
        assert_eq!(updated.ingredient_name, None);
        assert_eq!(updated.name, "Bun");
    }

    #[test]
    fn test_write_labeling_stores_result_and_allergens() {
        let conn = setup();
        let p = create(&conn, "Bun", true);
        let sesame = Allergen::create(&conn, &AllergenCreate { name: "Sesame".to_string() }).unwrap();

        let mut allergens = AllergenSet::new();
        allergens.insert(AllergenId(sesame.id));
        let record = ResultRecord {
            ingredient_list: "<strong>Sesame</strong>".to_string(),
            calculated_norm_weight: 110.0,
            norm_weight_diff: 10.0,
            deviation: 10.0,
            yeast_free: false,
            allergens,
        };
        CatalogProduct::write_labeling(&conn, p.id, &record).unwrap();

        let stored = CatalogProduct::get_by_id(&conn, p.id).unwrap().unwrap();
        let labeling = stored.labeling.unwrap();
        assert_eq!(labeling.ingredient_list, "<strong>Sesame</strong>");
        assert!(labeling.labeled_at.ends_with('Z'));
        assert!((labeling.deviation - 10.0).abs() < 1e-9);
        assert!(!stored.yeast_free);
        assert_eq!(stored.allergen_ids, vec![sesame.id]);
    }

    #[test]
    fn test_write_labeling_unknown_product() {
        let conn = setup();
        let record = ResultRecord {
            ingredient_list: String::new(),
            calculated_norm_weight: 0.0,
            norm_weight_diff: 0.0,
            deviation: 0.0,
            yeast_free: true,
            allergens: AllergenSet::new(),
        };
        let err = CatalogProduct::write_labeling(&conn, 42, &record).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }
}
