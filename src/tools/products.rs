//! Product MCP Tools
//!
//! Tools for managing catalog products and their allergens.

use serde::Serialize;

use crate::db::Database;
use crate::models::{Allergen, Bom, CatalogProduct, ProductCreate, ProductUpdate};

/// Response for create_product
#[derive(Debug, Serialize)]
pub struct CreateProductResponse {
    pub id: i64,
    pub name: String,
    pub unit: String,
    pub created_at: String,
}

/// Full product detail
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: CatalogProduct,
    pub allergens: Vec<Allergen>,
    pub bom_ids: Vec<i64>,
}

/// Product summary for listing
#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub unit: String,
    pub norm_weight: f64,
    pub nutrition_enabled: bool,
    pub deviation: Option<f64>,
    pub labeled_at: Option<String>,
}

/// Response for list_products
#[derive(Debug, Serialize)]
pub struct ListProductsResponse {
    pub products: Vec<ProductSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

fn validate_norm_weight(norm_weight: f64) -> Result<(), String> {
    if !norm_weight.is_finite() || norm_weight < 0.0 {
        return Err(format!("norm_weight must be a non-negative number, got {}", norm_weight));
    }
    Ok(())
}

/// Create a new product
pub fn create_product(db: &Database, data: ProductCreate) -> Result<CreateProductResponse, String> {
    if data.name.trim().is_empty() {
        return Err("Product name cannot be empty".to_string());
    }
    if data.unit.trim().is_empty() {
        return Err("Product unit cannot be empty".to_string());
    }
    validate_norm_weight(data.norm_weight)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let product = CatalogProduct::create(&conn, &data)
        .map_err(|e| format!("Failed to create product: {}", e))?;

    tracing::info!("Created product {} '{}'", product.id, product.name);

    Ok(CreateProductResponse {
        id: product.id,
        name: product.name,
        unit: product.unit,
        created_at: product.created_at,
    })
}

/// Get a product with allergens and BoMs
pub fn get_product(db: &Database, id: i64) -> Result<Option<ProductDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let product = CatalogProduct::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get product: {}", e))?;

    match product {
        Some(product) => {
            let allergens = Allergen::for_product(&conn, id)
                .map_err(|e| format!("Failed to get allergens: {}", e))?;
            let bom_ids = Bom::get_for_product(&conn, id)
                .map_err(|e| format!("Failed to get BoMs: {}", e))?
                .into_iter()
                .map(|b| b.id)
                .collect();

            Ok(Some(ProductDetail {
                product,
                allergens,
                bom_ids,
            }))
        }
        None => Ok(None),
    }
}

/// List products with optional name filter
pub fn list_products(
    db: &Database,
    query: Option<&str>,
    nutrition_only: bool,
    limit: i64,
    offset: i64,
) -> Result<ListProductsResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let products = CatalogProduct::list(&conn, nutrition_only, query, limit, offset)
        .map_err(|e| format!("Failed to list products: {}", e))?;

    let total = CatalogProduct::count(&conn, nutrition_only)
        .map_err(|e| format!("Failed to count products: {}", e))?;

    let products = products
        .into_iter()
        .map(|p| {
            let (deviation, labeled_at) = match p.labeling {
                Some(l) => (Some(l.deviation), Some(l.labeled_at)),
                None => (None, None),
            };
            ProductSummary {
                id: p.id,
                name: p.name,
                unit: p.unit,
                norm_weight: p.norm_weight,
                nutrition_enabled: p.nutrition_enabled,
                deviation,
                labeled_at,
            }
        })
        .collect();

    Ok(ListProductsResponse {
        products,
        total,
        limit,
        offset,
    })
}

/// Update product master data
pub fn update_product(
    db: &Database,
    id: i64,
    data: ProductUpdate,
) -> Result<Option<CatalogProduct>, String> {
    if let Some(norm_weight) = data.norm_weight {
        validate_norm_weight(norm_weight)?;
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    CatalogProduct::update(&conn, id, &data).map_err(|e| format!("Failed to update product: {}", e))
}

/// Replace the allergen set of a product
pub fn set_product_allergens(
    db: &Database,
    product_id: i64,
    allergen_ids: Vec<i64>,
) -> Result<Vec<Allergen>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if CatalogProduct::get_by_id(&conn, product_id)
        .map_err(|e| format!("Database error checking product: {}", e))?
        .is_none()
    {
        return Err(format!("Product not found with id: {}", product_id));
    }

    for &allergen_id in &allergen_ids {
        if Allergen::get_by_id(&conn, allergen_id)
            .map_err(|e| format!("Database error checking allergen: {}", e))?
            .is_none()
        {
            return Err(format!("Allergen not found with id: {}", allergen_id));
        }
    }

    Allergen::set_for_product(&conn, product_id, &allergen_ids)
        .map_err(|e| format!("Failed to set allergens: {}", e))?;

    Allergen::for_product(&conn, product_id).map_err(|e| format!("Failed to get allergens: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::AllergenCreate;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| run_migrations(conn)).unwrap();
        db
    }

    fn create(name: &str) -> ProductCreate {
        ProductCreate {
            name: name.to_string(),
            unit: "g".to_string(),
            norm_weight: 100.0,
            nutrition_enabled: true,
            ingredient_name: None,
            yeast_free: true,
            energy_kcal: 0.0,
            allergen_ids: Vec::new(),
        }
    }

    #[test]
    fn test_create_validates() {
        let db = setup();
        assert!(create_product(&db, create("  ")).is_err());

        let mut negative = create("Salt");
        negative.norm_weight = -1.0;
        assert!(create_product(&db, negative).is_err());

        let created = create_product(&db, create("Salt")).unwrap();
        assert_eq!(created.name, "Salt");
    }

    #[test]
    fn test_get_and_list() {
        let db = setup();
        let salt = create_product(&db, create("Salt")).unwrap();
        create_product(&db, create("Pepper")).unwrap();

        let detail = get_product(&db, salt.id).unwrap().unwrap();
        assert_eq!(detail.product.name, "Salt");
        assert!(detail.bom_ids.is_empty());
        assert!(get_product(&db, 999).unwrap().is_none());

        let listed = list_products(&db, None, false, 500, -3).unwrap();
        assert_eq!(listed.total, 2);
        assert_eq!(listed.limit, 200);
        assert_eq!(listed.offset, 0);
        assert_eq!(listed.products[0].name, "Pepper");
        assert!(listed.products[0].deviation.is_none());
    }

    #[test]
    fn test_set_allergens_checks_ids() {
        let db = setup();
        let salt = create_product(&db, create("Sesame paste")).unwrap();
        let sesame = db
            .with_conn(|conn| Allergen::create(conn, &AllergenCreate { name: "Sesame".to_string() }))
            .unwrap();

        assert!(set_product_allergens(&db, salt.id, vec![sesame.id + 1]).is_err());
        assert!(set_product_allergens(&db, 999, vec![sesame.id]).is_err());

        let assigned = set_product_allergens(&db, salt.id, vec![sesame.id]).unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].name, "Sesame");
    }
}
