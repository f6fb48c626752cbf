//! MRP Labeling MCP Server Implementation
//!
//! Exposes catalog management and labeling as MCP tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::labeling::LabelingOptions;
use crate::models::{
    AllergenCreate, BomComponentCreate, BomComponentUpdate, BomCreate, ProductCreate,
    ProductUpdate, UnitCreate,
};
use crate::tools::status::StatusTracker;
use crate::tools::{allergens, boms, labeling, products, units};
use crate::uom::UnitCategory;

/// MRP Labeling MCP Service
#[derive(Clone)]
pub struct LabelingService {
    status_tracker: Arc<StatusTracker>,
    database: Database,
    options: LabelingOptions,
    tool_router: ToolRouter<LabelingService>,
}

impl LabelingService {
    pub fn new(database_path: PathBuf, database: Database, options: LabelingOptions) -> Self {
        Self {
            status_tracker: Arc::new(StatusTracker::new(database_path)),
            database,
            options,
            tool_router: Self::tool_router(),
        }
    }
}

/// Serialize a tool result as pretty JSON content
fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found(what: &str, id: i64) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(format!(
        r#"{{"error": "{} not found", "id": {}}}"#,
        what, id
    ))]))
}

// ============================================================================
// Product Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateProductParams {
    pub name: String,
    /// Stock unit, e.g. "g", "kg", "each"
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Grams per stock unit
    #[serde(default)]
    pub norm_weight: f64,
    #[serde(default)]
    pub nutrition_enabled: bool,
    /// Name printed in ingredient lists; `*` marks allergen segments
    pub ingredient_name: Option<String>,
    #[serde(default = "default_true")]
    pub yeast_free: bool,
    #[serde(default)]
    pub energy_kcal: f64,
    #[serde(default)]
    pub allergen_ids: Vec<i64>,
}

fn default_unit() -> String { "g".to_string() }
fn default_true() -> bool { true }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IdParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListProductsParams {
    /// Substring of the product name
    pub query: Option<String>,
    #[serde(default)]
    pub nutrition_only: bool,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_list_limit() -> i64 { 50 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateProductParams {
    pub id: i64,
    pub name: Option<String>,
    pub unit: Option<String>,
    pub norm_weight: Option<f64>,
    pub nutrition_enabled: Option<bool>,
    /// Empty string clears the override
    pub ingredient_name: Option<String>,
    pub yeast_free: Option<bool>,
    pub energy_kcal: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetProductAllergensParams {
    pub product_id: i64,
    pub allergen_ids: Vec<i64>,
}

// ============================================================================
// Allergen / Unit Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateAllergenParams {
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateUnitParams {
    pub name: String,
    /// "weight", "volume" or "count"
    pub category: String,
    /// Reference units (g, ml or each) in one of this unit
    pub factor: f64,
    pub rounding: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConvertQuantityParams {
    pub quantity: f64,
    pub from_unit: String,
    pub to_unit: String,
    #[serde(default)]
    pub round: bool,
}

// ============================================================================
// BoM Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateBomParams {
    pub product_id: i64,
    /// Lower sequence is preferred when a product has several BoMs
    #[serde(default = "default_sequence")]
    pub sequence: i64,
    /// Output of one batch
    pub quantity: f64,
    pub unit: String,
    pub notes: Option<String>,
}

fn default_sequence() -> i64 { 10 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListProductBomsParams {
    pub product_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddBomLineParams {
    pub bom_id: i64,
    pub component_id: i64,
    /// Quantity consumed per batch
    pub quantity: f64,
    pub unit: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateBomLineParams {
    pub id: i64,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

// ============================================================================
// Labeling Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LabelProductParams {
    pub product_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BatchLabelingParams {
    /// Products to label; empty means every product with labeling enabled
    #[serde(default)]
    pub product_ids: Vec<i64>,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl LabelingService {
    // --- Status ---

    #[tool(description = "Get the current status of the labeling service including build info, catalog size, and process information")]
    async fn labeling_status(&self) -> Result<CallToolResult, McpError> {
        let status = self.status_tracker.get_status(&self.database);
        json_result(&status)
    }

    #[tool(description = "Get instructions for building the catalog and reading labeling results. Call this before the first labeling session.")]
    fn labeling_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::LABELING_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(LABELING_INSTRUCTIONS)]))
    }

    // --- Products ---

    #[tool(description = "Create a product with unit, norm weight, labeling flags and allergens")]
    fn create_product(&self, Parameters(p): Parameters<CreateProductParams>) -> Result<CallToolResult, McpError> {
        let data = ProductCreate {
            name: p.name, unit: p.unit, norm_weight: p.norm_weight,
            nutrition_enabled: p.nutrition_enabled, ingredient_name: p.ingredient_name,
            yeast_free: p.yeast_free, energy_kcal: p.energy_kcal, allergen_ids: p.allergen_ids,
        };
        let result = products::create_product(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get a product with its allergens, BoM ids and last labeling result")]
    fn get_product(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match products::get_product(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Some(detail) => json_result(&detail),
            None => not_found("Product", p.id),
        }
    }

    #[tool(description = "List products by name with pagination, optionally only those with labeling enabled")]
    fn list_products(&self, Parameters(p): Parameters<ListProductsParams>) -> Result<CallToolResult, McpError> {
        let result = products::list_products(&self.database, p.query.as_deref(), p.nutrition_only, p.limit, p.offset)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Update product master data. Only provided fields change.")]
    fn update_product(&self, Parameters(p): Parameters<UpdateProductParams>) -> Result<CallToolResult, McpError> {
        let data = ProductUpdate {
            name: p.name, unit: p.unit, norm_weight: p.norm_weight,
            nutrition_enabled: p.nutrition_enabled, ingredient_name: p.ingredient_name,
            yeast_free: p.yeast_free, energy_kcal: p.energy_kcal,
        };
        match products::update_product(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))? {
            Some(product) => json_result(&product),
            None => not_found("Product", p.id),
        }
    }

    #[tool(description = "Replace the allergen set of a product")]
    fn set_product_allergens(&self, Parameters(p): Parameters<SetProductAllergensParams>) -> Result<CallToolResult, McpError> {
        let result = products::set_product_allergens(&self.database, p.product_id, p.allergen_ids)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Allergens ---

    #[tool(description = "Create an allergen")]
    fn create_allergen(&self, Parameters(p): Parameters<CreateAllergenParams>) -> Result<CallToolResult, McpError> {
        let result = allergens::create_allergen(&self.database, AllergenCreate { name: p.name })
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "List all allergens")]
    fn list_allergens(&self) -> Result<CallToolResult, McpError> {
        let result = allergens::list_allergens(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Units ---

    #[tool(description = "Define a custom unit of measure in the weight, volume or count category")]
    fn create_unit(&self, Parameters(p): Parameters<CreateUnitParams>) -> Result<CallToolResult, McpError> {
        let category = UnitCategory::from_str(&p.category).ok_or_else(|| {
            McpError::invalid_params(format!("Unknown unit category '{}'", p.category), None)
        })?;
        let data = UnitCreate { name: p.name, category, factor: p.factor, rounding: p.rounding };
        let result = units::create_unit(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "List custom units of measure")]
    fn list_units(&self) -> Result<CallToolResult, McpError> {
        let result = units::list_units(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Convert a quantity between two units of the same category")]
    fn convert_quantity(&self, Parameters(p): Parameters<ConvertQuantityParams>) -> Result<CallToolResult, McpError> {
        let result = units::convert_quantity(&self.database, p.quantity, &p.from_unit, &p.to_unit, p.round)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- BoMs ---

    #[tool(description = "Create a bill of materials for a product, stating the output quantity of one batch")]
    fn create_bom(&self, Parameters(p): Parameters<CreateBomParams>) -> Result<CallToolResult, McpError> {
        let data = BomCreate {
            product_id: p.product_id, sequence: p.sequence, quantity: p.quantity,
            unit: p.unit, notes: p.notes,
        };
        let result = boms::create_bom(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "List the BoMs of a product in priority order, with their lines")]
    fn list_product_boms(&self, Parameters(p): Parameters<ListProductBomsParams>) -> Result<CallToolResult, McpError> {
        let result = boms::list_product_boms(&self.database, p.product_id).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Delete a BoM and all its lines")]
    fn delete_bom(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let deleted = boms::delete_bom(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&serde_json::json!({ "id": p.id, "deleted": deleted }))
    }

    #[tool(description = "Add a component line to a BoM. Rejected if the component already uses the BoM's product.")]
    fn add_bom_line(&self, Parameters(p): Parameters<AddBomLineParams>) -> Result<CallToolResult, McpError> {
        let data = BomComponentCreate {
            bom_id: p.bom_id, component_id: p.component_id, quantity: p.quantity, unit: p.unit,
        };
        let result = boms::add_bom_line(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Update the quantity or unit of a BoM line")]
    fn update_bom_line(&self, Parameters(p): Parameters<UpdateBomLineParams>) -> Result<CallToolResult, McpError> {
        let data = BomComponentUpdate { quantity: p.quantity, unit: p.unit };
        match boms::update_bom_line(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))? {
            Some(line) => json_result(&line),
            None => not_found("BoM line", p.id),
        }
    }

    #[tool(description = "Remove a line from a BoM")]
    fn remove_bom_line(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let removed = boms::remove_bom_line(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&serde_json::json!({ "id": p.id, "removed": removed }))
    }

    // --- Labeling ---

    #[tool(description = "Compute the ingredient list, allergens and weight deviation of a product and store them on it")]
    fn compute_labeling(&self, Parameters(p): Parameters<LabelProductParams>) -> Result<CallToolResult, McpError> {
        let result = labeling::label_product(&self.database, self.options, p.product_id, true)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Compute the labeling of a product without storing it")]
    fn preview_labeling(&self, Parameters(p): Parameters<LabelProductParams>) -> Result<CallToolResult, McpError> {
        let result = labeling::label_product(&self.database, self.options, p.product_id, false)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Compute and store labeling for several products (all enabled products when no ids are given). Failures are listed per product and do not stop the batch.")]
    fn batch_labeling(&self, Parameters(p): Parameters<BatchLabelingParams>) -> Result<CallToolResult, McpError> {
        let result = labeling::batch_labeling(&self.database, self.options, p.product_ids)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for LabelingService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mrp-labeling".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("MRP Labeling".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "MRP Labeling - BoM expansion and ingredient labeling. \
                 IMPORTANT: Call labeling_instructions before the first session. \
                 Products: create/get/list/update_product, set_product_allergens. \
                 Allergens: create/list_allergen(s). \
                 Units: create_unit, list_units, convert_quantity. \
                 BoMs: create_bom, list_product_boms, delete_bom, add/update/remove_bom_line. \
                 Labeling: preview_labeling, compute_labeling, batch_labeling."
                    .into(),
            ),
        }
    }
}
