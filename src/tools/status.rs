//! Status Tool
//!
//! Runtime status of the labeling service plus usage instructions for MCP clients.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::Database;
use crate::models::CatalogProduct;

/// Labeling workflow instructions for AI assistants
pub const LABELING_INSTRUCTIONS: &str = r#"
# MRP Labeling Instructions

Computes ingredient lists, allergens and weight deviation for products built
from bills of materials (BoMs).

## Catalog

1. Create allergens with `create_allergen`.
2. Create products with `create_product`. Set `unit` to the stock unit and
   `norm_weight` to grams per stock unit. Enable `nutrition_enabled` on
   every product that takes part in labeling, including raw ingredients.
3. Give composite products a BoM (`create_bom`): the BoM states how much of
   the product one batch yields. Add component lines with `add_bom_line`.
   Lines that would make the BoM graph circular are refused.
4. A product with several BoMs uses the one with the lowest `sequence`.

## Labeling

- `preview_labeling` computes without saving.
- `compute_labeling` computes and stores the result on the product, replacing
  its allergen set with the combined allergens of its ingredients.
- `batch_labeling` runs a list of ids (or every enabled product when the list
  is empty) and reports failures per product without stopping.

## Reading the result

- `ingredient_list` is sorted by weight, heaviest first. Ingredients carrying
  allergens are wrapped in `<strong>`; when the deviation is within 20% their
  share of the total weight is shown in parentheses.
- An ingredient name such as `Wheat*flour` emphasizes only the parts between
  `*` markers that contain no space or comma.
- `deviation` is the percentage difference between the computed weight and
  the declared `norm_weight`. Large deviations usually mean a wrong unit or
  norm weight somewhere in the BoM tree.

## Units

Weight (g, kg, mg, lb, oz), volume (ml, l, cl, dl, tsp, tbsp, cup, fl oz) and
count (each, dozen) units are built in. Quantities only convert within a
category. Packaging units can be annotated, e.g. `bag (250g)`, or defined
with `create_unit`.
"#;

/// Runtime status of the labeling service
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub product_count: Option<i64>,
    pub labeling_enabled_count: Option<i64>,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Snapshot of build, catalog and process state
    pub fn get_status(&self, db: &Database) -> ServiceStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let counts = db.with_conn(|conn| {
            Ok((
                CatalogProduct::count(conn, false)?,
                CatalogProduct::count(conn, true)?,
            ))
        });
        let (product_count, labeling_enabled_count) = match counts {
            Ok((all, enabled)) => (Some(all), Some(enabled)),
            Err(e) => {
                tracing::warn!("Could not count products: {}", e);
                (None, None)
            }
        };

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        ServiceStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            product_count,
            labeling_enabled_count,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
