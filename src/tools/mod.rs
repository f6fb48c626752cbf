//! Tools module
//!
//! MCP tool implementations for catalog management and labeling.

pub mod allergens;
pub mod boms;
pub mod labeling;
pub mod products;
pub mod status;
pub mod units;
