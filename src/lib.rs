//! MRP Labeling Library
//!
//! BoM expansion, ingredient labeling and the catalog they run against.

pub mod build_info;
pub mod config;
pub mod db;
pub mod labeling;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod uom;
