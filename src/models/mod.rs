//! Data models
//!
//! Rust structs representing database entities.

mod allergen;
mod bom;
mod bom_line;
mod product;
mod unit;

pub use allergen::{Allergen, AllergenCreate};
pub use bom::{Bom, BomCreate};
pub use bom_line::{
    would_create_cycle, BomComponent, BomComponentCreate, BomComponentDetail, BomComponentUpdate,
};
pub use product::{CatalogProduct, ProductCreate, ProductUpdate, StoredLabeling};
pub use unit::{load_unit_table, StoredUnit, UnitCreate};
