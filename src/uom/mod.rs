//! Units of measure
//!
//! Conversion table used by the labeling core for BoM and leaf quantities.

pub mod converter;
pub mod units;

pub use converter::{parse_unit, ParsedUnit, UnitTable};
pub use units::{UnitCategory, UnitDefinition};
