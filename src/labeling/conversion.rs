//! Quantity conversion seam
//!
//! The labeling core never converts units itself; it asks a
//! [`QuantityConversion`] implementation (see `crate::uom::UnitTable`).

use thiserror::Error;

/// Failures of the conversion service
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("Unknown unit of measure: '{0}'")]
    UnknownUnit(String),

    #[error("Cannot convert '{from}' to '{to}': units belong to different categories")]
    IncompatibleUnits { from: String, to: String },
}

/// Converts quantities between units of measure
pub trait QuantityConversion {
    /// Convert `quantity` from `from_unit` into `to_unit`.
    ///
    /// With `round = false` the full floating precision is kept; the
    /// labeling core always asks for that.
    fn convert(
        &self,
        from_unit: &str,
        quantity: f64,
        to_unit: &str,
        round: bool,
    ) -> Result<f64, ConversionError>;
}

impl<T: QuantityConversion + ?Sized> QuantityConversion for &T {
    fn convert(
        &self,
        from_unit: &str,
        quantity: f64,
        to_unit: &str,
        round: bool,
    ) -> Result<f64, ConversionError> {
        (**self).convert(from_unit, quantity, to_unit, round)
    }
}

/// Whether two unit names denote the same unit (no conversion needed)
pub fn same_unit(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
