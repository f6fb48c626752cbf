//! Labeling error types

use thiserror::Error;

use super::catalog::CatalogError;
use super::conversion::ConversionError;
use super::types::ProductId;

/// Errors raised while expanding or aggregating a product
#[derive(Debug, Error)]
pub enum LabelingError {
    #[error("Product {name} ({product}) is not activated for nutrition")]
    NutritionNotActivated { product: ProductId, name: String },

    #[error("Norm weight for product {name} ({product}) must be greater than 0, got {norm_weight}")]
    InvalidNormWeight {
        product: ProductId,
        name: String,
        norm_weight: f64,
    },

    #[error("Malformed BoM {bom_id} of product {name} ({product}): {reason}")]
    MalformedBom {
        product: ProductId,
        name: String,
        bom_id: i64,
        reason: String,
    },

    #[error("BoM cycle detected at product {name} ({product}), path: {}", format_path(.path))]
    CycleDetected {
        product: ProductId,
        name: String,
        path: Vec<ProductId>,
    },

    #[error("BoM of product {name} ({product}) is nested deeper than {max_depth} levels")]
    DepthExceeded {
        product: ProductId,
        name: String,
        max_depth: usize,
    },

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl LabelingError {
    /// Stable tag for batch reports
    pub fn kind(&self) -> &'static str {
        match self {
            LabelingError::NutritionNotActivated { .. } => "nutrition_not_activated",
            LabelingError::InvalidNormWeight { .. } => "invalid_norm_weight",
            LabelingError::MalformedBom { .. } => "malformed_bom",
            LabelingError::CycleDetected { .. } => "cycle_detected",
            LabelingError::DepthExceeded { .. } => "depth_exceeded",
            LabelingError::Conversion(_) => "conversion_error",
            LabelingError::Catalog(_) => "catalog_error",
        }
    }
}

fn format_path(path: &[ProductId]) -> String {
    path.iter()
        .map(ProductId::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result type for labeling operations
pub type LabelingResult<T> = Result<T, LabelingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = LabelingError::CycleDetected {
            product: ProductId(1),
            name: "Dough".to_string(),
            path: vec![ProductId(1), ProductId(2), ProductId(1)],
        };
        assert_eq!(
            err.to_string(),
            "BoM cycle detected at product Dough (#1), path: #1 -> #2 -> #1"
        );
        assert_eq!(err.kind(), "cycle_detected");
    }

    #[test]
    fn test_conversion_error_passes_through() {
        let err: LabelingError = ConversionError::UnknownUnit("bucket".to_string()).into();
        assert_eq!(err.kind(), "conversion_error");
        assert_eq!(err.to_string(), "Unknown unit of measure: 'bucket'");
    }
}
