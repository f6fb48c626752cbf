//! Ingredient labeling
//!
//! Expands a product's bill of materials into leaf ingredients, aggregates
//! them by weight and renders the ingredient list with allergen emphasis.
//! Catalog access, unit conversion and tracing are injected through the
//! [`Catalog`], [`QuantityConversion`] and [`DiagnosticSink`] traits.

pub mod aggregator;
pub mod catalog;
pub mod conversion;
pub mod diagnostics;
pub mod error;
pub mod expander;
pub mod ingredients;
pub mod service;
pub mod types;

pub use aggregator::{Aggregator, PERCENTAGE_DEVIATION_LIMIT};
pub use catalog::{Catalog, CatalogError, MemoryCatalog};
pub use conversion::{same_unit, ConversionError, QuantityConversion};
pub use diagnostics::{Diagnostic, DiagnosticSink, NullSink, TracingSink};
pub use error::{LabelingError, LabelingResult};
pub use expander::{Expander, LabelingOptions, DEFAULT_MAX_DEPTH};
pub use ingredients::{Accumulator, IngredientMap};
pub use service::{
    batch_compute, batch_compute_ids, compute_labeling, preview_labeling, BatchFailure,
    BatchReport, BatchSuccess,
};
pub use types::{AllergenId, AllergenSet, BomEntry, BomLine, Product, ProductId, ResultRecord};
