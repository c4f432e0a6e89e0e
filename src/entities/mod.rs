//! Entity Catalog and Extractor (§4.2).
//!
//! The catalog is loaded once from a TOML document (§6) and frozen;
//! extraction scans only the columns a type's patterns are configured
//! against, defaulting to `_source.log` and never infrastructure/metadata
//! columns — a correctness invariant, not an optimization.

mod catalog;
mod extractor;

pub use catalog::{EntityCatalog, EntityTypeSpec};
pub use extractor::{extract_entities, EntityOccurrenceMap};
