//! Catalog ingestion
//!
//! Parses delivered catalog CSVs into raw track rows, normalizes the text
//! fields, and bulk-imports them with dedup. All three stages are separate so
//! the importer can be fed synthetic rows in tests.

pub mod importer;
pub mod normalizer;
pub mod parser;

pub use importer::{CatalogImporter, ImportReport};
pub use parser::{CatalogParser, RawTrack};
