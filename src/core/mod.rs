//! Core business logic: schema, derivation and aggregation

pub mod config;
pub mod derive;
pub mod error;
pub mod log;
pub mod pipeline;
pub mod pivot;
pub mod record;
pub mod schema;

// Re-export main types for cleaner imports
pub use error::ProcessError;
pub use pipeline::{ProcessedOutput, process};
pub use pivot::{GroupKey, GroupedSummary, PivotSet};
pub use record::{Column, EnrichedRecord, HoldingRecord, Section, Table};
