use crate::core::error::ProcessError;
use crate::core::record::Table;
use std::path::Path;
use tracing::{debug, info};

/// Source of raw holdings tables.
pub trait TableLoader {
    fn load(&self, source: &Path) -> Result<Table, ProcessError>;
}

/// Reads a CSV file with a header row.
#[derive(Debug, Clone, Default)]
pub struct CsvLoader;

impl TableLoader for CsvLoader {
    fn load(&self, source: &Path) -> Result<Table, ProcessError> {
        if !source.exists() {
            return Err(ProcessError::NotFound(source.to_path_buf()));
        }
        info!("Loading data from {}", source.display());

        let load_error = |e: csv::Error| ProcessError::Load {
            path: source.to_path_buf(),
            message: e.to_string(),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(source)
            .map_err(load_error)?;

        let columns: Vec<String> = reader
            .headers()
            .map_err(load_error)?
            .iter()
            .map(str::to_string)
            .collect();
        debug!(?columns, "Read header");

        let rows = reader
            .records()
            .map(|r| r.map(|record| record.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()
            .map_err(load_error)?;

        info!(rows = rows.len(), "Loaded rows");
        Ok(Table::new(columns, rows))
    }
}
