//! Loading holdings tables and writing processed sections

pub mod csv_table;
pub mod export;

pub use csv_table::{CsvLoader, TableLoader};
pub use export::{CsvDirWriter, JsonWriter, TableWriter};
