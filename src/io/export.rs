//! Writers for the processed sections.
//!
//! Both writers stage their output next to the destination and move it into
//! place only once every section has been written, so a failed run never
//! leaves a half-written result behind.

use crate::core::config::OutputFormat;
use crate::core::error::ProcessError;
use crate::core::record::{Cell, Section};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Sink for named sections, written in the order given.
pub trait TableWriter {
    fn write(&self, destination: &Path, sections: &[Section]) -> Result<(), ProcessError>;
}

/// Returns the writer for an output format.
pub fn writer_for(format: OutputFormat) -> Box<dyn TableWriter> {
    match format {
        OutputFormat::Csv => Box::new(CsvDirWriter),
        OutputFormat::Json => Box::new(JsonWriter),
    }
}

/// `<stem>_processed` next to the input; JSON output gets a `.json` extension.
pub fn default_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match format {
        OutputFormat::Csv => format!("{stem}_processed"),
        OutputFormat::Json => format!("{stem}_processed.json"),
    };
    input.with_file_name(name)
}

fn parent_dir(destination: &Path) -> Result<PathBuf, ProcessError> {
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| ProcessError::io(&parent, e))?;
    Ok(parent)
}

/// Writes a directory holding one `<section>.csv` per section.
#[derive(Debug, Clone, Default)]
pub struct CsvDirWriter;

impl CsvDirWriter {
    fn write_section(dir: &Path, section: &Section) -> Result<(), ProcessError> {
        let path = dir.join(format!("{}.csv", section.slug()));
        let mut writer = csv::Writer::from_path(&path).map_err(|e| ProcessError::io(&path, e))?;
        writer
            .write_record(&section.columns)
            .map_err(|e| ProcessError::io(&path, e))?;
        for row in &section.rows {
            writer
                .write_record(row.iter().map(Cell::to_string))
                .map_err(|e| ProcessError::io(&path, e))?;
        }
        writer.flush().map_err(|e| ProcessError::io(&path, e))?;
        debug!(section = %section.name, rows = section.rows.len(), "Wrote section");
        Ok(())
    }

    /// An existing destination may only hold files named after the sections.
    fn check_replaceable(destination: &Path, sections: &[Section]) -> Result<(), ProcessError> {
        let known: Vec<String> = sections
            .iter()
            .map(|s| format!("{}.csv", s.slug()))
            .collect();
        let entries = fs::read_dir(destination).map_err(|e| ProcessError::io(destination, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ProcessError::io(destination, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_file = entry
                .file_type()
                .map_err(|e| ProcessError::io(entry.path(), e))?
                .is_file();
            if !is_file || !known.contains(&name) {
                return Err(ProcessError::OutputConflict {
                    path: destination.to_path_buf(),
                    entry: name,
                });
            }
        }
        Ok(())
    }

    /// Swaps `staging` in for an existing `destination`. The previous output is
    /// parked in a sibling backup until the new one is in place.
    fn replace(parent: &Path, staging: &Path, destination: &Path) -> Result<(), ProcessError> {
        let backup = tempfile::Builder::new()
            .prefix(".mfcontrib-old-")
            .tempdir_in(parent)
            .map_err(|e| ProcessError::io(parent, e))?;
        let previous = backup.path().join("previous");
        fs::rename(destination, &previous).map_err(|e| ProcessError::io(destination, e))?;

        if let Err(e) = fs::rename(staging, destination) {
            if let Err(restore) = fs::rename(&previous, destination) {
                let kept = backup.keep();
                warn!(
                    error = %restore,
                    "Could not restore previous output, it was left in {}",
                    kept.display()
                );
            }
            return Err(ProcessError::io(destination, e));
        }
        debug!("Replaced existing output at {}", destination.display());
        Ok(())
    }
}

impl TableWriter for CsvDirWriter {
    fn write(&self, destination: &Path, sections: &[Section]) -> Result<(), ProcessError> {
        let existing = destination.is_dir();
        if existing {
            Self::check_replaceable(destination, sections)?;
        }

        let parent = parent_dir(destination)?;
        let staging = tempfile::Builder::new()
            .prefix(".mfcontrib-")
            .tempdir_in(&parent)
            .map_err(|e| ProcessError::io(&parent, e))?;

        for section in sections {
            Self::write_section(staging.path(), section)?;
        }

        if existing {
            Self::replace(&parent, staging.path(), destination)?;
        } else {
            fs::rename(staging.path(), destination).map_err(|e| ProcessError::io(destination, e))?;
        }

        info!("Output saved successfully to {}", destination.display());
        Ok(())
    }
}

#[derive(Serialize)]
struct SectionDoc<'a> {
    name: &'a str,
    columns: &'a [String],
    rows: Vec<Vec<Value>>,
}

impl<'a> From<&'a Section> for SectionDoc<'a> {
    fn from(section: &'a Section) -> Self {
        SectionDoc {
            name: &section.name,
            columns: &section.columns,
            rows: section
                .rows
                .iter()
                .map(|row| row.iter().map(json_value).collect())
                .collect(),
        }
    }
}

fn json_value(cell: &Cell) -> Value {
    match cell {
        Cell::Empty => Value::Null,
        Cell::Text(s) => Value::String(s.clone()),
        Cell::Integer(i) => Value::from(*i),
        Cell::Number(n) => Value::from(*n),
        Cell::Date(_) => Value::String(cell.to_string()),
    }
}

/// Writes every section into a single JSON document.
#[derive(Debug, Clone, Default)]
pub struct JsonWriter;

impl TableWriter for JsonWriter {
    fn write(&self, destination: &Path, sections: &[Section]) -> Result<(), ProcessError> {
        let parent = parent_dir(destination)?;
        let docs: Vec<SectionDoc<'_>> = sections.iter().map(SectionDoc::from).collect();

        let mut file = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|e| ProcessError::io(&parent, e))?;
        serde_json::to_writer_pretty(&mut file, &docs)
            .map_err(|e| ProcessError::io(destination, e))?;
        file.flush().map_err(|e| ProcessError::io(destination, e))?;
        file.persist(destination)
            .map_err(|e| ProcessError::io(destination, e))?;

        info!("Output saved successfully to {}", destination.display());
        Ok(())
    }
}
