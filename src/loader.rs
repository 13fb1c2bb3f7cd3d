//! Desired-state loading and CSV output.
//!
//! Input rows are headerless `name,type,value` triples. A row with any other
//! column count stops the load and names the offending record.

use crate::models::{DesiredState, Parameter};
use crate::{Error, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const COLUMNS: usize = 3;

/// Read a desired state from headerless CSV.
///
/// Later rows replace earlier rows with the same name.
pub fn load_desired_state<R: Read>(reader: R) -> Result<DesiredState> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut state = DesiredState::new();
    for (idx, result) in rdr.records().enumerate() {
        let record_number = idx + 1;
        let record = result.map_err(|e| Error::MalformedRecord {
            record: record_number,
            reason: e.to_string(),
        })?;
        if record.len() != COLUMNS {
            return Err(Error::MalformedRecord {
                record: record_number,
                reason: format!("expected {} columns (name,type,value), found {}", COLUMNS, record.len()),
            });
        }
        let parameter = Parameter::new(&record[0], &record[1], &record[2]);
        if let Some(replaced) = state.push(parameter) {
            tracing::debug!(name = %replaced.name, record = record_number, "Later row replaces earlier one");
        }
    }
    Ok(state)
}

pub fn load_desired_state_from_path(path: &Path) -> Result<DesiredState> {
    let file = File::open(path).map_err(|e| {
        Error::InvalidInput(format!("cannot open {}: {}", path.display(), e))
    })?;
    let state = load_desired_state(file)?;
    tracing::debug!(path = %path.display(), parameters = state.len(), "Loaded desired state");
    Ok(state)
}

/// Write parameters as headerless `name,type,value` rows.
pub fn write_parameters_csv<'p, W, I>(writer: W, parameters: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'p Parameter>,
{
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for parameter in parameters {
        wtr.write_record([
            parameter.name.as_str(),
            parameter.param_type.as_str(),
            parameter.value.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Create `path` and write `parameters` to it.
pub fn write_parameters_csv_file<'p, I>(path: &Path, parameters: I) -> Result<()>
where
    I: IntoIterator<Item = &'p Parameter>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    write_parameters_csv(file, parameters)
}

/// Append `.ext` to `name` unless it already ends with it.
pub fn resolve_input_path(name: &str, ext: &str) -> PathBuf {
    let suffix = format!(".{}", ext);
    if name.to_lowercase().ends_with(&suffix) {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{}{}", name, suffix))
    }
}
