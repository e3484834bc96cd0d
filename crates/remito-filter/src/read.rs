//! CSV input reading.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, instrument};

use remito_core::error::{Error, FilterError, InvalidInputError};
use remito_core::{Result, Table};

/// Read a CSV export from disk.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_csv_file(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        Error::InvalidInput(InvalidInputError::Other {
            message: format!("cannot open {}: {}", path.display(), e),
        })
    })?;
    let table = read_csv_reader(file)?;
    debug!(rows = table.len(), "CSV file loaded");
    Ok(table)
}

/// Read a CSV export from any reader.
pub fn read_csv_reader(reader: impl Read) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let columns: Vec<String> = csv_reader
        .headers()
        .map_err(map_csv)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut table = Table::new(columns);
    for record in csv_reader.records() {
        let record = record.map_err(map_csv)?;
        table.push_row(record.iter().map(str::to_string).collect())?;
    }
    Ok(table)
}

fn map_csv(err: csv::Error) -> Error {
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => Error::Filter(FilterError::SchemaMismatch {
            row: pos.as_ref().map(|p| p.line() as usize).unwrap_or(0),
            expected: *expected_len as usize,
            found: *len as usize,
        }),
        _ => Error::InvalidInput(InvalidInputError::Other {
            message: err.to_string(),
        }),
    }
}
