//! Local CSV export of finished tables.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use remito_core::error::{Error, InvalidInputError};
use remito_core::{Result, Table};

/// Write a finished table as `Archivo_Completo_{date}_{label}.csv` in
/// `dir`, returning the file's path.
///
/// The write goes through a temp file and a rename, so a half-written
/// export is never left behind under the final name.
#[instrument(skip(table, dir), fields(rows = table.len(), %label))]
pub fn export_csv(table: &Table, dir: impl AsRef<Path>, date: &str, label: &str) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| map_io(dir, e))?;

    let path = dir.join(format!("Archivo_Completo_{}_{}.csv", date, label));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(table.columns())
        .map_err(|e| map_csv(&path, e))?;
    for row in table.rows() {
        writer.write_record(row).map_err(|e| map_csv(&path, e))?;
    }
    writer.flush().map_err(|e| map_io(&path, e))?;
    let bytes = writer.into_inner().map_err(|e| {
        Error::InvalidInput(InvalidInputError::Other {
            message: format!("cannot encode {}: {}", path.display(), e.error()),
        })
    })?;

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, &bytes).map_err(|e| map_io(&temp_path, e))?;
    fs::rename(&temp_path, &path).map_err(|e| map_io(&path, e))?;

    debug!(path = %path.display(), "Exported CSV");
    Ok(path)
}

fn map_io(path: &Path, err: std::io::Error) -> Error {
    Error::InvalidInput(InvalidInputError::Other {
        message: format!("cannot write {}: {}", path.display(), err),
    })
}

fn map_csv(path: &Path, err: csv::Error) -> Error {
    Error::InvalidInput(InvalidInputError::Other {
        message: format!("cannot encode {}: {}", path.display(), err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::read_csv_file;

    #[test]
    fn export_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::from_parts(
            vec!["Name".into(), "Notes".into()],
            vec![vec!["#1".into(), "ring bell, twice".into()]],
        )
        .unwrap();

        let path = export_csv(&table, dir.path(), "09-03-2024", "Argentina").unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "Archivo_Completo_09-03-2024_Argentina.csv"
        );
        let restored = read_csv_file(&path).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn export_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("salidas").join("hoy");
        let table = Table::from_parts(vec!["Name".into()], vec![vec!["#1".into()]]).unwrap();

        let path = export_csv(&table, &nested, "01-01-2024", "Andreani").unwrap();
        assert!(path.exists());
    }
}
