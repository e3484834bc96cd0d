//! Date handling for the `Created at` column.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

use remito_core::Table;

/// Formats Shopify has been seen exporting into `Created at`.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%dT%H:%M:%S%z"];
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parse a `Created at` cell into a date, if possible.
pub(crate) fn parse_created_at(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(value, format) {
            return Some(parsed.date_naive());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    None
}

/// Render a cell date as `DD/MM/YYYY`; unparseable cells become empty.
pub(crate) fn display_date(value: &str) -> String {
    parse_created_at(value)
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}

/// The `DD-MM-YYYY` date used to name output files: the first parseable
/// `Created at` in the table, falling back to today.
pub(crate) fn file_date(table: &Table) -> String {
    let date = table
        .column_index("Created at")
        .and_then(|col| {
            (0..table.len()).find_map(|row| parse_created_at(table.cell(row, col)))
        })
        .unwrap_or_else(|| Local::now().date_naive());
    date.format("%d-%m-%Y").to_string()
}
