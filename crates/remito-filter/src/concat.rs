//! Input concatenation.

use tracing::{debug, instrument};

use remito_core::error::{Error, FilterError};
use remito_core::{Result, SortOrder, Table};

/// Merge several parsed exports into one table.
///
/// Columns align by name on the union of all schemas, in order of first
/// appearance; cells missing from a source file come through empty. The
/// result is sorted by order number ascending and recipient name
/// descending, the order the rest of the pipeline expects.
#[instrument(skip(tables), fields(inputs = tables.len()))]
pub fn concat_tables(tables: Vec<Table>) -> Result<Table> {
    if tables.is_empty() {
        return Err(Error::Filter(FilterError::EmptyInput));
    }

    let mut columns: Vec<String> = Vec::new();
    for table in &tables {
        for column in table.columns() {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
    }

    let mut merged = Table::new(columns.clone());
    for table in tables {
        let indices: Vec<Option<usize>> =
            columns.iter().map(|c| table.column_index(c)).collect();
        for row in table.rows() {
            let cells = indices
                .iter()
                .map(|idx| idx.map(|i| row[i].clone()).unwrap_or_default())
                .collect();
            merged.push_row(cells)?;
        }
    }

    merged.sort_by(&[
        ("Name", SortOrder::Ascending),
        ("Shipping Name", SortOrder::Descending),
    ])?;

    debug!(rows = merged.len(), columns = merged.width(), "Inputs concatenated");
    Ok(merged)
}
