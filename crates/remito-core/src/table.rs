//! In-memory tabular data model.
//!
//! Inputs arrive as CSV text and every cell is uploaded as a string, so the
//! table stores string cells only. Filters take a table and return a new
//! table; nothing here performs IO.

use crate::error::{Error, FilterError};
use crate::Result;

/// Sort direction for [`Table::sort_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A rectangular table of string cells with named columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given column names.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from a header and rows, validating rectangularity.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::SchemaMismatch`] if any row's width differs
    /// from the header's.
    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::Filter(FilterError::SchemaMismatch {
                    row: i + 1,
                    expected: columns.len(),
                    found: row.len(),
                }));
            }
        }
        Ok(Self { columns, rows })
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Find a column's index by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Find a column's index by name, erroring if absent.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| {
                Error::Filter(FilterError::MissingColumn {
                    column: name.to_string(),
                })
            })
    }

    /// Append a row.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::SchemaMismatch`] if the row's width differs
    /// from the header's.
    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::Filter(FilterError::SchemaMismatch {
                row: self.rows.len() + 1,
                expected: self.columns.len(),
                found: row.len(),
            }));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Iterate over the data rows.
    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    /// Read a cell.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        &self.rows[row][col]
    }

    /// Read a cell by column name; empty string if the column is absent.
    pub fn get(&self, row: usize, column: &str) -> &str {
        self.column_index(column)
            .map(|c| self.cell(row, c))
            .unwrap_or("")
    }

    /// Overwrite a cell.
    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<String>) {
        self.rows[row][col] = value.into();
    }

    /// Project the table onto the named columns, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::MissingColumn`] for the first absent name.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let indices = names
            .iter()
            .map(|n| self.require_column(n))
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Table {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows,
        })
    }

    /// Insert an empty column at `index`, filled with `fill` for every row.
    pub fn insert_column(&mut self, index: usize, name: impl Into<String>, fill: &str) {
        let index = index.min(self.columns.len());
        self.columns.insert(index, name.into());
        for row in &mut self.rows {
            row.insert(index, fill.to_string());
        }
    }

    /// Apply `f` to every cell of the named column. No-op if absent.
    pub fn map_column(&mut self, name: &str, mut f: impl FnMut(&str) -> String) {
        if let Some(col) = self.column_index(name) {
            for row in &mut self.rows {
                row[col] = f(&row[col]);
            }
        }
    }

    /// Stable sort by the listed `(column, order)` keys, leftmost key most
    /// significant. Cells compare as strings.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::MissingColumn`] for the first absent key.
    pub fn sort_by(&mut self, keys: &[(&str, SortOrder)]) -> Result<()> {
        let resolved = keys
            .iter()
            .map(|(name, order)| Ok((self.require_column(name)?, *order)))
            .collect::<Result<Vec<_>>>()?;

        self.rows.sort_by(|a, b| {
            for &(col, order) in &resolved {
                let cmp = a[col].cmp(&b[col]);
                let cmp = match order {
                    SortOrder::Ascending => cmp,
                    SortOrder::Descending => cmp.reverse(),
                };
                if !cmp.is_eq() {
                    return cmp;
                }
            }
            std::cmp::Ordering::Equal
        });
        Ok(())
    }

    /// Consume the table into `(columns, rows)`.
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<String>>) {
        (self.columns, self.rows)
    }
}
