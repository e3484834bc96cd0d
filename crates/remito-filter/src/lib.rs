//! remito-filter - Tabular filters over Shopify order exports.
//!
//! Reads CSV exports into [`remito_core::Table`], concatenates them, and
//! applies the Argentina and Andreani output filters. Filters are pure:
//! same rows and criteria in, same table out, no side effects.

mod andreani;
mod argentina;
mod classify;
mod concat;
mod dates;
mod dni;
mod export;
mod read;

pub use andreani::andreani_filter;
pub use argentina::{argentina_filter, ArgentinaOutput};
pub use concat::concat_tables;
pub use export::export_csv;
pub use read::{read_csv_file, read_csv_reader};
