//! Andreani logistics output filter.
//!
//! Same classification as the Argentina filter, but laid out for the
//! Andreani shipping manifest: parcel columns with fixed defaults
//! interleaved between the contact columns.

use tracing::{debug, instrument};

use remito_core::{Result, Table};

use crate::argentina::scrub_phone;
use crate::classify;

/// Columns copied from the raw export, in output order.
const OUTPUT_COLUMNS: &[&str] = &[
    "Name",
    "Shipping Name",
    "Shipping Company",
    "Email",
    "Shipping Phone",
    "Shipping Street",
    "Shipping Address2",
    "Shipping City",
    "Shipping Zip",
    "Shipping Province Name",
    "Notes",
];

/// Parcel defaults Andreani expects on every row: weight in grams,
/// dimensions in cm, declared value in pesos, and the country phone code.
const PARCEL_WEIGHT: &str = "100";
const PARCEL_HEIGHT: &str = "10";
const PARCEL_WIDTH: &str = "15";
const PARCEL_DEPTH: &str = "10";
const PARCEL_DECLARED_VALUE: &str = "4500";
const PHONE_COUNTRY_CODE: &str = "54";

/// Produce the Andreani manifest table from a raw export.
#[instrument(skip(source), fields(rows = source.len()))]
pub fn andreani_filter(source: &Table) -> Result<Table> {
    debug!("Applying Andreani filter");

    let status = classify::classify(source)?;

    let mut table = source.select(OUTPUT_COLUMNS)?;

    table.insert_column(1, "Peso", PARCEL_WEIGHT);
    table.insert_column(2, "Alto", PARCEL_HEIGHT);
    table.insert_column(3, "Ancho", PARCEL_WIDTH);
    table.insert_column(4, "Profun", PARCEL_DEPTH);
    table.insert_column(5, "Val decl", PARCEL_DECLARED_VALUE);
    table.insert_column(6, "Status", "");
    table.insert_column(8, "NC", ".");
    table.insert_column(11, "CodNum", PHONE_COUNTRY_CODE);

    let status_col = 6;
    for (i, s) in status.into_iter().enumerate() {
        table.set_cell(i, status_col, s);
    }

    let name_col = table.require_column("Name")?;
    classify::unify_by_order(&mut table, status_col, name_col);

    table.map_column("Shipping Phone", scrub_phone);
    // Spreadsheet artifacts in free-text cells become empty.
    table.map_column("Shipping Name", |v| {
        if v == "nan" { String::new() } else { v.to_string() }
    });

    debug!("Andreani filter finished");
    Ok(table)
}
