//! Order classification shared by the Argentina and Andreani filters.
//!
//! Classification reads the raw export columns and produces one status
//! label per row. Passes run in a fixed order; a later pass overwrites the
//! label of an earlier one, so the priority is exactly the pass order.

use std::collections::HashMap;

use remito_core::{FilterStats, Result, Table};

use crate::dni;

pub(crate) const STATUS_REVIEW_DNI: &str = "REVISAR DNI";
pub(crate) const STATUS_EXPIRED: &str = "VENCIDO";
pub(crate) const STATUS_REFUNDED: &str = "REEMBOLSADO";
pub(crate) const STATUS_PENDING: &str = "FALTA PAGAR";
pub(crate) const STATUS_CABA: &str = "CABA";
pub(crate) const STATUS_PRIORITY: &str = "PRIORITARIO";
pub(crate) const STATUS_CABA_PRIORITY: &str = "CABA PRIORITARIO";
pub(crate) const STATUS_REVIEW_NOTES: &str = "REVISAR NOTAS EN SHOPIFY";
pub(crate) const STATUS_TIERRA_DEL_FUEGO: &str = "TIERRA DEL FUEGO";

/// The shipping method sold as priority delivery.
const PRIORITY_METHOD: &str = "Envío Prioritario + Garantía extendida";

/// Postal code prefixes for CABA, including the quoted and truncated
/// variants spreadsheets produce.
const CABA_ZIP_PREFIXES: &[&str] = &[
    "C14", "C11", "C10", "C12", "C15", "C13", "'15", "'14", "'13", "'12", "'11", "'10", "15",
    "14", "13", "12", "11", "10",
];

fn is_caba_zip(zip: &str) -> bool {
    CABA_ZIP_PREFIXES.iter().any(|p| zip.starts_with(p))
}

/// Compute the status label for every row of the raw export.
///
/// The required columns are `Financial Status`, `Shipping Company`,
/// `Shipping Zip`, `Shipping Method`, `Notes`, and
/// `Shipping Province Name`.
pub(crate) fn classify(source: &Table) -> Result<Vec<String>> {
    let financial = source.require_column("Financial Status")?;
    let company = source.require_column("Shipping Company")?;
    let zip = source.require_column("Shipping Zip")?;
    let method = source.require_column("Shipping Method")?;
    let notes = source.require_column("Notes")?;
    let province = source.require_column("Shipping Province Name")?;

    let mut status = vec![String::new(); source.len()];

    // Pass 1: financial state and DNI validity.
    for (i, row) in source.rows().enumerate() {
        match row[financial].as_str() {
            "paid" => {
                if !dni::is_valid(&row[company]) {
                    status[i] = STATUS_REVIEW_DNI.to_string();
                }
            }
            "expired" => status[i] = STATUS_EXPIRED.to_string(),
            "refunded" => status[i] = STATUS_REFUNDED.to_string(),
            "pending" => status[i] = STATUS_PENDING.to_string(),
            _ => {}
        }
    }

    // Pass 2: CABA postal codes, then priority shipping elsewhere.
    for (i, row) in source.rows().enumerate() {
        if row[financial] != "paid" {
            continue;
        }
        if is_caba_zip(&row[zip]) {
            status[i] = STATUS_CABA.to_string();
        } else if row[method] == PRIORITY_METHOD {
            status[i] = STATUS_PRIORITY.to_string();
        }
    }

    // Pass 3: orders that are both CABA and priority.
    for (i, row) in source.rows().enumerate() {
        if row[financial] == "paid" && row[method] == PRIORITY_METHOD && is_caba_zip(&row[zip]) {
            status[i] = STATUS_CABA_PRIORITY.to_string();
        }
    }

    // Pass 4: manual-review notes beat everything; Tierra del Fuego needs
    // special carrier handling.
    for (i, row) in source.rows().enumerate() {
        if row[financial] != "paid" {
            continue;
        }
        if !row[notes].trim().is_empty() {
            status[i] = STATUS_REVIEW_NOTES.to_string();
        } else if row[province] == "Tierra del Fuego" {
            status[i] = STATUS_TIERRA_DEL_FUEGO.to_string();
        }
    }

    Ok(status)
}

/// Give every line of an order the status of the order's first line.
///
/// Orders span multiple rows (one per line item); the spreadsheet reader
/// expects one status per order.
pub(crate) fn unify_by_order(table: &mut Table, status_col: usize, name_col: usize) {
    let mut first_status: HashMap<String, String> = HashMap::new();
    for i in 0..table.len() {
        first_status
            .entry(table.cell(i, name_col).to_string())
            .or_insert_with(|| table.cell(i, status_col).to_string());
    }
    for i in 0..table.len() {
        let name = table.cell(i, name_col).to_string();
        if let Some(status) = first_status.get(&name) {
            table.set_cell(i, status_col, status.clone());
        }
    }
}

/// Distinct-order counts per category over the finished table.
pub(crate) fn stats(table: &Table, status_col: usize, name_col: usize) -> FilterStats {
    let mut sets: HashMap<&str, std::collections::HashSet<&str>> = HashMap::new();
    for i in 0..table.len() {
        sets.entry(table.cell(i, status_col))
            .or_default()
            .insert(table.cell(i, name_col));
    }
    let count = |status: &str| sets.get(status).map(|s| s.len()).unwrap_or(0);

    FilterStats {
        caba: count(STATUS_CABA),
        pending_payment: count(STATUS_PENDING),
        expired: count(STATUS_EXPIRED),
        refunded: count(STATUS_REFUNDED),
        review_notes: count(STATUS_REVIEW_NOTES),
        review_dni: count(STATUS_REVIEW_DNI),
        unclassified: count(""),
    }
}
