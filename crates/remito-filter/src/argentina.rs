//! Argentina output filter.

use tracing::{debug, instrument};

use remito_core::{FilterStats, Result, Table};

use crate::classify;
use crate::dates;

/// Columns copied from the raw export, in output order.
const OUTPUT_COLUMNS: &[&str] = &[
    "Created at",
    "Name",
    "Shipping Name",
    "Lineitem quantity",
    "Lineitem name",
    "Total",
    "Shipping Province Name",
    "Shipping Street",
    "Shipping Zip",
    "Shipping Phone",
    "Email",
    "Lineitem sku",
];

/// Result of the Argentina filter.
#[derive(Debug, Clone)]
pub struct ArgentinaOutput {
    /// The finished output table.
    pub table: Table,
    /// `DD-MM-YYYY` date for naming derived files.
    pub file_date: String,
    /// Distinct-order counts per category, for the status view.
    pub stats: FilterStats,
}

/// Produce the Argentina-format table from a raw export.
///
/// Selects the reporting columns, reformats dates, inserts the status and
/// spare classification columns, classifies each order, and unifies the
/// status across each order's line items.
#[instrument(skip(source), fields(rows = source.len()))]
pub fn argentina_filter(source: &Table) -> Result<ArgentinaOutput> {
    debug!("Applying Argentina filter");

    let status = classify::classify(source)?;
    let file_date = dates::file_date(source);

    let mut table = source.select(OUTPUT_COLUMNS)?;
    table.map_column("Created at", dates::display_date);

    // Status and three spare columns between the zip and the phone.
    table.insert_column(9, "Status", "");
    table.insert_column(10, "NC2", "");
    table.insert_column(11, "NC3", "");
    table.insert_column(12, "NC4", "");

    let status_col = 9;
    for (i, s) in status.into_iter().enumerate() {
        table.set_cell(i, status_col, s);
    }

    let name_col = table.require_column("Name")?;
    classify::unify_by_order(&mut table, status_col, name_col);

    table.map_column("Shipping Phone", scrub_phone);

    let stats = classify::stats(&table, status_col, name_col);
    debug!(?stats, "Argentina filter finished");

    Ok(ArgentinaOutput {
        table,
        file_date,
        stats,
    })
}

/// Drop the `.0` artifact spreadsheets append to numeric phone cells.
pub(crate) fn scrub_phone(value: &str) -> String {
    let value = if value == "nan" { "" } else { value };
    value.strip_suffix(".0").unwrap_or(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Table {
        let columns = vec![
            "Created at",
            "Name",
            "Shipping Name",
            "Lineitem quantity",
            "Lineitem name",
            "Total",
            "Shipping Province Name",
            "Shipping Street",
            "Shipping Zip",
            "Shipping Phone",
            "Email",
            "Lineitem sku",
            "Financial Status",
            "Shipping Company",
            "Shipping Method",
            "Notes",
        ];
        let rows = vec![
            vec![
                "2024-03-09 14:22:01 -0300",
                "#1001",
                "Ana García",
                "1",
                "Mate Imperial",
                "15000",
                "CABA",
                "Av. Corrientes 1234",
                "C1414",
                "1155550000.0",
                "ana@example.com",
                "SKU-1",
                "paid",
                "12345678",
                "Standard",
                "",
            ],
            vec![
                "2024-03-09 15:02:44 -0300",
                "#1001",
                "Ana García",
                "2",
                "Bombilla",
                "3000",
                "CABA",
                "Av. Corrientes 1234",
                "C1414",
                "1155550000.0",
                "ana@example.com",
                "SKU-2",
                "paid",
                "12345678",
                "Standard",
                "",
            ],
            vec![
                "2024-03-10 09:00:00 -0300",
                "#1002",
                "Juan Pérez",
                "1",
                "Termo",
                "20000",
                "Córdoba",
                "Bv. San Juan 500",
                "5000",
                "3515550000",
                "juan@example.com",
                "SKU-3",
                "pending",
                "87654321",
                "Standard",
                "",
            ],
        ];
        Table::from_parts(
            columns.into_iter().map(str::to_string).collect(),
            rows.into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn output_has_expected_column_layout() {
        let out = argentina_filter(&source()).unwrap();
        let columns: Vec<&str> = out.table.columns().iter().map(String::as_str).collect();
        assert_eq!(
            columns,
            vec![
                "Created at",
                "Name",
                "Shipping Name",
                "Lineitem quantity",
                "Lineitem name",
                "Total",
                "Shipping Province Name",
                "Shipping Street",
                "Shipping Zip",
                "Status",
                "NC2",
                "NC3",
                "NC4",
                "Shipping Phone",
                "Email",
                "Lineitem sku",
            ]
        );
    }

    #[test]
    fn dates_are_reformatted_and_file_date_derived() {
        let out = argentina_filter(&source()).unwrap();
        assert_eq!(out.table.get(0, "Created at"), "09/03/2024");
        assert_eq!(out.file_date, "09-03-2024");
    }

    #[test]
    fn status_is_unified_per_order() {
        let out = argentina_filter(&source()).unwrap();
        assert_eq!(out.table.get(0, "Status"), "CABA");
        assert_eq!(out.table.get(1, "Status"), "CABA");
        assert_eq!(out.table.get(2, "Status"), "FALTA PAGAR");
    }

    #[test]
    fn phone_artifacts_are_scrubbed() {
        let out = argentina_filter(&source()).unwrap();
        assert_eq!(out.table.get(0, "Shipping Phone"), "1155550000");
    }

    #[test]
    fn stats_reflect_distinct_orders() {
        let out = argentina_filter(&source()).unwrap();
        assert_eq!(out.stats.caba, 1);
        assert_eq!(out.stats.pending_payment, 1);
        assert_eq!(out.stats.unclassified, 0);
    }

    #[test]
    fn filter_is_deterministic() {
        let a = argentina_filter(&source()).unwrap();
        let b = argentina_filter(&source()).unwrap();
        assert_eq!(a.table, b.table);
        assert_eq!(a.stats, b.stats);
    }

    #[test]
    fn missing_column_is_an_error() {
        let table = Table::from_parts(vec!["Name".into()], vec![vec!["#1".into()]]).unwrap();
        assert!(argentina_filter(&table).is_err());
    }
}
