use tabled::{Table, Tabled, settings::Style};

use crate::record::ImportResult;

#[derive(Tabled)]
struct TotalsRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Render store totals as a rounded two-column table.
pub fn totals_table(totals: &ImportResult) -> String {
    let rows = [
        TotalsRow {
            metric: "Total items",
            value: totals.total_items.to_string(),
        },
        TotalsRow {
            metric: "Total categories",
            value: totals.total_categories.to_string(),
        },
        TotalsRow {
            metric: "Total price",
            value: totals.total_price.to_string(),
        },
    ];
    Table::new(rows).with(Style::rounded()).to_string()
}
