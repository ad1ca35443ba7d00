//! Presentation of a computed split.
//!
//! This is where tax meets the per-person totals: each participant owes their
//! item total plus an equal share of the receipt tax.

use crate::engine::SplitResult;
use crate::error::Result;
use crate::money::Money;
use std::io::Write;

/// What one person owes, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonShare {
    pub name: String,
    pub items_total: Money,
    pub tax_share: Money,
    pub owed: Money,
}

/// Per-person amounts including the flat tax share, in roster order.
pub fn person_shares(result: &SplitResult) -> Vec<PersonShare> {
    let tax_share = result.tax_share();
    result
        .totals
        .iter()
        .map(|t| PersonShare {
            name: t.name.clone(),
            items_total: t.total,
            tax_share,
            owed: t.total + tax_share,
        })
        .collect()
}

/// Writes the split as CSV: one row per person, then a `TOTAL` row carrying
/// the grand total.
///
/// Amounts are rounded to two decimal places and prefixed with
/// `currency_symbol`. A calculation warning, if any, is appended as a final
/// `note` row.
pub fn write_csv<W: Write>(result: &SplitResult, currency_symbol: &str, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let amount = |m: Money| format!("{}{}", currency_symbol, m);

    csv_writer.write_record(["name", "items", "tax", "owed"])?;

    for share in person_shares(result) {
        csv_writer.write_record([
            share.name,
            amount(share.items_total),
            amount(share.tax_share),
            amount(share.owed),
        ])?;
    }

    let items_total = result.grand_total - result.tax_total;
    csv_writer.write_record([
        "TOTAL".to_string(),
        amount(items_total),
        amount(result.tax_total),
        amount(result.grand_total),
    ])?;

    if let Some(warning) = result.warning {
        csv_writer.write_record([
            "note".to_string(),
            format!("{:?}", warning.severity()).to_lowercase(),
            String::new(),
            warning.message().to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}
