use crate::apportionment::Liquidation;
use crate::billing::BillingPeriod;
use crate::format;
use bigdecimal::BigDecimal;
use std::io::{self, Write};

const HEADERS: [&str; 5] = [
    "Unit",
    "Individual Volume",
    "Adjustment (+)",
    "Final Volume",
    "Amount Due",
];

/// Renders the results table and the two check totals for the terminal.
pub fn write_report(
    out: &mut impl Write,
    period: &BillingPeriod,
    liquidation: &Liquidation,
) -> io::Result<()> {
    let summary = &liquidation.summary;
    writeln!(out, "Liquidation Results - {}", period.label())?;
    writeln!(out)?;
    writeln!(
        out,
        "  Total difference to distribute: {}",
        format::volume(&summary.total_difference)
    )?;
    writeln!(
        out,
        "  Adjustment per unit:            {}",
        format::volume(&summary.per_unit_adjustment)
    )?;
    writeln!(out)?;

    let adjustment = format::volume(&summary.per_unit_adjustment);
    let rows: Vec<[String; 5]> = liquidation
        .units
        .iter()
        .map(|unit| {
            [
                unit.name.clone(),
                format::volume(&unit.measured_volume),
                adjustment.clone(),
                format::volume(&unit.final_volume),
                format::currency(&unit.amount_due),
            ]
        })
        .collect();
    write_table(out, &rows)?;

    writeln!(out)?;
    writeln!(
        out,
        "Total amount due:   {}",
        format::currency(&summary.total_amount_due)
    )?;
    writeln!(
        out,
        "Total final volume: {}",
        format::volume(&summary.total_final_volume)
    )
}

pub fn write_indeterminate(
    out: &mut impl Write,
    total_measured_volume: &BigDecimal,
) -> io::Result<()> {
    writeln!(
        out,
        "Cannot apportion: the sub-unit meters add up to {}, so there is no consumption to spread the bill across.",
        format::volume(total_measured_volume)
    )
}

fn write_table(out: &mut impl Write, rows: &[[String; 5]]) -> io::Result<()> {
    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let separator = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    writeln!(out, "+{separator}+")?;
    write_row(out, &widths, HEADERS.iter().map(|h| h.to_string()))?;
    writeln!(out, "+{separator}+")?;
    for row in rows {
        write_row(out, &widths, row.iter().cloned())?;
    }
    writeln!(out, "+{separator}+")
}

fn write_row(
    out: &mut impl Write,
    widths: &[usize; 5],
    cells: impl Iterator<Item = String>,
) -> io::Result<()> {
    write!(out, "|")?;
    for (i, (cell, width)) in cells.zip(widths.iter().copied()).enumerate() {
        // Unit names read left to right; figures line up on the right.
        if i == 0 {
            write!(out, " {cell:<width$} |")?;
        } else {
            write!(out, " {cell:>width$} |")?;
        }
    }
    writeln!(out)
}
