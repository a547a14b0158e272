use crate::apportionment::Liquidation;
use crate::billing::BillingPeriod;
use crate::format;

pub const TABLE_HEADER: [&str; 4] = ["Unit", "Individual Volume", "Final Volume", "Amount Due"];

/// What goes on the exported liquidation, independent of how it is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationDocument {
    pub title: String,
    pub summary_heading: &'static str,
    /// Labelled figures, laid out two per line.
    pub summary: Vec<(&'static str, String)>,
    pub header: [&'static str; 4],
    pub rows: Vec<[String; 4]>,
}

impl LiquidationDocument {
    pub fn new(period: &BillingPeriod, liquidation: &Liquidation) -> Self {
        let adjustment = format!(
            "{} per unit",
            format::volume(&liquidation.summary.per_unit_adjustment)
        );
        Self {
            title: format!("Liquidation of Services \u{2014} {}", period.label()),
            summary_heading: "Bill Summary",
            summary: vec![
                ("Total billed", format::currency(&period.total_billed)),
                ("Total billed volume", format::volume(&period.billed_volume)),
                ("Unit price", format::unit_price(&period.unit_price)),
                ("Adjustment", adjustment),
            ],
            header: TABLE_HEADER,
            rows: liquidation
                .units
                .iter()
                .map(|unit| {
                    [
                        unit.name.clone(),
                        format::volume(&unit.measured_volume),
                        format::volume(&unit.final_volume),
                        format::currency(&unit.amount_due),
                    ]
                })
                .collect(),
        }
    }
}
