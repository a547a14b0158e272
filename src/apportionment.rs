use crate::billing::{BillingPeriod, SubUnit};
use bigdecimal::{BigDecimal, Zero};

/// One sub-unit's share of the bill.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitResult {
    pub name: String,
    pub measured_volume: BigDecimal,
    pub adjustment: BigDecimal,
    pub final_volume: BigDecimal,
    pub amount_due: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Sum of the sub-unit meters.
    pub total_measured_volume: BigDecimal,
    /// Billed volume minus the sum of the sub-unit meters.
    pub total_difference: BigDecimal,
    pub per_unit_adjustment: BigDecimal,
    pub total_amount_due: BigDecimal,
    pub total_final_volume: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Liquidation {
    pub units: Vec<UnitResult>,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Apportionment {
    Settled(Liquidation),
    /// The sub-unit meters add up to nothing (or less), so there is no
    /// consumption to spread the difference across.
    Indeterminate { total_measured_volume: BigDecimal },
}

#[cfg(test)]
impl Apportionment {
    pub fn settled(self) -> Option<Liquidation> {
        match self {
            Apportionment::Settled(liquidation) => Some(liquidation),
            Apportionment::Indeterminate { .. } => None,
        }
    }
}

/// Splits the gap between the billed volume and the metered volumes equally
/// across every sub-unit, regardless of how much each one consumed, then prices
/// each unit's final volume at the bill's unit price.
pub fn apportion(period: &BillingPeriod, units: &[SubUnit]) -> Apportionment {
    let measured: Vec<BigDecimal> = units.iter().map(SubUnit::measured_volume).collect();
    let total_measured_volume: BigDecimal = measured.iter().cloned().sum();
    if total_measured_volume <= BigDecimal::zero() {
        return Apportionment::Indeterminate {
            total_measured_volume,
        };
    }

    let total_difference = &period.billed_volume - &total_measured_volume;
    let per_unit_adjustment = total_difference.clone() / BigDecimal::from(units.len() as u64);

    let results: Vec<UnitResult> = units
        .iter()
        .zip(measured)
        .map(|(unit, measured_volume)| {
            let final_volume = &measured_volume + &per_unit_adjustment;
            let amount_due = &final_volume * &period.unit_price;
            UnitResult {
                name: unit.name.clone(),
                measured_volume,
                adjustment: per_unit_adjustment.clone(),
                final_volume,
                amount_due,
            }
        })
        .collect();

    let total_amount_due = results.iter().map(|r| r.amount_due.clone()).sum();
    let total_final_volume = results.iter().map(|r| r.final_volume.clone()).sum();
    Apportionment::Settled(Liquidation {
        units: results,
        summary: Summary {
            total_measured_volume,
            total_difference,
            per_unit_adjustment,
            total_amount_due,
            total_final_volume,
        },
    })
}
