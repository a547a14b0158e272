use bigdecimal::{BigDecimal, Zero};
use clap::ValueEnum;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: BigDecimal },
    #[error("{field} is not a number: {raw:?}")]
    NotANumber { field: &'static str, raw: String },
    #[error("{field} must be written out in full, got {raw:?}")]
    Exponent { field: &'static str, raw: String },
    #[error("{field} allows at most 3 decimal places, got {value}")]
    TooPrecise { field: &'static str, value: BigDecimal },
    #[error("{field} must be below 1,000,000,000,000, got {value}")]
    TooLarge { field: &'static str, value: BigDecimal },
    #[error("unit name must not be blank")]
    BlankName,
}

/// Finest precision a reading, volume or amount may be entered with.
pub const MAX_PLACES: i64 = 3;
/// Exclusive upper bound on any entered figure.
pub const MAX_VALUE: u64 = 1_000_000_000_000;

/// Parses a figure typed by the user. Rejects anything non-numeric, below zero,
/// in exponent notation, finer than [`MAX_PLACES`] or not below [`MAX_VALUE`].
pub fn parse_non_negative(field: &'static str, raw: &str) -> Result<BigDecimal, InputError> {
    let raw = raw.trim();
    let value = BigDecimal::from_str(raw).map_err(|_| InputError::NotANumber {
        field,
        raw: raw.to_string(),
    })?;
    // Exponents would let a short string stand for an enormous number of digits.
    if raw.contains(['e', 'E']) {
        return Err(InputError::Exponent {
            field,
            raw: raw.to_string(),
        });
    }
    let value = ensure_non_negative(field, value)?;
    if value >= BigDecimal::from(MAX_VALUE) {
        return Err(InputError::TooLarge { field, value });
    }
    let (_, scale) = value.normalized().as_bigint_and_exponent();
    if scale > MAX_PLACES {
        return Err(InputError::TooPrecise { field, value });
    }
    Ok(value)
}

pub fn total_billed(raw: &str) -> Result<BigDecimal, InputError> {
    parse_non_negative("total billed", raw)
}

pub fn billed_volume(raw: &str) -> Result<BigDecimal, InputError> {
    parse_non_negative("billed volume", raw)
}

pub fn unit_price(raw: &str) -> Result<BigDecimal, InputError> {
    parse_non_negative("unit price", raw)
}

pub fn prior_reading(raw: &str) -> Result<BigDecimal, InputError> {
    parse_non_negative("prior reading", raw)
}

pub fn current_reading(raw: &str) -> Result<BigDecimal, InputError> {
    parse_non_negative("current reading", raw)
}

fn ensure_non_negative(field: &'static str, value: BigDecimal) -> Result<BigDecimal, InputError> {
    if value < BigDecimal::zero() {
        return Err(InputError::Negative { field, value });
    }
    Ok(value)
}

#[derive(ValueEnum, Copy, Clone, PartialEq, Eq, Debug)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Month for a 1-based calendar number, as `jiff` reports it.
    pub fn from_number(number: i8) -> Option<Self> {
        usize::try_from(number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| Self::ALL.get(index).copied())
    }

    pub fn current() -> Self {
        let today = jiff::Zoned::now();
        Self::from_number(today.month()).unwrap_or(Month::January)
    }

    pub fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Aggregate figures printed on the master bill for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingPeriod {
    pub month: Month,
    pub total_billed: BigDecimal,
    pub billed_volume: BigDecimal,
    pub unit_price: BigDecimal,
}

impl BillingPeriod {
    pub fn new(
        month: Month,
        total_billed: BigDecimal,
        billed_volume: BigDecimal,
        unit_price: BigDecimal,
    ) -> Result<Self, InputError> {
        Ok(Self {
            month,
            total_billed: ensure_non_negative("total billed", total_billed)?,
            billed_volume: ensure_non_negative("billed volume", billed_volume)?,
            unit_price: ensure_non_negative("unit price", unit_price)?,
        })
    }

    pub fn label(&self) -> &'static str {
        self.month.name()
    }
}

/// A metered sub-unit sharing the bill.
#[derive(Debug, Clone, PartialEq)]
pub struct SubUnit {
    pub name: String,
    pub prior_reading: BigDecimal,
    pub current_reading: BigDecimal,
}

impl SubUnit {
    pub fn new(
        name: impl Into<String>,
        prior_reading: BigDecimal,
        current_reading: BigDecimal,
    ) -> Result<Self, InputError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InputError::BlankName);
        }
        Ok(Self {
            name,
            prior_reading: ensure_non_negative("prior reading", prior_reading)?,
            current_reading: ensure_non_negative("current reading", current_reading)?,
        })
    }

    /// Volume consumed since the prior reading. Negative after a meter reset.
    pub fn measured_volume(&self) -> BigDecimal {
        &self.current_reading - &self.prior_reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn measured_volume_may_go_negative() {
        let unit = SubUnit::new("Basement", dec("120.500"), dec("100.250")).unwrap();
        assert_eq!(unit.measured_volume(), dec("-20.250"));
    }

    #[test]
    fn rejects_negative_readings_and_blank_names() {
        assert_eq!(
            SubUnit::new("A", dec("-1"), dec("0")),
            Err(InputError::Negative {
                field: "prior reading",
                value: dec("-1"),
            })
        );
        assert_eq!(
            SubUnit::new("   ", dec("0"), dec("0")),
            Err(InputError::BlankName)
        );
    }

    #[test]
    fn rejects_negative_period_figures() {
        let err = BillingPeriod::new(Month::May, dec("10"), dec("-0.001"), dec("1")).unwrap_err();
        assert!(matches!(err, InputError::Negative { field: "billed volume", .. }));
    }

    #[test]
    fn parses_figures_at_the_boundary() {
        assert_eq!(parse_non_negative("unit price", " 2.500 ").unwrap(), dec("2.5"));
        assert!(matches!(
            parse_non_negative("unit price", "two"),
            Err(InputError::NotANumber { .. })
        ));
        assert!(matches!(
            parse_non_negative("unit price", "-3"),
            Err(InputError::Negative { .. })
        ));
    }

    #[test]
    fn refuses_figures_too_big_or_too_fine() {
        assert!(matches!(
            billed_volume("1e200000000"),
            Err(InputError::Exponent { field: "billed volume", .. })
        ));
        assert!(matches!(
            prior_reading("2E3"),
            Err(InputError::Exponent { .. })
        ));
        assert!(matches!(
            total_billed("1000000000000"),
            Err(InputError::TooLarge { .. })
        ));
        assert!(matches!(
            current_reading("1.0005"),
            Err(InputError::TooPrecise { .. })
        ));
        assert_eq!(current_reading("12.3450").unwrap(), dec("12.345"));
        assert_eq!(total_billed("999999999999.999").unwrap(), dec("999999999999.999"));
        assert_eq!(unit_price("0").unwrap(), dec("0"));
    }

    #[test]
    fn month_numbers_follow_the_calendar() {
        assert_eq!(Month::from_number(1), Some(Month::January));
        assert_eq!(Month::from_number(12), Some(Month::December));
        assert_eq!(Month::from_number(0), None);
        assert_eq!(Month::from_number(13), None);
        assert_eq!(Month::September.to_string(), "September");
    }
}
