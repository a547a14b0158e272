mod apportionment;
mod billing;
mod document;
mod format;
mod pdf;
mod readings;
mod report;
mod session;

use crate::apportionment::{Apportionment, apportion};
use crate::billing::{BillingPeriod, Month, billed_volume, total_billed, unit_price};
use crate::readings::read_readings_file;
use crate::report::{write_indeterminate, write_report};
use crate::session::Session;
use anyhow::Context;
use bigdecimal::BigDecimal;
use clap::Parser;
use log::{info, warn};
use std::io::{self, IsTerminal};
use std::path::PathBuf;

/// Splits a shared utility bill (e.g. water) across the sub-units behind one master meter.
/// Each unit pays for what its own meter recorded, plus an equal share of the gap between
/// the billed volume and the sum of the sub-unit meters.
#[derive(Parser, Debug)]
#[command(version, long_about)]
struct Liquidator {
    /// CSV file with one row per sub-unit and the header `UNIT,PRIOR,CURRENT`.
    /// Rows are kept in file order.
    #[arg(short, long, required_unless_present = "interactive")]
    readings: Option<PathBuf>,
    /// Month the bill covers. Defaults to the current month.
    #[arg(short, long, value_enum, ignore_case = true)]
    month: Option<Month>,
    /// Total amount on the bill, in dollars.
    #[arg(
        short = 't',
        long,
        default_value = "0",
        value_parser = total_billed,
        allow_negative_numbers = true
    )]
    total_billed: BigDecimal,
    /// Volume on the bill, as read by the master meter.
    #[arg(
        short = 'v',
        long,
        default_value = "0",
        value_parser = billed_volume,
        allow_negative_numbers = true
    )]
    billed_volume: BigDecimal,
    /// Price of one unit of volume, in dollars.
    #[arg(
        short = 'p',
        long,
        default_value = "0",
        value_parser = unit_price,
        allow_negative_numbers = true
    )]
    unit_price: BigDecimal,
    /// Edit the bill and units interactively instead of printing one report.
    #[arg(short, long)]
    interactive: bool,
    /// Also write the liquidation as `Liquidation_<month>.pdf`.
    /// In interactive mode use the `export` command instead.
    #[arg(short, long, conflicts_with = "interactive")]
    export: bool,
    /// Directory the PDF is written to.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Liquidator::parse();

    let month = args.month.unwrap_or_else(Month::current);
    let period = BillingPeriod::new(
        month,
        args.total_billed,
        args.billed_volume,
        args.unit_price,
    )?;
    let units = match &args.readings {
        Some(path) => read_readings_file(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => Vec::new(),
    };
    info!("Found {} units for {}", units.len(), period.label());

    if args.interactive {
        let mut session = if args.readings.is_some() {
            Session::new(period, units, args.output_dir)
        } else {
            Session::with_starter_units(period, args.output_dir)
        };
        let stdin = io::stdin();
        if stdin.is_terminal() {
            session.run_terminal()?;
        } else {
            session.run(stdin.lock(), &mut io::stdout())?;
        }
        info!(
            "Session closed with {} units for {}",
            session.units().len(),
            session.period().label()
        );
        return Ok(());
    }

    let liquidation = match apportion(&period, &units) {
        Apportionment::Settled(liquidation) => liquidation,
        Apportionment::Indeterminate {
            total_measured_volume,
        } => {
            write_indeterminate(&mut io::stdout(), &total_measured_volume)?;
            if args.export {
                warn!("Nothing exported");
            }
            return Ok(());
        }
    };
    info!(
        "Total measured volume: {}",
        format::volume(&liquidation.summary.total_measured_volume)
    );
    write_report(&mut io::stdout().lock(), &period, &liquidation)?;

    if args.export {
        let path = pdf::write_liquidation(&args.output_dir, &period, &liquidation)
            .context("failed to export liquidation")?;
        info!("Wrote {} ({})", path.display(), pdf::MIME_TYPE);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::Zero;
    use clap::error::ErrorKind;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn readings_required_unless_interactive() {
        let err = Liquidator::try_parse_from(["liquidator"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        let args = Liquidator::try_parse_from(["liquidator", "--interactive"]).unwrap();
        assert!(args.interactive);
        assert!(args.readings.is_none());
    }

    #[test]
    fn figures_default_to_zero() {
        let args = Liquidator::try_parse_from(["liquidator", "-r", "units.csv"]).unwrap();
        assert_eq!(args.readings, Some(PathBuf::from("units.csv")));
        assert!(args.total_billed.is_zero());
        assert!(args.billed_volume.is_zero());
        assert!(args.unit_price.is_zero());
        assert_eq!(args.month, None);
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert!(!args.export);
    }

    #[test]
    fn parses_bill_figures() {
        let args = Liquidator::try_parse_from([
            "liquidator",
            "-r",
            "units.csv",
            "--total-billed",
            "1250.50",
            "--billed-volume",
            "100.125",
            "--unit-price",
            "2.5",
            "--month",
            "OCTOBER",
        ])
        .unwrap();
        assert_eq!(args.total_billed, dec("1250.50"));
        assert_eq!(args.billed_volume, dec("100.125"));
        assert_eq!(args.unit_price, dec("2.5"));
        assert_eq!(args.month, Some(Month::October));
    }

    #[test]
    fn rejects_negative_and_non_numeric_figures() {
        for bad in [
            ["--unit-price", "-1"],
            ["--billed-volume", "lots"],
            ["--total-billed", "1e9"],
        ] {
            let args = ["liquidator", "-r", "units.csv", bad[0], bad[1]];
            let err = Liquidator::try_parse_from(args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValueValidation, "{bad:?}");
        }
    }

    #[test]
    fn export_belongs_to_batch_mode() {
        let err = Liquidator::try_parse_from(["liquidator", "--interactive", "--export"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        let args =
            Liquidator::try_parse_from(["liquidator", "-r", "units.csv", "--export"]).unwrap();
        assert!(args.export);
    }
}
