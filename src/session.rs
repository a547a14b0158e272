use crate::apportionment::{Apportionment, apportion};
use crate::billing::{
    self, BillingPeriod, InputError, Month, SubUnit, current_reading, prior_reading,
};
use crate::format;
use crate::pdf::export_liquidation;
use crate::report::{write_indeterminate, write_report};
use bigdecimal::{BigDecimal, Zero};
use clap::{Parser, Subcommand};
use log::{debug, info};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use thiserror::Error;

const PROMPT: &str = "liquidator> ";
const GREETING: &str = "Type `help` for the list of commands.";
/// Units a fresh session starts with when no readings file was given.
const STARTER_UNITS: usize = 5;

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("there is no unit {0}")]
    NoSuchUnit(usize),
    #[error(transparent)]
    Input(#[from] InputError),
}

/// One line typed at the prompt.
#[derive(Debug, Parser)]
#[command(
    name = "liquidator",
    no_binary_name = true,
    help_template = "Commands (units are numbered from 1):\n{subcommands}"
)]
struct SessionLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, PartialEq, Subcommand)]
enum Command {
    /// Show the bill and the units
    #[command(visible_alias = "ls")]
    List,
    /// Add a unit with zero readings
    Add,
    /// Rename a unit
    Name {
        #[arg(value_parser = unit_number)]
        unit: usize,
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// Set a unit's prior reading
    Prior {
        #[arg(value_parser = unit_number)]
        unit: usize,
        #[arg(value_parser = prior_reading, allow_negative_numbers = true)]
        reading: BigDecimal,
    },
    /// Set a unit's current reading
    Current {
        #[arg(value_parser = unit_number)]
        unit: usize,
        #[arg(value_parser = current_reading, allow_negative_numbers = true)]
        reading: BigDecimal,
    },
    /// Remove a unit
    #[command(visible_alias = "rm")]
    Remove {
        #[arg(value_parser = unit_number)]
        unit: usize,
    },
    /// Set the billing month
    Month {
        #[arg(value_enum, ignore_case = true)]
        month: Month,
    },
    /// Set the total billed amount
    Billed {
        #[arg(value_parser = billing::total_billed, allow_negative_numbers = true)]
        amount: BigDecimal,
    },
    /// Set the billed volume
    Volume {
        #[arg(value_parser = billing::billed_volume, allow_negative_numbers = true)]
        volume: BigDecimal,
    },
    /// Set the unit price
    Price {
        #[arg(value_parser = billing::unit_price, allow_negative_numbers = true)]
        price: BigDecimal,
    },
    /// Apportion the bill and show the results
    #[command(visible_alias = "calculate")]
    Calc,
    /// Write the liquidation PDF
    Export {
        /// Directory to write into, instead of the output directory
        dir: Option<PathBuf>,
    },
    /// Leave the session
    #[command(visible_alias = "exit")]
    Quit,
}

/// Turns a 1-based unit number into an index.
fn unit_number(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(number) if number > 0 => Ok(number - 1),
        _ => Err("units are numbered from 1".to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The bill and the sub-units being edited, for one run of the program.
#[derive(Debug)]
pub struct Session {
    period: BillingPeriod,
    units: Vec<SubUnit>,
    output_dir: PathBuf,
}

impl Session {
    pub fn new(period: BillingPeriod, units: Vec<SubUnit>, output_dir: PathBuf) -> Self {
        Self {
            period,
            units,
            output_dir,
        }
    }

    /// A session pre-filled with a handful of blank units, ready to be named.
    pub fn with_starter_units(period: BillingPeriod, output_dir: PathBuf) -> Self {
        let mut session = Self::new(period, Vec::new(), output_dir);
        for _ in 0..STARTER_UNITS {
            session.push_blank(format!("Unit {}", session.units.len() + 1));
        }
        session
    }

    pub fn period(&self) -> &BillingPeriod {
        &self.period
    }

    pub fn units(&self) -> &[SubUnit] {
        &self.units
    }

    fn push_blank(&mut self, name: String) -> usize {
        self.units.push(SubUnit {
            name,
            prior_reading: BigDecimal::zero(),
            current_reading: BigDecimal::zero(),
        });
        self.units.len() - 1
    }

    /// Appends a unit with zero readings and returns its index.
    pub fn add_unit(&mut self) -> usize {
        self.push_blank(format!("New Unit {}", self.units.len() + 1))
    }

    fn unit_mut(&mut self, index: usize) -> Result<&mut SubUnit, SessionError> {
        self.units
            .get_mut(index)
            .ok_or(SessionError::NoSuchUnit(index + 1))
    }

    pub fn rename(&mut self, index: usize, name: &str) -> Result<(), SessionError> {
        if name.trim().is_empty() {
            return Err(InputError::BlankName.into());
        }
        self.unit_mut(index)?.name = name.to_string();
        Ok(())
    }

    pub fn set_prior(&mut self, index: usize, reading: BigDecimal) -> Result<(), SessionError> {
        self.unit_mut(index)?.prior_reading = reading;
        Ok(())
    }

    pub fn set_current(&mut self, index: usize, reading: BigDecimal) -> Result<(), SessionError> {
        self.unit_mut(index)?.current_reading = reading;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<SubUnit, SessionError> {
        if index >= self.units.len() {
            return Err(SessionError::NoSuchUnit(index + 1));
        }
        Ok(self.units.remove(index))
    }

    pub fn calculate(&self) -> Apportionment {
        apportion(&self.period, &self.units)
    }

    /// Runs one command line. Parse errors and help are written to `out`.
    pub fn execute(&mut self, line: &str, out: &mut impl Write) -> io::Result<Flow> {
        match SessionLine::try_parse_from(line.split_whitespace()) {
            Ok(SessionLine {
                command: Command::Quit,
            }) => Ok(Flow::Quit),
            Ok(SessionLine { command }) => {
                self.apply(command, out)?;
                Ok(Flow::Continue)
            }
            Err(e) => {
                writeln!(out, "{}", e.to_string().trim_end())?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Reads commands from piped input until `quit` or end of input.
    pub fn run(&mut self, input: impl BufRead, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{GREETING}")?;
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if self.execute(line, out)? == Flow::Quit {
                break;
            }
        }
        Ok(())
    }

    /// Line-edited prompt on the terminal, with history.
    pub fn run_terminal(&mut self) -> Result<(), ReadlineError> {
        let mut editor = DefaultEditor::new()?;
        let mut out = io::stdout();
        writeln!(out, "{GREETING}")?;
        loop {
            match editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    editor.add_history_entry(line)?;
                    if self.execute(line, &mut out)? == Flow::Quit {
                        return Ok(());
                    }
                }
                Err(ReadlineError::Interrupted) => writeln!(out, "Use `quit` to leave")?,
                Err(ReadlineError::Eof) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    fn apply(&mut self, command: Command, out: &mut impl Write) -> io::Result<()> {
        debug!("Applying {command:?}");
        let edited = match command {
            Command::List => return self.write_listing(out),
            Command::Calc => return self.write_calculation(out),
            Command::Export { dir } => return self.export(dir, out),
            Command::Add => {
                let index = self.add_unit();
                return writeln!(out, "Added unit {}: {}", index + 1, self.units[index].name);
            }
            Command::Name { unit, name } => self.rename(unit, &name.join(" ")),
            Command::Prior { unit, reading } => self.set_prior(unit, reading),
            Command::Current { unit, reading } => self.set_current(unit, reading),
            Command::Remove { unit } => self
                .remove(unit)
                .map(|unit| info!("Removed unit {:?}", unit.name)),
            Command::Month { month } => {
                self.period.month = month;
                Ok(())
            }
            Command::Billed { amount } => {
                self.period.total_billed = amount;
                Ok(())
            }
            Command::Volume { volume } => {
                self.period.billed_volume = volume;
                Ok(())
            }
            Command::Price { price } => {
                self.period.unit_price = price;
                Ok(())
            }
            Command::Quit => Ok(()),
        };
        match edited {
            Ok(()) => writeln!(out, "ok"),
            Err(e) => writeln!(out, "error: {e}"),
        }
    }

    fn write_listing(&self, out: &mut impl Write) -> io::Result<()> {
        let period = &self.period;
        writeln!(out, "Month:         {}", period.month)?;
        writeln!(out, "Total billed:  {}", format::currency(&period.total_billed))?;
        writeln!(out, "Billed volume: {}", format::volume(&period.billed_volume))?;
        writeln!(out, "Unit price:    {}", format::unit_price(&period.unit_price))?;
        if self.units.is_empty() {
            return writeln!(out, "No units yet, use `add`.");
        }
        for (i, unit) in self.units.iter().enumerate() {
            writeln!(
                out,
                "{:>3}. {}  prior {}  current {}  consumed {}",
                i + 1,
                unit.name,
                format::volume(&unit.prior_reading),
                format::volume(&unit.current_reading),
                format::volume(&unit.measured_volume()),
            )?;
        }
        Ok(())
    }

    fn write_calculation(&self, out: &mut impl Write) -> io::Result<()> {
        match self.calculate() {
            Apportionment::Settled(liquidation) => write_report(out, &self.period, &liquidation),
            Apportionment::Indeterminate {
                total_measured_volume,
            } => write_indeterminate(out, &total_measured_volume),
        }
    }

    fn export(&self, dir: Option<PathBuf>, out: &mut impl Write) -> io::Result<()> {
        let dir = dir.unwrap_or_else(|| self.output_dir.clone());
        match export_liquidation(&dir, &self.period, &self.units) {
            Ok(path) => {
                info!("Wrote {}", path.display());
                writeln!(out, "Saved {}", path.display())
            }
            Err(e) => writeln!(out, "error: {e}"),
        }
    }
}
