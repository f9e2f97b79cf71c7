use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use solar_npv_core::profile::{Region, RegionalProfiles};
use solar_npv_core::projection::{Assumptions, Capacity};
use solar_npv_core::tariff::TariffTables;
use solar_npv_core::valuation::{self, Ownership, SolarNpvInput};

use crate::input;

/// Arguments for a solar NPV estimate
#[derive(Args)]
pub struct EstimateArgs {
    /// Commissioning date (YYYY-MM-DD)
    pub commissioning_date: NaiveDate,

    /// Capacity input mode: 0 = kWp, 1 = number of panels
    pub capacity_mode: u8,

    /// Capacity in kWp, or number of panels when the mode is 1
    pub capacity: Decimal,

    /// Region identifier (0-12)
    #[arg(allow_negative_numbers = true)]
    pub region: i64,

    /// Ownership structure: 0 = self owned, 1 = investor owned
    pub ownership: u8,

    /// Evaluation date (YYYY-MM-DD); defaults to today's local date
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Path to a JSON or YAML file with price and lifetime assumptions
    #[arg(long)]
    pub assumptions: Option<String>,

    /// Retail electricity price per kWh (e.g. 0.10)
    #[arg(long)]
    pub electricity_price: Option<Decimal>,

    /// Export payment per kWh (e.g. 0.054)
    #[arg(long)]
    pub export_rate: Option<Decimal>,

    /// Fraction of generation exported (e.g. 0.5)
    #[arg(long)]
    pub export_ratio: Option<Decimal>,

    /// Annual discount rate, compounded monthly (e.g. 0.035)
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Directory holding fits_recent.csv and fits_retrofit.csv
    #[arg(long)]
    pub tariff_dir: Option<PathBuf>,
}

fn resolve_assumptions(args: &EstimateArgs) -> Result<Assumptions, Box<dyn std::error::Error>> {
    let mut assumptions = match args.assumptions {
        Some(ref path) => input::file::read_assumptions(path)?,
        None => Assumptions::default(),
    };
    if let Some(price) = args.electricity_price {
        assumptions.electricity_price = price;
    }
    if let Some(rate) = args.export_rate {
        assumptions.export_rate = rate;
    }
    if let Some(ratio) = args.export_ratio {
        assumptions.export_ratio = ratio;
    }
    if let Some(rate) = args.discount_rate {
        assumptions.annual_discount_rate = rate;
    }
    Ok(assumptions)
}

pub fn run_estimate(args: EstimateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = resolve_assumptions(&args)?;

    let npv_input = SolarNpvInput {
        commissioning_date: args.commissioning_date,
        capacity: Capacity::from_flag(args.capacity_mode, args.capacity)?,
        region: Region::from_id(args.region)?,
        ownership: Ownership::from_flag(args.ownership)?,
        today: args.today.unwrap_or_else(|| Local::now().date_naive()),
        assumptions,
    };

    let tables = match args.tariff_dir {
        Some(ref dir) => TariffTables::from_dir(dir)?,
        None => TariffTables::bundled()?,
    };
    let profiles = RegionalProfiles::builtin();
    debug!(today = %npv_input.today, "running estimate");

    let result = valuation::calculate_solar_npv(&npv_input, &tables, &profiles)?;
    Ok(serde_json::to_value(result)?)
}
