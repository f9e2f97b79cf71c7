use std::fmt;
use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::SolarNpvError;
use crate::profile::{Region, RegionalProfiles};
use crate::projection::{
    project_cash_flows, remaining_life, Assumptions, Capacity, MonthlyCashFlow, RemainingLife,
};
use crate::tariff::{TariffQuote, TariffTables};
use crate::time_value::{monthly_npv, round_down_thousands};
use crate::types::{with_metadata, ComputationOutput, Kwp, Money};
use crate::SolarNpvResult;

/// Largest value that fits the 5-digit output field.
const MAX_REPORTED_VALUE: Decimal = dec!(99999);

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Who owns the installation and therefore receives the feed-in tariff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    SelfOwned,
    InvestorOwned,
}

impl Ownership {
    /// Build from the CLI's flag: 0 = self owned, 1 = investor owned.
    pub fn from_flag(flag: u8) -> SolarNpvResult<Self> {
        match flag {
            0 => Ok(Ownership::SelfOwned),
            1 => Ok(Ownership::InvestorOwned),
            other => Err(SolarNpvError::InvalidInput {
                field: "ownership".into(),
                reason: format!("expected 0 (self owned) or 1 (investor owned), got {other}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolarNpvInput {
    pub commissioning_date: NaiveDate,
    pub capacity: Capacity,
    pub region: Region,
    pub ownership: Ownership,
    /// Evaluation date; the first projected month is this date's month
    pub today: NaiveDate,
    #[serde(default)]
    pub assumptions: Assumptions,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Present value of each revenue stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentNpvs {
    pub fit: Money,
    pub savings: Money,
    pub export: Money,
}

impl ComponentNpvs {
    pub fn total(&self) -> Money {
        self.fit + self.savings + self.export
    }
}

/// The two reported figures, each rounded down to the nearest thousand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpvResult {
    pub homeowner_value: u32,
    pub potential_value: u32,
}

impl fmt::Display for NpvResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05}|{:05}", self.homeowner_value, self.potential_value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolarNpvOutput {
    /// Fixed-width `NNNNN|NNNNN` rendering of the two values
    pub formatted: String,
    pub homeowner_value: u32,
    pub potential_value: u32,
    pub system_size_kwp: Kwp,
    pub region: String,
    pub ownership: Ownership,
    pub tariff: TariffQuote,
    pub remaining_life: RemainingLife,
    pub component_npvs: ComponentNpvs,
    pub months: usize,
    pub cash_flows: Vec<MonthlyCashFlow>,
}

// ---------------------------------------------------------------------------
// Ownership allocation
// ---------------------------------------------------------------------------

fn to_reported(field: &str, value: Money) -> SolarNpvResult<u32> {
    let rounded = round_down_thousands(value);
    if rounded > MAX_REPORTED_VALUE {
        return Err(SolarNpvError::OutputOverflow {
            field: field.into(),
            value: rounded,
        });
    }
    rounded.to_u32().ok_or_else(|| SolarNpvError::InvalidInput {
        field: field.into(),
        reason: format!("{rounded} is not a non-negative whole amount"),
    })
}

/// Split the component values between homeowner and investor.
///
/// A self-owned system reports its full value and no potential; an investor
/// owned one leaves the homeowner with savings and export income, and reports
/// the full value as what they could have captured.
pub fn allocate(components: &ComponentNpvs, ownership: Ownership) -> SolarNpvResult<NpvResult> {
    match ownership {
        Ownership::SelfOwned => Ok(NpvResult {
            homeowner_value: to_reported("homeowner_value", components.total())?,
            potential_value: 0,
        }),
        Ownership::InvestorOwned => Ok(NpvResult {
            homeowner_value: to_reported(
                "homeowner_value",
                components.savings + components.export,
            )?,
            potential_value: to_reported("potential_value", components.total())?,
        }),
    }
}

fn stream(flows: &[MonthlyCashFlow], f: impl Fn(&MonthlyCashFlow) -> Money) -> Vec<Money> {
    flows.iter().map(f).collect()
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Estimate the remaining NPV of a residential solar installation.
///
/// Tariff tables and regional profiles are passed in so callers control the
/// reference data; `input.today` pins the evaluation date.
pub fn calculate_solar_npv(
    input: &SolarNpvInput,
    tables: &TariffTables,
    profiles: &RegionalProfiles,
) -> SolarNpvResult<ComputationOutput<SolarNpvOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let assumptions = &input.assumptions;

    // --- Validate ---
    assumptions.validate()?;
    let system_size = input.capacity.system_size(assumptions.panel_rating_kwp)?;

    // --- Remaining life ---
    let life = remaining_life(
        input.commissioning_date,
        input.today,
        assumptions.system_life_years,
    )?;
    if input.commissioning_date > input.today {
        warnings.push(format!(
            "Commissioning date {} is after the evaluation date {}",
            input.commissioning_date, input.today
        ));
    }
    if life.is_expired() {
        warnings.push(format!(
            "System is past its {}-year operational life; no cash flows remain",
            assumptions.system_life_years
        ));
    }

    // --- Tariff and profile ---
    let tariff = tables.quote(input.commissioning_date, system_size)?;
    let profile = profiles.profile(input.region);

    // --- Project cash flows ---
    let cash_flows = project_cash_flows(
        input.today,
        &life,
        system_size,
        tariff.rate,
        profile,
        assumptions,
    )?;
    debug!(months = cash_flows.len(), "projected monthly cash flows");

    // --- Discount each stream ---
    let rate = assumptions.annual_discount_rate;
    let component_npvs = ComponentNpvs {
        fit: monthly_npv(rate, &stream(&cash_flows, |cf| cf.fit_revenue))?,
        savings: monthly_npv(rate, &stream(&cash_flows, |cf| cf.electricity_savings))?,
        export: monthly_npv(rate, &stream(&cash_flows, |cf| cf.export_revenue))?,
    };

    // --- Allocate ---
    let result = allocate(&component_npvs, input.ownership)?;
    let formatted = result.to_string();
    info!(
        result = %formatted,
        total = %component_npvs.total().round_dp(2),
        "estimated solar NPV"
    );

    let output = SolarNpvOutput {
        formatted,
        homeowner_value: result.homeowner_value,
        potential_value: result.potential_value,
        system_size_kwp: system_size,
        region: input.region.name().to_string(),
        ownership: input.ownership,
        tariff,
        remaining_life: life,
        component_npvs,
        months: cash_flows.len(),
        cash_flows,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Monthly FiT, self-consumption and export cash flows discounted to NPV",
        input,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn components(fit: Money, savings: Money, export: Money) -> ComponentNpvs {
        ComponentNpvs {
            fit,
            savings,
            export,
        }
    }

    #[test]
    fn test_allocate_self_owned() {
        let c = components(dec!(2727.03), dec!(3469.50), dec!(1873.53));
        let r = allocate(&c, Ownership::SelfOwned).unwrap();
        assert_eq!(r.to_string(), "08000|00000");
    }

    #[test]
    fn test_allocate_investor_owned() {
        let c = components(dec!(2727.03), dec!(3469.50), dec!(1873.53));
        let r = allocate(&c, Ownership::InvestorOwned).unwrap();
        assert_eq!(r.to_string(), "05000|08000");
    }

    #[test]
    fn test_allocate_overflow() {
        let c = components(dec!(90000), dec!(9000), dec!(1000));
        assert!(matches!(
            allocate(&c, Ownership::SelfOwned),
            Err(SolarNpvError::OutputOverflow { .. })
        ));
        // 99,999 still fits once rounded down
        let c = components(dec!(90000), dec!(9000), dec!(999.99));
        assert_eq!(
            allocate(&c, Ownership::SelfOwned).unwrap().to_string(),
            "99000|00000"
        );
    }

    #[test]
    fn test_investor_overflow_reports_potential() {
        let c = components(dec!(95000), dec!(4000), dec!(2000));
        match allocate(&c, Ownership::InvestorOwned) {
            Err(SolarNpvError::OutputOverflow { field, value }) => {
                assert_eq!(field, "potential_value");
                assert_eq!(value, dec!(101000));
            }
            other => panic!("expected overflow, got {other:?}"),
        }
    }

    #[test]
    fn test_ownership_flags() {
        assert_eq!(Ownership::from_flag(0).unwrap(), Ownership::SelfOwned);
        assert_eq!(Ownership::from_flag(1).unwrap(), Ownership::InvestorOwned);
        assert!(matches!(
            Ownership::from_flag(2),
            Err(SolarNpvError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_zero_result_formatting() {
        let r = NpvResult {
            homeowner_value: 0,
            potential_value: 0,
        };
        assert_eq!(r.to_string(), "00000|00000");
    }
}
