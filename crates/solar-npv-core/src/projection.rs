use chrono::{Datelike, Duration, Months, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SolarNpvError;
use crate::profile::MonthlyProfile;
use crate::types::{Kwh, Kwp, Money, Rate, Years};
use crate::SolarNpvResult;

const DAYS_PER_YEAR: Decimal = dec!(365.25);

// ---------------------------------------------------------------------------
// Assumptions
// ---------------------------------------------------------------------------

/// Price and lifetime assumptions applied to every installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Assumptions {
    /// Retail electricity price avoided by self-consumption, per kWh
    pub electricity_price: Money,
    /// Payment per exported kWh
    pub export_rate: Money,
    /// Fraction of generation exported (0..=1)
    pub export_ratio: Rate,
    /// Annual discount rate, compounded monthly
    pub annual_discount_rate: Rate,
    /// Operational life from commissioning
    pub system_life_years: Years,
    /// Rating of one panel when capacity is given as a panel count
    pub panel_rating_kwp: Kwp,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            electricity_price: dec!(0.10),
            export_rate: dec!(0.054),
            export_ratio: dec!(0.5),
            annual_discount_rate: Decimal::ZERO,
            system_life_years: dec!(25),
            panel_rating_kwp: dec!(0.25),
        }
    }
}

impl Assumptions {
    pub fn validate(&self) -> SolarNpvResult<()> {
        let non_negative = [
            ("electricity_price", self.electricity_price),
            ("export_rate", self.export_rate),
            ("annual_discount_rate", self.annual_discount_rate),
        ];
        for (field, value) in non_negative {
            if value.is_sign_negative() {
                return Err(SolarNpvError::InvalidInput {
                    field: field.into(),
                    reason: format!("must be non-negative, got {value}"),
                });
            }
        }
        if self.export_ratio < Decimal::ZERO || self.export_ratio > Decimal::ONE {
            return Err(SolarNpvError::InvalidInput {
                field: "export_ratio".into(),
                reason: format!("must be between 0 and 1, got {}", self.export_ratio),
            });
        }
        if self.system_life_years <= Decimal::ZERO {
            return Err(SolarNpvError::InvalidInput {
                field: "system_life_years".into(),
                reason: "must be positive".into(),
            });
        }
        if self.panel_rating_kwp <= Decimal::ZERO {
            return Err(SolarNpvError::InvalidInput {
                field: "panel_rating_kwp".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

/// How the installed capacity was specified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "value")]
pub enum Capacity {
    /// Nameplate capacity in kWp
    Kwp(Kwp),
    /// Number of panels, each rated at `Assumptions::panel_rating_kwp`
    Panels(Decimal),
}

impl Capacity {
    /// Build from the CLI's mode flag: 0 = kWp, 1 = panel count.
    pub fn from_flag(mode: u8, value: Decimal) -> SolarNpvResult<Self> {
        match mode {
            0 => Ok(Capacity::Kwp(value)),
            1 => Ok(Capacity::Panels(value)),
            other => Err(SolarNpvError::InvalidInput {
                field: "capacity_mode".into(),
                reason: format!("expected 0 (kWp) or 1 (panel count), got {other}"),
            }),
        }
    }

    pub fn system_size(&self, panel_rating: Kwp) -> SolarNpvResult<Kwp> {
        let size = match *self {
            Capacity::Kwp(kwp) => kwp,
            Capacity::Panels(count) => {
                if !count.fract().is_zero() {
                    return Err(SolarNpvError::InvalidInput {
                        field: "capacity".into(),
                        reason: format!("panel count must be a whole number, got {count}"),
                    });
                }
                count.checked_mul(panel_rating).ok_or_else(|| {
                    overflow(format!("{count} panels x {panel_rating} kWp"))
                })?
            }
        };
        if size <= Decimal::ZERO {
            return Err(SolarNpvError::InvalidInput {
                field: "capacity".into(),
                reason: format!("system size must be positive, got {size} kWp"),
            });
        }
        Ok(size)
    }
}

// ---------------------------------------------------------------------------
// Remaining life
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemainingLife {
    pub elapsed_years: Years,
    pub remaining_years: Years,
    /// Last day of operation; `None` once the system is past end of life
    pub end_date: Option<NaiveDate>,
}

impl RemainingLife {
    pub fn is_expired(&self) -> bool {
        self.end_date.is_none()
    }
}

/// Remaining operational life measured in 365.25-day years.
pub fn remaining_life(
    commissioning_date: NaiveDate,
    today: NaiveDate,
    life_years: Years,
) -> SolarNpvResult<RemainingLife> {
    let elapsed_days = Decimal::from((today - commissioning_date).num_days());
    let remaining_days = life_years
        .checked_mul(DAYS_PER_YEAR)
        .and_then(|days| days.checked_sub(elapsed_days))
        .ok_or_else(|| overflow(format!("{life_years}-year operational life in days")))?;

    let end_date = if remaining_days > Decimal::ZERO {
        let whole_days = remaining_days
            .floor()
            .to_i64()
            .ok_or_else(|| SolarNpvError::DateError(format!("{remaining_days} days overflows")))?;
        let end = today
            .checked_add_signed(Duration::days(whole_days))
            .ok_or_else(|| {
                SolarNpvError::DateError(format!("{today} + {whole_days} days is out of range"))
            })?;
        Some(end)
    } else {
        None
    };

    Ok(RemainingLife {
        elapsed_years: elapsed_days / DAYS_PER_YEAR,
        remaining_years: remaining_days / DAYS_PER_YEAR,
        end_date,
    })
}

// ---------------------------------------------------------------------------
// Monthly cash flows
// ---------------------------------------------------------------------------

/// Cash flows for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCashFlow {
    /// First day of the month
    pub month: NaiveDate,
    pub generation_kwh: Kwh,
    pub fit_revenue: Money,
    pub electricity_savings: Money,
    pub export_revenue: Money,
}

impl MonthlyCashFlow {
    pub fn total(&self) -> Money {
        self.fit_revenue + self.electricity_savings + self.export_revenue
    }
}

fn overflow(context: String) -> SolarNpvError {
    SolarNpvError::ArithmeticOverflow { context }
}

/// Product of a generation figure and its multipliers, or an overflow error
/// naming the cash-flow component.
fn checked_product(component: &str, month: NaiveDate, factors: &[Decimal]) -> SolarNpvResult<Money> {
    factors
        .iter()
        .try_fold(Decimal::ONE, |acc, f| acc.checked_mul(*f))
        .ok_or_else(|| overflow(format!("{component} for {month}")))
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// One entry per calendar month from `today`'s month to the end-of-life
/// month, inclusive. Empty when the system is past end of life.
pub fn project_cash_flows(
    today: NaiveDate,
    life: &RemainingLife,
    system_size: Kwp,
    tariff_rate: Rate,
    profile: &MonthlyProfile,
    assumptions: &Assumptions,
) -> SolarNpvResult<Vec<MonthlyCashFlow>> {
    let end_month = match life.end_date {
        Some(end) => first_of_month(end),
        None => return Ok(Vec::new()),
    };
    let self_consumed = Decimal::ONE - assumptions.export_ratio;

    let mut flows = Vec::new();
    let mut month = first_of_month(today);
    while month <= end_month {
        let factor = profile.for_month(month.month())?;
        let generation_kwh = checked_product("generation", month, &[factor, system_size])?;
        flows.push(MonthlyCashFlow {
            month,
            generation_kwh,
            fit_revenue: checked_product("fit_revenue", month, &[generation_kwh, tariff_rate])?,
            electricity_savings: checked_product(
                "electricity_savings",
                month,
                &[generation_kwh, self_consumed, assumptions.electricity_price],
            )?,
            export_revenue: checked_product(
                "export_revenue",
                month,
                &[generation_kwh, assumptions.export_ratio, assumptions.export_rate],
            )?,
        });
        month = month
            .checked_add_months(Months::new(1))
            .ok_or_else(|| SolarNpvError::DateError(format!("month after {month} is out of range")))?;
    }
    Ok(flows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{flat_profile, Region, RegionalProfiles};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_assumptions_valid() {
        let a = Assumptions::default();
        assert!(a.validate().is_ok());
        assert_eq!(a.electricity_price, dec!(0.10));
        assert_eq!(a.export_rate, dec!(0.054));
        assert_eq!(a.export_ratio, dec!(0.5));
        assert_eq!(a.annual_discount_rate, Decimal::ZERO);
    }

    #[test]
    fn test_assumptions_reject_bad_values() {
        let a = Assumptions {
            export_ratio: dec!(1.2),
            ..Assumptions::default()
        };
        assert!(a.validate().is_err());
        let a = Assumptions {
            annual_discount_rate: dec!(-0.01),
            ..Assumptions::default()
        };
        assert!(a.validate().is_err());
        let a = Assumptions {
            panel_rating_kwp: Decimal::ZERO,
            ..Assumptions::default()
        };
        assert!(a.validate().is_err());
    }

    #[test]
    fn test_assumptions_partial_json_uses_defaults() {
        let a: Assumptions = serde_json::from_str(r#"{"annual_discount_rate": "0.035"}"#).unwrap();
        assert_eq!(a.annual_discount_rate, dec!(0.035));
        assert_eq!(a.export_rate, dec!(0.054));
    }

    #[test]
    fn test_capacity_modes_equivalent() {
        let rating = dec!(0.25);
        let panels = Capacity::from_flag(1, dec!(12)).unwrap();
        let kwp = Capacity::from_flag(0, dec!(3)).unwrap();
        assert_eq!(
            panels.system_size(rating).unwrap(),
            kwp.system_size(rating).unwrap()
        );
    }

    #[test]
    fn test_capacity_validation() {
        assert!(Capacity::from_flag(2, dec!(3)).is_err());
        assert!(Capacity::Panels(dec!(10.5)).system_size(dec!(0.25)).is_err());
        assert!(Capacity::Kwp(Decimal::ZERO).system_size(dec!(0.25)).is_err());
        assert!(Capacity::Kwp(dec!(-2)).system_size(dec!(0.25)).is_err());
    }

    #[test]
    fn test_panel_count_overflow_is_an_error() {
        let huge = Capacity::Panels(Decimal::MAX.floor());
        assert!(matches!(
            huge.system_size(dec!(2)),
            Err(SolarNpvError::ArithmeticOverflow { .. })
        ));
    }

    #[test]
    fn test_remaining_life_end_date() {
        let life = remaining_life(date(2018, 6, 9), date(2018, 7, 1), dec!(25)).unwrap();
        // 9131.25 - 22 days, floored, lands 9131 days after commissioning
        assert_eq!(life.end_date, Some(date(2043, 6, 9)));
        assert!((life.remaining_years + life.elapsed_years - dec!(25)).abs() < dec!(0.000001));
        assert!(!life.is_expired());
    }

    #[test]
    fn test_remaining_life_expired() {
        let life = remaining_life(date(2012, 4, 1), date(2040, 1, 1), dec!(25)).unwrap();
        assert!(life.is_expired());
        assert!(life.remaining_years < Decimal::ZERO);
    }

    #[test]
    fn test_projection_spans_inclusive_months() {
        let today = date(2018, 7, 1);
        let life = remaining_life(date(2018, 6, 9), today, dec!(25)).unwrap();
        let profiles = RegionalProfiles::builtin();
        let flows = project_cash_flows(
            today,
            &life,
            dec!(3),
            dec!(0.0393),
            profiles.profile(Region::EastMidlands),
            &Assumptions::default(),
        )
        .unwrap();
        // July 2018 through June 2043
        assert_eq!(flows.len(), 300);
        assert_eq!(flows[0].month, date(2018, 7, 1));
        assert_eq!(flows[299].month, date(2043, 6, 1));
        // July generation: 117.0 kWh/kWp x 3 kWp
        assert_eq!(flows[0].generation_kwh, dec!(351.0));
        assert_eq!(flows[0].fit_revenue, dec!(351.0) * dec!(0.0393));
        assert_eq!(flows[0].electricity_savings, dec!(17.55));
        assert_eq!(flows[0].export_revenue, dec!(9.477));
    }

    #[test]
    fn test_profile_repeats_annually() {
        let today = date(2020, 1, 15);
        let life = remaining_life(date(2015, 3, 1), today, dec!(25)).unwrap();
        let profiles = RegionalProfiles::builtin();
        let flows = project_cash_flows(
            today,
            &life,
            dec!(2),
            dec!(0.1),
            profiles.profile(Region::Wales),
            &Assumptions::default(),
        )
        .unwrap();
        for pair in flows.iter().zip(flows.iter().skip(12)) {
            assert_eq!(pair.0.generation_kwh, pair.1.generation_kwh);
        }
    }

    #[test]
    fn test_projection_empty_when_expired() {
        let today = date(2040, 1, 1);
        let life = remaining_life(date(2012, 4, 1), today, dec!(25)).unwrap();
        let flows = project_cash_flows(
            today,
            &life,
            dec!(3),
            dec!(0.21),
            &flat_profile(dec!(100)),
            &Assumptions::default(),
        )
        .unwrap();
        assert!(flows.is_empty());
    }

    #[test]
    fn test_extreme_price_overflows_instead_of_panicking() {
        let today = date(2020, 1, 1);
        let life = remaining_life(date(2019, 1, 1), today, dec!(1)).unwrap();
        let assumptions = Assumptions {
            electricity_price: Decimal::MAX,
            ..Assumptions::default()
        };
        let result =
            project_cash_flows(today, &life, dec!(4), dec!(0), &flat_profile(dec!(100)), &assumptions);
        match result {
            Err(SolarNpvError::ArithmeticOverflow { context }) => {
                assert!(context.starts_with("electricity_savings"));
            }
            other => panic!("expected overflow, got {other:?}"),
        }
    }

    #[test]
    fn test_full_export_has_no_savings() {
        let today = date(2020, 1, 1);
        let life = remaining_life(date(2019, 1, 1), today, dec!(1)).unwrap();
        let assumptions = Assumptions {
            export_ratio: Decimal::ONE,
            ..Assumptions::default()
        };
        let flows =
            project_cash_flows(today, &life, dec!(1), dec!(0), &flat_profile(dec!(100)), &assumptions)
                .unwrap();
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].electricity_savings, Decimal::ZERO);
        assert_eq!(flows[0].export_revenue, dec!(5.4));
        assert_eq!(flows[0].total(), dec!(5.4));
    }
}
