use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::SolarNpvError;
use crate::types::{Money, Rate};
use crate::SolarNpvResult;

const MONTHS_PER_YEAR: Decimal = dec!(12);
const ROUNDING_UNIT: Decimal = dec!(1000);

/// Net Present Value of a series of cash flows. The first flow is period 0
/// and is not discounted.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> SolarNpvResult<Money> {
    if rate <= dec!(-1) {
        return Err(SolarNpvError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| overflow(format!("NPV discount factor at period {t}")))?;
        }
        result = cf
            .checked_div(discount)
            .and_then(|pv| result.checked_add(pv))
            .ok_or_else(|| overflow(format!("NPV sum at period {t}")))?;
    }

    Ok(result)
}

fn overflow(context: String) -> SolarNpvError {
    SolarNpvError::ArithmeticOverflow { context }
}

/// Monthly rate equivalent to an annual rate under monthly compounding:
/// (1 + annual)^(1/12) - 1.
pub fn monthly_rate(annual_rate: Rate) -> SolarNpvResult<Rate> {
    if annual_rate.is_sign_negative() {
        return Err(SolarNpvError::InvalidInput {
            field: "annual_discount_rate".into(),
            reason: "Discount rate must be non-negative".into(),
        });
    }
    if annual_rate.is_zero() {
        return Ok(Decimal::ZERO);
    }

    let factor = (Decimal::ONE + annual_rate)
        .checked_powd(Decimal::ONE / MONTHS_PER_YEAR)
        .ok_or_else(|| SolarNpvError::InvalidInput {
            field: "annual_discount_rate".into(),
            reason: format!("Cannot derive a monthly rate from {annual_rate}"),
        })?;

    Ok(factor - Decimal::ONE)
}

/// NPV of a monthly series discounted at an annual rate.
pub fn monthly_npv(annual_rate: Rate, cash_flows: &[Money]) -> SolarNpvResult<Money> {
    npv(monthly_rate(annual_rate)?, cash_flows)
}

/// Round down to the nearest thousand (floor, not nearest).
pub fn round_down_thousands(value: Money) -> Money {
    (value / ROUNDING_UNIT).floor() * ROUNDING_UNIT
}
