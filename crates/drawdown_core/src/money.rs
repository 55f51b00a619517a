//! Fixed-point helpers for currency and rate arithmetic
//!
//! Currency is carried at cents with half-up rounding. Rates and growth
//! factors keep more digits so that decades of compounding do not drift.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places for currency amounts
pub const CURRENCY_SCALE: u32 = 2;

/// Decimal places for intermediate rates and growth factors
pub const RATE_SCALE: u32 = 10;

/// Withdrawal periods in a year (monthly)
pub const PERIODS_PER_YEAR: u32 = 12;

#[inline]
pub fn periods_per_year() -> Decimal {
    Decimal::from(PERIODS_PER_YEAR)
}

/// Round to cents, half away from zero
#[inline]
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[inline]
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `(1 + rate)^years` by repeated multiplication, rounded at rate scale each step.
pub fn compound_factor(rate: Decimal, years: u32) -> Decimal {
    let step = Decimal::ONE + rate;
    let mut factor = Decimal::ONE;
    for _ in 0..years {
        factor = round_rate(factor * step);
    }
    factor
}

/// Convert an annual amount to a per-period amount in cents
#[inline]
pub fn per_period(annual: Decimal) -> Decimal {
    round_currency(annual / periods_per_year())
}

/// Annualize a per-period amount
#[inline]
pub fn annualize(periodic: Decimal) -> Decimal {
    periodic * periods_per_year()
}

/// Positive part of a value
#[inline]
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}
