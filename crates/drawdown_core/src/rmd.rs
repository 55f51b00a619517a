//! Required Minimum Distribution calculation
//!
//! [`RmdCalculator`] is the seam the RMD-aware orchestrator depends on. The
//! stock implementation reads a life-expectancy table and a start-age schedule,
//! both of which can be supplied from configuration.

use std::fmt::Debug;

use rust_decimal::Decimal;

use crate::error::{Result, SpendingError};
use crate::model::{RmdStartAgeSchedule, RmdTable};
use crate::money::round_currency;

/// Decides whether minimum distributions apply and how large they are
pub trait RmdCalculator: Send + Sync + Debug {
    /// Whether someone of `age`, born in `birth_year`, must take distributions
    fn is_rmd_required(&self, age: u8, birth_year: i16) -> bool;

    /// Annual distribution required from an account holding `balance`
    fn calculate_rmd(&self, balance: Decimal, age: u8) -> Result<Decimal>;
}

/// Uniform Lifetime Table calculator
#[derive(Debug, Clone, Default)]
pub struct UniformLifetimeCalculator {
    table: RmdTable,
    start_ages: RmdStartAgeSchedule,
}

impl UniformLifetimeCalculator {
    /// Build from externally supplied tables, validating both.
    pub fn new(table: RmdTable, start_ages: RmdStartAgeSchedule) -> Result<Self> {
        table.validate()?;
        start_ages.validate()?;
        Ok(Self { table, start_ages })
    }

    pub fn table(&self) -> &RmdTable {
        &self.table
    }

    pub fn start_age(&self, birth_year: i16) -> Option<u8> {
        self.start_ages.start_age(birth_year)
    }
}

impl RmdCalculator for UniformLifetimeCalculator {
    fn is_rmd_required(&self, age: u8, birth_year: i16) -> bool {
        self.start_ages
            .start_age(birth_year)
            .is_some_and(|start| age >= start)
    }

    fn calculate_rmd(&self, balance: Decimal, age: u8) -> Result<Decimal> {
        if balance < Decimal::ZERO {
            return Err(SpendingError::validation(
                "balance",
                format!("cannot compute RMD on negative balance {balance}"),
            ));
        }

        let divisor = self.table.divisor_or_last(age).ok_or_else(|| {
            SpendingError::Calculation(format!("no RMD divisor for age {age}"))
        })?;

        Ok(round_currency(balance / divisor))
    }
}
