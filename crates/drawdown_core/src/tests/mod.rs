//! Cross-module tests for the withdrawal planner
//!
//! Tests are organized by topic:
//! - `scenarios` - Multi-period retirements driven month by month
//! - `rmd` - Required Minimum Distribution enforcement through the engine
//! - `properties` - Property tests over random portfolios


use jiff::civil::Date;
use rust_decimal::Decimal;

use crate::date_math::add_months;
use crate::model::{AccountId, AccountSnapshot, PortfolioView, SpendingContext, TaxTreatment};

const START: Date = jiff::civil::date(2025, 1, 1);

pub(crate) fn account(id: u16, tax: TaxTreatment, balance: Decimal) -> AccountSnapshot {
    let name = match tax {
        TaxTreatment::Taxable => "Brokerage",
        TaxTreatment::PreTax => "Traditional IRA",
        TaxTreatment::Roth => "Roth IRA",
        TaxTreatment::Hsa => "HSA",
    };
    AccountSnapshot::new(AccountId(id), name, tax, balance).unwrap()
}

pub(crate) fn context_at(
    view: &PortfolioView,
    month: i32,
    expenses: Decimal,
    income: Decimal,
) -> SpendingContext<'_> {
    SpendingContext::builder()
        .view(view)
        .retirement_start(START)
        .date(add_months(START, month))
        .total_expenses(expenses)
        .other_income(income)
        .build()
        .unwrap()
}
