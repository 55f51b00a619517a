//! Per-period inputs to the planner
//!
//! The simulation driver owns all cross-period state. Each period it exposes a
//! [`SimulationView`] and wraps it in a [`SpendingContext`]; nothing here is
//! cached between calls.

use jiff::civil::Date;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::accounts::AccountSnapshot;
use crate::date_math::months_between;
use crate::error::{Result, SpendingError};
use crate::money::{PERIODS_PER_YEAR, non_negative};

/// Read-only view of the simulation at the start of a period.
///
/// Prior-period scalars are optional; strategies that need one fail when it
/// is absent rather than guessing.
pub trait SimulationView: Send + Sync {
    fn account_snapshots(&self) -> &[AccountSnapshot];

    /// Age in whole years
    fn age(&self) -> u8;

    fn birth_year(&self) -> i16;

    /// Amount withdrawn last period
    fn prior_period_spending(&self) -> Option<Decimal> {
        None
    }

    /// Portfolio return over the last review interval, as a fraction
    fn prior_period_return(&self) -> Option<Decimal> {
        None
    }

    /// Portfolio balance when retirement started
    fn initial_portfolio_balance(&self) -> Option<Decimal> {
        None
    }

    /// Period index of the most recent spending ratchet
    fn last_ratchet_period(&self) -> Option<u32> {
        None
    }

    fn total_balance(&self) -> Decimal {
        self.account_snapshots().iter().map(|a| a.balance()).sum()
    }
}

/// Plain [`SimulationView`] backed by owned values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioView {
    accounts: Vec<AccountSnapshot>,
    age: u8,
    birth_year: i16,
    prior_period_spending: Option<Decimal>,
    prior_period_return: Option<Decimal>,
    initial_portfolio_balance: Option<Decimal>,
    last_ratchet_period: Option<u32>,
}

impl PortfolioView {
    #[must_use]
    pub fn new(accounts: Vec<AccountSnapshot>, age: u8, birth_year: i16) -> Self {
        Self {
            accounts,
            age,
            birth_year,
            prior_period_spending: None,
            prior_period_return: None,
            initial_portfolio_balance: None,
            last_ratchet_period: None,
        }
    }

    #[must_use]
    pub fn with_prior_spending(mut self, amount: Decimal) -> Self {
        self.prior_period_spending = Some(amount);
        self
    }

    #[must_use]
    pub fn with_prior_return(mut self, rate: Decimal) -> Self {
        self.prior_period_return = Some(rate);
        self
    }

    #[must_use]
    pub fn with_initial_balance(mut self, amount: Decimal) -> Self {
        self.initial_portfolio_balance = Some(amount);
        self
    }

    #[must_use]
    pub fn with_last_ratchet_period(mut self, period: u32) -> Self {
        self.last_ratchet_period = Some(period);
        self
    }
}

impl SimulationView for PortfolioView {
    fn account_snapshots(&self) -> &[AccountSnapshot] {
        &self.accounts
    }

    fn age(&self) -> u8 {
        self.age
    }

    fn birth_year(&self) -> i16 {
        self.birth_year
    }

    fn prior_period_spending(&self) -> Option<Decimal> {
        self.prior_period_spending
    }

    fn prior_period_return(&self) -> Option<Decimal> {
        self.prior_period_return
    }

    fn initial_portfolio_balance(&self) -> Option<Decimal> {
        self.initial_portfolio_balance
    }

    fn last_ratchet_period(&self) -> Option<u32> {
        self.last_ratchet_period
    }
}

/// Per-period overrides of a strategy's configured parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyParams {
    #[serde(default)]
    pub withdrawal_rate: Option<Decimal>,
    #[serde(default)]
    pub inflation_rate: Option<Decimal>,
    #[serde(default)]
    pub marginal_tax_rate: Option<Decimal>,
}

/// Everything a strategy or orchestrator may read for one period
#[derive(Clone, Copy)]
pub struct SpendingContext<'a> {
    view: &'a dyn SimulationView,
    date: Date,
    retirement_start_date: Date,
    total_expenses: Decimal,
    other_income: Decimal,
    strategy_params: Option<StrategyParams>,
    period_index: u32,
}

impl std::fmt::Debug for SpendingContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpendingContext")
            .field("date", &self.date)
            .field("retirement_start_date", &self.retirement_start_date)
            .field("total_expenses", &self.total_expenses)
            .field("other_income", &self.other_income)
            .field("strategy_params", &self.strategy_params)
            .field("accounts", &self.view.account_snapshots().len())
            .field("age", &self.view.age())
            .finish()
    }
}

impl<'a> SpendingContext<'a> {
    #[must_use]
    pub fn builder() -> SpendingContextBuilder<'a> {
        SpendingContextBuilder::default()
    }

    pub fn view(&self) -> &'a dyn SimulationView {
        self.view
    }

    pub fn accounts(&self) -> &'a [AccountSnapshot] {
        self.view.account_snapshots()
    }

    pub fn total_balance(&self) -> Decimal {
        self.view.total_balance()
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn retirement_start_date(&self) -> Date {
        self.retirement_start_date
    }

    pub fn total_expenses(&self) -> Decimal {
        self.total_expenses
    }

    pub fn other_income(&self) -> Decimal {
        self.other_income
    }

    pub fn strategy_params(&self) -> Option<&StrategyParams> {
        self.strategy_params.as_ref()
    }

    /// Whole months since retirement started (0 in the first period)
    pub fn period_index(&self) -> u32 {
        self.period_index
    }

    /// Whole years since retirement started
    pub fn years_elapsed(&self) -> u32 {
        self.period_index / PERIODS_PER_YEAR
    }

    /// True on retirement anniversaries, when annual rules are reviewed
    pub fn is_review_period(&self) -> bool {
        self.period_index % PERIODS_PER_YEAR == 0
    }

    /// Expenses not covered by other income, floored at zero
    pub fn income_gap(&self) -> Decimal {
        non_negative(self.total_expenses - self.other_income)
    }
}

/// Builder for [`SpendingContext`]
#[derive(Default)]
pub struct SpendingContextBuilder<'a> {
    view: Option<&'a dyn SimulationView>,
    date: Option<Date>,
    retirement_start_date: Option<Date>,
    total_expenses: Decimal,
    other_income: Decimal,
    strategy_params: Option<StrategyParams>,
}

impl<'a> SpendingContextBuilder<'a> {
    #[must_use]
    pub fn view(mut self, view: &'a dyn SimulationView) -> Self {
        self.view = Some(view);
        self
    }

    #[must_use]
    pub fn date(mut self, date: Date) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn retirement_start(mut self, date: Date) -> Self {
        self.retirement_start_date = Some(date);
        self
    }

    #[must_use]
    pub fn total_expenses(mut self, amount: Decimal) -> Self {
        self.total_expenses = amount;
        self
    }

    #[must_use]
    pub fn other_income(mut self, amount: Decimal) -> Self {
        self.other_income = amount;
        self
    }

    #[must_use]
    pub fn strategy_params(mut self, params: StrategyParams) -> Self {
        self.strategy_params = Some(params);
        self
    }

    pub fn build(self) -> Result<SpendingContext<'a>> {
        let view = self
            .view
            .ok_or(SpendingError::MissingField("simulation_view"))?;
        let date = self.date.ok_or(SpendingError::MissingField("date"))?;
        let retirement_start_date = self
            .retirement_start_date
            .ok_or(SpendingError::MissingField("retirement_start_date"))?;

        if self.total_expenses < Decimal::ZERO {
            return Err(SpendingError::validation(
                "total_expenses",
                format!("{} is negative", self.total_expenses),
            ));
        }
        if self.other_income < Decimal::ZERO {
            return Err(SpendingError::validation(
                "other_income",
                format!("{} is negative", self.other_income),
            ));
        }

        let months = months_between(retirement_start_date, date);
        let period_index = u32::try_from(months).map_err(|_| {
            SpendingError::validation(
                "date",
                format!("{date} is before retirement start {retirement_start_date}"),
            )
        })?;

        Ok(SpendingContext {
            view,
            date,
            retirement_start_date,
            total_expenses: self.total_expenses,
            other_income: self.other_income,
            strategy_params: self.strategy_params,
            period_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccountId, TaxTreatment};
    use jiff::civil::date;
    use rust_decimal_macros::dec;

    fn view() -> PortfolioView {
        PortfolioView::new(
            vec![
                AccountSnapshot::new(AccountId(1), "Brokerage", TaxTreatment::Taxable, dec!(600))
                    .unwrap(),
                AccountSnapshot::new(AccountId(2), "IRA", TaxTreatment::PreTax, dec!(400))
                    .unwrap(),
            ],
            66,
            1959,
        )
    }

    #[test]
    fn test_derived_values() {
        let view = view();
        let ctx = SpendingContext::builder()
            .view(&view)
            .retirement_start(date(2025, 1, 1))
            .date(date(2027, 3, 1))
            .total_expenses(dec!(5000))
            .other_income(dec!(3500))
            .build()
            .unwrap();

        assert_eq!(ctx.period_index(), 26);
        assert_eq!(ctx.years_elapsed(), 2);
        assert!(!ctx.is_review_period());
        assert_eq!(ctx.income_gap(), dec!(1500));
        assert_eq!(ctx.total_balance(), dec!(1000));
    }

    #[test]
    fn test_income_gap_floors_at_zero() {
        let view = view();
        let ctx = SpendingContext::builder()
            .view(&view)
            .retirement_start(date(2025, 1, 1))
            .date(date(2025, 1, 1))
            .total_expenses(dec!(2000))
            .other_income(dec!(3000))
            .build()
            .unwrap();
        assert_eq!(ctx.income_gap(), Decimal::ZERO);
        assert!(ctx.is_review_period());
    }

    #[test]
    fn test_missing_fields() {
        let view = view();
        let err = SpendingContext::builder()
            .date(date(2025, 1, 1))
            .retirement_start(date(2025, 1, 1))
            .build()
            .unwrap_err();
        assert_eq!(err, SpendingError::MissingField("simulation_view"));

        let err = SpendingContext::builder()
            .view(&view)
            .retirement_start(date(2025, 1, 1))
            .build()
            .unwrap_err();
        assert_eq!(err, SpendingError::MissingField("date"));

        let err = SpendingContext::builder()
            .view(&view)
            .date(date(2025, 1, 1))
            .build()
            .unwrap_err();
        assert_eq!(err, SpendingError::MissingField("retirement_start_date"));
    }

    #[test]
    fn test_invalid_inputs() {
        let view = view();
        let before_start = SpendingContext::builder()
            .view(&view)
            .retirement_start(date(2025, 6, 1))
            .date(date(2025, 1, 1))
            .build();
        assert!(matches!(
            before_start,
            Err(SpendingError::Validation { field: "date", .. })
        ));

        let negative = SpendingContext::builder()
            .view(&view)
            .retirement_start(date(2025, 1, 1))
            .date(date(2025, 1, 1))
            .total_expenses(dec!(-1))
            .build();
        assert!(matches!(
            negative,
            Err(SpendingError::Validation { field: "total_expenses", .. })
        ));
    }
}
