use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{SpendingStrategy, capped_plan, check_rate};
use crate::error::{Result, SpendingError};
use crate::model::{SpendingContext, SpendingPlan, keys};
use crate::money::{compound_factor, per_period};

fn default_withdrawal_rate() -> Decimal {
    dec!(0.04)
}

fn default_inflation_rate() -> Decimal {
    dec!(0.025)
}

fn default_true() -> bool {
    true
}

/// Parameters for the fixed-percentage ("4% rule") strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticRateConfig {
    /// Fraction of the retirement-start balance withdrawn in year one
    #[serde(default = "default_withdrawal_rate")]
    pub withdrawal_rate: Decimal,
    #[serde(default = "default_inflation_rate")]
    pub inflation_rate: Decimal,
    /// Grow the year-one amount by inflation each retirement year
    #[serde(default = "default_true")]
    pub inflation_adjusted: bool,
}

impl Default for StaticRateConfig {
    fn default() -> Self {
        Self {
            withdrawal_rate: default_withdrawal_rate(),
            inflation_rate: default_inflation_rate(),
            inflation_adjusted: true,
        }
    }
}

impl StaticRateConfig {
    pub fn validate(&self) -> Result<()> {
        check_withdrawal_rate(self.withdrawal_rate)?;
        check_inflation_rate(self.inflation_rate)
    }
}

fn check_withdrawal_rate(rate: Decimal) -> Result<()> {
    if rate <= Decimal::ZERO {
        return Err(SpendingError::validation(
            "withdrawal_rate",
            format!("{rate} must be positive"),
        ));
    }
    check_rate("withdrawal_rate", rate, Decimal::ZERO, Decimal::ONE, true)
}

fn check_inflation_rate(rate: Decimal) -> Result<()> {
    check_rate("inflation_rate", rate, dec!(-0.5), Decimal::ONE, true)
}

/// Withdraws a fixed share of the starting balance, grown with inflation,
/// never more than the period's income gap.
#[derive(Debug, Clone, Default)]
pub struct StaticRateStrategy {
    config: StaticRateConfig,
}

impl StaticRateStrategy {
    pub fn new(config: StaticRateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StaticRateConfig {
        &self.config
    }
}

impl SpendingStrategy for StaticRateStrategy {
    fn name(&self) -> &'static str {
        "StaticRate"
    }

    fn calculate_withdrawal(&self, context: &SpendingContext<'_>) -> Result<SpendingPlan> {
        let params = context.strategy_params();
        let rate = params
            .and_then(|p| p.withdrawal_rate)
            .unwrap_or(self.config.withdrawal_rate);
        let inflation = params
            .and_then(|p| p.inflation_rate)
            .unwrap_or(self.config.inflation_rate);
        check_withdrawal_rate(rate)?;
        check_inflation_rate(inflation)?;

        let years = context.years_elapsed();
        // In the first retirement year the current balance is the starting balance
        let start_balance = match context.view().initial_portfolio_balance() {
            Some(balance) => balance,
            None if years == 0 => context.total_balance(),
            None => return Err(SpendingError::MissingField("initial_portfolio_balance")),
        };

        let year_one = start_balance * rate;
        let annual = if self.config.inflation_adjusted {
            year_one * compound_factor(inflation, years)
        } else {
            year_one
        };
        let rule_based = per_period(annual);

        let income_gap = context.income_gap();
        let target = if income_gap > Decimal::ZERO {
            rule_based.min(income_gap)
        } else {
            Decimal::ZERO
        };
        let capped_by_gap = target < rule_based;

        tracing::debug!(
            strategy = self.name(),
            years_elapsed = years,
            rule_based = %rule_based,
            income_gap = %income_gap,
            target = %target,
            "static rate target"
        );

        capped_plan(self.name(), target, context)
            .meta(keys::RULE_BASED_AMOUNT, rule_based)
            .meta(keys::INCOME_GAP, income_gap)
            .meta(keys::YEARS_ELAPSED, years)
            .meta(keys::WITHDRAWAL_RATE, rate)
            .meta(keys::CAPPED_BY_INCOME_GAP, capped_by_gap)
            .build()
    }

    fn is_dynamic(&self) -> bool {
        false
    }

    fn requires_prior_year_state(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_math::add_months;
    use crate::model::{AccountId, AccountSnapshot, PortfolioView, StrategyParams, TaxTreatment};
    use jiff::civil::{Date, date};

    const START: Date = date(2025, 1, 1);

    fn view(balance: Decimal) -> PortfolioView {
        PortfolioView::new(
            vec![
                AccountSnapshot::new(AccountId(1), "Brokerage", TaxTreatment::Taxable, balance)
                    .unwrap(),
            ],
            65,
            1960,
        )
    }

    fn plan_at(
        strategy: &StaticRateStrategy,
        view: &PortfolioView,
        months: i32,
        expenses: Decimal,
        income: Decimal,
    ) -> Result<SpendingPlan> {
        let ctx = SpendingContext::builder()
            .view(view)
            .retirement_start(START)
            .date(add_months(START, months))
            .total_expenses(expenses)
            .other_income(income)
            .build()?;
        strategy.calculate_withdrawal(&ctx)
    }

    #[test]
    fn test_first_period_four_percent() {
        let strategy = StaticRateStrategy::default();
        let plan = plan_at(&strategy, &view(dec!(1000000)), 0, dec!(10000), Decimal::ZERO)
            .unwrap();
        assert_eq!(plan.target_withdrawal(), dec!(3333.33));
        assert_eq!(plan.adjusted_withdrawal(), dec!(3333.33));
        assert!(plan.meets_target());
        assert_eq!(plan.metadata_value(keys::CAPPED_BY_INCOME_GAP), Some("false"));
    }

    #[test]
    fn test_inflation_after_four_years() {
        let strategy = StaticRateStrategy::default();
        let view = view(dec!(900000)).with_initial_balance(dec!(1000000));
        let plan = plan_at(&strategy, &view, 48, dec!(10000), Decimal::ZERO).unwrap();
        assert_eq!(plan.target_withdrawal(), dec!(3679.38));
        assert_eq!(plan.metadata_value(keys::YEARS_ELAPSED), Some("4"));
    }

    #[test]
    fn test_inflation_steps_annually() {
        let strategy = StaticRateStrategy::default();
        let view = view(dec!(1000000)).with_initial_balance(dec!(1000000));
        let month_11 = plan_at(&strategy, &view, 11, dec!(10000), Decimal::ZERO).unwrap();
        let month_12 = plan_at(&strategy, &view, 12, dec!(10000), Decimal::ZERO).unwrap();
        assert_eq!(month_11.target_withdrawal(), dec!(3333.33));
        // 40,000 * 1.025 / 12
        assert_eq!(month_12.target_withdrawal(), dec!(3416.67));
    }

    #[test]
    fn test_flat_when_not_inflation_adjusted() {
        let strategy = StaticRateStrategy::new(StaticRateConfig {
            inflation_adjusted: false,
            ..StaticRateConfig::default()
        })
        .unwrap();
        let view = view(dec!(1000000)).with_initial_balance(dec!(1000000));
        let plan = plan_at(&strategy, &view, 60, dec!(10000), Decimal::ZERO).unwrap();
        assert_eq!(plan.target_withdrawal(), dec!(3333.33));
    }

    #[test]
    fn test_half_million_first_period() {
        let strategy = StaticRateStrategy::default();
        let plan =
            plan_at(&strategy, &view(dec!(500000)), 0, dec!(10000), Decimal::ZERO).unwrap();
        assert_eq!(plan.target_withdrawal(), dec!(1666.67));
    }

    #[test]
    fn test_income_gap_caps_rule_amount() {
        let strategy = StaticRateStrategy::default();
        let plan =
            plan_at(&strategy, &view(dec!(1000000)), 0, dec!(5000), dec!(3000)).unwrap();
        assert_eq!(plan.target_withdrawal(), dec!(2000));
        assert_eq!(plan.metadata_value(keys::RULE_BASED_AMOUNT), Some("3333.33"));
        assert_eq!(plan.metadata_value(keys::CAPPED_BY_INCOME_GAP), Some("true"));
    }

    #[test]
    fn test_no_gap_means_no_withdrawal() {
        let strategy = StaticRateStrategy::default();
        let plan =
            plan_at(&strategy, &view(dec!(1000000)), 0, dec!(3000), dec!(4000)).unwrap();
        assert_eq!(plan.target_withdrawal(), Decimal::ZERO);
        assert!(plan.meets_target());
    }

    #[test]
    fn test_capped_at_balance() {
        let strategy = StaticRateStrategy::default();
        let view = view(dec!(1000)).with_initial_balance(dec!(1000000));
        let plan = plan_at(&strategy, &view, 24, dec!(10000), Decimal::ZERO).unwrap();
        assert_eq!(plan.adjusted_withdrawal(), dec!(1000));
        assert!(!plan.meets_target());
        assert_eq!(
            plan.shortfall(),
            plan.target_withdrawal() - plan.adjusted_withdrawal()
        );
    }

    #[test]
    fn test_later_years_need_initial_balance() {
        let strategy = StaticRateStrategy::default();
        let err = plan_at(&strategy, &view(dec!(1000000)), 13, dec!(10000), Decimal::ZERO)
            .unwrap_err();
        assert_eq!(err, SpendingError::MissingField("initial_portfolio_balance"));
    }

    #[test]
    fn test_params_override_rate() {
        let strategy = StaticRateStrategy::default();
        let view = view(dec!(1000000));
        let ctx = SpendingContext::builder()
            .view(&view)
            .retirement_start(START)
            .date(START)
            .total_expenses(dec!(10000))
            .strategy_params(StrategyParams {
                withdrawal_rate: Some(dec!(0.03)),
                ..StrategyParams::default()
            })
            .build()
            .unwrap();
        let plan = strategy.calculate_withdrawal(&ctx).unwrap();
        assert_eq!(plan.target_withdrawal(), dec!(2500));

        let bad = SpendingContext::builder()
            .view(&view)
            .retirement_start(START)
            .date(START)
            .strategy_params(StrategyParams {
                withdrawal_rate: Some(dec!(-0.01)),
                ..StrategyParams::default()
            })
            .build()
            .unwrap();
        assert!(strategy.calculate_withdrawal(&bad).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let zero = StaticRateConfig {
            withdrawal_rate: Decimal::ZERO,
            ..StaticRateConfig::default()
        };
        assert!(StaticRateStrategy::new(zero).is_err());
    }

    #[test]
    fn test_flags() {
        let strategy = StaticRateStrategy::default();
        assert!(!strategy.is_dynamic());
        assert!(!strategy.requires_prior_year_state());
    }
}
