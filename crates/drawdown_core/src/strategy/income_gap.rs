use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{SpendingStrategy, capped_plan, check_rate};
use crate::error::Result;
use crate::model::{SpendingContext, SpendingPlan, keys};
use crate::money::round_currency;

fn default_marginal_tax_rate() -> Decimal {
    dec!(0.22)
}

/// Parameters for withdrawing exactly what other income does not cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeGapConfig {
    /// Gross the gap up so that the after-tax amount covers it
    #[serde(default)]
    pub gross_up_for_taxes: bool,
    #[serde(default = "default_marginal_tax_rate")]
    pub marginal_tax_rate: Decimal,
}

impl Default for IncomeGapConfig {
    fn default() -> Self {
        Self {
            gross_up_for_taxes: false,
            marginal_tax_rate: default_marginal_tax_rate(),
        }
    }
}

impl IncomeGapConfig {
    pub fn validate(&self) -> Result<()> {
        check_marginal_rate(self.marginal_tax_rate)
    }
}

fn check_marginal_rate(rate: Decimal) -> Result<()> {
    check_rate("marginal_tax_rate", rate, Decimal::ZERO, Decimal::ONE, false)
}

/// Withdraws `max(0, expenses - other income)`, optionally grossed up for tax
#[derive(Debug, Clone, Default)]
pub struct IncomeGapStrategy {
    config: IncomeGapConfig,
}

impl IncomeGapStrategy {
    pub fn new(config: IncomeGapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &IncomeGapConfig {
        &self.config
    }
}

impl SpendingStrategy for IncomeGapStrategy {
    fn name(&self) -> &'static str {
        "IncomeGap"
    }

    fn calculate_withdrawal(&self, context: &SpendingContext<'_>) -> Result<SpendingPlan> {
        let marginal_rate = context
            .strategy_params()
            .and_then(|p| p.marginal_tax_rate)
            .unwrap_or(self.config.marginal_tax_rate);
        check_marginal_rate(marginal_rate)?;

        let net_gap = context.income_gap();
        let grossed_up = self.config.gross_up_for_taxes && net_gap > Decimal::ZERO;
        let target = if grossed_up {
            round_currency(net_gap / (Decimal::ONE - marginal_rate))
        } else {
            net_gap
        };

        tracing::debug!(
            strategy = self.name(),
            net_gap = %net_gap,
            grossed_up,
            target = %target,
            "income gap target"
        );

        capped_plan(self.name(), target, context)
            .meta(keys::NET_GAP, net_gap)
            .meta(keys::GROSSED_UP, grossed_up)
            .meta(keys::MARGINAL_TAX_RATE, marginal_rate)
            .build()
    }

    fn is_dynamic(&self) -> bool {
        false
    }

    fn requires_prior_year_state(&self) -> bool {
        false
    }
}
