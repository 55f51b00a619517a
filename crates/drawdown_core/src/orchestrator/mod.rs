//! Orchestration: strategy target + account order → per-account withdrawals

mod default;
mod rmd_aware;

use std::fmt::Debug;

use rust_decimal::Decimal;

pub use default::DefaultOrchestrator;
pub use rmd_aware::RmdAwareOrchestrator;

use crate::error::Result;
use crate::model::{AccountSnapshot, AccountWithdrawal, SpendingContext, SpendingPlan};
use crate::sequencer::AccountSequencer;
use crate::strategy::SpendingStrategy;

/// Combines a strategy and a sequencer into a funded plan
pub trait SpendingOrchestrator: Send + Sync + Debug {
    fn execute(
        &self,
        strategy: &dyn SpendingStrategy,
        sequencer: &dyn AccountSequencer,
        context: &SpendingContext<'_>,
    ) -> Result<SpendingPlan>;

    /// Sequencer to use when the caller has no preference
    fn select_default_sequencer(&self, context: &SpendingContext<'_>) -> Box<dyn AccountSequencer>;

    fn execute_with_default_sequencer(
        &self,
        strategy: &dyn SpendingStrategy,
        context: &SpendingContext<'_>,
    ) -> Result<SpendingPlan> {
        let sequencer = self.select_default_sequencer(context);
        self.execute(strategy, sequencer.as_ref(), context)
    }
}

/// Draw up to `amount` from `accounts` in order, each at most its balance.
pub(crate) fn draw_in_order(
    accounts: &[&AccountSnapshot],
    amount: Decimal,
) -> Result<Vec<AccountWithdrawal>> {
    let mut remaining = amount;
    let mut withdrawals = Vec::new();

    for account in accounts {
        if remaining <= Decimal::ZERO {
            break;
        }
        let take = remaining.min(account.balance());
        if take <= Decimal::ZERO {
            continue;
        }
        tracing::trace!(
            account = %account.account_id(),
            amount = %take,
            "withdraw"
        );
        withdrawals.push(AccountWithdrawal::from_snapshot(account, take)?);
        remaining -= take;
    }

    Ok(withdrawals)
}

pub(crate) fn warn_on_shortfall(plan: &SpendingPlan, context: &SpendingContext<'_>) {
    if !plan.meets_target() {
        tracing::warn!(
            strategy = plan.strategy_used(),
            period = context.period_index(),
            target = %plan.target_withdrawal(),
            shortfall = %plan.shortfall(),
            "withdrawal target not met"
        );
    }
}
