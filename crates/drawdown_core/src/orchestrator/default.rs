use rust_decimal::Decimal;

use super::{SpendingOrchestrator, draw_in_order, warn_on_shortfall};
use crate::error::Result;
use crate::model::{SpendingContext, SpendingPlan};
use crate::sequencer::{AccountSequencer, TaxEfficientSequencer};
use crate::strategy::SpendingStrategy;

/// Fills the strategy's target from accounts in sequencer order
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOrchestrator;

impl SpendingOrchestrator for DefaultOrchestrator {
    fn execute(
        &self,
        strategy: &dyn SpendingStrategy,
        sequencer: &dyn AccountSequencer,
        context: &SpendingContext<'_>,
    ) -> Result<SpendingPlan> {
        let strategy_plan = strategy.calculate_withdrawal(context)?;
        let target = strategy_plan.target_withdrawal();

        let accounts = sequencer.sequence(context)?;
        let withdrawals = draw_in_order(&accounts, target)?;
        let withdrawn: Decimal = withdrawals.iter().map(|w| w.amount()).sum();

        tracing::debug!(
            strategy = strategy.name(),
            sequencer = sequencer.name(),
            target = %target,
            withdrawn = %withdrawn,
            accounts = withdrawals.len(),
            "planned withdrawals"
        );

        let plan = SpendingPlan::builder(strategy_plan.strategy_used())
            .target(target)
            .adjusted(withdrawn)
            .withdrawals(withdrawals)
            .inherit_metadata(strategy_plan.metadata())
            .build()?;
        warn_on_shortfall(&plan, context);
        Ok(plan)
    }

    fn select_default_sequencer(&self, _context: &SpendingContext<'_>) -> Box<dyn AccountSequencer> {
        Box::new(TaxEfficientSequencer)
    }
}
