//! Spending strategies
//!
//! A strategy answers one question: how much should the portfolio pay out this
//! period? It does not pick accounts; that is the orchestrator's job. Every
//! strategy is a pure function of the [`SpendingContext`] it is given.

mod guardrails;
mod guardrails_config;
mod income_gap;
mod static_rate;

use std::fmt::Debug;

use rust_decimal::Decimal;

pub use guardrails::GuardrailsStrategy;
pub use guardrails_config::{GuardrailRuleset, GuardrailsConfig};
pub use income_gap::{IncomeGapConfig, IncomeGapStrategy};
pub use static_rate::{StaticRateConfig, StaticRateStrategy};

use crate::error::{Result, SpendingError};
use crate::model::{SpendingContext, SpendingPlan, SpendingPlanBuilder};

/// Computes the target withdrawal for a period
pub trait SpendingStrategy: Send + Sync + Debug {
    /// Name recorded as `strategy_used` on plans
    fn name(&self) -> &'static str;

    /// Target for this period. The returned plan has no account withdrawals;
    /// its adjusted withdrawal is the target capped at the total balance.
    fn calculate_withdrawal(&self, context: &SpendingContext<'_>) -> Result<SpendingPlan>;

    /// Whether the amount reacts to portfolio performance
    fn is_dynamic(&self) -> bool;

    /// Whether the strategy reads the previous period's outcome (spending,
    /// return, ratchet history) from the view. The retirement-start balance is
    /// a fixed input, not prior-period state.
    fn requires_prior_year_state(&self) -> bool;
}

/// Start a plan for `target`, capping the adjusted amount at the total balance
pub(crate) fn capped_plan(
    name: &str,
    target: Decimal,
    context: &SpendingContext<'_>,
) -> SpendingPlanBuilder {
    let adjusted = target.min(context.total_balance());
    SpendingPlan::builder(name).target(target).adjusted(adjusted)
}

/// Check that `value` lies in `[min, max)` (or `[min, max]` when `inclusive_max`)
pub(crate) fn check_rate(
    field: &'static str,
    value: Decimal,
    min: Decimal,
    max: Decimal,
    inclusive_max: bool,
) -> Result<()> {
    let above = if inclusive_max { value > max } else { value >= max };
    if value < min || above {
        let close = if inclusive_max { ']' } else { ')' };
        return Err(SpendingError::validation(
            field,
            format!("{value} is outside [{min}, {max}{close}"),
        ));
    }
    Ok(())
}
