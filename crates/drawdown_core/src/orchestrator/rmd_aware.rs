//! RMD enforcement layered over another orchestrator
//!
//! When distributions apply, this period's share of each account's annual RMD
//! is withdrawn first, even if the strategy asked for less. Anything still owed
//! to the target is then drawn pre-tax first. The sequencer passed to
//! [`SpendingOrchestrator::execute`] is only used when delegating.

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use super::{SpendingOrchestrator, warn_on_shortfall};
use crate::error::Result;
use crate::model::{AccountId, AccountSnapshot, AccountWithdrawal, SpendingContext, SpendingPlan, keys};
use crate::money::per_period;
use crate::rmd::{RmdCalculator, UniformLifetimeCalculator};
use crate::sequencer::{AccountSequencer, RmdFirstSequencer, tax_efficient_cmp};
use crate::strategy::SpendingStrategy;

#[derive(Debug)]
pub struct RmdAwareOrchestrator<O> {
    inner: O,
    calculator: Box<dyn RmdCalculator>,
}

impl<O: SpendingOrchestrator> RmdAwareOrchestrator<O> {
    pub fn new(inner: O, calculator: Box<dyn RmdCalculator>) -> Self {
        Self { inner, calculator }
    }

    /// Wrap `inner` using the IRS Uniform Lifetime Table and SECURE 2.0 start ages
    pub fn with_default_calculator(inner: O) -> Self {
        Self::new(inner, Box::new(UniformLifetimeCalculator::default()))
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    fn rmd_required(&self, context: &SpendingContext<'_>) -> bool {
        let view = context.view();
        self.calculator.is_rmd_required(view.age(), view.birth_year())
    }

    /// This period's RMD share for every funded RMD-subject account, and the
    /// summed annual requirement
    fn period_shares(
        &self,
        context: &SpendingContext<'_>,
    ) -> Result<(FxHashMap<AccountId, Decimal>, Decimal)> {
        let age = context.view().age();
        let mut shares = FxHashMap::default();
        let mut total_annual = Decimal::ZERO;
        for account in context
            .accounts()
            .iter()
            .filter(|a| a.subject_to_rmd() && a.has_funds())
        {
            let annual = self.calculator.calculate_rmd(account.balance(), age)?;
            let share = per_period(annual);
            tracing::trace!(
                account = %account.account_id(),
                annual = %annual,
                share = %share,
                "rmd share"
            );
            shares.insert(account.account_id(), share);
            total_annual += annual;
        }
        Ok((shares, total_annual))
    }
}

impl<O: SpendingOrchestrator> SpendingOrchestrator for RmdAwareOrchestrator<O> {
    fn execute(
        &self,
        strategy: &dyn SpendingStrategy,
        sequencer: &dyn AccountSequencer,
        context: &SpendingContext<'_>,
    ) -> Result<SpendingPlan> {
        if !self.rmd_required(context) {
            return self.inner.execute(strategy, sequencer, context);
        }
        let (shares, total_annual) = self.period_shares(context)?;
        if shares.is_empty() {
            return self.inner.execute(strategy, sequencer, context);
        }

        // The floor comes from the summed annual RMD; per-account shares only cap phase 1
        let total_period_rmd = per_period(total_annual);
        let strategy_plan = strategy.calculate_withdrawal(context)?;
        let strategy_target = strategy_plan.target_withdrawal();
        let effective_target = strategy_target.max(total_period_rmd);
        let rmd_forced = total_period_rmd > strategy_target;

        if rmd_forced {
            tracing::debug!(
                strategy = strategy.name(),
                period = context.period_index(),
                strategy_target = %strategy_target,
                rmd = %total_period_rmd,
                "rmd forces withdrawal above strategy target"
            );
        }

        // Phase 1: the distributions themselves
        let mut rmd_accounts: Vec<&AccountSnapshot> = context
            .accounts()
            .iter()
            .filter(|a| shares.contains_key(&a.account_id()))
            .collect();
        rmd_accounts.sort_by(|a, b| tax_efficient_cmp(a, b));

        let mut withdrawals: Vec<AccountWithdrawal> = Vec::with_capacity(context.accounts().len());
        let mut rmd_withdrawn = Decimal::ZERO;
        for account in rmd_accounts {
            let remaining = effective_target - rmd_withdrawn;
            if remaining <= Decimal::ZERO {
                break;
            }
            let share = shares.get(&account.account_id()).copied().unwrap_or_default();
            let take = share.min(account.balance()).min(remaining);
            if take <= Decimal::ZERO {
                continue;
            }
            tracing::trace!(account = %account.account_id(), amount = %take, "rmd withdrawal");
            withdrawals.push(AccountWithdrawal::from_snapshot(account, take)?);
            rmd_withdrawn += take;
        }

        // Phase 2: whatever the target still needs, pre-tax first
        let mut discretionary_withdrawn = Decimal::ZERO;
        let mut remaining = effective_target - rmd_withdrawn;
        if remaining > Decimal::ZERO {
            let drawn = |id: AccountId| {
                withdrawals
                    .iter()
                    .find(|w| w.account_id() == id)
                    .map_or(Decimal::ZERO, |w| w.amount())
            };
            let mut candidates: Vec<(&AccountSnapshot, Decimal)> = context
                .accounts()
                .iter()
                .map(|a| (a, a.balance() - drawn(a.account_id())))
                .filter(|(_, available)| *available > Decimal::ZERO)
                .collect();
            candidates.sort_by(|(a, a_avail), (b, b_avail)| {
                a.tax_treatment()
                    .rmd_phase_tier()
                    .cmp(&b.tax_treatment().rmd_phase_tier())
                    .then_with(|| a_avail.cmp(b_avail))
                    .then_with(|| a.account_id().cmp(&b.account_id()))
            });

            for (account, available) in candidates {
                if remaining <= Decimal::ZERO {
                    break;
                }
                let take = remaining.min(available);
                tracing::trace!(
                    account = %account.account_id(),
                    amount = %take,
                    "discretionary withdrawal"
                );
                match withdrawals
                    .iter_mut()
                    .find(|w| w.account_id() == account.account_id())
                {
                    Some(existing) => *existing = existing.with_additional(take)?,
                    None => withdrawals.push(AccountWithdrawal::from_snapshot(account, take)?),
                }
                discretionary_withdrawn += take;
                remaining -= take;
            }
        }

        let plan = SpendingPlan::builder(strategy_plan.strategy_used())
            .target(effective_target)
            .adjusted(rmd_withdrawn + discretionary_withdrawn)
            .withdrawals(withdrawals)
            .meta(keys::RMD_REQUIRED, total_period_rmd)
            .meta(keys::STRATEGY_TARGET, strategy_target)
            .meta(keys::RMD_FORCED, rmd_forced)
            .meta(keys::RMD_WITHDRAWN, rmd_withdrawn)
            .meta(keys::DISCRETIONARY_WITHDRAWN, discretionary_withdrawn)
            .inherit_metadata(strategy_plan.metadata())
            .build()?;
        warn_on_shortfall(&plan, context);
        Ok(plan)
    }

    fn select_default_sequencer(&self, context: &SpendingContext<'_>) -> Box<dyn AccountSequencer> {
        if self.rmd_required(context) {
            Box::new(RmdFirstSequencer)
        } else {
            self.inner.select_default_sequencer(context)
        }
    }
}
