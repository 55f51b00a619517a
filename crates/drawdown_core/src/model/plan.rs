//! Output of one orchestration call
//!
//! A [`SpendingPlan`] tells the simulation driver how much to withdraw and from
//! which accounts. Plans are immutable; the driver applies the balance changes.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::accounts::{AccountSnapshot, TaxTreatment};
use super::ids::AccountId;
use crate::error::{Result, SpendingError};
use crate::money::non_negative;

/// Diagnostic key/value pairs attached to a plan (ordered for stable output)
pub type PlanMetadata = BTreeMap<String, String>;

/// Well-known metadata keys
pub mod keys {
    pub const ADJUSTMENT: &str = "adjustment";
    pub const BOUNDED: &str = "bounded";
    pub const CAPPED_BY_INCOME_GAP: &str = "cappedByIncomeGap";
    pub const CLAMPED: &str = "clamped";
    pub const CURRENT_RATE: &str = "currentRate";
    pub const DISCRETIONARY_WITHDRAWN: &str = "discretionaryWithdrawn";
    pub const FIRST_YEAR: &str = "firstYear";
    pub const GROSSED_UP: &str = "grossedUp";
    pub const INCOME_GAP: &str = "incomeGap";
    pub const INFLATION_SKIPPED: &str = "inflationSkipped";
    pub const INITIAL_RATE: &str = "initialRate";
    pub const MARGINAL_TAX_RATE: &str = "marginalTaxRate";
    pub const NET_GAP: &str = "netGap";
    pub const PORTFOLIO_GROWTH: &str = "portfolioGrowth";
    pub const RATCHET_BLOCKED: &str = "ratchetBlocked";
    pub const RATCHET_PERIOD: &str = "ratchetPeriod";
    pub const REVIEW: &str = "review";
    pub const RMD_FORCED: &str = "rmdForced";
    pub const RMD_REQUIRED: &str = "rmdRequired";
    pub const RMD_WITHDRAWN: &str = "rmdWithdrawn";
    pub const RULE_BASED_AMOUNT: &str = "ruleBasedAmount";
    pub const RULESET: &str = "ruleset";
    pub const STRATEGY_TARGET: &str = "strategyTarget";
    pub const WITHDRAWAL_RATE: &str = "withdrawalRate";
    pub const YEARS_ELAPSED: &str = "yearsElapsed";
}

/// Amount to take from a single account this period
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountWithdrawal {
    account_id: AccountId,
    account_name: String,
    account_type: String,
    tax_treatment: TaxTreatment,
    amount: Decimal,
    prior_balance: Decimal,
    new_balance: Decimal,
}

impl AccountWithdrawal {
    /// Withdraw `amount` from the account described by `snapshot`.
    pub fn from_snapshot(snapshot: &AccountSnapshot, amount: Decimal) -> Result<Self> {
        let prior_balance = snapshot.balance();
        check_amount(snapshot.account_id(), amount, prior_balance)?;

        Ok(Self {
            account_id: snapshot.account_id(),
            account_name: snapshot.account_name().to_string(),
            account_type: snapshot.account_type().to_string(),
            tax_treatment: snapshot.tax_treatment(),
            amount,
            prior_balance,
            new_balance: prior_balance - amount,
        })
    }

    /// Same account, with `extra` drawn on top of the current amount.
    pub fn with_additional(&self, extra: Decimal) -> Result<Self> {
        let amount = self.amount + extra;
        check_amount(self.account_id, amount, self.prior_balance)?;

        Ok(Self {
            amount,
            new_balance: self.prior_balance - amount,
            ..self.clone()
        })
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn account_type(&self) -> &str {
        &self.account_type
    }

    pub fn tax_treatment(&self) -> TaxTreatment {
        self.tax_treatment
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn prior_balance(&self) -> Decimal {
        self.prior_balance
    }

    pub fn new_balance(&self) -> Decimal {
        self.new_balance
    }
}

fn check_amount(account_id: AccountId, amount: Decimal, prior_balance: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(SpendingError::validation(
            "amount",
            format!("withdrawal of {amount} from account {account_id} is negative"),
        ));
    }
    if amount > prior_balance {
        return Err(SpendingError::validation(
            "amount",
            format!("withdrawal of {amount} exceeds balance {prior_balance} of account {account_id}"),
        ));
    }
    Ok(())
}

/// Result of planning one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpendingPlan {
    target_withdrawal: Decimal,
    adjusted_withdrawal: Decimal,
    meets_target: bool,
    shortfall: Decimal,
    account_withdrawals: Vec<AccountWithdrawal>,
    strategy_used: String,
    metadata: PlanMetadata,
}

impl SpendingPlan {
    #[must_use]
    pub fn builder(strategy_used: impl Into<String>) -> SpendingPlanBuilder {
        SpendingPlanBuilder {
            strategy_used: strategy_used.into(),
            target_withdrawal: None,
            adjusted_withdrawal: None,
            account_withdrawals: Vec::new(),
            metadata: PlanMetadata::new(),
        }
    }

    pub fn target_withdrawal(&self) -> Decimal {
        self.target_withdrawal
    }

    pub fn adjusted_withdrawal(&self) -> Decimal {
        self.adjusted_withdrawal
    }

    pub fn meets_target(&self) -> bool {
        self.meets_target
    }

    pub fn shortfall(&self) -> Decimal {
        self.shortfall
    }

    pub fn account_withdrawals(&self) -> &[AccountWithdrawal] {
        &self.account_withdrawals
    }

    pub fn strategy_used(&self) -> &str {
        &self.strategy_used
    }

    pub fn metadata(&self) -> &PlanMetadata {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Sum of the per-account withdrawal amounts
    pub fn total_withdrawn(&self) -> Decimal {
        self.account_withdrawals.iter().map(|w| w.amount).sum()
    }

    /// Withdrawal for a specific account, if the plan touches it
    pub fn withdrawal_for(&self, account_id: AccountId) -> Option<&AccountWithdrawal> {
        self.account_withdrawals
            .iter()
            .find(|w| w.account_id == account_id)
    }
}

/// Builder for [`SpendingPlan`]; shortfall and `meets_target` are derived.
#[derive(Debug, Clone)]
pub struct SpendingPlanBuilder {
    strategy_used: String,
    target_withdrawal: Option<Decimal>,
    adjusted_withdrawal: Option<Decimal>,
    account_withdrawals: Vec<AccountWithdrawal>,
    metadata: PlanMetadata,
}

impl SpendingPlanBuilder {
    #[must_use]
    pub fn target(mut self, amount: Decimal) -> Self {
        self.target_withdrawal = Some(amount);
        self
    }

    /// Amount actually withdrawn. Defaults to the sum of account withdrawals.
    #[must_use]
    pub fn adjusted(mut self, amount: Decimal) -> Self {
        self.adjusted_withdrawal = Some(amount);
        self
    }

    #[must_use]
    pub fn withdrawals(mut self, withdrawals: Vec<AccountWithdrawal>) -> Self {
        self.account_withdrawals = withdrawals;
        self
    }

    #[must_use]
    pub fn meta(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Merge metadata; keys already set on the builder win.
    #[must_use]
    pub fn inherit_metadata(mut self, metadata: &PlanMetadata) -> Self {
        for (key, value) in metadata {
            self.metadata
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }

    pub fn build(self) -> Result<SpendingPlan> {
        let target = self
            .target_withdrawal
            .ok_or(SpendingError::MissingField("target_withdrawal"))?;
        if target < Decimal::ZERO {
            return Err(SpendingError::validation(
                "target_withdrawal",
                format!("{target} is negative"),
            ));
        }

        let withdrawn: Decimal = self.account_withdrawals.iter().map(|w| w.amount).sum();
        let adjusted = match self.adjusted_withdrawal {
            Some(adjusted) => {
                if !self.account_withdrawals.is_empty() && adjusted != withdrawn {
                    return Err(SpendingError::validation(
                        "adjusted_withdrawal",
                        format!("{adjusted} does not match account withdrawals totalling {withdrawn}"),
                    ));
                }
                adjusted
            }
            None if !self.account_withdrawals.is_empty() => withdrawn,
            None => return Err(SpendingError::MissingField("adjusted_withdrawal")),
        };
        if adjusted < Decimal::ZERO {
            return Err(SpendingError::validation(
                "adjusted_withdrawal",
                format!("{adjusted} is negative"),
            ));
        }

        Ok(SpendingPlan {
            target_withdrawal: target,
            adjusted_withdrawal: adjusted,
            meets_target: adjusted >= target,
            shortfall: non_negative(target - adjusted),
            account_withdrawals: self.account_withdrawals,
            strategy_used: self.strategy_used,
            metadata: self.metadata,
        })
    }
}
