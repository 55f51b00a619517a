//! Account snapshots handed to the planner each period
//!
//! A snapshot is the simulation driver's read-only view of one account at the
//! start of a period. The planner never changes it; balance changes flow back
//! to the driver as [`AccountWithdrawal`](super::AccountWithdrawal)s.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::AccountId;
use crate::error::{Result, SpendingError};

/// Tax treatment of withdrawals from an account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaxTreatment {
    /// Regular brokerage - capital gains taxed
    Taxable,
    /// 401k, Traditional IRA - withdrawals taxed as ordinary income
    PreTax,
    /// Roth IRA, Roth 401k - qualified withdrawals tax-free
    Roth,
    /// Health Savings Account - kept for last
    Hsa,
}

impl TaxTreatment {
    /// Tax-priority tier used for tax-efficient ordering (lower drains first)
    #[must_use]
    pub fn priority_tier(self) -> u8 {
        match self {
            TaxTreatment::Taxable => 1,
            TaxTreatment::PreTax => 2,
            TaxTreatment::Roth => 3,
            TaxTreatment::Hsa => 4,
        }
    }

    /// Tier once minimum distributions are active: tax-deferred money goes first
    #[must_use]
    pub fn rmd_phase_tier(self) -> u8 {
        match self {
            TaxTreatment::PreTax => 1,
            TaxTreatment::Taxable => 2,
            TaxTreatment::Roth => 3,
            TaxTreatment::Hsa => 4,
        }
    }

    fn default_account_type(self) -> &'static str {
        match self {
            TaxTreatment::Taxable => "Brokerage",
            TaxTreatment::PreTax => "Traditional IRA",
            TaxTreatment::Roth => "Roth IRA",
            TaxTreatment::Hsa => "HSA",
        }
    }
}

/// Point-in-time view of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSnapshot {
    account_id: AccountId,
    account_name: String,
    account_type: String,
    tax_treatment: TaxTreatment,
    balance: Decimal,
    subject_to_rmd: bool,
}

impl AccountSnapshot {
    /// Create a snapshot; pre-tax accounts are subject to RMDs unless overridden.
    pub fn new(
        account_id: AccountId,
        account_name: impl Into<String>,
        tax_treatment: TaxTreatment,
        balance: Decimal,
    ) -> Result<Self> {
        if balance < Decimal::ZERO {
            return Err(SpendingError::validation(
                "balance",
                format!("account {account_id} has negative balance {balance}"),
            ));
        }

        Ok(Self {
            account_id,
            account_name: account_name.into(),
            account_type: tax_treatment.default_account_type().to_string(),
            tax_treatment,
            balance,
            subject_to_rmd: tax_treatment == TaxTreatment::PreTax,
        })
    }

    #[must_use]
    pub fn with_account_type(mut self, account_type: impl Into<String>) -> Self {
        self.account_type = account_type.into();
        self
    }

    #[must_use]
    pub fn with_rmd(mut self, subject_to_rmd: bool) -> Self {
        self.subject_to_rmd = subject_to_rmd;
        self
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

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn subject_to_rmd(&self) -> bool {
        self.subject_to_rmd
    }

    pub fn has_funds(&self) -> bool {
        self.balance > Decimal::ZERO
    }
}
