//! Account withdrawal ordering
//!
//! A sequencer turns the period's account snapshots into the order in which
//! an orchestrator should draw from them. Empty accounts are never returned.

use std::cmp::Ordering;
use std::fmt::Debug;

use crate::error::Result;
use crate::model::{AccountSnapshot, SpendingContext};

/// Orders accounts into a withdrawal priority list
pub trait AccountSequencer: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    /// Accounts with a positive balance, highest priority first
    fn sequence<'a>(&self, context: &SpendingContext<'a>) -> Result<Vec<&'a AccountSnapshot>>;
}

/// Tax tier first, then smallest balance (so small accounts close out), then id
pub(crate) fn tax_efficient_cmp(a: &AccountSnapshot, b: &AccountSnapshot) -> Ordering {
    a.tax_treatment()
        .priority_tier()
        .cmp(&b.tax_treatment().priority_tier())
        .then_with(|| a.balance().cmp(&b.balance()))
        .then_with(|| a.account_id().cmp(&b.account_id()))
}

fn funded<'a>(context: &SpendingContext<'a>) -> Vec<&'a AccountSnapshot> {
    context
        .accounts()
        .iter()
        .filter(|a| a.has_funds())
        .collect()
}

/// Taxable → PreTax → Roth → HSA, ascending balance within a tier
#[derive(Debug, Clone, Copy, Default)]
pub struct TaxEfficientSequencer;

impl AccountSequencer for TaxEfficientSequencer {
    fn name(&self) -> &'static str {
        "TaxEfficient"
    }

    fn sequence<'a>(&self, context: &SpendingContext<'a>) -> Result<Vec<&'a AccountSnapshot>> {
        let mut accounts = funded(context);
        accounts.sort_by(|a, b| tax_efficient_cmp(a, b));
        Ok(accounts)
    }
}

/// RMD-subject accounts first, each group in tax-efficient order
#[derive(Debug, Clone, Copy, Default)]
pub struct RmdFirstSequencer;

impl AccountSequencer for RmdFirstSequencer {
    fn name(&self) -> &'static str {
        "RmdFirst"
    }

    fn sequence<'a>(&self, context: &SpendingContext<'a>) -> Result<Vec<&'a AccountSnapshot>> {
        let mut accounts = funded(context);
        accounts.sort_by(|a, b| {
            // true sorts after false, so compare b to a
            b.subject_to_rmd()
                .cmp(&a.subject_to_rmd())
                .then_with(|| tax_efficient_cmp(a, b))
        });
        Ok(accounts)
    }
}
