//! Retirement withdrawal planning
//!
//! Given one period's view of a retiree's accounts, this crate decides how much
//! to withdraw and from which accounts:
//! - Spending strategies: static rate, income gap, and guardrails (Guyton-Klinger,
//!   Vanguard dynamic, Kitces ratchet)
//! - Account sequencing: tax-efficient and RMD-first orderings
//! - Orchestration, including Required Minimum Distribution enforcement
//!
//! All amounts are [`rust_decimal::Decimal`] and rounded to cents. Nothing is
//! stored between periods: prior spending, returns and ratchet history come
//! from the caller's [`SimulationView`].
//!
//! # Example
//!
//! ```ignore
//! use drawdown_core::{SpendingConfig, SpendingContext, PortfolioView};
//!
//! let engine = SpendingConfig::default().build()?;
//! let ctx = SpendingContext::builder()
//!     .view(&view)
//!     .retirement_start(jiff::civil::date(2025, 1, 1))
//!     .date(jiff::civil::date(2025, 1, 1))
//!     .total_expenses(dec!(6000))
//!     .other_income(dec!(2500))
//!     .build()?;
//! let plan = engine.plan_period(&ctx)?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod date_math;
pub mod error;
pub mod money;
pub mod orchestrator;
pub mod rmd;
pub mod sequencer;
pub mod strategy;
pub mod trials;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{SpendingConfig, SpendingEngine, StrategyConfig};
pub use error::{Result, SpendingError};
pub use model::{
    AccountId, AccountSnapshot, AccountWithdrawal, PortfolioView, SimulationView,
    SpendingContext, SpendingPlan, StrategyParams, TaxTreatment,
};
pub use orchestrator::{DefaultOrchestrator, RmdAwareOrchestrator, SpendingOrchestrator};
pub use rmd::{RmdCalculator, UniformLifetimeCalculator};
pub use sequencer::{AccountSequencer, RmdFirstSequencer, TaxEfficientSequencer};
pub use strategy::{
    GuardrailRuleset, GuardrailsConfig, GuardrailsStrategy, IncomeGapConfig, IncomeGapStrategy,
    SpendingStrategy, StaticRateConfig, StaticRateStrategy,
};
pub use trials::plan_trials;
