mod accounts;
mod context;
mod ids;
mod plan;
mod rmd;

pub use accounts::{AccountSnapshot, TaxTreatment};
pub use context::{
    PortfolioView, SimulationView, SpendingContext, SpendingContextBuilder, StrategyParams,
};
pub use ids::AccountId;
pub use plan::{AccountWithdrawal, PlanMetadata, SpendingPlan, SpendingPlanBuilder, keys};
pub use rmd::{RmdStartAgeRule, RmdStartAgeSchedule, RmdTable, RmdTableEntry};
