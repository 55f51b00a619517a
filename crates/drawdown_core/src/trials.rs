//! Batch planning across independent trials
//!
//! Each context belongs to a different simulated trial, so they can be
//! planned on separate threads. Results keep the input order.

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::config::SpendingEngine;
use crate::error::Result;
use crate::model::{SpendingContext, SpendingPlan};

/// Plan one period for every trial in `contexts`
pub fn plan_trials(
    engine: &SpendingEngine,
    contexts: &[SpendingContext<'_>],
) -> Vec<Result<SpendingPlan>> {
    tracing::debug!(trials = contexts.len(), "planning trials");

    #[cfg(feature = "parallel")]
    {
        contexts.par_iter().map(|ctx| engine.plan_period(ctx)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        contexts.iter().map(|ctx| engine.plan_period(ctx)).collect()
    }
}
