//! Serde-loadable planner configuration
//!
//! A [`SpendingConfig`] names a strategy and whether RMDs are enforced, and
//! builds the [`SpendingEngine`] that plans each period. Omitted fields take
//! the same defaults as the corresponding `Default` impls.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{RmdStartAgeSchedule, RmdTable, SpendingContext, SpendingPlan};
use crate::orchestrator::{DefaultOrchestrator, RmdAwareOrchestrator, SpendingOrchestrator};
use crate::rmd::UniformLifetimeCalculator;
use crate::strategy::{
    GuardrailsConfig, GuardrailsStrategy, IncomeGapConfig, IncomeGapStrategy, SpendingStrategy,
    StaticRateConfig, StaticRateStrategy,
};

fn default_true() -> bool {
    true
}

/// Which spending strategy to run and its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyConfig {
    StaticRate(StaticRateConfig),
    IncomeGap(IncomeGapConfig),
    Guardrails(GuardrailsConfig),
    /// Named guardrails preset, e.g. `"guyton-klinger"` or `"kitces"`
    GuardrailsPreset(String),
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig::StaticRate(StaticRateConfig::default())
    }
}

impl StrategyConfig {
    /// Validate and construct the strategy
    pub fn build(&self) -> Result<Box<dyn SpendingStrategy>> {
        Ok(match self {
            StrategyConfig::StaticRate(config) => Box::new(StaticRateStrategy::new(*config)?),
            StrategyConfig::IncomeGap(config) => Box::new(IncomeGapStrategy::new(*config)?),
            StrategyConfig::Guardrails(config) => Box::new(GuardrailsStrategy::new(*config)?),
            StrategyConfig::GuardrailsPreset(name) => {
                Box::new(GuardrailsStrategy::new(GuardrailsConfig::preset(name)?)?)
            }
        })
    }
}

/// Top-level planner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingConfig {
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Wrap the orchestrator so minimum distributions are always taken
    #[serde(default = "default_true")]
    pub enforce_rmd: bool,

    /// Replacement life-expectancy table (IRS Uniform Lifetime if omitted)
    #[serde(default)]
    pub rmd_table: Option<RmdTable>,

    /// Replacement start-age schedule (SECURE 2.0 if omitted)
    #[serde(default)]
    pub rmd_start_ages: Option<RmdStartAgeSchedule>,
}

impl Default for SpendingConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::default(),
            enforce_rmd: true,
            rmd_table: None,
            rmd_start_ages: None,
        }
    }
}

impl SpendingConfig {
    pub fn build(&self) -> Result<SpendingEngine> {
        let strategy = self.strategy.build()?;

        let orchestrator: Box<dyn SpendingOrchestrator> = if self.enforce_rmd {
            let calculator = UniformLifetimeCalculator::new(
                self.rmd_table.clone().unwrap_or_default(),
                self.rmd_start_ages.clone().unwrap_or_default(),
            )?;
            Box::new(RmdAwareOrchestrator::new(
                DefaultOrchestrator,
                Box::new(calculator),
            ))
        } else {
            if self.rmd_table.is_some() || self.rmd_start_ages.is_some() {
                tracing::warn!("rmd tables supplied but enforce_rmd is false; ignoring them");
            }
            Box::new(DefaultOrchestrator)
        };

        tracing::debug!(
            strategy = strategy.name(),
            enforce_rmd = self.enforce_rmd,
            "built spending engine"
        );
        Ok(SpendingEngine::new(strategy, orchestrator))
    }
}

/// A strategy paired with the orchestrator that funds it
#[derive(Debug)]
pub struct SpendingEngine {
    strategy: Box<dyn SpendingStrategy>,
    orchestrator: Box<dyn SpendingOrchestrator>,
}

impl SpendingEngine {
    pub fn new(
        strategy: Box<dyn SpendingStrategy>,
        orchestrator: Box<dyn SpendingOrchestrator>,
    ) -> Self {
        Self {
            strategy,
            orchestrator,
        }
    }

    pub fn strategy(&self) -> &dyn SpendingStrategy {
        self.strategy.as_ref()
    }

    pub fn orchestrator(&self) -> &dyn SpendingOrchestrator {
        self.orchestrator.as_ref()
    }

    /// Plan one period using the orchestrator's default sequencer
    pub fn plan_period(&self, context: &SpendingContext<'_>) -> Result<SpendingPlan> {
        self.orchestrator
            .execute_with_default_sequencer(self.strategy.as_ref(), context)
    }
}
