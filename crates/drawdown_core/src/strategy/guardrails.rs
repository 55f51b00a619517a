//! Guardrail spending strategies
//!
//! All three rulesets start from the prior period's spending and only revisit
//! it on retirement anniversaries. Between reviews the prior amount carries
//! forward unchanged. The ratchet cooldown and the prior values are read from
//! the view each call; the new ratchet period is reported in plan metadata
//! for the driver to store.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::guardrails_config::{GuardrailRuleset, GuardrailsConfig};
use super::{SpendingStrategy, capped_plan, check_rate};
use crate::error::{Result, SpendingError};
use crate::model::{SpendingContext, SpendingPlan, keys};
use crate::money::{annualize, per_period, periods_per_year, round_currency, round_rate};

/// Guardrail-driven spending; see [`GuardrailRuleset`] for the variants
#[derive(Debug, Clone)]
pub struct GuardrailsStrategy {
    config: GuardrailsConfig,
}

/// Outcome of one review
struct Decision {
    target: Decimal,
    current_rate: Decimal,
    tags: Vec<(&'static str, String)>,
}

impl Decision {
    fn tag(&mut self, key: &'static str, value: impl ToString) {
        self.tags.push((key, value.to_string()));
    }
}

/// Rates resolved for this period (config values unless overridden)
#[derive(Clone, Copy)]
struct Rates {
    initial: Decimal,
    inflation: Decimal,
}

impl GuardrailsStrategy {
    pub fn new(config: GuardrailsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GuardrailsConfig {
        &self.config
    }

    fn rates(&self, context: &SpendingContext<'_>) -> Result<Rates> {
        let params = context.strategy_params();
        let initial = params
            .and_then(|p| p.withdrawal_rate)
            .unwrap_or(self.config.initial_withdrawal_rate);
        let inflation = params
            .and_then(|p| p.inflation_rate)
            .unwrap_or(self.config.inflation_rate);

        if initial <= Decimal::ZERO {
            return Err(SpendingError::validation(
                "withdrawal_rate",
                format!("{initial} must be positive"),
            ));
        }
        check_rate("withdrawal_rate", initial, Decimal::ZERO, Decimal::ONE, false)?;
        check_rate(
            "inflation_rate",
            inflation,
            dec!(-0.5),
            Decimal::ONE,
            true,
        )?;
        Ok(Rates { initial, inflation })
    }

    /// Annual floor/ceiling expressed per period
    fn clamp_to_bounds(&self, amount: Decimal, decision: &mut Decision) -> Decimal {
        if let Some(floor) = self.config.absolute_floor.map(per_period)
            && amount < floor
        {
            decision.tag(keys::CLAMPED, "floor");
            return floor;
        }
        if let Some(ceiling) = self.config.absolute_ceiling.map(per_period)
            && amount > ceiling
        {
            decision.tag(keys::CLAMPED, "ceiling");
            return ceiling;
        }
        amount
    }

    fn guyton_klinger(
        &self,
        context: &SpendingContext<'_>,
        prior: Decimal,
        balance: Decimal,
        rates: Rates,
    ) -> Result<Decision> {
        let prior_return = context
            .view()
            .prior_period_return()
            .ok_or(SpendingError::MissingField("prior_period_return"))?;

        let inflated = prior * (Decimal::ONE + rates.inflation);
        let inflated_rate = annualize(inflated) / balance;
        // Rule 2: no inflation raise after a losing year if it would lift the rate past the start
        let skip_inflation = prior_return < Decimal::ZERO && inflated_rate > rates.initial;
        let base = if skip_inflation { prior } else { inflated };

        let current_rate = round_rate(annualize(base) / balance);
        let upper = rates.initial * self.config.upper_guardrail_ratio;
        let lower = rates.initial * self.config.lower_guardrail_ratio;

        let mut decision = Decision {
            target: base,
            current_rate,
            tags: Vec::new(),
        };
        if skip_inflation {
            decision.tag(keys::INFLATION_SKIPPED, true);
        }

        let adjusted = if current_rate > upper {
            decision.tag(keys::ADJUSTMENT, "decrease");
            base * (Decimal::ONE - self.config.decrease_pct)
        } else if current_rate < lower {
            decision.tag(keys::ADJUSTMENT, "increase");
            base * (Decimal::ONE + self.config.increase_pct)
        } else {
            base
        };

        decision.target = round_currency(self.clamp_to_bounds(adjusted, &mut decision));
        Ok(decision)
    }

    fn kitces_ratchet(
        &self,
        context: &SpendingContext<'_>,
        prior: Decimal,
        balance: Decimal,
        rates: Rates,
    ) -> Result<Decision> {
        let initial_balance = context
            .view()
            .initial_portfolio_balance()
            .ok_or(SpendingError::MissingField("initial_portfolio_balance"))?;
        if initial_balance <= Decimal::ZERO {
            return Err(SpendingError::validation(
                "initial_portfolio_balance",
                format!("{initial_balance} must be positive"),
            ));
        }

        // Spending holds flat until a ratchet fires
        let base = prior;
        let current_rate = round_rate(annualize(base) / balance);
        let growth = round_rate(balance / initial_balance);

        let period = context.period_index();
        let cooled_down = match context.view().last_ratchet_period() {
            None => true,
            Some(last) => period.saturating_sub(last) >= self.config.min_periods_between_ratchets,
        };
        let conditions_met = growth > self.config.ratchet_growth_threshold
            && current_rate < rates.initial * self.config.ratchet_rate_fraction;

        let mut decision = Decision {
            target: base,
            current_rate,
            tags: vec![(keys::PORTFOLIO_GROWTH, growth.to_string())],
        };

        if conditions_met && cooled_down {
            let mut raised = round_currency(base * (Decimal::ONE + self.config.increase_pct));
            if let Some(ceiling) = self.config.absolute_ceiling.map(per_period)
                && raised > ceiling
            {
                raised = ceiling.max(base);
                decision.tag(keys::CLAMPED, "ceiling");
            }
            if raised > base {
                decision.tag(keys::ADJUSTMENT, "increase");
                decision.tag(keys::RATCHET_PERIOD, period);
                decision.target = raised;
            }
        } else if conditions_met {
            decision.tag(keys::RATCHET_BLOCKED, "cooldown");
        }

        Ok(decision)
    }

    fn vanguard_dynamic(&self, prior: Decimal, balance: Decimal, rates: Rates) -> Decision {
        let base = prior * (Decimal::ONE + rates.inflation);
        let candidate = balance * rates.initial / periods_per_year();
        let upper = base * (Decimal::ONE + self.config.increase_pct);
        let lower = base * (Decimal::ONE - self.config.decrease_pct);

        let mut decision = Decision {
            target: base,
            current_rate: round_rate(annualize(base) / balance),
            tags: Vec::new(),
        };

        let bounded = if candidate > upper {
            decision.tag(keys::BOUNDED, "ceiling");
            upper
        } else if candidate < lower {
            decision.tag(keys::BOUNDED, "floor");
            lower
        } else {
            candidate
        };

        let bounded = round_currency(bounded);
        let base = round_currency(base);
        if bounded > base {
            decision.tag(keys::ADJUSTMENT, "increase");
        } else if bounded < base {
            decision.tag(keys::ADJUSTMENT, "decrease");
        }

        decision.target = round_currency(self.clamp_to_bounds(bounded, &mut decision));
        decision
    }
}

impl SpendingStrategy for GuardrailsStrategy {
    fn name(&self) -> &'static str {
        match self.config.ruleset {
            GuardrailRuleset::GuytonKlinger => "Guardrails:GuytonKlinger",
            GuardrailRuleset::VanguardDynamic => "Guardrails:VanguardDynamic",
            GuardrailRuleset::KitcesRatchet => "Guardrails:KitcesRatchet",
        }
    }

    fn calculate_withdrawal(&self, context: &SpendingContext<'_>) -> Result<SpendingPlan> {
        let balance = context.total_balance();
        if balance <= Decimal::ZERO {
            return Err(SpendingError::Calculation(
                "guardrails need a positive portfolio balance to compute a withdrawal rate".into(),
            ));
        }
        let rates = self.rates(context)?;

        if context.period_index() == 0 {
            let target = per_period(balance * rates.initial);
            tracing::debug!(
                strategy = self.name(),
                target = %target,
                "guardrails first period"
            );
            return capped_plan(self.name(), target, context)
                .meta(keys::FIRST_YEAR, true)
                .meta(keys::RULESET, self.config.ruleset)
                .meta(keys::INITIAL_RATE, rates.initial)
                .meta(keys::CURRENT_RATE, rates.initial)
                .build();
        }
        let prior = context
            .view()
            .prior_period_spending()
            .ok_or(SpendingError::MissingField("prior_period_spending"))?;
        if prior < Decimal::ZERO {
            return Err(SpendingError::validation(
                "prior_period_spending",
                format!("{prior} is negative"),
            ));
        }

        let decision = if !context.is_review_period() {
            Decision {
                target: prior,
                current_rate: round_rate(annualize(prior) / balance),
                tags: vec![(keys::REVIEW, false.to_string())],
            }
        } else {
            match self.config.ruleset {
                GuardrailRuleset::GuytonKlinger => {
                    self.guyton_klinger(context, prior, balance, rates)?
                }
                GuardrailRuleset::KitcesRatchet => {
                    self.kitces_ratchet(context, prior, balance, rates)?
                }
                GuardrailRuleset::VanguardDynamic => self.vanguard_dynamic(prior, balance, rates),
            }
        };

        if let Some((_, adjustment)) = decision.tags.iter().find(|(k, _)| *k == keys::ADJUSTMENT) {
            tracing::debug!(
                strategy = self.name(),
                period = context.period_index(),
                adjustment = adjustment.as_str(),
                current_rate = %decision.current_rate,
                target = %decision.target,
                "guardrail adjustment"
            );
        }

        let mut builder = capped_plan(self.name(), decision.target, context)
            .meta(keys::RULESET, self.config.ruleset)
            .meta(keys::INITIAL_RATE, rates.initial)
            .meta(keys::CURRENT_RATE, decision.current_rate);
        for (key, value) in decision.tags {
            builder = builder.meta(key, value);
        }
        builder.build()
    }

    fn is_dynamic(&self) -> bool {
        true
    }

    fn requires_prior_year_state(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_math::add_months;
    use crate::model::{AccountId, AccountSnapshot, PortfolioView, TaxTreatment};
    use jiff::civil::{Date, date};

    const START: Date = date(2020, 1, 1);

    fn view(balance: Decimal) -> PortfolioView {
        PortfolioView::new(
            vec![
                AccountSnapshot::new(AccountId(1), "Brokerage", TaxTreatment::Taxable, balance)
                    .unwrap(),
            ],
            67,
            1958,
        )
    }

    fn plan_at(strategy: &GuardrailsStrategy, view: &PortfolioView, months: i32) -> Result<SpendingPlan> {
        let ctx = SpendingContext::builder()
            .view(view)
            .retirement_start(START)
            .date(add_months(START, months))
            .build()?;
        strategy.calculate_withdrawal(&ctx)
    }

    fn gk() -> GuardrailsStrategy {
        GuardrailsStrategy::new(GuardrailsConfig::guyton_klinger()).unwrap()
    }

    #[test]
    fn test_first_period() {
        let plan = plan_at(&gk(), &view(dec!(1200000)), 0).unwrap();
        // 1.2M * 5% / 12
        assert_eq!(plan.target_withdrawal(), dec!(5000));
        assert_eq!(plan.metadata_value(keys::FIRST_YEAR), Some("true"));
        assert_eq!(plan.metadata_value(keys::ADJUSTMENT), None);
        assert_eq!(plan.strategy_used(), "Guardrails:GuytonKlinger");
    }

    #[test]
    fn test_gk_decrease_on_losing_year() {
        // 5,000/month = 60,000/yr on 800k = 7.5% > 6% upper guardrail
        let view = view(dec!(800000))
            .with_prior_spending(dec!(5000))
            .with_prior_return(dec!(-0.15));
        let plan = plan_at(&gk(), &view, 12).unwrap();
        assert_eq!(plan.metadata_value(keys::ADJUSTMENT), Some("decrease"));
        assert_eq!(plan.metadata_value(keys::INFLATION_SKIPPED), Some("true"));
        assert_eq!(plan.target_withdrawal(), dec!(4500));
    }

    #[test]
    fn test_gk_decrease_keeps_inflation_after_gain() {
        let view = view(dec!(800000))
            .with_prior_spending(dec!(5000))
            .with_prior_return(dec!(0.02));
        let plan = plan_at(&gk(), &view, 12).unwrap();
        assert_eq!(plan.metadata_value(keys::ADJUSTMENT), Some("decrease"));
        assert_eq!(plan.metadata_value(keys::INFLATION_SKIPPED), None);
        // 5,000 * 1.025 * 0.9
        assert_eq!(plan.target_withdrawal(), dec!(4612.5));
    }

    #[test]
    fn test_gk_increase_when_rate_low() {
        // 5,000 * 1.025 * 12 / 2M = 3.075% < 4% lower guardrail
        let view = view(dec!(2000000))
            .with_prior_spending(dec!(5000))
            .with_prior_return(dec!(0.20));
        let plan = plan_at(&gk(), &view, 24).unwrap();
        assert_eq!(plan.metadata_value(keys::ADJUSTMENT), Some("increase"));
        // 5,125 * 1.1
        assert_eq!(plan.target_withdrawal(), dec!(5637.5));
    }

    #[test]
    fn test_gk_inside_guardrails_only_inflates() {
        // 5,125 * 12 / 1.2M = 5.125%, between 4% and 6%
        let view = view(dec!(1200000))
            .with_prior_spending(dec!(5000))
            .with_prior_return(dec!(0.05));
        let plan = plan_at(&gk(), &view, 12).unwrap();
        assert_eq!(plan.metadata_value(keys::ADJUSTMENT), None);
        assert_eq!(plan.target_withdrawal(), dec!(5125));
    }

    #[test]
    fn test_gk_losing_year_keeps_inflation_when_rate_stays_low() {
        // 5,125 * 12 / 1.5M = 4.1%, not above the 5% starting rate
        let view = view(dec!(1500000))
            .with_prior_spending(dec!(5000))
            .with_prior_return(dec!(-0.05));
        let plan = plan_at(&gk(), &view, 12).unwrap();
        assert_eq!(plan.target_withdrawal(), dec!(5125));
        assert_eq!(plan.metadata_value(keys::INFLATION_SKIPPED), None);
        assert_eq!(plan.metadata_value(keys::ADJUSTMENT), None);
    }

    #[test]
    fn test_missing_prior_spending_after_first_period() {
        let view = view(dec!(1000000)).with_prior_return(dec!(0.03));
        assert_eq!(
            plan_at(&gk(), &view, 60).unwrap_err(),
            SpendingError::MissingField("prior_period_spending")
        );
        assert_eq!(
            plan_at(&gk(), &view, 7).unwrap_err(),
            SpendingError::MissingField("prior_period_spending")
        );
    }

    #[test]
    fn test_gk_needs_prior_return_at_review() {
        let view = view(dec!(1200000)).with_prior_spending(dec!(5000));
        assert_eq!(
            plan_at(&gk(), &view, 12).unwrap_err(),
            SpendingError::MissingField("prior_period_return")
        );
    }

    #[test]
    fn test_gk_absolute_bounds() {
        let strategy = GuardrailsStrategy::new(
            GuardrailsConfig::guyton_klinger().with_bounds(Some(dec!(57000)), Some(dec!(120000))),
        )
        .unwrap();
        let view = view(dec!(800000))
            .with_prior_spending(dec!(5000))
            .with_prior_return(dec!(-0.15));
        let plan = plan_at(&strategy, &view, 12).unwrap();
        // decrease to 4,500 is lifted to the 4,750/month floor
        assert_eq!(plan.target_withdrawal(), dec!(4750));
        assert_eq!(plan.metadata_value(keys::CLAMPED), Some("floor"));
        assert_eq!(plan.metadata_value(keys::ADJUSTMENT), Some("decrease"));
    }

    #[test]
    fn test_between_reviews_carries_prior() {
        let view = view(dec!(400000))
            .with_prior_spending(dec!(5000))
            .with_prior_return(dec!(-0.30));
        let plan = plan_at(&gk(), &view, 7).unwrap();
        assert_eq!(plan.target_withdrawal(), dec!(5000));
        assert_eq!(plan.metadata_value(keys::REVIEW), Some("false"));
        assert_eq!(plan.metadata_value(keys::ADJUSTMENT), None);
    }

    fn kitces() -> GuardrailsStrategy {
        GuardrailsStrategy::new(GuardrailsConfig::kitces_ratchet()).unwrap()
    }

    fn grown_view() -> PortfolioView {
        // Portfolio doubled; 3,333/month is 2% of 2M, under 2/3 of 4%
        view(dec!(2000000))
            .with_initial_balance(dec!(1000000))
            .with_prior_spending(dec!(3333.33))
    }

    #[test]
    fn test_kitces_ratchets_when_ahead() {
        let plan = plan_at(&kitces(), &grown_view(), 48).unwrap();
        assert_eq!(plan.metadata_value(keys::ADJUSTMENT), Some("increase"));
        assert_eq!(plan.metadata_value(keys::RATCHET_PERIOD), Some("48"));
        // 3,333.33 * 1.1
        assert_eq!(plan.target_withdrawal(), dec!(3666.66));
    }

    #[test]
    fn test_kitces_cooldown_blocks_ratchet() {
        let view = grown_view().with_last_ratchet_period(24);
        let plan = plan_at(&kitces(), &view, 48).unwrap();
        assert_eq!(plan.metadata_value(keys::ADJUSTMENT), None);
        assert_eq!(plan.metadata_value(keys::RATCHET_BLOCKED), Some("cooldown"));
        assert_eq!(plan.target_withdrawal(), dec!(3333.33));

        let view = grown_view().with_last_ratchet_period(12);
        let plan = plan_at(&kitces(), &view, 48).unwrap();
        assert_eq!(plan.metadata_value(keys::ADJUSTMENT), Some("increase"));
    }

    #[test]
    fn test_kitces_holds_spending_without_ratchet() {
        // No growth since retirement, so nothing to ratchet and no inflation raise
        let view = view(dec!(1000000))
            .with_initial_balance(dec!(1000000))
            .with_prior_spending(dec!(3333.33));
        let plan = plan_at(&kitces(), &view, 12).unwrap();
        assert_eq!(plan.target_withdrawal(), dec!(3333.33));
        assert_eq!(plan.metadata_value(keys::ADJUSTMENT), None);
        assert_eq!(plan.metadata_value(keys::RATCHET_BLOCKED), None);
    }

    #[test]
    fn test_kitces_ratchet_capped_at_ceiling() {
        let strategy = GuardrailsStrategy::new(
            GuardrailsConfig::kitces_ratchet().with_bounds(None, Some(dec!(42000))),
        )
        .unwrap();
        let plan = plan_at(&strategy, &grown_view(), 48).unwrap();
        assert_eq!(plan.target_withdrawal(), dec!(3500));
        assert_eq!(plan.metadata_value(keys::CLAMPED), Some("ceiling"));
        assert_eq!(plan.metadata_value(keys::RATCHET_PERIOD), Some("48"));
    }

    #[test]
    fn test_kitces_never_decreases() {
        // Portfolio fell by half and the rate is far above the start
        let view = view(dec!(500000))
            .with_initial_balance(dec!(1000000))
            .with_prior_spending(dec!(3333.33));
        let plan = plan_at(&kitces(), &view, 36).unwrap();
        assert_eq!(plan.metadata_value(keys::ADJUSTMENT), None);
        assert!(plan.target_withdrawal() >= dec!(3333.33));
    }

    #[test]
    fn test_kitces_needs_initial_balance() {
        let view = view(dec!(2000000)).with_prior_spending(dec!(3333.33));
        assert_eq!(
            plan_at(&kitces(), &view, 12).unwrap_err(),
            SpendingError::MissingField("initial_portfolio_balance")
        );
    }

    fn vanguard() -> GuardrailsStrategy {
        GuardrailsStrategy::new(GuardrailsConfig::vanguard_dynamic()).unwrap()
    }

    #[test]
    fn test_vanguard_ceiling_bounds_raise() {
        // Candidate 2M * 4% / 12 = 6,666.67 far above 4,000 * 1.025 * 1.05
        let view = view(dec!(2000000)).with_prior_spending(dec!(4000));
        let plan = plan_at(&vanguard(), &view, 12).unwrap();
        assert_eq!(plan.metadata_value(keys::BOUNDED), Some("ceiling"));
        assert_eq!(plan.metadata_value(keys::ADJUSTMENT), Some("increase"));
        assert_eq!(plan.target_withdrawal(), dec!(4305));
    }

    #[test]
    fn test_vanguard_floor_bounds_cut() {
        // Candidate 600k * 4% / 12 = 2,000, well under 4,100 * 0.975
        let view = view(dec!(600000)).with_prior_spending(dec!(4000));
        let plan = plan_at(&vanguard(), &view, 12).unwrap();
        assert_eq!(plan.metadata_value(keys::BOUNDED), Some("floor"));
        assert_eq!(plan.metadata_value(keys::ADJUSTMENT), Some("decrease"));
        assert_eq!(plan.target_withdrawal(), dec!(3997.5));
    }

    #[test]
    fn test_vanguard_within_band_follows_portfolio() {
        // Candidate 1.26M * 4% / 12 = 4,200, inside [3,997.50, 4,305]
        let view = view(dec!(1260000)).with_prior_spending(dec!(4000));
        let plan = plan_at(&vanguard(), &view, 12).unwrap();
        assert_eq!(plan.metadata_value(keys::BOUNDED), None);
        assert_eq!(plan.target_withdrawal(), dec!(4200));
    }

    #[test]
    fn test_empty_portfolio_is_calculation_error() {
        let view = view(Decimal::ZERO).with_prior_spending(dec!(1000));
        assert!(matches!(
            plan_at(&gk(), &view, 12),
            Err(SpendingError::Calculation(_))
        ));
    }

    #[test]
    fn test_flags() {
        let strategy = gk();
        assert!(strategy.is_dynamic());
        assert!(strategy.requires_prior_year_state());
        assert!(vanguard().is_dynamic());
        assert!(vanguard().requires_prior_year_state());
    }
}
