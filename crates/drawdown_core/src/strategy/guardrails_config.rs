//! Guardrail policy parameters and named presets

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::check_rate;
use crate::error::{Result, SpendingError};

/// Which family of guardrail rules to apply at each review
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuardrailRuleset {
    /// Capital-preservation and prosperity rules around the initial rate
    #[default]
    GuytonKlinger,
    /// Portfolio-percentage spending with a bounded yearly change
    VanguardDynamic,
    /// Upward-only ratchet once the portfolio has grown well ahead
    KitcesRatchet,
}

impl fmt::Display for GuardrailRuleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GuardrailRuleset::GuytonKlinger => "GuytonKlinger",
            GuardrailRuleset::VanguardDynamic => "VanguardDynamic",
            GuardrailRuleset::KitcesRatchet => "KitcesRatchet",
        };
        f.write_str(name)
    }
}

fn default_initial_rate() -> Decimal {
    dec!(0.05)
}

fn default_inflation_rate() -> Decimal {
    dec!(0.025)
}

fn default_upper_ratio() -> Decimal {
    dec!(1.20)
}

fn default_lower_ratio() -> Decimal {
    dec!(0.80)
}

fn default_adjustment_pct() -> Decimal {
    dec!(0.10)
}

fn default_min_periods_between_ratchets() -> u32 {
    36
}

fn default_growth_threshold() -> Decimal {
    dec!(1.50)
}

fn default_rate_fraction() -> Decimal {
    dec!(0.6667)
}

/// Guardrail policy
///
/// Rates are annual. `absolute_floor` and `absolute_ceiling` bound annual
/// spending. For [`GuardrailRuleset::VanguardDynamic`], `increase_pct` and
/// `decrease_pct` are the largest yearly rise and cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailsConfig {
    #[serde(default = "default_initial_rate")]
    pub initial_withdrawal_rate: Decimal,
    #[serde(default = "default_inflation_rate")]
    pub inflation_rate: Decimal,
    /// Cut spending when the current rate exceeds `initial × upper`
    #[serde(default = "default_upper_ratio")]
    pub upper_guardrail_ratio: Decimal,
    /// Raise spending when the current rate falls below `initial × lower`
    #[serde(default = "default_lower_ratio")]
    pub lower_guardrail_ratio: Decimal,
    #[serde(default = "default_adjustment_pct")]
    pub increase_pct: Decimal,
    #[serde(default = "default_adjustment_pct")]
    pub decrease_pct: Decimal,
    #[serde(default)]
    pub absolute_floor: Option<Decimal>,
    #[serde(default)]
    pub absolute_ceiling: Option<Decimal>,
    #[serde(default)]
    pub ruleset: GuardrailRuleset,
    /// Cooldown between ratchets, in periods
    #[serde(default = "default_min_periods_between_ratchets")]
    pub min_periods_between_ratchets: u32,
    /// Balance / initial balance needed before a ratchet
    #[serde(default = "default_growth_threshold")]
    pub ratchet_growth_threshold: Decimal,
    /// Current rate must fall below this fraction of the initial rate to ratchet
    #[serde(default = "default_rate_fraction")]
    pub ratchet_rate_fraction: Decimal,
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self::guyton_klinger()
    }
}

impl GuardrailsConfig {
    /// Guyton-Klinger decision rules: 5% start, ±20% guardrails, 10% moves
    #[must_use]
    pub fn guyton_klinger() -> Self {
        Self {
            initial_withdrawal_rate: default_initial_rate(),
            inflation_rate: default_inflation_rate(),
            upper_guardrail_ratio: default_upper_ratio(),
            lower_guardrail_ratio: default_lower_ratio(),
            increase_pct: default_adjustment_pct(),
            decrease_pct: default_adjustment_pct(),
            absolute_floor: None,
            absolute_ceiling: None,
            ruleset: GuardrailRuleset::GuytonKlinger,
            min_periods_between_ratchets: default_min_periods_between_ratchets(),
            ratchet_growth_threshold: default_growth_threshold(),
            ratchet_rate_fraction: default_rate_fraction(),
        }
    }

    /// Vanguard dynamic spending: 4% start, at most +5% / -2.5% per year
    #[must_use]
    pub fn vanguard_dynamic() -> Self {
        Self {
            initial_withdrawal_rate: dec!(0.04),
            increase_pct: dec!(0.05),
            decrease_pct: dec!(0.025),
            ruleset: GuardrailRuleset::VanguardDynamic,
            ..Self::guyton_klinger()
        }
    }

    /// Kitces ratcheting: 4% start, +10% once the portfolio is 50% ahead,
    /// no more often than every three years
    #[must_use]
    pub fn kitces_ratchet() -> Self {
        Self {
            initial_withdrawal_rate: dec!(0.04),
            increase_pct: dec!(0.10),
            decrease_pct: Decimal::ZERO,
            ruleset: GuardrailRuleset::KitcesRatchet,
            ..Self::guyton_klinger()
        }
    }

    /// Look up a preset by name (case-insensitive, `-`/`_` ignored)
    pub fn preset(name: &str) -> Result<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "guytonklinger" => Ok(Self::guyton_klinger()),
            "vanguarddynamic" | "vanguard" => Ok(Self::vanguard_dynamic()),
            "kitcesratchet" | "kitces" => Ok(Self::kitces_ratchet()),
            _ => Err(SpendingError::validation(
                "guardrails_preset",
                format!("unknown preset '{name}'"),
            )),
        }
    }

    #[must_use]
    pub fn with_bounds(mut self, floor: Option<Decimal>, ceiling: Option<Decimal>) -> Self {
        self.absolute_floor = floor;
        self.absolute_ceiling = ceiling;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_withdrawal_rate <= Decimal::ZERO {
            return Err(SpendingError::validation(
                "initial_withdrawal_rate",
                format!("{} must be positive", self.initial_withdrawal_rate),
            ));
        }
        check_rate(
            "initial_withdrawal_rate",
            self.initial_withdrawal_rate,
            Decimal::ZERO,
            Decimal::ONE,
            false,
        )?;
        check_rate(
            "inflation_rate",
            self.inflation_rate,
            dec!(-0.5),
            Decimal::ONE,
            true,
        )?;

        if self.lower_guardrail_ratio <= Decimal::ZERO || self.upper_guardrail_ratio <= Decimal::ZERO
        {
            return Err(SpendingError::validation(
                "guardrail_ratio",
                "guardrail ratios must be positive",
            ));
        }
        if self.lower_guardrail_ratio >= self.upper_guardrail_ratio {
            return Err(SpendingError::validation(
                "guardrail_ratio",
                format!(
                    "lower ratio {} must be below upper ratio {}",
                    self.lower_guardrail_ratio, self.upper_guardrail_ratio
                ),
            ));
        }

        check_rate("increase_pct", self.increase_pct, Decimal::ZERO, Decimal::ONE, false)?;
        check_rate("decrease_pct", self.decrease_pct, Decimal::ZERO, Decimal::ONE, false)?;

        for (field, bound) in [
            ("absolute_floor", self.absolute_floor),
            ("absolute_ceiling", self.absolute_ceiling),
        ] {
            if let Some(value) = bound
                && value < Decimal::ZERO
            {
                return Err(SpendingError::validation(field, format!("{value} is negative")));
            }
        }
        if let (Some(floor), Some(ceiling)) = (self.absolute_floor, self.absolute_ceiling)
            && floor > ceiling
        {
            return Err(SpendingError::validation(
                "absolute_floor",
                format!("floor {floor} exceeds ceiling {ceiling}"),
            ));
        }

        if self.ratchet_growth_threshold < Decimal::ONE {
            return Err(SpendingError::validation(
                "ratchet_growth_threshold",
                format!("{} must be at least 1", self.ratchet_growth_threshold),
            ));
        }
        if self.ratchet_rate_fraction <= Decimal::ZERO {
            return Err(SpendingError::validation(
                "ratchet_rate_fraction",
                format!("{} must be positive", self.ratchet_rate_fraction),
            ));
        }
        check_rate(
            "ratchet_rate_fraction",
            self.ratchet_rate_fraction,
            Decimal::ZERO,
            Decimal::ONE,
            true,
        )
    }
}
