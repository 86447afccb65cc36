//! Flat annual return drag for the deterministic and untaxed Monte Carlo runs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Return base the international rates are applied to
pub const INTL_ASSUMED_TAXABLE_RETURN: f64 = 0.07;

/// How taxes are approximated when no tax pack drives the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FiscalMode {
    /// Spanish regimes, drag by investment vehicle
    #[default]
    #[serde(rename = "ES_TAXPACK")]
    EsTaxPack,
    /// User-supplied effective rates
    IntlBasic,
}

/// Spanish investment vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiscalRegime {
    /// Fondos de inversión, with tax-free switching between funds
    #[default]
    InvestmentFunds,
    /// Directly held shares and ETFs
    DirectPortfolio,
    Other,
}

impl FiscalRegime {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FiscalRegime::InvestmentFunds => "Spain - investment funds",
            FiscalRegime::DirectPortfolio => "Spain - direct portfolio",
            FiscalRegime::Other => "Other",
        }
    }

    fn base_drag(self) -> f64 {
        match self {
            FiscalRegime::InvestmentFunds => 0.003,
            FiscalRegime::DirectPortfolio => 0.012,
            FiscalRegime::Other => 0.008,
        }
    }
}

impl fmt::Display for FiscalRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Effective rates for [`FiscalMode::IntlBasic`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntlTaxRates {
    pub gains: f64,
    pub dividends: f64,
    pub interest: f64,
    /// Annual wealth tax as a fraction of the portfolio
    pub wealth: f64,
}

impl Default for IntlTaxRates {
    fn default() -> Self {
        Self {
            gains: 0.10,
            dividends: 0.15,
            interest: 0.20,
            wealth: 0.0,
        }
    }
}

/// Fund switching optimisation lowers the funds drag by this much
const FUNDS_OPTIMIZATION_REDUCTION: f64 = 0.0015;

/// Annual drag to subtract from the expected return.
#[must_use]
pub fn effective_fiscal_drag(
    regime: FiscalRegime,
    include_optimization: bool,
    mode: FiscalMode,
    intl_rates: &IntlTaxRates,
) -> f64 {
    match mode {
        FiscalMode::IntlBasic => {
            let clamp = |r: f64| r.clamp(0.0, 1.0);
            let weighted = 0.55 * clamp(intl_rates.gains)
                + 0.25 * clamp(intl_rates.dividends)
                + 0.20 * clamp(intl_rates.interest);
            (INTL_ASSUMED_TAXABLE_RETURN * weighted + clamp(intl_rates.wealth)).max(0.0)
        }
        FiscalMode::EsTaxPack => {
            let drag = regime.base_drag();
            if include_optimization && regime == FiscalRegime::InvestmentFunds {
                (drag - FUNDS_OPTIMIZATION_REDUCTION).max(0.0)
            } else {
                drag
            }
        }
    }
}
