//! Deterministic single-path projections
//!
//! Closed-form FIRE targets, constant-return accumulation and drawdown
//! projections, and the small ratios shown next to them.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError, require_positive};

/// Portfolio needed to fund `annual_spending` at `swr`.
pub fn target_fire(annual_spending: f64, swr: f64) -> Result<f64> {
    require_positive("swr", swr)?;
    Ok(annual_spending / swr)
}

/// Future value of savings plus a fixed end-of-year contribution.
#[must_use]
pub fn future_value(current: f64, annual_contribution: f64, years: u32, rate: f64) -> f64 {
    if rate == 0.0 {
        return current + annual_contribution * f64::from(years);
    }
    let growth = (1.0 + rate).powi(years as i32);
    current * growth + annual_contribution * (growth - 1.0) / rate
}

/// Whether the savings path reaches `target_portfolio` within `years_to_target`.
#[must_use]
pub fn coast_fire_condition(
    current_savings: f64,
    annual_contribution: f64,
    years_to_target: u32,
    expected_return: f64,
    target_portfolio: f64,
) -> bool {
    future_value(
        current_savings,
        annual_contribution,
        years_to_target,
        expected_return,
    ) >= target_portfolio
}

// ============================================================================
// Accumulation projection
// ============================================================================

/// Equity / bond / cash split used to decompose the expected return
pub const EQUITY_SHARE: f64 = 0.60;
pub const BOND_SHARE: f64 = 0.30;
pub const CASH_SHARE: f64 = 0.10;
/// Part of the equity return paid out as dividends
pub const DIVIDEND_FRACTION: f64 = 0.15;

/// Annual tax and fee rates applied by [`project_portfolio`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionRates {
    pub tax_rate_on_gains: f64,
    pub tax_rate_on_dividends: f64,
    pub tax_rate_on_interest: f64,
    pub fund_fees: f64,
    /// Added to the dividend rate, capped at 100% combined
    pub withholding_tax: f64,
    pub social_security_contributions: f64,
}

impl Default for ProjectionRates {
    fn default() -> Self {
        Self {
            tax_rate_on_gains: 0.15,
            tax_rate_on_dividends: 0.30,
            tax_rate_on_interest: 0.45,
            fund_fees: 0.001,
            withholding_tax: 0.15,
            social_security_contributions: 0.0,
        }
    }
}

/// Split of the portfolio across account types.
///
/// Values may be proportions or absolute amounts; they are normalised.
/// `other` covers accounts of unknown tax treatment and is taxed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountBreakdown {
    pub taxable: f64,
    pub tax_deferred: f64,
    pub tax_free: f64,
    pub other: f64,
}

impl AccountBreakdown {
    /// Share of annual income exposed to tax, in `[0, 1]`
    #[must_use]
    pub fn taxable_share(&self) -> f64 {
        let parts = [self.taxable, self.tax_deferred, self.tax_free, self.other].map(|v| v.max(0.0));
        let total: f64 = parts.iter().sum();
        if total <= 0.0 {
            return 1.0;
        }
        let [taxable, deferred, free, _] = parts.map(|v| v / total);
        let covered = taxable + deferred + free;
        if covered <= 0.0 {
            return 1.0;
        }
        (taxable + (1.0 - covered).max(0.0)).min(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionYear {
    pub year: u32,
    pub nominal_portfolio: f64,
    pub real_portfolio: f64,
    pub tax_paid: f64,
    pub fee_paid: f64,
    pub taxable_share_applied: f64,
}

/// Year-by-year accumulation with rate-based tax and fee drag.
///
/// The expected return is decomposed into dividends, interest and capital
/// gains using a fixed allocation; only the taxable share of the portfolio
/// pays tax. Contributions are added after growth.
pub fn project_portfolio(
    current_savings: f64,
    annual_contribution: f64,
    years: u32,
    expected_return: f64,
    inflation_rate: f64,
    rates: &ProjectionRates,
    breakdown: Option<&AccountBreakdown>,
) -> Result<Vec<ProjectionYear>> {
    if years == 0 {
        return Err(SimulationError::InvalidParameter {
            name: "years",
            value: 0.0,
            reason: "horizon must be at least one year",
        }
        .into());
    }

    let taxable_share = breakdown.map_or(1.0, AccountBreakdown::taxable_share);
    let dividend_rate = (rates.tax_rate_on_dividends + rates.withholding_tax).clamp(0.0, 1.0);
    let mut portfolio = current_savings;
    let mut rows = Vec::with_capacity(years as usize);

    for year in 1..=years {
        let equity = portfolio * EQUITY_SHARE * expected_return;
        let bonds = portfolio * BOND_SHARE * expected_return;
        let cash = portfolio * CASH_SHARE * expected_return;
        let gross = equity + bonds + cash;
        let fee_paid = portfolio * rates.fund_fees;

        let dividends = equity * DIVIDEND_FRACTION;
        let gains = gross - dividends;

        let tax_paid = taxable_share
            * (dividends * dividend_rate
                + bonds * rates.tax_rate_on_interest.max(0.0)
                + gains * rates.tax_rate_on_gains.max(0.0)
                + gross * rates.social_security_contributions.max(0.0));

        portfolio += gross - fee_paid - tax_paid + annual_contribution;

        rows.push(ProjectionYear {
            year,
            nominal_portfolio: portfolio,
            real_portfolio: portfolio / (1.0 + inflation_rate).powi(year as i32),
            tax_paid,
            fee_paid,
            taxable_share_applied: taxable_share,
        });
    }
    Ok(rows)
}

// ============================================================================
// Retirement projection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetirementYear {
    pub year: u32,
    pub portfolio_value: f64,
    pub annual_withdrawal: f64,
    pub depleted: bool,
    /// Years of the current withdrawal left in the portfolio
    pub years_remaining: f64,
}

/// Constant-return drawdown of an inflation-indexed spending.
#[must_use]
pub fn project_retirement(
    portfolio_at_retirement: f64,
    annual_spending: f64,
    years_in_retirement: u32,
    expected_return: f64,
    inflation_rate: f64,
    tax_rate_on_gains: f64,
) -> Vec<RetirementYear> {
    let mut portfolio = portfolio_at_retirement;
    let mut inflation_factor = 1.0;
    let mut rows = Vec::with_capacity(years_in_retirement as usize);

    for year in 1..=years_in_retirement {
        let withdrawal = annual_spending * inflation_factor;
        let growth = portfolio * expected_return;
        portfolio += growth * (1.0 - tax_rate_on_gains) - withdrawal;
        let depleted = portfolio <= 0.0;
        portfolio = portfolio.max(0.0);
        inflation_factor *= 1.0 + inflation_rate;

        rows.push(RetirementYear {
            year,
            portfolio_value: portfolio,
            annual_withdrawal: withdrawal,
            depleted,
            years_remaining: if withdrawal > 0.0 {
                portfolio / withdrawal
            } else {
                f64::INFINITY
            },
        });
    }
    rows
}

// ============================================================================
// Ratios and scenarios
// ============================================================================

/// Portfolio target when withdrawals pay a flat gains tax.
///
/// Infinite when the after-tax withdrawal rate is not positive.
#[must_use]
pub fn calculate_gross_target(annual_spending: f64, swr: f64, tax_rate_on_gains: f64) -> f64 {
    let effective_swr = swr * (1.0 - tax_rate_on_gains);
    if effective_swr <= 0.0 {
        return f64::INFINITY;
    }
    annual_spending / effective_swr
}

/// Fraction of gross income that is saved
#[must_use]
pub fn calculate_savings_rate(gross_income: f64, annual_spending: f64) -> f64 {
    if gross_income <= 0.0 {
        return 0.0;
    }
    (gross_income - annual_spending) / gross_income
}

/// Rough years gained per extra percentage point of savings rate.
#[must_use]
pub fn calculate_years_saved_per_percent(
    current_savings_rate: f64,
    annual_spending: f64,
    expected_return: f64,
    gross_income: f64,
) -> f64 {
    if current_savings_rate >= 0.99 || expected_return <= 0.0 {
        return 0.0;
    }
    let additional_annual = gross_income * 0.01;
    additional_annual / (annual_spending * expected_return).max(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Pessimistic,
    Base,
    Optimistic,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 3] = [
        ScenarioKind::Pessimistic,
        ScenarioKind::Base,
        ScenarioKind::Optimistic,
    ];

    /// Multiplier applied to the base return
    #[must_use]
    pub fn return_multiplier(self) -> f64 {
        match self {
            ScenarioKind::Pessimistic => 0.70,
            ScenarioKind::Base => 1.0,
            ScenarioKind::Optimistic => 1.30,
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            ScenarioKind::Pessimistic => "Market downturn (-30%)",
            ScenarioKind::Base => "Normal market conditions",
            ScenarioKind::Optimistic => "Strong markets (+30%)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketScenario {
    pub kind: ScenarioKind,
    pub expected_return: f64,
    pub final_portfolio: f64,
    /// First year the target is met, or the full horizon if never
    pub years_to_target: u32,
    pub target_reached: bool,
}

/// Accumulation outcome under pessimistic, base and optimistic returns.
#[must_use]
pub fn calculate_market_scenarios(
    current_savings: f64,
    annual_contribution: f64,
    years_to_target: u32,
    target_portfolio: f64,
    base_return: f64,
) -> Vec<MarketScenario> {
    ScenarioKind::ALL
        .iter()
        .map(|&kind| {
            let rate = base_return * kind.return_multiplier();
            let final_portfolio =
                future_value(current_savings, annual_contribution, years_to_target, rate);
            let years_needed = (1..=years_to_target).find(|&y| {
                future_value(current_savings, annual_contribution, y, rate) >= target_portfolio
            });
            MarketScenario {
                kind,
                expected_return: rate,
                final_portfolio,
                years_to_target: years_needed.unwrap_or(years_to_target),
                target_reached: final_portfolio >= target_portfolio,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetWorth {
    pub liquid_portfolio: f64,
    pub real_estate_value: f64,
    pub real_estate_equity: f64,
    pub total_liabilities: f64,
    pub net_worth: f64,
    pub real_estate_share_pct: f64,
}

#[must_use]
pub fn calculate_net_worth(
    liquid_portfolio: f64,
    real_estate_value: f64,
    real_estate_mortgage: f64,
    other_liabilities: f64,
) -> NetWorth {
    let real_estate_equity = real_estate_value - real_estate_mortgage;
    let net_worth = liquid_portfolio + real_estate_equity - other_liabilities;
    NetWorth {
        liquid_portfolio,
        real_estate_value,
        real_estate_equity,
        total_liabilities: real_estate_mortgage + other_liabilities,
        net_worth,
        real_estate_share_pct: real_estate_equity / net_worth.max(1.0) * 100.0,
    }
}

/// First year a real path reaches `fire_target`
#[must_use]
pub fn find_years_to_fire(real_path: &[f64], fire_target: f64) -> Option<usize> {
    real_path.iter().position(|v| *v >= fire_target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_fire() {
        assert!((target_fire(30_000.0, 0.04).unwrap() - 750_000.0).abs() < 1e-6);
        assert!(target_fire(30_000.0, 0.0).is_err());
    }

    #[test]
    fn test_coast_fire() {
        // 100,000 doubling over ~10 years at 7.2%
        assert!(coast_fire_condition(100_000.0, 0.0, 10, 0.072, 200_000.0));
        assert!(!coast_fire_condition(100_000.0, 0.0, 9, 0.072, 200_000.0));
        assert!(coast_fire_condition(0.0, 10_000.0, 10, 0.0, 100_000.0));
    }

    #[test]
    fn test_project_portfolio_without_drag() {
        let rates = ProjectionRates {
            tax_rate_on_gains: 0.0,
            tax_rate_on_dividends: 0.0,
            tax_rate_on_interest: 0.0,
            fund_fees: 0.0,
            withholding_tax: 0.0,
            social_security_contributions: 0.0,
        };
        let rows = project_portfolio(100_000.0, 0.0, 2, 0.10, 0.0, &rates, None).unwrap();
        assert!((rows[1].nominal_portfolio - 121_000.0).abs() < 1e-6);
        assert_eq!(rows[1].tax_paid, 0.0);
    }

    #[test]
    fn test_project_portfolio_taxes() {
        let rates = ProjectionRates::default();
        let rows = project_portfolio(100_000.0, 0.0, 1, 0.10, 0.0, &rates, None).unwrap();
        // equity 6,000 (900 dividends), bonds 3,000, gains 9,100
        let expected_tax = 900.0 * 0.45 + 3_000.0 * 0.45 + 9_100.0 * 0.15;
        assert!((rows[0].tax_paid - expected_tax).abs() < 1e-6);
        assert!((rows[0].fee_paid - 100.0).abs() < 1e-9);
        assert!(
            (rows[0].nominal_portfolio - (110_000.0 - 100.0 - expected_tax)).abs() < 1e-6
        );
    }

    #[test]
    fn test_tax_sheltered_accounts_pay_less() {
        let rates = ProjectionRates::default();
        let sheltered = AccountBreakdown {
            taxable: 30_000.0,
            tax_deferred: 50_000.0,
            tax_free: 20_000.0,
            other: 0.0,
        };
        assert!((sheltered.taxable_share() - 0.3).abs() < 1e-12);
        let all = project_portfolio(100_000.0, 0.0, 5, 0.07, 0.02, &rates, None).unwrap();
        let some =
            project_portfolio(100_000.0, 0.0, 5, 0.07, 0.02, &rates, Some(&sheltered)).unwrap();
        assert!(some[4].nominal_portfolio > all[4].nominal_portfolio);
        assert!(project_portfolio(1.0, 0.0, 0, 0.07, 0.02, &rates, None).is_err());
    }

    #[test]
    fn test_unknown_accounts_are_taxed() {
        let breakdown = AccountBreakdown {
            taxable: 0.0,
            tax_deferred: 0.5,
            tax_free: 0.0,
            other: 0.5,
        };
        assert!((breakdown.taxable_share() - 0.5).abs() < 1e-12);
        assert_eq!(AccountBreakdown::default().taxable_share(), 1.0);
    }

    #[test]
    fn test_project_retirement_depletes() {
        let rows = project_retirement(50_000.0, 20_000.0, 5, 0.0, 0.0, 0.0);
        assert!(!rows[0].depleted);
        assert!((rows[0].years_remaining - 1.5).abs() < 1e-12);
        assert!(rows[2].depleted);
        assert_eq!(rows[4].portfolio_value, 0.0);
    }

    #[test]
    fn test_gross_target() {
        assert!((calculate_gross_target(34_000.0, 0.04, 0.15) - 1_000_000.0).abs() < 1e-6);
        assert!(calculate_gross_target(34_000.0, 0.04, 1.0).is_infinite());
    }

    #[test]
    fn test_savings_rate() {
        assert!((calculate_savings_rate(50_000.0, 30_000.0) - 0.4).abs() < 1e-12);
        assert_eq!(calculate_savings_rate(0.0, 30_000.0), 0.0);
        assert!(calculate_years_saved_per_percent(0.4, 30_000.0, 0.05, 50_000.0) > 0.0);
        assert_eq!(calculate_years_saved_per_percent(0.995, 30_000.0, 0.05, 50_000.0), 0.0);
    }

    #[test]
    fn test_market_scenarios_are_ordered() {
        let scenarios = calculate_market_scenarios(100_000.0, 20_000.0, 25, 1_000_000.0, 0.065);
        assert_eq!(scenarios.len(), 3);
        assert_eq!(scenarios[0].kind, ScenarioKind::Pessimistic);
        assert!(scenarios[0].final_portfolio < scenarios[1].final_portfolio);
        assert!(scenarios[1].final_portfolio < scenarios[2].final_portfolio);
        assert!(scenarios[0].years_to_target >= scenarios[2].years_to_target);
        assert!(scenarios[2].target_reached);
    }

    #[test]
    fn test_net_worth() {
        let nw = calculate_net_worth(200_000.0, 300_000.0, 100_000.0, 20_000.0);
        assert_eq!(nw.real_estate_equity, 200_000.0);
        assert_eq!(nw.total_liabilities, 120_000.0);
        assert_eq!(nw.net_worth, 380_000.0);
    }

    #[test]
    fn test_find_years_to_fire() {
        let path = [100.0, 400.0, 900.0, 1_100.0];
        assert_eq!(find_years_to_fire(&path, 1_000.0), Some(3));
        assert_eq!(find_years_to_fire(&path, 5_000.0), None);
    }
}
