//! Retirement tax-context solver
//!
//! The gross withdrawal `G` has to cover net spending plus the taxes that `G`
//! itself triggers:
//!
//! ```text
//! G = net + wealth_tax(G / swr) + savings_tax(G * ratio)
//! ```
//!
//! Both taxes are piecewise linear in `G`, so the fixed point is found with two
//! nested iterations: the inner loop settles the savings tax for a fixed
//! wealth tax, the outer loop re-evaluates the wealth tax on the new target.

use crate::error::{Result, require_positive};
use crate::model::{Convergence, RetirementTaxContext};
use crate::regional::TaxContext;

/// Cap on wealth-tax (outer) iterations
pub const MAX_OUTER_ITERATIONS: usize = 30;
/// Cap on savings-tax (inner) iterations per outer iteration
pub const MAX_INNER_ITERATIONS: usize = 30;
/// Inner loop stops once the gross withdrawal moves by at most this amount
pub const GROSS_TOLERANCE: f64 = 0.01;
/// Outer loop converges once the portfolio target moves by at most this amount
pub const TARGET_TOLERANCE: f64 = 1.0;

/// Gross portfolio and withdrawal needed so that after-tax income equals
/// `net_spending`.
///
/// Without a tax context the result is the untaxed identity and carries no
/// convergence status. Hitting the iteration cap is not an error: the last
/// estimate is returned with `converged = false`.
pub fn estimate_retirement_tax_context(
    net_spending: f64,
    swr: f64,
    taxable_withdrawal_ratio: f64,
    tax: Option<TaxContext<'_>>,
) -> Result<RetirementTaxContext> {
    require_positive("swr", swr)?;

    let base_target = net_spending / swr;
    let Some(tax) = tax else {
        return Ok(RetirementTaxContext {
            base_target,
            gross_withdrawal_required: net_spending,
            annual_savings_tax_retirement: 0.0,
            annual_wealth_tax_retirement: 0.0,
            target_portfolio_gross: base_target,
            convergence: None,
        });
    };

    let ratio = taxable_withdrawal_ratio.clamp(0.0, 1.0);
    let mut portfolio_target = base_target;
    let mut gross_withdrawal = net_spending;
    let mut savings_tax = 0.0;
    let mut wealth_tax = 0.0;
    let mut converged = false;
    let mut iterations = 0;

    for outer in 1..=MAX_OUTER_ITERATIONS {
        iterations = outer;
        wealth_tax = tax.wealth_taxes(portfolio_target).total_wealth_tax;

        let mut candidate = net_spending + wealth_tax;
        for _ in 0..MAX_INNER_ITERATIONS {
            savings_tax = tax.savings_tax((candidate * ratio).max(0.0));
            let updated = net_spending + wealth_tax + savings_tax;
            let settled = (updated - candidate).abs() <= GROSS_TOLERANCE;
            candidate = updated;
            if settled {
                break;
            }
        }

        let new_target = candidate / swr;
        let delta = (new_target - portfolio_target).abs();
        portfolio_target = new_target;
        gross_withdrawal = candidate;
        if delta <= TARGET_TOLERANCE {
            converged = true;
            break;
        }
    }

    if converged {
        tracing::debug!(iterations, portfolio_target, "retirement tax context converged");
    } else {
        tracing::warn!(
            iterations,
            portfolio_target,
            region = %tax.region,
            "retirement tax context did not converge; returning last estimate"
        );
    }

    Ok(RetirementTaxContext {
        base_target,
        gross_withdrawal_required: gross_withdrawal,
        annual_savings_tax_retirement: savings_tax,
        annual_wealth_tax_retirement: wealth_tax,
        target_portfolio_gross: portfolio_target,
        convergence: Some(Convergence {
            converged,
            iterations,
        }),
    })
}

/// Public pension adjusted for an early or delayed start.
///
/// `adjustment_pct` is applied once per year of difference between the
/// chosen and official ages; the result never goes below zero.
#[must_use]
pub fn effective_public_pension(
    net_annual: f64,
    official_age: u32,
    start_age: u32,
    adjustment_pct: f64,
) -> f64 {
    let years_delta = f64::from(start_age) - f64::from(official_age);
    (net_annual * (1.0 + adjustment_pct * years_delta)).max(0.0)
}

/// Share of the portfolio at retirement that is unrealised gains, in `[0, 1]`.
///
/// Used as the taxable fraction of each withdrawal when the user does not
/// provide one.
#[must_use]
pub fn estimate_auto_taxable_withdrawal_ratio(
    initial_wealth: f64,
    monthly_contribution: f64,
    years: u32,
    expected_return: f64,
    contribution_growth_rate: f64,
) -> f64 {
    let mut portfolio = initial_wealth.max(0.0);
    let mut principal = portfolio;
    let annual_contribution = (monthly_contribution * 12.0).max(0.0);
    let r = expected_return.max(-0.99);
    let g = contribution_growth_rate.max(-0.99);

    let mut contribution = annual_contribution;
    for _ in 0..years {
        portfolio *= 1.0 + r;
        portfolio += contribution;
        principal += contribution;
        contribution *= 1.0 + g;
    }

    if portfolio <= 0.0 {
        return 0.0;
    }
    ((portfolio - principal).max(0.0) / portfolio).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, SimulationError};
    use crate::model::{Bracket, Region, TaxPack, WealthRules};

    fn flat_pack(savings_rate: f64) -> TaxPack {
        let mut pack = TaxPack::default();
        pack.irpf.savings.brackets = vec![Bracket::new(None, savings_rate)];
        pack
    }

    #[test]
    fn test_untaxed_identity() {
        let ctx = estimate_retirement_tax_context(40_000.0, 0.04, 0.5, None).unwrap();
        assert_eq!(ctx.target_portfolio_gross, 40_000.0 / 0.04);
        assert_eq!(ctx.base_target, ctx.target_portfolio_gross);
        assert_eq!(ctx.gross_withdrawal_required, 40_000.0);
        assert_eq!(ctx.total_annual_tax(), 0.0);
        assert!(ctx.convergence.is_none());
        assert!(ctx.is_converged());
    }

    #[test]
    fn test_non_positive_swr_is_rejected() {
        for swr in [0.0, -0.04, f64::NAN] {
            let err = estimate_retirement_tax_context(40_000.0, swr, 0.5, None).unwrap_err();
            assert!(matches!(
                err,
                Error::Simulation(SimulationError::InvalidParameter { name: "swr", .. })
            ));
        }
    }

    #[test]
    fn test_flat_savings_tax_closed_form() {
        // G = net + t * r * G  =>  G = net / (1 - t * r)
        let pack = flat_pack(0.20);
        let tax = TaxContext::new(&pack, Region::Madrid);
        let ctx = estimate_retirement_tax_context(40_000.0, 0.04, 0.5, Some(tax)).unwrap();

        let expected = 40_000.0 / (1.0 - 0.20 * 0.5);
        assert!((ctx.gross_withdrawal_required - expected).abs() < 0.05);
        assert!((ctx.target_portfolio_gross - expected / 0.04).abs() < 2.0);
        assert_eq!(ctx.annual_wealth_tax_retirement, 0.0);
        let convergence = ctx.convergence.unwrap();
        assert!(convergence.converged);
        assert!(convergence.iterations >= 1);
    }

    #[test]
    fn test_ratio_is_clamped() {
        let pack = flat_pack(0.20);
        let tax = TaxContext::new(&pack, Region::Madrid);
        let over = estimate_retirement_tax_context(40_000.0, 0.04, 3.0, Some(tax)).unwrap();
        let one = estimate_retirement_tax_context(40_000.0, 0.04, 1.0, Some(tax)).unwrap();
        assert_eq!(over, one);

        let under = estimate_retirement_tax_context(40_000.0, 0.04, -1.0, Some(tax)).unwrap();
        assert_eq!(under.annual_savings_tax_retirement, 0.0);
        assert!((under.target_portfolio_gross - 1_000_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_wealth_tax_raises_target() {
        let mut pack = flat_pack(0.0);
        pack.wealth.regions.insert(
            Region::Aragon,
            WealthRules {
                min_exempt: 500_000.0,
                brackets: vec![Bracket::new(None, 0.01)],
                bonus: None,
            },
        );
        let tax = TaxContext::new(&pack, Region::Aragon);
        let ctx = estimate_retirement_tax_context(40_000.0, 0.04, 0.5, Some(tax)).unwrap();

        // G = 40,000 + 0.01 * (G / 0.04 - 500,000)  =>  G = 35,000 / 0.75
        let expected_gross = 35_000.0 / 0.75;
        assert!((ctx.gross_withdrawal_required - expected_gross).abs() < 1.0);
        assert!(ctx.annual_wealth_tax_retirement > 0.0);
        assert!(ctx.is_converged());
    }

    #[test]
    fn test_non_convergence_is_reported() {
        // A wealth tax above the withdrawal rate makes the target diverge
        let mut pack = flat_pack(0.0);
        pack.wealth.regions.insert(
            Region::Aragon,
            WealthRules {
                min_exempt: 0.0,
                brackets: vec![Bracket::new(None, 0.05)],
                bonus: None,
            },
        );
        let tax = TaxContext::new(&pack, Region::Aragon);
        let ctx = estimate_retirement_tax_context(40_000.0, 0.04, 0.5, Some(tax)).unwrap();
        let convergence = ctx.convergence.unwrap();
        assert!(!convergence.converged);
        assert_eq!(convergence.iterations, MAX_OUTER_ITERATIONS);
        assert!(ctx.target_portfolio_gross > ctx.base_target);
    }

    #[test]
    fn test_effective_public_pension() {
        assert_eq!(effective_public_pension(20_000.0, 67, 67, 0.04), 20_000.0);
        assert!((effective_public_pension(20_000.0, 67, 65, 0.04) - 18_400.0).abs() < 1e-9);
        assert!((effective_public_pension(20_000.0, 67, 70, 0.04) - 22_400.0).abs() < 1e-9);
        assert_eq!(effective_public_pension(20_000.0, 67, 40, 0.5), 0.0);
    }

    #[test]
    fn test_auto_ratio_bounds() {
        assert_eq!(estimate_auto_taxable_withdrawal_ratio(0.0, 0.0, 10, 0.05, 0.0), 0.0);
        assert_eq!(estimate_auto_taxable_withdrawal_ratio(100_000.0, 0.0, 0, 0.05, 0.0), 0.0);

        // 100k compounding at 10% for one year with no contributions
        let ratio = estimate_auto_taxable_withdrawal_ratio(100_000.0, 0.0, 1, 0.10, 0.0);
        assert!((ratio - 10_000.0 / 110_000.0).abs() < 1e-12);

        let losing = estimate_auto_taxable_withdrawal_ratio(100_000.0, 1_000.0, 20, -0.05, 0.0);
        assert_eq!(losing, 0.0);
    }
}
