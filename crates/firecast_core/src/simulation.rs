//! Multi-path portfolio simulation
//!
//! Every path advances year by year from the same starting point, applying
//! contributions, market growth and (optionally) the annual savings and wealth
//! taxes of a region. Paths do not interact, so they run in parallel under the
//! `parallel` feature; years within a path are strictly sequential.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError, require_positive};
use crate::model::{
    BacktestDiagnostics, HistoricalReturns, ReturnDistribution, SimulationResult, WindowOutcome,
};
use crate::regional::TaxContext;
use crate::returns::{ReturnGenerator, ReturnMatrix};
use crate::stats::{column_bands, summarize};

/// Lower clip for annual returns before taking logs
const MIN_GROWTH_FACTOR_RETURN: f64 = -0.999_999;

/// Inputs shared by every simulation method
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub initial_wealth: f64,
    pub annual_contribution: f64,
    /// Yearly growth of the contribution, e.g. 0.02 for raises tracking inflation
    pub contribution_growth_rate: f64,
    pub inflation_rate: f64,
    /// Real annual spending the portfolio has to sustain
    pub annual_spending: f64,
    /// Safe withdrawal rate, must be positive
    pub swr: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            initial_wealth: 0.0,
            annual_contribution: 12_000.0,
            contribution_growth_rate: 0.0,
            inflation_rate: 0.02,
            annual_spending: 30_000.0,
            swr: 0.04,
        }
    }
}

impl SimulationParams {
    /// Real portfolio needed to fund `annual_spending` at `swr`
    #[must_use]
    pub fn fire_target_real(&self) -> f64 {
        if self.annual_spending > 0.0 {
            self.annual_spending / self.swr
        } else {
            0.0
        }
    }
}

/// Advance every path of `returns` and aggregate the outcome.
///
/// Rolling-window matrices additionally get [`BacktestDiagnostics`].
pub fn simulate_paths(
    params: &SimulationParams,
    returns: &ReturnMatrix,
    tax: Option<TaxContext<'_>>,
) -> Result<SimulationResult> {
    require_positive("swr", params.swr)?;
    if returns.num_paths() == 0 {
        return Err(SimulationError::InvalidParameter {
            name: "paths",
            value: 0.0,
            reason: "at least one path is required",
        }
        .into());
    }
    if returns.years() == 0 {
        return Err(SimulationError::InvalidParameter {
            name: "years",
            value: 0.0,
            reason: "horizon must be at least one year",
        }
        .into());
    }

    let num_paths = returns.num_paths();
    let years = returns.years();
    let _span = tracing::debug_span!(
        "simulate_paths",
        method = ?returns.method(),
        num_paths,
        years,
        taxed = tax.is_some()
    )
    .entered();

    #[cfg(feature = "parallel")]
    let paths: Vec<Vec<f64>> = (0..num_paths)
        .into_par_iter()
        .map(|i| simulate_path(params, returns.row(i), tax))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let paths: Vec<Vec<f64>> = (0..num_paths)
        .map(|i| simulate_path(params, returns.row(i), tax))
        .collect();

    let deflators: Vec<f64> = (0..=years)
        .map(|y| (1.0 + params.inflation_rate).powi(y as i32))
        .collect();
    let real_paths: Vec<Vec<f64>> = paths
        .iter()
        .map(|path| path.iter().zip(&deflators).map(|(v, d)| v / d).collect())
        .collect();

    let fire_target_real = params.fire_target_real();
    let success_pct = |year: usize| {
        let hits = real_paths
            .iter()
            .filter(|p| p[year] >= fire_target_real)
            .count();
        hits as f64 / num_paths as f64 * 100.0
    };
    let yearly_success: Vec<f64> = (0..=years).map(success_pct).collect();
    let success_rate_final = yearly_success[years];

    let final_values: Vec<f64> = paths.iter().map(|p| p[years]).collect();
    let final_values_real: Vec<f64> = real_paths.iter().map(|p| p[years]).collect();

    let geometric_means: Vec<f64> = returns.rows().map(geometric_mean).collect();
    let return_distribution = ReturnDistribution {
        percentiles: summarize(&geometric_means),
        geometric_means,
    };

    let backtest = returns.windows().map(|spans| {
        backtest_diagnostics(spans, &final_values, &final_values_real, fire_target_real)
    });

    tracing::debug!(success_rate_final, "simulation finished");

    Ok(SimulationResult {
        method: returns.method(),
        num_paths,
        years,
        percentiles: column_bands(&paths, years + 1),
        real_percentiles: column_bands(&real_paths, years + 1),
        fire_target_real,
        success_rate_final,
        yearly_success,
        final_summary: summarize(&final_values),
        final_summary_real: summarize(&final_values_real),
        final_values,
        final_values_real,
        return_distribution,
        backtest,
        paths,
        real_paths,
    })
}

/// One nominal trajectory, `returns.len() + 1` values starting at the
/// initial wealth.
fn simulate_path(params: &SimulationParams, returns: &[f64], tax: Option<TaxContext<'_>>) -> Vec<f64> {
    let mut path = Vec::with_capacity(returns.len() + 1);
    let mut portfolio = params.initial_wealth;
    let mut contribution = params.annual_contribution;
    path.push(portfolio);

    for &annual_return in returns {
        let gross_growth = portfolio * annual_return;
        let pre_tax = portfolio + gross_growth + contribution;

        // Growth is taxed every year as if realised
        portfolio = match tax {
            Some(tax) => {
                pre_tax
                    - tax.savings_tax(gross_growth.max(0.0))
                    - tax.wealth_taxes(pre_tax).total_wealth_tax
            }
            None => pre_tax,
        }
        .max(0.0);

        path.push(portfolio);
        contribution *= 1.0 + params.contribution_growth_rate;
    }
    path
}

/// Annualised return of a sequence via averaged log growth
fn geometric_mean(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let log_sum: f64 = returns
        .iter()
        .map(|r| r.max(MIN_GROWTH_FACTOR_RETURN).ln_1p())
        .sum();
    (log_sum / returns.len() as f64).exp_m1()
}

fn backtest_diagnostics(
    spans: &[crate::model::WindowSpan],
    final_values: &[f64],
    final_values_real: &[f64],
    fire_target_real: f64,
) -> BacktestDiagnostics {
    let windows: Vec<WindowOutcome> = spans
        .iter()
        .zip(final_values.iter().zip(final_values_real))
        .map(|(span, (nominal, real))| WindowOutcome {
            start_year: span.start_year,
            end_year: span.end_year,
            final_value: *nominal,
            final_value_real: *real,
            met_target: *real >= fire_target_real,
            months_observed: span.months_observed,
            complete: span.complete,
        })
        .collect();

    let by_real = |a: &&WindowOutcome, b: &&WindowOutcome| {
        a.final_value_real.total_cmp(&b.final_value_real)
    };
    // ties resolve to the earliest window
    let worst = windows.iter().min_by(by_real).copied();
    let best = windows.iter().rev().max_by(by_real).copied();

    BacktestDiagnostics {
        windows,
        worst,
        best,
    }
}

/// Run one of the return generators and simulate the resulting matrix.
pub fn run_simulation(
    params: &SimulationParams,
    generator: &ReturnGenerator<'_>,
    years: usize,
    tax: Option<TaxContext<'_>>,
) -> Result<SimulationResult> {
    require_positive("swr", params.swr)?;
    let matrix = generator.generate(years)?;
    simulate_paths(params, &matrix, tax)
}

/// Monte Carlo with i.i.d. normal annual returns.
pub fn monte_carlo_normal(
    params: &SimulationParams,
    years: usize,
    mean_return: f64,
    volatility: f64,
    num_paths: usize,
    seed: u64,
    tax: Option<TaxContext<'_>>,
) -> Result<SimulationResult> {
    let generator = ReturnGenerator::Normal {
        mean: mean_return,
        volatility,
        paths: num_paths,
        seed,
    };
    run_simulation(params, &generator, years, tax)
}

/// Monte Carlo resampling historical annual returns with replacement.
pub fn monte_carlo_bootstrap(
    params: &SimulationParams,
    years: usize,
    history: &HistoricalReturns,
    num_paths: usize,
    seed: u64,
    tax: Option<TaxContext<'_>>,
) -> Result<SimulationResult> {
    let generator = ReturnGenerator::Bootstrap {
        history,
        paths: num_paths,
        seed,
    };
    run_simulation(params, &generator, years, tax)
}

/// Replay every historical window of `years` consecutive years.
pub fn backtest_rolling_windows(
    params: &SimulationParams,
    years: usize,
    history: &HistoricalReturns,
    tax: Option<TaxContext<'_>>,
) -> Result<SimulationResult> {
    run_simulation(params, &ReturnGenerator::RollingWindow { history }, years, tax)
}
