//! Result records produced by the solver, the tax resolver and the path
//! simulator. All of them are plain data, immutable once built.

use serde::{Deserialize, Serialize};

use super::region::{Region, TaxSystem};
use crate::taxes::BracketTrace;

// ============================================================================
// Tax results
// ============================================================================

/// Savings tax with the schedule that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsTaxDetail {
    pub system: TaxSystem,
    pub region: Region,
    pub trace: BracketTrace,
}

impl SavingsTaxDetail {
    #[must_use]
    pub fn tax(&self) -> f64 {
        self.trace.tax
    }
}

/// Patrimonio (IP) and ISGF amounts for one wealth figure
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WealthTaxes {
    pub ip_tax: f64,
    pub isgf_tax: f64,
    pub total_wealth_tax: f64,
}

impl WealthTaxes {
    pub const ZERO: WealthTaxes = WealthTaxes {
        ip_tax: 0.0,
        isgf_tax: 0.0,
        total_wealth_tax: 0.0,
    };
}

/// Step-by-step wealth tax evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WealthTaxDetail {
    pub region: Region,
    /// False when the pack has no wealth rules for the region
    pub covered: bool,
    pub wealth: f64,
    pub ip_base: f64,
    pub ip_trace: Option<BracketTrace>,
    pub ip_tax_before_bonus: f64,
    /// Applied `fixedPct` bonus, already clamped to `[0, 1]`
    pub bonus_pct: f64,
    pub isgf_applies: bool,
    pub isgf_base: f64,
    pub isgf_trace: Option<BracketTrace>,
    pub gross_isgf: f64,
    pub taxes: WealthTaxes,
}

// ============================================================================
// Retirement solver
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Convergence {
    pub converged: bool,
    /// Outer iterations actually run
    pub iterations: usize,
}

/// Gross portfolio and withdrawal needed to sustain a net spending target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetirementTaxContext {
    /// `net_spending / swr`, ignoring taxes
    pub base_target: f64,
    pub gross_withdrawal_required: f64,
    pub annual_savings_tax_retirement: f64,
    pub annual_wealth_tax_retirement: f64,
    pub target_portfolio_gross: f64,
    /// `None` when no tax context was supplied
    pub convergence: Option<Convergence>,
}

impl RetirementTaxContext {
    #[must_use]
    pub fn total_annual_tax(&self) -> f64 {
        self.annual_savings_tax_retirement + self.annual_wealth_tax_retirement
    }

    /// True unless the solver ran and hit its iteration cap
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.convergence.is_none_or(|c| c.converged)
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// How the return matrix of a run was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    Normal,
    Bootstrap,
    RollingWindow,
    /// Matrix supplied directly by the caller
    Custom,
}

/// Per-year percentile series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentileBands {
    pub p5: Vec<f64>,
    pub p25: Vec<f64>,
    pub p50: Vec<f64>,
    pub p75: Vec<f64>,
    pub p95: Vec<f64>,
}

/// Percentiles of a single distribution
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentileSummary {
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
}

/// Per-path geometric mean annual returns and their spread
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnDistribution {
    pub geometric_means: Vec<f64>,
    pub percentiles: PercentileSummary,
}

/// Calendar attribution of one rolling window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpan {
    pub start_year: i32,
    pub end_year: i32,
    /// Months of market data behind the window's returns
    pub months_observed: u32,
    /// Every year in the window has twelve observed months
    pub complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowOutcome {
    pub start_year: i32,
    pub end_year: i32,
    pub final_value: f64,
    pub final_value_real: f64,
    pub met_target: bool,
    pub months_observed: u32,
    pub complete: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestDiagnostics {
    pub windows: Vec<WindowOutcome>,
    pub worst: Option<WindowOutcome>,
    pub best: Option<WindowOutcome>,
}

impl BacktestDiagnostics {
    /// Windows built from partially observed years
    pub fn incomplete_windows(&self) -> impl Iterator<Item = &WindowOutcome> {
        self.windows.iter().filter(|w| !w.complete)
    }
}

/// Aggregate output of a multi-path run.
///
/// Path matrices have `years + 1` columns; column 0 is the starting wealth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub method: GenerationMethod,
    pub num_paths: usize,
    pub years: usize,
    pub paths: Vec<Vec<f64>>,
    pub real_paths: Vec<Vec<f64>>,
    pub percentiles: PercentileBands,
    pub real_percentiles: PercentileBands,
    pub fire_target_real: f64,
    /// Percent of paths whose final real value meets the target
    pub success_rate_final: f64,
    /// Same percentage at every year, starting at year 0
    pub yearly_success: Vec<f64>,
    pub final_values: Vec<f64>,
    pub final_values_real: Vec<f64>,
    pub final_summary: PercentileSummary,
    pub final_summary_real: PercentileSummary,
    pub return_distribution: ReturnDistribution,
    pub backtest: Option<BacktestDiagnostics>,
}

impl SimulationResult {
    #[must_use]
    pub fn final_median(&self) -> f64 {
        self.final_summary.p50
    }

    #[must_use]
    pub fn final_median_real(&self) -> f64 {
        self.final_summary_real.p50
    }

    /// First year in which at least `threshold` percent of paths meet the target
    #[must_use]
    pub fn first_year_with_success(&self, threshold: f64) -> Option<usize> {
        self.yearly_success.iter().position(|s| *s >= threshold)
    }
}
