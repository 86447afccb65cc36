//! Plain-text rendering of results for the terminal

use std::fmt::Write;

use firecast_core::decumulation::{DecumulationRow, first_depletion_year};
use firecast_core::model::{RetirementTaxContext, SimulationResult};
use firecast_core::regional::RegionSummary;

use crate::commands::HistorySummary;

/// Group the integer part in thousands, e.g. 1234567 -> "1,234,567"
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Format a euro amount without cents
pub fn format_euros(value: f64) -> String {
    let rounded = value.abs().round() as u64;
    let sign = if value < 0.0 && rounded > 0 { "-" } else { "" };
    format!("{sign}€{}", group_thousands(rounded))
}

/// Format a euro amount in compact form (e.g., €2.1M, €450K, €50)
pub fn format_compact_euros(value: f64) -> String {
    let abs_value = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };

    if abs_value >= 1_000_000.0 {
        format!("{sign}€{:.1}M", abs_value / 1_000_000.0)
    } else if abs_value >= 1_000.0 {
        format!("{sign}€{:.0}K", abs_value / 1_000.0)
    } else {
        format!("{sign}€{abs_value:.0}")
    }
}

/// Format a decimal rate as a percentage
pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

pub fn render_regions(summaries: &[RegionSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<24} {:<22} {:<8} {}", "Region", "Key", "Savings", "Wealth tax");
    for summary in summaries {
        let _ = writeln!(
            out,
            "{:<24} {:<22} {:<8} {}",
            summary.label,
            summary.region.key(),
            if summary.foral_savings { "foral" } else { "common" },
            if summary.wealth_covered { "yes" } else { "no data" },
        );
    }
    out
}

pub fn render_target(context: &RetirementTaxContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Untaxed target:        {}", format_euros(context.base_target));
    let _ = writeln!(
        out,
        "Gross withdrawal:      {}",
        format_euros(context.gross_withdrawal_required)
    );
    let _ = writeln!(
        out,
        "  savings tax:         {}",
        format_euros(context.annual_savings_tax_retirement)
    );
    let _ = writeln!(
        out,
        "  wealth tax:          {}",
        format_euros(context.annual_wealth_tax_retirement)
    );
    let _ = writeln!(
        out,
        "Portfolio target:      {}",
        format_euros(context.target_portfolio_gross)
    );
    if let Some(convergence) = context.convergence {
        let status = if convergence.converged {
            "converged"
        } else {
            "NOT converged, last estimate shown"
        };
        let _ = writeln!(
            out,
            "Solver:                {status} after {} iterations",
            convergence.iterations
        );
    }
    out
}

pub fn render_simulation(result: &SimulationResult, history: Option<&HistorySummary>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:?} simulation: {} paths over {} years",
        result.method, result.num_paths, result.years
    );
    if let Some(history) = history {
        out.push_str(&render_history(history));
    }
    let _ = writeln!(
        out,
        "FIRE target (real):    {}",
        format_euros(result.fire_target_real)
    );
    let _ = writeln!(
        out,
        "Success at horizon:    {:.1}%",
        result.success_rate_final
    );
    match result.first_year_with_success(50.0) {
        Some(year) => {
            let _ = writeln!(out, "50% success reached:   year {year}");
        }
        None => {
            let _ = writeln!(out, "50% success reached:   never");
        }
    }

    let real = &result.final_summary_real;
    let _ = writeln!(
        out,
        "Final value (real):    p5 {}  p50 {}  p95 {}",
        format_compact_euros(real.p5),
        format_compact_euros(real.p50),
        format_compact_euros(real.p95)
    );
    let geo = &result.return_distribution.percentiles;
    let _ = writeln!(
        out,
        "Annualised return:     p5 {}  p50 {}  p95 {}",
        format_percentage(geo.p5),
        format_percentage(geo.p50),
        format_percentage(geo.p95)
    );

    if let Some(backtest) = &result.backtest {
        if let (Some(worst), Some(best)) = (backtest.worst, backtest.best) {
            let _ = writeln!(
                out,
                "Worst window:          {}-{} {}",
                worst.start_year,
                worst.end_year,
                format_compact_euros(worst.final_value_real)
            );
            let _ = writeln!(
                out,
                "Best window:           {}-{} {}",
                best.start_year,
                best.end_year,
                format_compact_euros(best.final_value_real)
            );
        }
        let incomplete = backtest.incomplete_windows().count();
        if incomplete > 0 {
            let _ = writeln!(out, "Windows with partial-year data: {incomplete}");
        }
    }
    out
}

/// One-line summary of the historical series behind a run
pub fn render_history(history: &HistorySummary) -> String {
    let stats = &history.statistics;
    format!(
        "History {} {}-{}: mean {}  geometric {}  stdev {}  worst {}  best {}\n",
        history.series,
        history.first_year,
        history.last_year,
        format_percentage(stats.arithmetic_mean),
        format_percentage(stats.geometric_mean),
        format_percentage(stats.std_dev),
        format_percentage(stats.min),
        format_percentage(stats.max),
    )
}

pub fn render_decumulation(rows: &[DecumulationRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4} {:>4} {:<13} {:>12} {:>12} {:>12} {:>14}",
        "Year", "Age", "Phase", "Income", "Mortgage", "Withdrawal", "End capital"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:>4} {:>4} {:<13} {:>12} {:>12} {:>12} {:>14}",
            row.year,
            row.age.map_or_else(|| "-".to_string(), |a| a.to_string()),
            row.phase.map_or("-", |p| p.label()),
            format_euros(row.total_income),
            format_euros(row.mortgage_payment),
            format_euros(row.withdrawal),
            format_euros(row.ending_capital),
        );
    }
    match first_depletion_year(rows) {
        Some(year) => {
            let _ = writeln!(out, "Portfolio depleted in year {year}");
        }
        None => {
            let _ = writeln!(out, "Portfolio lasts the full schedule");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use firecast_core::decumulation::{TwoStageSchedule, build_two_stage_schedule};
    use firecast_core::model::{Convergence, HistoricalReturns};

    #[test]
    fn test_format_euros() {
        assert_eq!(format_euros(0.0), "€0");
        assert_eq!(format_euros(999.4), "€999");
        assert_eq!(format_euros(1_234_567.8), "€1,234,568");
        assert_eq!(format_euros(-45_000.0), "-€45,000");
        assert_eq!(format_euros(-0.2), "€0");
    }

    #[test]
    fn test_format_compact_euros() {
        assert_eq!(format_compact_euros(2_100_000.0), "€2.1M");
        assert_eq!(format_compact_euros(450_000.0), "€450K");
        assert_eq!(format_compact_euros(50.0), "€50");
        assert_eq!(format_compact_euros(-1_500.0), "-€2K");
    }

    #[test]
    fn test_render_target_flags_non_convergence() {
        let context = RetirementTaxContext {
            base_target: 1_000_000.0,
            gross_withdrawal_required: 45_000.0,
            annual_savings_tax_retirement: 5_000.0,
            annual_wealth_tax_retirement: 0.0,
            target_portfolio_gross: 1_125_000.0,
            convergence: Some(Convergence {
                converged: false,
                iterations: 30,
            }),
        };
        let text = render_target(&context);
        assert!(text.contains("€1,125,000"));
        assert!(text.contains("NOT converged"));
    }

    #[test]
    fn test_render_history() {
        let history = HistoricalReturns::new("sp500_us_total_return", 2000, vec![0.10, -0.10]);
        let summary = HistorySummary {
            series: history.name.clone(),
            first_year: 2000,
            last_year: 2001,
            statistics: history.statistics().unwrap(),
        };
        let line = render_history(&summary);
        assert!(line.starts_with("History sp500_us_total_return 2000-2001: mean 0.00%"));
        assert!(line.contains("worst -10.00%  best 10.00%"));
    }

    #[test]
    fn test_render_decumulation() {
        let rows = build_two_stage_schedule(&TwoStageSchedule {
            starting_portfolio: 100_000.0,
            years_in_retirement: 5,
            annual_spending_base: 30_000.0,
            ..Default::default()
        });
        let text = render_decumulation(&rows);
        assert_eq!(text.lines().count(), 1 + 5 + 1);
        assert!(text.contains("Pre-pension"));
        assert!(text.contains("depleted in year 4"));
    }
}
