//! Tests for rolling-window backtests over the bundled market history
//!
//! These tests verify that:
//! - A series of length L yields exactly L - years + 1 windows
//! - Windows touching a partial final year are flagged incomplete
//! - Worst and best decades are attributed to the right calendar years
//! - Worst and best windows bracket every window outcome
//! - Horizons longer than the history are rejected

use super::{bundled_history, bundled_pack};
use crate::error::{Error, SimulationError};
use crate::model::{GenerationMethod, HistoricalReturns, Region, ReturnStrategy};
use crate::regional::TaxContext;
use crate::simulation::{SimulationParams, backtest_rolling_windows};

fn params() -> SimulationParams {
    SimulationParams {
        initial_wealth: 200_000.0,
        annual_contribution: 20_000.0,
        contribution_growth_rate: 0.0,
        inflation_rate: 0.02,
        annual_spending: 32_000.0,
        swr: 0.04,
    }
}

#[test]
fn test_window_count_matches_history() {
    let dataset = bundled_history();
    for strategy in ReturnStrategy::ALL {
        let history = dataset.strategy(strategy).unwrap();
        let len = history.len();
        for years in [10, 30, 50] {
            let result = backtest_rolling_windows(&params(), years, &history, None).unwrap();
            assert_eq!(result.method, GenerationMethod::RollingWindow);
            assert_eq!(result.num_paths, len - years + 1, "{strategy} over {years} years");
        }
    }
}

#[test]
fn test_partial_final_year_is_flagged() {
    let mut history = HistoricalReturns::new("equity", 1990, vec![0.05; 30]);
    if let Some(last) = history.months_observed.last_mut() {
        *last = 6;
    }
    let result = backtest_rolling_windows(&params(), 10, &history, None).unwrap();
    let backtest = result.backtest.unwrap();

    let first = &backtest.windows[0];
    assert_eq!((first.start_year, first.end_year), (1990, 1999));
    assert!(first.complete);
    assert_eq!(first.months_observed, 10 * 12);

    let last = backtest.windows.last().unwrap();
    assert_eq!((last.start_year, last.end_year), (2010, 2019));
    assert!(!last.complete);
    assert_eq!(last.months_observed, 9 * 12 + 6);
    assert_eq!(backtest.incomplete_windows().count(), 1);
}

#[test]
fn test_bundled_history_is_complete() {
    let dataset = bundled_history();
    let history = dataset.strategy(ReturnStrategy::Sp500UsTotalReturn).unwrap();
    let result = backtest_rolling_windows(&params(), 30, &history, None).unwrap();
    assert_eq!(result.backtest.unwrap().incomplete_windows().count(), 0);
}

#[test]
fn test_worst_and_best_decades_of_the_sp500() {
    let dataset = bundled_history();
    let history = dataset.strategy(ReturnStrategy::Sp500UsTotalReturn).unwrap();
    let result = backtest_rolling_windows(&params(), 10, &history, None).unwrap();
    let backtest = result.backtest.unwrap();

    let worst = backtest.worst.unwrap();
    assert_eq!((worst.start_year, worst.end_year), (1999, 2008));
    let best = backtest.best.unwrap();
    assert_eq!((best.start_year, best.end_year), (1949, 1958));
}

#[test]
fn test_worst_and_best_bound_outcomes() {
    let dataset = bundled_history();
    let history = dataset.strategy(ReturnStrategy::Portfolio70_30Synthetic).unwrap();
    let pack = bundled_pack();
    let tax = TaxContext::new(&pack, Region::ComunitatValenciana);
    let result = backtest_rolling_windows(&params(), 25, &history, Some(tax)).unwrap();
    let backtest = result.backtest.unwrap();

    let worst = backtest.worst.unwrap();
    let best = backtest.best.unwrap();
    for window in &backtest.windows {
        assert!(worst.final_value_real <= window.final_value_real);
        assert!(best.final_value_real >= window.final_value_real);
        assert_eq!(window.met_target, window.final_value_real >= result.fire_target_real);
    }

    let met = backtest.windows.iter().filter(|w| w.met_target).count();
    let expected = met as f64 / backtest.windows.len() as f64 * 100.0;
    assert!((result.success_rate_final - expected).abs() < 1e-9);
}

#[test]
fn test_horizon_longer_than_history() {
    let dataset = bundled_history();
    let history = dataset.strategy(ReturnStrategy::Sp500UsTotalReturn).unwrap();
    let err = backtest_rolling_windows(&params(), history.len(), &history, None).unwrap_err();
    assert!(matches!(
        err,
        Error::Simulation(SimulationError::InsufficientData { .. })
    ));
}
