//! Tests for Monte Carlo runs and result invariants
//!
//! These tests verify that:
//! - Success rates stay within [0, 100] for every method
//! - Seeds make runs reproducible
//! - Positive drift makes seed-averaged success non-decreasing year over year
//! - Taxes can only lower outcomes compared to the untaxed run

use super::{bundled_history, bundled_pack};
use crate::model::{GenerationMethod, Region, ReturnStrategy};
use crate::regional::TaxContext;
use crate::simulation::{SimulationParams, monte_carlo_bootstrap, monte_carlo_normal};

fn saver() -> SimulationParams {
    SimulationParams {
        initial_wealth: 150_000.0,
        annual_contribution: 24_000.0,
        contribution_growth_rate: 0.02,
        inflation_rate: 0.025,
        annual_spending: 30_000.0,
        swr: 0.04,
    }
}

#[test]
fn test_normal_run_shape_and_bounds() {
    let result = monte_carlo_normal(&saver(), 25, 0.07, 0.15, 500, 42, None).unwrap();

    assert_eq!(result.method, GenerationMethod::Normal);
    assert_eq!(result.num_paths, 500);
    assert_eq!(result.yearly_success.len(), 26);
    assert!(result.paths.iter().all(|p| p.len() == 26));
    assert!((0.0..=100.0).contains(&result.success_rate_final));
    assert!(result.yearly_success.iter().all(|s| (0.0..=100.0).contains(s)));
    assert_eq!(result.fire_target_real, 750_000.0);
}

#[test]
fn test_same_seed_same_result() {
    let a = monte_carlo_normal(&saver(), 20, 0.06, 0.18, 200, 7, None).unwrap();
    let b = monte_carlo_normal(&saver(), 20, 0.06, 0.18, 200, 7, None).unwrap();
    assert_eq!(a.final_values, b.final_values);

    let c = monte_carlo_normal(&saver(), 20, 0.06, 0.18, 200, 8, None).unwrap();
    assert_ne!(a.final_values, c.final_values);
}

#[test]
fn test_success_grows_under_positive_drift() {
    let seeds = 10;
    let mut total = vec![0.0; 31];
    for seed in 0..seeds {
        let result = monte_carlo_normal(&saver(), 30, 0.07, 0.15, 200, seed, None).unwrap();
        for (sum, success) in total.iter_mut().zip(&result.yearly_success) {
            *sum += success;
        }
    }
    let average: Vec<f64> = total.iter().map(|t| t / seeds as f64).collect();

    for (year, pair) in total.windows(2).enumerate() {
        assert!(
            pair[1] >= pair[0] - 1e-9,
            "success fell from {} to {} in year {}",
            pair[0],
            pair[1],
            year + 1
        );
    }
    assert!(average[30] > average[15]);
    assert!(average[30] > 50.0);
}

#[test]
fn test_percentile_bands_are_ordered() {
    let result = monte_carlo_normal(&saver(), 20, 0.07, 0.15, 300, 3, None).unwrap();
    let bands = &result.real_percentiles;
    for year in 0..=20 {
        assert!(bands.p5[year] <= bands.p25[year]);
        assert!(bands.p25[year] <= bands.p50[year]);
        assert!(bands.p50[year] <= bands.p75[year]);
        assert!(bands.p75[year] <= bands.p95[year]);
    }
    assert!(result.final_summary_real.p50 <= result.final_summary.p50);
}

#[test]
fn test_taxes_lower_every_path() {
    let pack = bundled_pack();
    let tax = TaxContext::new(&pack, Region::Aragon);

    let untaxed = monte_carlo_normal(&saver(), 20, 0.07, 0.10, 100, 11, None).unwrap();
    let taxed = monte_carlo_normal(&saver(), 20, 0.07, 0.10, 100, 11, Some(tax)).unwrap();

    for (t, u) in taxed.final_values.iter().zip(&untaxed.final_values) {
        assert!(t <= u);
    }
    assert!(taxed.success_rate_final <= untaxed.success_rate_final);
}

#[test]
fn test_bootstrap_from_bundled_history() {
    let dataset = bundled_history();
    let history = dataset.strategy(ReturnStrategy::Balanced60_40Synthetic).unwrap();

    let result = monte_carlo_bootstrap(&saver(), 25, &history, 400, 99, None).unwrap();
    assert_eq!(result.method, GenerationMethod::Bootstrap);
    assert!((0.0..=100.0).contains(&result.success_rate_final));
    assert!(result.backtest.is_none());

    let geo = &result.return_distribution.percentiles;
    assert!(geo.p5 < geo.p95);
}
