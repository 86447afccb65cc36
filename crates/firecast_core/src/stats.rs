//! Percentile helpers for simulation output

use crate::model::{PercentileBands, PercentileSummary};

/// Percentiles reported for every simulated distribution
pub mod standard {
    pub const P5: f64 = 0.05;
    pub const P25: f64 = 0.25;
    pub const P50: f64 = 0.50;
    pub const P75: f64 = 0.75;
    pub const P95: f64 = 0.95;
}

/// Linear interpolation between closest ranks of an ascending slice.
///
/// `q` is a fraction in `[0, 1]`. Returns 0.0 for an empty slice.
#[must_use]
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Standard percentiles of an unsorted sample
#[must_use]
pub fn summarize(values: &[f64]) -> PercentileSummary {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    PercentileSummary {
        p5: percentile_sorted(&sorted, standard::P5),
        p25: percentile_sorted(&sorted, standard::P25),
        p50: percentile_sorted(&sorted, standard::P50),
        p75: percentile_sorted(&sorted, standard::P75),
        p95: percentile_sorted(&sorted, standard::P95),
    }
}

/// Per-column percentiles of a paths × columns matrix
#[must_use]
pub fn column_bands(paths: &[Vec<f64>], columns: usize) -> PercentileBands {
    let mut bands = PercentileBands {
        p5: Vec::with_capacity(columns),
        p25: Vec::with_capacity(columns),
        p50: Vec::with_capacity(columns),
        p75: Vec::with_capacity(columns),
        p95: Vec::with_capacity(columns),
    };

    let mut column = Vec::with_capacity(paths.len());
    for col in 0..columns {
        column.clear();
        column.extend(paths.iter().map(|p| p[col]));
        let summary = summarize(&column);
        bands.p5.push(summary.p5);
        bands.p25.push(summary.p25);
        bands.p50.push(summary.p50);
        bands.p75.push(summary.p75);
        bands.p95.push(summary.p95);
    }
    bands
}
