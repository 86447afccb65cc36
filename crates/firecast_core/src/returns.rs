//! Return matrices and the strategies that generate them
//!
//! A [`ReturnMatrix`] holds one row of annual decimal returns per simulated
//! path. It is generated sequentially from a seeded RNG before any parallel
//! work starts, so runs are reproducible regardless of thread count.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Distribution;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::model::{FULL_YEAR_MONTHS, GenerationMethod, HistoricalReturns, WindowSpan};

/// Paths × years of annual returns, stored row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnMatrix {
    method: GenerationMethod,
    paths: usize,
    years: usize,
    data: Vec<f64>,
    /// Calendar span of each row, for rolling-window matrices
    windows: Option<Vec<WindowSpan>>,
}

impl ReturnMatrix {
    /// Build a matrix from equally sized rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> std::result::Result<Self, SimulationError> {
        let years = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != years) {
            return Err(SimulationError::InvalidParameter {
                name: "return_matrix",
                value: bad.len() as f64,
                reason: "rows must all have the same number of years",
            });
        }
        Ok(Self {
            method: GenerationMethod::Custom,
            paths: rows.len(),
            years,
            data: rows.into_iter().flatten().collect(),
            windows: None,
        })
    }

    /// Every path earns `rate` every year.
    #[must_use]
    pub fn constant(paths: usize, years: usize, rate: f64) -> Self {
        Self {
            method: GenerationMethod::Custom,
            paths,
            years,
            data: vec![rate; paths * years],
            windows: None,
        }
    }

    #[must_use]
    pub fn method(&self) -> GenerationMethod {
        self.method
    }

    #[must_use]
    pub fn num_paths(&self) -> usize {
        self.paths
    }

    #[must_use]
    pub fn years(&self) -> usize {
        self.years
    }

    #[must_use]
    pub fn row(&self, path: usize) -> &[f64] {
        &self.data[path * self.years..(path + 1) * self.years]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // a zero-year matrix has no data; chunks_exact rejects a zero size
        self.data.chunks_exact(self.years.max(1))
    }

    #[must_use]
    pub fn windows(&self) -> Option<&[WindowSpan]> {
        self.windows.as_deref()
    }
}

/// Strategy producing the return matrix of a run
#[derive(Debug, Clone, Copy)]
pub enum ReturnGenerator<'a> {
    /// Independent Gaussian draw per (path, year)
    Normal {
        mean: f64,
        volatility: f64,
        paths: usize,
        seed: u64,
    },
    /// Historical years sampled with replacement, per (path, year)
    Bootstrap {
        history: &'a HistoricalReturns,
        paths: usize,
        seed: u64,
    },
    /// Every contiguous window of the history becomes one path
    RollingWindow { history: &'a HistoricalReturns },
}

impl ReturnGenerator<'_> {
    #[must_use]
    pub fn method(&self) -> GenerationMethod {
        match self {
            ReturnGenerator::Normal { .. } => GenerationMethod::Normal,
            ReturnGenerator::Bootstrap { .. } => GenerationMethod::Bootstrap,
            ReturnGenerator::RollingWindow { .. } => GenerationMethod::RollingWindow,
        }
    }

    /// Produce a matrix covering `years` simulated years.
    pub fn generate(&self, years: usize) -> Result<ReturnMatrix> {
        if years == 0 {
            return Err(SimulationError::InvalidParameter {
                name: "years",
                value: 0.0,
                reason: "horizon must be at least one year",
            }
            .into());
        }

        match *self {
            ReturnGenerator::Normal {
                mean,
                volatility,
                paths,
                seed,
            } => normal_matrix(mean, volatility, paths, years, seed),
            ReturnGenerator::Bootstrap {
                history,
                paths,
                seed,
            } => bootstrap_matrix(history, paths, years, seed),
            ReturnGenerator::RollingWindow { history } => rolling_window_matrix(history, years),
        }
    }
}

fn require_paths(paths: usize) -> std::result::Result<(), SimulationError> {
    if paths == 0 {
        return Err(SimulationError::InvalidParameter {
            name: "paths",
            value: 0.0,
            reason: "at least one path is required",
        });
    }
    Ok(())
}

fn normal_matrix(
    mean: f64,
    volatility: f64,
    paths: usize,
    years: usize,
    seed: u64,
) -> Result<ReturnMatrix> {
    require_paths(paths)?;
    let dist = rand_distr::Normal::new(mean, volatility).map_err(|_| {
        SimulationError::InvalidParameter {
            name: "volatility",
            value: volatility,
            reason: "must be non-negative and finite",
        }
    })?;

    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..paths * years).map(|_| dist.sample(&mut rng)).collect();
    Ok(ReturnMatrix {
        method: GenerationMethod::Normal,
        paths,
        years,
        data,
        windows: None,
    })
}

fn bootstrap_matrix(
    history: &HistoricalReturns,
    paths: usize,
    years: usize,
    seed: u64,
) -> Result<ReturnMatrix> {
    require_paths(paths)?;
    history.ensure_len(1)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let data = history
        .sample_years(&mut rng, paths * years)
        .ok_or(SimulationError::InsufficientData {
            required: 1,
            available: 0,
        })?;
    Ok(ReturnMatrix {
        method: GenerationMethod::Bootstrap,
        paths,
        years,
        data,
        windows: None,
    })
}

/// One path per contiguous window; needs at least `years + 1` observations.
fn rolling_window_matrix(history: &HistoricalReturns, years: usize) -> Result<ReturnMatrix> {
    history.ensure_len(years + 1)?;

    let count = history.len() - years + 1;
    let mut data = Vec::with_capacity(count * years);
    let mut spans = Vec::with_capacity(count);
    for (start, window) in history.windows(years).enumerate() {
        data.extend_from_slice(window);

        let end = start + years - 1;
        let months = &history.months_observed[start..=end];
        spans.push(WindowSpan {
            start_year: history.years[start],
            end_year: history.years[end],
            months_observed: months.iter().map(|m| u32::from(*m)).sum(),
            complete: months.iter().all(|m| *m >= FULL_YEAR_MONTHS),
        });
    }

    tracing::debug!(windows = count, years, series = %history.name, "built rolling windows");
    Ok(ReturnMatrix {
        method: GenerationMethod::RollingWindow,
        paths: count,
        years,
        data,
        windows: Some(spans),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn history(len: usize) -> HistoricalReturns {
        let returns = (0..len).map(|i| i as f64 / 100.0).collect();
        HistoricalReturns::new("test", 1950, returns)
    }

    #[test]
    fn test_normal_is_reproducible() {
        let generator = ReturnGenerator::Normal {
            mean: 0.07,
            volatility: 0.15,
            paths: 50,
            seed: 42,
        };
        let a = generator.generate(10).unwrap();
        let b = generator.generate(10).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.num_paths(), 50);
        assert_eq!(a.years(), 10);
        assert_eq!(a.rows().count(), 50);
    }

    #[test]
    fn test_normal_sample_moments() {
        let matrix = ReturnGenerator::Normal {
            mean: 0.07,
            volatility: 0.15,
            paths: 2_000,
            seed: 7,
        }
        .generate(10)
        .unwrap();
        let values: Vec<f64> = matrix.rows().flatten().copied().collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        assert!((mean - 0.07).abs() < 0.01, "mean {mean}");
        assert!((var.sqrt() - 0.15).abs() < 0.01, "std {}", var.sqrt());
    }

    #[test]
    fn test_zero_volatility_is_deterministic() {
        let matrix = ReturnGenerator::Normal {
            mean: 0.05,
            volatility: 0.0,
            paths: 3,
            seed: 1,
        }
        .generate(4)
        .unwrap();
        assert_eq!(matrix.method(), GenerationMethod::Normal);
        assert!(matrix.rows().flatten().all(|r| *r == 0.05));
    }

    #[test]
    fn test_invalid_normal_parameters() {
        let err = ReturnGenerator::Normal {
            mean: 0.05,
            volatility: -0.1,
            paths: 3,
            seed: 1,
        }
        .generate(4)
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Simulation(SimulationError::InvalidParameter { name: "volatility", .. })
        ));

        let err = ReturnGenerator::Normal {
            mean: 0.05,
            volatility: 0.1,
            paths: 0,
            seed: 1,
        }
        .generate(4)
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Simulation(SimulationError::InvalidParameter { name: "paths", .. })
        ));
    }

    #[test]
    fn test_bootstrap_samples_from_history() {
        let history = history(30);
        let matrix = ReturnGenerator::Bootstrap {
            history: &history,
            paths: 100,
            seed: 42,
        }
        .generate(25)
        .unwrap();
        assert_eq!(matrix.num_paths(), 100);
        assert!(matrix.rows().flatten().all(|r| history.returns.contains(r)));
    }

    #[test]
    fn test_rolling_window_count() {
        let history = history(40);
        for years in [1, 10, 39] {
            let matrix = ReturnGenerator::RollingWindow { history: &history }
                .generate(years)
                .unwrap();
            assert_eq!(matrix.num_paths(), 40 - years + 1);
            assert_eq!(matrix.row(0), &history.returns[..years]);
            assert_eq!(matrix.row(matrix.num_paths() - 1), &history.returns[40 - years..]);
        }
    }

    #[test]
    fn test_rolling_window_needs_one_spare_year() {
        let history = history(40);
        let err = ReturnGenerator::RollingWindow { history: &history }
            .generate(40)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Simulation(SimulationError::InsufficientData {
                required: 41,
                available: 40
            })
        ));
    }

    #[test]
    fn test_zero_horizon_is_invalid() {
        let history = history(40);
        let err = ReturnGenerator::RollingWindow { history: &history }
            .generate(0)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Simulation(SimulationError::InvalidParameter { name: "years", .. })
        ));
    }

    #[test]
    fn test_window_spans_track_quality() {
        let mut history = history(25);
        *history.months_observed.last_mut().unwrap() = 9;
        let matrix = ReturnGenerator::RollingWindow { history: &history }
            .generate(20)
            .unwrap();
        let spans = matrix.windows().unwrap();
        assert_eq!(spans.len(), 6);
        assert_eq!(spans[0].start_year, 1950);
        assert_eq!(spans[0].end_year, 1969);
        assert!(spans[0].complete);
        assert_eq!(spans[0].months_observed, 240);
        assert!(!spans[5].complete);
        assert_eq!(spans[5].months_observed, 237);
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let err = ReturnMatrix::from_rows(vec![vec![0.1, 0.2], vec![0.1]]).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidParameter { .. }));
        let ok = ReturnMatrix::from_rows(vec![vec![0.1, 0.2], vec![0.3, 0.4]]).unwrap();
        assert_eq!(ok.row(1), &[0.3, 0.4]);
    }
}
