use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{DataError, SimulationError};

/// Minimum number of annual observations for any historical method
pub const MIN_HISTORICAL_POINTS: usize = 20;

/// Default number of months when the CSV has no quality column
pub const FULL_YEAR_MONTHS: u8 = 12;

/// Named return series bundled in the market-data CSV
///
/// The blended columns are annually rebalanced mixes of the S&P 500 and
/// 10-year Treasury series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStrategy {
    #[default]
    Sp500UsTotalReturn,
    #[serde(rename = "us_treasury_10y_total_return")]
    UsTreasury10yTotalReturn,
    #[serde(rename = "portfolio_100_0_synthetic")]
    Portfolio100_0Synthetic,
    #[serde(rename = "portfolio_70_30_synthetic")]
    Portfolio70_30Synthetic,
    #[serde(rename = "portfolio_50_50_synthetic")]
    Portfolio50_50Synthetic,
    #[serde(rename = "portfolio_30_70_synthetic")]
    Portfolio30_70Synthetic,
    #[serde(rename = "portfolio_15_85_synthetic")]
    Portfolio15_85Synthetic,
    #[serde(rename = "balanced_60_40_synthetic")]
    Balanced60_40Synthetic,
    #[serde(rename = "conservative_40_60_synthetic")]
    Conservative40_60Synthetic,
}

impl ReturnStrategy {
    pub const ALL: [ReturnStrategy; 9] = [
        ReturnStrategy::Sp500UsTotalReturn,
        ReturnStrategy::UsTreasury10yTotalReturn,
        ReturnStrategy::Portfolio100_0Synthetic,
        ReturnStrategy::Portfolio70_30Synthetic,
        ReturnStrategy::Portfolio50_50Synthetic,
        ReturnStrategy::Portfolio30_70Synthetic,
        ReturnStrategy::Portfolio15_85Synthetic,
        ReturnStrategy::Balanced60_40Synthetic,
        ReturnStrategy::Conservative40_60Synthetic,
    ];

    /// CSV column holding this strategy's annual returns
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            ReturnStrategy::Sp500UsTotalReturn => "sp500_us_total_return",
            ReturnStrategy::UsTreasury10yTotalReturn => "us_treasury_10y_total_return",
            ReturnStrategy::Portfolio100_0Synthetic => "portfolio_100_0_synthetic",
            ReturnStrategy::Portfolio70_30Synthetic => "portfolio_70_30_synthetic",
            ReturnStrategy::Portfolio50_50Synthetic => "portfolio_50_50_synthetic",
            ReturnStrategy::Portfolio30_70Synthetic => "portfolio_30_70_synthetic",
            ReturnStrategy::Portfolio15_85Synthetic => "portfolio_15_85_synthetic",
            ReturnStrategy::Balanced60_40Synthetic => "balanced_60_40_synthetic",
            ReturnStrategy::Conservative40_60Synthetic => "conservative_40_60_synthetic",
        }
    }
}

impl fmt::Display for ReturnStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for ReturnStrategy {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReturnStrategy::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.column() == s.trim())
            .ok_or_else(|| DataError::UnknownStrategy(s.to_string()))
    }
}

/// Historical annual return series for bootstrap sampling and backtests.
///
/// Each observation carries its calendar year and how many months of market
/// data went into it, so backtest windows can be attributed and flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalReturns {
    /// Series name for display purposes
    pub name: String,
    pub years: Vec<i32>,
    /// Annual decimal returns, aligned with `years`
    pub returns: Vec<f64>,
    /// Months of data observed per year (12 for a complete year)
    pub months_observed: Vec<u8>,
}

impl HistoricalReturns {
    /// Build a series of complete years starting at `start_year`.
    #[must_use]
    pub fn new(name: impl Into<String>, start_year: i32, returns: Vec<f64>) -> Self {
        let years = (0..returns.len()).map(|i| start_year + i as i32).collect();
        let months_observed = vec![FULL_YEAR_MONTHS; returns.len()];
        Self {
            name: name.into(),
            years,
            returns,
            months_observed,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Fail unless the series has at least `required` observations.
    pub fn ensure_len(&self, required: usize) -> Result<(), SimulationError> {
        if self.returns.len() < required {
            return Err(SimulationError::InsufficientData {
                required,
                available: self.returns.len(),
            });
        }
        Ok(())
    }

    /// Sample n years with replacement (i.i.d. bootstrap).
    pub fn sample_years<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Option<Vec<f64>> {
        if self.returns.is_empty() {
            return None;
        }
        Some(
            (0..n)
                .map(|_| self.returns[rng.random_range(0..self.returns.len())])
                .collect(),
        )
    }

    /// Every contiguous window of `len` years, in chronological order.
    pub fn windows(&self, len: usize) -> impl Iterator<Item = &[f64]> {
        self.returns.windows(len.max(1))
    }

    /// Basic statistics of the series.
    #[must_use]
    pub fn statistics(&self) -> Option<HistoricalStatistics> {
        if self.returns.is_empty() {
            return None;
        }
        let n = self.returns.len() as f64;
        let arithmetic_mean = self.returns.iter().sum::<f64>() / n;

        let product: f64 = self.returns.iter().map(|r| 1.0 + r).product();
        let geometric_mean = product.powf(1.0 / n) - 1.0;

        let variance = self
            .returns
            .iter()
            .map(|r| (r - arithmetic_mean).powi(2))
            .sum::<f64>()
            / n;

        let min = self.returns.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self
            .returns
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        Some(HistoricalStatistics {
            arithmetic_mean,
            geometric_mean,
            std_dev: variance.sqrt(),
            min,
            max,
            years: self.returns.len(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalStatistics {
    pub arithmetic_mean: f64,
    pub geometric_mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub years: usize,
}

/// All strategy columns of a market-data CSV
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalDataset {
    pub years: Vec<i32>,
    pub months_observed: Vec<u8>,
    /// Column name -> per-row value (`None` where the cell is blank)
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl HistoricalDataset {
    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        if !path.exists() {
            return Err(DataError::MissingDataFile(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Parse a CSV with a `year` column, an optional `months_observed` column
    /// and one numeric column per strategy.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let year_idx = headers
            .iter()
            .position(|h| h == "year")
            .ok_or_else(|| DataError::MissingColumn("year".to_string()))?;
        let months_idx = headers.iter().position(|h| h == "months_observed");

        let value_columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != year_idx && Some(*i) != months_idx)
            .map(|(i, h)| (i, h.to_string()))
            .collect();

        let mut dataset = HistoricalDataset::default();
        for (_, name) in &value_columns {
            dataset.columns.insert(name.clone(), Vec::new());
        }

        for record in csv_reader.records() {
            let record = record?;
            let line = record.position().map_or(0, csv::Position::line);
            let cell = |idx: usize| record.get(idx).unwrap_or_default();

            let year = parse_cell::<i32>(cell(year_idx), line, "year")?
                .ok_or_else(|| invalid_cell(line, "year", ""))?;
            let months = match months_idx {
                Some(i) => parse_cell::<u8>(cell(i), line, "months_observed")?
                    .map_or(FULL_YEAR_MONTHS, |m| m.min(FULL_YEAR_MONTHS)),
                None => FULL_YEAR_MONTHS,
            };

            dataset.years.push(year);
            dataset.months_observed.push(months);
            for (idx, name) in &value_columns {
                let value = parse_cell::<f64>(cell(*idx), line, name)?;
                if let Some(column) = dataset.columns.get_mut(name) {
                    column.push(value);
                }
            }
        }

        Ok(dataset)
    }

    /// Column names available as return series
    pub fn strategy_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Extract one column as a return series.
    ///
    /// Blank cells are allowed only before the first and after the last
    /// value of the column. Missing calendar years inside that range fail
    /// with [`DataError::SeriesGap`], as does a column shorter than
    /// [`MIN_HISTORICAL_POINTS`].
    pub fn series(&self, column: &str) -> crate::error::Result<HistoricalReturns> {
        let values = self
            .columns
            .get(column)
            .ok_or_else(|| DataError::MissingColumn(column.to_string()))?;

        let first = values.iter().position(Option::is_some).unwrap_or(values.len());
        let end = values.iter().rposition(Option::is_some).map_or(first, |i| i + 1);

        let mut series = HistoricalReturns {
            name: column.to_string(),
            years: Vec::with_capacity(end - first),
            returns: Vec::with_capacity(end - first),
            months_observed: Vec::with_capacity(end - first),
        };
        for row in first..end {
            let year = self.years[row];
            let Some(r) = values[row] else {
                return Err(DataError::SeriesGap {
                    column: column.to_string(),
                    year,
                }
                .into());
            };
            if let Some(&previous) = series.years.last()
                && year != previous + 1
            {
                return Err(DataError::SeriesGap {
                    column: column.to_string(),
                    year: previous + 1,
                }
                .into());
            }
            series.years.push(year);
            series.returns.push(r);
            series.months_observed.push(self.months_observed[row]);
        }

        series.ensure_len(MIN_HISTORICAL_POINTS)?;
        Ok(series)
    }

    pub fn strategy(&self, strategy: ReturnStrategy) -> crate::error::Result<HistoricalReturns> {
        self.series(strategy.column())
    }
}

fn invalid_cell(line: u64, column: &str, value: &str) -> DataError {
    DataError::InvalidCell {
        line,
        column: column.to_string(),
        value: value.to_string(),
    }
}

/// Blank cells are `None`; anything else must parse.
fn parse_cell<T: FromStr>(raw: &str, line: u64, column: &str) -> Result<Option<T>, DataError> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| invalid_cell(line, column, raw))
}
