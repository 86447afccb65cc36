//! Tests for loading tax packs and market data from disk
//!
//! These tests verify that:
//! - Bundled files load and list correctly
//! - The bundled history spans 1928-2024 with known crisis years in place
//! - Missing files surface as `MissingDataFile`
//! - Short or malformed market data is rejected
//! - A pack copied to a new directory round-trips through serde

use std::fs;

use tempfile::tempdir;

use super::{bundled_history, bundled_pack, data_dir};
use crate::error::{DataError, Error, SimulationError};
use crate::io::{list_available_taxpack_years, load_tax_pack};
use crate::model::{HistoricalDataset, MIN_HISTORICAL_POINTS, ReturnStrategy, TaxPack};

#[test]
fn test_bundled_years() {
    let years = list_available_taxpack_years(&data_dir().join("taxpacks"), "es");
    assert!(years.contains(&2026));
}

#[test]
fn test_bundled_history_has_every_strategy() {
    let dataset = bundled_history();
    let names: Vec<&str> = dataset.strategy_names().collect();
    for strategy in ReturnStrategy::ALL {
        assert!(names.contains(&strategy.column()), "{strategy}");
        let series = dataset.strategy(strategy).unwrap();
        assert!(series.len() >= MIN_HISTORICAL_POINTS);
        assert_eq!(series.years.len(), series.returns.len());
    }
}

#[test]
fn test_bundled_history_covers_1928_to_2024() {
    let dataset = bundled_history();
    let stocks = dataset.strategy(ReturnStrategy::Sp500UsTotalReturn).unwrap();
    let bonds = dataset.strategy(ReturnStrategy::UsTreasury10yTotalReturn).unwrap();

    assert_eq!(stocks.years.first(), Some(&1928));
    assert_eq!(stocks.years.last(), Some(&2024));
    assert_eq!(stocks.len(), 97);
    assert!(stocks.months_observed.iter().all(|m| *m == 12));

    let year = |y: i32| (y - 1928) as usize;
    assert!(stocks.returns[year(2008)] < -0.30);
    assert!(stocks.returns[year(2022)] < 0.0 && bonds.returns[year(2022)] < 0.0);

    let stats = stocks.statistics().unwrap();
    assert_eq!(stats.min, stocks.returns[year(1931)]);
    assert!(stats.geometric_mean > 0.08 && stats.geometric_mean < 0.11);
}

#[test]
fn test_blended_columns_mix_stocks_and_bonds() {
    let dataset = bundled_history();
    let stocks = dataset.strategy(ReturnStrategy::Sp500UsTotalReturn).unwrap();
    let bonds = dataset.strategy(ReturnStrategy::UsTreasury10yTotalReturn).unwrap();
    let balanced = dataset.strategy(ReturnStrategy::Balanced60_40Synthetic).unwrap();

    for ((s, b), mix) in stocks.returns.iter().zip(&bonds.returns).zip(&balanced.returns) {
        assert!((0.6 * s + 0.4 * b - mix).abs() < 1e-4);
    }
}

#[test]
fn test_missing_market_file() {
    let dir = tempdir().unwrap();
    let err = HistoricalDataset::from_path(&dir.path().join("returns.csv")).unwrap_err();
    assert!(matches!(err, DataError::MissingDataFile(_)));
}

#[test]
fn test_short_series_is_insufficient() {
    let mut csv = String::from("year,equity\n");
    for year in 2000..2010 {
        csv.push_str(&format!("{year},0.05\n"));
    }
    let dataset = HistoricalDataset::from_reader(csv.as_bytes()).unwrap();
    let err = dataset.series("equity").unwrap_err();
    assert!(matches!(
        err,
        Error::Simulation(SimulationError::InsufficientData {
            required: MIN_HISTORICAL_POINTS,
            available: 10
        })
    ));

    let err = dataset.series("bonds").unwrap_err();
    assert!(matches!(err, Error::Data(DataError::MissingColumn(_))));
}

#[test]
fn test_csv_without_year_column() {
    let err = HistoricalDataset::from_reader("date,equity\n2000,0.1\n".as_bytes()).unwrap_err();
    assert!(matches!(err, DataError::MissingColumn(c) if c == "year"));
}

#[test]
fn test_pack_round_trips_through_disk() {
    let pack = bundled_pack();
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("es-2027.json"),
        serde_json::to_string(&pack).unwrap(),
    )
    .unwrap();

    let reloaded = load_tax_pack(dir.path(), "es", 2027).unwrap();
    assert_eq!(reloaded, pack);
    assert!(TaxPack::load_validated(dir.path(), "es", 2027).is_ok());
    assert_eq!(list_available_taxpack_years(dir.path(), "es"), vec![2027]);
}
