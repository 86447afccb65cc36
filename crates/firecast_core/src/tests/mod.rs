//! Integration tests for the firecast engine against the bundled data
//!
//! Tests are organized by topic:
//! - `tax_engine` - Bundled tax pack: validation, savings and wealth taxes
//! - `retirement` - Gross target solver with real brackets
//! - `simulation` - Monte Carlo runs and result invariants
//! - `backtest` - Rolling windows over the bundled market history
//! - `decumulation` - Drawdown schedules fed by solver and pension helpers
//! - `data_loading` - Tax pack and CSV loading from disk

mod backtest;
mod data_loading;
mod simulation;

use std::path::{Path, PathBuf};

use crate::model::{HistoricalDataset, TaxPack};

pub(crate) fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

pub(crate) fn bundled_pack() -> TaxPack {
    TaxPack::load_validated(&data_dir().join("taxpacks"), "es", 2026).unwrap()
}

pub(crate) fn bundled_history() -> HistoricalDataset {
    HistoricalDataset::from_path(&data_dir().join("market_data/strategy_returns.csv")).unwrap()
}
