//! Tax-aware financial independence simulation library
//!
//! This crate models the path to financial independence for a Spanish tax
//! resident. It supports:
//! - Versioned tax packs with progressive IRPF savings and wealth-tax brackets
//! - Regional resolution, including the foral territories and the ISGF
//! - A fixed-point solver for the gross portfolio that funds a net spending goal
//! - Monte Carlo (Gaussian and bootstrap) and historical rolling-window runs
//! - Decumulation schedules with public and private pensions
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use firecast_core::{Region, TaxContext, TaxPack, estimate_retirement_tax_context};
//!
//! let pack = TaxPack::load_validated(Path::new("data/taxpacks"), "es", 2026)?;
//! let tax = TaxContext::new(&pack, Region::Madrid);
//! let context = estimate_retirement_tax_context(40_000.0, 0.04, 0.5, Some(tax))?;
//! println!("target {:.0}", context.target_portfolio_gross);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod decumulation;
pub mod error;
pub mod fiscal;
pub mod housing;
pub mod io;
pub mod plan;
pub mod profile;
pub mod projection;
pub mod regional;
pub mod retirement;
pub mod returns;
pub mod simulation;
pub mod stats;
pub mod taxes;
pub mod validation;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use error::{DataError, Error, Result, SimulationError};
pub use io::{list_available_taxpack_years, load_tax_pack};
pub use model::{
    GenerationMethod, HistoricalDataset, Region, ReturnStrategy, SimulationResult, TaxPack,
};
pub use plan::Plan;
pub use regional::{TaxContext, savings_tax, wealth_taxes};
pub use retirement::estimate_retirement_tax_context;
pub use returns::{ReturnGenerator, ReturnMatrix};
pub use simulation::{
    SimulationParams, backtest_rolling_windows, monte_carlo_bootstrap, monte_carlo_normal,
    run_simulation, simulate_paths,
};
pub use taxes::progressive_tax;
