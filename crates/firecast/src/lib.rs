//! Command-line front end for the firecast engine
//!
//! Subcommands validate tax packs, list regions, size the after-tax FIRE
//! target, simulate the accumulation phase and print drawdown schedules.
//! Inputs come from flags, optionally layered on a saved profile.

// ============================================================================
// Core modules
// ============================================================================

pub mod cli;
pub mod commands;
pub mod logging;
pub mod report;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use cli::Cli;
pub use logging::init_logging;
