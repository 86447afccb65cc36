use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use firecast_core::fiscal::{FiscalMode, FiscalRegime};
use firecast_core::{Region, ReturnStrategy};

#[derive(Parser, Debug)]
#[command(name = "firecast", version)]
#[command(about = "Tax-aware financial independence planner for Spanish tax residents")]
pub struct Cli {
    /// Directory holding `taxpacks/` and `market_data/`
    #[arg(long, global = true, env = "FIRECAST_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a tax pack's metadata, regional coverage and brackets
    ///
    /// Exits with 0 when clean, 1 on validation findings, 2 when the pack
    /// cannot be loaded.
    ValidateTaxpack(PackArgs),
    /// List regions and the tax schedules they resolve to
    Regions(PackArgs),
    /// Portfolio needed to fund the spending goal after taxes
    Target(TargetArgs),
    /// Simulate the accumulation phase
    Simulate(SimulateArgs),
    /// Year-by-year drawdown from the target age
    Decumulate(DecumulateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PackArgs {
    #[arg(long, default_value_t = 2026)]
    pub year: i32,

    #[arg(long, default_value = "es")]
    pub country: String,
}

/// Plan inputs; each flag overrides the loaded profile
#[derive(Args, Debug, Clone, Default)]
pub struct PlanArgs {
    /// Load inputs from a saved profile
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Save the resolved inputs as a profile
    #[arg(long)]
    pub save_profile: Option<PathBuf>,

    #[arg(long)]
    pub initial_wealth: Option<f64>,

    #[arg(long)]
    pub monthly_contribution: Option<f64>,

    /// Net annual spending in today's money
    #[arg(long)]
    pub spending: Option<f64>,

    /// Safe withdrawal rate, e.g. 0.04
    #[arg(long)]
    pub swr: Option<f64>,

    #[arg(long)]
    pub expected_return: Option<f64>,

    #[arg(long)]
    pub volatility: Option<f64>,

    #[arg(long)]
    pub inflation: Option<f64>,

    #[arg(long)]
    pub current_age: Option<u32>,

    #[arg(long)]
    pub target_age: Option<u32>,

    /// Accumulation horizon in years (default: years until the target age)
    #[arg(long)]
    pub years: Option<usize>,

    /// Region key, e.g. madrid or pais-vasco-bizkaia
    #[arg(long)]
    pub region: Option<Region>,

    #[arg(long)]
    pub tax_year: Option<i32>,

    #[arg(long, default_value = "es")]
    pub country: String,

    /// Taxable share of each withdrawal (default: estimated gains share)
    #[arg(long)]
    pub ratio: Option<f64>,

    #[arg(long, value_enum)]
    pub fiscal_mode: Option<FiscalModeArg>,

    #[arg(long, value_enum)]
    pub fiscal_regime: Option<FiscalRegimeArg>,

    /// Ignore the region and apply only the flat fiscal drag
    #[arg(long)]
    pub no_tax: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    #[arg(long, value_enum, default_value_t = MethodArg::Normal)]
    pub method: MethodArg,

    /// Number of Monte Carlo paths
    #[arg(long, default_value_t = 1_000)]
    pub paths: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Historical series for bootstrap and backtest runs
    #[arg(long)]
    pub strategy: Option<ReturnStrategy>,

    /// Market data CSV (default: `<data-dir>/market_data/strategy_returns.csv`)
    #[arg(long)]
    pub market_data: Option<PathBuf>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DecumulateArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Portfolio at the target age (default: the after-tax target)
    #[arg(long)]
    pub portfolio: Option<f64>,

    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodArg {
    /// Gaussian annual returns
    Normal,
    /// Historical years resampled with replacement
    Bootstrap,
    /// Every historical window of the horizon
    Backtest,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiscalModeArg {
    Es,
    Intl,
}

impl From<FiscalModeArg> for FiscalMode {
    fn from(arg: FiscalModeArg) -> Self {
        match arg {
            FiscalModeArg::Es => FiscalMode::EsTaxPack,
            FiscalModeArg::Intl => FiscalMode::IntlBasic,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiscalRegimeArg {
    Funds,
    Direct,
    Other,
}

impl From<FiscalRegimeArg> for FiscalRegime {
    fn from(arg: FiscalRegimeArg) -> Self {
        match arg {
            FiscalRegimeArg::Funds => FiscalRegime::InvestmentFunds,
            FiscalRegimeArg::Direct => FiscalRegime::DirectPortfolio,
            FiscalRegimeArg::Other => FiscalRegime::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_defaults() {
        let cli = Cli::try_parse_from(["firecast", "validate-taxpack"]).unwrap();
        let Command::ValidateTaxpack(args) = cli.command else {
            panic!("expected validate-taxpack");
        };
        assert_eq!(args.year, 2026);
        assert_eq!(args.country, "es");
    }

    #[test]
    fn test_simulate_flags() {
        let cli = Cli::try_parse_from([
            "firecast",
            "simulate",
            "--method",
            "backtest",
            "--strategy",
            "balanced_60_40_synthetic",
            "--region",
            "pais-vasco-bizkaia",
            "--spending",
            "28000",
            "--data-dir",
            "/tmp/firecast",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/firecast"));
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.method, MethodArg::Backtest);
        assert_eq!(args.strategy, Some(ReturnStrategy::Balanced60_40Synthetic));
        assert_eq!(args.plan.region, Some(Region::PaisVascoBizkaia));
        assert_eq!(args.plan.spending, Some(28_000.0));
    }

    #[test]
    fn test_unknown_region_is_rejected() {
        let result = Cli::try_parse_from(["firecast", "target", "--region", "atlantis"]);
        assert!(result.is_err());
    }
}
