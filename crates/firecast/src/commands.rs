//! Subcommand implementations

use std::path::Path;
use std::process::ExitCode;

use color_eyre::eyre::{Result, WrapErr};
use serde::Serialize;
use firecast_core::decumulation::{DecumulationRow, build_two_stage_schedule};
use firecast_core::model::{HistoricalReturns, HistoricalStatistics, RetirementTaxContext};
use firecast_core::profile::{load_profile, save_profile};
use firecast_core::regional::region_summaries;
use firecast_core::validation::{validate_brackets, validate_metadata};
use firecast_core::{
    HistoricalDataset, Plan, SimulationResult, TaxContext, TaxPack, backtest_rolling_windows,
    estimate_retirement_tax_context, load_tax_pack, monte_carlo_bootstrap, monte_carlo_normal,
};

use crate::cli::{Cli, Command, MethodArg, PackArgs, PlanArgs, SimulateArgs};
use crate::report;

const TAXPACK_DIR: &str = "taxpacks";
const MARKET_DATA_FILE: &str = "market_data/strategy_returns.csv";

pub fn run(cli: Cli) -> Result<ExitCode> {
    let data_dir = cli.data_dir;
    match cli.command {
        Command::ValidateTaxpack(args) => Ok(validate_taxpack(&data_dir, &args).exit_code()),
        Command::Regions(args) => {
            let pack = load_tax_pack(&data_dir.join(TAXPACK_DIR), &args.country, args.year)?;
            print!("{}", report::render_regions(&region_summaries(&pack)));
            Ok(ExitCode::SUCCESS)
        }
        Command::Target(args) => {
            let plan = resolve_plan(&args.plan)?;
            let context = target(&data_dir, &plan, &args.plan.country)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&context)?);
            } else {
                print!("{}", report::render_target(&context));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Simulate(args) => {
            let plan = resolve_plan(&args.plan)?;
            let run = simulate(&data_dir, &plan, &args)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&run)?);
            } else {
                print!("{}", report::render_simulation(&run.result, run.history.as_ref()));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Decumulate(args) => {
            let plan = resolve_plan(&args.plan)?;
            let rows = decumulate(&data_dir, &plan, &args.plan.country, args.portfolio)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", report::render_decumulation(&rows));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Result of `validate-taxpack`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Findings,
    LoadError,
}

impl ValidationOutcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            ValidationOutcome::Valid => ExitCode::SUCCESS,
            ValidationOutcome::Findings => ExitCode::from(1),
            ValidationOutcome::LoadError => ExitCode::from(2),
        }
    }
}

/// Load the pack and print every finding.
pub fn validate_taxpack(data_dir: &Path, args: &PackArgs) -> ValidationOutcome {
    let pack = match load_tax_pack(&data_dir.join(TAXPACK_DIR), &args.country, args.year) {
        Ok(pack) => pack,
        Err(e) => {
            eprintln!("Failed to load tax pack: {e}");
            return ValidationOutcome::LoadError;
        }
    };

    let findings = validation_findings(&pack);
    if findings.is_empty() {
        println!("Tax pack {}-{} is valid", args.country, args.year);
        return ValidationOutcome::Valid;
    }

    eprintln!(
        "Tax pack {}-{} has {} problems:",
        args.country,
        args.year,
        findings.len()
    );
    for finding in &findings {
        eprintln!(" - {finding}");
    }
    ValidationOutcome::Findings
}

fn validation_findings(pack: &TaxPack) -> Vec<String> {
    let mut findings = validate_metadata(pack);
    findings.extend(validate_brackets(pack));
    findings
}

/// Profile values first, then explicit flags on top.
pub fn resolve_plan(args: &PlanArgs) -> Result<Plan> {
    let mut plan = match &args.profile {
        Some(path) => {
            let (config, warnings) = load_profile(path)?;
            for warning in warnings {
                eprintln!("Profile warning: {warning}");
            }
            Plan::from_profile_map(config)
                .wrap_err_with(|| format!("profile {} has invalid values", path.display()))?
        }
        None => Plan::default(),
    };

    macro_rules! apply {
        ($($arg:ident => $field:ident),* $(,)?) => {
            $(if let Some(value) = args.$arg {
                plan.$field = value;
            })*
        };
    }
    apply!(
        initial_wealth => initial_wealth,
        monthly_contribution => monthly_contribution,
        spending => annual_spending,
        swr => swr,
        expected_return => expected_return,
        volatility => volatility,
        inflation => inflation_rate,
        current_age => current_age,
        target_age => target_age,
        tax_year => tax_year,
    );
    if args.years.is_some() {
        plan.years = args.years;
    }
    if args.region.is_some() {
        plan.region = args.region;
    }
    if args.ratio.is_some() {
        plan.taxable_withdrawal_ratio = args.ratio;
    }
    if let Some(mode) = args.fiscal_mode {
        plan.fiscal_mode = mode.into();
    }
    if let Some(regime) = args.fiscal_regime {
        plan.fiscal_regime = regime.into();
    }
    if args.no_tax {
        plan.region = None;
    }

    if let Some(path) = &args.save_profile {
        save_profile(path, &plan.to_profile_map()?)?;
        tracing::info!(path = %path.display(), "saved profile");
    }
    Ok(plan)
}

/// Tax pack for the plan's region, if it has one
fn plan_pack(data_dir: &Path, plan: &Plan, country: &str) -> Result<Option<TaxPack>> {
    if plan.region.is_none() {
        return Ok(None);
    }
    let pack = TaxPack::load_validated(&data_dir.join(TAXPACK_DIR), country, plan.tax_year)?;
    Ok(Some(pack))
}

pub fn target(data_dir: &Path, plan: &Plan, country: &str) -> Result<RetirementTaxContext> {
    let pack = plan_pack(data_dir, plan, country)?;
    let tax = plan.region.zip(pack.as_ref()).map(|(r, p)| TaxContext::new(p, r));
    let spending = plan.housing_flows().annual_spending_effective;
    Ok(estimate_retirement_tax_context(spending, plan.swr, plan.taxable_ratio(), tax)?)
}

fn load_history(data_dir: &Path, args: &SimulateArgs, plan: &Plan) -> Result<HistoricalReturns> {
    let path = args
        .market_data
        .clone()
        .unwrap_or_else(|| data_dir.join(MARKET_DATA_FILE));
    let dataset = HistoricalDataset::from_path(&path)?;
    let strategy = args.strategy.unwrap_or(plan.return_strategy);
    Ok(dataset.strategy(strategy)?)
}

/// Simulation output plus the historical series it drew from
#[derive(Debug, Serialize)]
pub struct SimulationRun {
    #[serde(flatten)]
    pub result: SimulationResult,
    pub history: Option<HistorySummary>,
}

/// Statistics of a market-data column before any fiscal drag
#[derive(Debug, Clone, Serialize)]
pub struct HistorySummary {
    pub series: String,
    pub first_year: i32,
    pub last_year: i32,
    #[serde(flatten)]
    pub statistics: HistoricalStatistics,
}

impl HistorySummary {
    fn of(history: &HistoricalReturns) -> Option<Self> {
        Some(Self {
            series: history.name.clone(),
            first_year: *history.years.first()?,
            last_year: *history.years.last()?,
            statistics: history.statistics()?,
        })
    }
}

pub fn simulate(data_dir: &Path, plan: &Plan, args: &SimulateArgs) -> Result<SimulationRun> {
    let pack = plan_pack(data_dir, plan, &args.plan.country)?;
    let tax = plan.region.zip(pack.as_ref()).map(|(r, p)| TaxContext::new(p, r));
    // without a tax pack the flat drag stands in for taxes
    let drag = if tax.is_some() { 0.0 } else { plan.fiscal_drag() };

    let params = plan.simulation_params();
    let years = plan.horizon_years();
    tracing::info!(
        method = ?args.method,
        years,
        drag,
        taxed = tax.is_some(),
        "starting simulation"
    );

    let mut summary = None;
    let result = match args.method {
        MethodArg::Normal => monte_carlo_normal(
            &params,
            years,
            plan.expected_return - drag,
            plan.volatility,
            args.paths,
            args.seed,
            tax,
        )?,
        MethodArg::Bootstrap | MethodArg::Backtest => {
            let mut history = load_history(data_dir, args, plan)?;
            summary = HistorySummary::of(&history);
            history.returns.iter_mut().for_each(|r| *r -= drag);
            if args.method == MethodArg::Bootstrap {
                monte_carlo_bootstrap(&params, years, &history, args.paths, args.seed, tax)?
            } else {
                backtest_rolling_windows(&params, years, &history, tax)?
            }
        }
    };
    Ok(SimulationRun {
        result,
        history: summary,
    })
}

pub fn decumulate(
    data_dir: &Path,
    plan: &Plan,
    country: &str,
    portfolio: Option<f64>,
) -> Result<Vec<DecumulationRow>> {
    let starting = match portfolio {
        Some(value) => value,
        None => target(data_dir, plan, country)?.target_portfolio_gross,
    };
    Ok(build_two_stage_schedule(&plan.two_stage_schedule(starting)))
}
