//! Typed view of a saved profile
//!
//! [`Plan`] holds every profile key with a default, and derives the inputs of
//! the simulation, solver and decumulation entry points from it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::decumulation::{CashSchedules, TwoStageSchedule};
use crate::error::DataError;
use crate::fiscal::{FiscalMode, FiscalRegime, IntlTaxRates, effective_fiscal_drag};
use crate::housing::{HousingFlows, HousingInputs, Mortgage, compute_housing_and_rental_flows};
use crate::model::{Region, ReturnStrategy};
use crate::retirement::{effective_public_pension, estimate_auto_taxable_withdrawal_ratio};
use crate::simulation::SimulationParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    pub profile_name: Option<String>,

    pub initial_wealth: f64,
    pub monthly_contribution: f64,
    pub contribution_growth_rate: f64,
    pub expected_return: f64,
    pub volatility: f64,
    pub inflation_rate: f64,
    /// Net annual spending in today's money
    pub annual_spending: f64,
    pub swr: f64,
    pub current_age: u32,
    pub target_age: u32,
    /// Accumulation horizon; defaults to the years until the target age
    pub years: Option<usize>,
    pub years_in_retirement: u32,
    pub return_strategy: ReturnStrategy,

    pub fiscal_mode: FiscalMode,
    pub fiscal_regime: FiscalRegime,
    pub include_optimization: bool,
    pub intl_tax_rates: IntlTaxRates,
    /// Fixed taxable share of withdrawals; estimated from the plan when absent
    pub taxable_withdrawal_ratio: Option<f64>,
    pub tax_year: i32,
    /// Spanish region for tax-pack taxation; `None` falls back to the fiscal drag
    pub region: Option<Region>,

    pub home_savings: f64,
    pub include_rental_income: bool,
    pub rental_gross_annual: f64,
    pub rental_costs_pct: f64,
    pub rental_irpf_pct: f64,
    pub primary_mortgage: Mortgage,
    pub investment_mortgage: Mortgage,

    pub official_pension_age: u32,
    pub public_pension_start_age: u32,
    /// Change per year of early (negative) or late start, e.g. 0.04
    pub pension_adjustment_pct: f64,
    pub public_pension_net_annual: f64,
    pub private_plan_start_age: u32,
    pub private_plan_duration_years: u32,
    pub private_plan_net_annual: f64,
    pub other_income_post_retirement: f64,
    pub pre_pension_extra_cost: f64,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            profile_name: None,
            initial_wealth: 100_000.0,
            monthly_contribution: 1_000.0,
            contribution_growth_rate: 0.0,
            expected_return: 0.07,
            volatility: 0.15,
            inflation_rate: 0.02,
            annual_spending: 30_000.0,
            swr: 0.04,
            current_age: 35,
            target_age: 50,
            years: None,
            years_in_retirement: 40,
            return_strategy: ReturnStrategy::default(),
            fiscal_mode: FiscalMode::default(),
            fiscal_regime: FiscalRegime::default(),
            include_optimization: false,
            intl_tax_rates: IntlTaxRates::default(),
            taxable_withdrawal_ratio: None,
            tax_year: 2026,
            region: None,
            home_savings: 0.0,
            include_rental_income: false,
            rental_gross_annual: 0.0,
            rental_costs_pct: 25.0,
            rental_irpf_pct: 20.0,
            primary_mortgage: Mortgage::default(),
            investment_mortgage: Mortgage::default(),
            official_pension_age: 67,
            public_pension_start_age: 67,
            pension_adjustment_pct: 0.0,
            public_pension_net_annual: 0.0,
            private_plan_start_age: 65,
            private_plan_duration_years: 0,
            private_plan_net_annual: 0.0,
            other_income_post_retirement: 0.0,
            pre_pension_extra_cost: 0.0,
        }
    }
}

impl Plan {
    /// Build a plan from a filtered profile config; absent keys keep defaults.
    pub fn from_profile_map(config: Map<String, Value>) -> Result<Self, DataError> {
        serde_json::from_value(Value::Object(config)).map_err(DataError::InvalidProfile)
    }

    pub fn to_profile_map(&self) -> Result<Map<String, Value>, DataError> {
        match serde_json::to_value(self).map_err(DataError::InvalidProfile)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    #[must_use]
    pub fn horizon_years(&self) -> usize {
        self.years
            .unwrap_or_else(|| self.target_age.saturating_sub(self.current_age) as usize)
            .max(1)
    }

    #[must_use]
    pub fn housing_inputs(&self) -> HousingInputs {
        HousingInputs {
            current_age: f64::from(self.current_age),
            target_age: f64::from(self.target_age),
            base_monthly_contribution: self.monthly_contribution,
            annual_spending: self.annual_spending,
            home_savings: self.home_savings,
            include_rental_income: self.include_rental_income,
            rental_gross_annual: self.rental_gross_annual,
            rental_costs_pct: self.rental_costs_pct,
            rental_irpf_pct: self.rental_irpf_pct,
            primary_mortgage: self.primary_mortgage,
            investment_mortgage: self.investment_mortgage,
        }
    }

    #[must_use]
    pub fn housing_flows(&self) -> HousingFlows {
        compute_housing_and_rental_flows(&self.housing_inputs())
    }

    /// Accumulation inputs with rental income and mortgages folded in
    #[must_use]
    pub fn simulation_params(&self) -> SimulationParams {
        let flows = self.housing_flows();
        SimulationParams {
            initial_wealth: self.initial_wealth,
            annual_contribution: flows.monthly_contribution_effective * 12.0,
            contribution_growth_rate: self.contribution_growth_rate,
            inflation_rate: self.inflation_rate,
            annual_spending: flows.annual_spending_effective,
            swr: self.swr,
        }
    }

    #[must_use]
    pub fn fiscal_drag(&self) -> f64 {
        effective_fiscal_drag(
            self.fiscal_regime,
            self.include_optimization,
            self.fiscal_mode,
            &self.intl_tax_rates,
        )
    }

    /// Expected return net of the flat fiscal drag
    #[must_use]
    pub fn net_expected_return(&self) -> f64 {
        self.expected_return - self.fiscal_drag()
    }

    #[must_use]
    pub fn taxable_ratio(&self) -> f64 {
        match self.taxable_withdrawal_ratio {
            Some(ratio) => ratio.clamp(0.0, 1.0),
            None => estimate_auto_taxable_withdrawal_ratio(
                self.initial_wealth,
                self.housing_flows().monthly_contribution_effective,
                self.horizon_years() as u32,
                self.expected_return,
                self.contribution_growth_rate,
            ),
        }
    }

    /// Drawdown from `starting_portfolio` at the target age.
    ///
    /// Mortgage installments still due after the target age are scheduled
    /// year by year rather than folded into spending.
    #[must_use]
    pub fn two_stage_schedule(&self, starting_portfolio: f64) -> TwoStageSchedule {
        let flows = self.housing_flows();
        let base_spending = (self.annual_spending
            - self.home_savings.max(0.0)
            - flows.rental_net_effective)
            .max(0.0);

        TwoStageSchedule {
            starting_portfolio,
            fire_age: self.target_age,
            years_in_retirement: self.years_in_retirement,
            annual_spending_base: base_spending,
            pension_public_start_age: self.public_pension_start_age,
            pension_public_net_annual: effective_public_pension(
                self.public_pension_net_annual,
                self.official_pension_age,
                self.public_pension_start_age,
                self.pension_adjustment_pct,
            ),
            plan_private_start_age: self.private_plan_start_age,
            plan_private_duration_years: self.private_plan_duration_years,
            plan_private_net_annual: self.private_plan_net_annual,
            other_income_post_pension_annual: self.other_income_post_retirement,
            pre_pension_extra_cost_annual: self.pre_pension_extra_cost,
            expected_return: self.net_expected_return(),
            inflation_rate: self.inflation_rate,
            tax_rate_on_gains: 0.0,
            schedules: self.post_fire_mortgage_schedule(&flows),
            property_sale: None,
        }
    }

    fn post_fire_mortgage_schedule(&self, flows: &HousingFlows) -> CashSchedules {
        let mortgages = [
            (&self.primary_mortgage, flows.months_after_fire_primary),
            (&self.investment_mortgage, flows.months_after_fire_investment),
        ];
        let remaining: Vec<(f64, u32)> = mortgages
            .iter()
            .filter(|(m, months)| m.include && *months > 0.0)
            .map(|(m, months)| (m.monthly_payment.max(0.0), months.ceil() as u32))
            .collect();

        let last_year = remaining.iter().map(|(_, m)| m.div_ceil(12)).max().unwrap_or(0);
        let mut schedules = CashSchedules::default();
        for year in 0..last_year {
            let elapsed = year * 12;
            let mut payment = 0.0;
            let mut pending = 0;
            for (monthly, months) in &remaining {
                let due = months.saturating_sub(elapsed).min(12);
                payment += monthly * f64::from(due);
                pending += months.saturating_sub(elapsed + 12);
            }
            schedules.mortgage.push(payment);
            schedules.pending_installments_end.push(pending);
        }
        schedules
    }
}
