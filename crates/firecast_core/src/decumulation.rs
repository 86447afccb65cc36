//! Year-by-year retirement drawdown tables
//!
//! Three builders share the same yearly step: start from the carried-over
//! capital (plus any property sale), grow it, tax positive growth at a flat
//! rate, subtract the withdrawal, and floor at zero.

use serde::{Deserialize, Serialize};

/// Stage of retirement a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Bridge years before the public pension starts
    PrePension,
    PostPension,
}

impl Phase {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Phase::PrePension => "Pre-pension",
            Phase::PostPension => "Post-pension",
        }
    }
}

/// One year of a drawdown table. Amounts are nominal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DecumulationRow {
    /// 1-based year of retirement
    pub year: u32,
    pub age: Option<u32>,
    pub phase: Option<Phase>,
    pub base_need: f64,
    pub public_pension_income: f64,
    pub private_plan_income: f64,
    pub other_income: f64,
    pub total_income: f64,
    pub pre_pension_extra_cost: f64,
    pub extra_withdrawal: f64,
    pub property_sale: f64,
    pub mortgage_payment: f64,
    /// Mortgage installments still pending at the end of the year
    pub pending_installments_end: u32,
    pub starting_capital: f64,
    pub withdrawal: f64,
    pub net_growth: f64,
    pub ending_capital: f64,
    pub depleted: bool,
}

/// Per-year nominal amounts indexed by retirement year (index 0 is year 1).
/// Years past the end of a list count as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CashSchedules {
    pub mortgage: Vec<f64>,
    pub extra_withdrawals: Vec<f64>,
    pub pending_installments_end: Vec<u32>,
}

impl CashSchedules {
    fn mortgage(&self, idx: usize) -> f64 {
        self.mortgage.get(idx).map_or(0.0, |v| v.max(0.0))
    }

    fn extra_withdrawal(&self, idx: usize) -> f64 {
        self.extra_withdrawals.get(idx).map_or(0.0, |v| v.max(0.0))
    }

    fn pending_installments(&self, idx: usize) -> u32 {
        self.pending_installments_end.get(idx).copied().unwrap_or(0)
    }
}

/// Sale of a property during retirement, in today's money
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertySale {
    /// 1-based retirement year of the sale
    pub year: u32,
    pub amount: f64,
}

impl PropertySale {
    fn proceeds(sale: Option<PropertySale>, year: u32, inflation_factor: f64) -> f64 {
        match sale {
            Some(sale) if sale.year == year => sale.amount.max(0.0) * inflation_factor,
            _ => 0.0,
        }
    }
}

/// Growth net of tax and the resulting end-of-year capital
fn step(starting_capital: f64, withdrawal: f64, annual_return: f64, gains_tax: f64) -> (f64, f64) {
    let gross_growth = starting_capital * annual_return;
    let net_growth = gross_growth - gross_growth.max(0.0) * gains_tax.max(0.0);
    let ending = (starting_capital + net_growth - withdrawal).max(0.0);
    (net_growth, ending)
}

/// Inflation-indexed constant withdrawal from a single portfolio.
#[must_use]
pub fn build_decumulation_table(
    starting_portfolio: f64,
    annual_withdrawal: f64,
    years: u32,
    expected_return: f64,
    inflation_rate: f64,
    gains_tax: f64,
) -> Vec<DecumulationRow> {
    let mut rows = Vec::with_capacity(years as usize);
    let mut portfolio = starting_portfolio.max(0.0);
    let mut inflation_factor = 1.0;

    for year in 1..=years {
        let withdrawal = annual_withdrawal * inflation_factor;
        let (net_growth, ending) = step(portfolio, withdrawal, expected_return, gains_tax);
        rows.push(DecumulationRow {
            year,
            base_need: withdrawal,
            starting_capital: portfolio,
            withdrawal,
            net_growth,
            ending_capital: ending,
            depleted: ending <= 0.0,
            ..DecumulationRow::default()
        });
        portfolio = ending;
        inflation_factor *= 1.0 + inflation_rate;
    }
    rows
}

/// Drawdown with public and private pensions replacing part of the spending.
///
/// All income and cost figures are in today's money and indexed by inflation;
/// mortgage and extra-withdrawal schedules are already nominal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwoStageSchedule {
    pub starting_portfolio: f64,
    pub fire_age: u32,
    pub years_in_retirement: u32,
    pub annual_spending_base: f64,
    pub pension_public_start_age: u32,
    pub pension_public_net_annual: f64,
    pub plan_private_start_age: u32,
    pub plan_private_duration_years: u32,
    pub plan_private_net_annual: f64,
    /// Income from other sources once the public pension starts
    pub other_income_post_pension_annual: f64,
    /// Costs that only exist before the public pension starts
    pub pre_pension_extra_cost_annual: f64,
    pub expected_return: f64,
    pub inflation_rate: f64,
    pub tax_rate_on_gains: f64,
    pub schedules: CashSchedules,
    pub property_sale: Option<PropertySale>,
}

impl Default for TwoStageSchedule {
    fn default() -> Self {
        Self {
            starting_portfolio: 0.0,
            fire_age: 50,
            years_in_retirement: 40,
            annual_spending_base: 30_000.0,
            pension_public_start_age: 67,
            pension_public_net_annual: 0.0,
            plan_private_start_age: 65,
            plan_private_duration_years: 0,
            plan_private_net_annual: 0.0,
            other_income_post_pension_annual: 0.0,
            pre_pension_extra_cost_annual: 0.0,
            expected_return: 0.05,
            inflation_rate: 0.02,
            tax_rate_on_gains: 0.0,
            schedules: CashSchedules::default(),
            property_sale: None,
        }
    }
}

#[must_use]
pub fn build_two_stage_schedule(config: &TwoStageSchedule) -> Vec<DecumulationRow> {
    let mut rows = Vec::with_capacity(config.years_in_retirement as usize);
    let mut portfolio = config.starting_portfolio.max(0.0);
    let mut inflation_factor = 1.0;
    let private_end_age =
        (config.plan_private_start_age + config.plan_private_duration_years).saturating_sub(1);

    for year in 1..=config.years_in_retirement {
        let idx = (year - 1) as usize;
        let age = config.fire_age + year - 1;
        let post_pension = age >= config.pension_public_start_age;

        let public = if post_pension {
            config.pension_public_net_annual
        } else {
            0.0
        };
        let private = if config.plan_private_duration_years > 0
            && (config.plan_private_start_age..=private_end_age).contains(&age)
        {
            config.plan_private_net_annual
        } else {
            0.0
        };
        let other = if post_pension {
            config.other_income_post_pension_annual
        } else {
            0.0
        };
        let extra_cost = if post_pension {
            0.0
        } else {
            config.pre_pension_extra_cost_annual
        };

        let need = (config.annual_spending_base + extra_cost - public - private - other).max(0.0);
        let mortgage = config.schedules.mortgage(idx);
        let extra_withdrawal = config.schedules.extra_withdrawal(idx);
        let sale = PropertySale::proceeds(config.property_sale, year, inflation_factor);

        let starting_capital = portfolio + sale;
        let withdrawal = need * inflation_factor + mortgage + extra_withdrawal;
        let (net_growth, ending) = step(
            starting_capital,
            withdrawal,
            config.expected_return,
            config.tax_rate_on_gains,
        );

        rows.push(DecumulationRow {
            year,
            age: Some(age),
            phase: Some(if post_pension {
                Phase::PostPension
            } else {
                Phase::PrePension
            }),
            base_need: config.annual_spending_base * inflation_factor,
            public_pension_income: public * inflation_factor,
            private_plan_income: private * inflation_factor,
            other_income: other * inflation_factor,
            total_income: (public + private + other) * inflation_factor,
            pre_pension_extra_cost: extra_cost * inflation_factor,
            extra_withdrawal,
            property_sale: sale,
            mortgage_payment: mortgage,
            pending_installments_end: config.schedules.pending_installments(idx),
            starting_capital,
            withdrawal,
            net_growth,
            ending_capital: ending,
            depleted: ending <= 0.0,
        });

        portfolio = ending;
        inflation_factor *= 1.0 + config.inflation_rate;
    }
    rows
}

/// Drawdown with a direct net withdrawal per stage instead of an income model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwoPhaseNetWithdrawal {
    pub starting_portfolio: f64,
    pub fire_age: u32,
    pub years_in_retirement: u32,
    /// Age at which the second-stage withdrawal applies
    pub phase2_start_age: u32,
    pub stage1_net_withdrawal_annual: f64,
    pub stage2_net_withdrawal_annual: f64,
    pub inflation_rate: f64,
    pub tax_rate_on_gains: f64,
    pub expected_return: f64,
    /// Per-year returns overriding `expected_return` while they last
    pub annual_returns: Option<Vec<f64>>,
    pub schedules: CashSchedules,
    pub property_sale: Option<PropertySale>,
}

impl Default for TwoPhaseNetWithdrawal {
    fn default() -> Self {
        Self {
            starting_portfolio: 0.0,
            fire_age: 50,
            years_in_retirement: 40,
            phase2_start_age: 67,
            stage1_net_withdrawal_annual: 30_000.0,
            stage2_net_withdrawal_annual: 15_000.0,
            inflation_rate: 0.02,
            tax_rate_on_gains: 0.0,
            expected_return: 0.05,
            annual_returns: None,
            schedules: CashSchedules::default(),
            property_sale: None,
        }
    }
}

#[must_use]
pub fn build_two_phase_net_withdrawal(config: &TwoPhaseNetWithdrawal) -> Vec<DecumulationRow> {
    let mut rows = Vec::with_capacity(config.years_in_retirement as usize);
    let mut portfolio = config.starting_portfolio.max(0.0);
    let mut inflation_factor = 1.0;

    for year in 1..=config.years_in_retirement {
        let idx = (year - 1) as usize;
        let age = config.fire_age + year - 1;
        let stage2 = age >= config.phase2_start_age;
        let base_today = if stage2 {
            config.stage2_net_withdrawal_annual
        } else {
            config.stage1_net_withdrawal_annual
        }
        .max(0.0);

        let annual_return = config
            .annual_returns
            .as_ref()
            .and_then(|returns| returns.get(idx))
            .copied()
            .unwrap_or(config.expected_return);

        let mortgage = config.schedules.mortgage(idx);
        let extra_withdrawal = config.schedules.extra_withdrawal(idx);
        let sale = PropertySale::proceeds(config.property_sale, year, inflation_factor);

        let starting_capital = portfolio + sale;
        let base_need = base_today * inflation_factor;
        let withdrawal = base_need + mortgage + extra_withdrawal;
        let (net_growth, ending) = step(
            starting_capital,
            withdrawal,
            annual_return,
            config.tax_rate_on_gains,
        );

        rows.push(DecumulationRow {
            year,
            age: Some(age),
            phase: Some(if stage2 {
                Phase::PostPension
            } else {
                Phase::PrePension
            }),
            base_need,
            extra_withdrawal,
            property_sale: sale,
            mortgage_payment: mortgage,
            pending_installments_end: config.schedules.pending_installments(idx),
            starting_capital,
            withdrawal,
            net_growth,
            ending_capital: ending,
            depleted: ending <= 0.0,
            ..DecumulationRow::default()
        });

        portfolio = ending;
        inflation_factor *= 1.0 + config.inflation_rate;
    }
    rows
}

/// First retirement year whose ending capital is exhausted
#[must_use]
pub fn first_depletion_year(rows: &[DecumulationRow]) -> Option<u32> {
    rows.iter().find(|r| r.depleted).map(|r| r.year)
}
