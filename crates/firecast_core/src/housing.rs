//! Rental income and mortgage flows folded into contributions and spending

use serde::{Deserialize, Serialize};

/// An outstanding mortgage
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Mortgage {
    pub include: bool,
    pub monthly_payment: f64,
    pub remaining_years: f64,
}

impl Mortgage {
    fn monthly_payment(&self) -> f64 {
        if self.include {
            self.monthly_payment.max(0.0)
        } else {
            0.0
        }
    }

    /// Payments still due once the portfolio has to cover spending.
    fn months_after(&self, months_to_fire: f64) -> f64 {
        (self.remaining_years * 12.0 - months_to_fire).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HousingInputs {
    pub current_age: f64,
    pub target_age: f64,
    pub base_monthly_contribution: f64,
    pub annual_spending: f64,
    /// Rent no longer paid once the primary home is owned
    pub home_savings: f64,

    pub include_rental_income: bool,
    pub rental_gross_annual: f64,
    /// Costs and vacancy, percent of gross
    pub rental_costs_pct: f64,
    /// Income tax on the rental net of costs, percent
    pub rental_irpf_pct: f64,

    pub primary_mortgage: Mortgage,
    pub investment_mortgage: Mortgage,
}

impl Default for HousingInputs {
    fn default() -> Self {
        Self {
            current_age: 35.0,
            target_age: 50.0,
            base_monthly_contribution: 1_000.0,
            annual_spending: 30_000.0,
            home_savings: 0.0,
            include_rental_income: false,
            rental_gross_annual: 0.0,
            rental_costs_pct: 25.0,
            rental_irpf_pct: 20.0,
            primary_mortgage: Mortgage::default(),
            investment_mortgage: Mortgage::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HousingFlows {
    pub rental_gross_effective: f64,
    pub rental_net_effective: f64,
    pub mortgages_monthly_total: f64,
    /// Payments that continue past the target age
    pub mortgages_monthly_post_fire: f64,
    pub months_after_fire_primary: f64,
    pub months_after_fire_investment: f64,
    pub monthly_contribution_effective: f64,
    pub annual_spending_effective: f64,
}

fn pct(value: f64) -> f64 {
    value.clamp(0.0, 100.0) / 100.0
}

pub fn compute_housing_and_rental_flows(inputs: &HousingInputs) -> HousingFlows {
    let rental_gross = if inputs.include_rental_income {
        inputs.rental_gross_annual.max(0.0)
    } else {
        0.0
    };
    let rental_net = if rental_gross > 0.0 {
        rental_gross * (1.0 - pct(inputs.rental_costs_pct)) * (1.0 - pct(inputs.rental_irpf_pct))
    } else {
        rental_gross
    };

    let months_to_fire = (inputs.target_age - inputs.current_age).max(0.0) * 12.0;
    let primary = &inputs.primary_mortgage;
    let investment = &inputs.investment_mortgage;

    let primary_after = primary.months_after(months_to_fire);
    let investment_after = investment.months_after(months_to_fire);
    let monthly_total = primary.monthly_payment() + investment.monthly_payment();

    let mut post_fire = 0.0;
    if primary_after > 0.0 {
        post_fire += primary.monthly_payment();
    }
    if investment_after > 0.0 {
        post_fire += investment.monthly_payment();
    }

    let monthly_contribution = inputs.base_monthly_contribution + rental_net / 12.0 - monthly_total;
    let annual_spending = (inputs.annual_spending - inputs.home_savings.max(0.0) - rental_net
        + post_fire * 12.0)
        .max(0.0);

    HousingFlows {
        rental_gross_effective: rental_gross,
        rental_net_effective: rental_net,
        mortgages_monthly_total: monthly_total,
        mortgages_monthly_post_fire: post_fire,
        months_after_fire_primary: primary_after,
        months_after_fire_investment: investment_after,
        monthly_contribution_effective: monthly_contribution,
        annual_spending_effective: annual_spending,
    }
}
