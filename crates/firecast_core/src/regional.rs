//! Regional tax resolution
//!
//! Routes a (pack, region) pair to the right bracket schedules and computes
//! the two annual taxes the engine models:
//! - IRPF savings base, foral or common schedule
//! - Wealth tax (Impuesto sobre el Patrimonio) plus ISGF, netted against IP

use serde::{Deserialize, Serialize};

use crate::model::{
    BonusMode, Region, SavingsRegime, SavingsTaxDetail, TaxPack, WealthRegime, WealthRules,
    WealthTaxDetail, WealthTaxes,
};
use crate::taxes::{progressive_tax, progressive_tax_with_trace};

/// A tax pack paired with the region it is evaluated for.
///
/// Cheap to copy and shared read-only across simulation threads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxContext<'a> {
    pub pack: &'a TaxPack,
    pub region: Region,
}

impl<'a> TaxContext<'a> {
    #[must_use]
    pub fn new(pack: &'a TaxPack, region: Region) -> Self {
        Self { pack, region }
    }

    #[must_use]
    pub fn savings_tax(&self, base: f64) -> f64 {
        savings_tax(base, self.pack, self.region)
    }

    #[must_use]
    pub fn wealth_taxes(&self, wealth: f64) -> WealthTaxes {
        wealth_taxes(wealth, self.pack, self.region)
    }
}

/// Annual IRPF savings tax for `base`.
///
/// Foral savings brackets are used when the pack has a non-empty list for the
/// region, otherwise the common schedule applies.
#[must_use]
pub fn savings_tax(base: f64, pack: &TaxPack, region: Region) -> f64 {
    progressive_tax(base.max(0.0), pack.savings_regime(region).brackets())
}

#[must_use]
pub fn savings_tax_with_details(base: f64, pack: &TaxPack, region: Region) -> SavingsTaxDetail {
    let regime = pack.savings_regime(region);
    SavingsTaxDetail {
        system: regime.system(),
        region,
        trace: progressive_tax_with_trace(base.max(0.0), regime.brackets()),
    }
}

/// Annual wealth tax and ISGF on `wealth`.
///
/// A region without wealth rules in the pack pays nothing.
#[must_use]
pub fn wealth_taxes(wealth: f64, pack: &TaxPack, region: Region) -> WealthTaxes {
    let wealth = wealth.max(0.0);
    let WealthRegime::Covered(rules) = pack.wealth_rules(region) else {
        return WealthTaxes::ZERO;
    };

    let ip_base = (wealth - rules.min_exempt).max(0.0);
    let ip_tax = progressive_tax(ip_base, &rules.brackets) * (1.0 - bonus_pct(rules));

    let isgf = &pack.wealth.isgf;
    let gross_isgf = if wealth <= isgf.threshold {
        0.0
    } else {
        progressive_tax((wealth - isgf.min_exempt).max(0.0), &isgf.brackets)
    };

    combine(ip_tax, gross_isgf)
}

#[must_use]
pub fn wealth_taxes_with_details(wealth: f64, pack: &TaxPack, region: Region) -> WealthTaxDetail {
    let wealth = wealth.max(0.0);
    let rules = match pack.wealth_rules(region) {
        WealthRegime::Covered(rules) => rules,
        WealthRegime::NotCovered => {
            return WealthTaxDetail {
                region,
                covered: false,
                wealth,
                ip_base: 0.0,
                ip_trace: None,
                ip_tax_before_bonus: 0.0,
                bonus_pct: 0.0,
                isgf_applies: false,
                isgf_base: 0.0,
                isgf_trace: None,
                gross_isgf: 0.0,
                taxes: WealthTaxes::ZERO,
            };
        }
    };

    let ip_base = (wealth - rules.min_exempt).max(0.0);
    let ip_trace = progressive_tax_with_trace(ip_base, &rules.brackets);
    let bonus_pct = bonus_pct(rules);
    let ip_tax = ip_trace.tax * (1.0 - bonus_pct);

    let isgf = &pack.wealth.isgf;
    let isgf_applies = wealth > isgf.threshold;
    let (isgf_base, isgf_trace) = if isgf_applies {
        let base = (wealth - isgf.min_exempt).max(0.0);
        (base, Some(progressive_tax_with_trace(base, &isgf.brackets)))
    } else {
        (0.0, None)
    };
    let gross_isgf = isgf_trace.as_ref().map_or(0.0, |t| t.tax);

    WealthTaxDetail {
        region,
        covered: true,
        wealth,
        ip_base,
        ip_tax_before_bonus: ip_trace.tax,
        ip_trace: Some(ip_trace),
        bonus_pct,
        isgf_applies,
        isgf_base,
        isgf_trace,
        gross_isgf,
        taxes: combine(ip_tax, gross_isgf),
    }
}

fn bonus_pct(rules: &WealthRules) -> f64 {
    match rules.bonus {
        Some(bonus) if bonus.mode == BonusMode::FixedPct => bonus.pct.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

fn combine(ip_tax: f64, gross_isgf: f64) -> WealthTaxes {
    let isgf_tax = (gross_isgf - ip_tax).max(0.0);
    WealthTaxes {
        ip_tax,
        isgf_tax,
        total_wealth_tax: (ip_tax + isgf_tax).max(0.0),
    }
}

/// Which savings schedule a region resolves to, for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: Region,
    pub label: &'static str,
    pub foral_savings: bool,
    pub wealth_covered: bool,
}

/// Summaries of every region with an autonomous IRPF schedule, sorted by label
#[must_use]
pub fn region_summaries(pack: &TaxPack) -> Vec<RegionSummary> {
    pack.region_options()
        .into_iter()
        .map(|(region, label)| RegionSummary {
            region,
            label,
            foral_savings: matches!(pack.savings_regime(region), SavingsRegime::Foral(_)),
            wealth_covered: matches!(pack.wealth_rules(region), WealthRegime::Covered(_)),
        })
        .collect()
}
