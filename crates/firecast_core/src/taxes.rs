//! Progressive bracket evaluation
//!
//! Every tax in the engine (IRPF savings base, wealth tax, ISGF) is a
//! marginal-rate schedule evaluated here. Brackets are `(up_to, rate)` pairs in
//! ascending order; the last one has `up_to = None` and carries the top rate.

use serde::{Deserialize, Serialize};

use crate::model::Bracket;

/// One evaluated bracket, kept for auditability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BracketLine {
    /// 1-based position in the schedule
    pub step: usize,
    pub lower: f64,
    /// `None` for the unbounded top bracket
    pub upper: Option<f64>,
    pub rate: f64,
    pub taxable_in_bracket: f64,
    pub quota: f64,
}

/// Full evaluation of a base against a schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BracketTrace {
    pub taxable_base: f64,
    pub lines: Vec<BracketLine>,
    pub tax: f64,
}

/// Calculate tax owed on `base` using progressive brackets.
///
/// Negative bases are treated as zero. Malformed schedules (non-monotonic
/// `up_to`) are not rejected here and produce meaningless amounts; see
/// [`crate::validation::validate_brackets`].
#[must_use]
pub fn progressive_tax(base: f64, brackets: &[Bracket]) -> f64 {
    let taxable = base.max(0.0);
    let mut lower = 0.0;
    let mut tax = 0.0;

    for bracket in brackets {
        let rate = bracket.rate.max(0.0);
        let Some(upper) = bracket.up_to else {
            tax += (taxable - lower).max(0.0) * rate;
            break;
        };
        let span = (taxable.min(upper) - lower).max(0.0);
        tax += span * rate;
        lower = upper;
        if taxable <= lower {
            break;
        }
    }

    tax.max(0.0)
}

/// Same as [`progressive_tax`] but records a line per bracket touched.
#[must_use]
pub fn progressive_tax_with_trace(base: f64, brackets: &[Bracket]) -> BracketTrace {
    let taxable = base.max(0.0);
    let mut lower = 0.0;
    let mut tax = 0.0;
    let mut lines = Vec::with_capacity(brackets.len());

    for (idx, bracket) in brackets.iter().enumerate() {
        let rate = bracket.rate.max(0.0);
        let span = match bracket.up_to {
            Some(upper) => (taxable.min(upper) - lower).max(0.0),
            None => (taxable - lower).max(0.0),
        };
        let quota = span * rate;
        tax += quota;
        lines.push(BracketLine {
            step: idx + 1,
            lower,
            upper: bracket.up_to,
            rate,
            taxable_in_bracket: span,
            quota,
        });

        let Some(upper) = bracket.up_to else {
            break;
        };
        lower = upper;
        if taxable <= lower {
            break;
        }
    }

    BracketTrace {
        taxable_base: taxable,
        lines,
        tax: tax.max(0.0),
    }
}

/// Marginal rate applied to the next unit of income at `base`.
#[must_use]
pub fn marginal_rate(base: f64, brackets: &[Bracket]) -> f64 {
    let taxable = base.max(0.0);
    for bracket in brackets {
        match bracket.up_to {
            Some(upper) if taxable >= upper => continue,
            _ => return bracket.rate.max(0.0),
        }
    }
    brackets.last().map_or(0.0, |b| b.rate.max(0.0))
}
