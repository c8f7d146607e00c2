//! Fixed-schema summary table with Average and Cumulative columns.
use crate::impact::posterior::effects::{EffectEstimate, Estimate, PeriodEffect};
use std::fmt;

/// Whole-period summary of a run.
///
/// `average` summarizes per-draw means over the post-period and
/// `cumulative` per-draw sums. Relative effects are fractions, not
/// percentages.
///
/// `p_value` is the posterior mass of the cumulative effect beyond zero on
/// the side opposite most draws (see [`EffectEstimate::p_value`]). It is not
/// `P(effect ≤ 0)`: a clear decrease also gives a small `p`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactSummary {
    pub average: PeriodEffect,
    pub cumulative: PeriodEffect,
    pub p_value: f64,
    pub posterior_probability: f64,
    pub alpha: f64,
    pub n_post: usize,
}

impl ImpactSummary {
    pub fn from_effect(effect: &EffectEstimate) -> Self {
        Self {
            average: effect.average,
            cumulative: effect.total,
            p_value: effect.p_value,
            posterior_probability: effect.posterior_probability(),
            alpha: effect.alpha,
            n_post: effect.len(),
        }
    }

    /// Interval level in percent, e.g. 95 for `alpha = 0.05`.
    pub fn level_percent(&self) -> f64 {
        100.0 * (1.0 - self.alpha)
    }

    /// True when the tail probability is below `alpha`.
    pub fn is_significant(&self) -> bool {
        self.p_value < self.alpha
    }
}

const LABEL_WIDTH: usize = 26;
const COLUMN_WIDTH: usize = 22;

fn row(f: &mut fmt::Formatter<'_>, label: &str, left: String, right: String) -> fmt::Result {
    writeln!(f, "{label:<lw$}{left:<cw$}{right}", lw = LABEL_WIDTH, cw = COLUMN_WIDTH)
}

fn with_sd(e: &Estimate, pct: bool) -> String {
    if pct {
        format!("{:.1}% ({:.1}%)", 100.0 * e.mean, 100.0 * e.sd)
    } else {
        format!("{:.2} ({:.2})", e.mean, e.sd)
    }
}

fn interval(e: &Estimate, pct: bool) -> String {
    if pct {
        format!("[{:.1}%, {:.1}%]", 100.0 * e.lower, 100.0 * e.upper)
    } else {
        format!("[{:.2}, {:.2}]", e.lower, e.upper)
    }
}

impl fmt::Display for ImpactSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = format!("{:.0}% CI", self.level_percent());
        let (a, c) = (&self.average, &self.cumulative);
        writeln!(f, "Posterior inference")?;
        writeln!(f)?;
        row(f, "", "Average".into(), "Cumulative".into())?;
        row(f, "Actual", format!("{:.2}", a.actual), format!("{:.2}", c.actual))?;
        row(f, "Prediction (s.d.)", with_sd(&a.predicted, false), with_sd(&c.predicted, false))?;
        row(f, &level, interval(&a.predicted, false), interval(&c.predicted, false))?;
        writeln!(f)?;
        row(f, "Absolute effect (s.d.)", with_sd(&a.absolute, false), with_sd(&c.absolute, false))?;
        row(f, &level, interval(&a.absolute, false), interval(&c.absolute, false))?;
        writeln!(f)?;
        row(f, "Relative effect (s.d.)", with_sd(&a.relative, true), with_sd(&c.relative, true))?;
        row(f, &level, interval(&a.relative, true), interval(&c.relative, true))?;
        writeln!(f)?;
        writeln!(f, "Posterior tail-area probability p: {:.3}", self.p_value)?;
        write!(f, "Posterior prob. of a causal effect: {:.1}%", 100.0 * self.posterior_probability)
    }
}
