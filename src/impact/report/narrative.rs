//! Natural-language report synthesized from an [`ImpactSummary`].
use crate::impact::{posterior::effects::Estimate, report::summary::ImpactSummary};
use std::fmt::Write;

fn direction(value: f64) -> (&'static str, &'static str) {
    if value >= 0.0 { ("an increase", "positive") } else { ("a decrease", "negative") }
}

fn pct(e: &Estimate) -> (f64, f64, f64) {
    (100.0 * e.mean, 100.0 * e.lower, 100.0 * e.upper)
}

/// Multi-paragraph report of the whole-period effect.
///
/// The paragraphs cover the average effect, the cumulative effect, the
/// relative effect, and a closing statement on significance at the run's
/// `alpha`. The quoted `p` is the posterior mass of the cumulative effect
/// on the opposite side of zero from most draws, so decreases and increases
/// read alike.
pub fn verbal_report(s: &ImpactSummary) -> String {
    let a = &s.average;
    let c = &s.cumulative;
    let level = s.level_percent();
    let (word, sign) = direction(a.relative.mean);
    let (rel, rel_lo, rel_hi) = pct(&a.relative);
    let mut out = String::new();

    // `write!` into a String cannot fail.
    let _ = writeln!(
        out,
        "During the post-intervention period, the response variable had an average value of \
         approx. {:.2}. Had the intervention not taken place, we would have expected an average \
         response of {:.2}. The {level:.0}% interval of this counterfactual prediction is \
         [{:.2}, {:.2}]. Subtracting this prediction from the observed response yields an \
         estimate of the causal effect of {:.2}, with a {level:.0}% interval of [{:.2}, {:.2}].",
        a.actual,
        a.predicted.mean,
        a.predicted.lower,
        a.predicted.upper,
        a.absolute.mean,
        a.absolute.lower,
        a.absolute.upper,
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Summing up the individual data points over the {} post-intervention points, the \
         response variable had an overall value of {:.2}. Had the intervention not taken place, \
         we would have expected a sum of {:.2}, with a {level:.0}% interval of [{:.2}, {:.2}].",
        s.n_post, c.actual, c.predicted.mean, c.predicted.lower, c.predicted.upper,
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "In relative terms, the response variable showed {word} of {rel:+.1}%. The \
         {level:.0}% interval of this percentage is [{rel_lo:+.1}%, {rel_hi:+.1}%].",
    );
    let _ = writeln!(out);

    let excludes_zero = a.absolute.lower > 0.0 || a.absolute.upper < 0.0;
    if s.is_significant() {
        let _ = write!(
            out,
            "The {sign} effect observed during the intervention period is statistically \
             significant: the probability of obtaining this effect by chance is very small \
             (Bayesian tail-area probability p = {:.3} on the far side of zero). The causal \
             effect can be considered statistically significant{}.",
            s.p_value,
            if excludes_zero { "" } else { ", although its interval still touches zero" },
        );
    } else {
        let _ = write!(
            out,
            "The apparent {sign} effect is not statistically significant (Bayesian tail-area \
             probability p = {:.3} on the far side of zero). The effect may be spurious and \
             could be explained by chance variation; it would generally not be considered \
             statistically significant at the {:.0}% level.",
            s.p_value, level,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impact::posterior::effects::EffectEstimate;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Direction words and the significance paragraph for both signs.
    // -------------------------------------------------------------------------

    fn summary(shift: f64) -> ImpactSummary {
        let preds = Array2::from_shape_fn((200, 3), |(i, _)| 10.0 + (i % 11) as f64 / 5.0 - 1.0);
        let actual = array![10.0, 10.0, 10.0] + shift;
        ImpactSummary::from_effect(&EffectEstimate::from_draws(actual.view(), &preds, 0.05))
    }

    #[test]
    // Purpose
    // -------
    // A clear positive effect is reported as a significant increase.
    //
    // Given
    // -----
    // - Actuals 5 above every draw.
    //
    // Expect
    // ------
    // - "increase" and "statistically significant" without the negation.
    fn clear_effect_is_significant_increase() {
        let text = verbal_report(&summary(5.0));
        assert!(text.contains("increase"));
        assert!(text.contains("is statistically significant"));
        assert!(!text.contains("not statistically significant"));
    }

    #[test]
    // Purpose
    // -------
    // No effect is reported as not significant.
    //
    // Given
    // -----
    // - Actuals at the centre of the draws.
    //
    // Expect
    // ------
    // - "not statistically significant".
    fn null_effect_is_not_significant() {
        let text = verbal_report(&summary(0.0));
        assert!(text.contains("not statistically significant"));
    }

    #[test]
    // Purpose
    // -------
    // A clear negative effect is reported as a significant decrease with a
    // small tail probability.
    //
    // Given
    // -----
    // - Actuals 5 below every draw.
    //
    // Expect
    // ------
    // - "decrease" and "is statistically significant"; p = 1 / 201 quoted.
    fn clear_negative_effect_is_significant_decrease() {
        let s = summary(-5.0);
        let text = verbal_report(&s);

        assert!((s.p_value - 1.0 / 201.0).abs() < 1e-12);
        assert!(text.contains("decrease"));
        assert!(text.contains("is statistically significant"));
        assert!(text.contains("p = 0.005 on the far side of zero"), "{text}");
    }
}
