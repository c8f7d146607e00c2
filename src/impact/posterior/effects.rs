//! Effect distributions from posterior-predictive draws.
//!
//! Purpose
//! -------
//! Turn an `niter × n_post` matrix of counterfactual predictions (original
//! scale) and the observed post-period actuals into pointwise, cumulative and
//! whole-period effect estimates with two-sided intervals at level
//! `1 − alpha`.
//!
//! Key behaviors
//! -------------
//! - Per draw: `effect_t = actual_t − pred_t`; cumulative effects are running
//!   sums of a draw's effects, so cumulative intervals reflect the joint
//!   uncertainty of a trajectory.
//! - Every interval is the `(alpha/2, 1 − alpha/2)` pair of empirical
//!   quantiles (statrs order statistics); means and sample sds accompany it.
//! - Average effect: per-draw mean over the post-period. Relative effect:
//!   average effect divided by the mean prediction, with the absolute sd and
//!   bounds divided by the same quantity.
//! - Tail probability `p = (min(#{cum ≤ 0}, #{cum ≥ 0}) + 1) / (niter + 1)`
//!   over per-draw cumulative effects at the last post index.
//!
//! Invariants & assumptions
//! ------------------------
//! - The mean of the cumulative effect at the last post index equals the
//!   sum of pointwise effect means (linearity of the mean).
use ndarray::{Array1, Array2, ArrayView1, Axis};
use statrs::statistics::{Data, OrderStatistics, Statistics};

/// Mean, sd and interval of a scalar posterior quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub mean: f64,
    pub sd: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Estimate {
    /// Summarize draws with empirical `(alpha/2, 1 − alpha/2)` quantiles.
    pub fn from_draws(draws: Vec<f64>, alpha: f64) -> Self {
        let mean = draws.iter().mean();
        let sd = if draws.len() > 1 { draws.iter().std_dev() } else { 0.0 };
        let mut data = Data::new(draws);
        let lower = data.quantile(alpha / 2.0);
        let upper = data.quantile(1.0 - alpha / 2.0);
        Self { mean, sd, lower, upper }
    }

    /// All four fields divided by `denom`.
    fn scaled(&self, denom: f64) -> Self {
        Self {
            mean: self.mean / denom,
            sd: self.sd / denom.abs(),
            lower: self.lower / denom,
            upper: self.upper / denom,
        }
    }
}

/// Whole-period summary: the actual value, the prediction, and the absolute
/// and relative effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodEffect {
    pub actual: f64,
    pub predicted: Estimate,
    pub absolute: Estimate,
    pub relative: Estimate,
}

/// Effect estimates over the post-period.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectEstimate {
    pub alpha: f64,
    pub n_draws: usize,
    pub actual: Array1<f64>,
    pub predicted: Vec<Estimate>,
    pub pointwise: Vec<Estimate>,
    pub cumulative: Vec<Estimate>,
    pub average: PeriodEffect,
    pub total: PeriodEffect,
    /// Tail probability of the final cumulative effect:
    /// `(min(#{cum ≤ 0}, #{cum ≥ 0}) + 1) / (n + 1)`. The smaller tail is
    /// used, so a clear decrease is as small as a clear increase.
    pub p_value: f64,
}

impl EffectEstimate {
    /// Aggregate predictive draws against actuals.
    ///
    /// Parameters
    /// ----------
    /// - `actual`: post-period actuals, length `n_post`.
    /// - `predictions`: `niter × n_post` counterfactual draws.
    /// - `alpha`: interval tail mass.
    ///
    /// Panics if the column count differs from `actual.len()` or there are no
    /// draws (programmer error).
    pub fn from_draws(actual: ArrayView1<f64>, predictions: &Array2<f64>, alpha: f64) -> Self {
        let n_draws = predictions.nrows();
        let n_post = actual.len();
        let effects: Array2<f64> = &actual.insert_axis(Axis(0)) - predictions;

        let mut cum_effects = effects.clone();
        cum_effects.accumulate_axis_inplace(Axis(1), |&prev, cur| *cur += prev);

        let column = |m: &Array2<f64>, t: usize| m.column(t).to_vec();
        let summarize = |m: &Array2<f64>| -> Vec<Estimate> {
            (0..n_post).map(|t| Estimate::from_draws(column(m, t), alpha)).collect()
        };
        let predicted = summarize(predictions);
        let pointwise = summarize(&effects);
        let cumulative = summarize(&cum_effects);

        let mean_pred = predictions.mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(n_draws));
        let sum_pred = predictions.sum_axis(Axis(1));
        let mean_effect = effects.mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(n_draws));
        let sum_effect = effects.sum_axis(Axis(1));

        let actual_mean = actual.sum() / n_post as f64;
        let average = period_effect(actual_mean, &mean_pred, &mean_effect, alpha);
        let total = period_effect(actual.sum(), &sum_pred, &sum_effect, alpha);

        let last = cum_effects.column(n_post.saturating_sub(1));
        let below = last.iter().filter(|v| **v <= 0.0).count();
        let above = last.iter().filter(|v| **v >= 0.0).count();
        let p_value = (below.min(above) + 1) as f64 / (n_draws + 1) as f64;

        Self {
            alpha,
            n_draws,
            actual: actual.to_owned(),
            predicted,
            pointwise,
            cumulative,
            average,
            total,
            p_value,
        }
    }

    pub fn len(&self) -> usize {
        self.actual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actual.is_empty()
    }

    /// Posterior probability of a causal effect, `1 − p`.
    pub fn posterior_probability(&self) -> f64 {
        1.0 - self.p_value
    }
}

fn period_effect(
    actual: f64, predicted: &Array1<f64>, absolute: &Array1<f64>, alpha: f64,
) -> PeriodEffect {
    let predicted = Estimate::from_draws(predicted.to_vec(), alpha);
    let absolute = Estimate::from_draws(absolute.to_vec(), alpha);
    PeriodEffect { actual, predicted, absolute, relative: absolute.scaled(predicted.mean) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Cumulative means equal sums of pointwise means.
    // - Interval nesting across alpha and the p-value bounds.
    // - Relative effects.
    // -------------------------------------------------------------------------

    fn draws(n: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, 4), |(i, t)| {
            10.0 + t as f64 + ((i * 37 + t * 11) % 101) as f64 / 50.0 - 1.0
        })
    }

    #[test]
    // Purpose
    // -------
    // Cumulative mean at the last index equals the sum of pointwise means.
    //
    // Given
    // -----
    // - 500 deterministic draws over 4 post points.
    //
    // Expect
    // ------
    // - Equality to 1e-9; total absolute mean equals the same value.
    fn cumulative_mean_is_sum_of_pointwise_means() {
        let actual = array![15.0, 16.0, 17.0, 18.0];
        let est = EffectEstimate::from_draws(actual.view(), &draws(500), 0.05);

        let sum: f64 = est.pointwise.iter().map(|e| e.mean).sum();
        assert!((est.cumulative[3].mean - sum).abs() < 1e-9);
        assert!((est.total.absolute.mean - sum).abs() < 1e-9);
        assert!((est.average.absolute.mean - sum / 4.0).abs() < 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Smaller alpha gives wider intervals; a clear effect has a small p.
    //
    // Given
    // -----
    // - Actuals 5 above every draw.
    //
    // Expect
    // ------
    // - 90% interval inside the 95% one; p = 1 / (n + 1); relative > 0.
    fn intervals_nest_and_p_value_is_minimal() {
        let actual = array![20.0, 21.0, 22.0, 23.0];
        let wide = EffectEstimate::from_draws(actual.view(), &draws(400), 0.05);
        let narrow = EffectEstimate::from_draws(actual.view(), &draws(400), 0.10);

        for (w, n) in wide.pointwise.iter().zip(narrow.pointwise.iter()) {
            assert!(w.lower <= n.lower && n.upper <= w.upper);
        }
        assert!((wide.p_value - 1.0 / 401.0).abs() < 1e-12);
        assert!(wide.posterior_probability() > 0.99);
        assert!(wide.average.relative.mean > 0.0);
        let rel = wide.average.absolute.mean / wide.average.predicted.mean;
        assert!((wide.average.relative.mean - rel).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Without an effect the tail probability is large.
    //
    // Given
    // -----
    // - Draws symmetric around the actual values.
    //
    // Expect
    // ------
    // - p ≥ 0.4.
    fn no_effect_gives_large_p_value() {
        let preds = Array2::from_shape_fn((200, 2), |(i, _)| if i % 2 == 0 { 1.0 } else { -1.0 });
        let est = EffectEstimate::from_draws(array![0.0, 0.0].view(), &preds, 0.05);
        assert!(est.p_value >= 0.4);
    }

    #[test]
    // Purpose
    // -------
    // The tail probability takes the smaller tail, so increases and
    // decreases of the same size score alike.
    //
    // Given
    // -----
    // - Draws around 10..13; actuals 5 above and 5 below the draw centres.
    //
    // Expect
    // ------
    // - p = 1 / (n + 1) for both; the decrease has a negative average effect.
    fn p_value_is_symmetric_in_effect_sign() {
        let preds = draws(300);
        let up = EffectEstimate::from_draws(array![15.0, 16.0, 17.0, 18.0].view(), &preds, 0.05);
        let down = EffectEstimate::from_draws(array![5.0, 6.0, 7.0, 8.0].view(), &preds, 0.05);

        assert!((up.p_value - 1.0 / 301.0).abs() < 1e-12);
        assert!((down.p_value - up.p_value).abs() < 1e-12);
        assert!(down.average.absolute.mean < 0.0);
    }
}
