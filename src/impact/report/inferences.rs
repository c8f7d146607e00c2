//! Per-time-point inference table.
//!
//! One row per index of the analysis window, on the original response
//! scale:
//! - pre-period rows carry the one-step-ahead predictive mean with a normal
//!   interval `mean ± z_{1−alpha/2} · sd` at the point estimate;
//! - gap rows (between the periods) carry multi-step forecasts the same way;
//! - post-period rows carry the posterior-predictive summaries.
//!
//! Cumulative effects accumulate over the post-period only and are zero
//! elsewhere.
use crate::impact::{core::data::PreparedData, posterior::effects::EffectEstimate};
use chrono::NaiveDateTime;
use ndarray::Array1;
use statrs::distribution::{ContinuousCDF, Normal};

/// Which part of the window a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPeriod {
    Pre,
    Gap,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRow {
    /// Position in the caller's series.
    pub index: usize,
    pub timestamp: Option<NaiveDateTime>,
    pub period: RowPeriod,
    pub actual: f64,
    pub predicted: f64,
    pub predicted_sd: f64,
    pub predicted_lower: f64,
    pub predicted_upper: f64,
    pub point_effect: f64,
    pub point_effect_lower: f64,
    pub point_effect_upper: f64,
    pub cumulative_effect: f64,
    pub cumulative_effect_lower: f64,
    pub cumulative_effect_upper: f64,
}

/// The full table.
#[derive(Debug, Clone, PartialEq)]
pub struct Inferences {
    rows: Vec<InferenceRow>,
}

impl Inferences {
    /// Assemble rows from point-estimate forecasts and post-period effects.
    ///
    /// Parameters
    /// ----------
    /// - `prepared`: the analysis window.
    /// - `forecast_mean`, `forecast_var`: filter forecasts over the whole
    ///   window on the model scale.
    /// - `effect`: post-period effect summaries.
    pub fn build(
        prepared: &PreparedData, forecast_mean: &[f64], forecast_var: &[f64],
        effect: &EffectEstimate,
    ) -> Self {
        let scaler = &prepared.scaler.response;
        let z = Normal::new(0.0, 1.0).map_or(f64::NAN, |n| n.inverse_cdf(1.0 - effect.alpha / 2.0));

        let rows = (0..prepared.len())
            .map(|t| {
                let actual = prepared.y_actual[t];
                let index = prepared.window_start + t;
                let timestamp = prepared.timestamps.as_ref().map(|ts| ts[t]);

                if prepared.post.contains(&t) {
                    let k = t - prepared.post.start;
                    let (p, e, c) =
                        (effect.predicted[k], effect.pointwise[k], effect.cumulative[k]);
                    return InferenceRow {
                        index,
                        timestamp,
                        period: RowPeriod::Post,
                        actual,
                        predicted: p.mean,
                        predicted_sd: p.sd,
                        predicted_lower: p.lower,
                        predicted_upper: p.upper,
                        point_effect: e.mean,
                        point_effect_lower: e.lower,
                        point_effect_upper: e.upper,
                        cumulative_effect: c.mean,
                        cumulative_effect_lower: c.lower,
                        cumulative_effect_upper: c.upper,
                    };
                }

                let predicted = scaler.inverse(forecast_mean[t]);
                let sd = scaler.inverse_scale(forecast_var[t].sqrt());
                let (lower, upper) = (predicted - z * sd, predicted + z * sd);
                InferenceRow {
                    index,
                    timestamp,
                    period: if prepared.pre.contains(&t) { RowPeriod::Pre } else { RowPeriod::Gap },
                    actual,
                    predicted,
                    predicted_sd: sd,
                    predicted_lower: lower,
                    predicted_upper: upper,
                    point_effect: actual - predicted,
                    point_effect_lower: actual - upper,
                    point_effect_upper: actual - lower,
                    cumulative_effect: 0.0,
                    cumulative_effect_lower: 0.0,
                    cumulative_effect_upper: 0.0,
                }
            })
            .collect();

        Self { rows }
    }

    pub fn rows(&self) -> &[InferenceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Extract one column as an array.
    pub fn column(&self, f: impl Fn(&InferenceRow) -> f64) -> Array1<f64> {
        self.rows.iter().map(f).collect()
    }

    pub fn actual(&self) -> Array1<f64> {
        self.column(|r| r.actual)
    }

    pub fn predicted(&self) -> Array1<f64> {
        self.column(|r| r.predicted)
    }

    pub fn point_effect(&self) -> Array1<f64> {
        self.column(|r| r.point_effect)
    }

    pub fn cumulative_effect(&self) -> Array1<f64> {
        self.column(|r| r.cumulative_effect)
    }

    /// Rows of the post-period.
    pub fn post_rows(&self) -> impl Iterator<Item = &InferenceRow> {
        self.rows.iter().filter(|r| r.period == RowPeriod::Post)
    }
}
