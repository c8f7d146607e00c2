//! Model specification: structure, priors, and sampling settings.
//!
//! [`ModelSpec`] is a plain settings struct with the documented defaults.
//! [`ModelSpec::validate`] rejects contradictory settings before any model is
//! built and returns non-fatal [`SpecWarning`]s (also logged through
//! `tracing`). [`ModelSpec::conflicts_with`] lists structural fields that
//! disagree with a supplied fitted model.
use crate::impact::{
    core::components::ModelStructure,
    errors::{SpecResult, SpecificationError},
};
use std::str::FromStr;

/// How model parameters are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Estimation {
    /// Penalized maximum likelihood (posterior mode) with L-BFGS.
    #[default]
    MaximumLikelihood,
    /// Random-walk Metropolis over the unconstrained parameters.
    Mcmc,
}

impl FromStr for Estimation {
    type Err = SpecificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mle" | "ml" | "maximum_likelihood" => Ok(Estimation::MaximumLikelihood),
            "mcmc" => Ok(Estimation::Mcmc),
            _ => Err(SpecificationError::InvalidEstimation { name: s.to_string() }),
        }
    }
}

impl std::fmt::Display for Estimation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Estimation::MaximumLikelihood => write!(f, "mle"),
            Estimation::Mcmc => write!(f, "mcmc"),
        }
    }
}

/// Non-fatal findings from [`ModelSpec::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecWarning {
    /// Dynamic regression and a local trend compete for the same variation.
    DynamicRegressionWithTrend,
}

impl std::fmt::Display for SpecWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecWarning::DynamicRegressionWithTrend => write!(
                f,
                "dynamic regression combined with a local trend may overspecify the model"
            ),
        }
    }
}

/// Settings for one causal impact analysis.
///
/// Fields
/// ------
/// - `niter`: posterior-predictive trajectories (and MCMC draws).
/// - `standardize_data`: scale response and covariates on pre-period moments.
/// - `prior_level_sd`: prior guess for the level disturbance sd, as a
///   multiple of the response sd.
/// - `nseasons`, `season_duration`: seasonal block; `nseasons = 1` disables it.
/// - `dynamic_regression`: random-walk instead of static coefficients.
/// - `alpha`: tail mass of the reported two-sided intervals.
/// - `local_trend`: replace the local level with a local linear trend.
/// - `estimation`: point estimation or MCMC.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub niter: usize,
    pub standardize_data: bool,
    pub prior_level_sd: f64,
    pub nseasons: usize,
    pub season_duration: usize,
    pub dynamic_regression: bool,
    pub alpha: f64,
    pub local_trend: bool,
    pub estimation: Estimation,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            niter: 1000,
            standardize_data: true,
            prior_level_sd: 0.01,
            nseasons: 1,
            season_duration: 1,
            dynamic_regression: false,
            alpha: 0.05,
            local_trend: false,
            estimation: Estimation::MaximumLikelihood,
        }
    }
}

impl ModelSpec {
    /// Whether a seasonal block is requested.
    pub fn has_seasonal(&self) -> bool {
        self.nseasons > 1
    }

    /// Check the settings against the number of available covariates.
    ///
    /// Errors
    /// ------
    /// - `InvalidNiter`, `InvalidAlpha`, `InvalidPriorLevelSd`.
    /// - `InvalidSeasons` for `nseasons == 0`.
    /// - `InvalidSeasonDuration` for `season_duration == 0`, or
    ///   `season_duration > 1` without a seasonal block.
    /// - `DynamicRegressionWithoutCovariates`.
    ///
    /// Returns
    /// -------
    /// Warnings for legal but risky combinations.
    pub fn validate(&self, n_covariates: usize) -> SpecResult<Vec<SpecWarning>> {
        if self.niter == 0 {
            return Err(SpecificationError::InvalidNiter { niter: self.niter });
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(SpecificationError::InvalidAlpha { alpha: self.alpha });
        }
        if !(self.prior_level_sd.is_finite() && self.prior_level_sd > 0.0) {
            return Err(SpecificationError::InvalidPriorLevelSd { value: self.prior_level_sd });
        }
        if self.nseasons == 0 {
            return Err(SpecificationError::InvalidSeasons {
                nseasons: 0,
                reason: "at least one season is required.",
            });
        }
        if self.season_duration == 0 {
            return Err(SpecificationError::InvalidSeasonDuration {
                season_duration: 0,
                reason: "each season must span at least one time point.",
            });
        }
        if self.season_duration > 1 && !self.has_seasonal() {
            return Err(SpecificationError::InvalidSeasonDuration {
                season_duration: self.season_duration,
                reason: "a seasonal component needs nseasons > 1.",
            });
        }
        if self.dynamic_regression && n_covariates == 0 {
            return Err(SpecificationError::DynamicRegressionWithoutCovariates);
        }

        let mut warnings = Vec::new();
        if self.dynamic_regression && self.local_trend {
            tracing::warn!(
                "dynamic regression with a local trend: coefficients and slope may be poorly \
                 identified"
            );
            warnings.push(SpecWarning::DynamicRegressionWithTrend);
        }
        Ok(warnings)
    }

    /// Structural fields that were changed from their defaults and disagree
    /// with `structure`.
    ///
    /// Prior and estimation settings cannot agree with an already fitted model,
    /// so any non-default value is reported.
    pub fn conflicts_with(&self, structure: &ModelStructure) -> Vec<&'static str> {
        let defaults = ModelSpec::default();
        let (nseasons, season_duration) = structure.seasonal().unwrap_or((1, 1));
        let mut fields = Vec::new();
        if self.prior_level_sd != defaults.prior_level_sd {
            fields.push("prior_level_sd");
        }
        if self.nseasons != defaults.nseasons && self.nseasons != nseasons {
            fields.push("nseasons");
        }
        if self.season_duration != defaults.season_duration
            && self.season_duration != season_duration
        {
            fields.push("season_duration");
        }
        if self.dynamic_regression && structure.n_dynamic() == 0 {
            fields.push("dynamic_regression");
        }
        if self.local_trend && !structure.has_trend() {
            fields.push("local_trend");
        }
        if self.estimation != defaults.estimation {
            fields.push("estimation");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impact::core::components::Component;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Defaults, validation errors and warnings, and custom-model conflicts.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Defaults match the documented values and validate cleanly.
    //
    // Given
    // -----
    // - `ModelSpec::default()` with no covariates.
    //
    // Expect
    // ------
    // - niter 1000, alpha 0.05, prior_level_sd 0.01, and no warnings.
    fn defaults_are_valid() {
        let spec = ModelSpec::default();
        assert_eq!(spec.niter, 1000);
        assert_eq!(spec.alpha, 0.05);
        assert_eq!(spec.prior_level_sd, 0.01);
        assert!(spec.standardize_data);
        assert_eq!(spec.validate(0), Ok(vec![]));
    }

    #[test]
    // Purpose
    // -------
    // Contradictory settings are rejected.
    //
    // Given
    // -----
    // - alpha = 1, season_duration = 7 with nseasons = 1, dynamic regression
    //   without covariates.
    //
    // Expect
    // ------
    // - The matching `SpecificationError` for each.
    fn contradictory_settings_are_rejected() {
        let spec = ModelSpec { alpha: 1.0, ..ModelSpec::default() };
        assert_eq!(spec.validate(0), Err(SpecificationError::InvalidAlpha { alpha: 1.0 }));

        let spec = ModelSpec { season_duration: 7, ..ModelSpec::default() };
        assert!(matches!(
            spec.validate(0),
            Err(SpecificationError::InvalidSeasonDuration { season_duration: 7, .. })
        ));

        let spec = ModelSpec { dynamic_regression: true, ..ModelSpec::default() };
        assert_eq!(spec.validate(0), Err(SpecificationError::DynamicRegressionWithoutCovariates));
    }

    #[test]
    // Purpose
    // -------
    // Dynamic regression with a trend is a warning, not an error.
    //
    // Given
    // -----
    // - dynamic_regression and local_trend with one covariate.
    //
    // Expect
    // ------
    // - `Ok([DynamicRegressionWithTrend])`.
    fn dynamic_regression_with_trend_warns() {
        let spec =
            ModelSpec { dynamic_regression: true, local_trend: true, ..ModelSpec::default() };
        assert_eq!(spec.validate(1), Ok(vec![SpecWarning::DynamicRegressionWithTrend]));
    }

    #[test]
    // Purpose
    // -------
    // Only non-default fields that disagree with the model are conflicts.
    //
    // Given
    // -----
    // - A level + weekly seasonal model; spec with nseasons = 7 (agrees),
    //   local_trend = true and estimation = Mcmc (disagree).
    //
    // Expect
    // ------
    // - ["local_trend", "estimation"].
    fn conflicts_list_disagreeing_fields() {
        let structure = ModelStructure::new(vec![
            Component::LocalLevel,
            Component::Seasonal { nseasons: 7, season_duration: 1 },
        ])
        .unwrap();
        let spec = ModelSpec {
            nseasons: 7,
            local_trend: true,
            estimation: Estimation::Mcmc,
            ..ModelSpec::default()
        };

        assert_eq!(spec.conflicts_with(&structure), vec!["local_trend", "estimation"]);
        assert!(ModelSpec::default().conflicts_with(&structure).is_empty());
    }

    #[test]
    // Purpose
    // -------
    // Estimation names parse case-insensitively.
    //
    // Given
    // -----
    // - "MCMC", "mle", "bayes".
    //
    // Expect
    // ------
    // - Mcmc, MaximumLikelihood, and an `InvalidEstimation` error.
    fn estimation_parses_names() {
        assert_eq!("MCMC".parse::<Estimation>(), Ok(Estimation::Mcmc));
        assert_eq!("mle".parse::<Estimation>(), Ok(Estimation::MaximumLikelihood));
        assert!("bayes".parse::<Estimation>().is_err());
    }
}
