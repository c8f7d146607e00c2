//! Structural time-series model: posterior objective, point fit, and the
//! immutable fitted model.
//!
//! Purpose
//! -------
//! Wire a `ModelStructure` and pre-period data to the optimizer's
//! [`LogLikelihood`] trait. The objective is the Kalman log-likelihood plus
//! the variance and coefficient log-priors, maximized in unconstrained
//! `θ`-space.
//!
//! Key behaviors
//! -------------
//! - [`StructuralModel::new`] fits an OLS regression on the pre-period for
//!   starting values, builds the initial state and priors, and returns the
//!   owned [`EstimationData`] the optimizer evaluates against.
//! - [`StructuralModel::fit_mle`] runs L-BFGS from the OLS start; on failure
//!   or non-convergence it retries once from `θ₀ + 0.5·N(0, I)` drawn from a
//!   seeded RNG, then gives up with `ImpactError::Convergence`.
//! - Standard errors and the proposal covariance come from the
//!   finite-difference observed information of the objective.
//! - [`FittedModel`] bundles structure, point parameters, optional posterior
//!   draws, and fit diagnostics; [`FittedModel::from_parts`] is the
//!   constructor for caller-supplied models.
//!
//! Invariants & assumptions
//! ------------------------
//! - [`EstimationData`] holds the pre-period only, on the model scale.
//! - The first `diffuse_dim` observed steps are excluded from the
//!   likelihood.
//!
//! Conventions
//! -----------
//! - Optimizer-facing errors are `OptError`; everything returned to callers
//!   of this module is `ImpactError`.
use crate::{
    impact::{
        core::{
            components::{Component, ModelStructure},
            params::{ParamLayout, ParamPriors, StructuralParams, log_jacobian},
            regression::ols,
            spec::Estimation,
            standardize::Standardizer,
            state_space::{InitialState, StateSpace},
        },
        errors::{ImpactError, ImpactResult, SpecResult},
        filter::kalman::log_likelihood,
    },
    inference::{calc_covariance, calc_standard_errors},
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{
            Cost, Grad, LogLikelihood, MLEOptions, OptimOutcome, Theta, adapter::ArgMinAdapter,
            maximize,
        },
    },
};
use argmin::core::Gradient;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;
use tracing::{debug, info, warn};

/// Standard deviation of the perturbation applied before the retry.
pub const RETRY_PERTURBATION_SD: f64 = 0.5;

/// Pre-period response and covariates on the model scale.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationData {
    pub y: Array1<f64>,
    pub x: Array2<f64>,
}

/// Posterior objective for one model structure over one pre-period.
#[derive(Debug, Clone)]
pub struct StructuralModel {
    structure: ModelStructure,
    layout: ParamLayout,
    priors: ParamPriors,
    init: InitialState,
    start: StructuralParams,
}

impl StructuralModel {
    /// Build the objective from pre-period data.
    ///
    /// Parameters
    /// ----------
    /// - `structure`: validated components.
    /// - `prior_level_sd`: level sd guess in response sds.
    /// - `y_pre`, `x_pre`: pre-period response (model scale, `NaN` allowed)
    ///   and covariate rows.
    ///
    /// Errors
    /// ------
    /// - `SpecificationError::InvalidParameter` when a prior cannot be built.
    pub fn new(
        structure: ModelStructure, prior_level_sd: f64, y_pre: ArrayView1<f64>,
        x_pre: ArrayView2<f64>,
    ) -> SpecResult<(Self, EstimationData)> {
        let fit = ols(y_pre, x_pre);
        let init = InitialState::new(&structure, &fit, x_pre);
        let sd_y = fit.response_variance.sqrt();
        let sd_x: Vec<f64> = x_pre.columns().into_iter().map(|c| Standardizer::fit(c).sd).collect();
        let priors = ParamPriors::new(&structure, prior_level_sd, sd_y, &sd_x)?;

        let static_coefs =
            if structure.n_static() > 0 { fit.coefs.clone() } else { Array1::zeros(0) };
        let start = StructuralParams::new(
            fit.residual_variance,
            Array1::from_vec(priors.state_guesses().to_vec()),
            static_coefs,
        )?;

        let layout = ParamLayout::from_structure(&structure);
        let data = EstimationData { y: y_pre.to_owned(), x: x_pre.to_owned() };
        Ok((Self { structure, layout, priors, init, start }, data))
    }

    pub fn structure(&self) -> &ModelStructure {
        &self.structure
    }

    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    pub fn initial_state(&self) -> &InitialState {
        &self.init
    }

    /// Starting point: OLS coefficients and residual variance, prior guesses
    /// for the state variances.
    pub fn start_theta(&self) -> Theta {
        self.start.to_theta()
    }

    pub fn params(&self, theta: &Theta) -> StructuralParams {
        StructuralParams::from_theta(theta, &self.layout)
    }

    /// Log-likelihood plus log-prior at `θ`.
    pub fn log_posterior(&self, theta: &Theta, data: &EstimationData) -> ImpactResult<f64> {
        let params = self.params(theta);
        let ss = StateSpace::new(&self.structure, &params, data.x.view(), &self.init);
        let ll = log_likelihood(&ss, data.y.view(), self.structure.diffuse_dim())?;
        Ok(ll + self.priors.log_density(&params))
    }

    /// Log-density of `θ` itself: [`Self::log_posterior`] plus the softplus
    /// Jacobian.
    pub fn log_target(&self, theta: &Theta, data: &EstimationData) -> ImpactResult<f64> {
        Ok(self.log_posterior(theta, data)? + log_jacobian(theta, &self.layout))
    }

    /// Posterior mode by L-BFGS with one perturbed restart.
    ///
    /// Errors
    /// ------
    /// - `ImpactError::Optimization` for optimizer configuration errors
    ///   (never retried).
    /// - `ImpactError::NumericalInstability` when the restart hits a
    ///   degenerate filter step.
    /// - `ImpactError::Convergence { attempts: 2, .. }` otherwise.
    pub fn fit_mle(
        &self, data: &EstimationData, opts: &MLEOptions, seed: u64,
    ) -> ImpactResult<MleFit> {
        let theta0 = self.start_theta();
        let first = maximize(self, theta0.clone(), data, opts);
        let reason = match first {
            Ok(outcome) if outcome.converged => return Ok(MleFit { outcome, attempts: 1 }),
            Ok(outcome) => outcome.status,
            Err(e) if is_configuration_error(&e) => return Err(e.into()),
            Err(e) => e.to_string(),
        };
        warn!(reason = %reason, "optimizer did not converge; retrying from a perturbed start");

        let mut rng = StdRng::seed_from_u64(seed);
        let theta1 = theta0.mapv(|t| {
            t + RETRY_PERTURBATION_SD * rng.sample::<f64, _>(StandardNormal)
        });
        match maximize(self, theta1.clone(), data, opts) {
            Ok(outcome) if outcome.converged => Ok(MleFit { outcome, attempts: 2 }),
            Ok(outcome) => Err(ImpactError::Convergence {
                attempts: 2,
                status: outcome.status,
                theta: outcome.theta_hat.to_vec(),
            }),
            Err(OptError::NumericalInstability { t, value }) => {
                Err(ImpactError::NumericalInstability { t, value })
            }
            Err(e) => Err(ImpactError::Convergence {
                attempts: 2,
                status: e.to_string(),
                theta: theta1.to_vec(),
            }),
        }
    }

    /// Gradient of the negative objective by finite differences; failed
    /// evaluations show up as `NaN` entries.
    fn neg_gradient<'a>(&'a self, data: &'a EstimationData) -> impl Fn(&Theta) -> Grad + 'a {
        let problem = ArgMinAdapter::new(self, data);
        move |theta: &Theta| {
            problem.gradient(theta).unwrap_or_else(|_| Array1::from_elem(theta.len(), f64::NAN))
        }
    }

    /// Standard errors of `θ̂` from the observed information, if available.
    pub fn std_errors(&self, data: &EstimationData, theta: &Theta) -> Option<Array1<f64>> {
        match calc_standard_errors(&self.neg_gradient(data), theta) {
            Ok(se) => Some(se),
            Err(e) => {
                debug!(error = %e, "standard errors unavailable");
                None
            }
        }
    }

    /// Pseudo-inverse of the observed information at `θ`, if available.
    pub fn covariance(&self, data: &EstimationData, theta: &Theta) -> Option<Array2<f64>> {
        match calc_covariance(&self.neg_gradient(data), theta) {
            Ok(cov) => Some(cov),
            Err(e) => {
                debug!(error = %e, "observed information unavailable");
                None
            }
        }
    }
}

impl LogLikelihood for StructuralModel {
    type Data = EstimationData;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost> {
        Ok(self.log_posterior(theta, data)?)
    }

    fn check(&self, theta: &Theta, _data: &Self::Data) -> OptResult<()> {
        if theta.len() != self.layout.len() {
            return Err(OptError::ThetaLengthMismatch {
                expected: self.layout.len(),
                actual: theta.len(),
            });
        }
        if let Some((index, &value)) = theta.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(OptError::InvalidThetaInput { index, value });
        }
        Ok(())
    }
}

fn is_configuration_error(e: &OptError) -> bool {
    matches!(
        e,
        OptError::InvalidTolGrad { .. }
            | OptError::InvalidTolCost { .. }
            | OptError::InvalidTolF { .. }
            | OptError::InvalidMaxIter { .. }
            | OptError::NoTolerancesProvided
            | OptError::InvalidLineSearch { .. }
            | OptError::InvalidLBFGSMem { .. }
            | OptError::ThetaLengthMismatch { .. }
            | OptError::InvalidThetaInput { .. }
    )
}

/// Successful point fit.
#[derive(Debug, Clone, PartialEq)]
pub struct MleFit {
    pub outcome: OptimOutcome,
    pub attempts: usize,
}

/// How a [`FittedModel`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMethod {
    MaximumLikelihood,
    Mcmc,
    Custom,
}

impl From<Estimation> for FitMethod {
    fn from(e: Estimation) -> Self {
        match e {
            Estimation::MaximumLikelihood => FitMethod::MaximumLikelihood,
            Estimation::Mcmc => FitMethod::Mcmc,
        }
    }
}

/// Fit diagnostics reported with the results.
///
/// - `objective`: log-posterior at the point estimate (`None` for custom
///   models).
/// - `std_errors`: θ-space standard errors in `param_names` order.
/// - `acceptance_rate`: MCMC only.
#[derive(Debug, Clone, PartialEq)]
pub struct FitDiagnostics {
    pub method: FitMethod,
    pub param_names: Vec<String>,
    pub objective: Option<f64>,
    pub converged: bool,
    pub attempts: usize,
    pub iterations: usize,
    pub std_errors: Option<Array1<f64>>,
    pub acceptance_rate: Option<f64>,
}

/// Immutable estimated (or supplied) model.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    structure: ModelStructure,
    params: StructuralParams,
    draws: Option<Vec<StructuralParams>>,
    diagnostics: FitDiagnostics,
}

impl FittedModel {
    /// Model from explicit components and parameters.
    ///
    /// Errors
    /// ------
    /// - Component errors from `ModelStructure::new`.
    /// - `ParamLengthMismatch` when `params` does not fit the components.
    pub fn from_parts(components: Vec<Component>, params: StructuralParams) -> SpecResult<Self> {
        let structure = ModelStructure::new(components)?;
        params.check_layout(&structure)?;
        let diagnostics = FitDiagnostics {
            method: FitMethod::Custom,
            param_names: structure.param_names(),
            objective: None,
            converged: true,
            attempts: 0,
            iterations: 0,
            std_errors: None,
            acceptance_rate: None,
        };
        Ok(Self { structure, params, draws: None, diagnostics })
    }

    pub(crate) fn from_estimate(
        structure: ModelStructure, params: StructuralParams, draws: Option<Vec<StructuralParams>>,
        diagnostics: FitDiagnostics,
    ) -> Self {
        info!(
            method = ?diagnostics.method,
            attempts = diagnostics.attempts,
            objective = ?diagnostics.objective,
            "model fitted"
        );
        Self { structure, params, draws, diagnostics }
    }

    pub fn structure(&self) -> &ModelStructure {
        &self.structure
    }

    /// Point estimate (posterior mean of θ under MCMC).
    pub fn params(&self) -> &StructuralParams {
        &self.params
    }

    /// Posterior draws, MCMC only.
    pub fn draws(&self) -> Option<&[StructuralParams]> {
        self.draws.as_deref()
    }

    pub fn diagnostics(&self) -> &FitDiagnostics {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::loglik_optimizer::Tolerances;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - θ checks before optimization.
    // - A point fit on a short level + regression series.
    // - The perturbed retry and the convergence error it ends in.
    // - `FittedModel::from_parts` validation.
    //
    // They intentionally DO NOT cover:
    // - End-to-end effect estimation (see tests/integration_impact_pipeline.rs).
    // -------------------------------------------------------------------------

    fn toy_data(n: usize) -> (Array1<f64>, Array2<f64>) {
        let x = Array2::from_shape_fn((n, 1), |(i, _)| ((i as f64) * 0.7).sin());
        let y = Array1::from_shape_fn(n, |i| {
            1.0 + 2.0 * x[[i, 0]] + 0.1 * ((i as f64) * 1.3).cos()
        });
        (y, x)
    }

    fn level_regression() -> ModelStructure {
        ModelStructure::new(vec![
            Component::LocalLevel,
            Component::StaticRegression { n_covariates: 1 },
        ])
        .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // θ of the wrong length or with non-finite entries is rejected.
    //
    // Given
    // -----
    // - A level + regression model (θ has three entries).
    //
    // Expect
    // ------
    // - `ThetaLengthMismatch` and `InvalidThetaInput`.
    fn check_rejects_bad_theta() {
        let (y, x) = toy_data(30);
        let (model, data) =
            StructuralModel::new(level_regression(), 0.01, y.view(), x.view()).unwrap();

        assert_eq!(
            model.check(&array![0.0, 0.0], &data),
            Err(OptError::ThetaLengthMismatch { expected: 3, actual: 2 })
        );
        assert!(matches!(
            model.check(&array![0.0, f64::NAN, 0.0], &data),
            Err(OptError::InvalidThetaInput { index: 1, .. })
        ));
        assert!(model.check(&model.start_theta(), &data).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // The point fit converges and improves on the start.
    //
    // Given
    // -----
    // - y = 1 + 2 x + small noise, 60 points.
    //
    // Expect
    // ------
    // - Convergence, objective ≥ start objective, β̂ ≈ 2.
    fn fit_mle_recovers_regression_coefficient() {
        let (y, x) = toy_data(60);
        let (model, data) =
            StructuralModel::new(level_regression(), 0.01, y.view(), x.view()).unwrap();
        let opts = MLEOptions {
            tols: Tolerances::new(Some(1e-6), Some(1e-10), Some(300)).unwrap(),
            ..MLEOptions::default()
        };
        let start = model.log_posterior(&model.start_theta(), &data).unwrap();

        let fit = model.fit_mle(&data, &opts, 11).unwrap();

        assert!(fit.outcome.value >= start - 1e-8);
        let beta = model.params(&fit.outcome.theta_hat).static_coefs[0];
        assert!((beta - 2.0).abs() < 0.2, "beta = {beta}");
    }

    #[test]
    // Purpose
    // -------
    // A fit that cannot converge is retried once and then reported with the
    // parameters it stopped at.
    //
    // Given
    // -----
    // - The 60-point level + regression series, one L-BFGS iteration allowed
    //   and tolerances too tight to meet in one step.
    //
    // Expect
    // ------
    // - `Convergence { attempts: 2, .. }` carrying a finite θ of length 3.
    fn unconverged_fit_retries_once_then_fails() {
        let (y, x) = toy_data(60);
        let (model, data) =
            StructuralModel::new(level_regression(), 0.01, y.view(), x.view()).unwrap();
        let opts = MLEOptions {
            tols: Tolerances::new(Some(1e-12), Some(1e-14), Some(1)).unwrap(),
            ..MLEOptions::default()
        };

        match model.fit_mle(&data, &opts, 3) {
            Err(ImpactError::Convergence { attempts, theta, .. }) => {
                assert_eq!(attempts, 2);
                assert_eq!(theta.len(), 3);
                assert!(theta.iter().all(|v| v.is_finite()), "{theta:?}");
            }
            other => panic!("expected a convergence failure, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // `from_parts` validates parameters against the components.
    //
    // Given
    // -----
    // - Level + static(1) with zero coefficients supplied.
    //
    // Expect
    // ------
    // - `ParamLengthMismatch`; a correct list yields a Custom model.
    fn from_parts_checks_layout() {
        let components =
            vec![Component::LocalLevel, Component::StaticRegression { n_covariates: 1 }];
        let short = StructuralParams::new(1.0, array![0.1], array![]).unwrap();
        assert!(FittedModel::from_parts(components.clone(), short).is_err());

        let ok = StructuralParams::new(1.0, array![0.1], array![0.5]).unwrap();
        let model = FittedModel::from_parts(components, ok).unwrap();
        assert_eq!(model.diagnostics().method, FitMethod::Custom);
        assert!(model.draws().is_none());
    }
}
