//! End-to-end causal impact analysis.
//!
//! Purpose
//! -------
//! Tie the stack together: validated data and periods go in, a fitted
//! structural model, posterior-predictive counterfactuals for the
//! post-period, effect distributions, and the presentation outputs come
//! out.
//!
//! Key behaviors
//! -------------
//! - [`CausalImpact::new`] validates the model specification and data, prepares the
//!   model-scale window, derives the component structure, and checks that
//!   the pre-period can identify the model. No fitting happens here.
//! - [`CausalImpact::from_custom_model`] accepts a caller-built
//!   [`FittedModel`] with raw pre/post data. Structural spec fields must not
//!   contradict the model, and no standardization is applied.
//! - [`CausalImpact::run`] estimates (unless custom), simulates `niter`
//!   counterfactual paths on the worker pool, undoes standardization,
//!   aggregates effects, and builds the inference table, summary, smoothed
//!   decomposition, and report inputs.
//!
//! Invariants & assumptions
//! ------------------------
//! - Under maximum likelihood every path shares the point estimate; under
//!   MCMC path `i` uses posterior draw `i`.
//! - Results depend only on inputs and `RunConfig::seed`, never on the
//!   number of workers.
//! - A cancelled run returns `ImpactError::Cancelled` and nothing else.
use crate::impact::{
    core::{
        components::ModelStructure,
        data::{ImpactData, Period, PreparedData},
        options::{RunConfig, chain_seed},
        regression::ols,
        spec::{Estimation, ModelSpec, SpecWarning},
        state_space::{InitialState, StateSpace},
    },
    errors::{ImpactResult, SpecificationError, ValidationError, ValidationResult},
    filter::{
        kalman::run_filter,
        smoother::{ComponentDecomposition, StateTrajectory, smooth},
    },
    models::{
        mcmc::run_metropolis,
        structural::{FitDiagnostics, FittedModel, StructuralModel},
    },
    posterior::{
        effects::EffectEstimate,
        pool::DrawPool,
        simulate::{TerminalState, simulate_path},
    },
    report::{
        inferences::Inferences,
        narrative::verbal_report,
        panels::{Panel, build_panels, parse_panels},
        summary::ImpactSummary,
    },
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};
use tracing::info;

/// Raw data for a caller-supplied model.
///
/// - `pre_response`: pre-period response (`NaN` allowed).
/// - `covariates`: `(m + n_post) × k` covariates spanning both periods, or
///   `None` when the model has no regression.
/// - `post_response`: observed post-period response.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomModelInput {
    pub pre_response: Array1<f64>,
    pub covariates: Option<Array2<f64>>,
    pub post_response: Array1<f64>,
}

/// A validated analysis, ready to [`run`](CausalImpact::run).
#[derive(Debug, Clone)]
pub struct CausalImpact {
    spec: ModelSpec,
    structure: ModelStructure,
    prepared: PreparedData,
    custom: Option<FittedModel>,
    warnings: Vec<SpecWarning>,
}

impl CausalImpact {
    /// Analysis that estimates its own model.
    ///
    /// Errors
    /// ------
    /// - `ImpactError::Specification` for invalid settings.
    /// - `ImpactError::Validation` for period/data problems, including
    ///   `InsufficientPreData` when the observed pre-period count does not
    ///   exceed the diffuse states plus estimated parameters.
    pub fn new(
        data: &ImpactData, pre: Period, post: Period, spec: ModelSpec,
    ) -> ImpactResult<Self> {
        let warnings = spec.validate(data.n_covariates())?;
        let prepared = data.prepare(&pre, &post, spec.standardize_data)?;
        let structure = ModelStructure::from_spec(&spec, prepared.n_covariates())?;

        let observed = prepared.n_pre_observed();
        let required = structure.diffuse_dim() + structure.n_params() + 1;
        if observed < required {
            return Err(ValidationError::InsufficientPreData { observed, required }.into());
        }

        Ok(Self { spec, structure, prepared, custom: None, warnings })
    }

    /// Analysis over a caller-supplied model on the raw data scale.
    ///
    /// Errors
    /// ------
    /// - `SpecificationError::ConflictsWithCustomModel` listing every
    ///   structural field of `spec` that contradicts `model`.
    /// - `ValidationError::CovariateCountMismatch` when the covariate count
    ///   differs from the model's regression block.
    /// - Other validation errors as in [`CausalImpact::new`].
    pub fn from_custom_model(
        model: FittedModel, input: CustomModelInput, spec: ModelSpec,
    ) -> ImpactResult<Self> {
        let structure = model.structure().clone();
        let warnings = spec.validate(structure.n_covariates())?;
        let fields = spec.conflicts_with(&structure);
        if !fields.is_empty() {
            return Err(SpecificationError::ConflictsWithCustomModel { fields }.into());
        }

        let m = input.pre_response.len();
        let n_post = input.post_response.len();
        if m == 0 {
            return Err(ValidationError::EmptyPeriod { period: "pre" }.into());
        }
        if n_post == 0 {
            return Err(ValidationError::EmptyPeriod { period: "post" }.into());
        }
        let found = input.covariates.as_ref().map_or(0, |x| x.ncols());
        if found != structure.n_covariates() {
            return Err(ValidationError::CovariateCountMismatch {
                expected: structure.n_covariates(),
                found,
            }
            .into());
        }

        let response: Array1<f64> =
            input.pre_response.iter().chain(input.post_response.iter()).copied().collect();
        let data = ImpactData::new(response, input.covariates, None)?;
        let prepared =
            data.prepare(&Period::indices(0, m - 1), &Period::indices(m, m + n_post - 1), false)?;

        Ok(Self { spec, structure, prepared, custom: Some(model), warnings })
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn structure(&self) -> &ModelStructure {
        &self.structure
    }

    pub fn prepared(&self) -> &PreparedData {
        &self.prepared
    }

    pub fn warnings(&self) -> &[SpecWarning] {
        &self.warnings
    }

    /// Fit (or adopt) the model, simulate counterfactuals, and summarize.
    ///
    /// Errors
    /// ------
    /// - `Cancelled`, `Convergence`, `Sampling`, `NumericalInstability`,
    ///   `WorkerPool`. Instability indices are positions in the caller's
    ///   series.
    pub fn run(&self, cfg: &RunConfig) -> ImpactResult<ImpactResults> {
        self.run_window(cfg).map_err(|e| e.offset_time(self.prepared.window_start))
    }

    fn run_window(&self, cfg: &RunConfig) -> ImpactResult<ImpactResults> {
        cfg.cancel.check()?;
        let prep = &self.prepared;
        let pool = DrawPool::new(cfg)?;
        info!(
            n = prep.len(),
            pre = prep.pre.len(),
            post = prep.post.len(),
            estimation = %self.spec.estimation,
            custom = self.custom.is_some(),
            standardized = !prep.scaler.is_identity(),
            niter = self.spec.niter,
            seed = cfg.seed,
            workers = pool.n_workers(),
            "causal impact run started"
        );

        let y_pre = prep.y.slice(s![prep.pre.clone()]);
        let x_pre = prep.x.slice(s![prep.pre.clone(), ..]);

        let (fitted, init) = match &self.custom {
            Some(model) => {
                let fit = ols(y_pre, x_pre);
                (model.clone(), InitialState::new(model.structure(), &fit, x_pre))
            }
            None => self.estimate(y_pre, x_pre, cfg)?,
        };
        let structure = fitted.structure();
        let x_all = prep.x.view();

        let point = StateSpace::new(structure, fitted.params(), x_all, &init);
        let filtered = run_filter(&point, prep.y.view(), structure.diffuse_dim(), true)?;

        let niter = self.spec.niter;
        let paths: Vec<Array1<f64>> = match fitted.draws() {
            Some(draws) if !draws.is_empty() => pool.map_draws(niter, |i, rng| {
                let ss = StateSpace::new(structure, &draws[i % draws.len()], x_all, &init);
                let start = TerminalState::from_filter(&ss, y_pre)?;
                Ok(simulate_path(&ss, &start, rng))
            })?,
            _ => {
                let start = TerminalState::from_filter(&point, y_pre)?;
                pool.map_draws(niter, |_, rng| Ok(simulate_path(&point, &start, rng)))?
            }
        };

        let scaler = &prep.scaler.response;
        let offset = prep.post.start - prep.pre.end;
        let predictions = Array2::from_shape_fn((niter, prep.post.len()), |(i, k)| {
            scaler.inverse(paths[i][offset + k])
        });
        let effect =
            EffectEstimate::from_draws(prep.post_actual().view(), &predictions, self.spec.alpha);

        let smoothed = smooth(&point, &filtered);
        let decomposition = ComponentDecomposition::from_trajectory(structure, &point, &smoothed)
            .to_original_scale(scaler);
        let inferences =
            Inferences::build(prep, &filtered.forecast_mean, &filtered.forecast_var, &effect);
        let summary = ImpactSummary::from_effect(&effect);

        info!(
            average_effect = summary.average.absolute.mean,
            cumulative_effect = summary.cumulative.absolute.mean,
            p_value = summary.p_value,
            "causal impact run finished"
        );

        Ok(ImpactResults {
            intervention_index: prep.window_start + prep.post.start,
            inferences,
            effect,
            summary,
            fitted,
            smoothed,
            decomposition,
            warnings: self.warnings.clone(),
        })
    }

    fn estimate(
        &self, y_pre: ArrayView1<f64>, x_pre: ArrayView2<f64>, cfg: &RunConfig,
    ) -> ImpactResult<(FittedModel, InitialState)> {
        let (model, data) =
            StructuralModel::new(self.structure.clone(), self.spec.prior_level_sd, y_pre, x_pre)?;
        let seed = chain_seed(cfg.seed);
        let mle = model.fit_mle(&data, &cfg.mle_opts, seed)?;
        let theta_hat = &mle.outcome.theta_hat;

        let mut diagnostics = FitDiagnostics {
            method: self.spec.estimation.into(),
            param_names: self.structure.param_names(),
            objective: Some(mle.outcome.value),
            converged: mle.outcome.converged,
            attempts: mle.attempts,
            iterations: mle.outcome.iterations,
            std_errors: model.std_errors(&data, theta_hat),
            acceptance_rate: None,
        };

        let fitted = match self.spec.estimation {
            Estimation::MaximumLikelihood => FittedModel::from_estimate(
                self.structure.clone(),
                model.params(theta_hat),
                None,
                diagnostics,
            ),
            Estimation::Mcmc => {
                let chain = run_metropolis(
                    &model,
                    &data,
                    theta_hat,
                    self.spec.niter,
                    &cfg.mcmc_opts,
                    seed,
                    &cfg.cancel,
                )?;
                let mean = chain.mean();
                diagnostics.acceptance_rate = Some(chain.acceptance_rate);
                diagnostics.objective = model.log_posterior(&mean, &data).ok();
                let draws = chain.draws.iter().map(|theta| model.params(theta)).collect();
                FittedModel::from_estimate(
                    self.structure.clone(),
                    model.params(&mean),
                    Some(draws),
                    diagnostics,
                )
            }
        };
        Ok((fitted, model.initial_state().clone()))
    }
}

/// Everything a run produces.
///
/// - `smoothed`: smoothed states at the point estimate, model scale.
/// - `decomposition`: smoothed components, original scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactResults {
    pub inferences: Inferences,
    pub effect: EffectEstimate,
    pub summary: ImpactSummary,
    pub fitted: FittedModel,
    pub smoothed: StateTrajectory,
    pub decomposition: ComponentDecomposition,
    pub warnings: Vec<SpecWarning>,
    intervention_index: usize,
}

impl ImpactResults {
    /// Natural-language report of the summary.
    pub fn report(&self) -> String {
        verbal_report(&self.summary)
    }

    /// Series index of the first post-period point.
    pub fn intervention_index(&self) -> usize {
        self.intervention_index
    }

    /// Plot panels by name; an empty selection gives all three.
    ///
    /// Errors
    /// ------
    /// - `ValidationError::UnknownPanel`.
    pub fn panels<S: AsRef<str>>(&self, names: &[S]) -> ValidationResult<Vec<Panel>> {
        let kinds = parse_panels(names)?;
        Ok(build_panels(&self.inferences, &kinds, self.intervention_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impact::{
        core::{components::Component, params::StructuralParams},
        errors::ImpactError,
    };
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction-time checks (pre-period length, custom-model conflicts,
    //   covariate count).
    // - A custom-model run end to end on the raw scale.
    // - Filter failures reported at series positions when the window starts
    //   after index 0.
    //
    // They intentionally DO NOT cover:
    // - Estimated-model scenarios (see tests/integration_impact_pipeline.rs).
    // -------------------------------------------------------------------------

    fn custom_level_model() -> FittedModel {
        let params = StructuralParams::new(0.25, array![0.01], array![]).unwrap();
        FittedModel::from_parts(vec![Component::LocalLevel], params).unwrap()
    }

    fn wavy(n: usize, base: f64) -> Array1<f64> {
        Array1::from_shape_fn(n, |i| base + 0.3 * ((i as f64) * 1.1).sin())
    }

    #[test]
    // Purpose
    // -------
    // A pre-period that cannot identify the model is rejected.
    //
    // Given
    // -----
    // - Level + static(2): 1 diffuse state and 4 parameters; 5 pre points.
    //
    // Expect
    // ------
    // - `InsufficientPreData { observed: 5, required: 6 }`.
    fn short_pre_period_is_rejected() {
        let x = Array2::from_shape_fn((8, 2), |(i, j)| ((i + 3 * j) as f64).sin());
        let data = ImpactData::new(wavy(8, 5.0), Some(x), None).unwrap();

        let err = CausalImpact::new(
            &data,
            Period::indices(0, 4),
            Period::indices(5, 7),
            ModelSpec::default(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            ImpactError::Validation(ValidationError::InsufficientPreData {
                observed: 5,
                required: 6,
            })
        );
    }

    #[test]
    // Purpose
    // -------
    // Structural spec fields that contradict a custom model are listed.
    //
    // Given
    // -----
    // - A level-only model with `nseasons = 7` and `local_trend = true`.
    //
    // Expect
    // ------
    // - `ConflictsWithCustomModel` naming both fields.
    fn custom_model_conflicts_are_reported() {
        let spec = ModelSpec { nseasons: 7, local_trend: true, ..ModelSpec::default() };
        let input = CustomModelInput {
            pre_response: wavy(20, 1.0),
            covariates: None,
            post_response: wavy(5, 1.0),
        };

        let err = CausalImpact::from_custom_model(custom_level_model(), input, spec).unwrap_err();

        assert_eq!(
            err,
            ImpactError::Specification(SpecificationError::ConflictsWithCustomModel {
                fields: vec!["nseasons", "local_trend"],
            })
        );
    }

    #[test]
    // Purpose
    // -------
    // Covariates must match the model's regression block.
    //
    // Given
    // -----
    // - A level-only model with one covariate column supplied.
    //
    // Expect
    // ------
    // - `CovariateCountMismatch { expected: 0, found: 1 }`.
    fn custom_model_covariate_count_is_checked() {
        let input = CustomModelInput {
            pre_response: wavy(20, 1.0),
            covariates: Some(Array2::ones((25, 1))),
            post_response: wavy(5, 1.0),
        };

        let err =
            CausalImpact::from_custom_model(custom_level_model(), input, ModelSpec::default())
                .unwrap_err();

        assert_eq!(
            err,
            ImpactError::Validation(ValidationError::CovariateCountMismatch {
                expected: 0,
                found: 1,
            })
        );
    }

    #[test]
    // Purpose
    // -------
    // A custom model runs on the raw scale and detects a level shift.
    //
    // Given
    // -----
    // - Level model, 40 pre points around 1, 10 post points around 4,
    //   niter = 200.
    //
    // Expect
    // ------
    // - Average effect near 3 with an interval above zero; one inference row
    //   per point; the fitted model is the one supplied.
    fn custom_model_run_detects_shift() {
        let input = CustomModelInput {
            pre_response: wavy(40, 1.0),
            covariates: None,
            post_response: wavy(10, 4.0),
        };
        let spec = ModelSpec { niter: 200, ..ModelSpec::default() };
        let model = custom_level_model();
        let analysis = CausalImpact::from_custom_model(model.clone(), input, spec).unwrap();

        let results = analysis.run(&RunConfig::default().with_seed(3)).unwrap();

        assert_eq!(results.inferences.len(), 50);
        assert_eq!(results.fitted, model);
        assert_eq!(results.intervention_index(), 40);
        let avg = results.summary.average.absolute;
        assert!((avg.mean - 3.0).abs() < 0.5, "average effect {}", avg.mean);
        assert!(avg.lower > 0.0);
        assert!(results.report().contains("statistically significant"));
    }

    #[test]
    // Purpose
    // -------
    // A degenerate filter step is reported at its position in the caller's
    // series, not in the analysis window.
    //
    // Given
    // -----
    // - 30 points, pre-period 5..=24, post-period 25..=29.
    // - A level model with no level noise and observation variance 1e-20, so
    //   the second window step (series index 6) has a vanishing innovation
    //   variance.
    //
    // Expect
    // ------
    // - `NumericalInstability { t: 6, .. }`.
    fn instability_index_points_into_caller_series() {
        let params = StructuralParams::new(1e-20, array![0.0], array![]).unwrap();
        let model = FittedModel::from_parts(vec![Component::LocalLevel], params).unwrap();
        let data = ImpactData::new(wavy(30, 1.0), None, None).unwrap();
        let prepared =
            data.prepare(&Period::indices(5, 24), &Period::indices(25, 29), false).unwrap();
        assert_eq!(prepared.window_start, 5);
        let analysis = CausalImpact {
            spec: ModelSpec { niter: 10, ..ModelSpec::default() },
            structure: model.structure().clone(),
            prepared,
            custom: Some(model),
            warnings: Vec::new(),
        };

        let err = analysis.run(&RunConfig::default()).unwrap_err();

        assert!(matches!(err, ImpactError::NumericalInstability { t: 6, .. }), "{err:?}");
    }
}
