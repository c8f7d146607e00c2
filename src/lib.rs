//! rust_causal_impact — Bayesian structural time-series causal impact
//! analysis with optional Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes the analysis to Python via the `_rust_causal_impact` extension
//! module. When the `python-bindings` feature is enabled, this module defines
//! the Python-facing class and submodule used by the `rust_causal_impact`
//! package.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`impact`, `optimization`, `inference`)
//!   as the public crate surface.
//! - Define a `#[pyclass]` wrapper around [`impact::CausalImpact`] and the
//!   `#[pymodule]` initializer for the `_rust_causal_impact` extension.
//! - Register the `analysis` submodule under `rust_causal_impact` so that
//!   dot-notation imports work as expected.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in the inner Rust modules; this file performs
//!   only FFI glue, input conversion, and error mapping.
//! - Long-running work releases the GIL; the worker pool never touches
//!   Python objects.
//!
//! Conventions
//! -----------
//! - Python periods are inclusive `(start, end)` positions.
//! - Errors from core Rust code are converted to `PyErr` at the boundary:
//!   validation and specification problems become `ValueError`, everything
//!   else `RuntimeError`.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend on [`impact`] (or its prelude) and can
//!   ignore the PyO3 items guarded by the `python-bindings` feature.
//!
//! Testing notes
//! -------------
//! - Core behavior is covered by unit tests in the inner modules and by
//!   `tests/integration_impact_pipeline.rs`.

pub mod impact;
pub mod inference;
pub mod optimization;
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::PyValueError,
    prelude::*,
    types::{PyAny, PyDict},
};

#[cfg(feature = "python-bindings")]
use crate::{
    impact::{
        CausalImpact, ImpactData, ImpactResults, InferenceRow, ModelSpec, Period,
        errors::ImpactError,
        report::Panel,
    },
    utils::{extract_matrix, extract_mle_opts, extract_run_config, extract_series},
};

/// CausalImpact — Python-facing wrapper for one causal impact analysis.
///
/// Constructed from Python via
/// `CausalImpact(response, pre_period, post_period, covariates=None, ...)`
/// with the model settings as keyword arguments (defaults match
/// [`ModelSpec::default`]). Validation happens at construction; `run()`
/// performs the fit and caches the results for the accessors.
#[cfg(feature = "python-bindings")]
#[pyclass(name = "CausalImpact", module = "rust_causal_impact.analysis")]
pub struct PyCausalImpact {
    inner: CausalImpact,
    results: Option<ImpactResults>,
}

#[cfg(feature = "python-bindings")]
impl PyCausalImpact {
    fn results_ref(&self) -> PyResult<&ImpactResults> {
        self.results
            .as_ref()
            .ok_or_else(|| PyValueError::new_err("run() must be called before reading results"))
    }
}

#[cfg(feature = "python-bindings")]
fn panel_dict<'py>(py: Python<'py>, panel: &Panel) -> PyResult<Bound<'py, PyDict>> {
    let d = PyDict::new(py);
    d.set_item("kind", panel.kind.name())?;
    d.set_item("index", panel.index.clone())?;
    d.set_item("observed", panel.observed.clone())?;
    d.set_item("center", panel.center.clone())?;
    d.set_item("lower", panel.lower.clone())?;
    d.set_item("upper", panel.upper.clone())?;
    d.set_item("intervention_index", panel.intervention_index)?;
    Ok(d)
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyCausalImpact {
    #[new]
    #[pyo3(
        signature = (
            response,
            pre_period,
            post_period,
            covariates = None,
            niter = 1000,
            standardize_data = true,
            prior_level_sd = 0.01,
            nseasons = 1,
            season_duration = 1,
            dynamic_regression = false,
            alpha = 0.05,
            local_trend = false,
            estimation = "mle",
        ),
        text_signature = "(response, pre_period, post_period, /, covariates=None, niter=1000, \
                          standardize_data=True, prior_level_sd=0.01, nseasons=1, \
                          season_duration=1, dynamic_regression=False, alpha=0.05, \
                          local_trend=False, estimation='mle')"
    )]
    pub fn new<'py>(
        py: Python<'py>, response: &Bound<'py, PyAny>, pre_period: (usize, usize),
        post_period: (usize, usize), covariates: Option<&Bound<'py, PyAny>>, niter: usize,
        standardize_data: bool, prior_level_sd: f64, nseasons: usize, season_duration: usize,
        dynamic_regression: bool, alpha: f64, local_trend: bool, estimation: &str,
    ) -> PyResult<Self> {
        let response = extract_series(py, response)?;
        let covariates = covariates.map(|c| extract_matrix(py, c)).transpose()?;
        let data = ImpactData::new(response, covariates, None).map_err(ImpactError::from)?;
        let spec = ModelSpec {
            niter,
            standardize_data,
            prior_level_sd,
            nseasons,
            season_duration,
            dynamic_regression,
            alpha,
            local_trend,
            estimation: estimation.parse().map_err(ImpactError::from)?,
        };
        let inner = CausalImpact::new(
            &data,
            Period::indices(pre_period.0, pre_period.1),
            Period::indices(post_period.0, post_period.1),
            spec,
        )?;
        Ok(Self { inner, results: None })
    }

    #[pyo3(
        signature = (
            seed = 0,
            max_workers = None,
            burn_in = None,
            tol_grad = None,
            tol_cost = None,
            max_iter = None,
            line_searcher = None,
            lbfgs_mem = None,
        ),
        text_signature = "(self, /, seed=0, max_workers=None, burn_in=None, tol_grad=None, \
                          tol_cost=None, max_iter=None, line_searcher=None, lbfgs_mem=None)"
    )]
    pub fn run(
        &mut self, py: Python<'_>, seed: u64, max_workers: Option<usize>, burn_in: Option<usize>,
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
        line_searcher: Option<&str>, lbfgs_mem: Option<usize>,
    ) -> PyResult<()> {
        let mle_opts = extract_mle_opts(tol_grad, tol_cost, max_iter, line_searcher, lbfgs_mem)?;
        let cfg = extract_run_config(seed, max_workers, mle_opts, burn_in)?;
        let inner = &self.inner;
        let results = py.allow_threads(|| inner.run(&cfg))?;
        self.results = Some(results);
        Ok(())
    }

    /// Fixed-schema summary table.
    pub fn summary(&self) -> PyResult<String> {
        Ok(self.results_ref()?.summary.to_string())
    }

    /// Natural-language report.
    pub fn report(&self) -> PyResult<String> {
        Ok(self.results_ref()?.report())
    }

    /// Inference table as a dict of equal-length columns.
    #[getter]
    pub fn inferences<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let table = &self.results_ref()?.inferences;
        let d = PyDict::new(py);
        d.set_item("index", table.rows().iter().map(|r| r.index).collect::<Vec<usize>>())?;
        let columns: [(&str, fn(&InferenceRow) -> f64); 11] = [
            ("actual", |r| r.actual),
            ("predicted", |r| r.predicted),
            ("predicted_sd", |r| r.predicted_sd),
            ("predicted_lower", |r| r.predicted_lower),
            ("predicted_upper", |r| r.predicted_upper),
            ("point_effect", |r| r.point_effect),
            ("point_effect_lower", |r| r.point_effect_lower),
            ("point_effect_upper", |r| r.point_effect_upper),
            ("cumulative_effect", |r| r.cumulative_effect),
            ("cumulative_effect_lower", |r| r.cumulative_effect_lower),
            ("cumulative_effect_upper", |r| r.cumulative_effect_upper),
        ];
        for (name, f) in columns {
            d.set_item(name, table.column(f).to_vec())?;
        }
        Ok(d)
    }

    #[getter]
    pub fn p_value(&self) -> PyResult<f64> {
        Ok(self.results_ref()?.summary.p_value)
    }

    #[getter]
    pub fn posterior_probability(&self) -> PyResult<f64> {
        Ok(self.results_ref()?.summary.posterior_probability)
    }

    /// `(mean, lower, upper)` of the average absolute effect.
    #[getter]
    pub fn average_effect(&self) -> PyResult<(f64, f64, f64)> {
        let e = self.results_ref()?.summary.average.absolute;
        Ok((e.mean, e.lower, e.upper))
    }

    /// `(mean, lower, upper)` of the cumulative absolute effect.
    #[getter]
    pub fn cumulative_effect(&self) -> PyResult<(f64, f64, f64)> {
        let e = self.results_ref()?.summary.cumulative.absolute;
        Ok((e.mean, e.lower, e.upper))
    }

    /// Fitted parameters by name (observation and state variances, then
    /// static coefficients).
    #[getter]
    pub fn params(&self) -> PyResult<Vec<(String, f64)>> {
        let fitted = &self.results_ref()?.fitted;
        let p = fitted.params();
        let values = std::iter::once(p.obs_variance)
            .chain(p.state_variances.iter().copied())
            .chain(p.static_coefs.iter().copied());
        Ok(fitted.diagnostics().param_names.iter().cloned().zip(values).collect())
    }

    /// Panel data for plotting; `None` or an empty list selects all panels.
    #[pyo3(signature = (panels = None), text_signature = "(self, /, panels=None)")]
    pub fn panels<'py>(
        &self, py: Python<'py>, panels: Option<Vec<String>>,
    ) -> PyResult<Vec<Bound<'py, PyDict>>> {
        let names = panels.unwrap_or_default();
        let built = self.results_ref()?.panels(&names).map_err(ImpactError::from)?;
        built.iter().map(|p| panel_dict(py, p)).collect()
    }
}

/// _rust_causal_impact — PyO3 module initializer for the Python extension.
///
/// Creates the `analysis` submodule, attaches it to the parent module, and
/// registers it in `sys.modules` so it is importable via a dotted path.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_causal_impact<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let analysis_mod = PyModule::new(_py, "analysis")?;
    analysis_mod.add_class::<PyCausalImpact>()?;
    m.add_submodule(&analysis_mod)?;

    // Manually add the submodule into sys.modules to allow for dot notation.
    _py.import("sys")?
        .getattr("modules")?
        .set_item("rust_causal_impact.analysis", analysis_mod)?;
    Ok(())
}
