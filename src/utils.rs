//! Conversion helpers for the PyO3 boundary.
//!
//! Python callers pass numpy arrays, pandas objects, or plain sequences;
//! these helpers turn them into owned `ndarray` values and validated option
//! structs, mapping failures to `PyErr`.
#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyTypeError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    impact::{
        core::{CancelToken, McmcOptions, RunConfig},
        errors::ImpactError,
    },
    optimization::loglik_optimizer::{LineSearcher, MLEOptions, Tolerances},
};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
    PyReadonlyArray2,
};

#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        return Ok(arr_ro);
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            return Ok(series_ro);
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        PyTypeError::new_err("expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64")
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

// numpy's views come from its own `ndarray` release; copy element-wise.
#[cfg(feature = "python-bindings")]
fn owned_1d(arr: &PyReadonlyArray1<'_, f64>) -> Array1<f64> {
    arr.as_array().iter().copied().collect()
}

#[cfg(feature = "python-bindings")]
fn owned_2d(arr: &PyReadonlyArray2<'_, f64>) -> Array2<f64> {
    let view = arr.as_array();
    let (n, k) = view.dim();
    Array2::from_shape_fn((n, k), |(i, j)| view[[i, j]])
}

/// Owned copy of a 1-D float input; `NaN` entries are kept.
#[cfg(feature = "python-bindings")]
pub fn extract_series<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<Array1<f64>> {
    Ok(owned_1d(&extract_f64_array(py, raw_data)?))
}

/// Owned `n × k` matrix from a 2-D array, a DataFrame, or a 1-D input
/// (treated as a single column).
#[cfg(feature = "python-bindings")]
pub fn extract_matrix<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<Array2<f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray2<f64>>() {
        return Ok(owned_2d(&arr_ro));
    }
    if let Ok(obj) = raw_data.call_method("to_numpy", (), None) {
        if let Ok(frame_ro) = obj.extract::<PyReadonlyArray2<f64>>() {
            return Ok(owned_2d(&frame_ro));
        }
    }
    if let Ok(rows) = raw_data.extract::<Vec<Vec<f64>>>() {
        let k = rows.first().map_or(0, |r| r.len());
        if rows.iter().any(|r| r.len() != k) {
            return Err(PyTypeError::new_err("covariate rows must all have the same length"));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        return Array2::from_shape_vec((flat.len() / k.max(1), k), flat)
            .map_err(|e| PyTypeError::new_err(e.to_string()));
    }
    let column = extract_series(py, raw_data)?;
    Ok(column.insert_axis(ndarray::Axis(1)))
}

/// Optimizer options from Python keyword arguments.
///
/// Unset tolerances fall back to the `MLEOptions` defaults.
#[cfg(feature = "python-bindings")]
pub fn extract_mle_opts(
    tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    line_searcher: Option<&str>, lbfgs_mem: Option<usize>,
) -> PyResult<MLEOptions> {
    use std::str::FromStr;

    let defaults = MLEOptions::default();
    let tols = if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
        defaults.tols
    } else {
        // Tolerances::new -> OptResult<Tolerances> -> ImpactError -> PyErr
        Tolerances::new(tol_grad, tol_cost, max_iter).map_err(ImpactError::from)?
    };
    let ls = match line_searcher {
        Some(name) => LineSearcher::from_str(name).map_err(ImpactError::from)?,
        None => defaults.line_searcher,
    };
    let opts = MLEOptions::new(tols, ls, false, lbfgs_mem).map_err(ImpactError::from)?;
    Ok(opts)
}

/// Run configuration from Python keyword arguments.
#[cfg(feature = "python-bindings")]
pub fn extract_run_config(
    seed: u64, max_workers: Option<usize>, mle_opts: MLEOptions, burn_in: Option<usize>,
) -> PyResult<RunConfig> {
    let defaults = McmcOptions::default();
    let mcmc = McmcOptions::new(burn_in, defaults.max_redraws, defaults.proposal_scale)
        .map_err(ImpactError::from)?;
    let cfg = RunConfig::new(seed, max_workers, mle_opts, mcmc, CancelToken::new())
        .map_err(ImpactError::from)?;
    Ok(cfg)
}
