//! inference::hessian — observed-information covariance and standard errors.
//!
//! Purpose
//! -------
//! Turn a finite-difference Hessian of the fitted objective into a
//! parameter covariance (its Moore–Penrose pseudo-inverse) and standard
//! errors. The covariance seeds the random-walk Metropolis proposal; the
//! standard errors are reported as fit diagnostics.
//!
//! Key behaviors
//! -------------
//! - Call [`compute_hessian`] on the gradient of the **negative** objective
//!   to obtain the observed information `J(θ̂)`.
//! - Copy it into a `nalgebra::DMatrix` (`fill_dmatrix`) and take a
//!   symmetric eigendecomposition.
//! - Build `J⁺` (or just its diagonal) from the eigenpairs with
//!   `λ > EIGEN_EPS`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `compute_hessian` returns a finite, symmetric `n×n` matrix.
//! - Eigenvalues at or below [`EIGEN_EPS`] carry no information and are
//!   dropped, so weakly identified directions get zero variance in `J⁺`
//!   rather than an exploding one; callers treat a zero SE as "not
//!   identified".
//!
//! Conventions
//! -----------
//! - No explicit matrix inverse is formed.
//! - Errors are reported via [`OptResult<T>`].
//!
//! Testing notes
//! -------------
//! - Unit tests check agreement with analytic inverses for quadratic
//!   objectives and the copy into `DMatrix`.
use crate::optimization::{
    errors::OptResult, loglik_optimizer::finite_diff::compute_hessian,
    numerical_stability::transformations::EIGEN_EPS,
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// calc_standard_errors — standard errors from observed information.
///
/// Parameters
/// ----------
/// - `f`: gradient map of the negative objective, `θ ↦ -∇ℓ(θ)`, C¹ around
///   `theta_hat`.
/// - `theta_hat`: point at which `J(θ̂)` is evaluated.
///
/// Returns
/// -------
/// Length-`n` vector `sqrt(diag(J⁺))`.
///
/// Errors
/// ------
/// - Anything [`compute_hessian`] returns (dimension mismatch, non-finite
///   entries).
///
/// Example
/// -------
/// ```rust
/// # use ndarray::array;
/// # use rust_causal_impact::inference::hessian::calc_standard_errors;
/// let a = array![[4.0, 0.0], [0.0, 1.0]];
/// let f = |theta: &ndarray::Array1<f64>| a.dot(theta);
/// let se = calc_standard_errors(&f, &array![1.0, -1.0]).unwrap();
/// assert!((se[0] - 0.5).abs() < 1e-6);
/// assert!((se[1] - 1.0).abs() < 1e-6);
/// ```
pub fn calc_standard_errors<F: Fn(&Array1<f64>) -> Array1<f64>>(
    f: &F, theta_hat: &Array1<f64>,
) -> OptResult<Array1<f64>> {
    let obs_info = observed_information(f, theta_hat)?;
    Ok(solve_for_se(obs_info, theta_hat.len()))
}

/// calc_covariance — full pseudo-inverse of the observed information.
///
/// Same inputs and errors as [`calc_standard_errors`]; returns the `n×n`
/// matrix `J⁺ = Σ_{λ_k > EIGEN_EPS} q_k q_kᵀ / λ_k`.
pub fn calc_covariance<F: Fn(&Array1<f64>) -> Array1<f64>>(
    f: &F, theta_hat: &Array1<f64>,
) -> OptResult<Array2<f64>> {
    let obs_info = observed_information(f, theta_hat)?;
    Ok(pseudo_inverse(obs_info, theta_hat.len()))
}

// ---- Helper methods ----

fn observed_information<F: Fn(&Array1<f64>) -> Array1<f64>>(
    f: &F, theta_hat: &Array1<f64>,
) -> OptResult<DMatrix<f64>> {
    let obs_info = compute_hessian(f, theta_hat)?;
    let mut obs_info_nalg = DMatrix::<f64>::zeros(obs_info.nrows(), obs_info.ncols());
    fill_dmatrix(&obs_info, &mut obs_info_nalg);
    Ok(obs_info_nalg)
}

/// Copy a square `ndarray` matrix into a preallocated `DMatrix`.
///
/// Panics if the shapes differ (programmer error).
fn fill_dmatrix(obs_info: &Array2<f64>, obs_info_nalg: &mut DMatrix<f64>) {
    let n = obs_info.ncols();
    for j in 0..n {
        for i in 0..n {
            obs_info_nalg[(i, j)] = obs_info[[i, j]];
        }
    }
}

/// `sqrt(Var(θ̂_i))` with `Var(θ̂_i) = Σ_{k: λ_k > EIGEN_EPS} Q[i,k]² / λ_k`.
fn solve_for_se(obs_info_nalg: DMatrix<f64>, n: usize) -> Array1<f64> {
    let eigen_decomp = obs_info_nalg.symmetric_eigen();
    let q = eigen_decomp.eigenvectors;
    let eigenvals = eigen_decomp.eigenvalues;
    Array1::from_shape_fn(n, |i| {
        eigenvals
            .iter()
            .enumerate()
            .filter(|(_, lambda)| **lambda > EIGEN_EPS)
            .map(|(k, &lambda)| q[(i, k)] * q[(i, k)] / lambda)
            .sum::<f64>()
            .sqrt()
    })
}

fn pseudo_inverse(obs_info_nalg: DMatrix<f64>, n: usize) -> Array2<f64> {
    let eigen_decomp = obs_info_nalg.symmetric_eigen();
    let q = eigen_decomp.eigenvectors;
    let mut cov = Array2::<f64>::zeros((n, n));
    for (k, &lambda) in eigen_decomp.eigenvalues.iter().enumerate() {
        if lambda <= EIGEN_EPS {
            continue;
        }
        for i in 0..n {
            let coeff = q[(i, k)] / lambda;
            for j in 0..n {
                cov[[i, j]] += coeff * q[(j, k)];
            }
        }
    }
    cov
}
