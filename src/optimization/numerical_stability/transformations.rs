//! Numerical stability utilities.
//!
//! Guarded versions of the nonlinear transforms used to keep structural
//! variances strictly positive, plus small symmetric-matrix helpers used by
//! the Kalman recursions and the samplers. Cutoffs (`x > 20.0`) keep `f64`
//! arithmetic well-conditioned, as in common ML libraries.
//!
//! # Provided items
//! - [`VARIANCE_FLOOR`]: lower bound added to every variance mapped out of
//!   θ-space.
//! - [`EIGEN_EPS`]: eigenvalue cutoff for pseudo-inverses.
//! - [`safe_softplus`], [`safe_softplus_inv`], [`log_logistic`]: scalar
//!   transforms and the softplus log-derivative.
//! - [`symmetrize_in_place`], [`psd_factor`]: symmetric matrix hygiene.
use nalgebra::DMatrix;
use ndarray::Array2;

/// Smallest variance any structural disturbance may take.
///
/// Every variance is mapped as `σ² = softplus(θ) + VARIANCE_FLOOR`, so the
/// innovation variance `F_t ≥ VARIANCE_FLOOR` whenever the observation
/// variance is estimated.
pub const VARIANCE_FLOOR: f64 = 1e-10;

/// Eigenvalues at or below this value are treated as zero.
pub const EIGEN_EPS: f64 = 1e-10;

/// Numerically stable softplus: `ln(1 + exp(x))`.
pub fn safe_softplus(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}

/// Stable inverse of softplus on `(0, ∞)`: `ln(exp(x) - 1)`.
///
/// Inputs at or below zero are clamped to `f64::MIN_POSITIVE`, returning a
/// very negative but finite `θ`.
pub fn safe_softplus_inv(x: f64) -> f64 {
    let x = x.max(f64::MIN_POSITIVE);
    if x > 20.0 { x } else { x.exp_m1().ln() }
}

/// `ln(logistic(x)) = -softplus(-x)`; the log-Jacobian of the softplus map.
pub fn log_logistic(x: f64) -> f64 {
    -safe_softplus(-x)
}

/// Replace each off-diagonal pair with its average.
///
/// Assumes a square matrix; the diagonal is untouched.
pub fn symmetrize_in_place(m: &mut Array2<f64>) {
    for i in 0..m.nrows() {
        for j in 0..i {
            let avg = 0.5 * (m[[i, j]] + m[[j, i]]);
            m[[i, j]] = avg;
            m[[j, i]] = avg;
        }
    }
}

/// Factor `L` with `L Lᵀ = A` for a symmetric positive semi-definite `A`.
///
/// Uses a symmetric eigendecomposition `A = Q Λ Qᵀ` and returns `Q Λ^{1/2}`.
/// Negative eigenvalues (round-off on singular covariances) are clamped to
/// zero, so the factor exists for every symmetric input. Works for the
/// rank-deficient state covariances that appear after a seasonal state has
/// been pinned by observations.
pub fn psd_factor(a: &Array2<f64>) -> Array2<f64> {
    let n = a.nrows();
    let sym = DMatrix::<f64>::from_fn(n, n, |i, j| 0.5 * (a[[i, j]] + a[[j, i]]));
    let eig = sym.symmetric_eigen();
    let mut out = Array2::<f64>::zeros((n, n));
    for k in 0..n {
        let root = eig.eigenvalues[k].max(0.0).sqrt();
        if root == 0.0 {
            continue;
        }
        for i in 0..n {
            out[[i, k]] = eig.eigenvectors[(i, k)] * root;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement of guarded transforms with naïve formulas on safe inputs.
    // - Softplus/inverse round trips across the variance range we fit.
    // - PSD factors of full-rank and singular matrices.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Softplus and its inverse round-trip across many orders of magnitude.
    //
    // Given
    // -----
    // - Variances from 1e-8 to 1e3.
    //
    // Expect
    // ------
    // - softplus(softplus_inv(v)) ≈ v to relative 1e-10.
    fn softplus_inverse_round_trips_variances() {
        for &v in &[1e-8, 1e-4, 0.3, 1.0, 25.0, 1e3] {
            let back = safe_softplus(safe_softplus_inv(v));
            assert!(((back - v) / v).abs() < 1e-10, "v = {v}, back = {back}");
        }
    }

    #[test]
    // Purpose
    // -------
    // The logistic helpers agree with the naïve formula and stay finite in
    // the tails.
    //
    // Given
    // -----
    // - x ∈ {-800, -3, 0, 3, 800}.
    //
    // Expect
    // ------
    // - Finite non-positive outputs, log_logistic(0) = ln 0.5, and
    //   exp(log_logistic) matches the logistic function.
    fn logistic_helpers_are_consistent_and_finite() {
        for &x in &[-800.0, -3.0, 0.0, 3.0, 800.0] {
            let lp = log_logistic(x);
            assert!(lp.is_finite() && lp <= 0.0);
            if x.abs() < 10.0 {
                assert!((lp.exp() - 1.0 / (1.0 + (-x).exp())).abs() < 1e-12);
            }
        }
        assert!((log_logistic(0.0) - 0.5_f64.ln()).abs() < 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // `psd_factor` reproduces the input for full-rank and singular matrices.
    //
    // Given
    // -----
    // - A = [[4, 2], [2, 3]] and the rank-one B = [[1, 1], [1, 1]].
    //
    // Expect
    // ------
    // - L Lᵀ ≈ A and L Lᵀ ≈ B.
    fn psd_factor_reconstructs_input() {
        for m in [array![[4.0, 2.0], [2.0, 3.0]], array![[1.0, 1.0], [1.0, 1.0]]] {
            let l = psd_factor(&m);
            let back = l.dot(&l.t());
            for (x, y) in back.iter().zip(m.iter()) {
                assert!((x - y).abs() < 1e-10);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Symmetrization averages off-diagonal pairs and keeps the diagonal.
    //
    // Given
    // -----
    // - [[1, 2], [0, 3]].
    //
    // Expect
    // ------
    // - [[1, 1], [1, 3]].
    fn symmetrize_in_place_averages_pairs() {
        let mut m = array![[1.0, 2.0], [0.0, 3.0]];
        symmetrize_in_place(&mut m);
        assert_eq!(m, array![[1.0, 1.0], [1.0, 3.0]]);
    }
}
