//! Validation helpers shared by the optimizer.
//!
//! Tolerances must be finite and strictly positive when present; gradients,
//! estimates, objective values and Hessians must be finite and correctly
//! shaped. Each check reports the first offending entry through a dedicated
//! [`OptError`] variant.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{Grad, Theta, types::Hessian},
};

/// Validate the optional gradient‐norm tolerance.
///
/// - Accepts `None` (no stopping rule on gradient).
/// - If `Some`, the value must be **finite** and **strictly positive**.
///
/// # Errors
/// Returns [`OptError::InvalidTolGrad`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate the optional cost‐change tolerance (for convergence).
///
/// - Accepts `None` (no stopping rule on cost change).
/// - If `Some`, the value must be **finite** and **strictly positive**.
///
/// # Errors
/// Returns [`OptError::InvalidTolCost`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate a gradient vector against dimension and finiteness.
///
/// Checks:
/// - `grad.len() == dim`
/// - every element is finite (`NaN` or `±∞` are rejected)
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] if length does not match `dim`.
/// - [`OptError::InvalidGradient`] with the index/value/reason of the first
///   offending element.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate and unwrap an estimated parameter vector (`theta_hat`).
///
/// Accepts only a present vector with all **finite** entries.
///
/// # Returns
/// The owned `Theta` if valid.
///
/// # Errors
/// - [`OptError::MissingThetaHat`] if no vector was provided.
/// - [`OptError::InvalidThetaHat`] if any element is non-finite.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    match theta_hat {
        Some(t) => {
            for (index, &value) in t.iter().enumerate() {
                if !value.is_finite() {
                    return Err(OptError::InvalidThetaHat {
                        index,
                        value,
                        reason: "Parameter estimates must be finite.",
                    });
                }
            }
            Ok(t)
        }
        None => Err(OptError::MissingThetaHat),
    }
}

/// Validate that a scalar log-likelihood value is finite.
///
/// Negative values are fine as long as they are finite.
///
/// # Errors
/// Returns [`OptError::NonFiniteCost`] if the value is `NaN` or infinite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

/// Validate the shape and entries of a Hessian matrix.
///
/// # Checks
/// 1. Matrix dimensions must equal `dim × dim`.
/// 2. All entries must be finite (no NaN or ±∞).
///
/// # Arguments
/// - `hessian`: Hessian matrix to validate.
/// - `dim`: expected dimension (both rows and columns).
///
/// # Returns
/// - `Ok(())` if the Hessian passes all checks.
///
/// # Errors
/// - [`OptError::HessianDimMismatch`] if dimensions do not match `dim`.
/// - [`OptError::InvalidHessian`] if any entry is non-finite, with offending
///   row/col indices and value.
pub fn validate_hessian(hessian: &Hessian, dim: usize) -> OptResult<()> {
    if hessian.nrows() != dim || hessian.ncols() != dim {
        return Err(OptError::HessianDimMismatch {
            expected: dim,
            found: (hessian.nrows(), hessian.ncols()),
        });
    }
    for ((i, j), &value) in hessian.indexed_iter() {
        if !value.is_finite() {
            return Err(OptError::InvalidHessian { row: i, col: j, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // First-offender reporting of the shape/finiteness checks.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Each validator reports the location of the first bad entry.
    //
    // Given
    // -----
    // - A gradient with NaN at index 1, a θ̂ with ∞ at index 0, and a 2×2
    //   Hessian with NaN at (1, 0).
    //
    // Expect
    // ------
    // - Matching `InvalidGradient`, `InvalidThetaHat`, `InvalidHessian`.
    fn validators_report_first_offending_entry() {
        assert!(matches!(
            validate_grad(&array![0.0, f64::NAN], 2),
            Err(OptError::InvalidGradient { index: 1, .. })
        ));
        assert!(matches!(
            validate_theta_hat(Some(array![f64::INFINITY, 1.0])),
            Err(OptError::InvalidThetaHat { index: 0, .. })
        ));
        let mut h = Array2::<f64>::eye(2);
        h[[1, 0]] = f64::NAN;
        assert!(matches!(
            validate_hessian(&h, 2),
            Err(OptError::InvalidHessian { row: 1, col: 0, .. })
        ));
        assert!(matches!(validate_theta_hat(None), Err(OptError::MissingThetaHat)));
    }

    #[test]
    // Purpose
    // -------
    // Tolerance checks accept `None` and reject zero.
    //
    // Given
    // -----
    // - `None` and `Some(0.0)` for both tolerances.
    //
    // Expect
    // ------
    // - `Ok` for `None`; `InvalidTolGrad` / `InvalidTolCost` for zero.
    fn tolerance_checks_reject_zero() {
        assert!(verify_tol_grad(None).is_ok());
        assert!(verify_tol_cost(None).is_ok());
        assert!(matches!(verify_tol_grad(Some(0.0)), Err(OptError::InvalidTolGrad { .. })));
        assert!(matches!(verify_tol_cost(Some(0.0)), Err(OptError::InvalidTolCost { .. })));
    }
}
