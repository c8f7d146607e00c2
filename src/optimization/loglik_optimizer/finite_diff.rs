//! loglik_optimizer::finite_diff — finite-difference gradient and Hessian helpers.
//!
//! Purpose
//! -------
//! Approximate gradients and Hessians around a parameter vector with
//! validation and symmetry cleanup, so the optimizer and the inference layer
//! never call the `finitediff` API directly.
//!
//! Key behaviors
//! -------------
//! - [`run_fd_diff`]: forward-difference gradient with error capture and
//!   post-hoc validation.
//! - [`compute_hessian`]: central-difference Hessian of a gradient map,
//!   falling back to forward differences when validation fails, then
//!   symmetrized.
//!
//! Invariants & assumptions
//! ------------------------
//! - Any error raised by the objective during differencing is parked in a
//!   shared `closure_err` cell and treated as a hard failure.
//! - Returned gradients/Hessians satisfy [`validate_grad`] /
//!   [`validate_hessian`].
//!
//! Downstream usage
//! ----------------
//! - The argmin adapter uses [`run_fd_diff`] as its fallback gradient.
//! - `inference::hessian` calls [`compute_hessian`] to build the observed
//!   information at the fitted structural parameters.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, Theta,
        types::Hessian,
        validation::{validate_grad, validate_hessian},
    },
    numerical_stability::transformations::symmetrize_in_place,
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// run_fd_diff — forward-difference gradient with error capture and validation.
///
/// Parameters
/// ----------
/// - `theta`: point of evaluation; its length is the expected gradient length.
/// - `func`: objective closure. On failure it is expected to store the error
///   in `closure_err` and return `NaN`.
/// - `closure_err`: shared slot for the first error raised inside `func`;
///   cleared on entry.
///
/// Errors
/// ------
/// - The captured error, converted to `OptError` (model variants survive).
/// - `OptError::GradientDimMismatch` / `OptError::InvalidGradient` from
///   [`validate_grad`].
///
/// Example
/// -------
/// ```rust
/// # use std::cell::RefCell;
/// # use argmin::core::Error;
/// # use ndarray::Array1;
/// # use rust_causal_impact::optimization::loglik_optimizer::Theta;
/// # use rust_causal_impact::optimization::loglik_optimizer::finite_diff::run_fd_diff;
/// let theta: Theta = Array1::from(vec![0.0_f64, 1.0]);
/// let closure_err: RefCell<Option<Error>> = RefCell::new(None);
/// let f = |x: &Theta| x.dot(x);
///
/// let grad = run_fd_diff(&theta, &f, &closure_err).unwrap();
/// assert_eq!(grad.len(), theta.len());
/// ```
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}

/// compute_hessian — finite-difference Hessian of a gradient map.
///
/// Central differences are tried first; a central result that fails
/// validation triggers a forward-difference retry whose validation error (if
/// any) is the one surfaced. The accepted matrix is symmetrized in place.
///
/// Errors
/// ------
/// - `OptError::HessianDimMismatch` / `OptError::InvalidHessian` when the
///   forward-difference fallback is also unusable.
///
/// Example
/// -------
/// ```rust
/// # use ndarray::Array1;
/// # use rust_causal_impact::optimization::loglik_optimizer::Theta;
/// # use rust_causal_impact::optimization::loglik_optimizer::finite_diff::compute_hessian;
/// let grad_fn = |theta: &Theta| theta.mapv(|x| 2.0 * x);
/// let theta: Theta = Array1::from(vec![1.0_f64, 2.0]);
/// let hess = compute_hessian(&grad_fn, &theta).unwrap();
/// assert_eq!(hess.shape(), &[2, 2]);
/// ```
pub fn compute_hessian<F: Fn(&Theta) -> Grad>(f: &F, theta: &Theta) -> OptResult<Hessian> {
    let dim = theta.len();
    let mut hess = theta.central_hessian(f);
    if validate_hessian(&hess, dim).is_err() {
        hess = theta.forward_hessian(f);
        validate_hessian(&hess, dim)?;
    }
    symmetrize_in_place(&mut hess);
    Ok(hess)
}
