//! Adapter that exposes a [`LogLikelihood`] as an `argmin` problem.
//!
//! Maximizing `ℓ(θ)` becomes minimizing `c(θ) = -ℓ(θ)`. Analytic gradients are
//! negated; without one we finite-difference the **cost** closure, so that
//! branch needs no sign flip.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        finite_diff::run_fd_diff,
        traits::LogLikelihood,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

/// Bridges a [`LogLikelihood`] and its data to `CostFunction` + `Gradient`.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<'a, F: LogLikelihood> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    /// `c(θ) = -ℓ(θ)`; a non-finite `ℓ` is `OptError::NonFiniteCost`.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta, self.data)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        Ok(-output)
    }
}

impl<'a, F: LogLikelihood> Gradient for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Gradient of the cost at `θ`.
    ///
    /// - Analytic `∇ℓ` is validated and negated.
    /// - Otherwise central differences of the cost are tried first. If any
    ///   cost evaluation failed during differencing, or the result is not
    ///   finite, a forward-difference retry is made via [`run_fd_diff`].
    ///
    /// The differencing closure must return `f64`, so the first evaluation
    /// error is parked in `closure_err` and the closure yields `NaN`.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let dim = theta.len();
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, dim)?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => {
                let closure_err: RefCell<Option<Error>> = RefCell::new(None);
                let cost_func = |theta: &Theta| -> f64 {
                    match self.cost(theta) {
                        Ok(val) => val,
                        Err(e) => {
                            let mut slot = closure_err.borrow_mut();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            f64::NAN
                        }
                    }
                };
                let fd_grad = theta.central_diff(&cost_func);
                let central_failed = closure_err.borrow().is_some();
                if !central_failed && validate_grad(&fd_grad, dim).is_ok() {
                    return Ok(fd_grad);
                }
                Ok(run_fd_diff(theta, &cost_func, &closure_err)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}
