//! loglik_optimizer::types — shared numeric aliases and solver wiring.
//!
//! Purpose
//! -------
//! Keep the numeric types and pre-wired L-BFGS aliases in one place so the
//! rest of the optimizer stays agnostic to `ndarray` and Argmin generics.
//!
//! Conventions
//! -----------
//! - `Theta` and `Grad` are column vectors with one entry per free
//!   parameter; `Hessian` is the matching dense square matrix.
//! - `Cost` is a scalar `f64`; sign flips between cost and log-likelihood
//!   happen in the adapter.
//! - The line-search aliases follow Argmin's `(Param, Gradient, Float)`
//!   three-parameter form.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    quasinewton::LBFGS,
};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Unconstrained parameter vector `θ`.
pub type Theta = Array1<f64>;

/// Gradient vector, same shape as [`Theta`].
pub type Grad = Array1<f64>;

/// Dense `n × n` Hessian for `n = Theta.len()`.
pub type Hessian = Array2<f64>;

/// Scalar objective value.
pub type Cost = f64;

/// Function-evaluation counters as reported by Argmin (e.g. `"cost_count"`).
pub type FnEvalMap = HashMap<String, u64>;

/// Default L-BFGS history size.
pub const DEFAULT_LBFGS_MEM: usize = 7;

pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

/// L-BFGS with Hager–Zhang line search.
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;

/// L-BFGS with More–Thuente line search.
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
