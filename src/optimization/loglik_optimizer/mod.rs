//! loglik_optimizer — L-BFGS maximization of structural model objectives.
//!
//! Purpose
//! -------
//! Fit the unconstrained parameter vector of a structural time-series model
//! by maximizing its objective (Kalman-filter log-likelihood plus variance
//! log-priors). Models implement [`LogLikelihood`]; [`maximize`] wraps the
//! argmin L-BFGS solver around it.
//!
//! Key behaviors
//! -------------
//! - [`adapter`] flips the objective into an argmin cost `c(θ) = -ℓ(θ)` and
//!   supplies finite-difference gradients when a model has no analytic one.
//! - [`builders`] picks More–Thuente or Hager–Zhang line search from
//!   [`LineSearcher`]; [`run`] executes the solver with an optional
//!   terminal observer.
//! - [`OptimOutcome`] reports `ℓ(θ̂)`, the termination status, and whether
//!   it counts as converged. Hitting the iteration budget does not.
//!
//! Invariants & assumptions
//! ------------------------
//! - Objective failures (degenerate innovation variance, non-finite values)
//!   come back as [`OptError`](crate::optimization::errors::OptError)
//!   values and end the run; they never panic.
//! - [`Tolerances`] and [`MLEOptions`] are validated on construction.
//!
//! Downstream usage
//! ----------------
//! - `impact::models::StructuralModel` implements [`LogLikelihood`] and calls
//!   [`maximize`] from its posterior-mode fit, restarting once from a
//!   perturbed start when the first attempt does not converge.
//! - `inference::hessian` reuses [`finite_diff::compute_hessian`] for the
//!   observed information at the fitted point.
//!
//! Testing notes
//! -------------
//! - Submodule unit tests cover sign conventions, solver wiring, derivative
//!   validation and termination classification; the impact integration
//!   tests run [`maximize`] on real filter likelihoods.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Hessian, Theta};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_causal_impact::optimization::loglik_optimizer::prelude::*;
//
// to import the main optimizer surface in a single line.

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
