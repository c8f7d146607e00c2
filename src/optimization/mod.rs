//! optimization — MLE stack, numerical helpers, and unified error surface.
//!
//! Purpose
//! -------
//! Provide the optimization layer used to estimate structural time-series
//! parameters: an Argmin-backed log-likelihood maximizer, numerically stable
//! parameter transforms, and a single error/result surface. Model code
//! implements a log-likelihood, picks tolerances, and receives fitted
//! parameters and diagnostics without touching solver details.
//!
//! Key behaviors
//! -------------
//! - Expose a high-level API for **maximizing log-likelihoods** `ℓ(θ)`
//!   (`loglik_optimizer`), including solver and stopping-criteria
//!   configuration.
//! - Supply shared numerical primitives (`numerical_stability`) for mapping
//!   unconstrained parameters onto strictly positive variances and for
//!   symmetric-matrix hygiene (symmetrization, PSD square roots).
//! - Normalize configuration issues, numerical failures, and backend solver
//!   errors into a single enum (`errors::OptError`) with a common result
//!   alias (`OptResult<T>`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Optimizers operate in an unconstrained parameter space `θ`; invalid
//!   states are reported as `OptError`, not panics.
//! - Log-likelihood implementations treat evaluation failures (e.g., a
//!   collapsed innovation variance in the Kalman filter) as recoverable
//!   errors surfaced through the optimization layer.
//!
//! Conventions
//! -----------
//! - All solvers maximize `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`; user-facing
//!   outcomes are expressed in terms of `ℓ`.
//! - Parameters, gradients, and Hessians use the `ndarray` aliases
//!   (`Theta`, `Grad`, `Hessian`).
//! - This module does not log; progress output is only available through
//!   the optional `obs_slog` observer.
//!
//! Downstream usage
//! ----------------
//! - `impact::models` implements `LogLikelihood` for the structural model
//!   and calls `maximize` with a starting point and `MLEOptions`.
//! - `inference::hessian` reuses the finite-difference Hessian helpers to
//!   turn the fitted objective into standard errors and proposal
//!   covariances for MCMC.
//!
//! Testing notes
//! -------------
//! - Unit tests in the submodules cover solver wiring, tolerance handling,
//!   finite-difference behavior, transform accuracy, and error conversions.
//! - The end-to-end causal impact tests exercise `maximize` on real
//!   state-space likelihoods.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_causal_impact::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
