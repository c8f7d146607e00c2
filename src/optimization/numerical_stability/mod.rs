//! numerical_stability — numerically robust transforms and matrix hygiene.
//!
//! Purpose
//! -------
//! Collect the scalar transforms that map unconstrained optimizer
//! coordinates onto strictly positive variances, and the small symmetric
//! matrix routines the Kalman filter, smoother and samplers share. Keeping
//! tolerances here means every layer agrees on the same floors and cutoffs.
//!
//! Key behaviors
//! -------------
//! - Stable softplus/inverse for `σ² = softplus(θ) + VARIANCE_FLOOR`, and the
//!   logistic log-derivative used as the change-of-variables Jacobian under
//!   MCMC.
//! - In-place symmetrization (`symmetrize_in_place`) applied after every
//!   covariance update.
//! - Eigen-based PSD factors (`psd_factor`) for drawing Gaussian states and
//!   MCMC proposals from possibly singular covariances.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are finite `f64`; shape checks live in the callers.
//! - `psd_factor` never fails: negative eigenvalues are clamped to zero.
//!
//! Conventions
//! -----------
//! - `ndarray` on the surface; `nalgebra` only inside eigendecompositions.
//! - No logging or global state.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] check round trips, tail behavior and
//!   reconstruction of PSD factors.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    EIGEN_EPS, VARIANCE_FLOOR, log_logistic, psd_factor, safe_softplus,
    safe_softplus_inv, symmetrize_in_place,
};

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::transformations::{
        EIGEN_EPS, VARIANCE_FLOOR, log_logistic, psd_factor, safe_softplus, safe_softplus_inv,
    };
}
