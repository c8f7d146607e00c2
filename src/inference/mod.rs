//! inference — observed-information uncertainty for fitted structural models.
//!
//! Purpose
//! -------
//! Provide post-estimation uncertainty quantification in the unconstrained
//! optimizer space `θ`: standard errors for fit diagnostics and a full
//! covariance used to scale the MCMC proposal.
//!
//! Conventions
//! -----------
//! - Parameters live in **unconstrained optimizer space**; mapping to
//!   variances happens in `impact::core::params`.
//! - Pure numerical routines: no logging, no global state.
//!
//! Downstream usage
//! ----------------
//! - `impact::models::structural` calls [`calc_standard_errors`] after a
//!   successful fit.
//! - `impact::models::mcmc` calls [`calc_covariance`] at the MAP point.

pub mod hessian;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::hessian::{calc_covariance, calc_standard_errors};

pub mod prelude {
    pub use super::hessian::{calc_covariance, calc_standard_errors};
}
