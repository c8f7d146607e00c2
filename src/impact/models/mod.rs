//! models — parameter estimation for structural time-series models.
//!
//! Purpose
//! -------
//! Fit the unknown variances and static coefficients of a
//! [`ModelStructure`](crate::impact::core::ModelStructure) on the
//! pre-period, either as a posterior mode (L-BFGS with one perturbed
//! restart) or by random-walk Metropolis started at that mode, and expose
//! the result as an immutable [`FittedModel`].
//!
//! Downstream usage
//! ----------------
//! - `impact::causal_impact` drives both estimation modes and hands the
//!   [`FittedModel`] to the posterior simulator.
//! - Callers with their own parameters build a model through
//!   [`FittedModel::from_parts`].

pub mod mcmc;
pub mod structural;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::mcmc::{McmcOutput, run_metropolis};
pub use self::structural::{
    EstimationData, FitDiagnostics, FitMethod, FittedModel, MleFit, StructuralModel,
};

pub mod prelude {
    pub use super::structural::{FitDiagnostics, FitMethod, FittedModel};
}
