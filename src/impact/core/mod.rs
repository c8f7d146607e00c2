//! core — data preparation, model specification, and state-space building
//! blocks.
//!
//! Purpose
//! -------
//! Hold everything the estimator and filter need before any fitting:
//! validated input series and periods, standardization, the user-facing
//! [`ModelSpec`], the component structure, run configuration, parameter
//! mappings with their priors, and the time-varying system matrices.
//!
//! Key behaviors
//! -------------
//! - [`data`] validates series and resolves periods into a [`PreparedData`]
//!   window on the model scale.
//! - [`spec`] and [`components`] turn settings into a [`ModelStructure`]
//!   (level or trend, optional seasonal block, static or dynamic
//!   regression).
//! - [`params`] maps unconstrained `θ` to [`StructuralParams`] and evaluates
//!   the inverse-gamma / normal priors.
//! - [`state_space`] assembles `Z_t`, `T_t`, `Q_t`, `H` and the diffuse
//!   initial state for one parameter value.
//! - [`options`] carries seeds, worker limits, optimizer and MCMC settings,
//!   and the cancel token.
//!
//! Invariants & assumptions
//! ------------------------
//! - Everything here is pure and deterministic; randomness lives in
//!   `models` and `posterior`.
//! - State ordering is level, slope, seasonal, dynamic coefficients.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests for its validation paths and matrix
//!   layouts.

pub mod components;
pub mod data;
pub mod options;
pub mod params;
pub mod regression;
pub mod spec;
pub mod standardize;
pub mod state_space;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::components::{Component, ModelStructure};
pub use self::data::{ImpactData, Period, PeriodBound, PreparedData, SeriesIndex};
pub use self::options::{CancelToken, McmcOptions, RunConfig};
pub use self::params::{ParamLayout, ParamPriors, StructuralParams};
pub use self::regression::{OlsFit, ols};
pub use self::spec::{Estimation, ModelSpec, SpecWarning};
pub use self::standardize::{DataScaler, Standardizer};
pub use self::state_space::{InitialState, StateSpace};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_causal_impact::impact::core::prelude::*;
//
// to import the main core surface in a single line.

pub mod prelude {
    pub use super::components::{Component, ModelStructure};
    pub use super::data::{ImpactData, Period, PeriodBound, SeriesIndex};
    pub use super::options::{CancelToken, McmcOptions, RunConfig};
    pub use super::params::StructuralParams;
    pub use super::spec::{Estimation, ModelSpec, SpecWarning};
}
