//! impact — Bayesian structural time-series causal impact analysis.
//!
//! Purpose
//! -------
//! Estimate the effect of an intervention on a response series by fitting a
//! structural state-space model to the pre-period (optionally with control
//! covariates), simulating the counterfactual response over the
//! post-period, and comparing it with what was observed.
//!
//! Key behaviors
//! -------------
//! - [`core`]: validated data, periods, standardization, specification,
//!   components, priors, and system matrices.
//! - [`filter`]: Kalman filter and Durbin–Koopman smoother.
//! - [`models`]: posterior-mode fitting and random-walk Metropolis.
//! - [`posterior`]: parallel counterfactual simulation and effect
//!   aggregation.
//! - [`report`]: inference table, summary, verbal report, and panel data.
//! - [`CausalImpact`] wires the layers into one validated analysis.
//!
//! Invariants & assumptions
//! ------------------------
//! - Validation and specification errors are raised before any fitting.
//! - A run is a pure function of its inputs and [`RunConfig`]; there is no
//!   global state.
//!
//! Conventions
//! -----------
//! - Periods are inclusive `[start, end]` pairs over the series index.
//! - Structured `tracing` events mark run start/finish, optimizer restarts,
//!   overspecification warnings, and MCMC acceptance. The library never
//!   installs a subscriber.
//!
//! Downstream usage
//! ----------------
//! 1. Build [`ImpactData`] from the response, optional covariates and index.
//! 2. Choose pre/post [`Period`]s and a [`ModelSpec`].
//! 3. `CausalImpact::new(&data, pre, post, spec)?.run(&RunConfig::default())?`.
//! 4. Read `results.summary`, `results.report()`, `results.inferences`, or
//!    `results.panels(&["original"])`.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each submodule; end-to-end scenarios are in
//!   `tests/integration_impact_pipeline.rs`.

pub mod causal_impact;
pub mod core;
pub mod errors;
pub mod filter;
pub mod models;
pub mod posterior;
pub mod report;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::causal_impact::{CausalImpact, CustomModelInput, ImpactResults};
pub use self::core::{
    CancelToken, Component, Estimation, ImpactData, McmcOptions, ModelSpec, Period, PeriodBound,
    RunConfig, SeriesIndex, SpecWarning, StructuralParams,
};
pub use self::errors::{
    ImpactError, ImpactResult, SpecResult, SpecificationError, ValidationError, ValidationResult,
};
pub use self::models::FittedModel;
pub use self::posterior::{EffectEstimate, Estimate, PeriodEffect};
pub use self::report::{ImpactSummary, InferenceRow, Inferences, Panel, PanelKind};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_causal_impact::impact::prelude::*;
//
// to import the analysis surface in a single line.

pub mod prelude {
    pub use super::{
        CancelToken, CausalImpact, Component, CustomModelInput, EffectEstimate, Estimation,
        FittedModel, ImpactData, ImpactError, ImpactResult, ImpactResults, ImpactSummary,
        McmcOptions, ModelSpec, Period, PeriodBound, RunConfig, SeriesIndex, StructuralParams,
    };
}
