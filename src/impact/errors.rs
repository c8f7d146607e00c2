//! Errors for causal impact analysis (input validation, model specification,
//! estimation, sampling, and numerical failures).
//!
//! Three layers mirror when a problem can be detected:
//! - [`ValidationError`]: malformed series, periods, or covariates. Raised
//!   before any model is built and never retried.
//! - [`SpecificationError`]: contradictory or out-of-range model settings,
//!   including conflicts between a custom fitted model and `ModelSpec`.
//! - [`ImpactError`]: the crate-wide error, wrapping the two above plus
//!   convergence, sampling, numerical-instability and cancellation outcomes.
//!
//! ## Conventions
//! - **Indices are 0-based** and refer to positions in the caller's series
//!   unless a variant says otherwise.
//! - Numerical-instability errors carry the time index and the offending
//!   innovation variance.
//! - With the `python-bindings` feature every error converts to a Python
//!   `ValueError` (or `RuntimeError` for estimation failures).
#[cfg(feature = "python-bindings")]
use pyo3::{
    PyErr,
    exceptions::{PyRuntimeError, PyValueError},
};

use crate::optimization::errors::OptError;

/// Crate-wide result alias for causal impact operations.
pub type ImpactResult<T> = Result<T, ImpactError>;

/// Result alias for input validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result alias for model specification checks.
pub type SpecResult<T> = Result<T, SpecificationError>;

/// Malformed inputs detected before any computation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    // ---- Series ----
    /// Response series has no observations.
    EmptySeries,

    /// Two inputs that must align have different lengths.
    LengthMismatch { what: &'static str, expected: usize, found: usize },

    /// Response contains ±∞ (NaN marks a missing value and is allowed).
    NonFiniteResponse { index: usize, value: f64 },

    /// Covariates must be fully observed and finite.
    NonFiniteCovariate { row: usize, col: usize, value: f64 },

    /// Timestamps must be strictly increasing.
    TimestampsNotIncreasing { index: usize },

    /// Custom-model covariates do not match the model's regression block.
    CovariateCountMismatch { expected: usize, found: usize },

    // ---- Periods ----
    /// A timestamp bound was given for an ordinal index, or vice versa.
    BoundKindMismatch { period: &'static str },

    /// A period bound lies outside the series extent.
    PeriodOutOfRange { period: &'static str, bound: String },

    /// A period resolves to no time points.
    EmptyPeriod { period: &'static str },

    /// Pre-period must end strictly before the post-period starts.
    PeriodsOverlap { pre_end: usize, post_start: usize },

    /// Every pre-period response value is missing.
    NoPreObservations,

    /// Observed pre-period response has zero variance.
    ConstantPreResponse { value: f64 },

    /// Post-period actuals are required to compute effects.
    MissingPostActual { index: usize },

    /// Too few observed pre-period points to identify the model.
    InsufficientPreData { observed: usize, required: usize },

    // ---- Presentation ----
    /// Unknown plot panel name.
    UnknownPanel { name: String },
}

impl std::error::Error for ValidationError {}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Series ----
            ValidationError::EmptySeries => write!(f, "Response series is empty."),
            ValidationError::LengthMismatch { what, expected, found } => {
                write!(f, "Length mismatch for {what}: expected {expected}, found {found}.")
            }
            ValidationError::NonFiniteResponse { index, value } => {
                write!(f, "Response at index {index} is infinite: {value}")
            }
            ValidationError::NonFiniteCovariate { row, col, value } => {
                write!(
                    f,
                    "Covariate column {col} at index {row} is missing or non-finite: {value}"
                )
            }
            ValidationError::TimestampsNotIncreasing { index } => {
                write!(f, "Timestamps must be strictly increasing; violated at index {index}.")
            }
            ValidationError::CovariateCountMismatch { expected, found } => {
                write!(f, "Model expects {expected} covariate column(s), found {found}.")
            }
            // ---- Periods ----
            ValidationError::BoundKindMismatch { period } => {
                write!(f, "{period}-period bounds do not match the kind of series index.")
            }
            ValidationError::PeriodOutOfRange { period, bound } => {
                write!(f, "{period}-period bound {bound} lies outside the series.")
            }
            ValidationError::EmptyPeriod { period } => {
                write!(f, "{period}-period contains no time points.")
            }
            ValidationError::PeriodsOverlap { pre_end, post_start } => {
                write!(
                    f,
                    "Pre-period must end before the post-period starts: pre ends at {pre_end}, \
                     post starts at {post_start}."
                )
            }
            ValidationError::NoPreObservations => {
                write!(f, "Pre-period contains no observed response values.")
            }
            ValidationError::ConstantPreResponse { value } => {
                write!(f, "Observed pre-period response is constant ({value}).")
            }
            ValidationError::MissingPostActual { index } => {
                write!(f, "Post-period response at index {index} is missing.")
            }
            ValidationError::InsufficientPreData { observed, required } => {
                write!(
                    f,
                    "Pre-period has {observed} observed value(s); at least {required} are needed."
                )
            }
            // ---- Presentation ----
            ValidationError::UnknownPanel { name } => {
                write!(
                    f,
                    "Unknown panel {name:?} (expected 'original', 'pointwise', or 'cumulative')."
                )
            }
        }
    }
}

/// Contradictory or out-of-range model and run settings.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecificationError {
    /// `niter` must be positive.
    InvalidNiter { niter: usize },

    /// `alpha` must lie strictly between 0 and 1.
    InvalidAlpha { alpha: f64 },

    /// `prior_level_sd` must be finite and > 0.
    InvalidPriorLevelSd { value: f64 },

    /// Seasonal count is unusable for the requested structure.
    InvalidSeasons { nseasons: usize, reason: &'static str },

    /// Season duration is unusable for the requested structure.
    InvalidSeasonDuration { season_duration: usize, reason: &'static str },

    /// Dynamic regression needs at least one covariate.
    DynamicRegressionWithoutCovariates,

    /// Unknown estimation method name.
    InvalidEstimation { name: String },

    /// Component list cannot form a model.
    InvalidComponents { reason: String },

    /// A supplied model parameter is out of its domain.
    InvalidParameter { name: String, value: f64 },

    /// A supplied parameter vector has the wrong length.
    ParamLengthMismatch { what: &'static str, expected: usize, found: usize },

    /// `ModelSpec` fields disagree with a supplied fitted model.
    ConflictsWithCustomModel { fields: Vec<&'static str> },

    /// Run configuration value is unusable.
    InvalidRunConfig { field: &'static str, reason: &'static str },
}

impl std::error::Error for SpecificationError {}

impl std::fmt::Display for SpecificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecificationError::InvalidNiter { niter } => {
                write!(f, "niter must be positive; got {niter}.")
            }
            SpecificationError::InvalidAlpha { alpha } => {
                write!(f, "alpha must lie in (0, 1); got {alpha}.")
            }
            SpecificationError::InvalidPriorLevelSd { value } => {
                write!(f, "prior_level_sd must be finite and > 0; got {value}.")
            }
            SpecificationError::InvalidSeasons { nseasons, reason } => {
                write!(f, "Invalid nseasons {nseasons}: {reason}")
            }
            SpecificationError::InvalidSeasonDuration { season_duration, reason } => {
                write!(f, "Invalid season_duration {season_duration}: {reason}")
            }
            SpecificationError::DynamicRegressionWithoutCovariates => {
                write!(f, "Dynamic regression requested but no covariates were supplied.")
            }
            SpecificationError::InvalidEstimation { name } => {
                write!(f, "Invalid estimation method {name:?} (expected 'mle' or 'mcmc').")
            }
            SpecificationError::InvalidComponents { reason } => {
                write!(f, "Invalid model components: {reason}")
            }
            SpecificationError::InvalidParameter { name, value } => {
                write!(f, "Invalid value {value} for parameter {name}.")
            }
            SpecificationError::ParamLengthMismatch { what, expected, found } => {
                write!(f, "Length mismatch for {what}: expected {expected}, found {found}.")
            }
            SpecificationError::ConflictsWithCustomModel { fields } => {
                write!(
                    f,
                    "ModelSpec fields conflict with the supplied model: {}.",
                    fields.join(", ")
                )
            }
            SpecificationError::InvalidRunConfig { field, reason } => {
                write!(f, "Invalid run configuration for {field}: {reason}")
            }
        }
    }
}

/// Unified error type for causal impact runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ImpactError {
    /// Bad input data or periods.
    Validation(ValidationError),

    /// Bad model or run settings.
    Specification(SpecificationError),

    /// Optimization failed after the perturbed-start retry. `theta` holds the
    /// unconstrained parameters where the last attempt stopped.
    Convergence { attempts: usize, status: String, theta: Vec<f64> },

    /// MCMC could not find a proposal with finite posterior density. `theta`
    /// is the chain state the proposals were drawn around.
    Sampling { iteration: usize, redraws: usize, theta: Vec<f64> },

    /// Innovation variance collapsed or became non-finite at time `t`.
    NumericalInstability { t: usize, value: f64 },

    /// Optimizer configuration or backend failure.
    Optimization(OptError),

    /// The draw worker pool could not be created.
    WorkerPool { reason: String },

    /// The run was cancelled through its `CancelToken`.
    Cancelled,
}

impl std::error::Error for ImpactError {}

impl std::fmt::Display for ImpactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImpactError::Validation(err) => write!(f, "Validation error: {err}"),
            ImpactError::Specification(err) => write!(f, "Specification error: {err}"),
            ImpactError::Convergence { attempts, status, theta } => {
                write!(
                    f,
                    "Optimization did not converge after {attempts} attempt(s) at θ = {theta:?}: \
                     {status}"
                )
            }
            ImpactError::Sampling { iteration, redraws, theta } => {
                write!(
                    f,
                    "MCMC iteration {iteration} produced no finite proposal after {redraws} \
                     redraws around θ = {theta:?}."
                )
            }
            ImpactError::NumericalInstability { t, value } => {
                write!(f, "Numerical instability at t = {t}: innovation variance {value}")
            }
            ImpactError::Optimization(err) => write!(f, "Optimization error: {err}"),
            ImpactError::WorkerPool { reason } => {
                write!(f, "Could not start worker pool: {reason}")
            }
            ImpactError::Cancelled => write!(f, "Run was cancelled."),
        }
    }
}

impl From<ValidationError> for ImpactError {
    fn from(err: ValidationError) -> Self {
        ImpactError::Validation(err)
    }
}

impl From<SpecificationError> for ImpactError {
    fn from(err: SpecificationError) -> Self {
        ImpactError::Specification(err)
    }
}

impl From<OptError> for ImpactError {
    fn from(err: OptError) -> Self {
        match err {
            OptError::NumericalInstability { t, value } => {
                ImpactError::NumericalInstability { t, value }
            }
            other => ImpactError::Optimization(other),
        }
    }
}

impl ImpactError {
    /// Shift window-relative time indices by `offset` so they point into the
    /// caller's series.
    pub(crate) fn offset_time(self, offset: usize) -> Self {
        match self {
            ImpactError::NumericalInstability { t, value } => {
                ImpactError::NumericalInstability { t: t + offset, value }
            }
            other => other,
        }
    }
}

/// Map model failures raised inside a likelihood evaluation onto the
/// optimizer's error surface.
impl From<ImpactError> for OptError {
    fn from(err: ImpactError) -> Self {
        match err {
            ImpactError::NumericalInstability { t, value } => {
                OptError::NumericalInstability { t, value }
            }
            ImpactError::Optimization(inner) => inner,
            other => OptError::BackendError { text: other.to_string() },
        }
    }
}

#[cfg(feature = "python-bindings")]
impl std::convert::From<ImpactError> for PyErr {
    fn from(err: ImpactError) -> PyErr {
        match err {
            ImpactError::Validation(_) | ImpactError::Specification(_) => {
                PyValueError::new_err(err.to_string())
            }
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

#[cfg(feature = "python-bindings")]
impl std::convert::From<ValidationError> for PyErr {
    fn from(err: ValidationError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(feature = "python-bindings")]
impl std::convert::From<SpecificationError> for PyErr {
    fn from(err: SpecificationError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Layer conversions and the context carried by error messages.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Numerical instability survives a round trip through the optimizer
    // error surface.
    //
    // Given
    // -----
    // - `ImpactError::NumericalInstability { t: 17, value: -1e-20 }`.
    //
    // Expect
    // ------
    // - `OptError::NumericalInstability` and back to the same `ImpactError`.
    fn numerical_instability_round_trips_through_opt_error() {
        let original = ImpactError::NumericalInstability { t: 17, value: -1e-20 };
        let opt: OptError = original.clone().into();
        assert_eq!(opt, OptError::NumericalInstability { t: 17, value: -1e-20 });
        assert_eq!(ImpactError::from(opt), original);
    }

    #[test]
    // Purpose
    // -------
    // Messages name the offending location.
    //
    // Given
    // -----
    // - A covariate error at row 12, column 1 and a custom-model conflict.
    //
    // Expect
    // ------
    // - Both positions and the field names appear in the text.
    fn messages_carry_context() {
        let err: ImpactError =
            ValidationError::NonFiniteCovariate { row: 12, col: 1, value: f64::NAN }.into();
        let text = err.to_string();
        assert!(text.contains("index 12") && text.contains("column 1"), "{text}");

        let conflict =
            SpecificationError::ConflictsWithCustomModel { fields: vec!["nseasons", "alpha"] };
        assert!(conflict.to_string().contains("nseasons, alpha"));
    }

    #[test]
    // Purpose
    // -------
    // Estimation failures report the parameters they stopped at.
    //
    // Given
    // -----
    // - A convergence failure at θ = [0.5, -1.0] and a sampling failure at
    //   θ = [2.0].
    //
    // Expect
    // ------
    // - Both messages print the parameter vector.
    fn estimation_failures_print_parameters() {
        let conv = ImpactError::Convergence {
            attempts: 2,
            status: "MaxItersReached".into(),
            theta: vec![0.5, -1.0],
        };
        let text = conv.to_string();
        assert!(text.contains("[0.5, -1.0]") && text.contains("MaxItersReached"), "{text}");

        let samp = ImpactError::Sampling { iteration: 3, redraws: 50, theta: vec![2.0] };
        let text = samp.to_string();
        assert!(text.contains("iteration 3") && text.contains("[2.0]"), "{text}");
    }

    #[test]
    // Purpose
    // -------
    // Window-relative instability indices are shifted into series positions;
    // other variants pass through.
    //
    // Given
    // -----
    // - `NumericalInstability { t: 1 }` and `Cancelled`, offset 5.
    //
    // Expect
    // ------
    // - `t = 6`, value unchanged; `Cancelled` unchanged.
    fn offset_time_shifts_instability_index() {
        let err = ImpactError::NumericalInstability { t: 1, value: 0.0 }.offset_time(5);
        assert_eq!(err, ImpactError::NumericalInstability { t: 6, value: 0.0 });
        assert_eq!(ImpactError::Cancelled.offset_time(5), ImpactError::Cancelled);
    }
}
