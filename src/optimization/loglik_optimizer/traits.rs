//! Public API surface for log-likelihood maximization.
//!
//! - [`LogLikelihood`]: trait a model implements to be fitted.
//! - [`MLEOptions`] and [`Tolerances`]: optimizer configuration.
//! - [`LineSearcher`]: line search used inside L-BFGS.
//! - [`OptimOutcome`]: normalized result returned by `maximize`.
//!
//! Convention: we *maximize* `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`. An analytic
//! gradient, when provided, is `∇ℓ(θ)`; the adapter flips the sign.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        validation::{validate_theta_hat, validate_value, verify_tol_cost, verify_tol_grad},
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;
use std::str::FromStr;

/// Log-likelihood interface consumed by [`maximize`](super::maximize).
///
/// Required:
/// - `value(&Theta, &Data) -> OptResult<Cost>`: evaluate `ℓ(θ)`. Model
///   failures (e.g. a degenerate filter step) are returned as `OptError`.
/// - `check(&Theta, &Data) -> OptResult<()>`: reject obviously invalid
///   `θ`/`data` pairs. Called once before optimization.
///
/// Optional:
/// - `grad(&Theta, &Data) -> OptResult<Grad>`: analytic `∇ℓ(θ)`. The default
///   returns `GradientNotImplemented`, which switches the adapter to finite
///   differences.
pub trait LogLikelihood {
    type Data: 'static;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Line search used inside L-BFGS.
///
/// Parses case-insensitively from `"MoreThuente"` / `"HagerZhang"`; anything
/// else is `OptError::InvalidLineSearch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Optimizer-level configuration.
///
/// Fields
/// ------
/// - `tols`: stopping rules and iteration cap.
/// - `line_searcher`: line search used by L-BFGS.
/// - `verbose`: attach the terminal observer (only with the `obs_slog`
///   feature).
/// - `lbfgs_mem`: history size; `None` uses [`DEFAULT_LBFGS_MEM`](super::DEFAULT_LBFGS_MEM).
///
/// Default
/// -------
/// `tol_grad = 1e-5`, `tol_cost = 1e-9`, `max_iter = 500`, More–Thuente,
/// quiet, default memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
}

impl MLEOptions {
    /// Build options; numeric tolerances are validated by [`Tolerances::new`].
    ///
    /// # Errors
    /// - [`OptError::InvalidLBFGSMem`] when `lbfgs_mem == Some(0)`.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, verbose: bool, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if let Some(m) = lbfgs_mem {
            if m == 0 {
                return Err(OptError::InvalidLBFGSMem {
                    mem: m,
                    reason: "L-BFGS memory must be greater than zero.",
                });
            }
        }
        Ok(Self { tols, line_searcher, verbose, lbfgs_mem })
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances::default(),
            line_searcher: LineSearcher::MoreThuente,
            verbose: false,
            lbfgs_mem: None,
        }
    }
}

/// Numerical tolerances and iteration limits.
///
/// - `tol_grad`: stop when the gradient norm falls below this threshold.
/// - `tol_cost`: stop when the change in cost falls below this threshold.
/// - `max_iter`: hard cap on iterations. Hitting it is reported as
///   non-convergence by [`OptimOutcome`].
///
/// At least one of the three must be provided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if all three are `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for
    ///   non-finite or non-positive tolerances.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { tol_grad: Some(1e-5), tol_cost: Some(1e-9), max_iter: Some(500) }
    }
}

/// Result returned by `maximize`.
///
/// - `theta_hat`: best parameter vector found.
/// - `value`: best **log-likelihood** `ℓ(θ̂)` (not the cost).
/// - `converged`: `true` only when the solver met one of its convergence
///   criteria; running out of iterations, timeouts and interrupts are
///   `false`.
/// - `status`: human-readable termination status.
/// - `iterations`, `fn_evals`: Argmin counters.
/// - `grad_norm`: norm of the last gradient, if available.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// Build a validated outcome from raw solver state.
    ///
    /// # Errors
    /// - Propagates validation errors for `theta_hat` (missing or non-finite)
    ///   and `value` (non-finite).
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let (converged, status) = classify_termination(&termination);
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self {
            theta_hat,
            value,
            converged,
            status,
            iterations: iterations as usize,
            fn_evals,
            grad_norm,
        })
    }
}

fn classify_termination(termination: &TerminationStatus) -> (bool, String) {
    match termination {
        TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
        TerminationStatus::Terminated(reason) => {
            let converged = matches!(
                reason,
                TerminationReason::SolverConverged
                    | TerminationReason::TargetCostReached
                    | TerminationReason::SolverExit(_)
            );
            (converged, format!("{reason:?}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Construction rules for `Tolerances`/`MLEOptions`, line-search parsing,
    // and the mapping from Argmin termination states to `converged`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // All-`None` tolerances leave the solver without a stopping rule.
    //
    // Given
    // -----
    // - `Tolerances::new(None, None, None)`.
    //
    // Expect
    // ------
    // - `OptError::NoTolerancesProvided`.
    fn tolerances_require_at_least_one_rule() {
        let err = Tolerances::new(None, None, None).unwrap_err();
        assert_eq!(err, OptError::NoTolerancesProvided);
    }

    #[test]
    // Purpose
    // -------
    // Zero iterations and zero L-BFGS memory are rejected.
    //
    // Given
    // -----
    // - `max_iter = Some(0)` and `lbfgs_mem = Some(0)`.
    //
    // Expect
    // ------
    // - `InvalidMaxIter` and `InvalidLBFGSMem` respectively.
    fn zero_iterations_and_zero_memory_are_rejected() {
        assert!(matches!(
            Tolerances::new(Some(1e-6), None, Some(0)),
            Err(OptError::InvalidMaxIter { max_iter: 0, .. })
        ));
        let tols = Tolerances::default();
        assert!(matches!(
            MLEOptions::new(tols, LineSearcher::HagerZhang, false, Some(0)),
            Err(OptError::InvalidLBFGSMem { mem: 0, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Line-search names parse case-insensitively.
    //
    // Given
    // -----
    // - `"hagerZHANG"` and `"bisection"`.
    //
    // Expect
    // ------
    // - The first parses to `HagerZhang`; the second is `InvalidLineSearch`.
    fn line_searcher_parses_case_insensitively() {
        assert_eq!("hagerZHANG".parse::<LineSearcher>().unwrap(), LineSearcher::HagerZhang);
        assert!(matches!(
            "bisection".parse::<LineSearcher>(),
            Err(OptError::InvalidLineSearch { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Exhausting the iteration budget must not count as convergence.
    //
    // Given
    // -----
    // - A finite `theta_hat` and value with `MaxItersReached`, then the same
    //   inputs with `SolverConverged`.
    //
    // Expect
    // ------
    // - `converged == false` for the first and `true` for the second.
    fn max_iterations_is_reported_as_not_converged() {
        // Arrange
        let theta = array![0.5, -0.25];

        // Act
        let capped = OptimOutcome::new(
            Some(theta.clone()),
            -1.0,
            TerminationStatus::Terminated(TerminationReason::MaxItersReached),
            500,
            FnEvalMap::new(),
            None,
        )
        .unwrap();
        let done = OptimOutcome::new(
            Some(theta),
            -1.0,
            TerminationStatus::Terminated(TerminationReason::SolverConverged),
            12,
            FnEvalMap::new(),
            Some(array![3.0, 4.0]),
        )
        .unwrap();

        // Assert
        assert!(!capped.converged);
        assert!(done.converged);
        assert_eq!(done.grad_norm, Some(5.0));
    }
}
