//! High-level entry point for maximizing a [`LogLikelihood`].
//!
//! Picks an L-BFGS solver with Hager–Zhang or More–Thuente line search, wraps
//! the model in an [`ArgMinAdapter`] (which *minimizes* `-ℓ(θ)`), and hands the
//! run to [`run_lbfgs`].
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, LogLikelihood, MLEOptions},
    },
};

/// Maximize `ℓ(θ)` with L-BFGS and the configured line search.
///
/// Parameters
/// ----------
/// - `f`: model implementing [`LogLikelihood`].
/// - `theta0`: starting point (consumed by the executor).
/// - `data`: payload passed to `value`/`grad`.
/// - `opts`: tolerances, line search, verbosity and L-BFGS memory.
///
/// Errors
/// ------
/// - Anything returned by `f.check`.
/// - Solver configuration errors from the builders.
/// - Runtime errors from the executor, including model evaluation failures
///   raised inside `f.value` (they keep their `OptError` variant).
///
/// Returns
/// -------
/// An [`OptimOutcome`] with `θ̂`, `ℓ(θ̂)`, termination status and counters.
/// A run that stops on its iteration cap returns `Ok` with
/// `converged == false`; deciding whether to retry is the caller's job.
///
/// Example
/// -------
/// ```ignore
/// let outcome = maximize(&model, theta0, &data, &MLEOptions::default())?;
/// if !outcome.converged { /* retry from a perturbed start */ }
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}
