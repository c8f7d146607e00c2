//! loglik_optimizer::builders — L-BFGS solver construction helpers.
//!
//! Purpose
//! -------
//! Build L-BFGS solvers for the log-likelihood optimizer and apply the
//! tolerances from [`MLEOptions`], so callers never touch Argmin's generic
//! wiring.
//!
//! Conventions
//! -----------
//! - Builders do **not** set `theta0` or `max_iters`; both are runtime
//!   concerns applied by `run_lbfgs`.
//! - L-BFGS memory comes from `opts.lbfgs_mem`, falling back to
//!   [`DEFAULT_LBFGS_MEM`].
//! - Argmin rejections of a tolerance surface as
//!   [`OptError`](crate::optimization::errors::OptError) through `OptResult`.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Theta,
        },
    },
};

/// L-BFGS with Hager–Zhang line search and the tolerances in `opts`.
///
/// Errors
/// ------
/// - `OptError` when Argmin rejects `tol_grad` or `tol_cost`.
pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)
}

/// L-BFGS with More–Thuente line search and the tolerances in `opts`.
///
/// Errors
/// ------
/// - `OptError` when Argmin rejects `tol_grad` or `tol_cost`.
pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)
}

/// Apply the optional gradient and cost-change tolerances to an L-BFGS
/// solver, whatever its line search. `None` keeps Argmin's default.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}
