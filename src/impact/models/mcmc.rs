//! Random-walk Metropolis over the unconstrained model parameters.
//!
//! Purpose
//! -------
//! Draw `θ` from the posterior `p(θ | y_pre) ∝ L(θ) p(σ²(θ)) |dσ²/dθ|`,
//! starting at the posterior mode.
//!
//! Key behaviors
//! -------------
//! - Gaussian proposal with covariance `s² · (2.38² / d) · J⁺`, where `J⁺` is
//!   the pseudo-inverse of the observed information at the mode and `s` is
//!   `McmcOptions::proposal_scale`. When `J⁺` is unusable the proposal falls
//!   back to `s² · 0.1² · I`.
//! - Proposals with a non-finite target (including degenerate filter steps)
//!   are re-drawn up to `max_redraws` times per iteration, then the run fails
//!   with `ImpactError::Sampling`.
//! - `burn_in` iterations are discarded and `niter` draws retained.
//! - The cancel token is checked before every iteration.
//!
//! Invariants & assumptions
//! ------------------------
//! - The chain owns one `StdRng`; identical seeds give identical chains.
use crate::impact::{
    core::options::{CancelToken, McmcOptions},
    errors::{ImpactError, ImpactResult},
    models::structural::{EstimationData, StructuralModel},
};
use crate::optimization::numerical_stability::transformations::psd_factor;
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;
use tracing::{debug, info};

/// Optimal random-walk scaling constant for Gaussian targets.
pub const RWM_SCALE: f64 = 2.38;

/// Fallback proposal sd per coordinate.
pub const FALLBACK_PROPOSAL_SD: f64 = 0.1;

/// Retained draws and chain statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct McmcOutput {
    pub draws: Vec<Array1<f64>>,
    pub acceptance_rate: f64,
    pub burn_in: usize,
}

impl McmcOutput {
    /// Coordinate-wise mean of the retained draws.
    pub fn mean(&self) -> Array1<f64> {
        let d = self.draws.first().map_or(0, |t| t.len());
        let mut mean = Array1::zeros(d);
        for theta in &self.draws {
            mean += theta;
        }
        if !self.draws.is_empty() {
            mean /= self.draws.len() as f64;
        }
        mean
    }
}

/// Proposal factor `L` with `L Lᵀ` the proposal covariance.
fn proposal_factor(cov: Option<Array2<f64>>, d: usize, scale: f64) -> Array2<f64> {
    let usable = cov.filter(|c| {
        c.iter().all(|v| v.is_finite()) && (0..d).all(|i| c[[i, i]] > 0.0)
    });
    match usable {
        Some(c) => psd_factor(&(c * (scale * scale * RWM_SCALE * RWM_SCALE / d as f64))),
        None => {
            debug!("observed information unusable; using an isotropic proposal");
            Array2::eye(d) * (scale * FALLBACK_PROPOSAL_SD)
        }
    }
}

/// Run the chain.
///
/// Parameters
/// ----------
/// - `model`, `data`: posterior objective and pre-period data.
/// - `theta_mode`: starting point (posterior mode).
/// - `niter`: retained draws.
/// - `opts`: burn-in, re-draw budget and proposal scale.
/// - `seed`: chain RNG seed.
/// - `cancel`: checked before every iteration.
///
/// Errors
/// ------
/// - `ImpactError::Cancelled`.
/// - `ImpactError::Sampling { iteration, redraws, theta }` when no finite
///   proposal is found within the budget.
/// - Filter errors at the starting point.
pub fn run_metropolis(
    model: &StructuralModel, data: &EstimationData, theta_mode: &Array1<f64>, niter: usize,
    opts: &McmcOptions, seed: u64, cancel: &CancelToken,
) -> ImpactResult<McmcOutput> {
    let d = theta_mode.len();
    let factor = proposal_factor(model.covariance(data, theta_mode), d, opts.proposal_scale);
    let target = |theta: &Array1<f64>| model.log_target(theta, data);
    sample_chain(target, theta_mode, &factor, niter, opts, seed, cancel)
}

/// Metropolis loop over an arbitrary log-density.
fn sample_chain<F>(
    target: F, start: &Array1<f64>, factor: &Array2<f64>, niter: usize, opts: &McmcOptions,
    seed: u64, cancel: &CancelToken,
) -> ImpactResult<McmcOutput>
where
    F: Fn(&Array1<f64>) -> ImpactResult<f64>,
{
    let d = start.len();
    let burn_in = opts.burn_in_for(niter);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut current = start.clone();
    let mut current_lp = target(&current)?;
    let mut accepted = 0usize;
    let mut draws = Vec::with_capacity(niter);

    for iteration in 0..burn_in + niter {
        cancel.check()?;

        let mut redraws = 0;
        let (proposal, proposal_lp) = loop {
            let noise = Array1::from_shape_fn(d, |_| rng.sample::<f64, _>(StandardNormal));
            let candidate = &current + &factor.dot(&noise);
            match target(&candidate) {
                Ok(lp) if lp.is_finite() => break (candidate, lp),
                _ if redraws < opts.max_redraws => redraws += 1,
                _ => {
                    return Err(ImpactError::Sampling {
                        iteration,
                        redraws,
                        theta: current.to_vec(),
                    });
                }
            }
        };

        let log_u: f64 = rng.sample::<f64, _>(rand::distributions::Open01).ln();
        if log_u < proposal_lp - current_lp {
            current = proposal;
            current_lp = proposal_lp;
            if iteration >= burn_in {
                accepted += 1;
            }
        }
        if iteration >= burn_in {
            draws.push(current.clone());
        }
    }

    let acceptance_rate = accepted as f64 / niter.max(1) as f64;
    info!(niter, burn_in, acceptance_rate, "mcmc finished");
    Ok(McmcOutput { draws, acceptance_rate, burn_in })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impact::core::components::{Component, ModelStructure};
    use ndarray::Array2;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Draw counts, burn-in, and reproducibility for a fixed seed.
    // - Cancellation before the first iteration.
    // - Failure once the re-draw budget is spent.
    // - The isotropic fallback proposal.
    // -------------------------------------------------------------------------

    fn level_model() -> (StructuralModel, EstimationData) {
        let y = Array1::from_shape_fn(40, |i| ((i as f64) * 0.4).sin() + 0.05 * (i as f64));
        let x = Array2::<f64>::zeros((40, 0));
        let structure = ModelStructure::new(vec![Component::LocalLevel]).unwrap();
        StructuralModel::new(structure, 0.01, y.view(), x.view()).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // The chain keeps `niter` draws after burn-in and is reproducible.
    //
    // Given
    // -----
    // - Level model, niter = 60, burn_in = 20, seed 5, run twice.
    //
    // Expect
    // ------
    // - 60 draws, identical across runs, acceptance rate in [0, 1].
    fn chain_is_reproducible_and_sized() {
        let (model, data) = level_model();
        let opts = McmcOptions::new(Some(20), 50, 1.0).unwrap();
        let start = model.start_theta();
        let cancel = CancelToken::new();

        let a = run_metropolis(&model, &data, &start, 60, &opts, 5, &cancel).unwrap();
        let b = run_metropolis(&model, &data, &start, 60, &opts, 5, &cancel).unwrap();

        assert_eq!(a.draws.len(), 60);
        assert_eq!(a.burn_in, 20);
        assert_eq!(a, b);
        assert!((0.0..=1.0).contains(&a.acceptance_rate));
        assert_eq!(a.mean().len(), start.len());
    }

    #[test]
    // Purpose
    // -------
    // A cancelled token stops the chain before any work.
    //
    // Given
    // -----
    // - A token cancelled up front.
    //
    // Expect
    // ------
    // - `Err(Cancelled)`.
    fn cancelled_chain_returns_error() {
        let (model, data) = level_model();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = run_metropolis(
            &model,
            &data,
            &model.start_theta(),
            10,
            &McmcOptions::default(),
            1,
            &cancel,
        )
        .unwrap_err();

        assert_eq!(err, ImpactError::Cancelled);
    }

    #[test]
    // Purpose
    // -------
    // An unusable covariance falls back to a scaled identity.
    //
    // Given
    // -----
    // - No covariance, d = 3, scale 2.
    //
    // Expect
    // ------
    // - 0.2 · I.
    fn unusable_covariance_falls_back_to_identity() {
        let f = proposal_factor(None, 3, 2.0);
        assert_eq!(f, Array2::eye(3) * 0.2);
    }

    #[test]
    // Purpose
    // -------
    // A chain whose proposals never have finite density stops once the
    // re-draw budget is spent and reports where it was.
    //
    // Given
    // -----
    // - A target finite only at the origin, start at the origin, identity
    //   proposal, no burn-in, max_redraws = 3.
    //
    // Expect
    // ------
    // - `Sampling { iteration: 0, redraws: 3, theta: [0, 0] }`.
    fn exhausted_redraws_return_sampling_error() {
        let target = |theta: &Array1<f64>| -> ImpactResult<f64> {
            Ok(if theta.iter().all(|v| *v == 0.0) { 0.0 } else { f64::NAN })
        };
        let opts = McmcOptions::new(Some(0), 3, 1.0).unwrap();

        let err = sample_chain(
            target,
            &Array1::zeros(2),
            &Array2::eye(2),
            10,
            &opts,
            9,
            &CancelToken::new(),
        )
        .unwrap_err();

        assert_eq!(err, ImpactError::Sampling { iteration: 0, redraws: 3, theta: vec![0.0, 0.0] });
    }
}
