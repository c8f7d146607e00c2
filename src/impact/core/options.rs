//! Run-time configuration: seeding, worker pool, optimizer and sampler
//! settings, and cooperative cancellation.
//!
//! Purpose
//! -------
//! Keep every knob that affects a run in explicit values passed to
//! `CausalImpact::run`, so two runs with equal inputs and equal
//! [`RunConfig`] produce identical results.
//!
//! Key behaviors
//! -------------
//! - [`CancelToken`] is a cloneable flag checked before each MCMC iteration
//!   and each posterior-predictive draw.
//! - [`McmcOptions`] bounds burn-in, proposal re-draws, and the proposal
//!   scale.
//! - [`RunConfig`] carries the seed, the worker-pool bound, optimizer options
//!   and sampler options; [`draw_seed`] derives per-draw RNG seeds.
//!
//! Invariants & assumptions
//! ------------------------
//! - `max_workers`, when set, is at least 1.
//! - `max_redraws ≥ 1` and `proposal_scale` is finite and > 0.
use crate::{
    impact::errors::{ImpactError, ImpactResult, SpecResult, SpecificationError},
    optimization::loglik_optimizer::MLEOptions,
};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared cancellation flag.
///
/// Clones observe the same flag; cancelling any clone stops the run at the
/// next check with `ImpactError::Cancelled`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the flag is set.
    pub fn check(&self) -> ImpactResult<()> {
        if self.is_cancelled() { Err(ImpactError::Cancelled) } else { Ok(()) }
    }
}

/// Random-walk Metropolis settings.
///
/// - `burn_in`: discarded iterations; `None` means `niter / 10`.
/// - `max_redraws`: proposals with non-finite posterior density that may be
///   re-drawn within one iteration before giving up.
/// - `proposal_scale`: multiplier on the proposal standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct McmcOptions {
    pub burn_in: Option<usize>,
    pub max_redraws: usize,
    pub proposal_scale: f64,
}

impl McmcOptions {
    /// Validated constructor.
    ///
    /// Errors
    /// ------
    /// - `InvalidRunConfig` for `max_redraws == 0` or a non-positive /
    ///   non-finite `proposal_scale`.
    pub fn new(
        burn_in: Option<usize>, max_redraws: usize, proposal_scale: f64,
    ) -> SpecResult<Self> {
        if max_redraws == 0 {
            return Err(SpecificationError::InvalidRunConfig {
                field: "max_redraws",
                reason: "must be at least 1.",
            });
        }
        if !(proposal_scale.is_finite() && proposal_scale > 0.0) {
            return Err(SpecificationError::InvalidRunConfig {
                field: "proposal_scale",
                reason: "must be finite and > 0.",
            });
        }
        Ok(Self { burn_in, max_redraws, proposal_scale })
    }

    pub fn burn_in_for(&self, niter: usize) -> usize {
        self.burn_in.unwrap_or(niter / 10)
    }
}

impl Default for McmcOptions {
    fn default() -> Self {
        Self { burn_in: None, max_redraws: 50, proposal_scale: 1.0 }
    }
}

/// Everything a run needs besides data and model settings.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub seed: u64,
    pub max_workers: Option<usize>,
    pub mle_opts: MLEOptions,
    pub mcmc_opts: McmcOptions,
    pub cancel: CancelToken,
}

impl RunConfig {
    /// Validated constructor.
    ///
    /// Errors
    /// ------
    /// - `InvalidRunConfig` when `max_workers == Some(0)`.
    pub fn new(
        seed: u64, max_workers: Option<usize>, mle_opts: MLEOptions, mcmc_opts: McmcOptions,
        cancel: CancelToken,
    ) -> SpecResult<Self> {
        check_max_workers(max_workers)?;
        Ok(Self { seed, max_workers, mle_opts, mcmc_opts, cancel })
    }

    /// Same configuration with a different seed.
    pub fn with_seed(&self, seed: u64) -> Self {
        Self { seed, ..self.clone() }
    }

    /// Thread pool bounded by `max_workers` (rayon's default otherwise).
    ///
    /// Errors
    /// ------
    /// - `SpecificationError::InvalidRunConfig` for `max_workers = Some(0)`,
    ///   which rayon would read as "all cores".
    /// - `ImpactError::WorkerPool` when rayon cannot start the threads.
    pub fn build_pool(&self) -> ImpactResult<ThreadPool> {
        check_max_workers(self.max_workers)?;
        let mut builder = ThreadPoolBuilder::new();
        if let Some(n) = self.max_workers {
            builder = builder.num_threads(n);
        }
        builder.build().map_err(|e| ImpactError::WorkerPool { reason: e.to_string() })
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_workers: None,
            mle_opts: MLEOptions::default(),
            mcmc_opts: McmcOptions::default(),
            cancel: CancelToken::new(),
        }
    }
}

fn check_max_workers(max_workers: Option<usize>) -> SpecResult<()> {
    if max_workers == Some(0) {
        return Err(SpecificationError::InvalidRunConfig {
            field: "max_workers",
            reason: "must be at least 1.",
        });
    }
    Ok(())
}

const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;
const CHAIN_STREAM: u64 = 0xD1B5_4A32_D192_ED03;

/// Seed for draw `i`; distinct draws get well-separated streams.
pub fn draw_seed(seed: u64, i: usize) -> u64 {
    seed.wrapping_add((i as u64).wrapping_add(1).wrapping_mul(SEED_STRIDE))
}

/// Seed for the MCMC chain and the optimizer restart.
pub fn chain_seed(seed: u64) -> u64 {
    seed ^ CHAIN_STREAM
}
