//! posterior — counterfactual simulation and effect aggregation.
//!
//! Purpose
//! -------
//! Draw posterior-predictive trajectories for the censored part of the
//! window on a bounded worker pool, and summarize them against the observed
//! post-period into pointwise, cumulative and whole-period effects.
//!
//! Invariants & assumptions
//! ------------------------
//! - Draw `i` always uses the RNG stream `draw_seed(seed, i)`, so outputs
//!   are reproducible and independent of the worker count.
//! - Effects are computed on the original response scale.

pub mod effects;
pub mod pool;
pub mod simulate;

pub use self::effects::{EffectEstimate, Estimate, PeriodEffect};
pub use self::pool::DrawPool;
pub use self::simulate::{TerminalState, simulate_path};
