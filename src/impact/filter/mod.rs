//! filter — Kalman filtering and smoothing over a [`StateSpace`].
//!
//! - [`kalman`]: forward pass with missing-value skips, Joseph-form updates,
//!   one-step-ahead forecasts, and the Gaussian log-likelihood.
//! - [`smoother`]: Durbin–Koopman backward pass and the component
//!   decomposition of the smoothed states.
//!
//! [`StateSpace`]: crate::impact::core::StateSpace

pub mod kalman;
pub mod smoother;

pub use self::kalman::{FilterOutput, log_likelihood, run_filter};
pub use self::smoother::{ComponentDecomposition, StateTrajectory, smooth};
