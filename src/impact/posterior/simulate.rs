//! Posterior-predictive trajectories beyond the pre-period.
//!
//! A trajectory starts from a draw of the state at the last pre-period
//! index, `α ~ N(a_{T|T}, P_{T|T})`, then propagates
//! `α_{t+1} = T_t α_t + η_t` and emits `y_t = Z_tᵀ α_t + d_t + ε_t` for every
//! later index of the window. Because no response is observed after the
//! pre-period, this is a draw from the joint predictive distribution of the
//! censored stretch.
use crate::impact::{
    core::state_space::StateSpace,
    errors::ImpactResult,
    filter::kalman::run_filter,
};
use crate::optimization::numerical_stability::transformations::psd_factor;
use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use rand_distr::StandardNormal;

/// Filtered state at the end of the pre-period, ready for sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalState {
    pub mean: Array1<f64>,
    /// `L` with `L Lᵀ = P_{T|T}`.
    pub factor: Array2<f64>,
    /// Number of pre-period indices the filter consumed.
    pub pre_len: usize,
}

impl TerminalState {
    /// Filter `y_pre` and factor the final covariance.
    ///
    /// Errors
    /// ------
    /// - `ImpactError::NumericalInstability` from the filter.
    pub fn from_filter(ss: &StateSpace, y_pre: ArrayView1<f64>) -> ImpactResult<Self> {
        let out = run_filter(ss, y_pre, 0, false)?;
        Ok(Self { factor: psd_factor(&out.last_cov), mean: out.last_mean, pre_len: y_pre.len() })
    }
}

/// One predictive path for indices `pre_len..ss.n_obs()` on the model scale.
pub fn simulate_path<R: Rng>(
    ss: &StateSpace, start: &TerminalState, rng: &mut R,
) -> Array1<f64> {
    let m = ss.dim();
    let n = ss.n_obs();
    let h_sd = ss.obs_variance().sqrt();
    let draw = |rng: &mut R| rng.sample::<f64, _>(StandardNormal);

    let noise = Array1::from_shape_fn(m, |_| draw(rng));
    let mut alpha = &start.mean + &start.factor.dot(&noise);
    let mut z = Array1::<f64>::zeros(m);
    let mut path = Array1::<f64>::zeros(n.saturating_sub(start.pre_len));

    for (k, t) in (start.pre_len..n).enumerate() {
        let prev = t - 1;
        alpha = ss.transition(prev).dot(&alpha);
        for (i, q) in ss.disturbance_var(prev).iter().enumerate() {
            if *q > 0.0 {
                alpha[i] += q.sqrt() * draw(rng);
            }
        }
        ss.fill_z(t, &mut z);
        path[k] = z.dot(&alpha) + ss.offset(t) + h_sd * draw(rng);
    }
    path
}
