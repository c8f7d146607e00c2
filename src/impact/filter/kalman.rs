//! Kalman filter with missing observations and a diffuse burn-in.
//!
//! Purpose
//! -------
//! Run the forward recursion for a [`StateSpace`] over a response series,
//! returning the Gaussian log-likelihood and, on request, every quantity the
//! smoother and the prediction tables need.
//!
//! Key behaviors
//! -------------
//! - Prediction error `v_t = y_t − Z_tᵀ a_t − d_t`, variance
//!   `F_t = Z_tᵀ P_t Z_t + H`, gain `K_t = P_t Z_t / F_t`.
//! - Filtered covariance in Joseph form
//!   `(I − K Zᵀ) P (I − K Zᵀ)ᵀ + H K Kᵀ`, then symmetrized; the predicted
//!   covariance `T P Tᵀ + Q` is symmetrized too.
//! - A missing `y_t` (`NaN`) skips the update, so forecasts through a
//!   censored stretch are the multi-step predictions.
//! - The first `burn` observed steps are excluded from the log-likelihood.
//!
//! Invariants & assumptions
//! ------------------------
//! - On an observed step, `F_t` must be finite and above
//!   [`MIN_INNOVATION_VARIANCE`]; otherwise the run fails with
//!   `ImpactError::NumericalInstability { t, value: F_t }`.
//! - `y.len() ≤ ss.n_obs()`.
//!
//! Testing notes
//! -------------
//! - Unit tests compare against the closed-form local-level recursion, check
//!   the burn-in, missing-data handling and the instability error.
use crate::impact::{
    core::state_space::StateSpace,
    errors::{ImpactError, ImpactResult},
};
use crate::optimization::numerical_stability::transformations::symmetrize_in_place;
use ndarray::{Array1, Array2, ArrayView1};

/// Smallest innovation variance accepted on an observed step.
pub const MIN_INNOVATION_VARIANCE: f64 = 1e-14;

const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Output of [`run_filter`].
///
/// Per-step vectors are filled only when `store` was requested; the
/// log-likelihood and the final filtered state are always present.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterOutput {
    /// `a_t`, the state mean before seeing `y_t`.
    pub predicted_mean: Vec<Array1<f64>>,
    /// `P_t`.
    pub predicted_cov: Vec<Array2<f64>>,
    /// `E[y_t | y_{<t}] = Z_tᵀ a_t + d_t`.
    pub forecast_mean: Vec<f64>,
    /// `F_t`.
    pub forecast_var: Vec<f64>,
    /// `v_t`, `NaN` on missing steps.
    pub innovations: Vec<f64>,
    /// `K_t = P_t Z_t / F_t`, zero on missing steps.
    pub gains: Vec<Array1<f64>>,
    /// Filtered mean at the last step.
    pub last_mean: Array1<f64>,
    /// Filtered covariance at the last step.
    pub last_cov: Array2<f64>,
    pub loglik: f64,
    /// Observations that contributed to `loglik`.
    pub n_used: usize,
}

/// Run the filter over `y`.
///
/// Parameters
/// ----------
/// - `ss`: system matrices; must cover at least `y.len()` time indices.
/// - `y`: response on the model scale, `NaN` where missing.
/// - `burn`: observed steps excluded from the log-likelihood.
/// - `store`: keep per-step quantities for smoothing and prediction.
///
/// Errors
/// ------
/// - `ImpactError::NumericalInstability` on a degenerate innovation
///   variance.
pub fn run_filter(
    ss: &StateSpace, y: ArrayView1<f64>, burn: usize, store: bool,
) -> ImpactResult<FilterOutput> {
    let m = ss.dim();
    let n = y.len();
    let h = ss.obs_variance();
    let eye = Array2::<f64>::eye(m);

    let mut out = FilterOutput::default();
    if store {
        out.predicted_mean.reserve(n);
        out.predicted_cov.reserve(n);
        out.forecast_mean.reserve(n);
        out.forecast_var.reserve(n);
        out.innovations.reserve(n);
        out.gains.reserve(n);
    }

    let mut a = ss.initial_state().a0.clone();
    let mut p = ss.initial_state().p0.clone();
    let mut z = Array1::<f64>::zeros(m);
    let mut observed = 0usize;
    let mut loglik = 0.0;

    for t in 0..n {
        ss.fill_z(t, &mut z);
        let yhat = z.dot(&a) + ss.offset(t);
        let pz = p.dot(&z);
        let f = z.dot(&pz) + h;

        let (a_filt, p_filt, v, k) = if y[t].is_nan() {
            (a.clone(), p.clone(), f64::NAN, Array1::zeros(m))
        } else {
            if !f.is_finite() || f <= MIN_INNOVATION_VARIANCE {
                return Err(ImpactError::NumericalInstability { t, value: f });
            }
            let v = y[t] - yhat;
            let k = &pz / f;
            let a_filt = &a + &(&k * v);

            let kz = outer(&k, &z);
            let l = &eye - &kz;
            let mut p_filt = l.dot(&p).dot(&l.t()) + outer(&k, &k) * h;
            symmetrize_in_place(&mut p_filt);

            observed += 1;
            if observed > burn {
                loglik -= 0.5 * (LN_2PI + f.ln() + v * v / f);
                out.n_used += 1;
            }
            (a_filt, p_filt, v, k)
        };

        if store {
            out.predicted_mean.push(a.clone());
            out.predicted_cov.push(p.clone());
            out.forecast_mean.push(yhat);
            out.forecast_var.push(f);
            out.innovations.push(v);
            out.gains.push(k);
        }

        if t + 1 == n {
            out.last_mean = a_filt;
            out.last_cov = p_filt;
            break;
        }

        let tt = ss.transition(t);
        a = tt.dot(&a_filt);
        p = tt.dot(&p_filt).dot(&tt.t());
        for (i, q) in ss.disturbance_var(t).iter().enumerate() {
            p[[i, i]] += q;
        }
        symmetrize_in_place(&mut p);
    }

    if n == 0 {
        out.last_mean = a;
        out.last_cov = p;
    }
    out.loglik = loglik;
    Ok(out)
}

/// Log-likelihood of `y` excluding the first `burn` observed steps.
pub fn log_likelihood(ss: &StateSpace, y: ArrayView1<f64>, burn: usize) -> ImpactResult<f64> {
    Ok(run_filter(ss, y, burn, false)?.loglik)
}

/// `u vᵀ`.
pub(crate) fn outer(u: &Array1<f64>, v: &Array1<f64>) -> Array2<f64> {
    Array2::from_shape_fn((u.len(), v.len()), |(i, j)| u[i] * v[j])
}
