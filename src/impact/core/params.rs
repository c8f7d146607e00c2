//! Structural parameters, their unconstrained layout, and priors.
//!
//! Purpose
//! -------
//! Map between model parameters (variances and static coefficients) and the
//! unconstrained optimizer vector `θ`, and evaluate the variance and
//! coefficient log-priors that turn the likelihood into a posterior.
//!
//! Key behaviors
//! -------------
//! - [`ParamLayout`] fixes `θ = [θ_obs, θ_state_vars…, β_static…]`.
//! - Variances are `σ² = softplus(θ) + VARIANCE_FLOOR`; coefficients are
//!   unconstrained.
//! - [`ParamPriors`] holds inverse-gamma priors `IG(df/2, df/2 · guess²)` for
//!   each variance and zero-mean normal priors for static coefficients.
//! - [`log_jacobian`] is `Σ log σ'(θ_i)` over the variance entries, used when
//!   sampling in θ-space.
//!
//! Invariants & assumptions
//! ------------------------
//! - Priors are built on the model scale (standardized when requested), so
//!   prior guesses are multiples of the pre-period response sd.
//!
//! Conventions
//! -----------
//! - State variances follow `ModelStructure::variance_names` order.
use crate::{
    impact::{
        core::components::ModelStructure,
        errors::{SpecResult, SpecificationError},
    },
    optimization::numerical_stability::transformations::{
        VARIANCE_FLOOR, log_logistic, safe_softplus, safe_softplus_inv,
    },
};
use ndarray::{Array1, s};
use statrs::distribution::{Continuous, InverseGamma, Normal};

/// Degrees of freedom behind the level, slope, seasonal and dynamic priors.
pub const STATE_PRIOR_DF: f64 = 32.0;
/// Degrees of freedom behind the observation-variance prior.
pub const OBS_PRIOR_DF: f64 = 50.0;
/// Prior guess for slope, seasonal and dynamic sds, in response sds.
pub const SMALL_SD_FRACTION: f64 = 0.01;
/// Share of the response variance the prior expects in observation noise.
pub const OBS_VARIANCE_FRACTION: f64 = 0.2;
/// Static coefficient prior sd, in response sds per covariate sd.
pub const COEF_PRIOR_SD_MULTIPLE: f64 = 10.0;

/// Model parameters on their natural scale.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralParams {
    pub obs_variance: f64,
    pub state_variances: Array1<f64>,
    pub static_coefs: Array1<f64>,
}

impl StructuralParams {
    /// Validated constructor.
    ///
    /// Errors
    /// ------
    /// - `InvalidParameter` for a non-finite value, a non-positive observation
    ///   variance, or a negative state variance.
    pub fn new(
        obs_variance: f64, state_variances: Array1<f64>, static_coefs: Array1<f64>,
    ) -> SpecResult<Self> {
        if !(obs_variance.is_finite() && obs_variance > 0.0) {
            return Err(SpecificationError::InvalidParameter {
                name: "observation".to_string(),
                value: obs_variance,
            });
        }
        if let Some((i, &v)) =
            state_variances.iter().enumerate().find(|(_, v)| !(v.is_finite() && **v >= 0.0))
        {
            return Err(SpecificationError::InvalidParameter {
                name: format!("state_variances[{i}]"),
                value: v,
            });
        }
        if let Some((j, &v)) = static_coefs.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(SpecificationError::InvalidParameter {
                name: format!("beta_{j}"),
                value: v,
            });
        }
        Ok(Self { obs_variance, state_variances, static_coefs })
    }

    /// Check lengths against `structure`.
    pub fn check_layout(&self, structure: &ModelStructure) -> SpecResult<()> {
        if self.state_variances.len() != structure.n_state_variances() {
            return Err(SpecificationError::ParamLengthMismatch {
                what: "state variances",
                expected: structure.n_state_variances(),
                found: self.state_variances.len(),
            });
        }
        if self.static_coefs.len() != structure.n_static() {
            return Err(SpecificationError::ParamLengthMismatch {
                what: "static coefficients",
                expected: structure.n_static(),
                found: self.static_coefs.len(),
            });
        }
        Ok(())
    }

    /// Map an unconstrained `θ` onto parameters.
    ///
    /// Panics if `theta.len() != layout.len()` (programmer error).
    pub fn from_theta(theta: &Array1<f64>, layout: &ParamLayout) -> Self {
        let var = |t: f64| safe_softplus(t) + VARIANCE_FLOOR;
        let n_state = layout.n_state_variances;
        Self {
            obs_variance: var(theta[0]),
            state_variances: theta.slice(s![1..1 + n_state]).mapv(var),
            static_coefs: theta.slice(s![1 + n_state..]).to_owned(),
        }
    }

    /// Inverse of [`StructuralParams::from_theta`]; variances at or below the
    /// floor map to a very negative but finite `θ`.
    pub fn to_theta(&self) -> Array1<f64> {
        let unvar = |v: f64| safe_softplus_inv(v - VARIANCE_FLOOR);
        let mut theta =
            Vec::with_capacity(1 + self.state_variances.len() + self.static_coefs.len());
        theta.push(unvar(self.obs_variance));
        theta.extend(self.state_variances.iter().map(|&v| unvar(v)));
        theta.extend(self.static_coefs.iter().copied());
        Array1::from_vec(theta)
    }
}

/// Layout of `θ`: observation variance, state variances, static coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamLayout {
    pub n_state_variances: usize,
    pub n_static: usize,
}

impl ParamLayout {
    pub fn from_structure(structure: &ModelStructure) -> Self {
        Self { n_state_variances: structure.n_state_variances(), n_static: structure.n_static() }
    }

    pub fn len(&self) -> usize {
        1 + self.n_state_variances + self.n_static
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of leading variance entries in `θ`.
    pub fn n_variances(&self) -> usize {
        1 + self.n_state_variances
    }
}

/// Sum of the softplus log-derivatives over the variance entries of `θ`.
///
/// Adding this to the log-posterior in variance space gives the density of
/// `θ` itself.
pub fn log_jacobian(theta: &Array1<f64>, layout: &ParamLayout) -> f64 {
    theta.iter().take(layout.n_variances()).map(|&t| log_logistic(t)).sum()
}

/// Priors over every entry of the parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamPriors {
    obs: InverseGamma,
    state: Vec<InverseGamma>,
    coefs: Vec<Normal>,
    obs_guess: f64,
    state_guesses: Vec<f64>,
}

impl ParamPriors {
    /// Build priors from the response sd and the covariate sds.
    ///
    /// Parameters
    /// ----------
    /// - `prior_level_sd`: level sd guess, in response sds.
    /// - `sd_y`: pre-period response sd on the model scale.
    /// - `sd_x`: pre-period sd of each static covariate; zero is read as 1.
    ///
    /// Errors
    /// ------
    /// - `InvalidParameter` when a prior cannot be formed (non-finite or
    ///   non-positive scale).
    pub fn new(
        structure: &ModelStructure, prior_level_sd: f64, sd_y: f64, sd_x: &[f64],
    ) -> SpecResult<Self> {
        let inv_gamma = |name: &str, df: f64, guess_var: f64| {
            InverseGamma::new(df / 2.0, df / 2.0 * guess_var).map_err(|_| {
                SpecificationError::InvalidParameter { name: name.to_string(), value: guess_var }
            })
        };

        let obs_guess = OBS_VARIANCE_FRACTION * sd_y * sd_y;
        let obs = inv_gamma("observation", OBS_PRIOR_DF, obs_guess)?;

        let names = structure.variance_names();
        let mut state = Vec::with_capacity(names.len());
        let mut state_guesses = Vec::with_capacity(names.len());
        for name in &names {
            let fraction = if name == "level" { prior_level_sd } else { SMALL_SD_FRACTION };
            let guess_sd = fraction * sd_y;
            let guess = guess_sd * guess_sd;
            state.push(inv_gamma(name, STATE_PRIOR_DF, guess)?);
            state_guesses.push(guess);
        }

        let mut coefs = Vec::with_capacity(structure.n_static());
        for j in 0..structure.n_static() {
            let sx = sd_x.get(j).copied().filter(|v| v.is_finite() && *v > 0.0).unwrap_or(1.0);
            let sd = COEF_PRIOR_SD_MULTIPLE * sd_y / sx;
            coefs.push(Normal::new(0.0, sd).map_err(|_| SpecificationError::InvalidParameter {
                name: format!("beta_{j}"),
                value: sd,
            })?);
        }

        Ok(Self { obs, state, coefs, obs_guess, state_guesses })
    }

    /// Joint log-prior density of `params`.
    pub fn log_density(&self, params: &StructuralParams) -> f64 {
        let mut lp = self.obs.ln_pdf(params.obs_variance);
        for (prior, &v) in self.state.iter().zip(params.state_variances.iter()) {
            lp += prior.ln_pdf(v);
        }
        for (prior, &b) in self.coefs.iter().zip(params.static_coefs.iter()) {
            lp += prior.ln_pdf(b);
        }
        lp
    }

    /// Prior guess of the observation variance.
    pub fn obs_guess(&self) -> f64 {
        self.obs_guess
    }

    /// Prior guesses of the state variances in layout order.
    pub fn state_guesses(&self) -> &[f64] {
        &self.state_guesses
    }
}
