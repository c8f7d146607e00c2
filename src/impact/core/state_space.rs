//! Linear Gaussian state-space form of a structural model.
//!
//! Purpose
//! -------
//! Assemble, for given parameters, the system
//!
//! ```text
//! y_t     = Z_tᵀ α_t + d_t + ε_t,        ε_t ~ N(0, H)
//! α_{t+1} = T_t α_t + η_t,               η_t ~ N(0, diag(Q_t))
//! α_0     ~ N(a_0, P_0)
//! ```
//!
//! from the block layout in `ModelStructure`.
//!
//! Key behaviors
//! -------------
//! - Transition and disturbance variances are precomputed for a regular step
//!   and for a season-boundary step; [`StateSpace::transition`] picks one
//!   by time index.
//! - `Z_t` is a fixed selector plus `x_t` on the dynamic-regression states;
//!   `d_t = x_tᵀ β` carries static regression.
//! - [`InitialState`] gives level, trend and seasonal states a
//!   diffuse-approximate prior and starts dynamic coefficients at their OLS
//!   estimates.
//!
//! Invariants & assumptions
//! ------------------------
//! - The seasonal transition applies between `t` and `t + 1` exactly when
//!   `(t + 1) % season_duration == 0`; otherwise the seasonal block is held
//!   fixed with zero disturbance.
//! - `x` has one row per time index of the series being filtered.
//!
//! Conventions
//! -----------
//! - Dense `ndarray` matrices; the state dimension is small.
//! - Borrowing: a `StateSpace` views the covariates and the initial state
//!   and owns only the precomputed system matrices, so building one per
//!   parameter draw is cheap.
use crate::impact::core::{
    components::{Component, ModelStructure},
    params::StructuralParams,
    regression::OlsFit,
    standardize::Standardizer,
};
use ndarray::{Array1, Array2, ArrayView2};

/// Variance multiplier for diffuse-approximate initial states.
pub const DIFFUSE_SCALE: f64 = 1e6;

/// Prior mean and covariance of the first state.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialState {
    pub a0: Array1<f64>,
    pub p0: Array2<f64>,
}

impl InitialState {
    /// Build from an OLS fit of the pre-period response on `x_pre`.
    ///
    /// Level, trend and seasonal states get zero mean and variance
    /// `DIFFUSE_SCALE · var(y_pre)`. Dynamic coefficient `j` gets mean
    /// `β̂_j` and variance `var(y_pre) / var(x_j)`.
    pub fn new(structure: &ModelStructure, fit: &OlsFit, x_pre: ArrayView2<f64>) -> Self {
        let m = structure.state_dim();
        let var_y = fit.response_variance;
        let mut a0 = Array1::zeros(m);
        let mut p0 = Array2::zeros((m, m));
        for i in 0..structure.diffuse_dim() {
            p0[[i, i]] = DIFFUSE_SCALE * var_y;
        }
        let off = structure.dynamic_offset();
        for j in 0..structure.n_dynamic() {
            let sd_x = Standardizer::fit(x_pre.column(j)).sd;
            a0[off + j] = fit.coefs.get(j).copied().unwrap_or(0.0);
            p0[[off + j, off + j]] = var_y / (sd_x * sd_x);
        }
        Self { a0, p0 }
    }
}

/// System matrices for one parameter value over one covariate matrix.
#[derive(Debug, Clone)]
pub struct StateSpace<'a> {
    z_fixed: Array1<f64>,
    dyn_offset: usize,
    n_dynamic: usize,
    x: ArrayView2<'a, f64>,
    offset: Array1<f64>,
    h: f64,
    t_regular: Array2<f64>,
    t_boundary: Array2<f64>,
    q_regular: Array1<f64>,
    q_boundary: Array1<f64>,
    season_duration: Option<usize>,
    init: &'a InitialState,
}

impl<'a> StateSpace<'a> {
    /// Assemble the system for `params`.
    ///
    /// Panics if `params` does not match `structure` or `init` has the wrong
    /// dimension (checked by callers through `StructuralParams::check_layout`).
    pub fn new(
        structure: &ModelStructure, params: &StructuralParams, x: ArrayView2<'a, f64>,
        init: &'a InitialState,
    ) -> Self {
        let m = structure.state_dim();
        let mut z_fixed = Array1::zeros(m);
        let mut t_regular = Array2::zeros((m, m));
        let mut t_boundary = Array2::zeros((m, m));
        let mut q_regular = Array1::zeros(m);
        let mut q_boundary = Array1::zeros(m);
        let mut season_duration = None;
        let mut state = 0;
        let mut var = 0;

        for c in structure.components() {
            match *c {
                Component::LocalLevel => {
                    z_fixed[state] = 1.0;
                    t_regular[[state, state]] = 1.0;
                    q_regular[state] = params.state_variances[var];
                }
                Component::LocalLinearTrend => {
                    z_fixed[state] = 1.0;
                    t_regular[[state, state]] = 1.0;
                    t_regular[[state, state + 1]] = 1.0;
                    t_regular[[state + 1, state + 1]] = 1.0;
                    q_regular[state] = params.state_variances[var];
                    q_regular[state + 1] = params.state_variances[var + 1];
                }
                Component::Seasonal { nseasons, season_duration: d } => {
                    let k = nseasons - 1;
                    z_fixed[state] = 1.0;
                    for i in 0..k {
                        t_regular[[state + i, state + i]] = 1.0;
                        t_boundary[[state, state + i]] = -1.0;
                        if i > 0 {
                            t_boundary[[state + i, state + i - 1]] = 1.0;
                        }
                    }
                    q_boundary[state] = params.state_variances[var];
                    season_duration = Some(d);
                }
                Component::DynamicRegression { n_covariates } => {
                    for j in 0..n_covariates {
                        t_regular[[state + j, state + j]] = 1.0;
                        q_regular[state + j] = params.state_variances[var + j];
                    }
                }
                Component::StaticRegression { .. } => {}
            }
            state += c.state_dim();
            var += c.n_variances();
        }

        // Outside the seasonal block a boundary step is a regular step.
        let seas = structure.seasonal_offset()..structure.dynamic_offset();
        for i in 0..m {
            if !(season_duration.is_some() && seas.contains(&i)) {
                q_boundary[i] = q_regular[i];
                for j in 0..m {
                    t_boundary[[i, j]] = t_regular[[i, j]];
                }
            }
        }

        let offset = if params.static_coefs.is_empty() {
            Array1::zeros(x.nrows())
        } else {
            x.dot(&params.static_coefs)
        };

        Self {
            z_fixed,
            dyn_offset: structure.dynamic_offset(),
            n_dynamic: structure.n_dynamic(),
            x,
            offset,
            h: params.obs_variance,
            t_regular,
            t_boundary,
            q_regular,
            q_boundary,
            season_duration,
            init,
        }
    }

    pub fn dim(&self) -> usize {
        self.z_fixed.len()
    }

    /// Number of time indices covered by the covariates.
    pub fn n_obs(&self) -> usize {
        self.x.nrows()
    }

    pub fn obs_variance(&self) -> f64 {
        self.h
    }

    pub fn initial_state(&self) -> &InitialState {
        self.init
    }

    /// Write `Z_t` into `z`.
    pub fn fill_z(&self, t: usize, z: &mut Array1<f64>) {
        z.assign(&self.z_fixed);
        for j in 0..self.n_dynamic {
            z[self.dyn_offset + j] = self.x[[t, j]];
        }
    }

    /// Static-regression offset `d_t`.
    pub fn offset(&self, t: usize) -> f64 {
        self.offset[t]
    }

    fn is_boundary(&self, t: usize) -> bool {
        self.season_duration.is_some_and(|d| (t + 1) % d == 0)
    }

    /// `T_t`, mapping `α_t` to `α_{t+1}`.
    pub fn transition(&self, t: usize) -> &Array2<f64> {
        if self.is_boundary(t) { &self.t_boundary } else { &self.t_regular }
    }

    /// Diagonal of `Q_t`, the variance of `η_t`.
    pub fn disturbance_var(&self, t: usize) -> &Array1<f64> {
        if self.is_boundary(t) { &self.q_boundary } else { &self.q_regular }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impact::core::regression::ols;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Block layout of T, Q and Z for trend, seasonal and dynamic blocks.
    // - Season-boundary switching.
    // - Diffuse and OLS-based initial states.
    // -------------------------------------------------------------------------

    fn params(state: Array1<f64>, coefs: Array1<f64>) -> StructuralParams {
        StructuralParams::new(0.5, state, coefs).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Seasonal dynamics switch on only at season boundaries.
    //
    // Given
    // -----
    // - Level + seasonal(nseasons = 3, season_duration = 2).
    //
    // Expect
    // ------
    // - T_0 is the identity with zero seasonal variance; T_1 has the
    //   sum-to-zero row [-1, -1] and the seasonal variance.
    fn seasonal_block_moves_only_at_boundaries() {
        let structure = ModelStructure::new(vec![
            Component::LocalLevel,
            Component::Seasonal { nseasons: 3, season_duration: 2 },
        ])
        .unwrap();
        let p = params(array![0.1, 0.2], array![]);
        let x = Array2::<f64>::zeros((4, 0));
        let init = InitialState { a0: Array1::zeros(3), p0: Array2::eye(3) };
        let ss = StateSpace::new(&structure, &p, x.view(), &init);

        assert_eq!(ss.transition(0), &Array2::<f64>::eye(3));
        assert_eq!(ss.disturbance_var(0), &array![0.1, 0.0, 0.0]);
        assert_eq!(
            ss.transition(1),
            &array![[1.0, 0.0, 0.0], [0.0, -1.0, -1.0], [0.0, 1.0, 0.0]]
        );
        assert_eq!(ss.disturbance_var(1), &array![0.1, 0.2, 0.0]);
    }

    #[test]
    // Purpose
    // -------
    // Regression enters through Z_t (dynamic) or d_t (static).
    //
    // Given
    // -----
    // - Trend + dynamic(1) and level + static(1) with β = 2.
    //
    // Expect
    // ------
    // - Z_t = [1, 0, x_t]; trend T block [[1, 1], [0, 1]]; d_t = 2 x_t.
    fn regression_enters_through_z_or_offset() {
        let x = array![[3.0], [5.0]];

        let dynamic = ModelStructure::new(vec![
            Component::LocalLinearTrend,
            Component::DynamicRegression { n_covariates: 1 },
        ])
        .unwrap();
        let init = InitialState { a0: Array1::zeros(3), p0: Array2::eye(3) };
        let p = params(array![0.1, 0.2, 0.3], array![]);
        let ss = StateSpace::new(&dynamic, &p, x.view(), &init);
        let mut z = Array1::zeros(3);
        ss.fill_z(1, &mut z);
        assert_eq!(z, array![1.0, 0.0, 5.0]);
        assert_eq!(ss.transition(0)[[0, 1]], 1.0);
        assert_eq!(ss.offset(1), 0.0);

        let fixed = ModelStructure::new(vec![
            Component::LocalLevel,
            Component::StaticRegression { n_covariates: 1 },
        ])
        .unwrap();
        let init = InitialState { a0: Array1::zeros(1), p0: Array2::eye(1) };
        let ss = StateSpace::new(&fixed, &params(array![0.1], array![2.0]), x.view(), &init);
        assert_eq!(ss.offset(0), 6.0);
        assert_eq!(ss.offset(1), 10.0);
    }

    #[test]
    // Purpose
    // -------
    // Initial states are diffuse for structural blocks and OLS-centred for
    // dynamic coefficients.
    //
    // Given
    // -----
    // - Level + dynamic(1), y = 1 + 2 x on six points.
    //
    // Expect
    // ------
    // - a0 = [0, 2]; P0[0,0] = 1e6 var(y); P0[1,1] = var(y) / var(x).
    fn initial_state_is_diffuse_plus_ols() {
        let structure = ModelStructure::new(vec![
            Component::LocalLevel,
            Component::DynamicRegression { n_covariates: 1 },
        ])
        .unwrap();
        let x = Array2::from_shape_fn((6, 1), |(i, _)| i as f64);
        let y = x.column(0).mapv(|v| 1.0 + 2.0 * v);
        let fit = ols(y.view(), x.view());

        let init = InitialState::new(&structure, &fit, x.view());

        assert_eq!(init.a0[0], 0.0);
        assert!((init.a0[1] - 2.0).abs() < 1e-9);
        assert!((init.p0[[0, 0]] - DIFFUSE_SCALE * fit.response_variance).abs() < 1e-6);
        assert!((init.p0[[1, 1]] - 4.0).abs() < 1e-9);
    }
}
