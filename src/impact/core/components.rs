//! Structural components and their block layout.
//!
//! Purpose
//! -------
//! Describe the model as a tagged union of [`Component`]s and derive every
//! dimension the state-space builder and parameter layout need: state
//! offsets, disturbance variances, diffuse states, and regression sizes.
//!
//! Key behaviors
//! -------------
//! - [`ModelStructure::from_spec`] maps a `ModelSpec` onto components.
//! - [`ModelStructure::new`] validates a caller-supplied component list and
//!   sorts it into canonical block order: level or trend, seasonal,
//!   regression.
//!
//! Invariants & assumptions
//! ------------------------
//! - Exactly one of `LocalLevel` / `LocalLinearTrend` is present.
//! - At most one seasonal block (`nseasons ≥ 2`, `season_duration ≥ 1`).
//! - At most one regression block with at least one covariate.
//!
//! Conventions
//! -----------
//! - State order follows block order. Disturbance variances follow the same
//!   order and are named by [`ModelStructure::variance_names`].
use crate::impact::{
    core::spec::ModelSpec,
    errors::{SpecResult, SpecificationError},
};

/// One additive block of the structural model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// Random-walk level (1 state).
    LocalLevel,
    /// Level plus random-walk slope (2 states). Replaces `LocalLevel`.
    LocalLinearTrend,
    /// Dummy-variable seasonal block with `nseasons − 1` states.
    Seasonal { nseasons: usize, season_duration: usize },
    /// Fixed coefficients entering as an observation offset (no states).
    StaticRegression { n_covariates: usize },
    /// Random-walk coefficients (one state each).
    DynamicRegression { n_covariates: usize },
}

impl Component {
    pub fn state_dim(&self) -> usize {
        match self {
            Component::LocalLevel => 1,
            Component::LocalLinearTrend => 2,
            Component::Seasonal { nseasons, .. } => nseasons.saturating_sub(1),
            Component::StaticRegression { .. } => 0,
            Component::DynamicRegression { n_covariates } => *n_covariates,
        }
    }

    /// Number of disturbance variances the block contributes.
    pub fn n_variances(&self) -> usize {
        match self {
            Component::LocalLevel => 1,
            Component::LocalLinearTrend => 2,
            Component::Seasonal { .. } => 1,
            Component::StaticRegression { .. } => 0,
            Component::DynamicRegression { n_covariates } => *n_covariates,
        }
    }

    /// States initialised with a diffuse-approximate prior.
    pub fn diffuse_dim(&self) -> usize {
        match self {
            Component::LocalLevel | Component::LocalLinearTrend | Component::Seasonal { .. } => {
                self.state_dim()
            }
            _ => 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Component::LocalLevel => "local_level",
            Component::LocalLinearTrend => "local_linear_trend",
            Component::Seasonal { .. } => "seasonal",
            Component::StaticRegression { .. } => "static_regression",
            Component::DynamicRegression { .. } => "dynamic_regression",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Component::LocalLevel | Component::LocalLinearTrend => 0,
            Component::Seasonal { .. } => 1,
            Component::StaticRegression { .. } | Component::DynamicRegression { .. } => 2,
        }
    }
}

/// Validated, canonically ordered list of components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStructure {
    components: Vec<Component>,
}

impl ModelStructure {
    /// Validate and order a component list.
    ///
    /// Errors
    /// ------
    /// - `InvalidComponents` when the trend block is missing or duplicated,
    ///   a block appears twice, or a regression has no covariates.
    /// - `InvalidSeasons` / `InvalidSeasonDuration` for a degenerate seasonal
    ///   block.
    pub fn new(mut components: Vec<Component>) -> SpecResult<Self> {
        let invalid =
            |reason: &str| SpecificationError::InvalidComponents { reason: reason.into() };

        let count = |rank: u8| components.iter().filter(|c| c.rank() == rank).count();
        match count(0) {
            1 => {}
            0 => return Err(invalid("a local level or local linear trend is required")),
            _ => return Err(invalid("only one of local level / local linear trend is allowed")),
        }
        if count(1) > 1 {
            return Err(invalid("at most one seasonal component is supported"));
        }
        if count(2) > 1 {
            return Err(invalid("at most one regression component is supported"));
        }

        for c in &components {
            match *c {
                Component::Seasonal { nseasons, season_duration } => {
                    if nseasons < 2 {
                        return Err(SpecificationError::InvalidSeasons {
                            nseasons,
                            reason: "a seasonal component needs at least two seasons.",
                        });
                    }
                    if season_duration == 0 {
                        return Err(SpecificationError::InvalidSeasonDuration {
                            season_duration,
                            reason: "each season must span at least one time point.",
                        });
                    }
                }
                Component::StaticRegression { n_covariates }
                | Component::DynamicRegression { n_covariates } => {
                    if n_covariates == 0 {
                        return Err(invalid("a regression component needs covariates"));
                    }
                }
                _ => {}
            }
        }

        components.sort_by_key(Component::rank);
        Ok(Self { components })
    }

    /// Components implied by `spec` and the number of covariates.
    pub fn from_spec(spec: &ModelSpec, n_covariates: usize) -> SpecResult<Self> {
        let mut components = vec![if spec.local_trend {
            Component::LocalLinearTrend
        } else {
            Component::LocalLevel
        }];
        if spec.has_seasonal() {
            components.push(Component::Seasonal {
                nseasons: spec.nseasons,
                season_duration: spec.season_duration,
            });
        }
        if n_covariates > 0 {
            components.push(if spec.dynamic_regression {
                Component::DynamicRegression { n_covariates }
            } else {
                Component::StaticRegression { n_covariates }
            });
        }
        Self::new(components)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn state_dim(&self) -> usize {
        self.components.iter().map(Component::state_dim).sum()
    }

    /// Disturbance variances, excluding the observation variance.
    pub fn n_state_variances(&self) -> usize {
        self.components.iter().map(Component::n_variances).sum()
    }

    pub fn diffuse_dim(&self) -> usize {
        self.components.iter().map(Component::diffuse_dim).sum()
    }

    pub fn has_trend(&self) -> bool {
        self.components.contains(&Component::LocalLinearTrend)
    }

    /// `(nseasons, season_duration)` of the seasonal block, if any.
    pub fn seasonal(&self) -> Option<(usize, usize)> {
        self.components.iter().find_map(|c| match *c {
            Component::Seasonal { nseasons, season_duration } => Some((nseasons, season_duration)),
            _ => None,
        })
    }

    pub fn n_static(&self) -> usize {
        self.components
            .iter()
            .find_map(|c| match *c {
                Component::StaticRegression { n_covariates } => Some(n_covariates),
                _ => None,
            })
            .unwrap_or(0)
    }

    pub fn n_dynamic(&self) -> usize {
        self.components
            .iter()
            .find_map(|c| match *c {
                Component::DynamicRegression { n_covariates } => Some(n_covariates),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// Covariates the model expects, static or dynamic.
    pub fn n_covariates(&self) -> usize {
        self.n_static() + self.n_dynamic()
    }

    /// Offset of the first seasonal state.
    pub fn seasonal_offset(&self) -> usize {
        if self.has_trend() { 2 } else { 1 }
    }

    /// Offset of the first dynamic-regression state.
    pub fn dynamic_offset(&self) -> usize {
        self.seasonal_offset() + self.seasonal().map_or(0, |(s, _)| s - 1)
    }

    /// Estimated parameters: observation variance, state variances, and
    /// static coefficients.
    pub fn n_params(&self) -> usize {
        1 + self.n_state_variances() + self.n_static()
    }

    /// Names of the state disturbance variances in layout order.
    pub fn variance_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.n_state_variances());
        for c in &self.components {
            match *c {
                Component::LocalLevel => names.push("level".to_string()),
                Component::LocalLinearTrend => {
                    names.push("level".to_string());
                    names.push("slope".to_string());
                }
                Component::Seasonal { .. } => names.push("seasonal".to_string()),
                Component::DynamicRegression { n_covariates } => {
                    names.extend((0..n_covariates).map(|j| format!("dynamic_{j}")));
                }
                Component::StaticRegression { .. } => {}
            }
        }
        names
    }

    /// Names of every entry of θ: observation, state variances, coefficients.
    pub fn param_names(&self) -> Vec<String> {
        let mut names = vec!["observation".to_string()];
        names.extend(self.variance_names());
        names.extend((0..self.n_static()).map(|j| format!("beta_{j}")));
        names
    }
}
