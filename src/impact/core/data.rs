//! Input series, analysis periods, and the prepared estimation window.
//!
//! Purpose
//! -------
//! Validate a response series with optional covariates, resolve the
//! pre/post periods against the series index, and produce a
//! [`PreparedData`] window on the model scale that the rest of the stack can
//! consume without re-checking anything.
//!
//! Key behaviors
//! -------------
//! - [`ImpactData::new`] checks lengths, rejects infinite responses and any
//!   missing or non-finite covariate, and requires strictly increasing
//!   timestamps.
//! - [`ImpactData::prepare`] resolves [`Period`] bounds (inclusive), checks
//!   ordering and coverage, optionally standardizes on pre-period moments,
//!   and censors every response after the pre-period.
//!
//! Invariants & assumptions
//! ------------------------
//! - User-facing bounds are inclusive; [`PreparedData`] stores half-open
//!   ranges relative to the window start.
//! - Observations before the pre-period are dropped. Points between the
//!   pre-period end and the post-period start stay in the window as missing
//!   and are excluded from effects.
//! - Post-period actuals must all be observed.
//!
//! Conventions
//! -----------
//! - A response `NaN` means "missing"; ±∞ is invalid.
//! - Covariates are an `n × k` matrix; `k = 0` means no regression.
//!
//! Testing notes
//! -------------
//! - Unit tests cover each validation failure plus a gap between periods.
use crate::impact::{
    core::standardize::DataScaler,
    errors::{ValidationError, ValidationResult},
};
use chrono::NaiveDateTime;
use ndarray::{Array1, Array2, s};
use std::ops::Range;

/// How positions in the series are labelled.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesIndex {
    /// Positions `0..n`.
    Ordinal(usize),
    /// One strictly increasing timestamp per observation.
    Timestamps(Vec<NaiveDateTime>),
}

impl SeriesIndex {
    pub fn len(&self) -> usize {
        match self {
            SeriesIndex::Ordinal(n) => *n,
            SeriesIndex::Timestamps(ts) => ts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One end of a period, by position or by timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeriodBound {
    Index(usize),
    Timestamp(NaiveDateTime),
}

/// Inclusive `[start, end]` period over the series index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Period {
    pub start: PeriodBound,
    pub end: PeriodBound,
}

impl Period {
    pub fn new(start: PeriodBound, end: PeriodBound) -> Self {
        Self { start, end }
    }

    /// Period between two positions, both inclusive.
    pub fn indices(start: usize, end: usize) -> Self {
        Self::new(PeriodBound::Index(start), PeriodBound::Index(end))
    }

    /// Period between two timestamps, both inclusive.
    pub fn timestamps(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self::new(PeriodBound::Timestamp(start), PeriodBound::Timestamp(end))
    }
}

/// Validated response series with aligned covariates and index.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactData {
    response: Array1<f64>,
    covariates: Array2<f64>,
    index: SeriesIndex,
}

impl ImpactData {
    /// Construct validated input data.
    ///
    /// Parameters
    /// ----------
    /// - `response`: observed series; `NaN` marks a missing value.
    /// - `covariates`: optional `n × k` matrix of control series.
    /// - `index`: optional labels; defaults to `SeriesIndex::Ordinal(n)`.
    ///
    /// Errors
    /// ------
    /// - `EmptySeries`, `NonFiniteResponse`, `LengthMismatch`,
    ///   `NonFiniteCovariate` (first offending cell), or
    ///   `TimestampsNotIncreasing`.
    pub fn new(
        response: Array1<f64>, covariates: Option<Array2<f64>>, index: Option<SeriesIndex>,
    ) -> ValidationResult<Self> {
        let n = response.len();
        if n == 0 {
            return Err(ValidationError::EmptySeries);
        }
        if let Some((index, &value)) = response.iter().enumerate().find(|(_, v)| v.is_infinite())
        {
            return Err(ValidationError::NonFiniteResponse { index, value });
        }

        let covariates = covariates.unwrap_or_else(|| Array2::zeros((n, 0)));
        if covariates.nrows() != n {
            return Err(ValidationError::LengthMismatch {
                what: "covariate rows",
                expected: n,
                found: covariates.nrows(),
            });
        }
        for ((row, col), &value) in covariates.indexed_iter() {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteCovariate { row, col, value });
            }
        }

        let index = index.unwrap_or(SeriesIndex::Ordinal(n));
        if index.len() != n {
            return Err(ValidationError::LengthMismatch {
                what: "series index",
                expected: n,
                found: index.len(),
            });
        }
        if let SeriesIndex::Timestamps(ts) = &index {
            if let Some(i) = ts.windows(2).position(|w| w[1] <= w[0]) {
                return Err(ValidationError::TimestampsNotIncreasing { index: i + 1 });
            }
        }

        Ok(Self { response, covariates, index })
    }

    pub fn len(&self) -> usize {
        self.response.len()
    }

    pub fn is_empty(&self) -> bool {
        self.response.is_empty()
    }

    pub fn n_covariates(&self) -> usize {
        self.covariates.ncols()
    }

    pub fn response(&self) -> &Array1<f64> {
        &self.response
    }

    pub fn covariates(&self) -> &Array2<f64> {
        &self.covariates
    }

    pub fn index(&self) -> &SeriesIndex {
        &self.index
    }

    /// Resolve an inclusive period to `(start, end)` positions.
    ///
    /// Timestamp bounds map to the first position at or after `start` and the
    /// last position at or before `end`; either bound outside the series
    /// extent is an error.
    pub fn resolve_period(
        &self, period: &Period, which: &'static str,
    ) -> ValidationResult<(usize, usize)> {
        let start = self.resolve_bound(period.start, which, true)?;
        let end = self.resolve_bound(period.end, which, false)?;
        if start > end {
            return Err(ValidationError::EmptyPeriod { period: which });
        }
        Ok((start, end))
    }

    fn resolve_bound(
        &self, bound: PeriodBound, which: &'static str, is_start: bool,
    ) -> ValidationResult<usize> {
        let n = self.len();
        match (bound, &self.index) {
            (PeriodBound::Index(i), _) => {
                if i >= n {
                    return Err(ValidationError::PeriodOutOfRange {
                        period: which,
                        bound: i.to_string(),
                    });
                }
                Ok(i)
            }
            (PeriodBound::Timestamp(_), SeriesIndex::Ordinal(_)) => {
                Err(ValidationError::BoundKindMismatch { period: which })
            }
            (PeriodBound::Timestamp(ts), SeriesIndex::Timestamps(stamps)) => {
                let out_of_range =
                    || ValidationError::PeriodOutOfRange { period: which, bound: ts.to_string() };
                let (first, last) = match (stamps.first(), stamps.last()) {
                    (Some(f), Some(l)) => (*f, *l),
                    _ => return Err(out_of_range()),
                };
                if ts < first || ts > last {
                    return Err(out_of_range());
                }
                if is_start {
                    stamps.iter().position(|s| *s >= ts).ok_or_else(out_of_range)
                } else {
                    stamps.iter().rposition(|s| *s <= ts).ok_or_else(out_of_range)
                }
            }
        }
    }

    /// Resolve periods, validate coverage, and build the model-scale window.
    ///
    /// Errors
    /// ------
    /// - Period errors from [`ImpactData::resolve_period`].
    /// - `PeriodsOverlap` unless pre ends before post starts.
    /// - `NoPreObservations`, `ConstantPreResponse`, `MissingPostActual`.
    pub fn prepare(
        &self, pre: &Period, post: &Period, standardize: bool,
    ) -> ValidationResult<PreparedData> {
        let (pre_start, pre_end) = self.resolve_period(pre, "pre")?;
        let (post_start, post_end) = self.resolve_period(post, "post")?;
        if pre_end >= post_start {
            return Err(ValidationError::PeriodsOverlap { pre_end, post_start });
        }

        let y_pre = self.response.slice(s![pre_start..=pre_end]);
        let observed: Vec<f64> = y_pre.iter().copied().filter(|v| !v.is_nan()).collect();
        let first = match observed.first() {
            Some(v) => *v,
            None => return Err(ValidationError::NoPreObservations),
        };
        if observed.iter().all(|v| *v == first) {
            return Err(ValidationError::ConstantPreResponse { value: first });
        }
        if let Some(offset) =
            self.response.slice(s![post_start..=post_end]).iter().position(|v| v.is_nan())
        {
            return Err(ValidationError::MissingPostActual { index: post_start + offset });
        }

        let x_window = self.covariates.slice(s![pre_start..=post_end, ..]);
        let y_actual = self.response.slice(s![pre_start..=post_end]).to_owned();
        let pre_len = pre_end - pre_start + 1;

        let scaler = if standardize {
            DataScaler::fit(y_pre, x_window.slice(s![..pre_len, ..]))
        } else {
            DataScaler::identity(self.n_covariates())
        };

        let mut y = scaler.response.transform_array(y_actual.view());
        y.slice_mut(s![pre_len..]).fill(f64::NAN);
        let mut x = x_window.to_owned();
        for (mut col, s) in x.columns_mut().into_iter().zip(scaler.covariates.iter()) {
            col.mapv_inplace(|v| s.transform(v));
        }

        let timestamps = match &self.index {
            SeriesIndex::Timestamps(ts) => Some(ts[pre_start..=post_end].to_vec()),
            SeriesIndex::Ordinal(_) => None,
        };

        Ok(PreparedData {
            y,
            x,
            y_actual,
            pre: 0..pre_len,
            post: (post_start - pre_start)..(post_end - pre_start + 1),
            window_start: pre_start,
            scaler,
            timestamps,
        })
    }
}

/// Model-ready window from the pre-period start to the post-period end.
///
/// - `y`: response on the model scale, `NaN` from the pre-period end onward.
/// - `x`: covariates on the model scale (`len × k`).
/// - `y_actual`: raw response over the window.
/// - `pre`, `post`: half-open ranges relative to `window_start`.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedData {
    pub y: Array1<f64>,
    pub x: Array2<f64>,
    pub y_actual: Array1<f64>,
    pub pre: Range<usize>,
    pub post: Range<usize>,
    pub window_start: usize,
    pub scaler: DataScaler,
    pub timestamps: Option<Vec<NaiveDateTime>>,
}

impl PreparedData {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn n_covariates(&self) -> usize {
        self.x.ncols()
    }

    /// Number of observed (non-missing) pre-period responses.
    pub fn n_pre_observed(&self) -> usize {
        self.y.slice(s![self.pre.clone()]).iter().filter(|v| !v.is_nan()).count()
    }

    /// Raw post-period actuals.
    pub fn post_actual(&self) -> Array1<f64> {
        self.y_actual.slice(s![self.post.clone()]).to_owned()
    }
}
