//! Least-squares fit of the pre-period response on the covariates.
//!
//! Used for starting values (static coefficients, observation variance) and
//! for the prior mean of dynamic coefficients. Rows with a missing response
//! are skipped. The fit includes an intercept that the level absorbs later.
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, ArrayView1, ArrayView2};
use statrs::statistics::Statistics;

/// Result of an ordinary least-squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    pub intercept: f64,
    pub coefs: Array1<f64>,
    pub residual_variance: f64,
    /// Sample variance of the observed response.
    pub response_variance: f64,
}

/// Fit `y = c + x β + e` on rows where `y` is observed.
///
/// Solved through an SVD so collinear covariates give the minimum-norm
/// solution. With too few rows the coefficients are zero and the residual
/// variance is the response variance. The residual variance is floored at
/// `1e-4 ×` the response variance.
pub fn ols(y: ArrayView1<f64>, x: ArrayView2<f64>) -> OlsFit {
    let k = x.ncols();
    let rows: Vec<usize> = (0..y.len()).filter(|&i| !y[i].is_nan()).collect();
    let m = rows.len();
    let ys: Vec<f64> = rows.iter().map(|&i| y[i]).collect();

    let mean = if m > 0 { ys.iter().mean() } else { 0.0 };
    let response_variance = if m > 1 { ys.iter().variance() } else { 1.0 };
    let floor = 1e-4 * response_variance.max(f64::MIN_POSITIVE);

    let fallback = OlsFit {
        intercept: mean,
        coefs: Array1::zeros(k),
        residual_variance: response_variance.max(floor),
        response_variance,
    };
    if k == 0 || m <= k + 1 {
        return fallback;
    }

    let design =
        DMatrix::<f64>::from_fn(m, k + 1, |i, j| if j == 0 { 1.0 } else { x[[rows[i], j - 1]] });
    let rhs = DVector::from_vec(ys);
    let beta = match design.clone().svd(true, true).solve(&rhs, 1e-12) {
        Ok(b) if b.iter().all(|v| v.is_finite()) => b,
        _ => return fallback,
    };

    let resid = &rhs - &design * &beta;
    let dof = (m - k - 1).max(1) as f64;
    let residual_variance = (resid.norm_squared() / dof).max(floor);

    OlsFit {
        intercept: beta[0],
        coefs: Array1::from_shape_fn(k, |j| beta[j + 1]),
        residual_variance,
        response_variance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Exact recovery, missing rows, the too-few-rows fallback, and the
    // response variance.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Coefficients of a noiseless linear relation are recovered while
    // skipping missing responses.
    //
    // Given
    // -----
    // - y = 2 + 3 x with one NaN response.
    //
    // Expect
    // ------
    // - intercept ≈ 2, slope ≈ 3, residual variance at its floor.
    fn recovers_noiseless_coefficients() {
        let x = Array2::from_shape_fn((8, 1), |(i, _)| i as f64);
        let mut y = x.column(0).mapv(|v| 2.0 + 3.0 * v);
        y[4] = f64::NAN;

        let fit = ols(y.view(), x.view());

        assert!((fit.intercept - 2.0).abs() < 1e-9);
        assert!((fit.coefs[0] - 3.0).abs() < 1e-9);
        assert!((fit.residual_variance - 1e-4 * fit.response_variance).abs() < 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Too few rows fall back to zero coefficients.
    //
    // Given
    // -----
    // - Two observations and two covariates.
    //
    // Expect
    // ------
    // - Zero coefficients, intercept = mean.
    fn few_rows_fall_back_to_mean() {
        let x = array![[1.0, 2.0], [3.0, 5.0]];
        let y = array![1.0, 3.0];

        let fit = ols(y.view(), x.view());

        assert_eq!(fit.coefs, array![0.0, 0.0]);
        assert_eq!(fit.intercept, 2.0);
    }

    #[test]
    // Purpose
    // -------
    // The response variance is the sample variance of the observed rows.
    //
    // Given
    // -----
    // - y = [1, 2, NaN, 4], no covariates.
    //
    // Expect
    // ------
    // - response variance 7/3 (n − 1 denominator), intercept 7/3.
    fn response_variance_skips_missing_rows() {
        let y = array![1.0, 2.0, f64::NAN, 4.0];
        let x = Array2::<f64>::zeros((4, 0));

        let fit = ols(y.view(), x.view());

        assert!((fit.response_variance - 7.0 / 3.0).abs() < 1e-12);
        assert!((fit.intercept - 7.0 / 3.0).abs() < 1e-12);
        assert_eq!(fit.residual_variance, fit.response_variance);
    }
}
