//! Least-squares regression and collinearity diagnostics for exogenous regressors.
//!
//! The fitter regresses the differenced target on the differenced regressors
//! before modelling the remaining autocorrelation. Before that regression is
//! attempted, [`residual_ratios`] measures how much of each regressor survives
//! projection onto the others, which is how rank deficiency is detected and
//! attributed to individual features.

use crate::error::{ForecastError, Result};
use crate::utils::stats::mean;

/// Ordinary least squares coefficients and residuals.
#[derive(Debug, Clone)]
pub struct OLSResult {
    /// One coefficient per design column, in design order.
    pub coefficients: Vec<f64>,
    /// y - X·beta.
    pub residuals: Vec<f64>,
    /// Residual sum of squares.
    pub rss: f64,
}

/// Fit y = X·beta by least squares. The design carries no implicit intercept.
///
/// Solves the normal equations with a Cholesky factorization; fails with
/// `ComputationError` when X'X is not positive definite.
pub fn ols_fit(y: &[f64], design: &[&[f64]]) -> Result<OLSResult> {
    let n = y.len();
    if n == 0 {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    for column in design {
        if column.len() != n {
            return Err(ForecastError::DimensionMismatch {
                expected: n,
                got: column.len(),
            });
        }
    }
    if design.is_empty() {
        let rss = y.iter().map(|v| v * v).sum();
        return Ok(OLSResult {
            coefficients: vec![],
            residuals: y.to_vec(),
            rss,
        });
    }
    if n < design.len() {
        return Err(ForecastError::InsufficientData {
            needed: design.len(),
            got: n,
        });
    }

    let k = design.len();
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for i in 0..k {
        xty[i] = dot(design[i], y);
        for j in 0..=i {
            let v = dot(design[i], design[j]);
            xtx[i][j] = v;
            xtx[j][i] = v;
        }
    }

    let beta = solve_symmetric(&xtx, &xty).ok_or_else(|| {
        ForecastError::ComputationError(
            "least squares failed: normal equations not positive definite".into(),
        )
    })?;

    let residuals: Vec<f64> = (0..n)
        .map(|t| y[t] - design.iter().zip(&beta).map(|(col, b)| col[t] * b).sum::<f64>())
        .collect();
    let rss = residuals.iter().map(|r| r * r).sum();

    Ok(OLSResult {
        coefficients: beta,
        residuals,
        rss,
    })
}

/// Solve a symmetric positive definite system A·x = b by Cholesky decomposition.
fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= a[i][i] * 1e-14 || sum <= 0.0 {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    let mut z = vec![0.0; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[i][j] * z[j]).sum();
        z[i] = (b[i] - sum) / l[i][i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[j][i] * x[j]).sum();
        x[i] = (z[i] - sum) / l[i][i];
    }

    Some(x)
}

/// Share of each column's energy left after projecting it onto the span of
/// the other columns (and onto a constant level term when `with_level`).
///
/// With the level term the energy is measured about the column mean, so an
/// offset does not mask the column's variation. A ratio of 1 means the
/// column is orthogonal to everything else; a ratio near 0 means it is
/// (nearly) an exact linear combination of the others. An all-zero column,
/// or a constant one when `with_level`, has ratio 0.
pub fn residual_ratios(columns: &[&[f64]], with_level: bool) -> Vec<f64> {
    let n = columns.first().map(|c| c.len()).unwrap_or(0);
    let level = vec![1.0; n];

    (0..columns.len())
        .map(|j| {
            let target = if with_level {
                centred(columns[j])
            } else {
                columns[j].to_vec()
            };
            let energy = dot(&target, &target);
            let raw = dot(columns[j], columns[j]);
            if energy <= f64::MIN_POSITIVE || energy <= 1e-24 * raw {
                return 0.0;
            }
            let mut basis: Vec<&[f64]> = Vec::with_capacity(columns.len());
            if with_level {
                basis.push(&level);
            }
            basis.extend(columns.iter().enumerate().filter(|(i, _)| *i != j).map(|(_, c)| *c));

            let q = orthonormalize(&basis);
            let residual = project_out(&target, &q);
            (dot(&residual, &residual) / energy).clamp(0.0, 1.0)
        })
        .collect()
}

fn centred(column: &[f64]) -> Vec<f64> {
    let m = mean(column);
    column.iter().map(|v| v - m).collect()
}

/// Modified Gram-Schmidt with one re-orthogonalization pass; dependent
/// vectors are skipped.
fn orthonormalize(vectors: &[&[f64]]) -> Vec<Vec<f64>> {
    let mut q: Vec<Vec<f64>> = Vec::with_capacity(vectors.len());
    for v in vectors {
        let norm_v = dot(v, v).sqrt();
        if norm_v <= f64::MIN_POSITIVE {
            continue;
        }
        let u = project_out(v, &q);
        let norm_u = dot(&u, &u).sqrt();
        if norm_u <= 1e-12 * norm_v {
            continue;
        }
        q.push(u.iter().map(|x| x / norm_u).collect());
    }
    q
}

fn project_out(v: &[f64], q: &[Vec<f64>]) -> Vec<f64> {
    let mut u = v.to_vec();
    for _ in 0..2 {
        for qi in q {
            let c = dot(&u, qi);
            for (x, qv) in u.iter_mut().zip(qi) {
                *x -= c * qv;
            }
        }
    }
    u
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
