//! Small statistics kernel shared by the simulator and the portfolio engine.
//!
//! Conventions follow the usual dataframe defaults: standard deviation and
//! covariance use the sample (n - 1) denominator, percentiles interpolate
//! linearly between order statistics.

use crate::core::error::{EngineError, EngineResult};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Trading days per year used for annualization.
pub const TRADING_DAYS: f64 = 252.0;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation. `None` for fewer than two observations.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Sample covariance matrix of column vectors stored row-major
/// (`rows[period][asset]`). Requires at least two rows.
pub fn covariance_matrix(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = rows.len();
    let k = rows.first().map(|r| r.len()).unwrap_or(0);
    let means: Vec<f64> = (0..k)
        .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n as f64)
        .collect();

    let mut cov = vec![vec![0.0; k]; k];
    for i in 0..k {
        for j in i..k {
            let s: f64 = rows
                .iter()
                .map(|r| (r[i] - means[i]) * (r[j] - means[j]))
                .sum();
            let c = s / (n as f64 - 1.0);
            cov[i][j] = c;
            cov[j][i] = c;
        }
    }
    cov
}

/// Percentile `q` in [0, 100] with linear interpolation between the two
/// nearest order statistics.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Quadratic form `wᵀ·Σ·w`.
pub fn quadratic_form(matrix: &[Vec<f64>], w: &[f64]) -> f64 {
    matrix
        .iter()
        .zip(w)
        .map(|(row, wi)| wi * row.iter().zip(w).map(|(m, wj)| m * wj).sum::<f64>())
        .sum()
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// The standard normal distribution N(0, 1).
pub fn standard_normal() -> EngineResult<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| EngineError::NumericDegenerate(e.to_string()))
}

/// Φ(x)
pub fn norm_cdf(n: &Normal, x: f64) -> f64 {
    n.cdf(x)
}

/// φ(x)
pub fn norm_pdf(n: &Normal, x: f64) -> f64 {
    n.pdf(x)
}

/// Φ⁻¹(p)
pub fn norm_ppf(n: &Normal, p: f64) -> f64 {
    n.inverse_cdf(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sample_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // population std is 2.0; sample std is sqrt(32/7)
        assert_relative_eq!(sample_std(&v).unwrap(), (32.0_f64 / 7.0).sqrt(), epsilon = 1e-12);
        assert!(sample_std(&[1.0]).is_none());
    }

    #[test]
    fn test_percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(percentile(&v, 50.0), 3.0);
        assert_relative_eq!(percentile(&v, 5.0), 1.2, epsilon = 1e-12);
        assert_relative_eq!(percentile(&v, 100.0), 5.0);
        assert_relative_eq!(percentile(&v, 0.0), 1.0);
    }

    #[test]
    fn test_percentile_unsorted_input() {
        let v = [5.0, 1.0, 4.0, 2.0, 3.0];
        assert_relative_eq!(percentile(&v, 25.0), 2.0);
    }

    #[test]
    fn test_covariance_matrix() {
        let rows = vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 6.0]];
        let cov = covariance_matrix(&rows);
        assert_relative_eq!(cov[0][0], 1.0);
        assert_relative_eq!(cov[1][1], 4.0);
        assert_relative_eq!(cov[0][1], 2.0);
        assert_relative_eq!(cov[1][0], 2.0);
    }

    #[test]
    fn test_quadratic_form() {
        let m = vec![vec![1.0, 0.5], vec![0.5, 2.0]];
        // [1,1] * M * [1,1]ᵀ = 1 + 0.5 + 0.5 + 2
        assert_relative_eq!(quadratic_form(&m, &[1.0, 1.0]), 4.0);
    }

    #[test]
    fn test_standard_normal() {
        let n = standard_normal().unwrap();
        assert_relative_eq!(norm_cdf(&n, 0.0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(norm_pdf(&n, 0.0), 0.398_942_280_401_432_7, epsilon = 1e-12);
        assert_relative_eq!(norm_ppf(&n, 0.05), -1.644_853_626_951_472, epsilon = 1e-6);
    }
}
