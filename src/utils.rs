//! Shared numeric utilities for the tax_forecast crate

use crate::error::{ForecastError, Result};

/// Empirical quantile with linear interpolation between order statistics.
///
/// Matches the numpy default interpolation so interval bounds line up with
/// the original forecasting output.
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(ForecastError::MathError(
            "Cannot take quantile of empty slice".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(ForecastError::InvalidParameter(format!(
            "Quantile must be in [0, 1], got {}",
            q
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let frac = h - lo as f64;

    if lo + 1 < sorted.len() {
        Ok(sorted[lo] + frac * (sorted[lo + 1] - sorted[lo]))
    } else {
        Ok(sorted[lo])
    }
}

/// Arithmetic mean
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Sample skewness (biased, moment-based)
pub fn skewness(values: &[f64]) -> f64 {
    let m = mean(values);
    let var = variance(values);
    if var <= 0.0 || values.is_empty() {
        return 0.0;
    }
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / values.len() as f64;
    m3 / var.powf(1.5)
}

/// Moment-based kurtosis (not excess)
pub fn kurtosis(values: &[f64]) -> f64 {
    let m = mean(values);
    let var = variance(values);
    if var <= 0.0 || values.is_empty() {
        return 0.0;
    }
    let m4 = values.iter().map(|v| (v - m).powi(4)).sum::<f64>() / values.len() as f64;
    m4 / var.powi(2)
}

/// Ordinary least-squares line fit against a zero-based index.
///
/// Returns `(intercept, slope)` for `y ~ a + b * t` with `t = 0..n`.
pub fn linear_trend(values: &[f64]) -> Result<(f64, f64)> {
    let n = values.len();
    if n < 2 {
        return Err(ForecastError::MathError(
            "Linear trend requires at least two observations".to_string(),
        ));
    }

    let nf = n as f64;
    let t_mean = (nf - 1.0) / 2.0;
    let y_mean = mean(values);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (t, &y) in values.iter().enumerate() {
        let dt = t as f64 - t_mean;
        sxy += dt * (y - y_mean);
        sxx += dt * dt;
    }

    if sxx == 0.0 {
        return Err(ForecastError::MathError(
            "Degenerate time index in trend fit".to_string(),
        ));
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * t_mean;
    Ok((intercept, slope))
}

/// Solve the least-squares problem `X b = y` via the normal equations with
/// Gaussian elimination. Returns `None` when the system is singular.
///
/// Row count of `design` must equal `y.len()`; intended for the small
/// regressor counts that arise in residual diagnostics.
pub fn least_squares(design: &[Vec<f64>], y: &[f64]) -> Option<Vec<f64>> {
    let n = design.len();
    if n == 0 || n != y.len() {
        return None;
    }
    let k = design[0].len();
    if k == 0 || design.iter().any(|row| row.len() != k) {
        return None;
    }

    // X'X and X'y
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &yv) in design.iter().zip(y.iter()) {
        for i in 0..k {
            xty[i] += row[i] * yv;
            for j in 0..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }

    // Gaussian elimination with partial pivoting
    let mut a = xtx;
    let mut b = xty;
    for col in 0..k {
        let mut pivot = col;
        for row in (col + 1)..k {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..k {
            let factor = a[row][col] / a[col][col];
            for j in col..k {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; k];
    for col in (0..k).rev() {
        let mut sum = b[col];
        for j in (col + 1)..k {
            sum -= a[col][j] * x[j];
        }
        x[col] = sum / a[col][col];
    }
    Some(x)
}

/// R-squared of a fitted least-squares regression.
pub fn r_squared(design: &[Vec<f64>], y: &[f64], coefficients: &[f64]) -> f64 {
    let y_mean = mean(y);
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (row, &yv) in design.iter().zip(y.iter()) {
        let fitted: f64 = row
            .iter()
            .zip(coefficients.iter())
            .map(|(x, b)| x * b)
            .sum();
        ss_res += (yv - fitted).powi(2);
        ss_tot += (yv - y_mean).powi(2);
    }
    if ss_tot == 0.0 {
        return 0.0;
    }
    1.0 - ss_res / ss_tot
}
