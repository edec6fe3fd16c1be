//! Residual diagnostics, coefficient tables, and long-run summaries

use crate::bundle::ModelSpec;
use crate::error::{ForecastError, Result};
use crate::models::ardl::ArdlModel;
use crate::models::arimax::StateSpaceModel;
use crate::models::enet::ElasticNetModel;
use crate::utils::{kurtosis, least_squares, mean, r_squared, skewness, variance};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Leading residuals affected by lag initialization, excluded from the
/// trimmed normality test.
const JB_TRIM: usize = 1;

/// A test statistic with its asymptotic p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestStatistic {
    /// Test statistic value
    pub statistic: f64,
    /// Asymptotic p-value
    pub p_value: f64,
}

/// Summary of one artifact's in-sample residuals.
///
/// Tests that cannot be computed for the sample at hand are `None` rather
/// than an error; a short residual series still yields the moment summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualDiagnostics {
    /// Residual count
    pub n: usize,
    /// Residual mean
    pub mean: f64,
    /// Residual standard deviation
    pub std_dev: f64,
    /// Moment-based skewness
    pub skewness: f64,
    /// Moment-based kurtosis (not excess)
    pub kurtosis: f64,
    /// Durbin-Watson first-order autocorrelation statistic
    pub durbin_watson: f64,
    /// Ljung-Box portmanteau test
    pub ljung_box: Option<TestStatistic>,
    /// Jarque-Bera normality test on the full residuals
    pub jarque_bera: Option<TestStatistic>,
    /// Jarque-Bera with the leading lag-initialization residuals dropped,
    /// to separate start-up artefacts from genuine non-normality
    pub jarque_bera_trimmed: Option<TestStatistic>,
    /// Breusch-Pagan heteroskedasticity test; needs the training design
    pub breusch_pagan: Option<TestStatistic>,
}

fn chi2_survival(stat: f64, df: f64) -> Result<f64> {
    let dist = ChiSquared::new(df)
        .map_err(|e| ForecastError::MathError(format!("Chi-squared({}): {}", df, e)))?;
    Ok(1.0 - dist.cdf(stat))
}

/// Durbin-Watson statistic, near 2 under no first-order autocorrelation.
pub fn durbin_watson(residuals: &[f64]) -> f64 {
    let denom: f64 = residuals.iter().map(|e| e * e).sum();
    if denom == 0.0 || residuals.len() < 2 {
        return 2.0;
    }
    let num: f64 = residuals
        .windows(2)
        .map(|w| (w[1] - w[0]).powi(2))
        .sum();
    num / denom
}

fn autocorrelation(residuals: &[f64], lag: usize) -> f64 {
    let n = residuals.len();
    let m = mean(residuals);
    let denom: f64 = residuals.iter().map(|e| (e - m).powi(2)).sum();
    if denom == 0.0 || lag >= n {
        return 0.0;
    }
    let num: f64 = (lag..n)
        .map(|t| (residuals[t] - m) * (residuals[t - lag] - m))
        .sum();
    num / denom
}

/// Ljung-Box portmanteau test for residual autocorrelation.
///
/// The lag count adapts to the short annual samples: one fifth of the
/// series, clamped to `[1, 5]`.
pub fn ljung_box(residuals: &[f64]) -> Result<TestStatistic> {
    let n = residuals.len();
    let lag = (n / 5).clamp(1, 5);
    if n <= lag + 1 {
        return Err(ForecastError::MathError(
            "Too few residuals for the Ljung-Box test".to_string(),
        ));
    }

    let nf = n as f64;
    let mut q = 0.0;
    for k in 1..=lag {
        let rho = autocorrelation(residuals, k);
        q += rho * rho / (nf - k as f64);
    }
    q *= nf * (nf + 2.0);

    Ok(TestStatistic {
        statistic: q,
        p_value: chi2_survival(q, lag as f64)?,
    })
}

/// Jarque-Bera normality test.
pub fn jarque_bera(residuals: &[f64]) -> Result<TestStatistic> {
    let n = residuals.len();
    if n < 3 {
        return Err(ForecastError::MathError(
            "Too few residuals for the Jarque-Bera test".to_string(),
        ));
    }
    let s = skewness(residuals);
    let k = kurtosis(residuals);
    let jb = n as f64 / 6.0 * (s * s + (k - 3.0).powi(2) / 4.0);
    Ok(TestStatistic {
        statistic: jb,
        p_value: chi2_survival(jb, 2.0)?,
    })
}

/// Jarque-Bera on the residuals with the leading observations dropped.
pub fn jarque_bera_trimmed(residuals: &[f64]) -> Result<TestStatistic> {
    if residuals.len() <= JB_TRIM {
        return Err(ForecastError::MathError(
            "Too few residuals for the trimmed Jarque-Bera test".to_string(),
        ));
    }
    jarque_bera(&residuals[JB_TRIM..])
}

/// Breusch-Pagan heteroskedasticity test: squared residuals regressed on the
/// training design, LM statistic `n * R^2` against chi-squared with one
/// degree of freedom per non-intercept regressor.
pub fn breusch_pagan(design: &[Vec<f64>], residuals: &[f64]) -> Result<TestStatistic> {
    let n = design.len();
    if n == 0 || n != residuals.len() {
        return Err(ForecastError::MathError(
            "Design matrix and residuals disagree in length".to_string(),
        ));
    }
    let k = design[0].len();
    if k < 2 {
        return Err(ForecastError::MathError(
            "Breusch-Pagan needs at least one non-intercept regressor".to_string(),
        ));
    }

    let sq: Vec<f64> = residuals.iter().map(|e| e * e).collect();
    let coefficients = least_squares(design, &sq).ok_or_else(|| {
        ForecastError::MathError("Singular design in the Breusch-Pagan auxiliary fit".to_string())
    })?;
    let lm = n as f64 * r_squared(design, &sq, &coefficients).max(0.0);

    Ok(TestStatistic {
        statistic: lm,
        p_value: chi2_survival(lm, (k - 1) as f64)?,
    })
}

fn residual_summary(residuals: &[f64]) -> ResidualDiagnostics {
    ResidualDiagnostics {
        n: residuals.len(),
        mean: mean(residuals),
        std_dev: variance(residuals).sqrt(),
        skewness: skewness(residuals),
        kurtosis: kurtosis(residuals),
        durbin_watson: durbin_watson(residuals),
        ljung_box: ljung_box(residuals).ok(),
        jarque_bera: jarque_bera(residuals).ok(),
        jarque_bera_trimmed: jarque_bera_trimmed(residuals).ok(),
        breusch_pagan: None,
    }
}

/// Diagnostics over an ARDL artifact's residuals. The heteroskedasticity
/// test runs only when the artifact carries its training design.
pub fn diagnostics_ardl(model: &ArdlModel) -> ResidualDiagnostics {
    let residuals: Vec<f64> = model
        .residuals()
        .iter()
        .copied()
        .filter(|r| r.is_finite())
        .collect();
    let mut diag = residual_summary(&residuals);
    if let Some(design) = model.design() {
        diag.breusch_pagan = breusch_pagan(design, &residuals).ok();
    }
    diag
}

/// Diagnostics over a state-space artifact's residuals.
pub fn diagnostics_arimax(model: &StateSpaceModel) -> ResidualDiagnostics {
    let residuals: Vec<f64> = model
        .residuals()
        .iter()
        .copied()
        .filter(|r| r.is_finite())
        .collect();
    residual_summary(&residuals)
}

/// One row of a coefficient table. Inference columns are `None` for
/// estimators that do not report them.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientRow {
    /// Term name
    pub term: String,
    /// Point estimate
    pub coef: f64,
    /// Standard error, when reported
    pub std_err: Option<f64>,
    /// z-statistic, when reported
    pub z_value: Option<f64>,
    /// Two-sided p-value, when reported
    pub p_value: Option<f64>,
}

/// Coefficient table of an ARDL artifact, in fitted order.
pub fn coef_table_ardl(model: &ArdlModel) -> Vec<CoefficientRow> {
    model
        .terms()
        .iter()
        .map(|t| CoefficientRow {
            term: t.term.clone(),
            coef: t.coef,
            std_err: Some(t.std_err),
            z_value: None,
            p_value: Some(t.p_value),
        })
        .collect()
}

/// Coefficient table of a state-space artifact, in fitted order.
pub fn coef_table_arimax(model: &StateSpaceModel) -> Vec<CoefficientRow> {
    model
        .params()
        .iter()
        .map(|t| CoefficientRow {
            term: t.term.clone(),
            coef: t.coef,
            std_err: Some(t.std_err),
            z_value: Some(t.z_value),
            p_value: Some(t.p_value),
        })
        .collect()
}

/// Coefficient table of a regularized linear artifact, ordered by absolute
/// magnitude so the dominant features come first.
pub fn coef_table_enet(model: &ElasticNetModel) -> Vec<CoefficientRow> {
    let mut rows: Vec<CoefficientRow> = model
        .feature_cols()
        .iter()
        .zip(model.coefficients().iter())
        .map(|(name, &coef)| CoefficientRow {
            term: name.clone(),
            coef,
            std_err: None,
            z_value: None,
            p_value: None,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.coef
            .abs()
            .partial_cmp(&a.coef.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}

/// Long-run elasticity of the dependent variable with respect to one
/// explanatory log-variable.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRunElasticity {
    /// Explanatory variable name
    pub variable: String,
    /// Long-run elasticity
    pub elasticity: f64,
}

fn total_coefficient(model: &ArdlModel, base: &str) -> f64 {
    let prefix = format!("{}.L", base);
    model
        .terms()
        .iter()
        .filter(|t| t.term == base || t.term.starts_with(&prefix))
        .map(|t| t.coef)
        .sum()
}

/// Long-run elasticities of an ARDL artifact: the summed distributed-lag
/// coefficients of each explanatory variable divided by one minus the
/// summed autoregressive coefficients. A near-unit autoregressive root
/// (denominator within 1e-4 of zero) reports a zero elasticity instead of
/// an exploding ratio.
pub fn long_run_elasticities(model: &ArdlModel, spec: &ModelSpec) -> Vec<LongRunElasticity> {
    let ar_sum: f64 = model.ar_coefficients(&spec.dependent).iter().sum();
    let denom = 1.0 - ar_sum;

    spec.explanatory
        .iter()
        .map(|name| {
            let numerator = total_coefficient(model, name);
            let elasticity = if denom.abs() <= 1e-4 {
                0.0
            } else {
                numerator / denom
            };
            LongRunElasticity {
                variable: name.clone(),
                elasticity,
            }
        })
        .collect()
}

/// Error-correction speed of an ARDL artifact: the summed autoregressive
/// coefficients minus one. Values in `(-1, 0)` mean the level reverts toward
/// the long-run relation; near zero means very slow adjustment.
pub fn error_correction_speed(model: &ArdlModel, dependent: &str) -> f64 {
    let ar_sum: f64 = model.ar_coefficients(dependent).iter().sum();
    ar_sum - 1.0
}
