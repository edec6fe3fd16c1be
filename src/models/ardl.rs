//! Autoregressive-distributed-lag forecasting with bootstrapped intervals

use crate::bundle::ModelSpec;
use crate::data::AnnualTable;
use crate::error::{ForecastError, Result};
use crate::models::{result_from_simulations, validate_n_sims, ForecastResult};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One fitted coefficient of the ARDL regression.
///
/// Terms follow the `{name}.L{k}` naming of the fitting library: lags of the
/// dependent variable carry the dependent name, explanatory terms carry the
/// regressor name, and the intercept is `const`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArdlTerm {
    /// Term name, e.g. `log_gst.L1` or `log_imports.L0`
    pub term: String,
    /// Point estimate
    pub coef: f64,
    /// Standard error
    #[serde(default)]
    pub std_err: f64,
    /// Two-sided p-value
    #[serde(default, rename = "p")]
    pub p_value: f64,
}

/// Fitted autoregressive-distributed-lag artifact.
///
/// Immutable after load; shared read-only across forecast calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArdlModel {
    terms: Vec<ArdlTerm>,
    residuals: Vec<f64>,
    /// Training design matrix, kept for the heteroskedasticity test
    #[serde(default)]
    design: Option<Vec<Vec<f64>>>,
}

/// Split a `{name}.L{k}` term into its base name and lag order.
fn parse_lagged(term: &str) -> Option<(&str, usize)> {
    let (base, lag) = term.rsplit_once(".L")?;
    lag.parse::<usize>().ok().map(|k| (base, k))
}

impl ArdlModel {
    /// Create an artifact from fitted terms and in-sample residuals.
    pub fn new(terms: Vec<ArdlTerm>, residuals: Vec<f64>) -> Self {
        Self {
            terms,
            residuals,
            design: None,
        }
    }

    /// Attach the training design matrix used by the Breusch-Pagan test.
    pub fn with_design(mut self, design: Vec<Vec<f64>>) -> Self {
        self.design = Some(design);
        self
    }

    /// Fitted coefficient rows
    pub fn terms(&self) -> &[ArdlTerm] {
        &self.terms
    }

    /// In-sample residuals
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Training design matrix, when stored
    pub fn design(&self) -> Option<&[Vec<f64>]> {
        self.design.as_deref()
    }

    fn intercept(&self) -> f64 {
        self.terms
            .iter()
            .find(|t| t.term == "const")
            .map(|t| t.coef)
            .unwrap_or(0.0)
    }

    /// Autoregressive coefficients on the dependent variable, ordered by lag
    /// starting at lag 1.
    pub fn ar_coefficients(&self, dependent: &str) -> Vec<f64> {
        let prefix = format!("{}.L", dependent);
        let mut lagged: Vec<(usize, f64)> = self
            .terms
            .iter()
            .filter(|t| t.term.starts_with(&prefix))
            .filter_map(|t| parse_lagged(&t.term).map(|(_, k)| (k, t.coef)))
            .collect();
        lagged.sort_by_key(|(k, _)| *k);
        lagged.into_iter().map(|(_, c)| c).collect()
    }

    /// Sum of coefficients over all lags of `base` (used by the long-run
    /// elasticity computation).
    pub fn lag_coefficient_sum(&self, base: &str) -> f64 {
        let prefix = format!("{}.L", base);
        self.terms
            .iter()
            .filter(|t| t.term.starts_with(&prefix))
            .map(|t| t.coef)
            .sum()
    }

    fn explanatory_terms<'a>(&'a self, dependent: &str) -> Vec<(&'a str, usize, f64)> {
        let dep_prefix = format!("{}.L", dependent);
        self.terms
            .iter()
            .filter(|t| t.term != "const" && !t.term.starts_with(&dep_prefix))
            .map(|t| match parse_lagged(&t.term) {
                Some((base, lag)) => (base, lag, t.coef),
                None => (t.term.as_str(), 0, t.coef),
            })
            .collect()
    }

    /// Deterministic log-scale forecast path over the future table.
    fn forecast_log_path(
        &self,
        spec: &ModelSpec,
        history: &AnnualTable,
        future: &AnnualTable,
    ) -> Result<Vec<f64>> {
        let horizon = future.len();
        let ar = self.ar_coefficients(&spec.dependent);
        let exog = self.explanatory_terms(&spec.dependent);
        let intercept = self.intercept();

        let y_hist = history.column(&spec.dependent).ok_or_else(|| {
            ForecastError::DataError(format!(
                "History lacks dependent column '{}'",
                spec.dependent
            ))
        })?;
        let n_hist = y_hist.len();

        // Combined dependent series: history then the growing forecast path.
        let mut y_combined: Vec<f64> = y_hist.to_vec();
        let mut path = Vec::with_capacity(horizon);

        for i in 0..horizon {
            let mut value = intercept;

            for (p, &coef) in ar.iter().enumerate() {
                let lag = p + 1;
                let idx = n_hist + i;
                if idx < lag {
                    return Err(ForecastError::ForecastingError(
                        "Insufficient history for dependent lag".to_string(),
                    ));
                }
                let y_lag = y_combined[idx - lag];
                if !y_lag.is_finite() {
                    return Err(ForecastError::ForecastingError(format!(
                        "Non-finite dependent lag at offset {}",
                        lag
                    )));
                }
                value += coef * y_lag;
            }

            for &(base, lag, coef) in &exog {
                let x = if lag <= i {
                    future.value(i - lag, base).unwrap_or(0.0)
                } else if lag - i <= n_hist {
                    // Lag reaches back past the forecast origin.
                    history.value(n_hist + i - lag, base).unwrap_or(0.0)
                } else {
                    0.0
                };
                let x = if x.is_finite() { x } else { 0.0 };
                value += coef * x;
            }

            y_combined.push(value);
            path.push(value);
        }

        Ok(path)
    }

    /// Forecast with bootstrapped, AR-filtered uncertainty.
    ///
    /// The point path is deterministic; interval bounds come from `n_sims`
    /// resampled residual paths passed through the fitted autoregression so
    /// simulated errors carry its correlation structure.
    pub fn forecast<R: Rng + ?Sized>(
        &self,
        spec: &ModelSpec,
        history: &AnnualTable,
        future: &AnnualTable,
        n_sims: usize,
        rng: &mut R,
    ) -> Result<ForecastResult> {
        validate_n_sims(n_sims)?;
        let horizon = future.len();
        let log_path = self.forecast_log_path(spec, history, future)?;
        let ar = self.ar_coefficients(&spec.dependent);

        let pool: Vec<f64> = self
            .residuals
            .iter()
            .copied()
            .filter(|r| r.is_finite())
            .collect();
        if pool.is_empty() {
            return Err(ForecastError::ForecastingError(
                "ARDL artifact has no usable residuals".to_string(),
            ));
        }

        let mut sims: Vec<Vec<f64>> = Vec::with_capacity(n_sims);
        let mut noise = vec![0.0; horizon];
        for _ in 0..n_sims {
            for i in 0..horizon {
                let innovation = pool[rng.gen_range(0..pool.len())];
                let mut ar_part = 0.0;
                for (p, &coef) in ar.iter().enumerate() {
                    if i >= p + 1 {
                        ar_part += coef * noise[i - (p + 1)];
                    }
                }
                noise[i] = ar_part + innovation;
            }
            sims.push(
                log_path
                    .iter()
                    .zip(noise.iter())
                    .map(|(y, e)| (y + e).exp())
                    .collect(),
            );
        }

        let yhat: Vec<f64> = log_path.iter().map(|y| y.exp()).collect();
        result_from_simulations(future.years().to_vec(), yhat, &sims)
    }
}
