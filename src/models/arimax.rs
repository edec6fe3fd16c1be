//! State-space regression forecasting with analytic intervals

use crate::bundle::ModelSpec;
use crate::data::AnnualTable;
use crate::error::{ForecastError, Result};
use crate::models::ForecastResult;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// One fitted parameter of the state-space regression.
///
/// Regression terms carry the explanatory column name; the error process
/// parameters use the `ar.L{k}` / `ma.L{k}` / `sigma2` naming of the fitting
/// library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSpaceTerm {
    /// Parameter name
    pub term: String,
    /// Point estimate
    pub coef: f64,
    /// Standard error
    #[serde(default)]
    pub std_err: f64,
    /// z-statistic
    #[serde(default, rename = "z")]
    pub z_value: f64,
    /// Two-sided p-value
    #[serde(default, rename = "p")]
    pub p_value: f64,
}

/// Fitted state-space regression artifact (regression with ARMA errors).
///
/// Intervals are analytic: they come from the parametric forecast-error
/// variance, not from bootstrap simulation, and the two sources must not be
/// conflated when interpreting results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSpaceModel {
    params: Vec<StateSpaceTerm>,
    residuals: Vec<f64>,
    /// Regression errors at the end of the training sample, oldest first
    #[serde(default)]
    error_tail: Vec<f64>,
    /// Innovations at the end of the training sample, oldest first
    #[serde(default)]
    innovation_tail: Vec<f64>,
    aic: f64,
    #[serde(default)]
    bic: Option<f64>,
}

fn ordered_lag_coefs(params: &[StateSpaceTerm], prefix: &str) -> Vec<f64> {
    let mut lagged: Vec<(usize, f64)> = params
        .iter()
        .filter_map(|t| {
            let rest = t.term.strip_prefix(prefix)?;
            rest.parse::<usize>().ok().map(|k| (k, t.coef))
        })
        .collect();
    lagged.sort_by_key(|(k, _)| *k);
    lagged.into_iter().map(|(_, c)| c).collect()
}

impl StateSpaceModel {
    /// Create an artifact from fitted parameters, residuals, and the error
    /// state at the forecast origin.
    pub fn new(
        params: Vec<StateSpaceTerm>,
        residuals: Vec<f64>,
        error_tail: Vec<f64>,
        innovation_tail: Vec<f64>,
        aic: f64,
        bic: Option<f64>,
    ) -> Self {
        Self {
            params,
            residuals,
            error_tail,
            innovation_tail,
            aic,
            bic,
        }
    }

    /// Full fitted parameter table
    pub fn params(&self) -> &[StateSpaceTerm] {
        &self.params
    }

    /// In-sample residuals
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Akaike information criterion
    pub fn aic(&self) -> f64 {
        self.aic
    }

    /// Bayesian information criterion, when available
    pub fn bic(&self) -> Option<f64> {
        self.bic
    }

    fn ar(&self) -> Vec<f64> {
        ordered_lag_coefs(&self.params, "ar.L")
    }

    fn ma(&self) -> Vec<f64> {
        ordered_lag_coefs(&self.params, "ma.L")
    }

    fn sigma2(&self) -> f64 {
        self.params
            .iter()
            .find(|t| t.term == "sigma2")
            .map(|t| t.coef)
            .unwrap_or_else(|| crate::utils::variance(&self.residuals))
    }

    fn is_error_process_term(term: &str) -> bool {
        term == "sigma2" || term.starts_with("ar.L") || term.starts_with("ma.L")
    }

    fn regression_mean(&self, future: &AnnualTable, step: usize) -> f64 {
        let mut mean = 0.0;
        for t in &self.params {
            if Self::is_error_process_term(&t.term) {
                continue;
            }
            if t.term == "const" || t.term == "intercept" {
                mean += t.coef;
            } else {
                let x = future.value(step, &t.term).unwrap_or(0.0);
                mean += t.coef * if x.is_finite() { x } else { 0.0 };
            }
        }
        mean
    }

    /// ψ-weights of the ARMA error process (moving-average representation).
    fn psi_weights(&self, horizon: usize) -> Vec<f64> {
        let ar = self.ar();
        let ma = self.ma();
        let mut psi = vec![0.0; horizon];
        if horizon == 0 {
            return psi;
        }
        psi[0] = 1.0;
        for j in 1..horizon {
            let mut w = if j <= ma.len() { ma[j - 1] } else { 0.0 };
            for k in 1..=j.min(ar.len()) {
                w += ar[k - 1] * psi[j - k];
            }
            psi[j] = w;
        }
        psi
    }

    /// Forecast of the ARMA error process with future innovations at zero.
    fn error_forecast(&self, horizon: usize) -> Vec<f64> {
        let ar = self.ar();
        let ma = self.ma();
        let mut eta = self.error_tail.clone();
        let mut eps = self.innovation_tail.clone();
        let mut out = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let mut next = 0.0;
            for (j, &coef) in ar.iter().enumerate() {
                if eta.len() > j {
                    next += coef * eta[eta.len() - 1 - j];
                }
            }
            for (j, &coef) in ma.iter().enumerate() {
                if eps.len() > j {
                    next += coef * eps[eps.len() - 1 - j];
                }
            }
            eta.push(next);
            eps.push(0.0);
            out.push(next);
        }
        out
    }

    /// Analytic point-and-interval forecast.
    ///
    /// Reads the forecast distribution directly: mean from the regression
    /// plus the error-process recursion, variance accumulated from ψ-weights,
    /// normal intervals at significance levels 0.2 and 0.05, everything
    /// exponentiated back to levels. No simulation is performed.
    pub fn forecast(&self, _spec: &ModelSpec, future: &AnnualTable) -> Result<ForecastResult> {
        let horizon = future.len();
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Future table is empty".to_string(),
            ));
        }

        let error_path = self.error_forecast(horizon);
        let psi = self.psi_weights(horizon);
        let sigma2 = self.sigma2().max(0.0);
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::MathError(format!("Normal distribution: {}", e)))?;
        let z80 = normal.inverse_cdf(1.0 - 0.2 / 2.0);
        let z95 = normal.inverse_cdf(1.0 - 0.05 / 2.0);

        let mut yhat = Vec::with_capacity(horizon);
        let mut lo80 = Vec::with_capacity(horizon);
        let mut hi80 = Vec::with_capacity(horizon);
        let mut lo95 = Vec::with_capacity(horizon);
        let mut hi95 = Vec::with_capacity(horizon);

        let mut psi_sq_sum = 0.0;
        for i in 0..horizon {
            let mean = self.regression_mean(future, i) + error_path[i];
            psi_sq_sum += psi[i] * psi[i];
            let sd = (sigma2 * psi_sq_sum).sqrt();

            yhat.push(mean.exp());
            lo80.push((mean - z80 * sd).exp());
            hi80.push((mean + z80 * sd).exp());
            lo95.push((mean - z95 * sd).exp());
            hi95.push((mean + z95 * sd).exp());
        }

        ForecastResult::new(future.years().to_vec(), yhat, lo80, hi80, lo95, hi95)
    }
}
