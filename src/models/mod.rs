//! Forecast estimators and the shared forecast output contract

use crate::bundle::{ModelSpec, StreamModels};
use crate::data::AnnualTable;
use crate::error::{ForecastError, Result};
use crate::utils::quantile;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod ardl;
pub mod arimax;
pub mod enet;

/// The closed set of estimator families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EstimatorKind {
    /// Autoregressive distributed lag with bootstrapped AR-filtered intervals
    Ardl,
    /// State-space regression with analytic intervals
    Arimax,
    /// Regularized linear model with recursive bootstrap intervals
    ElasticNet,
}

impl EstimatorKind {
    /// All estimator families, in bundle order
    pub const ALL: [EstimatorKind; 3] = [
        EstimatorKind::Ardl,
        EstimatorKind::Arimax,
        EstimatorKind::ElasticNet,
    ];

    /// Stable identifier used in bundles and metadata
    pub fn id(&self) -> &'static str {
        match self {
            EstimatorKind::Ardl => "ardl",
            EstimatorKind::Arimax => "arimax",
            EstimatorKind::ElasticNet => "enet",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            EstimatorKind::Ardl => "ARDL",
            EstimatorKind::Arimax => "ARIMAX (state-space)",
            EstimatorKind::ElasticNet => "ElasticNet",
        }
    }
}

impl FromStr for EstimatorKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ardl" => Ok(EstimatorKind::Ardl),
            "arimax" => Ok(EstimatorKind::Arimax),
            "enet" => Ok(EstimatorKind::ElasticNet),
            other => Err(ForecastError::UnknownEstimator(other.to_string())),
        }
    }
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A point-and-interval forecast, one row per future fiscal year.
///
/// Every row satisfies `lo95 <= lo80 <= yhat <= hi80 <= hi95`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    years: Vec<i32>,
    yhat: Vec<f64>,
    lo80: Vec<f64>,
    hi80: Vec<f64>,
    lo95: Vec<f64>,
    hi95: Vec<f64>,
}

impl ForecastResult {
    /// Create a forecast result, validating column lengths and the row-wise
    /// interval ordering.
    pub fn new(
        years: Vec<i32>,
        yhat: Vec<f64>,
        lo80: Vec<f64>,
        hi80: Vec<f64>,
        lo95: Vec<f64>,
        hi95: Vec<f64>,
    ) -> Result<Self> {
        let n = years.len();
        if [&yhat, &lo80, &hi80, &lo95, &hi95]
            .iter()
            .any(|c| c.len() != n)
        {
            return Err(ForecastError::ValidationError(
                "Forecast columns must all match the year count".to_string(),
            ));
        }
        for i in 0..n {
            let ordered = lo95[i] <= lo80[i]
                && lo80[i] <= yhat[i]
                && yhat[i] <= hi80[i]
                && hi80[i] <= hi95[i];
            if !ordered {
                return Err(ForecastError::ValidationError(format!(
                    "Interval ordering violated at year {}",
                    years[i]
                )));
            }
        }
        Ok(Self {
            years,
            yhat,
            lo80,
            hi80,
            lo95,
            hi95,
        })
    }

    /// An all-zero result over the given years, the additive identity for
    /// aggregation.
    pub fn zeros(years: Vec<i32>) -> Self {
        let n = years.len();
        Self {
            years,
            yhat: vec![0.0; n],
            lo80: vec![0.0; n],
            hi80: vec![0.0; n],
            lo95: vec![0.0; n],
            hi95: vec![0.0; n],
        }
    }

    /// Number of forecasted years
    pub fn len(&self) -> usize {
        self.years.len()
    }

    /// Whether the forecast is empty
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Forecast years
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Point estimates
    pub fn yhat(&self) -> &[f64] {
        &self.yhat
    }

    /// Lower 80% bounds
    pub fn lo80(&self) -> &[f64] {
        &self.lo80
    }

    /// Upper 80% bounds
    pub fn hi80(&self) -> &[f64] {
        &self.hi80
    }

    /// Lower 95% bounds
    pub fn lo95(&self) -> &[f64] {
        &self.lo95
    }

    /// Upper 95% bounds
    pub fn hi95(&self) -> &[f64] {
        &self.hi95
    }

    /// Elementwise sum with another result over the same years.
    ///
    /// Bounds are summed independently per stream; the aggregate interval is
    /// an accepted approximation of the joint uncertainty.
    pub fn sum_with(&self, other: &ForecastResult) -> Result<ForecastResult> {
        if self.years != other.years {
            return Err(ForecastError::ValidationError(
                "Cannot sum forecasts over different years".to_string(),
            ));
        }
        let add = |a: &[f64], b: &[f64]| -> Vec<f64> {
            a.iter().zip(b.iter()).map(|(x, y)| x + y).collect()
        };
        Ok(ForecastResult {
            years: self.years.clone(),
            yhat: add(&self.yhat, &other.yhat),
            lo80: add(&self.lo80, &other.lo80),
            hi80: add(&self.hi80, &other.hi80),
            lo95: add(&self.lo95, &other.lo95),
            hi95: add(&self.hi95, &other.hi95),
        })
    }

    /// Serialize the result to a CSV string.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(["year", "yhat", "lo80", "hi80", "lo95", "hi95"])
            .map_err(|e| ForecastError::CsvError(e.to_string()))?;
        for i in 0..self.len() {
            writer
                .write_record(&[
                    self.years[i].to_string(),
                    format!("{}", self.yhat[i]),
                    format!("{}", self.lo80[i]),
                    format!("{}", self.hi80[i]),
                    format!("{}", self.lo95[i]),
                    format!("{}", self.hi95[i]),
                ])
                .map_err(|e| ForecastError::CsvError(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ForecastError::CsvError(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ForecastError::CsvError(e.to_string()))
    }
}

/// Assemble a [`ForecastResult`] from a deterministic point path and a set of
/// simulated level paths (`sims[s][i]` is simulation `s` at step `i`).
///
/// Bounds are empirical quantiles across simulations, clamped against the
/// point path so the row ordering invariant holds for any simulation count.
pub(crate) fn result_from_simulations(
    years: Vec<i32>,
    yhat: Vec<f64>,
    sims: &[Vec<f64>],
) -> Result<ForecastResult> {
    let horizon = yhat.len();
    let mut lo80 = Vec::with_capacity(horizon);
    let mut hi80 = Vec::with_capacity(horizon);
    let mut lo95 = Vec::with_capacity(horizon);
    let mut hi95 = Vec::with_capacity(horizon);

    let mut step_values = Vec::with_capacity(sims.len());
    for i in 0..horizon {
        step_values.clear();
        step_values.extend(sims.iter().map(|path| path[i]));

        let q10 = quantile(&step_values, 0.10)?;
        let q90 = quantile(&step_values, 0.90)?;
        let q025 = quantile(&step_values, 0.025)?;
        let q975 = quantile(&step_values, 0.975)?;

        let lo = q10.min(yhat[i]);
        let hi = q90.max(yhat[i]);
        lo95.push(q025.min(lo));
        hi95.push(q975.max(hi));
        lo80.push(lo);
        hi80.push(hi);
    }

    ForecastResult::new(years, yhat, lo80, hi80, lo95, hi95)
}

/// Validate the simulation count shared by the bootstrap variants.
pub(crate) fn validate_n_sims(n_sims: usize) -> Result<()> {
    if n_sims < 1 {
        return Err(ForecastError::InvalidParameter(
            "Simulation count must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Forecast one revenue stream with the requested estimator family.
///
/// Dispatches to the matching fitted artifact in `models`; requesting a
/// family that was not fitted for this stream is a typed error. The RNG only
/// affects interval bounds of the simulated variants, never `yhat`.
pub fn forecast<R: Rng + ?Sized>(
    models: &StreamModels,
    kind: EstimatorKind,
    history: &AnnualTable,
    future: &AnnualTable,
    n_sims: usize,
    rng: &mut R,
) -> Result<ForecastResult> {
    let spec: &ModelSpec = &models.spec;
    match kind {
        EstimatorKind::Ardl => models
            .ardl
            .as_ref()
            .ok_or_else(|| ForecastError::UnknownEstimator("ardl (not fitted)".to_string()))?
            .forecast(spec, history, future, n_sims, rng),
        EstimatorKind::Arimax => models
            .arimax
            .as_ref()
            .ok_or_else(|| ForecastError::UnknownEstimator("arimax (not fitted)".to_string()))?
            .forecast(spec, future),
        EstimatorKind::ElasticNet => models
            .enet
            .as_ref()
            .ok_or_else(|| ForecastError::UnknownEstimator("enet (not fitted)".to_string()))?
            .forecast(spec, history, future, n_sims, rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_invariant_is_enforced() {
        let bad = ForecastResult::new(
            vec![2024],
            vec![10.0],
            vec![11.0], // lo80 above yhat
            vec![12.0],
            vec![8.0],
            vec![13.0],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn sum_requires_identical_years() {
        let a = ForecastResult::zeros(vec![2024, 2025]);
        let b = ForecastResult::zeros(vec![2025, 2026]);
        assert!(a.sum_with(&b).is_err());
    }

    #[test]
    fn estimator_kind_round_trips_ids() {
        for kind in EstimatorKind::ALL {
            assert_eq!(kind.id().parse::<EstimatorKind>().unwrap(), kind);
        }
        assert!("prophet".parse::<EstimatorKind>().is_err());
    }

    #[test]
    fn simulation_quantiles_are_clamped_to_point_path() {
        // A single simulation above the point path must not push the lower
        // bound above yhat.
        let sims = vec![vec![12.0]];
        let result = result_from_simulations(vec![2024], vec![10.0], &sims).unwrap();
        assert!(result.lo80()[0] <= 10.0);
        assert!(result.hi95()[0] >= 12.0);
    }
}
