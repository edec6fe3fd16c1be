//! Regularized linear forecasting with recursive bootstrap intervals

use crate::bundle::ModelSpec;
use crate::data::AnnualTable;
use crate::error::{ForecastError, Result};
use crate::models::{result_from_simulations, validate_n_sims, ForecastResult};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Rows with fewer valid dependent observations before them than this are
/// skipped when rebuilding training residuals; their lag features were not
/// part of the training sample.
const RESIDUAL_WARMUP: usize = 2;

/// Standardization parameters applied to the feature vector before the linear
/// coefficients, aligned index-for-index with the feature columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    /// Per-feature means
    pub means: Vec<f64>,
    /// Per-feature standard deviations
    pub scales: Vec<f64>,
}

impl FeatureScaler {
    fn transform(&self, index: usize, x: f64) -> f64 {
        let mean = self.means.get(index).copied().unwrap_or(0.0);
        let scale = self.scales.get(index).copied().unwrap_or(1.0);
        if scale.abs() < 1e-12 {
            x - mean
        } else {
            (x - mean) / scale
        }
    }
}

/// Fitted regularized linear artifact.
///
/// Feature columns follow the `{name}_L{k}` convention: `k` rows back from
/// the current one, with `_L0` (or a bare name) meaning the current row. Lags
/// of the dependent variable resolve against the recursive forecast path, so
/// predictions feed back into later steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticNetModel {
    feature_cols: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
    #[serde(default)]
    scaler: Option<FeatureScaler>,
    /// Training residuals; rebuilt from history by [`Self::precompute_residuals`]
    #[serde(default)]
    residuals: Option<Vec<f64>>,
}

/// Split a `{name}_L{k}` feature into its base column and lag order.
fn parse_feature(name: &str) -> (&str, usize) {
    if let Some((base, lag)) = name.rsplit_once("_L") {
        if let Ok(k) = lag.parse::<usize>() {
            return (base, k);
        }
    }
    (name, 0)
}

impl ElasticNetModel {
    /// Create an artifact from fitted coefficients.
    pub fn new(feature_cols: Vec<String>, coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            feature_cols,
            coefficients,
            intercept,
            scaler: None,
            residuals: None,
        }
    }

    /// Attach standardization parameters.
    pub fn with_scaler(mut self, scaler: FeatureScaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    /// Feature column names
    pub fn feature_cols(&self) -> &[String] {
        &self.feature_cols
    }

    /// Fitted coefficients, aligned with the feature columns
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Fitted intercept
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Training residuals, once prepared
    pub fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    /// Resolve one feature at `row` of the combined history-then-future
    /// index space. Lags of the dependent variable read from `y_path`, which
    /// holds history followed by predictions made so far.
    fn resolve_feature(
        &self,
        base: &str,
        lag: usize,
        row: usize,
        dependent: &str,
        y_path: &[f64],
        history: &AnnualTable,
        future: &AnnualTable,
    ) -> Option<f64> {
        if row < lag {
            return None;
        }
        let idx = row - lag;
        let value = if base == dependent {
            y_path.get(idx).copied()?
        } else if idx < history.len() {
            history.value(idx, base)?
        } else {
            future.value(idx - history.len(), base)?
        };
        value.is_finite().then_some(value)
    }

    /// Linear prediction at `row`. Unresolvable explanatory features fall
    /// back to zero; an unresolvable dependent lag is an error because the
    /// recursion cannot continue through it.
    fn predict_row(
        &self,
        row: usize,
        dependent: &str,
        y_path: &[f64],
        history: &AnnualTable,
        future: &AnnualTable,
    ) -> Result<f64> {
        let mut value = self.intercept;
        for (j, name) in self.feature_cols.iter().enumerate() {
            let (base, lag) = parse_feature(name);
            let raw = self.resolve_feature(base, lag, row, dependent, y_path, history, future);
            let x = match raw {
                Some(x) => x,
                None if base == dependent => {
                    return Err(ForecastError::ForecastingError(format!(
                        "Unresolvable dependent lag '{}' at step {}",
                        name, row
                    )))
                }
                None => 0.0,
            };
            let x = match &self.scaler {
                Some(scaler) => scaler.transform(j, x),
                None => x,
            };
            value += self.coefficients[j] * x;
        }
        Ok(value)
    }

    /// Strict per-row prediction over history only, used when rebuilding
    /// residuals: any unresolvable feature disqualifies the row.
    fn predict_history_row(
        &self,
        row: usize,
        dependent: &str,
        y_hist: &[f64],
        history: &AnnualTable,
    ) -> Option<f64> {
        let empty = AnnualTable::new(Vec::new());
        let mut value = self.intercept;
        for (j, name) in self.feature_cols.iter().enumerate() {
            let (base, lag) = parse_feature(name);
            let x = self.resolve_feature(base, lag, row, dependent, y_hist, history, &empty)?;
            let x = match &self.scaler {
                Some(scaler) => scaler.transform(j, x),
                None => x,
            };
            value += self.coefficients[j] * x;
        }
        Some(value)
    }

    /// Rebuild the training residual pool from the historical table.
    ///
    /// Walks every historical row with a finite dependent value, skips the
    /// warm-up rows and any row whose features cannot all be resolved, and
    /// stores actual-minus-predicted on the log scale. An empty pool degrades
    /// to a single zero residual so the bootstrap stays well-defined.
    pub fn precompute_residuals(&mut self, spec: &ModelSpec, history: &AnnualTable) -> Result<()> {
        if self.feature_cols.len() != self.coefficients.len() {
            return Err(ForecastError::ValidationError(
                "Feature and coefficient counts differ".to_string(),
            ));
        }
        let y_hist = history.column(&spec.dependent).ok_or_else(|| {
            ForecastError::DataError(format!(
                "History lacks dependent column '{}'",
                spec.dependent
            ))
        })?;

        let mut residuals = Vec::new();
        let mut valid_seen = 0usize;
        for row in 0..history.len() {
            let actual = y_hist[row];
            if !actual.is_finite() {
                continue;
            }
            valid_seen += 1;
            if valid_seen <= RESIDUAL_WARMUP {
                continue;
            }
            if let Some(pred) = self.predict_history_row(row, &spec.dependent, y_hist, history) {
                residuals.push(actual - pred);
            }
        }
        if residuals.is_empty() {
            residuals.push(0.0);
        }
        self.residuals = Some(residuals);
        Ok(())
    }

    /// Deterministic recursive point path on the log scale.
    fn forecast_log_path(
        &self,
        spec: &ModelSpec,
        history: &AnnualTable,
        future: &AnnualTable,
    ) -> Result<Vec<f64>> {
        let y_hist = history.column(&spec.dependent).ok_or_else(|| {
            ForecastError::DataError(format!(
                "History lacks dependent column '{}'",
                spec.dependent
            ))
        })?;
        let mut y_path = y_hist.to_vec();
        let mut path = Vec::with_capacity(future.len());
        for i in 0..future.len() {
            let row = history.len() + i;
            let pred = self.predict_row(row, &spec.dependent, &y_path, history, future)?;
            y_path.push(pred);
            path.push(pred);
        }
        Ok(path)
    }

    /// Forecast with recursive bootstrap uncertainty.
    ///
    /// The point path is deterministic. Each simulation is an independent
    /// recursive trajectory: every step adds a resampled training residual
    /// to the prediction before it is written back, so shocked steps
    /// propagate through the dependent lags of later steps.
    pub fn forecast<R: Rng + ?Sized>(
        &self,
        spec: &ModelSpec,
        history: &AnnualTable,
        future: &AnnualTable,
        n_sims: usize,
        rng: &mut R,
    ) -> Result<ForecastResult> {
        validate_n_sims(n_sims)?;
        let log_path = self.forecast_log_path(spec, history, future)?;

        let pool: Vec<f64> = self
            .residuals
            .as_ref()
            .ok_or_else(|| {
                ForecastError::ForecastingError(
                    "Residuals not prepared; call ModelBundle::prepare first".to_string(),
                )
            })?
            .iter()
            .copied()
            .filter(|r| r.is_finite())
            .collect();
        if pool.is_empty() {
            return Err(ForecastError::ForecastingError(
                "Regularized linear artifact has no usable residuals".to_string(),
            ));
        }

        let y_hist = history
            .column(&spec.dependent)
            .ok_or_else(|| {
                ForecastError::DataError(format!(
                    "History lacks dependent column '{}'",
                    spec.dependent
                ))
            })?
            .to_vec();

        let mut sims: Vec<Vec<f64>> = Vec::with_capacity(n_sims);
        for _ in 0..n_sims {
            let mut y_sim = y_hist.clone();
            let mut levels = Vec::with_capacity(future.len());
            for i in 0..future.len() {
                let row = history.len() + i;
                let pred = self.predict_row(row, &spec.dependent, &y_sim, history, future)?;
                let shocked = pred + pool[rng.gen_range(0..pool.len())];
                y_sim.push(shocked);
                levels.push(shocked.exp());
            }
            sims.push(levels);
        }

        let yhat: Vec<f64> = log_path.iter().map(|y| y.exp()).collect();
        result_from_simulations(future.years().to_vec(), yhat, &sims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spec() -> ModelSpec {
        ModelSpec {
            dependent: "log_dt".to_string(),
            explanatory: vec!["log_gdp_nonagr".to_string()],
        }
    }

    fn history() -> AnnualTable {
        AnnualTable::from_columns(
            vec![2019, 2020, 2021, 2022],
            vec![
                ("log_dt".to_string(), vec![2.0, 2.1, 2.2, 2.3]),
                ("log_gdp_nonagr".to_string(), vec![5.0, 5.1, 5.2, 5.3]),
            ],
        )
        .unwrap()
    }

    fn future() -> AnnualTable {
        AnnualTable::from_columns(
            vec![2023, 2024],
            vec![("log_gdp_nonagr".to_string(), vec![5.4, 5.5])],
        )
        .unwrap()
    }

    fn model() -> ElasticNetModel {
        ElasticNetModel::new(
            vec!["log_dt_L1".to_string(), "log_gdp_nonagr_L0".to_string()],
            vec![0.5, 0.2],
            0.1,
        )
    }

    #[test]
    fn feature_names_parse_base_and_lag() {
        assert_eq!(parse_feature("log_dt_L1"), ("log_dt", 1));
        assert_eq!(parse_feature("log_gdp_nonagr_L0"), ("log_gdp_nonagr", 0));
        assert_eq!(parse_feature("inflation"), ("inflation", 0));
    }

    #[test]
    fn point_path_feeds_predictions_back() {
        let m = model();
        let path = m.forecast_log_path(&spec(), &history(), &future()).unwrap();
        let step1 = 0.1 + 0.5 * 2.3 + 0.2 * 5.4;
        let step2 = 0.1 + 0.5 * step1 + 0.2 * 5.5;
        assert!((path[0] - step1).abs() < 1e-12);
        assert!((path[1] - step2).abs() < 1e-12);
    }

    #[test]
    fn residuals_skip_warmup_rows() {
        let mut m = model();
        m.precompute_residuals(&spec(), &history()).unwrap();
        // Four valid dependent rows, two warm-up rows skipped.
        assert_eq!(m.residuals().unwrap().len(), 2);
    }

    #[test]
    fn residuals_degrade_to_single_zero() {
        let mut m = model();
        let short = AnnualTable::from_columns(
            vec![2021, 2022],
            vec![
                ("log_dt".to_string(), vec![2.2, 2.3]),
                ("log_gdp_nonagr".to_string(), vec![5.2, 5.3]),
            ],
        )
        .unwrap();
        m.precompute_residuals(&spec(), &short).unwrap();
        assert_eq!(m.residuals().unwrap(), &[0.0]);
    }

    #[test]
    fn forecast_without_prepared_residuals_is_an_error() {
        let m = model();
        let mut rng = StdRng::seed_from_u64(5);
        let err = m.forecast(&spec(), &history(), &future(), 10, &mut rng);
        assert!(matches!(err, Err(ForecastError::ForecastingError(_))));
    }

    #[test]
    fn seeded_forecast_is_reproducible() {
        let mut m = model();
        m.precompute_residuals(&spec(), &history()).unwrap();
        let mut rng_a = StdRng::seed_from_u64(11);
        let mut rng_b = StdRng::seed_from_u64(11);
        let a = m
            .forecast(&spec(), &history(), &future(), 40, &mut rng_a)
            .unwrap();
        let b = m
            .forecast(&spec(), &history(), &future(), 40, &mut rng_b)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn yhat_matches_deterministic_path_regardless_of_sims() {
        let mut m = model();
        m.precompute_residuals(&spec(), &history()).unwrap();
        let expected: Vec<f64> = m
            .forecast_log_path(&spec(), &history(), &future())
            .unwrap()
            .iter()
            .map(|y| y.exp())
            .collect();
        let mut rng = StdRng::seed_from_u64(2);
        let result = m
            .forecast(&spec(), &history(), &future(), 200, &mut rng)
            .unwrap();
        assert_eq!(result.yhat(), expected.as_slice());
    }

    #[test]
    fn scaler_standardizes_features() {
        let m = ElasticNetModel::new(
            vec!["log_gdp_nonagr_L0".to_string()],
            vec![1.0],
            0.0,
        )
        .with_scaler(FeatureScaler {
            means: vec![5.4],
            scales: vec![0.2],
        });
        let path = m.forecast_log_path(&spec(), &history(), &future()).unwrap();
        // (5.4 - 5.4) / 0.2 = 0, (5.5 - 5.4) / 0.2 = 0.5
        assert!((path[0] - 0.0).abs() < 1e-12);
        assert!((path[1] - 0.5).abs() < 1e-12);
    }
}
