//! Per-stream forecasting and total revenue aggregation

use crate::bundle::{ModelBundle, RevenueStream};
use crate::data::AnnualTable;
use crate::error::Result;
use crate::models::{forecast, EstimatorKind, ForecastResult};
use crate::registry::PerformanceRegistry;
use crate::scenario::{build_future_scenario, ScenarioParameters};
use rand::Rng;

/// How to choose the estimator family for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorChoice {
    /// The family with the lowest cross-validated MAE for the stream
    Best,
    /// A fixed family, applied to every stream
    Fixed(EstimatorKind),
}

/// One stream's contribution to the total.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamForecast {
    /// Revenue stream
    pub stream: RevenueStream,
    /// Estimator family actually used
    pub estimator: EstimatorKind,
    /// Point-and-interval forecast
    pub result: ForecastResult,
}

/// Total collection forecast with its per-stream breakdown.
///
/// The total is the elementwise sum of the stream results, bounds included.
/// Summing per-stream quantile bounds ignores cross-stream error
/// correlation, so the aggregate interval is generally too narrow relative
/// to the true joint uncertainty.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateForecast {
    /// Per-stream forecasts, in aggregation order
    pub streams: Vec<StreamForecast>,
    /// Elementwise sum over all streams
    pub total: ForecastResult,
}

/// Drives per-stream forecasting under one scenario and sums the results.
///
/// Each stream gets its own future explanatory table, built from that
/// stream's model specification, so the scenario assumptions enter every
/// stream through the variables its models actually use.
pub struct Aggregator<'a> {
    bundle: &'a ModelBundle,
    history: &'a AnnualTable,
    registry: &'a PerformanceRegistry,
}

impl<'a> Aggregator<'a> {
    /// Create an aggregator over a prepared bundle.
    pub fn new(
        bundle: &'a ModelBundle,
        history: &'a AnnualTable,
        registry: &'a PerformanceRegistry,
    ) -> Self {
        Self {
            bundle,
            history,
            registry,
        }
    }

    fn resolve(&self, stream: RevenueStream, choice: EstimatorChoice) -> Result<EstimatorKind> {
        match choice {
            EstimatorChoice::Best => self.registry.best(stream),
            EstimatorChoice::Fixed(kind) => Ok(kind),
        }
    }

    /// Forecast one revenue stream under the scenario.
    pub fn single<R: Rng + ?Sized>(
        &self,
        stream: RevenueStream,
        choice: EstimatorChoice,
        scenario: &ScenarioParameters,
        horizon: usize,
        n_sims: usize,
        rng: &mut R,
    ) -> Result<StreamForecast> {
        let models = self.bundle.stream(stream)?;
        let estimator = self.resolve(stream, choice)?;
        let future =
            build_future_scenario(self.history, horizon, &models.spec.explanatory, scenario)?;
        let result = forecast(models, estimator, self.history, &future, n_sims, rng)?;
        Ok(StreamForecast {
            stream,
            estimator,
            result,
        })
    }

    /// Forecast every revenue stream and sum into the total collection.
    pub fn total<R: Rng + ?Sized>(
        &self,
        choice: EstimatorChoice,
        scenario: &ScenarioParameters,
        horizon: usize,
        n_sims: usize,
        rng: &mut R,
    ) -> Result<AggregateForecast> {
        let mut streams = Vec::with_capacity(RevenueStream::ALL.len());
        let mut total: Option<ForecastResult> = None;

        for stream in RevenueStream::ALL {
            let stream_forecast = self.single(stream, choice, scenario, horizon, n_sims, rng)?;
            total = Some(match total {
                Some(sum) => sum.sum_with(&stream_forecast.result)?,
                None => stream_forecast.result.clone(),
            });
            streams.push(stream_forecast);
        }

        // RevenueStream::ALL is non-empty, so the sum always exists.
        let total = total.unwrap_or_else(|| ForecastResult::zeros(Vec::new()));
        Ok(AggregateForecast { streams, total })
    }
}
