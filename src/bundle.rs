//! Model bundle and performance metadata loading

use crate::data::AnnualTable;
use crate::error::{ForecastError, Result};
use crate::models::ardl::ArdlModel;
use crate::models::arimax::StateSpaceModel;
use crate::models::enet::ElasticNetModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The four fiscal revenue streams being forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RevenueStream {
    /// Customs duty
    Customs,
    /// Income / direct tax
    DirectTax,
    /// Federal excise duty
    FederalExcise,
    /// Sales tax / GST
    SalesTax,
}

impl RevenueStream {
    /// All revenue streams, in aggregation order
    pub const ALL: [RevenueStream; 4] = [
        RevenueStream::Customs,
        RevenueStream::DirectTax,
        RevenueStream::FederalExcise,
        RevenueStream::SalesTax,
    ];

    /// Stable identifier used in bundles and metadata
    pub fn id(&self) -> &'static str {
        match self {
            RevenueStream::Customs => "customs",
            RevenueStream::DirectTax => "dt",
            RevenueStream::FederalExcise => "fed",
            RevenueStream::SalesTax => "gst",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            RevenueStream::Customs => "Customs Duty",
            RevenueStream::DirectTax => "Income/Direct Tax",
            RevenueStream::FederalExcise => "Federal Excise Duty",
            RevenueStream::SalesTax => "Sales Tax / GST",
        }
    }
}

impl FromStr for RevenueStream {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "customs" => Ok(RevenueStream::Customs),
            "dt" => Ok(RevenueStream::DirectTax),
            "fed" => Ok(RevenueStream::FederalExcise),
            "gst" => Ok(RevenueStream::SalesTax),
            other => Err(ForecastError::UnknownStream(other.to_string())),
        }
    }
}

impl fmt::Display for RevenueStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Model specification for one revenue stream: the dependent log-variable
/// plus the ordered explanatory variable names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Dependent (log-)variable name
    #[serde(rename = "y")]
    pub dependent: String,
    /// Ordered explanatory variable names
    #[serde(rename = "x")]
    pub explanatory: Vec<String>,
}

/// The fitted artifacts available for one revenue stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamModels {
    /// Specification shared by all estimators of this stream
    pub spec: ModelSpec,
    /// Autoregressive-distributed-lag artifact
    #[serde(default)]
    pub ardl: Option<ArdlModel>,
    /// State-space regression artifact
    #[serde(default)]
    pub arimax: Option<StateSpaceModel>,
    /// Regularized linear artifact
    #[serde(default)]
    pub enet: Option<ElasticNetModel>,
}

/// All fitted models, keyed by revenue stream identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    /// Per-stream model sets
    pub models: BTreeMap<String, StreamModels>,
}

impl ModelBundle {
    /// Parse a bundle from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a bundle from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// The model set for a revenue stream.
    pub fn stream(&self, stream: RevenueStream) -> Result<&StreamModels> {
        self.models
            .get(stream.id())
            .ok_or_else(|| ForecastError::UnknownStream(stream.id().to_string()))
    }

    /// One-time preparation after loading: pre-compute the historical
    /// training residuals used by the regularized linear bootstrap.
    ///
    /// Must run before forecasting; artifacts are read-only afterwards.
    pub fn prepare(&mut self, history: &AnnualTable) -> Result<()> {
        for models in self.models.values_mut() {
            let spec = models.spec.clone();
            if let Some(enet) = models.enet.as_mut() {
                enet.precompute_residuals(&spec, history)?;
            }
        }
        Ok(())
    }
}

/// Cross-validated accuracy of one (stream, estimator) pair over a held-out
/// test window. Never mutated after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// Revenue stream identifier
    #[serde(rename = "tax_head")]
    pub stream: String,
    /// Estimator identifier
    #[serde(rename = "model")]
    pub estimator: String,
    /// Mean absolute error, percent
    pub mae_pct: f64,
    /// Root mean squared error, percent
    pub rmse_pct: f64,
    /// Held-out test window size
    pub test_n: usize,
}

/// Span of the historical dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSpan {
    /// First fiscal year
    pub start: i32,
    /// Last fiscal year
    pub end: i32,
    /// Number of annual observations
    pub n: usize,
}

/// Performance metadata accompanying the model bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMeta {
    /// Accuracy records for every (stream, estimator) pair
    pub performance: Vec<PerformanceRecord>,
    /// Historical data span
    pub data_span: DataSpan,
}

impl BundleMeta {
    /// Parse metadata from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load metadata from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_ids_round_trip() {
        for stream in RevenueStream::ALL {
            assert_eq!(stream.id().parse::<RevenueStream>().unwrap(), stream);
        }
        assert!("vat".parse::<RevenueStream>().is_err());
    }

    #[test]
    fn meta_parses_from_json() {
        let json = r#"{
            "performance": [
                {"tax_head": "gst", "model": "ardl", "mae_pct": 4.2, "rmse_pct": 5.0, "test_n": 4}
            ],
            "data_span": {"start": 2000, "end": 2024, "n": 25}
        }"#;
        let meta = BundleMeta::from_json_str(json).unwrap();
        assert_eq!(meta.performance.len(), 1);
        assert_eq!(meta.data_span.end, 2024);
    }

    #[test]
    fn bundle_rejects_unknown_stream_lookup() {
        let bundle = ModelBundle {
            models: BTreeMap::new(),
        };
        assert!(bundle.stream(RevenueStream::Customs).is_err());
    }
}
