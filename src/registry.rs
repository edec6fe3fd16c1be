//! Best-model selection from cross-validated performance records

use crate::bundle::{BundleMeta, PerformanceRecord, RevenueStream};
use crate::error::{ForecastError, Result};
use crate::models::EstimatorKind;

/// Read-only view over the cross-validated accuracy records, answering which
/// estimator family performed best for each revenue stream.
#[derive(Debug, Clone)]
pub struct PerformanceRegistry {
    records: Vec<PerformanceRecord>,
}

impl PerformanceRegistry {
    /// Build a registry from performance records.
    pub fn new(records: Vec<PerformanceRecord>) -> Self {
        Self { records }
    }

    /// Build a registry from bundle metadata.
    pub fn from_meta(meta: &BundleMeta) -> Self {
        Self::new(meta.performance.clone())
    }

    /// All records
    pub fn records(&self) -> &[PerformanceRecord] {
        &self.records
    }

    /// Records for one revenue stream, in stored order.
    pub fn records_for(&self, stream: RevenueStream) -> Vec<&PerformanceRecord> {
        self.records
            .iter()
            .filter(|r| r.stream == stream.id())
            .collect()
    }

    /// The record for one (stream, estimator) pair, if present.
    pub fn record(
        &self,
        stream: RevenueStream,
        estimator: EstimatorKind,
    ) -> Option<&PerformanceRecord> {
        self.records
            .iter()
            .find(|r| r.stream == stream.id() && r.estimator == estimator.id())
    }

    /// The best estimator family for a stream: lowest mean absolute percent
    /// error, first occurrence winning ties. Records with estimator names
    /// outside the supported families are skipped.
    pub fn best(&self, stream: RevenueStream) -> Result<EstimatorKind> {
        let mut best: Option<(EstimatorKind, f64)> = None;
        for record in &self.records {
            if record.stream != stream.id() {
                continue;
            }
            let kind = match record.estimator.parse::<EstimatorKind>() {
                Ok(kind) => kind,
                Err(_) => continue,
            };
            match best {
                Some((_, mae)) if record.mae_pct >= mae => {}
                _ => best = Some((kind, record.mae_pct)),
            }
        }
        best.map(|(kind, _)| kind).ok_or_else(|| {
            ForecastError::UnknownStream(format!(
                "No performance records for stream '{}'",
                stream.id()
            ))
        })
    }
}
