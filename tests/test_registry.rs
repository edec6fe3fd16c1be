use pretty_assertions::assert_eq;
use tax_forecast::bundle::{BundleMeta, RevenueStream};
use tax_forecast::models::EstimatorKind;
use tax_forecast::registry::PerformanceRegistry;

fn meta_json() -> &'static str {
    r#"{
        "performance": [
            {"tax_head": "gst", "model": "ardl", "mae_pct": 5.1, "rmse_pct": 6.3, "test_n": 4},
            {"tax_head": "gst", "model": "arimax", "mae_pct": 3.8, "rmse_pct": 4.5, "test_n": 4},
            {"tax_head": "gst", "model": "enet", "mae_pct": 4.4, "rmse_pct": 5.2, "test_n": 4},
            {"tax_head": "dt", "model": "ardl", "mae_pct": 4.0, "rmse_pct": 4.9, "test_n": 4},
            {"tax_head": "dt", "model": "enet", "mae_pct": 4.0, "rmse_pct": 5.5, "test_n": 4},
            {"tax_head": "customs", "model": "ardl", "mae_pct": 6.2, "rmse_pct": 7.7, "test_n": 4}
        ],
        "data_span": {"start": 2000, "end": 2024, "n": 25}
    }"#
}

fn registry() -> PerformanceRegistry {
    let meta = BundleMeta::from_json_str(meta_json()).unwrap();
    PerformanceRegistry::from_meta(&meta)
}

#[test]
fn test_best_model_has_lowest_mae() {
    let registry = registry();
    assert_eq!(
        registry.best(RevenueStream::SalesTax).unwrap(),
        EstimatorKind::Arimax
    );
    assert_eq!(
        registry.best(RevenueStream::Customs).unwrap(),
        EstimatorKind::Ardl
    );
}

#[test]
fn test_mae_ties_keep_the_first_record() {
    let registry = registry();
    assert_eq!(
        registry.best(RevenueStream::DirectTax).unwrap(),
        EstimatorKind::Ardl
    );
}

#[test]
fn test_stream_without_records_is_an_error() {
    let registry = registry();
    assert!(registry.best(RevenueStream::FederalExcise).is_err());
}

#[test]
fn test_records_filter_by_stream() {
    let registry = registry();
    let gst = registry.records_for(RevenueStream::SalesTax);
    assert_eq!(gst.len(), 3);
    assert!(gst.iter().all(|r| r.stream == "gst"));

    let found = registry
        .record(RevenueStream::SalesTax, EstimatorKind::ElasticNet)
        .unwrap();
    assert_eq!(found.mae_pct, 4.4);
}

#[test]
fn test_data_span_survives_the_meta_parse() {
    let meta = BundleMeta::from_json_str(meta_json()).unwrap();
    assert_eq!(meta.data_span.start, 2000);
    assert_eq!(meta.data_span.end, 2024);
    assert_eq!(meta.data_span.n, 25);
}
