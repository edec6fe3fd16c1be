use rstest::rstest;
use tax_forecast::data::AnnualTable;
use tax_forecast::scenario::{
    build_future_scenario, validate_horizon, ScenarioParameters, MAX_HORIZON,
};

fn history() -> AnnualTable {
    AnnualTable::from_columns(
        vec![2019, 2020, 2021, 2022],
        vec![
            ("log_imports".to_string(), vec![3.9, 4.0, 4.1, 4.2]),
            ("log_lsm".to_string(), vec![2.0, 2.0, 2.1, 2.2]),
            ("inflation".to_string(), vec![8.0, 9.0, 10.0, 11.0]),
            ("covid".to_string(), vec![0.0, 1.0, 1.0, 0.0]),
            ("regime".to_string(), vec![0.0, 0.0, 0.0, 1.0]),
            ("dummy_2024".to_string(), vec![0.0, 0.0, 0.0, 0.0]),
        ],
    )
    .unwrap()
}

#[rstest]
#[case(0, false)]
#[case(1, true)]
#[case(MAX_HORIZON, true)]
#[case(MAX_HORIZON + 1, false)]
fn test_horizon_bounds(#[case] horizon: usize, #[case] accepted: bool) {
    assert_eq!(validate_horizon(horizon).is_ok(), accepted);
}

#[rstest]
#[case(5.0)]
#[case(10.0)]
#[case(25.0)]
fn test_growth_compounds_in_logs(#[case] growth: f64) {
    let scenario = ScenarioParameters {
        imports_growth: growth,
        ..ScenarioParameters::default()
    };
    let names = vec!["log_imports".to_string()];
    let fut = build_future_scenario(&history(), 4, &names, &scenario).unwrap();

    let step = (1.0 + growth / 100.0).ln();
    for (i, &v) in fut.column("log_imports").unwrap().iter().enumerate() {
        let expected = 4.2 + (i + 1) as f64 * step;
        assert!((v - expected).abs() < 1e-10);
    }
}

#[test]
fn test_indicators_follow_scenario_switches() {
    let scenario = ScenarioParameters {
        inflation_level: 12.5,
        covid_active: true,
        regime_active: false,
        ..ScenarioParameters::default()
    };
    let names = vec![
        "inflation".to_string(),
        "covid".to_string(),
        "regime".to_string(),
        "dummy_2024".to_string(),
    ];
    let fut = build_future_scenario(&history(), 3, &names, &scenario).unwrap();

    assert!(fut.column("inflation").unwrap().iter().all(|&v| v == 12.5));
    assert!(fut.column("covid").unwrap().iter().all(|&v| v == 1.0));
    assert!(fut.column("regime").unwrap().iter().all(|&v| v == 0.0));
    // Pulse dummies stay off over the future
    assert!(fut.column("dummy_2024").unwrap().iter().all(|&v| v == 0.0));
}

#[test]
fn test_default_scenario_picks_up_last_inflation() {
    let scenario = ScenarioParameters::default_for(&history());
    assert_eq!(scenario.inflation_level, 11.0);
}

#[test]
fn test_trend_and_growth_projections_differ() {
    let names = vec!["log_lsm".to_string()];
    let growth = build_future_scenario(
        &history(),
        3,
        &names,
        &ScenarioParameters::default(),
    )
    .unwrap();
    let trend = build_future_scenario(
        &history(),
        3,
        &names,
        &ScenarioParameters {
            use_trend_projection: true,
            ..ScenarioParameters::default()
        },
    )
    .unwrap();

    // log_lsm history is not exactly log-linear at the default growth rate,
    // so the two projections must diverge.
    let g = growth.column("log_lsm").unwrap();
    let t = trend.column("log_lsm").unwrap();
    assert!(g.iter().zip(t.iter()).any(|(a, b)| (a - b).abs() > 1e-6));
}

#[test]
fn test_future_table_covers_all_requested_names() {
    let names = vec![
        "log_imports".to_string(),
        "inflation".to_string(),
        "log_unknown_series".to_string(),
    ];
    let fut = build_future_scenario(&history(), 2, &names, &ScenarioParameters::default()).unwrap();

    assert_eq!(fut.years(), &[2023, 2024]);
    for name in &names {
        assert!(fut.has_column(name), "missing column {}", name);
    }
}
