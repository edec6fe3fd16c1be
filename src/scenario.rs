//! Future explanatory-variable scenario construction

use crate::data::AnnualTable;
use crate::error::{ForecastError, Result};
use crate::utils::linear_trend;

/// Maximum supported forecast horizon in years
pub const MAX_HORIZON: usize = 10;

/// The six base explanatory log-series governed by scenario growth rates
pub const BASE_SERIES: [&str; 6] = [
    "log_gdp_nonagr",
    "log_lsm",
    "log_imports",
    "log_dutiable_imports",
    "log_consumption",
    "log_exrate",
];

/// Scenario assumptions driving the future explanatory table.
///
/// Growth rates are annual percentages applied to the log-level base series;
/// the structural switches control the COVID-era and tax-regime indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioParameters {
    /// Non-agricultural GDP growth (%)
    pub gdp_nonagr_growth: f64,
    /// Large-scale manufacturing growth (%)
    pub lsm_growth: f64,
    /// Total imports growth (%)
    pub imports_growth: f64,
    /// Dutiable imports growth (%)
    pub dutiable_growth: f64,
    /// Private consumption growth (%)
    pub consumption_growth: f64,
    /// Exchange-rate depreciation (%)
    pub exrate_growth: f64,
    /// Inflation level held constant across the horizon
    pub inflation_level: f64,
    /// COVID-era structural-break indicator
    pub covid_active: bool,
    /// Tax-regime structural-break indicator
    pub regime_active: bool,
    /// Project base series with an OLS trend instead of compounded growth
    pub use_trend_projection: bool,
}

impl Default for ScenarioParameters {
    fn default() -> Self {
        Self {
            gdp_nonagr_growth: 12.0,
            lsm_growth: 10.0,
            imports_growth: 10.0,
            dutiable_growth: 10.0,
            consumption_growth: 12.0,
            exrate_growth: 8.0,
            inflation_level: 0.0,
            covid_active: false,
            regime_active: true,
            use_trend_projection: false,
        }
    }
}

impl ScenarioParameters {
    /// Default scenario with the inflation level taken from the last
    /// historical observation.
    pub fn default_for(history: &AnnualTable) -> Self {
        let inflation = history.last_value("inflation").unwrap_or(0.0);
        Self {
            inflation_level: inflation,
            ..Self::default()
        }
    }

    fn growth_for(&self, series: &str) -> f64 {
        match series {
            "log_gdp_nonagr" => self.gdp_nonagr_growth,
            "log_lsm" => self.lsm_growth,
            "log_imports" => self.imports_growth,
            "log_dutiable_imports" => self.dutiable_growth,
            "log_consumption" => self.consumption_growth,
            "log_exrate" => self.exrate_growth,
            _ => 0.0,
        }
    }
}

/// Validate a forecast horizon against the supported range.
pub fn validate_horizon(horizon: usize) -> Result<()> {
    if horizon < 1 || horizon > MAX_HORIZON {
        return Err(ForecastError::InvalidParameter(format!(
            "Horizon must be between 1 and {}, got {}",
            MAX_HORIZON, horizon
        )));
    }
    Ok(())
}

/// Build the future explanatory table for the years immediately following
/// the last historical year.
///
/// Base log-series are either compounded forward by `ln(1 + g/100)` per year
/// or extrapolated with an OLS trend; inflation and the structural switches
/// are held constant; every other requested name is silently back-filled
/// with its last historical value, or zero when absent from history.
pub fn build_future_scenario(
    history: &AnnualTable,
    horizon: usize,
    explanatory_names: &[String],
    scenario: &ScenarioParameters,
) -> Result<AnnualTable> {
    validate_horizon(horizon)?;
    let last_year = history.last_year().ok_or_else(|| {
        ForecastError::DataError("Historical table is empty".to_string())
    })?;

    let years: Vec<i32> = (1..=horizon as i32).map(|i| last_year + i).collect();
    let mut columns: Vec<(String, Vec<f64>)> = Vec::with_capacity(explanatory_names.len());

    for name in explanatory_names {
        let values = if BASE_SERIES.contains(&name.as_str()) && history.has_column(name) {
            project_base_series(history, horizon, name, scenario)?
        } else if name == "inflation" {
            vec![scenario.inflation_level; horizon]
        } else if name == "covid" {
            vec![if scenario.covid_active { 1.0 } else { 0.0 }; horizon]
        } else if name == "regime" {
            vec![if scenario.regime_active { 1.0 } else { 0.0 }; horizon]
        } else if name == "step_2024" && history.has_column(name) {
            // Post-break policy state, fixed rather than re-derived
            vec![1.0; horizon]
        } else if (name == "dummy_2024" || name == "dummy_2025") && history.has_column(name) {
            vec![0.0; horizon]
        } else {
            // Silent fallback: last historical value, or zero when the
            // series is unknown entirely.
            let fill = history.last_value(name).unwrap_or(0.0);
            let fill = if fill.is_nan() { 0.0 } else { fill };
            vec![fill; horizon]
        };
        columns.push((name.clone(), values));
    }

    AnnualTable::from_columns(years, columns)
}

fn project_base_series(
    history: &AnnualTable,
    horizon: usize,
    name: &str,
    scenario: &ScenarioParameters,
) -> Result<Vec<f64>> {
    let series = history
        .column(name)
        .ok_or_else(|| ForecastError::DataError(format!("Missing column '{}'", name)))?;

    if scenario.use_trend_projection {
        let observed: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
        let (intercept, slope) = linear_trend(&observed)?;
        let n = observed.len();
        Ok((0..horizon)
            .map(|i| intercept + slope * (n + i) as f64)
            .collect())
    } else {
        let last = series.last().copied().unwrap_or(f64::NAN);
        if !last.is_finite() {
            return Err(ForecastError::DataError(format!(
                "Last historical value of '{}' is not finite",
                name
            )));
        }
        let increment = (1.0 + scenario.growth_for(name) / 100.0).ln();
        let mut values = Vec::with_capacity(horizon);
        let mut current = last;
        for _ in 0..horizon {
            current += increment;
            values.push(current);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> AnnualTable {
        AnnualTable::from_columns(
            vec![2020, 2021, 2022],
            vec![
                ("log_imports".to_string(), vec![4.0, 4.1, 4.2]),
                ("inflation".to_string(), vec![9.0, 10.0, 11.0]),
                ("covid".to_string(), vec![1.0, 0.0, 0.0]),
                ("regime".to_string(), vec![0.0, 0.0, 1.0]),
                ("step_2024".to_string(), vec![0.0, 0.0, 0.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn horizon_zero_is_rejected() {
        let scenario = ScenarioParameters::default();
        let names = vec!["log_imports".to_string()];
        let err = build_future_scenario(&history(), 0, &names, &scenario);
        assert!(matches!(err, Err(ForecastError::InvalidParameter(_))));
    }

    #[test]
    fn compounded_growth_is_additive_in_logs() {
        let scenario = ScenarioParameters {
            imports_growth: 10.0,
            ..ScenarioParameters::default()
        };
        let names = vec!["log_imports".to_string()];
        let fut = build_future_scenario(&history(), 3, &names, &scenario).unwrap();

        let step = (1.0_f64 + 0.1).ln();
        let col = fut.column("log_imports").unwrap();
        for (i, &v) in col.iter().enumerate() {
            let expected = 4.2 + (i + 1) as f64 * step;
            assert!((v - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_growth_repeats_last_value() {
        let scenario = ScenarioParameters {
            imports_growth: 0.0,
            inflation_level: 11.0,
            covid_active: false,
            regime_active: false,
            ..ScenarioParameters::default()
        };
        let names = vec![
            "log_imports".to_string(),
            "inflation".to_string(),
            "covid".to_string(),
            "regime".to_string(),
        ];
        let fut = build_future_scenario(&history(), 5, &names, &scenario).unwrap();

        for &v in fut.column("log_imports").unwrap() {
            assert!((v - 4.2).abs() < 1e-12);
        }
        assert!(fut.column("inflation").unwrap().iter().all(|&v| v == 11.0));
        assert!(fut.column("covid").unwrap().iter().all(|&v| v == 0.0));
        assert!(fut.column("regime").unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn step_indicator_is_fixed_on() {
        let scenario = ScenarioParameters::default();
        let names = vec!["step_2024".to_string()];
        let fut = build_future_scenario(&history(), 2, &names, &scenario).unwrap();
        assert!(fut.column("step_2024").unwrap().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn unknown_name_backfills_zero() {
        let scenario = ScenarioParameters::default();
        let names = vec!["log_mystery".to_string()];
        let fut = build_future_scenario(&history(), 2, &names, &scenario).unwrap();
        assert!(fut.column("log_mystery").unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn trend_projection_extrapolates_ols_line() {
        let scenario = ScenarioParameters {
            use_trend_projection: true,
            ..ScenarioParameters::default()
        };
        let names = vec!["log_imports".to_string()];
        let fut = build_future_scenario(&history(), 2, &names, &scenario).unwrap();

        // History is exactly linear: 4.0 + 0.1 * t
        let col = fut.column("log_imports").unwrap();
        assert!((col[0] - 4.3).abs() < 1e-10);
        assert!((col[1] - 4.4).abs() < 1e-10);
    }

    #[test]
    fn future_years_follow_history() {
        let scenario = ScenarioParameters::default();
        let names = vec!["log_imports".to_string()];
        let fut = build_future_scenario(&history(), 3, &names, &scenario).unwrap();
        assert_eq!(fut.years(), &[2023, 2024, 2025]);
    }
}
