//! # Tax Forecast
//!
//! A Rust library for annual government revenue forecasting from fitted
//! model artifacts.
//!
//! ## Features
//!
//! - Year-indexed macro-fiscal data handling (CSV in, CSV out)
//! - Three estimator families per revenue stream: ARDL with bootstrapped
//!   intervals, state-space regression with analytic intervals, and a
//!   regularized linear model with recursive bootstrap intervals
//! - Scenario construction for the future explanatory variables
//! - Best-model selection from cross-validated accuracy records
//! - Total-collection aggregation across the four revenue streams
//! - Residual diagnostics, coefficient tables, and long-run elasticities
//!
//! ## Quick Start
//!
//! ```no_run
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use tax_forecast::aggregate::{Aggregator, EstimatorChoice};
//! use tax_forecast::bundle::{BundleMeta, ModelBundle};
//! use tax_forecast::data::AnnualTable;
//! use tax_forecast::registry::PerformanceRegistry;
//! use tax_forecast::scenario::ScenarioParameters;
//!
//! fn main() -> tax_forecast::error::Result<()> {
//!     // Load historical data and the fitted artifacts
//!     let history = AnnualTable::from_csv("annual_data.csv")?;
//!     let mut bundle = ModelBundle::from_path("models.json")?;
//!     bundle.prepare(&history)?;
//!
//!     // Best-model selection comes from the bundle's accuracy records
//!     let meta = BundleMeta::from_path("meta.json")?;
//!     let registry = PerformanceRegistry::from_meta(&meta);
//!
//!     // Forecast total collection 3 years out under the default scenario
//!     let aggregator = Aggregator::new(&bundle, &history, &registry);
//!     let scenario = ScenarioParameters::default_for(&history);
//!     let mut rng = StdRng::seed_from_u64(42);
//!     let out = aggregator.total(EstimatorChoice::Best, &scenario, 3, 500, &mut rng)?;
//!
//!     println!("{}", out.total.to_csv_string()?);
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod bundle;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod models;
pub mod registry;
pub mod scenario;
pub mod utils;

// Re-export commonly used types
pub use crate::aggregate::{AggregateForecast, Aggregator, EstimatorChoice};
pub use crate::bundle::{BundleMeta, ModelBundle, RevenueStream};
pub use crate::data::AnnualTable;
pub use crate::error::ForecastError;
pub use crate::models::{EstimatorKind, ForecastResult};
pub use crate::registry::PerformanceRegistry;
pub use crate::scenario::ScenarioParameters;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
