//! Scenario runner for the aerofilter estimators
//!
//! - [`config`]: YAML scenario configuration
//! - [`scenarios`]: altitude and localization runs on simulated data

pub mod config;
pub mod scenarios;

pub use config::{ConfigLoadError, ScenarioConfig};
pub use scenarios::{run_altitude, run_localization, AltitudeRun, LocalizationRun, ScenarioError};
