//! Scenario configuration
//!
//! One YAML file describes both scenarios. Every section falls back to its
//! defaults, so a partial file (or an empty one) is valid:
//!
//! ```yaml
//! seed: 7
//! altitude:
//!   target_altitude: 3.0
//!   kalman:
//!     sensor_sigma: 0.2
//! localization:
//!   particles: 1000
//!   map_file: maps/office.csv
//! ```

use std::path::{Path, PathBuf};

use aerofilter_core::control::PidGains;
use aerofilter_core::estimation::{Control, KalmanConfig, ParticleFilterConfig, Pose};
use aerofilter_core::map::{MapError, OccupancyMap};
use aerofilter_core::simulation::SensorConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors while loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config: {0}")]
    Io(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Top-level scenario configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Seed for every random draw in a run
    pub seed: u64,
    pub altitude: AltitudeScenario,
    pub localization: LocalizationScenario,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            altitude: AltitudeScenario::default(),
            localization: LocalizationScenario::default(),
        }
    }
}

impl ScenarioConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigLoadError::Io(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Parse from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| ConfigLoadError::Parse(e.to_string()))
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String, ConfigLoadError> {
        serde_yaml::to_string(self).map_err(|e| ConfigLoadError::Parse(e.to_string()))
    }
}

/// Altitude hold with Kalman and complementary filtering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AltitudeScenario {
    pub kalman: KalmanConfig,
    pub pid: PidGains,
    pub sensors: SensorConfig,
    /// Complementary filter time constant [s]
    pub complementary_tau: f64,
    /// Altitude the controller holds [m]
    pub target_altitude: f64,
    /// Starting altitude of the simulated drone [m]
    pub initial_altitude: f64,
    /// Number of filter steps
    pub steps: usize,
    /// Accelerometer samples per orientation for calibration (0 skips it)
    pub calibration_samples: usize,
}

impl Default for AltitudeScenario {
    fn default() -> Self {
        Self {
            kalman: KalmanConfig::default(),
            pid: PidGains::default(),
            sensors: SensorConfig::default(),
            complementary_tau: 0.5,
            target_altitude: 2.0,
            initial_altitude: 0.0,
            steps: 300,
            calibration_samples: 50,
        }
    }
}

/// Particle filter localization on an occupancy map
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationScenario {
    pub filter: ParticleFilterConfig,
    /// Delimited occupancy grid file; a generated room is used when absent
    pub map_file: Option<PathBuf>,
    pub map_delimiter: char,
    /// Size of the generated room [cells]
    pub room_size: usize,
    pub particles: usize,
    pub steps: usize,
    pub ground_truth: PoseConfig,
    pub control: ControlConfig,
    /// Seed the particle headings from the ground truth heading
    pub seed_heading: bool,
}

impl Default for LocalizationScenario {
    fn default() -> Self {
        Self {
            filter: ParticleFilterConfig {
                rays: 16,
                ..Default::default()
            },
            map_file: None,
            map_delimiter: ',',
            room_size: 120,
            particles: 2000,
            steps: 10,
            ground_truth: PoseConfig::default(),
            control: ControlConfig::default(),
            seed_heading: true,
        }
    }
}

impl LocalizationScenario {
    /// Load the configured map or generate the default room
    pub fn build_map(&self) -> Result<OccupancyMap, MapError> {
        match &self.map_file {
            Some(path) => OccupancyMap::load(path, self.map_delimiter),
            None => generated_room(self.room_size),
        }
    }
}

/// Bordered square room with a few asymmetric blocks, scaled to `size`
pub fn generated_room(size: usize) -> Result<OccupancyMap, MapError> {
    let mut map = OccupancyMap::bordered(size, size)?;
    let at = |fraction: f64| (fraction * size as f64) as usize;
    map.fill_rect(at(0.17), at(0.17), at(0.29), at(0.25));
    map.fill_rect(at(0.67), at(0.12), at(0.75), at(0.42));
    map.fill_rect(at(0.12), at(0.71), at(0.42), at(0.79));
    map.fill_rect(at(0.58), at(0.62), at(0.62), at(0.88));
    Ok(map)
}

/// Pose in configuration units (heading in degrees)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    pub x: f64,
    pub y: f64,
    pub heading_deg: f64,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            x: 40.5,
            y: 60.5,
            heading_deg: 0.0,
        }
    }
}

impl PoseConfig {
    pub fn to_pose(&self) -> Pose {
        Pose::new(self.x, self.y, self.heading_deg.to_radians())
    }
}

/// Constant control applied every step
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub steering_deg: f64,
    pub speed: f64,
    pub dt: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            steering_deg: 0.0,
            speed: 1.0,
            dt: 1.0,
        }
    }
}

impl ControlConfig {
    pub fn to_control(&self) -> Control {
        Control::new(self.steering_deg.to_radians(), self.speed, self.dt)
    }
}
