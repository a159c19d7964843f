// Timeouts, topics, hardware names, drive constants
use std::f64::consts::PI;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::drivetrain::ImuOrientation;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_DRIVE: &str = "mecanum/cmd/drive"; // commands
pub const TOPIC_RT_WHEELS: &str = "mecanum/rt/wheels"; // wheel telemetry
pub const TOPIC_HEALTH: &str = "mecanum/state/health"; // health status

// Hardware map name of the heading sensor
pub const IMU_NAME: &str = "imu";

// Placeholder drive measurements until the real chassis is measured
pub const DEFAULT_GEAR_RATIO: f64 = 5.23;
pub const DEFAULT_MOTOR_COUNTS_PER_REV: f64 = 28.0;
pub const DEFAULT_WHEEL_DIAMETER: f64 = 1.0;

/// Error types for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid drive constant {name}: {value} (must be finite and positive)")]
    InvalidConstant { name: &'static str, value: f64 },
}

/// Drive constants as they appear in a config file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriveConstants {
    pub gear_ratio: f64,
    pub motor_counts_per_rev: f64,
    pub wheel_diameter: f64,
    pub imu_orientation: ImuOrientation,
}

impl Default for DriveConstants {
    fn default() -> Self {
        Self {
            gear_ratio: DEFAULT_GEAR_RATIO,
            motor_counts_per_rev: DEFAULT_MOTOR_COUNTS_PER_REV,
            wheel_diameter: DEFAULT_WHEEL_DIAMETER,
            imu_orientation: ImuOrientation::default(),
        }
    }
}

/// Drivetrain geometry plus the encoder scale derived from it
///
/// `counts_per_unit_distance` is computed once on construction. Distance units
/// are whatever unit `wheel_diameter` is given in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "DriveConstants")]
pub struct DriveConfig {
    gear_ratio: f64,
    motor_counts_per_rev: f64,
    wheel_diameter: f64,
    counts_per_unit_distance: f64,
    imu_orientation: ImuOrientation,
}

impl DriveConfig {
    pub fn new(
        gear_ratio: f64,
        motor_counts_per_rev: f64,
        wheel_diameter: f64,
    ) -> Result<Self, ConfigError> {
        for (name, value) in [
            ("gear_ratio", gear_ratio),
            ("motor_counts_per_rev", motor_counts_per_rev),
            ("wheel_diameter", wheel_diameter),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidConstant { name, value });
            }
        }
        Ok(Self::derive(
            gear_ratio,
            motor_counts_per_rev,
            wheel_diameter,
            ImuOrientation::default(),
        ))
    }

    fn derive(
        gear_ratio: f64,
        motor_counts_per_rev: f64,
        wheel_diameter: f64,
        imu_orientation: ImuOrientation,
    ) -> Self {
        let counts_per_wheel_rev = motor_counts_per_rev * gear_ratio;
        Self {
            gear_ratio,
            motor_counts_per_rev,
            wheel_diameter,
            counts_per_unit_distance: counts_per_wheel_rev / (PI * wheel_diameter),
            imu_orientation,
        }
    }

    pub fn with_imu_orientation(mut self, orientation: ImuOrientation) -> Self {
        self.imu_orientation = orientation;
        self
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn gear_ratio(&self) -> f64 {
        self.gear_ratio
    }

    pub fn motor_counts_per_rev(&self) -> f64 {
        self.motor_counts_per_rev
    }

    pub fn wheel_diameter(&self) -> f64 {
        self.wheel_diameter
    }

    /// Encoder counts per unit of travel
    pub fn counts_per_unit_distance(&self) -> f64 {
        self.counts_per_unit_distance
    }

    pub fn imu_orientation(&self) -> ImuOrientation {
        self.imu_orientation
    }
}

impl TryFrom<DriveConstants> for DriveConfig {
    type Error = ConfigError;

    fn try_from(constants: DriveConstants) -> Result<Self, Self::Error> {
        Ok(DriveConfig::new(
            constants.gear_ratio,
            constants.motor_counts_per_rev,
            constants.wheel_diameter,
        )?
        .with_imu_orientation(constants.imu_orientation))
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        let constants = DriveConstants::default();
        Self::derive(
            constants.gear_ratio,
            constants.motor_counts_per_rev,
            constants.wheel_diameter,
            constants.imu_orientation,
        )
    }
}
