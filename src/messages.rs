// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::drivetrain::{DistancePhase, WheelPowers};

// Command from teleop/scripts -> runtime
// Tagged by "mode" so one topic carries every kind of drive request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DriveCommand {
    Robot {
        forward: f64,
        strafe: f64,
        rotate: f64,
        #[serde(default = "full_speed")]
        speed_scale: f64,
    },
    Field {
        forward: f64,
        strafe: f64,
        rotate: f64,
        #[serde(default = "full_speed")]
        speed_scale: f64,
    },
    Distance {
        distance: i32,
        power: f64,
    },
    Stop,
}

fn full_speed() -> f64 {
    1.0
}

impl DriveCommand {
    /// Latched commands stay active until replaced, regardless of the watchdog
    pub fn is_latched(&self) -> bool {
        matches!(self, DriveCommand::Distance { .. })
    }
}

// Telemetry from runtime -> observers
// Has default values because the robot starts stopped
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WheelTelemetry {
    pub front_left: f64,
    pub back_left: f64,
    pub front_right: f64,
    pub back_right: f64,
    pub heading_deg: Option<f64>,
    pub distance_phase: Option<DistanceStatus>,
}

impl From<&WheelPowers> for WheelTelemetry {
    fn from(powers: &WheelPowers) -> Self {
        Self {
            front_left: powers.front_left,
            back_left: powers.back_left,
            front_right: powers.front_right,
            back_right: powers.back_right,
            heading_deg: None,
            distance_phase: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DistanceStatus {
    Approaching,
    Arrived,
}

impl From<DistancePhase> for DistanceStatus {
    fn from(phase: DistancePhase) -> Self {
        match phase {
            DistancePhase::Approaching => DistanceStatus::Approaching,
            DistancePhase::Arrived => DistanceStatus::Arrived,
        }
    }
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    ImuFault,
}
