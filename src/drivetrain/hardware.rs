// Hardware abstraction for the drivetrain
//
// The controller never talks to a device directly. Motors, the heading
// sensor, and the name -> device lookup are collaborators behind these traits.

use serde::{Deserialize, Serialize};

use super::kinematics::WheelPowers;

/// Error types for hardware access
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("No {kind} named \"{name}\" in the hardware map")]
    DeviceNotFound { name: String, kind: &'static str },

    #[error("IMU error: {0}")]
    Imu(String),
}

pub type Result<T> = std::result::Result<T, HardwareError>;

/// Motor run modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Open-loop power, encoder ignored
    RunWithoutEncoder,
    /// Open-loop power with encoder counting
    RunUsingEncoder,
    /// Closed loop toward the target position, power acts as a ceiling
    RunToPosition,
    /// Zero the encoder and stop
    StopAndResetEncoder,
}

/// Motor shaft direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleUnit {
    Radians,
    Degrees,
}

/// Direction a face of the control hub points, relative to the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HubFacing {
    Up,
    Down,
    Left,
    Right,
    Forward,
    Backward,
}

impl HubFacing {
    /// 0 = vertical, 1 = lateral, 2 = longitudinal
    fn axis(self) -> u8 {
        match self {
            HubFacing::Up | HubFacing::Down => 0,
            HubFacing::Left | HubFacing::Right => 1,
            HubFacing::Forward | HubFacing::Backward => 2,
        }
    }
}

/// How the hub carrying the IMU is mounted on the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImuOrientation {
    pub logo: HubFacing,
    pub usb: HubFacing,
}

impl ImuOrientation {
    pub fn new(logo: HubFacing, usb: HubFacing) -> Self {
        Self { logo, usb }
    }

    /// The logo and usb faces must lie on different axes
    pub fn is_valid(&self) -> bool {
        self.logo.axis() != self.usb.axis()
    }
}

impl Default for ImuOrientation {
    fn default() -> Self {
        Self::new(HubFacing::Up, HubFacing::Forward)
    }
}

/// A single drive actuator with an encoder
pub trait Motor {
    fn set_power(&mut self, power: f64);

    /// Encoder position in counts
    fn current_position(&self) -> i32;

    fn set_target_position(&mut self, position: i32);

    fn set_mode(&mut self, mode: RunMode);

    /// True while the motor is still moving toward its target (RunToPosition only)
    fn is_busy(&self) -> bool;

    fn set_direction(&mut self, direction: Direction);
}

/// Source of robot yaw
pub trait HeadingSource {
    /// Configure the sensor for how it is mounted
    fn initialize(&mut self, orientation: ImuOrientation) -> Result<()>;

    fn yaw(&self, unit: AngleUnit) -> Result<f64>;
}

/// Name -> device lookup, the way a robot configuration binds hardware
pub trait HardwareMap {
    type Motor: Motor;
    type Imu: HeadingSource;

    fn motor(&mut self, name: &str) -> Result<Self::Motor>;

    fn imu(&mut self, name: &str) -> Result<Self::Imu>;
}

/// Wheel positions on the chassis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wheel {
    FrontLeft,
    BackLeft,
    FrontRight,
    BackRight,
}

impl Wheel {
    /// All wheels, in [`WheelPowers::as_array`] order
    pub const ALL: [Wheel; 4] = [
        Wheel::FrontLeft,
        Wheel::BackLeft,
        Wheel::FrontRight,
        Wheel::BackRight,
    ];

    /// Name the motor is bound under in the hardware map
    pub fn config_name(self) -> &'static str {
        match self {
            Wheel::FrontLeft => "frontLeft",
            Wheel::BackLeft => "backLeft",
            Wheel::FrontRight => "frontRight",
            Wheel::BackRight => "backRight",
        }
    }

    pub fn is_right_side(self) -> bool {
        matches!(self, Wheel::FrontRight | Wheel::BackRight)
    }
}

/// The four drive motors, always written together
pub struct DriveMotors<M: Motor> {
    front_left: M,
    back_left: M,
    front_right: M,
    back_right: M,
    commanded: WheelPowers,
}

impl<M: Motor> DriveMotors<M> {
    pub fn new(front_left: M, back_left: M, front_right: M, back_right: M) -> Self {
        Self {
            front_left,
            back_left,
            front_right,
            back_right,
            commanded: WheelPowers::zero(),
        }
    }

    /// Look up all four motors by their configured names
    pub fn from_hardware_map<H>(hw_map: &mut H) -> Result<Self>
    where
        H: HardwareMap<Motor = M>,
    {
        Ok(Self::new(
            hw_map.motor(Wheel::FrontLeft.config_name())?,
            hw_map.motor(Wheel::BackLeft.config_name())?,
            hw_map.motor(Wheel::FrontRight.config_name())?,
            hw_map.motor(Wheel::BackRight.config_name())?,
        ))
    }

    pub fn wheel(&self, wheel: Wheel) -> &M {
        match wheel {
            Wheel::FrontLeft => &self.front_left,
            Wheel::BackLeft => &self.back_left,
            Wheel::FrontRight => &self.front_right,
            Wheel::BackRight => &self.back_right,
        }
    }

    pub fn wheel_mut(&mut self, wheel: Wheel) -> &mut M {
        match wheel {
            Wheel::FrontLeft => &mut self.front_left,
            Wheel::BackLeft => &mut self.back_left,
            Wheel::FrontRight => &mut self.front_right,
            Wheel::BackRight => &mut self.back_right,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &M> {
        [
            &self.front_left,
            &self.back_left,
            &self.front_right,
            &self.back_right,
        ]
        .into_iter()
    }

    /// Send a power command to every wheel
    pub fn apply(&mut self, powers: &WheelPowers) {
        self.front_left.set_power(powers.front_left);
        self.back_left.set_power(powers.back_left);
        self.front_right.set_power(powers.front_right);
        self.back_right.set_power(powers.back_right);
        self.commanded = *powers;
    }

    pub fn set_all_power(&mut self, power: f64) {
        self.apply(&WheelPowers::uniform(power));
    }

    pub fn set_mode(&mut self, mode: RunMode) {
        for wheel in Wheel::ALL {
            self.wheel_mut(wheel).set_mode(mode);
        }
    }

    /// Last powers sent through [`DriveMotors::apply`]
    pub fn commanded(&self) -> WheelPowers {
        self.commanded
    }
}
