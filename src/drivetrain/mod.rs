// Drivetrain control for the four-wheel mecanum base
//
// Provides:
// - Mecanum inverse kinematics (motion request -> wheel powers), field-centric variant
// - Encoder distance drive
// - Hardware traits plus a simulated motor bank and IMU
// - High-level drivetrain API

pub mod distance;
mod driver;
pub mod hardware;
pub mod kinematics;
pub mod sim;

pub use distance::{
    all_wheels_still_approaching, DistanceDrive, DistancePhase, DistanceStep, REFERENCE_WHEEL,
};
pub use driver::Drivetrain;
pub use hardware::{
    AngleUnit, Direction, DriveMotors, HardwareError, HardwareMap, HeadingSource, HubFacing,
    ImuOrientation, Motor, RunMode, Wheel,
};
pub use kinematics::{field_mix, mix, WheelPowers};
pub use sim::{SimHardwareMap, SimImu, SimMotor};
