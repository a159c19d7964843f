// High-level drivetrain for the mecanum base
//
// Combines kinematics, the distance controller, and the hardware traits to
// provide a simple API for driving the chassis.

use tracing::{debug, info, warn};

use super::distance::{DistanceDrive, DistanceStep};
use super::hardware::{
    AngleUnit, Direction, DriveMotors, HardwareMap, HeadingSource, Motor, Result, RunMode, Wheel,
};
use super::kinematics::{field_mix, mix, WheelPowers};
use crate::config::{DriveConfig, IMU_NAME};

/// Mecanum drivetrain owning four drive motors and a heading source
pub struct Drivetrain<M: Motor, I: HeadingSource> {
    motors: DriveMotors<M>,
    imu: I,
    distance: DistanceDrive,
}

impl<M: Motor, I: HeadingSource> Drivetrain<M, I> {
    /// Bind the hardware and put it in a safe starting state
    ///
    /// Fails if any motor or the IMU is missing from the hardware map. The
    /// right side is reversed, every motor runs open loop with encoders, and
    /// all power is zeroed.
    pub fn initialize<H>(hw_map: &mut H, config: &DriveConfig) -> Result<Self>
    where
        H: HardwareMap<Motor = M, Imu = I>,
    {
        info!("Initializing mecanum drivetrain");

        let mut motors = DriveMotors::from_hardware_map(hw_map)?;

        for wheel in Wheel::ALL {
            if wheel.is_right_side() {
                motors.wheel_mut(wheel).set_direction(Direction::Reverse);
            }
        }
        motors.set_mode(RunMode::RunUsingEncoder);
        motors.set_all_power(0.0);

        let mut imu = hw_map.imu(IMU_NAME)?;
        let orientation = config.imu_orientation();
        imu.initialize(orientation)?;
        info!(
            "IMU initialized (logo {:?}, usb {:?})",
            orientation.logo, orientation.usb
        );

        info!(
            "Drivetrain ready: {:.3} counts per unit distance",
            config.counts_per_unit_distance()
        );

        Ok(Self {
            motors,
            imu,
            distance: DistanceDrive::new(config),
        })
    }

    /// Robot-centric drive
    ///
    /// # Arguments
    /// * `forward` - Forward command (positive = forward)
    /// * `strafe` - Sideways command (positive = right)
    /// * `rotate` - Rotation command (positive = clockwise)
    /// * `speed_scale` - Overall speed multiplier
    pub fn robot_drive(&mut self, forward: f64, strafe: f64, rotate: f64, speed_scale: f64) {
        let powers = mix(forward, strafe, rotate, speed_scale);
        self.set_wheel_powers(powers);
    }

    /// Field-centric drive: forward/strafe are relative to the field
    ///
    /// Reads the heading once and returns it in radians. A failed read leaves
    /// the motors untouched.
    pub fn field_drive(
        &mut self,
        forward: f64,
        strafe: f64,
        rotate: f64,
        speed_scale: f64,
    ) -> Result<f64> {
        let heading = self.imu.yaw(AngleUnit::Radians)?;
        let powers = field_mix(forward, strafe, rotate, speed_scale, heading);
        self.set_wheel_powers(powers);

        debug!(
            "Heading: {:.4} rad ({:.2} deg)",
            heading,
            heading.to_degrees()
        );
        Ok(heading)
    }

    /// Poll the encoder distance drive; call every tick with the same distance
    pub fn drive_to_distance(&mut self, desired_distance: i32, desired_power: f64) -> DistanceStep {
        self.distance
            .update(&mut self.motors, desired_distance, desired_power)
    }

    /// Send raw wheel powers
    pub fn set_wheel_powers(&mut self, powers: WheelPowers) {
        debug!(
            "Setting wheel powers: fl={:.3}, bl={:.3}, fr={:.3}, br={:.3}",
            powers.front_left, powers.back_left, powers.front_right, powers.back_right
        );
        self.motors.apply(&powers);
    }

    /// Zero power on all wheels
    pub fn stop(&mut self) {
        self.motors.set_all_power(0.0);
    }

    /// Drop out of run-to-position so power commands are open loop again
    ///
    /// The tracked distance is kept, so re-requesting it will not retarget.
    pub fn use_open_loop(&mut self) {
        self.motors.set_all_power(0.0);
        self.motors.set_mode(RunMode::RunUsingEncoder);
    }

    /// Last powers commanded to the wheels
    pub fn wheel_powers(&self) -> WheelPowers {
        self.motors.commanded()
    }

    /// Distance the current encoder targets were computed for
    pub fn targeted_distance(&self) -> i32 {
        self.distance.targeted_distance()
    }

    /// Current heading, for telemetry
    pub fn heading(&self, unit: AngleUnit) -> Result<f64> {
        self.imu.yaw(unit)
    }
}

impl<M: Motor, I: HeadingSource> Drop for Drivetrain<M, I> {
    fn drop(&mut self) {
        // Never leave the wheels powered once the owner is gone
        if self.motors.commanded() != WheelPowers::zero() {
            warn!("Drivetrain dropped while powered, stopping motors");
        }
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivetrain::distance::DistancePhase;
    use crate::drivetrain::hardware::{HardwareError, HubFacing, ImuOrientation};
    use crate::drivetrain::sim::{SimHardwareMap, SimImu, SimMotor};
    use std::f64::consts::FRAC_PI_2;
    use std::time::Duration;

    fn setup() -> (SimHardwareMap, Drivetrain<SimMotor, SimImu>) {
        let mut map = SimHardwareMap::mecanum();
        let drivetrain = Drivetrain::initialize(&mut map, &DriveConfig::default()).unwrap();
        (map, drivetrain)
    }

    fn motor(map: &SimHardwareMap, wheel: Wheel) -> SimMotor {
        map.motor_handle(wheel.config_name()).unwrap()
    }

    fn powers_of(map: &SimHardwareMap) -> [f64; 4] {
        Wheel::ALL.map(|wheel| motor(map, wheel).power())
    }

    #[test]
    fn test_initialize_configures_motors() {
        let map = SimHardwareMap::mecanum();
        for wheel in Wheel::ALL {
            let mut m = motor(&map, wheel);
            m.set_power(0.7);
        }

        let mut map = map;
        let drivetrain = Drivetrain::initialize(&mut map, &DriveConfig::default()).unwrap();

        for wheel in Wheel::ALL {
            let m = motor(&map, wheel);
            let expected = if wheel.is_right_side() {
                Direction::Reverse
            } else {
                Direction::Forward
            };
            assert_eq!(m.direction(), expected, "{:?}", wheel);
            assert_eq!(m.mode(), RunMode::RunUsingEncoder);
            assert_eq!(m.power(), 0.0);
        }
        assert_eq!(drivetrain.targeted_distance(), 0);

        let imu = map.imu_handle(IMU_NAME).unwrap();
        assert_eq!(imu.orientation(), Some(ImuOrientation::default()));
    }

    #[test]
    fn test_initialize_fails_on_missing_motor() {
        let mut map = SimHardwareMap::mecanum();
        map.remove("frontRight");
        let result = Drivetrain::initialize(&mut map, &DriveConfig::default());
        match result {
            Err(HardwareError::DeviceNotFound { name, kind }) => {
                assert_eq!(name, "frontRight");
                assert_eq!(kind, "motor");
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("initialize should fail without frontRight"),
        }
    }

    #[test]
    fn test_initialize_fails_on_missing_imu() {
        let mut map = SimHardwareMap::mecanum();
        map.remove(IMU_NAME);
        assert!(matches!(
            Drivetrain::initialize(&mut map, &DriveConfig::default()),
            Err(HardwareError::DeviceNotFound { kind: "imu", .. })
        ));
    }

    #[test]
    fn test_initialize_rejects_bad_imu_orientation() {
        let mut map = SimHardwareMap::mecanum();
        let config = DriveConfig::default()
            .with_imu_orientation(ImuOrientation::new(HubFacing::Forward, HubFacing::Backward));
        assert!(matches!(
            Drivetrain::initialize(&mut map, &config),
            Err(HardwareError::Imu(_))
        ));
    }

    #[test]
    fn test_robot_drive_writes_all_wheels() {
        let (map, mut drivetrain) = setup();
        drivetrain.robot_drive(0.0, 0.0, 1.0, 0.5);
        assert_eq!(powers_of(&map), [0.5, 0.5, -0.5, -0.5]);
        assert_eq!(drivetrain.wheel_powers(), mix(0.0, 0.0, 1.0, 0.5));
    }

    #[test]
    fn test_field_drive_reads_heading_once() {
        let (map, mut drivetrain) = setup();
        let imu = map.imu_handle(IMU_NAME).unwrap();
        imu.set_yaw(FRAC_PI_2);

        let before = imu.reads();
        let heading = drivetrain.field_drive(1.0, 0.0, 0.0, 1.0).unwrap();
        assert_eq!(imu.reads(), before + 1);
        assert_eq!(heading, FRAC_PI_2);

        let expected = mix(0.0, 1.0, 0.0, 1.0);
        for (actual, expected) in powers_of(&map).iter().zip(expected.as_array()) {
            assert!((actual - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_field_drive_propagates_imu_failure() {
        let (map, mut drivetrain) = setup();
        drivetrain.robot_drive(0.4, 0.0, 0.0, 1.0);

        let imu = map.imu_handle(IMU_NAME).unwrap();
        imu.set_fault(Some("i2c nack"));
        assert!(matches!(
            drivetrain.field_drive(1.0, 0.0, 0.0, 1.0),
            Err(HardwareError::Imu(_))
        ));
        // Previous command left in place
        assert_eq!(powers_of(&map), [0.4; 4]);
    }

    #[test]
    fn test_drive_to_distance_runs_to_completion() {
        let (map, mut drivetrain) = setup();
        let dt = Duration::from_millis(20);

        let first = drivetrain.drive_to_distance(10, 0.5);
        assert!(first.retargeted);
        assert_eq!(first.phase, DistancePhase::Approaching);

        let mut ticks = 0;
        loop {
            map.step(dt);
            let step = drivetrain.drive_to_distance(10, 0.5);
            assert!(!step.retargeted);
            ticks += 1;
            if step.phase == DistancePhase::Arrived {
                break;
            }
            assert!(ticks < 100, "never arrived");
        }

        assert_eq!(powers_of(&map), [0.0; 4]);
        assert_eq!(motor(&map, Wheel::FrontLeft).current_position(), 466);
    }

    #[test]
    fn test_same_distance_after_open_loop_does_not_retarget() {
        let (map, mut drivetrain) = setup();
        assert!(drivetrain.drive_to_distance(10, 0.5).retargeted);
        let target = motor(&map, Wheel::FrontLeft).target_position();

        drivetrain.use_open_loop();
        assert_eq!(motor(&map, Wheel::FrontLeft).mode(), RunMode::RunUsingEncoder);
        assert_eq!(powers_of(&map), [0.0; 4]);

        // Tracked distance survives, so the same request is not a new target
        let step = drivetrain.drive_to_distance(10, 0.5);
        assert!(!step.retargeted);
        assert_eq!(drivetrain.targeted_distance(), 10);
        assert_eq!(motor(&map, Wheel::FrontLeft).target_position(), target);
        // Open-loop motors never report busy, so nothing moves
        assert_eq!(step.phase, DistancePhase::Arrived);
        assert_eq!(powers_of(&map), [0.0; 4]);
    }

    #[test]
    fn test_stop_and_drop_zero_power() {
        let (map, mut drivetrain) = setup();
        drivetrain.robot_drive(1.0, 0.0, 0.0, 1.0);
        drivetrain.stop();
        assert_eq!(powers_of(&map), [0.0; 4]);

        drivetrain.robot_drive(1.0, 0.0, 0.0, 1.0);
        drop(drivetrain);
        assert_eq!(powers_of(&map), [0.0; 4]);
    }
}
