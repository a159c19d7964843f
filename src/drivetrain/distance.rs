// Encoder-distance drive
//
// A polling controller: call `update` every loop tick with the same distance
// until the robot stops. Asking for a different distance retargets.

use tracing::{debug, info};

use super::hardware::{DriveMotors, Motor, RunMode, Wheel};
use crate::config::DriveConfig;

/// Wheel whose encoder anchors every wheel's absolute target
pub const REFERENCE_WHEEL: Wheel = Wheel::FrontLeft;

/// Tracked distance meaning "no target yet"
pub const NO_TARGET: i32 = 0;

/// Outcome of the power gate on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistancePhase {
    /// Every wheel still busy, drive power applied
    Approaching,
    /// At least one wheel done, all wheels stopped
    Arrived,
}

/// What one `update` call did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceStep {
    /// New absolute targets were pushed this call
    pub retargeted: bool,
    pub phase: DistancePhase,
    /// Power commanded to every wheel
    pub power: f64,
}

/// Gate for drive power: true only while every wheel reports busy.
///
/// The first wheel to reach its target stops the whole robot. Swap this out
/// for a per-wheel rule if that turns out to be unwanted.
pub fn all_wheels_still_approaching<M: Motor>(motors: &DriveMotors<M>) -> bool {
    motors.iter().all(|motor| motor.is_busy())
}

#[derive(Debug, Clone)]
pub struct DistanceDrive {
    counts_per_unit_distance: f64,
    targeted_distance: i32,
}

impl DistanceDrive {
    pub fn new(config: &DriveConfig) -> Self {
        Self {
            counts_per_unit_distance: config.counts_per_unit_distance(),
            targeted_distance: NO_TARGET,
        }
    }

    /// Distance the current targets were computed for
    pub fn targeted_distance(&self) -> i32 {
        self.targeted_distance
    }

    /// Convert a travel distance into encoder counts
    pub fn counts_for(&self, distance: i32) -> i32 {
        // `as` saturates on overflow
        (distance as f64 * self.counts_per_unit_distance).round() as i32
    }

    /// Run one tick of the controller
    pub fn update<M: Motor>(
        &mut self,
        motors: &mut DriveMotors<M>,
        desired_distance: i32,
        desired_power: f64,
    ) -> DistanceStep {
        let retargeted = desired_distance != self.targeted_distance;
        if retargeted {
            self.retarget(motors, desired_distance);
        }

        let (phase, power) = if all_wheels_still_approaching(motors) {
            (DistancePhase::Approaching, desired_power)
        } else {
            (DistancePhase::Arrived, 0.0)
        };
        motors.set_all_power(power);

        debug!(
            "Distance drive: target={}, phase={:?}, power={}",
            self.targeted_distance, phase, power
        );

        DistanceStep {
            retargeted,
            phase,
            power,
        }
    }

    fn retarget<M: Motor>(&mut self, motors: &mut DriveMotors<M>, desired_distance: i32) {
        let move_counts = self.counts_for(desired_distance);
        let anchor = motors.wheel(REFERENCE_WHEEL).current_position();
        let target = anchor.saturating_add(move_counts);

        for wheel in Wheel::ALL {
            motors.wheel_mut(wheel).set_target_position(target);
        }
        motors.set_mode(RunMode::RunToPosition);

        info!(
            "Distance drive retargeted: {} units = {} counts, target {} (anchored on {:?})",
            desired_distance, move_counts, target, REFERENCE_WHEEL
        );
        self.targeted_distance = desired_distance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivetrain::sim::{SimHardwareMap, SimMotor};

    fn setup() -> (SimHardwareMap, DriveMotors<SimMotor>, DistanceDrive) {
        let mut map = SimHardwareMap::mecanum();
        let mut motors = DriveMotors::from_hardware_map(&mut map).unwrap();
        motors.set_mode(RunMode::RunUsingEncoder);
        let drive = DistanceDrive::new(&DriveConfig::default());
        (map, motors, drive)
    }

    fn handle(map: &SimHardwareMap, wheel: Wheel) -> SimMotor {
        map.motor_handle(wheel.config_name()).unwrap()
    }

    #[test]
    fn test_counts_conversion() {
        let drive = DistanceDrive::new(&DriveConfig::default());
        // 28 * 5.23 / pi = 46.61...
        assert_eq!(drive.counts_for(1), 47);
        assert_eq!(drive.counts_for(10), 466);
        assert_eq!(drive.counts_for(-10), -466);
        assert_eq!(drive.counts_for(0), 0);
    }

    #[test]
    fn test_retarget_anchors_on_reference_wheel() {
        let (map, mut motors, mut drive) = setup();
        handle(&map, Wheel::FrontLeft).set_position(1000);
        handle(&map, Wheel::BackRight).set_position(-250);

        let step = drive.update(&mut motors, 10, 0.5);
        assert!(step.retargeted);
        assert_eq!(drive.targeted_distance(), 10);

        for wheel in Wheel::ALL {
            let motor = handle(&map, wheel);
            assert_eq!(motor.target_position(), 1466, "{:?}", wheel);
            assert_eq!(motor.mode(), RunMode::RunToPosition);
        }
    }

    #[test]
    fn test_same_distance_is_idempotent() {
        let (map, mut motors, mut drive) = setup();

        let first = drive.update(&mut motors, 100, 0.4);
        assert!(first.retargeted);
        let target = handle(&map, Wheel::FrontLeft).target_position();

        // Encoder moves, but the same request must not re-anchor
        handle(&map, Wheel::FrontLeft).set_position(30);
        let second = drive.update(&mut motors, 100, 0.4);
        assert!(!second.retargeted);
        for wheel in Wheel::ALL {
            assert_eq!(handle(&map, wheel).target_position(), target);
        }
    }

    #[test]
    fn test_new_distance_retargets() {
        let (map, mut motors, mut drive) = setup();
        drive.update(&mut motors, 10, 0.5);
        handle(&map, Wheel::FrontLeft).set_position(466);

        let step = drive.update(&mut motors, 5, 0.5);
        assert!(step.retargeted);
        assert_eq!(drive.targeted_distance(), 5);
        assert_eq!(handle(&map, Wheel::BackLeft).target_position(), 466 + 233);
    }

    #[test]
    fn test_sentinel_distance_never_retargets() {
        let (map, mut motors, mut drive) = setup();
        let step = drive.update(&mut motors, NO_TARGET, 0.5);
        assert!(!step.retargeted);
        assert_eq!(handle(&map, Wheel::FrontLeft).mode(), RunMode::RunUsingEncoder);
        // Open-loop motors never report busy
        assert_eq!(step.phase, DistancePhase::Arrived);
        assert_eq!(motors.commanded().as_array(), [0.0; 4]);
    }

    #[test]
    fn test_drives_while_all_busy() {
        let (map, mut motors, mut drive) = setup();
        let step = drive.update(&mut motors, 10, 0.6);
        assert_eq!(step.phase, DistancePhase::Approaching);
        assert_eq!(step.power, 0.6);
        for wheel in Wheel::ALL {
            assert_eq!(handle(&map, wheel).power(), 0.6);
        }
    }

    #[test]
    fn test_one_wheel_arriving_stops_everything() {
        let (map, mut motors, mut drive) = setup();
        drive.update(&mut motors, 10, 0.6);

        // Three wheels at target, back right still short
        for wheel in [Wheel::FrontLeft, Wheel::BackLeft, Wheel::FrontRight] {
            handle(&map, wheel).set_position(466);
        }
        assert!(motors.wheel(Wheel::BackRight).is_busy());
        assert!(!all_wheels_still_approaching(&motors));

        let step = drive.update(&mut motors, 10, 0.6);
        assert_eq!(step.phase, DistancePhase::Arrived);
        for wheel in Wheel::ALL {
            assert_eq!(handle(&map, wheel).power(), 0.0);
        }
    }

    #[test]
    fn test_overflowing_distance_saturates() {
        let (map, mut motors, mut drive) = setup();
        handle(&map, Wheel::FrontLeft).set_position(10);
        drive.update(&mut motors, i32::MAX, 1.0);
        assert_eq!(handle(&map, Wheel::FrontLeft).target_position(), i32::MAX);
    }
}
