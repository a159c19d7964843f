// Simulated motor bank and IMU
//
// In-process stand-ins for the hardware traits. Handles share state with the
// map that created them, so the map can advance the physics and tests can
// inspect what the controller commanded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info};

use super::hardware::{
    AngleUnit, Direction, HardwareError, HardwareMap, HeadingSource, ImuOrientation, Motor,
    Result, RunMode, Wheel,
};
use crate::config::IMU_NAME;

/// Encoder counts per second at full power (28 CPR motor, 5.23:1 gearbox, ~6000 rpm)
pub const DEFAULT_MAX_COUNTS_PER_SEC: f64 = 2800.0;

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct MotorState {
    power: f64,
    position: f64,
    target: i32,
    mode: RunMode,
    direction: Direction,
}

impl Default for MotorState {
    fn default() -> Self {
        Self {
            power: 0.0,
            position: 0.0,
            target: 0,
            mode: RunMode::RunWithoutEncoder,
            direction: Direction::Forward,
        }
    }
}

impl MotorState {
    fn is_busy(&self) -> bool {
        self.mode == RunMode::RunToPosition && self.position.round() as i32 != self.target
    }

    fn step(&mut self, dt: f64, max_counts_per_sec: f64) {
        let travel = self.power.abs() * max_counts_per_sec * dt;
        match self.mode {
            RunMode::RunWithoutEncoder | RunMode::RunUsingEncoder => {
                self.position += self.power.signum() * travel;
            }
            RunMode::RunToPosition => {
                let remaining = self.target as f64 - self.position;
                if remaining.abs() <= travel {
                    self.position = self.target as f64;
                } else {
                    self.position += remaining.signum() * travel;
                }
            }
            RunMode::StopAndResetEncoder => {}
        }
    }
}

/// Handle to a simulated motor
#[derive(Debug, Clone)]
pub struct SimMotor {
    state: Arc<Mutex<MotorState>>,
}

impl SimMotor {
    pub fn power(&self) -> f64 {
        lock(&self.state).power
    }

    pub fn mode(&self) -> RunMode {
        lock(&self.state).mode
    }

    pub fn direction(&self) -> Direction {
        lock(&self.state).direction
    }

    pub fn target_position(&self) -> i32 {
        lock(&self.state).target
    }

    /// Teleport the encoder, as if the wheel had been pushed
    pub fn set_position(&self, counts: i32) {
        lock(&self.state).position = counts as f64;
    }
}

impl Motor for SimMotor {
    fn set_power(&mut self, power: f64) {
        lock(&self.state).power = power;
    }

    fn current_position(&self) -> i32 {
        lock(&self.state).position.round() as i32
    }

    fn set_target_position(&mut self, position: i32) {
        lock(&self.state).target = position;
    }

    fn set_mode(&mut self, mode: RunMode) {
        let mut state = lock(&self.state);
        if mode == RunMode::StopAndResetEncoder {
            state.position = 0.0;
            state.power = 0.0;
        }
        state.mode = mode;
    }

    fn is_busy(&self) -> bool {
        lock(&self.state).is_busy()
    }

    fn set_direction(&mut self, direction: Direction) {
        lock(&self.state).direction = direction;
    }
}

#[derive(Debug, Default)]
struct ImuState {
    yaw_rad: f64,
    orientation: Option<ImuOrientation>,
    fault: Option<String>,
    reads: u64,
}

/// Handle to a simulated IMU
#[derive(Debug, Clone)]
pub struct SimImu {
    state: Arc<Mutex<ImuState>>,
}

impl SimImu {
    pub fn set_yaw(&self, radians: f64) {
        lock(&self.state).yaw_rad = radians;
    }

    /// Make every following read fail (None clears the fault)
    pub fn set_fault(&self, fault: Option<&str>) {
        lock(&self.state).fault = fault.map(str::to_string);
    }

    pub fn orientation(&self) -> Option<ImuOrientation> {
        lock(&self.state).orientation
    }

    /// Number of yaw reads served so far
    pub fn reads(&self) -> u64 {
        lock(&self.state).reads
    }
}

impl HeadingSource for SimImu {
    fn initialize(&mut self, orientation: ImuOrientation) -> Result<()> {
        if !orientation.is_valid() {
            return Err(HardwareError::Imu(format!(
                "logo {:?} and usb {:?} cannot face the same axis",
                orientation.logo, orientation.usb
            )));
        }
        let mut state = lock(&self.state);
        state.orientation = Some(orientation);
        state.yaw_rad = 0.0;
        Ok(())
    }

    fn yaw(&self, unit: AngleUnit) -> Result<f64> {
        let mut state = lock(&self.state);
        if let Some(fault) = &state.fault {
            return Err(HardwareError::Imu(fault.clone()));
        }
        state.reads += 1;
        Ok(match unit {
            AngleUnit::Radians => state.yaw_rad,
            AngleUnit::Degrees => state.yaw_rad.to_degrees(),
        })
    }
}

/// Simulated robot configuration
pub struct SimHardwareMap {
    motors: HashMap<String, Arc<Mutex<MotorState>>>,
    imus: HashMap<String, Arc<Mutex<ImuState>>>,
    max_counts_per_sec: f64,
}

impl SimHardwareMap {
    pub fn empty() -> Self {
        Self {
            motors: HashMap::new(),
            imus: HashMap::new(),
            max_counts_per_sec: DEFAULT_MAX_COUNTS_PER_SEC,
        }
    }

    /// Four drive motors and an IMU under the standard names
    pub fn mecanum() -> Self {
        let mut map = Self::empty();
        for wheel in Wheel::ALL {
            map.add_motor(wheel.config_name());
        }
        map.add_imu(IMU_NAME);
        map
    }

    pub fn add_motor(&mut self, name: &str) {
        self.motors.insert(name.to_string(), Arc::default());
    }

    pub fn add_imu(&mut self, name: &str) {
        self.imus.insert(name.to_string(), Arc::default());
    }

    pub fn remove(&mut self, name: &str) {
        self.motors.remove(name);
        self.imus.remove(name);
    }

    /// Inspection handle for a bound motor
    pub fn motor_handle(&self, name: &str) -> Option<SimMotor> {
        self.motors.get(name).map(|state| SimMotor {
            state: Arc::clone(state),
        })
    }

    pub fn imu_handle(&self, name: &str) -> Option<SimImu> {
        self.imus.get(name).map(|state| SimImu {
            state: Arc::clone(state),
        })
    }

    /// Advance every motor by `dt`
    pub fn step(&self, dt: Duration) {
        let dt = dt.as_secs_f64();
        for state in self.motors.values() {
            lock(state).step(dt, self.max_counts_per_sec);
        }
    }
}

impl HardwareMap for SimHardwareMap {
    type Motor = SimMotor;
    type Imu = SimImu;

    fn motor(&mut self, name: &str) -> Result<SimMotor> {
        debug!("Binding motor {}", name);
        self.motor_handle(name)
            .ok_or_else(|| HardwareError::DeviceNotFound {
                name: name.to_string(),
                kind: "motor",
            })
    }

    fn imu(&mut self, name: &str) -> Result<SimImu> {
        info!("Binding IMU {}", name);
        self.imu_handle(name).ok_or_else(|| HardwareError::DeviceNotFound {
            name: name.to_string(),
            kind: "imu",
        })
    }
}
