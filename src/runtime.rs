// Fixed-rate control loop with watchdog
// Note: the watchdog stops the robot if teleop stops sending commands, so a
// crashed driver station can't leave the base running. Distance commands are
// latched and keep polling until replaced.

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{info, warn};

use crate::config::{DriveConfig, CMD_TIMEOUT, TOPIC_CMD_DRIVE, TOPIC_HEALTH, TOPIC_RT_WHEELS};
use crate::drivetrain::{AngleUnit, Drivetrain, HeadingSource, Motor, SimHardwareMap};
use crate::messages::{DriveCommand, RuntimeHealth, WheelTelemetry};

/// Shortest loop period; keeps `interval` from seeing a zero period
pub const MIN_LOOP_PERIOD: Duration = Duration::from_micros(100);

/// Tick period for a loop rate in Hz
pub fn loop_period(loop_hz: u64) -> Duration {
    Duration::from_secs_f64(1.0 / loop_hz.max(1) as f64).max(MIN_LOOP_PERIOD)
}

pub struct Runtime<M: Motor, I: HeadingSource> {
    drivetrain: Drivetrain<M, I>,
    latest_cmd: Option<DriveCommand>,
    cmd_received_at: Instant,
    health: RuntimeHealth,
}

impl<M: Motor, I: HeadingSource> Runtime<M, I> {
    pub fn new(drivetrain: Drivetrain<M, I>) -> Self {
        Self {
            drivetrain,
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn drivetrain(&self) -> &Drivetrain<M, I> {
        &self.drivetrain
    }

    /// Process incoming command
    pub fn on_command(&mut self, cmd: DriveCommand, now: Instant) {
        let leaving_distance = matches!(self.latest_cmd, Some(DriveCommand::Distance { .. }))
            && !matches!(cmd, DriveCommand::Distance { .. });
        if leaving_distance {
            info!("Leaving distance drive, returning to open-loop power");
            self.drivetrain.use_open_loop();
        }

        self.latest_cmd = Some(cmd);
        self.cmd_received_at = now;
    }

    /// Drive one tick based on the latest command and watchdog state
    pub fn tick(&mut self, now: Instant) -> WheelTelemetry {
        let cmd_age = now.saturating_duration_since(self.cmd_received_at);

        let active = match &self.latest_cmd {
            Some(cmd) if cmd.is_latched() || cmd_age <= CMD_TIMEOUT => Some(cmd.clone()),
            Some(_) => {
                // Watchdog triggered - stop the robot
                if self.health != RuntimeHealth::CmdStale {
                    warn!("Command stale ({:?} old), stopping robot", cmd_age);
                }
                None
            }
            // No command ever received
            None => None,
        };

        let mut distance_phase = None;
        let mut mixed_heading = None;
        self.health = match active {
            None => {
                self.drivetrain.stop();
                RuntimeHealth::CmdStale
            }
            Some(DriveCommand::Robot {
                forward,
                strafe,
                rotate,
                speed_scale,
            }) => {
                self.drivetrain
                    .robot_drive(forward, strafe, rotate, speed_scale);
                RuntimeHealth::Ok
            }
            Some(DriveCommand::Field {
                forward,
                strafe,
                rotate,
                speed_scale,
            }) => match self
                .drivetrain
                .field_drive(forward, strafe, rotate, speed_scale)
            {
                Ok(heading) => {
                    mixed_heading = Some(heading);
                    RuntimeHealth::Ok
                }
                Err(e) => {
                    if self.health != RuntimeHealth::ImuFault {
                        warn!("Field drive failed ({}), stopping robot", e);
                    }
                    self.drivetrain.stop();
                    RuntimeHealth::ImuFault
                }
            },
            Some(DriveCommand::Distance { distance, power }) => {
                let step = self.drivetrain.drive_to_distance(distance, power);
                distance_phase = Some(step.phase.into());
                RuntimeHealth::Ok
            }
            Some(DriveCommand::Stop) => {
                self.drivetrain.stop();
                RuntimeHealth::Ok
            }
        };

        let mut telemetry = WheelTelemetry::from(&self.drivetrain.wheel_powers());
        // Report the heading the wheels were mixed with, when there was one
        telemetry.heading_deg = match mixed_heading {
            Some(heading) => Some(heading.to_degrees()),
            None => self.drivetrain.heading(AngleUnit::Degrees).ok(),
        };
        telemetry.distance_phase = distance_phase;
        telemetry
    }
}

pub async fn run(
    config: DriveConfig,
    loop_hz: u64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Binding simulated motor bank...");
    let mut hw_map = SimHardwareMap::mecanum();
    let drivetrain = Drivetrain::initialize(&mut hw_map, &config)?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_DRIVE).await?;
    let pub_wheels = session.declare_publisher(TOPIC_RT_WHEELS).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut runtime = Runtime::new(drivetrain);
    let period = loop_period(loop_hz);
    let mut tick = interval(period);

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        loop_hz,
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}", TOPIC_CMD_DRIVE);
    info!("Publishing to: {}, {}", TOPIC_RT_WHEELS, TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DriveCommand>(&payload) {
                Ok(cmd) => {
                    info!("Received command: {:?}", &cmd);
                    runtime.on_command(cmd, Instant::now());
                }
                Err(e) => {
                    warn!("Failed to parse command: {}", e);
                }
            }
        }

        // 2. Advance the simulated motors by one period
        hw_map.step(period);

        // 3. Drive (includes watchdog logic)
        let telemetry = runtime.tick(Instant::now());

        // 4. Publish wheel telemetry
        let telemetry_json = serde_json::to_string(&telemetry)?;
        pub_wheels.put(telemetry_json).await?;

        // 5. Publish health
        let health_json = serde_json::to_string(&runtime.health())?;
        pub_health.put(health_json).await?;
    }
}
