// Keyboard teleop: WASD move, Z/X rotate, R/F speed, C toggle field/robot frame,
// G drive 24 units, Space stop, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use mecanum_drivetrain::config::TOPIC_CMD_DRIVE;
use mecanum_drivetrain::messages::DriveCommand;

const SPEED_SCALES: [f64; 3] = [0.3, 0.6, 1.0];
const DISTANCE_STEP: i32 = 24;
const DISTANCE_POWER: f64 = 0.4;
const INPUT_TIMEOUT_MS: u64 = 100; // Reset axes after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_DRIVE).await?;

    info!("Controls: WASD=move, Z/X=rotate, R/F=speed, C=frame, G=drive 24, Space=stop, Q=quit");
    info!("Speed: LOW, frame: FIELD");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn publish(
    publisher: &zenoh::pubsub::Publisher<'_>,
    cmd: &DriveCommand,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    publisher.put(serde_json::to_string(cmd)?).await?;
    Ok(())
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut speed_idx: usize = 0;
    let mut field_centric = true;
    let mut distance_target = 0;
    let mut distance_active = false;

    // Persistent axis state
    let mut forward = 0.0;
    let mut strafe = 0.0;
    let mut rotate = 0.0;
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                let mut moved = true;

                match code {
                    KeyCode::Char('w') if pressed => forward = 1.0,
                    KeyCode::Char('s') if pressed => forward = -1.0,
                    KeyCode::Char('a') if pressed => strafe = -1.0,
                    KeyCode::Char('d') if pressed => strafe = 1.0,
                    KeyCode::Char('z') if pressed => rotate = -1.0,
                    KeyCode::Char('x') if pressed => rotate = 1.0,

                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(2);
                        print_speed(speed_idx);
                        moved = false;
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        print_speed(speed_idx);
                        moved = false;
                    }
                    KeyCode::Char('c') if pressed => {
                        field_centric = !field_centric;
                        info!("Frame: {}", if field_centric { "FIELD" } else { "ROBOT" });
                        moved = false;
                    }

                    // Each press asks for a new distance so the controller retargets
                    KeyCode::Char('g') if pressed => {
                        distance_target += DISTANCE_STEP;
                        distance_active = true;
                        info!("Driving to distance {}", distance_target);
                        publish(
                            publisher,
                            &DriveCommand::Distance {
                                distance: distance_target,
                                power: DISTANCE_POWER,
                            },
                        )
                        .await?;
                        moved = false;
                    }
                    KeyCode::Char(' ') if pressed => {
                        distance_active = false;
                        publish(publisher, &DriveCommand::Stop).await?;
                        moved = false;
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => {
                        publish(publisher, &DriveCommand::Stop).await?;
                        break;
                    }

                    _ => moved = false,
                }

                if moved {
                    distance_active = false;
                    last_movement_input = Instant::now();
                }
            }
        }

        // Distance drive is latched by the runtime, don't override it
        if distance_active {
            continue;
        }

        // Reset axes if no movement input for INPUT_TIMEOUT_MS
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            forward = 0.0;
            strafe = 0.0;
            rotate = 0.0;
        }

        // Always publish at ~50Hz
        let speed_scale = SPEED_SCALES[speed_idx];
        let cmd = if field_centric {
            DriveCommand::Field {
                forward,
                strafe,
                rotate,
                speed_scale,
            }
        } else {
            DriveCommand::Robot {
                forward,
                strafe,
                rotate,
                speed_scale,
            }
        };
        publish(publisher, &cmd).await?;
    }

    Ok(())
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}
