use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mecanum_drivetrain::config::{DriveConfig, LOOP_HZ};

/// Mecanum drivetrain runtime driving a simulated motor bank
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON file with drive constants (gear_ratio, motor_counts_per_rev, wheel_diameter, imu_orientation)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Control loop frequency in Hz
    #[arg(long, default_value_t = LOOP_HZ, value_parser = clap::value_parser!(u64).range(1..=1000))]
    loop_hz: u64,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let args = Args::parse();

    let config = match args.config {
        Some(path) => match DriveConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error: {}", e);
                std::process::exit(1);
            }
        },
        None => DriveConfig::default(),
    };

    if let Err(e) = mecanum_drivetrain::runtime::run(config, args.loop_hz).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
