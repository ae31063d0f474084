use clap::Parser;
use log::info;
use pca9685_servo::cli::{init_logging, BusArgs};
use pca9685_servo::{Pca9685, Result, Servo, SERVO_FREQUENCY_HZ};
use std::process::ExitCode;

/// Move one servo to an angle
#[derive(Debug, Parser)]
#[command(version, about, allow_negative_numbers = true)]
struct Cli {
    /// PCA9685 channel the servo is connected to (0-15)
    servo_id: usize,
    /// Target angle in degrees (0-180)
    angle: f64,
    #[command(flatten)]
    bus: BusArgs,
    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn run(cli: &Cli) -> Result<()> {
    let pca = Pca9685::with_config(cli.bus.open()?, cli.bus.pca_config())?;
    pca.set_frequency(SERVO_FREQUENCY_HZ)?;
    let servo = Servo::new(pca.channel(cli.servo_id)?)?;
    servo.set_angle(Some(cli.angle))?;
    info!("Servo {} set to {}°", cli.servo_id, cli.angle);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
