use clap::Parser;
use log::info;
use pca9685_servo::cli::{init_logging, BusArgs};
use pca9685_servo::{Error, Pca9685, Result, Servo, SERVO_FREQUENCY_HZ};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

/// Move one servo to an angle, hold it, then release it
#[derive(Debug, Parser)]
#[command(version, about, allow_negative_numbers = true)]
struct Cli {
    /// PCA9685 channel the servo is connected to (0-15)
    servo_id: usize,
    /// Target angle in degrees (0-180)
    angle: f64,
    /// Seconds to hold the position before releasing the servo
    #[arg(long)]
    wait: f64,
    #[command(flatten)]
    bus: BusArgs,
    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn run(cli: &Cli) -> Result<()> {
    let hold = Duration::try_from_secs_f64(cli.wait).map_err(|_| {
        Error::ArgumentOutOfRange(format!("wait must be a non-negative number of seconds (got {})", cli.wait))
    })?;
    let pca = Pca9685::with_config(cli.bus.open()?, cli.bus.pca_config())?;
    pca.set_frequency(SERVO_FREQUENCY_HZ)?;
    let servo = Servo::new(pca.channel(cli.servo_id)?)?;

    servo.set_angle(Some(cli.angle))?;
    info!("Servo {} set to {}°, holding for {:?}", cli.servo_id, cli.angle, hold);
    thread::sleep(hold);
    servo.release()?;
    info!("Servo {} released", cli.servo_id);
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
