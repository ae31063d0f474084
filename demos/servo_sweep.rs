use pca9685_servo::cli::open_bus;
use pca9685_servo::{Pca9685, Result, Servo, SERVO_FREQUENCY_HZ};
use std::{thread, time::Duration};

const SERVO_CHANNEL: usize = 0;

fn main() -> Result<()> {
    env_logger::init();
    println!("Opening PCA9685 on /dev/i2c-1...");
    let pca = Pca9685::new(open_bus("/dev/i2c-1")?)?;

    pca.set_frequency(SERVO_FREQUENCY_HZ)?;
    println!(
        "PWM frequency: {:.3} Hz (PRE_SCALE {})",
        pca.frequency()?,
        pca.prescale()?
    );

    let servo = Servo::new(pca.channel(SERVO_CHANNEL)?)?;
    println!(
        "Servo on channel {}: min duty {}, duty range {}",
        SERVO_CHANNEL,
        servo.calibration().min_duty(),
        servo.calibration().duty_range()
    );

    println!("Sweeping 0-180° in 15° steps...");
    for step in (0..=12).chain((0..12).rev()) {
        let target = f64::from(step) * 15.0;
        servo.set_angle(Some(target))?;
        let read = servo.angle()?.unwrap_or(f64::NAN);
        println!("Target {:>5.1}°, read back {:>6.2}°", target, read);
        thread::sleep(Duration::from_millis(200));
    }

    println!("Releasing servo...");
    servo.release()?;
    pca.deinit()?;
    println!("Servo sweep finished.");
    Ok(())
}
