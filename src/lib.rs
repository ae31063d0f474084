//! # pca9685-servo
//!
//! A Rust crate for driving hobby servo motors through an NXP PCA9685
//! 16-channel, 12-bit PWM controller on a shared I²C bus, typically from a
//! single-board computer such as a Raspberry Pi.
//!
//! The bus transport is any [`embedded-hal`](https://docs.rs/embedded-hal) 1.0
//! I²C implementation, e.g. `linux_embedded_hal::I2cdev` for `/dev/i2c-N`.
//!
//! ## Features
//!
//! *   Shared bus handle with a cooperative lock (`SharedBus`, `I2cBus`).
//! *   Device handle enforcing the lock discipline (`I2cDevice`):
//!     *   Presence probing (empty write, falling back to a one byte read).
//!     *   Scoped locking through `BusGuard`, released on every exit path.
//!     *   Optional lock timeout.
//!     *   Address scanning (`scan`, `scan_with_progress`).
//! *   Register descriptors (`Register`, `RegisterArray`) mapping typed values
//!     to little-endian register layouts.
//! *   PCA9685 control (`Pca9685`):
//!     *   Reset, MODE1/MODE2 pass-through.
//!     *   PWM frequency calibration through the PRE_SCALE register.
//!     *   Per-channel 16-bit duty cycle (`Channel`), quantised to 12 bits on the chip.
//! *   Servo control (`Servo`, `ServoSet`): angle and fraction positioning
//!     with configurable pulse width range.
//! *   Command-line entry points (`spot`, `servo-angle`, `servo-hold`) behind
//!     the default `cli` feature.
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! pca9685-servo = "0.1.0"
//! linux-embedded-hal = "0.4" # Or any other embedded-hal 1.0 I2C transport
//! log = "0.4"                # Optional, for logging
//! ```
//!
//! ## Basic Usage
//!
//! ```no_run
//! use linux_embedded_hal::I2cdev;
//! use pca9685_servo::{Pca9685, Result, Servo, SharedBus};
//!
//! fn main() -> Result<()> {
//!     let i2c = I2cdev::new("/dev/i2c-1").expect("Failed to open /dev/i2c-1");
//!     let bus = SharedBus::new(i2c);
//!
//!     // Probes 0x40 and resets the chip.
//!     let pca = Pca9685::new(bus)?;
//!     pca.set_frequency(50.0)?;
//!     println!("PWM running at {:.2} Hz", pca.frequency()?);
//!
//!     let servo = Servo::new(pca.channel(0)?)?;
//!     servo.set_angle(Some(90.0))?;
//!     println!("Servo 0 at {:?}°", servo.angle()?);
//!
//!     // Stop driving the servo.
//!     servo.set_angle(None)?;
//!     pca.deinit()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Duty Cycle Encoding
//!
//! Duty cycles are presented as 16-bit values. `0xFFFF` is stored with the
//! chip's full-on bit and reads back exactly; any other value is reduced to
//! the 12-bit counter as `(value + 1) >> 4` and reads back as that count
//! shifted left by 4. A duty cycle of `0` means "not driven": servo fraction
//! and angle read as `None` in that state.
//!
//! ## Hardware Setup Notes
//!
//! *   **I²C Pull-up Resistors:** Most PCA9685 breakout boards carry them already.
//! *   **Servo Power:** Feed V+ from a separate supply; do not power servos from the board's 5V pin.
//! *   **Linux Permissions:** The user needs access to `/dev/i2c-N` (usually the `i2c` group).

#![warn(missing_docs)]

use log::trace;

mod consts;
mod error;

pub mod bus;
pub mod channel;
#[cfg(feature = "cli")]
pub mod cli;
pub mod device;
pub mod pca9685;
pub mod register;
pub mod servo;
pub mod servo_set;

pub use bus::{I2cBus, SharedBus};
pub use channel::{decode_duty_cycle, encode_duty_cycle, Channel};
pub use device::{scan, scan_with_progress, BusGuard, I2cDevice};
pub use error::{Error, Result};
pub use pca9685::{frequency_for, prescale_for, Pca9685, Pca9685Config};
pub use register::{BoundRegisterArray, Register, RegisterArray, RegisterValue};
pub use servo::{DutyCalibration, Servo, ServoConfig};
pub use servo_set::ServoSet;
// Re-export only essential public constants
pub use consts::{
    CHANNEL_COUNT, DEFAULT_ADDRESS, DEFAULT_REFERENCE_CLOCK_HZ, DUTY_CYCLE_MAX,
    SERVO_FREQUENCY_HZ,
};

/// MODE1 register bits, for use with [`Pca9685::set_mode1`].
pub mod flags {
    /// MODE1 bits.
    pub mod mode1 {
        pub use crate::consts::mode1::{AUTO_INCREMENT, RESTART, SLEEP};
    }
}

/// Duty cycle a 16-bit value reads back as after passing through the chip.
pub fn quantize_duty_cycle(value: u16) -> u16 {
    let stored = decode_duty_cycle(encode_duty_cycle(value));
    trace!("Duty cycle 0x{:04X} quantises to 0x{:04X}", value, stored);
    stored
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_prescale_for_50hz() {
        // round(25_000_000 / 4096 / 50) = round(122.07)
        assert_eq!(prescale_for(DEFAULT_REFERENCE_CLOCK_HZ, 50.0).unwrap(), 122);
        assert_relative_eq!(
            frequency_for(DEFAULT_REFERENCE_CLOCK_HZ, 122).unwrap(),
            50.028_81,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_prescale_limits() {
        // Highest frequency with prescale 3 is ~2034.5 Hz at 25 MHz.
        assert_eq!(prescale_for(DEFAULT_REFERENCE_CLOCK_HZ, 2000.0).unwrap(), 3);
        assert!(matches!(
            prescale_for(DEFAULT_REFERENCE_CLOCK_HZ, 3000.0),
            Err(Error::Calibration(_))
        ));
        // Lowest frequency with prescale 255 is ~23.9 Hz.
        assert_eq!(prescale_for(DEFAULT_REFERENCE_CLOCK_HZ, 24.0).unwrap(), 254);
        assert!(matches!(
            prescale_for(DEFAULT_REFERENCE_CLOCK_HZ, 20.0),
            Err(Error::Calibration(_))
        ));
        assert!(matches!(
            prescale_for(DEFAULT_REFERENCE_CLOCK_HZ, 0.0),
            Err(Error::ArgumentOutOfRange(_))
        ));
        assert!(matches!(
            prescale_for(DEFAULT_REFERENCE_CLOCK_HZ, f64::NAN),
            Err(Error::ArgumentOutOfRange(_))
        ));
    }

    #[test]
    fn test_frequency_rejects_unprogrammed_prescale() {
        for prescale in 0..3 {
            assert!(matches!(
                frequency_for(DEFAULT_REFERENCE_CLOCK_HZ, prescale),
                Err(Error::Calibration(_))
            ));
        }
    }

    #[test]
    fn test_prescale_round_trip_within_one_step() {
        for prescale in 3u8..=255 {
            let frequency = frequency_for(DEFAULT_REFERENCE_CLOCK_HZ, prescale).unwrap();
            assert_eq!(
                prescale_for(DEFAULT_REFERENCE_CLOCK_HZ, frequency).unwrap(),
                prescale
            );
        }
    }

    #[test]
    fn test_duty_cycle_encoding() {
        assert_eq!(encode_duty_cycle(0xFFFF), (0x1000, 0));
        assert_eq!(encode_duty_cycle(0), (0, 0));
        assert_eq!(encode_duty_cycle(0x7FFF), (0, 0x800));
        assert_eq!(encode_duty_cycle(0xFFFE), (0, 0xFFF));
        assert_eq!(encode_duty_cycle(4918), (0, 307));
    }

    #[test]
    fn test_duty_cycle_decoding() {
        assert_eq!(decode_duty_cycle((0x1000, 0)), 0xFFFF);
        assert_eq!(decode_duty_cycle((0, 307)), 4912);
        assert_eq!(decode_duty_cycle((0, 0xFFF)), 0xFFF0);
        // Power-on state: full-off bit set.
        assert_eq!(decode_duty_cycle((0, 0x1000)), 0);
        assert_eq!(decode_duty_cycle((0x1000, 0x1000)), 0);
    }

    #[test]
    fn test_quantize_duty_cycle() {
        assert_eq!(quantize_duty_cycle(0xFFFF), 0xFFFF);
        for value in 0..0xFFFFu16 {
            let stored = quantize_duty_cycle(value);
            assert_eq!(stored % 16, 0, "0x{value:04X} stored as 0x{stored:04X}");
            assert!(
                stored.abs_diff(value) <= 16,
                "0x{value:04X} stored as 0x{stored:04X}"
            );
        }
    }

    #[test]
    fn test_servo_calibration_at_50hz() {
        let frequency = frequency_for(DEFAULT_REFERENCE_CLOCK_HZ, 122).unwrap();
        let calibration = DutyCalibration::from_pulse_range(750, 2250, frequency).unwrap();
        // floor(750 * 50.0288 / 1e6 * 65535) and round(2250 * ...) - min
        assert_eq!(calibration.min_duty(), 2458);
        assert_eq!(calibration.duty_range(), 4919);
        assert_eq!(calibration.fraction_to_duty(0.0), 2458);
        assert_eq!(calibration.fraction_to_duty(0.5), 4918);
        assert_eq!(calibration.fraction_to_duty(1.0), 7377);
        assert_relative_eq!(calibration.duty_to_fraction(7377), 1.0);
    }

    #[test]
    fn test_servo_calibration_rejects_bad_ranges() {
        assert!(matches!(
            DutyCalibration::from_pulse_range(2250, 750, 50.0),
            Err(Error::ArgumentOutOfRange(_))
        ));
        // 25 ms pulse does not fit a 20 ms period.
        assert!(matches!(
            DutyCalibration::from_pulse_range(750, 25_000, 50.0),
            Err(Error::ArgumentOutOfRange(_))
        ));
        assert!(matches!(
            ServoConfig::default().with_actuation_range(0.0).calibrate(50.0),
            Err(Error::ArgumentOutOfRange(_))
        ));
    }
}
