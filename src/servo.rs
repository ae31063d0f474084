//! Hobby servo driven by one PCA9685 channel.
//!
//! A servo maps an angle in `0..=actuation_range` onto a fraction in
//! `0.0..=1.0`, and the fraction onto a duty cycle between the minimum and
//! maximum pulse widths.

use crate::bus::I2cBus;
use crate::channel::Channel;
use crate::consts;
use crate::error::{Error, Result};
use log::{debug, trace};

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Servo calibration constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServoConfig {
    /// Travel in degrees between the minimum and maximum pulse (default 180).
    pub actuation_range: f64,
    /// Pulse width at angle 0 in microseconds (default 750).
    pub min_pulse_us: u32,
    /// Pulse width at the full actuation range in microseconds (default 2250).
    pub max_pulse_us: u32,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            actuation_range: consts::SERVO_ACTUATION_RANGE_DEG,
            min_pulse_us: consts::SERVO_MIN_PULSE_US,
            max_pulse_us: consts::SERVO_MAX_PULSE_US,
        }
    }
}

impl ServoConfig {
    /// Sets the travel in degrees.
    pub fn with_actuation_range(mut self, actuation_range: f64) -> Self {
        self.actuation_range = actuation_range;
        self
    }

    /// Sets the pulse widths in microseconds at angle 0 and at full travel.
    pub fn with_pulse_width_range(mut self, min_pulse_us: u32, max_pulse_us: u32) -> Self {
        self.min_pulse_us = min_pulse_us;
        self.max_pulse_us = max_pulse_us;
        self
    }

    /// Calibrates the configured pulse widths against `frequency_hz`.
    pub fn calibrate(&self, frequency_hz: f64) -> Result<DutyCalibration> {
        check_actuation_range(self.actuation_range)?;
        DutyCalibration::from_pulse_range(self.min_pulse_us, self.max_pulse_us, frequency_hz)
    }
}

fn check_actuation_range(actuation_range: f64) -> Result<()> {
    if !actuation_range.is_finite() || actuation_range <= 0.0 {
        return Err(Error::ArgumentOutOfRange(format!(
            "actuation range must be a positive number of degrees (got {})",
            actuation_range
        )));
    }
    Ok(())
}

/// Duty cycle window corresponding to a servo's pulse width range at one
/// PWM frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCalibration {
    min_duty: u32,
    duty_range: u32,
}

impl DutyCalibration {
    /// `min_duty` is floored and the maximum duty rounded, both on the 16-bit
    /// duty scale.
    pub fn from_pulse_range(min_pulse_us: u32, max_pulse_us: u32, frequency_hz: f64) -> Result<Self> {
        if min_pulse_us >= max_pulse_us {
            return Err(Error::ArgumentOutOfRange(format!(
                "minimum pulse {} us must be shorter than maximum pulse {} us",
                min_pulse_us, max_pulse_us
            )));
        }
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(Error::ArgumentOutOfRange(format!(
                "PWM frequency must be a positive number of Hz (got {})",
                frequency_hz
            )));
        }
        let full_scale = f64::from(consts::DUTY_CYCLE_MAX);
        let min_duty = (f64::from(min_pulse_us) * frequency_hz / MICROS_PER_SEC * full_scale).floor();
        let max_duty = (f64::from(max_pulse_us) * frequency_hz / MICROS_PER_SEC * full_scale).round();
        if max_duty > full_scale {
            return Err(Error::ArgumentOutOfRange(format!(
                "pulse width {} us does not fit in one period at {:.2} Hz",
                max_pulse_us, frequency_hz
            )));
        }
        if max_duty <= min_duty {
            return Err(Error::ArgumentOutOfRange(format!(
                "pulse widths {}-{} us are indistinguishable at {:.2} Hz",
                min_pulse_us, max_pulse_us, frequency_hz
            )));
        }
        Ok(Self {
            min_duty: min_duty as u32,
            duty_range: (max_duty - min_duty) as u32,
        })
    }

    /// Duty cycle of the minimum pulse.
    pub fn min_duty(&self) -> u32 {
        self.min_duty
    }

    /// Duty cycle span from minimum to maximum pulse.
    pub fn duty_range(&self) -> u32 {
        self.duty_range
    }

    /// Duty cycle for `fraction` (expected within `0.0..=1.0`).
    pub fn fraction_to_duty(&self, fraction: f64) -> u32 {
        self.min_duty + (fraction * f64::from(self.duty_range)).round() as u32
    }

    /// Fraction corresponding to a raw duty cycle. Can leave `0.0..=1.0` if
    /// the channel was driven outside this calibration.
    pub fn duty_to_fraction(&self, duty_cycle: u16) -> f64 {
        (f64::from(duty_cycle) - f64::from(self.min_duty)) / f64::from(self.duty_range)
    }
}

/// A servo on one PCA9685 channel.
///
/// Holds only calibration constants; position reads always query the
/// channel's duty cycle. The calibration is computed from the frequency at
/// construction (or at [`set_pulse_width_range`](Self::set_pulse_width_range))
/// and goes stale if the controller frequency changes afterwards.
#[derive(Debug)]
pub struct Servo<'a, B> {
    channel: Channel<'a, B>,
    actuation_range: f64,
    calibration: DutyCalibration,
}

impl<'a, B: I2cBus> Servo<'a, B> {
    /// Servo with the default 180° range and 750-2250 us pulses.
    pub fn new(channel: Channel<'a, B>) -> Result<Self> {
        Self::with_config(channel, ServoConfig::default())
    }

    /// Servo calibrated from `config` at the channel's current frequency.
    pub fn with_config(channel: Channel<'a, B>, config: ServoConfig) -> Result<Self> {
        let calibration = config.calibrate(channel.frequency()?)?;
        debug!(
            "Servo on channel {}: range={}°, min_duty={}, duty_range={}",
            channel.index(),
            config.actuation_range,
            calibration.min_duty,
            calibration.duty_range
        );
        Ok(Self {
            channel,
            actuation_range: config.actuation_range,
            calibration,
        })
    }

    /// Servo from a previously computed calibration, without touching the bus.
    pub fn from_calibration(
        channel: Channel<'a, B>,
        actuation_range: f64,
        calibration: DutyCalibration,
    ) -> Result<Self> {
        check_actuation_range(actuation_range)?;
        Ok(Self {
            channel,
            actuation_range,
            calibration,
        })
    }

    /// Recalibrates against the channel's current frequency.
    pub fn set_pulse_width_range(&mut self, min_pulse_us: u32, max_pulse_us: u32) -> Result<()> {
        let frequency_hz = self.channel.frequency()?;
        self.calibration =
            DutyCalibration::from_pulse_range(min_pulse_us, max_pulse_us, frequency_hz)?;
        debug!(
            "Servo on channel {} recalibrated at {:.3} Hz: min_duty={}, duty_range={}",
            self.channel.index(),
            frequency_hz,
            self.calibration.min_duty,
            self.calibration.duty_range
        );
        Ok(())
    }

    /// The channel driving this servo.
    pub fn channel(&self) -> Channel<'a, B> {
        self.channel
    }

    /// Travel in degrees.
    pub fn actuation_range(&self) -> f64 {
        self.actuation_range
    }

    /// The duty cycle window in use.
    pub fn calibration(&self) -> DutyCalibration {
        self.calibration
    }

    /// Current position as a fraction of the pulse range, `None` when the
    /// channel is not driven (duty cycle 0).
    pub fn fraction(&self) -> Result<Option<f64>> {
        let duty_cycle = self.channel.duty_cycle()?;
        if duty_cycle == 0 {
            return Ok(None);
        }
        Ok(Some(self.calibration.duty_to_fraction(duty_cycle)))
    }

    /// Moves to `fraction` of the pulse range, or releases the servo on `None`.
    pub fn set_fraction(&self, fraction: Option<f64>) -> Result<()> {
        let Some(fraction) = fraction else {
            trace!("Releasing servo on channel {}", self.channel.index());
            return self.channel.set_duty_cycle(0);
        };
        if !(0.0..=1.0).contains(&fraction) {
            return Err(Error::ArgumentOutOfRange(format!(
                "Servo fraction {} out of range (0.0-1.0)",
                fraction
            )));
        }
        let duty_cycle = self.calibration.fraction_to_duty(fraction);
        trace!(
            "Servo on channel {}: fraction {} -> duty cycle {}",
            self.channel.index(),
            fraction,
            duty_cycle
        );
        self.channel.set_duty_cycle(duty_cycle)
    }

    /// Current angle in degrees, `None` when the servo is released.
    pub fn angle(&self) -> Result<Option<f64>> {
        Ok(self
            .fraction()?
            .map(|fraction| self.actuation_range * fraction))
    }

    /// Moves to `angle` degrees, or releases the servo on `None`.
    pub fn set_angle(&self, angle: Option<f64>) -> Result<()> {
        let Some(angle) = angle else {
            return self.set_fraction(None);
        };
        if !(0.0..=self.actuation_range).contains(&angle) {
            return Err(Error::ArgumentOutOfRange(format!(
                "Angle {} out of range (0-{})",
                angle, self.actuation_range
            )));
        }
        self.set_fraction(Some(angle / self.actuation_range))
    }

    /// Stops driving the servo.
    pub fn release(&self) -> Result<()> {
        self.set_fraction(None)
    }
}
