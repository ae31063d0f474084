//! A group of servos sharing one PCA9685.

use crate::bus::I2cBus;
use crate::consts;
use crate::error::{Error, Result};
use crate::pca9685::{Pca9685, Pca9685Config};
use crate::servo::{DutyCalibration, Servo, ServoConfig};
use log::{debug, info};

/// Owns a [`Pca9685`] running at the servo frequency (50 Hz) and one
/// calibrated servo per configured channel.
///
/// Servos are addressed by their position in [`servo_ids`](Self::servo_ids).
#[derive(Debug)]
pub struct ServoSet<B> {
    pca: Pca9685<B>,
    servo_ids: Vec<usize>,
    actuation_range: f64,
    calibration: DutyCalibration,
}

impl<B: I2cBus> ServoSet<B> {
    /// Servos on the listed channels, default controller and servo settings.
    pub fn new(bus: B, servo_ids: Vec<usize>) -> Result<Self> {
        Self::with_config(bus, servo_ids, Pca9685Config::default(), ServoConfig::default())
    }

    /// Servos on channels `0..num_servos`.
    pub fn with_count(bus: B, num_servos: usize) -> Result<Self> {
        Self::new(bus, (0..num_servos).collect())
    }

    /// Servos on the listed channels with explicit settings.
    ///
    /// The id list is checked before the bus is touched.
    pub fn with_config(
        bus: B,
        servo_ids: Vec<usize>,
        pca_config: Pca9685Config,
        servo_config: ServoConfig,
    ) -> Result<Self> {
        check_servo_ids(&servo_ids)?;

        info!("Initializing connection to PCA9685");
        let pca = Pca9685::with_config(bus, pca_config)?;
        pca.set_frequency(consts::SERVO_FREQUENCY_HZ)?;

        let calibration = servo_config.calibrate(pca.frequency()?)?;
        debug!(
            "Servo set on channels {:?}: min_duty={}, duty_range={}",
            servo_ids,
            calibration.min_duty(),
            calibration.duty_range()
        );
        Ok(Self {
            pca,
            servo_ids,
            actuation_range: servo_config.actuation_range,
            calibration,
        })
    }

    /// The controller driving the servos.
    pub fn pca(&self) -> &Pca9685<B> {
        &self.pca
    }

    /// Channel index of every servo, in position order.
    pub fn servo_ids(&self) -> &[usize] {
        &self.servo_ids
    }

    /// Number of servos in the set.
    pub fn len(&self) -> usize {
        self.servo_ids.len()
    }

    /// Whether the set has no servos.
    pub fn is_empty(&self) -> bool {
        self.servo_ids.is_empty()
    }

    /// The servo at `position`.
    pub fn servo(&self, position: usize) -> Result<Servo<'_, B>> {
        let &id = self
            .servo_ids
            .get(position)
            .ok_or(Error::IndexOutOfRange {
                index: position,
                count: self.servo_ids.len(),
            })?;
        Servo::from_calibration(self.pca.channel(id)?, self.actuation_range, self.calibration)
    }

    /// Moves the servo at `position` to `angle` degrees.
    pub fn set_angle(&self, position: usize, angle: f64) -> Result<()> {
        self.servo(position)?.set_angle(Some(angle))
    }

    /// Stops driving every servo in the set.
    pub fn release_all(&self) -> Result<()> {
        for position in 0..self.servo_ids.len() {
            self.servo(position)?.release()?;
        }
        Ok(())
    }

    /// Resets the controller and gives the bus handle back.
    pub fn deinit(self) -> Result<B> {
        self.pca.deinit()
    }
}

fn check_servo_ids(servo_ids: &[usize]) -> Result<()> {
    for (position, &id) in servo_ids.iter().enumerate() {
        if id >= consts::CHANNEL_COUNT {
            return Err(Error::IndexOutOfRange {
                index: id,
                count: consts::CHANNEL_COUNT,
            });
        }
        if servo_ids[..position].contains(&id) {
            return Err(Error::ArgumentOutOfRange(format!(
                "servo channel {} listed more than once",
                id
            )));
        }
    }
    Ok(())
}
