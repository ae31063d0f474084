//! PCA9685 16-channel PWM controller.

use crate::bus::I2cBus;
use crate::channel::Channel;
use crate::consts::{self, mode1};
use crate::device::I2cDevice;
use crate::error::{Error, Result};
use crate::register::{BoundRegisterArray, Register, RegisterArray};
use log::{debug, trace};
use std::cell::OnceCell;
use std::thread;
use std::time::Duration;

/// Connection settings for a [`Pca9685`].
#[derive(Debug, Clone, PartialEq)]
pub struct Pca9685Config {
    /// 7-bit I2C address (default 0x40).
    pub address: u8,
    /// Oscillator frequency in Hz (default 25 MHz internal oscillator).
    pub reference_clock_hz: u32,
    /// Probe the address before use.
    pub probe: bool,
    /// Upper bound on waiting for the bus lock, `None` waits forever.
    pub lock_timeout: Option<Duration>,
}

impl Default for Pca9685Config {
    fn default() -> Self {
        Self {
            address: consts::DEFAULT_ADDRESS,
            reference_clock_hz: consts::DEFAULT_REFERENCE_CLOCK_HZ,
            probe: true,
            lock_timeout: None,
        }
    }
}

impl Pca9685Config {
    /// Sets the 7-bit I2C address.
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Sets the oscillator frequency, e.g. for an external clock on EXTCLK.
    pub fn with_reference_clock_hz(mut self, reference_clock_hz: u32) -> Self {
        self.reference_clock_hz = reference_clock_hz;
        self
    }

    /// Enables or disables the presence check at construction.
    pub fn with_probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }

    /// Bounds the wait for the bus lock, including during construction.
    pub fn with_lock_timeout(mut self, lock_timeout: Option<Duration>) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

/// Computes the PRE_SCALE value giving the output frequency closest to `frequency_hz`.
///
/// Fails with [`Error::Calibration`] when the result does not fit the
/// register (`3..=255`).
pub fn prescale_for(reference_clock_hz: u32, frequency_hz: f64) -> Result<u8> {
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return Err(Error::ArgumentOutOfRange(format!(
            "PWM frequency must be a positive number of Hz (got {})",
            frequency_hz
        )));
    }
    let prescale = (f64::from(reference_clock_hz) / consts::PWM_STEPS / frequency_hz).round();
    if prescale < f64::from(consts::PRESCALE_MIN) {
        return Err(Error::Calibration(format!(
            "PCA9685 cannot output {} Hz with a {} Hz reference clock (prescale {} < {})",
            frequency_hz,
            reference_clock_hz,
            prescale,
            consts::PRESCALE_MIN
        )));
    }
    if prescale > f64::from(u8::MAX) {
        return Err(Error::Calibration(format!(
            "PCA9685 cannot output {} Hz with a {} Hz reference clock (prescale {} > 255)",
            frequency_hz, reference_clock_hz, prescale
        )));
    }
    Ok(prescale as u8)
}

/// Output frequency in Hz produced by `prescale`.
pub fn frequency_for(reference_clock_hz: u32, prescale: u8) -> Result<f64> {
    if prescale < consts::PRESCALE_MIN {
        return Err(Error::Calibration(format!(
            "The device PRE_SCALE register (0xFE) was not programmed or holds {} < {}",
            prescale,
            consts::PRESCALE_MIN
        )));
    }
    Ok(f64::from(reference_clock_hz) / consts::PWM_STEPS / f64::from(prescale))
}

/// A PCA9685 on a shared I2C bus.
///
/// The device is reset on construction. Channels are borrowed views created
/// with [`channel`](Self::channel).
///
/// **Note:** This handle is not thread-safe (`!Sync`).
#[derive(Debug)]
pub struct Pca9685<B> {
    device: I2cDevice<B>,
    reference_clock_hz: u32,
    pwm_regs: OnceCell<BoundRegisterArray<(u16, u16)>>,
}

impl<B: I2cBus> Pca9685<B> {
    const MODE1: Register<u8> = Register::new(consts::REG_MODE1);
    const MODE2: Register<u8> = Register::new(consts::REG_MODE2);
    const PRESCALE: Register<u8> = Register::new(consts::REG_PRESCALE);
    const PWM: RegisterArray<(u16, u16)> =
        RegisterArray::new(consts::REG_LED0_ON_L, consts::CHANNEL_COUNT);

    /// Opens the controller at the default address with the default clock.
    pub fn new(bus: B) -> Result<Self> {
        Self::with_config(bus, Pca9685Config::default())
    }

    /// Opens the controller described by `config` and resets it.
    pub fn with_config(bus: B, config: Pca9685Config) -> Result<Self> {
        if config.reference_clock_hz == 0 {
            return Err(Error::ArgumentOutOfRange(
                "reference clock must be non-zero".to_string(),
            ));
        }
        let device =
            I2cDevice::with_timeout(bus, config.address, config.probe, config.lock_timeout)?;
        debug!(
            "Opening PCA9685 at 0x{:02X} (reference clock {} Hz)",
            config.address, config.reference_clock_hz
        );
        let pca = Self {
            device,
            reference_clock_hz: config.reference_clock_hz,
            pwm_regs: OnceCell::new(),
        };
        pca.reset()?;
        Ok(pca)
    }

    /// Clears MODE1: restart, auto-increment and sleep bits all off.
    pub fn reset(&self) -> Result<()> {
        debug!("Resetting PCA9685 at 0x{:02X}", self.device.address());
        self.set_mode1(mode1::RESET)
    }

    /// Resets the device and gives the bus handle back.
    pub fn deinit(self) -> Result<B> {
        self.reset()?;
        Ok(self.device.into_bus())
    }

    /// The device handle used for all register traffic.
    pub fn device(&self) -> &I2cDevice<B> {
        &self.device
    }

    /// The configured oscillator frequency in Hz.
    pub fn reference_clock_hz(&self) -> u32 {
        self.reference_clock_hz
    }

    /// Raw MODE1 register value.
    pub fn mode1(&self) -> Result<u8> {
        Self::MODE1.get(&self.device)
    }

    /// Writes MODE1 as given.
    pub fn set_mode1(&self, value: u8) -> Result<()> {
        Self::MODE1.set(&self.device, value)
    }

    /// Raw MODE2 register value.
    pub fn mode2(&self) -> Result<u8> {
        Self::MODE2.get(&self.device)
    }

    /// Writes MODE2 as given.
    pub fn set_mode2(&self, value: u8) -> Result<()> {
        Self::MODE2.set(&self.device, value)
    }

    /// Raw PRE_SCALE register value.
    pub fn prescale(&self) -> Result<u8> {
        Self::PRESCALE.get(&self.device)
    }

    /// Current PWM output frequency in Hz, derived from PRE_SCALE.
    ///
    /// Fails with [`Error::Calibration`] if PRE_SCALE has never been
    /// programmed (reads below 3).
    pub fn frequency(&self) -> Result<f64> {
        let prescale = self.prescale()?;
        frequency_for(self.reference_clock_hz, prescale)
    }

    /// Programs the PWM output frequency shared by all channels.
    ///
    /// PRE_SCALE is only writable while the oscillator sleeps, so this saves
    /// MODE1, enters sleep, writes PRE_SCALE, restores MODE1, waits for the
    /// oscillator to settle, then sets restart and auto-increment.
    pub fn set_frequency(&self, frequency_hz: f64) -> Result<()> {
        let prescale = prescale_for(self.reference_clock_hz, frequency_hz)?;
        debug!(
            "Setting PWM frequency ~{} Hz: PRE_SCALE={}",
            frequency_hz, prescale
        );

        let old_mode = self.mode1()?;
        trace!("Saved MODE1=0x{:02X}", old_mode);
        self.set_mode1((old_mode & !mode1::RESTART) | mode1::SLEEP)?;
        Self::PRESCALE.set(&self.device, prescale)?;
        self.set_mode1(old_mode)?;
        thread::sleep(Duration::from_millis(consts::OSCILLATOR_SETTLE_MS));
        self.set_mode1(old_mode | mode1::RESTART | mode1::AUTO_INCREMENT)?;
        Ok(())
    }

    /// Number of PWM channels.
    pub fn channel_count(&self) -> usize {
        Self::PWM.len()
    }

    /// View onto channel `index` (0-15).
    pub fn channel(&self, index: usize) -> Result<Channel<'_, B>> {
        if index >= self.channel_count() {
            return Err(Error::IndexOutOfRange {
                index,
                count: self.channel_count(),
            });
        }
        Ok(Channel::new(self, index))
    }

    /// Views onto all channels in index order.
    pub fn channels(&self) -> impl Iterator<Item = Channel<'_, B>> + '_ {
        (0..self.channel_count()).map(move |index| Channel::new(self, index))
    }

    /// Raw `(on, off)` words of channel `index`.
    pub fn pwm(&self, index: usize) -> Result<(u16, u16)> {
        self.pwm_regs()?.get(&self.device, index)
    }

    /// Writes the raw `(on, off)` words of channel `index`.
    pub fn set_pwm(&self, index: usize, on: u16, off: u16) -> Result<()> {
        trace!("LED{} <- on=0x{:04X}, off=0x{:04X}", index, on, off);
        self.pwm_regs()?.set(&self.device, index, (on, off))
    }

    fn pwm_regs(&self) -> Result<&BoundRegisterArray<(u16, u16)>> {
        if let Some(regs) = self.pwm_regs.get() {
            return Ok(regs);
        }
        let regs = Self::PWM.bind()?;
        Ok(self.pwm_regs.get_or_init(|| regs))
    }
}
