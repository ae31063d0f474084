//! Per-channel duty cycle access.

use crate::bus::I2cBus;
use crate::consts::{self, led};
use crate::error::{unsupported_channel_frequency, Error, Result};
use crate::pca9685::Pca9685;
use log::trace;

/// Encodes a 16-bit duty cycle as the `(on, off)` register words.
///
/// `0xFFFF` becomes the full-on marker. Anything else is reduced to the
/// chip's 12-bit counter with a +1 bias before the shift.
pub fn encode_duty_cycle(value: u16) -> (u16, u16) {
    if value == consts::DUTY_CYCLE_MAX {
        (led::FULL, 0)
    } else {
        (0, ((u32::from(value) + 1) >> 4) as u16)
    }
}

/// Decodes `(on, off)` register words into a 16-bit duty cycle.
///
/// Full-off (bit 12 of the OFF word, the power-on state) reads as 0 and takes
/// precedence over full-on, as on the chip.
pub fn decode_duty_cycle((on, off): (u16, u16)) -> u16 {
    if off & led::FULL != 0 {
        0
    } else if on & led::FULL != 0 {
        consts::DUTY_CYCLE_MAX
    } else {
        (off & led::COUNTER_MASK) << 4
    }
}

/// One of the 16 PWM outputs of a [`Pca9685`].
///
/// A cheap view: it holds no hardware state and borrows the controller.
pub struct Channel<'a, B> {
    pca: &'a Pca9685<B>,
    index: usize,
}

impl<B> Clone for Channel<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for Channel<'_, B> {}

impl<B> std::fmt::Debug for Channel<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel").field("index", &self.index).finish()
    }
}

impl<'a, B: I2cBus> Channel<'a, B> {
    pub(crate) fn new(pca: &'a Pca9685<B>, index: usize) -> Self {
        Self { pca, index }
    }

    /// Channel index (0-15).
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The controller this channel belongs to.
    pub fn controller(&self) -> &'a Pca9685<B> {
        self.pca
    }

    /// PWM frequency in Hz, shared with every other channel of the controller.
    pub fn frequency(&self) -> Result<f64> {
        self.pca.frequency()
    }

    /// Always fails: all channels share the controller's frequency.
    pub fn set_frequency(&self, _frequency_hz: f64) -> Result<()> {
        Err(unsupported_channel_frequency())
    }

    /// Current duty cycle scaled to 16 bits. `0` means the output is not driven.
    pub fn duty_cycle(&self) -> Result<u16> {
        let words = self.pca.pwm(self.index)?;
        let value = decode_duty_cycle(words);
        trace!("Channel {} duty cycle = 0x{:04X}", self.index, value);
        Ok(value)
    }

    /// Sets the duty cycle (`0..=0xFFFF`).
    pub fn set_duty_cycle(&self, value: u32) -> Result<()> {
        let value = u16::try_from(value).map_err(|_| {
            Error::ArgumentOutOfRange(format!(
                "Duty cycle {} out of range (0-65535)",
                value
            ))
        })?;
        let (on, off) = encode_duty_cycle(value);
        self.pca.set_pwm(self.index, on, off)
    }
}
