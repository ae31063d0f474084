//! Internal constants, register addresses, and bit definitions.

/// Default 7-bit I2C address of a PCA9685 with all address pins low.
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// Frequency of the PCA9685 internal oscillator in Hz.
pub const DEFAULT_REFERENCE_CLOCK_HZ: u32 = 25_000_000;

/// Number of PWM output channels on the chip.
pub const CHANNEL_COUNT: usize = 16;

/// Largest payload moved in a single register access.
pub const MAX_REGISTER_PAYLOAD: usize = 32;

// --- Register Addresses ---
pub const REG_MODE1: u8 = 0x00;
pub const REG_MODE2: u8 = 0x01;
pub const REG_LED0_ON_L: u8 = 0x06; // LEDn_ON_L = 0x06 + 4n
pub const REG_PRESCALE: u8 = 0xFE;

// MODE1 Register Bits
pub mod mode1 {
    /// Restart PWM channels after waking from sleep.
    pub const RESTART: u8 = 1 << 7;
    /// Register pointer advances after each byte.
    pub const AUTO_INCREMENT: u8 = 1 << 5;
    /// Low power mode, oscillator off. PRE_SCALE is only writable while set.
    pub const SLEEP: u8 = 1 << 4;
    /// Value written on reset: everything cleared, oscillator running.
    pub const RESET: u8 = 0x00;
}

// LEDn_ON / LEDn_OFF words
pub mod led {
    /// Bit 12 of either word: full on (ON word) or full off (OFF word).
    pub const FULL: u16 = 0x1000;
    /// Counter resolution of the OFF/ON words (12 bits).
    pub const COUNTER_MASK: u16 = 0x0FFF;
}

// PWM Frequency Calculation
// Datasheet 7.3.5: prescale = round(osc_clock / (4096 * update_rate))
pub const PWM_STEPS: f64 = 4096.0;
/// Hardware floor of the PRE_SCALE register.
pub const PRESCALE_MIN: u8 = 3;
/// Oscillator stabilisation time after leaving sleep mode.
pub const OSCILLATOR_SETTLE_MS: u64 = 5;

// Servo defaults
/// PWM frequency expected by hobby servos.
pub const SERVO_FREQUENCY_HZ: f64 = 50.0;
pub const SERVO_ACTUATION_RANGE_DEG: f64 = 180.0;
pub const SERVO_MIN_PULSE_US: u32 = 750;
pub const SERVO_MAX_PULSE_US: u32 = 2250;

/// Full-scale value of the 16-bit duty cycle presented to callers.
pub const DUTY_CYCLE_MAX: u16 = 0xFFFF;
