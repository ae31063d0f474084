use embedded_hal::i2c::ErrorKind;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when driving a PCA9685 and its servos.
///
/// Every error is handed back to the immediate caller unchanged; nothing in
/// this crate retries a failed bus transaction.
#[derive(Error, Debug)]
pub enum Error {
    /// The probed address answered neither an empty write nor a one byte read.
    #[error("No I2C device at address 0x{address:02X}")]
    DeviceNotFound {
        /// The 7-bit address that was probed.
        address: u8,
    },
    /// The underlying transport failed during a transaction.
    #[error("I2C transport error at address 0x{address:02X}: {kind}")]
    Bus {
        /// The 7-bit address being accessed.
        address: u8,
        /// Transport error classification reported by the bus.
        kind: ErrorKind,
    },
    /// The bus lock could not be acquired within the configured timeout.
    #[error("Timed out after {timeout:?} waiting for the I2C bus lock (device 0x{address:02X})")]
    LockTimeout {
        /// The device that was waiting for the bus.
        address: u8,
        /// The configured lock timeout.
        timeout: Duration,
    },
    /// The prescale register is unprogrammed, or a frequency cannot be
    /// represented at the configured reference clock.
    #[error("Calibration error: {0}")]
    Calibration(String),
    /// Function argument is outside the valid range.
    #[error("Argument out of range: {0}")]
    ArgumentOutOfRange(String),
    /// Channel or array register index outside `0..count`.
    #[error("Index {index} out of range (valid: 0..{count})")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of elements available.
        count: usize,
    },
    /// Operation is not supported by this chip.
    #[error("Operation not supported: {0}")]
    UnsupportedOperation(String),
    /// Requested register layout exceeds the per-access payload limit.
    #[error("Requested operation size is too large (max {max}, got {actual})")]
    OperationTooLarge {
        /// Maximum allowed payload in bytes.
        max: usize,
        /// Actual payload size requested.
        actual: usize,
    },
    /// The bus device node could not be opened.
    #[error("Failed to open I2C bus '{path}': {message}")]
    BusOpen {
        /// Path of the bus device node.
        path: String,
        /// Error reported by the operating system.
        message: String,
    },
}

/// Result type alias for PCA9685 operations.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn unsupported_channel_frequency() -> Error {
    Error::UnsupportedOperation(
        "frequency cannot be set on individual channels, set it on the controller".to_string(),
    )
}
