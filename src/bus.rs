//! Shared I2C bus handle.
//!
//! Devices on one physical bus must not interleave their transactions. The
//! [`I2cBus`] trait is the transport boundary this crate consumes: raw
//! write/read primitives plus a cooperative `try_lock`/`unlock` pair.
//! [`SharedBus`] provides it on top of any `embedded-hal` I2C implementation.

use embedded_hal::i2c::{ErrorType, I2c};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Transport boundary for a physical I2C bus shared by several devices.
///
/// All methods take `&self` so that many device handles can hold the same
/// bus. Callers are expected to bracket every transaction with
/// [`try_lock`](Self::try_lock) / [`unlock`](Self::unlock); see
/// [`I2cDevice`](crate::I2cDevice) which enforces this.
pub trait I2cBus: ErrorType {
    /// Attempts to take the bus lock without blocking.
    fn try_lock(&self) -> bool;

    /// Releases the bus lock.
    fn unlock(&self);

    /// Writes `bytes` to the device at `address`. An empty slice addresses the
    /// device without transferring data.
    fn write(&self, address: u8, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Fills `buffer` with bytes read from the device at `address`.
    fn read(&self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Writes `bytes` then reads into `buffer` with a repeated start.
    fn write_read(&self, address: u8, bytes: &[u8], buffer: &mut [u8])
        -> Result<(), Self::Error>;
}

struct Inner<I> {
    i2c: Mutex<I>,
    locked: AtomicBool,
}

/// Cloneable handle to one physical I2C bus.
///
/// Wraps any `embedded_hal::i2c::I2c` (for instance
/// `linux_embedded_hal::I2cdev`). Clones share the transport and the lock.
pub struct SharedBus<I> {
    inner: Arc<Inner<I>>,
}

impl<I> Clone for SharedBus<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I> std::fmt::Debug for SharedBus<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedBus")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

impl<I> SharedBus<I> {
    /// Takes ownership of a bus transport.
    pub fn new(i2c: I) -> Self {
        Self {
            inner: Arc::new(Inner {
                i2c: Mutex::new(i2c),
                locked: AtomicBool::new(false),
            }),
        }
    }

    /// Returns whether some holder currently owns the bus lock.
    pub fn is_locked(&self) -> bool {
        self.inner.locked.load(Ordering::Acquire)
    }
}

impl<I: I2c> ErrorType for SharedBus<I> {
    type Error = I::Error;
}

impl<I: I2c> I2cBus for SharedBus<I> {
    fn try_lock(&self) -> bool {
        self.inner
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn unlock(&self) {
        self.inner.locked.store(false, Ordering::Release);
    }

    fn write(&self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.inner.i2c.lock().write(address, bytes)
    }

    fn read(&self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.inner.i2c.lock().read(address, buffer)
    }

    fn write_read(
        &self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.inner.i2c.lock().write_read(address, bytes, buffer)
    }
}
