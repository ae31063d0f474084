//! Device handle enforcing the bus locking discipline.
//!
//! An [`I2cDevice`] binds a shared bus to one 7-bit address. Every transaction
//! runs while holding the bus lock, and [`BusGuard`] releases that lock when it
//! goes out of scope, whichever way the protected block exits.

use crate::bus::I2cBus;
use crate::error::{Error, Result};
use embedded_hal::i2c::Error as _;
use log::{debug, trace, warn};
use std::thread;
use std::time::{Duration, Instant};

/// Highest valid 7-bit address.
const MAX_7BIT_ADDRESS: u8 = 0x7F;

/// A device at a fixed 7-bit address on a shared [`I2cBus`].
#[derive(Debug)]
pub struct I2cDevice<B> {
    bus: B,
    address: u8,
    lock_timeout: Option<Duration>,
}

impl<B: I2cBus> I2cDevice<B> {
    /// Binds `bus` to `address`, optionally probing that something answers there.
    ///
    /// Returns [`Error::DeviceNotFound`] if `probe` is set and the address
    /// answers neither an empty write nor a one byte read.
    pub fn new(bus: B, address: u8, probe: bool) -> Result<Self> {
        Self::with_timeout(bus, address, probe, None)
    }

    /// Like [`new`](Self::new), with the lock timeout already in force for
    /// the probe.
    pub fn with_timeout(
        bus: B,
        address: u8,
        probe: bool,
        lock_timeout: Option<Duration>,
    ) -> Result<Self> {
        if address > MAX_7BIT_ADDRESS {
            return Err(Error::ArgumentOutOfRange(format!(
                "7-bit I2C address must be 0-127 (got 0x{:02X})",
                address
            )));
        }
        let device = Self {
            bus,
            address,
            lock_timeout,
        };
        if probe {
            device.probe()?;
        }
        Ok(device)
    }

    /// Bounds how long [`lock`](Self::lock) busy-waits. `None` waits forever.
    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// The 7-bit device address.
    #[inline]
    pub fn address(&self) -> u8 {
        self.address
    }

    /// The configured lock timeout, if any.
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout
    }

    /// The underlying bus handle.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Gives the bus handle back.
    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Acquires the bus lock, retrying until it is granted.
    ///
    /// Yields the thread between attempts. Without a lock timeout this can
    /// stall forever if another holder never releases the bus.
    pub fn lock(&self) -> Result<BusGuard<'_, B>> {
        let started = Instant::now();
        let mut retries: u64 = 0;
        while !self.bus.try_lock() {
            if let Some(timeout) = self.lock_timeout {
                if started.elapsed() >= timeout {
                    warn!(
                        "Gave up waiting for the bus lock for 0x{:02X} after {} retries",
                        self.address, retries
                    );
                    return Err(Error::LockTimeout {
                        address: self.address,
                        timeout,
                    });
                }
            }
            retries += 1;
            thread::yield_now();
        }
        if retries > 0 {
            trace!(
                "Bus lock for 0x{:02X} acquired after {} retries",
                self.address,
                retries
            );
        }
        Ok(BusGuard { device: self })
    }

    /// Checks that a device answers at this address.
    pub fn probe(&self) -> Result<()> {
        self.lock()?.probe()
    }

    /// Locks the bus and performs a write, a read, or a write-then-read.
    pub fn transact(&self, write: Option<&[u8]>, read: Option<&mut [u8]>) -> Result<()> {
        self.lock()?.transact(write, read)
    }

    /// Locks the bus and writes `bytes`.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        self.transact(Some(bytes), None)
    }

    /// Locks the bus and fills `buffer`.
    pub fn read(&self, buffer: &mut [u8]) -> Result<()> {
        self.transact(None, Some(buffer))
    }

    /// Locks the bus, writes `bytes`, then fills `buffer` without releasing the bus in between.
    pub fn write_read(&self, bytes: &[u8], buffer: &mut [u8]) -> Result<()> {
        self.transact(Some(bytes), Some(buffer))
    }
}

/// Proof of holding the bus lock for one [`I2cDevice`].
///
/// Sequences of operations issued through the same guard are never
/// interleaved with other users of the bus. Dropping the guard unlocks.
pub struct BusGuard<'a, B: I2cBus> {
    device: &'a I2cDevice<B>,
}

impl<B: I2cBus> BusGuard<'_, B> {
    fn probe(&self) -> Result<()> {
        let bus = &self.device.bus;
        let address = self.device.address;
        if let Err(write_err) = bus.write(address, &[]) {
            trace!(
                "Empty write to 0x{:02X} failed ({}), trying a one byte read",
                address,
                write_err.kind()
            );
            let mut scratch = [0u8; 1];
            if let Err(read_err) = bus.read(address, &mut scratch) {
                debug!(
                    "No answer from 0x{:02X}: read failed ({})",
                    address,
                    read_err.kind()
                );
                return Err(Error::DeviceNotFound { address });
            }
        }
        debug!("Found I2C device at 0x{:02X}", address);
        Ok(())
    }

    /// Performs a write, a read, or a write-then-read while the lock is held.
    ///
    /// Transport failures are reported as [`Error::Bus`] and are not retried.
    pub fn transact(&self, write: Option<&[u8]>, read: Option<&mut [u8]>) -> Result<()> {
        let bus = &self.device.bus;
        let address = self.device.address;
        let result = match (write, read) {
            (Some(bytes), Some(buffer)) => {
                trace!("I2C 0x{:02X}: write {:02X?}, read {} bytes", address, bytes, buffer.len());
                let result = bus.write_read(address, bytes, buffer);
                trace!("I2C 0x{:02X}: received {:02X?}", address, buffer);
                result
            }
            (Some(bytes), None) => {
                trace!("I2C 0x{:02X}: write {:02X?}", address, bytes);
                bus.write(address, bytes)
            }
            (None, Some(buffer)) => {
                let result = bus.read(address, buffer);
                trace!("I2C 0x{:02X}: received {:02X?}", address, buffer);
                result
            }
            (None, None) => return Ok(()),
        };
        result.map_err(|e| Error::Bus {
            address,
            kind: e.kind(),
        })
    }

    /// Writes `bytes` while the lock is held.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        self.transact(Some(bytes), None)
    }

    /// Fills `buffer` while the lock is held.
    pub fn read(&self, buffer: &mut [u8]) -> Result<()> {
        self.transact(None, Some(buffer))
    }

    /// Writes `bytes` then fills `buffer` while the lock is held.
    pub fn write_read(&self, bytes: &[u8], buffer: &mut [u8]) -> Result<()> {
        self.transact(Some(bytes), Some(buffer))
    }
}

impl<B: I2cBus> Drop for BusGuard<'_, B> {
    fn drop(&mut self) {
        self.device.bus.unlock();
    }
}

/// Probes every 7-bit address in `start..=end` and returns those that answered.
pub fn scan<B: I2cBus + Clone>(bus: &B, start: u8, end: u8) -> Result<Vec<u8>> {
    scan_with_progress(bus, start, end, |_, _, _, _| {})
}

/// Like [`scan`], calling `progress_callback(address, found, index, total)`
/// after each probe.
pub fn scan_with_progress<B, F>(
    bus: &B,
    start: u8,
    end: u8,
    mut progress_callback: F,
) -> Result<Vec<u8>>
where
    B: I2cBus + Clone,
    F: FnMut(u8, bool, usize, usize),
{
    if start > end || end > MAX_7BIT_ADDRESS {
        return Err(Error::ArgumentOutOfRange(format!(
            "scan range 0x{:02X}-0x{:02X} must be ascending 7-bit addresses",
            start, end
        )));
    }
    let total = usize::from(end - start) + 1;
    let mut found_devices = Vec::new();

    for (idx, address) in (start..=end).enumerate() {
        let found = match I2cDevice::new(bus.clone(), address, true) {
            Ok(_) => true,
            Err(Error::DeviceNotFound { .. }) => false,
            Err(e) => return Err(e),
        };
        if found {
            found_devices.push(address);
        }
        progress_callback(address, found, idx, total);
    }

    debug!("Scan 0x{:02X}-0x{:02X} found {:02X?}", start, end, found_devices);
    Ok(found_devices)
}
