// tests/common/mod.rs
//! In-memory PCA9685 used as the transport behind `SharedBus` in tests.
#![allow(dead_code)]

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use parking_lot::{Mutex, MutexGuard};
use pca9685_servo::SharedBus;
use std::sync::Arc;

pub const MODE1: u8 = 0x00;
pub const MODE2: u8 = 0x01;
pub const LED0_ON_L: u8 = 0x06;
pub const PRESCALE: u8 = 0xFE;

const MODE1_SLEEP: u8 = 0x10;

pub struct State {
    pub address: u8,
    pub registers: [u8; 256],
    pointer: u8,
    /// Error returned by the next transaction, consumed when used.
    pub fail_next: Option<ErrorKind>,
    /// Answer empty (quick) writes with NACK, like chips that only ack reads.
    pub nack_empty_writes: bool,
    /// Every non-empty write addressed to the chip, in order.
    pub writes: Vec<Vec<u8>>,
}

/// Register-file model of a PCA9685.
///
/// Writes set the register pointer from the first byte and auto-increment.
/// PRE_SCALE writes are ignored unless MODE1 has the sleep bit set, as on
/// the chip.
#[derive(Clone)]
pub struct FakePca9685 {
    state: Arc<Mutex<State>>,
}

impl FakePca9685 {
    /// Chip in its power-on state: asleep, PRE_SCALE 0x1E, all outputs full off.
    pub fn new(address: u8) -> Self {
        let mut registers = [0u8; 256];
        registers[usize::from(MODE1)] = 0x11;
        registers[usize::from(MODE2)] = 0x04;
        registers[usize::from(PRESCALE)] = 0x1E;
        for channel in 0..16 {
            registers[led_base(channel) + 3] = 0x10;
        }
        Self {
            state: Arc::new(Mutex::new(State {
                address,
                registers,
                pointer: 0,
                fail_next: None,
                nack_empty_writes: false,
                writes: Vec::new(),
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock()
    }

    pub fn register(&self, address: u8) -> u8 {
        self.state().registers[usize::from(address)]
    }

    pub fn set_register(&self, address: u8, value: u8) {
        self.state().registers[usize::from(address)] = value;
    }

    /// `(on, off)` words of `channel`.
    pub fn pwm(&self, channel: usize) -> (u16, u16) {
        let state = self.state();
        let base = led_base(channel);
        let word = |at: usize| u16::from_le_bytes([state.registers[at], state.registers[at + 1]]);
        (word(base), word(base + 2))
    }

    pub fn set_pwm(&self, channel: usize, on: u16, off: u16) {
        let mut state = self.state();
        let base = led_base(channel);
        state.registers[base..base + 2].copy_from_slice(&on.to_le_bytes());
        state.registers[base + 2..base + 4].copy_from_slice(&off.to_le_bytes());
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    /// Values written to MODE1, in order.
    pub fn mode1_writes(&self) -> Vec<u8> {
        self.writes()
            .iter()
            .filter(|w| w.len() == 2 && w[0] == MODE1)
            .map(|w| w[1])
            .collect()
    }

    pub fn fail_next(&self, kind: ErrorKind) {
        self.state().fail_next = Some(kind);
    }
}

fn led_base(channel: usize) -> usize {
    usize::from(LED0_ON_L) + 4 * channel
}

impl ErrorType for FakePca9685 {
    type Error = ErrorKind;
}

impl I2c for FakePca9685 {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.lock();
        if address != state.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        if let Some(kind) = state.fail_next.take() {
            return Err(kind);
        }
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    let Some((&pointer, payload)) = bytes.split_first() else {
                        if state.nack_empty_writes {
                            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
                        }
                        continue;
                    };
                    state.writes.push(bytes.to_vec());
                    state.pointer = pointer;
                    for &byte in payload {
                        let at = state.pointer;
                        let asleep = state.registers[usize::from(MODE1)] & MODE1_SLEEP != 0;
                        if at != PRESCALE || asleep {
                            state.registers[usize::from(at)] = byte;
                        }
                        state.pointer = at.wrapping_add(1);
                    }
                }
                Operation::Read(buffer) => {
                    for byte in buffer.iter_mut() {
                        *byte = state.registers[usize::from(state.pointer)];
                        state.pointer = state.pointer.wrapping_add(1);
                    }
                }
            }
        }
        Ok(())
    }
}

/// A shared bus with one fake PCA9685 at `address`, plus a handle to inspect it.
pub fn fake_bus(address: u8) -> (SharedBus<FakePca9685>, FakePca9685) {
    let fake = FakePca9685::new(address);
    (SharedBus::new(fake.clone()), fake)
}
