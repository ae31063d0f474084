//! Register descriptors.
//!
//! A descriptor pairs a register address with a fixed binary layout and turns
//! typed get/set calls into bus transactions. Every access uses the same frame:
//! byte 0 holds the register address, the following bytes hold the
//! little-endian payload. A get writes the address byte and reads the payload
//! back into the same frame; a set writes the whole frame.

use crate::bus::I2cBus;
use crate::consts::MAX_REGISTER_PAYLOAD;
use crate::device::I2cDevice;
use crate::error::{Error, Result};
use log::trace;
use std::cell::RefCell;
use std::marker::PhantomData;

/// A value with a fixed little-endian register layout.
pub trait RegisterValue: Copy {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Writes the value into the first `SIZE` bytes of `buf`.
    fn encode(&self, buf: &mut [u8]);

    /// Reads a value from the first `SIZE` bytes of `buf`.
    fn decode(buf: &[u8]) -> Self;
}

macro_rules! impl_le_register_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl RegisterValue for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn encode(&self, buf: &mut [u8]) {
                    buf[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
                }

                fn decode(buf: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&buf[..Self::SIZE]);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_le_register_value!(u8, i8, u16, i16, u32, i32);

impl<A: RegisterValue, B: RegisterValue> RegisterValue for (A, B) {
    const SIZE: usize = A::SIZE + B::SIZE;

    fn encode(&self, buf: &mut [u8]) {
        self.0.encode(&mut buf[..A::SIZE]);
        self.1.encode(&mut buf[A::SIZE..]);
    }

    fn decode(buf: &[u8]) -> Self {
        (A::decode(&buf[..A::SIZE]), B::decode(&buf[A::SIZE..]))
    }
}

impl<A: RegisterValue, B: RegisterValue, C: RegisterValue> RegisterValue for (A, B, C) {
    const SIZE: usize = A::SIZE + B::SIZE + C::SIZE;

    fn encode(&self, buf: &mut [u8]) {
        let (first, rest) = buf.split_at_mut(A::SIZE);
        self.0.encode(first);
        self.1.encode(&mut rest[..B::SIZE]);
        self.2.encode(&mut rest[B::SIZE..]);
    }

    fn decode(buf: &[u8]) -> Self {
        let (first, rest) = buf.split_at(A::SIZE);
        (
            A::decode(first),
            B::decode(&rest[..B::SIZE]),
            C::decode(&rest[B::SIZE..]),
        )
    }
}

impl<T: RegisterValue, const N: usize> RegisterValue for [T; N] {
    const SIZE: usize = T::SIZE * N;

    fn encode(&self, buf: &mut [u8]) {
        for (value, chunk) in self.iter().zip(buf.chunks_mut(T::SIZE)) {
            value.encode(chunk);
        }
    }

    fn decode(buf: &[u8]) -> Self {
        std::array::from_fn(|i| T::decode(&buf[i * T::SIZE..]))
    }
}

fn check_payload(size: usize) -> Result<()> {
    if size > MAX_REGISTER_PAYLOAD {
        return Err(Error::OperationTooLarge {
            max: MAX_REGISTER_PAYLOAD,
            actual: size,
        });
    }
    Ok(())
}

// frame[0] must already hold the register address.
fn read_frame<T: RegisterValue, B: I2cBus>(device: &I2cDevice<B>, frame: &mut [u8]) -> Result<T> {
    let (address, payload) = frame.split_at_mut(1);
    device.write_read(address, payload)?;
    Ok(T::decode(payload))
}

fn write_frame<T: RegisterValue, B: I2cBus>(
    device: &I2cDevice<B>,
    frame: &mut [u8],
    value: T,
) -> Result<()> {
    value.encode(&mut frame[1..]);
    device.write(frame)
}

/// A register holding one value: a scalar (`u8`, `u16`, ...) or a fixed
/// record such as `(u16, u16)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register<T> {
    address: u8,
    _value: PhantomData<T>,
}

impl<T: RegisterValue> Register<T> {
    /// Describes the register at `address`.
    pub const fn new(address: u8) -> Self {
        Self {
            address,
            _value: PhantomData,
        }
    }

    /// The register address.
    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Reads and decodes the register.
    pub fn get<B: I2cBus>(&self, device: &I2cDevice<B>) -> Result<T> {
        check_payload(T::SIZE)?;
        let mut storage = [0u8; 1 + MAX_REGISTER_PAYLOAD];
        let frame = &mut storage[..=T::SIZE];
        frame[0] = self.address;
        let value = read_frame(device, frame)?;
        trace!("Read reg 0x{:02X}: {:02X?}", self.address, &frame[1..]);
        Ok(value)
    }

    /// Encodes and writes the register.
    pub fn set<B: I2cBus>(&self, device: &I2cDevice<B>, value: T) -> Result<()> {
        check_payload(T::SIZE)?;
        let mut storage = [0u8; 1 + MAX_REGISTER_PAYLOAD];
        let frame = &mut storage[..=T::SIZE];
        frame[0] = self.address;
        write_frame(device, frame, value)
    }
}

/// `count` consecutive registers of identical layout starting at `base`.
///
/// Element `i` lives at `base + i * T::SIZE`. Use [`bind`](Self::bind) to get
/// an accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterArray<T> {
    base: u8,
    count: usize,
    _value: PhantomData<T>,
}

impl<T: RegisterValue> RegisterArray<T> {
    /// Describes `count` elements starting at `base`.
    pub const fn new(base: u8, count: usize) -> Self {
        Self {
            base,
            count,
            _value: PhantomData,
        }
    }

    /// Address of the first element.
    pub const fn base(&self) -> u8 {
        self.base
    }

    /// Number of elements.
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Whether the array has no elements.
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Register address of element `index`.
    pub fn element_address(&self, index: usize) -> Result<u8> {
        if index >= self.count {
            return Err(Error::IndexOutOfRange {
                index,
                count: self.count,
            });
        }
        let address = usize::from(self.base) + index * T::SIZE;
        u8::try_from(address).map_err(|_| {
            Error::ArgumentOutOfRange(format!(
                "element {} of array at 0x{:02X} lies beyond register 0xFF",
                index, self.base
            ))
        })
    }

    /// Creates an accessor owning a reusable transfer buffer.
    pub fn bind(&self) -> Result<BoundRegisterArray<T>> {
        check_payload(T::SIZE)?;
        Ok(BoundRegisterArray {
            array: *self,
            buffer: RefCell::new(vec![0u8; 1 + T::SIZE]),
        })
    }
}

/// Accessor for a [`RegisterArray`] that reuses one transfer buffer for every
/// access.
///
/// Not `Sync`: the buffer is shared between calls on the same thread.
#[derive(Debug)]
pub struct BoundRegisterArray<T> {
    array: RegisterArray<T>,
    buffer: RefCell<Vec<u8>>,
}

impl<T: RegisterValue> BoundRegisterArray<T> {
    /// The descriptor this accessor was bound from.
    pub fn descriptor(&self) -> &RegisterArray<T> {
        &self.array
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.array.len()
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Reads and decodes element `index`.
    pub fn get<B: I2cBus>(&self, device: &I2cDevice<B>, index: usize) -> Result<T> {
        let address = self.array.element_address(index)?;
        let mut buffer = self.buffer.borrow_mut();
        buffer[0] = address;
        let value = read_frame(device, buffer.as_mut_slice())?;
        trace!("Read reg 0x{:02X}[{}]: {:02X?}", self.array.base, index, &buffer[1..]);
        Ok(value)
    }

    /// Encodes and writes element `index`.
    pub fn set<B: I2cBus>(&self, device: &I2cDevice<B>, index: usize, value: T) -> Result<()> {
        let address = self.array.element_address(index)?;
        let mut buffer = self.buffer.borrow_mut();
        buffer[0] = address;
        write_frame(device, buffer.as_mut_slice(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_layout_is_little_endian() {
        let mut buf = [0u8; 4];
        0x1234u16.encode(&mut buf);
        assert_eq!(buf[..2], [0x34, 0x12]);
        assert_eq!(u16::decode(&[0xCD, 0xAB]), 0xABCD);
        assert_eq!(i16::decode(&[0xFF, 0xFF]), -1);
        assert_eq!(<u8 as RegisterValue>::SIZE, 1);
        assert_eq!(<u32 as RegisterValue>::SIZE, 4);
    }

    #[test]
    fn test_tuple_fields_are_packed_back_to_back() {
        let mut buf = [0u8; 4];
        (0x1000u16, 0x0123u16).encode(&mut buf);
        assert_eq!(buf, [0x00, 0x10, 0x23, 0x01]);
        assert_eq!(<(u16, u16)>::decode(&buf), (0x1000, 0x0123));
        assert_eq!(<(u8, u16, u8) as RegisterValue>::SIZE, 4);

        let mut buf = [0u8; 4];
        (0xAAu8, 0xBBCCu16, 0xDDu8).encode(&mut buf);
        assert_eq!(buf, [0xAA, 0xCC, 0xBB, 0xDD]);
        assert_eq!(<(u8, u16, u8)>::decode(&buf), (0xAA, 0xBBCC, 0xDD));
    }

    #[test]
    fn test_array_value_layout() {
        let mut buf = [0u8; 6];
        [1u16, 2, 3].encode(&mut buf);
        assert_eq!(buf, [1, 0, 2, 0, 3, 0]);
        assert_eq!(<[u16; 3]>::decode(&buf), [1, 2, 3]);
    }

    #[test]
    fn test_element_addresses() {
        let pwm: RegisterArray<(u16, u16)> = RegisterArray::new(0x06, 16);
        assert_eq!(pwm.element_address(0).unwrap(), 0x06);
        assert_eq!(pwm.element_address(1).unwrap(), 0x0A);
        assert_eq!(pwm.element_address(15).unwrap(), 0x42);
        assert!(matches!(
            pwm.element_address(16),
            Err(Error::IndexOutOfRange { index: 16, count: 16 })
        ));
    }

    #[test]
    fn test_element_address_past_register_space() {
        let array: RegisterArray<u32> = RegisterArray::new(0xF0, 8);
        assert_eq!(array.element_address(3).unwrap(), 0xFC);
        assert!(matches!(
            array.element_address(4),
            Err(Error::ArgumentOutOfRange(_))
        ));
    }

    #[test]
    fn test_oversized_layout_is_rejected() {
        let array: RegisterArray<[u32; 9]> = RegisterArray::new(0x00, 2);
        assert!(matches!(
            array.bind(),
            Err(Error::OperationTooLarge { max: 32, actual: 36 })
        ));
        let bound = RegisterArray::<[u32; 8]>::new(0x00, 2).bind().unwrap();
        assert_eq!(bound.len(), 2);
    }
}
