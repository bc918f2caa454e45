//! Little endian primitives shared by the matrix wire formats.

use crate::relay::RelayId;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
};
use thiserror::Error;

const ADDRESS_NONE: u8 = 0;
const ADDRESS_IPV4: u8 = 1;
const ADDRESS_IPV6: u8 = 2;

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("unexpected end of buffer: {needed} bytes needed, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },
    #[error("unsupported matrix version {version}")]
    UnsupportedVersion { version: u32 },
    #[error("{field} {value} is outside of [{min}, {max}]")]
    ValueOutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("string of {length} bytes exceeds the maximum of {max} bytes")]
    StringTooLong { length: usize, max: usize },
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("{field} holds {actual} values, expected {expected}")]
    InconsistentLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("unknown address kind {kind}")]
    InvalidAddressKind { kind: u8 },
    #[error("invalid address `{address}'")]
    InvalidAddress { address: String },
    #[error("relay {id} appears more than once")]
    DuplicateRelay { id: RelayId },
    #[error("{count} relays do not fit the compact format")]
    TooManyRelays { count: usize },
    #[error("{remaining} bytes left after the end of the matrix")]
    TrailingBytes { remaining: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Append only writer of the matrix primitives
pub(crate) struct MatrixWriter {
    buffer: BytesMut,
}

impl MatrixWriter {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    pub(crate) fn put_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    pub(crate) fn put_u16(&mut self, value: u16) {
        self.buffer.put_u16_le(value);
    }

    pub(crate) fn put_u32(&mut self, value: u32) {
        self.buffer.put_u32_le(value);
    }

    pub(crate) fn put_u64(&mut self, value: u64) {
        self.buffer.put_u64_le(value);
    }

    pub(crate) fn put_i32(&mut self, value: i32) {
        self.buffer.put_i32_le(value);
    }

    pub(crate) fn put_f32(&mut self, value: f32) {
        self.buffer.put_f32_le(value);
    }

    pub(crate) fn put_bool(&mut self, value: bool) {
        self.buffer.put_u8(u8::from(value));
    }

    pub(crate) fn put_bytes(&mut self, bytes: &[u8]) {
        self.buffer.put_slice(bytes);
    }

    /// Writes `value` after checking it is within `[min, max]`.
    pub(crate) fn put_ranged_i32(
        &mut self,
        field: &'static str,
        value: i32,
        min: i32,
        max: i32,
    ) -> Result<(), MatrixError> {
        check_range(field, value, min, max)?;
        self.put_i32(value);
        Ok(())
    }

    /// Writes a `u32` length then the bytes of `value`.
    pub(crate) fn put_string(&mut self, value: &str, max: usize) -> Result<(), MatrixError> {
        if value.len() > max {
            return Err(MatrixError::StringTooLong {
                length: value.len(),
                max,
            });
        }
        self.put_u32(value.len() as u32);
        self.put_bytes(value.as_bytes());
        Ok(())
    }

    pub(crate) fn put_count(&mut self, field: &'static str, count: usize) -> Result<(), MatrixError> {
        let count = u32::try_from(count).map_err(|_| MatrixError::ValueOutOfRange {
            field,
            value: count as i64,
            min: 0,
            max: u32::MAX as i64,
        })?;
        self.put_u32(count);
        Ok(())
    }

    /// Writes a kind tag, the octets and the port.
    ///
    /// `0.0.0.0:0` is written as the empty address.
    pub(crate) fn put_address(&mut self, address: &SocketAddr) {
        match address {
            SocketAddr::V4(v4) if v4.ip().is_unspecified() && v4.port() == 0 => {
                self.put_u8(ADDRESS_NONE);
            }
            SocketAddr::V4(v4) => {
                self.put_u8(ADDRESS_IPV4);
                self.put_bytes(&v4.ip().octets());
                self.put_u16(v4.port());
            }
            SocketAddr::V6(v6) => {
                self.put_u8(ADDRESS_IPV6);
                self.put_bytes(&v6.ip().octets());
                self.put_u16(v6.port());
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn finish(self) -> Bytes {
        self.buffer.freeze()
    }
}

/// Bounds checked reader of the matrix primitives
pub(crate) struct MatrixReader<'a> {
    buffer: &'a [u8],
}

impl<'a> MatrixReader<'a> {
    pub(crate) fn new(buffer: &'a [u8]) -> Self {
        Self { buffer }
    }

    fn need(&self, needed: usize) -> Result<(), MatrixError> {
        let remaining = self.buffer.remaining();
        if remaining < needed {
            return Err(MatrixError::Truncated { needed, remaining });
        }
        Ok(())
    }

    pub(crate) fn get_u8(&mut self) -> Result<u8, MatrixError> {
        self.need(1)?;
        Ok(self.buffer.get_u8())
    }

    pub(crate) fn get_u16(&mut self) -> Result<u16, MatrixError> {
        self.need(2)?;
        Ok(self.buffer.get_u16_le())
    }

    pub(crate) fn get_u32(&mut self) -> Result<u32, MatrixError> {
        self.need(4)?;
        Ok(self.buffer.get_u32_le())
    }

    pub(crate) fn get_u64(&mut self) -> Result<u64, MatrixError> {
        self.need(8)?;
        Ok(self.buffer.get_u64_le())
    }

    pub(crate) fn get_i32(&mut self) -> Result<i32, MatrixError> {
        self.need(4)?;
        Ok(self.buffer.get_i32_le())
    }

    pub(crate) fn get_f32(&mut self) -> Result<f32, MatrixError> {
        self.need(4)?;
        Ok(self.buffer.get_f32_le())
    }

    pub(crate) fn get_bool(&mut self) -> Result<bool, MatrixError> {
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(MatrixError::ValueOutOfRange {
                field: "boolean",
                value: value as i64,
                min: 0,
                max: 1,
            }),
        }
    }

    pub(crate) fn get_bytes(&mut self, length: usize) -> Result<&'a [u8], MatrixError> {
        self.need(length)?;
        let (bytes, rest) = self.buffer.split_at(length);
        self.buffer = rest;
        Ok(bytes)
    }

    pub(crate) fn get_ranged_i32(
        &mut self,
        field: &'static str,
        min: i32,
        max: i32,
    ) -> Result<i32, MatrixError> {
        let value = self.get_i32()?;
        check_range(field, value, min, max)?;
        Ok(value)
    }

    pub(crate) fn get_string(&mut self, max: usize) -> Result<String, MatrixError> {
        let length = self.get_u32()? as usize;
        if length > max {
            return Err(MatrixError::StringTooLong { length, max });
        }
        let bytes = self.get_bytes(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| MatrixError::InvalidUtf8)
    }

    /// Reads a `u32` count, refusing counts that could not possibly fit
    /// in the rest of the buffer given `min_item_size` bytes per item.
    pub(crate) fn get_count(&mut self, min_item_size: usize) -> Result<usize, MatrixError> {
        let count = self.get_u32()? as usize;
        self.need(count.saturating_mul(min_item_size))?;
        Ok(count)
    }

    pub(crate) fn get_address(&mut self) -> Result<SocketAddr, MatrixError> {
        let ip = match self.get_u8()? {
            ADDRESS_NONE => return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)),
            ADDRESS_IPV4 => {
                let mut octets = [0; 4];
                octets.copy_from_slice(self.get_bytes(4)?);
                IpAddr::V4(Ipv4Addr::from(octets))
            }
            ADDRESS_IPV6 => {
                let mut octets = [0; 16];
                octets.copy_from_slice(self.get_bytes(16)?);
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            kind => return Err(MatrixError::InvalidAddressKind { kind }),
        };
        let port = self.get_u16()?;
        Ok(SocketAddr::new(ip, port))
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buffer.remaining()
    }

    /// Ends the decoding, every byte of the buffer must have been read.
    pub(crate) fn finish(self) -> Result<(), MatrixError> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(MatrixError::TrailingBytes { remaining }),
        }
    }
}

fn check_range(field: &'static str, value: i32, min: i32, max: i32) -> Result<(), MatrixError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(MatrixError::ValueOutOfRange {
            field,
            value: value as i64,
            min: min as i64,
            max: max as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian() {
        let mut writer = MatrixWriter::with_capacity(16);
        writer.put_u32(1);
        writer.put_i32(-1);
        let bytes = writer.finish();

        assert_eq!(&bytes[..], &[1, 0, 0, 0, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn truncated() {
        let mut reader = MatrixReader::new(&[1, 2, 3]);
        assert!(matches!(
            reader.get_u32(),
            Err(MatrixError::Truncated {
                needed: 4,
                remaining: 3
            })
        ));
    }

    #[test]
    fn trailing_bytes() {
        let mut reader = MatrixReader::new(&[1, 0, 0, 0, 9]);
        assert_eq!(reader.get_u32().unwrap(), 1);
        assert!(matches!(
            reader.finish(),
            Err(MatrixError::TrailingBytes { remaining: 1 })
        ));

        let mut reader = MatrixReader::new(&[1, 0, 0, 0]);
        assert_eq!(reader.get_u32().unwrap(), 1);
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn ranged_values() {
        let mut writer = MatrixWriter::with_capacity(4);
        assert!(matches!(
            writer.put_ranged_i32("cost", 10_001, -1, 10_000),
            Err(MatrixError::ValueOutOfRange { value: 10_001, .. })
        ));
        assert_eq!(writer.len(), 0);

        writer.put_i32(-2);
        let bytes = writer.finish();
        let mut reader = MatrixReader::new(&bytes);
        assert!(reader.get_ranged_i32("cost", -1, 10_000).is_err());
    }

    #[test]
    fn strings() {
        let mut writer = MatrixWriter::with_capacity(16);
        writer.put_string("relay", 63).unwrap();
        assert!(matches!(
            writer.put_string(&"x".repeat(64), 63),
            Err(MatrixError::StringTooLong { length: 64, max: 63 })
        ));
        let bytes = writer.finish();

        let mut reader = MatrixReader::new(&bytes);
        assert_eq!(reader.get_string(63).unwrap(), "relay");
        assert_eq!(reader.remaining(), 0);

        let mut reader = MatrixReader::new(&bytes);
        assert!(matches!(
            reader.get_string(3),
            Err(MatrixError::StringTooLong { length: 5, max: 3 })
        ));
    }

    #[test]
    fn invalid_utf8() {
        let mut reader = MatrixReader::new(&[2, 0, 0, 0, 0xc3, 0x28]);
        assert!(matches!(reader.get_string(63), Err(MatrixError::InvalidUtf8)));
    }

    #[test]
    fn addresses() {
        let addresses: [SocketAddr; 3] = [
            "0.0.0.0:0".parse().unwrap(),
            "10.0.0.1:40000".parse().unwrap(),
            "[2001:db8::1]:443".parse().unwrap(),
        ];

        let mut writer = MatrixWriter::with_capacity(64);
        for address in &addresses {
            writer.put_address(address);
        }
        let bytes = writer.finish();
        // 1 + (1 + 4 + 2) + (1 + 16 + 2)
        assert_eq!(bytes.len(), 27);

        let mut reader = MatrixReader::new(&bytes);
        for address in &addresses {
            assert_eq!(&reader.get_address().unwrap(), address);
        }
    }

    #[test]
    fn unknown_address_kind() {
        let mut reader = MatrixReader::new(&[7]);
        assert!(matches!(
            reader.get_address(),
            Err(MatrixError::InvalidAddressKind { kind: 7 })
        ));
    }

    #[test]
    fn oversized_count() {
        let mut reader = MatrixReader::new(&[0xff, 0xff, 0xff, 0xff, 0, 0]);
        assert!(matches!(
            reader.get_count(4),
            Err(MatrixError::Truncated { .. })
        ));
    }
}
