//! # Byte Reader
//!
//! A small cursor over an untrusted byte buffer. All offset arithmetic for
//! authenticator data and CBOR items goes through here, so every read is
//! bounds checked in exactly one place.

use thiserror::Error;

/// A read ran past the end of the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("read of {wanted} bytes at offset {offset} exceeds buffer of {len} bytes")]
pub struct OutOfBounds {
    pub offset: usize,
    pub wanted: usize,
    pub len: usize,
}

/// Position-tracking reader over a borrowed buffer
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `n` bytes, or fail without moving the cursor
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], OutOfBounds> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or(OutOfBounds {
                offset: self.pos,
                wanted: n,
                len: self.buf.len(),
            })?;

        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], OutOfBounds> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, OutOfBounds> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16_be(&mut self) -> Result<u16, OutOfBounds> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, OutOfBounds> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_fields_in_order() {
        let buf = [0x01, 0x02, 0x03, 0x00, 0x00, 0x01, 0x00, 0xff];
        let mut reader = ByteReader::new(&buf);

        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert_eq!(reader.read_u16_be().unwrap(), 0x0203);
        assert_eq!(reader.read_u32_be().unwrap(), 0x0000_0100);
        assert_eq!(reader.position(), 7);
        assert_eq!(reader.remaining(), 1);
        assert_eq!(reader.take(1).unwrap(), &[0xff]);
        assert!(reader.is_empty());
    }

    #[test]
    fn short_read_fails_and_leaves_cursor_in_place() {
        let buf = [0u8; 3];
        let mut reader = ByteReader::new(&buf);
        reader.take(2).unwrap();

        let err = reader.read_u16_be().unwrap_err();
        assert_eq!(
            err,
            OutOfBounds {
                offset: 2,
                wanted: 2,
                len: 3
            }
        );
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn huge_length_does_not_overflow() {
        let buf = [0u8; 4];
        let mut reader = ByteReader::new(&buf);
        reader.take(1).unwrap();

        assert!(reader.take(usize::MAX).is_err());
        assert_eq!(reader.position(), 1);
    }
}
