//! Bounds-checked sequential reader over a spike file.
//!
//! Every read is checked against the remaining length before any bytes are
//! consumed, so a short source surfaces as [`DecodeError::TruncatedInput`]
//! with the offending offset rather than a bare I/O error.

use crate::decoder::DecodeError;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

/// Sequential little-endian reader with a known total length.
#[derive(Debug)]
pub struct ByteCursor<R> {
    reader: R,
    pos: u64,
    len: u64,
}

impl<'a> ByteCursor<&'a [u8]> {
    /// Creates a cursor over an in-memory buffer.
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self::new(data, data.len() as u64)
    }
}

impl<R: Read> ByteCursor<R> {
    /// Wraps `reader`, which must yield exactly `len` bytes.
    pub fn new(reader: R, len: u64) -> Self {
        Self {
            reader,
            pos: 0,
            len,
        }
    }

    /// Current byte offset from the start of the source.
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Total length of the source.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the source has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes left between the current position and the end of the source.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.len - self.pos
    }

    #[inline]
    fn ensure(&self, needed: u64) -> Result<(), DecodeError> {
        let available = self.remaining();
        if needed > available {
            return Err(DecodeError::TruncatedInput {
                offset: self.pos,
                needed,
                available,
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.ensure(1)?;
        let value = self.reader.read_u8()?;
        self.pos += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        self.ensure(2)?;
        let value = self.reader.read_u16::<LittleEndian>()?;
        self.pos += 2;
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.ensure(4)?;
        let value = self.reader.read_u32::<LittleEndian>()?;
        self.pos += 4;
        Ok(value)
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        self.ensure(4)?;
        let value = self.reader.read_i32::<LittleEndian>()?;
        self.pos += 4;
        Ok(value)
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        self.ensure(4)?;
        let value = self.reader.read_f32::<LittleEndian>()?;
        self.pos += 4;
        Ok(value)
    }

    /// Reads exactly `buf.len()` bytes.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        self.ensure(buf.len() as u64)?;
        self.reader.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    /// Reads `count` consecutive little-endian u16 values.
    pub fn read_u16_vec(&mut self, count: usize) -> Result<Vec<u16>, DecodeError> {
        self.ensure(2 * count as u64)?;
        let mut values = vec![0u16; count];
        self.reader.read_u16_into::<LittleEndian>(&mut values)?;
        self.pos += 2 * count as u64;
        Ok(values)
    }

    /// Reads bytes up to and including a zero terminator.
    ///
    /// The terminator is consumed but not returned. Fails with
    /// `TruncatedInput` if the source ends before a terminator is found.
    pub fn read_cstring(&mut self) -> Result<String, DecodeError> {
        let start = self.pos;
        let mut bytes = Vec::new();
        loop {
            if self.remaining() == 0 {
                return Err(DecodeError::TruncatedInput {
                    offset: start,
                    needed: bytes.len() as u64 + 1,
                    available: bytes.len() as u64,
                });
            }
            match self.read_u8()? {
                0 => break,
                b => bytes.push(b),
            }
        }
        String::from_utf8(bytes).map_err(|e| {
            DecodeError::MalformedHeader(format!(
                "string at offset {} is not valid UTF-8: {}",
                start, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_reads() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x18f8474bu32.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&(-42i32).to_le_bytes());
        data.extend_from_slice(&30000.0f32.to_le_bytes());
        data.push(128);

        let mut cursor = ByteCursor::from_slice(&data);
        assert_eq!(cursor.len(), 15);
        assert_eq!(cursor.read_u32().unwrap(), 0x18f8474b);
        assert_eq!(cursor.read_u16().unwrap(), 1);
        assert_eq!(cursor.read_i32().unwrap(), -42);
        assert_eq!(cursor.read_f32().unwrap(), 30000.0);
        assert_eq!(cursor.position(), 14);
        assert_eq!(cursor.remaining(), 1);
        assert_eq!(cursor.read_u8().unwrap(), 128);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_truncated_read_does_not_advance() {
        let data = [0x01, 0x02, 0x03];
        let mut cursor = ByteCursor::from_slice(&data);
        cursor.read_u8().unwrap();

        match cursor.read_u32() {
            Err(DecodeError::TruncatedInput {
                offset,
                needed,
                available,
            }) => {
                assert_eq!(offset, 1);
                assert_eq!(needed, 4);
                assert_eq!(available, 2);
            }
            other => panic!("expected TruncatedInput, got {:?}", other),
        }
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_read_cstring() {
        let data = b"A-000,A-001\0rest";
        let mut cursor = ByteCursor::from_slice(data);
        assert_eq!(cursor.read_cstring().unwrap(), "A-000,A-001");
        assert_eq!(cursor.position(), 12);

        let empty = b"\0";
        let mut cursor = ByteCursor::from_slice(empty);
        assert_eq!(cursor.read_cstring().unwrap(), "");
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_unterminated_cstring_is_truncated() {
        let data = b"no terminator";
        let mut cursor = ByteCursor::from_slice(data);
        assert!(matches!(
            cursor.read_cstring(),
            Err(DecodeError::TruncatedInput { offset: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_cstring() {
        let data = [0xff, 0xfe, 0x00];
        let mut cursor = ByteCursor::from_slice(&data);
        assert!(matches!(
            cursor.read_cstring(),
            Err(DecodeError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_read_u16_vec() {
        let data: Vec<u8> = [0u16, 32768, 65535]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let mut cursor = ByteCursor::from_slice(&data);
        assert_eq!(cursor.read_u16_vec(3).unwrap(), vec![0, 32768, 65535]);

        let mut cursor = ByteCursor::from_slice(&data);
        assert!(matches!(
            cursor.read_u16_vec(4),
            Err(DecodeError::TruncatedInput {
                needed: 8,
                available: 6,
                ..
            })
        ));
    }
}
