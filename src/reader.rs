//! Cursor based extraction of fixed width fields out of a payload.
//!
//! Integers are always read in network byte order. Every read is bounds checked, reading past
//! the end of the payload yields `FieldError::Overrun` and leaves the cursor untouched.
use bytes::{Buf, Bytes};
use error::FieldError;

pub struct FieldReader {
    payload: Bytes,
    len: usize,
}

impl FieldReader {
    pub fn new(payload: Bytes) -> FieldReader {
        let len = payload.len();
        FieldReader { payload, len }
    }

    /// Current read position, counted from the start of the payload.
    pub fn offset(&self) -> usize {
        self.len - self.payload.remaining()
    }

    pub fn remaining(&self) -> usize {
        self.payload.remaining()
    }

    fn ensure(&self, wanted: usize) -> Result<(), FieldError> {
        if self.payload.remaining() < wanted {
            return Err(FieldError::Overrun {
                offset: self.offset(),
                wanted,
                remaining: self.payload.remaining(),
            });
        }
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8, FieldError> {
        self.ensure(1)?;
        Ok(self.payload.get_u8())
    }

    pub fn i8(&mut self) -> Result<i8, FieldError> {
        self.ensure(1)?;
        Ok(self.payload.get_i8())
    }

    pub fn u16(&mut self) -> Result<u16, FieldError> {
        self.ensure(2)?;
        Ok(self.payload.get_u16())
    }

    pub fn i16(&mut self) -> Result<i16, FieldError> {
        self.ensure(2)?;
        Ok(self.payload.get_i16())
    }

    pub fn u24(&mut self) -> Result<u32, FieldError> {
        self.ensure(3)?;
        Ok(self.payload.get_uint(3) as u32)
    }

    pub fn i24(&mut self) -> Result<i32, FieldError> {
        self.ensure(3)?;
        // sign extend from bit 23
        let raw = self.payload.get_uint(3) as u32;
        Ok(((raw << 8) as i32) >> 8)
    }

    pub fn u32(&mut self) -> Result<u32, FieldError> {
        self.ensure(4)?;
        Ok(self.payload.get_u32())
    }

    pub fn i32(&mut self) -> Result<i32, FieldError> {
        self.ensure(4)?;
        Ok(self.payload.get_i32())
    }

    /// Raw slice of `len` bytes.
    pub fn bytes(&mut self, len: usize) -> Result<Bytes, FieldError> {
        self.ensure(len)?;
        Ok(self.payload.copy_to_bytes(len))
    }

    /// Text field of `len` bytes, see [`to_text`].
    pub fn text(&mut self, len: usize) -> Result<String, FieldError> {
        Ok(to_text(&self.bytes(len)?))
    }

    /// 32 bit field rendered as binary string, most significant bit first.
    pub fn bits32(&mut self) -> Result<String, FieldError> {
        Ok(format!("{:032b}", self.u32()?))
    }
}

/// Remove every NUL byte from the slice and trim surrounding whitespace.
pub fn to_text(bytes: &[u8]) -> String {
    let stripped: Vec<u8> = bytes.iter().copied().filter(|&b| b != 0x00).collect();
    String::from_utf8_lossy(&stripped).trim().to_string()
}

pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug, PartialEq)]
    pub enum FieldError {
        #[error("Read of {wanted} bytes at offset {offset} overruns payload, {remaining} bytes left")]
        Overrun {
            offset: usize,
            wanted: usize,
            remaining: usize,
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn reader(bytes: &'static [u8]) -> FieldReader {
        FieldReader::new(Bytes::from_static(bytes))
    }

    #[test]
    fn test_integers_are_big_endian() {
        let mut r = reader(&[
            0x01, 0x02, 0x03, 0xFF, 0xFE, 0x01, 0x02, 0x03, 0xFF, 0xFF, 0xFE, 0x12, 0x34, 0x56,
            0x78,
        ]);
        assert_eq!(r.u16().unwrap(), 0x0102);
        assert_eq!(r.u8().unwrap(), 0x03);
        assert_eq!(r.i16().unwrap(), -2);
        assert_eq!(r.u24().unwrap(), 0x010203);
        assert_eq!(r.i24().unwrap(), -2);
        assert_eq!(r.u32().unwrap(), 0x12345678);
        assert_eq!(r.remaining(), 0);
        assert_eq!(r.offset(), 15);
    }

    #[test]
    fn test_signed_single_byte_and_word() {
        let mut r = reader(&[0x80, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(r.i8().unwrap(), -128);
        assert_eq!(r.i32().unwrap(), -1);
    }

    #[test]
    fn test_overrun_is_reported_and_does_not_advance() {
        let mut r = reader(&[0x00, 0x01, 0x02]);
        r.u8().unwrap();
        assert_eq!(
            r.u32(),
            Err(FieldError::Overrun {
                offset: 1,
                wanted: 4,
                remaining: 2
            })
        );
        assert_eq!(r.offset(), 1);
        assert_eq!(r.u16().unwrap(), 0x0102);
    }

    #[test]
    fn test_text_strips_all_nul_bytes() {
        let mut r = reader(b" AB\0C\0D \0\0");
        assert_eq!(r.text(10).unwrap(), "ABCD");
    }

    #[test]
    fn test_text_of_only_nul_is_empty() {
        assert_eq!(to_text(&[0; 20]), "");
        assert_eq!(to_text(b"  \t"), "");
    }

    #[test]
    fn test_bits32_msb_first() {
        let mut r = reader(&[0x80, 0x00, 0x00, 0x05]);
        assert_eq!(r.bits32().unwrap(), "10000000000000000000000000000101");
    }

    #[test]
    fn test_raw_bytes_slice() {
        let mut r = reader(&[1, 2, 3, 4]);
        r.u8().unwrap();
        assert_eq!(r.bytes(2).unwrap().as_ref(), &[2, 3]);
        assert_eq!(r.offset(), 3);
    }
}
