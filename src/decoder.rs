//! Decode-side context: byte cursor, fixed-width primitives and reference table
//!
//! The reference table is filled strictly in arrival order. An object is pushed
//! right after it has been constructed and before it is populated, which is
//! what lets a back-reference inside its own payload resolve to it.

use alloc::string::String;
use alloc::vec::Vec;

use crate::chunk::ChunkTag;
use crate::encoder::BOOLEAN_TRUE;
use crate::error::{Error, Result};
use crate::header::StreamHeader;
use crate::object::ObjId;
use crate::width;

/// Per-call decode state
#[derive(Debug)]
pub struct DecodeContext<'a> {
    buf: &'a [u8],
    pos: usize,
    class_index_width: usize,
    capacity: u32,
    references: Vec<ObjId>,
}

impl<'a> DecodeContext<'a> {
    /// Create a bare cursor over `buf` without reading a header
    ///
    /// Class indices default to one byte and the reference table is empty.
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            class_index_width: 1,
            capacity: 0,
            references: Vec::new(),
        }
    }

    /// Read the stream header and size the reference table from it
    pub fn with_header(buf: &'a [u8]) -> Result<(Self, StreamHeader)> {
        let header = StreamHeader::decode(buf)?;
        let body = buf.len() - StreamHeader::SIZE;
        // every reference needs at least its tag byte, so never trust more than that
        let reserve = (header.reference_capacity as usize).min(body);

        let ctx = Self {
            buf,
            pos: StreamHeader::SIZE,
            class_index_width: header.class_index_width as usize,
            capacity: header.reference_capacity,
            references: Vec::with_capacity(reserve),
        };
        Ok((ctx, header))
    }

    #[inline]
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::UnexpectedEof {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    #[inline]
    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Get remaining bytes in cursor
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Check if cursor is at end
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Current read position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Skip bytes in the cursor
    #[inline]
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Read a u8 value
    #[inline]
    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    /// Read a boolean; only the true marker byte reads as `true`
    #[inline]
    pub fn get_bool(&mut self) -> Result<bool> {
        Ok(self.get_u8()? == BOOLEAN_TRUE)
    }

    /// Read a u16 value (little-endian)
    #[inline]
    pub fn get_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    /// Read a 24-bit unsigned value (little-endian)
    #[inline]
    pub fn get_u24(&mut self) -> Result<u32> {
        let [b0, b1, b2] = self.take_array::<3>()?;
        Ok(u32::from_le_bytes([b0, b1, b2, 0]))
    }

    /// Read a u32 value (little-endian)
    #[inline]
    pub fn get_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    /// Read a u64 value (little-endian)
    #[inline]
    pub fn get_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    /// Read a u16 value (big-endian)
    #[inline]
    pub fn get_u16_be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    /// Read a u32 value (big-endian)
    #[inline]
    pub fn get_u32_be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    /// Read a u64 value (big-endian)
    #[inline]
    pub fn get_u64_be(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    /// Read an i8 value
    #[inline]
    pub fn get_i8(&mut self) -> Result<i8> {
        Ok(self.get_u8()? as i8)
    }

    /// Read an i16 value (little-endian)
    #[inline]
    pub fn get_i16(&mut self) -> Result<i16> {
        Ok(self.get_u16()? as i16)
    }

    /// Read an i32 value (little-endian)
    #[inline]
    pub fn get_i32(&mut self) -> Result<i32> {
        Ok(self.get_u32()? as i32)
    }

    /// Read an i64 value (little-endian)
    #[inline]
    pub fn get_i64(&mut self) -> Result<i64> {
        Ok(self.get_u64()? as i64)
    }

    /// Read an f32 from its raw bit pattern
    #[inline]
    pub fn get_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.get_u32()?))
    }

    /// Read an f64 from its raw bit pattern
    #[inline]
    pub fn get_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.get_u64()?))
    }

    /// Read raw bytes without length prefix
    ///
    /// Returns a zero-copy slice into the original buffer
    #[inline]
    pub fn get_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Peek at bytes without advancing cursor
    #[inline]
    pub fn peek_bytes(&self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::UnexpectedEof {
                needed: len,
                remaining: self.remaining(),
            });
        }
        Ok(&self.buf[self.pos..self.pos + len])
    }

    /// Read a value written with the width needed for values up to `bound`
    #[inline]
    pub fn get_uint_for(&mut self, bound: u64) -> Result<u32> {
        let width = width::width_for_count(bound);
        let value = width::decode_uint(width, &self.buf[self.pos..])?;
        self.pos += width;
        Ok(value)
    }

    /// Read an identifier written by `EncodeContext::put_identifier`
    pub fn get_identifier(&mut self) -> Result<String> {
        let len = self.get_u16()? as usize;
        let mut units = Vec::with_capacity(len.min(self.remaining() / 2));
        for _ in 0..len {
            units.push(self.get_u16()?);
        }
        String::from_utf16(&units).map_err(|_| Error::InvalidIdentifier)
    }

    /// Read a chunk tag; unknown tag bytes are fatal corruption
    #[inline]
    pub fn get_chunk_tag(&mut self) -> Result<ChunkTag> {
        let offset = self.pos;
        let tag = self.get_u8()?;
        match ChunkTag::from_u8(tag) {
            Some(ChunkTag::Illegal) | None => Err(Error::InvalidChunkTag { tag, offset }),
            Some(chunk) => Ok(chunk),
        }
    }

    /// Read a registry class index with the stream-wide width
    #[inline]
    pub fn get_class_index(&mut self) -> Result<usize> {
        let value = width::decode_uint(self.class_index_width, &self.buf[self.pos..])?;
        self.pos += self.class_index_width;
        Ok(value as usize)
    }

    /// Register a freshly constructed object in the next table slot
    #[inline]
    pub fn push_reference(&mut self, id: ObjId) -> Result<()> {
        if self.references.len() >= self.capacity as usize {
            return Err(Error::ReferenceOverflow {
                capacity: self.capacity,
            });
        }
        self.references.push(id);
        Ok(())
    }

    /// Read a back-reference index and resolve it through the table
    #[inline]
    pub fn get_old_reference(&mut self) -> Result<ObjId> {
        let allocated = self.references.len();
        let index = self.get_uint_for(allocated as u64)? as usize;
        self.references
            .get(index)
            .copied()
            .ok_or(Error::InvalidReference { index, allocated })
    }

    /// References pushed so far
    #[inline]
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Capacity declared by the stream header
    #[inline]
    pub fn reference_capacity(&self) -> u32 {
        self.capacity
    }

    /// Width of a class index in bytes
    #[inline]
    pub fn class_index_width(&self) -> usize {
        self.class_index_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EncodeContext;

    #[test]
    fn test_cursor_operations() {
        let data = [1, 2, 3, 4, 5, 6, 7, 8];
        let mut cursor = DecodeContext::new(&data);

        assert_eq!(cursor.remaining(), 8);
        assert!(!cursor.is_at_end());

        assert_eq!(cursor.get_u16().unwrap(), 0x0201); // little-endian
        assert_eq!(cursor.remaining(), 6);

        cursor.skip(2).unwrap();
        assert_eq!(cursor.remaining(), 4);

        let peeked = cursor.peek_bytes(2).unwrap();
        assert_eq!(peeked, &[5, 6]);
        assert_eq!(cursor.remaining(), 4); // peek doesn't advance

        assert_eq!(cursor.get_u32().unwrap(), 0x08070605);
        assert!(cursor.is_at_end());
    }

    #[test]
    fn test_primitives_roundtrip() {
        let mut ctx = EncodeContext::new(1, 64);
        ctx.put_i8(-5).unwrap();
        ctx.put_i16(-300).unwrap();
        ctx.put_u24(0xABCDEF).unwrap();
        ctx.put_i64(i64::MIN).unwrap();
        ctx.put_f32(4.2).unwrap();
        ctx.put_f64(-2.1).unwrap();
        ctx.put_u64_be(0x0102030405060708).unwrap();
        ctx.put_bool(true).unwrap();

        let mut cursor = DecodeContext::new(ctx.as_slice());
        assert_eq!(cursor.get_i8().unwrap(), -5);
        assert_eq!(cursor.get_i16().unwrap(), -300);
        assert_eq!(cursor.get_u24().unwrap(), 0xABCDEF);
        assert_eq!(cursor.get_i64().unwrap(), i64::MIN);
        assert_eq!(cursor.get_f32().unwrap(), 4.2);
        assert_eq!(cursor.get_f64().unwrap(), -2.1);
        assert_eq!(cursor.get_u64_be().unwrap(), 0x0102030405060708);
        assert!(cursor.get_bool().unwrap());
        assert!(cursor.is_at_end());
    }

    #[test]
    fn test_nan_bits_survive() {
        let nan = f64::from_bits(0x7FF8_0000_0000_0001);
        let mut ctx = EncodeContext::new(1, 8);
        ctx.put_f64(nan).unwrap();

        let mut cursor = DecodeContext::new(ctx.as_slice());
        assert_eq!(cursor.get_f64().unwrap().to_bits(), nan.to_bits());
    }

    #[test]
    fn test_non_marker_bool_is_false() {
        let data = [0x01, 0x55];
        let mut cursor = DecodeContext::new(&data);
        assert!(!cursor.get_bool().unwrap());
        assert!(cursor.get_bool().unwrap());
    }

    #[test]
    fn test_invalid_chunk_tag() {
        let data = [0, 8, 200];
        let mut cursor = DecodeContext::new(&data);
        assert_eq!(
            cursor.get_chunk_tag(),
            Err(Error::InvalidChunkTag { tag: 0, offset: 0 })
        );
        assert_eq!(
            cursor.get_chunk_tag(),
            Err(Error::InvalidChunkTag { tag: 8, offset: 1 })
        );
        assert_eq!(
            cursor.get_chunk_tag(),
            Err(Error::InvalidChunkTag {
                tag: 200,
                offset: 2
            })
        );
    }

    #[test]
    fn test_invalid_identifier() {
        // lone high surrogate
        let data = [1, 0, 0x00, 0xD8];
        let mut cursor = DecodeContext::new(&data);
        assert_eq!(cursor.get_identifier(), Err(Error::InvalidIdentifier));
    }

    #[test]
    fn test_unexpected_eof() {
        let data = [1, 2, 3];
        let mut cursor = DecodeContext::new(&data);
        assert_eq!(
            cursor.get_u32(),
            Err(Error::UnexpectedEof {
                needed: 4,
                remaining: 3
            })
        );
    }

    #[test]
    fn test_reference_table() {
        let mut ctx = EncodeContext::new(1, 32);
        ctx.begin(&StreamHeader::new(7, 1, 0)).unwrap();
        ctx.allocate_reference(ObjId::from_index(0));
        ctx.allocate_reference(ObjId::from_index(1));
        ctx.put_old_reference(1).unwrap();
        let bytes = ctx.finish();

        let (mut cursor, header) = DecodeContext::with_header(&bytes).unwrap();
        assert_eq!(header.reference_capacity, 2);
        cursor.push_reference(ObjId::from_index(10)).unwrap();
        cursor.push_reference(ObjId::from_index(11)).unwrap();
        assert_eq!(cursor.get_old_reference().unwrap(), ObjId::from_index(11));

        assert_eq!(
            cursor.push_reference(ObjId::from_index(12)),
            Err(Error::ReferenceOverflow { capacity: 2 })
        );
    }

    #[test]
    fn test_reference_out_of_range() {
        let data = [5];
        let mut cursor = DecodeContext::new(&data);
        assert_eq!(
            cursor.get_old_reference(),
            Err(Error::InvalidReference {
                index: 5,
                allocated: 0
            })
        );
    }
}
