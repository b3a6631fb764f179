//! Encode-side context: byte sink, fixed-width primitives and identity map
//!
//! One `EncodeContext` lives for exactly one top-level encode call. It owns the
//! growing output buffer and the identity map that assigns reference-table
//! indices to objects the first time they are written by reference.

use alloc::vec::Vec;

use crate::chunk::ChunkTag;
use crate::error::{Error, Result};
use crate::header::StreamHeader;
use crate::object::ObjId;
use crate::width;

/// Byte written for `true`
pub const BOOLEAN_TRUE: u8 = 0b0101_0101;

/// Byte written for `false`
pub const BOOLEAN_FALSE: u8 = !BOOLEAN_TRUE;

/// Largest value representable in three bytes
pub const MAX_U24: u32 = (1 << 24) - 1;

/// Per-call encode state
#[derive(Debug)]
pub struct EncodeContext {
    buf: Vec<u8>,
    class_index_width: usize,
    // ObjId -> reference index, indexed by ObjId
    identity: Vec<Option<u32>>,
    references: u32,
}

impl EncodeContext {
    /// Create a context whose class indices use `class_index_width` bytes
    #[inline]
    pub fn new(class_index_width: usize, capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            class_index_width,
            identity: Vec::new(),
            references: 0,
        }
    }

    /// Begin a top-level stream by writing the header
    ///
    /// The reference capacity is a placeholder until [`finish`](Self::finish).
    #[inline]
    pub fn begin(&mut self, header: &StreamHeader) -> Result<()> {
        let start = self.buf.len();
        self.buf.resize(start + StreamHeader::SIZE, 0);
        header.encode(&mut self.buf[start..])
    }

    /// Patch the final reference count into the header and return the bytes
    #[inline]
    pub fn finish(mut self) -> Vec<u8> {
        StreamHeader::patch_capacity(&mut self.buf, self.references);
        self.buf
    }

    /// Write a u8 value
    #[inline]
    pub fn put_u8(&mut self, value: u8) -> Result<()> {
        self.buf.push(value);
        Ok(())
    }

    /// Write a boolean as its marker byte
    #[inline]
    pub fn put_bool(&mut self, value: bool) -> Result<()> {
        self.put_u8(if value { BOOLEAN_TRUE } else { BOOLEAN_FALSE })
    }

    /// Write a u16 value (little-endian)
    #[inline]
    pub fn put_u16(&mut self, value: u16) -> Result<()> {
        self.buf.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Write the low 24 bits of a u32 value (little-endian)
    #[inline]
    pub fn put_u24(&mut self, value: u32) -> Result<()> {
        if value > MAX_U24 {
            return Err(Error::ValueTooLarge {
                value: value as u64,
                width: 3,
            });
        }
        self.buf.extend_from_slice(&value.to_le_bytes()[..3]);
        Ok(())
    }

    /// Write a u32 value (little-endian)
    #[inline]
    pub fn put_u32(&mut self, value: u32) -> Result<()> {
        self.buf.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Write a u64 value (little-endian)
    #[inline]
    pub fn put_u64(&mut self, value: u64) -> Result<()> {
        self.buf.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Write a u16 value (big-endian)
    #[inline]
    pub fn put_u16_be(&mut self, value: u16) -> Result<()> {
        self.buf.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Write a u32 value (big-endian)
    #[inline]
    pub fn put_u32_be(&mut self, value: u32) -> Result<()> {
        self.buf.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Write a u64 value (big-endian)
    #[inline]
    pub fn put_u64_be(&mut self, value: u64) -> Result<()> {
        self.buf.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Write an i8 value
    #[inline]
    pub fn put_i8(&mut self, value: i8) -> Result<()> {
        self.put_u8(value as u8)
    }

    /// Write an i16 value (little-endian)
    #[inline]
    pub fn put_i16(&mut self, value: i16) -> Result<()> {
        self.put_u16(value as u16)
    }

    /// Write an i32 value (little-endian)
    #[inline]
    pub fn put_i32(&mut self, value: i32) -> Result<()> {
        self.put_u32(value as u32)
    }

    /// Write an i64 value (little-endian)
    #[inline]
    pub fn put_i64(&mut self, value: i64) -> Result<()> {
        self.put_u64(value as u64)
    }

    /// Write an f32 through its raw bit pattern
    #[inline]
    pub fn put_f32(&mut self, value: f32) -> Result<()> {
        self.put_u32(value.to_bits())
    }

    /// Write an f64 through its raw bit pattern
    #[inline]
    pub fn put_f64(&mut self, value: f64) -> Result<()> {
        self.put_u64(value.to_bits())
    }

    /// Write raw bytes without length prefix
    #[inline]
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Write `value` with the width needed for values up to `bound`
    #[inline]
    pub fn put_uint_for(&mut self, bound: u64, value: u32) -> Result<()> {
        let width = width::width_for_count(bound);
        let start = self.buf.len();
        self.buf.resize(start + width, 0);
        if let Err(err) = width::encode_uint(value, width, &mut self.buf[start..]) {
            self.buf.truncate(start);
            return Err(err);
        }
        Ok(())
    }

    /// Write an identifier: u16 length in UTF-16 units, then one u16 per unit
    #[inline]
    pub fn put_identifier(&mut self, name: &str) -> Result<()> {
        let units = name.encode_utf16().count();
        let len = u16::try_from(units).map_err(|_| Error::ValueTooLarge {
            value: units as u64,
            width: 2,
        })?;
        self.put_u16(len)?;
        for unit in name.encode_utf16() {
            self.put_u16(unit)?;
        }
        Ok(())
    }

    /// Write a chunk tag byte
    #[inline]
    pub fn put_chunk_tag(&mut self, tag: ChunkTag) -> Result<()> {
        self.put_u8(tag.as_u8())
    }

    /// Write a registry class index with the stream-wide width
    #[inline]
    pub fn put_class_index(&mut self, index: usize) -> Result<()> {
        let value = u32::try_from(index).map_err(|_| Error::ValueTooLarge {
            value: index as u64,
            width: self.class_index_width,
        })?;
        let start = self.buf.len();
        self.buf.resize(start + self.class_index_width, 0);
        if let Err(err) = width::encode_uint(value, self.class_index_width, &mut self.buf[start..]) {
            self.buf.truncate(start);
            return Err(err);
        }
        Ok(())
    }

    /// Reference-table index previously assigned to `id`
    #[inline]
    pub fn reference_of(&self, id: ObjId) -> Option<u32> {
        self.identity.get(id.index()).copied().flatten()
    }

    /// Assign the next reference-table index to `id`
    #[inline]
    pub fn allocate_reference(&mut self, id: ObjId) -> u32 {
        let index = self.references;
        if self.identity.len() <= id.index() {
            self.identity.resize(id.index() + 1, None);
        }
        self.identity[id.index()] = Some(index);
        self.references += 1;
        index
    }

    /// Write a back-reference with the width implied by the references so far
    #[inline]
    pub fn put_old_reference(&mut self, index: u32) -> Result<()> {
        self.put_uint_for(self.references as u64, index)
    }

    /// References allocated so far
    #[inline]
    pub fn reference_count(&self) -> u32 {
        self.references
    }

    /// Width of a class index in bytes
    #[inline]
    pub fn class_index_width(&self) -> usize {
        self.class_index_width
    }

    /// Get current position in the output
    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Get a slice of the encoded data
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}
