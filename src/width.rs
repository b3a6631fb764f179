//! Dynamic-width integer encoding
//!
//! Class indices, back-reference indices and enumeration ordinals are written
//! with the smallest byte width (1 to 4) able to hold every value below a known
//! bound. Both sides derive the bound independently, so no width is ever
//! written to the stream except once for the class index in the header.

use crate::error::{Error, Result};

/// Exclusive upper bound for 1-byte values
pub const MAX_WIDTH_1: i64 = 1 << 8;

/// Exclusive upper bound for 2-byte values
pub const MAX_WIDTH_2: i64 = 1 << 16;

/// Exclusive upper bound for 3-byte values
pub const MAX_WIDTH_3: i64 = 1 << 24;

/// Widest dynamic integer in bytes
pub const MAX_WIDTH: usize = 4;

/// Number of bytes needed to store unsigned values up to `bound`
///
/// Returns `Error::NegativeBound` for negative input.
#[inline]
pub fn width_for(bound: i64) -> Result<usize> {
    if bound < 0 {
        return Err(Error::NegativeBound(bound));
    }
    Ok(width_for_count(bound as u64))
}

/// Infallible variant of [`width_for`] for counts that are never negative
#[inline]
pub const fn width_for_count(count: u64) -> usize {
    if count < MAX_WIDTH_1 as u64 {
        1
    } else if count < MAX_WIDTH_2 as u64 {
        2
    } else if count < MAX_WIDTH_3 as u64 {
        3
    } else {
        4
    }
}

/// Encode `value` little-endian into exactly `width` bytes of `buf`
///
/// Returns the number of bytes written.
#[inline]
pub fn encode_uint(value: u32, width: usize, buf: &mut [u8]) -> Result<usize> {
    if width == 0 || width > MAX_WIDTH {
        return Err(Error::ValueTooLarge {
            value: value as u64,
            width,
        });
    }
    if width < MAX_WIDTH && (value as u64) >> (8 * width) != 0 {
        return Err(Error::ValueTooLarge {
            value: value as u64,
            width,
        });
    }
    if buf.len() < width {
        return Err(Error::UnexpectedEof {
            needed: width,
            remaining: buf.len(),
        });
    }

    buf[..width].copy_from_slice(&value.to_le_bytes()[..width]);
    Ok(width)
}

/// Decode a little-endian unsigned value of `width` bytes from `buf`
#[inline]
pub fn decode_uint(width: usize, buf: &[u8]) -> Result<u32> {
    if width == 0 || width > MAX_WIDTH {
        return Err(Error::CorruptPayload("dynamic width outside 1..=4"));
    }
    if buf.len() < width {
        return Err(Error::UnexpectedEof {
            needed: width,
            remaining: buf.len(),
        });
    }

    let mut bytes = [0u8; MAX_WIDTH];
    bytes[..width].copy_from_slice(&buf[..width]);
    Ok(u32::from_le_bytes(bytes))
}
