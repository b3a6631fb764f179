//! Stream header structure and utilities

use crate::error::{Error, Result};
use crate::width::MAX_WIDTH;

/// Stream header (9 bytes, little-endian)
///
/// ```text
/// +-----------------+--------------+--------------------+
/// | Fingerprint u32 | ClassWidth u8| RefCapacity u32    |
/// +-----------------+--------------+--------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    /// Registry fingerprint of the encoder
    pub fingerprint: u32,
    /// Byte width of every class index in the body
    pub class_index_width: u8,
    /// Number of objects the body allocates a reference for
    pub reference_capacity: u32,
}

impl StreamHeader {
    /// Header size in bytes (fixed)
    pub const SIZE: usize = 9;

    /// Offset of the reference capacity field
    pub const CAPACITY_OFFSET: usize = 5;

    /// Create a new stream header
    #[inline]
    pub fn new(fingerprint: u32, class_index_width: u8, reference_capacity: u32) -> Self {
        Self {
            fingerprint,
            class_index_width,
            reference_capacity,
        }
    }

    /// Validate stream header
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.class_index_width == 0 || self.class_index_width as usize > MAX_WIDTH {
            return Err(Error::InvalidHeader("class index width outside 1..=4"));
        }
        Ok(())
    }

    /// Encode header to bytes (little-endian)
    #[inline]
    pub fn encode(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < Self::SIZE {
            return Err(Error::UnexpectedEof {
                needed: Self::SIZE,
                remaining: buf.len(),
            });
        }

        buf[0..4].copy_from_slice(&self.fingerprint.to_le_bytes());
        buf[4] = self.class_index_width;
        buf[5..9].copy_from_slice(&self.reference_capacity.to_le_bytes());

        Ok(())
    }

    /// Decode header from bytes (little-endian)
    #[inline]
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::UnexpectedEof {
                needed: Self::SIZE,
                remaining: buf.len(),
            });
        }

        let header = Self {
            fingerprint: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            class_index_width: buf[4],
            reference_capacity: u32::from_le_bytes([buf[5], buf[6], buf[7], buf[8]]),
        };

        header.validate()?;
        Ok(header)
    }

    /// Overwrite the reference capacity of an already written header
    ///
    /// Buffers shorter than a header are left untouched.
    #[inline]
    pub fn patch_capacity(buf: &mut [u8], capacity: u32) {
        if let Some(field) = buf.get_mut(Self::CAPACITY_OFFSET..Self::SIZE) {
            field.copy_from_slice(&capacity.to_le_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode() {
        let header = StreamHeader::new(0xDEADBEEF, 2, 300);

        let mut buf = [0u8; StreamHeader::SIZE];
        header.encode(&mut buf).unwrap();
        assert_eq!(&buf[..4], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(buf[4], 2);

        let decoded = StreamHeader::decode(&buf).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn test_header_validation() {
        let mut header = StreamHeader::new(1, 1, 0);
        assert!(header.validate().is_ok());

        header.class_index_width = 0;
        assert!(matches!(header.validate(), Err(Error::InvalidHeader(_))));

        header.class_index_width = 5;
        assert!(matches!(header.validate(), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_short_header() {
        assert_eq!(
            StreamHeader::decode(&[0u8; 8]),
            Err(Error::UnexpectedEof {
                needed: 9,
                remaining: 8
            })
        );
    }

    #[test]
    fn test_patch_capacity() {
        let mut buf = [0u8; 12];
        StreamHeader::new(7, 1, 0).encode(&mut buf).unwrap();
        StreamHeader::patch_capacity(&mut buf, 0x01020304);
        assert_eq!(&buf[5..9], &[4, 3, 2, 1]);
        assert_eq!(StreamHeader::decode(&buf).unwrap().reference_capacity, 0x01020304);

        let mut short = [0u8; 3];
        StreamHeader::patch_capacity(&mut short, 9);
        assert_eq!(short, [0u8; 3]);
    }
}
