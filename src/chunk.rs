//! Chunk tags
//!
//! Every value in the body starts with one tag byte telling the decoder how
//! the rest of the chunk is laid out.

/// Kind of a body chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChunkTag {
    /// Never written; reading it is corruption
    Illegal = 0,
    /// Absent value
    Null = 1,
    /// Registered value type, no identity: class index then payload
    ValueType = 2,
    /// First sighting of a registered reference type: class index then payload
    NewRef = 3,
    /// Back-reference: index into the reference table
    OldRef = 4,
    /// Array of references: element class, dimension, u24 length, elements
    GenericArray = 5,
    /// Structural object without a strategy: name, field count, fields
    UnknownObj = 6,
    /// Enumeration without a strategy: name, ordinal
    UnknownEnum = 7,
}

impl ChunkTag {
    /// Wire byte of this tag
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire byte
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => ChunkTag::Illegal,
            1 => ChunkTag::Null,
            2 => ChunkTag::ValueType,
            3 => ChunkTag::NewRef,
            4 => ChunkTag::OldRef,
            5 => ChunkTag::GenericArray,
            6 => ChunkTag::UnknownObj,
            7 => ChunkTag::UnknownEnum,
            _ => return None,
        })
    }

    /// Short upper-case name used in trace output
    pub const fn name(self) -> &'static str {
        match self {
            ChunkTag::Illegal => "ILLEGAL",
            ChunkTag::Null => "NULL",
            ChunkTag::ValueType => "VALUE_TYPE",
            ChunkTag::NewRef => "NEW_REF",
            ChunkTag::OldRef => "OLD_REF",
            ChunkTag::GenericArray => "GENERIC_ARRAY",
            ChunkTag::UnknownObj => "UNKNOWN_OBJ",
            ChunkTag::UnknownEnum => "UNKNOWN_ENUM",
        }
    }

    /// Whether a chunk of this kind takes a reference-table slot
    pub const fn allocates_reference(self) -> bool {
        matches!(
            self,
            ChunkTag::NewRef | ChunkTag::GenericArray | ChunkTag::UnknownObj
        )
    }
}

impl TryFrom<u8> for ChunkTag {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(crate::Error::InvalidChunkTag {
            tag: value,
            offset: 0,
        })
    }
}

impl core::fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
