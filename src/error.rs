//! Error types for the graphbit codec

use alloc::string::String;

/// Errors that can occur while encoding or decoding an object graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Unexpected end of the input stream
    #[error("unexpected end of stream: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes the read required
        needed: usize,
        /// Bytes that were left
        remaining: usize,
    },

    /// Chunk tag byte outside the known tag range
    #[error("invalid chunk tag {tag} at offset {offset}")]
    InvalidChunkTag {
        /// The tag byte read from the stream
        tag: u8,
        /// Offset of the tag byte
        offset: usize,
    },

    /// Stream header could not be used
    #[error("invalid stream header: {0}")]
    InvalidHeader(&'static str),

    /// Class index not present in the registry
    #[error("class index {index} out of range ({registered} types registered)")]
    InvalidClassIndex {
        /// Index read from the stream
        index: usize,
        /// Number of registry entries
        registered: usize,
    },

    /// Back-reference to a reference-table slot that was never filled
    #[error("reference index {index} out of range ({allocated} references allocated)")]
    InvalidReference {
        /// Index read from the stream
        index: usize,
        /// References pushed so far
        allocated: usize,
    },

    /// More references arrived than the header declared
    #[error("reference table overflow: header declared {capacity} references")]
    ReferenceOverflow {
        /// Capacity declared by the header
        capacity: u32,
    },

    /// Identifier bytes were not valid UTF-16
    #[error("identifier is not valid UTF-16")]
    InvalidIdentifier,

    /// Corrupted payload detected by a strategy or the structural codec
    #[error("corrupt payload: {0}")]
    CorruptPayload(&'static str),

    /// Enumeration ordinal out of range for the resolved type
    #[error("ordinal {ordinal} out of range for enumeration {type_name}")]
    InvalidOrdinal {
        /// Enumeration type name
        type_name: String,
        /// Ordinal read from the stream
        ordinal: usize,
    },

    /// Encoder and decoder registries disagree on the fingerprint
    #[error("protocol mismatch: expected fingerprint {expected:#010x}, stream carries {found:#010x}")]
    ProtocolMismatch {
        /// Fingerprint of the local registry
        expected: u32,
        /// Fingerprint found in the stream header
        found: u32,
    },

    /// Object type has no strategy and cannot be written under the active reaction
    #[error("type {type_name} is not part of the protocol")]
    UnsupportedType {
        /// Name of the offending type
        type_name: &'static str,
    },

    /// Structural construction or field access failed
    #[error("structural access failed for {type_name}: {reason}")]
    Reflection {
        /// Name of the affected type
        type_name: String,
        /// What went wrong
        reason: String,
    },

    /// Structural type name not present in the type catalog
    #[error("unknown structural type {type_name}")]
    UnknownObjectType {
        /// Name read from the stream
        type_name: String,
    },

    /// Enumeration type name not present in the type catalog
    #[error("unknown enumeration type {type_name}")]
    UnknownEnumType {
        /// Name read from the stream
        type_name: String,
    },

    /// Type registered twice in one registry
    #[error("type {type_name} registered twice")]
    DuplicateType {
        /// Name of the duplicated type
        type_name: &'static str,
    },

    /// Negative bound passed to the dynamic-width codec
    #[error("negative bound {0} has no byte width")]
    NegativeBound(i64),

    /// Value does not fit the byte width it must be written with
    #[error("value {value} does not fit in {width} bytes")]
    ValueTooLarge {
        /// The value to write
        value: u64,
        /// Available width in bytes
        width: usize,
    },

    /// Generic array longer than the 24-bit length field allows
    #[error("array length {0} exceeds the 24-bit limit")]
    ArrayTooLong(usize),

    /// Generic array dimension of zero
    #[error("array dimension must be at least 1")]
    InvalidArrayDimension,

    /// Chunk nesting went deeper than the configured limit
    #[error("chunk nesting exceeded the depth limit of {limit}")]
    DepthExceeded {
        /// Configured maximum depth
        limit: usize,
    },

    /// A strategy decoded a nested reference while creating its object
    #[error("strategy for {type_name} decoded a nested reference in create")]
    NestedCreate {
        /// Registered name of the type being created
        type_name: &'static str,
    },

    /// Object handle does not exist in the heap
    #[error("object {0} does not exist in the heap")]
    DanglingObject(usize),

    /// Object handle points to a different type than requested
    #[error("object {id} is not a {expected}")]
    TypeMismatch {
        /// Handle that was looked up
        id: usize,
        /// Type the caller asked for
        expected: &'static str,
    },
}

impl Error {
    /// Returns true for the fatal stream-corruption family
    pub const fn is_stream_corruption(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedEof { .. }
                | Error::InvalidChunkTag { .. }
                | Error::InvalidHeader(_)
                | Error::InvalidClassIndex { .. }
                | Error::InvalidReference { .. }
                | Error::ReferenceOverflow { .. }
                | Error::InvalidIdentifier
                | Error::CorruptPayload(_)
                | Error::InvalidOrdinal { .. }
        )
    }
}

/// Result type alias for graphbit operations
pub type Result<T> = core::result::Result<T, Error>;
