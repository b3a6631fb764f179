//! GraphBit: compact binary codec for object graphs with shared references and cycles
//!
//! Objects live in a [`Heap`] arena and point at each other through [`ObjId`]
//! handles. A [`Registry`] maps each type to a [`Strategy`] that writes its
//! payload; the [`Codec`] walks the graph, writes every object once and
//! replaces later sightings with back-references, so shared nodes stay shared
//! and cycles decode without special handling.
//!
//! # Stream Format
//!
//! ```text
//! +-----------------+---------------+-----------------+
//! | Fingerprint u32 | ClassWidth u8 | RefCapacity u32 |
//! +-----------------+---------------+-----------------+
//! | Root chunk                                        |
//! +---------------------------------------------------+
//!
//! NULL           | 1 |
//! VALUE_TYPE     | 2 | class | payload |
//! NEW_REF        | 3 | class | payload |
//! OLD_REF        | 4 | ref index (width of refs so far) |
//! GENERIC_ARRAY  | 5 | element class | dim u8 | len u24 | chunk* |
//! UNKNOWN_OBJ    | 6 | name | count u16 | (name, kind u8, value)* |
//! UNKNOWN_ENUM   | 7 | name | ordinal (width of variant count) |
//! ```
//!
//! Integers are little-endian. Class indices use the width recorded in the
//! header; reference indices and ordinals use the smallest width (1 to 4
//! bytes) that holds their bound.
//!
//! # Features
//!
//! - Identity-preserving encoding of shared references and cycles
//! - Two-phase decode (`create`, register, `read`) for cycle-safe construction
//! - Registry fingerprint to detect mismatched protocols
//! - Structural fallback for unregistered types that list their own fields
//! - Bounded nesting depth on both encode and decode ([`DEFAULT_MAX_DEPTH`])
//! - `no_std` support with `alloc`
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use graphbit::*;
//!
//! let registry = Arc::new(Registry::builder().register_string().build()?);
//! let codec = Codec::new(registry);
//!
//! let mut heap = Heap::new();
//! let word = heap.insert(String::from("loop"));
//! let array = heap.insert(ObjArray::of::<BaseObject>(vec![Some(word), None]));
//! heap.get_mut::<ObjArray>(array).unwrap().items[1] = Some(array);
//!
//! let bytes = codec.encode(&heap, Some(array))?;
//! let graph = codec.decode(&bytes)?;
//!
//! let root = graph.root.unwrap();
//! assert_eq!(graph.heap.get::<ObjArray>(root).unwrap().items[1], Some(root));
//! # Ok::<(), graphbit::Error>(())
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod chunk;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod header;
pub mod object;
pub mod protocols;
pub mod registry;
pub mod strategy;
pub mod structural;
pub mod width;

// Re-export main types
pub use chunk::ChunkTag;
pub use config::{CodecConfig, FingerprintPolicy, UnknownTypeReaction};
pub use decoder::DecodeContext;
pub use encoder::EncodeContext;
pub use engine::{Codec, DecodeReport, GraphDecoder, GraphEncoder};
pub use error::{Error, Result};
pub use header::StreamHeader;
pub use object::{BaseObject, Graph, Heap, ObjArray, ObjId, ObjList, ObjMap, Object, TypedArray};
pub use protocols::{
    EnumProtocol, ListProtocol, MapProtocol, PrimitiveArrayProtocol, PrimitiveElement, StringProtocol,
    StructuralProtocol, TypedArrayProtocol, UnitProtocol,
};
pub use registry::{ProtocolEntry, Registry, RegistryBuilder, TypeDescriptor};
pub use strategy::Strategy;
pub use structural::{EnumOrdinal, Enumeration, FieldError, FieldKind, FieldValue, Structural, TypeCatalog};

/// Size of the stream header in bytes
pub const HEADER_SIZE: usize = header::StreamHeader::SIZE;

/// Longest generic array (24-bit length field)
pub const MAX_ARRAY_LEN: usize = (1 << 24) - 1;

/// Deepest generic array nesting (8-bit dimension field)
pub const MAX_ARRAY_DIMENSION: u8 = u8::MAX;

/// Default limit on nested chunks
///
/// Encoding and decoding recurse once per nested chunk. The default keeps the
/// deepest path, a chain of structural-fallback objects, inside the 2 MiB
/// stack of a spawned thread in unoptimized builds. Raise it with
/// [`CodecConfig::with_max_depth`] only on threads with a larger stack.
pub const DEFAULT_MAX_DEPTH: usize = 128;
