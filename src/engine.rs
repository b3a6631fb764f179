//! Chunk dispatch engine
//!
//! [`Codec`] turns a heap of objects into a tagged byte stream and back. For
//! every object it meets, the encoder picks one chunk kind:
//!
//! 1. absent object: `NULL`
//! 2. already written by reference: `OLD_REF` with its table index
//! 3. registered and requested by value: `VALUE_TYPE`, no identity
//! 4. registered: `NEW_REF`, takes the next table index
//! 5. [`ObjArray`] of a registered element type: `GENERIC_ARRAY`
//! 6. anything else: the configured [`UnknownTypeReaction`]
//!
//! The decoder mirrors this, registering every identity-bearing object in the
//! reference table after construction and before its payload is read.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::{Deref, DerefMut};

use tracing::{debug, trace, warn};

use crate::chunk::ChunkTag;
use crate::config::{CodecConfig, FingerprintPolicy, UnknownTypeReaction};
use crate::decoder::DecodeContext;
use crate::encoder::EncodeContext;
use crate::error::{Error, Result};
use crate::header::StreamHeader;
use crate::object::{Graph, Heap, ObjArray, ObjId, Object};
use crate::registry::{ProtocolEntry, Registry, TypeDescriptor};
use crate::structural::{read_fields, write_fields, TypeCatalog};
use crate::MAX_ARRAY_LEN;

/// What a decode found besides the graph itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeReport {
    /// Fingerprint of the local registry
    pub expected_fingerprint: u32,
    /// Fingerprint carried by the stream
    pub found_fingerprint: u32,
    /// Reference capacity declared by the header
    pub declared_capacity: u32,
    /// References the body actually registered
    pub references_used: usize,
    /// Bytes left after the root chunk
    pub trailing_bytes: usize,
}

impl DecodeReport {
    /// Whether both registries agreed
    pub fn fingerprint_matches(&self) -> bool {
        self.expected_fingerprint == self.found_fingerprint
    }
}

/// Object-graph codec bound to one registry
///
/// A codec holds no per-call state; share it (or its registry) freely across
/// threads.
///
/// Encoding and decoding recurse once per nested chunk, and every link that
/// reaches a new object nests one level deeper. A ring or linked chain of `n`
/// objects therefore needs `n + 1` levels and fails with
/// [`Error::DepthExceeded`] beyond [`CodecConfig::max_depth`]
/// ([`DEFAULT_MAX_DEPTH`](crate::DEFAULT_MAX_DEPTH) by default). Longer chains
/// need a raised limit and a thread stack to match.
///
/// ```
/// use std::sync::Arc;
/// use graphbit::{Codec, Heap, ObjList, Registry};
///
/// let registry = Arc::new(Registry::builder().register_string().register_list().build()?);
/// let codec = Codec::new(registry);
///
/// let mut heap = Heap::new();
/// let name = heap.insert(String::from("shared"));
/// let list = heap.insert(ObjList(vec![Some(name), Some(name), None]));
///
/// let bytes = codec.encode(&heap, Some(list))?;
/// let graph = codec.decode(&bytes)?;
///
/// let items = &graph.root_as::<ObjList>().unwrap().0;
/// assert_eq!(items[0], items[1]);
/// assert_eq!(graph.heap.get::<String>(items[0].unwrap()).unwrap(), "shared");
/// # Ok::<(), graphbit::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Codec {
    registry: Arc<Registry>,
    catalog: TypeCatalog,
    config: CodecConfig,
}

impl Codec {
    /// Create a codec with the default configuration
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_config(registry, CodecConfig::default())
    }

    /// Create a codec with an explicit configuration
    pub fn with_config(registry: Arc<Registry>, config: CodecConfig) -> Self {
        Self {
            registry,
            catalog: TypeCatalog::new(),
            config,
        }
    }

    /// Use `catalog` to rebuild unregistered types by name
    pub fn with_catalog(mut self, catalog: TypeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Change the reaction to unregistered types
    pub fn set_unknown_type_reaction(&mut self, reaction: UnknownTypeReaction) {
        self.config.unknown_type_reaction = reaction;
    }

    /// Registry in use
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Catalog in use
    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Configuration in use
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode the graph reachable from `root`
    #[tracing::instrument(level = "debug", skip_all, fields(objects = heap.len()))]
    pub fn encode(&self, heap: &Heap, root: Option<ObjId>) -> Result<Vec<u8>> {
        let width = self.registry.class_index_width();
        let mut enc = GraphEncoder {
            codec: self,
            heap,
            ctx: EncodeContext::new(width, self.config.initial_capacity),
            depth: 0,
        };

        // class_index_width is at most 4
        enc.ctx
            .begin(&StreamHeader::new(self.registry.fingerprint(), width as u8, 0))?;
        enc.write_ref(root)?;

        let references = enc.ctx.reference_count();
        let bytes = enc.ctx.finish();
        debug!(bytes = bytes.len(), references, "encoded object graph");
        Ok(bytes)
    }

    /// Decode a stream produced by [`encode`](Self::encode)
    pub fn decode(&self, bytes: &[u8]) -> Result<Graph> {
        self.decode_with_report(bytes).map(|(graph, _)| graph)
    }

    /// Decode a stream and report header and trailing-byte details
    #[tracing::instrument(level = "debug", skip_all, fields(bytes = bytes.len()))]
    pub fn decode_with_report(&self, bytes: &[u8]) -> Result<(Graph, DecodeReport)> {
        let (ctx, header) = DecodeContext::with_header(bytes)?;

        let expected = self.registry.fingerprint();
        if header.fingerprint != expected {
            match self.config.fingerprint_policy {
                FingerprintPolicy::Reject => {
                    return Err(Error::ProtocolMismatch {
                        expected,
                        found: header.fingerprint,
                    });
                }
                FingerprintPolicy::Warn => {
                    warn!(
                        expected,
                        found = header.fingerprint,
                        "registry fingerprint mismatch, decoding anyway"
                    );
                }
            }
        }

        let objects = (header.reference_capacity as usize).min(ctx.remaining());
        let mut dec = GraphDecoder {
            codec: self,
            ctx,
            heap: Heap::with_capacity(objects),
            depth: 0,
        };
        let root = dec.read_chunk()?;

        let trailing = dec.ctx.remaining();
        if trailing > 0 {
            warn!(trailing, "unconsumed bytes after root chunk");
        }

        let report = DecodeReport {
            expected_fingerprint: expected,
            found_fingerprint: header.fingerprint,
            declared_capacity: header.reference_capacity,
            references_used: dec.ctx.reference_count(),
            trailing_bytes: trailing,
        };
        debug!(
            objects = dec.heap.len(),
            references = report.references_used,
            "decoded object graph"
        );

        Ok((
            Graph {
                heap: dec.heap,
                root,
            },
            report,
        ))
    }
}

/// Encode-side handle given to strategies
///
/// Derefs to [`EncodeContext`] for primitive writes.
pub struct GraphEncoder<'a> {
    codec: &'a Codec,
    heap: &'a Heap,
    ctx: EncodeContext,
    depth: usize,
}

impl<'a> GraphEncoder<'a> {
    /// Write a link with reference semantics
    #[inline]
    pub fn write_ref(&mut self, id: Option<ObjId>) -> Result<()> {
        self.write_chunk(id, false)
    }

    /// Write a link with value semantics
    ///
    /// Falls back to reference semantics for types without a strategy.
    #[inline]
    pub fn write_value(&mut self, id: Option<ObjId>) -> Result<()> {
        self.write_chunk(id, true)
    }

    /// Write one chunk for `id`
    pub fn write_chunk(&mut self, id: Option<ObjId>, value_type: bool) -> Result<()> {
        let limit = self.codec.config.max_depth;
        if self.depth >= limit {
            return Err(Error::DepthExceeded { limit });
        }
        self.depth += 1;
        let result = self.dispatch(id, value_type);
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, id: Option<ObjId>, value_type: bool) -> Result<()> {
        let Some(id) = id else {
            self.trace_chunk(ChunkTag::Null);
            return self.ctx.put_chunk_tag(ChunkTag::Null);
        };

        if let Some(index) = self.ctx.reference_of(id) {
            self.trace_chunk(ChunkTag::OldRef);
            self.ctx.put_chunk_tag(ChunkTag::OldRef)?;
            return self.ctx.put_old_reference(index);
        }

        let heap = self.heap;
        let codec = self.codec;
        let registry: &Registry = &codec.registry;
        let object = heap.object(id).ok_or(Error::DanglingObject(id.index()))?;

        if let Some(class_index) = registry.index_of(object.as_any().type_id()) {
            let entry = registry
                .entry(class_index)
                .ok_or(Error::InvalidClassIndex {
                    index: class_index,
                    registered: registry.len(),
                })?;
            let tag = if value_type {
                ChunkTag::ValueType
            } else {
                ChunkTag::NewRef
            };
            self.trace_chunk(tag);
            self.ctx.put_chunk_tag(tag)?;
            if !value_type {
                self.ctx.allocate_reference(id);
            }
            self.ctx.put_class_index(class_index)?;
            return entry.strategy.write(self, id);
        }

        if let Some(array) = object.as_any().downcast_ref::<ObjArray>() {
            if let Some(class_index) = registry.index_of(array.element.type_id()) {
                return self.write_generic_array(id, array, class_index);
            }
        }

        self.write_unknown(id, object)
    }

    fn write_generic_array(&mut self, id: ObjId, array: &ObjArray, class_index: usize) -> Result<()> {
        if array.dimension == 0 {
            return Err(Error::InvalidArrayDimension);
        }
        if array.items.len() > MAX_ARRAY_LEN {
            return Err(Error::ArrayTooLong(array.items.len()));
        }

        self.trace_chunk(ChunkTag::GenericArray);
        self.ctx.put_chunk_tag(ChunkTag::GenericArray)?;
        self.ctx.allocate_reference(id);
        self.ctx.put_class_index(class_index)?;
        self.ctx.put_u8(array.dimension)?;
        self.ctx.put_u24(array.items.len() as u32)?;
        for item in &array.items {
            self.write_ref(*item)?;
        }
        Ok(())
    }

    fn write_unknown(&mut self, id: ObjId, object: &'a dyn Object) -> Result<()> {
        let type_name = object.qualified_name();
        let reaction = self.codec.config.unknown_type_reaction;

        match reaction {
            UnknownTypeReaction::Exception => return Err(Error::UnsupportedType { type_name }),
            UnknownTypeReaction::WriteNull => {
                self.trace_chunk(ChunkTag::Null);
                return self.ctx.put_chunk_tag(ChunkTag::Null);
            }
            UnknownTypeReaction::WriteAndWarning => warn_unknown(type_name),
            UnknownTypeReaction::Write => {}
        }

        if let Some(ordinal) = object.as_enum() {
            self.trace_chunk(ChunkTag::UnknownEnum);
            self.ctx.put_chunk_tag(ChunkTag::UnknownEnum)?;
            self.ctx.put_identifier(type_name)?;
            let value = u32::try_from(ordinal.ordinal).map_err(|_| Error::ValueTooLarge {
                value: ordinal.ordinal as u64,
                width: 4,
            })?;
            return self.ctx.put_uint_for(ordinal.variant_count as u64, value);
        }

        if let Some(structural) = object.as_structural() {
            self.trace_chunk(ChunkTag::UnknownObj);
            self.ctx.put_chunk_tag(ChunkTag::UnknownObj)?;
            self.ctx.allocate_reference(id);
            self.ctx.put_identifier(type_name)?;
            let fields = structural.fields();
            return write_fields(self, &fields);
        }

        Err(Error::UnsupportedType { type_name })
    }

    // log calls stay out of line to keep the recursive frames small
    #[inline(never)]
    fn trace_chunk(&self, tag: ChunkTag) {
        trace!(depth = self.depth, offset = self.ctx.position(), tag = tag.name(), "write chunk");
    }

    /// Borrow object `id` as a `T`
    ///
    /// The borrow is tied to the heap, not to the encoder, so it may be held
    /// across nested writes.
    #[inline]
    pub fn object<T: Object>(&self, id: ObjId) -> Result<&'a T> {
        self.heap.try_get(id)
    }

    /// Heap being encoded
    #[inline]
    pub fn heap(&self) -> &'a Heap {
        self.heap
    }

    /// Registry in use
    #[inline]
    pub fn registry(&self) -> &'a Registry {
        &self.codec.registry
    }

    /// Class index of `T`, if registered
    #[inline]
    pub fn class_index_of<T: Object>(&self) -> Option<usize> {
        self.codec.registry.index_of_type::<T>()
    }
}

#[cold]
#[inline(never)]
fn warn_unknown(type_name: &str) {
    warn!(type_name, "type is not part of the protocol, writing it structurally");
}

impl Deref for GraphEncoder<'_> {
    type Target = EncodeContext;

    fn deref(&self) -> &Self::Target {
        &self.ctx
    }
}

impl DerefMut for GraphEncoder<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ctx
    }
}

/// Decode-side handle given to strategies
///
/// Derefs to [`DecodeContext`] for primitive reads.
pub struct GraphDecoder<'a> {
    codec: &'a Codec,
    ctx: DecodeContext<'a>,
    heap: Heap,
    depth: usize,
}

impl<'a> GraphDecoder<'a> {
    /// Read one chunk and return the handle it resolves to
    pub fn read_chunk(&mut self) -> Result<Option<ObjId>> {
        let limit = self.codec.config.max_depth;
        if self.depth >= limit {
            return Err(Error::DepthExceeded { limit });
        }
        self.depth += 1;
        let result = self.dispatch();
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self) -> Result<Option<ObjId>> {
        let offset = self.ctx.position();
        let tag = self.ctx.get_chunk_tag()?;
        self.trace_chunk(offset, tag);

        match tag {
            ChunkTag::Null => Ok(None),
            ChunkTag::OldRef => self.ctx.get_old_reference().map(Some),
            ChunkTag::ValueType => {
                let entry = self.read_entry()?;
                let object = entry.strategy.create(self)?;
                let id = self.heap.insert_boxed(object);
                entry.strategy.read(self, id)?;
                Ok(Some(id))
            }
            ChunkTag::NewRef => {
                let entry = self.read_entry()?;
                let slot = self.ctx.reference_count();
                let object = entry.strategy.create(self)?;
                if self.ctx.reference_count() != slot {
                    return Err(Error::NestedCreate {
                        type_name: entry.descriptor.name(),
                    });
                }
                let id = self.heap.insert_boxed(object);
                self.ctx.push_reference(id)?;
                entry.strategy.read(self, id)?;
                Ok(Some(id))
            }
            ChunkTag::GenericArray => self.read_generic_array().map(Some),
            ChunkTag::UnknownObj => self.read_unknown_object().map(Some),
            ChunkTag::UnknownEnum => self.read_unknown_enum().map(Some),
            ChunkTag::Illegal => Err(Error::InvalidChunkTag { tag: 0, offset }),
        }
    }

    #[inline(never)]
    fn trace_chunk(&self, offset: usize, tag: ChunkTag) {
        trace!(depth = self.depth, offset, tag = tag.name(), "read chunk");
    }

    fn read_entry(&mut self) -> Result<&'a ProtocolEntry> {
        let index = self.ctx.get_class_index()?;
        let codec = self.codec;
        let registry: &'a Registry = &codec.registry;
        registry.entry(index).ok_or(Error::InvalidClassIndex {
            index,
            registered: registry.len(),
        })
    }

    fn read_generic_array(&mut self) -> Result<ObjId> {
        let element = self.read_entry()?.descriptor;
        let dimension = self.ctx.get_u8()?;
        if dimension == 0 {
            return Err(Error::CorruptPayload("generic array of dimension 0"));
        }
        let len = self.ctx.get_u24()? as usize;
        // every item is at least one tag byte
        if len > self.ctx.remaining() {
            return Err(Error::CorruptPayload("array length exceeds remaining bytes"));
        }

        let id = self.heap.insert(ObjArray::new(element, dimension, Vec::new()));
        self.ctx.push_reference(id)?;

        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.read_chunk()?);
        }
        self.heap.try_get_mut::<ObjArray>(id)?.items = items;
        Ok(id)
    }

    fn read_unknown_object(&mut self) -> Result<ObjId> {
        let name = self.ctx.get_identifier()?;
        let object = self
            .codec
            .catalog
            .construct(&name)
            .ok_or_else(|| Error::UnknownObjectType {
                type_name: name.clone(),
            })?;
        let id = self.heap.insert_boxed(object);
        self.ctx.push_reference(id)?;
        read_fields(self, id, &name)?;
        Ok(id)
    }

    fn read_unknown_enum(&mut self) -> Result<ObjId> {
        let name = self.ctx.get_identifier()?;
        let catalog = &self.codec.catalog;
        let count = catalog
            .variant_count(&name)
            .ok_or_else(|| Error::UnknownEnumType {
                type_name: name.clone(),
            })?;
        let ordinal = self.ctx.get_uint_for(count as u64)? as usize;
        let variant = catalog
            .construct_variant(&name, ordinal)
            .ok_or(Error::InvalidOrdinal {
                type_name: name,
                ordinal,
            })?;
        Ok(self.heap.insert_boxed(variant))
    }

    /// Borrow decoded object `id` as a `T`
    #[inline]
    pub fn object<T: Object>(&self, id: ObjId) -> Result<&T> {
        self.heap.try_get(id)
    }

    /// Mutably borrow decoded object `id` as a `T`
    #[inline]
    pub fn object_mut<T: Object>(&mut self, id: ObjId) -> Result<&mut T> {
        self.heap.try_get_mut(id)
    }

    /// Store an object built by a strategy outside the chunk flow
    #[inline]
    pub fn insert<T: Object>(&mut self, value: T) -> ObjId {
        self.heap.insert(value)
    }

    /// Heap under construction
    #[inline]
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Registry in use
    #[inline]
    pub fn registry(&self) -> &'a Registry {
        &self.codec.registry
    }

    /// Registered type at class index `index`
    #[inline]
    pub fn descriptor_at(&self, index: usize) -> Option<TypeDescriptor> {
        self.codec.registry.entry(index).map(|entry| entry.descriptor)
    }
}

impl<'a> Deref for GraphDecoder<'a> {
    type Target = DecodeContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.ctx
    }
}

impl DerefMut for GraphDecoder<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ctx
    }
}
