//! Protocol registry
//!
//! An immutable, ordered list of (type, strategy) pairs. The position of an
//! entry is the class index written on the wire, and the whole list folds into
//! a fingerprint that both ends compare before trusting each other's indices.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::any::TypeId;
use core::cmp::Ordering;

use crate::error::{Error, Result};
use crate::fingerprint::{entry_term, name_hash, FOLD_PRIME};
use crate::object::{BaseObject, ObjList, ObjMap, Object, TypedArray};
use crate::protocols::{
    EnumProtocol, ListProtocol, MapProtocol, PrimitiveArrayProtocol, PrimitiveElement, StringProtocol,
    StructuralProtocol, TypedArrayProtocol, UnitProtocol,
};
use crate::strategy::Strategy;
use crate::structural::{Enumeration, Structural};
use crate::width;

/// Identifier of a runtime type
///
/// Compared by `TypeId`; the name only feeds the fingerprint and diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct TypeDescriptor {
    type_id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    /// Descriptor of `T` named after its Rust type path
    pub fn of<T: Object>() -> Self {
        Self::named::<T>(core::any::type_name::<T>())
    }

    /// Descriptor of `T` with an explicit stable name
    pub fn named<T: Object>(name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name,
        }
    }

    /// Runtime type
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Stable name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeDescriptor {}

impl PartialOrd for TypeDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_id.cmp(&other.type_id)
    }
}

impl core::hash::Hash for TypeDescriptor {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

/// A type paired with its strategy
pub struct ProtocolEntry {
    /// Registered type
    pub descriptor: TypeDescriptor,
    /// Strategy for that type
    pub strategy: Box<dyn Strategy>,
}

impl ProtocolEntry {
    /// Pair `T` with `strategy`
    pub fn new<T: Object>(strategy: impl Strategy + 'static) -> Self {
        Self {
            descriptor: TypeDescriptor::of::<T>(),
            strategy: Box::new(strategy),
        }
    }
}

impl core::fmt::Debug for ProtocolEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProtocolEntry")
            .field("descriptor", &self.descriptor)
            .field("strategy", &format_args!("{:#010x}", self.strategy.fingerprint()))
            .finish()
    }
}

/// Immutable registry shared by every encode and decode call
#[derive(Debug)]
pub struct Registry {
    entries: Vec<ProtocolEntry>,
    index: BTreeMap<TypeId, usize>,
    fingerprint: u32,
    class_index_width: usize,
}

impl Registry {
    /// Build a registry from entries in class-index order
    ///
    /// Returns `Error::DuplicateType` if a type appears twice.
    pub fn new(entries: Vec<ProtocolEntry>) -> Result<Self> {
        let mut index = BTreeMap::new();
        let mut fingerprint = 0u32;

        for (position, entry) in entries.iter().enumerate() {
            if index.insert(entry.descriptor.type_id, position).is_some() {
                return Err(Error::DuplicateType {
                    type_name: entry.descriptor.name,
                });
            }
            let term = entry_term(name_hash(entry.descriptor.name), entry.strategy.fingerprint());
            fingerprint = fingerprint.wrapping_mul(FOLD_PRIME).wrapping_add(term);
        }

        let class_index_width = width::width_for_count(entries.len() as u64);
        Ok(Self {
            entries,
            index,
            fingerprint,
            class_index_width,
        })
    }

    /// Start a registry builder
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Identification number compared between encoder and decoder
    #[inline]
    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    /// Byte width of a class index in streams produced by this registry
    #[inline]
    pub fn class_index_width(&self) -> usize {
        self.class_index_width
    }

    /// Class index of a runtime type
    #[inline]
    pub fn index_of(&self, type_id: TypeId) -> Option<usize> {
        self.index.get(&type_id).copied()
    }

    /// Class index of `T`
    #[inline]
    pub fn index_of_type<T: Object>(&self) -> Option<usize> {
        self.index_of(TypeId::of::<T>())
    }

    /// Entry at class index `index`, or `None` when out of range
    #[inline]
    pub fn entry(&self, index: usize) -> Option<&ProtocolEntry> {
        self.entries.get(index)
    }

    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry has no entries
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in class-index order
    pub fn iter(&self) -> impl Iterator<Item = &ProtocolEntry> {
        self.entries.iter()
    }
}

/// Incremental registry construction
///
/// ```
/// use graphbit::{ObjList, Registry};
///
/// let registry = Registry::builder()
///     .register_string()
///     .register_list()
///     .build()?;
/// assert_eq!(registry.len(), 3); // BaseObject, String, ObjList
/// assert_eq!(registry.index_of_type::<ObjList>(), Some(2));
/// # Ok::<(), graphbit::Error>(())
/// ```
#[derive(Debug)]
pub struct RegistryBuilder {
    entries: Vec<ProtocolEntry>,
    base_object: bool,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// Create a builder that will prepend [`BaseObject`]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            base_object: true,
        }
    }

    /// Whether [`BaseObject`] is registered at class index 0
    pub fn with_base_object(mut self, enabled: bool) -> Self {
        self.base_object = enabled;
        self
    }

    /// Register `T` with a custom strategy
    pub fn register<T: Object>(self, strategy: impl Strategy + 'static) -> Self {
        self.register_named::<T>(core::any::type_name::<T>(), strategy)
    }

    /// Register `T` under an explicit stable name
    pub fn register_named<T: Object>(
        mut self,
        name: &'static str,
        strategy: impl Strategy + 'static,
    ) -> Self {
        self.entries.push(ProtocolEntry {
            descriptor: TypeDescriptor::named::<T>(name),
            strategy: Box::new(strategy),
        });
        self
    }

    /// Register a payload-free type built from `Default`
    pub fn register_unit<T: Object + Default>(self) -> Self {
        self.register::<T>(UnitProtocol::<T>::new())
    }

    /// Register `String`
    pub fn register_string(self) -> Self {
        self.register::<alloc::string::String>(StringProtocol)
    }

    /// Register an enumeration by ordinal
    pub fn register_enum<T: Enumeration>(self) -> Self {
        self.register::<T>(EnumProtocol::<T>::new())
    }

    /// Register [`ObjList`]
    pub fn register_list(self) -> Self {
        self.register::<ObjList>(ListProtocol)
    }

    /// Register [`ObjMap`]
    pub fn register_map(self) -> Self {
        self.register::<ObjMap>(MapProtocol)
    }

    /// Register `TypedArray<T>`, writing its items by value when `value_type` is set
    pub fn register_typed_array<T: 'static>(self, value_type: bool) -> Self {
        self.register::<TypedArray<T>>(TypedArrayProtocol::<T>::new(value_type))
    }

    /// Register `Vec<T>` of a primitive element type
    pub fn register_primitive_array<T: PrimitiveElement>(self) -> Self {
        self.register::<Vec<T>>(PrimitiveArrayProtocol::<T>::new())
    }

    /// Register `Vec<T>` for every primitive element type
    pub fn register_primitive_arrays(self) -> Self {
        self.register_primitive_array::<u8>()
            .register_primitive_array::<i8>()
            .register_primitive_array::<i16>()
            .register_primitive_array::<u16>()
            .register_primitive_array::<i32>()
            .register_primitive_array::<u32>()
            .register_primitive_array::<i64>()
            .register_primitive_array::<u64>()
            .register_primitive_array::<f32>()
            .register_primitive_array::<f64>()
            .register_primitive_array::<bool>()
            .register_primitive_array::<char>()
    }

    /// Register a structural type with a field-by-field strategy
    pub fn register_structural<T: Object + Structural + Default>(self) -> Self {
        self.register::<T>(StructuralProtocol::<T>::new())
    }

    /// Check whether `T` is already registered
    pub fn contains<T: Object>(&self) -> bool {
        let type_id = TypeId::of::<T>();
        self.entries
            .iter()
            .any(|entry| entry.descriptor.type_id == type_id)
    }

    /// Build the registry
    pub fn build(self) -> Result<Registry> {
        let mut entries = self.entries;
        if self.base_object && !entries.iter().any(|e| e.descriptor.type_id == TypeId::of::<BaseObject>()) {
            entries.insert(0, ProtocolEntry::new::<BaseObject>(UnitProtocol::<BaseObject>::new()));
        }
        Registry::new(entries)
    }
}
