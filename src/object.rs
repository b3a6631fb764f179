//! Arena object model
//!
//! Objects live in a [`Heap`] and are addressed by [`ObjId`] handles. A handle
//! is the identity of an object: two handles are the same object exactly when
//! they are equal, regardless of what the objects contain. Links between
//! objects are stored as `Option<ObjId>`, which is what lets a graph contain
//! shared nodes and cycles without reference counting.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::marker::PhantomData;

use crate::error::{Error, Result};
use crate::registry::TypeDescriptor;
use crate::structural::{EnumOrdinal, Structural};

/// Handle to an object stored in a [`Heap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjId(usize);

impl ObjId {
    /// Handle for the object at arena slot `index`
    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Arena slot of this handle
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl core::fmt::Display for ObjId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Upcast to `Any`, implemented for every `'static` type
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;
    /// Borrow as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A value that can live in a [`Heap`]
///
/// Plain types only need an empty impl. Types that should survive encoding
/// without a registered strategy override [`as_structural`](Self::as_structural)
/// or [`as_enum`](Self::as_enum).
///
/// ```
/// use graphbit::Object;
///
/// #[derive(Default)]
/// struct Marker;
///
/// impl Object for Marker {}
/// ```
pub trait Object: AsAny + 'static {
    /// Field access for the structural fallback
    fn as_structural(&self) -> Option<&dyn Structural> {
        None
    }

    /// Mutable field access for the structural fallback
    fn as_structural_mut(&mut self) -> Option<&mut dyn Structural> {
        None
    }

    /// Ordinal for the enumeration fallback
    fn as_enum(&self) -> Option<EnumOrdinal> {
        None
    }

    /// Name written on the wire when no strategy is registered
    fn qualified_name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

impl core::fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Object")
            .field("type", &self.qualified_name())
            .finish_non_exhaustive()
    }
}

impl Object for String {}

/// Root type of every registry
///
/// Registered first by default, so a heterogeneous [`ObjArray`] can name it as
/// its element type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BaseObject;

impl Object for BaseObject {}

/// Ordered list of references, encoded by [`ListProtocol`](crate::protocols::ListProtocol)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjList(pub Vec<Option<ObjId>>);

impl ObjList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }
}

impl Object for ObjList {}

/// Association list of key and value references, encoded by
/// [`MapProtocol`](crate::protocols::MapProtocol)
///
/// Keys compare by identity. Entries keep insertion order, so a decoded map
/// lists its entries in the order they were written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjMap {
    /// Key/value pairs in insertion order
    pub entries: Vec<(Option<ObjId>, Option<ObjId>)>,
}

impl ObjMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `value`, returning the previous value of `key`
    pub fn insert(&mut self, key: Option<ObjId>, value: Option<ObjId>) -> Option<Option<ObjId>> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(core::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Value bound to `key`
    pub fn get(&self, key: Option<ObjId>) -> Option<Option<ObjId>> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| *value)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Object for ObjMap {}

/// Array of references to `T`, registered as its own type
///
/// Unlike [`ObjArray`], each `TypedArray<T>` is a distinct registered type, so
/// its strategy can write the items with value semantics.
pub struct TypedArray<T> {
    /// Array slots
    pub items: Vec<Option<ObjId>>,
    element: PhantomData<fn() -> T>,
}

impl<T> TypedArray<T> {
    /// Create an array of `items`
    pub fn new(items: Vec<Option<ObjId>>) -> Self {
        Self {
            items,
            element: PhantomData,
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the array has no slots
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for TypedArray<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> Clone for TypedArray<T> {
    fn clone(&self) -> Self {
        Self::new(self.items.clone())
    }
}

impl<T> PartialEq for TypedArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T> core::fmt::Debug for TypedArray<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypedArray")
            .field("element", &core::any::type_name::<T>())
            .field("items", &self.items)
            .finish()
    }
}

impl<T: 'static> Object for TypedArray<T> {}

/// Array of references, encoded as a generic array chunk
///
/// `element` is the deepest element type. Items of an array with
/// `dimension > 1` are themselves `ObjArray`s (or absent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjArray {
    /// Deepest element type
    pub element: TypeDescriptor,
    /// Nesting depth, at least 1
    pub dimension: u8,
    /// Array slots
    pub items: Vec<Option<ObjId>>,
}

impl ObjArray {
    /// Create an array of `items` with explicit element type and dimension
    pub fn new(element: TypeDescriptor, dimension: u8, items: Vec<Option<ObjId>>) -> Self {
        Self {
            element,
            dimension,
            items,
        }
    }

    /// One-dimensional array of `T`
    pub fn of<T: Object>(items: Vec<Option<ObjId>>) -> Self {
        Self::new(TypeDescriptor::of::<T>(), 1, items)
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the array has no slots
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Object for ObjArray {}

/// Arena owning every object of a graph
#[derive(Default)]
pub struct Heap {
    objects: Vec<Box<dyn Object>>,
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty heap with room for `capacity` objects
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            objects: Vec::with_capacity(capacity),
        }
    }

    /// Store `value` and return its handle
    pub fn insert<T: Object>(&mut self, value: T) -> ObjId {
        self.insert_boxed(Box::new(value))
    }

    /// Store an already boxed object and return its handle
    pub fn insert_boxed(&mut self, value: Box<dyn Object>) -> ObjId {
        let id = ObjId(self.objects.len());
        self.objects.push(value);
        id
    }

    /// Borrow the object behind `id`
    pub fn object(&self, id: ObjId) -> Option<&dyn Object> {
        self.objects.get(id.0).map(|boxed| &**boxed)
    }

    /// Mutably borrow the object behind `id`
    pub fn object_mut(&mut self, id: ObjId) -> Option<&mut dyn Object> {
        match self.objects.get_mut(id.0) {
            Some(boxed) => Some(&mut **boxed),
            None => None,
        }
    }

    /// Borrow the object behind `id` as a `T`
    pub fn get<T: Object>(&self, id: ObjId) -> Option<&T> {
        self.object(id)?.as_any().downcast_ref()
    }

    /// Mutably borrow the object behind `id` as a `T`
    pub fn get_mut<T: Object>(&mut self, id: ObjId) -> Option<&mut T> {
        self.object_mut(id)?.as_any_mut().downcast_mut()
    }

    /// Like [`get`](Self::get), distinguishing a missing handle from a wrong type
    pub fn try_get<T: Object>(&self, id: ObjId) -> Result<&T> {
        self.object(id)
            .ok_or(Error::DanglingObject(id.0))?
            .as_any()
            .downcast_ref()
            .ok_or(Error::TypeMismatch {
                id: id.0,
                expected: core::any::type_name::<T>(),
            })
    }

    /// Like [`get_mut`](Self::get_mut), distinguishing a missing handle from a wrong type
    pub fn try_get_mut<T: Object>(&mut self, id: ObjId) -> Result<&mut T> {
        self.object_mut(id)
            .ok_or(Error::DanglingObject(id.0))?
            .as_any_mut()
            .downcast_mut()
            .ok_or(Error::TypeMismatch {
                id: id.0,
                expected: core::any::type_name::<T>(),
            })
    }

    /// Runtime type of the object behind `id`
    pub fn type_id_of(&self, id: ObjId) -> Option<TypeId> {
        self.object(id).map(|object| object.as_any().type_id())
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the heap is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate over every handle in allocation order
    pub fn ids(&self) -> impl Iterator<Item = ObjId> {
        (0..self.objects.len()).map(ObjId)
    }
}

impl core::fmt::Debug for Heap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.objects.iter()).finish()
    }
}

/// A decoded object graph
#[derive(Debug, Default)]
pub struct Graph {
    /// Every decoded object
    pub heap: Heap,
    /// The top-level object, `None` when a null root was encoded
    pub root: Option<ObjId>,
}

impl Graph {
    /// Borrow the root object as a `T`
    pub fn root_as<T: Object>(&self) -> Option<&T> {
        self.heap.get(self.root?)
    }
}
