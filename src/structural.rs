//! Structural fallback
//!
//! Types without a registered strategy can still be encoded when they describe
//! their own fields through [`Structural`], or expose an ordinal through
//! [`Enumeration`]. The decoder rebuilds them by name, using constructors
//! listed in a [`TypeCatalog`].
//!
//! Each field is written as its name, a [`FieldKind`] byte and the value, so a
//! decoder can step over fields its own version of the type no longer has.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::ToString;
use alloc::vec::Vec;

use tracing::debug;

use crate::engine::{GraphDecoder, GraphEncoder};
use crate::error::{Error, Result};
use crate::object::{ObjId, Object};

/// Wire tag of a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldKind {
    /// `bool`
    Bool = 0,
    /// `i8`
    I8 = 1,
    /// `i16`
    I16 = 2,
    /// `i32`
    I32 = 3,
    /// `i64`
    I64 = 4,
    /// `u8`
    U8 = 5,
    /// `u16`
    U16 = 6,
    /// `u32`
    U32 = 7,
    /// `u64`
    U64 = 8,
    /// `f32`
    F32 = 9,
    /// `f64`
    F64 = 10,
    /// `char`, written as its 4-byte scalar value
    Char = 11,
    /// Object reference
    Ref = 12,
    /// Object written by value
    Value = 13,
}

impl FieldKind {
    /// Wire byte of this kind
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire byte
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => FieldKind::Bool,
            1 => FieldKind::I8,
            2 => FieldKind::I16,
            3 => FieldKind::I32,
            4 => FieldKind::I64,
            5 => FieldKind::U8,
            6 => FieldKind::U16,
            7 => FieldKind::U32,
            8 => FieldKind::U64,
            9 => FieldKind::F32,
            10 => FieldKind::F64,
            11 => FieldKind::Char,
            12 => FieldKind::Ref,
            13 => FieldKind::Value,
            _ => return None,
        })
    }
}

/// Value of one field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// `bool`
    Bool(bool),
    /// `i8`
    I8(i8),
    /// `i16`
    I16(i16),
    /// `i32`
    I32(i32),
    /// `i64`
    I64(i64),
    /// `u8`
    U8(u8),
    /// `u16`
    U16(u16),
    /// `u32`
    U32(u32),
    /// `u64`
    U64(u64),
    /// `f32`
    F32(f32),
    /// `f64`
    F64(f64),
    /// `char`
    Char(char),
    /// Link with reference semantics
    Ref(Option<ObjId>),
    /// Link with value semantics, decoded as a fresh instance
    Value(Option<ObjId>),
}

impl FieldValue {
    /// Kind tag of this value
    pub const fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::I8(_) => FieldKind::I8,
            FieldValue::I16(_) => FieldKind::I16,
            FieldValue::I32(_) => FieldKind::I32,
            FieldValue::I64(_) => FieldKind::I64,
            FieldValue::U8(_) => FieldKind::U8,
            FieldValue::U16(_) => FieldKind::U16,
            FieldValue::U32(_) => FieldKind::U32,
            FieldValue::U64(_) => FieldKind::U64,
            FieldValue::F32(_) => FieldKind::F32,
            FieldValue::F64(_) => FieldKind::F64,
            FieldValue::Char(_) => FieldKind::Char,
            FieldValue::Ref(_) => FieldKind::Ref,
            FieldValue::Value(_) => FieldKind::Value,
        }
    }
}

/// Why a field could not be assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    /// No field of that name; skipped on decode
    Missing,
    /// Field exists but cannot hold the value; aborts the decode
    Mismatch,
}

/// A type that lists and assigns its own fields
///
/// `fields` must return the same names in the same order on every call.
pub trait Structural {
    /// Current field values in declaration order
    fn fields(&self) -> Vec<(&'static str, FieldValue)>;

    /// Assign one field by name
    fn set_field(&mut self, name: &str, value: FieldValue) -> core::result::Result<(), FieldError>;
}

/// Ordinal of an enumeration value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumOrdinal {
    /// Position of the value among all variants
    pub ordinal: usize,
    /// Number of variants of the type
    pub variant_count: usize,
}

impl EnumOrdinal {
    /// Ordinal of `value`
    pub fn of<T: Enumeration>(value: &T) -> Self {
        Self {
            ordinal: value.ordinal(),
            variant_count: T::VARIANTS.len(),
        }
    }
}

/// A fieldless enum identified by its ordinal
///
/// ```
/// use graphbit::{EnumOrdinal, Enumeration, Object};
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Suit { Hearts, Spades }
///
/// impl Enumeration for Suit {
///     const VARIANTS: &'static [Self] = &[Suit::Hearts, Suit::Spades];
///     fn ordinal(&self) -> usize { *self as usize }
/// }
///
/// impl Object for Suit {
///     fn as_enum(&self) -> Option<EnumOrdinal> { Some(EnumOrdinal::of(self)) }
/// }
///
/// assert_eq!(EnumOrdinal::of(&Suit::Spades).ordinal, 1);
/// ```
pub trait Enumeration: Object + Copy {
    /// Every variant, indexed by ordinal
    const VARIANTS: &'static [Self];

    /// Position of `self` in [`VARIANTS`](Self::VARIANTS)
    fn ordinal(&self) -> usize;
}

type Constructor = fn() -> Box<dyn Object>;

#[derive(Clone, Copy)]
struct EnumEntry {
    variant_count: usize,
    variant: fn(usize) -> Option<Box<dyn Object>>,
}

fn construct_default<T: Object + Default>() -> Box<dyn Object> {
    Box::new(T::default())
}

fn construct_variant<T: Enumeration>(ordinal: usize) -> Option<Box<dyn Object>> {
    T::VARIANTS
        .get(ordinal)
        .map(|variant| Box::new(*variant) as Box<dyn Object>)
}

/// Constructors for types decoded by name
#[derive(Clone, Default)]
pub struct TypeCatalog {
    objects: BTreeMap<&'static str, Constructor>,
    enums: BTreeMap<&'static str, EnumEntry>,
}

impl TypeCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// List a structural type under its qualified name
    pub fn register_structural<T: Object + Structural + Default>(mut self) -> Self {
        let name = T::default().qualified_name();
        self.objects.insert(name, construct_default::<T>);
        self
    }

    /// List an enumeration under its qualified name
    pub fn register_enum<T: Enumeration>(mut self) -> Self {
        let name = T::VARIANTS
            .first()
            .map_or(core::any::type_name::<T>(), |variant| variant.qualified_name());
        self.enums.insert(
            name,
            EnumEntry {
                variant_count: T::VARIANTS.len(),
                variant: construct_variant::<T>,
            },
        );
        self
    }

    /// Check whether a structural type of that name is listed
    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name) || self.enums.contains_key(name)
    }

    /// Default instance of the structural type `name`
    pub fn construct(&self, name: &str) -> Option<Box<dyn Object>> {
        self.objects.get(name).map(|construct| construct())
    }

    /// Variant count of the enumeration `name`
    pub fn variant_count(&self, name: &str) -> Option<usize> {
        self.enums.get(name).map(|entry| entry.variant_count)
    }

    /// Variant `ordinal` of the enumeration `name`
    pub fn construct_variant(&self, name: &str, ordinal: usize) -> Option<Box<dyn Object>> {
        self.enums.get(name).and_then(|entry| (entry.variant)(ordinal))
    }
}

impl core::fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeCatalog")
            .field("objects", &self.objects.keys().collect::<Vec<_>>())
            .field("enums", &self.enums.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Write a field list: u16 count, then name, kind byte and value per field
pub fn write_fields(enc: &mut GraphEncoder<'_>, fields: &[(&'static str, FieldValue)]) -> Result<()> {
    let count = u16::try_from(fields.len()).map_err(|_| Error::ValueTooLarge {
        value: fields.len() as u64,
        width: 2,
    })?;
    enc.put_u16(count)?;
    for (name, value) in fields {
        enc.put_identifier(name)?;
        write_field_value(enc, *value)?;
    }
    Ok(())
}

/// Write one field value with its kind byte
pub fn write_field_value(enc: &mut GraphEncoder<'_>, value: FieldValue) -> Result<()> {
    enc.put_u8(value.kind().as_u8())?;
    match value {
        FieldValue::Bool(v) => enc.put_bool(v),
        FieldValue::I8(v) => enc.put_i8(v),
        FieldValue::I16(v) => enc.put_i16(v),
        FieldValue::I32(v) => enc.put_i32(v),
        FieldValue::I64(v) => enc.put_i64(v),
        FieldValue::U8(v) => enc.put_u8(v),
        FieldValue::U16(v) => enc.put_u16(v),
        FieldValue::U32(v) => enc.put_u32(v),
        FieldValue::U64(v) => enc.put_u64(v),
        FieldValue::F32(v) => enc.put_f32(v),
        FieldValue::F64(v) => enc.put_f64(v),
        FieldValue::Char(v) => enc.put_u32(v as u32),
        FieldValue::Ref(v) => enc.write_ref(v),
        FieldValue::Value(v) => enc.write_value(v),
    }
}

/// Read one field value written by [`write_field_value`]
pub fn read_field_value(dec: &mut GraphDecoder<'_>) -> Result<FieldValue> {
    let kind = FieldKind::from_u8(dec.get_u8()?).ok_or(Error::CorruptPayload("unknown field kind"))?;
    Ok(match kind {
        FieldKind::Bool => FieldValue::Bool(dec.get_bool()?),
        FieldKind::I8 => FieldValue::I8(dec.get_i8()?),
        FieldKind::I16 => FieldValue::I16(dec.get_i16()?),
        FieldKind::I32 => FieldValue::I32(dec.get_i32()?),
        FieldKind::I64 => FieldValue::I64(dec.get_i64()?),
        FieldKind::U8 => FieldValue::U8(dec.get_u8()?),
        FieldKind::U16 => FieldValue::U16(dec.get_u16()?),
        FieldKind::U32 => FieldValue::U32(dec.get_u32()?),
        FieldKind::U64 => FieldValue::U64(dec.get_u64()?),
        FieldKind::F32 => FieldValue::F32(dec.get_f32()?),
        FieldKind::F64 => FieldValue::F64(dec.get_f64()?),
        FieldKind::Char => FieldValue::Char(
            char::from_u32(dec.get_u32()?).ok_or(Error::CorruptPayload("invalid char scalar"))?,
        ),
        FieldKind::Ref => FieldValue::Ref(dec.read_chunk()?),
        FieldKind::Value => FieldValue::Value(dec.read_chunk()?),
    })
}

/// Read a field list into the object stored at `id` through its structural hook
///
/// Fields the object does not know are skipped.
pub fn read_fields(dec: &mut GraphDecoder<'_>, id: ObjId, type_name: &str) -> Result<()> {
    read_field_list(dec, type_name, |dec, name, value| {
        let object = dec
            .heap_mut()
            .object_mut(id)
            .ok_or(Error::DanglingObject(id.index()))?;
        let target = object.as_structural_mut().ok_or_else(|| Error::Reflection {
            type_name: type_name.to_string(),
            reason: "type does not expose its fields".to_string(),
        })?;
        Ok(target.set_field(name, value))
    })
}

/// Read a field list into the `T` stored at `id`
pub fn read_fields_into<T: Object + Structural>(dec: &mut GraphDecoder<'_>, id: ObjId) -> Result<()> {
    read_field_list(dec, core::any::type_name::<T>(), |dec, name, value| {
        Ok(dec.object_mut::<T>(id)?.set_field(name, value))
    })
}

fn read_field_list<F>(dec: &mut GraphDecoder<'_>, type_name: &str, mut assign: F) -> Result<()>
where
    F: FnMut(&mut GraphDecoder<'_>, &str, FieldValue) -> Result<core::result::Result<(), FieldError>>,
{
    let count = dec.get_u16()?;
    for _ in 0..count {
        let name = dec.get_identifier()?;
        // nested chunks go into the heap before the target is borrowed
        let value = read_field_value(dec)?;

        match assign(dec, &name, value)? {
            Ok(()) => {}
            Err(FieldError::Missing) => skipped_field(type_name, &name),
            Err(FieldError::Mismatch) => return Err(mismatched_field(type_name, &name, value.kind())),
        }
    }
    Ok(())
}

#[cold]
#[inline(never)]
fn skipped_field(type_name: &str, name: &str) {
    debug!(type_name, field = name, "skipping field missing from local type");
}

#[cold]
#[inline(never)]
fn mismatched_field(type_name: &str, name: &str, kind: FieldKind) -> Error {
    Error::Reflection {
        type_name: type_name.to_string(),
        reason: alloc::format!("field {name} cannot hold a {kind:?} value"),
    }
}

/// Fold field names and kinds of `fields` into a fingerprint
pub(crate) fn fields_fingerprint(type_name: &str, fields: &[(&'static str, FieldValue)]) -> u32 {
    fields
        .iter()
        .fold(crate::fingerprint::FingerprintBuilder::new(type_name), |fp, (name, value)| {
            fp.name(name).number(u32::from(value.kind().as_u8()))
        })
        .finish()
}
