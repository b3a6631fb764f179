//! Standard strategies

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::marker::PhantomData;

use crate::decoder::DecodeContext;
use crate::encoder::{EncodeContext, MAX_U24};
use crate::engine::{GraphDecoder, GraphEncoder};
use crate::error::{Error, Result};
use crate::fingerprint::FingerprintBuilder;
use crate::object::{ObjId, ObjList, ObjMap, Object, TypedArray};
use crate::strategy::Strategy;
use crate::structural::{fields_fingerprint, read_fields_into, write_fields, Enumeration, Structural};

fn u24_len(len: usize) -> Result<u32> {
    u32::try_from(len)
        .ok()
        .filter(|len| *len <= MAX_U24)
        .ok_or(Error::ValueTooLarge {
            value: len as u64,
            width: 3,
        })
}

/// Strategy for types without payload, rebuilt from `Default`
pub struct UnitProtocol<T>(PhantomData<fn() -> T>);

impl<T> UnitProtocol<T> {
    /// Create the strategy
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for UnitProtocol<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Object + Default> Strategy for UnitProtocol<T> {
    fn write(&self, _enc: &mut GraphEncoder<'_>, _id: ObjId) -> Result<()> {
        Ok(())
    }

    fn create(&self, _dec: &mut GraphDecoder<'_>) -> Result<Box<dyn Object>> {
        Ok(Box::new(T::default()))
    }
}

/// Strategy for `String`: u24 byte length, then UTF-8 bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct StringProtocol;

impl Strategy for StringProtocol {
    fn write(&self, enc: &mut GraphEncoder<'_>, id: ObjId) -> Result<()> {
        let value = enc.object::<String>(id)?;
        enc.put_u24(u24_len(value.len())?)?;
        enc.put_bytes(value.as_bytes())
    }

    fn create(&self, dec: &mut GraphDecoder<'_>) -> Result<Box<dyn Object>> {
        let len = dec.get_u24()? as usize;
        let bytes = dec.get_bytes(len)?;
        let value = core::str::from_utf8(bytes).map_err(|_| Error::CorruptPayload("string is not valid UTF-8"))?;
        Ok(Box::new(String::from(value)))
    }
}

/// Strategy for an [`Enumeration`]: the ordinal at the width of its variant count
pub struct EnumProtocol<T>(PhantomData<fn() -> T>);

impl<T> EnumProtocol<T> {
    /// Create the strategy
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for EnumProtocol<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Enumeration> Strategy for EnumProtocol<T> {
    fn write(&self, enc: &mut GraphEncoder<'_>, id: ObjId) -> Result<()> {
        let ordinal = enc.object::<T>(id)?.ordinal();
        let ordinal = u32::try_from(ordinal).map_err(|_| Error::ValueTooLarge {
            value: ordinal as u64,
            width: 4,
        })?;
        enc.put_uint_for(T::VARIANTS.len() as u64, ordinal)
    }

    fn create(&self, dec: &mut GraphDecoder<'_>) -> Result<Box<dyn Object>> {
        let ordinal = dec.get_uint_for(T::VARIANTS.len() as u64)? as usize;
        let variant = T::VARIANTS.get(ordinal).ok_or_else(|| Error::InvalidOrdinal {
            type_name: String::from(core::any::type_name::<T>()),
            ordinal,
        })?;
        Ok(Box::new(*variant))
    }

    fn fingerprint(&self) -> u32 {
        FingerprintBuilder::new(core::any::type_name::<T>())
            .number(T::VARIANTS.len() as u32)
            .finish()
    }
}

/// Strategy for [`ObjList`]: u24 length, then one reference chunk per item
#[derive(Debug, Clone, Copy, Default)]
pub struct ListProtocol;

impl Strategy for ListProtocol {
    fn write(&self, enc: &mut GraphEncoder<'_>, id: ObjId) -> Result<()> {
        let list = enc.object::<ObjList>(id)?;
        enc.put_u24(u24_len(list.0.len())?)?;
        for item in &list.0 {
            enc.write_ref(*item)?;
        }
        Ok(())
    }

    fn create(&self, _dec: &mut GraphDecoder<'_>) -> Result<Box<dyn Object>> {
        Ok(Box::new(ObjList::new()))
    }

    fn read(&self, dec: &mut GraphDecoder<'_>, id: ObjId) -> Result<()> {
        let len = dec.get_u24()? as usize;
        // every item is at least one tag byte
        if len > dec.remaining() {
            return Err(Error::CorruptPayload("list length exceeds remaining bytes"));
        }
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(dec.read_chunk()?);
        }
        dec.object_mut::<ObjList>(id)?.0 = items;
        Ok(())
    }
}

/// Strategy for a registered [`Structural`] type
///
/// Writes the same field list as the unknown-object fallback, without the
/// type name. The fingerprint covers every field name and kind.
pub struct StructuralProtocol<T>(PhantomData<fn() -> T>);

impl<T> StructuralProtocol<T> {
    /// Create the strategy
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for StructuralProtocol<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Object + Structural + Default> Strategy for StructuralProtocol<T> {
    fn write(&self, enc: &mut GraphEncoder<'_>, id: ObjId) -> Result<()> {
        let fields = enc.object::<T>(id)?.fields();
        write_fields(enc, &fields)
    }

    fn create(&self, _dec: &mut GraphDecoder<'_>) -> Result<Box<dyn Object>> {
        Ok(Box::new(T::default()))
    }

    fn read(&self, dec: &mut GraphDecoder<'_>, id: ObjId) -> Result<()> {
        read_fields_into::<T>(dec, id)
    }

    fn fingerprint(&self) -> u32 {
        fields_fingerprint(core::any::type_name::<T>(), &T::default().fields())
    }
}

/// Strategy for [`ObjMap`]: u32 entry count, then a key chunk and a value
/// chunk per entry
#[derive(Debug, Clone, Copy, Default)]
pub struct MapProtocol;

impl Strategy for MapProtocol {
    fn write(&self, enc: &mut GraphEncoder<'_>, id: ObjId) -> Result<()> {
        let map = enc.object::<ObjMap>(id)?;
        let len = u32::try_from(map.len()).map_err(|_| Error::ValueTooLarge {
            value: map.len() as u64,
            width: 4,
        })?;
        enc.put_u32(len)?;
        for (key, value) in &map.entries {
            enc.write_ref(*key)?;
            enc.write_ref(*value)?;
        }
        Ok(())
    }

    fn create(&self, _dec: &mut GraphDecoder<'_>) -> Result<Box<dyn Object>> {
        Ok(Box::new(ObjMap::new()))
    }

    fn read(&self, dec: &mut GraphDecoder<'_>, id: ObjId) -> Result<()> {
        let len = dec.get_u32()? as usize;
        // every entry is at least two tag bytes
        if len > dec.remaining() / 2 {
            return Err(Error::CorruptPayload("map length exceeds remaining bytes"));
        }
        let mut entries = Vec::with_capacity(len);
        for _ in 0..len {
            let key = dec.read_chunk()?;
            let value = dec.read_chunk()?;
            entries.push((key, value));
        }
        dec.object_mut::<ObjMap>(id)?.entries = entries;
        Ok(())
    }
}

/// Strategy for [`TypedArray<T>`]: u24 length, then one chunk per item
///
/// With `value_type` set, items are written with value semantics: no identity,
/// no back-references, a fresh copy per slot on decode.
pub struct TypedArrayProtocol<T> {
    value_type: bool,
    element: PhantomData<fn() -> T>,
}

impl<T> TypedArrayProtocol<T> {
    /// Create the strategy
    pub const fn new(value_type: bool) -> Self {
        Self {
            value_type,
            element: PhantomData,
        }
    }
}

impl<T: 'static> Strategy for TypedArrayProtocol<T> {
    fn write(&self, enc: &mut GraphEncoder<'_>, id: ObjId) -> Result<()> {
        let array = enc.object::<TypedArray<T>>(id)?;
        enc.put_u24(u24_len(array.len())?)?;
        for item in &array.items {
            enc.write_chunk(*item, self.value_type)?;
        }
        Ok(())
    }

    fn create(&self, dec: &mut GraphDecoder<'_>) -> Result<Box<dyn Object>> {
        let len = dec.get_u24()? as usize;
        // every item is at least one tag byte
        if len > dec.remaining() {
            return Err(Error::CorruptPayload("array length exceeds remaining bytes"));
        }
        Ok(Box::new(TypedArray::<T>::new(alloc::vec![None; len])))
    }

    fn read(&self, dec: &mut GraphDecoder<'_>, id: ObjId) -> Result<()> {
        let len = dec.object::<TypedArray<T>>(id)?.len();
        for slot in 0..len {
            let item = dec.read_chunk()?;
            dec.object_mut::<TypedArray<T>>(id)?.items[slot] = item;
        }
        Ok(())
    }

    fn fingerprint(&self) -> u32 {
        FingerprintBuilder::new(core::any::type_name::<Self>())
            .number(u32::from(self.value_type))
            .finish()
    }
}

/// Element of a primitive array: fixed width, no identity
pub trait PrimitiveElement: Copy + Default + Send + Sync + 'static {
    /// Encoded size in bytes
    const WIDTH: usize;

    /// Identity folded into the registry fingerprint
    const FINGERPRINT: u32;

    /// Write one element
    fn put(self, ctx: &mut EncodeContext) -> Result<()>;

    /// Read one element
    fn get(ctx: &mut DecodeContext<'_>) -> Result<Self>;
}

macro_rules! primitive_element {
    ($($ty:ty => $width:expr, $id:expr, $put:ident, $get:ident;)*) => {
        $(
            impl PrimitiveElement for $ty {
                const WIDTH: usize = $width;
                const FINGERPRINT: u32 = $id;

                #[inline]
                fn put(self, ctx: &mut EncodeContext) -> Result<()> {
                    ctx.$put(self)
                }

                #[inline]
                fn get(ctx: &mut DecodeContext<'_>) -> Result<Self> {
                    ctx.$get()
                }
            }
        )*
    };
}

primitive_element! {
    u8 => 1, 0xFEED_000A, put_u8, get_u8;
    i8 => 1, 0xFEED_001A, put_i8, get_i8;
    i16 => 2, 0xFEED_000B, put_i16, get_i16;
    u16 => 2, 0xFEED_001B, put_u16, get_u16;
    i32 => 4, 0xFEED_000C, put_i32, get_i32;
    u32 => 4, 0xFEED_001C, put_u32, get_u32;
    i64 => 8, 0xFEED_000D, put_i64, get_i64;
    u64 => 8, 0xFEED_001D, put_u64, get_u64;
    f32 => 4, 0xFEED_000E, put_f32, get_f32;
    f64 => 8, 0xFEED_000F, put_f64, get_f64;
    bool => 1, 0xFEED_00A0, put_bool, get_bool;
}

impl PrimitiveElement for char {
    const WIDTH: usize = 4;
    const FINGERPRINT: u32 = 0xFEED_00AA;

    #[inline]
    fn put(self, ctx: &mut EncodeContext) -> Result<()> {
        ctx.put_u32(self as u32)
    }

    #[inline]
    fn get(ctx: &mut DecodeContext<'_>) -> Result<Self> {
        char::from_u32(ctx.get_u32()?).ok_or(Error::CorruptPayload("invalid char scalar"))
    }
}

impl<T: PrimitiveElement> Object for Vec<T> {}

/// Strategy for `Vec<T>` of a [`PrimitiveElement`]: u24 length, then the
/// elements at their fixed width
pub struct PrimitiveArrayProtocol<T>(PhantomData<fn() -> T>);

impl<T> PrimitiveArrayProtocol<T> {
    /// Create the strategy
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for PrimitiveArrayProtocol<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PrimitiveElement> Strategy for PrimitiveArrayProtocol<T> {
    fn write(&self, enc: &mut GraphEncoder<'_>, id: ObjId) -> Result<()> {
        let values = enc.object::<Vec<T>>(id)?;
        enc.put_u24(u24_len(values.len())?)?;
        for &value in values {
            value.put(enc)?;
        }
        Ok(())
    }

    fn create(&self, dec: &mut GraphDecoder<'_>) -> Result<Box<dyn Object>> {
        let len = dec.get_u24()? as usize;
        if len * T::WIDTH > dec.remaining() {
            return Err(Error::UnexpectedEof {
                needed: len * T::WIDTH,
                remaining: dec.remaining(),
            });
        }
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            values.push(T::get(dec)?);
        }
        Ok(Box::new(values))
    }

    fn fingerprint(&self) -> u32 {
        T::FINGERPRINT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Codec;
    use crate::header::StreamHeader;
    use crate::object::Heap;
    use crate::registry::Registry;
    use alloc::sync::Arc;
    use alloc::vec;

    fn codec(registry: Registry) -> Codec {
        Codec::new(Arc::new(registry))
    }

    #[test]
    fn test_primitive_arrays_round_trip() {
        let codec = codec(
            Registry::builder()
                .register_list()
                .register_primitive_arrays()
                .build()
                .unwrap(),
        );

        let mut heap = Heap::new();
        let bytes = heap.insert(vec![0u8, 7, 255]);
        let ints = heap.insert(vec![i32::MIN, -1, 0, i32::MAX]);
        let longs = heap.insert(vec![u64::MAX, 1]);
        let floats = heap.insert(vec![0.5f64, -2.25, f64::INFINITY]);
        let flags = heap.insert(vec![true, false, true]);
        let chars = heap.insert(vec!['a', 'ß', '🦀']);
        let empty = heap.insert(Vec::<i16>::new());
        let root = heap.insert(ObjList(vec![
            Some(bytes),
            Some(ints),
            Some(longs),
            Some(floats),
            Some(flags),
            Some(chars),
            Some(empty),
        ]));

        let graph = codec.decode(&codec.encode(&heap, Some(root)).unwrap()).unwrap();
        let items = &graph.root_as::<ObjList>().unwrap().0;
        let get = |slot: usize| items[slot].unwrap();
        assert_eq!(graph.heap.get::<Vec<u8>>(get(0)).unwrap(), &vec![0u8, 7, 255]);
        assert_eq!(graph.heap.get::<Vec<i32>>(get(1)).unwrap(), &vec![i32::MIN, -1, 0, i32::MAX]);
        assert_eq!(graph.heap.get::<Vec<u64>>(get(2)).unwrap(), &vec![u64::MAX, 1]);
        assert_eq!(graph.heap.get::<Vec<f64>>(get(3)).unwrap(), &vec![0.5, -2.25, f64::INFINITY]);
        assert_eq!(graph.heap.get::<Vec<bool>>(get(4)).unwrap(), &vec![true, false, true]);
        assert_eq!(graph.heap.get::<Vec<char>>(get(5)).unwrap(), &vec!['a', 'ß', '🦀']);
        assert!(graph.heap.get::<Vec<i16>>(get(6)).unwrap().is_empty());
    }

    #[test]
    fn test_primitive_array_layout() {
        let codec = codec(
            Registry::builder()
                .register_primitive_array::<i16>()
                .build()
                .unwrap(),
        );
        let mut heap = Heap::new();
        let id = heap.insert(vec![-1i16, 2]);
        let bytes = codec.encode(&heap, Some(id)).unwrap();

        // tag, class index 1, u24 length, two i16
        assert_eq!(&bytes[StreamHeader::SIZE..], &[3, 1, 2, 0, 0, 0xFF, 0xFF, 2, 0]);

        // a length past the end of the stream is rejected before allocating
        let mut truncated = bytes.clone();
        truncated[StreamHeader::SIZE + 2] = 9;
        assert!(matches!(
            codec.decode(&truncated),
            Err(Error::UnexpectedEof { needed: 18, .. })
        ));
    }

    #[test]
    fn test_primitive_array_fingerprints_differ_by_element() {
        let ints = Registry::builder().register_primitive_array::<i32>().build().unwrap();
        let uints = Registry::builder().register_primitive_array::<u32>().build().unwrap();
        assert_ne!(ints.fingerprint(), uints.fingerprint());
    }

    #[test]
    fn test_map_round_trip_with_cycle() {
        let codec = codec(
            Registry::builder()
                .register_string()
                .register_map()
                .build()
                .unwrap(),
        );

        let mut heap = Heap::new();
        let key = heap.insert(String::from("self"));
        let other = heap.insert(String::from("other"));
        let map = heap.insert(ObjMap::new());
        {
            let entries = heap.get_mut::<ObjMap>(map).unwrap();
            entries.insert(Some(key), Some(map));
            entries.insert(Some(other), Some(key));
            entries.insert(None, None);
        }

        let graph = codec.decode(&codec.encode(&heap, Some(map)).unwrap()).unwrap();
        let root = graph.root.unwrap();
        let decoded = graph.heap.get::<ObjMap>(root).unwrap();
        assert_eq!(decoded.len(), 3);

        let (first_key, first_value) = decoded.entries[0];
        assert_eq!(first_value, Some(root));
        assert_eq!(graph.heap.get::<String>(first_key.unwrap()).unwrap(), "self");

        // the shared key string decodes to one object
        assert_eq!(decoded.entries[1].1, first_key);
        assert_eq!(decoded.get(None), Some(None));
    }

    #[test]
    fn test_map_insert_replaces_by_identity() {
        let mut map = ObjMap::new();
        let a = ObjId::from_index(0);
        let b = ObjId::from_index(1);
        assert_eq!(map.insert(Some(a), Some(b)), None);
        assert_eq!(map.insert(Some(a), None), Some(Some(b)));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(Some(b)), None);
    }

    #[test]
    fn test_typed_array_value_and_reference_semantics() {
        let registry = Registry::builder()
            .register_string()
            .register_typed_array::<String>(true)
            .register_typed_array::<ObjList>(false)
            .register_list()
            .build()
            .unwrap();
        let codec = codec(registry);

        let mut heap = Heap::new();
        let word = heap.insert(String::from("copy"));
        let by_value = heap.insert(TypedArray::<String>::new(vec![Some(word), Some(word), None]));
        let bytes = codec.encode(&heap, Some(by_value)).unwrap();
        assert_eq!(StreamHeader::decode(&bytes).unwrap().reference_capacity, 1);

        let graph = codec.decode(&bytes).unwrap();
        let items = &graph.root_as::<TypedArray<String>>().unwrap().items;
        assert_eq!(items.len(), 3);
        assert_ne!(items[0], items[1]);
        assert_eq!(graph.heap.get::<String>(items[1].unwrap()).unwrap(), "copy");
        assert_eq!(items[2], None);

        let mut heap = Heap::new();
        let list = heap.insert(ObjList::new());
        let by_ref = heap.insert(TypedArray::<ObjList>::new(vec![Some(list), Some(list)]));
        heap.get_mut::<ObjList>(list).unwrap().0.push(Some(by_ref));

        let graph = codec.decode(&codec.encode(&heap, Some(by_ref)).unwrap()).unwrap();
        let root = graph.root.unwrap();
        let items = &graph.heap.get::<TypedArray<ObjList>>(root).unwrap().items;
        assert_eq!(items[0], items[1]);
        let inner = graph.heap.get::<ObjList>(items[0].unwrap()).unwrap();
        assert_eq!(inner.0, vec![Some(root)]);
    }

    #[test]
    fn test_typed_array_fingerprint_tracks_semantics() {
        assert_ne!(
            TypedArrayProtocol::<String>::new(true).fingerprint(),
            TypedArrayProtocol::<String>::new(false).fingerprint()
        );
    }
}
