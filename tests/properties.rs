//! Property tests for the primitive and dynamic-width codecs and graph round trips

use std::sync::Arc;

use graphbit::width::{decode_uint, encode_uint, width_for};
use graphbit::*;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_width_covers_bound(bound in 0i64..=i64::from(u32::MAX)) {
        let width = width_for(bound).unwrap();
        prop_assert!((1..=4).contains(&width));
        if width < 4 {
            prop_assert!(bound < 1i64 << (8 * width));
        }
        if width > 1 {
            prop_assert!(bound >= 1i64 << (8 * (width - 1)));
        }
    }

    #[test]
    fn prop_negative_bound_rejected(bound in i64::MIN..0) {
        prop_assert_eq!(width_for(bound), Err(Error::NegativeBound(bound)));
    }

    #[test]
    fn prop_dynamic_uint_roundtrip(value in any::<u32>()) {
        let width = width_for(i64::from(value)).unwrap();
        let mut buf = [0u8; 4];
        prop_assert_eq!(encode_uint(value, width, &mut buf), Ok(width));
        prop_assert_eq!(decode_uint(width, &buf[..width]), Ok(value));
    }

    #[test]
    fn prop_primitives_roundtrip(
        a in any::<i64>(),
        b in any::<u16>(),
        c in 0u32..(1 << 24),
        d in any::<f64>(),
        e in any::<bool>(),
        name in "[a-zA-Z_$][a-zA-Z0-9_$.]{0,40}",
    ) {
        let mut ctx = EncodeContext::new(1, 64);
        ctx.put_i64(a).unwrap();
        ctx.put_u16(b).unwrap();
        ctx.put_u24(c).unwrap();
        ctx.put_f64(d).unwrap();
        ctx.put_bool(e).unwrap();
        ctx.put_identifier(&name).unwrap();

        let mut cursor = DecodeContext::new(ctx.as_slice());
        prop_assert_eq!(cursor.get_i64().unwrap(), a);
        prop_assert_eq!(cursor.get_u16().unwrap(), b);
        prop_assert_eq!(cursor.get_u24().unwrap(), c);
        prop_assert_eq!(cursor.get_f64().unwrap().to_bits(), d.to_bits());
        prop_assert_eq!(cursor.get_bool().unwrap(), e);
        prop_assert_eq!(cursor.get_identifier().unwrap(), name);
        prop_assert!(cursor.is_at_end());
    }

    #[test]
    fn prop_list_identity_preserved(
        words in prop::collection::vec("[a-z]{0,8}", 1..40),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..80),
    ) {
        let registry = Arc::new(Registry::builder().register_string().register_list().build().unwrap());
        let codec = Codec::new(registry);

        let mut heap = Heap::new();
        let ids: Vec<ObjId> = words.iter().map(|w| heap.insert(w.clone())).collect();
        let slots: Vec<Option<ObjId>> = picks.iter().map(|pick| Some(ids[pick.index(ids.len())])).collect();
        let list = heap.insert(ObjList(slots.clone()));

        let graph = codec.decode(&codec.encode(&heap, Some(list)).unwrap()).unwrap();
        let decoded = &graph.root_as::<ObjList>().unwrap().0;
        prop_assert_eq!(decoded.len(), slots.len());

        for i in 0..slots.len() {
            for j in 0..slots.len() {
                prop_assert_eq!(slots[i] == slots[j], decoded[i] == decoded[j]);
            }
            let original = heap.get::<String>(slots[i].unwrap()).unwrap();
            let copy = graph.heap.get::<String>(decoded[i].unwrap()).unwrap();
            prop_assert_eq!(original, copy);
        }
    }

    #[test]
    fn prop_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let registry = Arc::new(Registry::builder().register_string().register_list().build().unwrap());
        let codec = Codec::new(registry);
        let _ = codec.decode(&bytes);
    }
}
