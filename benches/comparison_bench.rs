//! Comparison benchmarks between GraphBit and serde-based serialization libraries
//!
//! The serde formats see a plain tree; GraphBit encodes the same data as an
//! object graph with per-object identity.
//!
//! Run with: cargo bench comparison_bench

use std::sync::Arc;

use borsh::{BorshDeserialize, BorshSerialize};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use graphbit::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
struct OrderLine {
    sku: String,
    quantity: u32,
    price: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
struct Order {
    id: u64,
    lines: Vec<OrderLine>,
}

impl Order {
    fn sample(lines: usize) -> Self {
        Self {
            id: 42,
            lines: (0..lines)
                .map(|i| OrderLine {
                    sku: format!("SKU-{:05}", i),
                    quantity: 1 + i as u32 % 9,
                    price: 1_000 + i as i64 * 25,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
struct GraphLine {
    sku: Option<ObjId>,
    quantity: u32,
    price: i64,
}

impl Object for GraphLine {}

impl Structural for GraphLine {
    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("sku", FieldValue::Ref(self.sku)),
            ("quantity", FieldValue::U32(self.quantity)),
            ("price", FieldValue::I64(self.price)),
        ]
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> std::result::Result<(), FieldError> {
        match (name, value) {
            ("sku", FieldValue::Ref(v)) => self.sku = v,
            ("quantity", FieldValue::U32(v)) => self.quantity = v,
            ("price", FieldValue::I64(v)) => self.price = v,
            ("sku" | "quantity" | "price", _) => return Err(FieldError::Mismatch),
            _ => return Err(FieldError::Missing),
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct GraphOrder {
    id: u64,
    lines: Option<ObjId>,
}

impl Object for GraphOrder {}

impl Structural for GraphOrder {
    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![("id", FieldValue::U64(self.id)), ("lines", FieldValue::Ref(self.lines))]
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> std::result::Result<(), FieldError> {
        match (name, value) {
            ("id", FieldValue::U64(v)) => self.id = v,
            ("lines", FieldValue::Ref(v)) => self.lines = v,
            ("id" | "lines", _) => return Err(FieldError::Mismatch),
            _ => return Err(FieldError::Missing),
        }
        Ok(())
    }
}

fn graphbit_codec() -> Codec {
    let registry = Registry::builder()
        .register_string()
        .register_list()
        .register_structural::<GraphLine>()
        .register_structural::<GraphOrder>()
        .build()
        .unwrap();
    Codec::new(Arc::new(registry))
}

fn to_heap(order: &Order) -> (Heap, ObjId) {
    let mut heap = Heap::new();
    let lines = order
        .lines
        .iter()
        .map(|line| {
            let sku = heap.insert(line.sku.clone());
            Some(heap.insert(GraphLine {
                sku: Some(sku),
                quantity: line.quantity,
                price: line.price,
            }))
        })
        .collect();
    let lines = heap.insert(ObjList(lines));
    let root = heap.insert(GraphOrder {
        id: order.id,
        lines: Some(lines),
    });
    (heap, root)
}

const SIZES: [usize; 3] = [1, 16, 256];

fn bench_encoding_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding_comparison");
    let codec = graphbit_codec();

    for size in SIZES {
        let order = Order::sample(size);
        let (heap, root) = to_heap(&order);

        group.bench_with_input(BenchmarkId::new("graphbit", size), &heap, |b, heap| {
            b.iter(|| black_box(codec.encode(black_box(heap), Some(root)).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("bincode", size), &order, |b, order| {
            b.iter(|| black_box(bincode::serialize(black_box(order)).unwrap()));
        });

        // MessagePack (rmp-serde)
        group.bench_with_input(BenchmarkId::new("messagepack", size), &order, |b, order| {
            b.iter(|| black_box(rmp_serde::to_vec(black_box(order)).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("postcard", size), &order, |b, order| {
            b.iter(|| black_box(postcard::to_allocvec(black_box(order)).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("borsh", size), &order, |b, order| {
            b.iter(|| black_box(black_box(order).try_to_vec().unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("json", size), &order, |b, order| {
            b.iter(|| black_box(serde_json::to_vec(black_box(order)).unwrap()));
        });
    }

    group.finish();
}

fn bench_decoding_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoding_comparison");
    let codec = graphbit_codec();

    for size in SIZES {
        let order = Order::sample(size);
        let (heap, root) = to_heap(&order);

        let graphbit_data = codec.encode(&heap, Some(root)).unwrap();
        let bincode_data = bincode::serialize(&order).unwrap();
        let messagepack_data = rmp_serde::to_vec(&order).unwrap();
        let postcard_data = postcard::to_allocvec(&order).unwrap();
        let borsh_data = order.try_to_vec().unwrap();
        let json_data = serde_json::to_vec(&order).unwrap();

        group.bench_with_input(BenchmarkId::new("graphbit", size), &graphbit_data, |b, data| {
            b.iter(|| black_box(codec.decode(black_box(data)).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("bincode", size), &bincode_data, |b, data| {
            b.iter(|| {
                let decoded: Order = bincode::deserialize(black_box(data)).unwrap();
                black_box(decoded)
            });
        });

        group.bench_with_input(BenchmarkId::new("messagepack", size), &messagepack_data, |b, data| {
            b.iter(|| {
                let decoded: Order = rmp_serde::from_slice(black_box(data)).unwrap();
                black_box(decoded)
            });
        });

        group.bench_with_input(BenchmarkId::new("postcard", size), &postcard_data, |b, data| {
            b.iter(|| {
                let decoded: Order = postcard::from_bytes(black_box(data)).unwrap();
                black_box(decoded)
            });
        });

        group.bench_with_input(BenchmarkId::new("borsh", size), &borsh_data, |b, data| {
            b.iter(|| black_box(Order::try_from_slice(black_box(data)).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("json", size), &json_data, |b, data| {
            b.iter(|| {
                let decoded: Order = serde_json::from_slice(black_box(data)).unwrap();
                black_box(decoded)
            });
        });
    }

    group.finish();
}

fn bench_size_comparison(_c: &mut Criterion) {
    let codec = graphbit_codec();

    println!("\n=== Encoded Size Comparison ===");
    for size in SIZES {
        let order = Order::sample(size);
        let (heap, root) = to_heap(&order);

        println!("\nOrder with {size} lines:");
        println!("  GraphBit:    {} bytes", codec.encode(&heap, Some(root)).unwrap().len());
        println!("  Bincode:     {} bytes", bincode::serialize(&order).unwrap().len());
        println!("  MessagePack: {} bytes", rmp_serde::to_vec(&order).unwrap().len());
        println!("  Postcard:    {} bytes", postcard::to_allocvec(&order).unwrap().len());
        println!("  Borsh:       {} bytes", order.try_to_vec().unwrap().len());
        println!("  JSON:        {} bytes", serde_json::to_vec(&order).unwrap().len());
    }
}

criterion_group!(
    benches,
    bench_encoding_comparison,
    bench_decoding_comparison,
    bench_size_comparison
);
criterion_main!(benches);
