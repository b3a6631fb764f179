//! Basic usage example for GraphBit
//!
//! Run with: cargo run --example basic_usage
//! Set `RUST_LOG=graphbit=trace` to see every chunk as it is written and read.

use std::sync::Arc;

use graphbit::*;
use tracing_subscriber::EnvFilter;

/// Employee with a manager link, written field by field
#[derive(Debug, Default)]
struct Employee {
    badge: u32,
    name: Option<ObjId>,
    manager: Option<ObjId>,
}

impl Object for Employee {}

impl Structural for Employee {
    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("badge", FieldValue::U32(self.badge)),
            ("name", FieldValue::Ref(self.name)),
            ("manager", FieldValue::Ref(self.manager)),
        ]
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> std::result::Result<(), FieldError> {
        match (name, value) {
            ("badge", FieldValue::U32(v)) => self.badge = v,
            ("name", FieldValue::Ref(v)) => self.name = v,
            ("manager", FieldValue::Ref(v)) => self.manager = v,
            ("badge" | "name" | "manager", _) => return Err(FieldError::Mismatch),
            _ => return Err(FieldError::Missing),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shift {
    Day,
    Night,
}

impl Enumeration for Shift {
    const VARIANTS: &'static [Self] = &[Shift::Day, Shift::Night];

    fn ordinal(&self) -> usize {
        *self as usize
    }
}

impl Object for Shift {
    fn as_enum(&self) -> Option<EnumOrdinal> {
        Some(EnumOrdinal::of(self))
    }
}

fn name_of(heap: &Heap, id: Option<ObjId>) -> &str {
    id.and_then(|id| heap.get::<String>(id))
        .map_or("<none>", String::as_str)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("GraphBit Basic Usage Example");
    println!("============================");

    let registry = Arc::new(
        Registry::builder()
            .register_string()
            .register_list()
            .register_structural::<Employee>()
            .build()?,
    );
    println!("\nRegistry: {} types, fingerprint {:#010x}", registry.len(), registry.fingerprint());

    // Example 1: shared references and a cycle
    println!("\n1. Team with a self-managed lead:");
    let codec = Codec::new(Arc::clone(&registry));
    let (bytes, team) = {
        let mut heap = Heap::new();
        let lead_name = heap.insert(String::from("Ada"));
        let dev_name = heap.insert(String::from("Linus"));
        let lead = heap.insert(Employee {
            badge: 1,
            name: Some(lead_name),
            manager: None,
        });
        heap.try_get_mut::<Employee>(lead)?.manager = Some(lead);
        let dev = heap.insert(Employee {
            badge: 2,
            name: Some(dev_name),
            manager: Some(lead),
        });
        let team = heap.insert(ObjList(vec![Some(lead), Some(dev)]));
        (codec.encode(&heap, Some(team))?, heap.len())
    };
    println!("  Encoded {team} objects into {} bytes", bytes.len());

    let (graph, report) = codec.decode_with_report(&bytes)?;
    println!(
        "  Decoded {} objects, {} references",
        graph.heap.len(),
        report.references_used
    );
    if let Some(team) = graph.root_as::<ObjList>() {
        for id in team.0.iter().flatten() {
            let employee = graph.heap.try_get::<Employee>(*id)?;
            let manager = employee
                .manager
                .and_then(|m| graph.heap.get::<Employee>(m))
                .map_or("<none>", |m| name_of(&graph.heap, m.name));
            println!(
                "  #{} {} reports to {}",
                employee.badge,
                name_of(&graph.heap, employee.name),
                manager
            );
        }
    }

    // Example 2: unregistered enum written through the fallback
    println!("\n2. Unregistered enumeration:");
    let mut heap = Heap::new();
    let night = heap.insert(Shift::Night);
    let roster = heap.insert(ObjList(vec![Some(night), None]));

    match codec.encode(&heap, Some(roster)) {
        Ok(_) => println!("  unexpected success"),
        Err(err) => println!("  Default reaction: {err}"),
    }

    let mut lenient = Codec::new(Arc::clone(&registry))
        .with_catalog(TypeCatalog::new().register_enum::<Shift>());
    lenient.set_unknown_type_reaction(UnknownTypeReaction::WriteAndWarning);
    let bytes = lenient.encode(&heap, Some(roster))?;
    let graph = lenient.decode(&bytes)?;
    if let Some(roster) = graph.root_as::<ObjList>() {
        let shift = roster.0[0].and_then(|id| graph.heap.get::<Shift>(id));
        println!("  Written with a warning, decoded back as {shift:?}");
    }

    // Example 3: mismatched registries
    println!("\n3. Fingerprint check:");
    let other = Arc::new(Registry::builder().register_string().build()?);
    let strict = Codec::with_config(
        other,
        CodecConfig::default().with_fingerprint_policy(FingerprintPolicy::Reject),
    );
    match strict.decode(&bytes) {
        Ok(_) => println!("  unexpected success"),
        Err(err) => println!("  Rejected: {err}"),
    }

    println!("\nAll examples completed successfully!");
    Ok(())
}
