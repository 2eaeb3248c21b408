//! Codec throughput benchmarks.
//!
//! Measures decode and encode of map-shaped documents with 1K and 10K
//! entities, each carrying a flat and a nested component.
//!
//! Run with: `cargo bench --bench codec_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use elix_core::prelude::*;

// ---------------------------------------------------------------------------
// Benchmark component types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
struct Position {
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Spell {
    name: String,
    damage: i32,
    position: Position,
}

elix_core::component! { Position => "position" { x: f64, y: f64 } }
elix_core::component! {
    Spell => "spell" { name: String, damage: i32, position: Position }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_entities(set: &ComponentSet, count: usize) -> Vec<Entity> {
    (0..count)
        .map(|i| {
            let mut entity = set.entity(format!("Wizard{i}"));
            entity
                .insert(Position {
                    x: i as f64,
                    y: -(i as f64),
                })
                .expect("position is registered");
            if i % 2 == 0 {
                entity
                    .insert(Spell {
                        name: format!("Spell{i}"),
                        damage: i as i32,
                        position: Position { x: 1.0, y: 2.0 },
                    })
                    .expect("spell is registered");
            }
            entity
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_codec(c: &mut Criterion) {
    let set = ComponentSet::of::<(Position, Spell)>().expect("distinct component names");
    let codec = Codec::new(set.clone(), CodecConfig::default()).expect("map shape has no name key");

    let mut group = c.benchmark_group("codec");
    for count in [1_000usize, 10_000] {
        let entities = build_entities(&set, count);
        let document = codec.encode(&entities);
        let text = elix_core::value::serialize(&document, false);

        group.bench_with_input(BenchmarkId::new("decode", count), &document, |b, doc| {
            b.iter(|| codec.decode(black_box(doc)).expect("valid document"))
        });
        group.bench_with_input(BenchmarkId::new("decode_str", count), &text, |b, text| {
            b.iter(|| codec.decode_str(black_box(text)).expect("valid document"))
        });
        group.bench_with_input(BenchmarkId::new("encode", count), &entities, |b, ents| {
            b.iter(|| codec.encode(black_box(ents)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
