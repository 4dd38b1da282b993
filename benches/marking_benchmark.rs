use std::hint::black_box;

use subset_marker::{mark_program, Diagnostics, MarkingOptions, Program, SubsetMode};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};

/// A chain of `n` records, each holding a pointer to the previous one, and
/// a procedure per record whose body copies a global.
fn generate_json(n: usize) -> String {
    let mut entities = vec![json!({
        "name": "Integer",
        "type": { "signed": { "low": -2147483648i64, "high": 2147483647 } }
    })];
    let mut units: Vec<Value> = Vec::new();

    for i in 0..n {
        let rec = format!("Rec_{i}");
        let ptr = format!("Ptr_{i}");
        let link_type = if i == 0 {
            "Integer".to_string()
        } else {
            format!("Ptr_{}", i - 1)
        };
        entities.push(json!({
            "name": rec,
            "type": { "record": { "components": [format!("{rec}.Link"), format!("{rec}.Count")] } }
        }));
        entities.push(json!({ "name": format!("{rec}.Link"), "component": { "type": link_type } }));
        entities.push(json!({ "name": format!("{rec}.Count"), "component": { "type": "Integer" } }));
        entities.push(json!({ "name": ptr, "type": { "access": { "designated": rec } } }));
        entities.push(json!({ "name": format!("Global_{i}"), "object": { "type": "Integer" } }));

        let proc = format!("Touch_{i}");
        entities.push(json!({ "name": proc, "subprogram": { "kind": "procedure" } }));
        entities.push(json!({
            "name": format!("{proc}.Local"),
            "scope": proc,
            "object": { "type": "Integer" }
        }));

        units.push(json!({ "type_declaration": { "entity": ptr } }));
        units.push(json!({ "object_declaration": { "entity": format!("Global_{i}") } }));
        units.push(json!({
            "subprogram_body": {
                "entity": proc,
                "declarations": [{ "object_declaration": { "entity": format!("{proc}.Local") } }],
                "statements": [{
                    "assignment": {
                        "target": { "identifier": { "entity": format!("{proc}.Local") }, "type": "Integer" },
                        "value": { "identifier": { "entity": format!("Global_{i}") }, "type": "Integer" }
                    }
                }]
            }
        }));
    }

    json!({ "entities": entities, "units": units }).to_string()
}

fn mark_generated_programs(c: &mut Criterion) {
    let options = MarkingOptions::default().with_default_mode(SubsetMode::On);

    let mut group = c.benchmark_group("mark program");
    for size in [16, 64, 256, 1024].iter() {
        let program = Program::from_json_str(&generate_json(*size)).unwrap();
        group.bench_with_input(BenchmarkId::new("record chain", size), size, |b, _| {
            b.iter(|| {
                let mut diagnostics = Diagnostics::new();
                let result = mark_program(black_box(&program), &options, &mut diagnostics).unwrap();
                assert!(diagnostics.is_empty());
                result
            })
        });
    }
    group.finish();
}

fn load_generated_programs(c: &mut Criterion) {
    let mut group = c.benchmark_group("load program");
    for size in [64, 1024].iter() {
        let json = generate_json(*size);
        group.bench_with_input(BenchmarkId::new("record chain", size), size, |b, _| {
            b.iter(|| Program::from_json_str(black_box(&json)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, mark_generated_programs, load_generated_programs);
criterion_main!(benches);
