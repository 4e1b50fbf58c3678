//! Benchmarks for schema compilation and the validation gate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use blockwise::block::{BlockType, BlockTypeRegistry};
use blockwise::schema::CompiledSchema;
use blockwise::validate::validate;
use serde_json::json;

fn article_type() -> BlockType {
    BlockType::new(
        "article",
        "1.0.0",
        json!({
            "type": "object",
            "required": ["title", "sections"],
            "properties": {
                "title": { "type": "string", "minLength": 1, "maxLength": 120 },
                "published": { "type": "string", "format": "date-time" },
                "sections": {
                    "type": "array",
                    "items": { "$ref": "#/definitions/section" }
                }
            },
            "definitions": {
                "section": {
                    "type": "object",
                    "required": ["heading"],
                    "properties": {
                        "heading": { "type": "string" },
                        "level": { "type": "integer", "minimum": 1, "maximum": 6 }
                    },
                    "additionalProperties": false
                }
            }
        }),
        json!({ "title": "", "sections": [] }),
    )
}

fn bench_compile(c: &mut Criterion) {
    let schema = article_type().schema;
    c.bench_function("schema_compile_article", |b| {
        b.iter(|| CompiledSchema::compile(black_box(&schema)).unwrap())
    });
}

fn bench_validate(c: &mut Criterion) {
    let mut registry = BlockTypeRegistry::new();
    registry.register(article_type()).unwrap();
    let ty = registry.lookup("article").unwrap();
    let sections: Vec<_> = (0..50)
        .map(|i| json!({ "heading": format!("Part {i}"), "level": 1 + i % 6 }))
        .collect();
    let data = json!({
        "title": "Blocks",
        "published": "2024-05-01T12:00:00Z",
        "sections": sections
    });
    let initial = json!({ "title": "", "sections": [] });

    c.bench_function("validate_article_50_sections", |b| {
        b.iter(|| validate(ty, black_box(&data)).unwrap())
    });
    c.bench_function("validate_initial_data_short_circuit", |b| {
        b.iter(|| validate(ty, black_box(&initial)).unwrap())
    });
}

criterion_group!(benches, bench_compile, bench_validate);
criterion_main!(benches);
