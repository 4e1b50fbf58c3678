//! Benchmarks for the state reducer and facade dispatch.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use blockwise::block::BlockId;
use blockwise::builtin;
use blockwise::editor::{Action, Editor, EditorState, SequentialIds, update};
use serde_json::{Map, json};

fn document(len: u64) -> EditorState {
    (0..len).fold(EditorState::empty(), |state, id| {
        update(
            state,
            &Action::Create {
                id: BlockId::Number(id),
                name: "text".to_string(),
                version: "1.0.0".to_string(),
                data: Map::new(),
                local_state: Map::new(),
                after: None,
            },
        )
    })
}

fn bench_insert_middle(c: &mut Criterion) {
    let state = document(1_000);
    c.bench_function("reducer_insert_middle_1000", |b| {
        b.iter(|| {
            update(
                black_box(state.clone()),
                &Action::Create {
                    id: BlockId::Number(5_000),
                    name: "text".to_string(),
                    version: "1.0.0".to_string(),
                    data: Map::new(),
                    local_state: Map::new(),
                    after: Some(BlockId::Number(500)),
                },
            )
        })
    });
}

fn bench_update_data(c: &mut Criterion) {
    let state = document(1_000);
    let mut patch = Map::new();
    patch.insert("text".to_string(), json!("hello"));
    let action = Action::UpdateData {
        id: BlockId::Number(999),
        patch,
        version: None,
    };
    c.bench_function("reducer_update_last_1000", |b| {
        b.iter(|| update(black_box(state.clone()), &action))
    });
}

fn bench_facade_create(c: &mut Criterion) {
    c.bench_function("editor_create_100", |b| {
        b.iter(|| {
            let mut editor = Editor::new().with_id_source(SequentialIds::default());
            editor.register_block_type(builtin::text()).unwrap();
            for _ in 0..100 {
                editor.create_block("text", None).unwrap();
            }
            editor
        })
    });
}

criterion_group!(benches, bench_insert_middle, bench_update_data, bench_facade_create);
criterion_main!(benches);
