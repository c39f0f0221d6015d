use std::hint::black_box;

use chalkboard::{Board, BoardConfig, CommandInterpreter, NullRenderer, Subject};
use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};

fn lesson_script() -> Vec<Value> {
    let mut script = vec![
        json!({"action": "write_text", "content": "Cell Biology", "style": {"role": "title"}}),
        json!({"action": "write_text", "content": "Organelles", "style": {"role": "heading"}}),
        json!({"action": "create_diagram", "content": {"type": "group", "title": "Membrane-bound"}}),
    ];
    for organelle in ["Nucleus", "Mitochondria", "Golgi apparatus", "Endoplasmic reticulum"] {
        script.push(json!({
            "action": "write_text",
            "content": organelle,
            "style": {"role": "bullet"},
            "position": {"relativeTo": "Membrane-bound"}
        }));
    }
    script.extend([
        json!({"action": "draw_shape", "content": "circle", "label": "Cell"}),
        json!({"action": "draw_shape", "content": "rectangle", "label": "Nucleus box", "position": {"alignWith": "top_right"}}),
        json!({"action": "draw_arrow", "from": "Cell", "to": "Nucleus box", "label": "contains"}),
        json!({"action": "write_text", "content": "ATP is the energy currency", "position": {"region": "aside"}}),
        json!({
            "action": "create_diagram",
            "content": {"type": "tree", "root": {"label": "Cell", "children": [
                {"label": "Prokaryote"},
                {"label": "Eukaryote", "children": [{"label": "Plant"}, {"label": "Animal"}]}
            ]}}
        }),
        json!({
            "action": "create_diagram",
            "content": {"type": "timeline", "events": [
                {"date": "1665", "label": "Hooke names cells"},
                {"date": "1839", "label": "Cell theory"},
                {"date": "1953", "label": "DNA structure"}
            ]}
        }),
        json!({"action": "highlight", "reference": "Mitochondria"}),
        json!({"action": "modify", "reference": "Cell theory", "content": "Schleiden and Schwann"}),
        json!({"action": "erase", "reference": "Membrane-bound"}),
    ]);
    script
}

fn graph_script() -> Vec<Value> {
    vec![json!({
        "action": "create_diagram",
        "content": {
            "type": "graph",
            "title": "Trigonometry",
            "equations": ["y = sin(x)", "y = cos(x) * 2", "y = x^2 / 10"]
        }
    })]
}

fn run(subject: Subject, script: &[Value]) {
    let board = Board::new(BoardConfig::default().with_subject(subject)).expect("board");
    let mut interpreter = CommandInterpreter::new(board, NullRenderer);
    for raw in script {
        interpreter.queue_command(raw.clone());
    }
    black_box(interpreter.process_queue());
}

fn interpreter_lesson(c: &mut Criterion) {
    let script = lesson_script();
    c.bench_function("interpreter_lesson", |b| {
        b.iter(|| run(Subject::Science, black_box(&script)));
    });
}

fn interpreter_graph(c: &mut Criterion) {
    let script = graph_script();
    c.bench_function("interpreter_graph", |b| {
        b.iter(|| run(Subject::Math, black_box(&script)));
    });
}

criterion_group!(benches, interpreter_lesson, interpreter_graph);
criterion_main!(benches);
