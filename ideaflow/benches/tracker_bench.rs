//! Benchmarks for stream decoding and state application.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ideaflow::core::PipelineEvent;
use ideaflow::pipeline::PipelineState;
use ideaflow::stream::SseDecoder;
use ideaflow::testing::{agent_frame, completed_frame};

fn wire_payload() -> Vec<u8> {
    let mut frames: Vec<_> = (1..=5).map(agent_frame).collect();
    frames.push(completed_frame("bench-job"));
    frames.iter().map(|f| f.to_wire()).collect::<String>().into_bytes()
}

fn sse_decode_benchmark(c: &mut Criterion) {
    let payload = wire_payload();

    c.bench_function("sse_decode_whole", |b| {
        b.iter(|| {
            let mut decoder = SseDecoder::new();
            black_box(decoder.push(black_box(&payload)))
        });
    });

    c.bench_function("sse_decode_chunked", |b| {
        b.iter(|| {
            let mut decoder = SseDecoder::new();
            let mut count = 0;
            for chunk in payload.chunks(16) {
                count += decoder.push(chunk).len();
            }
            black_box(count)
        });
    });
}

fn state_apply_benchmark(c: &mut Criterion) {
    let mut frames: Vec<_> = (1..=5).map(agent_frame).collect();
    frames.push(completed_frame("bench-job"));
    let events: Vec<PipelineEvent> = frames
        .iter()
        .filter_map(|f| PipelineEvent::from_wire(&f.event, &f.data))
        .collect();

    c.bench_function("state_apply_full_run", |b| {
        b.iter(|| {
            let mut state = PipelineState::new();
            state.mark_connected();
            for event in &events {
                black_box(state.apply(event));
            }
            black_box(state.is_completed())
        });
    });

    c.bench_function("state_apply_replayed", |b| {
        b.iter(|| {
            let mut state = PipelineState::new();
            state.mark_connected();
            for event in events.iter().chain(events.iter()) {
                black_box(state.apply(event));
            }
        });
    });
}

criterion_group!(benches, sse_decode_benchmark, state_apply_benchmark);
criterion_main!(benches);
