//! Benchmarks for the reactive engine and the reconciler's patch path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use weft_core::dom::node::VNode;
use weft_core::{el, Effect, Memo, MemoryHost, Renderer, Runtime, Signal};

fn signal_write_flush(c: &mut Criterion) {
    c.bench_function("signal write + flush, 100 subscribers", |b| {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 0u64);
        let _effects: Vec<Effect> = (0..100)
            .map(|_| {
                let signal = signal.clone();
                Effect::new(&runtime, move || {
                    black_box(signal.get());
                })
            })
            .collect();

        let mut value = 0u64;
        b.iter(|| {
            value += 1;
            signal.set(value);
            runtime.flush();
        });
    });
}

fn memo_cached_read(c: &mut Criterion) {
    c.bench_function("memo read, clean cache", |b| {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 21u64);
        let signal_clone = signal.clone();
        let memo = Memo::new(&runtime, move || signal_clone.get() * 2);

        b.iter(|| black_box(memo.get()));
    });
}

fn rerender_unchanged_list(c: &mut Criterion) {
    c.bench_function("re-render 100-item list, unchanged", |b| {
        let runtime = Runtime::new();
        let (host, container) = MemoryHost::with_container();
        let renderer = Renderer::new(&runtime, host);

        let view = || {
            el("ul").children(
                (0..100).map(|i| VNode::from(el("li").key(i.to_string()).child(format!("item {i}")))),
            )
        };
        renderer.render_to(container, view());

        b.iter(|| renderer.render_to(container, view()));
    });
}

criterion_group!(
    benches,
    signal_write_flush,
    memo_cached_read,
    rerender_unchanged_list
);
criterion_main!(benches);
