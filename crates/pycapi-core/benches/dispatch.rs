use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pycapi_core::{BridgeConfig, CApiContext, LinkedSymbols, ThreadState};
use pycapi_heap::{FrameSpec, Heap};
use pycapi_sdk::{ManagedRuntime, NativeValue};

fn bench_by_name(c: &mut Criterion) {
    let heap = Heap::new();
    let ctx = CApiContext::with_builtins(&heap, BridgeConfig::default()).unwrap();
    let iter = heap.borrowed_handle(heap.new_seq_iter(heap.list(&[])));

    c.bench_function("call_by_name_iter_check", |b| {
        b.iter(|| ctx.call(black_box("PyIter_Check"), black_box(&[iter])).unwrap());
    });
}

fn bench_linked(c: &mut Criterion) {
    let mut group = c.benchmark_group("linked");

    let heap = Heap::new();
    let ctx = CApiContext::with_builtins(&heap, BridgeConfig::default()).unwrap();
    let linked = LinkedSymbols::link(
        &["PyIter_Check", "PyFrame_GetLineNumber", "PyFile_WriteObject"],
        ctx.registry(),
    )
    .unwrap();

    let iter = heap.borrowed_handle(heap.new_seq_iter(heap.list(&[])));
    group.bench_function("iter_check", |b| {
        let mut ts = ThreadState::new();
        b.iter(|| ctx.invoke_linked(&mut ts, &linked, 0, black_box(&[iter])));
    });

    let globals = heap.dict(&[]).unwrap();
    let code = heap.code("f", 1, &[(0, 1), (10, 2), (20, 3)]);
    let frame = heap
        .frame(FrameSpec::new(code, globals, globals).lasti(15))
        .unwrap();
    let frame = heap.borrowed_handle(frame);
    group.bench_function("frame_line_number", |b| {
        let mut ts = ThreadState::new();
        b.iter(|| ctx.invoke_linked(&mut ts, &linked, 1, black_box(&[frame])));
    });

    let obj = heap.borrowed_handle(heap.string("payload"));
    let file = heap.borrowed_handle(heap.writer());
    group.bench_function("file_write_object", |b| {
        let mut ts = ThreadState::new();
        b.iter(|| ctx.invoke_linked(&mut ts, &linked, 2, black_box(&[obj, file, NativeValue::int(1)])));
    });

    group.finish();
}

criterion_group!(benches, bench_by_name, bench_linked);
criterion_main!(benches);
