//! PyIter_Check, PyIter_Next, PySeqIter_New, PyCallIter_New

mod common;

use common::{context, h};
use pycapi_core::{CApiContext, Ownership, ThreadState};
use pycapi_heap::Heap;
use pycapi_sdk::{ExceptionKind, ManagedRef, ManagedRuntime, PyException};

fn check(ctx: &CApiContext<'_>, heap: &Heap, obj: ManagedRef) -> i32 {
    ctx.call("PyIter_Check", &[h(heap, obj)]).unwrap().value.as_i32()
}

/// Drain an iterator through PyIter_Next, reading ints
fn drain(ctx: &CApiContext<'_>, heap: &Heap, iter: ManagedRef) -> Vec<i64> {
    let mut out = Vec::new();
    loop {
        let next = ctx.call("PyIter_Next", &[h(heap, iter)]).unwrap();
        if next.value.is_null() {
            assert_eq!(next.ownership, None);
            return out;
        }
        let item = heap.resolve_handle(next.value).unwrap();
        out.push(heap.read_int(item).unwrap());
    }
}

#[test]
fn test_iter_check() {
    let heap = Heap::new();
    let ctx = context(&heap);
    let list = heap.list(&[heap.int(1)]);

    assert_eq!(check(&ctx, &heap, list), 0);
    assert_eq!(check(&ctx, &heap, heap.int(1)), 0);
    assert_eq!(check(&ctx, &heap, heap.new_seq_iter(list)), 1);

    let custom = heap.instance("Gen");
    assert_eq!(check(&ctx, &heap, custom), 0);
    let next = heap.builtin("__next__", |_, _| {
        Err(PyException::new(ExceptionKind::StopIteration, ""))
    });
    heap.set_attr(custom, "__next__", next).unwrap();
    assert_eq!(check(&ctx, &heap, custom), 1);
}

#[test]
fn test_seq_iter_over_list() {
    let heap = Heap::new();
    let ctx = context(&heap);
    let list = heap.list(&[heap.int(1), heap.int(2), heap.int(3)]);

    let created = ctx.call("PySeqIter_New", &[h(&heap, list)]).unwrap();
    assert_eq!(created.ownership, Some(Ownership::TransferOut));
    let iter = heap.resolve_handle(created.value).unwrap();

    assert_eq!(check(&ctx, &heap, iter), 1);
    assert_eq!(drain(&ctx, &heap, iter), vec![1, 2, 3]);
    assert_eq!(drain(&ctx, &heap, iter), Vec::<i64>::new());
}

#[test]
fn test_seq_iter_over_getitem_instance() {
    let heap = Heap::new();
    let ctx = context(&heap);
    let squares = heap.instance("Squares");
    let getitem = heap.builtin("__getitem__", |heap, args| {
        let i = heap.read_int(args[1])?;
        if i >= 4 {
            return Err(PyException::new(ExceptionKind::IndexError, "done"));
        }
        Ok(heap.int(i * i))
    });
    heap.set_attr(squares, "__getitem__", getitem).unwrap();

    let created = ctx.call("PySeqIter_New", &[h(&heap, squares)]).unwrap();
    let iter = heap.resolve_handle(created.value).unwrap();
    assert_eq!(drain(&ctx, &heap, iter), vec![0, 1, 4, 9]);
}

#[test]
fn test_seq_iter_fails_on_first_advance() {
    let heap = Heap::new();
    let ctx = context(&heap);
    let mut ts = ThreadState::new();

    let created = ctx.call("PySeqIter_New", &[h(&heap, heap.int(9))]).unwrap();
    assert!(!created.value.is_null());

    let id = common::id(&ctx, "PyIter_Next");
    let next = ctx.invoke(&mut ts, id, &[created.value]);
    assert!(next.is_null());
    let err = ts.fetch().unwrap();
    assert!(err.is(ExceptionKind::TypeError));
    assert!(err.message().contains("not subscriptable"));
}

#[test]
fn test_call_iter_until_sentinel() {
    let heap = Heap::new();
    let ctx = context(&heap);
    let state = heap.instance("State");
    heap.set_attr(state, "n", heap.int(0)).unwrap();
    let tick = heap.builtin("tick", move |heap, _| {
        let n = heap.read_int(heap.get_attr(state, "n")?)? + 1;
        heap.set_attr(state, "n", heap.int(n))?;
        Ok(heap.int(n))
    });

    let created = ctx
        .call("PyCallIter_New", &[h(&heap, tick), h(&heap, heap.int(4))])
        .unwrap();
    let iter = heap.resolve_handle(created.value).unwrap();
    assert_eq!(check(&ctx, &heap, iter), 1);
    assert_eq!(drain(&ctx, &heap, iter), vec![1, 2, 3]);

    // exhausted iterators stay exhausted and never call again
    drain(&ctx, &heap, iter);
    let n = heap.get_attr(state, "n").unwrap();
    assert_eq!(heap.read_int(n).unwrap(), 4);
}

#[test]
fn test_call_iter_requires_callable() {
    let heap = Heap::new();
    let ctx = context(&heap);
    let mut ts = ThreadState::new();

    let id = common::id(&ctx, "PyCallIter_New");
    let created = ctx.invoke(&mut ts, id, &[h(&heap, heap.int(1)), h(&heap, heap.none())]);
    assert!(created.is_null());
    let err = ts.fetch().unwrap();
    assert!(err.is(ExceptionKind::TypeError));
    assert_eq!(err.message(), "iter(v, w): v must be callable");
}

#[test]
fn test_iter_next_propagates_errors() {
    let heap = Heap::new();
    let ctx = context(&heap);
    let failing = heap.builtin("boom", |_, _| {
        Err(PyException::new(ExceptionKind::ValueError, "boom"))
    });

    let created = ctx
        .call("PyCallIter_New", &[h(&heap, failing), h(&heap, heap.none())])
        .unwrap();
    let err = ctx.call("PyIter_Next", &[created.value]).unwrap_err();
    assert!(err.exception().unwrap().is(ExceptionKind::ValueError));
}

#[test]
fn test_iter_next_on_non_iterator() {
    let heap = Heap::new();
    let ctx = context(&heap);

    let err = ctx.call("PyIter_Next", &[h(&heap, heap.list(&[]))]).unwrap_err();
    let exc = err.exception().unwrap();
    assert!(exc.is(ExceptionKind::TypeError));
    assert!(exc.message().contains("not an iterator"));
}

#[test]
fn test_call_iter_propagates_index_error() {
    let heap = Heap::new();
    let ctx = context(&heap);
    let mut ts = ThreadState::new();
    let buggy = heap.builtin("buggy", |_, _| {
        Err(PyException::new(ExceptionKind::IndexError, "bug in callable"))
    });

    let created = ctx
        .call("PyCallIter_New", &[h(&heap, buggy), h(&heap, heap.none())])
        .unwrap();
    let id = common::id(&ctx, "PyIter_Next");
    assert!(ctx.invoke(&mut ts, id, &[created.value]).is_null());
    let err = ts.fetch().unwrap();
    assert!(err.is(ExceptionKind::IndexError));
    assert_eq!(err.message(), "bug in callable");

    // not exhausted: the next step calls again
    assert!(ctx.call("PyIter_Next", &[created.value]).is_err());
}

#[test]
fn test_next_hook_propagates_index_error() {
    let heap = Heap::new();
    let ctx = context(&heap);
    let custom = heap.instance("Gen");
    let next = heap.builtin("__next__", |_, _| {
        Err(PyException::new(ExceptionKind::IndexError, "list index out of range"))
    });
    heap.set_attr(custom, "__next__", next).unwrap();

    let err = ctx.call("PyIter_Next", &[h(&heap, custom)]).unwrap_err();
    assert!(err.exception().unwrap().is(ExceptionKind::IndexError));
}

#[test]
fn test_next_hook_stop_iteration_ends_quietly() {
    let heap = Heap::new();
    let ctx = context(&heap);
    let mut ts = ThreadState::new();
    let custom = heap.instance("Gen");
    let next = heap.builtin("__next__", |_, _| {
        Err(PyException::new(ExceptionKind::StopIteration, ""))
    });
    heap.set_attr(custom, "__next__", next).unwrap();

    let id = common::id(&ctx, "PyIter_Next");
    assert!(ctx.invoke(&mut ts, id, &[h(&heap, custom)]).is_null());
    assert!(ts.occurred().is_none());
}
