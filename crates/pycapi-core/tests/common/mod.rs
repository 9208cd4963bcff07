//! Shared fixtures for the dispatch integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use pycapi_core::{BridgeConfig, BuiltinId, CApiContext};
use pycapi_heap::{FrameSpec, Heap};
use pycapi_sdk::{ManagedRef, ManagedRuntime, ManagedType, NativeValue, PyException, PyResult};

/// Heap wrapper counting managed operations (everything past handle
/// resolution and type checks)
pub struct CountingRuntime {
    pub heap: Heap,
    operations: AtomicUsize,
}

impl CountingRuntime {
    pub fn new() -> Self {
        Self {
            heap: Heap::new(),
            operations: AtomicUsize::new(0),
        }
    }

    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    fn op(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }
}

impl ManagedRuntime for CountingRuntime {
    fn none(&self) -> ManagedRef {
        self.heap.none()
    }

    fn no_value(&self) -> ManagedRef {
        self.heap.no_value()
    }

    fn system_error(&self, message: &str) -> PyException {
        self.heap.system_error(message)
    }

    fn resolve_handle(&self, handle: NativeValue) -> PyResult<ManagedRef> {
        self.heap.resolve_handle(handle)
    }

    fn borrowed_handle(&self, obj: ManagedRef) -> NativeValue {
        self.heap.borrowed_handle(obj)
    }

    fn new_handle(&self, obj: ManagedRef) -> NativeValue {
        self.heap.new_handle(obj)
    }

    fn release_handle(&self, handle: NativeValue) -> PyResult<()> {
        self.heap.release_handle(handle)
    }

    fn is_instance(&self, obj: ManagedRef, ty: ManagedType) -> bool {
        self.heap.is_instance(obj, ty)
    }

    fn type_name(&self, obj: ManagedRef) -> String {
        self.heap.type_name(obj)
    }

    fn str(&self, obj: ManagedRef) -> PyResult<ManagedRef> {
        self.op();
        self.heap.str(obj)
    }

    fn repr(&self, obj: ManagedRef) -> PyResult<ManagedRef> {
        self.op();
        self.heap.repr(obj)
    }

    fn new_str(&self, s: &str) -> ManagedRef {
        self.op();
        self.heap.new_str(s)
    }

    fn get_attr(&self, obj: ManagedRef, name: &str) -> PyResult<ManagedRef> {
        self.op();
        self.heap.get_attr(obj, name)
    }

    fn call(&self, callable: ManagedRef, args: &[ManagedRef]) -> PyResult<ManagedRef> {
        self.op();
        self.heap.call(callable, args)
    }

    fn frame_code(&self, frame: ManagedRef) -> PyResult<ManagedRef> {
        self.op();
        self.heap.frame_code(frame)
    }

    fn frame_line_number(&self, frame: ManagedRef) -> PyResult<i32> {
        self.op();
        self.heap.frame_line_number(frame)
    }

    fn frame_lasti(&self, frame: ManagedRef) -> PyResult<i32> {
        self.op();
        self.heap.frame_lasti(frame)
    }

    fn frame_locals(&self, frame: ManagedRef) -> PyResult<ManagedRef> {
        self.op();
        self.heap.frame_locals(frame)
    }

    fn frame_globals(&self, frame: ManagedRef) -> PyResult<ManagedRef> {
        self.op();
        self.heap.frame_globals(frame)
    }

    fn frame_back(&self, frame: ManagedRef) -> PyResult<Option<ManagedRef>> {
        self.op();
        self.heap.frame_back(frame)
    }

    fn frame_builtins(&self, frame: ManagedRef) -> PyResult<ManagedRef> {
        self.op();
        self.heap.frame_builtins(frame)
    }

    fn is_iterator(&self, obj: ManagedRef) -> bool {
        self.op();
        self.heap.is_iterator(obj)
    }

    fn new_seq_iter(&self, seq: ManagedRef) -> ManagedRef {
        self.op();
        self.heap.new_seq_iter(seq)
    }

    fn new_call_iter(&self, callable: ManagedRef, sentinel: ManagedRef) -> PyResult<ManagedRef> {
        self.op();
        self.heap.new_call_iter(callable, sentinel)
    }

    fn iter_next(&self, iter: ManagedRef) -> PyResult<Option<ManagedRef>> {
        self.op();
        self.heap.iter_next(iter)
    }
}

/// Dispatcher over the builtin registry with default configuration
pub fn context(rt: &dyn ManagedRuntime) -> CApiContext<'_> {
    CApiContext::with_builtins(rt, BridgeConfig::default()).unwrap()
}

/// Registry id of a builtin symbol
pub fn id(ctx: &CApiContext<'_>, symbol: &str) -> BuiltinId {
    ctx.registry().resolve(symbol).unwrap()
}

/// Borrowed native handle of a managed value
pub fn h(rt: &dyn ManagedRuntime, obj: ManagedRef) -> NativeValue {
    rt.borrowed_handle(obj)
}

/// Two-frame call chain
pub struct Frames {
    pub code: ManagedRef,
    pub globals: ManagedRef,
    pub builtins: ManagedRef,
    pub locals: ManagedRef,
    /// Root of the chain
    pub outer: ManagedRef,
    /// Called from `outer`, stopped at offset 8 (line 13)
    pub inner: ManagedRef,
}

pub fn frames(heap: &Heap) -> Frames {
    let globals = heap.dict(&[(heap.string("__name__"), heap.string("__main__"))]).unwrap();
    let builtins = heap.dict(&[(heap.string("len"), heap.builtin("len", |heap, _| Ok(heap.int(0))))]).unwrap();
    let locals = heap.dict(&[(heap.string("x"), heap.int(1))]).unwrap();
    let code = heap.code("work", 10, &[(0, 11), (4, 12), (8, 13)]);
    let outer = heap.frame(FrameSpec::new(code, globals, builtins).lasti(0)).unwrap();
    let inner = heap
        .frame(FrameSpec::new(code, globals, builtins).locals(locals).back(outer).lasti(8))
        .unwrap();
    Frames {
        code,
        globals,
        builtins,
        locals,
        outer,
        inner,
    }
}
