//! `ManagedRuntime` over the heap
//!
//! Every path that may run a callable (hooks, `write`, iterator steps) first
//! takes a snapshot of the object, drops the lock, then calls out.

use pycapi_sdk::{ExceptionKind, ManagedRef, ManagedRuntime, ManagedType, NativeValue, PyException, PyResult};

use crate::handles;
use crate::heap::Heap;
use crate::object::{FrameObject, Object};

const STR_HOOK: &str = "__str__";
const REPR_HOOK: &str = "__repr__";
const NEXT_HOOK: &str = "__next__";
const CALL_HOOK: &str = "__call__";
const GETITEM_HOOK: &str = "__getitem__";

impl ManagedRuntime for Heap {
    fn none(&self) -> ManagedRef {
        self.none_ref()
    }

    fn no_value(&self) -> ManagedRef {
        self.no_value_ref()
    }

    // ========================================================================
    // Native Handles
    // ========================================================================

    fn resolve_handle(&self, handle: NativeValue) -> PyResult<ManagedRef> {
        match handles::decode(handle) {
            Some(obj) if self.contains(obj) => Ok(obj),
            _ => Err(self.system_error(&format!("invalid object handle {:?}", handle))),
        }
    }

    fn borrowed_handle(&self, obj: ManagedRef) -> NativeValue {
        handles::encode(obj)
    }

    fn new_handle(&self, obj: ManagedRef) -> NativeValue {
        self.handles.acquire(obj);
        handles::encode(obj)
    }

    fn release_handle(&self, handle: NativeValue) -> PyResult<()> {
        let obj = self.resolve_handle(handle)?;
        if self.handles.release(obj) {
            Ok(())
        } else {
            Err(self.system_error(&format!(
                "release of {:?} without a native reference",
                handle
            )))
        }
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn is_instance(&self, obj: ManagedRef, ty: ManagedType) -> bool {
        matches!(
            (self.load(obj), ty),
            (Ok(Object::Frame(_)), ManagedType::Frame) | (Ok(Object::Code(_)), ManagedType::Code)
        )
    }

    fn type_name(&self, obj: ManagedRef) -> String {
        self.type_of(obj)
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    fn str(&self, obj: ManagedRef) -> PyResult<ManagedRef> {
        let snapshot = self.load(obj)?;
        if let Object::Str(_) = snapshot {
            return Ok(obj);
        }
        match snapshot.attr(STR_HOOK) {
            Some(hook) => self.call_text_hook(obj, hook, STR_HOOK),
            None => self.repr(obj),
        }
    }

    fn repr(&self, obj: ManagedRef) -> PyResult<ManagedRef> {
        if let Some(hook) = self.load(obj)?.attr(REPR_HOOK) {
            return self.call_text_hook(obj, hook, REPR_HOOK);
        }
        let text = self.repr_text(obj)?;
        Ok(self.string(&text))
    }

    fn new_str(&self, s: &str) -> ManagedRef {
        self.string(s)
    }

    // ========================================================================
    // Attributes and Calls
    // ========================================================================

    fn get_attr(&self, obj: ManagedRef, name: &str) -> PyResult<ManagedRef> {
        let found = match self.load(obj)? {
            Object::Writer { write, .. } if name == "write" => Some(write),
            o => o.attr(name),
        };
        found.ok_or_else(|| {
            PyException::new(
                ExceptionKind::AttributeError,
                format!("'{}' object has no attribute '{}'", self.type_of(obj), name),
            )
        })
    }

    fn call(&self, callable: ManagedRef, args: &[ManagedRef]) -> PyResult<ManagedRef> {
        match self.load(callable)? {
            Object::Builtin { func, .. } => func(self, args),
            Object::Method { func, receiver } => self.call(func, &prepend(receiver, args)),
            o @ Object::Instance { .. } => match o.attr(CALL_HOOK) {
                Some(hook) => self.call(hook, &prepend(callable, args)),
                None => Err(not_callable(&self.type_of(callable))),
            },
            _ => Err(not_callable(&self.type_of(callable))),
        }
    }

    // ========================================================================
    // Frames
    // ========================================================================

    fn frame_code(&self, frame: ManagedRef) -> PyResult<ManagedRef> {
        Ok(self.load_frame(frame)?.code)
    }

    fn frame_line_number(&self, frame: ManagedRef) -> PyResult<i32> {
        let f = self.load_frame(frame)?;
        match self.load(f.code)? {
            Object::Code(code) => Ok(code.line_for(f.lasti)),
            _ => Err(self.system_error("frame without a code object")),
        }
    }

    fn frame_lasti(&self, frame: ManagedRef) -> PyResult<i32> {
        Ok(self.load_frame(frame)?.lasti)
    }

    fn frame_locals(&self, frame: ManagedRef) -> PyResult<ManagedRef> {
        Ok(self.load_frame(frame)?.locals)
    }

    fn frame_globals(&self, frame: ManagedRef) -> PyResult<ManagedRef> {
        Ok(self.load_frame(frame)?.globals)
    }

    fn frame_back(&self, frame: ManagedRef) -> PyResult<Option<ManagedRef>> {
        Ok(self.load_frame(frame)?.back)
    }

    fn frame_builtins(&self, frame: ManagedRef) -> PyResult<ManagedRef> {
        Ok(self.load_frame(frame)?.builtins)
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    fn is_iterator(&self, obj: ManagedRef) -> bool {
        match self.load(obj) {
            Ok(Object::SeqIter { .. } | Object::CallIter { .. }) => true,
            Ok(o @ Object::Instance { .. }) => o.attr(NEXT_HOOK).is_some(),
            _ => false,
        }
    }

    fn new_seq_iter(&self, seq: ManagedRef) -> ManagedRef {
        self.alloc(Object::SeqIter {
            seq,
            index: 0,
            exhausted: false,
        })
    }

    fn new_call_iter(&self, callable: ManagedRef, sentinel: ManagedRef) -> PyResult<ManagedRef> {
        if !self.is_callable(callable)? {
            return Err(PyException::type_error("iter(v, w): v must be callable"));
        }
        Ok(self.alloc(Object::CallIter {
            callable,
            sentinel,
            exhausted: false,
        }))
    }

    fn iter_next(&self, iter: ManagedRef) -> PyResult<Option<ManagedRef>> {
        match self.load(iter)? {
            Object::SeqIter { exhausted: true, .. } | Object::CallIter { exhausted: true, .. } => Ok(None),
            Object::SeqIter { seq, index, .. } => {
                let item = end_of_sequence(self.seq_item(seq, index))?;
                self.update(iter, |o| {
                    if let Object::SeqIter { index, exhausted, .. } = o {
                        match item {
                            Some(_) => *index += 1,
                            None => *exhausted = true,
                        }
                    }
                })?;
                Ok(item)
            }
            Object::CallIter { callable, sentinel, .. } => {
                let item = match stop_iteration(self.call(callable, &[]))? {
                    Some(value) if self.same_value(value, sentinel)? => None,
                    other => other,
                };
                if item.is_none() {
                    self.update(iter, |o| {
                        if let Object::CallIter { exhausted, .. } = o {
                            *exhausted = true;
                        }
                    })?;
                }
                Ok(item)
            }
            o @ Object::Instance { .. } => match o.attr(NEXT_HOOK) {
                Some(hook) => stop_iteration(self.call(hook, &[iter])),
                None => Err(not_an_iterator(&self.type_of(iter))),
            },
            _ => Err(not_an_iterator(&self.type_of(iter))),
        }
    }
}

impl Heap {
    fn load_frame(&self, frame: ManagedRef) -> PyResult<FrameObject> {
        match self.load(frame)? {
            Object::Frame(f) => Ok(f),
            _ => Err(self.system_error(&format!(
                "expected frame, got '{}'",
                self.type_of(frame)
            ))),
        }
    }

    fn is_callable(&self, obj: ManagedRef) -> PyResult<bool> {
        Ok(match self.load(obj)? {
            Object::Builtin { .. } | Object::Method { .. } => true,
            o @ Object::Instance { .. } => o.attr(CALL_HOOK).is_some(),
            _ => false,
        })
    }

    /// Call `__str__`/`__repr__` and insist on a str result
    fn call_text_hook(&self, obj: ManagedRef, hook: ManagedRef, name: &str) -> PyResult<ManagedRef> {
        let result = self.call(hook, &[obj])?;
        match self.load(result)? {
            Object::Str(_) => Ok(result),
            _ => Err(PyException::type_error(format!(
                "{} returned non-string (type {})",
                name,
                self.type_of(result)
            ))),
        }
    }

    fn repr_text(&self, obj: ManagedRef) -> PyResult<String> {
        Ok(match self.load(obj)? {
            Object::None => "None".to_string(),
            Object::NoValue => "<no value>".to_string(),
            Object::Int(i) => i.to_string(),
            Object::Str(s) => quote(&s),
            Object::List(items) => format!("[{}]", self.join_reprs(&items)?),
            Object::Tuple(items) if items.len() == 1 => format!("({},)", self.join_reprs(&items)?),
            Object::Tuple(items) => format!("({})", self.join_reprs(&items)?),
            Object::Dict(pairs) => {
                let mut parts = Vec::with_capacity(pairs.len());
                for (k, v) in pairs {
                    parts.push(format!("{}: {}", self.repr_of(k)?, self.repr_of(v)?));
                }
                format!("{{{}}}", parts.join(", "))
            }
            Object::Code(code) => format!("<code object {}>", code.name),
            Object::Builtin { name, .. } => format!("<built-in function {}>", name),
            o => format!("<{} object>", o.type_name()),
        })
    }

    fn repr_of(&self, obj: ManagedRef) -> PyResult<String> {
        let text = self.repr(obj)?;
        self.read_str(text)
    }

    fn join_reprs(&self, items: &[ManagedRef]) -> PyResult<String> {
        let mut parts = Vec::with_capacity(items.len());
        for &item in items {
            parts.push(self.repr_of(item)?);
        }
        Ok(parts.join(", "))
    }

    /// `seq[index]`; IndexError past the end
    fn seq_item(&self, seq: ManagedRef, index: usize) -> PyResult<ManagedRef> {
        match self.load(seq)? {
            Object::List(items) | Object::Tuple(items) => items
                .get(index)
                .copied()
                .ok_or_else(|| PyException::new(ExceptionKind::IndexError, "index out of range")),
            Object::Str(s) => match s.chars().nth(index) {
                Some(c) => Ok(self.string(&c.to_string())),
                None => Err(PyException::new(ExceptionKind::IndexError, "string index out of range")),
            },
            o @ Object::Instance { .. } => match o.attr(GETITEM_HOOK) {
                Some(hook) => {
                    let index = self.int(index as i64);
                    self.call(hook, &[seq, index])
                }
                None => Err(not_subscriptable(&self.type_of(seq))),
            },
            _ => Err(not_subscriptable(&self.type_of(seq))),
        }
    }
}

/// Sequence protocol: IndexError or StopIteration from `seq[i]` ends iteration
fn end_of_sequence(result: PyResult<ManagedRef>) -> PyResult<Option<ManagedRef>> {
    match result {
        Err(e) if e.is(ExceptionKind::IndexError) => Ok(None),
        other => stop_iteration(other),
    }
}

/// Only StopIteration ends iteration; anything else raised propagates
fn stop_iteration(result: PyResult<ManagedRef>) -> PyResult<Option<ManagedRef>> {
    match result {
        Ok(item) => Ok(Some(item)),
        Err(e) if e.is(ExceptionKind::StopIteration) => Ok(None),
        Err(e) => Err(e),
    }
}

fn prepend(first: ManagedRef, rest: &[ManagedRef]) -> Vec<ManagedRef> {
    let mut args = Vec::with_capacity(rest.len() + 1);
    args.push(first);
    args.extend_from_slice(rest);
    args
}

fn quote(s: &str) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delimiter);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}

fn not_callable(type_name: &str) -> PyException {
    PyException::type_error(format!("'{}' object is not callable", type_name))
}

fn not_an_iterator(type_name: &str) -> PyException {
    PyException::type_error(format!("'{}' object is not an iterator", type_name))
}

fn not_subscriptable(type_name: &str) -> PyException {
    PyException::type_error(format!("'{}' object is not subscriptable", type_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameSpec;

    fn text(heap: &Heap, obj: ManagedRef) -> String {
        heap.read_str(obj).unwrap()
    }

    #[test]
    fn test_repr_and_str() {
        let heap = Heap::new();
        let s = heap.string("X");
        assert_eq!(text(&heap, heap.str(s).unwrap()), "X");
        assert_eq!(text(&heap, heap.repr(s).unwrap()), "'X'");
        assert_eq!(text(&heap, heap.repr(heap.string("it's")).unwrap()), "\"it's\"");
        assert_eq!(text(&heap, heap.repr(heap.none()).unwrap()), "None");

        let one = heap.int(1);
        let list = heap.list(&[one, s]);
        assert_eq!(text(&heap, heap.repr(list).unwrap()), "[1, 'X']");
        assert_eq!(text(&heap, heap.str(list).unwrap()), "[1, 'X']");
        assert_eq!(text(&heap, heap.repr(heap.tuple(&[one])).unwrap()), "(1,)");

        let d = heap.dict(&[(s, one)]).unwrap();
        assert_eq!(text(&heap, heap.repr(d).unwrap()), "{'X': 1}");
    }

    #[test]
    fn test_instance_hooks() {
        let heap = Heap::new();
        let obj = heap.instance("Point");
        assert_eq!(text(&heap, heap.repr(obj).unwrap()), "<Point object>");

        let hook = heap.builtin("__str__", |heap, _args| Ok(heap.string("P(1, 2)")));
        heap.set_attr(obj, "__str__", hook).unwrap();
        assert_eq!(text(&heap, heap.str(obj).unwrap()), "P(1, 2)");
        assert_eq!(text(&heap, heap.repr(obj).unwrap()), "<Point object>");

        let bad = heap.builtin("__repr__", |heap, _args| Ok(heap.int(3)));
        heap.set_attr(obj, "__repr__", bad).unwrap();
        let err = heap.repr(obj).unwrap_err();
        assert!(err.message().contains("non-string"));
    }

    #[test]
    fn test_get_attr_missing() {
        let heap = Heap::new();
        let err = heap.get_attr(heap.int(1), "write").unwrap_err();
        assert!(err.is(ExceptionKind::AttributeError));
        assert_eq!(err.message(), "'int' object has no attribute 'write'");
    }

    #[test]
    fn test_writer_bound_write() {
        let heap = Heap::new();
        let w = heap.writer();
        let write = heap.get_attr(w, "write").unwrap();
        heap.call(write, &[heap.string("ab")]).unwrap();
        heap.call(write, &[heap.string("c")]).unwrap();
        assert_eq!(heap.writer_contents(w).unwrap(), "abc");
    }

    #[test]
    fn test_writer_write_lookup_is_cached() {
        let heap = Heap::new();
        let w = heap.writer();
        let other = heap.writer();
        let write = heap.get_attr(w, "write").unwrap();

        let next = heap.int(0);
        for _ in 0..10 {
            assert_eq!(heap.get_attr(w, "write").unwrap(), write);
        }
        assert_eq!(heap.int(0).raw(), next.raw() + 1);
        assert_ne!(heap.get_attr(other, "write").unwrap(), write);
    }

    #[test]
    fn test_call_non_callable() {
        let heap = Heap::new();
        let err = heap.call(heap.int(1), &[]).unwrap_err();
        assert!(err.is(ExceptionKind::TypeError));
    }

    #[test]
    fn test_handles() {
        let heap = Heap::new();
        let obj = heap.int(5);
        let borrowed = heap.borrowed_handle(obj);
        let owned = heap.new_handle(obj);
        assert_eq!(borrowed, owned);
        assert_eq!(heap.handle_refcount(obj), 1);
        assert_eq!(heap.resolve_handle(owned).unwrap(), obj);

        heap.release_handle(owned).unwrap();
        assert_eq!(heap.handle_refcount(obj), 0);
        assert!(heap.release_handle(owned).is_err());
        assert!(heap.resolve_handle(NativeValue::from_bits(8)).is_err());
    }

    #[test]
    fn test_frame_reads() {
        let heap = Heap::new();
        let g = heap.dict(&[]).unwrap();
        let b = heap.dict(&[]).unwrap();
        let code = heap.code("f", 10, &[(0, 11), (6, 13)]);
        let outer = heap.frame(FrameSpec::new(code, g, b)).unwrap();
        let inner = heap.frame(FrameSpec::new(code, g, b).back(outer).lasti(8)).unwrap();

        assert!(heap.is_instance(inner, ManagedType::Frame));
        assert!(heap.is_instance(code, ManagedType::Code));
        assert!(!heap.is_instance(code, ManagedType::Frame));
        assert_eq!(heap.frame_line_number(inner).unwrap(), 13);
        assert_eq!(heap.frame_line_number(outer).unwrap(), 10);
        assert_eq!(heap.frame_back(inner).unwrap(), Some(outer));
        assert_eq!(heap.frame_back(outer).unwrap(), None);
        assert_eq!(heap.frame_locals(inner).unwrap(), heap.frame_locals(inner).unwrap());
    }

    #[test]
    fn test_seq_iter() {
        let heap = Heap::new();
        let list = heap.list(&[heap.int(1), heap.int(2)]);
        let it = heap.new_seq_iter(list);
        assert!(heap.is_iterator(it));
        assert!(!heap.is_iterator(list));
        assert_eq!(heap.read_int(heap.iter_next(it).unwrap().unwrap()).unwrap(), 1);
        assert_eq!(heap.read_int(heap.iter_next(it).unwrap().unwrap()).unwrap(), 2);
        assert_eq!(heap.iter_next(it).unwrap(), None);
        assert_eq!(heap.iter_next(it).unwrap(), None);
    }

    #[test]
    fn test_seq_iter_fails_lazily() {
        let heap = Heap::new();
        let it = heap.new_seq_iter(heap.int(3));
        let err = heap.iter_next(it).unwrap_err();
        assert!(err.message().contains("not subscriptable"));
    }

    #[test]
    fn test_call_iter_stops_at_sentinel() {
        let heap = Heap::new();
        let counter = heap.instance("Counter");
        heap.set_attr(counter, "n", heap.int(0)).unwrap();
        let step = heap.builtin("step", move |heap, _args| {
            let n = heap.read_int(heap.get_attr(counter, "n")?)? + 1;
            heap.set_attr(counter, "n", heap.int(n))?;
            Ok(heap.int(n))
        });

        let it = heap.new_call_iter(step, heap.int(3)).unwrap();
        assert_eq!(heap.read_int(heap.iter_next(it).unwrap().unwrap()).unwrap(), 1);
        assert_eq!(heap.read_int(heap.iter_next(it).unwrap().unwrap()).unwrap(), 2);
        assert_eq!(heap.iter_next(it).unwrap(), None);
        assert_eq!(heap.iter_next(it).unwrap(), None);
    }

    #[test]
    fn test_only_sequences_end_on_index_error() {
        let heap = Heap::new();
        let raise = heap.builtin("raise", |_, _| Err(PyException::new(ExceptionKind::IndexError, "oops")));

        let it = heap.new_call_iter(raise, heap.none()).unwrap();
        assert!(heap.iter_next(it).unwrap_err().is(ExceptionKind::IndexError));

        let gen = heap.instance("Gen");
        heap.set_attr(gen, "__next__", raise).unwrap();
        assert!(heap.iter_next(gen).unwrap_err().is(ExceptionKind::IndexError));

        let seq = heap.instance("Seq");
        heap.set_attr(seq, "__getitem__", raise).unwrap();
        assert_eq!(heap.iter_next(heap.new_seq_iter(seq)).unwrap(), None);
    }

    #[test]
    fn test_call_iter_requires_callable() {
        let heap = Heap::new();
        let err = heap.new_call_iter(heap.int(1), heap.none()).unwrap_err();
        assert!(err.is(ExceptionKind::TypeError));
        assert_eq!(err.message(), "iter(v, w): v must be callable");
    }
}
