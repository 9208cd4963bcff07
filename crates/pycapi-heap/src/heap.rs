//! Heap - object store and builders
//!
//! Objects live in one append-only table; a `ManagedRef` is an index into it.
//! Nothing is ever freed. The store lock is only held for plain reads and
//! writes of a single slot, never while calling back into a callable.

use std::sync::Arc;

use parking_lot::RwLock;
use pycapi_sdk::{ExceptionKind, ManagedRef, PyException, PyResult};

use crate::handles::HandleTable;
use crate::object::{CodeObject, FrameObject, FrameSpec, NativeFn, Object};

/// In-process managed heap implementing `ManagedRuntime`
pub struct Heap {
    objects: RwLock<Vec<Object>>,
    pub(crate) handles: HandleTable,
    none: ManagedRef,
    no_value: ManagedRef,
    /// Shared body of every writer's bound `write`
    pub(crate) writer_write: ManagedRef,
}

impl Heap {
    /// Create a heap holding only the singletons
    pub fn new() -> Self {
        let objects = vec![
            Object::None,
            Object::NoValue,
            Object::Builtin {
                name: "write".to_string(),
                func: Arc::new(writer_write),
            },
        ];
        Self {
            objects: RwLock::new(objects),
            handles: HandleTable::default(),
            none: ManagedRef::from_raw(0),
            no_value: ManagedRef::from_raw(1),
            writer_write: ManagedRef::from_raw(2),
        }
    }

    // ========================================================================
    // Store access
    // ========================================================================

    pub(crate) fn alloc(&self, obj: Object) -> ManagedRef {
        let mut objects = self.objects.write();
        objects.push(obj);
        ManagedRef::from_raw((objects.len() - 1) as u64)
    }

    pub(crate) fn contains(&self, obj: ManagedRef) -> bool {
        (obj.raw() as usize) < self.objects.read().len()
    }

    /// Snapshot of an object, taken under the read lock
    pub(crate) fn load(&self, obj: ManagedRef) -> PyResult<Object> {
        self.objects
            .read()
            .get(obj.raw() as usize)
            .cloned()
            .ok_or_else(|| dangling(obj))
    }

    /// Run `f` on an object under the write lock. `f` must not call back into the heap.
    pub(crate) fn update<R>(&self, obj: ManagedRef, f: impl FnOnce(&mut Object) -> R) -> PyResult<R> {
        let mut objects = self.objects.write();
        let slot = objects.get_mut(obj.raw() as usize).ok_or_else(|| dangling(obj))?;
        Ok(f(slot))
    }

    pub(crate) fn type_of(&self, obj: ManagedRef) -> String {
        match self.objects.read().get(obj.raw() as usize) {
            Some(o) => o.type_name().to_string(),
            None => "<dangling>".to_string(),
        }
    }

    pub(crate) fn none_ref(&self) -> ManagedRef {
        self.none
    }

    pub(crate) fn no_value_ref(&self) -> ManagedRef {
        self.no_value
    }

    // ========================================================================
    // Builders
    // ========================================================================

    /// New integer
    pub fn int(&self, value: i64) -> ManagedRef {
        self.alloc(Object::Int(value))
    }

    /// New string
    pub fn string(&self, value: &str) -> ManagedRef {
        self.alloc(Object::Str(value.to_string()))
    }

    /// New list
    pub fn list(&self, items: &[ManagedRef]) -> ManagedRef {
        self.alloc(Object::List(items.to_vec()))
    }

    /// New tuple
    pub fn tuple(&self, items: &[ManagedRef]) -> ManagedRef {
        self.alloc(Object::Tuple(items.to_vec()))
    }

    /// New dict from key/value pairs; later duplicates overwrite earlier ones
    pub fn dict(&self, pairs: &[(ManagedRef, ManagedRef)]) -> PyResult<ManagedRef> {
        let dict = self.alloc(Object::Dict(Vec::new()));
        for &(key, value) in pairs {
            self.dict_set(dict, key, value)?;
        }
        Ok(dict)
    }

    /// `dict[key] = value`
    pub fn dict_set(&self, dict: ManagedRef, key: ManagedRef, value: ManagedRef) -> PyResult<()> {
        let position = self.dict_position(dict, key)?;
        let type_name = self.type_of(dict);
        self.update(dict, |o| match o {
            Object::Dict(pairs) => {
                match position {
                    Some(i) => pairs[i].1 = value,
                    None => pairs.push((key, value)),
                }
                Ok(())
            }
            _ => Err(not_a_dict(&type_name)),
        })?
    }

    /// `dict.get(key)`
    pub fn dict_get(&self, dict: ManagedRef, key: ManagedRef) -> PyResult<Option<ManagedRef>> {
        let position = self.dict_position(dict, key)?;
        match (self.load(dict)?, position) {
            (Object::Dict(pairs), Some(i)) => Ok(Some(pairs[i].1)),
            _ => Ok(None),
        }
    }

    /// Number of entries in a dict
    pub fn dict_len(&self, dict: ManagedRef) -> PyResult<usize> {
        match self.load(dict)? {
            Object::Dict(pairs) => Ok(pairs.len()),
            _ => Err(not_a_dict(&self.type_of(dict))),
        }
    }

    fn dict_position(&self, dict: ManagedRef, key: ManagedRef) -> PyResult<Option<usize>> {
        match self.load(dict)? {
            Object::Dict(pairs) => {
                for (i, &(k, _)) in pairs.iter().enumerate() {
                    if self.same_value(k, key)? {
                        return Ok(Some(i));
                    }
                }
                Ok(None)
            }
            _ => Err(not_a_dict(&self.type_of(dict))),
        }
    }

    /// Identity, or equal int/str payloads
    pub(crate) fn same_value(&self, a: ManagedRef, b: ManagedRef) -> PyResult<bool> {
        if a == b {
            return Ok(true);
        }
        Ok(match (self.load(a)?, self.load(b)?) {
            (Object::Int(x), Object::Int(y)) => x == y,
            (Object::Str(x), Object::Str(y)) => x == y,
            _ => false,
        })
    }

    /// New code object. `line_table` maps instruction start offsets to lines.
    pub fn code(&self, name: &str, first_line: i32, line_table: &[(i32, i32)]) -> ManagedRef {
        let mut line_table = line_table.to_vec();
        line_table.sort_by_key(|&(start, _)| start);
        self.alloc(Object::Code(CodeObject {
            name: name.to_string(),
            first_line,
            line_table,
        }))
    }

    /// New frame
    pub fn frame(&self, spec: FrameSpec) -> PyResult<ManagedRef> {
        self.expect_kind(spec.code, "code", |o| matches!(o, Object::Code(_)))?;
        for mapping in [Some(spec.globals), Some(spec.builtins), spec.locals].into_iter().flatten() {
            self.expect_kind(mapping, "dict", |o| matches!(o, Object::Dict(_)))?;
        }
        if let Some(back) = spec.back {
            self.expect_kind(back, "frame", |o| matches!(o, Object::Frame(_)))?;
        }
        let locals = match spec.locals {
            Some(locals) => locals,
            None => self.alloc(Object::Dict(Vec::new())),
        };
        Ok(self.alloc(Object::Frame(FrameObject {
            code: spec.code,
            lasti: spec.lasti,
            locals,
            globals: spec.globals,
            builtins: spec.builtins,
            back: spec.back,
        })))
    }

    /// Move a frame to another instruction offset
    pub fn set_lasti(&self, frame: ManagedRef, lasti: i32) -> PyResult<()> {
        let type_name = self.type_of(frame);
        self.update(frame, |o| match o {
            Object::Frame(f) => {
                f.lasti = lasti;
                Ok(())
            }
            _ => Err(PyException::type_error(format!("expected frame, got '{}'", type_name))),
        })?
    }

    /// New builtin callable
    pub fn builtin<F>(&self, name: &str, func: F) -> ManagedRef
    where
        F: Fn(&Heap, &[ManagedRef]) -> PyResult<ManagedRef> + Send + Sync + 'static,
    {
        let func: NativeFn = Arc::new(func);
        self.alloc(Object::Builtin {
            name: name.to_string(),
            func,
        })
    }

    /// New instance of a named class with no attributes
    pub fn instance(&self, class_name: &str) -> ManagedRef {
        self.alloc(Object::Instance {
            class_name: class_name.to_string(),
            attrs: Vec::new(),
        })
    }

    /// `obj.name = value` (instances only)
    pub fn set_attr(&self, obj: ManagedRef, name: &str, value: ManagedRef) -> PyResult<()> {
        let type_name = self.type_of(obj);
        self.update(obj, |o| match o {
            Object::Instance { attrs, .. } => {
                match attrs.iter_mut().find(|(key, _)| key == name) {
                    Some(slot) => slot.1 = value,
                    None => attrs.push((name.to_string(), value)),
                }
                Ok(())
            }
            _ => Err(PyException::new(
                ExceptionKind::AttributeError,
                format!("'{}' object attribute '{}' is read-only", type_name, name),
            )),
        })?
    }

    /// New text sink whose `write` appends to an internal buffer
    pub fn writer(&self) -> ManagedRef {
        let mut objects = self.objects.write();
        let writer = ManagedRef::from_raw(objects.len() as u64);
        let write = ManagedRef::from_raw(objects.len() as u64 + 1);
        objects.push(Object::Writer {
            buffer: String::new(),
            write,
        });
        objects.push(Object::Method {
            func: self.writer_write,
            receiver: writer,
        });
        writer
    }

    /// Everything written to a writer so far
    pub fn writer_contents(&self, writer: ManagedRef) -> PyResult<String> {
        match self.load(writer)? {
            Object::Writer { buffer, .. } => Ok(buffer),
            _ => Err(PyException::type_error(format!(
                "expected writer, got '{}'",
                self.type_of(writer)
            ))),
        }
    }

    /// Contents of a string object
    pub fn read_str(&self, obj: ManagedRef) -> PyResult<String> {
        match self.load(obj)? {
            Object::Str(s) => Ok(s),
            _ => Err(PyException::type_error(format!(
                "expected str, got '{}'",
                self.type_of(obj)
            ))),
        }
    }

    /// Contents of an int object
    pub fn read_int(&self, obj: ManagedRef) -> PyResult<i64> {
        match self.load(obj)? {
            Object::Int(i) => Ok(i),
            _ => Err(PyException::type_error(format!(
                "expected int, got '{}'",
                self.type_of(obj)
            ))),
        }
    }

    /// Native references currently held on `obj`
    pub fn handle_refcount(&self, obj: ManagedRef) -> usize {
        self.handles.count(obj)
    }

    fn expect_kind(&self, obj: ManagedRef, expected: &str, is: impl Fn(&Object) -> bool) -> PyResult<()> {
        if is(&self.load(obj)?) {
            Ok(())
        } else {
            Err(PyException::type_error(format!(
                "expected {}, got '{}'",
                expected,
                self.type_of(obj)
            )))
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of `writer.write(text)`: appends and returns the number of characters
fn writer_write(heap: &Heap, args: &[ManagedRef]) -> PyResult<ManagedRef> {
    let (writer, text) = match args {
        [writer, text] => (*writer, *text),
        _ => {
            return Err(PyException::type_error(format!(
                "write() takes exactly one argument ({} given)",
                args.len().saturating_sub(1)
            )))
        }
    };
    let text = match heap.load(text)? {
        Object::Str(s) => s,
        _ => {
            return Err(PyException::type_error(format!(
                "write() argument must be str, not {}",
                heap.type_of(text)
            )))
        }
    };
    let written = text.chars().count() as i64;
    heap.update(writer, |o| match o {
        Object::Writer { buffer, .. } => {
            buffer.push_str(&text);
            Ok(())
        }
        _ => Err(PyException::type_error("write() called on a non-writer")),
    })??;
    Ok(heap.int(written))
}

fn dangling(obj: ManagedRef) -> PyException {
    PyException::system_error(format!("dangling managed reference {}", obj.raw()))
}

fn not_a_dict(type_name: &str) -> PyException {
    PyException::type_error(format!("expected dict, got '{}'", type_name))
}
