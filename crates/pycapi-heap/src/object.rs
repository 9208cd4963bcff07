//! Object representation of the reference heap

use std::sync::Arc;

use pycapi_sdk::{ManagedRef, PyResult};

use crate::heap::Heap;

/// Body of a builtin callable. Receives the heap and the positional arguments.
pub type NativeFn = Arc<dyn Fn(&Heap, &[ManagedRef]) -> PyResult<ManagedRef> + Send + Sync>;

/// Code object: name, first line and an offset-to-line table
#[derive(Debug, Clone)]
pub(crate) struct CodeObject {
    pub(crate) name: String,
    pub(crate) first_line: i32,
    /// `(start offset, line)`, sorted by offset
    pub(crate) line_table: Vec<(i32, i32)>,
}

impl CodeObject {
    /// Line of the instruction at `lasti`.
    ///
    /// The last table row starting at or before `lasti` wins. Before the
    /// first instruction runs (`lasti < 0`) or before the first row, the
    /// code's first line is reported.
    pub(crate) fn line_for(&self, lasti: i32) -> i32 {
        if lasti < 0 {
            return self.first_line;
        }
        self.line_table
            .iter()
            .take_while(|(start, _)| *start <= lasti)
            .last()
            .map(|&(_, line)| line)
            .unwrap_or(self.first_line)
    }
}

/// Execution frame
#[derive(Debug, Clone)]
pub(crate) struct FrameObject {
    pub(crate) code: ManagedRef,
    pub(crate) lasti: i32,
    pub(crate) locals: ManagedRef,
    pub(crate) globals: ManagedRef,
    pub(crate) builtins: ManagedRef,
    pub(crate) back: Option<ManagedRef>,
}

/// What it takes to build a frame
#[derive(Debug, Clone, Copy)]
pub struct FrameSpec {
    /// Code object being executed
    pub code: ManagedRef,
    /// Globals dict
    pub globals: ManagedRef,
    /// Builtins dict
    pub builtins: ManagedRef,
    /// Locals dict; a fresh empty dict when `None`
    pub locals: Option<ManagedRef>,
    /// Calling frame
    pub back: Option<ManagedRef>,
    /// Instruction offset, `-1` before the first instruction
    pub lasti: i32,
}

impl FrameSpec {
    /// Top-level frame about to start `code`
    pub fn new(code: ManagedRef, globals: ManagedRef, builtins: ManagedRef) -> Self {
        Self {
            code,
            globals,
            builtins,
            locals: None,
            back: None,
            lasti: -1,
        }
    }

    /// Set the calling frame
    pub fn back(mut self, back: ManagedRef) -> Self {
        self.back = Some(back);
        self
    }

    /// Use an existing locals dict
    pub fn locals(mut self, locals: ManagedRef) -> Self {
        self.locals = Some(locals);
        self
    }

    /// Set the instruction offset
    pub fn lasti(mut self, lasti: i32) -> Self {
        self.lasti = lasti;
        self
    }
}

/// A heap object
#[derive(Clone)]
pub(crate) enum Object {
    None,
    NoValue,
    Int(i64),
    Str(String),
    List(Vec<ManagedRef>),
    Tuple(Vec<ManagedRef>),
    /// Insertion-ordered pairs
    Dict(Vec<(ManagedRef, ManagedRef)>),
    Code(CodeObject),
    Frame(FrameObject),
    SeqIter {
        seq: ManagedRef,
        index: usize,
        exhausted: bool,
    },
    CallIter {
        callable: ManagedRef,
        sentinel: ManagedRef,
        exhausted: bool,
    },
    Builtin {
        name: String,
        func: NativeFn,
    },
    /// `func` called with `receiver` prepended
    Method {
        func: ManagedRef,
        receiver: ManagedRef,
    },
    Instance {
        class_name: String,
        attrs: Vec<(String, ManagedRef)>,
    },
    /// Text sink; `write` is its bound method, built with it
    Writer {
        buffer: String,
        write: ManagedRef,
    },
}

impl Object {
    pub(crate) fn type_name(&self) -> &str {
        match self {
            Object::None => "NoneType",
            Object::NoValue => "NoValueType",
            Object::Int(_) => "int",
            Object::Str(_) => "str",
            Object::List(_) => "list",
            Object::Tuple(_) => "tuple",
            Object::Dict(_) => "dict",
            Object::Code(_) => "code",
            Object::Frame(_) => "frame",
            Object::SeqIter { .. } => "iterator",
            Object::CallIter { .. } => "callable_iterator",
            Object::Builtin { .. } => "builtin_function_or_method",
            Object::Method { .. } => "method",
            Object::Instance { class_name, .. } => class_name.as_str(),
            Object::Writer { .. } => "writer",
        }
    }

    pub(crate) fn attr(&self, name: &str) -> Option<ManagedRef> {
        match self {
            Object::Instance { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|&(_, value)| value),
            _ => None,
        }
    }
}
