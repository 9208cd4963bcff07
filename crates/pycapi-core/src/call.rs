//! CApiCall - what an operation implementation receives
//!
//! Arguments arrive already marshaled and null-checked. The accessors only
//! fail if an operation reads a slot with the wrong kind, which means the
//! entry's descriptor list and its implementation disagree.

use pycapi_sdk::{ManagedFrame, ManagedRef, ManagedRuntime, PyException, PyResult};

use crate::marshal::ManagedArg;

/// A marshaled, validated native call
pub struct CApiCall<'a> {
    runtime: &'a dyn ManagedRuntime,
    symbol: &'static str,
    args: Vec<ManagedArg>,
}

impl<'a> CApiCall<'a> {
    /// Bundle marshaled arguments for an operation
    pub fn new(runtime: &'a dyn ManagedRuntime, symbol: &'static str, args: Vec<ManagedArg>) -> Self {
        Self {
            runtime,
            symbol,
            args,
        }
    }

    /// The managed runtime to operate on
    pub fn runtime(&self) -> &'a dyn ManagedRuntime {
        self.runtime
    }

    /// Entry point name
    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Check if the call has no arguments
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Raw marshaled argument
    pub fn arg(&self, index: usize) -> Option<ManagedArg> {
        self.args.get(index).copied()
    }

    /// Object argument
    pub fn object(&self, index: usize) -> PyResult<ManagedRef> {
        match self.arg(index) {
            Some(ManagedArg::Object(obj)) => Ok(obj),
            other => Err(self.mismatch(index, "object", other)),
        }
    }

    /// Object argument that may be NULL
    pub fn object_or_null(&self, index: usize) -> PyResult<Option<ManagedRef>> {
        match self.arg(index) {
            Some(ManagedArg::Object(obj)) => Ok(Some(obj)),
            Some(ManagedArg::Null) => Ok(None),
            other => Err(self.mismatch(index, "object", other)),
        }
    }

    /// Integer argument
    pub fn int(&self, index: usize) -> PyResult<i64> {
        match self.arg(index) {
            Some(ManagedArg::Int(i)) => Ok(i),
            other => Err(self.mismatch(index, "integer", other)),
        }
    }

    /// Frame argument, as a typed view
    pub fn frame(&self, index: usize) -> PyResult<ManagedFrame<'a>> {
        ManagedFrame::wrap(self.runtime, self.object(index)?)
    }

    fn mismatch(&self, index: usize, expected: &str, got: Option<ManagedArg>) -> PyException {
        self.runtime.system_error(&format!(
            "{}: argument {} read as {}, but it is {:?}",
            self.symbol, index, expected, got
        ))
    }
}
