//! File object entry points (`PyFile_*`)

use pycapi_sdk::PyResult;

use crate::call::CApiCall;
use crate::descriptor::{ArgDescriptor, Param};
use crate::error::CApiResult;
use crate::marshal::ManagedResult;
use crate::registry::{CApiBuiltin, CApiRegistry, CallPath};

/// Attribute called on the target object
const WRITE: &str = "write";

/// Text written in place of the "no value" sentinel
const NULL_PLACEHOLDER: &str = "<NULL>";

/// `Py_PRINT_RAW`: write `str(obj)` instead of `repr(obj)`
const PRINT_RAW: i64 = 0x1;

const WRITE_OBJECT_ARGS: &[Param] = &[
    Param::required("obj", ArgDescriptor::PyObject),
    Param::required("f", ArgDescriptor::PyObject),
    Param::optional("flags", ArgDescriptor::Int),
];

const WRITE_STRING_ARGS: &[Param] = &[
    Param::required("s", ArgDescriptor::ConstCharPtr),
    Param::required("f", ArgDescriptor::PyObject),
];

const FROM_FD_ARGS: &[Param] = &[
    Param::optional("fd", ArgDescriptor::Int),
    Param::optional("name", ArgDescriptor::ConstCharPtr),
    Param::optional("mode", ArgDescriptor::ConstCharPtr),
    Param::optional("buffering", ArgDescriptor::Int),
    Param::optional("encoding", ArgDescriptor::ConstCharPtr),
    Param::optional("errors", ArgDescriptor::ConstCharPtr),
    Param::optional("newline", ArgDescriptor::ConstCharPtr),
    Param::optional("closefd", ArgDescriptor::Int),
];

pub(super) fn register(registry: &mut CApiRegistry) -> CApiResult<()> {
    registry.register(CApiBuiltin::direct(
        "PyFile_WriteObject",
        ArgDescriptor::Int,
        WRITE_OBJECT_ARGS,
        py_file_write_object,
    ))?;
    registry.register(CApiBuiltin::declared(
        "PyFile_WriteString",
        ArgDescriptor::Int,
        WRITE_STRING_ARGS,
        CallPath::CImpl,
    ))?;
    registry.register(CApiBuiltin::declared(
        "PyFile_FromFd",
        ArgDescriptor::PyObjectTransfer,
        FROM_FD_ARGS,
        CallPath::NotImplemented,
    ))?;
    Ok(())
}

/// `int PyFile_WriteObject(PyObject *obj, PyObject *f, int flags)`
///
/// Writes the text form of `obj` through `f.write`. Only the `PRINT_RAW`
/// bit of `flags` is looked at. The write's own return value is discarded.
fn py_file_write_object(call: &CApiCall<'_>) -> PyResult<ManagedResult> {
    let rt = call.runtime();
    let obj = call.object(0)?;
    let f = call.object(1)?;
    let flags = call.int(2)?;

    let text = if rt.is_no_value(obj) {
        rt.new_str(NULL_PLACEHOLDER)
    } else if flags & PRINT_RAW != 0 {
        rt.str(obj)?
    } else {
        rt.repr(obj)?
    };

    let write = rt.get_attr(f, WRITE)?;
    rt.call(write, &[text])?;
    Ok(ManagedResult::Int(0))
}
