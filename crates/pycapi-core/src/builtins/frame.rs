//! Frame accessors (`PyFrame_*`)
//!
//! Thin: each accessor is one runtime read through `ManagedFrame`.

use pycapi_sdk::PyResult;

use crate::call::CApiCall;
use crate::descriptor::{ArgDescriptor, Param};
use crate::error::CApiResult;
use crate::marshal::ManagedResult;
use crate::registry::{BuiltinFn, CApiBuiltin, CApiRegistry};

const FRAME_ARG: &[Param] = &[Param::required("frame", ArgDescriptor::PyFrameObject)];

const ACCESSORS: &[(&str, ArgDescriptor, BuiltinFn)] = &[
    ("PyFrame_GetCode", ArgDescriptor::PyCodeObjectTransfer, py_frame_get_code),
    ("PyFrame_GetLineNumber", ArgDescriptor::Int, py_frame_get_line_number),
    ("PyFrame_GetLasti", ArgDescriptor::Int, py_frame_get_lasti),
    ("PyFrame_GetLocals", ArgDescriptor::PyObjectTransfer, py_frame_get_locals),
    ("PyFrame_GetGlobals", ArgDescriptor::PyObjectTransfer, py_frame_get_globals),
    ("PyFrame_GetBack", ArgDescriptor::PyFrameObjectTransfer, py_frame_get_back),
    ("PyFrame_GetBuiltins", ArgDescriptor::PyObjectTransfer, py_frame_get_builtins),
];

pub(super) fn register(registry: &mut CApiRegistry) -> CApiResult<()> {
    for &(name, ret, implementation) in ACCESSORS {
        registry.register(CApiBuiltin::direct(name, ret, FRAME_ARG, implementation))?;
    }
    Ok(())
}

fn py_frame_get_code(call: &CApiCall<'_>) -> PyResult<ManagedResult> {
    Ok(ManagedResult::Object(call.frame(0)?.code()?))
}

fn py_frame_get_line_number(call: &CApiCall<'_>) -> PyResult<ManagedResult> {
    Ok(ManagedResult::Int(call.frame(0)?.line_number()? as i64))
}

fn py_frame_get_lasti(call: &CApiCall<'_>) -> PyResult<ManagedResult> {
    Ok(ManagedResult::Int(call.frame(0)?.lasti()? as i64))
}

/// Hands out the frame's live locals mapping, not a copy
fn py_frame_get_locals(call: &CApiCall<'_>) -> PyResult<ManagedResult> {
    Ok(ManagedResult::Object(call.frame(0)?.locals()?))
}

fn py_frame_get_globals(call: &CApiCall<'_>) -> PyResult<ManagedResult> {
    Ok(ManagedResult::Object(call.frame(0)?.globals()?))
}

/// NULL without an exception at the top of the call chain
fn py_frame_get_back(call: &CApiCall<'_>) -> PyResult<ManagedResult> {
    Ok(match call.frame(0)?.back()? {
        Some(back) => ManagedResult::Object(back),
        None => ManagedResult::Null,
    })
}

fn py_frame_get_builtins(call: &CApiCall<'_>) -> PyResult<ManagedResult> {
    Ok(ManagedResult::Object(call.frame(0)?.builtins()?))
}
