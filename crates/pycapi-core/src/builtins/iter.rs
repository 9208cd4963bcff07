//! Iterator entry points (`PyIter_*`, `PySeqIter_New`, `PyCallIter_New`)

use pycapi_sdk::PyResult;

use crate::call::CApiCall;
use crate::descriptor::{ArgDescriptor, Param};
use crate::error::CApiResult;
use crate::marshal::ManagedResult;
use crate::registry::{CApiBuiltin, CApiRegistry};

const ONE_OBJECT: &[Param] = &[Param::required("o", ArgDescriptor::PyObject)];

const CALL_ITER_ARGS: &[Param] = &[
    Param::required("callable", ArgDescriptor::PyObject),
    Param::required("sentinel", ArgDescriptor::PyObject),
];

pub(super) fn register(registry: &mut CApiRegistry) -> CApiResult<()> {
    registry.register(CApiBuiltin::direct("PyIter_Check", ArgDescriptor::Int, ONE_OBJECT, py_iter_check))?;
    registry.register(CApiBuiltin::direct(
        "PyIter_Next",
        ArgDescriptor::PyObjectTransfer,
        ONE_OBJECT,
        py_iter_next,
    ))?;
    registry.register(CApiBuiltin::direct(
        "PySeqIter_New",
        ArgDescriptor::PyObjectTransfer,
        ONE_OBJECT,
        py_seq_iter_new,
    ))?;
    registry.register(CApiBuiltin::direct(
        "PyCallIter_New",
        ArgDescriptor::PyObjectTransfer,
        CALL_ITER_ARGS,
        py_call_iter_new,
    ))?;
    Ok(())
}

/// 1 if the object implements the iterator protocol, else 0. Never raises.
fn py_iter_check(call: &CApiCall<'_>) -> PyResult<ManagedResult> {
    let o = call.object(0)?;
    Ok(ManagedResult::Int(call.runtime().is_iterator(o) as i64))
}

/// Exhaustion is NULL with no pending exception
fn py_iter_next(call: &CApiCall<'_>) -> PyResult<ManagedResult> {
    let o = call.object(0)?;
    Ok(match call.runtime().iter_next(o)? {
        Some(item) => ManagedResult::Object(item),
        None => ManagedResult::Null,
    })
}

fn py_seq_iter_new(call: &CApiCall<'_>) -> PyResult<ManagedResult> {
    let seq = call.object(0)?;
    Ok(ManagedResult::Object(call.runtime().new_seq_iter(seq)))
}

fn py_call_iter_new(call: &CApiCall<'_>) -> PyResult<ManagedResult> {
    let callable = call.object(0)?;
    let sentinel = call.object(1)?;
    Ok(ManagedResult::Object(call.runtime().new_call_iter(callable, sentinel)?))
}
