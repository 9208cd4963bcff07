//! Argument marshaler
//!
//! Converts native words into managed values according to a call's
//! descriptor list (`marshal_in`) and converts an operation's result back
//! (`marshal_out`), applying the ownership rule of each slot.
//!
//! Specialized handle kinds are type-checked here, before any operation runs.
//! NULL handles are not rejected here; they come out as `ManagedArg::Null`
//! and the null guard decides whether the slot allows that.

use pycapi_sdk::{ManagedRef, ManagedRuntime, NativeValue, PyResult};

use crate::descriptor::{ArgDescriptor, Direction, Ownership, Param, WireKind};

// ============================================================================
// Managed-side values
// ============================================================================

/// One marshaled argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedArg {
    /// Integer slot (`int`, `long`, `Py_ssize_t`)
    Int(i64),
    /// Raw pointer slot, never dereferenced
    Pointer(NativeValue),
    /// Resolved object handle
    Object(ManagedRef),
    /// NULL object handle
    Null,
}

impl ManagedArg {
    /// NULL object handle or NULL pointer
    pub fn is_null(&self) -> bool {
        match self {
            ManagedArg::Null => true,
            ManagedArg::Pointer(p) => p.is_null(),
            _ => false,
        }
    }
}

/// What an operation hands back before conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedResult {
    /// Integer (status codes, predicates, line numbers)
    Int(i64),
    /// Managed object
    Object(ManagedRef),
    /// NULL without an exception (root frame's parent, exhausted iterator)
    Null,
    /// Nothing
    Void,
}

/// A converted return value tagged with its ownership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeResult {
    /// Word handed to the native caller
    pub value: NativeValue,
    /// Ownership of `value`; `None` for plain values and NULL
    pub ownership: Option<Ownership>,
}

impl NativeResult {
    fn plain(value: NativeValue) -> Self {
        Self {
            value,
            ownership: None,
        }
    }
}

// ============================================================================
// marshal_in
// ============================================================================

/// Convert native arguments into managed arguments.
///
/// `args` must already have the declared arity. Transfer-in slots consume
/// the caller's reference as soon as the handle is resolved.
pub fn marshal_in(
    rt: &dyn ManagedRuntime,
    symbol: &str,
    params: &[Param],
    args: &[NativeValue],
) -> PyResult<Vec<ManagedArg>> {
    let mut values = Vec::with_capacity(params.len());
    for (index, (param, &word)) in params.iter().zip(args).enumerate() {
        let value = match param.descriptor.wire() {
            WireKind::Int32 => ManagedArg::Int(word.as_i32() as i64),
            WireKind::Int64 => ManagedArg::Int(word.as_i64()),
            WireKind::Pointer => ManagedArg::Pointer(word),
            WireKind::Object => marshal_object_in(rt, symbol, index, param, word)?,
            WireKind::Void => {
                return Err(rt.system_error(&format!(
                    "{}: argument {} ('{}') has no wire representation",
                    symbol, index, param.name
                )));
            }
        };
        values.push(value);
    }
    Ok(values)
}

fn marshal_object_in(
    rt: &dyn ManagedRuntime,
    symbol: &str,
    index: usize,
    param: &Param,
    word: NativeValue,
) -> PyResult<ManagedArg> {
    if word.is_null() {
        return Ok(ManagedArg::Null);
    }
    let obj = rt.resolve_handle(word)?;
    // a stolen reference is consumed even when the type check below fails
    if param.descriptor.ownership(Direction::In) == Some(Ownership::TransferIn) {
        rt.release_handle(word)?;
    }
    if let Some(ty) = param.descriptor.managed_type() {
        if !rt.is_instance(obj, ty) {
            return Err(rt.system_error(&format!(
                "{}: argument {} ('{}') must be a {} object, not '{}'",
                symbol,
                index,
                param.name,
                ty,
                rt.type_name(obj)
            )));
        }
    }
    Ok(ManagedArg::Object(obj))
}

// ============================================================================
// marshal_out
// ============================================================================

/// Convert an operation's result for the native caller.
///
/// A transfer return acquires a fresh native reference; a borrowed return
/// hands out a handle the caller must not release. With `check_types` set,
/// specialized return descriptors are verified against the managed type.
pub fn marshal_out(
    rt: &dyn ManagedRuntime,
    symbol: &str,
    ret: ArgDescriptor,
    result: ManagedResult,
    check_types: bool,
) -> PyResult<NativeResult> {
    match (ret.wire(), result) {
        (WireKind::Int32, ManagedResult::Int(i)) => Ok(NativeResult::plain(NativeValue::int(i as i32))),
        (WireKind::Int64, ManagedResult::Int(i)) => Ok(NativeResult::plain(NativeValue::ssize(i))),
        (WireKind::Object, ManagedResult::Object(obj)) => {
            if check_types {
                if let Some(ty) = ret.managed_type() {
                    if !rt.is_instance(obj, ty) {
                        return Err(rt.system_error(&format!(
                            "{}: returned '{}' where a {} object was declared",
                            symbol,
                            rt.type_name(obj),
                            ty
                        )));
                    }
                }
            }
            let ownership = ret.ownership(Direction::Out);
            let value = match ownership {
                Some(Ownership::TransferOut) => rt.new_handle(obj),
                _ => rt.borrowed_handle(obj),
            };
            Ok(NativeResult { value, ownership })
        }
        (WireKind::Object | WireKind::Pointer, ManagedResult::Null) => {
            Ok(NativeResult::plain(NativeValue::NULL))
        }
        (WireKind::Void, ManagedResult::Void) => Ok(NativeResult::plain(NativeValue::NULL)),
        (_, other) => Err(rt.system_error(&format!(
            "{}: result {:?} does not fit a '{}' return slot",
            symbol,
            other,
            ret.c_type()
        ))),
    }
}
