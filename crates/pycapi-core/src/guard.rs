//! Null/validity guard
//!
//! Enforces the implicit non-NULL contract of required slots. The dispatcher
//! runs it for every entry, after marshaling and before the operation, so
//! failure ordering is the same everywhere and no operation handles NULL on
//! its own.

use pycapi_sdk::{ManagedRuntime, PyResult};

use crate::descriptor::Param;
use crate::marshal::ManagedArg;

/// Reject a NULL value in a required slot with the runtime's system error
pub fn require_non_null(
    rt: &dyn ManagedRuntime,
    symbol: &str,
    index: usize,
    param: &Param,
    value: ManagedArg,
) -> PyResult<ManagedArg> {
    if param.required && value.is_null() {
        return Err(rt.system_error(&format!(
            "null argument to internal routine: {} argument {} ('{}')",
            symbol, index, param.name
        )));
    }
    Ok(value)
}

/// Check every required slot of a marshaled call, first violation wins
pub fn check_required(
    rt: &dyn ManagedRuntime,
    symbol: &str,
    params: &[Param],
    values: &[ManagedArg],
) -> PyResult<()> {
    for (index, (param, &value)) in params.iter().zip(values).enumerate() {
        require_non_null(rt, symbol, index, param, value)?;
    }
    Ok(())
}
