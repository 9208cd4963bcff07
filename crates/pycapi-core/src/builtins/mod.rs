//! Builtin C API entry points
//!
//! Each submodule owns one family of symbols and registers its table rows.
//! Operations here only see validated arguments; marshaling, ownership and
//! NULL checks happen before they run.

mod file;
mod frame;
mod iter;

use crate::error::CApiResult;
use crate::registry::CApiRegistry;

/// Register every builtin entry, in table order
pub(crate) fn register_all(registry: &mut CApiRegistry) -> CApiResult<()> {
    file::register(registry)?;
    frame::register(registry)?;
    iter::register(registry)?;
    Ok(())
}
