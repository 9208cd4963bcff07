//! ManagedRuntime trait - the managed side of the boundary
//!
//! Defines every operation the C-API core needs from the managed runtime.
//! The core programs against this trait only; it never depends on the
//! runtime's object layout, frame representation or memory manager.

use crate::error::{PyException, PyResult};
use crate::types::{ManagedRef, ManagedType};
use crate::value::NativeValue;

/// Abstract managed runtime.
///
/// This trait is the single entry point for all managed operations reached
/// from native code. An embedding provides the concrete implementation;
/// `pycapi-heap` ships a small in-process one.
///
/// # Threading
///
/// The core calls these methods synchronously on the native caller's thread
/// and adds no locking of its own. Concurrent use of the same object from
/// several threads is governed by the implementation.
pub trait ManagedRuntime {
    // ========================================================================
    // Singletons
    // ========================================================================

    /// The language-level `None`
    fn none(&self) -> ManagedRef;

    /// The "no value" sentinel, distinct from both `None` and a NULL handle
    fn no_value(&self) -> ManagedRef;

    /// Check for the "no value" sentinel
    fn is_no_value(&self, obj: ManagedRef) -> bool {
        obj == self.no_value()
    }

    // ========================================================================
    // Exceptions
    // ========================================================================

    /// Build the runtime's canonical `SystemError`
    fn system_error(&self, message: &str) -> PyException {
        PyException::system_error(message)
    }

    // ========================================================================
    // Native Handles
    // ========================================================================

    /// Resolve a non-NULL native object handle to its managed value
    fn resolve_handle(&self, handle: NativeValue) -> PyResult<ManagedRef>;

    /// Handle the native side may read but must not release
    fn borrowed_handle(&self, obj: ManagedRef) -> NativeValue;

    /// Independently owned handle (one native reference acquired)
    fn new_handle(&self, obj: ManagedRef) -> NativeValue;

    /// Give one native reference back
    fn release_handle(&self, handle: NativeValue) -> PyResult<()>;

    // ========================================================================
    // Types
    // ========================================================================

    /// Check whether `obj` is an instance of a specialized managed type
    fn is_instance(&self, obj: ManagedRef, ty: ManagedType) -> bool;

    /// Type name for error messages
    fn type_name(&self, obj: ManagedRef) -> String;

    // ========================================================================
    // Conversion
    // ========================================================================

    /// `str(obj)`
    fn str(&self, obj: ManagedRef) -> PyResult<ManagedRef>;

    /// `repr(obj)`
    fn repr(&self, obj: ManagedRef) -> PyResult<ManagedRef>;

    /// Allocate a new string
    fn new_str(&self, s: &str) -> ManagedRef;

    // ========================================================================
    // Attributes and Calls
    // ========================================================================

    /// `getattr(obj, name)`
    fn get_attr(&self, obj: ManagedRef, name: &str) -> PyResult<ManagedRef>;

    /// `callable(*args)`
    fn call(&self, callable: ManagedRef, args: &[ManagedRef]) -> PyResult<ManagedRef>;

    // ========================================================================
    // Frames
    // ========================================================================

    /// Code object of a frame
    fn frame_code(&self, frame: ManagedRef) -> PyResult<ManagedRef>;

    /// Current line of a frame, computed from its instruction offset
    fn frame_line_number(&self, frame: ManagedRef) -> PyResult<i32>;

    /// Raw instruction offset of a frame (plain field read)
    fn frame_lasti(&self, frame: ManagedRef) -> PyResult<i32>;

    /// Locals mapping of a frame.
    ///
    /// Must be a live mapping: writes through it are visible to the frame,
    /// matching the reference API's write-back contract. Returning a
    /// snapshot is not a valid implementation.
    fn frame_locals(&self, frame: ManagedRef) -> PyResult<ManagedRef>;

    /// Globals mapping of a frame
    fn frame_globals(&self, frame: ManagedRef) -> PyResult<ManagedRef>;

    /// Calling frame, `None` at the top of a call chain
    fn frame_back(&self, frame: ManagedRef) -> PyResult<Option<ManagedRef>>;

    /// Builtins mapping of a frame
    fn frame_builtins(&self, frame: ManagedRef) -> PyResult<ManagedRef>;

    // ========================================================================
    // Iteration
    // ========================================================================

    /// Does `obj` implement the iterator protocol
    fn is_iterator(&self, obj: ManagedRef) -> bool;

    /// Wrap a sequence in an iterator. Indexability is checked lazily on advance.
    fn new_seq_iter(&self, seq: ManagedRef) -> ManagedRef;

    /// `iter(callable, sentinel)`. Raises if `callable` is not callable.
    fn new_call_iter(&self, callable: ManagedRef, sentinel: ManagedRef) -> PyResult<ManagedRef>;

    /// Advance an iterator; `Ok(None)` when exhausted
    fn iter_next(&self, iter: ManagedRef) -> PyResult<Option<ManagedRef>>;
}
