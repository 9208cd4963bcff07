//! Managed-side references and typed wrappers
//!
//! The boundary never looks inside a managed object. It holds opaque
//! `ManagedRef`s and reaches their contents only through `ManagedRuntime`.
//! `ManagedFrame` is the typed view handed to frame operations once the
//! marshaler has checked the handle really is a frame.

use crate::context::ManagedRuntime;
use crate::error::PyResult;

// ============================================================================
// ManagedRef
// ============================================================================

/// Opaque reference into the managed runtime's object space.
///
/// Lifetime is owned by the runtime's memory manager; holding a `ManagedRef`
/// does not keep anything alive on the native side.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ManagedRef(u64);

impl ManagedRef {
    /// Create from the runtime's internal id
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the runtime's internal id
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

// ============================================================================
// ManagedType
// ============================================================================

/// Managed types a specialized handle descriptor validates against
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ManagedType {
    /// Execution frame
    Frame,
    /// Code object
    Code,
}

impl ManagedType {
    /// Type name used in error messages
    pub const fn name(self) -> &'static str {
        match self {
            ManagedType::Frame => "frame",
            ManagedType::Code => "code",
        }
    }
}

impl std::fmt::Display for ManagedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// ManagedFrame
// ============================================================================

/// Typed view of a managed frame.
///
/// All accessors delegate to exactly one `ManagedRuntime` operation.
pub struct ManagedFrame<'a> {
    frame: ManagedRef,
    rt: &'a dyn ManagedRuntime,
}

impl<'a> ManagedFrame<'a> {
    /// Wrap a managed value as a frame. Returns a system error if it is not one.
    pub fn wrap(rt: &'a dyn ManagedRuntime, frame: ManagedRef) -> PyResult<Self> {
        if !rt.is_instance(frame, ManagedType::Frame) {
            return Err(rt.system_error(&format!(
                "expected frame, got '{}'",
                rt.type_name(frame)
            )));
        }
        Ok(Self { frame, rt })
    }

    /// The wrapped reference
    pub fn reference(&self) -> ManagedRef {
        self.frame
    }

    /// Code object executing in this frame
    pub fn code(&self) -> PyResult<ManagedRef> {
        self.rt.frame_code(self.frame)
    }

    /// Current source line (computed by the runtime)
    pub fn line_number(&self) -> PyResult<i32> {
        self.rt.frame_line_number(self.frame)
    }

    /// Raw instruction offset
    pub fn lasti(&self) -> PyResult<i32> {
        self.rt.frame_lasti(self.frame)
    }

    /// Live locals mapping
    pub fn locals(&self) -> PyResult<ManagedRef> {
        self.rt.frame_locals(self.frame)
    }

    /// Globals mapping
    pub fn globals(&self) -> PyResult<ManagedRef> {
        self.rt.frame_globals(self.frame)
    }

    /// Calling frame, `None` at the top of a call chain
    pub fn back(&self) -> PyResult<Option<ManagedRef>> {
        self.rt.frame_back(self.frame)
    }

    /// Builtins mapping
    pub fn builtins(&self) -> PyResult<ManagedRef> {
        self.rt.frame_builtins(self.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_managed_ref_raw_roundtrip() {
        let r = ManagedRef::from_raw(17);
        assert_eq!(r.raw(), 17);
        assert_eq!(r, ManagedRef::from_raw(17));
    }

    #[test]
    fn test_managed_type_names() {
        assert_eq!(ManagedType::Frame.to_string(), "frame");
        assert_eq!(ManagedType::Code.name(), "code");
    }
}
