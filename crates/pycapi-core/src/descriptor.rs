//! Type/transfer descriptor table
//!
//! Every argument and return slot of a native entry point is tagged with an
//! `ArgDescriptor`. The table below is the single place that says how a slot
//! travels over the wire and who owns what afterwards. Adding a kind means
//! adding a variant and its row in `ArgDescriptor::info`; operations never
//! look at descriptors.

use pycapi_sdk::{ManagedType, NativeValue};

/// How a slot is represented on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireKind {
    /// No value (return slots only)
    Void,
    /// C `int`
    Int32,
    /// `Py_ssize_t` / `long`
    Int64,
    /// Raw pointer, passed through untouched
    Pointer,
    /// Managed object handle
    Object,
}

/// Which way a value crosses the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Native caller to managed operation (argument slot)
    In,
    /// Managed operation back to native caller (return slot)
    Out,
}

/// Reference ownership rule of an object slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// No transfer: the receiver must not release and must not keep it past the call
    Borrowed,
    /// The boundary consumes one native reference from the caller
    TransferIn,
    /// The boundary hands the caller a new, independently owned reference
    TransferOut,
}

/// One row of the descriptor table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorInfo {
    /// Wire representation
    pub wire: WireKind,
    /// C spelling used in exported prototypes
    pub c_type: &'static str,
    /// Whether the slot transfers a reference
    pub transfer: bool,
    /// Managed type a specialized handle must carry
    pub managed_type: Option<ManagedType>,
}

impl DescriptorInfo {
    const fn new(wire: WireKind, c_type: &'static str) -> Self {
        Self {
            wire,
            c_type,
            transfer: false,
            managed_type: None,
        }
    }

    const fn transfer(mut self) -> Self {
        self.transfer = true;
        self
    }

    const fn typed(mut self, ty: ManagedType) -> Self {
        self.managed_type = Some(ty);
        self
    }
}

/// Marshaling kind of an argument or return slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgDescriptor {
    /// `void` return
    Void,
    /// C `int`, no ownership
    Int,
    /// C `long`
    Long,
    /// `Py_ssize_t`
    PySsizeT,
    /// `const char*`, passed through as a raw pointer
    ConstCharPtr,
    /// Borrowed object handle
    PyObject,
    /// Object handle with ownership transfer
    PyObjectTransfer,
    /// Borrowed frame handle
    PyFrameObject,
    /// Frame handle with ownership transfer
    PyFrameObjectTransfer,
    /// Code object handle with ownership transfer
    PyCodeObjectTransfer,
}

impl ArgDescriptor {
    /// Every descriptor kind, in table order
    pub const ALL: &'static [ArgDescriptor] = &[
        ArgDescriptor::Void,
        ArgDescriptor::Int,
        ArgDescriptor::Long,
        ArgDescriptor::PySsizeT,
        ArgDescriptor::ConstCharPtr,
        ArgDescriptor::PyObject,
        ArgDescriptor::PyObjectTransfer,
        ArgDescriptor::PyFrameObject,
        ArgDescriptor::PyFrameObjectTransfer,
        ArgDescriptor::PyCodeObjectTransfer,
    ];

    /// Table row for this descriptor
    pub const fn info(self) -> DescriptorInfo {
        use ManagedType::{Code, Frame};
        use WireKind::*;
        match self {
            ArgDescriptor::Void => DescriptorInfo::new(Void, "void"),
            ArgDescriptor::Int => DescriptorInfo::new(Int32, "int"),
            ArgDescriptor::Long => DescriptorInfo::new(Int64, "long"),
            ArgDescriptor::PySsizeT => DescriptorInfo::new(Int64, "Py_ssize_t"),
            ArgDescriptor::ConstCharPtr => DescriptorInfo::new(Pointer, "const char*"),
            ArgDescriptor::PyObject => DescriptorInfo::new(Object, "PyObject*"),
            ArgDescriptor::PyObjectTransfer => DescriptorInfo::new(Object, "PyObject*").transfer(),
            ArgDescriptor::PyFrameObject => DescriptorInfo::new(Object, "PyFrameObject*").typed(Frame),
            ArgDescriptor::PyFrameObjectTransfer => {
                DescriptorInfo::new(Object, "PyFrameObject*").typed(Frame).transfer()
            }
            ArgDescriptor::PyCodeObjectTransfer => {
                DescriptorInfo::new(Object, "PyCodeObject*").typed(Code).transfer()
            }
        }
    }

    /// Wire representation
    pub const fn wire(self) -> WireKind {
        self.info().wire
    }

    /// C spelling
    pub const fn c_type(self) -> &'static str {
        self.info().c_type
    }

    /// Managed type a specialized handle must carry
    pub const fn managed_type(self) -> Option<ManagedType> {
        self.info().managed_type
    }

    /// Is this an object handle slot
    pub const fn is_object(self) -> bool {
        matches!(self.info().wire, WireKind::Object)
    }

    /// Ownership rule when used in the given direction; `None` for non-object slots
    pub const fn ownership(self, direction: Direction) -> Option<Ownership> {
        let info = self.info();
        match (info.wire, info.transfer, direction) {
            (WireKind::Object, false, _) => Some(Ownership::Borrowed),
            (WireKind::Object, true, Direction::In) => Some(Ownership::TransferIn),
            (WireKind::Object, true, Direction::Out) => Some(Ownership::TransferOut),
            _ => None,
        }
    }

    /// Value returned to native code when the entry raised
    pub const fn error_value(self) -> NativeValue {
        match self.info().wire {
            WireKind::Int32 | WireKind::Int64 => NativeValue::int(-1),
            WireKind::Void | WireKind::Pointer | WireKind::Object => NativeValue::NULL,
        }
    }
}

/// A named argument slot of a native entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    /// Parameter name, used in error messages
    pub name: &'static str,
    /// Marshaling kind
    pub descriptor: ArgDescriptor,
    /// NULL is a contract violation for this slot
    pub required: bool,
}

impl Param {
    /// A slot that must not be NULL
    pub const fn required(name: &'static str, descriptor: ArgDescriptor) -> Self {
        Self {
            name,
            descriptor,
            required: true,
        }
    }

    /// A slot that may be NULL (or is not a pointer at all)
    pub const fn optional(name: &'static str, descriptor: ArgDescriptor) -> Self {
        Self {
            name,
            descriptor,
            required: false,
        }
    }
}
