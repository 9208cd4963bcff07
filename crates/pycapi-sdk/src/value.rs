//! NativeValue - one raw machine word crossing the native boundary
//!
//! A native call site passes every argument as a single 64-bit word and gets
//! a single word back. Unlike managed values the word carries **no tag**: how
//! it is read (`int`, `Py_ssize_t`, `PyObject*`, `const char*`) is decided
//! entirely by the argument descriptor of the slot it was passed in.
//!
//! # Encoding
//!
//! ```text
//! int / long:   sign-extended to 64 bits
//! Py_ssize_t:   raw two's complement i64
//! pointers:     raw address, 0 == NULL
//! ```

/// Raw 64-bit word exchanged with native code.
///
/// Conversion to and from the native representation is zero-cost: the word is
/// exactly what a C caller would place in a register.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct NativeValue(u64);

impl NativeValue {
    /// The NULL pointer / zero word
    pub const NULL: NativeValue = NativeValue(0);

    // ========================================================================
    // Zero-cost conversion
    // ========================================================================

    /// Create from raw u64 bits
    #[inline(always)]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Get raw u64 bits
    #[inline(always)]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create a C `int` word (sign-extended)
    #[inline]
    pub const fn int(i: i32) -> Self {
        Self(i as i64 as u64)
    }

    /// Create a `Py_ssize_t` / `long` word
    #[inline]
    pub const fn ssize(i: i64) -> Self {
        Self(i as u64)
    }

    /// Create from a raw pointer
    #[inline]
    pub fn pointer<T>(ptr: *const T) -> Self {
        Self(ptr as usize as u64)
    }

    // ========================================================================
    // Readers
    // ========================================================================

    /// Check if the word is NULL (all zero)
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Read as C `int` (low 32 bits)
    #[inline]
    pub const fn as_i32(&self) -> i32 {
        self.0 as u32 as i32
    }

    /// Read as `Py_ssize_t` / `long`
    #[inline]
    pub const fn as_i64(&self) -> i64 {
        self.0 as i64
    }

    /// Read as a raw pointer. The pointer is never dereferenced here.
    #[inline]
    pub fn as_ptr<T>(&self) -> *const T {
        self.0 as usize as *const T
    }
}

impl std::fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "NativeValue::NULL")
        } else {
            write!(f, "NativeValue({:#x})", self.0)
        }
    }
}
