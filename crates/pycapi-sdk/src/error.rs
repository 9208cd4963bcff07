//! Managed exception type raised across the boundary

use std::fmt;

/// Result type for managed runtime operations
pub type PyResult<T> = Result<T, PyException>;

/// Built-in exception classes the boundary and the runtime raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    /// Internal contract violation (null argument, wrong handle type)
    SystemError,
    /// Operation applied to an object of inappropriate type
    TypeError,
    /// Attribute lookup failed
    AttributeError,
    /// Sequence index out of range
    IndexError,
    /// Iterator exhausted
    StopIteration,
    /// Argument has the right type but an inappropriate value
    ValueError,
    /// Anything else
    RuntimeError,
}

impl ExceptionKind {
    /// Class name as the managed language spells it
    pub const fn name(self) -> &'static str {
        match self {
            ExceptionKind::SystemError => "SystemError",
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::AttributeError => "AttributeError",
            ExceptionKind::IndexError => "IndexError",
            ExceptionKind::StopIteration => "StopIteration",
            ExceptionKind::ValueError => "ValueError",
            ExceptionKind::RuntimeError => "RuntimeError",
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A raised managed exception.
///
/// The boundary never wraps or rewrites one of these: whatever the runtime
/// raises is what the native caller finds in its error indicator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct PyException {
    kind: ExceptionKind,
    message: String,
}

impl PyException {
    /// Create a new exception
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a `SystemError`
    pub fn system_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::SystemError, message)
    }

    /// Shorthand for a `TypeError`
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::TypeError, message)
    }

    /// Exception class
    pub fn kind(&self) -> ExceptionKind {
        self.kind
    }

    /// Exception message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check the exception class
    pub fn is(&self, kind: ExceptionKind) -> bool {
        self.kind == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = PyException::new(ExceptionKind::AttributeError, "no attribute 'write'");
        assert_eq!(e.to_string(), "AttributeError: no attribute 'write'");
    }

    #[test]
    fn test_kind_checks() {
        let e = PyException::system_error("bad");
        assert!(e.is(ExceptionKind::SystemError));
        assert!(!e.is(ExceptionKind::TypeError));
        assert_eq!(e.message(), "bad");
    }
}
