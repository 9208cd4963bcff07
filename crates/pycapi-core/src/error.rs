//! Error types for the dispatch core

use pycapi_sdk::PyException;

use crate::registry::CallPath;

/// Result type for dispatch operations
pub type CApiResult<T> = Result<T, CApiError>;

/// Dispatch errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum CApiError {
    /// A managed exception, propagated unchanged
    #[error(transparent)]
    Raised(#[from] PyException),

    /// No entry registered under this symbol name
    #[error("Unknown C API symbol: {0}")]
    UnknownSymbol(String),

    /// No entry registered under this id
    #[error("Unknown C API builtin id: {0}")]
    UnknownId(u32),

    /// Native call arity does not match the entry's descriptor list
    #[error("{symbol} takes {expected} arguments, got {got}")]
    ArityMismatch {
        /// Entry name
        symbol: String,
        /// Declared arity
        expected: usize,
        /// Actual arity
        got: usize,
    },

    /// Entry is declared but not routed through the managed side
    #[error("{symbol} is not routed through the managed runtime (call path {path:?})")]
    NotRouted {
        /// Entry name
        symbol: String,
        /// Declared call path
        path: CallPath,
    },

    /// Entry rejected at registration
    #[error("Invalid C API entry {symbol}: {reason}")]
    InvalidEntry {
        /// Entry name
        symbol: String,
        /// What is wrong with it
        reason: String,
    },

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CApiError {
    /// The managed exception, if this error carries one
    pub fn exception(&self) -> Option<&PyException> {
        match self {
            CApiError::Raised(e) => Some(e),
            _ => None,
        }
    }
}
