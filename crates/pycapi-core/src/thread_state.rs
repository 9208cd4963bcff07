//! Per-thread error indicator of the native side
//!
//! Native callers learn about failures through a sentinel return value plus
//! this indicator, the way C extensions call `PyErr_Occurred()` after a call
//! returned `-1` or NULL.

use pycapi_sdk::PyException;

/// Error indicator owned by one native thread
#[derive(Debug, Default)]
pub struct ThreadState {
    current: Option<PyException>,
}

impl ThreadState {
    /// Create a thread state with no pending exception
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pending exception, replacing any previous one
    pub fn set_error(&mut self, exception: PyException) {
        self.current = Some(exception);
    }

    /// Pending exception, if any
    pub fn occurred(&self) -> Option<&PyException> {
        self.current.as_ref()
    }

    /// Take the pending exception, clearing the indicator
    pub fn fetch(&mut self) -> Option<PyException> {
        self.current.take()
    }

    /// Clear the indicator
    pub fn clear(&mut self) {
        self.current = None;
    }
}
