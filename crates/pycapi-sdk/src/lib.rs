//! pycapi SDK - Shared types for the C-API compatibility boundary
//!
//! This crate provides the minimal vocabulary both sides of the boundary
//! agree on, without depending on the dispatch core or on any particular
//! managed runtime:
//!
//! - `NativeValue`: the untagged word a native call site passes and receives
//! - `ManagedRef` / `ManagedType` / `ManagedFrame`: opaque managed references
//! - `PyException` / `PyResult`: the managed exception channel
//! - `ManagedRuntime`: the operations the core needs from the runtime
//!
//! # Example
//!
//! ```ignore
//! use pycapi_sdk::{ManagedRuntime, NativeValue};
//!
//! fn is_iter(rt: &dyn ManagedRuntime, handle: NativeValue) -> bool {
//!     rt.resolve_handle(handle)
//!         .map(|obj| rt.is_iterator(obj))
//!         .unwrap_or(false)
//! }
//! ```

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod types;
pub mod value;

pub use context::ManagedRuntime;
pub use error::{ExceptionKind, PyException, PyResult};
pub use types::{ManagedFrame, ManagedRef, ManagedType};
pub use value::NativeValue;
