//! pycapi core - Dispatch and marshaling for the C-API compatibility layer
//!
//! Native extensions call well-known `Py*` symbols. This crate routes each
//! call to a managed-side operation through a fixed pipeline:
//!
//! - `descriptor`: how every argument/return slot travels and who owns it
//! - `marshal`: native words in, managed values out, and back
//! - `guard`: NULL rejection for required slots, before any operation runs
//! - `registry`: symbol table, call paths, import linking
//! - `context`: the dispatcher tying it together, plus the native
//!   error convention (`ThreadState` + sentinel return)
//!
//! # Example
//!
//! ```ignore
//! use pycapi_core::{BridgeConfig, CApiContext, ThreadState};
//!
//! let ctx = CApiContext::with_builtins(&runtime, BridgeConfig::from_env()?)?;
//! let status = ctx.call("PyFile_WriteObject", &[obj, file, NativeValue::int(1)])?;
//! ```

#![warn(missing_docs)]

mod builtins;

pub mod call;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod guard;
pub mod marshal;
pub mod registry;
pub mod thread_state;

pub use call::CApiCall;
pub use config::BridgeConfig;
pub use context::CApiContext;
pub use descriptor::{ArgDescriptor, Direction, Ownership, Param, WireKind};
pub use error::{CApiError, CApiResult};
pub use marshal::{ManagedArg, ManagedResult, NativeResult};
pub use registry::{BuiltinFn, BuiltinId, CApiBuiltin, CApiRegistry, CallPath, LinkedSymbols};
pub use thread_state::ThreadState;
