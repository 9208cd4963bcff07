//! pycapi heap - Reference managed runtime
//!
//! A small in-process object heap implementing `ManagedRuntime`, enough to
//! drive every builtin entry point end to end: strings and containers,
//! code objects with line tables, frames with live locals, sequence and
//! callable iterators, plain instances with `__str__`/`__repr__`/`__next__`
//! hooks, and a text writer for file-like targets.
//!
//! Native handles are pointer-shaped words derived from the object id, with
//! native reference counts tracked per object.
//!
//! # Example
//!
//! ```ignore
//! use pycapi_heap::{FrameSpec, Heap};
//!
//! let heap = Heap::new();
//! let globals = heap.dict(&[])?;
//! let code = heap.code("main", 1, &[(0, 1), (8, 2)]);
//! let frame = heap.frame(FrameSpec::new(code, globals, globals).lasti(8))?;
//! ```

#![warn(missing_docs)]

mod handles;
mod heap;
mod object;
mod runtime;

pub use heap::Heap;
pub use object::{FrameSpec, NativeFn};
