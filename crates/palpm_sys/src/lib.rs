//! # palpm_sys
//!
//! Raw C ABI surface of libalpm, the Arch Linux package-management library.
//!
//! This crate provides:
//! - `#[repr(C)]` struct/enum/union definitions matching libalpm's ABI
//! - `extern "C"` declarations for the primitives the safe binding calls
//! - callback typedefs (event, fetch, question, progress)
//!
//! With the `stub` feature enabled the extern declarations are replaced by an
//! in-process fake of libalpm instrumented with a call-count spy, so the safe
//! binding's ownership and lifecycle contracts can be tested without a native
//! library installed. The stub allocates everything it hands out with the C
//! allocator, so the binding's `libc::free` paths are exercised for real.

#![allow(non_camel_case_types)]

mod types;

pub use types::*;

#[cfg(not(feature = "stub"))]
mod ffi;
#[cfg(not(feature = "stub"))]
pub use ffi::*;

#[cfg(feature = "stub")]
pub mod stub;
#[cfg(feature = "stub")]
pub use stub::*;
