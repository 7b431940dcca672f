//! # palpm Testkit
//!
//! Test utilities for the palpm binding.
//!
//! This crate provides:
//! - Temporary root/dbpath fixtures for opening handles
//! - Fixture package seeding on the stubbed native layer
//! - Re-exports of the native spy and callback firing helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use palpm_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_handle() {
//!     let fixture = FixtureRoot::new();
//!     let handle = fixture.open_handle();
//!     seed_local(&handle, "vim", "9.1.0-1", &["glibc"]);
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;

/// The stubbed native layer's spy and invocation helpers.
pub use palpm_sys::testing as native;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::native;
}

pub use fixtures::*;
