//! Safe Rust binding to libalpm, Arch Linux's package management library.
//!
//! The crate wraps the raw surface declared in `palpm_sys` behind ownership
//! and lifetime rules the compiler can check:
//!
//! - [`Handle`] owns the native session; everything else borrows it, so no
//!   binding object can outlive the session.
//! - [`ForeignList`], [`OwningList`] and [`StringList`] adapt libalpm's
//!   linked lists with an explicit [`Ownership`] contract fixed at
//!   construction, deciding exactly what release frees.
//! - [`CallbackBridge`] installs the native callback slots and routes them
//!   to Rust closures through revocable registry tokens.
//! - [`Transaction`] walks the initialized/prepared/committed/released
//!   phases and rejects out-of-order calls before they reach C.
//!
//! Releases are explicit where control matters and fall back to `Drop`
//! everywhere else; a released object answers every later call with
//! [`Error::UseAfterRelease`] instead of touching freed memory.

mod callback;
mod db;
mod dep;
mod error;
mod event;
mod handle;
mod list;
mod package;
mod question;
mod transaction;
mod util;

pub use callback::{CallbackBridge, CallbackKind, Progress, ProgressKind};
pub use db::Db;
pub use dep::{DepMissing, Depend};
pub use error::{Error, ErrorKind, Result};
pub use event::{Event, HookWhen, PackageOperation};
pub use handle::Handle;
pub use list::{
    ConsumingCursor, Cursor, ForeignList, FromRaw, Iter, Ownership, OwningList, ReleaseNative,
    StringList,
};
pub use package::Package;
pub use question::Question;
pub use transaction::{TransFlags, TransState, Transaction};
