//! The libalpm handle.

use crate::db::Db;
use crate::error::{Error, Result};
use crate::transaction::{TransFlags, Transaction};
use crate::util::{cstring, lossy_string};
use palpm_sys as sys;
use std::ptr;
use tracing::debug;

/// An initialized libalpm session.
///
/// The handle owns the native `alpm_handle_t` and releases it on drop. All
/// other binding objects borrow the handle, so the borrow checker keeps them
/// from outliving it; a handle released explicitly through [`Handle::release`]
/// turns later calls into [`Error::UseAfterRelease`].
#[derive(Debug)]
pub struct Handle {
    ptr: *mut sys::alpm_handle_t,
    /// Out-cell passed to `alpm_initialize`. Initialization failures land
    /// here before any handle exists to read an errno from. Kept boxed for
    /// the handle's lifetime so the address stays stable.
    #[allow(dead_code)]
    errno_cell: Box<sys::alpm_errno_t>,
}

impl Handle {
    /// Initializes libalpm with the given filesystem root and database path.
    pub fn open(root: &str, dbpath: &str) -> Result<Self> {
        let root_c = cstring(root)?;
        let dbpath_c = cstring(dbpath)?;
        let mut cell = Box::new(sys::alpm_errno_t::ALPM_ERR_OK);
        let ptr = unsafe { sys::alpm_initialize(root_c.as_ptr(), dbpath_c.as_ptr(), &mut *cell) };
        if ptr.is_null() {
            return Err(Error::from_errno(*cell));
        }
        debug!(root, dbpath, "initialized libalpm handle");
        Ok(Self {
            ptr,
            errno_cell: cell,
        })
    }

    /// The live native pointer, or `UseAfterRelease` once released.
    pub(crate) fn raw(&self) -> Result<*mut sys::alpm_handle_t> {
        if self.ptr.is_null() {
            Err(Error::UseAfterRelease("handle"))
        } else {
            Ok(self.ptr)
        }
    }

    /// Raw handle pointer for native interop. Null once released.
    pub fn as_raw(&self) -> *mut sys::alpm_handle_t {
        self.ptr
    }

    /// The raw errno currently recorded on the handle.
    pub fn errno(&self) -> Result<sys::alpm_errno_t> {
        Ok(unsafe { sys::alpm_errno(self.raw()?) })
    }

    /// Snapshot of the current native error as a structured error.
    ///
    /// The underlying errno is a single cell on the handle; read it right
    /// after the failing call, before anything else overwrites it.
    pub fn error(&self) -> Error {
        match self.raw() {
            Ok(ptr) => Error::from_errno(unsafe { sys::alpm_errno(ptr) }),
            Err(err) => err,
        }
    }

    /// The native description for the current errno.
    pub fn strerror(&self) -> Result<String> {
        let errno = self.errno()?;
        Ok(unsafe { lossy_string(sys::alpm_strerror(errno)) })
    }

    /// The local (installed-packages) database.
    pub fn localdb(&self) -> Result<Db<'_>> {
        let db = unsafe { sys::alpm_get_localdb(self.raw()?) };
        if db.is_null() {
            Err(self.error())
        } else {
            Ok(Db::new(self, db))
        }
    }

    /// Registers a sync database by repository name.
    pub fn register_syncdb(&self, name: &str, siglevel: i32) -> Result<Db<'_>> {
        let name_c = cstring(name)?;
        let db = unsafe { sys::alpm_register_syncdb(self.raw()?, name_c.as_ptr(), siglevel) };
        if db.is_null() {
            Err(self.error())
        } else {
            debug!(name, "registered sync db");
            Ok(Db::new(self, db))
        }
    }

    /// Starts a transaction. libalpm allows one per handle; a second call
    /// before the first transaction is released fails natively.
    pub fn transaction(&self, flags: TransFlags) -> Result<Transaction<'_>> {
        Transaction::begin(self, flags)
    }

    /// Releases the native handle. Idempotent; the native call runs at most
    /// once and later operations on this handle fail with `UseAfterRelease`.
    pub fn release(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        // Release status is swallowed: the handle is invalidated either way
        // and there is nothing a caller could do with the failure.
        let _ = unsafe { sys::alpm_release(self.ptr) };
        self.ptr = ptr::null_mut();
        debug!("released libalpm handle");
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use palpm_sys::testing;

    fn open() -> Handle {
        Handle::open("/", "/var/lib/pacman/").expect("stub handle")
    }

    #[test]
    fn open_rejects_embedded_nul() {
        assert!(matches!(
            Handle::open("bad\0root", "/db"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn release_is_idempotent_and_invalidates() {
        testing::reset_spy();
        let mut handle = open();
        handle.release();
        handle.release();
        assert_eq!(testing::spy().handle_release, 1);

        assert!(matches!(
            handle.errno(),
            Err(Error::UseAfterRelease("handle"))
        ));
        assert!(matches!(
            handle.localdb(),
            Err(Error::UseAfterRelease("handle"))
        ));
        assert!(handle.as_raw().is_null());
    }

    #[test]
    fn drop_releases_native_handle() {
        testing::reset_spy();
        drop(open());
        assert_eq!(testing::spy().handle_release, 1);
    }

    #[test]
    fn error_snapshots_current_errno() {
        let handle = open();
        let db = handle.localdb().unwrap();
        assert!(db.pkg("absent").is_err());
        assert_eq!(
            handle.error().native_kind(),
            Some(ErrorKind::PackageNotFound)
        );
        assert_eq!(handle.strerror().unwrap(), "could not find or read package");
    }
}
