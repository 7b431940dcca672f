//! Database accessors.

use crate::error::Result;
use crate::handle::Handle;
use crate::list::{ForeignList, Ownership, StringList};
use crate::package::Package;
use crate::util::{cstring, lossy_string};
use palpm_sys as sys;

/// A registered database (`alpm_db_t`), local or sync.
///
/// Databases are owned by the handle; the binding never frees one.
pub struct Db<'h> {
    handle: &'h Handle,
    ptr: *mut sys::alpm_db_t,
}

impl<'h> Db<'h> {
    pub(crate) fn new(handle: &'h Handle, ptr: *mut sys::alpm_db_t) -> Self {
        Self { handle, ptr }
    }

    /// Raw db pointer for native interop.
    pub fn as_raw(&self) -> *mut sys::alpm_db_t {
        self.ptr
    }

    pub fn name(&self) -> String {
        unsafe { lossy_string(sys::alpm_db_get_name(self.ptr)) }
    }

    /// Looks up a package by exact name.
    pub fn pkg(&self, name: &str) -> Result<Package<'h>> {
        let name_c = cstring(name)?;
        let pkg = unsafe { sys::alpm_db_get_pkg(self.ptr, name_c.as_ptr()) };
        if pkg.is_null() {
            Err(self.handle.error())
        } else {
            Ok(Package::new(pkg))
        }
    }

    /// Every package in the database. The list is library-owned.
    pub fn pkgcache(&self) -> ForeignList<'h, Package<'h>> {
        let head = unsafe { sys::alpm_db_get_pkgcache(self.ptr) };
        ForeignList::from_ptr(head, Ownership::Unowned)
    }

    /// Configured server URLs. The list and its strings are library-owned.
    pub fn servers(&self) -> StringList<'h> {
        let head = unsafe { sys::alpm_db_get_servers(self.ptr) };
        StringList::from_ptr(head, Ownership::Unowned)
    }
}
