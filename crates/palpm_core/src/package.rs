//! Package accessors.

use crate::dep::Depend;
use crate::handle::Handle;
use crate::list::{ForeignList, FromRaw, Ownership};
use crate::util::lossy_string;
use libc::c_void;
use palpm_sys as sys;
use std::marker::PhantomData;

/// A library-owned package (`alpm_pkg_t`).
///
/// Packages live inside their database; the binding never frees them, it
/// only reads through them while the handle is alive.
#[derive(Debug)]
pub struct Package<'h> {
    ptr: *mut sys::alpm_pkg_t,
    _handle: PhantomData<&'h Handle>,
}

impl FromRaw for Package<'_> {
    unsafe fn from_raw(data: *mut c_void) -> Self {
        Self {
            ptr: data as *mut sys::alpm_pkg_t,
            _handle: PhantomData,
        }
    }
}

impl<'h> Package<'h> {
    pub(crate) fn new(ptr: *mut sys::alpm_pkg_t) -> Self {
        Self {
            ptr,
            _handle: PhantomData,
        }
    }

    pub(crate) fn as_ptr(&self) -> *mut sys::alpm_pkg_t {
        self.ptr
    }

    pub fn name(&self) -> String {
        unsafe { lossy_string(sys::alpm_pkg_get_name(self.ptr)) }
    }

    pub fn version(&self) -> String {
        unsafe { lossy_string(sys::alpm_pkg_get_version(self.ptr)) }
    }

    /// The package's dependency list. Library-owned; reading it transfers
    /// no ownership.
    pub fn depends(&self) -> ForeignList<'h, Depend<'h>> {
        let head = unsafe { sys::alpm_pkg_get_depends(self.ptr) };
        ForeignList::from_ptr(head, Ownership::Unowned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palpm_sys::testing;

    #[test]
    fn package_reads_name_version_and_depends() {
        testing::reset_spy();
        let handle = Handle::open("/", "/db").unwrap();
        testing::register_local_pkg(handle.as_raw(), "vim", "9.1.0-1", &["glibc", "ncurses"]);

        let db = handle.localdb().unwrap();
        let pkg = db.pkg("vim").unwrap();
        assert_eq!(pkg.name(), "vim");
        assert_eq!(pkg.version(), "9.1.0-1");

        let depends = pkg.depends();
        let names: Vec<String> = depends.iter().unwrap().map(|d| d.name()).collect();
        assert_eq!(names, ["glibc", "ncurses"]);
        drop(depends);
        // The dependency list stays library-owned.
        assert_eq!(testing::spy().list_free, 0);
        assert_eq!(testing::spy().dep_free, 0);
    }
}
